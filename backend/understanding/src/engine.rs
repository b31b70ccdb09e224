//! OCR engines.

use std::collections::HashMap;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::OcrError;

/// Text recognized on one image in one language.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrPage {
    pub text: String,
    /// Mean word confidence, 0-100.
    pub confidence: f64,
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Recognize text in `image` using a tesseract language code (`ara`, `eng`).
    async fn recognize(&self, image: &[u8], lang: &str) -> Result<OcrPage, OcrError>;
}

/// Runs the `tesseract` binary, feeding the image on stdin and reading TSV.
pub struct TesseractCli {
    command: String,
    oem: u8,
    psm: u8,
}

impl TesseractCli {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            oem: 3,
            psm: 6,
        }
    }

    pub fn with_modes(mut self, oem: u8, psm: u8) -> Self {
        self.oem = oem;
        self.psm = psm;
        self
    }

    /// First line of `tesseract --version`.
    pub async fn version(&self) -> Result<String, OcrError> {
        let output = Command::new(&self.command)
            .arg("--version")
            .output()
            .await
            .map_err(|source| OcrError::Spawn {
                command: self.command.clone(),
                source,
            })?;
        // Older releases print the version on stderr.
        let text = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(String::from_utf8_lossy(&text)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl OcrEngine for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, image: &[u8], lang: &str) -> Result<OcrPage, OcrError> {
        let spawn_err = |source| OcrError::Spawn {
            command: self.command.clone(),
            source,
        };

        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", lang])
            .args(["--oem", &self.oem.to_string(), "--psm", &self.psm.to_string()])
            .arg("tsv")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_err)?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| OcrError::Engine("tesseract stdin unavailable".into()))?;
        let input = image.to_vec();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let output = child.wait_with_output().await.map_err(spawn_err)?;
        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(OcrError::Engine(format!("writing image to tesseract: {e}"))),
            Err(e) => return Err(OcrError::Engine(format!("stdin writer task failed: {e}"))),
        }

        if !output.status.success() {
            return Err(OcrError::Tesseract {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let page = parse_tsv(&tsv);
        debug!(lang, chars = page.text.len(), confidence = page.confidence, "Tesseract finished");
        Ok(page)
    }
}

/// Build text and mean confidence from tesseract TSV output.
///
/// Columns: level page block par line word left top width height conf text.
/// Only level 5 (word) rows count. Words on the same line are joined by a
/// space, lines by a newline. Confidence averages the words with conf > 0.
pub fn parse_tsv(tsv: &str) -> OcrPage {
    let mut lines: Vec<((u32, u32, u32, u32), Vec<String>)> = Vec::new();
    let mut confidences = Vec::new();

    for row in tsv.lines().skip(1) {
        let fields: Vec<&str> = row.splitn(12, '\t').collect();
        if fields.len() < 12 || fields[0] != "5" {
            continue;
        }
        let key = match (
            fields[1].parse(),
            fields[2].parse(),
            fields[3].parse(),
            fields[4].parse(),
        ) {
            (Ok(page), Ok(block), Ok(par), Ok(line)) => (page, block, par, line),
            _ => continue,
        };
        let Ok(conf) = fields[10].trim().parse::<f64>() else {
            continue;
        };
        if conf > 0.0 {
            confidences.push(conf);
        }

        let word = fields[11].trim();
        if word.is_empty() {
            continue;
        }
        match lines.last_mut() {
            Some((last, words)) if *last == key => words.push(word.to_string()),
            _ => lines.push((key, vec![word.to_string()])),
        }
    }

    let text = lines
        .into_iter()
        .map(|(_, words)| words.join(" "))
        .collect::<Vec<_>>()
        .join("\n");
    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f64>() / confidences.len() as f64
    };

    OcrPage { text, confidence }
}

/// Engine returning canned pages per language.
#[derive(Default)]
pub struct MockOcrEngine {
    pages: HashMap<String, OcrPage>,
    failure: Option<String>,
}

impl MockOcrEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, lang: &str, text: &str, confidence: f64) -> Self {
        self.pages.insert(
            lang.to_string(),
            OcrPage {
                text: text.to_string(),
                confidence,
            },
        );
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }
}

#[async_trait]
impl OcrEngine for MockOcrEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn recognize(&self, _image: &[u8], lang: &str) -> Result<OcrPage, OcrError> {
        if let Some(msg) = &self.failure {
            return Err(OcrError::Engine(msg.clone()));
        }
        Ok(self.pages.get(lang).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn test_tsv_groups_words_into_lines() {
        let tsv = format!(
            "{HEADER}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t600\t800\t-1\t\n\
             4\t1\t1\t1\t1\t0\t10\t20\t200\t30\t-1\t\n\
             5\t1\t1\t1\t1\t1\t10\t20\t40\t30\t96\t2x\n\
             5\t1\t1\t1\t1\t2\t60\t20\t20\t30\t90\t+\n\
             5\t1\t1\t1\t1\t3\t90\t20\t20\t30\t84\t3\n\
             5\t1\t1\t1\t2\t1\t10\t60\t80\t30\t70\tsolve\n"
        );
        let page = parse_tsv(&tsv);
        assert_eq!(page.text, "2x + 3\nsolve");
        assert!((page.confidence - 85.0).abs() < 1e-9);
    }

    #[test]
    fn test_tsv_ignores_non_positive_confidence() {
        let tsv = format!(
            "{HEADER}\n\
             5\t1\t1\t1\t1\t1\t10\t20\t80\t30\t-1\tgarbled\n\
             5\t1\t1\t1\t1\t2\t10\t20\t80\t30\t0\tnoise\n\
             5\t1\t1\t1\t1\t3\t10\t20\t80\t30\t91.5\tword\n"
        );
        let page = parse_tsv(&tsv);
        assert_eq!(page.text, "garbled noise word");
        assert!((page.confidence - 91.5).abs() < 1e-9);
    }

    #[test]
    fn test_tsv_empty_and_malformed() {
        assert_eq!(parse_tsv(""), OcrPage::default());
        let tsv = format!("{HEADER}\ntoo\tfew\n5\tx\t1\t1\t1\t1\t0\t0\t0\t0\t90\tbad\n");
        assert_eq!(parse_tsv(&tsv), OcrPage::default());
    }

    #[tokio::test]
    async fn test_mock_engine_per_language() {
        let engine = MockOcrEngine::new().with_page("ara", "مرحبا", 80.0);
        assert_eq!(engine.recognize(b"", "ara").await.unwrap().text, "مرحبا");
        assert_eq!(engine.recognize(b"", "eng").await.unwrap(), OcrPage::default());
    }
}

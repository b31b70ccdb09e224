//! Interactive terminal tutor (`tawjihi ask`).

use std::io::Write;

use anyhow::Result;
use tawjihi_core::Subject;
use tawjihi_tutors::TutorRegistry;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const RULE: &str = "--------------------------------------------------";

fn is_exit(line: &str) -> bool {
    line.eq_ignore_ascii_case("exit")
}

/// Prompt and read one trimmed line. `None` on end of input.
async fn prompt<R, W>(lines: &mut tokio::io::Lines<R>, out: &mut W, label: &str) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    write!(out, "{label}")?;
    out.flush()?;
    Ok(lines.next_line().await?.map(|l| l.trim().to_string()))
}

/// Ask subject and question in a loop until `exit` or end of input.
pub async fn run<R, W>(tutors: &TutorRegistry, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    writeln!(out, "🎓 مرحباً بك في نظام التوجيهي الذكي")?;
    writeln!(out, "📚 المواد المتاحة: {}", Subject::available())?;
    writeln!(out, "❌ اكتب 'exit' للخروج\n")?;

    loop {
        let Some(subject) = prompt(&mut lines, out, "📖 المادة (Subject): ").await? else {
            break;
        };
        if is_exit(&subject) {
            break;
        }
        if subject.is_empty() {
            writeln!(out, "⚠️ يرجى إدخال اسم المادة")?;
            continue;
        }

        let Some(question) = prompt(&mut lines, out, "❓ سؤالك (Question): ").await? else {
            break;
        };
        if is_exit(&question) {
            break;
        }
        if question.is_empty() {
            writeln!(out, "⚠️ يرجى إدخال السؤال")?;
            continue;
        }

        let answer = tutors.ask(&subject, &question).await;
        writeln!(out, "\n🤖 الإجابة:\n{RULE}\n{answer}\n{RULE}\n")?;
    }

    writeln!(out, "\n👋 وداعاً!")?;
    Ok(())
}

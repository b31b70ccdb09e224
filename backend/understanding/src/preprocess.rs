//! Image cleanup ahead of OCR.
//!
//! Fixed chain: decode, grayscale, 3x3 median, Otsu binarization, PNG.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use tracing::{debug, warn};

use crate::error::OcrError;

pub fn decode(bytes: &[u8]) -> Result<DynamicImage, OcrError> {
    image::load_from_memory(bytes).map_err(|e| OcrError::Decode(e.to_string()))
}

/// Image bytes to hand to the engine.
///
/// Undecodable input is an error. A failure after decoding falls back to the
/// original bytes.
pub fn prepare_for_ocr(bytes: &[u8]) -> Result<Vec<u8>, OcrError> {
    let img = decode(bytes)?;
    match binarize(img) {
        Ok(png) => {
            debug!(input = bytes.len(), output = png.len(), "Image preprocessed");
            Ok(png)
        }
        Err(e) => {
            warn!(error = %e, "Image preprocessing failed, using original image");
            Ok(bytes.to_vec())
        }
    }
}

fn binarize(img: DynamicImage) -> Result<Vec<u8>, OcrError> {
    let gray = img.to_luma8();
    let denoised = median_3x3(&gray);
    let threshold = otsu_threshold(&denoised);
    let binary = apply_threshold(&denoised, threshold);
    encode_png(binary)
}

/// 3x3 median filter with edge clamping.
pub fn median_3x3(img: &GrayImage) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = GrayImage::new(w, h);
    if w == 0 || h == 0 {
        return out;
    }
    let mut window = [0u8; 9];
    for y in 0..h {
        for x in 0..w {
            let mut i = 0;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let sx = (x as i64 + dx).clamp(0, w as i64 - 1) as u32;
                    let sy = (y as i64 + dy).clamp(0, h as i64 - 1) as u32;
                    window[i] = img.get_pixel(sx, sy).0[0];
                    i += 1;
                }
            }
            window.sort_unstable();
            out.put_pixel(x, y, Luma([window[4]]));
        }
    }
    out
}

/// Global threshold maximizing between-class variance.
pub fn otsu_threshold(img: &GrayImage) -> u8 {
    let mut hist = [0u64; 256];
    for p in img.pixels() {
        hist[p.0[0] as usize] += 1;
    }
    let total = (img.width() as u64 * img.height() as u64) as f64;
    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut weight_bg = 0.0;
    let mut sum_bg = 0.0;
    let mut best_variance = 0.0;
    let mut best = 0u8;
    for (t, &count) in hist.iter().enumerate() {
        weight_bg += count as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0.0 {
            break;
        }
        sum_bg += t as f64 * count as f64;
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_all - sum_bg) / weight_fg;
        let variance = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best = t as u8;
        }
    }
    best
}

/// Pixels above `threshold` become white, the rest black.
pub fn apply_threshold(img: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = img.clone();
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] > threshold { 255 } else { 0 };
    }
    out
}

pub fn encode_png(img: GrayImage) -> Result<Vec<u8>, OcrError> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| OcrError::Processing(format!("PNG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}

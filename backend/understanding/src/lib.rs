pub mod engine;
pub mod error;
pub mod ocr;
pub mod preprocess;

pub use engine::{MockOcrEngine, OcrEngine, OcrPage, TesseractCli};
pub use error::OcrError;
pub use ocr::{
    BilingualResult, ContentType, HomeworkExtraction, OcrResult, OcrService, ARABIC, ENGLISH,
};
pub use preprocess::prepare_for_ocr;

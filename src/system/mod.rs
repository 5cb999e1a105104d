//! System interactions (clipboard, OCR)

pub mod clipboard;
pub mod ocr;

pub use clipboard::{
    ClipboardError, ClipboardItem, ClipboardPayload, ClipboardSource, ImageResolver,
    SystemClipboard,
};
pub use ocr::{locate_tesseract, OcrConfig, OcrError, TesseractOcr, TextRecognizer};

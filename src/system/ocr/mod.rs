//! OCR (Optical Character Recognition) functionality

mod tesseract;

pub use tesseract::{locate_tesseract, TesseractOcr, TESSERACT_DOWNLOAD_URL};

use std::path::PathBuf;

use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Tesseract OCR not available: {0}")]
    Unavailable(String),
    #[error("Failed to create temporary image file: {0}")]
    TempFile(#[source] std::io::Error),
    #[error("Image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Failed to execute tesseract: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Text extraction failed: {0}")]
    Failed(String),
}

/// Tesseract page segmentation mode 6: assume a single uniform block of text.
pub const PSM_SINGLE_BLOCK: u8 = 6;
/// Tesseract OCR engine mode 3: whatever is available (LSTM when installed).
pub const OEM_DEFAULT: u8 = 3;

/// Settings for the OCR engine, resolved from the app config at startup.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub command: PathBuf,
    pub page_segmentation_mode: u8,
    pub engine_mode: u8,
    pub language: Option<String>,
    /// Where transient images are written. `None` uses the system temp dir.
    pub temp_dir: Option<PathBuf>,
}

impl OcrConfig {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            page_segmentation_mode: PSM_SINGLE_BLOCK,
            engine_mode: OEM_DEFAULT,
            language: None,
            temp_dir: None,
        }
    }
}

/// Turns an image into text. Implementations never fail: recognition errors are logged and
/// reported as empty text so callers can show a single "no text" message.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &DynamicImage) -> String;
}

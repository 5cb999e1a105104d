//! Tesseract OCR via the `tesseract` command line tool.
//!
//! The image is written to a transient PNG (the CLI only takes file input), Tesseract prints the
//! recognized text to stdout, and the PNG is removed again whatever the outcome.

use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use image::{DynamicImage, ImageFormat};
use tracing::{debug, error, info, warn};

use super::{OcrConfig, OcrError, TextRecognizer};

/// Where users are sent when no Tesseract installation can be found.
pub const TESSERACT_DOWNLOAD_URL: &str = "https://github.com/UB-Mannheim/tesseract/wiki";

#[cfg(target_os = "windows")]
const TESSERACT_BINARY: &str = "tesseract.exe";
#[cfg(not(target_os = "windows"))]
const TESSERACT_BINARY: &str = "tesseract";

#[cfg(target_os = "windows")]
const WINDOWS_INSTALL_DIRS: [&str; 2] = [
    r"C:\Program Files\Tesseract-OCR",
    r"C:\Program Files (x86)\Tesseract-OCR",
];

const TEMP_IMAGE_PREFIX: &str = "lerc-ocr-";

#[derive(Debug, Clone)]
pub struct TesseractOcr {
    config: OcrConfig,
}

impl TesseractOcr {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    /// Runs `tesseract --version` to prove the engine is usable. Returns the first line of the
    /// version banner.
    pub fn version(&self) -> Result<String, OcrError> {
        let output = Command::new(&self.config.command)
            .arg("--version")
            .output()
            .map_err(|e| {
                OcrError::Unavailable(format!("{}: {}", self.config.command.display(), e))
            })?;

        if !output.status.success() {
            return Err(OcrError::Unavailable(format!(
                "{} --version exited with code {}",
                self.config.command.display(),
                output.status.code().unwrap_or(-1)
            )));
        }

        // Older releases print the banner on stderr.
        let banner = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };
        let version = banner.lines().next().unwrap_or_default().trim().to_string();
        info!(version = %version, command = %self.config.command.display(), "Tesseract available");
        Ok(version)
    }

    /// Extracts text from `image`, propagating every failure.
    pub fn extract_text(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix(TEMP_IMAGE_PREFIX).suffix(".png");
            builder
        };
        let mut file = match &self.config.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(OcrError::TempFile)?;

        image.write_to(file.as_file_mut(), ImageFormat::Png)?;

        // Close our handle before Tesseract opens the file. Dropping the path removes it.
        let image_path = file.into_temp_path();
        debug!(path = %image_path.display(), "Wrote image to temp file");

        let result = self.run(&image_path);

        let shown = image_path.display().to_string();
        if let Err(e) = image_path.close() {
            warn!(error = %e, path = %shown, "Failed to remove temporary image file");
        } else {
            debug!(path = %shown, "Cleaned up temporary image file");
        }

        result
    }

    fn run(&self, image_path: &Path) -> Result<String, OcrError> {
        let mut command = Command::new(&self.config.command);
        command
            .arg(image_path)
            .arg("stdout")
            .arg("--oem")
            .arg(self.config.engine_mode.to_string())
            .arg("--psm")
            .arg(self.config.page_segmentation_mode.to_string());
        if let Some(language) = &self.config.language {
            command.arg("-l").arg(language);
        }

        let output = command.output().map_err(OcrError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!(
                code = output.status.code().unwrap_or(-1),
                stderr = %stderr.trim(),
                "Text extraction failed"
            );
            return Err(OcrError::Failed(stderr.trim().to_string()));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        info!(chars = text.len(), "OCR completed");
        debug!(text = %text, "OCR extracted text");
        Ok(text)
    }
}

impl TextRecognizer for TesseractOcr {
    fn recognize(&self, image: &DynamicImage) -> String {
        self.extract_text(image).unwrap_or_else(|e| {
            error!(error = %e, "OCR processing error");
            String::new()
        })
    }
}

/// Finds the Tesseract binary.
///
/// Order: the explicitly configured command, `PATH`, then on Windows the default install
/// directories and the installer's registry entry.
pub fn locate_tesseract(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            info!(path = %path.display(), "Using configured Tesseract");
            return Some(path.to_path_buf());
        }
        warn!(path = %path.display(), "Configured Tesseract not found, searching");
    }

    if let Some(path) = find_in_path(OsStr::new(TESSERACT_BINARY)) {
        info!(path = %path.display(), "Found Tesseract in PATH");
        return Some(path);
    }

    #[cfg(target_os = "windows")]
    {
        let registry_dir = windows_registry_install_dir();
        let candidates = WINDOWS_INSTALL_DIRS
            .iter()
            .map(PathBuf::from)
            .chain(registry_dir);
        for dir in candidates {
            let path = dir.join(TESSERACT_BINARY);
            if path.is_file() {
                info!(path = %path.display(), "Using Tesseract from install directory");
                return Some(path);
            }
        }
    }

    warn!("Tesseract not found");
    None
}

fn find_in_path(binary: &OsStr) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

#[cfg(target_os = "windows")]
fn windows_registry_install_dir() -> Option<PathBuf> {
    use winreg::enums::HKEY_LOCAL_MACHINE;
    use winreg::RegKey;

    let key = RegKey::predef(HKEY_LOCAL_MACHINE)
        .open_subkey(r"SOFTWARE\Tesseract-OCR")
        .ok()?;
    let dir: String = key.get_value("InstallDir").ok()?;
    let dir = dir.trim();
    if dir.is_empty() {
        return None;
    }
    Some(PathBuf::from(dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn sample_image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 4, image::Rgb([255, 255, 255])))
    }

    fn ocr_in(dir: &Path, command: &str) -> TesseractOcr {
        let mut config = OcrConfig::new(command);
        config.temp_dir = Some(dir.to_path_buf());
        TesseractOcr::new(config)
    }

    fn leftover_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_missing_engine_degrades_to_empty_text_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let ocr = ocr_in(dir.path(), "/nonexistent/lerc-test/tesseract");

        assert!(matches!(
            ocr.extract_text(&sample_image()),
            Err(OcrError::Spawn(_))
        ));
        assert_eq!(ocr.recognize(&sample_image()), "");
        assert_eq!(leftover_files(dir.path()), 0);
    }

    #[test]
    fn test_missing_engine_is_unavailable() {
        let ocr = TesseractOcr::new(OcrConfig::new("/nonexistent/lerc-test/tesseract"));
        assert!(matches!(ocr.version(), Err(OcrError::Unavailable(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_engine_arguments_and_cleanup_on_success() {
        // `echo` stands in for tesseract and prints back the arguments it was given.
        let dir = tempfile::tempdir().unwrap();
        let ocr = ocr_in(dir.path(), "echo");

        let text = ocr.recognize(&sample_image());

        assert!(text.contains(TEMP_IMAGE_PREFIX));
        assert!(text.contains(".png stdout --oem 3 --psm 6"));
        assert_eq!(leftover_files(dir.path()), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_engine_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let ocr = ocr_in(dir.path(), "false");

        assert!(matches!(
            ocr.extract_text(&sample_image()),
            Err(OcrError::Failed(_))
        ));
        assert_eq!(leftover_files(dir.path()), 0);
    }

    #[test]
    fn test_locate_prefers_existing_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join(TESSERACT_BINARY);
        std::fs::write(&fake, b"").unwrap();

        assert_eq!(locate_tesseract(Some(&fake)), Some(fake));
    }
}

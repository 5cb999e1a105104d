//! Clipboard image acquisition.
//!
//! A screenshot can reach the clipboard in several shapes: a decoded bitmap, a list of copied
//! files, or (on Windows) only as a raw device-independent bitmap that the cross-platform reader
//! cannot see. [`ImageResolver`] reduces whatever [`ClipboardSource`] reports to one decoded
//! image by trying a fixed list of strategies in order. The clipboard is only ever read.

mod dib;
#[cfg(target_os = "windows")]
mod windows;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use arboard::Clipboard;
use clipboard_rs::{Clipboard as _, ClipboardContext, ContentFormat};
use image::{DynamicImage, RgbaImage};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

pub use dib::decode_dib;

/// Extensions accepted for file paths found on the clipboard (compared case-insensitively).
const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "gif", "tiff"];

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("Image decoding failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid device-independent bitmap: {0}")]
    InvalidDib(String),
}

/// One entry of a multi-item clipboard.
#[derive(Debug, Clone)]
pub enum ClipboardItem {
    Image(DynamicImage),
    Path(String),
}

/// What the clipboard holds, as reported by a [`ClipboardSource`].
#[derive(Debug, Clone, Default)]
pub enum ClipboardPayload {
    #[default]
    Empty,
    Image(DynamicImage),
    Items(Vec<ClipboardItem>),
    /// Platform bitmap bytes starting with a BITMAPINFOHEADER.
    RawBitmap(Vec<u8>),
}

impl ClipboardPayload {
    fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Image(_) => "image",
            Self::Items(_) => "items",
            Self::RawBitmap(_) => "raw bitmap",
        }
    }
}

/// Read-only access to the clipboard.
pub trait ClipboardSource: Send + Sync {
    fn read(&self) -> ClipboardPayload;

    /// Raw device-independent bitmap, when the platform has one. Absence is not an error.
    fn read_raw_bitmap(&self) -> Option<Vec<u8>> {
        None
    }
}

type Strategy<S> = fn(&ImageResolver<S>, &ClipboardPayload) -> Option<DynamicImage>;

/// Extracts a single image from the clipboard.
#[derive(Debug, Clone)]
pub struct ImageResolver<S> {
    source: S,
}

impl<S: ClipboardSource> ImageResolver<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Returns the first image found by the resolution strategies, or `None`.
    pub fn resolve(&self) -> Option<DynamicImage> {
        let payload = self.source.read();
        debug!(kind = payload.kind(), "Clipboard content");

        let strategies: [(&str, Strategy<S>); 3] = [
            ("single image", Self::single_image),
            ("item list", Self::first_listed_image),
            ("raw bitmap", Self::raw_bitmap),
        ];

        let found = strategies.iter().find_map(|(name, strategy)| {
            let image = strategy(self, &payload)?;
            info!(
                strategy = *name,
                width = image.width(),
                height = image.height(),
                "Found image in clipboard"
            );
            Some(image)
        });

        if found.is_none() {
            debug!("No image on clipboard");
        }
        found
    }

    fn single_image(&self, payload: &ClipboardPayload) -> Option<DynamicImage> {
        match payload {
            ClipboardPayload::Image(image) => Some(image.clone()),
            _ => None,
        }
    }

    /// First image item, otherwise the first decodable image path.
    fn first_listed_image(&self, payload: &ClipboardPayload) -> Option<DynamicImage> {
        let ClipboardPayload::Items(items) = payload else {
            return None;
        };
        debug!(count = items.len(), "Scanning clipboard items");

        let image = items.iter().find_map(|item| match item {
            ClipboardItem::Image(image) => Some(image.clone()),
            ClipboardItem::Path(_) => None,
        });
        if image.is_some() {
            return image;
        }

        items.iter().find_map(|item| {
            let ClipboardItem::Path(entry) = item else {
                return None;
            };
            let path = local_path(entry);
            if !has_image_extension(&path) {
                return None;
            }
            match open_image(&path) {
                Ok(image) => {
                    debug!(path = %path.display(), "Opened image from path");
                    Some(image)
                }
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "Failed to open image from path");
                    None
                }
            }
        })
    }

    fn raw_bitmap(&self, payload: &ClipboardPayload) -> Option<DynamicImage> {
        let bytes = match payload {
            ClipboardPayload::RawBitmap(bytes) => bytes.clone(),
            _ => self.source.read_raw_bitmap()?,
        };

        match decode_dib(&bytes) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(error = %e, bytes = bytes.len(), "Failed to convert clipboard bitmap to image");
                None
            }
        }
    }
}

/// Plain paths pass through. `file://` URIs are percent-decoded into a local path.
fn local_path(entry: &str) -> PathBuf {
    if !entry.starts_with("file:") {
        return PathBuf::from(entry);
    }
    match Url::parse(entry).map(|uri| uri.to_file_path()) {
        Ok(Ok(path)) => path,
        _ => {
            debug!(entry, "Not a local file URI");
            PathBuf::from(entry)
        }
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

fn open_image(path: &Path) -> Result<DynamicImage, ClipboardError> {
    Ok(image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?)
}

/// Copied files, via `clipboard-rs` (`arboard` has no file list reader).
fn read_file_list() -> Vec<String> {
    let files = ClipboardContext::new().and_then(|ctx| {
        if ctx.has(ContentFormat::Files) {
            ctx.get_files()
        } else {
            Ok(Vec::new())
        }
    });

    match files {
        Ok(files) => files,
        Err(e) => {
            debug!(error = %e, "No file list on clipboard");
            Vec::new()
        }
    }
}

/// The system clipboard via `arboard`, plus the raw DIB reader on Windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

impl ClipboardSource for SystemClipboard {
    fn read(&self) -> ClipboardPayload {
        let mut clipboard = match Clipboard::new() {
            Ok(cb) => cb,
            Err(e) => {
                warn!(error = %e, "Failed to initialize clipboard");
                return ClipboardPayload::Empty;
            }
        };

        match clipboard.get_image() {
            Ok(data) => {
                let (width, height) = (data.width, data.height);
                match RgbaImage::from_raw(width as u32, height as u32, data.bytes.into_owned()) {
                    Some(image) => return ClipboardPayload::Image(DynamicImage::ImageRgba8(image)),
                    None => warn!(width, height, "Clipboard image has inconsistent size"),
                }
            }
            Err(e) => debug!(error = %e, "No bitmap on clipboard"),
        }

        let files = read_file_list();
        if !files.is_empty() {
            return ClipboardPayload::Items(files.into_iter().map(ClipboardItem::Path).collect());
        }

        // A copied path is often plain text.
        if let Ok(text) = clipboard.get_text() {
            let items: Vec<ClipboardItem> = text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| ClipboardItem::Path(line.to_string()))
                .collect();
            if !items.is_empty() {
                return ClipboardPayload::Items(items);
            }
        }

        ClipboardPayload::Empty
    }

    fn read_raw_bitmap(&self) -> Option<Vec<u8>> {
        #[cfg(target_os = "windows")]
        {
            windows::read_dib()
        }

        #[cfg(not(target_os = "windows"))]
        {
            debug!("Raw bitmap clipboard format not available on this platform");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeClipboard {
        payload: ClipboardPayload,
        raw: Option<Vec<u8>>,
        raw_reads: AtomicUsize,
    }

    impl FakeClipboard {
        fn new(payload: ClipboardPayload) -> Self {
            Self {
                payload,
                raw: None,
                raw_reads: AtomicUsize::new(0),
            }
        }
    }

    impl ClipboardSource for FakeClipboard {
        fn read(&self) -> ClipboardPayload {
            self.payload.clone()
        }

        fn read_raw_bitmap(&self) -> Option<Vec<u8>> {
            self.raw_reads.fetch_add(1, Ordering::SeqCst);
            self.raw.clone()
        }
    }

    fn image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([10, 20, 30])))
    }

    fn encoded(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_single_image_is_returned_directly() {
        let resolver = ImageResolver::new(FakeClipboard::new(ClipboardPayload::Image(image(3, 2))));
        let found = resolver.resolve().unwrap();
        assert_eq!((found.width(), found.height()), (3, 2));
        assert_eq!(resolver.source.raw_reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_list_prefers_image_over_earlier_string() {
        let resolver = ImageResolver::new(FakeClipboard::new(ClipboardPayload::Items(vec![
            ClipboardItem::Path("notes.txt".to_string()),
            ClipboardItem::Image(image(5, 4)),
        ])));
        let found = resolver.resolve().unwrap();
        assert_eq!((found.width(), found.height()), (5, 4));
    }

    #[test]
    fn test_list_falls_back_to_decodable_image_path() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"not an image").unwrap();
        let good = dir.path().join("SHOT.PNG");
        std::fs::write(&good, encoded(&image(7, 6), ImageFormat::Png)).unwrap();

        let resolver = ImageResolver::new(FakeClipboard::new(ClipboardPayload::Items(vec![
            ClipboardItem::Path(dir.path().join("readme.md").to_string_lossy().into_owned()),
            ClipboardItem::Path(broken.to_string_lossy().into_owned()),
            ClipboardItem::Path(good.to_string_lossy().into_owned()),
        ])));
        let found = resolver.resolve().unwrap();
        assert_eq!((found.width(), found.height()), (7, 6));
    }

    #[test]
    fn test_file_uri_with_escaped_characters_is_opened() {
        let dir = tempfile::tempdir().unwrap();
        let shot = dir.path().join("my shot #1.png");
        std::fs::write(&shot, encoded(&image(5, 2), ImageFormat::Png)).unwrap();
        let uri = Url::from_file_path(&shot).unwrap().to_string();
        assert!(uri.contains("my%20shot%20%231.png"));

        let resolver = ImageResolver::new(FakeClipboard::new(ClipboardPayload::Items(vec![
            ClipboardItem::Path(uri),
        ])));
        let found = resolver.resolve().unwrap();
        assert_eq!((found.width(), found.height()), (5, 2));
    }

    #[test]
    fn test_local_path_leaves_plain_paths_alone() {
        assert_eq!(local_path("shots/a%20b.png"), PathBuf::from("shots/a%20b.png"));
    }

    #[test]
    fn test_raw_bitmap_fallback_used_when_nothing_else_matches() {
        let bmp = encoded(&image(4, 3), ImageFormat::Bmp);
        let mut clipboard = FakeClipboard::new(ClipboardPayload::Empty);
        clipboard.raw = Some(bmp[14..].to_vec());

        let resolver = ImageResolver::new(clipboard);
        let found = resolver.resolve().unwrap();
        assert_eq!((found.width(), found.height()), (4, 3));
        assert_eq!(resolver.source.raw_reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_raw_bitmap_payload_is_decoded() {
        let bmp = encoded(&image(2, 2), ImageFormat::Bmp);
        let resolver =
            ImageResolver::new(FakeClipboard::new(ClipboardPayload::RawBitmap(bmp[14..].to_vec())));
        assert!(resolver.resolve().is_some());
    }

    #[test]
    fn test_missing_fallback_yields_none() {
        let resolver = ImageResolver::new(FakeClipboard::new(ClipboardPayload::Items(vec![
            ClipboardItem::Path("hello world".to_string()),
        ])));
        assert!(resolver.resolve().is_none());
        assert_eq!(resolver.source.raw_reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_undecodable_raw_bitmap_yields_none() {
        let mut clipboard = FakeClipboard::new(ClipboardPayload::Empty);
        clipboard.raw = Some(vec![0u8; 64]);
        assert!(ImageResolver::new(clipboard).resolve().is_none());
    }

    #[test]
    fn test_image_extension_check_is_case_insensitive() {
        assert!(has_image_extension(Path::new("C:\\shots\\a.JPEG")));
        assert!(has_image_extension(Path::new("/tmp/b.tiff")));
        assert!(!has_image_extension(Path::new("/tmp/b.tif.txt")));
        assert!(!has_image_extension(Path::new("png")));
    }
}

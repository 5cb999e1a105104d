//! Decoding of raw device-independent bitmaps (the Windows `CF_DIB` clipboard format).
//!
//! A DIB is a BMP file without its 14-byte file header. We rebuild that header so the regular BMP
//! decoder can read it. Some producers put an already-encoded image (PNG, JPEG) behind the info
//! header instead of pixel rows, so when the BMP route fails the bytes after the 40-byte header are
//! decoded with format sniffing.

use image::{DynamicImage, ImageFormat};
use tracing::debug;

use super::ClipboardError;

const FILE_HEADER_LEN: usize = 14;
const INFO_HEADER_LEN: usize = 40;
const BI_BITFIELDS: u32 = 3;
const BITFIELD_MASKS_LEN: usize = 12;
const PALETTE_ENTRY_LEN: usize = 4;

/// Decodes clipboard DIB bytes into an image.
pub fn decode_dib(dib: &[u8]) -> Result<DynamicImage, ClipboardError> {
    let as_bitmap = dib_to_bmp(dib).and_then(|bmp| {
        image::load_from_memory_with_format(&bmp, ImageFormat::Bmp).map_err(ClipboardError::from)
    });

    match as_bitmap {
        Ok(image) => Ok(image),
        Err(e) => {
            debug!(error = %e, "Not a plain DIB, decoding data after the info header");
            let rest = dib.get(INFO_HEADER_LEN..).ok_or_else(|| {
                ClipboardError::InvalidDib(format!("only {} bytes", dib.len()))
            })?;
            Ok(image::load_from_memory(rest)?)
        }
    }
}

/// Prepends a BITMAPFILEHEADER to `dib`.
fn dib_to_bmp(dib: &[u8]) -> Result<Vec<u8>, ClipboardError> {
    let header_len = read_u32(dib, 0)? as usize;
    if header_len < INFO_HEADER_LEN || header_len > dib.len() {
        return Err(ClipboardError::InvalidDib(format!(
            "header size {header_len} for {} bytes",
            dib.len()
        )));
    }

    let bit_count = read_u16(dib, 14)?;
    let compression = read_u32(dib, 16)?;
    let colors_used = read_u32(dib, 32)? as usize;

    let masks_len = if header_len == INFO_HEADER_LEN && compression == BI_BITFIELDS {
        BITFIELD_MASKS_LEN
    } else {
        0
    };
    let palette_entries = match (colors_used, bit_count) {
        (0, bits @ 1..=8) => 1usize << bits,
        (used, _) => used,
    };

    let pixel_offset = FILE_HEADER_LEN + header_len + masks_len + palette_entries * PALETTE_ENTRY_LEN;
    let file_len = FILE_HEADER_LEN + dib.len();
    let to_u32 = |value: usize| {
        u32::try_from(value)
            .map_err(|_| ClipboardError::InvalidDib(format!("size {value} out of range")))
    };

    let mut bmp = Vec::with_capacity(file_len);
    bmp.extend_from_slice(b"BM");
    bmp.extend_from_slice(&to_u32(file_len)?.to_le_bytes());
    bmp.extend_from_slice(&[0; 4]);
    bmp.extend_from_slice(&to_u32(pixel_offset)?.to_le_bytes());
    bmp.extend_from_slice(dib);
    Ok(bmp)
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32, ClipboardError> {
    bytes
        .get(at..at + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| ClipboardError::InvalidDib(format!("truncated at offset {at}")))
}

fn read_u16(bytes: &[u8], at: usize) -> Result<u16, ClipboardError> {
    bytes
        .get(at..at + 2)
        .and_then(|b| b.try_into().ok())
        .map(u16::from_le_bytes)
        .ok_or_else(|| ClipboardError::InvalidDib(format!("truncated at offset {at}")))
}

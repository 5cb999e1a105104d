//! Windows-specific raw bitmap access.
//!
//! Screenshots taken with the Snipping Tool or PrintScreen sometimes only expose `CF_DIB`, which
//! `arboard` does not always convert. We read the raw bytes with `clipboard-win` and let the
//! resolver decode them.

use clipboard_win::{formats, get_clipboard, is_format_avail};
use tracing::{debug, warn};

/// Reads the `CF_DIB` clipboard format, if present.
pub(super) fn read_dib() -> Option<Vec<u8>> {
    if !is_format_avail(formats::CF_DIB) {
        debug!("CF_DIB not available on clipboard");
        return None;
    }

    match get_clipboard::<Vec<u8>, _>(formats::RawData(formats::CF_DIB)) {
        Ok(data) => {
            debug!(bytes = data.len(), "Read CF_DIB from clipboard");
            Some(data)
        }
        Err(e) => {
            warn!(error = %e, "Win32 clipboard access error");
            None
        }
    }
}

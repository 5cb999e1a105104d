//! User-facing message boxes.

/// Title of lookup result dialogs.
pub const RESULT_TITLE: &str = "Item Lookup Result";
/// Title of fatal error dialogs.
pub const ERROR_TITLE: &str = "Error";

/// Shows a message and blocks until the user dismisses it.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

#[cfg(feature = "desktop")]
pub use dialog::DialogNotifier;

#[cfg(feature = "desktop")]
mod dialog {
    use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
    use tracing::debug;

    use super::{Notifier, ERROR_TITLE};

    /// Native message dialog through the Tauri dialog plugin. Must not be used from the main
    /// thread, `blocking_show` waits on the event loop.
    pub struct DialogNotifier<R: tauri::Runtime> {
        app: tauri::AppHandle<R>,
    }

    impl<R: tauri::Runtime> DialogNotifier<R> {
        pub fn new(app: tauri::AppHandle<R>) -> Self {
            Self { app }
        }
    }

    impl<R: tauri::Runtime> Notifier for DialogNotifier<R> {
        fn notify(&self, title: &str, message: &str) {
            let kind = if title == ERROR_TITLE {
                MessageDialogKind::Error
            } else {
                MessageDialogKind::Info
            };
            self.app
                .dialog()
                .message(message)
                .title(title)
                .kind(kind)
                .blocking_show();
            debug!(title, "Dialog dismissed");
        }
    }
}

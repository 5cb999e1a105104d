//! Execution of hotkey-triggered lookups.
//!
//! A run goes from clipboard to dialog on a worker thread. Only one run is in flight at a time:
//! presses that arrive while a run (including its dialog) is active are dropped. A panic inside a
//! run is reported as a critical error and ends the process.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error};

use crate::notify::{Notifier, ERROR_TITLE, RESULT_TITLE};
use crate::pipeline::LookupPipeline;
use crate::system::{ClipboardSource, TextRecognizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Another run was in progress.
    Skipped,
    /// The run panicked; the user has been told and the process should exit.
    Crashed,
}

pub struct LookupRunner<C, R, N> {
    pipeline: LookupPipeline<C, R>,
    notifier: N,
    busy: AtomicBool,
}

/// Clears the busy flag when a run ends, including by unwinding.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<C, R, N> LookupRunner<C, R, N>
where
    C: ClipboardSource,
    R: TextRecognizer,
    N: Notifier,
{
    pub fn new(pipeline: LookupPipeline<C, R>, notifier: N) -> Self {
        Self {
            pipeline,
            notifier,
            busy: AtomicBool::new(false),
        }
    }

    pub fn pipeline(&self) -> &LookupPipeline<C, R> {
        &self.pipeline
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Runs the clipboard lookup and shows its result. Blocks until the dialog is dismissed.
    pub fn run_clipboard_lookup(&self, source: &'static str) -> RunStatus {
        if self.busy.swap(true, Ordering::AcqRel) {
            debug!(source, "Lookup already running, ignoring trigger");
            return RunStatus::Skipped;
        }
        let _guard = BusyGuard(&self.busy);

        match panic::catch_unwind(AssertUnwindSafe(|| self.pipeline.process_clipboard())) {
            Ok(outcome) => {
                self.notifier.notify(RESULT_TITLE, &outcome.to_string());
                RunStatus::Completed
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(source, error = %message, "Critical error during lookup");
                self.notifier
                    .notify(ERROR_TITLE, &format!("Critical error: {message}"));
                RunStatus::Crashed
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(feature = "desktop")]
pub use desktop::execute_lookup;

#[cfg(feature = "desktop")]
mod desktop {
    use std::sync::Arc;

    use tracing::warn;

    use super::{LookupRunner, RunStatus};
    use crate::notify::Notifier;
    use crate::system::{ClipboardSource, TextRecognizer};

    /// Runs a clipboard lookup on a worker thread. Called from the global shortcut handler.
    pub fn execute_lookup<R, C, T, N>(
        app: &tauri::AppHandle<R>,
        runner: &Arc<LookupRunner<C, T, N>>,
        source: &'static str,
    ) where
        R: tauri::Runtime,
        C: ClipboardSource + 'static,
        T: TextRecognizer + 'static,
        N: Notifier + 'static,
    {
        let app = app.clone();
        let runner = Arc::clone(runner);
        std::thread::spawn(move || {
            if runner.run_clipboard_lookup(source) == RunStatus::Crashed {
                warn!(source, "Exiting after critical error");
                app.exit(1);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::ItemDatabase;
    use crate::system::ClipboardPayload;
    use image::{DynamicImage, RgbImage};
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};

    struct ImageClipboard;

    impl ClipboardSource for ImageClipboard {
        fn read(&self) -> ClipboardPayload {
            ClipboardPayload::Image(DynamicImage::ImageRgb8(RgbImage::new(2, 2)))
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<(String, String)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, title: &str, message: &str) {
            self.messages
                .lock()
                .unwrap()
                .push((title.to_string(), message.to_string()));
        }
    }

    struct FixedOcr(&'static str);

    impl TextRecognizer for FixedOcr {
        fn recognize(&self, _image: &DynamicImage) -> String {
            self.0.to_string()
        }
    }

    struct PanickingOcr;

    impl TextRecognizer for PanickingOcr {
        fn recognize(&self, _image: &DynamicImage) -> String {
            panic!("engine exploded");
        }
    }

    /// Signals when recognition starts, then waits to be released.
    struct GatedOcr {
        entered: Mutex<mpsc::Sender<()>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl TextRecognizer for GatedOcr {
        fn recognize(&self, _image: &DynamicImage) -> String {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            String::new()
        }
    }

    fn runner<R: TextRecognizer>(ocr: R) -> LookupRunner<ImageClipboard, R, RecordingNotifier> {
        let db = ItemDatabase::new("/nonexistent/lerc-test/items.csv");
        LookupRunner::new(
            LookupPipeline::new(ImageClipboard, ocr, db),
            RecordingNotifier::default(),
        )
    }

    #[test]
    fn test_completed_run_shows_result() {
        let runner = runner(FixedOcr("plain words"));
        assert_eq!(runner.run_clipboard_lookup("test"), RunStatus::Completed);

        let messages = runner.notifier.messages.lock().unwrap();
        assert_eq!(
            messages.as_slice(),
            &[(
                RESULT_TITLE.to_string(),
                "No capitalized item name found in the image.".to_string()
            )]
        );
    }

    #[test]
    fn test_panic_is_reported_as_critical_error() {
        let runner = runner(PanickingOcr);
        assert_eq!(runner.run_clipboard_lookup("test"), RunStatus::Crashed);

        let messages = runner.notifier.messages.lock().unwrap();
        assert_eq!(messages[0].0, ERROR_TITLE);
        assert_eq!(messages[0].1, "Critical error: engine exploded");
        assert!(!runner.busy.load(Ordering::Acquire));
    }

    #[test]
    fn test_trigger_during_run_is_skipped() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let runner = Arc::new(runner(GatedOcr {
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        }));

        let first = {
            let runner = Arc::clone(&runner);
            std::thread::spawn(move || runner.run_clipboard_lookup("first"))
        };
        entered_rx.recv().unwrap();

        assert_eq!(runner.run_clipboard_lookup("second"), RunStatus::Skipped);

        release_tx.send(()).unwrap();
        assert_eq!(first.join().unwrap(), RunStatus::Completed);
        assert_eq!(runner.notifier.messages.lock().unwrap().len(), 1);
        assert!(!runner.busy.load(Ordering::Acquire));
    }
}

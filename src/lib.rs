//! LERC: press a hotkey after copying a screenshot of an item tooltip, get the item's reroll
//! chance from a local CSV table.
//!
//! The lookup pipeline (clipboard → OCR → item name → table) lives in [`pipeline`] and builds
//! without the desktop shell. The `desktop` feature adds the Tauri app: global hotkey, message
//! dialogs, and the composition root in [`run`].

pub mod actions;
pub mod config;
pub mod database;
#[cfg(feature = "desktop")]
mod hotkeys;
mod logging;
pub mod notify;
pub mod paths;
pub mod pipeline;
pub mod system;
pub mod text_filter;

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::database::ItemDatabase;
use crate::pipeline::{LookupOutcome, LookupPipeline};
use crate::system::ocr::TESSERACT_DOWNLOAD_URL;
use crate::system::{locate_tesseract, OcrError, SystemClipboard, TesseractOcr};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(
        "Tesseract OCR not found. Please install Tesseract OCR from:\n{url}\n\nAfter installation, run LERC again."
    )]
    TesseractMissing { url: &'static str },
    #[error("Tesseract OCR test failed: {0}\n\nPlease make sure Tesseract is properly installed.")]
    TesseractBroken(#[source] OcrError),
    #[error("Hotkey setup failed: {0}")]
    Hotkey(String),
}

/// Loads the config and starts logging. Config problems fall back to defaults.
pub fn load_settings() -> AppConfig {
    let loaded = config::load_config();
    let settings = loaded.as_ref().cloned().unwrap_or_default();
    logging::init(settings.log_level);

    match loaded {
        Ok(_) => debug!(?settings, "Settings loaded"),
        Err(e) => warn!(error = %e, "Failed to load config, using defaults"),
    }
    match config::write_default_if_missing() {
        Ok(Some(path)) => info!(path = %path.display(), "Wrote default config"),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Could not write default config"),
    }
    settings
}

/// Finds Tesseract and checks that it runs. Failure here is fatal for the app.
pub fn init_ocr(settings: &AppConfig) -> Result<TesseractOcr, StartupError> {
    let command = locate_tesseract(settings.tesseract_cmd.as_deref()).ok_or(
        StartupError::TesseractMissing {
            url: TESSERACT_DOWNLOAD_URL,
        },
    )?;
    let ocr = TesseractOcr::new(settings.ocr_config(command));
    ocr.version().map_err(StartupError::TesseractBroken)?;
    Ok(ocr)
}

/// Looks up the item shown in an image file. An unreadable file is reported as "no image".
pub fn lookup_image_file(settings: &AppConfig, path: &Path) -> Result<LookupOutcome, StartupError> {
    let ocr = init_ocr(settings)?;
    let pipeline = LookupPipeline::new(
        SystemClipboard,
        ocr,
        ItemDatabase::new(&settings.database_path),
    );

    let image = match image::open(path) {
        Ok(image) => Some(image),
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Failed to open image");
            None
        }
    };
    Ok(pipeline.process_image(image.as_ref()))
}

#[cfg(feature = "desktop")]
pub use desktop::run;

#[cfg(feature = "desktop")]
mod desktop {
    use std::sync::Arc;

    use tauri::Manager;
    use tauri_plugin_global_shortcut::{Shortcut, ShortcutEvent};
    use tauri_plugin_opener::OpenerExt;
    use tracing::{error, info, warn};

    use super::{init_ocr, load_settings, StartupError, TESSERACT_DOWNLOAD_URL};
    use crate::actions::{self, LookupRunner};
    use crate::config::AppConfig;
    use crate::database::ItemDatabase;
    use crate::hotkeys::{self, LookupHotkey};
    use crate::notify::{DialogNotifier, Notifier, ERROR_TITLE, RESULT_TITLE};
    use crate::pipeline::LookupPipeline;
    use crate::system::{SystemClipboard, TesseractOcr};

    type DesktopRunner<R> = LookupRunner<SystemClipboard, TesseractOcr, DialogNotifier<R>>;

    /// Managed state: the runner and the shortcut that triggers it.
    struct LookupState<R: tauri::Runtime> {
        runner: Arc<DesktopRunner<R>>,
        hotkey: LookupHotkey,
    }

    fn handle_shortcut<R: tauri::Runtime>(
        app: &tauri::AppHandle<R>,
        shortcut: &Shortcut,
        event: ShortcutEvent,
    ) {
        let Some(state) = app.try_state::<LookupState<R>>() else {
            warn!("Hotkey pressed before startup finished");
            return;
        };
        if hotkeys::is_lookup_press(&state.hotkey.shortcut, shortcut, event.state()) {
            actions::execute_lookup(app, &state.runner, "hotkey");
        }
    }

    /// Shows `error` and exits with status 1. Runs off the main thread because dialogs block.
    fn fail_startup<R: tauri::Runtime>(app: &tauri::AppHandle<R>, error: StartupError) {
        error!(error = %error, "Startup failed");
        let app = app.clone();
        std::thread::spawn(move || {
            DialogNotifier::new(app.clone()).notify(ERROR_TITLE, &error.to_string());
            if matches!(error, StartupError::TesseractMissing { .. }) {
                if let Err(e) = app.opener().open_url(TESSERACT_DOWNLOAD_URL, None::<&str>) {
                    warn!(error = %e, "Failed to open Tesseract download page");
                }
            }
            app.exit(1);
        });
    }

    fn setup<R: tauri::Runtime>(app: &tauri::AppHandle<R>, settings: &AppConfig) {
        let ocr = match init_ocr(settings) {
            Ok(ocr) => ocr,
            Err(e) => return fail_startup(app, e),
        };

        let database = ItemDatabase::new(&settings.database_path);
        let database_present = database.verify();

        let hotkey = match hotkeys::register_lookup_hotkey(app, &settings.hotkey) {
            Ok(hotkey) => hotkey,
            Err(e) => return fail_startup(app, StartupError::Hotkey(e)),
        };
        let label = hotkey.label.clone();

        let runner = Arc::new(LookupRunner::new(
            LookupPipeline::new(SystemClipboard, ocr, database),
            DialogNotifier::new(app.clone()),
        ));
        app.manage(LookupState {
            runner: Arc::clone(&runner),
            hotkey,
        });
        info!(shortcut = %label, "Waiting for hotkey");

        std::thread::spawn(move || {
            if !database_present {
                let path = runner.pipeline().database().path().display().to_string();
                runner.notifier().notify(
                    RESULT_TITLE,
                    &format!("Database file not found: {path}\nPlease ensure the file exists."),
                );
            }
            runner.notifier().notify(
                RESULT_TITLE,
                &format!("LERC STARTED.\n\n{label}: Process image from clipboard\n"),
            );
        });
    }

    pub fn run() {
        let settings = load_settings();

        let shortcut_plugin = tauri_plugin_global_shortcut::Builder::new()
            .with_handler(|app, shortcut, event| handle_shortcut(app, shortcut, event))
            .build();

        let app = match tauri::Builder::default()
            .plugin(tauri_plugin_opener::init())
            .plugin(tauri_plugin_dialog::init())
            .plugin(shortcut_plugin)
            .setup(move |app| {
                setup(app.handle(), &settings);
                Ok(())
            })
            .build(tauri::generate_context!())
        {
            Ok(app) => app,
            Err(e) => {
                error!(error = %e, "Error while building Tauri application");
                std::process::exit(1);
            }
        };

        // No windows: keep running until an explicit exit code is requested.
        app.run(|_app, event| {
            if let tauri::RunEvent::ExitRequested { code: None, api, .. } = event {
                api.prevent_exit();
            }
        });
    }
}

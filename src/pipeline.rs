//! Image → text → item name → database row → user message.
//!
//! Every run ends in exactly one [`LookupOutcome`]; its `Display` impl is the text shown to the
//! user. Failures inside a stage never escape: they are logged and mapped to an outcome.

use std::fmt;

use image::DynamicImage;
use tracing::{error, info, warn};

use crate::database::{ItemDatabase, LookupResult};
use crate::system::{ClipboardSource, ImageResolver, TextRecognizer};
use crate::text_filter::filter_capitalized_words;

/// Rarity value that marks an ordinary item.
pub const COMMON_RARITY: &str = "0% (Common)";
/// Rarity values meaning the item has no reroll weight (hyphen, en dash, em dash).
pub const NO_WEIGHT_RARITIES: [&str; 3] = ["-", "\u{2013}", "\u{2014}"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    NoClipboardImage,
    NoImage,
    NoText,
    NoItemName,
    Found { item: String, rarity: String },
    NotFound { item: String },
    DatabaseError { item: String, message: String },
}

impl LookupOutcome {
    /// The item name that was searched, once one exists.
    pub fn item(&self) -> Option<&str> {
        match self {
            Self::Found { item, .. } | Self::NotFound { item } | Self::DatabaseError { item, .. } => {
                Some(item)
            }
            _ => None,
        }
    }
}

impl fmt::Display for LookupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoClipboardImage => {
                write!(f, "No image found on clipboard. Please copy an image first.")
            }
            Self::NoImage => write!(f, "No valid image provided."),
            Self::NoText => write!(f, "No text could be extracted from the image."),
            Self::NoItemName => write!(f, "No capitalized item name found in the image."),
            Self::Found { item, rarity } => write!(f, "Item: {item}\n{}", rarity_text(rarity)),
            Self::NotFound { item } => write!(f, "Item: {item}\n(Item not found in database)"),
            Self::DatabaseError { item, message } => {
                write!(f, "Item: {item}\nError reading database: {message}")
            }
        }
    }
}

/// Renders a rarity column value, special-casing the common and no-weight markers. Markers
/// must match exactly; any other value is shown as written.
pub fn rarity_text(rarity: &str) -> String {
    if rarity == COMMON_RARITY {
        "Nothing special (Common item)".to_string()
    } else if NO_WEIGHT_RARITIES.contains(&rarity) {
        "No weight assigned".to_string()
    } else {
        format!("Reroll Chance: {rarity}")
    }
}

pub struct LookupPipeline<C, R> {
    resolver: ImageResolver<C>,
    recognizer: R,
    database: ItemDatabase,
}

impl<C: ClipboardSource, R: TextRecognizer> LookupPipeline<C, R> {
    pub fn new(clipboard: C, recognizer: R, database: ItemDatabase) -> Self {
        Self {
            resolver: ImageResolver::new(clipboard),
            recognizer,
            database,
        }
    }

    pub fn database(&self) -> &ItemDatabase {
        &self.database
    }

    /// Runs the lookup on the current clipboard image.
    pub fn process_clipboard(&self) -> LookupOutcome {
        info!("Processing clipboard image");
        match self.resolver.resolve() {
            Some(image) => self.process_image(Some(&image)),
            None => {
                warn!("No image found on clipboard");
                LookupOutcome::NoClipboardImage
            }
        }
    }

    /// Runs the lookup on an image obtained elsewhere.
    pub fn process_image(&self, image: Option<&DynamicImage>) -> LookupOutcome {
        let Some(image) = image else {
            return LookupOutcome::NoImage;
        };

        let text = self.recognizer.recognize(image);
        if text.trim().is_empty() {
            warn!("No text extracted from image");
            return LookupOutcome::NoText;
        }
        info!(text = %text, "OCR extracted text");

        let item = filter_capitalized_words(&text);
        info!(item = %item, "Filtered text");
        if item.is_empty() {
            return LookupOutcome::NoItemName;
        }

        let outcome = match self.database.lookup(&item) {
            Ok(LookupResult::Found(rarity)) => LookupOutcome::Found { item, rarity },
            Ok(LookupResult::NotFound) => LookupOutcome::NotFound { item },
            Err(e) => {
                error!(error = %e, path = %self.database.path().display(), "Database read error");
                LookupOutcome::DatabaseError {
                    item,
                    message: e.to_string(),
                }
            }
        };
        info!(item = outcome.item().unwrap_or_default(), "Processed item");
        outcome
    }
}

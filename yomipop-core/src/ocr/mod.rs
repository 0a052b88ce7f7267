//! OCR data model and provider interface.
//!
//! A provider turns a captured [`Frame`] into a list of [`Paragraph`]s with
//! image-normalized geometry. Providers are pluggable: the pipeline only
//! depends on the [`OcrProvider`] trait.

pub mod lens;
pub mod postprocess;

use crate::capture::Frame;
use crate::geometry::BoundingBox;

/// Errors a provider can run into while talking to its backend.
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("protobuf decode error")]
    Decode(#[from] prost::DecodeError),

    #[error("image encode error")]
    Image(#[from] image::ImageError),

    #[error("invalid frame: {0}")]
    Frame(String),
}

/// A text fragment recognized by the OCR, one or more characters long,
/// followed by an optional separator (usually empty for Japanese).
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub separator: String,
    pub bounds: BoundingBox,
}

/// A block of text composed of words.
///
/// `full_text` is the concatenation of each word's text plus its separator,
/// in order. `vertical` is true for top-to-bottom writing.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub full_text: String,
    pub words: Vec<Word>,
    pub bounds: BoundingBox,
    pub vertical: bool,
}

impl Paragraph {
    /// Build a paragraph from its words, reconstructing `full_text`.
    pub fn from_words(words: Vec<Word>, bounds: BoundingBox, vertical: bool) -> Self {
        let mut full_text = String::new();
        for word in &words {
            full_text.push_str(&word.text);
            full_text.push_str(&word.separator);
        }
        Self {
            full_text,
            words,
            bounds,
            vertical,
        }
    }
}

/// An OCR backend.
///
/// `scan` returns `None` when the provider itself failed (network error,
/// decode failure); an empty list means the scan succeeded but found no
/// text. Returned paragraphs must use normalized coordinates and must set
/// `vertical` correctly, or at least give vertical lines boxes with
/// `height > width`.
pub trait OcrProvider: Send {
    /// User-facing provider name, for logs and menus.
    fn name(&self) -> &str;

    fn scan(&self, frame: &Frame) -> Option<Vec<Paragraph>>;
}

/// Fixed-output provider for tests and offline development: returns the
/// same paragraph list for every frame.
pub struct StaticOcr {
    paragraphs: Vec<Paragraph>,
}

impl StaticOcr {
    pub fn new(paragraphs: Vec<Paragraph>) -> Self {
        Self { paragraphs }
    }
}

impl OcrProvider for StaticOcr {
    fn name(&self) -> &str {
        "static"
    }

    fn scan(&self, _frame: &Frame) -> Option<Vec<Paragraph>> {
        Some(self.paragraphs.clone())
    }
}

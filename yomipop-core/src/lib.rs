//! yomipop-core: screen-hover Japanese dictionary engine.
//!
//! Capture a screen region, OCR it, find the character under the cursor,
//! deconjugate and look the word up in a compiled JMdict-derived
//! dictionary. The GUI (popup, tray, region selector) and the OS input and
//! capture backends live outside this crate, behind the `InputSource`,
//! `ScreenSource` and `OcrProvider` traits.

pub mod capture;
pub mod config;
pub mod deconjugate;
pub mod dict;
pub mod geometry;
pub mod hit_scan;
pub mod jp;
pub mod lookup;
pub mod ocr;
pub mod pipeline;

pub use capture::{CaptureError, Frame, PixelRect, RegionSelection, ScreenSource};
pub use config::{ConfigHandle, Hotkey, QualityMode, Settings};
pub use deconjugate::{Deconjugator, Form, Rule, RuleKind};
pub use dict::build::DictionaryBuilder;
pub use dict::{DictError, Dictionary, Entry, KanjiEntry};
pub use geometry::BoundingBox;
pub use hit_scan::{Hit, hit_scan};
pub use lookup::{LookupEngine, LookupEntry, LookupSense, MAX_RESULTS};
pub use ocr::{OcrError, OcrProvider, Paragraph, StaticOcr, Word};
pub use pipeline::{InputSnapshot, InputSource, Pipeline, PipelineHandle};

//! Typed dictionary records.
//!
//! The JMdict source is loose JSON; everything is decoded once at build
//! time into these records. Tag-like strings (`pos`, `misc`, `inf`) are
//! normalized on the way in: a leading `&` and trailing `;` are stripped,
//! so runtime code compares plain tags like `uk` or `v1`.

use serde::Deserialize;

/// A kanji writing of an entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KanjiElement {
    pub text: String,
    /// Orthography notes, e.g. `iK` (irregular kanji), `oK` (outdated).
    pub info: Vec<String>,
    /// Corpus-frequency markers, e.g. `news1`, `ichi1`.
    pub priority: Vec<String>,
    /// Readings this writing is restricted to; empty means all.
    pub restrictions: Vec<String>,
}

/// A kana reading of an entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingElement {
    pub text: String,
    /// Orthography notes, e.g. `ik`, `ok`, `io`.
    pub info: Vec<String>,
    pub priority: Vec<String>,
    /// Writings this reading applies to; empty means all.
    pub restrictions: Vec<String>,
}

/// One sense of an entry: glosses plus grammar and usage tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sense {
    pub glosses: Vec<String>,
    pub pos: Vec<String>,
    pub misc: Vec<String>,
    /// Writings/readings this sense is restricted to; unused by lookup but
    /// preserved from the source.
    pub restrictions: Vec<String>,
}

/// A dictionary entry.
///
/// Invariant after build: at least one writing (kanji or reading) and at
/// least one sense with a non-empty gloss list.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub seq: u32,
    pub kanji: Vec<KanjiElement>,
    pub readings: Vec<ReadingElement>,
    pub senses: Vec<Sense>,
}

impl Entry {
    pub fn has_kanji(&self) -> bool {
        !self.kanji.is_empty()
    }

    /// Every misc tag carried by any sense.
    pub fn misc_tags(&self) -> impl Iterator<Item = &str> {
        self.senses
            .iter()
            .flat_map(|s| s.misc.iter())
            .map(String::as_str)
    }

    /// `uk`/`ek`: usually or exclusively written in kana.
    pub fn prefers_kana(&self) -> bool {
        self.misc_tags().any(|t| t == "uk" || t == "ek")
    }

    /// `uK`/`eK`: usually or exclusively written in kanji.
    pub fn prefers_kanji(&self) -> bool {
        self.misc_tags().any(|t| t == "uK" || t == "eK")
    }

    /// Any writing or reading carries a corpus-frequency marker.
    pub fn has_priority_flag(&self) -> bool {
        self.kanji.iter().any(|k| !k.priority.is_empty())
            || self.readings.iter().any(|r| !r.priority.is_empty())
    }

    /// True when every sense carries at least one of the given misc tags.
    pub fn all_senses_tagged(&self, tags: &[&str]) -> bool {
        if self.senses.is_empty() {
            return false;
        }
        self.senses
            .iter()
            .all(|s| s.misc.iter().any(|m| tags.contains(&m.as_str())))
    }

    /// Whether the chosen (reading, writing) pair is flagged irregular in
    /// the element info lists.
    pub fn is_irregular(&self, reading: &str, writing: &str) -> bool {
        const READING_FLAGS: [&str; 3] = ["ik", "ok", "io"];
        const WRITING_FLAGS: [&str; 2] = ["iK", "oK"];

        if self
            .readings
            .iter()
            .filter(|r| r.text == reading)
            .any(|r| r.info.iter().any(|i| READING_FLAGS.contains(&i.as_str())))
        {
            return true;
        }
        self.kanji
            .iter()
            .filter(|k| k.text == writing)
            .any(|k| k.info.iter().any(|i| WRITING_FLAGS.contains(&i.as_str())))
    }
}

/// A kanji-dictionary record (kanjidic-derived).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct KanjiEntry {
    #[serde(default)]
    pub literal: String,
    #[serde(default)]
    pub onyomi: Vec<String>,
    #[serde(default)]
    pub kunyomi: Vec<String>,
    #[serde(default)]
    pub meanings: Vec<String>,
    #[serde(default)]
    pub stroke_count: u16,
    #[serde(default)]
    pub jlpt: u8,
    #[serde(default)]
    pub grade: u8,
    #[serde(default)]
    pub frequency: u16,
}

/// Strip the entity punctuation JMdict uses around tags: `&uk;` -> `uk`.
pub(crate) fn strip_tag(tag: &str) -> String {
    tag.trim_matches(|c| c == '&' || c == ';').to_string()
}

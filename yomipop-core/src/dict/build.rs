//! Offline dictionary build: JMdict JSON shards, deconjugator rules,
//! priority table and an optional kanji dictionary go in, a compiled
//! [`Dictionary`] comes out.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::entry::{Entry, KanjiElement, KanjiEntry, ReadingElement, Sense, strip_tag};
use super::{DictError, Dictionary, PriorityMap};
use crate::deconjugate::{Deconjugator, Rule};

type Result<T> = std::result::Result<T, DictError>;

// JSON deserialization types (JMdict shard shape)

#[derive(Deserialize)]
struct RawEntry {
    seq: u32,
    #[serde(default)]
    k_ele: Vec<RawKanji>,
    #[serde(default)]
    r_ele: Vec<RawReading>,
    #[serde(default)]
    sense: Vec<RawSense>,
}

#[derive(Deserialize)]
struct RawKanji {
    keb: String,
    #[serde(default)]
    inf: Vec<String>,
    #[serde(default)]
    pri: Vec<String>,
    #[serde(default)]
    restr: Vec<String>,
}

#[derive(Deserialize)]
struct RawReading {
    reb: String,
    #[serde(default)]
    inf: Vec<String>,
    #[serde(default)]
    pri: Vec<String>,
    #[serde(default)]
    restr: Vec<String>,
}

#[derive(Deserialize)]
struct RawSense {
    #[serde(default)]
    gloss: Vec<String>,
    /// Absent pos inherits the previous sense's pos.
    pos: Option<Vec<String>>,
    #[serde(default)]
    misc: Vec<String>,
    #[serde(default)]
    restr: Vec<String>,
}

/// Accumulates imported data and produces the compiled dictionary.
#[derive(Default)]
pub struct DictionaryBuilder {
    entries: Vec<Entry>,
    kanji_index: HashMap<String, Vec<u32>>,
    kana_index: HashMap<String, Vec<u32>>,
    rules: Vec<Rule>,
    priority: PriorityMap,
    kanji: HashMap<String, KanjiEntry>,
}

impl DictionaryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import JMdict JSON shards. Shards are processed in lexicographic
    /// path order so the entry order (and thus entry indices) is stable
    /// across builds. Returns the number of entries kept.
    pub fn import_jmdict(&mut self, paths: &[PathBuf]) -> Result<usize> {
        let mut sorted = paths.to_vec();
        sorted.sort();

        let before = self.entries.len();
        for path in &sorted {
            let json = fs::read_to_string(path)?;
            let kept = self.add_jmdict_json(&json)?;
            debug!("imported {} entries from {:?}", kept, path);
        }
        Ok(self.entries.len() - before)
    }

    /// Import one JMdict JSON document (an array of entries).
    pub fn add_jmdict_json(&mut self, json: &str) -> Result<usize> {
        let raw_entries: Vec<RawEntry> = serde_json::from_str(json)?;
        let before = self.entries.len();
        for raw in raw_entries {
            self.add_entry(raw);
        }
        Ok(self.entries.len() - before)
    }

    fn add_entry(&mut self, raw: RawEntry) {
        let mut senses = Vec::new();
        let mut last_pos: Vec<String> = Vec::new();
        for sense in raw.sense {
            let pos = match sense.pos {
                Some(pos) => pos.iter().map(|p| strip_tag(p)).collect::<Vec<_>>(),
                None => last_pos.clone(),
            };
            last_pos = pos.clone();
            if sense.gloss.is_empty() {
                continue;
            }
            senses.push(Sense {
                glosses: sense.gloss,
                pos,
                misc: sense.misc.iter().map(|m| strip_tag(m)).collect(),
                restrictions: sense.restr,
            });
        }

        // Entries with no writings or no glossed senses are useless for
        // lookup and are dropped.
        if (raw.k_ele.is_empty() && raw.r_ele.is_empty()) || senses.is_empty() {
            return;
        }

        let kanji: Vec<KanjiElement> = raw
            .k_ele
            .into_iter()
            .map(|k| KanjiElement {
                text: k.keb,
                info: k.inf.iter().map(|i| strip_tag(i)).collect(),
                priority: k.pri,
                restrictions: k.restr,
            })
            .collect();
        let readings: Vec<ReadingElement> = raw
            .r_ele
            .into_iter()
            .map(|r| ReadingElement {
                text: r.reb,
                info: r.inf.iter().map(|i| strip_tag(i)).collect(),
                priority: r.pri,
                restrictions: r.restr,
            })
            .collect();

        let index = self.entries.len() as u32;
        for k in &kanji {
            self.kanji_index.entry(k.text.clone()).or_default().push(index);
        }
        for r in &readings {
            self.kana_index.entry(r.text.clone()).or_default().push(index);
        }

        self.entries.push(Entry {
            seq: raw.seq,
            kanji,
            readings,
            senses,
        });
    }

    /// Import the deconjugator rule file (JSON array; non-object elements
    /// are ignored). Returns the number of rules.
    pub fn import_deconjugator(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let json = fs::read_to_string(path)?;
        self.rules = Deconjugator::parse_rules(&json)?;
        Ok(self.rules.len())
    }

    /// Import the priority table: a JSON array of
    /// `[written_form, reading, bonus]` triples. An empty written form
    /// makes the bonus apply to the reading alone.
    pub fn import_priority(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let json = fs::read_to_string(path)?;
        let triples: Vec<(String, String, i32)> = serde_json::from_str(&json)?;
        for (written, reading, bonus) in triples {
            self.priority.insert((written, reading), bonus);
        }
        Ok(self.priority.len())
    }

    /// Import the optional kanji dictionary: a JSON map from literal to a
    /// kanji record.
    pub fn import_kanjidic(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let json = fs::read_to_string(path)?;
        let raw: HashMap<String, KanjiEntry> = serde_json::from_str(&json)?;
        for (literal, mut entry) in raw {
            if entry.literal.is_empty() {
                entry.literal = literal.clone();
            }
            self.kanji.insert(literal, entry);
        }
        Ok(self.kanji.len())
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn finish(self) -> Dictionary {
        Dictionary::from_parts(
            self.entries,
            self.kanji_index,
            self.kana_index,
            self.rules,
            self.priority,
            self.kanji,
        )
    }
}

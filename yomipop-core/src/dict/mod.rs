//! The compiled dictionary artifact.
//!
//! A [`Dictionary`] is built offline from JMdict JSON shards, a
//! deconjugator rule file and a priority table (see [`build`]), saved as a
//! single binary blob, and loaded once at process start into an immutable
//! structure shared by reference. It is never mutated at runtime.

pub mod build;
pub mod entry;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::Instant;

use tracing::info;

use crate::deconjugate::{Rule, RuleKind};
use crate::jp::is_kana_only;
pub use entry::{Entry, KanjiElement, KanjiEntry, ReadingElement, Sense};

/// Errors that can occur during dictionary operations.
#[derive(Debug, thiserror::Error)]
pub enum DictError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON parse error")]
    Json(#[from] serde_json::Error),

    #[error("invalid dictionary format: {0}")]
    Format(String),
}

type Result<T> = std::result::Result<T, DictError>;

/// Frequency bonus table keyed by (written-form-or-empty, reading).
pub type PriorityMap = HashMap<(String, String), i32>;

const MAGIC: &[u8; 4] = b"YMPD";
const VERSION: u32 = 1;

const MAX_ENTRIES: usize = 10_000_000;
const MAX_KEYS: usize = 20_000_000;

/// The compiled, immutable dictionary.
pub struct Dictionary {
    entries: Vec<Entry>,
    /// kanji writing -> indices into `entries`
    kanji_index: HashMap<String, Vec<u32>>,
    /// kana reading -> indices into `entries`
    kana_index: HashMap<String, Vec<u32>>,
    rules: Vec<Rule>,
    priority: PriorityMap,
    kanji: HashMap<String, KanjiEntry>,
}

impl Dictionary {
    pub(crate) fn from_parts(
        entries: Vec<Entry>,
        kanji_index: HashMap<String, Vec<u32>>,
        kana_index: HashMap<String, Vec<u32>>,
        rules: Vec<Rule>,
        priority: PriorityMap,
        kanji: HashMap<String, KanjiEntry>,
    ) -> Self {
        Self {
            entries,
            kanji_index,
            kana_index,
            rules,
            priority,
            kanji,
        }
    }

    /// An empty dictionary; every lookup against it yields nothing.
    pub fn empty() -> Self {
        Self::from_parts(
            Vec::new(),
            HashMap::new(),
            HashMap::new(),
            Vec::new(),
            HashMap::new(),
            HashMap::new(),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: u32) -> &Entry {
        &self.entries[index as usize]
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn kanji_count(&self) -> usize {
        self.kanji.len()
    }

    /// Entry indices for a surface string, selected from the kana index
    /// when the string contains no kanji, from the kanji index otherwise.
    pub fn candidates(&self, text: &str) -> &[u32] {
        let index = if is_kana_only(text) {
            &self.kana_index
        } else {
            &self.kanji_index
        };
        index.get(text).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Frequency bonus for a (written form, reading) pair: the larger of
    /// the reading-only and the exact-pair bonus.
    pub fn priority_bonus(&self, written: &str, reading: &str) -> i32 {
        let reading_only = self
            .priority
            .get(&(String::new(), reading.to_string()))
            .copied()
            .unwrap_or(0);
        let exact = if written.is_empty() {
            0
        } else {
            self.priority
                .get(&(written.to_string(), reading.to_string()))
                .copied()
                .unwrap_or(0)
        };
        reading_only.max(exact)
    }

    /// Kanji-dictionary record for a single character, if known.
    pub fn kanji_info(&self, literal: &str) -> Option<&KanjiEntry> {
        self.kanji.get(literal)
    }

    /// Save the dictionary to a binary file.
    ///
    /// Format (all integers little-endian):
    /// ```text
    /// [4B] magic "YMPD"
    /// [4B] version (1u32)
    /// [4B] num_entries, then per entry:
    ///   [4B] seq
    ///   kanji elements, reading elements, senses
    ///   (lists are u16-counted; strings are u16-length-prefixed UTF-8)
    /// kanji index, kana index (u32-counted; per key: string + u32-counted
    ///   u32 entry indices)
    /// rules (u32-counted; per rule: kind u8, four optional string lists,
    ///   detail string)
    /// priority table (u32-counted [written, reading, i32 bonus] triples)
    /// kanji records (u32-counted)
    /// ```
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut w = BufWriter::new(file);

        w.write_all(MAGIC)?;
        w.write_all(&VERSION.to_le_bytes())?;

        w.write_all(&(self.entries.len() as u32).to_le_bytes())?;
        for entry in &self.entries {
            w.write_all(&entry.seq.to_le_bytes())?;

            write_u16(&mut w, entry.kanji.len())?;
            for k in &entry.kanji {
                write_str(&mut w, &k.text)?;
                write_str_list(&mut w, &k.info)?;
                write_str_list(&mut w, &k.priority)?;
                write_str_list(&mut w, &k.restrictions)?;
            }

            write_u16(&mut w, entry.readings.len())?;
            for r in &entry.readings {
                write_str(&mut w, &r.text)?;
                write_str_list(&mut w, &r.info)?;
                write_str_list(&mut w, &r.priority)?;
                write_str_list(&mut w, &r.restrictions)?;
            }

            write_u16(&mut w, entry.senses.len())?;
            for s in &entry.senses {
                write_str_list(&mut w, &s.glosses)?;
                write_str_list(&mut w, &s.pos)?;
                write_str_list(&mut w, &s.misc)?;
                write_str_list(&mut w, &s.restrictions)?;
            }
        }

        write_index(&mut w, &self.kanji_index)?;
        write_index(&mut w, &self.kana_index)?;

        w.write_all(&(self.rules.len() as u32).to_le_bytes())?;
        for rule in &self.rules {
            w.write_all(&[rule_kind_code(rule.kind)])?;
            write_opt_str_list(&mut w, rule.con_end.as_deref())?;
            write_opt_str_list(&mut w, rule.dec_end.as_deref())?;
            write_opt_str_list(&mut w, rule.con_tag.as_deref())?;
            write_opt_str_list(&mut w, rule.dec_tag.as_deref())?;
            write_str(&mut w, &rule.detail)?;
        }

        w.write_all(&(self.priority.len() as u32).to_le_bytes())?;
        for ((written, reading), bonus) in &self.priority {
            write_str(&mut w, written)?;
            write_str(&mut w, reading)?;
            w.write_all(&bonus.to_le_bytes())?;
        }

        w.write_all(&(self.kanji.len() as u32).to_le_bytes())?;
        for (literal, k) in &self.kanji {
            write_str(&mut w, literal)?;
            write_str_list(&mut w, &k.onyomi)?;
            write_str_list(&mut w, &k.kunyomi)?;
            write_str_list(&mut w, &k.meanings)?;
            w.write_all(&k.stroke_count.to_le_bytes())?;
            w.write_all(&[k.jlpt, k.grade])?;
            w.write_all(&k.frequency.to_le_bytes())?;
        }

        w.flush()?;
        Ok(())
    }

    /// Load a dictionary from a binary file. The duration is logged; load
    /// failures are fatal to the caller's lookup engine, not to the rest of
    /// the pipeline.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let start = Instant::now();
        let file = File::open(path.as_ref())?;
        let mut r = BufReader::new(file);

        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(DictError::Format("invalid magic: expected YMPD".to_string()));
        }

        let version = read_u32(&mut r)?;
        if version != VERSION {
            return Err(DictError::Format(format!("unsupported version: {version}")));
        }

        let num_entries = read_count(&mut r, MAX_ENTRIES, "num_entries")?;
        let mut entries = Vec::with_capacity(num_entries);
        for _ in 0..num_entries {
            let seq = read_u32(&mut r)?;

            let num_kanji = read_u16(&mut r)?;
            let mut kanji = Vec::with_capacity(num_kanji);
            for _ in 0..num_kanji {
                kanji.push(KanjiElement {
                    text: read_str(&mut r)?,
                    info: read_str_list(&mut r)?,
                    priority: read_str_list(&mut r)?,
                    restrictions: read_str_list(&mut r)?,
                });
            }

            let num_readings = read_u16(&mut r)?;
            let mut readings = Vec::with_capacity(num_readings);
            for _ in 0..num_readings {
                readings.push(ReadingElement {
                    text: read_str(&mut r)?,
                    info: read_str_list(&mut r)?,
                    priority: read_str_list(&mut r)?,
                    restrictions: read_str_list(&mut r)?,
                });
            }

            let num_senses = read_u16(&mut r)?;
            let mut senses = Vec::with_capacity(num_senses);
            for _ in 0..num_senses {
                senses.push(Sense {
                    glosses: read_str_list(&mut r)?,
                    pos: read_str_list(&mut r)?,
                    misc: read_str_list(&mut r)?,
                    restrictions: read_str_list(&mut r)?,
                });
            }

            entries.push(Entry {
                seq,
                kanji,
                readings,
                senses,
            });
        }

        let kanji_index = read_index(&mut r, entries.len())?;
        let kana_index = read_index(&mut r, entries.len())?;

        let num_rules = read_count(&mut r, MAX_KEYS, "num_rules")?;
        let mut rules = Vec::with_capacity(num_rules);
        for _ in 0..num_rules {
            let mut code = [0u8; 1];
            r.read_exact(&mut code)?;
            rules.push(Rule {
                kind: rule_kind_from_code(code[0])?,
                con_end: read_opt_str_list(&mut r)?,
                dec_end: read_opt_str_list(&mut r)?,
                con_tag: read_opt_str_list(&mut r)?,
                dec_tag: read_opt_str_list(&mut r)?,
                detail: read_str(&mut r)?,
            });
        }

        let num_priority = read_count(&mut r, MAX_KEYS, "num_priority")?;
        let mut priority = PriorityMap::with_capacity(num_priority);
        for _ in 0..num_priority {
            let written = read_str(&mut r)?;
            let reading = read_str(&mut r)?;
            let bonus = read_i32(&mut r)?;
            priority.insert((written, reading), bonus);
        }

        let num_kanji_entries = read_count(&mut r, MAX_KEYS, "num_kanji_entries")?;
        let mut kanji = HashMap::with_capacity(num_kanji_entries);
        for _ in 0..num_kanji_entries {
            let literal = read_str(&mut r)?;
            let onyomi = read_str_list(&mut r)?;
            let kunyomi = read_str_list(&mut r)?;
            let meanings = read_str_list(&mut r)?;
            let stroke_count = read_u16(&mut r)? as u16;
            let mut bytes = [0u8; 2];
            r.read_exact(&mut bytes)?;
            let (jlpt, grade) = (bytes[0], bytes[1]);
            let mut freq = [0u8; 2];
            r.read_exact(&mut freq)?;
            let frequency = u16::from_le_bytes(freq);
            kanji.insert(
                literal.clone(),
                KanjiEntry {
                    literal,
                    onyomi,
                    kunyomi,
                    meanings,
                    stroke_count,
                    jlpt,
                    grade,
                    frequency,
                },
            );
        }

        let dict = Self::from_parts(entries, kanji_index, kana_index, rules, priority, kanji);
        info!(
            "dictionary loaded in {:.2}s ({} entries, {} kanji, {} rules)",
            start.elapsed().as_secs_f64(),
            dict.entries.len(),
            dict.kanji.len(),
            dict.rules.len()
        );
        Ok(dict)
    }
}

fn rule_kind_code(kind: RuleKind) -> u8 {
    match kind {
        RuleKind::Std => 0,
        RuleKind::Rewrite => 1,
        RuleKind::OnlyFinal => 2,
        RuleKind::NeverFinal => 3,
        RuleKind::Context => 4,
        RuleKind::Substitution => 5,
    }
}

fn rule_kind_from_code(code: u8) -> Result<RuleKind> {
    Ok(match code {
        0 => RuleKind::Std,
        1 => RuleKind::Rewrite,
        2 => RuleKind::OnlyFinal,
        3 => RuleKind::NeverFinal,
        4 => RuleKind::Context,
        5 => RuleKind::Substitution,
        other => {
            return Err(DictError::Format(format!("unknown rule kind: {other}")));
        }
    })
}

// --- primitive readers/writers ---

fn write_u16(w: &mut impl Write, value: usize) -> Result<()> {
    let value = u16::try_from(value)
        .map_err(|_| DictError::Format(format!("list too long for u16: {value}")))?;
    w.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn write_str(w: &mut impl Write, s: &str) -> Result<()> {
    write_u16(w, s.len())?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn write_str_list(w: &mut impl Write, list: &[String]) -> Result<()> {
    write_u16(w, list.len())?;
    for s in list {
        write_str(w, s)?;
    }
    Ok(())
}

fn write_opt_str_list(w: &mut impl Write, list: Option<&[String]>) -> Result<()> {
    match list {
        None => {
            w.write_all(&[0])?;
            Ok(())
        }
        Some(list) => {
            w.write_all(&[1])?;
            write_str_list(w, list)
        }
    }
}

fn write_index(w: &mut impl Write, index: &HashMap<String, Vec<u32>>) -> Result<()> {
    w.write_all(&(index.len() as u32).to_le_bytes())?;
    for (key, indices) in index {
        write_str(w, key)?;
        w.write_all(&(indices.len() as u32).to_le_bytes())?;
        for &i in indices {
            w.write_all(&i.to_le_bytes())?;
        }
    }
    Ok(())
}

fn read_u16(r: &mut impl Read) -> Result<usize> {
    let mut bytes = [0u8; 2];
    r.read_exact(&mut bytes)?;
    Ok(u16::from_le_bytes(bytes) as usize)
}

fn read_u32(r: &mut impl Read) -> Result<u32> {
    let mut bytes = [0u8; 4];
    r.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_i32(r: &mut impl Read) -> Result<i32> {
    let mut bytes = [0u8; 4];
    r.read_exact(&mut bytes)?;
    Ok(i32::from_le_bytes(bytes))
}

fn read_count(r: &mut impl Read, max: usize, what: &str) -> Result<usize> {
    let count = read_u32(r)? as usize;
    if count > max {
        return Err(DictError::Format(format!(
            "{what} too large: {count} (max {max})"
        )));
    }
    Ok(count)
}

fn read_str(r: &mut impl Read) -> Result<String> {
    let len = read_u16(r)?;
    let mut bytes = vec![0u8; len];
    r.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| DictError::Format(format!("invalid UTF-8: {e}")))
}

fn read_str_list(r: &mut impl Read) -> Result<Vec<String>> {
    let count = read_u16(r)?;
    let mut list = Vec::with_capacity(count);
    for _ in 0..count {
        list.push(read_str(r)?);
    }
    Ok(list)
}

fn read_opt_str_list(r: &mut impl Read) -> Result<Option<Vec<String>>> {
    let mut flag = [0u8; 1];
    r.read_exact(&mut flag)?;
    match flag[0] {
        0 => Ok(None),
        1 => Ok(Some(read_str_list(r)?)),
        other => Err(DictError::Format(format!("invalid option flag: {other}"))),
    }
}

fn read_index(r: &mut impl Read, num_entries: usize) -> Result<HashMap<String, Vec<u32>>> {
    let num_keys = read_count(r, MAX_KEYS, "index keys")?;
    let mut index = HashMap::with_capacity(num_keys);
    for _ in 0..num_keys {
        let key = read_str(r)?;
        let count = read_count(r, MAX_KEYS, "index postings")?;
        let mut indices = Vec::with_capacity(count);
        for _ in 0..count {
            let i = read_u32(r)?;
            if i as usize >= num_entries {
                return Err(DictError::Format(format!(
                    "index entry {i} out of bounds ({num_entries} entries)"
                )));
            }
            indices.push(i);
        }
        index.insert(key, indices);
    }
    Ok(index)
}

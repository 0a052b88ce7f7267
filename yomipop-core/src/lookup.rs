//! Dictionary lookup: prefix search over the compiled dictionary combined
//! with deconjugation, restriction filtering, ranking and merging.
//!
//! `lookup` is a pure function of the dictionary, the rule table, the
//! configured length cap and the input string; an LRU cache keyed by the
//! truncated lookup string short-circuits repeated queries.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use indexmap::map::Entry as MapEntry;
use tracing::debug;

use crate::deconjugate::{Deconjugator, Form};
use crate::dict::{Dictionary, Entry};
use crate::jp::is_kana_only;

/// Upper bound on returned entries per lookup.
pub const MAX_RESULTS: usize = 10;

const CACHE_CAPACITY: usize = 500;

/// Punctuation that ends a lookup string: brackets (Japanese and ASCII),
/// CJK punctuation, math operators, `!` and `?`. The hover suffix runs to
/// the end of the paragraph, so anything past one of these cannot belong
/// to the word under the cursor.
const SEPARATORS: &[char] = &[
    '「', '」', '『', '』', '【', '】', '〈', '〉', '《', '》', '（', '）', '(', ')', '[', ']',
    '{', '}', '、', '。', '，', '．', '・', '：', '；', '　', '！', '？', '!', '?', '…', '‥',
    '＋', '+', '−', '-', '×', '÷', '＝', '=', '<', '>',
];

/// One sense of a formatted result.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupSense {
    pub glosses: Vec<String>,
    pub pos: Vec<String>,
    pub misc: Vec<String>,
}

/// A ranked, display-ready dictionary result.
///
/// Results are merged per (written_form, reading) pair, so homographs from
/// different entries that render identically collapse into one row.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupEntry {
    pub seq: u32,
    pub written_form: String,
    /// Companion reading; empty when `written_form` is itself kana.
    pub reading: String,
    pub senses: Vec<LookupSense>,
    pub misc_tags: BTreeSet<String>,
    /// Labels of the deconjugation rules that led to this match.
    pub deconjugation: Vec<String>,
    pub priority: f64,
    /// Length in characters of the matched input prefix.
    pub match_len: usize,
}

/// Lookup engine; owns the per-request LRU cache, shares the dictionary.
pub struct LookupEngine {
    dict: Arc<Dictionary>,
    deconjugator: Deconjugator,
    max_lookup_length: usize,
    cache: IndexMap<String, Vec<LookupEntry>>,
}

impl LookupEngine {
    pub fn new(dict: Arc<Dictionary>, max_lookup_length: usize) -> Self {
        let deconjugator = Deconjugator::new(dict.rules().to_vec());
        Self {
            dict,
            deconjugator,
            max_lookup_length,
            cache: IndexMap::new(),
        }
    }

    /// Look up a word starting at the beginning of `input`, returning up
    /// to [`MAX_RESULTS`] ranked entries.
    pub fn lookup(&mut self, input: &str) -> Vec<LookupEntry> {
        let trimmed = input.trim();
        let cut = match trimmed.find(|c: char| SEPARATORS.contains(&c)) {
            Some(byte_index) => &trimmed[..byte_index],
            None => trimmed,
        };
        let key: String = cut.chars().take(self.max_lookup_length).collect();
        if key.is_empty() {
            return Vec::new();
        }

        if let Some(cached) = self.cache.shift_remove(&key) {
            // move-to-MRU: re-insert at the back
            self.cache.insert(key, cached.clone());
            return cached;
        }

        let results = self.search(&key);
        if !results.is_empty() {
            debug!(
                "found {} entries for '{}'",
                results.len(),
                key.chars().take(15).collect::<String>()
            );
        }

        self.cache.insert(key, results.clone());
        if self.cache.len() > CACHE_CAPACITY {
            self.cache.shift_remove_index(0);
        }
        results
    }

    fn search(&self, key: &str) -> Vec<LookupEntry> {
        let chars: Vec<char> = key.chars().collect();
        let original_kana = is_kana_only(key);

        // (entry index, form, matched prefix length); first-seen per seq
        // wins, and longer prefixes are scanned first.
        let mut candidates: Vec<(u32, Form, usize)> = Vec::new();
        let mut seen_seqs: HashSet<u32> = HashSet::new();
        let mut have_match = false;

        for i in (1..=chars.len()).rev() {
            let prefix: String = chars[..i].iter().collect();
            let prefix_kana = is_kana_only(&prefix);
            // Secondary kana prefixes only surface entries actually written
            // in kana; otherwise short kanji-homophone noise drowns the
            // primary match.
            let kana_filter = have_match && prefix_kana;

            let forms = self.deconjugator.deconjugate(&prefix);
            for form in &forms {
                for &index in self.dict.candidates(&form.text) {
                    let entry = self.dict.entry(index);
                    if kana_filter && entry.has_kanji() && !entry.prefers_kana() {
                        continue;
                    }
                    if let Some(top_tag) = form.tags.last() {
                        let pos_matches = entry
                            .senses
                            .iter()
                            .any(|s| s.pos.iter().any(|p| p == top_tag));
                        if !entry.senses.is_empty() && !pos_matches {
                            continue;
                        }
                    }
                    if seen_seqs.insert(entry.seq) {
                        candidates.push((index, form.clone(), i));
                    }
                }
            }

            if !candidates.is_empty() {
                have_match = true;
            }
        }

        self.format_and_rank(candidates, original_kana)
    }

    fn format_and_rank(
        &self,
        candidates: Vec<(u32, Form, usize)>,
        original_kana: bool,
    ) -> Vec<LookupEntry> {
        let mut merged: IndexMap<(String, String), LookupEntry> = IndexMap::new();

        for (index, form, match_len) in candidates {
            let entry = self.dict.entry(index);
            let (written_form, reading, matched_reading) = choose_written_reading(entry, &form);
            let priority = self.score(
                entry,
                &form,
                match_len,
                original_kana,
                &written_form,
                &matched_reading,
            );

            let senses: Vec<LookupSense> = entry
                .senses
                .iter()
                .map(|s| LookupSense {
                    glosses: s.glosses.clone(),
                    pos: s.pos.clone(),
                    misc: s.misc.clone(),
                })
                .collect();
            let misc_tags: BTreeSet<String> =
                entry.misc_tags().map(|t| t.to_string()).collect();

            match merged.entry((written_form.clone(), reading.clone())) {
                MapEntry::Vacant(slot) => {
                    slot.insert(LookupEntry {
                        seq: entry.seq,
                        written_form,
                        reading,
                        senses,
                        misc_tags,
                        deconjugation: form.process.clone(),
                        priority,
                        match_len,
                    });
                }
                MapEntry::Occupied(mut slot) => {
                    let existing = slot.get_mut();
                    existing.senses.extend(senses);
                    existing.misc_tags.extend(misc_tags);
                    if priority > existing.priority {
                        existing.seq = entry.seq;
                        existing.deconjugation = form.process.clone();
                        existing.priority = priority;
                    }
                    existing.match_len = existing.match_len.max(match_len);
                }
            }
        }

        let mut results: Vec<LookupEntry> = merged.into_values().collect();
        results.sort_by(|a, b| {
            b.match_len
                .cmp(&a.match_len)
                .then(b.priority.total_cmp(&a.priority))
                .then(a.seq.cmp(&b.seq))
        });
        results.truncate(MAX_RESULTS);
        results
    }

    fn score(
        &self,
        entry: &Entry,
        form: &Form,
        match_len: usize,
        original_kana: bool,
        written_form: &str,
        matched_reading: &str,
    ) -> f64 {
        // low ids are older, more established entries; the tiny base term
        // is a stable tie-breaker
        let mut priority = entry.seq as f64 / -1e7;
        priority += match_len as f64;

        if original_kana && !entry.has_kanji() && form.is_identity() {
            priority += 100.0;
        }

        let prefers_kana = entry.prefers_kana();
        let prefers_kanji = entry.prefers_kanji();
        if original_kana {
            if prefers_kana {
                priority += 10.0;
            }
            if prefers_kanji {
                priority -= 12.0;
            }
        } else {
            if prefers_kana {
                priority -= 10.0;
            }
            if prefers_kanji {
                priority += 12.0;
            }
        }

        if entry.is_irregular(matched_reading, written_form) {
            priority -= 50.0;
        }
        if entry.has_priority_flag() {
            priority += 30.0;
        }
        if entry.all_senses_tagged(&["obs", "rare", "obsc"]) {
            priority -= 5.0;
        }
        if entry.senses.len() >= 3 {
            priority += 3.0;
        }

        priority += self.dict.priority_bonus(written_form, matched_reading) as f64;
        priority -= form.process.len() as f64;
        priority
    }
}

/// Pick the displayed (written form, reading) pair for an entry matched
/// through `form`, honoring the reading/writing restriction lists.
///
/// Returns `(written_form, displayed_reading, matched_reading)`;
/// `matched_reading` feeds the priority table and irregularity checks even
/// when the displayed reading is empty.
fn choose_written_reading(entry: &Entry, form: &Form) -> (String, String, String) {
    if is_kana_only(&form.text) {
        let matched_reading = form.text.clone();
        // usually-kana entries display the kana itself, not a kanji
        // writing nobody uses
        if entry.prefers_kana() {
            return (matched_reading.clone(), String::new(), matched_reading);
        }
        let written = entry
            .kanji
            .iter()
            .find(|k| {
                k.restrictions.is_empty() || k.restrictions.iter().any(|r| *r == matched_reading)
            })
            .or_else(|| entry.kanji.first())
            .map(|k| k.text.clone());
        match written {
            Some(written) => (written, matched_reading.clone(), matched_reading),
            None => (matched_reading.clone(), String::new(), matched_reading),
        }
    } else {
        let written = form.text.clone();
        let reading = entry
            .readings
            .iter()
            .find(|r| r.restrictions.is_empty() || r.restrictions.iter().any(|x| *x == written))
            .or_else(|| entry.readings.first())
            .map(|r| r.text.clone())
            .unwrap_or_default();
        (written, reading.clone(), reading)
    }
}

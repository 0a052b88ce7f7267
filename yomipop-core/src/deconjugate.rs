//! Deconjugation: enumerate the dictionary forms a conjugated surface
//! string could have come from.
//!
//! The engine is a worklist expansion over a rule table. Each [`Form`]
//! carries the surface text reached so far, the trail of rule labels that
//! produced it, and a stack of part-of-speech tags used to chain rules.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer};

/// One candidate deconjugation.
///
/// Equality and hashing are structural over all three fields; the worklist
/// deduplicates by value, so rule tables with cycles still terminate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Form {
    /// Surface text after the rules in `process` have been applied.
    pub text: String,
    /// Human-readable labels of the rules applied so far, outermost first.
    pub process: Vec<String>,
    /// Part-of-speech tag stack used for rule matching.
    pub tags: Vec<String>,
}

impl Form {
    /// The identity form: no rules applied, no tags.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            process: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// True when no deconjugation step produced this form.
    pub fn is_identity(&self) -> bool {
        self.process.is_empty()
    }
}

/// Rule categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum RuleKind {
    /// Ordinary rule; may start a chain.
    #[serde(rename = "stdrule")]
    Std,
    /// Whole-word rewrite; the form text must equal `con_end` exactly.
    #[serde(rename = "rewriterule")]
    Rewrite,
    /// Only applies to forms with no tags yet.
    #[serde(rename = "onlyfinalrule")]
    OnlyFinal,
    /// Only applies to forms that already carry tags.
    #[serde(rename = "neverfinalrule")]
    NeverFinal,
    /// Context rule; may start a chain.
    #[serde(rename = "contextrule")]
    Context,
    /// Preprocessing substitutions; never applied by this engine.
    #[serde(rename = "substitution")]
    Substitution,
}

impl RuleKind {
    /// Whether the rule may apply to a form with an empty tag stack.
    fn is_starter(self) -> bool {
        matches!(
            self,
            RuleKind::Std | RuleKind::Rewrite | RuleKind::OnlyFinal | RuleKind::Context
        )
    }
}

/// A deconjugation rule, decoded from the rule JSON.
///
/// The end/tag fields accept either a single string or a list of strings;
/// a rule with list fields applies once per position, indexing each field
/// modulo its own length up to the longest list's length.
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    #[serde(rename = "type")]
    pub kind: RuleKind,
    /// Suffix the conjugated form must end with.
    #[serde(default, deserialize_with = "string_or_list")]
    pub con_end: Option<Vec<String>>,
    /// Suffix appended after stripping `con_end`.
    #[serde(default, deserialize_with = "string_or_list")]
    pub dec_end: Option<Vec<String>>,
    /// Tag required on top of the form's tag stack (for chained rules).
    #[serde(default, deserialize_with = "string_or_list")]
    pub con_tag: Option<Vec<String>>,
    /// Tag left on the stack after applying the rule.
    #[serde(default, deserialize_with = "string_or_list")]
    pub dec_tag: Option<Vec<String>>,
    /// Human-readable label, e.g. "past".
    #[serde(default)]
    pub detail: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrList>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        StringOrList::One(s) => vec![s],
        StringOrList::Many(xs) => xs,
    }))
}

/// Pick position `i` from an optional list field, indexing modulo the list
/// length. Empty or absent lists yield `None`.
fn pick(field: Option<&Vec<String>>, i: usize) -> Option<&str> {
    field.and_then(|list| {
        if list.is_empty() {
            None
        } else {
            Some(list[i % list.len()].as_str())
        }
    })
}

/// Deconjugation engine over an immutable rule table.
pub struct Deconjugator {
    rules: Vec<Rule>,
}

/// Cap on worklist rounds. Rule tables can in principle cycle; value
/// deduplication plus this cap guarantee termination.
const MAX_ROUNDS: usize = 15;

impl Deconjugator {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Parse a rule JSON document: an array whose non-object elements
    /// (comments, markers) are ignored.
    pub fn parse_rules(json: &str) -> Result<Vec<Rule>, serde_json::Error> {
        let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
        let mut rules = Vec::new();
        for value in values {
            if value.is_object() {
                rules.push(serde_json::from_value(value)?);
            }
        }
        Ok(rules)
    }

    /// Enumerate every form the input could reduce to, the identity form
    /// included. Output order is deterministic: identity first, then
    /// discovery order of the worklist.
    pub fn deconjugate(&self, text: &str) -> Vec<Form> {
        let clean = text.trim();
        if clean.is_empty() {
            return Vec::new();
        }

        let identity = Form::new(clean);
        let mut seen: HashSet<Form> = HashSet::new();
        seen.insert(identity.clone());

        let mut results: Vec<Form> = Vec::new();
        let mut novel: Vec<Form> = vec![identity];

        let mut round = 0;
        while !novel.is_empty() {
            round += 1;
            if round > MAX_ROUNDS {
                break;
            }

            let mut fresh: Vec<Form> = Vec::new();
            for form in &novel {
                for rule in &self.rules {
                    apply_rule(form, rule, &mut |candidate| {
                        if seen.insert(candidate.clone()) {
                            fresh.push(candidate);
                        }
                    });
                }
            }

            results.append(&mut novel);
            novel = fresh;
        }

        results
    }
}

/// Apply one rule to one form, emitting every produced form.
fn apply_rule(form: &Form, rule: &Rule, emit: &mut impl FnMut(Form)) {
    // Substitutions belong to a separate preprocessing mechanism.
    if rule.kind == RuleKind::Substitution {
        return;
    }
    if rule.kind == RuleKind::OnlyFinal && !form.tags.is_empty() {
        return;
    }
    if rule.kind == RuleKind::NeverFinal && form.tags.is_empty() {
        return;
    }
    let (Some(_), Some(_)) = (&rule.con_end, &rule.dec_end) else {
        return;
    };

    let longest = [
        rule.con_end.as_ref().map(Vec::len),
        rule.dec_end.as_ref().map(Vec::len),
        rule.con_tag.as_ref().map(Vec::len),
        rule.dec_tag.as_ref().map(Vec::len),
    ]
    .into_iter()
    .flatten()
    .max()
    .unwrap_or(1)
    .max(1);

    for i in 0..longest {
        let con_end = pick(rule.con_end.as_ref(), i).unwrap_or("");
        let dec_end = pick(rule.dec_end.as_ref(), i).unwrap_or("");
        let con_tag = pick(rule.con_tag.as_ref(), i);
        let dec_tag = pick(rule.dec_tag.as_ref(), i);

        if !form.text.ends_with(con_end) {
            continue;
        }

        let tag_match = if form.tags.is_empty() {
            rule.kind.is_starter()
        } else {
            form.tags.last().map(String::as_str) == con_tag
        };
        if !tag_match {
            continue;
        }

        if rule.kind == RuleKind::Rewrite && form.text != con_end {
            continue;
        }

        let stem = &form.text[..form.text.len() - con_end.len()];
        let new_text = format!("{stem}{dec_end}");

        let mut new_process = form.process.clone();
        new_process.push(rule.detail.clone());

        let mut new_tags = form.tags.clone();
        if !new_tags.is_empty() {
            new_tags.pop();
        }
        if let Some(tag) = dec_tag {
            new_tags.push(tag.to_string());
        }

        emit(Form {
            text: new_text,
            process: new_process,
            tags: new_tags,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn std_rule(con_end: &str, dec_end: &str, con_tag: &str, dec_tag: &str, detail: &str) -> Rule {
        Rule {
            kind: RuleKind::Std,
            con_end: Some(vec![con_end.to_string()]),
            dec_end: Some(vec![dec_end.to_string()]),
            con_tag: Some(vec![con_tag.to_string()]),
            dec_tag: Some(vec![dec_tag.to_string()]),
            detail: detail.to_string(),
        }
    }

    #[test]
    fn test_identity_always_included() {
        let deconj = Deconjugator::new(Vec::new());
        let forms = deconj.deconjugate("食べた");
        assert_eq!(forms, vec![Form::new("食べた")]);

        let deconj = Deconjugator::new(vec![std_rule("た", "る", "v1-past", "v1", "past")]);
        let forms = deconj.deconjugate("なにか");
        assert!(forms.contains(&Form::new("なにか")));
    }

    #[test]
    fn test_simple_past() {
        let deconj = Deconjugator::new(vec![std_rule("た", "る", "v1-past", "v1", "past")]);
        let forms = deconj.deconjugate("食べた");
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[0], Form::new("食べた"));
        assert_eq!(
            forms[1],
            Form {
                text: "食べる".to_string(),
                process: vec!["past".to_string()],
                tags: vec!["v1".to_string()],
            }
        );
    }

    #[test]
    fn test_chained_rules() {
        // negative past: 食べなかった -> 食べない -> 食べる
        let rules = vec![
            std_rule("なかった", "ない", "adj-i", "adj-i", "past"),
            std_rule("ない", "る", "adj-i", "v1", "negative"),
        ];
        let deconj = Deconjugator::new(rules);
        let forms = deconj.deconjugate("食べなかった");
        let full = forms
            .iter()
            .find(|f| f.text == "食べる")
            .expect("chain should reach the dictionary form");
        assert_eq!(full.process, vec!["past", "negative"]);
        assert_eq!(full.tags, vec!["v1"]);
    }

    #[test]
    fn test_chained_rule_requires_matching_tag() {
        let rules = vec![
            std_rule("た", "る", "v1-past", "v1", "past"),
            // chained rule demanding a tag the first rule does not leave
            std_rule("る", "りる", "v5", "v5-stem", "potential"),
        ];
        let deconj = Deconjugator::new(rules);
        let forms = deconj.deconjugate("食べた");
        // the v5 rule must not fire on the v1-tagged form
        assert!(forms.iter().all(|f| f.text != "食べりる"));
    }

    #[test]
    fn test_rewrite_requires_whole_word() {
        let rewrite = Rule {
            kind: RuleKind::Rewrite,
            con_end: Some(vec!["来た".to_string()]),
            dec_end: Some(vec!["来る".to_string()]),
            con_tag: None,
            dec_tag: Some(vec!["vk".to_string()]),
            detail: "past".to_string(),
        };
        let deconj = Deconjugator::new(vec![rewrite]);

        let forms = deconj.deconjugate("来た");
        assert!(forms.iter().any(|f| f.text == "来る"));

        // longer surface ending in 来た must not rewrite
        let forms = deconj.deconjugate("出て来た");
        assert!(forms.iter().all(|f| f.text != "来る"));
    }

    #[test]
    fn test_only_final_skipped_once_tagged() {
        let rules = vec![
            std_rule("ました", "ます", "pol-past", "pol", "polite past"),
            Rule {
                kind: RuleKind::OnlyFinal,
                con_end: Some(vec!["ます".to_string()]),
                dec_end: Some(vec!["る".to_string()]),
                con_tag: None,
                dec_tag: Some(vec!["v1".to_string()]),
                detail: "polite".to_string(),
            },
        ];
        let deconj = Deconjugator::new(rules);
        // Starting from ました, the only-final rule would have to fire on a
        // form that already carries a tag, so the chain must stop.
        let forms = deconj.deconjugate("食べました");
        assert!(forms.iter().any(|f| f.text == "食べます"));
        assert!(forms.iter().all(|f| f.text != "食べる"));

        // Directly from ます it fires fine.
        let forms = deconj.deconjugate("食べます");
        assert!(forms.iter().any(|f| f.text == "食べる"));
    }

    #[test]
    fn test_never_final_needs_tags() {
        let never_final = Rule {
            kind: RuleKind::NeverFinal,
            con_end: Some(vec!["て".to_string()]),
            dec_end: Some(vec!["る".to_string()]),
            con_tag: Some(vec!["stem".to_string()]),
            dec_tag: Some(vec!["v1".to_string()]),
            detail: "te-form".to_string(),
        };
        let deconj = Deconjugator::new(vec![never_final]);
        let forms = deconj.deconjugate("食べて");
        assert_eq!(forms, vec![Form::new("食べて")]);
    }

    #[test]
    fn test_substitution_rules_ignored() {
        let substitution = Rule {
            kind: RuleKind::Substitution,
            con_end: Some(vec!["ず".to_string()]),
            dec_end: Some(vec!["づ".to_string()]),
            con_tag: None,
            dec_tag: None,
            detail: "spelling".to_string(),
        };
        let deconj = Deconjugator::new(vec![substitution]);
        assert_eq!(deconj.deconjugate("まず"), vec![Form::new("まず")]);
    }

    #[test]
    fn test_missing_ends_rejected() {
        let incomplete = Rule {
            kind: RuleKind::Std,
            con_end: Some(vec!["た".to_string()]),
            dec_end: None,
            con_tag: None,
            dec_tag: None,
            detail: "broken".to_string(),
        };
        let deconj = Deconjugator::new(vec![incomplete]);
        assert_eq!(deconj.deconjugate("食べた"), vec![Form::new("食べた")]);
    }

    #[test]
    fn test_list_fields_iterate_longest_with_modular_indexing() {
        // con_end has two entries, dec_end one: both positions strip a
        // different suffix but append the same ending.
        let rule = Rule {
            kind: RuleKind::Std,
            con_end: Some(vec!["かった".to_string(), "くない".to_string()]),
            dec_end: Some(vec!["い".to_string()]),
            con_tag: None,
            dec_tag: Some(vec!["adj-i".to_string()]),
            detail: "adjective".to_string(),
        };
        let deconj = Deconjugator::new(vec![rule]);

        let forms = deconj.deconjugate("高かった");
        assert!(forms.iter().any(|f| f.text == "高い"));

        let forms = deconj.deconjugate("高くない");
        assert!(forms.iter().any(|f| f.text == "高い"));
    }

    #[test]
    fn test_termination_on_cyclic_rules() {
        // a <-> b forever; value dedup must stop the expansion early.
        let rules = vec![
            std_rule("あ", "い", "x", "x", "ab"),
            std_rule("い", "あ", "x", "x", "ba"),
        ];
        let deconj = Deconjugator::new(rules);
        let forms = deconj.deconjugate("あ");
        assert!(forms.contains(&Form::new("あ")));
        // every process trail is bounded by the round cap
        assert!(forms.iter().all(|f| f.process.len() <= MAX_ROUNDS));
    }

    #[test]
    fn test_termination_on_growing_rules() {
        // A rule that keeps growing the text would run forever without the
        // round cap.
        let grow = Rule {
            kind: RuleKind::Std,
            con_end: Some(vec![String::new()]),
            dec_end: Some(vec!["あ".to_string()]),
            con_tag: None,
            dec_tag: None,
            detail: "grow".to_string(),
        };
        let deconj = Deconjugator::new(vec![grow]);
        let forms = deconj.deconjugate("x");
        assert!(forms.iter().all(|f| f.process.len() < MAX_ROUNDS));
        assert!(forms.contains(&Form::new("x")));
    }

    #[test]
    fn test_empty_input() {
        let deconj = Deconjugator::new(Vec::new());
        assert!(deconj.deconjugate("").is_empty());
        assert!(deconj.deconjugate("   ").is_empty());
    }

    #[test]
    fn test_parse_rules_ignores_non_objects() {
        let json = r#"[
            "comment line",
            {"type": "stdrule", "con_end": "た", "dec_end": "る",
             "con_tag": "v1-past", "dec_tag": "v1", "detail": "past"},
            42
        ]"#;
        let rules = Deconjugator::parse_rules(json).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].detail, "past");
        assert_eq!(rules[0].con_end.as_deref(), Some(&["た".to_string()][..]));
    }

    #[test]
    fn test_parse_rules_accepts_lists() {
        let json = r#"[
            {"type": "stdrule",
             "con_end": ["かった", "くない"],
             "dec_end": "い",
             "dec_tag": "adj-i",
             "detail": "adjective"}
        ]"#;
        let rules = Deconjugator::parse_rules(json).unwrap();
        assert_eq!(rules[0].con_end.as_ref().map(Vec::len), Some(2));
        assert_eq!(rules[0].con_tag, None);
    }
}

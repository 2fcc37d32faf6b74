use serde::Serialize;
use serde_json::Value;

use crate::domain::{RecordOutput, SearchMode};
use crate::record::{Catalogue, Record, project_identifier, scalar_text};

pub const DEFAULT_FUZZY_THRESHOLD: u8 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub mode: SearchMode,
    pub threshold: u8,
    pub output: RecordOutput,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            mode: SearchMode::Exact,
            threshold: DEFAULT_FUZZY_THRESHOLD,
            output: RecordOutput::Full,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchHits {
    Records(Vec<Record>),
    Ids(Vec<String>),
}

impl SearchHits {
    pub fn len(&self) -> usize {
        match self {
            SearchHits::Records(records) => records.len(),
            SearchHits::Ids(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn search<'a, I>(records: I, term: &str, options: &SearchOptions) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .filter(|record| match options.mode {
            SearchMode::Exact => matches_exact(record, term),
            SearchMode::Fuzzy => matches_fuzzy(record, term, options.threshold),
        })
        .collect()
}

pub fn search_catalogue(
    catalogue: &Catalogue,
    term: &str,
    options: &SearchOptions,
    id_prefix: &str,
) -> SearchHits {
    let matches = search(catalogue, term, options);
    if matches.is_empty() {
        tracing::warn!(term, mode = ?options.mode, "no catalogue records matched");
    } else {
        tracing::info!(term, matches = matches.len(), "catalogue search finished");
    }
    render(&matches, options.output, id_prefix)
}

pub fn render(matches: &[&Record], output: RecordOutput, id_prefix: &str) -> SearchHits {
    match output {
        RecordOutput::Full => SearchHits::Records(matches.iter().map(|r| (*r).clone()).collect()),
        RecordOutput::IdOnly => SearchHits::Ids(
            matches
                .iter()
                .filter_map(|record| {
                    let id = project_identifier(record, id_prefix);
                    if id.is_none() {
                        tracing::debug!("dropping matched record without an id");
                    }
                    id
                })
                .collect(),
        ),
    }
}

pub fn matches_exact(record: &Record, term: &str) -> bool {
    record.iter().any(|(key, value)| {
        key == term
            || match value {
                Value::Object(nested) => matches_exact(nested, term),
                other => scalar_text(other).is_some_and(|text| text == term),
            }
    })
}

pub fn matches_fuzzy(record: &Record, term: &str, threshold: u8) -> bool {
    leaves(record)
        .iter()
        .any(|leaf| fuzzy_leaf_matches(leaf, term, threshold))
}

pub fn leaves(record: &Record) -> Vec<String> {
    let mut out = Vec::new();
    for value in record.values() {
        collect_leaves(value, &mut out);
    }
    out
}

fn collect_leaves(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => map.values().for_each(|nested| collect_leaves(nested, out)),
        Value::Array(items) => items.iter().for_each(|nested| collect_leaves(nested, out)),
        scalar => out.extend(scalar_text(scalar)),
    }
}

pub fn fuzzy_leaf_matches(leaf: &str, term: &str, threshold: u8) -> bool {
    let term = term.to_lowercase();
    let width = term.chars().count();
    if width == 0 {
        return false;
    }
    let leaf = leaf.to_lowercase();
    let chars: Vec<char> = leaf.chars().collect();
    if chars.len() > width {
        chars.windows(width).any(|window| {
            let window: String = window.iter().collect();
            similarity(&window, &term) > threshold
        })
    } else {
        similarity(&leaf, &term) > threshold
    }
}

pub fn similarity(left: &str, right: &str) -> u8 {
    (strsim::normalized_levenshtein(left, right) * 100.0).floor() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn similarity_scale() {
        assert_eq!(similarity("coli", "coli"), 100);
        assert_eq!(similarity("abcd", "abce"), 75);
        assert_eq!(similarity("zzz", "abc"), 0);
    }

    #[test]
    fn threshold_is_exclusive() {
        assert!(!fuzzy_leaf_matches("abce", "abcd", 75));
        assert!(fuzzy_leaf_matches("abce", "abcd", 74));
    }

    #[test]
    fn short_leaf_compares_whole_string() {
        assert!(!fuzzy_leaf_matches("ab", "abc", 75));
        assert!(fuzzy_leaf_matches("ab", "abc", 60));
    }

    #[test]
    fn windows_respect_multibyte_characters() {
        assert!(fuzzy_leaf_matches("Müller strain", "müller", 75));
    }

    #[test]
    fn empty_term_never_matches_fuzzily() {
        assert!(!fuzzy_leaf_matches("anything", "", 0));
    }
}

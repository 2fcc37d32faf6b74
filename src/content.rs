use regex::Regex;
use serde::Serialize;

use crate::domain::ArtifactKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FastaEntry {
    pub header: String,
    pub sequence: String,
}

pub fn parse_fasta(text: &str) -> Vec<FastaEntry> {
    let mut entries: Vec<FastaEntry> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.starts_with('>') {
            entries.push(FastaEntry {
                header: line.to_string(),
                sequence: String::new(),
            });
        } else if let Some(entry) = entries.last_mut() {
            entry.sequence.push_str(line);
        }
    }
    entries
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerRule {
    pub token: String,
    pub length: usize,
    pub line_start: bool,
}

impl MarkerRule {
    pub fn for_kind(kind: ArtifactKind) -> Self {
        match kind {
            ArtifactKind::Assembly => Self {
                token: "version_id=".to_string(),
                length: 8,
                line_start: false,
            },
            ArtifactKind::Annotations => Self {
                token: "VERSION".to_string(),
                length: 32,
                line_start: true,
            },
        }
    }

    pub fn extract(&self, text: &str) -> Option<String> {
        if self.length == 0 {
            return None;
        }
        let anchor = if self.line_start { "(?m)^" } else { "" };
        let pattern = format!(
            r"{anchor}{}[ \t]*(\S{{1,{}}})",
            regex::escape(&self.token),
            self.length
        );
        let re = Regex::new(&pattern).ok()?;
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|found| found.as_str().to_string())
    }
}

pub fn sanitize_marker(marker: &str) -> String {
    marker
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// `genome.fasta` + `abc` -> `genome_abc.fasta`.
pub fn suffixed_file_name(file_name: &str, marker: &str) -> String {
    let marker = sanitize_marker(marker);
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{marker}.{ext}"),
        _ => format!("{file_name}_{marker}"),
    }
}

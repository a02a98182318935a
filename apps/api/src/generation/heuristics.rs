//! Figure listing and citation heuristics. Best-effort post-processing over
//! free-text completions; nothing here returns an error.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};

pub const FIGURE_DELIMITER: &str = " :: ";

pub const UNKNOWN_AUTHOR: &str = "unknown";
pub const UNKNOWN_YEAR: &str = "YYYY";
pub const UNKNOWN_JOURNAL: &str = "journal";

const MAX_FILENAME_CHARS: usize = 100;

static YEAR_DELIMITED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.(;]\s*([0-9]{4})[.);]").expect("valid year regex"));
static YEAR_ANY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([0-9]{4})\b").expect("valid year regex"));
static JOURNAL_AFTER_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)["”]\s*\.\s*([^,.:]+?)\s*[0-9]+[:(]"#).expect("valid journal regex")
});
static NON_NAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z\-]").expect("valid name regex"));
static JOURNAL_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s.,]").expect("valid separator regex"));
static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\-.]").expect("valid filename regex"));
static UNDERSCORE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").expect("valid regex"));

// ────────────────────────────────────────────────────────────────────────────
// Figure index
// ────────────────────────────────────────────────────────────────────────────

/// Figure identifier → one-line description, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FigureIndex {
    entries: Vec<(String, String)>,
}

impl FigureIndex {
    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == id)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// A repeated identifier keeps its first position and takes the later description.
    fn insert(&mut self, id: String, description: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == id) {
            Some(entry) => entry.1 = description,
            None => self.entries.push((id, description)),
        }
    }
}

impl Serialize for FigureIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, description) in &self.entries {
            map.serialize_entry(id, description)?;
        }
        map.end()
    }
}

/// Parses `identifier :: description` lines. Lines without the delimiter,
/// entries with an empty side and table entries are dropped.
pub fn parse_figure_listing(raw: &str) -> FigureIndex {
    let mut index = FigureIndex::default();
    for line in raw.lines() {
        let Some((id, description)) = line.split_once(FIGURE_DELIMITER) else {
            continue;
        };
        let (id, description) = (id.trim(), description.trim());
        if id.is_empty() || description.is_empty() || id.to_lowercase().starts_with("table") {
            continue;
        }
        index.insert(id.to_string(), description.to_string());
    }
    index
}

// ────────────────────────────────────────────────────────────────────────────
// Citation → export file name
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationParts {
    pub last_name: String,
    pub year: String,
    pub journal: String,
}

/// Each part falls back to its placeholder independently.
pub fn citation_parts(citation: &str) -> CitationParts {
    CitationParts {
        last_name: first_author_last_name(citation),
        year: publication_year(citation),
        journal: journal_abbreviation(citation),
    }
}

fn first_author_last_name(citation: &str) -> String {
    let first_author = citation.split(',').next().unwrap_or_default().trim();
    let candidate = if first_author.contains(' ') && !is_all_uppercase(first_author) {
        first_author.split(' ').next().unwrap_or_default()
    } else {
        first_author
    };
    let cleaned = NON_NAME_CHARS
        .replace_all(&candidate.to_lowercase(), "")
        .into_owned();
    if cleaned.is_empty() {
        UNKNOWN_AUTHOR.to_string()
    } else {
        cleaned
    }
}

// "DOE JA" is an author block, not "Firstname Lastname".
fn is_all_uppercase(s: &str) -> bool {
    let mut cased = s.chars().filter(|c| c.is_alphabetic()).peekable();
    cased.peek().is_some() && cased.all(|c| c.is_uppercase())
}

fn publication_year(citation: &str) -> String {
    YEAR_DELIMITED
        .captures(citation)
        .or_else(|| YEAR_ANY.captures(citation))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_YEAR.to_string())
}

fn journal_abbreviation(citation: &str) -> String {
    if let Some(part) = JOURNAL_AFTER_TITLE
        .captures(citation)
        .and_then(|caps| caps.get(1))
    {
        let abbrev = JOURNAL_SEPARATORS
            .replace_all(part.as_str().trim(), "")
            .to_lowercase();
        if !abbrev.is_empty() {
            return abbrev;
        }
    }
    if citation.to_lowercase().contains("applied energy") {
        return "appliedenergy".to_string();
    }
    UNKNOWN_JOURNAL.to_string()
}

/// Base name shared by both exported documents.
pub fn export_basename(citation: Option<&str>, today: NaiveDate) -> String {
    let date = today.format("%d%b%Y").to_string().to_lowercase();
    match citation.map(str::trim).filter(|c| !c.is_empty()) {
        Some(citation) => {
            let parts = citation_parts(citation);
            format!(
                "{}_etal_{}_{}_ber-highlight_{}",
                parts.last_name, parts.year, parts.journal, date
            )
        }
        None => format!("ber-highlight_{date}"),
    }
}

/// Replaces characters unsafe in file names, collapses `_` runs, trims `_` and
/// `.` from both ends and caps the length.
pub fn sanitize_filename(name: &str) -> String {
    let replaced = UNSAFE_FILENAME_CHARS.replace_all(name, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    collapsed
        .trim_matches(|c| c == '_' || c == '.')
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect()
}

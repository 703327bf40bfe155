use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;

use crate::tree::Tree;

/// One row of an eBird-style observation export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Observation {
    #[serde(rename = "Common Name", default)]
    pub common_name: Option<String>,
    #[serde(rename = "Scientific Name")]
    pub scientific_name: String,
    #[serde(rename = "Count", default)]
    pub count: Option<String>,
    #[serde(rename = "Date", alias = "Observation Date", default)]
    pub date: Option<String>,
    #[serde(rename = "Location", default)]
    pub location: Option<String>,
}

impl Observation {
    pub fn new(scientific_name: impl Into<String>) -> Self {
        Self {
            common_name: None,
            scientific_name: scientific_name.into(),
            count: None,
            date: None,
            location: None,
        }
    }

    /// Slash species, spuhs, hybrids and uncounted ("X") rows do not count towards a life list.
    fn is_countable(&self) -> bool {
        let names = std::iter::once(self.scientific_name.as_str()).chain(self.common_name.as_deref());
        for name in names {
            let lower = name.to_ascii_lowercase();
            if name.contains('/')
                || lower.ends_with(" sp.")
                || lower.contains(" sp. ")
                || lower.contains(" x ")
                || lower.contains("(hybrid)")
            {
                return false;
            }
        }
        !self
            .count
            .as_deref()
            .is_some_and(|count| count.contains(['X', 'x']))
    }
}

pub fn read_observations(path: &Path) -> Result<Vec<Observation>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open observation file: {}", path.display()))?;
    parse_observations(file)
        .with_context(|| format!("failed to read observations from {}", path.display()))
}

pub fn parse_observations<R: Read>(reader: R) -> Result<Vec<Observation>> {
    let mut rows = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();
    for (index, row) in rows.deserialize().enumerate() {
        let record: Observation =
            row.with_context(|| format!("malformed observation on data row {}", index + 1))?;
        records.push(record);
    }
    Ok(records)
}

/// Drop rows that cannot be pinned to a single species.
pub fn clean_observations(records: Vec<Observation>) -> Vec<Observation> {
    let before = records.len();
    let cleaned: Vec<Observation> = records.into_iter().filter(Observation::is_countable).collect();
    debug!("kept {} of {} observation rows", cleaned.len(), before);
    cleaned
}

/// Canonical taxon id: trimmed, unquoted, single underscores in place of whitespace.
pub fn normalize_taxon(name: &str) -> String {
    name.trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// The set of taxa a user has observed, in canonical form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifeList {
    taxa: BTreeSet<String>,
}

/// Outcome of matching a life list against the tips of a reference tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonMatch {
    pub matched: usize,
    pub unmatched: Vec<String>,
}

impl LifeList {
    pub fn from_observations(records: &[Observation]) -> Self {
        Self::from_names(records.iter().map(|record| record.scientific_name.as_str()))
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let taxa = names
            .into_iter()
            .map(|name| normalize_taxon(name.as_ref()))
            .filter(|name| !name.is_empty())
            .collect();
        Self { taxa }
    }

    /// Exact lookup of an already canonical id.
    pub fn contains(&self, taxon: &str) -> bool {
        self.taxa.contains(taxon)
    }

    pub fn len(&self) -> usize {
        self.taxa.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taxa.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.taxa.iter().map(String::as_str)
    }

    /// Split the list into entries with a tip in `tree` and entries without one.
    pub fn match_tree(&self, tree: &Tree) -> TaxonMatch {
        let tips: HashSet<&str> = tree.tip_names().into_iter().collect();
        let (matched, unmatched): (Vec<&str>, Vec<&str>) =
            self.iter().partition(|taxon| tips.contains(taxon));
        TaxonMatch {
            matched: matched.len(),
            unmatched: unmatched.into_iter().map(str::to_owned).collect(),
        }
    }
}

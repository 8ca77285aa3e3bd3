use std::collections::{BTreeSet, HashSet};

use crate::model::SearchIndexEntry;

/// Shorter terms return nothing.
pub const MIN_SEARCH_LEN: usize = 2;
pub const MAX_SEARCH_RESULTS: usize = 10;

/// The entries whose label contains the term, ignoring case, in index order.
pub fn search<'a>(index: &'a [SearchIndexEntry], term: &str) -> Vec<&'a SearchIndexEntry> {
    let term = term.trim().to_lowercase();
    if term.chars().count() < MIN_SEARCH_LEN {
        return vec![];
    }
    index
        .iter()
        .filter(|e| e.label.to_lowercase().contains(&term))
        .take(MAX_SEARCH_RESULTS)
        .collect()
}

/// The distinct state names found in the index, sorted.
///
/// Only the first entry of each state code is looked at. Entries without a
/// state code are keyed by their state name.
pub fn states(index: &[SearchIndexEntry]) -> Vec<String> {
    let mut seen_codes: HashSet<&str> = HashSet::new();
    let mut names: BTreeSet<String> = BTreeSet::new();
    for entry in index.iter() {
        let name = match entry.state_name() {
            Some(n) => n,
            None => continue,
        };
        let key = entry.st_code.as_deref().unwrap_or(name);
        if seen_codes.insert(key) {
            names.insert(name.to_string());
        }
    }
    names.into_iter().collect()
}

// ********* Input data structures ***********

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The label used for the runner-up party when a constituency has a single candidate.
pub const NO_RUNNER_UP: &str = "N/A";

/// The result of one candidate in one constituency, as read from the tabular source.
///
/// Rows sharing the same `ac_id` form one constituency. Only the id and the vote
/// total are required; every other field may be missing in the source data.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct RawRow {
    pub ac_id: u64,
    pub ac_name: String,
    pub state_name: String,
    pub state_code: Option<String>,
    pub ac_number: Option<u32>,
    pub candidate_name: String,
    pub party: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub category: Option<String>,
    pub votes: u64,
    pub postal_votes: Option<u64>,
    pub total_electors: Option<u64>,
    pub year: Option<u32>,
    pub by_election: Option<bool>,
    pub wiki_link: Option<String>,
}

// ******** Output data structures *********

/// One entry of the candidate slate shown for a constituency.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub name: String,
    pub party: String,
    pub votes: u64,
    /// Share of the total valid votes, in percent, rounded to 2 decimals.
    pub share: f64,
    pub lost_deposit: bool,
}

/// The aggregated results of one constituency.
///
/// The field names are the property names written into the merged geometry.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ConstituencyRecord {
    pub ac_id: u64,
    pub ac_name: String,
    pub st_name: String,
    #[serde(default)]
    pub ac_no: Option<u32>,
    pub winner_name: String,
    pub winner_party: String,
    #[serde(default)]
    pub winner_age: Option<u32>,
    #[serde(default)]
    pub winner_gender: Option<String>,
    #[serde(default)]
    pub winner_category: Option<String>,
    pub runnerup_party: String,
    pub margin: u64,
    /// Percentage of the electors, rounded to 2 decimals. Absent when the
    /// elector count is missing or zero.
    #[serde(default)]
    pub turnout: Option<f64>,
    pub total_votes: u64,
    #[serde(default)]
    pub total_electors: Option<u64>,
    pub total_postal: u64,
    /// Party -> percentage of the total valid votes.
    #[serde(default)]
    pub party_vote_shares: BTreeMap<String, f64>,
    #[serde(default)]
    pub top_candidates: Vec<CandidateSummary>,
    #[serde(default)]
    pub is_bye_election: Option<bool>,
    #[serde(default)]
    pub year: Option<u32>,
    #[serde(default)]
    pub wiki_link: Option<String>,
}

impl ConstituencyRecord {
    /// The winning margin as a percentage of the total valid votes.
    ///
    /// Computed on demand from the current `margin` and `total_votes`.
    /// Returns None when no valid vote was cast.
    pub fn margin_percentage(&self) -> Option<f64> {
        percentage(self.margin, self.total_votes)
    }

    /// The vote share of a party, if it contested this constituency.
    pub fn vote_share(&self, party: &str) -> Option<f64> {
        self.party_vote_shares.get(party).cloned()
    }
}

/// An entry of the search index. There is one per constituency,
/// independently of whether it matched a geometry feature.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SearchIndexEntry {
    pub label: String,
    pub id: u64,
    #[serde(default)]
    pub st_code: Option<String>,
}

impl SearchIndexEntry {
    /// The state name, as it appears between the final parentheses of the label.
    pub fn state_name(&self) -> Option<&str> {
        let inner = self.label.trim_end().strip_suffix(')')?;
        let start = inner.rfind('(')?;
        let name = inner[start + 1..].trim();
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}

/// `part / whole * 100`, or None if `whole` is zero.
pub fn percentage(part: u64, whole: u64) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(part as f64 / whole as f64 * 100.0)
    }
}

/// Rounds to 2 decimal places.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_name_from_label() {
        let e = SearchIndexEntry {
            label: "Chandni Chowk (NCT of Delhi)".to_string(),
            id: 20,
            st_code: Some("U05".to_string()),
        };
        assert_eq!(e.state_name(), Some("NCT of Delhi"));

        let e = SearchIndexEntry {
            label: "Nameless".to_string(),
            id: 21,
            st_code: None,
        };
        assert_eq!(e.state_name(), None);
    }

    #[test]
    fn percentage_of_nothing() {
        assert_eq!(percentage(10, 0), None);
        assert_eq!(percentage(1, 4), Some(25.0));
        assert_eq!(round2(58.823529), 58.82);
    }
}

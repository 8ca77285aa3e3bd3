use log::{debug, info, warn};

use std::collections::{BTreeMap, HashSet};

use crate::model::*;

/// The number of candidates kept in the slate of each constituency.
pub const TOP_CANDIDATES: usize = 5;

/// A candidate loses the deposit below this fraction of the valid votes.
const DEPOSIT_FRACTION: f64 = 1.0 / 6.0;

/// The outcome of the aggregation step.
#[derive(PartialEq, Debug, Clone)]
pub struct Aggregation {
    /// One record per constituency id.
    pub records: BTreeMap<u64, ConstituencyRecord>,
    /// One entry per constituency id, in increasing id order.
    pub search_index: Vec<SearchIndexEntry>,
    pub stats: AggregateStats,
}

/// Counters for the data-quality problems found while aggregating.
/// None of them stops the aggregation.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct AggregateStats {
    pub rows: usize,
    pub constituencies: usize,
    /// Constituencies without a usable elector count: their turnout is absent.
    pub missing_electors: Vec<u64>,
    /// Constituencies in which no valid vote was recorded.
    pub no_valid_votes: Vec<u64>,
    /// (constituency, party) pairs where the party appears on several rows.
    /// Only the share of the last row is kept.
    pub repeated_parties: Vec<(u64, String)>,
}

/// Groups the rows by constituency id and reduces every group.
///
/// The rows of a group keep their input order, which decides ties in
/// the vote totals: the first row seen wins.
pub fn aggregate(rows: &[RawRow]) -> Aggregation {
    info!("aggregate: processing {} rows", rows.len());
    let mut groups: BTreeMap<u64, Vec<&RawRow>> = BTreeMap::new();
    for row in rows.iter() {
        groups.entry(row.ac_id).or_default().push(row);
    }

    let mut stats = AggregateStats {
        rows: rows.len(),
        constituencies: groups.len(),
        ..Default::default()
    };
    let mut records: BTreeMap<u64, ConstituencyRecord> = BTreeMap::new();
    let mut search_index: Vec<SearchIndexEntry> = Vec::new();

    for (ac_id, group) in groups.iter() {
        let record = reduce_group(*ac_id, group, &mut stats);
        debug!("aggregate: {}: {:?}", ac_id, record);
        search_index.push(search_entry(group));
        records.insert(*ac_id, record);
    }

    info!(
        "aggregate: {} constituencies, {} without elector count, {} with repeated parties",
        stats.constituencies,
        stats.missing_electors.len(),
        stats.repeated_parties.len()
    );
    Aggregation {
        records,
        search_index,
        stats,
    }
}

// Invariant: the group is never empty.
fn reduce_group(ac_id: u64, group: &[&RawRow], stats: &mut AggregateStats) -> ConstituencyRecord {
    let first = group[0];

    // sort_by is stable: equal totals stay in input order.
    let mut ranked: Vec<&RawRow> = group.to_vec();
    ranked.sort_by(|a, b| b.votes.cmp(&a.votes));
    let winner = ranked[0];
    let runner_up = ranked.get(1);

    let total_votes: u64 = group.iter().map(|r| r.votes).sum();
    if total_votes == 0 {
        warn!("constituency {}: no valid vote recorded", ac_id);
        stats.no_valid_votes.push(ac_id);
    }

    let total_electors = first.total_electors;
    let turnout = match total_electors {
        Some(electors) if electors > 0 => percentage(total_votes, electors).map(round2),
        _ => {
            warn!(
                "constituency {}: missing elector count ({:?}), turnout is not available",
                ac_id, total_electors
            );
            stats.missing_electors.push(ac_id);
            None
        }
    };

    let margin = winner.votes - runner_up.map(|r| r.votes).unwrap_or(0);

    let mut party_vote_shares: BTreeMap<String, f64> = BTreeMap::new();
    let mut seen_parties: HashSet<&str> = HashSet::new();
    for row in group.iter() {
        if !seen_parties.insert(row.party.as_str()) {
            warn!(
                "constituency {}: party {:?} appears on several rows, keeping the last share",
                ac_id, row.party
            );
            stats.repeated_parties.push((ac_id, row.party.clone()));
        }
        party_vote_shares.insert(row.party.clone(), share_of(row.votes, total_votes));
    }

    let top_candidates: Vec<CandidateSummary> = ranked
        .iter()
        .take(TOP_CANDIDATES)
        .map(|r| CandidateSummary {
            name: r.candidate_name.clone(),
            party: r.party.clone(),
            votes: r.votes,
            share: share_of(r.votes, total_votes),
            lost_deposit: lost_deposit(r.votes, total_votes),
        })
        .collect();

    ConstituencyRecord {
        ac_id,
        ac_name: first.ac_name.clone(),
        st_name: first.state_name.clone(),
        ac_no: first.ac_number,
        winner_name: winner.candidate_name.clone(),
        winner_party: winner.party.clone(),
        winner_age: winner.age,
        winner_gender: winner.gender.clone(),
        winner_category: winner.category.clone(),
        runnerup_party: runner_up
            .map(|r| r.party.clone())
            .unwrap_or_else(|| NO_RUNNER_UP.to_string()),
        margin,
        turnout,
        total_votes,
        total_electors,
        total_postal: group.iter().filter_map(|r| r.postal_votes).sum(),
        party_vote_shares,
        top_candidates,
        is_bye_election: first.by_election,
        year: first.year,
        wiki_link: first.wiki_link.clone(),
    }
}

fn share_of(votes: u64, total_votes: u64) -> f64 {
    percentage(votes, total_votes).map(round2).unwrap_or(0.0)
}

/// True if the candidate got strictly less than one sixth of the valid votes.
pub fn lost_deposit(votes: u64, total_votes: u64) -> bool {
    (votes as f64) < (total_votes as f64) * DEPOSIT_FRACTION
}

fn search_entry(group: &[&RawRow]) -> SearchIndexEntry {
    let first = group[0];
    SearchIndexEntry {
        label: format!("{} ({})", first.ac_name, first.state_name),
        id: first.ac_id,
        st_code: first.state_code.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn row(ac_id: u64, name: &str, party: &str, votes: u64, electors: Option<u64>) -> RawRow {
        RawRow {
            ac_id,
            ac_name: format!("AC {}", ac_id),
            state_name: "Kerala".to_string(),
            state_code: Some("S11".to_string()),
            candidate_name: name.to_string(),
            party: party.to_string(),
            votes,
            postal_votes: Some(10),
            total_electors: electors,
            ..Default::default()
        }
    }

    #[test]
    fn three_candidates() {
        init();
        let rows = vec![
            row(101, "Anna", "AAA", 50000, Some(100000)),
            row(101, "Bob", "BBB", 30000, Some(100000)),
            row(101, "Clara", "CCC", 5000, Some(100000)),
        ];
        let agg = aggregate(&rows);
        let rec = &agg.records[&101];
        assert_eq!(rec.turnout, Some(85.0));
        assert_eq!(rec.margin, 20000);
        assert_eq!(rec.winner_name, "Anna");
        assert_eq!(rec.runnerup_party, "BBB");
        assert_eq!(rec.total_votes, 85000);
        assert_eq!(rec.total_postal, 30);
        assert_eq!(rec.vote_share("AAA"), Some(58.82));
        assert_eq!(rec.vote_share("BBB"), Some(35.29));
        assert_eq!(rec.vote_share("CCC"), Some(5.88));

        let total: f64 = rec.party_vote_shares.values().sum();
        assert!((99.0..=101.0).contains(&total));

        let deposits: Vec<bool> = rec.top_candidates.iter().map(|c| c.lost_deposit).collect();
        assert_eq!(deposits, vec![false, false, true]);
        assert_eq!(agg.search_index.len(), 1);
        assert_eq!(agg.search_index[0].label, "AC 101 (Kerala)");
        assert!(agg.stats.missing_electors.is_empty());
    }

    #[test]
    fn ties_go_to_the_first_row() {
        let rows = vec![
            row(7, "Late", "BBB", 100, Some(1000)),
            row(7, "Early", "AAA", 400, Some(1000)),
            row(7, "Second", "CCC", 400, Some(1000)),
        ];
        let rec = &aggregate(&rows).records[&7];
        assert_eq!(rec.winner_name, "Early");
        assert_eq!(rec.runnerup_party, "CCC");
        assert_eq!(rec.margin, 0);
    }

    #[test]
    fn single_candidate() {
        let rows = vec![row(3, "Solo", "AAA", 1200, Some(2000))];
        let rec = &aggregate(&rows).records[&3];
        assert_eq!(rec.runnerup_party, NO_RUNNER_UP);
        assert_eq!(rec.margin, 1200);
        assert_eq!(rec.turnout, Some(60.0));
    }

    #[test]
    fn missing_electors_degrade_turnout() {
        init();
        let rows = vec![
            row(1, "A", "AAA", 10, None),
            row(1, "B", "BBB", 5, None),
            row(2, "C", "AAA", 10, Some(0)),
        ];
        let agg = aggregate(&rows);
        assert_eq!(agg.records[&1].turnout, None);
        assert_eq!(agg.records[&2].turnout, None);
        assert_eq!(agg.stats.missing_electors, vec![1, 2]);
        assert_eq!(agg.stats.constituencies, 2);
    }

    #[test]
    fn repeated_party_keeps_the_last_share() {
        let rows = vec![
            row(5, "A", "IND", 600, Some(1000)),
            row(5, "B", "XYZ", 300, Some(1000)),
            row(5, "C", "IND", 100, Some(1000)),
        ];
        let agg = aggregate(&rows);
        let rec = &agg.records[&5];
        assert_eq!(rec.vote_share("IND"), Some(10.0));
        assert_eq!(rec.party_vote_shares.len(), 2);
        assert_eq!(agg.stats.repeated_parties, vec![(5, "IND".to_string())]);
    }

    #[test]
    fn slate_is_capped_and_sorted() {
        let rows: Vec<RawRow> = (1..=8)
            .map(|i| row(9, &format!("C{}", i), &format!("P{}", i), i * 100, Some(10000)))
            .collect();
        let rec = &aggregate(&rows).records[&9];
        let votes: Vec<u64> = rec.top_candidates.iter().map(|c| c.votes).collect();
        assert_eq!(votes, vec![800, 700, 600, 500, 400]);
        // 3600 valid votes: the threshold is 600.
        let deposits: Vec<bool> = rec.top_candidates.iter().map(|c| c.lost_deposit).collect();
        assert_eq!(deposits, vec![false, false, false, true, true]);
    }

    #[test]
    fn search_index_follows_ids() {
        let rows = vec![
            row(30, "A", "AAA", 1, Some(10)),
            row(4, "B", "AAA", 1, Some(10)),
            row(30, "C", "BBB", 1, Some(10)),
        ];
        let ids: Vec<u64> = aggregate(&rows).search_index.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![4, 30]);
    }
}

/*!
Multi-dimensional filtering of the aggregated constituencies.

A [`FilterSpec`] holds, for every [`Dimension`], a set of selected tokens.
A record passes a dimension when nothing is selected for it, or when it matches
*any* of the selected tokens. It passes the filter when it passes *every*
dimension.

```
use constituency_map::filter::{Dimension, FilterSpec};

let mut spec = FilterSpec::default();
spec.select(Dimension::Gender, "FEMALE");
spec.select(Dimension::Margin, "<2");
spec.select(Dimension::Margin, "2-5");
assert_eq!(spec.to_query_string(), "gender=FEMALE&margin=2-5%2C%3C2");
```
*/

use log::warn;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::str::FromStr;

use crate::geo::{Feature, MergedDataset};
use crate::model::ConstituencyRecord;

/// The independent dimensions along which constituencies can be filtered.
/// All of them describe the winner or the contest as a whole.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Dimension {
    Age,
    Gender,
    Category,
    Margin,
    Turnout,
    Party,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Age,
        Dimension::Gender,
        Dimension::Category,
        Dimension::Margin,
        Dimension::Turnout,
        Dimension::Party,
    ];

    /// The query parameter name.
    pub fn key(&self) -> &'static str {
        match self {
            Dimension::Age => "age",
            Dimension::Gender => "gender",
            Dimension::Category => "category",
            Dimension::Margin => "margin",
            Dimension::Turnout => "turnout",
            Dimension::Party => "party",
        }
    }

    /// The range buckets of a numeric dimension, None for categorical ones.
    pub fn buckets(&self) -> Option<&'static [Bucket]> {
        match self {
            Dimension::Age => Some(&AGE_BUCKETS),
            Dimension::Margin => Some(&MARGIN_BUCKETS),
            Dimension::Turnout => Some(&TURNOUT_BUCKETS),
            _ => None,
        }
    }

    /// The accepted tokens of a closed categorical dimension. None for the
    /// numeric dimensions and for parties.
    pub fn tokens(&self) -> Option<&'static [&'static str]> {
        match self {
            Dimension::Gender => Some(&GENDER_TOKENS),
            Dimension::Category => Some(&CATEGORY_TOKENS),
            _ => None,
        }
    }

    fn numeric_value(&self, record: &ConstituencyRecord) -> Option<f64> {
        match self {
            Dimension::Age => record.winner_age.map(|a| a as f64),
            Dimension::Margin => record.margin_percentage(),
            Dimension::Turnout => record.turnout,
            _ => None,
        }
    }

    fn categorical_value<'a>(&self, record: &'a ConstituencyRecord) -> Option<&'a str> {
        match self {
            Dimension::Gender => record.winner_gender.as_deref(),
            Dimension::Category => record.winner_category.as_deref(),
            Dimension::Party => Some(record.winner_party.as_str()),
            _ => None,
        }
    }
}

impl Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Dimension {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dimension::ALL
            .iter()
            .find(|d| d.key() == s)
            .cloned()
            .ok_or_else(|| format!("unknown filter dimension {:?}", s))
    }
}

/// A numeric range `(min, max]`, or `[min, max]` when `closed_min` is set.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Bucket {
    pub token: &'static str,
    pub min: f64,
    pub max: f64,
    pub closed_min: bool,
}

impl Bucket {
    const fn lowest(token: &'static str, min: f64, max: f64) -> Bucket {
        Bucket {
            token,
            min,
            max,
            closed_min: true,
        }
    }

    const fn above(token: &'static str, min: f64, max: f64) -> Bucket {
        Bucket {
            token,
            min,
            max,
            closed_min: false,
        }
    }

    pub fn contains(&self, x: f64) -> bool {
        let above_min = if self.closed_min {
            x >= self.min
        } else {
            x > self.min
        };
        above_min && x <= self.max
    }
}

pub const AGE_BUCKETS: [Bucket; 5] = [
    Bucket::lowest("21-35", 21.0, 35.0),
    Bucket::above("36-45", 35.0, 45.0),
    Bucket::above("46-55", 45.0, 55.0),
    Bucket::above("56-65", 55.0, 65.0),
    Bucket::above("65+", 65.0, 150.0),
];

pub const MARGIN_BUCKETS: [Bucket; 5] = [
    Bucket::lowest("<2", 0.0, 2.0),
    Bucket::above("2-5", 2.0, 5.0),
    Bucket::above("5-10", 5.0, 10.0),
    Bucket::above("10-20", 10.0, 20.0),
    Bucket::above(">20", 20.0, 100.0),
];

pub const TURNOUT_BUCKETS: [Bucket; 6] = [
    Bucket::lowest("<60", 0.0, 60.0),
    Bucket::above("60-70", 60.0, 70.0),
    Bucket::above("70-75", 70.0, 75.0),
    Bucket::above("75-80", 75.0, 80.0),
    Bucket::above("80-85", 80.0, 85.0),
    Bucket::above(">85", 85.0, 100.0),
];

pub const GENDER_TOKENS: [&str; 2] = ["MALE", "FEMALE"];
pub const CATEGORY_TOKENS: [&str; 3] = ["SC", "ST", "GEN"];

/// The separator between the tokens of one query parameter.
pub const TOKEN_DELIMITER: char = ',';

/// A predicate over a record.
pub type Predicate<'a> = Box<dyn Fn(&ConstituencyRecord) -> bool + Send + Sync + 'a>;

/// True if any of the predicates holds.
pub fn any_of(preds: Vec<Predicate<'_>>) -> Predicate<'_> {
    Box::new(move |r: &ConstituencyRecord| preds.iter().any(|p| p(r)))
}

/// True if all the predicates hold. Holds for an empty list.
pub fn all_of(preds: Vec<Predicate<'_>>) -> Predicate<'_> {
    Box::new(move |r: &ConstituencyRecord| preds.iter().all(|p| p(r)))
}

fn token_predicate(dim: Dimension, token: &str) -> Predicate<'_> {
    match dim.buckets() {
        Some(buckets) => match buckets.iter().find(|b| b.token == token) {
            Some(bucket) => {
                let bucket = *bucket;
                Box::new(move |r: &ConstituencyRecord| {
                    dim.numeric_value(r).map_or(false, |x| bucket.contains(x))
                })
            }
            None => {
                warn!("filter: unknown token {:?} for dimension {}", token, dim);
                Box::new(|_: &ConstituencyRecord| false)
            }
        },
        None => match dim.tokens() {
            Some(tokens) if !tokens.iter().any(|t| *t == token) => {
                warn!("filter: unknown token {:?} for dimension {}", token, dim);
                Box::new(|_: &ConstituencyRecord| false)
            }
            _ => Box::new(move |r: &ConstituencyRecord| {
                dim.categorical_value(r) == Some(token)
            }),
        },
    }
}

/// The selected tokens for every dimension. An empty selection puts no
/// constraint on its dimension.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct FilterSpec {
    selections: BTreeMap<Dimension, BTreeSet<String>>,
}

impl FilterSpec {
    pub fn selected(&self, dim: Dimension) -> impl Iterator<Item = &str> {
        self.selections
            .get(&dim)
            .into_iter()
            .flat_map(|s| s.iter().map(|t| t.as_str()))
    }

    pub fn select(&mut self, dim: Dimension, token: &str) {
        self.selections
            .entry(dim)
            .or_default()
            .insert(token.to_string());
    }

    pub fn deselect(&mut self, dim: Dimension, token: &str) {
        if let Some(s) = self.selections.get_mut(&dim) {
            s.remove(token);
            if s.is_empty() {
                self.selections.remove(&dim);
            }
        }
    }

    /// Replaces the whole selection of a dimension.
    pub fn set<I, S>(&mut self, dim: Dimension, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let s: BTreeSet<String> = tokens.into_iter().map(|t| t.into()).collect();
        if s.is_empty() {
            self.selections.remove(&dim);
        } else {
            self.selections.insert(dim, s);
        }
    }

    pub fn clear(&mut self) {
        self.selections.clear();
    }

    /// The number of dimensions with at least one selected token.
    pub fn active_dimensions(&self) -> usize {
        self.selections.values().filter(|s| !s.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.active_dimensions() == 0
    }

    /// ANDs one predicate per constrained dimension, each being the OR of its tokens.
    pub fn compile(&self) -> Predicate<'_> {
        let dims: Vec<Predicate<'_>> = self
            .selections
            .iter()
            .filter(|(_, tokens)| !tokens.is_empty())
            .map(|(dim, tokens)| {
                any_of(
                    tokens
                        .iter()
                        .map(|t| token_predicate(*dim, t.as_str()))
                        .collect(),
                )
            })
            .collect();
        all_of(dims)
    }

    pub fn apply<'a, I>(&self, records: I) -> Vec<&'a ConstituencyRecord>
    where
        I: IntoIterator<Item = &'a ConstituencyRecord>,
    {
        let pred = self.compile();
        records.into_iter().filter(|r| pred(*r)).collect()
    }

    /// The features of the dataset that pass the filter, optionally restricted
    /// to one state. Features without election data only pass an empty filter.
    pub fn select_features<'a>(
        &self,
        dataset: &'a MergedDataset,
        state: Option<&'a str>,
    ) -> Vec<(&'a Feature, Option<&'a ConstituencyRecord>)> {
        let pred = self.compile();
        let unconstrained = self.is_empty();
        dataset
            .in_state(state)
            .filter(|(_, r)| match r {
                Some(r) => pred(*r),
                None => unconstrained,
            })
            .collect()
    }

    /// One `(key, tokens)` pair per constrained dimension.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        self.selections
            .iter()
            .filter(|(_, tokens)| !tokens.is_empty())
            .map(|(dim, tokens)| {
                let joined: Vec<&str> = tokens.iter().map(|t| t.as_str()).collect();
                (dim.key(), joined.join(&TOKEN_DELIMITER.to_string()))
            })
            .collect()
    }

    /// Reads the selections from query parameters. Unknown keys are ignored.
    /// A key present several times adds to the selection.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> FilterSpec
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut spec = FilterSpec::default();
        for (k, v) in pairs {
            let dim = match k.as_ref().parse::<Dimension>() {
                Ok(d) => d,
                Err(msg) => {
                    warn!("filter: ignoring query parameter: {}", msg);
                    continue;
                }
            };
            for token in v.as_ref().split(TOKEN_DELIMITER) {
                let token = token.trim();
                if !token.is_empty() {
                    spec.select(dim, token);
                }
            }
        }
        spec
    }

    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.to_query_pairs())
            .finish()
    }

    pub fn from_query_string(query: &str) -> FilterSpec {
        let query = query.strip_prefix('?').unwrap_or(query);
        FilterSpec::from_query_pairs(form_urlencoded::parse(query.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        ac_id: u64,
        party: &str,
        age: Option<u32>,
        gender: &str,
        margin: u64,
        turnout: Option<f64>,
    ) -> ConstituencyRecord {
        ConstituencyRecord {
            ac_id,
            ac_name: format!("AC {}", ac_id),
            st_name: "Punjab".to_string(),
            ac_no: Some(ac_id as u32),
            winner_name: "W".to_string(),
            winner_party: party.to_string(),
            winner_age: age,
            winner_gender: Some(gender.to_string()),
            winner_category: Some("GEN".to_string()),
            runnerup_party: "X".to_string(),
            margin,
            turnout,
            total_votes: 1000,
            total_electors: Some(1500),
            total_postal: 0,
            party_vote_shares: BTreeMap::new(),
            top_candidates: vec![],
            is_bye_election: None,
            year: Some(2022),
            wiki_link: None,
        }
    }

    fn sample() -> Vec<ConstituencyRecord> {
        vec![
            record(1, "AAP", Some(30), "MALE", 0, Some(59.0)),
            record(2, "INC", Some(50), "FEMALE", 30, Some(72.0)),
            record(3, "AAP", Some(66), "FEMALE", 150, Some(86.5)),
            record(4, "SAD", None, "MALE", 500, None),
        ]
    }

    fn ids(rs: &[&ConstituencyRecord]) -> Vec<u64> {
        rs.iter().map(|r| r.ac_id).collect()
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let data = sample();
        let spec = FilterSpec::default();
        assert_eq!(spec.apply(&data).len(), data.len());
        assert!(spec.is_empty());
    }

    #[test]
    fn or_within_a_dimension() {
        let data = sample();
        let mut spec = FilterSpec::default();
        spec.select(Dimension::Party, "INC");
        spec.select(Dimension::Party, "SAD");
        assert_eq!(ids(&spec.apply(&data)), vec![2, 4]);
    }

    #[test]
    fn and_across_dimensions() {
        let data = sample();
        let mut spec = FilterSpec::default();
        spec.set(Dimension::Party, ["AAP", "INC"]);
        spec.select(Dimension::Gender, "FEMALE");
        spec.select(Dimension::Age, "46-55");
        assert_eq!(ids(&spec.apply(&data)), vec![2]);
        assert_eq!(spec.active_dimensions(), 3);

        spec.deselect(Dimension::Age, "46-55");
        assert_eq!(ids(&spec.apply(&data)), vec![2, 3]);
        assert_eq!(spec.active_dimensions(), 2);
    }

    #[test]
    fn lowest_bucket_includes_its_minimum() {
        let data = sample();
        let mut spec = FilterSpec::default();
        // Record 1 has a margin of exactly 0%.
        spec.select(Dimension::Margin, "<2");
        assert_eq!(ids(&spec.apply(&data)), vec![1]);

        // 3% and 15%
        spec.set(Dimension::Margin, ["2-5", "10-20"]);
        assert_eq!(ids(&spec.apply(&data)), vec![2, 3]);
    }

    #[test]
    fn upper_bounds_are_inclusive() {
        let b = TURNOUT_BUCKETS[1];
        assert!(!b.contains(60.0));
        assert!(b.contains(60.01));
        assert!(b.contains(70.0));
        assert!(TURNOUT_BUCKETS[0].contains(0.0));
        assert!(AGE_BUCKETS[1].contains(36.0));
        assert!(!AGE_BUCKETS[1].contains(35.0));
    }

    #[test]
    fn missing_values_never_match_a_constraint() {
        let data = sample();
        let mut spec = FilterSpec::default();
        spec.set(Dimension::Turnout, TURNOUT_BUCKETS.iter().map(|b| b.token));
        assert_eq!(ids(&spec.apply(&data)), vec![1, 2, 3]);
        spec.clear();
        spec.set(Dimension::Age, AGE_BUCKETS.iter().map(|b| b.token));
        assert_eq!(ids(&spec.apply(&data)), vec![1, 2, 3]);
    }

    #[test]
    fn unknown_tokens_match_nothing() {
        let data = sample();
        let mut spec = FilterSpec::default();
        spec.select(Dimension::Turnout, "lots");
        assert!(spec.apply(&data).is_empty());
    }

    #[test]
    fn category_selects_the_union() {
        let mut data = sample();
        data[1].winner_category = Some("SC".to_string());
        data[2].winner_category = Some("ST".to_string());
        data[3].winner_category = None;
        let mut spec = FilterSpec::from_query_string("category=SC,ST");
        assert_eq!(ids(&spec.apply(&data)), vec![2, 3]);

        spec.set(Dimension::Category, ["GEN"]);
        assert_eq!(ids(&spec.apply(&data)), vec![1]);

        spec.select(Dimension::Gender, "FEMALE");
        assert!(spec.apply(&data).is_empty());
    }

    #[test]
    fn categorical_tokens_are_checked() {
        let data = sample();
        let mut spec = FilterSpec::default();
        spec.select(Dimension::Gender, "female");
        assert!(spec.apply(&data).is_empty());
        spec.select(Dimension::Gender, "FEMALE");
        assert_eq!(ids(&spec.apply(&data)), vec![2, 3]);

        // Party names are open.
        spec.clear();
        spec.select(Dimension::Party, "SAD");
        assert_eq!(ids(&spec.apply(&data)), vec![4]);
        assert_eq!(Dimension::Party.tokens(), None);
        assert_eq!(Dimension::Category.tokens(), Some(&CATEGORY_TOKENS[..]));
    }

    #[test]
    fn query_round_trip() {
        let mut spec = FilterSpec::default();
        spec.set(Dimension::Turnout, [">85", "<60"]);
        spec.select(Dimension::Party, "BJP");
        spec.select(Dimension::Category, "SC");
        let q = spec.to_query_string();
        assert_eq!(FilterSpec::from_query_string(&q), spec);
        assert_eq!(
            spec.to_query_pairs(),
            vec![
                ("category", "SC".to_string()),
                ("turnout", "<60,>85".to_string()),
                ("party", "BJP".to_string())
            ]
        );
    }

    #[test]
    fn query_parsing_is_lenient() {
        let spec = FilterSpec::from_query_string("?mode=WINNER&age=21-35,,65%2B&gender=&party=INC");
        let ages: Vec<&str> = spec.selected(Dimension::Age).collect();
        assert_eq!(ages, vec!["21-35", "65+"]);
        assert_eq!(spec.selected(Dimension::Gender).count(), 0);
        assert_eq!(spec.active_dimensions(), 2);
    }
}

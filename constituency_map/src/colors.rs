use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use crate::model::ConstituencyRecord;

pub const DEFAULT_COLOR: &str = "#808080";
/// Vote share mode, when the selected party did not contest.
pub const NO_PARTICIPATION_COLOR: &str = "#ffffff";
/// Vote share mode, when no party is selected.
pub const NO_PARTY_SELECTED_COLOR: &str = "#e5e7eb";

/// From deep favorable to deep unfavorable.
const INTENSITY_RAMP: [&str; 5] = [
    "rgb(6, 77, 25)",
    "rgb(0, 255, 0)",
    "rgb(255, 255, 0)",
    "rgb(255, 0, 0)",
    "rgb(137, 0, 0)",
];

/// From the highest turnout to the lowest.
const TURNOUT_RAMP: [&str; 6] = [
    "#1e3a8a", "#1e40af", "#1d4ed8", "#2563eb", "#3b82f6", "#93c5fd",
];

const AGE_RAMP: [&str; 5] = ["#10b981", "#14b8a6", "#f59e0b", "#f97316", "#ef4444"];

/// Parties shown in the legend of the party modes, when they have a color.
pub const LEGEND_PARTIES: [&str; 10] = [
    "BJP", "INC", "AAP", "TMC", "DMK", "YSRCP", "BJD", "TRS", "SP", "NCP",
];

/// A band of a numeric color scale: values strictly above `above` get `color`.
/// The last band of a scale catches everything else.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Band {
    pub above: f64,
    pub color: &'static str,
    pub label: &'static str,
}

/// A scale, checked in order.
#[derive(PartialEq, Debug, Clone)]
pub struct Scale {
    pub bands: Vec<Band>,
    pub fallback: &'static str,
    pub fallback_label: &'static str,
}

impl Scale {
    pub fn color(&self, x: f64) -> &'static str {
        self.bands
            .iter()
            .find(|b| x > b.above)
            .map(|b| b.color)
            .unwrap_or(self.fallback)
    }

    fn legend(&self) -> Vec<LegendItem> {
        let mut items: Vec<LegendItem> = self
            .bands
            .iter()
            .map(|b| LegendItem::new(b.color, b.label))
            .collect();
        items.push(LegendItem::new(self.fallback, self.fallback_label));
        items
    }
}

fn band(above: f64, color: &'static str, label: &'static str) -> Band {
    Band {
        above,
        color,
        label,
    }
}

/// The display modes of the choropleth.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum DisplayMode {
    Winner,
    RunnerUp,
    VoteShare,
    Margin,
    Turnout,
    Gender,
    Category,
    Age,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 8] = [
        DisplayMode::Winner,
        DisplayMode::RunnerUp,
        DisplayMode::VoteShare,
        DisplayMode::Margin,
        DisplayMode::Turnout,
        DisplayMode::Gender,
        DisplayMode::Category,
        DisplayMode::Age,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DisplayMode::Winner => "WINNER",
            DisplayMode::RunnerUp => "RUNNER_UP",
            DisplayMode::VoteShare => "VOTE_SHARE",
            DisplayMode::Margin => "MARGIN",
            DisplayMode::Turnout => "TURNOUT",
            DisplayMode::Gender => "DEMOGRAPHICS_GENDER",
            DisplayMode::Category => "DEMOGRAPHICS_CATEGORY",
            DisplayMode::Age => "DEMOGRAPHICS_AGE",
        }
    }
}

impl Default for DisplayMode {
    fn default() -> Self {
        DisplayMode::Winner
    }
}

impl Display for DisplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for DisplayMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        DisplayMode::ALL
            .iter()
            .find(|m| m.name() == upper)
            .cloned()
            .ok_or_else(|| format!("unknown display mode {:?}", s))
    }
}

/// A palette entry: either a CSS color, or red, green, blue and alpha in [0, 1].
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaletteColor {
    Css(String),
    Rgba([f64; 4]),
}

impl PaletteColor {
    /// The color in a form a browser understands.
    pub fn to_css(&self) -> String {
        match self {
            PaletteColor::Css(s) => s.clone(),
            PaletteColor::Rgba([r, g, b, a]) => format!(
                "rgba({}, {}, {}, {})",
                to_byte(*r),
                to_byte(*g),
                to_byte(*b),
                a
            ),
        }
    }
}

fn to_byte(x: f64) -> u8 {
    (x * 255.0).round().clamp(0.0, 255.0) as u8
}

/// The colors of the parties.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette {
    colors: BTreeMap<String, PaletteColor>,
}

impl Palette {
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn contains(&self, party: &str) -> bool {
        self.colors.contains_key(party)
    }

    pub fn get(&self, party: &str) -> Option<String> {
        self.colors.get(party).map(|c| c.to_css())
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct LegendItem {
    pub color: String,
    pub label: String,
}

impl LegendItem {
    fn new(color: &str, label: &str) -> LegendItem {
        LegendItem {
            color: color.to_string(),
            label: label.to_string(),
        }
    }
}

/// Everything needed to color a constituency: the party palette and the
/// scales of the numeric modes. Immutable once built.
#[derive(PartialEq, Debug, Clone)]
pub struct ColorScheme {
    pub palette: Palette,
    pub default_color: &'static str,
    pub vote_share: Scale,
    pub margin: Scale,
    pub turnout: Scale,
    pub age: Scale,
}

impl ColorScheme {
    pub fn new(palette: Palette) -> ColorScheme {
        let [deep_green, green, yellow, red, deep_red] = INTENSITY_RAMP;
        let [t85, t80, t75, t70, t60, t_low] = TURNOUT_RAMP;
        let [young, a45, a55, a65, senior] = AGE_RAMP;
        ColorScheme {
            palette,
            default_color: DEFAULT_COLOR,
            vote_share: Scale {
                bands: vec![
                    band(50.0, deep_green, "> 50%"),
                    band(35.0, green, "35-50%"),
                    band(20.0, yellow, "20-35%"),
                    band(10.0, red, "10-20%"),
                ],
                fallback: deep_red,
                fallback_label: "< 10%",
            },
            margin: Scale {
                bands: vec![
                    band(20.0, deep_green, "> 20% (Landslide)"),
                    band(10.0, green, "10-20%"),
                    band(5.0, yellow, "5-10%"),
                    band(2.0, red, "2-5%"),
                ],
                fallback: deep_red,
                fallback_label: "< 2% (Close)",
            },
            turnout: Scale {
                bands: vec![
                    band(85.0, t85, "> 85%"),
                    band(80.0, t80, "80-85%"),
                    band(75.0, t75, "75-80%"),
                    band(70.0, t70, "70-75%"),
                    band(60.0, t60, "60-70%"),
                ],
                fallback: t_low,
                fallback_label: "< 60%",
            },
            // Ages are checked from the top: everything up to 35 is young.
            age: Scale {
                bands: vec![
                    band(65.0, senior, "65+ (Senior)"),
                    band(55.0, a65, "56-65"),
                    band(45.0, a55, "46-55"),
                    band(35.0, a45, "36-45"),
                ],
                fallback: young,
                fallback_label: "Up to 35 (Young)",
            },
        }
    }

    /// The palette color of a party, or the neutral default.
    pub fn party_color(&self, party: &str) -> String {
        self.palette
            .get(party)
            .unwrap_or_else(|| self.default_color.to_string())
    }

    /// The color of one constituency under the given mode.
    ///
    /// `selected_party` is only used by the vote share mode.
    /// Missing numeric values count as zero.
    pub fn color_for(
        &self,
        record: &ConstituencyRecord,
        mode: DisplayMode,
        selected_party: Option<&str>,
    ) -> String {
        match mode {
            DisplayMode::Winner => self.party_color(&record.winner_party),
            DisplayMode::RunnerUp => self.party_color(&record.runnerup_party),
            DisplayMode::VoteShare => match selected_party.filter(|p| !p.is_empty()) {
                None => NO_PARTY_SELECTED_COLOR.to_string(),
                Some(party) => match record.vote_share(party) {
                    None => NO_PARTICIPATION_COLOR.to_string(),
                    Some(share) => self.vote_share.color(share).to_string(),
                },
            },
            DisplayMode::Margin => self
                .margin
                .color(record.margin_percentage().unwrap_or(0.0))
                .to_string(),
            DisplayMode::Turnout => self.turnout.color(record.turnout.unwrap_or(0.0)).to_string(),
            DisplayMode::Gender => gender_color(record.winner_gender.as_deref()).to_string(),
            DisplayMode::Category => category_color(record.winner_category.as_deref()).to_string(),
            DisplayMode::Age => match record.winner_age {
                Some(age) => self.age.color(age as f64).to_string(),
                None => self.default_color.to_string(),
            },
        }
    }

    /// Same as [`ColorScheme::color_for`], for a geometry that may not have any
    /// election data attached.
    pub fn feature_color(
        &self,
        record: Option<&ConstituencyRecord>,
        mode: DisplayMode,
        selected_party: Option<&str>,
    ) -> String {
        match record {
            Some(r) => self.color_for(r, mode, selected_party),
            None => self.default_color.to_string(),
        }
    }

    /// The entries of the legend of a mode, in display order.
    pub fn legend(&self, mode: DisplayMode) -> Vec<LegendItem> {
        match mode {
            DisplayMode::Winner | DisplayMode::RunnerUp => LEGEND_PARTIES
                .iter()
                .filter(|p| self.palette.contains(p))
                .map(|p| LegendItem::new(&self.party_color(p), p))
                .collect(),
            DisplayMode::VoteShare => self.vote_share.legend(),
            DisplayMode::Margin => self.margin.legend(),
            DisplayMode::Turnout => self.turnout.legend(),
            DisplayMode::Gender => vec![
                LegendItem::new(MALE_COLOR, "Male"),
                LegendItem::new(FEMALE_COLOR, "Female"),
            ],
            DisplayMode::Category => vec![
                LegendItem::new(SC_COLOR, "SC"),
                LegendItem::new(ST_COLOR, "ST"),
                LegendItem::new(GENERAL_COLOR, "General"),
            ],
            DisplayMode::Age => self.age.legend().into_iter().rev().collect(),
        }
    }
}

const MALE_COLOR: &str = "#3b82f6";
const FEMALE_COLOR: &str = "#ec4899";
const SC_COLOR: &str = "#7c3aed";
const ST_COLOR: &str = "#059669";
const GENERAL_COLOR: &str = "#f59e0b";

fn gender_color(gender: Option<&str>) -> &'static str {
    match gender {
        Some("MALE") => MALE_COLOR,
        None => DEFAULT_COLOR,
        Some(_) => FEMALE_COLOR,
    }
}

fn category_color(category: Option<&str>) -> &'static str {
    match category {
        Some("SC") => SC_COLOR,
        Some("ST") => ST_COLOR,
        _ => GENERAL_COLOR,
    }
}

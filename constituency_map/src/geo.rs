use log::{debug, info, warn};

use geojson::{Geometry, Value as GeoValue};
use serde_json::{Map as JSMap, Value as JSValue};
use std::collections::BTreeMap;

use crate::model::ConstituencyRecord;

/// The default property holding the constituency id of a feature.
pub const DEFAULT_ID_PROPERTY: &str = "ac_id";
/// The default property holding the state name of a feature.
pub const DEFAULT_STATE_PROPERTY: &str = "st_name";

pub use geojson::{Feature, FeatureCollection};

/// Reads the election properties of a boundary feature.
pub trait FeatureProperties {
    /// The constituency id stored under the given property, if it can be read as an integer.
    /// Ids may be stored as numbers or as numeric strings.
    fn constituency_id(&self, id_property: &str) -> Option<u64>;

    fn string_property(&self, key: &str) -> Option<&str>;

    /// Reads back the aggregated record from the property bag of a merged feature.
    fn record(&self) -> Option<ConstituencyRecord>;
}

impl FeatureProperties for Feature {
    fn constituency_id(&self, id_property: &str) -> Option<u64> {
        match self.property(id_property)? {
            JSValue::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                    .map(|f| f as u64)
            }),
            JSValue::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }
    }

    fn string_property(&self, key: &str) -> Option<&str> {
        match self.property(key) {
            Some(JSValue::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    fn record(&self) -> Option<ConstituencyRecord> {
        let props = self.properties.as_ref()?;
        serde_json::from_value(JSValue::Object(props.clone())).ok()
    }
}

impl ConstituencyRecord {
    /// The record as a property bag.
    pub fn to_properties(&self) -> JSMap<String, JSValue> {
        match serde_json::to_value(self).unwrap_or_default() {
            JSValue::Object(m) => m,
            _ => JSMap::new(),
        }
    }
}

/// Diagnostics of a merge.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct MergeStats {
    pub matched: usize,
    /// Features with a readable id but no aggregated record.
    pub unmatched: usize,
    /// Features without a readable id.
    pub missing_id: usize,
}

/// Overlays the aggregated records onto the property bag of the matching features.
///
/// On a key collision, the record wins. Features without a match are left untouched.
pub fn merge_records(
    collection: &mut FeatureCollection,
    records: &BTreeMap<u64, ConstituencyRecord>,
    id_property: &str,
) -> MergeStats {
    let mut stats = MergeStats::default();
    for feature in collection.features.iter_mut() {
        let ac_id = match feature.constituency_id(id_property) {
            Some(x) => x,
            None => {
                debug!(
                    "merge_records: feature without {:?}: {:?}",
                    id_property,
                    feature.property(id_property)
                );
                stats.missing_id += 1;
                continue;
            }
        };
        match records.get(&ac_id) {
            Some(record) => {
                feature
                    .properties
                    .get_or_insert_with(JSMap::new)
                    .extend(record.to_properties());
                stats.matched += 1;
            }
            None => {
                debug!("merge_records: no data found for id {}", ac_id);
                stats.unmatched += 1;
            }
        }
    }
    info!(
        "merge_records: merged data for {} features ({} unmatched, {} without id)",
        stats.matched, stats.unmatched, stats.missing_id
    );
    if stats.unmatched + stats.missing_id > 0 {
        warn!(
            "merge_records: {} features have no election data",
            stats.unmatched + stats.missing_id
        );
    }
    stats
}

/// A latitude/longitude rectangle.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct LatLonRect {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl LatLonRect {
    /// An invalid rectangle that any position will replace.
    pub const EMPTY: LatLonRect = LatLonRect {
        min_lat: f64::INFINITY,
        max_lat: f64::NEG_INFINITY,
        min_lon: f64::INFINITY,
        max_lon: f64::NEG_INFINITY,
    };

    pub fn is_empty(&self) -> bool {
        self.min_lat > self.max_lat || self.min_lon > self.max_lon
    }

    pub fn extend(&mut self, lon: f64, lat: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
    }

    /// `[[south-west lat, south-west lon], [north-east lat, north-east lon]]`
    pub fn corners(&self) -> [[f64; 2]; 2] {
        [[self.min_lat, self.min_lon], [self.max_lat, self.max_lon]]
    }
}

/// Bounds per state name, in state name order.
pub type StateBounds = BTreeMap<String, [[f64; 2]; 2]>;

fn walk_positions(positions: &[Vec<f64>], rect: &mut LatLonRect) {
    for p in positions.iter() {
        if let [lon, lat, ..] = p.as_slice() {
            rect.extend(*lon, *lat);
        }
    }
}

fn walk_geometry(geometry: &Geometry, rect: &mut LatLonRect) {
    match &geometry.value {
        GeoValue::Point(p) => walk_positions(std::slice::from_ref(p), rect),
        GeoValue::MultiPoint(ps) | GeoValue::LineString(ps) => walk_positions(ps, rect),
        GeoValue::MultiLineString(rings) | GeoValue::Polygon(rings) => {
            for ring in rings.iter() {
                walk_positions(ring, rect);
            }
        }
        GeoValue::MultiPolygon(polygons) => {
            for ring in polygons.iter().flatten() {
                walk_positions(ring, rect);
            }
        }
        GeoValue::GeometryCollection(geometries) => {
            for g in geometries.iter() {
                walk_geometry(g, rect);
            }
        }
    }
}

/// The enclosing rectangle of every state.
///
/// Features without a state name are skipped. States whose features carry no
/// position are left out.
pub fn state_bounds(collection: &FeatureCollection, state_property: &str) -> StateBounds {
    let mut rects: BTreeMap<String, LatLonRect> = BTreeMap::new();
    for feature in collection.features.iter() {
        let state = match feature.string_property(state_property) {
            Some(s) => s,
            None => continue,
        };
        let rect = rects.entry(state.to_string()).or_insert(LatLonRect::EMPTY);
        if let Some(geometry) = &feature.geometry {
            walk_geometry(geometry, rect);
        }
    }
    rects
        .into_iter()
        .filter_map(|(state, rect)| {
            if rect.is_empty() {
                warn!("state_bounds: no coordinates for state {:?}", state);
                None
            } else {
                Some((state, rect.corners()))
            }
        })
        .collect()
}

/// The merged collection, with the record of every feature read back once.
#[derive(PartialEq, Debug, Clone)]
pub struct MergedDataset {
    pub collection: FeatureCollection,
    records: Vec<Option<ConstituencyRecord>>,
    state_property: String,
}

impl MergedDataset {
    pub fn new(collection: FeatureCollection, state_property: &str) -> MergedDataset {
        let records: Vec<Option<ConstituencyRecord>> =
            collection.features.iter().map(|f| f.record()).collect();
        debug!(
            "MergedDataset: {} features, {} with records",
            records.len(),
            records.iter().filter(|r| r.is_some()).count()
        );
        MergedDataset {
            collection,
            records,
            state_property: state_property.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.collection.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.features.is_empty()
    }

    /// The property holding the state name of a feature.
    pub fn state_property(&self) -> &str {
        &self.state_property
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Feature, Option<&ConstituencyRecord>)> {
        self.collection
            .features
            .iter()
            .zip(self.records.iter().map(|r| r.as_ref()))
    }

    pub fn records(&self) -> impl Iterator<Item = &ConstituencyRecord> {
        self.records.iter().flatten()
    }

    pub fn find(&self, ac_id: u64) -> Option<(&Feature, &ConstituencyRecord)> {
        self.entries().find_map(|(f, r)| match r {
            Some(r) if r.ac_id == ac_id => Some((f, r)),
            _ => None,
        })
    }

    /// The features of one state. None selects everything.
    pub fn in_state<'a>(
        &'a self,
        state: Option<&'a str>,
    ) -> impl Iterator<Item = (&'a Feature, Option<&'a ConstituencyRecord>)> + 'a {
        self.entries().filter(move |(f, _)| match state {
            Some(s) => f.string_property(&self.state_property) == Some(s),
            None => true,
        })
    }
}

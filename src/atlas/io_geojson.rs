// Reading the JSON inputs: boundaries, palette and previously merged data.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::atlas::*;

fn read_json<T: DeserializeOwned>(path: &Path) -> BAtlasResult<T> {
    let path_s = path.display().to_string();
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu {
        path: path_s.clone(),
    })?;
    let res: T =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path: path_s })?;
    Ok(res)
}

pub fn read_boundaries(path: &Path) -> BAtlasResult<FeatureCollection> {
    let collection: FeatureCollection = read_json(path)?;
    info!(
        "read_boundaries: {} features in {}",
        collection.features.len(),
        path.display()
    );
    if collection.features.is_empty() {
        warn!("read_boundaries: {} has no feature", path.display());
    }
    Ok(collection)
}

pub fn read_palette(path: &Path) -> BAtlasResult<Palette> {
    let palette: Palette = read_json(path)?;
    info!("read_palette: {} party colors", palette.len());
    Ok(palette)
}

/// Reads a map data file written by a previous run.
pub fn read_merged(path: &Path, state_property: &str) -> BAtlasResult<MergedDataset> {
    let collection: FeatureCollection = read_json(path)?;
    let dataset = MergedDataset::new(collection, state_property);
    info!(
        "read_merged: {} features, {} with election data",
        dataset.len(),
        dataset.records().count()
    );
    Ok(dataset)
}

// Rendering, writing and checking the data files.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use text_diff::print_diff;

use crate::atlas::*;

/// A data file, fully rendered before anything is written.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub contents: String,
}

fn render<T: Serialize + ?Sized>(
    file_name: &str,
    value: &T,
    pretty: bool,
) -> BAtlasResult<Artifact> {
    let contents = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context(SerializingJsonSnafu { name: file_name })?;
    Ok(Artifact {
        file_name: file_name.to_string(),
        contents,
    })
}

pub fn render_artifacts(
    merged: &FeatureCollection,
    search_index: &[SearchIndexEntry],
    bounds: &StateBounds,
    output: &OutputPaths,
) -> BAtlasResult<Vec<Artifact>> {
    let pretty = output.pretty_print;
    Ok(vec![
        render(&output.map_data_file, merged, pretty)?,
        render(&output.search_index_file, search_index, pretty)?,
        render(&output.state_bounds_file, bounds, pretty)?,
    ])
}

/// Writes every file next to its destination, then moves them into place.
///
/// All the files are written before the first one is moved, so a failed
/// write leaves the previous files untouched.
pub fn write_artifacts(dir: &Path, artifacts: &[Artifact]) -> BAtlasResult<()> {
    fs::create_dir_all(dir).context(WritingArtifactSnafu {
        path: dir.display().to_string(),
    })?;
    let mut staged: Vec<(NamedTempFile, PathBuf, &Artifact)> = Vec::new();
    for artifact in artifacts.iter() {
        let target = dir.join(&artifact.file_name);
        let target_s = target.display().to_string();
        let mut tmp = NamedTempFile::new_in(target.parent().unwrap_or(dir)).context(
            WritingArtifactSnafu {
                path: target_s.clone(),
            },
        )?;
        tmp.write_all(artifact.contents.as_bytes())
            .context(WritingArtifactSnafu { path: target_s })?;
        staged.push((tmp, target, artifact));
    }
    debug!("write_artifacts: {} files staged", staged.len());

    for (tmp, target, artifact) in staged.into_iter() {
        let target_s = target.display().to_string();
        tmp.persist(&target).context(PersistingArtifactSnafu {
            path: target_s.clone(),
        })?;
        info!(
            "write_artifacts: wrote {} ({} bytes, sha256 {})",
            target_s,
            artifact.contents.len(),
            sha256::digest(artifact.contents.as_str())
        );
    }
    Ok(())
}

/// Compares every file with the file of the same name in the reference directory.
/// Both sides are compared as JSON documents, so the formatting does not matter.
pub fn check_reference(reference_dir: &Path, artifacts: &[Artifact]) -> BAtlasResult<()> {
    let mut mismatches: Vec<String> = Vec::new();
    for artifact in artifacts.iter() {
        let ref_path = reference_dir.join(&artifact.file_name);
        let ref_path_s = ref_path.display().to_string();
        let ref_contents = fs::read_to_string(&ref_path).context(OpeningJsonSnafu {
            path: ref_path_s.clone(),
        })?;
        let pretty_ref = normalize(&ref_contents, &ref_path_s)?;
        let pretty_new = normalize(&artifact.contents, &artifact.file_name)?;
        if pretty_ref != pretty_new {
            warn!(
                "check_reference: found differences with the reference {}",
                ref_path_s
            );
            print_diff(pretty_ref.as_str(), pretty_new.as_str(), "\n");
            mismatches.push(artifact.file_name.clone());
        }
    }
    ensure!(
        mismatches.is_empty(),
        ReferenceMismatchSnafu {
            name: mismatches.join(", ")
        }
    );
    Ok(())
}

fn normalize(contents: &str, path: &str) -> BAtlasResult<String> {
    let js: JSValue = serde_json::from_str(contents).context(ParsingJsonSnafu { path })?;
    let pretty = serde_json::to_string_pretty(&js).context(SerializingJsonSnafu { name: path })?;
    Ok(pretty)
}

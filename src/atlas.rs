use log::{debug, info, warn};

use constituency_map::*;
use snafu::{prelude::*, Snafu};

use std::path::PathBuf;

use serde_json::json;
use serde_json::Value as JSValue;

use crate::args::Args;
use crate::atlas::config_reader::*;
use crate::atlas::io_output::Artifact;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_geojson;
mod io_output;
mod io_xlsx;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AtlasError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook {path} has no worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("The workbook {path} has no worksheet named {name:?}"))]
    MissingWorksheet { path: String, name: String },
    #[snafu(display("Error opening csv file {path}"))]
    CsvOpen {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("The file {path} has no header row"))]
    MissingHeader { path: String },
    #[snafu(display("The file {path} has no column {name:?}"))]
    MissingColumn { path: String, name: String },
    #[snafu(display("{path}, line {lineno}: column {column:?} expects a non-negative integer, found {content}"))]
    WrongCellType {
        path: String,
        lineno: usize,
        column: String,
        content: String,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing {name}"))]
    SerializingJson {
        source: serde_json::Error,
        name: String,
    },
    #[snafu(display("Unknown input type {input_type:?} (expected xlsx or csv)"))]
    UnknownInputType { input_type: String },
    #[snafu(display("Error writing {path}"))]
    WritingArtifact {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error moving the new version of {path} into place"))]
    PersistingArtifact {
        source: tempfile::PersistError,
        path: String,
    },
    #[snafu(display("{name} differs from the reference file"))]
    ReferenceMismatch { name: String },
    #[snafu(display("The configuration file {path} has no parent directory"))]
    MissingParentDir { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type AtlasResult<T> = Result<T, AtlasError>;
pub type BAtlasResult<T> = Result<T, Box<AtlasError>>;

/// Everything the pipeline computed, before being written.
struct PipelineOutput {
    dataset: MergedDataset,
    bounds: StateBounds,
    artifacts: Vec<Artifact>,
}

/// Reads the inputs and builds the three data files in memory.
///
/// All the inputs are read before anything is rendered, and nothing is written here.
fn build(settings: &RunSettings) -> BAtlasResult<PipelineOutput> {
    let rows = match settings.input_type {
        InputType::Xlsx => io_xlsx::read_excel_file(
            &settings.results_file,
            settings.excel_worksheet_name.as_deref(),
        )?,
        InputType::Csv => io_csv::read_csv_file(&settings.results_file)?,
    };
    let mut boundaries = io_geojson::read_boundaries(&settings.boundaries_file)?;

    let aggregation = aggregate(&rows);
    let merge_stats = merge_records(
        &mut boundaries,
        &aggregation.records,
        &settings.id_property,
    );
    debug!("build: merge stats: {:?}", merge_stats);
    let bounds = state_bounds(&boundaries, &settings.state_property);
    info!(
        "build: {} constituencies, {} features with data, {} states",
        aggregation.stats.constituencies,
        merge_stats.matched,
        bounds.len()
    );

    let artifacts = io_output::render_artifacts(
        &boundaries,
        &aggregation.search_index,
        &bounds,
        &settings.output,
    )?;
    let dataset = MergedDataset::new(boundaries, &settings.state_property);
    Ok(PipelineOutput {
        dataset,
        bounds,
        artifacts,
    })
}

/// Builds and writes the data files.
/// Returns the merged dataset and the state bounds, for the queries.
pub fn run_pipeline(settings: &RunSettings) -> BAtlasResult<(MergedDataset, StateBounds)> {
    let output = build(settings)?;

    if let Some(reference_dir) = &settings.reference_dir {
        io_output::check_reference(reference_dir, &output.artifacts)?;
        info!("run_pipeline: all files match the reference");
    }

    io_output::write_artifacts(&settings.output.output_directory, &output.artifacts)?;
    Ok((output.dataset, output.bounds))
}

fn parse_mode(mode: Option<&str>) -> AtlasResult<DisplayMode> {
    match mode.map(|m| m.parse::<DisplayMode>()) {
        None => Ok(DisplayMode::default()),
        Some(Ok(m)) => Ok(m),
        Some(Err(msg)) => whatever!("{}", msg),
    }
}

/// What the query command selects and how it colors the selection.
#[derive(Debug, Clone, Default)]
pub struct Query<'a> {
    pub filter: FilterSpec,
    pub mode: DisplayMode,
    pub party: Option<&'a str>,
    pub state: Option<&'a str>,
}

impl<'a> Query<'a> {
    pub fn from_args(args: &'a Args) -> AtlasResult<Query<'a>> {
        Ok(Query {
            filter: FilterSpec::from_query_string(args.query.as_deref().unwrap_or("")),
            mode: parse_mode(args.mode.as_deref())?,
            party: args.party.as_deref(),
            state: args.state.as_deref(),
        })
    }
}

/// The JSON summary printed by the query command.
pub fn query_summary(
    dataset: &MergedDataset,
    bounds: &StateBounds,
    scheme: &ColorScheme,
    query: &Query,
    id_property: &str,
) -> JSValue {
    let selected = query.filter.select_features(dataset, query.state);
    let constituencies: Vec<JSValue> = selected
        .iter()
        .map(|(feature, record)| match record {
            Some(r) => json!({
                "id": r.ac_id,
                "name": r.ac_name,
                "state": r.st_name,
                "color": scheme.color_for(r, query.mode, query.party),
            }),
            None => json!({
                "id": feature.constituency_id(id_property),
                "name": JSValue::Null,
                "state": feature.string_property(dataset.state_property()),
                "color": scheme.feature_color(None, query.mode, query.party),
            }),
        })
        .collect();
    let viewport = query.state.and_then(|s| bounds.get(s));
    if query.state.is_some() && viewport.is_none() {
        warn!("query_summary: no bounds for state {:?}", query.state);
    }
    json!({
        "query": query.filter.to_query_string(),
        "mode": query.mode.name(),
        "party": query.party,
        "state": query.state,
        "count": constituencies.len(),
        "bounds": viewport,
        "legend": scheme.legend(query.mode),
        "constituencies": constituencies,
    })
}

fn run_query(args: &Args, settings: &RunSettings) -> BAtlasResult<()> {
    // Check the query before doing any work.
    let query = Query::from_args(args)?;
    let palette = io_geojson::read_palette(&settings.palette_file)?;
    let scheme = ColorScheme::new(palette);

    let (dataset, bounds) = match &args.merged {
        Some(p) => {
            let merged_path = PathBuf::from(p);
            let dataset = io_geojson::read_merged(&merged_path, &settings.state_property)?;
            let bounds = state_bounds(&dataset.collection, &settings.state_property);
            (dataset, bounds)
        }
        None => run_pipeline(settings)?,
    };

    let summary = query_summary(&dataset, &bounds, &scheme, &query, &settings.id_property);
    let pretty = serde_json::to_string_pretty(&summary).context(SerializingJsonSnafu {
        name: "query summary".to_string(),
    })?;
    println!("{}", pretty);
    Ok(())
}

pub fn run(args: &Args) -> BAtlasResult<()> {
    let settings = resolve_settings(args)?;
    info!("settings: {:?}", settings);
    if args.has_query() {
        run_query(args, &settings)
    } else {
        run_pipeline(&settings)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    const RESULTS: &str = "\
AC ID,AC NAME,STATE/UT NAME,STATE CODE,CANDIDATE NAME,PARTY,AGE,GENDER,CATEGORY,TOTAL,POSTAL,TOTAL ELECTORS
101,Varkala,Kerala,S11,Anna,AAA,41,FEMALE,GEN,50000,12,100000
101,Varkala,Kerala,S11,Bob,BBB,55,MALE,SC,30000,3,100000
101,Varkala,Kerala,S11,Clara,CCC,33,FEMALE,GEN,5000,0,100000
,,,,,,,,,,,
102,Adoor,Kerala,S11,Dan,BBB,60,MALE,SC,40000,1,
102,Adoor,Kerala,S11,Eve,AAA,38,FEMALE,GEN,39500,1,
";

    fn write_inputs(dir: &Path) {
        fs::write(dir.join("results.csv"), RESULTS).unwrap();
        let boundaries = json!({
            "type": "FeatureCollection",
            "name": "india_asm",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"ac_id": 101, "st_name": "Kerala", "ac_name": "VARKALA"},
                    "geometry": {"type": "Polygon", "coordinates": [[[76.7, 8.7], [76.8, 8.7], [76.8, 8.8], [76.7, 8.7]]]}
                },
                {
                    "type": "Feature",
                    "properties": {"ac_id": "102", "st_name": "Kerala"},
                    "geometry": {"type": "MultiPolygon", "coordinates": [[[[76.7, 9.1], [76.9, 9.2], [76.8, 9.3], [76.7, 9.1]]]]}
                },
                {
                    "type": "Feature",
                    "properties": {"ac_id": 999, "st_name": "Goa"},
                    "geometry": {"type": "Polygon", "coordinates": [[[74.0, 15.0], [74.1, 15.0], [74.1, 15.1], [74.0, 15.0]]]}
                }
            ]
        });
        fs::write(dir.join("boundaries.geojson"), boundaries.to_string()).unwrap();
        fs::write(
            dir.join("colors.json"),
            r##"{"AAA": "#ff0000", "BBB": [0.0, 0.0, 1.0, 1.0]}"##,
        )
        .unwrap();
    }

    fn args(dir: &Path, out: &str) -> Args {
        let p = |name: &str| Some(dir.join(name).to_string_lossy().to_string());
        Args {
            results: p("results.csv"),
            boundaries: p("boundaries.geojson"),
            palette: p("colors.json"),
            out: p(out),
            ..Default::default()
        }
    }

    fn read_outputs(dir: &Path) -> Vec<String> {
        ["map_data.json", "search_index.json", "state_bounds.json"]
            .iter()
            .map(|name| fs::read_to_string(dir.join(name)).unwrap())
            .collect()
    }

    #[test]
    fn pipeline_is_idempotent() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());

        run(&args(dir.path(), "first")).unwrap();
        run(&args(dir.path(), "second")).unwrap();
        let first = read_outputs(&dir.path().join("first"));
        let second = read_outputs(&dir.path().join("second"));
        assert_eq!(first, second);

        let index: JSValue = serde_json::from_str(&first[1]).unwrap();
        assert_eq!(index[0]["label"], json!("Varkala (Kerala)"));
        assert_eq!(index[1]["id"], json!(102));

        let bounds: JSValue = serde_json::from_str(&first[2]).unwrap();
        assert_eq!(bounds["Kerala"], json!([[8.7, 76.7], [9.3, 76.9]]));

        let merged: JSValue = serde_json::from_str(&first[0]).unwrap();
        assert_eq!(merged["name"], json!("india_asm"));
        let props = &merged["features"][0]["properties"];
        assert_eq!(props["ac_name"], json!("Varkala"));
        assert_eq!(props["turnout"], json!(85.0));
        assert_eq!(props["margin"], json!(20000));
        assert_eq!(merged["features"][1]["properties"]["turnout"], JSValue::Null);
        assert_eq!(merged["features"][2]["properties"]["winner_party"], JSValue::Null);
    }

    #[test]
    fn reference_check() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());
        run(&args(dir.path(), "reference")).unwrap();

        let mut a = args(dir.path(), "checked");
        a.reference = Some(dir.path().join("reference").to_string_lossy().to_string());
        run(&a).unwrap();

        // A different reference fails the run and writes nothing.
        fs::write(dir.path().join("reference").join("state_bounds.json"), "{}").unwrap();
        let mut a = args(dir.path(), "rejected");
        a.reference = Some(dir.path().join("reference").to_string_lossy().to_string());
        let err = run(&a).unwrap_err();
        assert!(matches!(*err, AtlasError::ReferenceMismatch { .. }));
        assert!(!dir.path().join("rejected").exists());
    }

    #[test]
    fn malformed_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());
        fs::write(dir.path().join("boundaries.geojson"), "{\"type\": ").unwrap();
        let err = run(&args(dir.path(), "out")).unwrap_err();
        assert!(matches!(*err, AtlasError::ParsingJson { .. }));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn query_on_merged_data() {
        let dir = tempfile::tempdir().unwrap();
        write_inputs(dir.path());
        let settings = resolve_settings(&args(dir.path(), "out")).unwrap();
        let (dataset, bounds) = run_pipeline(&settings).unwrap();
        let reread = io_geojson::read_merged(
            &settings.output.output_directory.join("map_data.json"),
            &settings.state_property,
        )
        .unwrap();
        assert_eq!(reread.records().count(), 2);

        let scheme = ColorScheme::new(io_geojson::read_palette(&settings.palette_file).unwrap());
        let query = Query {
            filter: FilterSpec::from_query_string("gender=MALE"),
            state: Some("Kerala"),
            ..Default::default()
        };
        let summary = query_summary(&dataset, &bounds, &scheme, &query, DEFAULT_ID_PROPERTY);
        assert_eq!(summary["count"], json!(1));
        assert_eq!(summary["constituencies"][0]["id"], json!(102));
        assert_eq!(summary["constituencies"][0]["color"], json!("rgba(0, 0, 255, 1)"));
        assert_eq!(summary["bounds"], json!([[8.7, 76.7], [9.3, 76.9]]));

        let query = Query {
            mode: DisplayMode::Turnout,
            ..Default::default()
        };
        let summary = query_summary(&reread, &bounds, &scheme, &query, DEFAULT_ID_PROPERTY);
        assert_eq!(summary["count"], json!(3));
        // A turnout of exactly 85% falls in the 80-85% band.
        assert_eq!(summary["constituencies"][0]["color"], json!("#1e40af"));
        assert_eq!(summary["constituencies"][2]["id"], json!(999));
        assert_eq!(summary["constituencies"][2]["state"], json!("Goa"));
        assert_eq!(summary["constituencies"][2]["color"], json!(DEFAULT_COLOR));
    }

    #[test]
    fn unknown_mode() {
        assert!(parse_mode(Some("HEATMAP")).is_err());
        assert_eq!(parse_mode(None).unwrap(), DisplayMode::Winner);
    }
}

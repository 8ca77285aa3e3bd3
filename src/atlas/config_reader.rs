use crate::args::Args;
use crate::atlas::*;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_RESULTS_FILE: &str = "raw_data/india_asm.xlsx";
pub const DEFAULT_BOUNDARIES_FILE: &str = "raw_data/india_asm.geojson";
pub const DEFAULT_PALETTE_FILE: &str = "raw_data/colors.json";
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "src/data";
pub const DEFAULT_MAP_DATA_FILE: &str = "map_data.json";
pub const DEFAULT_SEARCH_INDEX_FILE: &str = "search_index.json";
pub const DEFAULT_STATE_BOUNDS_FILE: &str = "state_bounds.json";

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputSettings {
    #[serde(rename = "resultsFile")]
    pub results_file: Option<String>,
    #[serde(rename = "resultsType")]
    pub results_type: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "boundariesFile")]
    pub boundaries_file: Option<String>,
    #[serde(rename = "paletteFile")]
    pub palette_file: Option<String>,
    #[serde(rename = "idProperty")]
    pub id_property: Option<String>,
    #[serde(rename = "stateProperty")]
    pub state_property: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "mapDataFile")]
    pub map_data_file: Option<String>,
    #[serde(rename = "searchIndexFile")]
    pub search_index_file: Option<String>,
    #[serde(rename = "stateBoundsFile")]
    pub state_bounds_file: Option<String>,
    #[serde(rename = "prettyPrint")]
    pub pretty_print: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtlasConfig {
    #[serde(rename = "inputSettings", default)]
    pub input_settings: InputSettings,
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum InputType {
    Xlsx,
    Csv,
}

impl InputType {
    /// Guesses the type from the file extension. Anything else than csv is read as a workbook.
    fn from_path(path: &Path) -> InputType {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => InputType::Csv,
            _ => InputType::Xlsx,
        }
    }
}

impl FromStr for InputType {
    type Err = AtlasError;
    fn from_str(s: &str) -> AtlasResult<InputType> {
        match s.to_lowercase().as_str() {
            "xlsx" | "excel" => Ok(InputType::Xlsx),
            "csv" => Ok(InputType::Csv),
            _ => UnknownInputTypeSnafu { input_type: s }.fail(),
        }
    }
}

/// Where and how to write the data files.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct OutputPaths {
    pub output_directory: PathBuf,
    pub map_data_file: String,
    pub search_index_file: String,
    pub state_bounds_file: String,
    pub pretty_print: bool,
}

/// The settings of a run, once the configuration file and the command line are combined.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunSettings {
    pub results_file: PathBuf,
    pub input_type: InputType,
    pub excel_worksheet_name: Option<String>,
    pub boundaries_file: PathBuf,
    pub palette_file: PathBuf,
    pub id_property: String,
    pub state_property: String,
    pub output: OutputPaths,
    pub reference_dir: Option<PathBuf>,
}

pub fn read_config(path: &str) -> BAtlasResult<AtlasConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: AtlasConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// Paths of the configuration file are relative to its directory.
fn resolve(root: &Path, p: &str) -> PathBuf {
    let path = Path::new(p);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Combines the configuration file (if any) with the command line.
/// The command line wins. Its paths are taken as they are.
pub fn resolve_settings(args: &Args) -> BAtlasResult<RunSettings> {
    let (config, root) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root = Path::new(config_path)
                .parent()
                .context(MissingParentDirSnafu { path: config_path })?
                .to_path_buf();
            (config, root)
        }
        None => (AtlasConfig::default(), PathBuf::new()),
    };
    let input = &config.input_settings;
    let output = &config.output_settings;

    let pick = |arg: &Option<String>, configured: &Option<String>, default: &str| -> PathBuf {
        match (arg, configured) {
            (Some(a), _) => PathBuf::from(a),
            (None, Some(c)) => resolve(&root, c),
            (None, None) => resolve(&root, default),
        }
    };

    let results_file = pick(&args.results, &input.results_file, DEFAULT_RESULTS_FILE);
    let input_type = match args.input_type.as_ref().or(input.results_type.as_ref()) {
        Some(t) => t.parse::<InputType>()?,
        None => InputType::from_path(&results_file),
    };

    let output_paths = OutputPaths {
        output_directory: pick(
            &args.out,
            &output.output_directory,
            DEFAULT_OUTPUT_DIRECTORY,
        ),
        map_data_file: output
            .map_data_file
            .clone()
            .unwrap_or_else(|| DEFAULT_MAP_DATA_FILE.to_string()),
        search_index_file: output
            .search_index_file
            .clone()
            .unwrap_or_else(|| DEFAULT_SEARCH_INDEX_FILE.to_string()),
        state_bounds_file: output
            .state_bounds_file
            .clone()
            .unwrap_or_else(|| DEFAULT_STATE_BOUNDS_FILE.to_string()),
        pretty_print: output.pretty_print.unwrap_or(false),
    };

    Ok(RunSettings {
        input_type,
        excel_worksheet_name: args
            .excel_worksheet_name
            .clone()
            .or_else(|| input.excel_worksheet_name.clone()),
        boundaries_file: pick(&args.boundaries, &input.boundaries_file, DEFAULT_BOUNDARIES_FILE),
        palette_file: pick(&args.palette, &input.palette_file, DEFAULT_PALETTE_FILE),
        id_property: input
            .id_property
            .clone()
            .unwrap_or_else(|| DEFAULT_ID_PROPERTY.to_string()),
        state_property: input
            .state_property
            .clone()
            .unwrap_or_else(|| DEFAULT_STATE_PROPERTY.to_string()),
        output: output_paths,
        reference_dir: args.reference.as_ref().map(PathBuf::from),
        results_file,
    })
}

use clap::Parser;

/// Builds the data files of the assembly constituency election map, and queries them.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file describing the inputs and the outputs.
    /// Relative paths in this file are resolved against its directory.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The results, one row per candidate. Overrides the configuration.
    /// With '--input-type csv', '-' reads the standard input.
    #[clap(long, value_parser)]
    pub results: Option<String>,

    /// (xlsx or csv) The type of the results file. By default, guessed from its extension.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default: the first worksheet) When using an Excel file, the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (file path) The constituency boundaries, as a GeoJSON feature collection.
    #[clap(long, value_parser)]
    pub boundaries: Option<String>,

    /// (file path) The colors of the parties, as a JSON object.
    #[clap(long, value_parser)]
    pub palette: Option<String>,

    /// (directory) Where to write the data files. Overrides the configuration.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (directory) If provided, the data files are compared with the files of the same
    /// name in this directory, and the program fails on any difference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path) A map data file written by a previous run. If provided, no data file
    /// is built: the queries run against this file.
    #[clap(long, value_parser)]
    pub merged: Option<String>,

    /// (query string) The filters to apply, for example 'gender=FEMALE&margin=<2,2-5'.
    #[clap(short, long, value_parser)]
    pub query: Option<String>,

    /// (default WINNER) The display mode used to color the selected constituencies.
    #[clap(short, long, value_parser)]
    pub mode: Option<String>,

    /// The party of the VOTE_SHARE display mode.
    #[clap(short, long, value_parser)]
    pub party: Option<String>,

    /// Restricts the query to one state.
    #[clap(short, long, value_parser)]
    pub state: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

impl Args {
    /// True if the run asks for a query summary.
    pub fn has_query(&self) -> bool {
        self.merged.is_some()
            || self.query.is_some()
            || self.mode.is_some()
            || self.party.is_some()
            || self.state.is_some()
    }
}

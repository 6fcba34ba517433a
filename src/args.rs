use clap::Parser;

/// Builds the lineage ratio, heatmap and rank views of the prefectures of Japan.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the sources and the selection.
    /// See the manual of lineage_shares for the format.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path, optional) A single input file, used instead of a configuration file.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default wide_csv, or wide_xlsx for .xlsx files) The type of the input: wide_csv,
    /// long_csv or wide_xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (prefecture name) Only build the views of this prefecture. English and Japanese
    /// names are accepted.
    #[clap(short, long, value_parser)]
    pub prefecture: Option<String>,

    /// (6, 7, 8 or 6-8) The wave to select. Overrides the configuration.
    #[clap(short, long, value_parser)]
    pub wave: Option<String>,

    /// (default 10) The number of lineages in the rank chart. 0 ranks all of them.
    #[clap(long, value_parser)]
    pub top_k: Option<usize>,

    /// (file path, 'stdout' or empty) Where to write the JSON document. Overrides the
    /// outputPath of the configuration.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference output in JSON format. If provided, the run fails when
    /// the output differs from it.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path) A historical rank table in CSV format, compared with the computed ranks.
    #[clap(long, value_parser)]
    pub rank_reference: Option<String>,

    /// Skip the rows with a week that cannot be understood instead of stopping.
    #[clap(long, takes_value = false)]
    pub skip_malformed: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

// args.rs - Command line arguments definition

use argh::FromArgs;

#[derive(FromArgs)]
/// phylobin - Divergence filtering of alignment windows and topology binning of window trees
pub struct Args {
    /// input directory holding one sub-directory of window files per chromosome
    #[argh(option)]
    pub input: Option<String>,

    /// output directory for filtered windows and logs
    #[argh(option)]
    pub output: Option<String>,

    /// reference sample id used for pairwise distances
    #[argh(option)]
    pub reference: Option<String>,

    /// comma-separated sample ids to exclude from scoring and masking
    #[argh(option)]
    pub exclude: Option<String>,

    /// sub-window size in bases (default: 100)
    #[argh(option, default = "100")]
    pub subwindow_size: usize,

    /// step between sub-windows in bases, at most the sub-window size (default: 10)
    #[argh(option, default = "10")]
    pub step: usize,

    /// z-score multiplier above the median for outlier detection (default: 2.0)
    #[argh(option, default = "2.0")]
    pub z_score: f64,

    /// absolute minimum distance an outlier must exceed (default: 0.0)
    #[argh(option, default = "0.0")]
    pub min_distance: f64,

    /// minimum per-sample valid-base fraction to keep a window, inclusive (default: 0.9)
    #[argh(option, default = "0.9")]
    pub coverage: f64,

    /// missing data character written by masking (default: N)
    #[argh(option, default = "String::from(\"N\")")]
    pub missing_char: String,

    /// number of chromosome worker processes per batch, or 'all' (default: all)
    #[argh(option, default = "String::from(\"all\")")]
    pub workers: String,

    /// include only chromosomes matching regex pattern
    #[argh(option)]
    pub include_chromosomes: Option<String>,

    /// exclude chromosomes matching regex pattern
    #[argh(option)]
    pub exclude_chromosomes: Option<String>,

    /// tree table (Chromosome, Window, NewickTree) to bin by topology
    #[argh(option)]
    pub trees: Option<String>,

    /// output topology label table (default: <trees>.topologies.tsv)
    #[argh(option)]
    pub topology_output: Option<String>,

    /// output ranked topology summary table
    #[argh(option)]
    pub topology_summary: Option<String>,

    /// number of threads used for tree parsing (default: auto-detect)
    #[argh(option)]
    pub threads: Option<usize>,

    /// list chromosomes and windows without filtering (dry run)
    #[argh(switch)]
    pub dry_run: bool,

    /// path to TOML configuration file
    #[argh(option)]
    pub config: Option<String>,

    /// generate sample configuration file and exit
    #[argh(switch)]
    pub generate_config: bool,

    /// internal: chromosome directory handled by a worker process
    #[argh(option)]
    pub worker_chromosome: Option<String>,

    /// internal: output directory of a worker process
    #[argh(option)]
    pub worker_output: Option<String>,

    /// internal: serialized filter settings of a worker process
    #[argh(option)]
    pub worker_settings: Option<String>,
}

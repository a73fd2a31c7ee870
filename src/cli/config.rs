// config.rs - Configuration file support

use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Exclusion list as written in TOML: one id, a comma-separated string, or a list
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ExcludeList {
    One(String),
    Many(Vec<String>),
}

impl ExcludeList {
    /// Normalise into a set of sample ids
    pub fn into_ids(self) -> BTreeSet<String> {
        match self {
            ExcludeList::One(s) => parse_id_list(&s),
            ExcludeList::Many(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Worker count as written in TOML: a number or `"all"`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WorkersSetting {
    Count(usize),
    Keyword(String),
}

impl WorkersSetting {
    pub fn as_arg(&self) -> String {
        match self {
            WorkersSetting::Count(n) => n.to_string(),
            WorkersSetting::Keyword(s) => s.clone(),
        }
    }
}

/// Split a comma-separated id list, dropping blanks
pub fn parse_id_list(list: &str) -> BTreeSet<String> {
    list.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    // Input/Output
    pub input: Option<String>,
    pub output: Option<String>,

    // Samples
    pub reference: Option<String>,
    pub exclude: Option<ExcludeList>,

    // Divergence scan
    pub subwindow_size: Option<usize>,
    pub step: Option<usize>,
    pub z_score: Option<f64>,
    pub min_distance: Option<f64>,
    pub missing_char: Option<String>,

    // Coverage
    pub coverage: Option<f64>,

    // Performance
    pub workers: Option<WorkersSetting>,
    pub threads: Option<usize>,

    // Chromosome filtering
    pub include_chromosomes: Option<String>,
    pub exclude_chromosomes: Option<String>,

    // Topology binning
    pub trees: Option<String>,
    pub topology_output: Option<String>,
    pub topology_summary: Option<String>,

    // Flags
    pub dry_run: Option<bool>,
}

impl Config {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config = Self::from_toml(&content)
            .map_err(|e| format!("{} ('{}')", e, path.display()))?;

        println!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate a sample configuration file with comments
    pub fn generate_sample() -> String {
        r#"# phylobin.toml - Configuration file for phylobin
# Command line arguments will override these settings

# =============================================================================
# INPUT/OUTPUT
# =============================================================================

# Directory with one sub-directory of window FASTA files per chromosome
# (files named <chrom>_<start>_<end>.fasta)
input = "/path/to/windows"

# Output directory for filtered windows, drop markers and logs
output = "/path/to/filtered"

# =============================================================================
# SAMPLES
# =============================================================================

# Reference sample for pairwise distances
reference = "S1"

# Samples excluded from scoring and masking: a single id or a list
# exclude = "outgroup"
exclude = ["outgroup1", "outgroup2"]

# =============================================================================
# DIVERGENCE SCAN
# =============================================================================

# Sub-window size and step (bases)
subwindow_size = 100
step = 10

# Outlier rule: distance > median + z_score * stddev and distance > min_distance
z_score = 2.0
min_distance = 0.0

# Character written over masked bases
missing_char = "N"

# =============================================================================
# COVERAGE
# =============================================================================

# Minimum valid-base fraction per sample (inclusive); otherwise the window is dropped
coverage = 0.9

# =============================================================================
# PERFORMANCE
# =============================================================================

# Chromosome worker processes per batch: a number or "all"
workers = "all"

# Threads for tree parsing (omit for auto-detection)
# threads = 8

# =============================================================================
# CHROMOSOME FILTERING
# =============================================================================

# include_chromosomes = "^chr[0-9]+$"
# exclude_chromosomes = "^chrUn"

# =============================================================================
# TOPOLOGY BINNING
# =============================================================================

# Tree table with columns Chromosome, Window, NewickTree
# trees = "trees.tsv"
# topology_output = "topologies.tsv"
# topology_summary = "topology_summary.tsv"

# =============================================================================
# FLAGS
# =============================================================================

dry_run = false
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclude_accepts_string_or_list() {
        let single = Config::from_toml("exclude = \"out1, out2\"").unwrap();
        let list = Config::from_toml("exclude = [\"out2\", \" out1 \", \"\"]").unwrap();
        let expected: BTreeSet<String> = ["out1", "out2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(single.exclude.unwrap().into_ids(), expected);
        assert_eq!(list.exclude.unwrap().into_ids(), expected);
    }

    #[test]
    fn test_workers_number_or_keyword() {
        let n = Config::from_toml("workers = 4").unwrap();
        let all = Config::from_toml("workers = \"all\"").unwrap();
        assert_eq!(n.workers.unwrap().as_arg(), "4");
        assert_eq!(all.workers.unwrap().as_arg(), "all");
    }

    #[test]
    fn test_sample_config_parses() {
        let config = Config::from_toml(&Config::generate_sample()).unwrap();
        assert_eq!(config.reference.as_deref(), Some("S1"));
        assert_eq!(config.subwindow_size, Some(100));
        assert_eq!(config.coverage, Some(0.9));
    }
}

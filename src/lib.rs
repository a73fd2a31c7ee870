// lib.rs - phylobin library root

//! # phylobin - Divergence filtering of genomic alignment windows and topology binning
//!
//! This library prepares per-window alignments for phylogenomic analysis. Every
//! chromosome directory of window FASTA files is scanned with a sliding
//! sub-window: samples whose distance to a reference is an outlier are masked,
//! and windows where any sample falls below a coverage cutoff are dropped.
//! Chromosomes are filtered in separate worker processes. Window trees can then
//! be grouped into topology classes by Robinson-Foulds equivalence.
//!
//! ## Features
//!
//! - **Outlier masking**: median + z·stddev rule with an absolute distance floor
//! - **Coverage validation**: per-sample valid-base fraction with an inclusive cutoff
//! - **Process pool**: batched chromosome workers with interrupt handling
//! - **Topology binning**: first-match RF clustering, frequency-ranked labels
//! - **Configuration**: TOML files merged with command line arguments
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use phylobin::prelude::*;
//! use std::path::Path;
//!
//! let mut config = FilterConfig::default();
//! config.scan.reference = "S1".to_string();
//!
//! let log = filter_chromosome(Path::new("windows/chr1"), Path::new("filtered/chr1"), &config)?;
//! println!("{} of {} windows kept", log.valid_remaining, log.initial_windows);
//!
//! let labels = bin_topologies(&[Some("(A,(B,C));"), None, Some("(B,(A,C));")]).labels;
//! assert_eq!(labels[1], "NoData");
//! # Ok::<(), String>(())
//! ```

// Re-export all main modules
pub mod cli;
pub mod core;
pub mod data;
pub mod output;

// Convenience prelude for common imports
pub mod prelude {
    pub use crate::cli::{validate_args, Args, RunSettings};
    pub use crate::core::{bin_topologies, filter_chromosome, filter_window, scan_window};
    pub use crate::core::{BinningResult, ChromosomeLog, FilterConfig, ScanConfig, WindowOutcome};
    pub use crate::core::{ChromosomeJob, PoolReport, ProcessPool, SelfExecLauncher, WorkerCount};
    pub use crate::data::{AlignmentWindow, SampleSequence, TreeRecord, WindowError, WindowFile};
    pub use crate::output::{write_filter_log, write_topology_summary, write_topology_table};
}

// Re-export main types at the root level for convenience
pub use cli::{Args, RunSettings};
pub use core::{ChromosomeLog, FilterConfig, ScanConfig};
pub use data::{AlignmentWindow, WindowFile};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library information
pub fn get_info() -> String {
    format!(
        "phylobin v{} - Divergence filtering and topology binning of alignment windows",
        VERSION
    )
}

// mod.rs - Core logic module

pub mod coverage;
pub mod dispatcher;
pub mod divergence;
pub mod masking;
pub mod orchestrator;
pub mod topology;

// Re-export main types for convenience
pub use coverage::{compute_coverage, CoverageResult, CoverageVerdict};
pub use dispatcher::{ChromosomeJob, PoolReport, ProcessPool, SelfExecLauncher, WorkerCount, WorkerLauncher};
pub use divergence::{pairwise_distance, scan_window, DivergenceProfile, MaskSpan, ScanConfig};
pub use masking::{apply_masks, MaskStats};
pub use orchestrator::{filter_chromosome, filter_window, ChromosomeLog, FilterConfig, WindowOutcome};
pub use topology::{bin_topologies, BinningResult, RankedTopology, TopologyBinner, NO_DATA_LABEL};

// orchestrator.rs - Per-chromosome window filtering (scan → mask → coverage)

use crate::core::coverage::{compute_coverage, CoverageVerdict};
use crate::core::divergence::{scan_window, ScanConfig};
use crate::core::masking::{apply_masks, MaskStats};
use crate::data::loaders::fasta::{list_windows, read_window, write_drop_marker, write_window};
use crate::data::{AlignmentWindow, LoadedWindow, WindowError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::create_dir_all;
use std::path::Path;

/// Full filter configuration handed to every chromosome worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub scan: ScanConfig,
    /// Minimum valid-base fraction every sample must reach (C, inclusive)
    pub coverage_cutoff: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            coverage_cutoff: 0.9,
        }
    }
}

/// Outcome of one window that was actually read
#[derive(Debug, Clone, PartialEq)]
pub enum WindowOutcome {
    Accepted {
        window: AlignmentWindow,
        mask: MaskStats,
        subwindows_scanned: usize,
        subwindows_skipped: usize,
    },
    Dropped {
        failing_samples: Vec<String>,
        subwindows_scanned: usize,
        subwindows_skipped: usize,
    },
    Empty(WindowError),
}

/// A window treated as empty, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyWindow {
    pub file: String,
    pub reason: String,
}

/// Structured log record of one chromosome, returned to the caller for merging
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChromosomeLog {
    pub chromosome: String,
    pub initial_windows: usize,
    pub valid_remaining: usize,
    pub dropped_by_coverage: usize,
    pub empty_alignments: usize,
    pub passed_through_drops: usize,
    pub masked_windows: usize,
    pub masked_bases: usize,
    pub subwindows_scanned: usize,
    pub subwindows_skipped: usize,
    pub sample_drop_counts: BTreeMap<String, usize>,
    pub dropped_files: Vec<String>,
    pub empty_files: Vec<EmptyWindow>,
    pub passed_through_files: Vec<String>,
}

impl ChromosomeLog {
    pub fn new(chromosome: &str) -> Self {
        Self {
            chromosome: chromosome.to_string(),
            ..Self::default()
        }
    }

    /// Windows that left this stage as drop markers
    pub fn total_dropped(&self) -> usize {
        self.dropped_by_coverage + self.empty_alignments + self.passed_through_drops
    }
}

/// Run scanner, masking and coverage on one window
pub fn filter_window(window: &AlignmentWindow, config: &FilterConfig) -> WindowOutcome {
    let scan = match scan_window(window, &config.scan) {
        Ok(scan) => scan,
        Err(e) => return WindowOutcome::Empty(e),
    };

    let (masked, mask) = apply_masks(
        window,
        &scan.spans,
        config.scan.missing_char,
        config.scan.gap_char,
    );

    match compute_coverage(&masked).evaluate(config.coverage_cutoff) {
        CoverageVerdict::Accepted => WindowOutcome::Accepted {
            window: masked,
            mask,
            subwindows_scanned: scan.subwindows_scanned,
            subwindows_skipped: scan.subwindows_skipped,
        },
        CoverageVerdict::Dropped(failing_samples) => WindowOutcome::Dropped {
            failing_samples,
            subwindows_scanned: scan.subwindows_scanned,
            subwindows_skipped: scan.subwindows_skipped,
        },
    }
}

/// Filter every window of one chromosome directory into `output_dir`.
///
/// Windows are processed in coordinate order. Window-level problems become
/// empty windows; only output I/O failures abort the chromosome.
pub fn filter_chromosome(
    chromosome_dir: &Path,
    output_dir: &Path,
    config: &FilterConfig,
) -> Result<ChromosomeLog, String> {
    let chromosome = chromosome_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| format!("Invalid chromosome directory '{}'", chromosome_dir.display()))?;

    create_dir_all(output_dir).map_err(|e| {
        format!(
            "Failed to create output directory '{}': {}",
            output_dir.display(),
            e
        )
    })?;

    let windows = list_windows(chromosome_dir)?;
    let mut log = ChromosomeLog::new(&chromosome);
    log.initial_windows = windows.len();

    for window_file in &windows {
        let name = window_file.file_name();
        let out_path = output_dir.join(&name);

        let window = match read_window(window_file) {
            Ok(LoadedWindow::DropMarker) => {
                write_drop_marker(&out_path)?;
                log.passed_through_drops += 1;
                log.passed_through_files.push(name);
                continue;
            }
            Ok(LoadedWindow::Alignment(window)) => window,
            Err(e) => {
                record_empty(&mut log, &name, &e);
                write_drop_marker(&out_path)?;
                continue;
            }
        };

        match filter_window(&window, config) {
            WindowOutcome::Accepted {
                window,
                mask,
                subwindows_scanned,
                subwindows_skipped,
            } => {
                write_window(&out_path, &window)?;
                log.valid_remaining += 1;
                log.subwindows_scanned += subwindows_scanned;
                log.subwindows_skipped += subwindows_skipped;
                if mask.bases_masked > 0 {
                    log.masked_windows += 1;
                    log.masked_bases += mask.bases_masked;
                }
            }
            WindowOutcome::Dropped {
                failing_samples,
                subwindows_scanned,
                subwindows_skipped,
            } => {
                write_drop_marker(&out_path)?;
                log.dropped_by_coverage += 1;
                log.subwindows_scanned += subwindows_scanned;
                log.subwindows_skipped += subwindows_skipped;
                for sample in failing_samples {
                    *log.sample_drop_counts.entry(sample).or_insert(0) += 1;
                }
                log.dropped_files.push(name);
            }
            WindowOutcome::Empty(e) => {
                record_empty(&mut log, &name, &e);
                write_drop_marker(&out_path)?;
            }
        }
    }

    Ok(log)
}

fn record_empty(log: &mut ChromosomeLog, file: &str, error: &WindowError) {
    log.empty_alignments += 1;
    log.empty_files.push(EmptyWindow {
        file: file.to_string(),
        reason: format!("no valid data: {}", error),
    });
}

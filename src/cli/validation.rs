// validation.rs - Input validation utilities

use crate::cli::args::Args;
use crate::cli::config::parse_id_list;
use crate::core::{FilterConfig, ScanConfig, WorkerCount};
use regex::Regex;
use std::str::FromStr;

/// Gap character of the window alignments
pub const GAP_CHAR: u8 = b'-';

pub struct RunSettings {
    pub filter: FilterConfig,
    pub workers: WorkerCount,
    pub chromosome_include_regex: Option<Regex>,
    pub chromosome_exclude_regex: Option<Regex>,
}

impl RunSettings {
    /// Whether a chromosome directory passes the include/exclude patterns
    pub fn chromosome_selected(&self, name: &str) -> bool {
        if let Some(re) = &self.chromosome_include_regex {
            if !re.is_match(name) {
                return false;
            }
        }
        if let Some(re) = &self.chromosome_exclude_regex {
            if re.is_match(name) {
                return false;
            }
        }
        true
    }
}

/// Validate all command line arguments
pub fn validate_args(args: &Args) -> Result<RunSettings, String> {
    if args.input.is_none() && args.trees.is_none() {
        return Err("Nothing to do: provide --input (window filtering) and/or --trees (topology binning)".to_string());
    }

    if args.input.is_some() {
        if args.output.is_none() {
            return Err("--output is required when filtering windows with --input".to_string());
        }
        match args.reference.as_deref().map(str::trim) {
            Some(r) if !r.is_empty() => {}
            _ => return Err("--reference is required when filtering windows with --input".to_string()),
        }
    }

    let filter = filter_config(args)?;
    let workers = WorkerCount::from_str(&args.workers)?;

    if let Some(0) = args.threads {
        return Err("Thread count must be at least 1".to_string());
    }

    // Compile regex patterns
    let chromosome_include_regex = if let Some(pattern) = &args.include_chromosomes {
        Some(Regex::new(pattern).map_err(|e| format!("Invalid include_chromosomes regex: {}", e))?)
    } else {
        None
    };

    let chromosome_exclude_regex = if let Some(pattern) = &args.exclude_chromosomes {
        Some(Regex::new(pattern).map_err(|e| format!("Invalid exclude_chromosomes regex: {}", e))?)
    } else {
        None
    };

    Ok(RunSettings {
        filter,
        workers,
        chromosome_include_regex,
        chromosome_exclude_regex,
    })
}

/// Check scan and coverage parameters and build the worker configuration
pub fn filter_config(args: &Args) -> Result<FilterConfig, String> {
    if args.subwindow_size == 0 {
        return Err("Sub-window size must be greater than 0".to_string());
    }
    if args.step == 0 || args.step > args.subwindow_size {
        return Err(format!(
            "Step must be between 1 and the sub-window size ({}), got {}",
            args.subwindow_size, args.step
        ));
    }
    if !args.z_score.is_finite() || args.z_score < 0.0 {
        return Err("Z-score threshold must be a non-negative number".to_string());
    }
    if !(0.0..=1.0).contains(&args.min_distance) {
        return Err("Minimum distance must be between 0.0 and 1.0".to_string());
    }
    if !(0.0..=1.0).contains(&args.coverage) {
        return Err("Coverage cutoff must be between 0.0 and 1.0".to_string());
    }

    let missing_char = match args.missing_char.as_bytes() {
        [c] if c.is_ascii_graphic()
            && *c != GAP_CHAR
            && !matches!(c.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T') =>
        {
            *c
        }
        _ => {
            return Err(format!(
                "Missing character must be a single printable character other than '{}' or a base (A/C/G/T), got '{}'",
                GAP_CHAR as char, args.missing_char
            ))
        }
    };

    let reference = args.reference.as_deref().unwrap_or("").trim().to_string();
    let mut exclude = args.exclude.as_deref().map(parse_id_list).unwrap_or_default();
    exclude.remove(&reference);

    Ok(FilterConfig {
        scan: ScanConfig {
            window_size: args.subwindow_size,
            step: args.step,
            z_threshold: args.z_score,
            min_distance: args.min_distance,
            missing_char,
            gap_char: GAP_CHAR,
            reference,
            exclude,
        },
        coverage_cutoff: args.coverage,
    })
}

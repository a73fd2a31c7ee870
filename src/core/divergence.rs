// divergence.rs - Sliding sub-window divergence scanner

use crate::data::{AlignmentWindow, WindowError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Parameters of the sub-window scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Sub-window size (W)
    pub window_size: usize,
    /// Step between sub-window starts (S, S <= W)
    pub step: usize,
    /// z-score multiplier applied to the sample standard deviation (Z)
    pub z_threshold: f64,
    /// Absolute minimum distance a sample must exceed to be masked (D_min)
    pub min_distance: f64,
    pub missing_char: u8,
    pub gap_char: u8,
    pub reference: String,
    /// Samples never scored nor masked; the reference is always implied
    pub exclude: BTreeSet<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            step: 10,
            z_threshold: 2.0,
            min_distance: 0.0,
            missing_char: b'N',
            gap_char: b'-',
            reference: String::new(),
            exclude: BTreeSet::new(),
        }
    }
}

impl ScanConfig {
    fn is_scored(&self, sample_id: &str) -> bool {
        sample_id != self.reference && !self.exclude.contains(sample_id)
    }
}

/// Range of one sample to overwrite with the missing-data character.
/// `start` is 1-based, `end` inclusive: it covers 0-based `[start - 1, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskSpan {
    pub sample: String,
    pub start: usize,
    pub end: usize,
}

/// Per-sample distances to the reference for one sub-window
#[derive(Debug, Clone, PartialEq)]
pub struct DivergenceProfile {
    pub offset: usize,
    pub distances: Vec<(String, f64)>,
}

/// Outlier cut-off derived from a profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierStats {
    pub median: f64,
    pub std_dev: f64,
    pub cutoff: f64,
}

/// Everything the scanner found in one window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResult {
    pub spans: Vec<MaskSpan>,
    pub subwindows_scanned: usize,
    pub subwindows_skipped: usize,
}

/// p-distance of `query` against `reference`.
///
/// Gap on the query: position ignored entirely. Missing character on the
/// query: counted as a mismatch but not as a comparison. Anything else is a
/// comparison, and a mismatch when it differs case-insensitively.
/// Returns None when no position was comparable.
pub fn pairwise_distance(reference: &[u8], query: &[u8], missing: u8, gap: u8) -> Option<f64> {
    let missing = missing.to_ascii_uppercase();
    let mut mismatches = 0usize;
    let mut comparisons = 0usize;

    for (&r, &q) in reference.iter().zip(query.iter()) {
        let q_upper = q.to_ascii_uppercase();
        if q == gap {
            continue;
        }
        if q_upper == missing {
            mismatches += 1;
            continue;
        }
        comparisons += 1;
        if q_upper != r.to_ascii_uppercase() {
            mismatches += 1;
        }
    }

    if comparisons == 0 {
        None
    } else {
        Some(mismatches as f64 / comparisons as f64)
    }
}

/// Median of a non-empty slice
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Bessel-corrected standard deviation (n - 1); 0.0 for fewer than two values
pub fn sample_std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}

/// Distances of every scored sample for the sub-window `[offset, offset + W)`
pub fn profile_subwindow(
    window: &AlignmentWindow,
    reference: &[u8],
    offset: usize,
    config: &ScanConfig,
) -> DivergenceProfile {
    let end = offset + config.window_size;
    let ref_slice = &reference[offset..end];

    let distances = window
        .sequences
        .iter()
        .filter(|s| config.is_scored(&s.id))
        .filter_map(|s| {
            pairwise_distance(
                ref_slice,
                &s.sequence[offset..end],
                config.missing_char,
                config.gap_char,
            )
            .map(|d| (s.id.clone(), d))
        })
        .collect();

    DivergenceProfile { offset, distances }
}

impl DivergenceProfile {
    /// Outlier cut-off, or None when fewer than two samples have a distance
    pub fn outlier_stats(&self, z_threshold: f64) -> Option<OutlierStats> {
        if self.distances.len() < 2 {
            return None;
        }
        let values: Vec<f64> = self.distances.iter().map(|(_, d)| *d).collect();
        let median = median(&values);
        let std_dev = sample_std_dev(&values);
        Some(OutlierStats {
            median,
            std_dev,
            cutoff: median + z_threshold * std_dev,
        })
    }

    /// Samples above both the statistical cut-off and the absolute floor
    pub fn outliers(&self, stats: &OutlierStats, min_distance: f64) -> Vec<&str> {
        self.distances
            .iter()
            .filter(|(_, d)| *d > stats.cutoff && *d > min_distance)
            .map(|(id, _)| id.as_str())
            .collect()
    }
}

/// Slide the sub-window across the window and collect mask spans for outliers
pub fn scan_window(window: &AlignmentWindow, config: &ScanConfig) -> Result<ScanResult, WindowError> {
    if window.is_empty() {
        return Err(WindowError::EmptyAlignment);
    }
    let reference = window
        .get(&config.reference)
        .ok_or_else(|| WindowError::MissingReference(config.reference.clone()))?;

    let mut result = ScanResult::default();
    let len = window.len();
    let w = config.window_size;
    if w == 0 || config.step == 0 {
        return Ok(result);
    }

    let mut offset = 0;
    while offset + w <= len {
        let profile = profile_subwindow(window, reference, offset, config);
        match profile.outlier_stats(config.z_threshold) {
            Some(stats) => {
                result.subwindows_scanned += 1;
                for sample in profile.outliers(&stats, config.min_distance) {
                    result.spans.push(MaskSpan {
                        sample: sample.to_string(),
                        start: offset + 1,
                        end: offset + w,
                    });
                }
            }
            None => {
                result.subwindows_skipped += 1;
                #[cfg(feature = "debug-stats")]
                eprintln!(
                    "  ⏭️  {}:{}-{} sub-window at {} skipped ({} valid distances)",
                    window.chromosome,
                    window.start,
                    window.end,
                    offset,
                    profile.distances.len()
                );
            }
        }
        offset += config.step;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SampleSequence;

    fn window(seqs: &[(&str, &str)]) -> AlignmentWindow {
        AlignmentWindow::new(
            "chr1",
            1,
            seqs[0].1.len() as u64,
            seqs.iter()
                .map(|(id, s)| SampleSequence {
                    id: id.to_string(),
                    sequence: s.as_bytes().to_vec(),
                })
                .collect(),
        )
        .unwrap()
    }

    fn config(reference: &str, w: usize, s: usize, z: f64) -> ScanConfig {
        ScanConfig {
            window_size: w,
            step: s,
            z_threshold: z,
            reference: reference.to_string(),
            ..ScanConfig::default()
        }
    }

    #[test]
    fn test_pairwise_distance_rules() {
        // identical, case-insensitive
        assert_eq!(pairwise_distance(b"ACGT", b"acgt", b'N', b'-'), Some(0.0));
        // one mismatch out of four comparisons
        assert_eq!(pairwise_distance(b"ACGT", b"ACGA", b'N', b'-'), Some(0.25));
        // gap: neither numerator nor denominator
        assert_eq!(pairwise_distance(b"ACGT", b"AC-A", b'N', b'-'), Some(1.0 / 3.0));
        // missing: numerator only
        assert_eq!(pairwise_distance(b"ACGT", b"ACNT", b'N', b'-'), Some(1.0 / 3.0));
        assert_eq!(pairwise_distance(b"ACGT", b"ACnT", b'N', b'-'), Some(1.0 / 3.0));
        // nothing comparable
        assert_eq!(pairwise_distance(b"ACGT", b"--NN", b'N', b'-'), None);
    }

    #[test]
    fn test_median_and_std_dev() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(sample_std_dev(&[1.0]), 0.0);
        let sd = sample_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((sd - 2.138089935299395).abs() < 1e-12);
    }

    #[test]
    fn test_missing_reference_is_window_error() {
        let w = window(&[("S1", "ACGT"), ("S2", "ACGT")]);
        let err = scan_window(&w, &config("S9", 2, 1, 2.0)).unwrap_err();
        assert_eq!(err, WindowError::MissingReference("S9".to_string()));
    }

    #[test]
    fn test_subwindow_skipped_with_single_distance() {
        let w = window(&[("S1", "ACGTACGT"), ("S2", "TTTTTTTT")]);
        let result = scan_window(&w, &config("S1", 4, 2, 0.0)).unwrap();
        assert_eq!(result.subwindows_scanned, 0);
        assert_eq!(result.subwindows_skipped, 3);
        assert!(result.spans.is_empty());
    }

    #[test]
    fn test_excluded_samples_are_not_scored() {
        let w = window(&[
            ("S1", "AAAAAAAA"),
            ("S2", "AAAAAAAA"),
            ("S3", "AAAAAAAA"),
            ("OUT", "TTTTTTTT"),
        ]);
        let mut cfg = config("S1", 4, 4, 0.5);
        cfg.exclude.insert("OUT".to_string());
        let result = scan_window(&w, &cfg).unwrap();
        assert!(result.spans.iter().all(|s| s.sample != "OUT"));
    }

    #[test]
    fn test_swapping_other_samples_keeps_distances() {
        let base = [("S1", "ACGTACGTAC"), ("S2", "ACGTTCGTAC"), ("S3", "ACG-ACGNAC")];
        let swapped = [("S1", "ACGTACGTAC"), ("S3", "ACG-ACGNAC"), ("S2", "ACGTTCGTAC")];
        let cfg = config("S1", 10, 10, 2.0);

        let w1 = window(&base);
        let w2 = window(&swapped);
        let p1 = profile_subwindow(&w1, w1.get("S1").unwrap(), 0, &cfg);
        let p2 = profile_subwindow(&w2, w2.get("S1").unwrap(), 0, &cfg);

        let lookup = |p: &DivergenceProfile, id: &str| {
            p.distances.iter().find(|(s, _)| s == id).map(|(_, d)| *d)
        };
        assert_eq!(lookup(&p1, "S2"), lookup(&p2, "S2"));
        assert_eq!(lookup(&p1, "S3"), lookup(&p2, "S3"));
        assert!(lookup(&p1, "S1").is_none());
    }

    #[test]
    fn test_outlier_requires_min_distance() {
        let profile = DivergenceProfile {
            offset: 0,
            distances: vec![
                ("S2".to_string(), 0.0),
                ("S3".to_string(), 0.0),
                ("S4".to_string(), 0.0),
                ("S5".to_string(), 0.0),
                ("S6".to_string(), 0.05),
            ],
        };
        let stats = profile.outlier_stats(1.5).unwrap();
        assert_eq!(stats.median, 0.0);
        assert_eq!(profile.outliers(&stats, 0.0), vec!["S6"]);
        assert!(profile.outliers(&stats, 0.1).is_empty());
    }

    #[test]
    fn test_divergent_block_is_spanned() {
        // 2000bp conserved alignment, S4 differs at every site of [1000, 1500)
        let conserved: String = "ACGT".repeat(500);
        let diverged: String = conserved
            .chars()
            .enumerate()
            .map(|(i, c)| if (1000..1500).contains(&i) { if c == 'A' { 'C' } else { 'A' } } else { c })
            .collect();
        let w = window(&[
            ("S1", conserved.as_str()),
            ("S2", conserved.as_str()),
            ("S3", conserved.as_str()),
            ("S4", diverged.as_str()),
        ]);

        let result = scan_window(&w, &config("S1", 100, 10, 1.5)).unwrap();
        assert!(!result.spans.is_empty());
        assert!(result.spans.iter().all(|s| s.sample == "S4"));

        let first = result.spans.iter().map(|s| s.start).min().unwrap();
        let last = result.spans.iter().map(|s| s.end).max().unwrap();
        // sub-windows starting at 910..=1490 overlap the block
        assert_eq!(first, 911);
        assert_eq!(last, 1590);
        assert_eq!(result.spans.len(), 59);
        assert_eq!(result.subwindows_scanned, 191);
    }
}

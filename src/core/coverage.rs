// coverage.rs - Per-sample valid-base coverage and window acceptance

use crate::data::AlignmentWindow;

/// Fraction of A/C/G/T (any case) per sample, in window order
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageResult {
    pub fractions: Vec<(String, f64)>,
}

/// Accept/drop decision for a window
#[derive(Debug, Clone, PartialEq)]
pub enum CoverageVerdict {
    Accepted,
    /// Samples whose coverage fell below the cutoff
    Dropped(Vec<String>),
}

fn is_valid_base(base: u8) -> bool {
    matches!(base.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T')
}

/// Coverage of each sample over the full window length
pub fn compute_coverage(window: &AlignmentWindow) -> CoverageResult {
    let len = window.len();
    let fractions = window
        .sequences
        .iter()
        .map(|s| {
            let valid = s.sequence.iter().filter(|&&b| is_valid_base(b)).count();
            let fraction = if len == 0 { 0.0 } else { valid as f64 / len as f64 };
            (s.id.clone(), fraction)
        })
        .collect();
    CoverageResult { fractions }
}

impl CoverageResult {
    /// Accept only when every sample reaches the cutoff (inclusive)
    pub fn evaluate(&self, cutoff: f64) -> CoverageVerdict {
        let failing: Vec<String> = self
            .fractions
            .iter()
            .filter(|(_, f)| *f < cutoff)
            .map(|(id, _)| id.clone())
            .collect();
        if failing.is_empty() {
            CoverageVerdict::Accepted
        } else {
            CoverageVerdict::Dropped(failing)
        }
    }

    pub fn get(&self, sample_id: &str) -> Option<f64> {
        self.fractions
            .iter()
            .find(|(id, _)| id == sample_id)
            .map(|(_, f)| *f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SampleSequence;

    fn window(seqs: &[(&str, &str)]) -> AlignmentWindow {
        AlignmentWindow::new(
            "chr1",
            1,
            4,
            seqs.iter()
                .map(|(id, s)| SampleSequence { id: id.to_string(), sequence: s.as_bytes().to_vec() })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_gaps_and_missing_are_invalid() {
        let cov = compute_coverage(&window(&[("S1", "acgt"), ("S2", "AN-T"), ("S3", "RYNN")]));
        assert_eq!(cov.get("S1"), Some(1.0));
        assert_eq!(cov.get("S2"), Some(0.5));
        assert_eq!(cov.get("S3"), Some(0.0));
    }

    #[test]
    fn test_cutoff_is_inclusive() {
        let cov = compute_coverage(&window(&[("S1", "ACGT"), ("S2", "ACGN")]));
        assert_eq!(cov.get("S2"), Some(0.75));
        assert_eq!(cov.evaluate(0.75), CoverageVerdict::Accepted);
        assert_eq!(cov.evaluate(0.76), CoverageVerdict::Dropped(vec!["S2".to_string()]));
    }
}

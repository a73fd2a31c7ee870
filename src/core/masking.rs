// masking.rs - Apply scanner mask spans back onto the full window

use crate::core::divergence::MaskSpan;
use crate::data::AlignmentWindow;

/// Summary of what a masking pass changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaskStats {
    pub samples_masked: usize,
    pub bases_masked: usize,
}

/// Return a copy of `window` with every span overwritten by `missing`.
///
/// Gap positions are kept. Spans are clamped to the window, so overlapping
/// or repeated spans are harmless and sequence lengths never change.
pub fn apply_masks(
    window: &AlignmentWindow,
    spans: &[MaskSpan],
    missing: u8,
    gap: u8,
) -> (AlignmentWindow, MaskStats) {
    let mut masked = window.clone();
    let mut stats = MaskStats::default();
    let len = window.len();

    for record in masked.sequences.iter_mut() {
        let mut changed = 0;
        for span in spans.iter().filter(|s| s.sample == record.id) {
            let from = span.start.saturating_sub(1).min(len);
            let to = span.end.min(len);
            if from >= to {
                continue;
            }
            for base in &mut record.sequence[from..to] {
                if *base != gap && *base != missing {
                    *base = missing;
                    changed += 1;
                }
            }
        }
        if changed > 0 {
            stats.samples_masked += 1;
            stats.bases_masked += changed;
        }
    }

    (masked, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SampleSequence;

    fn window() -> AlignmentWindow {
        AlignmentWindow::new(
            "chr1",
            1,
            10,
            vec![
                SampleSequence { id: "S1".to_string(), sequence: b"ACGTACGTAC".to_vec() },
                SampleSequence { id: "S2".to_string(), sequence: b"AC--ACGTAC".to_vec() },
            ],
        )
        .unwrap()
    }

    fn span(sample: &str, start: usize, end: usize) -> MaskSpan {
        MaskSpan { sample: sample.to_string(), start, end }
    }

    #[test]
    fn test_mask_preserves_gaps_and_length() {
        let (masked, stats) = apply_masks(&window(), &[span("S2", 1, 6)], b'N', b'-');
        assert_eq!(masked.get("S2"), Some(&b"NN--NNGTAC"[..]));
        assert_eq!(masked.get("S1"), Some(&b"ACGTACGTAC"[..]));
        assert_eq!(stats, MaskStats { samples_masked: 1, bases_masked: 4 });
        assert_eq!(masked.len(), 10);
    }

    #[test]
    fn test_overlapping_spans_are_idempotent() {
        let spans = vec![span("S1", 2, 5), span("S1", 4, 8), span("S1", 2, 5)];
        let (once, _) = apply_masks(&window(), &spans, b'N', b'-');
        let (twice, stats) = apply_masks(&once, &spans, b'N', b'-');
        assert_eq!(once, twice);
        assert_eq!(stats.bases_masked, 0);
        assert_eq!(once.get("S1"), Some(&b"ANNNNNNNAC"[..]));
    }

    #[test]
    fn test_span_past_end_is_clamped() {
        let (masked, _) = apply_masks(&window(), &[span("S1", 9, 25)], b'N', b'-');
        assert_eq!(masked.get("S1"), Some(&b"ACGTACGTNN"[..]));
    }
}

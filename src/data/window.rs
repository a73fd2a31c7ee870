// window.rs - Alignment window data model and window file naming

use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// File extensions recognised as alignment windows
pub const WINDOW_EXTENSIONS: &[&str] = &["fasta", "fa", "fas", "fna"];

/// Conditions that make a single window unusable without aborting its chromosome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    EmptyAlignment,
    MissingReference(String),
    LengthMismatch {
        sample: String,
        expected: usize,
        found: usize,
    },
    DuplicateSample(String),
    Unreadable(String),
}

impl fmt::Display for WindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowError::EmptyAlignment => write!(f, "alignment has no sequences or zero length"),
            WindowError::MissingReference(id) => {
                write!(f, "reference sample '{}' not present in alignment", id)
            }
            WindowError::LengthMismatch { sample, expected, found } => write!(
                f,
                "sequence '{}' has length {}, expected {}",
                sample, found, expected
            ),
            WindowError::DuplicateSample(id) => write!(f, "sample '{}' appears more than once", id),
            WindowError::Unreadable(msg) => write!(f, "unreadable window: {}", msg),
        }
    }
}

/// One sample's aligned sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSequence {
    pub id: String,
    pub sequence: Vec<u8>,
}

/// Multi-sequence alignment slice for one genomic interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentWindow {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
    pub sequences: Vec<SampleSequence>,
}

impl AlignmentWindow {
    /// Build a window, enforcing non-empty, equal-length, uniquely named sequences
    pub fn new(
        chromosome: &str,
        start: u64,
        end: u64,
        sequences: Vec<SampleSequence>,
    ) -> Result<Self, WindowError> {
        let expected = match sequences.first() {
            Some(first) if !first.sequence.is_empty() => first.sequence.len(),
            _ => return Err(WindowError::EmptyAlignment),
        };

        let mut seen = HashSet::new();
        for record in &sequences {
            if record.sequence.len() != expected {
                return Err(WindowError::LengthMismatch {
                    sample: record.id.clone(),
                    expected,
                    found: record.sequence.len(),
                });
            }
            if !seen.insert(record.id.as_str()) {
                return Err(WindowError::DuplicateSample(record.id.clone()));
            }
        }

        Ok(Self {
            chromosome: chromosome.to_string(),
            start,
            end,
            sequences,
        })
    }

    /// Alignment length (shared by every sequence)
    pub fn len(&self) -> usize {
        self.sequences.first().map(|s| s.sequence.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sample_count(&self) -> usize {
        self.sequences.len()
    }

    /// Look up a sample's sequence by id
    pub fn get(&self, sample_id: &str) -> Option<&[u8]> {
        self.sequences
            .iter()
            .find(|s| s.id == sample_id)
            .map(|s| s.sequence.as_slice())
    }

}

/// A window file within a chromosome directory, with coordinates parsed from its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowFile {
    pub path: PathBuf,
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
}

fn window_name_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<chrom>.+)_(?P<start>\d+)_(?P<end>\d+)\.(?P<ext>[A-Za-z]+)$").ok()
    })
    .as_ref()
}

impl WindowFile {
    /// Parse `<chrom>_<start>_<end>.<ext>`; returns None for anything else
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let caps = window_name_regex()?.captures(name)?;
        let ext = caps.name("ext")?.as_str().to_lowercase();
        if !WINDOW_EXTENSIONS.contains(&ext.as_str()) {
            return None;
        }
        Some(Self {
            path: path.to_path_buf(),
            chromosome: caps.name("chrom")?.as_str().to_string(),
            start: caps.name("start")?.as_str().parse().ok()?,
            end: caps.name("end")?.as_str().parse().ok()?,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl Ord for WindowFile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .cmp(&other.start)
            .then(self.end.cmp(&other.end))
            .then_with(|| self.path.cmp(&other.path))
    }
}

impl PartialOrd for WindowFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// fasta.rs - FASTA window reader/writer and drop-marker handling

use crate::data::window::{AlignmentWindow, SampleSequence, WindowError, WindowFile};
use bio::io::fasta;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Result of reading one window file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedWindow {
    /// Zero-byte placeholder written by an earlier stage
    DropMarker,
    Alignment(AlignmentWindow),
}

/// True when the file is a zero-byte drop marker
pub fn is_drop_marker(path: &Path) -> Result<bool, String> {
    let meta = fs::metadata(path)
        .map_err(|e| format!("Failed to stat window file '{}': {}", path.display(), e))?;
    Ok(meta.len() == 0)
}

/// Read a window file. Malformed content is reported as a window-level error.
pub fn read_window(window: &WindowFile) -> Result<LoadedWindow, WindowError> {
    match is_drop_marker(&window.path) {
        Ok(true) => return Ok(LoadedWindow::DropMarker),
        Ok(false) => {}
        Err(e) => return Err(WindowError::Unreadable(e)),
    }

    let file = File::open(&window.path).map_err(|e| {
        WindowError::Unreadable(format!("{}: {}", window.path.display(), e))
    })?;
    let reader = fasta::Reader::new(BufReader::new(file));

    let mut sequences = Vec::new();
    for record_result in reader.records() {
        let record = record_result.map_err(|e| {
            WindowError::Unreadable(format!(
                "invalid FASTA record in {}: {}",
                window.path.display(),
                e
            ))
        })?;
        sequences.push(SampleSequence {
            id: record.id().to_string(),
            sequence: record.seq().to_vec(),
        });
    }

    AlignmentWindow::new(&window.chromosome, window.start, window.end, sequences)
        .map(LoadedWindow::Alignment)
}

/// Write a window as FASTA, preserving sample order
pub fn write_window(path: &Path, window: &AlignmentWindow) -> Result<(), String> {
    let mut writer = fasta::Writer::to_file(path)
        .map_err(|e| format!("Failed to create window file '{}': {}", path.display(), e))?;
    for record in &window.sequences {
        writer
            .write(&record.id, None, &record.sequence)
            .map_err(|e| format!("Write error in '{}': {}", path.display(), e))?;
    }
    writer
        .flush()
        .map_err(|e| format!("Flush error in '{}': {}", path.display(), e))?;
    Ok(())
}

/// Write a zero-byte drop marker
pub fn write_drop_marker(path: &Path) -> Result<(), String> {
    File::create(path)
        .map(|_| ())
        .map_err(|e| format!("Failed to create drop marker '{}': {}", path.display(), e))
}

/// List window files of one chromosome directory in coordinate order
pub fn list_windows(chromosome_dir: &Path) -> Result<Vec<WindowFile>, String> {
    let entries = fs::read_dir(chromosome_dir).map_err(|e| {
        format!(
            "Failed to read chromosome directory '{}': {}",
            chromosome_dir.display(),
            e
        )
    })?;

    let mut windows = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            format!("Failed to read entry in '{}': {}", chromosome_dir.display(), e)
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(window) = WindowFile::from_path(&path) {
            windows.push(window);
        }
    }

    windows.sort();
    Ok(windows)
}

// trees.rs - Loader for per-window tree tables

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sentinel written by the tree-inference step when a window produced no tree
pub const NO_TREE: &str = "NoTree";

/// One row of the tree table, in chromosome/window order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeRecord {
    #[serde(rename = "Chromosome")]
    pub chromosome: String,
    #[serde(rename = "Window")]
    pub window: String,
    #[serde(rename = "NewickTree", default)]
    pub newick: String,
}

impl TreeRecord {
    /// The tree string, or None for the "no tree" sentinel
    pub fn tree(&self) -> Option<&str> {
        let trimmed = self.newick.trim();
        if trimmed.is_empty() || trimmed == NO_TREE {
            None
        } else {
            Some(trimmed)
        }
    }
}

/// Read a tab-separated tree table with a `Chromosome  Window  NewickTree` header
pub fn read_tree_table(path: &Path) -> Result<Vec<TreeRecord>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)
        .map_err(|e| format!("Failed to open tree table '{}': {}", path.display(), e))?;

    let mut records = Vec::new();
    for (row, result) in reader.deserialize().enumerate() {
        let record: TreeRecord = result.map_err(|e| {
            format!(
                "Invalid tree table row {} in '{}': {}",
                row + 2,
                path.display(),
                e
            )
        })?;
        records.push(record);
    }

    println!(
        "🌳 Tree table loaded: {} windows ({} without tree)",
        records.len(),
        records.iter().filter(|r| r.tree().is_none()).count()
    );
    Ok(records)
}

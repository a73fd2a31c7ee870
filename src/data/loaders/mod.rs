// mod.rs - Input loaders for window alignments and tree tables

pub mod fasta;
pub mod trees;

pub use fasta::{list_windows, read_window, write_drop_marker, write_window, LoadedWindow};
pub use trees::{read_tree_table, TreeRecord, NO_TREE};

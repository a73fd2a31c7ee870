// mod.rs - Data structures module

pub mod loaders;
pub mod window;

// Re-export main types for convenience
pub use loaders::{LoadedWindow, TreeRecord};
pub use window::{AlignmentWindow, SampleSequence, WindowError, WindowFile};

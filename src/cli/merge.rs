// merge.rs - Merge configuration file with CLI arguments

use crate::cli::{Args, Config};

impl Args {
    /// Merge with configuration from file
    /// CLI arguments take precedence over config file values
    pub fn merge_with_config(mut self, config: Config) -> Self {
        // Input/Output
        if self.input.is_none() {
            self.input = config.input;
        }
        if self.output.is_none() {
            self.output = config.output;
        }

        // Samples
        if self.reference.is_none() {
            self.reference = config.reference;
        }
        if self.exclude.is_none() {
            self.exclude = config.exclude.map(|list| {
                list.into_ids().into_iter().collect::<Vec<_>>().join(",")
            });
        }

        // Scan settings (only override defaults, not explicit CLI values)
        if let Some(size) = config.subwindow_size.filter(|_| self.subwindow_size == 100) {
            self.subwindow_size = size;
        }
        if let Some(step) = config.step.filter(|_| self.step == 10) {
            self.step = step;
        }
        if let Some(z) = config.z_score.filter(|_| self.z_score == 2.0) {
            self.z_score = z;
        }
        if let Some(d) = config.min_distance.filter(|_| self.min_distance == 0.0) {
            self.min_distance = d;
        }
        if let Some(c) = config.missing_char.filter(|_| self.missing_char == "N") {
            self.missing_char = c;
        }
        if let Some(c) = config.coverage.filter(|_| self.coverage == 0.9) {
            self.coverage = c;
        }

        // Performance
        if let Some(w) = config.workers.filter(|_| self.workers == "all") {
            self.workers = w.as_arg();
        }
        if self.threads.is_none() {
            self.threads = config.threads;
        }

        // Chromosome filtering
        if self.include_chromosomes.is_none() {
            self.include_chromosomes = config.include_chromosomes;
        }
        if self.exclude_chromosomes.is_none() {
            self.exclude_chromosomes = config.exclude_chromosomes;
        }

        // Topology binning
        if self.trees.is_none() {
            self.trees = config.trees;
        }
        if self.topology_output.is_none() {
            self.topology_output = config.topology_output;
        }
        if self.topology_summary.is_none() {
            self.topology_summary = config.topology_summary;
        }

        // Flags (CLI flags take precedence, config only sets if not explicitly set)
        if !self.dry_run && config.dry_run.unwrap_or(false) {
            self.dry_run = true;
        }

        self
    }

    /// Load configuration and merge with CLI args
    pub fn with_config_file(self, config_path: &str) -> Result<Self, String> {
        let config = Config::from_file(config_path)?;
        Ok(self.merge_with_config(config))
    }
}

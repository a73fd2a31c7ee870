// topology_binner.rs - Standalone utility grouping window trees by topology

use clap::{Arg, Command};
use phylobin::core::bin_topologies;
use phylobin::data::loaders::read_tree_table;
use phylobin::output::{print_topology_summary, write_topology_summary, write_topology_table};
use std::path::Path;

fn main() {
    let matches = Command::new("Topology Binner")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Labels window trees by Robinson-Foulds topology class, most frequent first")
        .arg(Arg::new("trees")
            .long("trees")
            .value_name("FILE")
            .help("Tree table with Chromosome, Window and NewickTree columns")
            .required(true))
        .arg(Arg::new("output")
            .long("output")
            .value_name("FILE")
            .help("Output table with Chromosome, Window and TopologyID columns")
            .required(true))
        .arg(Arg::new("summary")
            .long("summary")
            .value_name("FILE")
            .help("Optional ranked TopologyID, Count, Representative table"))
        .get_matches();

    let run = || -> Result<(), String> {
        let trees = matches.get_one::<String>("trees").ok_or("--trees is required")?;
        let output = matches.get_one::<String>("output").ok_or("--output is required")?;

        println!("🌳 Topology Binner v{}", env!("CARGO_PKG_VERSION"));
        let records = read_tree_table(Path::new(trees))?;
        let inputs: Vec<Option<&str>> = records.iter().map(|r| r.tree()).collect();
        let result = bin_topologies(&inputs);

        print_topology_summary(&records, &result);
        write_topology_table(Path::new(output), &records, &result.labels)?;
        if let Some(summary) = matches.get_one::<String>("summary") {
            write_topology_summary(Path::new(summary), &result.topologies)?;
        }
        Ok(())
    };

    if let Err(e) = run() {
        eprintln!("❌ ERROR: {}", e);
        std::process::exit(1);
    }
}

// main.rs - CLI entry point

use phylobin::cli::{validate_args, Args, Config, RunSettings};
use phylobin::core::dispatcher::run_worker;
use phylobin::core::{bin_topologies, ChromosomeJob, ProcessPool, SelfExecLauncher};
use phylobin::data::loaders::{list_windows, read_tree_table};
use phylobin::output::{
    print_filter_summary, print_topology_summary, write_filter_log, write_topology_summary,
    write_topology_table,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

fn main() {
    if let Err(e) = run_main() {
        eprintln!("❌ ERROR: {}", e);
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), String> {
    let mut args: Args = argh::from_env();
    let command_line = std::env::args().collect::<Vec<String>>().join(" ");

    // Handle generate config first
    if args.generate_config {
        let sample_config = Config::generate_sample();
        println!("{}", sample_config);
        println!("\n💡 Save this content to a .toml file and use --config /path/to/config.toml");
        return Ok(());
    }

    // Worker processes get everything they need on the command line
    if let Some(chromosome_dir) = &args.worker_chromosome {
        let output_dir = args
            .worker_output
            .as_ref()
            .ok_or("--worker-output is required in worker mode")?;
        let settings = args
            .worker_settings
            .as_ref()
            .ok_or("--worker-settings is required in worker mode")?;
        run_worker(Path::new(chromosome_dir), Path::new(output_dir), settings)?;
        return Ok(());
    }

    // Load configuration file if specified
    if let Some(config_path) = args.config.clone() {
        args = args.with_config_file(&config_path)?;
    }

    let settings = validate_args(&args)?;

    println!("🚀 {}", phylobin::get_info());

    // Configure thread pool
    if let Some(n) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .map_err(|e| format!("Failed to configure thread pool: {}", e))?;
        println!("🧵 Threads: {}", n);
    } else {
        println!("🧵 Threads: {} (auto-detected)", rayon::current_num_threads());
    }

    let total_start = Instant::now();

    if let (Some(input), Some(output)) = (&args.input, &args.output) {
        run_filter(&args, &settings, Path::new(input), Path::new(output), &command_line)?;
    }

    if let Some(trees) = &args.trees {
        if args.dry_run {
            println!("🌳 Tree table: {} (not binned in dry run)", trees);
        } else {
            let trees = Path::new(trees);
            let topology_output = args
                .topology_output
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(|| trees.with_extension("topologies.tsv"));
            run_binning(trees, &topology_output, args.topology_summary.as_deref().map(Path::new))?;
        }
    }

    println!("\n⏱️  Total time: {:.2}s", total_start.elapsed().as_secs_f64());
    Ok(())
}

/// Chromosome sub-directories of the input root, sorted by name
fn discover_chromosomes(
    input_root: &Path,
    output_root: &Path,
    settings: &RunSettings,
) -> Result<Vec<ChromosomeJob>, String> {
    let entries = fs::read_dir(input_root)
        .map_err(|e| format!("Failed to read input directory '{}': {}", input_root.display(), e))?;

    let mut jobs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| format!("Failed to read directory entry: {}", e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(job) = ChromosomeJob::new(&path, output_root) {
            if settings.chromosome_selected(&job.name) {
                jobs.push(job);
            }
        }
    }
    jobs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(jobs)
}

fn run_filter(
    args: &Args,
    settings: &RunSettings,
    input_root: &Path,
    output_root: &Path,
    command_line: &str,
) -> Result<(), String> {
    let scan = &settings.filter.scan;
    println!("📂 Input: {}", input_root.display());
    println!("📁 Output: {}", output_root.display());
    println!("🎯 Reference: {}", scan.reference);
    if !scan.exclude.is_empty() {
        let excluded: Vec<&str> = scan.exclude.iter().map(String::as_str).collect();
        println!("🚫 Excluded samples: {}", excluded.join(", "));
    }
    println!(
        "🔍 Sub-windows: size {} step {}, outliers above median + {}·sd and > {}",
        scan.window_size, scan.step, scan.z_threshold, scan.min_distance
    );
    println!("📏 Coverage cutoff: {}", settings.filter.coverage_cutoff);

    let jobs = discover_chromosomes(input_root, output_root, settings)?;
    if jobs.is_empty() {
        return Err(format!("No chromosome directories selected in '{}'", input_root.display()));
    }
    println!("🧬 Chromosomes: {}", jobs.len());

    if args.dry_run {
        for job in &jobs {
            let windows = list_windows(&job.input_dir)?;
            println!("   • {} ({} windows)", job.name, windows.len());
        }
        println!("✅ Dry run completed successfully");
        return Ok(());
    }

    let pool = ProcessPool::new(settings.workers.resolve_local()?);
    println!("👷 Workers: {} per batch", pool.workers());

    fs::create_dir_all(output_root)
        .map_err(|e| format!("Failed to create output directory '{}': {}", output_root.display(), e))?;

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .map_err(|e| format!("Failed to install interrupt handler: {}", e))?;

    let settings_json = serde_json::to_string(&settings.filter)
        .map_err(|e| format!("Failed to serialize filter settings: {}", e))?;
    let launcher = SelfExecLauncher::new(settings_json)?;

    let report = pool.run(&jobs, &launcher, &cancel)?;

    print_filter_summary(&report, jobs.len());
    write_filter_log(output_root, &report, command_line)?;

    let failed = report.verdict(jobs.len())?;
    if failed > 0 {
        println!(
            "⚠️  WARNING: {} of {} chromosomes failed; see filter_log.txt",
            failed,
            jobs.len()
        );
    }
    Ok(())
}

fn run_binning(trees: &Path, topology_output: &Path, topology_summary: Option<&Path>) -> Result<(), String> {
    println!("\n🌳 Binning window trees from: {}", trees.display());
    let start = Instant::now();

    let records = read_tree_table(trees)?;
    let inputs: Vec<Option<&str>> = records.iter().map(|r| r.tree()).collect();
    let result = bin_topologies(&inputs);

    println!("⏱️  Binning completed in {:.2}s", start.elapsed().as_secs_f64());
    print_topology_summary(&records, &result);

    write_topology_table(topology_output, &records, &result.labels)?;
    if let Some(summary) = topology_summary {
        write_topology_summary(summary, &result.topologies)?;
    }
    Ok(())
}

// mod.rs - Output writers for run logs and topology tables

use crate::core::{BinningResult, ChromosomeLog, PoolReport, RankedTopology, NO_DATA_LABEL};
use crate::data::TreeRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Ensure parent directory exists before creating file
fn ensure_parent_dir(file_path: &Path) -> Result<(), String> {
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent).map_err(|e| {
                format!("Failed to create parent directory '{}': {}", parent.display(), e)
            })?;
        }
    }
    Ok(())
}

fn timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Merged run log as serialised to `filter_log.json`
#[derive(Debug, Serialize)]
pub struct RunLog<'a> {
    pub generated: String,
    pub version: &'static str,
    pub command: &'a str,
    pub completed: usize,
    pub failed: BTreeMap<&'a str, &'a str>,
    pub cancelled: bool,
    pub chromosomes: &'a BTreeMap<String, ChromosomeLog>,
}

/// Write `filter_log.json` and `filter_log.txt` into the output directory
pub fn write_filter_log(
    output_dir: &Path,
    report: &PoolReport,
    command_line: &str,
) -> Result<(), String> {
    create_dir_all(output_dir).map_err(|e| {
        format!("Failed to create output directory '{}': {}", output_dir.display(), e)
    })?;

    let run_log = RunLog {
        generated: timestamp(),
        version: env!("CARGO_PKG_VERSION"),
        command: command_line,
        completed: report.completed(),
        failed: report
            .failed
            .iter()
            .map(|(name, reason)| (name.as_str(), reason.as_str()))
            .collect(),
        cancelled: report.cancelled,
        chromosomes: &report.logs,
    };

    let json_path = output_dir.join("filter_log.json");
    let json = serde_json::to_string_pretty(&run_log)
        .map_err(|e| format!("Failed to serialize run log: {}", e))?;
    std::fs::write(&json_path, json)
        .map_err(|e| format!("Failed to write '{}': {}", json_path.display(), e))?;

    let txt_path = output_dir.join("filter_log.txt");
    let file = File::create(&txt_path)
        .map_err(|e| format!("Failed to create output file '{}': {}", txt_path.display(), e))?;
    let mut writer = BufWriter::new(file);
    write_text_log(&mut writer, report, command_line).map_err(|e| format!("Write error: {}", e))?;
    writer.flush().map_err(|e| format!("Flush error: {}", e))?;

    println!("✅ Filter log written to: {}", json_path.display());
    Ok(())
}

fn write_text_log<W: Write>(w: &mut W, report: &PoolReport, command_line: &str) -> std::io::Result<()> {
    writeln!(w, "# Command: {}", command_line)?;
    writeln!(w, "# Generated: {}", timestamp())?;
    writeln!(w, "# phylobin v{}", env!("CARGO_PKG_VERSION"))?;
    writeln!(w)?;

    for (name, log) in &report.logs {
        writeln!(w, "[{}]", name)?;
        writeln!(w, "  Initial windows:        {}", log.initial_windows)?;
        writeln!(w, "  Valid remaining:        {}", log.valid_remaining)?;
        writeln!(w, "  Dropped by coverage:    {}", log.dropped_by_coverage)?;
        writeln!(w, "  Empty alignments:       {}", log.empty_alignments)?;
        writeln!(w, "  Passed-through drops:   {}", log.passed_through_drops)?;
        writeln!(w, "  Masked windows:         {} ({} bases)", log.masked_windows, log.masked_bases)?;
        writeln!(
            w,
            "  Sub-windows scanned:    {} ({} skipped)",
            log.subwindows_scanned, log.subwindows_skipped
        )?;
        if !log.sample_drop_counts.is_empty() {
            writeln!(w, "  Coverage drops per sample:")?;
            for (sample, count) in &log.sample_drop_counts {
                writeln!(w, "    {}\t{}", sample, count)?;
            }
        }
        for empty in &log.empty_files {
            writeln!(w, "  Empty: {} ({})", empty.file, empty.reason)?;
        }
        writeln!(w)?;
    }

    if !report.failed.is_empty() {
        writeln!(w, "[failed]")?;
        for (name, reason) in &report.failed {
            writeln!(w, "  {}: {}", name, reason)?;
        }
    }
    if report.cancelled {
        writeln!(w, "# Run was interrupted before all chromosomes finished")?;
    }
    Ok(())
}

#[derive(Serialize)]
struct TopologyRow<'a> {
    #[serde(rename = "Chromosome")]
    chromosome: &'a str,
    #[serde(rename = "Window")]
    window: &'a str,
    #[serde(rename = "TopologyID")]
    topology: &'a str,
}

/// Write one `Chromosome  Window  TopologyID` row per input record, in input order
pub fn write_topology_table(
    file_path: &Path,
    records: &[TreeRecord],
    labels: &[String],
) -> Result<(), String> {
    if records.len() != labels.len() {
        return Err(format!(
            "Label count ({}) does not match tree count ({})",
            labels.len(),
            records.len()
        ));
    }
    ensure_parent_dir(file_path)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(file_path)
        .map_err(|e| format!("Failed to create output file '{}': {}", file_path.display(), e))?;

    for (record, label) in records.iter().zip(labels) {
        writer
            .serialize(TopologyRow {
                chromosome: &record.chromosome,
                window: &record.window,
                topology: label,
            })
            .map_err(|e| format!("Write error: {}", e))?;
    }
    writer.flush().map_err(|e| format!("Flush error: {}", e))?;
    println!("✅ Topology table written to: {}", file_path.display());
    Ok(())
}

/// Write the ranked `TopologyID  Count  Representative` table
pub fn write_topology_summary(file_path: &Path, topologies: &[RankedTopology]) -> Result<(), String> {
    ensure_parent_dir(file_path)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(file_path)
        .map_err(|e| format!("Failed to create output file '{}': {}", file_path.display(), e))?;

    writer
        .write_record(["TopologyID", "Count", "Representative"])
        .map_err(|e| format!("Write error: {}", e))?;
    for topology in topologies {
        writer
            .write_record([
                topology.label.as_str(),
                topology.count().to_string().as_str(),
                topology.representative.as_str(),
            ])
            .map_err(|e| format!("Write error: {}", e))?;
    }
    writer.flush().map_err(|e| format!("Flush error: {}", e))?;
    println!("✅ Topology summary written to: {}", file_path.display());
    Ok(())
}

/// Per-chromosome label frequencies, labels in first-seen order
pub fn topology_counts_by_chromosome<'a>(
    records: &'a [TreeRecord],
    labels: &'a [String],
) -> BTreeMap<&'a str, Vec<(&'a str, usize)>> {
    let mut counts: BTreeMap<&str, Vec<(&str, usize)>> = BTreeMap::new();
    for (record, label) in records.iter().zip(labels) {
        let entry = counts.entry(record.chromosome.as_str()).or_default();
        match entry.iter_mut().find(|(l, _)| *l == label.as_str()) {
            Some((_, n)) => *n += 1,
            None => entry.push((label.as_str(), 1)),
        }
    }
    counts
}

/// Console summary of a filter run
pub fn print_filter_summary(report: &PoolReport, total: usize) {
    println!("\n📊 FILTER SUMMARY");
    println!("================");
    println!("🧬 Chromosomes: {} total, {} completed, {} failed", total, report.completed(), report.failed.len());

    let sum = |f: fn(&ChromosomeLog) -> usize| report.logs.values().map(f).sum::<usize>();
    println!("🪟 Windows: {}", sum(|l| l.initial_windows));
    println!("   ✅ Valid remaining:      {}", sum(|l| l.valid_remaining));
    println!("   ✂️  Dropped by coverage:  {}", sum(|l| l.dropped_by_coverage));
    println!("   ⬜ Empty alignments:     {}", sum(|l| l.empty_alignments));
    println!("   ↪️  Passed-through drops: {}", sum(|l| l.passed_through_drops));
    println!("🎭 Masked: {} windows, {} bases", sum(|l| l.masked_windows), sum(|l| l.masked_bases));

    for (name, reason) in &report.failed {
        println!("⚠️  {} failed: {}", name, reason);
    }
}

/// Console summary of a binning run
pub fn print_topology_summary(records: &[TreeRecord], result: &BinningResult) {
    let no_data = result.labels.iter().filter(|l| *l == NO_DATA_LABEL).count();
    println!("\n🌳 TOPOLOGY SUMMARY");
    println!("==================");
    println!(
        "📊 {} windows, {} topologies, {} without data",
        records.len(),
        result.topologies.len(),
        no_data
    );
    for topology in result.topologies.iter().take(10) {
        println!("   {}\t{}\t{}", topology.label, topology.count(), topology.representative);
    }
    if result.topologies.len() > 10 {
        println!("   ... {} more", result.topologies.len() - 10);
    }

    for (chromosome, counts) in topology_counts_by_chromosome(records, &result.labels) {
        let line: Vec<String> = counts.iter().map(|(l, n)| format!("{}={}", l, n)).collect();
        println!("   🧬 {}: {}", chromosome, line.join(", "));
    }

    if !result.unparsed.is_empty() {
        println!("⚠️  {} trees could not be parsed:", result.unparsed.len());
        for (index, error) in result.unparsed.iter().take(5) {
            let record = &records[*index];
            println!("   {} {}: {}", record.chromosome, record.window, error);
        }
    }
    if !result.comparison_failures.is_empty() {
        println!(
            "⚠️  {} tree comparisons failed and were treated as different topologies",
            result.comparison_failures.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(chrom: &str, window: &str, tree: &str) -> TreeRecord {
        TreeRecord {
            chromosome: chrom.to_string(),
            window: window.to_string(),
            newick: tree.to_string(),
        }
    }

    #[test]
    fn test_topology_table_in_input_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("topologies.tsv");
        let records = vec![record("chr1", "1-100", "(A,(B,C));"), record("chr1", "101-200", "NoTree")];
        let labels = vec!["topology1".to_string(), NO_DATA_LABEL.to_string()];

        write_topology_table(&path, &records, &labels).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Chromosome\tWindow\tTopologyID\nchr1\t1-100\ttopology1\nchr1\t101-200\tNoData\n"
        );
        assert!(write_topology_table(&path, &records, &labels[..1]).is_err());
    }

    #[test]
    fn test_topology_summary_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.tsv");
        let topologies = vec![RankedTopology {
            label: "topology1".to_string(),
            representative: "(A,(B,C));".to_string(),
            members: vec![0, 2],
        }];
        write_topology_summary(&path, &topologies).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "TopologyID\tCount\tRepresentative\ntopology1\t2\t(A,(B,C));\n");
    }

    #[test]
    fn test_counts_by_chromosome() {
        let records = vec![record("chr2", "1", ""), record("chr1", "1", ""), record("chr2", "2", "")];
        let labels = vec!["topology1".to_string(), "topology2".to_string(), "topology1".to_string()];
        let counts = topology_counts_by_chromosome(&records, &labels);
        assert_eq!(counts["chr2"], vec![("topology1", 2)]);
        assert_eq!(counts["chr1"], vec![("topology2", 1)]);
    }

    #[test]
    fn test_filter_log_files() {
        let dir = TempDir::new().unwrap();
        let mut report = PoolReport::default();
        let mut log = ChromosomeLog::new("chr1");
        log.initial_windows = 3;
        log.valid_remaining = 2;
        report.logs.insert("chr1".to_string(), log);
        report.failed.push(("chr2".to_string(), "worker exited with status 1".to_string()));

        write_filter_log(dir.path(), &report, "phylobin --input in").unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("filter_log.json")).unwrap()).unwrap();
        assert_eq!(json["completed"], 1);
        assert_eq!(json["chromosomes"]["chr1"]["valid_remaining"], 2);
        assert_eq!(json["failed"]["chr2"], "worker exited with status 1");

        let text = std::fs::read_to_string(dir.path().join("filter_log.txt")).unwrap();
        assert!(text.contains("[chr1]"));
        assert!(text.contains("chr2: worker exited with status 1"));
    }
}

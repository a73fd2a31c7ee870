// dispatcher.rs - Batched process pool running one chromosome per worker process

use crate::core::orchestrator::{filter_chromosome, ChromosomeLog, FilterConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Requested worker count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCount {
    All,
    Fixed(usize),
}

impl FromStr for WorkerCount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(WorkerCount::All);
        }
        match s.parse::<usize>() {
            Ok(0) => Err("Worker count must be at least 1".to_string()),
            Ok(n) => Ok(WorkerCount::Fixed(n)),
            Err(_) => Err(format!("Invalid worker count '{}'. Use a positive integer or 'all'", s)),
        }
    }
}

impl WorkerCount {
    /// Resolve against the number of available cores
    pub fn resolve(&self, available: usize) -> Result<usize, String> {
        match *self {
            WorkerCount::All => Ok(available.max(1)),
            WorkerCount::Fixed(n) if n <= available => Ok(n),
            WorkerCount::Fixed(n) => Err(format!(
                "Requested {} workers but only {} CPU cores are available",
                n, available
            )),
        }
    }

    /// Resolve against the cores of this machine
    pub fn resolve_local(&self) -> Result<usize, String> {
        let available = thread::available_parallelism()
            .map(|n| n.get())
            .map_err(|e| format!("Failed to determine available CPU cores: {}", e))?;
        self.resolve(available)
    }
}

/// One chromosome to filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromosomeJob {
    pub name: String,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl ChromosomeJob {
    pub fn new(input_dir: &Path, output_root: &Path) -> Option<Self> {
        let name = input_dir.file_name()?.to_string_lossy().into_owned();
        Some(Self {
            output_dir: output_root.join(&name),
            input_dir: input_dir.to_path_buf(),
            name,
        })
    }

    /// Where the worker leaves its serialised `ChromosomeLog`
    pub fn result_path(&self) -> PathBuf {
        worker_result_path(&self.output_dir, &self.name)
    }
}

pub fn worker_result_path(output_dir: &Path, chromosome: &str) -> PathBuf {
    output_dir.join(format!("{}.filter_log.json", chromosome))
}

/// Persist a worker's log record for the parent to collect
pub fn write_worker_result(path: &Path, log: &ChromosomeLog) -> Result<(), String> {
    let json = serde_json::to_string_pretty(log)
        .map_err(|e| format!("Failed to serialize chromosome log: {}", e))?;
    fs::write(path, json)
        .map_err(|e| format!("Failed to write worker result '{}': {}", path.display(), e))
}

/// Worker-side entry point: decode the settings, filter one chromosome and
/// leave its log next to the filtered windows
pub fn run_worker(
    chromosome_dir: &Path,
    output_dir: &Path,
    settings_json: &str,
) -> Result<ChromosomeLog, String> {
    let config: FilterConfig = serde_json::from_str(settings_json)
        .map_err(|e| format!("Invalid worker settings: {}", e))?;
    let log = filter_chromosome(chromosome_dir, output_dir, &config)?;
    write_worker_result(&worker_result_path(output_dir, &log.chromosome), &log)?;
    Ok(log)
}

fn read_worker_result(path: &Path) -> Result<ChromosomeLog, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Missing worker result '{}': {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("Invalid worker result '{}': {}", path.display(), e))
}

/// Starts the OS process that filters one chromosome
pub trait WorkerLauncher {
    fn launch(&self, job: &ChromosomeJob) -> Result<Child, String>;
}

/// Re-executes the current binary in worker mode
pub struct SelfExecLauncher {
    executable: PathBuf,
    settings_json: String,
}

impl SelfExecLauncher {
    pub fn new(settings_json: String) -> Result<Self, String> {
        let executable = std::env::current_exe()
            .map_err(|e| format!("Failed to locate current executable: {}", e))?;
        Ok(Self {
            executable,
            settings_json,
        })
    }
}

impl SelfExecLauncher {
    /// Worker command line for one chromosome
    pub fn command(&self, job: &ChromosomeJob) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .arg("--worker-chromosome")
            .arg(&job.input_dir)
            .arg("--worker-output")
            .arg(&job.output_dir)
            .arg("--worker-settings")
            .arg(&self.settings_json)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());
        command
    }
}

impl WorkerLauncher for SelfExecLauncher {
    fn launch(&self, job: &ChromosomeJob) -> Result<Child, String> {
        self.command(job)
            .spawn()
            .map_err(|e| format!("Failed to start worker for '{}': {}", job.name, e))
    }
}

/// Merged result of a pool run
#[derive(Debug, Default)]
pub struct PoolReport {
    /// Written once per chromosome, after its worker joined
    pub logs: BTreeMap<String, ChromosomeLog>,
    pub failed: Vec<(String, String)>,
    pub cancelled: bool,
}

impl PoolReport {
    pub fn completed(&self) -> usize {
        self.logs.len()
    }

    /// Run-level verdict over `total` chromosomes: an interrupted run or one
    /// where nothing completed is an error; otherwise the number of failed
    /// chromosomes to warn about
    pub fn verdict(&self, total: usize) -> Result<usize, String> {
        if self.cancelled {
            return Err(format!(
                "Interrupted after {} of {} chromosomes; partial log written",
                self.completed(),
                total
            ));
        }
        if self.completed() == 0 {
            return Err("No chromosome completed successfully".to_string());
        }
        Ok(self.failed.len())
    }
}

/// Runs chromosomes in consecutive batches of `workers` processes
pub struct ProcessPool {
    workers: usize,
    poll_interval: Duration,
}

impl ProcessPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            poll_interval: Duration::from_millis(50),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Partition jobs into consecutive batches of the pool size
    pub fn batches<'a>(&self, jobs: &'a [ChromosomeJob]) -> Vec<&'a [ChromosomeJob]> {
        jobs.chunks(self.workers).collect()
    }

    /// Run every batch to completion in order. A set `cancel` flag kills the
    /// live workers of the current batch and stops before the next one.
    pub fn run(
        &self,
        jobs: &[ChromosomeJob],
        launcher: &dyn WorkerLauncher,
        cancel: &AtomicBool,
    ) -> Result<PoolReport, String> {
        let mut report = PoolReport::default();
        let start = Instant::now();

        let pb = ProgressBar::new(jobs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chromosomes {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );

        for (batch_idx, batch) in self.batches(jobs).into_iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                report.cancelled = true;
                break;
            }
            pb.set_message(format!("(batch {})", batch_idx + 1));

            let mut live: Vec<(&ChromosomeJob, Child)> = Vec::with_capacity(batch.len());
            for job in batch {
                // A stale result must never be mistaken for this run's output
                let _ = fs::remove_file(job.result_path());
                match launcher.launch(job) {
                    Ok(child) => live.push((job, child)),
                    Err(e) => {
                        terminate(&mut live);
                        pb.abandon();
                        return Err(e);
                    }
                }
            }

            while !live.is_empty() {
                if cancel.load(Ordering::SeqCst) {
                    terminate(&mut live);
                    report.cancelled = true;
                    break;
                }

                let mut idx = 0;
                while idx < live.len() {
                    match live[idx].1.try_wait() {
                        Ok(Some(status)) => {
                            let (job, _) = live.swap_remove(idx);
                            let cancelled = cancel.load(Ordering::SeqCst);
                            collect(&mut report, job, status.success(), status.code(), cancelled);
                            pb.inc(1);
                        }
                        Ok(None) => idx += 1,
                        Err(e) => {
                            let (job, mut child) = live.swap_remove(idx);
                            let _ = child.kill();
                            let _ = child.wait();
                            report
                                .failed
                                .push((job.name.clone(), format!("failed to poll worker: {}", e)));
                            pb.inc(1);
                        }
                    }
                }

                if !live.is_empty() {
                    thread::sleep(self.poll_interval);
                }
            }

            if report.cancelled {
                break;
            }
        }

        if report.cancelled {
            pb.abandon_with_message("⚠️  interrupted");
        } else {
            pb.finish_with_message("✅ done");
        }
        println!(
            "⏱️  {} chromosomes processed in {:.2}s ({} failed)",
            report.completed(),
            start.elapsed().as_secs_f64(),
            report.failed.len()
        );
        Ok(report)
    }
}

fn collect(
    report: &mut PoolReport,
    job: &ChromosomeJob,
    success: bool,
    code: Option<i32>,
    cancelled: bool,
) {
    // The interrupt reaches workers too; an exit during cancellation is not a failure
    if !success && cancelled {
        report.cancelled = true;
        return;
    }
    if !success {
        let reason = match code {
            Some(c) => format!("worker exited with status {}", c),
            None => "worker terminated by signal".to_string(),
        };
        report.failed.push((job.name.clone(), reason));
        return;
    }
    match read_worker_result(&job.result_path()) {
        Ok(log) => {
            report.logs.insert(job.name.clone(), log);
        }
        Err(e) => report.failed.push((job.name.clone(), e)),
    }
}

/// Kill and reap every live worker
fn terminate(live: &mut Vec<(&ChromosomeJob, Child)>) {
    for (job, child) in live.iter_mut() {
        if let Err(e) = child.kill() {
            eprintln!("⚠️  Failed to stop worker for '{}': {}", job.name, e);
        }
        let _ = child.wait();
    }
    live.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Launches `sh -c` scripts that stand in for the real worker
    struct ShellLauncher {
        script: fn(&ChromosomeJob) -> String,
        launched: Mutex<Vec<String>>,
    }

    impl WorkerLauncher for ShellLauncher {
        fn launch(&self, job: &ChromosomeJob) -> Result<Child, String> {
            self.launched.lock().unwrap().push(job.name.clone());
            Command::new("sh")
                .arg("-c")
                .arg((self.script)(job))
                .stdout(Stdio::null())
                .spawn()
                .map_err(|e| e.to_string())
        }
    }

    fn jobs(root: &Path, names: &[&str]) -> Vec<ChromosomeJob> {
        names
            .iter()
            .map(|n| {
                let job = ChromosomeJob::new(&root.join("in").join(n), &root.join("out")).unwrap();
                fs::create_dir_all(&job.output_dir).unwrap();
                job
            })
            .collect()
    }

    fn write_log_script(job: &ChromosomeJob) -> String {
        let log = ChromosomeLog {
            initial_windows: job.name.len(),
            ..ChromosomeLog::new(&job.name)
        };
        let json = serde_json::to_string(&log).unwrap();
        format!("printf '%s' '{}' > '{}'", json, job.result_path().display())
    }

    #[test]
    fn test_worker_count_parsing() {
        assert_eq!("all".parse::<WorkerCount>().unwrap(), WorkerCount::All);
        assert_eq!("ALL".parse::<WorkerCount>().unwrap(), WorkerCount::All);
        assert_eq!("4".parse::<WorkerCount>().unwrap(), WorkerCount::Fixed(4));
        assert!("0".parse::<WorkerCount>().is_err());
        assert!("many".parse::<WorkerCount>().is_err());
    }

    #[test]
    fn test_worker_count_resolution() {
        assert_eq!(WorkerCount::All.resolve(8).unwrap(), 8);
        assert_eq!(WorkerCount::Fixed(3).resolve(8).unwrap(), 3);
        assert!(WorkerCount::Fixed(9).resolve(8).is_err());
    }

    #[test]
    fn test_batches_are_consecutive() {
        let dir = TempDir::new().unwrap();
        let jobs = jobs(dir.path(), &["c1", "c2", "c3", "c4", "c5"]);
        let pool = ProcessPool::new(2);
        assert_eq!(pool.workers(), 2);
        assert_eq!(ProcessPool::new(0).workers(), 1);
        let batches: Vec<Vec<&str>> = pool
            .batches(&jobs)
            .iter()
            .map(|b| b.iter().map(|j| j.name.as_str()).collect())
            .collect();
        assert_eq!(batches, vec![vec!["c1", "c2"], vec!["c3", "c4"], vec!["c5"]]);
    }

    #[test]
    fn test_pool_collects_logs_by_chromosome() {
        let dir = TempDir::new().unwrap();
        let jobs = jobs(dir.path(), &["chr1", "chr2", "chrX"]);
        let launcher = ShellLauncher {
            script: write_log_script,
            launched: Mutex::new(Vec::new()),
        };
        let cancel = AtomicBool::new(false);

        let report = ProcessPool::new(2).run(&jobs, &launcher, &cancel).unwrap();
        assert!(!report.cancelled);
        assert!(report.failed.is_empty());
        assert_eq!(report.completed(), 3);
        assert_eq!(report.logs["chrX"].chromosome, "chrX");
        assert_eq!(report.logs["chr1"].initial_windows, 4);
        assert_eq!(*launcher.launched.lock().unwrap(), vec!["chr1", "chr2", "chrX"]);
    }

    #[test]
    fn test_failed_worker_is_reported() {
        let dir = TempDir::new().unwrap();
        let jobs = jobs(dir.path(), &["ok", "bad"]);
        let launcher = ShellLauncher {
            script: |job| {
                if job.name == "bad" {
                    "exit 3".to_string()
                } else {
                    write_log_script(job)
                }
            },
            launched: Mutex::new(Vec::new()),
        };
        let report = ProcessPool::new(2)
            .run(&jobs, &launcher, &AtomicBool::new(false))
            .unwrap();
        assert_eq!(report.completed(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "bad");
        assert!(report.failed[0].1.contains('3'));
    }

    #[test]
    fn test_cancel_before_start_launches_nothing() {
        let dir = TempDir::new().unwrap();
        let jobs = jobs(dir.path(), &["chr1", "chr2"]);
        let launcher = ShellLauncher {
            script: |_| "sleep 30".to_string(),
            launched: Mutex::new(Vec::new()),
        };
        let report = ProcessPool::new(2)
            .run(&jobs, &launcher, &AtomicBool::new(true))
            .unwrap();
        assert!(report.cancelled);
        assert!(launcher.launched.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cancel_kills_running_batch() {
        let dir = TempDir::new().unwrap();
        let jobs = jobs(dir.path(), &["chr1", "chr2", "chr3"]);
        let launcher = ShellLauncher {
            script: |_| "sleep 30".to_string(),
            launched: Mutex::new(Vec::new()),
        };
        let cancel = AtomicBool::new(false);
        let start = Instant::now();

        let report = thread::scope(|s| {
            s.spawn(|| {
                thread::sleep(Duration::from_millis(200));
                cancel.store(true, Ordering::SeqCst);
            });
            ProcessPool::new(2).run(&jobs, &launcher, &cancel).unwrap()
        });

        assert!(report.cancelled);
        assert!(report.logs.is_empty());
        assert!(start.elapsed() < Duration::from_secs(10));
        // second batch never started
        assert_eq!(*launcher.launched.lock().unwrap(), vec!["chr1", "chr2"]);
    }

    #[test]
    fn test_worker_round_trip_through_result_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in").join("chr5");
        fs::create_dir_all(&input).unwrap();
        let seq = "ACGT".repeat(30);
        fs::write(
            input.join("chr5_1_120.fasta"),
            format!(">S1\n{0}\n>S2\n{0}\n>S3\n{0}\n", seq),
        )
        .unwrap();
        fs::write(input.join("chr5_121_240.fasta"), "").unwrap();

        let mut config = FilterConfig::default();
        config.scan.reference = "S1".to_string();
        config.scan.exclude.insert("S3".to_string());
        config.coverage_cutoff = 0.75;
        let settings_json = serde_json::to_string(&config).unwrap();
        let decoded: FilterConfig = serde_json::from_str(&settings_json).unwrap();
        assert_eq!(decoded, config);

        let job = ChromosomeJob::new(&input, &dir.path().join("out")).unwrap();
        let log = run_worker(&job.input_dir, &job.output_dir, &settings_json).unwrap();
        assert_eq!(log.chromosome, "chr5");
        assert_eq!(log.initial_windows, 2);
        assert_eq!(log.valid_remaining, 1);
        assert_eq!(log.passed_through_drops, 1);
        assert_eq!(read_worker_result(&job.result_path()).unwrap(), log);

        assert!(run_worker(&job.input_dir, &job.output_dir, "{not json").is_err());
    }

    #[test]
    fn test_self_exec_command_line() {
        let launcher = SelfExecLauncher::new("{\"coverage_cutoff\":0.9}".to_string()).unwrap();
        let job = ChromosomeJob::new(Path::new("/data/in/chr2"), Path::new("/data/out")).unwrap();
        let command = launcher.command(&job);

        assert_eq!(command.get_program(), std::env::current_exe().unwrap().as_os_str());
        let args: Vec<String> = command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "--worker-chromosome",
                "/data/in/chr2",
                "--worker-output",
                "/data/out/chr2",
                "--worker-settings",
                "{\"coverage_cutoff\":0.9}",
            ]
        );
    }

    #[test]
    fn test_run_verdict() {
        let mut report = PoolReport::default();
        // nothing completed
        assert!(report.verdict(2).is_err());

        report.logs.insert("chr1".to_string(), ChromosomeLog::new("chr1"));
        report.failed.push(("chr2".to_string(), "worker exited with status 1".to_string()));
        assert_eq!(report.verdict(2), Ok(1));

        report.cancelled = true;
        assert!(report.verdict(2).unwrap_err().contains("Interrupted"));
    }

    #[test]
    fn test_exit_during_cancellation_is_not_a_failure() {
        let dir = TempDir::new().unwrap();
        let jobs = jobs(dir.path(), &["chr1"]);

        let mut interrupted = PoolReport::default();
        collect(&mut interrupted, &jobs[0], false, None, true);
        assert!(interrupted.cancelled);
        assert!(interrupted.failed.is_empty());

        let mut crashed = PoolReport::default();
        collect(&mut crashed, &jobs[0], false, None, false);
        assert!(!crashed.cancelled);
        assert_eq!(crashed.failed.len(), 1);
        assert!(crashed.failed[0].1.contains("signal"));
    }
}

/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Run bookkeeping: per-mapper [`TestResult`]s, the [`Statistic`]
//! aggregation relative to the `"CPUMapping"` baseline, and the
//! `results/` directory artifacts (`statistics.txt`, `seeds.log`).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use chrono::Local;

use crate::types::{Seed, Time};

/// One mapper's outcome on one run.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub label: String,
    pub objective: Time,
    pub runtime: Duration,
    pub timeout: bool,
}

/// Every mapper's [`TestResult`] for a single generated graph.
pub type TestRun = Vec<TestResult>;

/// Running aggregate of one mapper's outcomes across many [`TestRun`]s,
/// relative to that run's `"CPUMapping"` baseline objective.
#[derive(Debug, Clone)]
pub struct Statistic {
    pub label: String,
    pub nbr_winner: u32,
    pub nbr_impr: u32,
    pub nbr_worsen: u32,
    pub nbr_equal: u32,
    pub nbr_timeout: u32,
    pub total_runs: usize,
    pub total_impr: f64,
    pub total_rel_impr: f64,
    pub total_rel_positive_impr: f64,
    pub min_impr: f64,
    pub max_impr: f64,
    pub total_time_ms: f64,
    pub total_objective: f64,
    pub total_ref_objective: f64,
}

impl Statistic {
    pub fn new(label: impl Into<String>) -> Self {
        Statistic {
            label: label.into(),
            nbr_winner: 0,
            nbr_impr: 0,
            nbr_worsen: 0,
            nbr_equal: 0,
            nbr_timeout: 0,
            total_runs: 0,
            total_impr: 0.0,
            total_rel_impr: 0.0,
            total_rel_positive_impr: 0.0,
            min_impr: f64::INFINITY,
            max_impr: f64::NEG_INFINITY,
            total_time_ms: 0.0,
            total_objective: 0.0,
            total_ref_objective: 0.0,
        }
    }

    /// Folds one (result, baseline) pair into the aggregate. `result`/
    /// `ref_result` are both objective values (lower is better), so
    /// `impr = ref_result - result` is positive when `result` beats the
    /// baseline.
    pub fn update(&mut self, result: f64, ref_result: f64) {
        let impr = ref_result - result;
        if impr > 0.0 {
            self.nbr_impr += 1;
        } else if impr == 0.0 {
            self.nbr_equal += 1;
        } else {
            self.nbr_worsen += 1;
        }

        self.total_impr += impr;
        let rel = impr / ref_result;
        self.total_rel_impr += rel;
        if impr > 0.0 {
            self.total_rel_positive_impr += rel;
        }
        self.min_impr = self.min_impr.min(rel);
        self.max_impr = self.max_impr.max(rel);

        self.total_objective += result;
        self.total_ref_objective += ref_result;
        self.total_runs += 1;
    }
}

/// Aggregates a batch of [`TestRun`]s into one [`Statistic`] per mapper
/// label, ordered as they appear in the first run. A run missing the
/// `"CPUMapping"` baseline contributes only `nbr_winner`/`nbr_timeout`
/// counts for that run: with no baseline column to compare against, the
/// relative-improvement update is skipped rather than indexed with a
/// sentinel position.
pub fn create_statistics(results: &[TestRun]) -> Vec<Statistic> {
    let Some(first) = results.first() else {
        return Vec::new();
    };
    let mut statistics: Vec<Statistic> = first.iter().map(|r| Statistic::new(r.label.clone())).collect();
    let cpu_idx = first.iter().position(|r| r.label == "CPUMapping");

    for run in results {
        let min_obj = run.iter().map(|r| r.objective).fold(f64::INFINITY, f64::min);

        for (i, res) in run.iter().enumerate() {
            let Some(stat) = statistics.get_mut(i) else { continue };
            if res.timeout {
                stat.nbr_timeout += 1;
                continue;
            }
            if res.objective == min_obj {
                stat.nbr_winner += 1;
            }

            let Some(cpu_idx) = cpu_idx else { continue };
            let Some(baseline) = run.get(cpu_idx) else { continue };
            stat.update(res.objective, baseline.objective);
            stat.total_time_ms += res.runtime.as_secs_f64() * 1000.0;
        }
    }

    statistics
}

/// Appends (or overwrites, when `append` is `false`) `path` with one
/// semicolon-separated line per mapper that saw at least one run:
/// `label;avg_positive_impr;min_impr;max_impr;nbr_impr;avg_time_ms;nbr_winner;nbr_worsen;nbr_equal`.
pub fn results_to_file(path: &Path, results: &[TestRun], config_name: &str, append: bool) -> std::io::Result<()> {
    if results.is_empty() {
        return Ok(());
    }
    let statistics = create_statistics(results);

    let mut file = OpenOptions::new().create(true).write(true).append(append).truncate(!append).open(path)?;
    writeln!(file, "Configuration: {config_name}")?;
    for stat in &statistics {
        if stat.total_runs == 0 {
            continue;
        }
        writeln!(
            file,
            "{};{};{};{};{};{};{};{};{}",
            stat.label,
            stat.total_rel_positive_impr / stat.total_runs as f64,
            stat.min_impr,
            stat.max_impr,
            stat.nbr_impr,
            stat.total_time_ms / stat.total_runs as f64,
            stat.nbr_winner,
            stat.nbr_worsen,
            stat.nbr_equal,
        )?;
    }
    writeln!(file)?;
    Ok(())
}

/// Ensures `<root>/results/` and `<root>/export/kernels/` exist, and clears
/// any `statistics.txt` left over from a previous run.
pub fn prepare_files(root: &Path) -> std::io::Result<()> {
    let results_dir = root.join("results");
    std::fs::create_dir_all(&results_dir)?;
    let stats_path = results_dir.join("statistics.txt");
    if stats_path.exists() {
        std::fs::remove_file(&stats_path)?;
    }
    std::fs::create_dir_all(root.join("export").join("kernels"))?;
    Ok(())
}

/// Appends a `"YYYY-MM-DD HH:MM:SS Seed: <seed>"` line to
/// `<root>/results/seeds.log`, so a later run can be reproduced.
pub fn write_seed_log(root: &Path, seed: Seed) -> std::io::Result<()> {
    let results_dir = root.join("results");
    std::fs::create_dir_all(&results_dir)?;
    let mut file = OpenOptions::new().create(true).append(true).open(results_dir.join("seeds.log"))?;
    let ts = Local::now().format("%F %T");
    writeln!(file, "{ts} Seed: {seed}")?;
    Ok(())
}

/// Logs each mapper's timing/objective and the run's label order sorted by
/// objective, ascending.
pub fn print_results(run: &TestRun) {
    for result in run {
        tracing::info!(
            mapper = %result.label,
            runtime_ms = result.runtime.as_millis() as u64,
            objective_s = result.objective / 1000.0,
            "mapper finished"
        );
    }
    let mut sorted: Vec<&TestResult> = run.iter().collect();
    sorted.sort_by(|a, b| a.objective.partial_cmp(&b.objective).unwrap());
    let order: Vec<&str> = sorted.iter().map(|r| r.label.as_str()).collect();
    tracing::info!(order = %order.join(" "), "run ranking");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, objective: f64) -> TestResult {
        TestResult {
            label: label.to_string(),
            objective,
            runtime: Duration::from_millis(10),
            timeout: false,
        }
    }

    #[test]
    fn statistic_update_counts_improve_worsen_equal() {
        let mut stat = Statistic::new("HEFT");
        stat.update(50.0, 100.0); // improvement
        stat.update(150.0, 100.0); // worsened
        stat.update(100.0, 100.0); // equal
        assert_eq!(stat.nbr_impr, 1);
        assert_eq!(stat.nbr_worsen, 1);
        assert_eq!(stat.nbr_equal, 1);
        assert_eq!(stat.total_runs, 3);
    }

    #[test]
    fn create_statistics_counts_winner_relative_to_cpu_baseline() {
        let run1 = vec![result("CPUMapping", 100.0), result("HEFT", 60.0)];
        let run2 = vec![result("CPUMapping", 100.0), result("HEFT", 100.0)];
        let stats = create_statistics(&[run1, run2]);

        let heft = stats.iter().find(|s| s.label == "HEFT").unwrap();
        assert_eq!(heft.nbr_winner, 1);
        assert_eq!(heft.nbr_impr, 1);
        assert_eq!(heft.nbr_equal, 1);
        assert_eq!(heft.total_runs, 2);
    }

    #[test]
    fn timeout_runs_are_counted_but_excluded_from_improvement() {
        let run = vec![
            result("CPUMapping", 100.0),
            TestResult {
                label: "MILP-DeviceBased".into(),
                objective: 0.0,
                runtime: Duration::from_millis(5000),
                timeout: true,
            },
        ];
        let stats = create_statistics(&[run]);
        let milp = stats.iter().find(|s| s.label == "MILP-DeviceBased").unwrap();
        assert_eq!(milp.nbr_timeout, 1);
        assert_eq!(milp.total_runs, 0);
    }

    #[test]
    fn results_to_file_writes_one_line_per_mapper_with_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("statistics.txt");
        let run = vec![result("CPUMapping", 100.0), result("HEFT", 80.0)];
        results_to_file(&path, &[run], "CGF", false).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("Configuration: CGF"));
        assert!(contents.contains("HEFT;"));
    }

    #[test]
    fn prepare_files_removes_stale_statistics_and_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("results")).unwrap();
        std::fs::write(dir.path().join("results/statistics.txt"), "stale").unwrap();

        prepare_files(dir.path()).unwrap();

        assert!(!dir.path().join("results/statistics.txt").exists());
        assert!(dir.path().join("export/kernels").is_dir());
    }

    #[test]
    fn write_seed_log_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        write_seed_log(dir.path(), 1).unwrap();
        write_seed_log(dir.path(), 2).unwrap();

        let contents = std::fs::read_to_string(dir.path().join("results/seeds.log")).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("Seed: 1"));
        assert!(contents.contains("Seed: 2"));
    }
}

/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Command-line entry point: generates (or ingests) task graphs, maps each
//! with the default mapper suite, and writes the aggregated statistics.

use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use task_mapper::config::load_platform;
use task_mapper::evaluator::MappingEvaluator;
use task_mapper::graph_generator::generate_random_series_parallel_graph;
use task_mapper::graphviz::draw_graph;
use task_mapper::ingest::{build_from_json, read_benchmark_folder};
use task_mapper::mapper::decomposition::{EvaluateAllPolicy, EvaluateThresholdPolicy, GreedyBase, SeriesParallelDecompositionMapper, SingleNodeDecompositionMapper};
use task_mapper::mapper::genetic::GeneticMapper;
use task_mapper::mapper::greedy::GreedyMapper;
use task_mapper::mapper::heft::HeftMapper;
use task_mapper::mapper::milp::{Formulation, MilpMapper};
use task_mapper::mapper::peft::PeftMapper;
use task_mapper::mapper::simulated_annealing::SimulatedAnnealingMapper;
use task_mapper::mapper::Mapper;
use task_mapper::platform_catalog::create_platform;
use task_mapper::results::{prepare_files, print_results, results_to_file, write_seed_log, TestResult, TestRun};
use task_mapper::system::{ComputationBasedSystem, System};
use task_mapper::types::Seed;

const DEFAULT_GRAPH_SIZE: i64 = 100;
const DEFAULT_RUNS: i64 = 100;
const DATA_IN_MB: f64 = 100.0;
const EXTRA_RANDOM_RUNS: usize = 100;

/// Maps randomly generated (or ingested) task graphs across the default
/// mapper suite and reports aggregated statistics.
#[derive(Parser, Debug)]
#[command(name = "task-mapper")]
struct Cli {
    /// Task count per generated graph. Out-of-range/unparsable values fall
    /// back to the default rather than being rejected.
    graph_size: Option<i64>,

    /// Number of graphs to generate and map.
    runs: Option<i64>,

    /// RNG seed. Defaults to the current Unix time.
    seed: Option<i64>,

    /// `folders.cfg`-style file pointing at a benchmark folder of JSON
    /// workflow descriptions; when given, those are mapped instead of
    /// randomly generated graphs.
    #[arg(long)]
    config: Option<PathBuf>,

    /// YAML description of an alternate platform. Defaults to the built-in
    /// single-FPGA catalogue when absent.
    #[arg(long)]
    platform: Option<PathBuf>,

    /// Also write `.gv`/`.pdf` and `.graph` exports for every run.
    #[arg(short, long)]
    export: bool,

    /// Raise the log level to debug.
    #[arg(short, long)]
    verbose: bool,
}

/// Clamps an optional CLI integer into `[1, 1000]`, falling back to
/// `default` when absent or out of range, rather than rejecting the input.
fn clamp_or_default(value: Option<i64>, default: i64) -> usize {
    match value {
        Some(v) if (1..=1000).contains(&v) => v as usize,
        _ => default as usize,
    }
}

fn resolve_seed(value: Option<i64>) -> Seed {
    match value {
        Some(v) if v > 0 => v as Seed,
        _ => SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs(),
    }
}

/// Runs one mapper against `system`, evaluating the result (or recording a
/// timeout for an empty mapping), and optionally drawing/exporting it.
fn run_mapping<S: System>(
    label: &str,
    system: &S,
    mapper: &dyn Mapper<S>,
    test_run: &mut TestRun,
    rng: &mut ChaCha8Rng,
    export: bool,
    export_dir: &std::path::Path,
) {
    info!(mapper = label, "computing mapping");
    let start = Instant::now();
    let mapping = mapper.map(system);
    let runtime = start.elapsed();

    if mapping.is_empty() {
        warn!(mapper = label, "mapper produced no mapping");
        test_run.push(TestResult {
            label: label.to_string(),
            objective: f64::INFINITY,
            runtime,
            timeout: true,
        });
        return;
    }

    let evaluator = MappingEvaluator::new(system);
    match evaluator.evaluate_mapping_with_check(&mapping, EXTRA_RANDOM_RUNS, rng) {
        Ok((objective, log)) => {
            if export {
                if let Err(e) = draw_graph(system.graph(), system.platform(), &mapping, &log, label, export_dir) {
                    warn!(mapper = label, error = %e, "failed to draw graph");
                }
                if let Err(e) = task_mapper::export::export_graph(system.graph(), system.platform(), &mapping, label, export_dir) {
                    warn!(mapper = label, error = %e, "failed to export graph");
                }
            }
            test_run.push(TestResult {
                label: label.to_string(),
                objective,
                runtime,
                timeout: false,
            });
        }
        Err(e) => warn!(mapper = label, error = %e, "mapping failed validation"),
    }
}

/// Maps `system` with the reference "default mapper" suite: the greedy
/// CPU baseline, both decomposition mappers (exhaustive and first-fit
/// variants), simulated annealing, the genetic mapper, HEFT, PEFT, and the
/// device-based MILP formulation.
fn run_default_mappings<S: System>(system: &S, test_run: &mut TestRun, rng: &mut ChaCha8Rng, seed: Seed, export: bool, export_dir: &std::path::Path) {
    run_mapping("CPUMapping", system, &GreedyMapper, test_run, rng, export, export_dir);
    run_mapping(
        "SeriesParallelMapping",
        system,
        &SeriesParallelDecompositionMapper::new(GreedyBase, EvaluateAllPolicy, false),
        test_run,
        rng,
        export,
        export_dir,
    );
    run_mapping(
        "SPFirstFitMapping",
        system,
        &SeriesParallelDecompositionMapper::new(GreedyBase, EvaluateThresholdPolicy::new(10.0), false),
        test_run,
        rng,
        export,
        export_dir,
    );
    run_mapping(
        "SingleNodeMapping",
        system,
        &SingleNodeDecompositionMapper::new(GreedyBase, EvaluateAllPolicy),
        test_run,
        rng,
        export,
        export_dir,
    );
    run_mapping(
        "SNFirstFitMapping",
        system,
        &SingleNodeDecompositionMapper::new(GreedyBase, EvaluateThresholdPolicy::new(10.0)),
        test_run,
        rng,
        export,
        export_dir,
    );
    run_mapping("SimulatedAnnealingMapping", system, &SimulatedAnnealingMapper::new(seed), test_run, rng, export, export_dir);
    run_mapping("GeneticMapping", system, &GeneticMapper::new(seed), test_run, rng, export, export_dir);
    run_mapping("HEFTMapping", system, &HeftMapper, test_run, rng, export, export_dir);
    run_mapping("PEFTMapping", system, &PeftMapper, test_run, rng, export, export_dir);
    run_mapping("DeviceBasedMapping", system, &MilpMapper::new(Formulation::DeviceBased), test_run, rng, export, export_dir);
}

/// Builds the platform for one graph: loads `path` as YAML when given,
/// otherwise falls back to the built-in single-FPGA catalogue. Built fresh
/// per graph since [`task_mapper::platform::Platform`] holds no `Clone` impl.
fn resolve_platform(path: Option<&std::path::Path>) -> Result<task_mapper::platform::Platform> {
    match path {
        Some(p) => load_platform(p),
        None => Ok(create_platform(1)),
    }
}

fn json_files_in(dir: &std::path::Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("cannot read benchmark folder {}", dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "json").unwrap_or(false))
        .collect();
    files.sort();
    Ok(files)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let graph_size = clamp_or_default(cli.graph_size, DEFAULT_GRAPH_SIZE);
    let runs = clamp_or_default(cli.runs, DEFAULT_RUNS);
    let seed = resolve_seed(cli.seed);
    info!(graph_size, runs, seed, "starting run");

    let root = std::path::Path::new(".");
    prepare_files(root).context("failed to prepare results/export directories")?;
    write_seed_log(root, seed).context("failed to write seed log")?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let export_dir = root.join("results");
    let mut all_runs: Vec<TestRun> = Vec::new();

    if let Some(config_path) = &cli.config {
        let benchmark_folder = read_benchmark_folder(config_path).context("failed to read benchmark folder pointer")?;
        let files = json_files_in(std::path::Path::new(&benchmark_folder))?;
        for file in files {
            let graph = build_from_json(&file, &mut rng).with_context(|| format!("failed to ingest {}", file.display()))?;
            let platform = resolve_platform(cli.platform.as_deref())?;
            let system = ComputationBasedSystem::new(graph, platform);
            let mut test_run = TestRun::new();
            let label = file.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "run".to_string());
            run_default_mappings(&system, &mut test_run, &mut rng, seed, cli.export, &export_dir.join(&label));
            print_results(&test_run);
            all_runs.push(test_run);
        }
    } else {
        for i in 0..runs {
            let graph = generate_random_series_parallel_graph(graph_size, DATA_IN_MB, &mut rng);
            let platform = resolve_platform(cli.platform.as_deref())?;
            let system = ComputationBasedSystem::new(graph, platform);
            let mut test_run = TestRun::new();
            let label = format!("run{i}");
            run_default_mappings(&system, &mut test_run, &mut rng, seed, cli.export, &export_dir.join(&label));
            print_results(&test_run);
            all_runs.push(test_run);
        }
    }

    results_to_file(&root.join("results").join("statistics.txt"), &all_runs, "CGF", false).context("failed to write statistics.txt")?;
    info!("run complete");
    Ok(())
}

/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Workflow ingest: reads a `config/folders.cfg` benchmark-folder pointer
//! and WfCommons-style JSON workflow descriptions into a [`TaskGraph`].

use std::path::Path;

use rand::Rng;
use serde::Deserialize;

use crate::error::IngestError;
use crate::graph_generator::TaskPropertyProducer;
use crate::task_graph::{SizePropagation, TaskGraph};
use crate::types::DataSize;

#[derive(Debug, Deserialize)]
struct WorkflowFile {
    workflow: Workflow,
}

#[derive(Debug, Deserialize)]
struct Workflow {
    #[serde(default)]
    machines: Vec<Machine>,
    tasks: Vec<TaskSpec>,
}

#[derive(Debug, Deserialize)]
struct Machine {
    #[serde(rename = "nodeName")]
    node_name: String,
    #[serde(default)]
    cpu: Option<Cpu>,
}

#[derive(Debug, Deserialize)]
struct Cpu {
    speed: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TaskSpec {
    name: String,
    #[serde(default)]
    machine: Option<String>,
    #[serde(rename = "runtimeInSeconds", default)]
    runtime_in_seconds: Option<f64>,
    #[serde(rename = "avgCPU", default)]
    avg_cpu: Option<f64>,
    #[serde(default)]
    files: Vec<FileSpec>,
    children: Option<Vec<String>>,
    #[serde(default)]
    parents: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FileSpec {
    link: String,
    #[serde(rename = "sizeInBytes")]
    size_in_bytes: i64,
}

const DEFAULT_CPU_SPEED_MBPS: f64 = 1200.0;

fn read_to_string(path: &Path) -> Result<String, IngestError> {
    std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Parses a WfCommons-style workflow description into a [`TaskGraph`].
///
/// Node speeds default to 1200 MB/s when a machine has no `cpu.speed`.
/// A task's complexity is back-derived from `runtimeInSeconds` /
/// `avgCPU` / the assigned machine's speed when all three are known and
/// positive, otherwise falls back to 1. Output size is constant
/// (`max(sum(output file bytes) / 1MiB, 1)`), ignoring input sizes, the way
/// the reference reader's captured size closure does.
///
/// Whether edges are read from each task's `children` or `parents` array is
/// decided once, from the *first* task's JSON shape: if it has no
/// `children` key, every task in the file is assumed to list `parents`
/// instead (mixed per-task shapes are not supported, matching the
/// reference reader).
pub fn build_from_json(path: &Path, rng: &mut impl Rng) -> Result<TaskGraph, IngestError> {
    let text = read_to_string(path)?;
    let parsed: WorkflowFile = serde_json::from_str(&text).map_err(|source| IngestError::Json {
        path: path.display().to_string(),
        source,
    })?;

    let mut speed = std::collections::HashMap::new();
    for machine in &parsed.workflow.machines {
        let s = machine.cpu.as_ref().and_then(|c| c.speed).map(|s| s as f64).unwrap_or(DEFAULT_CPU_SPEED_MBPS);
        speed.insert(machine.node_name.clone(), s);
    }

    let mut graph = TaskGraph::new();
    let producer = TaskPropertyProducer::new();
    let mut task_map = std::collections::HashMap::new();

    for task in &parsed.workflow.tasks {
        let properties = producer.sample(rng);

        let cpu_speed = task.machine.as_ref().and_then(|m| speed.get(m)).copied().unwrap_or(0.0);
        let runtime_s = task.runtime_in_seconds.unwrap_or(0.0);
        let avg_cpu = task.avg_cpu.unwrap_or(0.0);

        let mut output_bytes: DataSize = 0.0;
        let mut input_bytes: DataSize = 0.0;
        for file in &task.files {
            if file.link == "output" {
                output_bytes += file.size_in_bytes as DataSize;
            } else {
                input_bytes += file.size_in_bytes as DataSize;
            }
        }
        input_bytes = input_bytes.max(1.0);

        let complexity = if runtime_s > 0.0 && avg_cpu > 0.0 && cpu_speed > 0.0 {
            let input_mb = input_bytes / 1024.0 / 1024.0;
            runtime_s / (input_mb / (cpu_speed * avg_cpu / 100.0))
        } else {
            1.0
        };

        let output_mb = (output_bytes / 1024.0 / 1024.0).max(1.0);
        let id = graph.add_node(task.name.clone(), complexity, properties.parallelizability, properties.streamability);
        graph.set_size_func(id, SizePropagation::Constant(output_mb));
        task_map.insert(task.name.clone(), id);
    }

    let use_parents = parsed.workflow.tasks.first().map(|t| t.children.is_none()).unwrap_or(false);

    for task in &parsed.workflow.tasks {
        let curr = task_map[&task.name];
        if use_parents {
            for parent in &task.parents {
                if let Some(&p) = task_map.get(parent) {
                    graph.add_edge(p, curr);
                }
            }
        } else if let Some(children) = &task.children {
            for child in children {
                if let Some(&c) = task_map.get(child) {
                    graph.add_edge(curr, c);
                }
            }
        }
    }

    Ok(graph)
}

/// Task count of a workflow file, without building its graph.
pub fn size_from_json(path: &Path) -> Result<usize, IngestError> {
    let text = read_to_string(path)?;
    let parsed: WorkflowFile = serde_json::from_str(&text).map_err(|source| IngestError::Json {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parsed.workflow.tasks.len())
}

/// Reads the `BENCHMARK_FOLDER="..."` entry out of a `folders.cfg`-style
/// file: the first line containing `BENCHMARK_FOLDER`, with the path taken
/// from between its first two double quotes.
pub fn read_benchmark_folder(path: &Path) -> Result<String, IngestError> {
    let text = read_to_string(path)?;
    for line in text.lines() {
        if !line.contains("BENCHMARK_FOLDER") {
            continue;
        }
        if let Some(start) = line.find('"') {
            if let Some(end) = line[start + 1..].find('"') {
                return Ok(line[start + 1..start + 1 + end].to_string());
            }
        }
        break;
    }
    Err(IngestError::MissingBenchmarkFolder {
        path: path.display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::io::Write;

    fn write_tmp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    const CHILDREN_WORKFLOW: &str = r#"{
        "workflow": {
            "machines": [{"nodeName": "node1", "cpu": {"speed": 2400}}],
            "tasks": [
                {"name": "a", "machine": "node1", "runtimeInSeconds": 2.0, "avgCPU": 50.0,
                 "files": [{"link": "output", "sizeInBytes": 2097152}], "children": ["b"]},
                {"name": "b", "machine": "node1",
                 "files": [{"link": "input", "sizeInBytes": 1048576}], "children": []}
            ]
        }
    }"#;

    const PARENTS_WORKFLOW: &str = r#"{
        "workflow": {
            "machines": [],
            "tasks": [
                {"name": "a", "files": [{"link": "output", "sizeInBytes": 100}], "parents": []},
                {"name": "b", "files": [{"link": "input", "sizeInBytes": 100}], "parents": ["a"]}
            ]
        }
    }"#;

    #[test]
    fn children_workflow_builds_edge_from_parent_to_child() {
        let f = write_tmp(CHILDREN_WORKFLOW);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let g = build_from_json(f.path(), &mut rng).unwrap();
        assert_eq!(g.task_count(), 2);
        assert_eq!(g.edges().count(), 1);
    }

    #[test]
    fn parents_workflow_is_inferred_when_children_key_absent() {
        let f = write_tmp(PARENTS_WORKFLOW);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let g = build_from_json(f.path(), &mut rng).unwrap();
        assert_eq!(g.task_count(), 2);
        assert_eq!(g.edges().count(), 1);
    }

    #[test]
    fn complexity_falls_back_to_one_without_timing_info() {
        let f = write_tmp(PARENTS_WORKFLOW);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let g = build_from_json(f.path(), &mut rng).unwrap();
        for t in g.tasks() {
            assert_eq!(g.task(t).complexity, 1.0);
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = build_from_json(Path::new("/nonexistent/workflow.json"), &mut rng);
        assert!(matches!(result, Err(IngestError::Io { .. })));
    }

    #[test]
    fn malformed_json_is_json_error() {
        let f = write_tmp("{ not json");
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = build_from_json(f.path(), &mut rng);
        assert!(matches!(result, Err(IngestError::Json { .. })));
    }

    #[test]
    fn size_from_json_counts_tasks_without_building_graph() {
        let f = write_tmp(CHILDREN_WORKFLOW);
        assert_eq!(size_from_json(f.path()).unwrap(), 2);
    }

    #[test]
    fn benchmark_folder_is_parsed_from_quoted_value() {
        let f = write_tmp("BENCHMARK_FOLDER=\"/data/benchmarks\"\nOTHER_KEY=\"ignored\"\n");
        assert_eq!(read_benchmark_folder(f.path()).unwrap(), "/data/benchmarks");
    }

    #[test]
    fn missing_benchmark_folder_key_is_reported() {
        let f = write_tmp("OTHER_KEY=\"value\"\n");
        assert!(matches!(read_benchmark_folder(f.path()), Err(IngestError::MissingBenchmarkFolder { .. })));
    }
}

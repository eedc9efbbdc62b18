/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Graphviz `.gv` rendering of a mapped task graph and of the platform's
//! transfer-rate topology, with a best-effort `dot -Tpdf` shellout.
//!
//! Boost Graph Library's `write_graphviz_dp` (the reference renderer) has no
//! idiomatic Rust equivalent worth a dependency for one output format, so
//! this writes DOT source directly.

use std::path::Path;

use tracing::warn;

use crate::evaluator::EvaluationLog;
use crate::mapping::{Mapping, MappingLookup};
use crate::platform::{DeviceId, Platform};
use crate::task_graph::{EdgeId, TaskGraph, TaskId};

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn task_label(graph: &TaskGraph, platform: &Platform, mapping: &Mapping, log: &EvaluationLog, t: TaskId) -> String {
    let task = graph.task(t);
    let mut label = String::new();

    if let Some(pair) = mapping.lookup(t) {
        let mem_in = platform.label(pair.mem_in);
        let mem_out = platform.label(pair.mem_out);
        label.push_str(&format!("{}\n{}", platform.label(pair.proc), mem_in));
        if mem_in != mem_out {
            label.push_str(&format!(" -- {}", mem_out));
        }
    }

    label.push_str(&format!(
        "\np={:.2}, c={}, s={}",
        task.parallelizability / 100.0,
        task.complexity as i64,
        task.streamability as i64
    ));

    if let Some(&(start, end)) = log.tasks.get(&t) {
        label.push_str(&format!("\n{}ms -- {}ms", start as i64, end as i64));
    }

    label
}

fn edge_label(log: &EvaluationLog, e: EdgeId) -> String {
    match log.edges.get(&e) {
        Some(&(start, end)) if start != end => format!(" {}ms -- {}ms", start as i64, end as i64),
        Some(&(start, _)) => format!(" {}ms", start as i64),
        None => String::new(),
    }
}

/// Best-effort `dot -Tpdf <gv> > <pdf>`; a missing `dot` binary or non-zero
/// exit is logged, never propagated — rendering the PDF is a convenience,
/// not a correctness requirement.
fn render_pdf(gv_path: &Path, pdf_path: &Path) {
    match std::process::Command::new("dot").arg("-Tpdf").arg(gv_path).output() {
        Ok(output) if output.status.success() => {
            if let Err(e) = std::fs::write(pdf_path, output.stdout) {
                warn!(error = %e, path = %pdf_path.display(), "failed to write rendered pdf");
            }
        }
        Ok(output) => warn!(status = ?output.status, path = %gv_path.display(), "dot exited non-zero"),
        Err(e) => warn!(error = %e, "dot not available, skipping pdf render"),
    }
}

/// Writes `<results_dir>/<label>.gv` for `task_graph`/`mapping`/`log`, then
/// attempts to render it to `<results_dir>/<label>.pdf`.
pub fn draw_graph(
    task_graph: &TaskGraph,
    platform: &Platform,
    mapping: &Mapping,
    log: &EvaluationLog,
    label: &str,
    results_dir: &Path,
) -> std::io::Result<()> {
    std::fs::create_dir_all(results_dir)?;

    let mut dot = String::from("digraph G {\n");
    for t in task_graph.tasks() {
        dot.push_str(&format!("  {} [label=\"{}\"];\n", t.0, escape(&task_label(task_graph, platform, mapping, log, t))));
    }
    for e in task_graph.edges() {
        let edge = task_graph.edge(e);
        if !task_graph.task(edge.src).out_edges().contains(&e) {
            continue;
        }
        dot.push_str(&format!("  {} -> {} [label=\"{}\"];\n", edge.src.0, edge.snk.0, escape(&edge_label(log, e))));
    }
    dot.push_str("}\n");

    let gv_path = results_dir.join(format!("{label}.gv"));
    std::fs::write(&gv_path, dot)?;
    render_pdf(&gv_path, &results_dir.join(format!("{label}.pdf")));
    Ok(())
}

/// Writes `<results_dir>/<label>.gv`: an undirected graph of every
/// processor/memory, with a data-rate-labelled edge for every device pair
/// whose transfer rate is finite and positive.
pub fn draw_hardware_graph(platform: &Platform, label: &str, results_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(results_dir)?;

    let devices: Vec<DeviceId> = platform.memories().chain(platform.processors()).collect();

    let mut dot = String::from("graph G {\n");
    for (i, &d) in devices.iter().enumerate() {
        let device_label = match d {
            DeviceId::Memory(_) => format!("{}\n{} MB/s", platform.label(d), platform.memory(d).data_rate as i64),
            DeviceId::Processor(_) => platform.label(d).to_string(),
        };
        dot.push_str(&format!("  {i} [label=\"{}\"];\n", escape(&device_label)));
    }

    for i in 0..devices.len() {
        for j in (i + 1)..devices.len() {
            let rate = platform.transfer_rate_mbps(devices[i], devices[j]);
            if rate > 0.0 && rate.is_finite() {
                dot.push_str(&format!("  {} -- {} [label=\"{} MB/s\"];\n", i, j, rate as i64));
            }
        }
    }
    dot.push_str("}\n");

    let gv_path = results_dir.join(format!("{label}.gv"));
    std::fs::write(&gv_path, dot)?;
    render_pdf(&gv_path, &results_dir.join(format!("{label}.pdf")));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::DevicePair;
    use crate::platform_catalog::create_platform;

    #[test]
    fn draw_graph_writes_gv_with_task_and_edge_labels() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = TaskGraph::new();
        let a = graph.add_node("a", 2.0, 50.0, 1.0);
        let b = graph.add_node("b", 3.0, 100.0, 1.0);
        graph.add_edge(a, b);

        let platform = create_platform(0);
        let cpu = platform.find_processor_by_label("CPU").unwrap();
        let ram = platform.find_memory_by_label("Main_RAM").unwrap();
        let mut mapping = Mapping::new();
        mapping.set(a, DevicePair::same_memory(cpu, ram));
        mapping.set(b, DevicePair::same_memory(cpu, ram));

        let log = EvaluationLog::default();
        draw_graph(&graph, &platform, &mapping, &log, "run1", dir.path()).unwrap();

        let contents = std::fs::read_to_string(dir.path().join("run1.gv")).unwrap();
        assert!(contents.starts_with("digraph G {"));
        assert!(contents.contains("CPU"));
        assert!(contents.contains("->"));
    }

    #[test]
    fn draw_hardware_graph_connects_cpu_and_main_ram() {
        let dir = tempfile::tempdir().unwrap();
        let platform = create_platform(0);
        draw_hardware_graph(&platform, "hw", dir.path()).unwrap();

        let contents = std::fs::read_to_string(dir.path().join("hw.gv")).unwrap();
        assert!(contents.starts_with("graph G {"));
        assert!(contents.contains("--"));
    }

    #[test]
    fn deleted_edges_are_not_drawn() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = TaskGraph::new();
        let a = graph.add_node("a", 1.0, 100.0, 1.0);
        let b = graph.add_node("b", 1.0, 100.0, 1.0);
        let e = graph.add_edge(a, b);
        graph.delete_edge(e);

        let platform = create_platform(0);
        let mapping = Mapping::new();
        let log = EvaluationLog::default();
        draw_graph(&graph, &platform, &mapping, &log, "nodeps", dir.path()).unwrap();

        let contents = std::fs::read_to_string(dir.path().join("nodeps.gv")).unwrap();
        assert!(!contents.contains("->"));
    }
}

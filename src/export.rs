/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! OpenCL kernel stub generation and `.graph` export, for feeding mapped
//! task graphs into an external execution harness.

use std::path::Path;

use crate::mapping::{Mapping, MappingLookup};
use crate::platform::Platform;
use crate::task_graph::TaskGraph;

const GENERIC_KERNEL: &str = "__kernel void KERNEL_NAME(unsigned int N, INPUT_PARAM __global unsigned int* res) {
    {
        const unsigned idx = get_global_id(0);
        VARIABLE_DECLARATION
        unsigned result = 1;
        for (int i = 0; i < PARALLEL_COMPLEXITY; ++i) {
            OPERATIONS
        }
        res[idx] = result;
    }
    if(SERIAL_EXISTS_AND get_global_id(0) == 0) {
        for (int idx = 0; idx < N; ++idx) {
            VARIABLE_DECLARATION
            unsigned result = 1;
            for (int i = 0; i < SERIAL_COMPLEXITY; ++i) {
                OPERATIONS
            }
            res[idx] = result;
        }
    }
}
";

/// Writes a dummy OpenCL kernel stub named by its own shape
/// (`dummy_<complexity>_<parallelizability>_<nbr_inputs>.cl`) under
/// `<export_dir>/kernels/`, unless one with that name already exists —
/// tasks that share a shape share a kernel file. Returns the kernel name
/// (without extension) either way.
pub fn generate_kernel(complexity: f64, parallelizability: f64, nbr_inputs: usize, export_dir: &Path) -> std::io::Result<String> {
    let complexity = complexity.ceil();
    let nbr_inputs = nbr_inputs.max(1);
    let kernel_name = format!("dummy_{}_{}_{}", complexity as i64, parallelizability as i64, nbr_inputs);

    let kernels_dir = export_dir.join("kernels");
    std::fs::create_dir_all(&kernels_dir)?;
    let path = kernels_dir.join(format!("{kernel_name}.cl"));
    if path.exists() {
        return Ok(kernel_name);
    }

    let serial_exists = if parallelizability == 100.0 { "false && " } else { "" };
    let parallel_complexity = (complexity * parallelizability) as i64;
    let serial_complexity = (complexity * (100.0 - parallelizability)) as i64;

    let mut input_param = String::new();
    let mut declaration = String::new();
    let mut operations = String::new();
    for i in 0..nbr_inputs {
        let param = (b'a' + (i % 26) as u8) as char;
        input_param.push_str(&format!("__global unsigned int const* {param}, "));
        declaration.push_str(&format!("const unsigned v{param} = {param}[idx]; "));
        operations.push_str(&format!("result = (result + v{param}) % 47;"));
    }

    let kernel = GENERIC_KERNEL
        .replace("KERNEL_NAME", &kernel_name)
        .replace("SERIAL_EXISTS_AND", serial_exists)
        .replace("PARALLEL_COMPLEXITY", &parallel_complexity.to_string())
        .replace("SERIAL_COMPLEXITY", &serial_complexity.to_string())
        .replace("INPUT_PARAM", &input_param)
        .replace("VARIABLE_DECLARATION", &declaration)
        .replace("OPERATIONS", &operations);

    std::fs::write(&path, kernel)?;
    Ok(kernel_name)
}

/// Writes `<export_dir>/<label>.graph`: a header line (`262144`, the
/// assumed 1 MiB workitem granularity) followed by one CSV line per task —
/// `label,kernel,processor,0[,successor-label]*` — and generates that
/// task's kernel stub as a side effect.
pub fn export_graph(graph: &TaskGraph, platform: &Platform, mapping: &Mapping, label: &str, export_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(export_dir)?;

    let mut out = String::from("262144\n");
    for t in graph.tasks() {
        let task = graph.task(t);
        let kernel = generate_kernel(task.complexity, task.parallelizability, task.in_edges().len().max(1), export_dir)?;
        let proc_label = mapping.lookup(t).map(|p| platform.label(p.proc)).unwrap_or("");

        out.push_str(&format!("{},{},{},0", task.label, kernel, proc_label));
        for &e in task.out_edges() {
            let snk = graph.edge(e).snk;
            out.push_str(&format!(",{}", graph.task(snk).label));
        }
        out.push('\n');
    }

    std::fs::write(export_dir.join(format!("{label}.graph")), out)
}

/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Joins a [`TaskGraph`] and a [`Platform`], exposing the timing/
//! compatibility contract every mapper and the evaluator rely on.

use crate::platform::{DeviceId, Platform};
use crate::task_graph::{TaskGraph, TaskId};
use crate::types::{DataSize, Time};

/// The timing/compatibility contract a mapper or evaluator needs.
pub trait System {
    fn graph(&self) -> &TaskGraph;
    fn platform(&self) -> &Platform;

    /// Time to run `task` on `proc`, including the streamability divisor
    /// when `proc` is a streaming device.
    fn computation_time_ms(&self, task: TaskId, proc: DeviceId) -> Time;

    /// `1000 * bytes / transfer_rate(d1,d2)`; zero rate ⇒ infinity, infinite
    /// rate ⇒ 0.
    fn transaction_time_ms(&self, size: DataSize, d1: DeviceId, d2: DeviceId) -> Time;

    /// Source/sink tasks (zero in- or out-degree) are only compatible with
    /// devices labelled `"CPU"`/`"Main_RAM"`; every other task is compatible
    /// with every device.
    fn is_compatible(&self, task: TaskId, device: DeviceId) -> bool;
}

/// The concrete [`System`] used throughout this crate.
pub struct ComputationBasedSystem {
    graph: TaskGraph,
    platform: Platform,
}

impl ComputationBasedSystem {
    pub fn new(graph: TaskGraph, platform: Platform) -> Self {
        ComputationBasedSystem { graph, platform }
    }
}

impl System for ComputationBasedSystem {
    fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    fn platform(&self) -> &Platform {
        &self.platform
    }

    fn computation_time_ms(&self, task: TaskId, proc: DeviceId) -> Time {
        let t = self.graph.task(task);
        let p = self.platform.processor(proc);
        let base = p.processing_time_ms(self.graph.input_size(task), t.parallelizability) * t.complexity;
        if p.is_streaming_device() {
            base / t.streamability
        } else {
            base
        }
    }

    fn transaction_time_ms(&self, size: DataSize, d1: DeviceId, d2: DeviceId) -> Time {
        let rate = self.platform.transfer_rate_mbps(d1, d2);
        if rate == 0.0 {
            f64::INFINITY
        } else if rate.is_infinite() {
            0.0
        } else {
            1000.0 * size / rate
        }
    }

    fn is_compatible(&self, task: TaskId, device: DeviceId) -> bool {
        let t = self.graph.task(task);
        if t.is_source() || t.is_sink() {
            matches!(device, DeviceId::Processor(_) if self.platform.label(device) == "CPU")
                || matches!(device, DeviceId::Memory(_) if self.platform.label(device) == "Main_RAM")
        } else {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform_catalog::create_platform;

    fn single_task_system() -> (ComputationBasedSystem, TaskId) {
        let mut g = TaskGraph::new();
        let t = g.add_node("t", 1.0, 100.0, 1.0);
        let platform = create_platform(0);
        (ComputationBasedSystem::new(g, platform), t)
    }

    #[test]
    fn transaction_time_infinite_rate_is_zero() {
        let (sys, _) = single_task_system();
        let cpu = sys.platform().find_processor_by_label("CPU").unwrap();
        assert_eq!(sys.transaction_time_ms(10.0, cpu, cpu), 0.0);
    }

    #[test]
    fn transaction_time_zero_rate_is_infinite() {
        let (sys, _) = single_task_system();
        let cpu = sys.platform().find_processor_by_label("CPU").unwrap();
        let gpu_ram = sys.platform().find_memory_by_label("GPU_RAM").unwrap();
        assert_eq!(sys.transaction_time_ms(10.0, cpu, gpu_ram), f64::INFINITY);
    }

    #[test]
    fn source_sink_task_only_compatible_with_cpu_main_ram() {
        let (sys, t) = single_task_system();
        let cpu = sys.platform().find_processor_by_label("CPU").unwrap();
        let gpu = sys.platform().find_processor_by_label("GPU").unwrap();
        let main_ram = sys.platform().find_memory_by_label("Main_RAM").unwrap();

        assert!(sys.is_compatible(t, cpu));
        assert!(sys.is_compatible(t, main_ram));
        assert!(!sys.is_compatible(t, gpu));
    }

    #[test]
    fn s1_trivial_computation_time_with_1mb_input() {
        use crate::task_graph::SizePropagation;

        let mut g = TaskGraph::new();
        let src = g.add_node("src", 1.0, 100.0, 1.0);
        let t = g.add_node("t", 1.0, 100.0, 1.0);
        g.set_size_func(src, SizePropagation::Constant(1.0));
        g.add_edge(src, t);

        let platform = create_platform(0);
        let sys = ComputationBasedSystem::new(g, platform);
        let cpu = sys.platform().find_processor_by_label("CPU").unwrap();

        let ct = sys.computation_time_ms(t, cpu);
        assert!((ct - 1000.0 / 11600.0).abs() < 1e-6);
    }
}

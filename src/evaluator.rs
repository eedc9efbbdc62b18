/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! [`MappingEvaluator`]: simulates a non-preemptive schedule over a sorted
//! element stream to compute a mapping's predicted makespan.

use std::cell::RefCell;
use std::collections::HashMap;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::{EvaluatorError, ValidationFailure};
use crate::mapping::{Mapping, MappingLookup};
use crate::platform::DeviceId;
use crate::system::System;
use crate::task_graph::{EdgeId, TaskId};
use crate::topo_sort::{self, CachedSorting, GraphElement, SortMode, TopologicalSorting};
use crate::types::Time;

/// Per-task/edge start-end log, used only for Gantt-style rendering.
#[derive(Debug, Clone, Default)]
pub struct EvaluationLog {
    pub tasks: HashMap<TaskId, (Time, Time)>,
    pub edges: HashMap<EdgeId, (Time, Time)>,
}

fn device_time(times: &HashMap<DeviceId, Time>, d: DeviceId) -> Time {
    *times.get(&d).unwrap_or(&0.0)
}

/// Verifies every task in the system's graph has an entry.
pub fn is_complete<S: System, M: MappingLookup>(system: &S, mapping: &M) -> bool {
    system.graph().tasks().all(|t| mapping.lookup(t).is_some())
}

/// Verifies every mapped task's processor/memories are all compatible with
/// it (SPEC_FULL.md §4.1).
pub fn check_compatible<S: System, M: MappingLookup>(system: &S, mapping: &M) -> Result<(), ValidationFailure> {
    for t in system.graph().tasks() {
        let Some(pair) = mapping.lookup(t) else {
            return Err(ValidationFailure::IncompleteMapping {
                task: system.graph().task(t).label.clone(),
            });
        };
        for d in [pair.proc, pair.mem_in, pair.mem_out] {
            if !system.is_compatible(t, d) {
                return Err(ValidationFailure::IncompatibleAssignment {
                    task: system.graph().task(t).label.clone(),
                    processor: system.platform().label(d).to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Verifies no capacity-bounded processor is over-subscribed.
pub fn check_capacity<S: System, M: MappingLookup>(system: &S, mapping: &M) -> Result<(), ValidationFailure> {
    let mut used: HashMap<DeviceId, f64> = HashMap::new();
    for t in system.graph().tasks() {
        let Some(pair) = mapping.lookup(t) else {
            continue;
        };
        let cap = system.platform().processor(pair.proc).capacity;
        if cap.is_finite() {
            let u = used.entry(pair.proc).or_insert(0.0);
            *u += system.graph().task(t).area();
            if *u > cap {
                return Err(ValidationFailure::CapacityExceeded {
                    processor: system.platform().label(pair.proc).to_string(),
                    used: *u,
                    capacity: cap,
                });
            }
        }
    }
    Ok(())
}

/// Simulates a non-preemptive schedule over `ordering`, returning the
/// makespan (max over every device's final timestamp) and a
/// task/edge-indexed [`EvaluationLog`].
pub fn simulate<S: System, M: MappingLookup>(system: &S, mapping: &M, ordering: &TopologicalSorting) -> (Time, EvaluationLog) {
    let mut times: HashMap<DeviceId, Time> = HashMap::new();
    let mut log = EvaluationLog::default();

    for el in ordering.elements() {
        match el {
            GraphElement::Task(t) => {
                let pair = mapping.lookup(*t).expect("mapping must be complete before simulate");
                let t_start = device_time(&times, pair.proc)
                    .max(device_time(&times, pair.mem_in))
                    .max(device_time(&times, pair.mem_out));
                let comp = system.computation_time_ms(*t, pair.proc);
                let in_xfer = system.transaction_time_ms(system.graph().input_size(*t), pair.mem_in, pair.proc);
                let out_xfer = system.transaction_time_ms(system.graph().output_size(*t), pair.proc, pair.mem_out);
                let t_end = t_start + comp + in_xfer + out_xfer;
                times.insert(pair.proc, t_end);
                times.insert(pair.mem_in, t_end);
                times.insert(pair.mem_out, t_end);
                log.tasks.insert(*t, (t_start, t_end));
            }
            GraphElement::Edge(e) => {
                let edge = system.graph().edge(*e);
                let mo = mapping.mem_out(edge.src).expect("edge src must be mapped");
                let mi = mapping.mem_in(edge.snk).expect("edge snk must be mapped");
                let t_start = device_time(&times, mo).max(device_time(&times, mi));
                let xfer = system.transaction_time_ms(system.graph().output_size(edge.src), mo, mi);
                let t_end = t_start + xfer;
                times.insert(mo, t_end);
                times.insert(mi, t_end);
                log.edges.insert(*e, (t_start, t_end));
            }
            GraphElement::SubGraph(sg) => {
                let t_start = sg.devices.iter().map(|&d| device_time(&times, d)).fold(0.0, f64::max);
                let mut exec = 0.0f64;

                for &t in &sg.tasks {
                    let pair = mapping.lookup(t).expect("subgraph member must be mapped");
                    let stage = system.computation_time_ms(t, pair.proc)
                        + system.transaction_time_ms(system.graph().input_size(t), pair.mem_in, pair.proc)
                        + system.transaction_time_ms(system.graph().output_size(t), pair.proc, pair.mem_out);
                    exec = exec.max(stage);
                    log.tasks.insert(t, (t_start, t_start + stage));
                }
                for &e in &sg.internal_edges {
                    let edge = system.graph().edge(e);
                    let mo = mapping.mem_out(edge.src).expect("internal edge src mapped");
                    let mi = mapping.mem_in(edge.snk).expect("internal edge snk mapped");
                    let xfer = system.transaction_time_ms(system.graph().output_size(edge.src), mo, mi);
                    exec = exec.max(xfer);
                    log.edges.insert(e, (t_start, t_start + xfer));
                }

                let t_end = t_start + exec;
                for &d in &sg.devices {
                    times.insert(d, t_end);
                }
            }
        }
    }

    let makespan = times.values().cloned().fold(0.0, f64::max);
    (makespan, log)
}

fn build_sorting<S: System, M: MappingLookup>(
    system: &S,
    mapping: &M,
    mode: SortMode,
    rng: Option<&mut dyn rand::RngCore>,
) -> TopologicalSorting {
    match mode {
        SortMode::Bfs => topo_sort::bfs(system.graph(), true),
        SortMode::TaskFirstBfs => topo_sort::task_first_bfs(system.graph(), true),
        SortMode::Random => {
            let rng = rng.expect("Random sort mode requires an RNG");
            topo_sort::random(system.graph(), true, rng)
        }
        SortMode::MappingBased => topo_sort::mapping_based(system.graph(), system, mapping, true),
    }
}

/// Simulates a non-preemptive schedule over the mapping, with a cached
/// sorting slot reused across repeated calls with the same `SortMode`.
///
/// One evaluator should back one mapping-improvement attempt; it is cheap
/// enough to create and discard per attempt.
pub struct MappingEvaluator<'a, S: System> {
    system: &'a S,
    cached: RefCell<CachedSorting>,
}

impl<'a, S: System> MappingEvaluator<'a, S> {
    pub fn new(system: &'a S) -> Self {
        MappingEvaluator {
            system,
            cached: RefCell::new(CachedSorting::new()),
        }
    }

    pub fn system(&self) -> &'a S {
        self.system
    }

    /// Chooses a sort (default [`SortMode::TaskFirstBfs`]); if any task is
    /// mapped to a streaming processor, runs the compression pass before
    /// simulating. Does not validate the mapping — callers that need
    /// validation should use [`Self::evaluate_mapping_with_check`].
    ///
    /// `mode` must be `Bfs`, `TaskFirstBfs`, or `MappingBased` —
    /// `SortMode::Random` needs an RNG and is only reachable through
    /// [`Self::evaluate_mapping_with_check`]'s robustness retries.
    pub fn compute_cost<M: MappingLookup>(&self, mapping: &M, mode: SortMode) -> Time {
        self.evaluate(mapping, mode).0
    }

    pub fn evaluate<M: MappingLookup>(&self, mapping: &M, mode: SortMode) -> (Time, EvaluationLog) {
        let needs_streaming = self
            .system
            .graph()
            .tasks()
            .any(|t| mapping.proc(t).map(|p| self.system.platform().processor(p).is_streaming_device()).unwrap_or(false));

        let mut cache = self.cached.borrow_mut();
        let sorting = if mode == SortMode::MappingBased || needs_streaming {
            // Mapping-dependent orderings are never reused across different
            // mappings.
            build_sorting(self.system, mapping, mode, None)
        } else if let Some(cached) = cache.get(mode, true) {
            return self.simulate_borrowed(mapping, cached);
        } else {
            build_sorting(self.system, mapping, mode, None)
        };

        let mut sorting = sorting;
        if needs_streaming {
            crate::topo_sort::compress_streaming(&mut sorting, self.system.graph(), self.system, mapping);
        }

        let result = simulate(self.system, mapping, &sorting);
        if !needs_streaming && mode != SortMode::MappingBased {
            cache.store(mode, true, sorting);
        }
        result
    }

    fn simulate_borrowed<M: MappingLookup>(&self, mapping: &M, sorting: &TopologicalSorting) -> (Time, EvaluationLog) {
        simulate(self.system, mapping, sorting)
    }

    /// Runs the three pre-cost validations, then simulates up to
    /// `extra_random_runs` additional times with fresh random orderings,
    /// returning the minimum cost seen (and the log that produced it) — this
    /// reduces dependency on a single linearisation.
    pub fn evaluate_mapping_with_check(
        &self,
        mapping: &Mapping,
        extra_random_runs: usize,
        rng: &mut impl Rng,
    ) -> Result<(Time, EvaluationLog), EvaluatorError> {
        if !is_complete(self.system, mapping) {
            for t in self.system.graph().tasks() {
                if mapping.lookup(t).is_none() {
                    warn!(task = %self.system.graph().task(t).label, "mapping incomplete");
                    return Err(EvaluatorError::Invalid(ValidationFailure::IncompleteMapping {
                        task: self.system.graph().task(t).label.clone(),
                    }));
                }
            }
        }
        if let Err(reason) = check_compatible(self.system, mapping) {
            warn!(%reason, "mapping incompatible");
            return Err(EvaluatorError::Invalid(reason));
        }
        if let Err(reason) = check_capacity(self.system, mapping) {
            warn!(%reason, "mapping exceeds capacity");
            return Err(EvaluatorError::Invalid(reason));
        }

        let (mut best_cost, mut best_log) = self.evaluate(mapping, SortMode::TaskFirstBfs);
        debug!(cost = best_cost, "baseline TaskFirstBFS cost");

        for _ in 0..extra_random_runs {
            let needs_streaming = self
                .system
                .graph()
                .tasks()
                .any(|t| mapping.proc(t).map(|p| self.system.platform().processor(p).is_streaming_device()).unwrap_or(false));
            let mut sorting = topo_sort::random(self.system.graph(), true, rng);
            if needs_streaming {
                crate::topo_sort::compress_streaming(&mut sorting, self.system.graph(), self.system, mapping);
            }
            let (cost, log) = simulate(self.system, mapping, &sorting);
            if cost < best_cost {
                best_cost = cost;
                best_log = log;
            }
        }

        Ok((best_cost, best_log))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::DevicePair;
    use crate::platform_catalog::create_platform;
    use crate::system::ComputationBasedSystem;
    use crate::task_graph::{SizePropagation, TaskGraph};

    fn cpu_ram(system: &ComputationBasedSystem) -> DevicePair {
        let cpu = system.platform().find_processor_by_label("CPU").unwrap();
        let ram = system.platform().find_memory_by_label("Main_RAM").unwrap();
        DevicePair::same_memory(cpu, ram)
    }

    #[test]
    fn s1_trivial_single_task_cost() {
        let mut g = TaskGraph::new();
        let src = g.add_node("src", 1.0, 100.0, 1.0);
        let t = g.add_node("t", 1.0, 100.0, 1.0);
        g.set_size_func(src, SizePropagation::Constant(1.0));
        g.add_edge(src, t);

        let platform = create_platform(0);
        let system = ComputationBasedSystem::new(g, platform);
        let pair = cpu_ram(&system);

        let mut mapping = Mapping::new();
        mapping.set(src, pair);
        mapping.set(t, pair);

        let evaluator = MappingEvaluator::new(&system);
        let cost = evaluator.compute_cost(&mapping, SortMode::TaskFirstBfs);
        assert!((cost - 1000.0 / 11600.0).abs() < 1e-6);
    }

    #[test]
    fn s2_chain_same_processor_sums_no_transfer() {
        let mut g = TaskGraph::new();
        let a = g.add_node("a", 1.0, 100.0, 1.0);
        let b = g.add_node("b", 10.0, 100.0, 1.0);
        g.set_size_func(a, SizePropagation::Constant(1.0));
        g.add_edge(a, b);

        let platform = create_platform(0);
        let system = ComputationBasedSystem::new(g, platform);
        let pair = cpu_ram(&system);

        let mut mapping = Mapping::new();
        mapping.set(a, pair);
        mapping.set(b, pair);

        let evaluator = MappingEvaluator::new(&system);
        let cost = evaluator.compute_cost(&mapping, SortMode::TaskFirstBfs);

        let comp_a = system.computation_time_ms(a, pair.proc);
        let comp_b = system.computation_time_ms(b, pair.proc);
        assert!((cost - (comp_a + comp_b)).abs() < 1e-6);
    }

    #[test]
    fn s3_parallel_fanout_takes_max_not_sum() {
        let mut g = TaskGraph::new();
        let src = g.add_node("src", 1.0, 100.0, 1.0);
        let a = g.add_node("a", 5.0, 100.0, 1.0);
        let b = g.add_node("b", 5.0, 100.0, 1.0);
        let c = g.add_node("c", 5.0, 100.0, 1.0);
        let snk = g.add_node("snk", 1.0, 100.0, 1.0);
        g.set_size_func(src, SizePropagation::Constant(1.0));
        g.set_size_func(snk, SizePropagation::Sink);
        for mid in [a, b, c] {
            g.add_edge(src, mid);
            g.add_edge(mid, snk);
        }

        let platform = create_platform(1);
        let cpu = platform.find_processor_by_label("CPU").unwrap();
        let gpu = platform.find_processor_by_label("GPU").unwrap();
        let fpga = platform.find_processor_by_label("FPGA0").unwrap();
        let main_ram = platform.find_memory_by_label("Main_RAM").unwrap();
        let gpu_ram = platform.find_memory_by_label("GPU_RAM").unwrap();
        let fpga_ram = platform.find_memory_by_label("FPGA_RAM0").unwrap();

        let system = ComputationBasedSystem::new(g, platform);

        let mut mapping = Mapping::new();
        mapping.set(src, DevicePair::same_memory(cpu, main_ram));
        mapping.set(snk, DevicePair::same_memory(cpu, main_ram));
        mapping.set(a, DevicePair::same_memory(cpu, main_ram));
        mapping.set(b, DevicePair::same_memory(gpu, gpu_ram));
        mapping.set(c, DevicePair::same_memory(fpga, fpga_ram));

        let evaluator = MappingEvaluator::new(&system);
        let cost = evaluator.compute_cost(&mapping, SortMode::TaskFirstBfs);

        let comp_src = system.computation_time_ms(src, cpu);
        let comp_snk = system.computation_time_ms(snk, cpu);
        let stage_cpu = system.computation_time_ms(a, cpu);
        let stage_gpu = system.transaction_time_ms(1.0, main_ram, gpu_ram) + system.computation_time_ms(b, gpu);
        let stage_fpga = system.transaction_time_ms(1.0, main_ram, fpga_ram) + system.computation_time_ms(c, fpga);
        let expected = comp_src + stage_cpu.max(stage_gpu).max(stage_fpga) + comp_snk;
        assert!((cost - expected).abs() < 1e-6, "cost={cost} expected={expected}");
    }

    #[test]
    fn incomplete_mapping_fails_validation() {
        let mut g = TaskGraph::new();
        g.add_node("t", 1.0, 100.0, 1.0);
        let platform = create_platform(0);
        let system = ComputationBasedSystem::new(g, platform);
        let mapping = Mapping::new();

        let evaluator = MappingEvaluator::new(&system);
        let mut rng = {
            use rand::SeedableRng;
            rand_chacha::ChaCha8Rng::seed_from_u64(7)
        };
        let result = evaluator.evaluate_mapping_with_check(&mapping, 0, &mut rng);
        assert!(result.is_err());
    }
}

/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! HEFT: Heterogeneous Earliest Finish Time list scheduler. Upward-rank
//! priority, insertion-based free-slot search for the earliest-finish-time
//! objective.

use std::collections::HashMap;

use tracing::info_span;

use crate::mapping::{DevicePair, Mapping};
use crate::mapper::Mapper;
use crate::platform::DeviceId;
use crate::system::System;
use crate::task_graph::TaskId;
use crate::types::Time;

/// Per-processor ordered list of unclaimed `[start, end)` intervals.
pub(crate) struct FreeSlots {
    slots: HashMap<DeviceId, Vec<(Time, Time)>>,
}

impl FreeSlots {
    pub(crate) fn new() -> Self {
        FreeSlots { slots: HashMap::new() }
    }

    fn slots_for(&mut self, proc: DeviceId) -> &mut Vec<(Time, Time)> {
        self.slots.entry(proc).or_insert_with(|| vec![(0.0, f64::INFINITY)])
    }

    /// Earliest `(start, end)` of width `>= duration` beginning no earlier
    /// than `earliest_start`, without committing it.
    pub(crate) fn earliest_fit(&self, proc: DeviceId, earliest_start: Time, duration: Time) -> (Time, Time) {
        let empty = vec![(0.0, f64::INFINITY)];
        let slots = self.slots.get(&proc).unwrap_or(&empty);
        for &(fs, fe) in slots {
            let candidate_start = earliest_start.max(fs);
            if fe - candidate_start >= duration {
                return (candidate_start, candidate_start + duration);
            }
        }
        unreachable!("the trailing [*, inf) slot always fits")
    }

    /// Commits `[start, end)` on `proc`, splitting the containing slot into
    /// at most two remainders.
    pub(crate) fn commit(&mut self, proc: DeviceId, start: Time, end: Time) {
        let slots = self.slots_for(proc);
        let idx = slots
            .iter()
            .position(|&(fs, fe)| fs <= start && end <= fe)
            .expect("commit target must lie inside a known free slot");
        let (fs, fe) = slots.remove(idx);
        if start > fs {
            slots.insert(idx, (fs, start));
        }
        let right_idx = if start > fs { idx + 1 } else { idx };
        if end < fe {
            slots.insert(right_idx, (end, fe));
        }
    }
}

fn next_after(x: f64) -> f64 {
    if !x.is_finite() {
        x
    } else {
        f64::from_bits(x.to_bits() + 1)
    }
}

fn avg_comp<S: System>(system: &S, t: TaskId) -> Time {
    let procs: Vec<_> = system.platform().processors().filter(|&p| system.is_compatible(t, p)).collect();
    if procs.is_empty() {
        return 0.0;
    }
    let sum: Time = procs.iter().map(|&p| system.computation_time_ms(t, p)).sum();
    sum / procs.len() as f64
}

pub(crate) fn avg_xfer<S: System>(system: &S, from: TaskId, to: TaskId) -> Time {
    let from_procs: Vec<_> = system.platform().processors().filter(|&p| system.is_compatible(from, p)).collect();
    let to_procs: Vec<_> = system.platform().processors().filter(|&p| system.is_compatible(to, p)).collect();
    if from_procs.is_empty() || to_procs.is_empty() {
        return 0.0;
    }
    let size = system.graph().output_size(from);
    let mut sum = 0.0;
    let mut count = 0usize;
    for &p in &from_procs {
        let pm = system.platform().processor(p).default_memory;
        for &q in &to_procs {
            let qm = system.platform().processor(q).default_memory;
            sum += system.transaction_time_ms(size, pm, qm);
            count += 1;
        }
    }
    sum / count as f64
}

/// Computes the HEFT upward rank for every task, in reverse topological
/// (dependency-respecting) order.
pub(crate) fn upward_ranks<S: System>(system: &S) -> HashMap<TaskId, Time> {
    let mut rank: HashMap<TaskId, Time> = HashMap::new();
    let order = crate::topo_sort::task_first_bfs(system.graph(), false);
    for el in order.elements().iter().rev() {
        if let crate::topo_sort::GraphElement::Task(t) = el {
            let successors: Vec<TaskId> = system
                .graph()
                .task(*t)
                .out_edges()
                .iter()
                .map(|&e| system.graph().edge(e).snk)
                .collect();
            let mut best = 0.0;
            for s in successors {
                let candidate = rank[&s] + avg_xfer(system, *t, s);
                if candidate > best {
                    best = candidate;
                } else if (candidate - best).abs() < 1e-12 {
                    best = next_after(best);
                }
            }
            rank.insert(*t, avg_comp(system, *t) + best);
        }
    }
    rank
}

/// Assigns `mem_in = mem_out = proc.default_memory`; total busy duration on
/// `proc` (used both for the free-slot claim and the cross-task readiness
/// estimate) is computation plus both staging transfers.
pub(crate) fn total_duration<S: System>(system: &S, t: TaskId, proc: DeviceId) -> Time {
    let mem = system.platform().processor(proc).default_memory;
    system.computation_time_ms(t, proc)
        + system.transaction_time_ms(system.graph().input_size(t), mem, proc)
        + system.transaction_time_ms(system.graph().output_size(t), proc, mem)
}

pub struct HeftMapper;

impl<S: System> Mapper<S> for HeftMapper {
    fn label(&self) -> &str {
        "HEFT"
    }

    fn map(&self, system: &S) -> Mapping {
        let _span = info_span!("mapper", name = "HEFT").entered();

        let rank = upward_ranks(system);
        let mut tasks: Vec<TaskId> = system.graph().tasks().collect();
        tasks.sort_by(|&a, &b| rank[&b].partial_cmp(&rank[&a]).unwrap().then(a.0.cmp(&b.0)));

        let mut mapping = Mapping::new();
        let mut free_slots = FreeSlots::new();
        let mut finish_time: HashMap<TaskId, Time> = HashMap::new();
        let mut used_area: HashMap<DeviceId, f64> = HashMap::new();

        for t in tasks {
            let compatible: Vec<DeviceId> = system.platform().processors().filter(|&p| system.is_compatible(t, p)).collect();
            if compatible.is_empty() {
                continue;
            }

            let preds: Vec<TaskId> = system
                .graph()
                .task(t)
                .in_edges()
                .iter()
                .map(|&e| system.graph().edge(e).src)
                .collect();

            let mut best: Option<(DeviceId, Time, Time)> = None;
            for p in compatible {
                let cap = system.platform().processor(p).capacity;
                if cap.is_finite() {
                    let used = *used_area.get(&p).unwrap_or(&0.0);
                    if used + system.graph().task(t).area() > cap {
                        continue;
                    }
                }

                let mem = system.platform().processor(p).default_memory;
                let mut earliest_start = 0.0f64;
                for &pred in &preds {
                    let pred_proc = mapping.get(pred).map(|pair| pair.proc);
                    let xfer = pred_proc
                        .map(|pp| {
                            let pp_mem = system.platform().processor(pp).default_memory;
                            system.transaction_time_ms(system.graph().output_size(pred), pp_mem, mem)
                        })
                        .unwrap_or(0.0);
                    earliest_start = earliest_start.max(finish_time.get(&pred).copied().unwrap_or(0.0) + xfer);
                }

                let duration = total_duration(system, t, p);
                let (start, end) = free_slots.earliest_fit(p, earliest_start, duration);
                if best.map(|(_, _, be)| end < be).unwrap_or(true) {
                    best = Some((p, start, end));
                }
            }

            let Some((p, start, end)) = best else { continue };
            free_slots.commit(p, start, end);
            finish_time.insert(t, end);
            let cap = system.platform().processor(p).capacity;
            if cap.is_finite() {
                *used_area.entry(p).or_insert(0.0) += system.graph().task(t).area();
            }
            let mem = system.platform().processor(p).default_memory;
            mapping.set(t, DevicePair::same_memory(p, mem));
        }

        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::MappingEvaluator;
    use crate::mapper::greedy::greedy_mapping;
    use crate::platform_catalog::create_platform;
    use crate::system::ComputationBasedSystem;
    use crate::task_graph::{SizePropagation, TaskGraph};
    use crate::topo_sort::SortMode;

    fn random_graph(n: usize, seed: u64) -> TaskGraph {
        use rand::Rng;
        use rand::SeedableRng;
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
        let mut g = TaskGraph::new();
        let mut ids = Vec::new();
        for i in 0..n {
            let complexity = rng.gen_range(1.0..5.0);
            let t = g.add_node(format!("t{i}"), complexity, 100.0, 1.0);
            if i == 0 {
                g.set_size_func(t, SizePropagation::Constant(1.0));
            } else {
                let parent = ids[rng.gen_range(0..ids.len())];
                g.add_edge(parent, t);
            }
            ids.push(t);
        }
        g
    }

    #[test]
    fn free_slots_split_around_committed_interval() {
        let mut fs = FreeSlots::new();
        let p = DeviceId::Processor(0);
        fs.commit(p, 5.0, 10.0);
        let slots = fs.slots.get(&p).unwrap().clone();
        assert_eq!(slots, vec![(0.0, 5.0), (10.0, f64::INFINITY)]);
    }

    #[test]
    fn s5_heft_cost_does_not_exceed_greedy_on_random_graph() {
        let g = random_graph(30, 123);
        let system = ComputationBasedSystem::new(g, create_platform(1));

        let greedy = greedy_mapping(&system);
        let heft = HeftMapper.map(&system);
        assert!(heft.is_complete(system.graph()));

        let evaluator = MappingEvaluator::new(&system);
        let greedy_cost = evaluator.compute_cost(&greedy, SortMode::TaskFirstBfs);
        let heft_cost = evaluator.compute_cost(&heft, SortMode::TaskFirstBfs);
        assert!(heft_cost <= greedy_cost + 1e-6, "heft={heft_cost} greedy={greedy_cost}");
    }
}

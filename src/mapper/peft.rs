/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! PEFT: Predict Earliest Finish Time list scheduler. Optimistic Cost Table
//! priority plus a ready queue driven by in-degree counters, picking the
//! processor that minimizes the Optimistic EFT (`EFT + OCT`) objective.

use std::collections::{HashMap, VecDeque};

use tracing::info_span;

use crate::mapping::{DevicePair, Mapping};
use crate::mapper::heft::{total_duration, FreeSlots};
use crate::mapper::Mapper;
use crate::platform::DeviceId;
use crate::system::System;
use crate::task_graph::TaskId;
use crate::types::Time;

fn avg_xfer<S: System>(system: &S, from: TaskId, from_proc: DeviceId, to: TaskId, to_proc: DeviceId) -> Time {
    if from_proc == to_proc {
        return 0.0;
    }
    let from_mem = system.platform().processor(from_proc).default_memory;
    let to_mem = system.platform().processor(to_proc).default_memory;
    system.transaction_time_ms(system.graph().output_size(from), from_mem, to_mem)
}

/// `OCT(t, p)`: the optimistic (best-case) remaining completion cost of `t`
/// assuming it runs on `p`, computed in reverse topological order. `0` for
/// exit (sink) tasks.
fn optimistic_cost_table<S: System>(
    system: &S,
    processors: &[DeviceId],
) -> HashMap<TaskId, HashMap<DeviceId, Time>> {
    let mut oct: HashMap<TaskId, HashMap<DeviceId, Time>> = HashMap::new();
    let order = crate::topo_sort::task_first_bfs(system.graph(), false);
    for el in order.elements().iter().rev() {
        let crate::topo_sort::GraphElement::Task(t) = el else { continue };
        let t = *t;
        let successors: Vec<TaskId> = system
            .graph()
            .task(t)
            .out_edges()
            .iter()
            .map(|&e| system.graph().edge(e).snk)
            .collect();

        let mut row = HashMap::new();
        for &p in processors {
            if !system.is_compatible(t, p) {
                continue;
            }
            let mut worst_over_successors = 0.0f64;
            for &s in &successors {
                let mut best_over_procs = f64::INFINITY;
                for &q in processors {
                    if !system.is_compatible(s, q) {
                        continue;
                    }
                    let oct_s_q = oct.get(&s).and_then(|row| row.get(&q)).copied().unwrap_or(0.0);
                    let candidate = oct_s_q + total_duration(system, s, q) + avg_xfer(system, t, p, s, q);
                    best_over_procs = best_over_procs.min(candidate);
                }
                if best_over_procs.is_finite() {
                    worst_over_successors = worst_over_successors.max(best_over_procs);
                }
            }
            row.insert(p, worst_over_successors);
        }
        oct.insert(t, row);
    }
    oct
}

fn rank_oct(oct_row: &HashMap<DeviceId, Time>) -> Time {
    if oct_row.is_empty() {
        0.0
    } else {
        oct_row.values().sum::<f64>() / oct_row.len() as f64
    }
}

pub struct PeftMapper;

impl<S: System> Mapper<S> for PeftMapper {
    fn label(&self) -> &str {
        "PEFT"
    }

    fn map(&self, system: &S) -> Mapping {
        let _span = info_span!("mapper", name = "PEFT").entered();

        let processors: Vec<DeviceId> = system.platform().processors().collect();
        let oct = optimistic_cost_table(system, &processors);
        let rank: HashMap<TaskId, Time> = oct.iter().map(|(&t, row)| (t, rank_oct(row))).collect();

        let mut indegree: HashMap<TaskId, usize> = HashMap::new();
        let mut ready: VecDeque<TaskId> = VecDeque::new();
        for t in system.graph().tasks() {
            let d = system.graph().task(t).in_edges().len();
            indegree.insert(t, d);
            if d == 0 {
                ready.push_back(t);
            }
        }

        let mut mapping = Mapping::new();
        let mut free_slots = FreeSlots::new();
        let mut finish_time: HashMap<TaskId, Time> = HashMap::new();
        let mut used_area: HashMap<DeviceId, f64> = HashMap::new();

        while !ready.is_empty() {
            let mut ready_vec: Vec<TaskId> = ready.drain(..).collect();
            ready_vec.sort_by(|&a, &b| {
                rank[&a]
                    .partial_cmp(&rank[&b])
                    .unwrap()
                    .reverse()
                    .then(a.0.cmp(&b.0))
            });

            let t = ready_vec.remove(0);
            for remaining in ready_vec {
                ready.push_back(remaining);
            }

            let preds: Vec<TaskId> = system
                .graph()
                .task(t)
                .in_edges()
                .iter()
                .map(|&e| system.graph().edge(e).src)
                .collect();

            let compatible: Vec<DeviceId> = processors.iter().copied().filter(|&p| system.is_compatible(t, p)).collect();
            let mut best: Option<(DeviceId, Time, Time)> = None;
            for p in compatible {
                let cap = system.platform().processor(p).capacity;
                if cap.is_finite() && *used_area.get(&p).unwrap_or(&0.0) + system.graph().task(t).area() > cap {
                    continue;
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
                let oeft = end + oct.get(&t).and_then(|row| row.get(&p)).copied().unwrap_or(0.0);
                let current_best_oeft = best.map(|(bp, _, be)| be + oct.get(&t).and_then(|row| row.get(&bp)).copied().unwrap_or(0.0));
                if current_best_oeft.map(|b| oeft < b).unwrap_or(true) {
                    best = Some((p, start, end));
                }
            }

            let Some((p, start, end)) = best else {
                for &e in system.graph().task(t).out_edges() {
                    let snk = system.graph().edge(e).snk;
                    if let Some(d) = indegree.get_mut(&snk) {
                        *d -= 1;
                        if *d == 0 {
                            ready.push_back(snk);
                        }
                    }
                }
                continue;
            };
            free_slots.commit(p, start, end);
            finish_time.insert(t, end);
            let cap = system.platform().processor(p).capacity;
            if cap.is_finite() {
                *used_area.entry(p).or_insert(0.0) += system.graph().task(t).area();
            }
            let mem = system.platform().processor(p).default_memory;
            mapping.set(t, DevicePair::same_memory(p, mem));

            for &e in system.graph().task(t).out_edges() {
                let snk = system.graph().edge(e).snk;
                if let Some(d) = indegree.get_mut(&snk) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push_back(snk);
                    }
                }
            }
        }

        mapping
    }
}

/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Path-based mapper: builds a weight-annotated DAG of the still-unassigned
//! tasks per hardcoded device pair, repeatedly extracts the current
//! max-weight path and packs it onto whichever pair keeps the running
//! per-processor finish estimate lowest.

use std::collections::{HashMap, HashSet};

use tracing::info_span;

use crate::mapping::{DevicePair, Mapping};
use crate::mapper::Mapper;
use crate::platform::DeviceId;
use crate::system::System;
use crate::task_graph::TaskId;
use crate::types::Time;

const HARDCODED_PAIRS: [(&str, &str); 3] = [("CPU", "Main_RAM"), ("GPU", "GPU_RAM"), ("FPGA", "FPGA_RAM")];

fn resolve_pairs<S: System>(system: &S) -> Vec<(DeviceId, DeviceId)> {
    HARDCODED_PAIRS
        .iter()
        .filter_map(|&(proc_label, mem_label)| {
            let proc = system.platform().find_processor_by_label(proc_label)?;
            let mem = system.platform().find_memory_by_label(mem_label)?;
            Some((proc, mem))
        })
        .collect()
}

/// Per-task weight within the DAG restricted to `remaining`, for a single
/// candidate processor: own duration plus the best (max-weight) unassigned
/// successor's weight. Returns the weight map and, for each task, which
/// successor achieved the max (the next hop in a packed chain).
fn weight_dag<S: System>(system: &S, proc: DeviceId, remaining: &HashSet<TaskId>) -> (HashMap<TaskId, Time>, HashMap<TaskId, TaskId>) {
    let mut weight = HashMap::new();
    let mut next_hop = HashMap::new();
    let order = crate::topo_sort::task_first_bfs(system.graph(), false);
    for el in order.elements().iter().rev() {
        let crate::topo_sort::GraphElement::Task(t) = el else { continue };
        let t = *t;
        if !remaining.contains(&t) || !system.is_compatible(t, proc) {
            continue;
        }
        let own = system.computation_time_ms(t, proc);
        let mut best_successor = None;
        let mut best_weight = 0.0;
        for &e in system.graph().task(t).out_edges() {
            let s = system.graph().edge(e).snk;
            if let Some(&w) = weight.get(&s) {
                if w > best_weight {
                    best_weight = w;
                    best_successor = Some(s);
                }
            }
        }
        weight.insert(t, own + best_weight);
        if let Some(s) = best_successor {
            next_hop.insert(t, s);
        }
    }
    (weight, next_hop)
}

fn extract_chain(start: TaskId, next_hop: &HashMap<TaskId, TaskId>) -> Vec<TaskId> {
    let mut chain = vec![start];
    let mut cur = start;
    while let Some(&next) = next_hop.get(&cur) {
        chain.push(next);
        cur = next;
    }
    chain
}

pub struct PathBasedMapper;

impl<S: System> Mapper<S> for PathBasedMapper {
    fn label(&self) -> &str {
        "PathBased"
    }

    fn map(&self, system: &S) -> Mapping {
        let _span = info_span!("mapper", name = "PathBased").entered();

        let pairs = resolve_pairs(system);
        let mut mapping = Mapping::new();
        let mut accumulated: HashMap<DeviceId, Time> = HashMap::new();
        let mut used_area: HashMap<DeviceId, f64> = HashMap::new();

        let mut boundary: Vec<TaskId> = Vec::new();
        let mut interior: HashSet<TaskId> = HashSet::new();
        for t in system.graph().tasks() {
            if system.graph().task(t).is_source() || system.graph().task(t).is_sink() {
                boundary.push(t);
            } else {
                interior.insert(t);
            }
        }

        // Boundary tasks bypass the path machinery: greedily pick whichever
        // resolvable pair minimizes single_node_cost + accumulated_time[proc].
        for t in boundary {
            let mut best: Option<(DeviceId, DeviceId, Time)> = None;
            for &(proc, mem) in &pairs {
                if !system.is_compatible(t, proc) {
                    continue;
                }
                let cost = system.computation_time_ms(t, proc) + accumulated.get(&proc).copied().unwrap_or(0.0);
                if best.map(|(_, _, bc)| cost < bc).unwrap_or(true) {
                    best = Some((proc, mem, cost));
                }
            }
            if let Some((proc, mem, _)) = best {
                let duration = system.computation_time_ms(t, proc);
                *accumulated.entry(proc).or_insert(0.0) += duration;
                mapping.set(t, DevicePair::same_memory(proc, mem));
            }
        }

        while !interior.is_empty() {
            let mut candidate: Option<(DeviceId, DeviceId, Vec<TaskId>, Time, Time)> = None; // (proc, mem, chain, added, resulting)

            for &(proc, mem) in &pairs {
                let (weight, next_hop) = weight_dag(system, proc, &interior);
                let Some((&start, _)) = weight.iter().max_by(|a, b| a.1.partial_cmp(b.1).unwrap()) else { continue };
                let mut chain = extract_chain(start, &next_hop);

                let cap = system.platform().processor(proc).capacity;
                if cap.is_finite() {
                    let used = *used_area.get(&proc).unwrap_or(&0.0);
                    let mut budget = cap - used;
                    let mut kept = Vec::new();
                    for t in chain {
                        let area = system.graph().task(t).area();
                        if area <= budget {
                            budget -= area;
                            kept.push(t);
                        } else {
                            break;
                        }
                    }
                    chain = kept;
                }
                if chain.is_empty() {
                    continue;
                }

                let added: Time = chain.iter().map(|&t| system.computation_time_ms(t, proc)).sum();
                let resulting = accumulated.get(&proc).copied().unwrap_or(0.0) + added;
                if candidate.as_ref().map(|(_, _, _, _, br)| resulting < *br).unwrap_or(true) {
                    candidate = Some((proc, mem, chain, added, resulting));
                }
            }

            let Some((proc, mem, chain, added, _)) = candidate else {
                // No resolvable pair can take any remaining task; leave them unmapped.
                break;
            };

            for &t in &chain {
                interior.remove(&t);
                mapping.set(t, DevicePair::same_memory(proc, mem));
            }
            *accumulated.entry(proc).or_insert(0.0) += added;
            let cap = system.platform().processor(proc).capacity;
            if cap.is_finite() {
                let area: f64 = chain.iter().map(|&t| system.graph().task(t).area()).sum();
                *used_area.entry(proc).or_insert(0.0) += area;
            }
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
    use crate::task_graph::TaskGraph;
    use crate::topo_sort::SortMode;

    fn chain_system() -> ComputationBasedSystem {
        let mut g = TaskGraph::new();
        let a = g.add_node("a", 1.0, 100.0, 1.0);
        let b = g.add_node("b", 4.0, 100.0, 1.0);
        let c = g.add_node("c", 4.0, 100.0, 1.0);
        let d = g.add_node("d", 1.0, 100.0, 1.0);
        g.add_edge(a, b);
        g.add_edge(b, c);
        g.add_edge(c, d);
        ComputationBasedSystem::new(g, create_platform(1))
    }

    #[test]
    fn path_based_produces_complete_mapping() {
        let system = chain_system();
        let mapping = PathBasedMapper.map(&system);
        assert!(mapping.is_complete(system.graph()));
    }

    #[test]
    fn s5_path_based_cost_does_not_exceed_greedy() {
        let system = chain_system();
        let greedy = greedy_mapping(&system);
        let mapping = PathBasedMapper.map(&system);

        let evaluator = MappingEvaluator::new(&system);
        let greedy_cost = evaluator.compute_cost(&greedy, SortMode::TaskFirstBfs);
        let path_cost = evaluator.compute_cost(&mapping, SortMode::TaskFirstBfs);
        assert!(path_cost <= greedy_cost + 1e-6, "path={path_cost} greedy={greedy_cost}");
    }
}

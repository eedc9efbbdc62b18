/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Decomposition mapper framework: an initial [`policies::BaseMappingPolicy`]
//! plus an iterative [`policies::EvaluationPolicy`] that repeatedly relocates
//! whole subgraphs — task singletons ([`single_node`]) or SP-tree node task
//! sets ([`series_parallel`]) — onto whichever device pair lowers cost,
//! subject to a monotonic per-processor capacity ledger.

pub mod policies;
pub mod series_parallel;
pub mod single_node;

use std::collections::{HashMap, HashSet};

use crate::evaluator::MappingEvaluator;
use crate::mapping::{DevicePair, Mapping, MappingView};
use crate::platform::DeviceId;
use crate::system::System;
use crate::task_graph::TaskId;
use crate::topo_sort::SortMode;
use crate::types::Time;

pub use policies::{BaseMappingPolicy, EvaluationPolicy, EvaluateAllPolicy, EvaluateThresholdPolicy, GreedyBase, SpdBase};
pub use series_parallel::SeriesParallelDecompositionMapper;
pub use single_node::SingleNodeDecompositionMapper;

/// Per-processor cumulative committed area. Capacity is debited on apply
/// and never credited back, per the "consumed area is never returned"
/// invariant.
#[derive(Default)]
pub struct CapacityLedger {
    used: HashMap<DeviceId, f64>,
}

impl CapacityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn used(&self, proc: DeviceId) -> f64 {
        *self.used.get(&proc).unwrap_or(&0.0)
    }

    fn debit(&mut self, proc: DeviceId, area: f64) {
        *self.used.entry(proc).or_insert(0.0) += area;
    }
}

/// Builds the overlay that would result from relocating `subgraph` onto
/// `proc`'s default memory, skipping tasks incompatible with `proc` and
/// tasks already resident there. Returns `None` if the move would exceed
/// `proc`'s remaining capacity.
fn propose_move<'a, S: System>(
    system: &'a S,
    mapping: &'a Mapping,
    subgraph: &HashSet<TaskId>,
    proc: DeviceId,
    ledger: &CapacityLedger,
) -> Option<MappingView<'a>> {
    let cap = system.platform().processor(proc).capacity;
    let mem = system.platform().processor(proc).default_memory;

    let mut incoming_area = 0.0;
    let mut view = MappingView::new(mapping);
    for &t in subgraph {
        if !system.is_compatible(t, proc) {
            continue;
        }
        let already_here = mapping.get(t).map(|p| p.proc) == Some(proc);
        if !already_here {
            incoming_area += system.graph().task(t).area();
        }
        view.set(t, DevicePair::same_memory(proc, mem));
    }

    if cap.is_finite() && ledger.used(proc) + incoming_area > cap {
        return None;
    }
    Some(view)
}

fn commit_move<S: System>(system: &S, mapping: &mut Mapping, subgraph: &HashSet<TaskId>, proc: DeviceId, ledger: &mut CapacityLedger) {
    let cap = system.platform().processor(proc).capacity;
    let mem = system.platform().processor(proc).default_memory;
    let mut incoming_area = 0.0;
    for &t in subgraph {
        if !system.is_compatible(t, proc) {
            continue;
        }
        if mapping.get(t).map(|p| p.proc) != Some(proc) {
            incoming_area += system.graph().task(t).area();
        }
        mapping.set(t, DevicePair::same_memory(proc, mem));
    }
    if cap.is_finite() {
        ledger.debit(proc, incoming_area);
    }
}

/// Scores relocating `subgraph` onto `proc` against `mapping`'s current
/// cost. Returns `None` when the move is infeasible (incompatible, over
/// capacity) or non-improving.
fn score_move<S: System>(
    system: &S,
    evaluator: &MappingEvaluator<S>,
    mapping: &Mapping,
    current_cost: Time,
    subgraph: &HashSet<TaskId>,
    proc: DeviceId,
    ledger: &CapacityLedger,
) -> Option<Time> {
    let view = propose_move(system, mapping, subgraph, proc, ledger)?;
    let new_cost = evaluator.compute_cost(&view, SortMode::TaskFirstBfs);
    let gain = current_cost - new_cost;
    if gain > 0.0 {
        Some(gain)
    } else {
        None
    }
}

fn build<S: System, B: BaseMappingPolicy<S>>(system: &S, base: &B) -> Mapping {
    base.initial(system)
}

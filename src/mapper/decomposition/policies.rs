/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! [`BaseMappingPolicy`] (how to seed the initial mapping) and
//! [`EvaluationPolicy`] (how to iteratively improve it) for the
//! decomposition mapper framework.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use ordered_float::NotNan;

use crate::evaluator::MappingEvaluator;
use crate::mapper::greedy::greedy_mapping;
use crate::mapping::Mapping;
use crate::platform::DeviceId;
use crate::system::System;
use crate::task_graph::TaskId;
use crate::topo_sort::SortMode;
use crate::types::Time;

use super::{build, commit_move, score_move, CapacityLedger};

pub trait BaseMappingPolicy<S: System> {
    fn initial(&self, system: &S) -> Mapping;
}

/// Everything-on-first-compatible-processor baseline.
pub struct GreedyBase;

impl<S: System> BaseMappingPolicy<S> for GreedyBase {
    fn initial(&self, system: &S) -> Mapping {
        greedy_mapping(system)
    }
}

/// Runs an inner `SeriesParallelDecompositionMapper` (itself seeded from
/// [`GreedyBase`], so no recursion) to produce the starting mapping.
pub struct SpdBase;

impl<S: System> BaseMappingPolicy<S> for SpdBase {
    fn initial(&self, system: &S) -> Mapping {
        let inner = super::SeriesParallelDecompositionMapper::new(GreedyBase, EvaluateAllPolicy, false);
        crate::mapper::Mapper::map(&inner, system)
    }
}

pub trait EvaluationPolicy {
    fn optimize<S: System>(&self, system: &S, evaluator: &MappingEvaluator<S>, mapping: &mut Mapping, subgraphs: &[HashSet<TaskId>]);
}

/// Every pass enumerates all (subgraph, processor) combinations and applies
/// the single best improving move, looping until no improvement remains.
pub struct EvaluateAllPolicy;

impl EvaluationPolicy for EvaluateAllPolicy {
    fn optimize<S: System>(&self, system: &S, evaluator: &MappingEvaluator<S>, mapping: &mut Mapping, subgraphs: &[HashSet<TaskId>]) {
        let mut ledger = CapacityLedger::new();
        loop {
            let current_cost = evaluator.compute_cost(mapping, SortMode::TaskFirstBfs);
            let mut best: Option<(usize, DeviceId, Time)> = None;
            for (idx, subgraph) in subgraphs.iter().enumerate() {
                for proc in system.platform().processors() {
                    if let Some(gain) = score_move(system, evaluator, mapping, current_cost, subgraph, proc, &ledger) {
                        if best.map(|(_, _, bg)| gain > bg).unwrap_or(true) {
                            best = Some((idx, proc, gain));
                        }
                    }
                }
            }
            match best {
                Some((idx, proc, _)) => commit_move(system, mapping, &subgraphs[idx], proc, &mut ledger),
                None => break,
            }
        }
    }
}

struct Candidate {
    gain: NotNan<f64>,
    subgraph: usize,
    proc: DeviceId,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.gain == other.gain
    }
}
impl Eq for Candidate {}
impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.gain.cmp(&other.gain)
    }
}

/// Scores every combination once into a max-heap keyed by gain, then pops
/// candidates, re-scoring each against the (possibly changed) current
/// mapping, tracking the best re-scored move. Stops scanning once the best
/// re-scored gain found so far falls under `tau/10` of the next queued
/// candidate's _original_ gain — the remaining queue cannot plausibly beat
/// it. Repeats the whole pass after applying a move, since every other
/// candidate's gain is now stale.
pub struct EvaluateThresholdPolicy {
    pub tau: f64,
}

impl EvaluateThresholdPolicy {
    pub fn new(tau: f64) -> Self {
        EvaluateThresholdPolicy { tau }
    }
}

impl EvaluationPolicy for EvaluateThresholdPolicy {
    fn optimize<S: System>(&self, system: &S, evaluator: &MappingEvaluator<S>, mapping: &mut Mapping, subgraphs: &[HashSet<TaskId>]) {
        let mut ledger = CapacityLedger::new();
        loop {
            let current_cost = evaluator.compute_cost(mapping, SortMode::TaskFirstBfs);
            let mut heap: BinaryHeap<Candidate> = BinaryHeap::new();
            for (idx, subgraph) in subgraphs.iter().enumerate() {
                for proc in system.platform().processors() {
                    if let Some(gain) = score_move(system, evaluator, mapping, current_cost, subgraph, proc, &ledger) {
                        heap.push(Candidate {
                            gain: NotNan::new(gain).unwrap(),
                            subgraph: idx,
                            proc,
                        });
                    }
                }
            }

            let mut best: Option<(usize, DeviceId, Time)> = None;
            while let Some(top) = heap.pop() {
                let rescored = score_move(system, evaluator, mapping, current_cost, &subgraphs[top.subgraph], top.proc, &ledger);
                if let Some(gain) = rescored {
                    if best.map(|(_, _, bg)| gain > bg).unwrap_or(true) {
                        best = Some((top.subgraph, top.proc, gain));
                    }
                }
                let best_gain = best.map(|(_, _, g)| g).unwrap_or(0.0);
                if let Some(next) = heap.peek() {
                    if best_gain < self.tau / 10.0 * next.gain.into_inner() {
                        break;
                    }
                } else {
                    break;
                }
            }

            match best {
                Some((idx, proc, _)) => commit_move(system, mapping, &subgraphs[idx], proc, &mut ledger),
                None => break,
            }
        }
    }
}

/// Shared driver: builds the initial mapping via `base`, then hands it to
/// `eval` for iterative improvement over `subgraphs`.
pub(crate) fn run<S: System, B: BaseMappingPolicy<S>, E: EvaluationPolicy>(system: &S, base: &B, eval: &E, subgraphs: &[HashSet<TaskId>]) -> Mapping {
    let mut mapping = build(system, base);
    let evaluator = MappingEvaluator::new(system);
    eval.optimize(system, &evaluator, &mut mapping, subgraphs);
    mapping
}

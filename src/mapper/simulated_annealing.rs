/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Simulated annealing: starts from the greedy CPU baseline and repeats a
//! geometric-cooling local search of single-task random reassignments,
//! keeping the best mapping found across `annealing_runs` independent
//! restarts.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info_span};

use crate::evaluator::MappingEvaluator;
use crate::mapper::greedy::greedy_mapping;
use crate::mapper::Mapper;
use crate::mapping::{DevicePair, Mapping};
use crate::platform::DeviceId;
use crate::system::System;
use crate::task_graph::TaskId;
use crate::topo_sort::SortMode;
use crate::types::{Seed, Time};

const DEFAULT_ANNEALING_RUNS: usize = 10;
const DEFAULT_ITERATIONS_PER_TEMPERATURE: usize = 50;
const COOLING_FACTOR: f64 = 0.95;
const SAFETY_FACTOR: f64 = 2.0;

pub struct SimulatedAnnealingMapper {
    pub seed: Seed,
    pub annealing_runs: usize,
    pub iterations_per_temperature: usize,
}

impl SimulatedAnnealingMapper {
    pub fn new(seed: Seed) -> Self {
        SimulatedAnnealingMapper {
            seed,
            annealing_runs: DEFAULT_ANNEALING_RUNS,
            iterations_per_temperature: DEFAULT_ITERATIONS_PER_TEMPERATURE,
        }
    }
}

/// `(min_cost/max_cost) * (Σmin/Σmax) / k²`, derived from the per-task
/// extremes of compatible computation time across the platform.
fn normalized_final_temperature<S: System>(system: &S) -> Time {
    let mut min_cost = f64::INFINITY;
    let mut max_cost: f64 = 0.0;
    let mut sigma_min = 0.0;
    let mut sigma_max = 0.0;

    for t in system.graph().tasks() {
        let mut task_min = f64::INFINITY;
        let mut task_max: f64 = 0.0;
        for p in system.platform().processors() {
            if !system.is_compatible(t, p) {
                continue;
            }
            let c = system.computation_time_ms(t, p);
            task_min = task_min.min(c);
            task_max = task_max.max(c);
        }
        if task_min.is_finite() {
            min_cost = min_cost.min(task_min);
            max_cost = max_cost.max(task_max);
            sigma_min += task_min;
            sigma_max += task_max;
        }
    }

    if !min_cost.is_finite() || max_cost == 0.0 || sigma_max == 0.0 {
        return 0.0;
    }
    (min_cost / max_cost) * (sigma_min / sigma_max) / (SAFETY_FACTOR * SAFETY_FACTOR)
}

fn loads<S: System>(system: &S, mapping: &Mapping) -> HashMap<DeviceId, f64> {
    let mut loads = HashMap::new();
    for (t, pair) in mapping.iter() {
        if system.platform().processor(pair.proc).capacity.is_finite() {
            *loads.entry(pair.proc).or_insert(0.0) += system.graph().task(t).area();
        }
    }
    loads
}

impl<S: System> Mapper<S> for SimulatedAnnealingMapper {
    fn label(&self) -> &str {
        "SimulatedAnnealing"
    }

    fn map(&self, system: &S) -> Mapping {
        let _span = info_span!("mapper", name = "SimulatedAnnealing").entered();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let baseline = greedy_mapping(system);
        let evaluator = MappingEvaluator::new(system);
        let initial_cost = evaluator.compute_cost(&baseline, SortMode::TaskFirstBfs);
        if initial_cost == 0.0 {
            return baseline;
        }

        let t_final = normalized_final_temperature(system);
        let assigned_tasks: Vec<TaskId> = baseline.tasks().collect();

        let mut best = baseline.clone();
        let mut best_cost = initial_cost;

        for run in 0..self.annealing_runs {
            let mut current = best.clone();
            let mut current_cost = evaluator.compute_cost(&current, SortMode::TaskFirstBfs);
            let mut load = loads(system, &current);
            let mut temperature = 1.0f64;

            while temperature >= t_final.max(1e-9) {
                for _ in 0..self.iterations_per_temperature {
                    if assigned_tasks.is_empty() {
                        break;
                    }
                    let t = assigned_tasks[rng.gen_range(0..assigned_tasks.len())];
                    let compatible: Vec<DeviceId> = system.platform().processors().filter(|&p| system.is_compatible(t, p)).collect();
                    if compatible.len() < 2 {
                        continue;
                    }
                    let new_proc = compatible[rng.gen_range(0..compatible.len())];
                    let previous = current.get(t).expect("baseline assigns every reachable task");
                    if new_proc == previous.proc {
                        continue;
                    }

                    let cap = system.platform().processor(new_proc).capacity;
                    if cap.is_finite() {
                        let used = *load.get(&new_proc).unwrap_or(&0.0);
                        if used + system.graph().task(t).area() > cap {
                            continue;
                        }
                    }

                    let mem = system.platform().processor(new_proc).default_memory;
                    current.set(t, DevicePair::same_memory(new_proc, mem));
                    let candidate_cost = evaluator.compute_cost(&current, SortMode::TaskFirstBfs);
                    let delta = candidate_cost - current_cost;

                    let accept = delta <= 0.0 || rng.gen::<f64>() < (-2.0 * delta / (temperature * initial_cost)).exp();
                    if accept {
                        if system.platform().processor(previous.proc).capacity.is_finite() {
                            *load.entry(previous.proc).or_insert(0.0) -= system.graph().task(t).area();
                        }
                        if cap.is_finite() {
                            *load.entry(new_proc).or_insert(0.0) += system.graph().task(t).area();
                        }
                        current_cost = candidate_cost;
                    } else {
                        current.set(t, previous);
                    }
                }
                temperature *= COOLING_FACTOR;
            }

            debug!(run, cost = current_cost, "annealing run finished");
            if current_cost < best_cost {
                best = current;
                best_cost = current_cost;
            }
        }

        best
    }
}

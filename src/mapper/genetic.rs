/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Genetic mapper: a fixed-size population evolved by binary-tournament
//! selection, BFS-ordered single-point crossover, and per-task mutation,
//! with a pluggable cost policy so the inner loop can use either the real
//! simulator or a cheap per-processor-load proxy.

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
use crate::topo_sort::{bfs, GraphElement};
use crate::types::{Seed, Time};

const DEFAULT_POPULATION_SIZE: usize = 100;
const DEFAULT_GENERATIONS: usize = 500;

pub trait CostPolicy {
    fn cost<S: System>(&self, system: &S, evaluator: &MappingEvaluator<S>, mapping: &Mapping) -> Time;
}

/// Runs the real discrete-event simulation.
pub struct FullEvaluation;

impl CostPolicy for FullEvaluation {
    fn cost<S: System>(&self, _system: &S, evaluator: &MappingEvaluator<S>, mapping: &Mapping) -> Time {
        evaluator.compute_cost(mapping, crate::topo_sort::SortMode::TaskFirstBfs)
    }
}

/// Cheaper lower-bound proxy: the maximum, over processors, of the summed
/// computation time of tasks assigned to it (ignores transfer cost and
/// scheduling slack, so it systematically underestimates true makespan —
/// fine as a relative ranking signal during the generational loop).
pub struct SummedEvaluation;

impl CostPolicy for SummedEvaluation {
    fn cost<S: System>(&self, system: &S, _evaluator: &MappingEvaluator<S>, mapping: &Mapping) -> Time {
        let mut per_proc: std::collections::HashMap<DeviceId, Time> = std::collections::HashMap::new();
        for (t, pair) in mapping.iter() {
            *per_proc.entry(pair.proc).or_insert(0.0) += system.computation_time_ms(t, pair.proc);
        }
        per_proc.values().cloned().fold(0.0, f64::max)
    }
}

fn bfs_task_order(graph: &crate::task_graph::TaskGraph) -> Vec<TaskId> {
    bfs(graph, false)
        .elements()
        .iter()
        .filter_map(|e| match e {
            GraphElement::Task(t) => Some(*t),
            _ => None,
        })
        .collect()
}

fn random_mapping<S: System>(system: &S, rng: &mut impl Rng) -> Mapping {
    let procs: Vec<DeviceId> = system.platform().processors().collect();
    let mut mapping = Mapping::new();
    for t in system.graph().tasks() {
        if procs.is_empty() {
            continue;
        }
        let p = procs[rng.gen_range(0..procs.len())];
        let mem = system.platform().processor(p).default_memory;
        mapping.set(t, DevicePair::same_memory(p, mem));
    }
    mapping
}

/// Moves incompatible-processor tasks to CPU, then evicts random tasks off
/// over-capacity processors (to CPU) until every capacity bound holds.
fn repair<S: System>(system: &S, mapping: &mut Mapping, rng: &mut impl Rng) {
    let Some(cpu) = system.platform().find_processor_by_label("CPU") else { return };
    let cpu_mem = system.platform().processor(cpu).default_memory;

    for t in system.graph().tasks() {
        if let Some(pair) = mapping.get(t) {
            if !system.is_compatible(t, pair.proc) {
                mapping.set(t, DevicePair::same_memory(cpu, cpu_mem));
            }
        }
    }

    loop {
        let mut loads: std::collections::HashMap<DeviceId, Vec<TaskId>> = std::collections::HashMap::new();
        for (t, pair) in mapping.iter() {
            loads.entry(pair.proc).or_default().push(t);
        }
        let overloaded = loads.iter().find(|(&p, members)| {
            let cap = system.platform().processor(p).capacity;
            cap.is_finite() && members.iter().map(|&t| system.graph().task(t).area()).sum::<f64>() > cap
        });
        let Some((_, members)) = overloaded else { break };
        let victim = members[rng.gen_range(0..members.len())];
        mapping.set(victim, DevicePair::same_memory(cpu, cpu_mem));
    }
}

fn tournament<'a>(population: &'a [(Mapping, Time)], rng: &mut impl Rng) -> &'a Mapping {
    let a = &population[rng.gen_range(0..population.len())];
    let b = &population[rng.gen_range(0..population.len())];
    if a.1 <= b.1 {
        &a.0
    } else {
        &b.0
    }
}

fn crossover(order: &[TaskId], parent1: &Mapping, parent2: &Mapping, rng: &mut impl Rng) -> Mapping {
    let point = if rng.gen::<f64>() < 0.10 {
        if rng.gen::<bool>() {
            0
        } else {
            order.len()
        }
    } else {
        rng.gen_range(0..=order.len())
    };

    let mut child = Mapping::new();
    for (i, &t) in order.iter().enumerate() {
        let from = if i < point { parent1 } else { parent2 };
        if let Some(pair) = from.get(t) {
            child.set(t, pair);
        }
    }
    child
}

fn mutate<S: System>(system: &S, mapping: &mut Mapping, rng: &mut impl Rng) {
    let n = system.graph().task_count().max(1);
    let procs: Vec<DeviceId> = system.platform().processors().collect();
    if procs.is_empty() {
        return;
    }
    for t in system.graph().tasks() {
        if rng.gen::<f64>() < 1.0 / n as f64 {
            let p = procs[rng.gen_range(0..procs.len())];
            let mem = system.platform().processor(p).default_memory;
            mapping.set(t, DevicePair::same_memory(p, mem));
        }
    }
}

pub struct GeneticMapper<C = FullEvaluation> {
    pub seed: Seed,
    pub population_size: usize,
    pub generations: usize,
    pub cost_policy: C,
}

impl GeneticMapper<FullEvaluation> {
    pub fn new(seed: Seed) -> Self {
        GeneticMapper {
            seed,
            population_size: DEFAULT_POPULATION_SIZE,
            generations: DEFAULT_GENERATIONS,
            cost_policy: FullEvaluation,
        }
    }
}

impl<C> GeneticMapper<C> {
    pub fn with_cost_policy<C2>(self, cost_policy: C2) -> GeneticMapper<C2> {
        GeneticMapper {
            seed: self.seed,
            population_size: self.population_size,
            generations: self.generations,
            cost_policy,
        }
    }

    pub fn with_generations(mut self, generations: usize) -> Self {
        self.generations = generations;
        self
    }

    pub fn with_population_size(mut self, population_size: usize) -> Self {
        self.population_size = population_size;
        self
    }
}

impl<S: System, C: CostPolicy> Mapper<S> for GeneticMapper<C> {
    fn label(&self) -> &str {
        "Genetic"
    }

    fn map(&self, system: &S) -> Mapping {
        let _span = info_span!("mapper", name = "Genetic").entered();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let order = bfs_task_order(system.graph());
        let evaluator = MappingEvaluator::new(system);

        let mut population: Vec<(Mapping, Time)> = Vec::with_capacity(self.population_size);
        let greedy = greedy_mapping(system);
        let greedy_cost = self.cost_policy.cost(system, &evaluator, &greedy);
        population.push((greedy, greedy_cost));
        while population.len() < self.population_size {
            let mut m = random_mapping(system, &mut rng);
            repair(system, &mut m, &mut rng);
            let cost = self.cost_policy.cost(system, &evaluator, &m);
            population.push((m, cost));
        }
        population.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

        for gen in 0..self.generations {
            let mut offspring = Vec::with_capacity(self.population_size);
            for _ in 0..self.population_size {
                let p1 = tournament(&population, &mut rng);
                let p2 = tournament(&population, &mut rng);
                let mut child = crossover(&order, p1, p2, &mut rng);
                mutate(system, &mut child, &mut rng);
                repair(system, &mut child, &mut rng);
                let cost = self.cost_policy.cost(system, &evaluator, &child);
                offspring.push((child, cost));
            }

            population.extend(offspring);
            population.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
            population.truncate(self.population_size);

            if gen % 50 == 0 {
                debug!(gen, best = population[0].1, "genetic generation");
            }
        }

        population.into_iter().next().map(|(m, _)| m).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform_catalog::create_platform;
    use crate::system::ComputationBasedSystem;
    use crate::task_graph::TaskGraph;
    use crate::topo_sort::SortMode;

    fn fanout_system() -> ComputationBasedSystem {
        let mut g = TaskGraph::new();
        let a = g.add_node("a", 1.0, 100.0, 1.0);
        let b = g.add_node("b", 3.0, 100.0, 1.0);
        let c = g.add_node("c", 3.0, 100.0, 1.0);
        let d = g.add_node("d", 1.0, 100.0, 1.0);
        g.add_edge(a, b);
        g.add_edge(a, c);
        g.add_edge(b, d);
        g.add_edge(c, d);
        ComputationBasedSystem::new(g, create_platform(1))
    }

    #[test]
    fn s5_genetic_cost_does_not_exceed_greedy() {
        let system = fanout_system();
        let mapper = GeneticMapper::new(11).with_generations(20).with_population_size(20);
        let mapping = mapper.map(&system);
        assert!(mapping.is_complete(system.graph()));

        let evaluator = MappingEvaluator::new(&system);
        let greedy = greedy_mapping(&system);
        let greedy_cost = evaluator.compute_cost(&greedy, SortMode::TaskFirstBfs);
        let genetic_cost = evaluator.compute_cost(&mapping, SortMode::TaskFirstBfs);
        assert!(genetic_cost <= greedy_cost + 1e-6, "genetic={genetic_cost} greedy={greedy_cost}");
    }

    #[test]
    fn repair_clears_incompatible_and_overcapacity_assignments() {
        let system = fanout_system();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut m = random_mapping(&system, &mut rng);
        repair(&system, &mut m, &mut rng);
        for t in system.graph().tasks() {
            let pair = m.get(t).unwrap();
            assert!(system.is_compatible(t, pair.proc));
        }
    }

    #[test]
    fn summed_evaluation_is_cheaper_proxy_and_runs() {
        let system = fanout_system();
        let mapper = GeneticMapper::new(3).with_generations(10).with_population_size(10).with_cost_policy(SummedEvaluation);
        let mapping = mapper.map(&system);
        assert!(mapping.is_complete(system.graph()));
    }
}

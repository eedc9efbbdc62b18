/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! `SeriesParallelDecompositionMapper`: the decomposition framework
//! instantiated with deduplicated non-leaf SP-tree node task sets, letting
//! the relocation pass move whole series/parallel regions in one step
//! instead of task-by-task.

use std::collections::HashSet;

use crate::mapper::Mapper;
use crate::sp_decomposition::decompose;
use crate::system::System;
use crate::task_graph::{TaskGraph, TaskId};

use super::policies::{run, BaseMappingPolicy, EvaluationPolicy};
use crate::mapping::Mapping;

fn sp_subgraphs(graph: &TaskGraph, map_single_tasks: bool) -> Vec<HashSet<TaskId>> {
    let mut subgraphs = decompose(graph).non_leaf_task_sets();
    if map_single_tasks {
        subgraphs.extend(graph.tasks().map(|t| HashSet::from([t])));
    }
    subgraphs
}

pub struct SeriesParallelDecompositionMapper<B, E> {
    base: B,
    eval: E,
    map_single_tasks: bool,
}

impl<B, E> SeriesParallelDecompositionMapper<B, E> {
    pub fn new(base: B, eval: E, map_single_tasks: bool) -> Self {
        SeriesParallelDecompositionMapper {
            base,
            eval,
            map_single_tasks,
        }
    }
}

impl<S: System, B: BaseMappingPolicy<S>, E: EvaluationPolicy> Mapper<S> for SeriesParallelDecompositionMapper<B, E> {
    fn label(&self) -> &str {
        "SeriesParallelDecomposition"
    }

    fn map(&self, system: &S) -> Mapping {
        let subgraphs = sp_subgraphs(system.graph(), self.map_single_tasks);
        run(system, &self.base, &self.eval, &subgraphs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::MappingEvaluator;
    use crate::mapper::decomposition::{EvaluateAllPolicy, EvaluateThresholdPolicy, GreedyBase};
    use crate::mapper::greedy::greedy_mapping;
    use crate::platform_catalog::create_platform;
    use crate::system::ComputationBasedSystem;
    use crate::topo_sort::SortMode;

    fn diamond_system() -> ComputationBasedSystem {
        let mut g = TaskGraph::new();
        let a = g.add_node("a", 1.0, 100.0, 1.0);
        let b = g.add_node("b", 5.0, 100.0, 1.0);
        let c = g.add_node("c", 5.0, 100.0, 1.0);
        let d = g.add_node("d", 1.0, 100.0, 1.0);
        g.add_edge(a, b);
        g.add_edge(a, c);
        g.add_edge(b, d);
        g.add_edge(c, d);
        ComputationBasedSystem::new(g, create_platform(1))
    }

    #[test]
    fn sp_subgraphs_cover_the_whole_graph_for_a_diamond() {
        let mut g = TaskGraph::new();
        let a = g.add_node("a", 1.0, 100.0, 1.0);
        let b = g.add_node("b", 1.0, 100.0, 1.0);
        let c = g.add_node("c", 1.0, 100.0, 1.0);
        let d = g.add_node("d", 1.0, 100.0, 1.0);
        g.add_edge(a, b);
        g.add_edge(a, c);
        g.add_edge(b, d);
        g.add_edge(c, d);

        let subgraphs = sp_subgraphs(&g, false);
        let union: HashSet<TaskId> = subgraphs.into_iter().flatten().collect();
        assert_eq!(union, g.tasks().collect());
    }

    #[test]
    fn s5_sp_decomposition_cost_does_not_exceed_greedy() {
        let system = diamond_system();
        let greedy = greedy_mapping(&system);
        let mapper = SeriesParallelDecompositionMapper::new(GreedyBase, EvaluateAllPolicy, true);
        let mapping = mapper.map(&system);
        assert!(mapping.is_complete(system.graph()));

        let evaluator = MappingEvaluator::new(&system);
        let greedy_cost = evaluator.compute_cost(&greedy, SortMode::TaskFirstBfs);
        let mapped_cost = evaluator.compute_cost(&mapping, SortMode::TaskFirstBfs);
        assert!(mapped_cost <= greedy_cost + 1e-6, "mapped={mapped_cost} greedy={greedy_cost}");
    }

    #[test]
    fn evaluate_threshold_policy_also_produces_complete_improving_mapping() {
        let system = diamond_system();
        let greedy = greedy_mapping(&system);
        let mapper = SeriesParallelDecompositionMapper::new(GreedyBase, EvaluateThresholdPolicy::new(10.0), true);
        let mapping = mapper.map(&system);
        assert!(mapping.is_complete(system.graph()));

        let evaluator = MappingEvaluator::new(&system);
        let greedy_cost = evaluator.compute_cost(&greedy, SortMode::TaskFirstBfs);
        let mapped_cost = evaluator.compute_cost(&mapping, SortMode::TaskFirstBfs);
        assert!(mapped_cost <= greedy_cost + 1e-6, "mapped={mapped_cost} greedy={greedy_cost}");
    }
}

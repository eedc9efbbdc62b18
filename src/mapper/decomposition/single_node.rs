/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! `SingleNodeDecompositionMapper`: the decomposition framework instantiated
//! with one singleton subgraph per task — no SP structure, just per-task
//! relocation.

use std::collections::HashSet;

use crate::mapper::Mapper;
use crate::system::System;
use crate::task_graph::TaskGraph;

use super::policies::{run, BaseMappingPolicy, EvaluationPolicy};
use crate::mapping::Mapping;

fn singleton_subgraphs(graph: &TaskGraph) -> Vec<HashSet<crate::task_graph::TaskId>> {
    graph.tasks().map(|t| HashSet::from([t])).collect()
}

pub struct SingleNodeDecompositionMapper<B, E> {
    base: B,
    eval: E,
}

impl<B, E> SingleNodeDecompositionMapper<B, E> {
    pub fn new(base: B, eval: E) -> Self {
        SingleNodeDecompositionMapper { base, eval }
    }
}

impl<S: System, B: BaseMappingPolicy<S>, E: EvaluationPolicy> Mapper<S> for SingleNodeDecompositionMapper<B, E> {
    fn label(&self) -> &str {
        "SingleNodeDecomposition"
    }

    fn map(&self, system: &S) -> Mapping {
        let subgraphs = singleton_subgraphs(system.graph());
        run(system, &self.base, &self.eval, &subgraphs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::decomposition::{EvaluateAllPolicy, GreedyBase};
    use crate::platform_catalog::create_platform;
    use crate::system::ComputationBasedSystem;

    #[test]
    fn singleton_subgraphs_cover_every_task_exactly_once() {
        let mut g = TaskGraph::new();
        let a = g.add_node("a", 1.0, 100.0, 1.0);
        let b = g.add_node("b", 1.0, 100.0, 1.0);
        g.add_edge(a, b);

        let subgraphs = singleton_subgraphs(&g);
        assert_eq!(subgraphs.len(), 2);
        assert!(subgraphs.iter().all(|s| s.len() == 1));
    }

    #[test]
    fn single_node_mapper_produces_complete_mapping() {
        let mut g = TaskGraph::new();
        let a = g.add_node("a", 1.0, 100.0, 1.0);
        let b = g.add_node("b", 4.0, 100.0, 1.0);
        g.add_edge(a, b);
        let system = ComputationBasedSystem::new(g, create_platform(1));

        let mapper = SingleNodeDecompositionMapper::new(GreedyBase, EvaluateAllPolicy);
        let mapping = mapper.map(&system);
        assert!(mapping.is_complete(system.graph()));
    }
}

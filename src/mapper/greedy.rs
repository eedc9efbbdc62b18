/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Greedy baseline: every task goes to the first label-permitted compatible
//! processor. Under the catalogue platform's processor iteration order
//! (`CPU` first), this produces the everything-on-CPU "CPUMapping" baseline
//! that every harder mapper compares against.

use tracing::debug;

use crate::mapping::{DevicePair, Mapping};
use crate::mapper::Mapper;
use crate::system::System;

/// Assigns every task in `system`'s graph to the first processor (in the
/// platform's declaration order) it is compatible with, using that
/// processor's default memory for both input and output staging. Tasks with
/// no compatible processor are left unmapped.
pub fn greedy_mapping<S: System>(system: &S) -> Mapping {
    let mut mapping = Mapping::new();
    for t in system.graph().tasks() {
        if let Some(p) = system.platform().processors().find(|&p| system.is_compatible(t, p)) {
            let mem = system.platform().processor(p).default_memory;
            mapping.set(t, DevicePair::same_memory(p, mem));
        } else {
            debug!(task = %system.graph().task(t).label, "no compatible processor for greedy assignment");
        }
    }
    mapping
}

pub struct GreedyMapper;

impl<S: System> Mapper<S> for GreedyMapper {
    fn label(&self) -> &str {
        "CPUMapping"
    }

    fn map(&self, system: &S) -> Mapping {
        greedy_mapping(system)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform_catalog::create_platform;
    use crate::system::ComputationBasedSystem;
    use crate::task_graph::TaskGraph;

    #[test]
    fn greedy_maps_every_task_to_cpu() {
        let mut g = TaskGraph::new();
        let a = g.add_node("a", 1.0, 100.0, 1.0);
        let b = g.add_node("b", 1.0, 100.0, 1.0);
        g.add_edge(a, b);
        let system = ComputationBasedSystem::new(g, create_platform(1));

        let mapping = greedy_mapping(&system);
        let cpu = system.platform().find_processor_by_label("CPU").unwrap();
        assert!(mapping.tasks().all(|t| mapping.get(t).unwrap().proc == cpu));
    }

    #[test]
    fn greedy_mapping_is_complete() {
        let mut g = TaskGraph::new();
        g.add_node("a", 1.0, 100.0, 1.0);
        let system = ComputationBasedSystem::new(g, create_platform(0));
        let mapping = greedy_mapping(&system);
        assert!(mapping.is_complete(system.graph()));
    }
}

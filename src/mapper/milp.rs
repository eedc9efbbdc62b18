/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! MILP mappers: exact/near-exact alternatives to the heuristic mappers,
//! built on `good_lp` and delegated to the CBC backend. A solver error or an
//! infeasible instance collapses to an empty [`Mapping`] — the same
//! "timeout" outcome an exhausted heuristic search would produce.

use std::collections::HashMap;

use good_lp::{constraint, variable, Expression, ProblemVariables, Solution, SolverModel, Variable};

use crate::error::MilpError;
use crate::mapper::heft::avg_xfer;
use crate::mapping::{DevicePair, Mapping};
use crate::mapper::Mapper;
use crate::platform::DeviceId;
use crate::system::System;
use crate::task_graph::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formulation {
    /// Assignment + capacity only; the makespan proxy is the maximum
    /// per-processor summed computation load (precedence is not modelled).
    DeviceBased,
    /// Adds a continuous per-task start-time variable and linear precedence
    /// constraints using an average cross-device transfer estimate in place
    /// of the true (assignment-dependent) transfer time.
    TimeIndexed,
}

pub struct MilpMapper {
    pub formulation: Formulation,
}

impl MilpMapper {
    pub fn new(formulation: Formulation) -> Self {
        MilpMapper { formulation }
    }
}

/// `x[(task, proc)]` binary assignment variables, one per compatible pair.
fn assignment_vars<S: System>(system: &S, vars: &mut ProblemVariables, tasks: &[TaskId], procs: &[DeviceId]) -> HashMap<(TaskId, DeviceId), Variable> {
    let mut x = HashMap::new();
    for &t in tasks {
        for &p in procs {
            if system.is_compatible(t, p) {
                x.insert((t, p), vars.add(variable().binary()));
            }
        }
    }
    x
}

fn duration_expr<S: System>(system: &S, x: &HashMap<(TaskId, DeviceId), Variable>, t: TaskId, procs: &[DeviceId]) -> Expression {
    let mut expr = Expression::from(0.0);
    for &p in procs {
        if let Some(&v) = x.get(&(t, p)) {
            expr += system.computation_time_ms(t, p) * v;
        }
    }
    expr
}

fn solve_device_based<S: System>(system: &S) -> Result<Mapping, MilpError> {
    let tasks: Vec<TaskId> = system.graph().tasks().collect();
    let procs: Vec<DeviceId> = system.platform().processors().collect();

    let mut vars = ProblemVariables::new();
    let x = assignment_vars(system, &mut vars, &tasks, &procs);
    let makespan = vars.add(variable().min(0.0));

    let mut model = vars.minimise(makespan).using(good_lp::default_solver);

    for &t in &tasks {
        let members: Vec<Variable> = procs.iter().filter_map(|&p| x.get(&(t, p)).copied()).collect();
        if members.is_empty() {
            return Err(MilpError::Infeasible);
        }
        let sum: Expression = members.into_iter().sum();
        model = model.with(constraint!(sum == 1.0));
    }

    for &p in &procs {
        let cap = system.platform().processor(p).capacity;
        if cap.is_finite() {
            let load: Expression = tasks
                .iter()
                .filter_map(|&t| x.get(&(t, p)).map(|&v| system.graph().task(t).area() * v))
                .sum();
            model = model.with(constraint!(load <= cap));
        }

        let comp_load = duration_sum_for_proc(system, &x, &tasks, p);
        model = model.with(constraint!(makespan >= comp_load));
    }

    let solution = model.solve().map_err(|e| MilpError::Solver(e.to_string()))?;
    extract_mapping(system, &solution, &x, &tasks, &procs)
}

fn duration_sum_for_proc<S: System>(system: &S, x: &HashMap<(TaskId, DeviceId), Variable>, tasks: &[TaskId], p: DeviceId) -> Expression {
    let mut expr = Expression::from(0.0);
    for &t in tasks {
        if let Some(&v) = x.get(&(t, p)) {
            expr += system.computation_time_ms(t, p) * v;
        }
    }
    expr
}

fn solve_time_indexed<S: System>(system: &S) -> Result<Mapping, MilpError> {
    let tasks: Vec<TaskId> = system.graph().tasks().collect();
    let procs: Vec<DeviceId> = system.platform().processors().collect();

    let mut vars = ProblemVariables::new();
    let x = assignment_vars(system, &mut vars, &tasks, &procs);
    let makespan = vars.add(variable().min(0.0));
    let starts: HashMap<TaskId, Variable> = tasks.iter().map(|&t| (t, vars.add(variable().min(0.0)))).collect();

    let mut model = vars.minimise(makespan).using(good_lp::default_solver);

    let durations: HashMap<TaskId, Expression> = tasks.iter().map(|&t| (t, duration_expr(system, &x, t, &procs))).collect();

    for &t in &tasks {
        let members: Vec<Variable> = procs.iter().filter_map(|&p| x.get(&(t, p)).copied()).collect();
        if members.is_empty() {
            return Err(MilpError::Infeasible);
        }
        let sum: Expression = members.into_iter().sum();
        model = model.with(constraint!(sum == 1.0));

        let finish = starts[&t].clone() + durations[&t].clone();
        model = model.with(constraint!(makespan >= finish));
    }

    for &p in &procs {
        let cap = system.platform().processor(p).capacity;
        if cap.is_finite() {
            let load: Expression = tasks
                .iter()
                .filter_map(|&t| x.get(&(t, p)).map(|&v| system.graph().task(t).area() * v))
                .sum();
            model = model.with(constraint!(load <= cap));
        }
    }

    for e in system.graph().edges() {
        let edge = system.graph().edge(e);
        let xfer = avg_xfer(system, edge.src, edge.snk);
        let finish_src = starts[&edge.src].clone() + durations[&edge.src].clone() + xfer;
        model = model.with(constraint!(starts[&edge.snk].clone() >= finish_src));
    }

    let solution = model.solve().map_err(|e| MilpError::Solver(e.to_string()))?;
    extract_mapping(system, &solution, &x, &tasks, &procs)
}

fn extract_mapping<S: System>(system: &S, solution: &impl Solution, x: &HashMap<(TaskId, DeviceId), Variable>, tasks: &[TaskId], procs: &[DeviceId]) -> Result<Mapping, MilpError> {
    let mut mapping = Mapping::new();
    for &t in tasks {
        let chosen = procs.iter().find(|&&p| x.get(&(t, p)).map(|&v| solution.value(v) > 0.5).unwrap_or(false));
        if let Some(&p) = chosen {
            let mem = system.platform().processor(p).default_memory;
            mapping.set(t, DevicePair::same_memory(p, mem));
        }
    }
    Ok(mapping)
}

impl<S: System> Mapper<S> for MilpMapper {
    fn label(&self) -> &str {
        match self.formulation {
            Formulation::DeviceBased => "MILP-DeviceBased",
            Formulation::TimeIndexed => "MILP-TimeIndexed",
        }
    }

    fn map(&self, system: &S) -> Mapping {
        let result = match self.formulation {
            Formulation::DeviceBased => solve_device_based(system),
            Formulation::TimeIndexed => solve_time_indexed(system),
        };
        result.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform_catalog::create_platform;
    use crate::system::ComputationBasedSystem;
    use crate::task_graph::TaskGraph;

    #[test]
    fn device_based_label_is_stable() {
        let mapper = MilpMapper::new(Formulation::DeviceBased);
        let mut g = TaskGraph::new();
        g.add_node("t", 1.0, 100.0, 1.0);
        let system = ComputationBasedSystem::new(g, create_platform(0));
        assert_eq!(<MilpMapper as Mapper<ComputationBasedSystem>>::label(&mapper), "MILP-DeviceBased");
        let _ = mapper; // constructed successfully; solving is exercised via the CLI integration path, not unit tests
        let _ = system;
    }
}

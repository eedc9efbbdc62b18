/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Task graph: a DAG of [`Task`]s joined by [`Edge`]s, with lazily
//! propagated input/output sizes.
//!
//! Tasks and edges are owned by [`TaskGraph`] in flat arenas and referenced
//! by index (`TaskId`/`EdgeId`) rather than by pointer, avoiding cyclic
//! task↔edge back-references.

use std::cell::RefCell;
use std::collections::HashSet;

use crate::types::DataSize;

/// Index of a [`Task`] inside a [`TaskGraph`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub usize);

/// Index of an [`Edge`] inside a [`TaskGraph`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

/// How a task's output size is derived from its incoming edges' output
/// sizes.
///
/// One of a fixed set of built-in size functions: sum, max, average, a
/// constant source, or a constant (zero) sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizePropagation {
    /// Output = sum of input sizes.
    Summed,
    /// Output = max of input sizes (0 for an empty input set — see
    /// SPEC_FULL.md §9 Open Question ii).
    Max,
    /// Output = average of input sizes (0 for an empty input set).
    Average,
    /// Output is a fixed constant, ignoring inputs. Used for synthetic
    /// source tasks in the random graph generator.
    Constant(DataSize),
    /// Output is always 0, regardless of input. Used for synthetic sink
    /// tasks.
    Sink,
}

impl SizePropagation {
    fn apply(self, inputs: &[DataSize]) -> DataSize {
        match self {
            SizePropagation::Summed => inputs.iter().sum(),
            SizePropagation::Max => inputs.iter().cloned().fold(0.0, f64::max),
            SizePropagation::Average => {
                if inputs.is_empty() {
                    0.0
                } else {
                    inputs.iter().sum::<f64>() / inputs.len() as f64
                }
            }
            SizePropagation::Constant(c) => c,
            SizePropagation::Sink => 0.0,
        }
    }
}

/// A directed dependency edge, owned by the graph.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub src: TaskId,
    pub snk: TaskId,
}

/// A unit of computation in the task graph.
///
/// Input/output sizes are lazily recomputed: `compute_size` is only invoked
/// from the accessor methods when the `dirty` flag is set, mirroring the
/// `mutable ... dirty` pattern in the original `Task` class.
#[derive(Debug)]
pub struct Task {
    pub label: String,
    pub complexity: f64,
    pub parallelizability: f64,
    pub streamability: f64,
    /// Capacity cost; `None` means "defaults to complexity".
    area: Option<f64>,
    pub size_func: SizePropagation,

    in_edges: Vec<EdgeId>,
    out_edges: Vec<EdgeId>,

    dirty: RefCell<bool>,
    input_size: RefCell<DataSize>,
    output_size: RefCell<DataSize>,
}

impl Task {
    fn new(label: String, complexity: f64, parallelizability: f64, streamability: f64) -> Self {
        Task {
            label,
            complexity,
            parallelizability,
            streamability,
            area: None,
            size_func: SizePropagation::Summed,
            in_edges: Vec::new(),
            out_edges: Vec::new(),
            dirty: RefCell::new(true),
            input_size: RefCell::new(0.0),
            output_size: RefCell::new(0.0),
        }
    }

    /// Capacity cost, defaulting to `complexity` when unset.
    pub fn area(&self) -> f64 {
        self.area.unwrap_or(self.complexity)
    }

    pub fn set_area(&mut self, area: f64) {
        self.area = Some(area);
    }

    pub fn is_streamable(&self) -> bool {
        self.streamability > 1.0
    }

    pub fn in_edges(&self) -> &[EdgeId] {
        &self.in_edges
    }

    pub fn out_edges(&self) -> &[EdgeId] {
        &self.out_edges
    }

    pub fn is_source(&self) -> bool {
        self.in_edges.is_empty()
    }

    pub fn is_sink(&self) -> bool {
        self.out_edges.is_empty()
    }

    fn mark_dirty(&self) {
        *self.dirty.borrow_mut() = true;
    }
}

/// Owning arena of tasks and edges; maintains `sources`/`sinks` as derived
/// state mutated only through `add_node`/`add_edge`/`delete_edge`.
#[derive(Debug, Default)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    edges: Vec<Edge>,
    sources: HashSet<TaskId>,
    sinks: HashSet<TaskId>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task with default `Summed` size propagation. Newly added tasks
    /// have no edges, so they start out as both a source and a sink.
    pub fn add_node(
        &mut self,
        label: impl Into<String>,
        complexity: f64,
        parallelizability: f64,
        streamability: f64,
    ) -> TaskId {
        let id = TaskId(self.tasks.len());
        self.tasks
            .push(Task::new(label.into(), complexity, parallelizability, streamability));
        self.sources.insert(id);
        self.sinks.insert(id);
        id
    }

    pub fn set_size_func(&mut self, task: TaskId, func: SizePropagation) {
        self.task_mut(task).size_func = func;
        self.task_mut(task).mark_dirty();
    }

    pub fn set_area(&mut self, task: TaskId, area: f64) {
        self.task_mut(task).set_area(area);
    }

    /// Adds a directed edge `src -> snk`. Updates the source/sink derived
    /// sets incrementally: `snk` is no longer a source (it now has an
    /// incoming edge) and `src` is no longer a sink.
    pub fn add_edge(&mut self, src: TaskId, snk: TaskId) -> EdgeId {
        let id = EdgeId(self.edges.len());
        self.edges.push(Edge { src, snk });

        self.tasks[src.0].out_edges.push(id);
        self.tasks[snk.0].in_edges.push(id);
        self.tasks[snk.0].mark_dirty();

        self.sinks.remove(&src);
        self.sources.remove(&snk);
        id
    }

    /// Removes `edge` from both endpoints' adjacency lists. If this was the
    /// last edge attached to an endpoint, that endpoint re-enters the
    /// source/sink set.
    pub fn delete_edge(&mut self, edge: EdgeId) {
        let Edge { src, snk } = self.edges[edge.0];

        self.tasks[src.0].out_edges.retain(|&e| e != edge);
        self.tasks[snk.0].in_edges.retain(|&e| e != edge);
        self.tasks[snk.0].mark_dirty();

        if self.tasks[src.0].out_edges.is_empty() {
            self.sinks.insert(src);
        }
        if self.tasks[snk.0].in_edges.is_empty() {
            self.sources.insert(snk);
        }
    }

    pub fn task(&self, id: TaskId) -> &Task {
        &self.tasks[id.0]
    }

    fn task_mut(&mut self, id: TaskId) -> &mut Task {
        &mut self.tasks[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> Edge {
        self.edges[id.0]
    }

    pub fn tasks(&self) -> impl Iterator<Item = TaskId> + '_ {
        (0..self.tasks.len()).map(TaskId)
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.edges.len()).map(EdgeId)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn sources(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.sources.iter().copied()
    }

    pub fn sinks(&self) -> &HashSet<TaskId> {
        &self.sinks
    }

    /// Recomputes `input_size`/`output_size` for `task` if dirty, then
    /// returns the (possibly cached) output size.
    fn compute_size(&self, task: TaskId) -> DataSize {
        let t = self.task(task);
        if !*t.dirty.borrow() {
            return *t.output_size.borrow();
        }

        let inputs: Vec<DataSize> = t
            .in_edges
            .iter()
            .map(|&e| self.output_size(self.edges[e.0].src))
            .collect();
        let input_size: DataSize = inputs.iter().sum();
        let output_size = t.size_func.apply(&inputs);

        *t.input_size.borrow_mut() = input_size;
        *t.output_size.borrow_mut() = output_size;
        *t.dirty.borrow_mut() = false;
        output_size
    }

    pub fn input_size(&self, task: TaskId) -> DataSize {
        self.compute_size(task);
        *self.task(task).input_size.borrow()
    }

    pub fn output_size(&self, task: TaskId) -> DataSize {
        self.compute_size(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_is_source_and_sink() {
        let mut g = TaskGraph::new();
        let t = g.add_node("t", 1.0, 100.0, 1.0);
        assert!(g.task(t).is_source());
        assert!(g.task(t).is_sink());
    }

    #[test]
    fn add_edge_updates_source_sink_sets() {
        let mut g = TaskGraph::new();
        let a = g.add_node("a", 1.0, 100.0, 1.0);
        let b = g.add_node("b", 1.0, 100.0, 1.0);
        g.add_edge(a, b);

        assert!(g.task(a).is_source());
        assert!(!g.task(a).is_sink());
        assert!(!g.task(b).is_source());
        assert!(g.task(b).is_sink());
    }

    #[test]
    fn delete_edge_restores_source_sink_status() {
        let mut g = TaskGraph::new();
        let a = g.add_node("a", 1.0, 100.0, 1.0);
        let b = g.add_node("b", 1.0, 100.0, 1.0);
        let e = g.add_edge(a, b);
        g.delete_edge(e);

        assert!(g.task(b).is_source());
        assert!(g.task(a).is_sink());
    }

    #[test]
    fn summed_propagation_sums_inputs() {
        let mut g = TaskGraph::new();
        let src1 = g.add_node("s1", 1.0, 100.0, 1.0);
        let src2 = g.add_node("s2", 1.0, 100.0, 1.0);
        let dst = g.add_node("d", 1.0, 100.0, 1.0);
        g.set_size_func(src1, SizePropagation::Constant(2.0));
        g.set_size_func(src2, SizePropagation::Constant(3.0));
        g.add_edge(src1, dst);
        g.add_edge(src2, dst);

        assert_eq!(g.input_size(dst), 5.0);
    }

    #[test]
    fn max_propagation_is_zero_for_empty_input() {
        let mut g = TaskGraph::new();
        let t = g.add_node("t", 1.0, 100.0, 1.0);
        g.set_size_func(t, SizePropagation::Max);
        assert_eq!(g.output_size(t), 0.0);
    }

    #[test]
    fn sink_propagation_always_zero() {
        let mut g = TaskGraph::new();
        let src = g.add_node("s", 1.0, 100.0, 1.0);
        let snk = g.add_node("d", 1.0, 100.0, 1.0);
        g.set_size_func(src, SizePropagation::Constant(10.0));
        g.set_size_func(snk, SizePropagation::Sink);
        g.add_edge(src, snk);

        assert_eq!(g.output_size(snk), 0.0);
    }

    #[test]
    fn area_defaults_to_complexity() {
        let mut g = TaskGraph::new();
        let t = g.add_node("t", 4.0, 100.0, 1.0);
        assert_eq!(g.task(t).area(), 4.0);
        g.set_area(t, 9.0);
        assert_eq!(g.task(t).area(), 9.0);
    }

    #[test]
    fn is_streamable_requires_streamability_above_one() {
        let mut g = TaskGraph::new();
        let t1 = g.add_node("t1", 1.0, 100.0, 1.0);
        let t2 = g.add_node("t2", 1.0, 100.0, 2.0);
        assert!(!g.task(t1).is_streamable());
        assert!(g.task(t2).is_streamable());
    }
}

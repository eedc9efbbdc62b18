/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Topological sorting family: [`GraphElement`] sum type, BFS /
//! TaskFirstBFS / Random / MappingBased sort variants, the [`CachedSorting`]
//! wrapper, and the streaming-compression pass.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet, VecDeque};

use rand::Rng;

use crate::mapping::MappingLookup;
use crate::platform::DeviceId;
use crate::system::System;
use crate::task_graph::{EdgeId, TaskGraph, TaskId};

/// A compressed streaming (pipelined) region substituted for its member
/// tasks/edges in a [`TopologicalSorting`].
#[derive(Debug, Clone)]
pub struct SubGraph {
    pub tasks: Vec<TaskId>,
    pub internal_edges: Vec<EdgeId>,
    pub escaping_edges: Vec<EdgeId>,
    pub devices: HashSet<DeviceId>,
}

/// Sum type over the three kinds of element a [`TopologicalSorting`] can
/// emit. Modelled as a genuine Rust enum rather than a tagged `void*`, per
/// SPEC_FULL.md §9.
#[derive(Debug, Clone)]
pub enum GraphElement {
    Task(TaskId),
    Edge(EdgeId),
    SubGraph(SubGraph),
}

/// Which traversal produced a [`TopologicalSorting`]. Used by
/// [`CachedSorting`] to decide whether a previously built ordering can be
/// reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Bfs,
    TaskFirstBfs,
    Random,
    MappingBased,
}

struct IndexCache {
    task_idx: HashMap<TaskId, usize>,
    edge_idx: HashMap<EdgeId, usize>,
}

/// An ordered stream of [`GraphElement`]s respecting every edge's
/// dependency. Keeps a lazily rebuilt index cache so callers can check
/// `index(u) < index(v)` without a linear scan.
pub struct TopologicalSorting {
    elements: Vec<GraphElement>,
    index: RefCell<Option<IndexCache>>,
}

impl TopologicalSorting {
    pub fn new(elements: Vec<GraphElement>) -> Self {
        TopologicalSorting {
            elements,
            index: RefCell::new(None),
        }
    }

    pub fn elements(&self) -> &[GraphElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Marks the index cache dirty, e.g. after the streaming-compression
    /// pass rewrites the ordering in place.
    pub fn mark_dirty(&self) {
        *self.index.borrow_mut() = None;
    }

    fn ensure_index(&self) {
        if self.index.borrow().is_some() {
            return;
        }
        let mut task_idx = HashMap::new();
        let mut edge_idx = HashMap::new();
        for (i, el) in self.elements.iter().enumerate() {
            match el {
                GraphElement::Task(t) => {
                    task_idx.insert(*t, i);
                }
                GraphElement::Edge(e) => {
                    edge_idx.insert(*e, i);
                }
                GraphElement::SubGraph(sg) => {
                    for &t in &sg.tasks {
                        task_idx.insert(t, i);
                    }
                    for &e in &sg.internal_edges {
                        edge_idx.insert(e, i);
                    }
                }
            }
        }
        *self.index.borrow_mut() = Some(IndexCache { task_idx, edge_idx });
    }

    pub fn task_index(&self, task: TaskId) -> Option<usize> {
        self.ensure_index();
        self.index.borrow().as_ref().unwrap().task_idx.get(&task).copied()
    }

    pub fn edge_index(&self, edge: EdgeId) -> Option<usize> {
        self.ensure_index();
        self.index.borrow().as_ref().unwrap().edge_idx.get(&edge).copied()
    }
}

fn initial_indegrees(graph: &TaskGraph) -> HashMap<TaskId, usize> {
    graph
        .tasks()
        .map(|t| (t, graph.task(t).in_edges().len()))
        .collect()
}

/// Classic Kahn order: emits edges immediately after they are consumed
/// (right after their source task).
pub fn bfs(graph: &TaskGraph, insert_edges: bool) -> TopologicalSorting {
    let mut indegree = initial_indegrees(graph);
    let mut frontier: VecDeque<TaskId> = graph.sources().collect();
    let mut elements = Vec::new();

    while let Some(t) = frontier.pop_front() {
        elements.push(GraphElement::Task(t));
        for &e in graph.task(t).out_edges() {
            if insert_edges {
                elements.push(GraphElement::Edge(e));
            }
            let snk = graph.edge(e).snk;
            let d = indegree.get_mut(&snk).expect("edge endpoint must exist");
            *d -= 1;
            if *d == 0 {
                frontier.push_back(snk);
            }
        }
    }
    TopologicalSorting::new(elements)
}

/// Emits each task once ready, and (if requested) its incoming edges
/// immediately before it rather than after their respective sources. The
/// default cached ordering for the evaluator.
pub fn task_first_bfs(graph: &TaskGraph, insert_edges: bool) -> TopologicalSorting {
    let mut indegree = initial_indegrees(graph);
    let mut frontier: VecDeque<TaskId> = graph.sources().collect();
    let mut elements = Vec::new();

    while let Some(t) = frontier.pop_front() {
        if insert_edges {
            for &e in graph.task(t).in_edges() {
                elements.push(GraphElement::Edge(e));
            }
        }
        elements.push(GraphElement::Task(t));
        for &e in graph.task(t).out_edges() {
            let snk = graph.edge(e).snk;
            let d = indegree.get_mut(&snk).expect("edge endpoint must exist");
            *d -= 1;
            if *d == 0 {
                frontier.push_back(snk);
            }
        }
    }
    TopologicalSorting::new(elements)
}

/// Same dependency invariant as [`task_first_bfs`], but the next ready
/// element is drawn uniformly at random from the frontier.
pub fn random(graph: &TaskGraph, insert_edges: bool, rng: &mut impl Rng) -> TopologicalSorting {
    let mut indegree = initial_indegrees(graph);
    let mut frontier: Vec<TaskId> = graph.sources().collect();
    let mut elements = Vec::new();

    while !frontier.is_empty() {
        let idx = rng.gen_range(0..frontier.len());
        let t = frontier.swap_remove(idx);
        if insert_edges {
            for &e in graph.task(t).in_edges() {
                elements.push(GraphElement::Edge(e));
            }
        }
        elements.push(GraphElement::Task(t));
        for &e in graph.task(t).out_edges() {
            let snk = graph.edge(e).snk;
            let d = indegree.get_mut(&snk).expect("edge endpoint must exist");
            *d -= 1;
            if *d == 0 {
                frontier.push(snk);
            }
        }
    }
    TopologicalSorting::new(elements)
}

/// Frontier selection favours the processor whose running-time estimate is
/// currently lowest. Additionally tracks *crossing edges* — out-edges whose
/// sink is mapped to a different processor than its source — and prefers to
/// emit one ahead of the next ready task whenever the task's own processor
/// would otherwise stall on it (mirrors the original's `crossing_edges`
/// queue, see `MappingBasedSorting::sort`).
pub fn mapping_based<S, M>(graph: &TaskGraph, system: &S, mapping: &M, insert_edges: bool) -> TopologicalSorting
where
    S: System,
    M: MappingLookup,
{
    let mut dependencies: HashMap<TaskId, usize> = HashMap::new();
    let mut next_tasks: Vec<Option<TaskId>> = graph.sources().map(Some).collect();
    let mut crossing_edges: Vec<Option<EdgeId>> = Vec::new();
    let mut elements = Vec::new();

    let mut times: HashMap<DeviceId, f64> = HashMap::new();
    for p in system.platform().processors() {
        times.insert(p, 0.0);
    }

    let mut first_task_idx = 0usize;
    let mut first_edge_idx = 0usize;

    while first_task_idx < next_tasks.len() || first_edge_idx < crossing_edges.len() {
        let mut min_time = f64::INFINITY;
        let mut min_idx = None;
        for i in first_task_idx..next_tasks.len() {
            if let Some(t) = next_tasks[i] {
                if let Some(p) = mapping.proc(t) {
                    let tm = *times.get(&p).unwrap_or(&0.0);
                    if tm < min_time {
                        min_time = tm;
                        min_idx = Some(i);
                    }
                }
            }
        }

        let next_task = min_idx.and_then(|i| next_tasks[i]);
        let proc = next_task.and_then(|t| mapping.proc(t));
        let new_time = match (next_task, proc) {
            (Some(t), Some(p)) => min_time + system.computation_time_ms(t, p),
            _ => f64::INFINITY,
        };

        let mut chosen_edge = None;
        for i in first_edge_idx..crossing_edges.len() {
            let Some(e) = crossing_edges[i] else { continue };
            let edge = graph.edge(e);
            let proc_src = mapping.proc(edge.src);
            let proc_snk = mapping.proc(edge.snk);
            let time_src = proc_src.map(|p| *times.get(&p).unwrap_or(&0.0)).unwrap_or(0.0);
            let time_snk = proc_snk.map(|p| *times.get(&p).unwrap_or(&0.0)).unwrap_or(0.0);
            let prefer_edge =
                next_task.is_none() || ((proc == proc_src || proc == proc_snk) && new_time > time_src.max(time_snk));
            if prefer_edge {
                chosen_edge = Some((i, e));
                break;
            }
        }

        if let Some((slot, e)) = chosen_edge {
            crossing_edges[slot] = None;
            while first_edge_idx < crossing_edges.len() && crossing_edges[first_edge_idx].is_none() {
                first_edge_idx += 1;
            }

            if insert_edges {
                elements.push(GraphElement::Edge(e));
            }
            let snk = graph.edge(e).snk;
            let dep = dependencies.entry(snk).or_insert_with(|| graph.task(snk).in_edges().len());
            *dep -= 1;
            if *dep == 0 {
                next_tasks.push(Some(snk));
            }
        } else {
            let i = min_idx.expect("a ready task must exist when no crossing edge was chosen");
            next_tasks[i] = None;
            if let Some(p) = proc {
                times.insert(p, new_time);
            }
            while first_task_idx < next_tasks.len() && next_tasks[first_task_idx].is_none() {
                first_task_idx += 1;
            }

            let t = next_task.expect("selected task exists");
            elements.push(GraphElement::Task(t));

            for &e in graph.task(t).out_edges() {
                let snk = graph.edge(e).snk;
                dependencies.entry(snk).or_insert_with(|| graph.task(snk).in_edges().len());

                if mapping.proc(snk) == proc {
                    if insert_edges {
                        elements.push(GraphElement::Edge(e));
                    }
                    let dep = dependencies.get_mut(&snk).unwrap();
                    *dep -= 1;
                    if *dep == 0 {
                        next_tasks.push(Some(snk));
                    }
                } else {
                    crossing_edges.push(Some(e));
                }
            }
        }
    }
    TopologicalSorting::new(elements)
}

/// Wraps a previously produced ordering, reused across repeated cost
/// computations so long as the requested sort mode (and edge-insertion
/// flag) still matches what produced it.
#[derive(Default)]
pub struct CachedSorting {
    mode: Option<SortMode>,
    insert_edges: bool,
    sorting: Option<TopologicalSorting>,
}

impl CachedSorting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached ordering if `mode`/`insert_edges` match what is
    /// stored, else `None` (the caller must build and [`store`](Self::store)
    /// a fresh one).
    pub fn get(&self, mode: SortMode, insert_edges: bool) -> Option<&TopologicalSorting> {
        if self.mode == Some(mode) && self.insert_edges == insert_edges {
            self.sorting.as_ref()
        } else {
            None
        }
    }

    pub fn store(&mut self, mode: SortMode, insert_edges: bool, sorting: TopologicalSorting) {
        self.mode = Some(mode);
        self.insert_edges = insert_edges;
        self.sorting = Some(sorting);
    }

    pub fn invalidate(&mut self) {
        self.mode = None;
        self.sorting = None;
    }
}

/// A task is eligible to join a streaming pipeline region: mapped to a
/// streaming processor, itself streamable, and staged through streaming-
/// capable memories.
fn pipelineable<S, M>(task: TaskId, graph: &TaskGraph, system: &S, mapping: &M) -> bool
where
    S: System,
    M: MappingLookup,
{
    let Some(pair) = mapping.lookup(task) else {
        return false;
    };
    if !graph.task(task).is_streamable() {
        return false;
    }
    if !system.platform().processor(pair.proc).is_streaming_device() {
        return false;
    }
    system.platform().streaming_allowed(pair.mem_in) && system.platform().streaming_allowed(pair.mem_out)
}

/// Identity key for the per-pass dependency table below — tasks and edges
/// share a single map the way the original keys on `void*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DepKey {
    Task(TaskId),
    Edge(EdgeId),
}

/// Rewrites `ordering` in place, substituting each maximal compressible
/// streaming region with a single [`GraphElement::SubGraph`], once per
/// distinct streaming processor present in `mapping`.
///
/// Ports `TopologicalSorting::compress_streamable_subtrees` verbatim: a
/// `wavefront` min-heap of the smallest not-yet-reached index among edges
/// leaving any in-progress pipelined task, and a `pending` index set admitted
/// by wavefront membership rather than contiguous array position — so a
/// non-pipelineable element interleaved between two pipeline members (e.g. a
/// task on another processor) is skipped without closing the run, so long as
/// the wavefront hasn't been crossed. Invalidates the ordering's index cache.
pub fn compress_streaming<S, M>(ordering: &mut TopologicalSorting, graph: &TaskGraph, system: &S, mapping: &M)
where
    S: System,
    M: MappingLookup,
{
    let mut streaming_procs = Vec::new();
    let mut seen = HashSet::new();
    for t in graph.tasks() {
        if let Some(p) = mapping.proc(t) {
            if system.platform().processor(p).is_streaming_device() && seen.insert(p) {
                streaming_procs.push(p);
            }
        }
    }

    for proc in streaming_procs {
        while compress_one_pass(ordering, graph, system, mapping, proc) {}
    }
}

/// One iteration of the original's do-while body: finds at most one
/// compressible region for `streaming_proc` and splices it in. Returns
/// whether a region was found (the caller loops until `false`).
fn compress_one_pass<S, M>(
    ordering: &mut TopologicalSorting,
    graph: &TaskGraph,
    system: &S,
    mapping: &M,
    streaming_proc: DeviceId,
) -> bool
where
    S: System,
    M: MappingLookup,
{
    let elems = ordering.elements.clone();

    let mut pos: HashMap<DepKey, usize> = HashMap::new();
    for (idx, el) in elems.iter().enumerate() {
        match el {
            GraphElement::Task(t) => {
                pos.insert(DepKey::Task(*t), idx);
            }
            GraphElement::Edge(e) => {
                pos.insert(DepKey::Edge(*e), idx);
            }
            GraphElement::SubGraph(_) => {}
        }
    }
    let index_of = |k: DepKey| -> usize { *pos.get(&k).expect("element was indexed from the current ordering") };

    let mut dependencies: HashMap<DepKey, usize> = HashMap::new();
    for el in &elems {
        match el {
            GraphElement::Task(t) => {
                dependencies.insert(DepKey::Task(*t), graph.task(*t).in_edges().len());
            }
            GraphElement::Edge(e) => {
                dependencies.insert(DepKey::Edge(*e), 1);
            }
            GraphElement::SubGraph(_) => {}
        }
    }

    let mut wavefront: BinaryHeap<Reverse<usize>> = BinaryHeap::new();
    let mut pending: BTreeSet<usize> = BTreeSet::new();
    let mut pending_tasks: BTreeMap<usize, usize> = BTreeMap::new();

    let mut elem_idx = 0;
    while elem_idx < elems.len() {
        if let Some(&Reverse(top)) = wavefront.peek() {
            if elem_idx > top {
                break;
            }
        }

        let dep_zero = match &elems[elem_idx] {
            GraphElement::Task(t) => dependencies.get(&DepKey::Task(*t)).copied() == Some(0),
            GraphElement::Edge(e) => dependencies.get(&DepKey::Edge(*e)).copied() == Some(0),
            GraphElement::SubGraph(_) => false,
        };

        if dep_zero {
            match elems[elem_idx].clone() {
                GraphElement::Task(t) => {
                    if mapping.proc(t) == Some(streaming_proc) && pipelineable(t, graph, system, mapping) {
                        while matches!(wavefront.peek(), Some(&Reverse(top)) if top == elem_idx) {
                            wavefront.pop();
                        }
                        pending.insert(elem_idx);
                        for &e in graph.task(t).out_edges() {
                            wavefront.push(Reverse(index_of(DepKey::Edge(e))));
                            *dependencies.get_mut(&DepKey::Edge(e)).unwrap() -= 1;
                        }
                    } else if pending.is_empty() {
                        for &e in graph.task(t).out_edges() {
                            *dependencies.get_mut(&DepKey::Edge(e)).unwrap() -= 1;
                        }
                    }
                }
                GraphElement::Edge(e) => {
                    let snk = graph.edge(e).snk;
                    if matches!(wavefront.peek(), Some(&Reverse(top)) if top == elem_idx) {
                        wavefront.pop();
                        pending.insert(elem_idx);
                        pending_tasks.insert(index_of(DepKey::Task(snk)), elem_idx);
                        wavefront.push(Reverse(index_of(DepKey::Task(snk))));
                        *dependencies.get_mut(&DepKey::Task(snk)).unwrap() -= 1;
                    } else {
                        *dependencies.get_mut(&DepKey::Task(snk)).unwrap() -= 1;
                    }
                }
                GraphElement::SubGraph(_) => {}
            }
        }

        if let GraphElement::SubGraph(sg) = &elems[elem_idx] {
            if pending.is_empty() {
                for &e in &sg.escaping_edges {
                    *dependencies.get_mut(&DepKey::Edge(e)).unwrap() -= 1;
                }
            }
        }

        elem_idx += 1;
    }

    if pending.is_empty() {
        return false;
    }

    let mut last_idx = *pending.iter().next_back().expect("pending is non-empty");
    for (&snk_pos, &edge_idx) in pending_tasks.iter().rev() {
        if snk_pos <= last_idx {
            break;
        }
        last_idx = last_idx.min(edge_idx.saturating_sub(1));
    }

    let mut member_tasks = Vec::new();
    let mut member_edges = Vec::new();
    let mut escaping_edges = Vec::new();
    for &idx in &pending {
        if idx > last_idx {
            break;
        }
        match &elems[idx] {
            GraphElement::Task(t) => {
                member_tasks.push(*t);
                for &e in graph.task(*t).out_edges() {
                    if index_of(DepKey::Edge(e)) > last_idx {
                        escaping_edges.push(e);
                    }
                }
            }
            GraphElement::Edge(e) => member_edges.push(*e),
            GraphElement::SubGraph(_) => {}
        }
    }

    if member_tasks.is_empty() {
        return false;
    }

    let mut devices: HashSet<DeviceId> = HashSet::new();
    for &t in &member_tasks {
        if let Some(pair) = mapping.lookup(t) {
            devices.insert(pair.proc);
            devices.insert(pair.mem_in);
            devices.insert(pair.mem_out);
        }
    }

    let subgraph = SubGraph {
        tasks: member_tasks.clone(),
        internal_edges: member_edges.clone(),
        escaping_edges,
        devices,
    };

    let first_pos = index_of(DepKey::Task(member_tasks[0]));
    let member_task_set: HashSet<TaskId> = member_tasks.into_iter().collect();
    let member_edge_set: HashSet<EdgeId> = member_edges.into_iter().collect();

    let mut new_elements = Vec::with_capacity(elems.len());
    for (idx, el) in elems.into_iter().enumerate() {
        if idx == first_pos {
            new_elements.push(GraphElement::SubGraph(subgraph.clone()));
            continue;
        }
        match &el {
            GraphElement::Task(t) if member_task_set.contains(t) => continue,
            GraphElement::Edge(e) if member_edge_set.contains(e) => continue,
            _ => new_elements.push(el),
        }
    }

    ordering.elements = new_elements;
    ordering.mark_dirty();
    true
}

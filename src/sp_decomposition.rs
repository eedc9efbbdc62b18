/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Series-parallel decomposition: builds an SP-tree of a [`TaskGraph`]
//! bottom-up from a wavefront of growing/merging operations, degrading to a
//! forest when the graph is not strictly series-parallel.

use std::collections::{HashMap, HashSet};

use crate::task_graph::{EdgeId, TaskGraph, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpKind {
    Series,
    Parallel,
    Edge,
}

/// One node of an SP-tree. `Edge` nodes are leaves; `Series`/`Parallel`
/// nodes flatten equal-kind children into themselves (canonical form).
#[derive(Debug, Clone)]
pub struct SpNode {
    pub kind: SpKind,
    pub children: Vec<SpNode>,
    pub edge: Option<EdgeId>,
    /// `None` represents the synthetic `⊥` source.
    pub front: Option<TaskId>,
    pub back: TaskId,
    /// Number of edges from this node's interior that land on `back`.
    pub parallel_out: usize,
}

impl SpNode {
    fn leaf(edge: EdgeId, front: Option<TaskId>, back: TaskId) -> Self {
        SpNode {
            kind: SpKind::Edge,
            children: Vec::new(),
            edge: Some(edge),
            front,
            back,
            parallel_out: 1,
        }
    }

    fn series(front: Option<TaskId>, back: TaskId, parallel_out: usize, mut prefix: SpNode, step: SpNode) -> Self {
        let mut children = if prefix.kind == SpKind::Series {
            std::mem::take(&mut prefix.children)
        } else {
            vec![prefix]
        };
        if step.kind == SpKind::Series {
            children.extend(step.children);
        } else {
            children.push(step);
        }
        SpNode {
            kind: SpKind::Series,
            children,
            edge: None,
            front,
            back,
            parallel_out,
        }
    }

    fn parallel(front: Option<TaskId>, back: TaskId, members: Vec<SpNode>) -> Self {
        let mut children = Vec::new();
        let mut parallel_out = 0;
        for m in members {
            parallel_out += m.parallel_out;
            if m.kind == SpKind::Parallel {
                children.extend(m.children);
            } else {
                children.push(m);
            }
        }
        SpNode {
            kind: SpKind::Parallel,
            children,
            edge: None,
            front,
            back,
            parallel_out,
        }
    }

    /// The set of real tasks (excluding the synthetic `⊥` source) reachable
    /// within this node's subtree.
    pub fn tasks(&self) -> HashSet<TaskId> {
        let mut out = HashSet::new();
        self.collect_tasks(&mut out);
        out
    }

    fn collect_tasks(&self, out: &mut HashSet<TaskId>) {
        out.insert(self.back);
        if let Some(front) = self.front {
            out.insert(front);
        }
        for c in &self.children {
            c.collect_tasks(out);
        }
    }
}

/// Result of decomposing a [`TaskGraph`]: a single SP-tree root when the
/// graph is strictly series-parallel, or a forest of roots otherwise.
#[derive(Debug, Clone)]
pub struct SeriesParallelDecomposition {
    pub roots: Vec<SpNode>,
}

impl SeriesParallelDecomposition {
    pub fn is_series_parallel(&self) -> bool {
        self.roots.len() == 1
    }

    /// All non-leaf (Series/Parallel) node task-sets across every root,
    /// de-duplicated by task-set content. Used by
    /// `SeriesParallelDecompositionMapper` to build its candidate subgraphs.
    pub fn non_leaf_task_sets(&self) -> Vec<HashSet<TaskId>> {
        let mut seen: Vec<HashSet<TaskId>> = Vec::new();
        for root in &self.roots {
            collect_non_leaf(root, &mut seen);
        }
        seen
    }
}

fn collect_non_leaf(node: &SpNode, seen: &mut Vec<HashSet<TaskId>>) {
    if node.kind != SpKind::Edge {
        let ts = node.tasks();
        if !seen.contains(&ts) {
            seen.push(ts);
        }
    }
    for c in &node.children {
        collect_non_leaf(c, seen);
    }
}

/// An in-flight operation in the wavefront, keyed by `(front, back)` for
/// the merge step.
struct WaveOp {
    node: SpNode,
}

/// Builds the SP-tree/forest of `graph` via the wavefront grow/merge
/// algorithm described in SPEC_FULL.md §4.4.
pub fn decompose(graph: &TaskGraph) -> SeriesParallelDecomposition {
    let mut missing_inputs: HashMap<TaskId, usize> = HashMap::new();
    let mut active: Vec<WaveOp> = Vec::new();
    let mut forest: Vec<SpNode> = Vec::new();

    for s in graph.sources() {
        active.push(WaveOp {
            node: SpNode {
                kind: SpKind::Edge,
                children: Vec::new(),
                edge: None,
                front: None,
                back: s,
                parallel_out: 0,
            },
        });
    }

    let effective_indeg = |t: TaskId, missing: &HashMap<TaskId, usize>| -> usize {
        let real = graph.task(t).in_edges().len();
        real.saturating_sub(*missing.get(&t).unwrap_or(&0))
    };

    loop {
        // Merge pass: group by (front, back), combine duplicates as PARALLEL.
        let mut groups: HashMap<(Option<TaskId>, TaskId), Vec<SpNode>> = HashMap::new();
        for op in active.drain(..) {
            groups.entry((op.node.front, op.node.back)).or_default().push(op.node);
        }
        let mut merged: Vec<WaveOp> = Vec::new();
        for ((front, back), mut members) in groups {
            let node = if members.len() == 1 {
                members.pop().unwrap()
            } else {
                SpNode::parallel(front, back, members)
            };
            merged.push(WaveOp { node });
        }
        active = merged;

        // Growth pass.
        let mut grown: Vec<WaveOp> = Vec::new();
        let mut progressed = false;
        for op in active.drain(..) {
            let back = op.node.back;
            let indeg = effective_indeg(back, &missing_inputs);
            if indeg > op.node.parallel_out {
                grown.push(op);
                continue;
            }
            let outs: Vec<EdgeId> = graph.task(back).out_edges().to_vec();
            if outs.is_empty() {
                grown.push(op);
                continue;
            }
            progressed = true;
            for &e in &outs {
                let snk = graph.edge(e).snk;
                let step = SpNode::leaf(e, Some(back), snk);
                let new_node = SpNode::series(op.node.front, snk, 1, op.node.clone(), step);
                grown.push(WaveOp { node: new_node });
            }
        }
        active = grown;

        if progressed {
            continue;
        }

        if active.len() == 1 {
            forest.push(active.pop().unwrap().node);
            break;
        }

        // No progress: find a genuinely stuck op (its back needs more real
        // inbound edges than this op accounts for, and no sibling shares its
        // (front, back) to merge with — otherwise the merge pass above would
        // already have combined them).
        let stuck_idx = active.iter().position(|op| {
            let indeg = effective_indeg(op.node.back, &missing_inputs);
            indeg > op.node.parallel_out
        });

        match stuck_idx {
            Some(idx) => {
                let op = active.remove(idx);
                let shortfall = effective_indeg(op.node.back, &missing_inputs) - op.node.parallel_out;
                *missing_inputs.entry(op.node.back).or_insert(0) += shortfall;
                forest.push(op.node);
            }
            None => {
                // Every remaining op is a legitimately terminal branch at a
                // distinct sink; the graph degrades to a forest.
                forest.extend(active.drain(..).map(|op| op.node));
                break;
            }
        }
    }

    SeriesParallelDecomposition { roots: forest }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_chain_is_single_series_root_covering_all_tasks() {
        let mut g = TaskGraph::new();
        let a = g.add_node("a", 1.0, 100.0, 1.0);
        let b = g.add_node("b", 1.0, 100.0, 1.0);
        let c = g.add_node("c", 1.0, 100.0, 1.0);
        g.add_edge(a, b);
        g.add_edge(b, c);

        let d = decompose(&g);
        assert!(d.is_series_parallel());
        let tasks = d.roots[0].tasks();
        assert_eq!(tasks, g.tasks().collect());
    }

    #[test]
    fn diamond_is_single_root_covering_all_tasks() {
        let mut g = TaskGraph::new();
        let a = g.add_node("a", 1.0, 100.0, 1.0);
        let b = g.add_node("b", 1.0, 100.0, 1.0);
        let c = g.add_node("c", 1.0, 100.0, 1.0);
        let d = g.add_node("d", 1.0, 100.0, 1.0);
        g.add_edge(a, b);
        g.add_edge(a, c);
        g.add_edge(b, d);
        g.add_edge(c, d);

        let dec = decompose(&g);
        assert!(dec.is_series_parallel());
        assert_eq!(dec.roots[0].tasks(), g.tasks().collect());
    }

    #[test]
    fn seven_task_sp_graph_yields_single_root_with_all_tasks() {
        // a -> b -> d -> f -> g
        //  \            /
        //   -> c -> e --
        let mut g = TaskGraph::new();
        let a = g.add_node("a", 1.0, 100.0, 1.0);
        let b = g.add_node("b", 1.0, 100.0, 1.0);
        let c = g.add_node("c", 1.0, 100.0, 1.0);
        let d = g.add_node("d", 1.0, 100.0, 1.0);
        let e = g.add_node("e", 1.0, 100.0, 1.0);
        let f = g.add_node("f", 1.0, 100.0, 1.0);
        let gg = g.add_node("g", 1.0, 100.0, 1.0);
        g.add_edge(a, b);
        g.add_edge(a, c);
        g.add_edge(b, d);
        g.add_edge(c, e);
        g.add_edge(d, f);
        g.add_edge(e, f);
        g.add_edge(f, gg);

        let dec = decompose(&g);
        assert!(dec.is_series_parallel());
        assert_eq!(dec.roots[0].tasks(), g.tasks().collect());
    }

    #[test]
    fn complete_bipartite_non_sp_graph_yields_forest_with_two_roots() {
        // Classic minimal non-SP shape: two sources both feeding both sinks.
        let mut g = TaskGraph::new();
        let a = g.add_node("a", 1.0, 100.0, 1.0);
        let b = g.add_node("b", 1.0, 100.0, 1.0);
        let c = g.add_node("c", 1.0, 100.0, 1.0);
        let d = g.add_node("d", 1.0, 100.0, 1.0);
        g.add_edge(a, c);
        g.add_edge(a, d);
        g.add_edge(b, c);
        g.add_edge(b, d);

        let dec = decompose(&g);
        assert!(!dec.is_series_parallel());
        assert!(dec.roots.len() >= 2);
    }
}

/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Random series-parallel task graph generation.
//!
//! `generate_random_series_parallel_graph` grows a graph one task at a time
//! by splitting a randomly chosen live edge, which keeps the result
//! series-parallel by construction.
//! `generate_random_almost_series_parallel_graph` then adds a handful of
//! topologically-valid cross edges to break that guarantee on purpose.

use std::collections::HashMap;

use rand::Rng;

use crate::task_graph::{EdgeId, SizePropagation, TaskGraph, TaskId};
use crate::topo_sort::{self, GraphElement};
use crate::types::DataSize;

/// A task's complexity/parallelizability/streamability draw.
#[derive(Debug, Clone, Copy)]
pub struct TaskProperties {
    pub complexity: f64,
    pub parallelizability: f64,
    pub streamability: f64,
}

/// Draws task properties the way the reference generator does: complexity
/// and streamability are `ceil(lognormal(2.0, 0.5))`, parallelizability is
/// 100% half the time and uniform over `[0, 100]` otherwise.
#[derive(Debug, Default)]
pub struct TaskPropertyProducer;

impl TaskPropertyProducer {
    pub fn new() -> Self {
        TaskPropertyProducer
    }

    pub fn sample(&self, rng: &mut impl Rng) -> TaskProperties {
        TaskProperties {
            complexity: lognormal(rng, 2.0, 0.5).ceil(),
            parallelizability: if rng.gen_bool(0.5) { 100.0 } else { rng.gen_range(0..=100) as f64 },
            streamability: lognormal(rng, 2.0, 0.5).ceil(),
        }
    }
}

/// `exp(mu + sigma * z)` with `z` a standard normal draw via the Box-Muller
/// transform (no `rand_distr` dependency for a single distribution).
fn lognormal(rng: &mut impl Rng, mu: f64, sigma: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    (mu + sigma * z).exp()
}

/// Edges still reachable through some task's adjacency list. The graph's
/// edge arena keeps deleted edges around for `EdgeId` stability, so a
/// generator walking "the current edges" must filter by liveness rather
/// than iterating `graph.edges()` directly.
fn live_edges(graph: &TaskGraph) -> Vec<EdgeId> {
    graph
        .edges()
        .filter(|&e| {
            let edge = graph.edge(e);
            graph.task(edge.src).out_edges().contains(&e)
        })
        .collect()
}

/// Builds a `size`-task series-parallel graph by repeatedly splitting a
/// randomly chosen live edge with a new task, optionally keeping the split
/// edge itself as a duplicate parallel path (tracked by a live-edge
/// duplicate counter so the same edge can host more than one parallel
/// branch before it is finally consumed).
///
/// `size < 2` degrades to the bare source/sink pair rather than
/// underflowing, unlike the reference generator's unsigned `size - 2`.
pub fn generate_random_series_parallel_graph(size: usize, data_in_mb: DataSize, rng: &mut impl Rng) -> TaskGraph {
    let mut g = TaskGraph::new();
    let src = g.add_node("t0", 1.0, 100.0, 1.0);
    g.set_size_func(src, SizePropagation::Constant(data_in_mb));
    let snk = g.add_node("t1", 1.0, 100.0, 1.0);
    g.set_size_func(snk, SizePropagation::Sink);
    g.add_edge(src, snk);

    let mut duplicate_edges: HashMap<EdgeId, u32> = HashMap::new();
    let producer = TaskPropertyProducer::new();

    for i in 0..size.saturating_sub(2) {
        let edges = live_edges(&g);

        while rng.gen_range(0..3) < 2 {
            let e = edges[rng.gen_range(0..edges.len())];
            *duplicate_edges.entry(e).or_insert(0) += 1;
        }

        let rand_edge = edges[rng.gen_range(0..edges.len())];
        let edge = g.edge(rand_edge);

        let props = producer.sample(rng);
        let new_task = g.add_node(format!("t{}", i + 2), props.complexity, props.parallelizability, props.streamability);
        g.set_size_func(new_task, SizePropagation::Max);
        g.add_edge(edge.src, new_task);
        g.add_edge(new_task, edge.snk);

        match duplicate_edges.get_mut(&rand_edge) {
            Some(count) if *count > 0 => *count -= 1,
            _ => g.delete_edge(rand_edge),
        }
    }

    g
}

/// Generates a series-parallel graph, then adds up to `loose_edges`
/// topologically-valid cross edges between tasks with no existing direct
/// edge, breaking series-parallel structure. Gives up early (keeping
/// whatever edges it already found) once `10 * loose_edges` attempts have
/// been spent searching for a valid pair.
pub fn generate_random_almost_series_parallel_graph(
    size: usize,
    data_in_mb: DataSize,
    loose_edges: usize,
    rng: &mut impl Rng,
) -> TaskGraph {
    let mut g = generate_random_series_parallel_graph(size, data_in_mb, rng);

    let sorting = topo_sort::random(&g, false, rng);
    let tasks: Vec<TaskId> = sorting
        .elements()
        .iter()
        .filter_map(|e| match e {
            GraphElement::Task(t) => Some(*t),
            _ => None,
        })
        .collect();

    if tasks.len() < 2 {
        return g;
    }

    let mut timeout = loose_edges * 10;
    let mut new_edges: Vec<(TaskId, TaskId)> = Vec::new();

    'outer: for _ in 0..loose_edges {
        loop {
            if timeout == 0 {
                break 'outer;
            }
            timeout -= 1;

            let idx1 = rng.gen_range(0..tasks.len());
            let idx2 = rng.gen_range(0..tasks.len());
            if idx1 == idx2 {
                continue;
            }
            let (lo, hi) = if idx1 < idx2 { (idx1, idx2) } else { (idx2, idx1) };
            let from = tasks[lo];
            let to = tasks[hi];

            let already_direct = g.task(from).out_edges().iter().any(|&e| g.edge(e).snk == to);
            let already_staged = new_edges.iter().any(|&(s, d)| s == from && d == to);
            if !already_direct && !already_staged {
                new_edges.push((from, to));
                break;
            }
        }
    }

    for (from, to) in new_edges {
        g.add_edge(from, to);
    }

    g
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sp_decomposition::decompose;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn generated_graph_has_requested_task_count() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let g = generate_random_series_parallel_graph(12, 1.0, &mut rng);
        assert_eq!(g.task_count(), 12);
    }

    #[test]
    fn generated_graph_is_always_series_parallel() {
        for seed in 0..20u64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let g = generate_random_series_parallel_graph(15, 1.0, &mut rng);
            let dec = decompose(&g);
            assert!(dec.is_series_parallel(), "seed {seed} produced a non-SP graph");
        }
    }

    #[test]
    fn same_seed_is_deterministic() {
        let mut rng_a = ChaCha8Rng::seed_from_u64(42);
        let mut rng_b = ChaCha8Rng::seed_from_u64(42);
        let a = generate_random_series_parallel_graph(20, 2.0, &mut rng_a);
        let b = generate_random_series_parallel_graph(20, 2.0, &mut rng_b);
        assert_eq!(a.task_count(), b.task_count());
        assert_eq!(a.edges().count(), b.edges().count());
    }

    #[test]
    fn small_size_degrades_to_source_and_sink_only() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let g = generate_random_series_parallel_graph(1, 1.0, &mut rng);
        assert_eq!(g.task_count(), 2);
    }

    #[test]
    fn almost_sp_graph_keeps_requested_task_count_and_gains_edges() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(7);
        let sp = generate_random_series_parallel_graph(15, 1.0, &mut rng1);
        let sp_edge_count = live_edges(&sp).len();

        let mut rng2 = ChaCha8Rng::seed_from_u64(7);
        let almost = generate_random_almost_series_parallel_graph(15, 1.0, 5, &mut rng2);
        assert_eq!(almost.task_count(), 15);
        assert!(live_edges(&almost).len() >= sp_edge_count);
    }

    #[test]
    fn lognormal_draws_are_positive_and_varied() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let producer = TaskPropertyProducer::new();
        let mut values = Vec::new();
        for _ in 0..50 {
            let props = producer.sample(&mut rng);
            assert!(props.complexity >= 1.0);
            assert!(props.streamability >= 1.0);
            assert!((0.0..=100.0).contains(&props.parallelizability));
            values.push(props.complexity);
        }
        assert!(values.iter().any(|&v| v != values[0]), "draws should not be constant");
    }
}

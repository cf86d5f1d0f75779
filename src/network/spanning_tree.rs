// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Minimum spanning trees over projected settlement points.
//!
//! The tree is computed on a k-nearest-neighbour graph.  With
//! [`SpanningTreeMode::Exact`] every point is a neighbour of every other, with
//! [`SpanningTreeMode::Approximate`] only the 50 nearest are, which keeps large
//! point sets tractable at the cost of an occasionally longer tree.
//!
//! Ties are broken deterministically: each point's neighbours are ranked by
//! `(distance, index)`, and candidate edges are taken in `(length, lower
//! index, higher index)` order.

use std::collections::BTreeSet;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use rayon::prelude::*;

use crate::{Error, SpanningTreeMode};

/// Number of neighbours considered per point in approximate mode.
const APPROXIMATE_NEIGHBOURS: usize = 50;

/// An undirected edge of the spanning tree.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeEdge {
    pub start: (f64, f64),
    pub end: (f64, f64),
    /// Indices of the two points, lower index first.
    pub nodes: (usize, usize),
    pub length: f64,
}

/// Computes the minimum spanning tree of `points`.
///
/// Returns `points.len() - 1` edges.  Fails if fewer than three points are
/// given, or if any coordinate isn't finite.
pub fn spanning_tree(points: &[(f64, f64)], mode: SpanningTreeMode) -> Result<Vec<TreeEdge>, Error> {
    if points.len() < 3 {
        return Err(Error::invalid_input(format!(
            "Need at least 3 points to build a network, got {}.",
            points.len()
        )));
    }
    if let Some(i) = points
        .iter()
        .position(|(x, y)| !x.is_finite() || !y.is_finite())
    {
        return Err(Error::invalid_input(format!(
            "Point {i} has non-finite coordinates: {:?}.",
            points[i]
        )));
    }

    let tree = kruskal(points, neighbour_graph(points, mode));
    if tree.edge_count() + 1 == points.len() {
        return Ok(collect_edges(points, &tree));
    }

    if mode == SpanningTreeMode::Approximate {
        tracing::warn!(
            "Nearest-neighbour graph over {} points is disconnected, falling back to exact mode.",
            points.len()
        );
        return spanning_tree(points, SpanningTreeMode::Exact);
    }

    Err(Error::invalid_input(format!(
        "Points can't be spanned by a single tree: found {} of {} edges.",
        tree.edge_count(),
        points.len() - 1
    )))
}

/// Builds the weighted nearest-neighbour graph, with every edge stored once.
fn neighbour_graph(points: &[(f64, f64)], mode: SpanningTreeMode) -> UnGraph<(), f64> {
    let k = match mode {
        SpanningTreeMode::Exact => points.len() - 1,
        SpanningTreeMode::Approximate => APPROXIMATE_NEIGHBOURS.min(points.len() - 1),
    };

    let pairs: BTreeSet<(usize, usize)> = (0..points.len())
        .into_par_iter()
        .flat_map_iter(|i| {
            let mut others = (0..points.len())
                .filter(|&j| j != i)
                .map(|j| (distance(points[i], points[j]), j))
                .collect::<Vec<_>>();
            let by_distance = |a: &(f64, usize), b: &(f64, usize)| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1));
            if k < others.len() {
                others.select_nth_unstable_by(k, by_distance);
                others.truncate(k);
            }
            others
                .into_iter()
                .map(|(_, j)| (i.min(j), i.max(j)))
                .collect::<Vec<_>>()
        })
        .collect();

    let mut graph = UnGraph::with_capacity(points.len(), pairs.len());
    for _ in points {
        graph.add_node(());
    }
    for (a, b) in pairs {
        graph.add_edge(NodeIndex::new(a), NodeIndex::new(b), distance(points[a], points[b]));
    }
    graph
}

/// Runs Kruskal's algorithm on `graph`, returning the spanning forest.
fn kruskal(points: &[(f64, f64)], graph: UnGraph<(), f64>) -> UnGraph<(), f64> {
    let mut candidates = graph
        .edge_references()
        .map(|e| (*e.weight(), e.source().index(), e.target().index()))
        .collect::<Vec<_>>();
    candidates.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then(a.1.cmp(&b.1))
            .then(a.2.cmp(&b.2))
    });

    let mut sets = UnionFind::new(points.len());
    let mut tree = UnGraph::with_capacity(points.len(), points.len() - 1);
    for _ in points {
        tree.add_node(());
    }
    for (length, a, b) in candidates {
        if sets.union(a, b) {
            tree.add_edge(NodeIndex::new(a), NodeIndex::new(b), length);
            if tree.edge_count() + 1 == points.len() {
                break;
            }
        }
    }
    tree
}

fn collect_edges(points: &[(f64, f64)], tree: &UnGraph<(), f64>) -> Vec<TreeEdge> {
    tree.edge_references()
        .map(|e| {
            let (a, b) = (e.source().index(), e.target().index());
            TreeEdge {
                start: points[a],
                end: points[b],
                nodes: (a, b),
                length: *e.weight(),
            }
        })
        .collect()
}

pub(crate) fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (b.0 - a.0).hypot(b.1 - a.1)
}

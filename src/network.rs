// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! A tree representation of the settlements to be electrified and the
//! candidate line segments between them.

mod creation;
mod retrieval;
mod rooting;
pub mod spanning_tree;
mod traversal;
mod validation;

#[cfg(test)]
pub(crate) mod test_utils;

use serde::Serialize;

use crate::NetworkConfig;

/// A settlement in the network.
///
/// Coordinates are projected meters truncated toward zero, so that arc
/// endpoints and node positions compare exactly.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    /// Position of the node in the network's node list.
    pub id: usize,
    pub x: i64,
    pub y: i64,
    /// Area, in m².
    pub area: f64,
    pub population: f64,
    /// Demand, in kWh per person per month.
    pub demand: f64,
    /// Per-capita GDP index.
    pub gdp: f64,
    /// Fraction of the population already electrified.
    pub coverage: f64,
    /// Electrified before the current run.
    pub conn_start: bool,
    /// Electrified after the current run.
    pub conn_end: bool,
    /// Awaiting off-grid electrification, set by the dynamic simulation.
    pub pending: bool,
    /// Length of the arc leading into this node from the root.
    pub marginal_distance: f64,
    /// Length of the path from the root to this node.
    pub total_distance: f64,
    pub off_grid_cost: f64,
    pub grid_cost: f64,
    #[serde(skip)]
    pub(crate) arcs: Vec<usize>,
}

/// A candidate or existing line segment between two nodes.
///
/// Once the network is rooted, `start` is the node closer to the root.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Arc {
    /// Position of the arc in the network's arc list.
    pub id: usize,
    pub xs: i64,
    pub ys: i64,
    pub xe: i64,
    pub ye: i64,
    pub start: usize,
    pub end: usize,
    /// Length, in meters.
    pub length: f64,
    /// Coincides with infrastructure that is already built.
    pub existing: bool,
    /// Part of the currently proposed network.
    pub enabled: bool,
}

impl Arc {
    /// Returns the endpoint of the arc that isn't `node`.
    pub fn other(&self, node: usize) -> usize {
        if self.start == node {
            self.end
        } else {
            self.start
        }
    }

    /// Swaps the start and the end of the arc.
    pub(crate) fn reverse(&mut self) {
        std::mem::swap(&mut self.start, &mut self.end);
        std::mem::swap(&mut self.xs, &mut self.xe);
        std::mem::swap(&mut self.ys, &mut self.ye);
    }
}

/// The settlements and the spanning tree of candidate lines connecting them,
/// rooted at the power source.
///
/// Nodes and arcs live in two arenas and refer to each other by index.
#[derive(Clone, Debug)]
pub struct Network {
    pub(crate) nodes: Vec<Node>,
    pub(crate) arcs: Vec<Arc>,
    root: usize,
    config: NetworkConfig,
}

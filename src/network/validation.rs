// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for validating the structure and state of a [`Network`].

use petgraph::algo::{connected_components, is_cyclic_undirected};
use petgraph::graph::{NodeIndex, UnGraph};

use crate::Error;

use super::Network;

impl Network {
    /// Validates that the arcs form a single tree, rooted at the root node.
    ///
    /// Checks that:
    /// - there are exactly one fewer arcs than nodes,
    /// - the arcs connect all nodes without cycles,
    /// - the root has no incoming arc and every other node exactly one,
    /// - arc endpoint coordinates match the positions of their nodes.
    pub fn validate_rooted(&self) -> Result<(), Error> {
        if self.arcs.len() + 1 != self.nodes.len() {
            return Err(Error::internal(format!(
                "Expected {} arcs for {} nodes, found {}.",
                self.nodes.len().saturating_sub(1),
                self.nodes.len(),
                self.arcs.len()
            )));
        }

        let mut graph = UnGraph::<(), ()>::with_capacity(self.nodes.len(), self.arcs.len());
        for _ in &self.nodes {
            graph.add_node(());
        }
        for arc in &self.arcs {
            graph.add_edge(NodeIndex::new(arc.start), NodeIndex::new(arc.end), ());
        }
        if is_cyclic_undirected(&graph) || connected_components(&graph) != 1 {
            return Err(Error::internal("Arcs don't form a spanning tree."));
        }

        let mut incoming = vec![0_usize; self.nodes.len()];
        for arc in &self.arcs {
            incoming[arc.end] += 1;
            let (start, end) = (&self.nodes[arc.start], &self.nodes[arc.end]);
            if (arc.xs, arc.ys, arc.xe, arc.ye) != (start.x, start.y, end.x, end.y) {
                return Err(Error::internal(format!(
                    "Arc {} endpoints don't match nodes {} and {}.",
                    arc.id, arc.start, arc.end
                )));
            }
        }
        for (id, count) in incoming.into_iter().enumerate() {
            let expected = usize::from(id != self.root);
            if count != expected {
                return Err(Error::internal(format!(
                    "Node {id} has {count} incoming arcs, expected {expected}."
                )));
            }
        }

        Ok(())
    }

    /// Validates that the enabled arcs form a tree containing the root, and
    /// that the connected nodes are exactly the nodes it reaches.
    pub fn validate_enabled_tree(&self) -> Result<(), Error> {
        let reachable = self.reachable_from_root();

        for (node, reached) in self.nodes.iter().zip(reachable) {
            if node.conn_end != reached {
                return Err(Error::internal(format!(
                    "Node {} is marked {}, but is {}reachable from the root.",
                    node.id,
                    if node.conn_end { "connected" } else { "disconnected" },
                    if reached { "" } else { "not " }
                )));
            }
        }

        if let Some(arc) = self
            .arcs
            .iter()
            .find(|a| a.enabled && !(self.nodes[a.start].conn_end && self.nodes[a.end].conn_end))
        {
            return Err(Error::internal(format!(
                "Arc {} is enabled but touches a disconnected node.",
                arc.id
            )));
        }

        Ok(())
    }
}

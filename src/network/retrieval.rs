// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for retrieving nodes and arcs from a [`Network`].

use crate::{Error, NetworkConfig};

use super::{Arc, Network, Node};

/// `Node` and `Arc` retrieval.
impl Network {
    /// Returns the id of the root node.
    pub fn root(&self) -> usize {
        self.root
    }

    /// Returns the configuration the network was built with.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Returns the node with the given id, if it exists.
    pub fn node(&self, id: usize) -> Result<&Node, Error> {
        self.nodes
            .get(id)
            .ok_or_else(|| Error::invalid_input(format!("Node with id {id} not found.")))
    }

    /// Returns the arc with the given id, if it exists.
    pub fn arc(&self, id: usize) -> Result<&Arc, Error> {
        self.arcs
            .get(id)
            .ok_or_else(|| Error::invalid_input(format!("Arc with id {id} not found.")))
    }

    /// Returns all nodes, indexed by id.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns all arcs, indexed by id.
    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }

    /// Returns an iterator over the arcs touching the given node, in
    /// ascending id order.
    pub fn incident_arcs(&self, id: usize) -> impl Iterator<Item = &Arc> + '_ {
        self.nodes
            .get(id)
            .into_iter()
            .flat_map(|n| n.arcs.iter().map(|&a| &self.arcs[a]))
    }

    /// Returns the arc leading into the given node from the root, or `None`
    /// for the root.
    pub fn incoming_arc(&self, id: usize) -> Option<&Arc> {
        self.incident_arcs(id).find(|a| a.end == id)
    }

    /// Returns an iterator over the arcs leading away from the root out of
    /// the given node.
    pub fn outgoing_arcs(&self, id: usize) -> impl Iterator<Item = &Arc> + '_ {
        self.incident_arcs(id).filter(move |a| a.start == id)
    }

    /// Returns the total length of the enabled arcs.
    pub fn enabled_length(&self) -> f64 {
        self.arcs.iter().filter(|a| a.enabled).map(|a| a.length).sum()
    }
}

// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module contains methods that help with network traversal.

use super::{Arc, Network};

/// Traversal methods.
impl Network {
    /// Returns the ids of the nodes reachable from `from` by following arcs
    /// away from the root, restricted to arcs accepted by `follow`.
    ///
    /// Nodes are returned in pre-order, with children visited in ascending arc
    /// id order, so every node comes after its parent.
    pub fn downstream(&self, from: usize, mut follow: impl FnMut(&Arc) -> bool) -> Vec<usize> {
        if from >= self.nodes.len() {
            return vec![];
        }

        let mut stack = vec![from];
        let mut found = vec![];
        while let Some(index) = stack.pop() {
            found.push(index);
            let children = self
                .outgoing_arcs(index)
                .filter(|a| follow(*a))
                .map(|a| a.end)
                .collect::<Vec<_>>();
            stack.extend(children.into_iter().rev());
        }

        found
    }

    /// Returns, for every node, whether it can be reached from the root over
    /// enabled arcs.
    pub fn reachable_from_root(&self) -> Vec<bool> {
        let mut reachable = vec![false; self.nodes.len()];
        for id in self.downstream(self.root, |a| a.enabled) {
            reachable[id] = true;
        }
        reachable
    }
}

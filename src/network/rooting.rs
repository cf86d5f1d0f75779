// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Orienting the arcs of a [`Network`] away from its root.

use crate::Error;

use super::Network;

impl Network {
    /// Roots the network at the node with the given `root` id.
    ///
    /// Every arc is oriented so that its start is the endpoint closer to the
    /// root, and every node's `marginal_distance` and `total_distance` are
    /// updated.  Arcs are matched to nodes by node id, so settlements sharing
    /// a position are never confused with each other.
    ///
    /// Returns an error if some nodes can't be reached from the root, or if
    /// the tree is deeper than the configured `max_depth`.
    pub fn root_at(&mut self, root: usize) -> Result<(), Error> {
        if root >= self.nodes.len() {
            return Err(Error::invalid_input(format!(
                "Root {root} is not a node of the network."
            )));
        }

        // Oriented into copies, so that a failure leaves the network as it was.
        let mut arcs = self.arcs.clone();
        let mut distances = vec![(0.0, 0.0); self.nodes.len()];
        let mut visited = vec![false; self.nodes.len()];

        visited[root] = true;
        let mut stack = vec![(root, None, 0_usize)];
        while let Some((index, prev, depth)) = stack.pop() {
            if depth > self.config.max_depth {
                return Err(Error::recursion_limit(format!(
                    "Node {index} is deeper than the maximum depth of {}.",
                    self.config.max_depth
                )));
            }

            // Pushed in reverse, so that children are visited in ascending
            // arc id order.
            for &arc_id in self.nodes[index].arcs.iter().rev() {
                if Some(arc_id) == prev {
                    continue;
                }
                let arc = &mut arcs[arc_id];
                if arc.start != index {
                    arc.reverse();
                }
                let (next, length) = (arc.end, arc.length);

                if visited[next] {
                    return Err(Error::invalid_input(format!(
                        "Cycle detected through arc {arc_id} between nodes {index} and {next}."
                    )));
                }
                visited[next] = true;

                distances[next] = (length, distances[index].1 + length);
                stack.push((next, Some(arc_id), depth + 1));
            }
        }

        let unvisited = visited
            .iter()
            .enumerate()
            .filter(|(_, v)| !**v)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        if !unvisited.is_empty() {
            return Err(Error::invalid_input(format!(
                "Nodes {:?} are not connected to the root.",
                unvisited
            )));
        }

        self.arcs = arcs;
        for (node, (marginal, total)) in self.nodes.iter_mut().zip(distances) {
            node.marginal_distance = marginal;
            node.total_distance = total;
        }
        self.root = root;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::test_utils::{cross, line, TestSettlement};
    use crate::NetworkConfig;

    #[test]
    fn test_rooting_orients_arcs() -> Result<(), Error> {
        let mut network = Network::try_new(cross(1.0), NetworkConfig::default())?;

        for root in 0..network.nodes().len() {
            network.root_at(root)?;
            network.validate_rooted()?;
            assert_eq!(network.root(), root);

            let root_node = network.node(root)?;
            assert_eq!(root_node.marginal_distance, 0.0);
            assert!(network.incoming_arc(root).is_none());
            for node in network.nodes().iter().filter(|n| n.id != root) {
                let incoming = network
                    .arcs()
                    .iter()
                    .filter(|a| a.end == node.id)
                    .collect::<Vec<_>>();
                assert_eq!(incoming.len(), 1);
                assert_eq!(node.marginal_distance, incoming[0].length);
                let parent = network.node(incoming[0].start)?;
                assert_eq!(
                    node.total_distance,
                    parent.total_distance + node.marginal_distance
                );
            }
        }

        // From the 300 m arm, the 100 m arms are 400 m away.
        network.root_at(4)?;
        assert_eq!(network.node(1)?.total_distance, 400.0);
        assert_eq!(network.node(3)?.total_distance, 500.0);
        Ok(())
    }

    #[test]
    fn test_coincident_settlements() -> Result<(), Error> {
        let settlements = vec![
            TestSettlement::new(0.0, 0.0),
            TestSettlement::new(10.0, 0.0),
            TestSettlement::new(10.0, 0.0),
            TestSettlement::new(20.0, 0.0),
        ];
        let network = Network::try_new(settlements, NetworkConfig::default())?;
        network.validate_rooted()?;
        assert_eq!(network.node(2)?.marginal_distance, 0.0);
        assert_eq!(network.node(3)?.total_distance, 20.0);
        Ok(())
    }

    #[test]
    fn test_depth_limit() -> Result<(), Error> {
        let config = NetworkConfig {
            max_depth: 5,
            ..Default::default()
        };
        assert!(Network::try_new(line(6, 10.0, 1.0), config.clone()).is_ok());
        assert!(
            Network::try_new(line(8, 10.0, 1.0), config).is_err_and(|e| e
                == Error::recursion_limit("Node 6 is deeper than the maximum depth of 5."))
        );
        Ok(())
    }

    #[test]
    fn test_failed_rerooting_keeps_the_network() -> Result<(), Error> {
        // 3 deep from the middle settlement, 6 deep from the end.
        let settlements = [3000.0, 0.0, 1000.0, 2000.0, 4000.0, 5000.0, 6000.0]
            .into_iter()
            .map(|x| TestSettlement::new(x, 0.0));
        let config = NetworkConfig {
            max_depth: 3,
            ..Default::default()
        };
        let mut network = Network::try_new(settlements, config)?;
        let nodes = network.nodes().to_vec();
        let arcs = network.arcs().to_vec();

        assert!(network
            .root_at(1)
            .is_err_and(|e| e.kind() == crate::ErrorKind::RecursionLimit));
        assert_eq!(network.root(), 0);
        assert_eq!(network.nodes(), nodes.as_slice());
        assert_eq!(network.arcs(), arcs.as_slice());
        network.validate_rooted()?;
        Ok(())
    }

    #[test]
    fn test_long_chain_does_not_overflow() -> Result<(), Error> {
        let network = Network::try_new(line(10_000, 10.0, 1.0), NetworkConfig::default())?;
        assert_eq!(network.node(9_999)?.total_distance, 99_990.0);
        Ok(())
    }

    #[test]
    fn test_invalid_root() -> Result<(), Error> {
        let mut network = Network::try_new(cross(1.0), NetworkConfig::default())?;
        assert!(network
            .root_at(5)
            .is_err_and(|e| e == Error::invalid_input("Root 5 is not a node of the network.")));
        assert_eq!(network.root(), 0);
        Ok(())
    }

    #[test]
    fn test_disconnected_arcs_are_rejected() -> Result<(), Error> {
        let mut network = Network::try_new(cross(1.0), NetworkConfig::default())?;
        let removed = network.arcs[3].clone();
        network.nodes[removed.start].arcs.retain(|&a| a != 3);
        network.nodes[removed.end].arcs.retain(|&a| a != 3);

        assert!(network.root_at(0).is_err_and(|e| e
            == Error::invalid_input(format!(
                "Nodes [{}] are not connected to the root.",
                removed.end
            ))));
        Ok(())
    }
}

// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Methods for creating [`Network`] instances from given settlements.

use crate::{Error, NetworkConfig, Settlement};

use super::spanning_tree::{distance, spanning_tree};
use super::{Arc, Network, Node};

/// `Network` instantiation.
impl Network {
    /// Creates a new [`Network`] connecting the given settlements with a
    /// minimum spanning tree, rooted at the origin from the config, or at the
    /// first settlement if no origin is given.
    ///
    /// Returns an error if the settlements can't form a network.
    pub fn try_new<S: Settlement, I: IntoIterator<Item = S>>(
        settlements: I,
        config: NetworkConfig,
    ) -> Result<Self, Error> {
        if !(config.min_arc_length.is_finite() && config.min_arc_length > 0.0) {
            return Err(Error::numeric_degeneracy(format!(
                "min_arc_length must be positive and finite, got {}.",
                config.min_arc_length
            )));
        }

        let (mut nodes, points) = Self::create_nodes(settlements, &config)?;
        let arcs = Self::create_arcs(&mut nodes, &points, &config)?;

        let mut network = Self {
            nodes,
            arcs,
            root: 0,
            config,
        };
        network.root_at(0)?;

        tracing::debug!(
            "Created network with {} nodes and {} arcs.",
            network.nodes.len(),
            network.arcs.len()
        );

        Ok(network)
    }

    fn create_nodes<S: Settlement>(
        settlements: impl IntoIterator<Item = S>,
        config: &NetworkConfig,
    ) -> Result<(Vec<Node>, Vec<(f64, f64)>), Error> {
        let mut nodes = Vec::new();
        let mut points = Vec::new();

        if let Some((x, y)) = config.origin {
            nodes.push(Node::new(0, (x, y), 0.0, 0.0, 0.0, 1.0, true, 1.0));
            points.push((x, y));
        }

        for settlement in settlements {
            let id = nodes.len();
            let point = (settlement.x(), settlement.y());
            if !point.0.is_finite() || !point.1.is_finite() {
                return Err(Error::invalid_input(format!(
                    "Settlement {id} has non-finite coordinates: {point:?}."
                )));
            }
            for (name, value) in [
                ("area", settlement.area()),
                ("population", settlement.population()),
                ("demand", settlement.demand()),
                ("gdp", settlement.gdp()),
            ] {
                if !value.is_finite() || value < 0.0 {
                    return Err(Error::invalid_input(format!(
                        "Settlement {id} has invalid {name}: {value}."
                    )));
                }
            }
            let coverage = settlement.coverage();
            if !(0.0..=1.0).contains(&coverage) {
                return Err(Error::invalid_input(format!(
                    "Settlement {id} has coverage outside [0, 1]: {coverage}."
                )));
            }

            nodes.push(Node::new(
                id,
                point,
                settlement.area(),
                settlement.population(),
                settlement.demand(),
                settlement.gdp(),
                settlement.conn_start(),
                coverage,
            ));
            points.push(point);
        }

        Ok((nodes, points))
    }

    fn create_arcs(
        nodes: &mut [Node],
        points: &[(f64, f64)],
        config: &NetworkConfig,
    ) -> Result<Vec<Arc>, Error> {
        let edges = spanning_tree(points, config.spanning_tree)?;

        let mut arcs = Vec::with_capacity(edges.len());
        for (id, edge) in edges.into_iter().enumerate() {
            let (start, end) = edge.nodes;
            let (xs, ys) = (nodes[start].x, nodes[start].y);
            let (xe, ye) = (nodes[end].x, nodes[end].y);

            let existing =
                config.existing_network && nodes[start].conn_start && nodes[end].conn_start;

            nodes[start].arcs.push(id);
            nodes[end].arcs.push(id);
            arcs.push(Arc {
                id,
                xs,
                ys,
                xe,
                ye,
                start,
                end,
                length: distance((xs as f64, ys as f64), (xe as f64, ye as f64)),
                existing,
                enabled: existing || !config.existing_network,
            });
        }

        Ok(arcs)
    }
}

impl Node {
    #[allow(clippy::too_many_arguments)]
    fn new(
        id: usize,
        (x, y): (f64, f64),
        area: f64,
        population: f64,
        demand: f64,
        gdp: f64,
        conn_start: bool,
        coverage: f64,
    ) -> Self {
        Self {
            id,
            // Truncation toward zero is intended: positions are whole meters.
            x: x as i64,
            y: y as i64,
            area,
            population,
            demand,
            gdp,
            coverage,
            conn_start,
            conn_end: conn_start,
            pending: false,
            marginal_distance: 0.0,
            total_distance: 0.0,
            off_grid_cost: 0.0,
            grid_cost: 0.0,
            arcs: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::test_utils::{cross, TestSettlement};
    use crate::SpanningTreeMode;

    #[test]
    fn test_settlement_validation() {
        let config = NetworkConfig::default();
        let mut settlements = cross(10.0);

        assert!(Network::try_new(settlements.clone(), config.clone()).is_ok());

        settlements.push(TestSettlement::new(5.0, f64::INFINITY));
        assert!(
            Network::try_new(settlements.clone(), config.clone()).is_err_and(|e| e
                == Error::invalid_input("Settlement 5 has non-finite coordinates: (5.0, inf)."))
        );

        settlements.pop();
        settlements.push(TestSettlement::new(5.0, 5.0).population(-1.0));
        assert!(Network::try_new(settlements.clone(), config.clone())
            .is_err_and(|e| e == Error::invalid_input("Settlement 5 has invalid population: -1.")));

        settlements.truncate(2);
        assert!(Network::try_new(settlements.clone(), config.clone()).is_err_and(
            |e| e == Error::invalid_input("Need at least 3 points to build a network, got 2.")
        ));

        let config = NetworkConfig {
            min_arc_length: 0.0,
            ..Default::default()
        };
        assert!(Network::try_new(cross(1.0), config).is_err_and(|e| e
            == Error::numeric_degeneracy("min_arc_length must be positive and finite, got 0.")));
    }

    #[test]
    fn test_coordinates_are_truncated() -> Result<(), Error> {
        let settlements = vec![
            TestSettlement::new(0.9, 0.2),
            TestSettlement::new(3.7, -0.5),
            TestSettlement::new(-2.9, 4.99),
        ];
        let network = Network::try_new(settlements, NetworkConfig::default())?;

        let positions = network.nodes().iter().map(|n| (n.x, n.y)).collect::<Vec<_>>();
        assert_eq!(positions, vec![(0, 0), (3, 0), (-2, 4)]);
        for arc in network.arcs() {
            let start = network.node(arc.start)?;
            let end = network.node(arc.end)?;
            assert_eq!((arc.xs, arc.ys), (start.x, start.y));
            assert_eq!((arc.xe, arc.ye), (end.x, end.y));
        }
        // Lengths are measured between the truncated positions.
        let length = network.arcs().iter().map(|a| a.length).sum::<f64>();
        assert!((length - (3.0 + 20.0_f64.sqrt())).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_origin_is_prepended() -> Result<(), Error> {
        let config = NetworkConfig {
            origin: Some((50.0, 50.0)),
            spanning_tree: SpanningTreeMode::Exact,
            ..Default::default()
        };
        let network = Network::try_new(cross(10.0), config)?;

        assert_eq!(network.nodes().len(), 6);
        assert_eq!(network.arcs().len(), 5);
        assert_eq!(network.root(), 0);

        let origin = network.node(0)?;
        assert_eq!((origin.x, origin.y), (50, 50));
        assert_eq!(origin.area, 0.0);
        assert_eq!(origin.population, 0.0);
        assert!(origin.conn_start);
        assert_eq!(network.node(1)?.population, 0.0);
        assert_eq!(network.node(2)?.population, 10.0);
        Ok(())
    }

    #[test]
    fn test_existing_network() -> Result<(), Error> {
        let settlements = vec![
            TestSettlement::new(0.0, 0.0).connected(),
            TestSettlement::new(100.0, 0.0).connected(),
            TestSettlement::new(200.0, 0.0),
            TestSettlement::new(300.0, 0.0),
        ];

        let network = Network::try_new(settlements.clone(), NetworkConfig::default())?;
        assert!(network.arcs().iter().all(|a| a.enabled && !a.existing));

        let config = NetworkConfig {
            existing_network: true,
            ..Default::default()
        };
        let network = Network::try_new(settlements, config)?;
        let flags = network
            .arcs()
            .iter()
            .map(|a| (a.start, a.end, a.existing, a.enabled))
            .collect::<Vec<_>>();
        assert_eq!(
            flags,
            vec![
                (0, 1, true, true),
                (1, 2, false, false),
                (2, 3, false, false)
            ]
        );
        assert!(network.node(1)?.conn_end);
        assert!(!network.node(2)?.conn_end);
        Ok(())
    }
}

// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Grid extension over several time steps.
//!
//! Each step extends the grid, lets population, GDP and demand grow over the
//! step's span, and then holds adoption to the step's target by giving up the
//! least cost-effective new connections.  The state at the end of a step is
//! the existing network of the next one.

use serde::{Deserialize, Serialize};

use crate::{Arc, Error, Network, Node};

use super::{NationalOptimizer, NationalSummary, NodeStatus};

/// A single time step.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StepSpec {
    /// Length of the step, in years.
    pub years: u32,
    /// Largest share of the population that may be grid-connected at the end
    /// of the step.
    pub target_adoption: f64,
}

/// Parameters of a multi-step simulation.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct DynamicParams {
    pub steps: Vec<StepSpec>,
    /// Annual population growth rate.
    pub population_growth: f64,
    /// Annual per-capita GDP growth rate.
    pub gdp_growth: f64,
    /// Elasticity of demand per person with respect to per-capita GDP.
    pub demand_elasticity: f64,
    /// Share of the off-grid settlements promoted to pending at the end of
    /// each step, cheapest first.
    pub pending_quantile: f64,
}

impl Default for DynamicParams {
    fn default() -> Self {
        Self {
            steps: vec![],
            population_growth: 0.02,
            gdp_growth: 0.03,
            demand_elasticity: 0.5,
            pending_quantile: 0.1,
        }
    }
}

/// The state of the network at the end of a step.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Snapshot {
    /// Index of the step, starting at 0.
    pub step: usize,
    /// Years elapsed since the start of the simulation.
    pub year: u32,
    pub nodes: Vec<Node>,
    pub arcs: Vec<Arc>,
    /// Status of every node, relative to the start of the step.
    pub statuses: Vec<NodeStatus>,
    /// Share of the population that is grid-connected.
    pub adoption: f64,
    pub summary: NationalSummary,
}

/// Runs a [`NationalOptimizer`] over a sequence of [`StepSpec`]s.
#[derive(Clone, Debug)]
pub struct DynamicOptimizer {
    national: NationalOptimizer,
    params: DynamicParams,
}

impl DynamicOptimizer {
    /// Creates a new [`DynamicOptimizer`], after validating the parameters.
    pub fn try_new(national: NationalOptimizer, params: DynamicParams) -> Result<Self, Error> {
        for (name, rate) in [
            ("population_growth", params.population_growth),
            ("gdp_growth", params.gdp_growth),
        ] {
            if !(rate.is_finite() && rate > -1.0) {
                return Err(Error::invalid_input(format!(
                    "{name} must be finite and greater than -1, got {rate}."
                )));
            }
        }
        if !params.demand_elasticity.is_finite() {
            return Err(Error::invalid_input(format!(
                "demand_elasticity must be finite, got {}.",
                params.demand_elasticity
            )));
        }
        let shares = params
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| (format!("target_adoption of step {i}"), s.target_adoption))
            .chain([("pending_quantile".to_string(), params.pending_quantile)]);
        for (name, share) in shares {
            if !(0.0..=1.0).contains(&share) {
                return Err(Error::invalid_input(format!(
                    "{name} must be between 0 and 1, got {share}."
                )));
            }
        }

        Ok(Self { national, params })
    }

    pub fn params(&self) -> &DynamicParams {
        &self.params
    }

    /// Runs every step on the network in place, and returns the state at the
    /// end of each step.
    pub fn run(&self, network: &mut Network) -> Result<Vec<Snapshot>, Error> {
        let mut snapshots = Vec::with_capacity(self.params.steps.len());
        let mut year: u32 = 0;

        for (step, spec) in self.params.steps.iter().enumerate() {
            self.national.optimize(network)?;
            self.grow(network, spec.years);
            let pruned = self.prune(network, spec.target_adoption);
            self.national.assign_off_grid_costs(network);
            let promoted = self.promote_pending(network);

            year = year.saturating_add(spec.years);
            let snapshot = Snapshot {
                step,
                year,
                nodes: network.nodes().to_vec(),
                arcs: network.arcs().to_vec(),
                statuses: network.nodes().iter().map(NodeStatus::of).collect(),
                adoption: adoption(network),
                summary: self.national.summary(network),
            };
            tracing::info!(
                "Step {step} (year {year}): adoption {:.3}, {pruned} connections pruned, \
                 {promoted} settlements pending.",
                snapshot.adoption
            );
            snapshots.push(snapshot);

            for node in network.nodes.iter_mut() {
                node.conn_start = node.conn_end;
            }
            for arc in network.arcs.iter_mut() {
                arc.existing |= arc.enabled;
            }
        }

        Ok(snapshots)
    }

    fn grow(&self, network: &mut Network, years: u32) {
        let years = f64::from(years);
        let population = (1.0 + self.params.population_growth).powf(years);
        let gdp = (1.0 + self.params.gdp_growth).powf(years);
        let demand = gdp.powf(self.params.demand_elasticity);

        for node in network.nodes.iter_mut() {
            node.population *= population;
            node.gdp *= gdp;
            node.demand *= demand;
        }
    }

    /// Disconnects newly connected leaves, highest grid cost per person first,
    /// while adoption exceeds `target`.  Returns the number of disconnected
    /// nodes.
    fn prune(&self, network: &mut Network, target: f64) -> usize {
        let mut pruned = 0;

        while adoption(network) > target {
            let leaf = network
                .nodes()
                .iter()
                .filter(|n| n.conn_end && !n.conn_start)
                .filter_map(|n| {
                    let mut enabled = network.incident_arcs(n.id).filter(|a| a.enabled);
                    match (enabled.next(), enabled.next()) {
                        (Some(arc), None) => Some((n.id, arc.id, cost_per_person(n.grid_cost, n))),
                        _ => None,
                    }
                })
                .fold(None, |best: Option<(usize, usize, f64)>, leaf| match best {
                    Some(b) if b.2 >= leaf.2 => Some(b),
                    _ => Some(leaf),
                });
            let Some((node_id, arc_id, _)) = leaf else {
                tracing::debug!("No more leaves to prune, adoption stays above {target}.");
                break;
            };

            network.arcs[arc_id].enabled = false;
            let node = &mut network.nodes[node_id];
            node.conn_end = false;
            node.grid_cost = 0.0;
            pruned += 1;
        }

        pruned
    }

    /// Marks the cheapest share of the off-grid nodes as pending, by off-grid
    /// cost per person.  Returns the number of newly pending nodes.
    fn promote_pending(&self, network: &mut Network) -> usize {
        let mut off_grid = network
            .nodes()
            .iter()
            .filter(|n| !n.conn_end)
            .map(|n| (cost_per_person(n.off_grid_cost, n), n.id))
            .collect::<Vec<_>>();
        let count = (self.params.pending_quantile * off_grid.len() as f64).floor() as usize;
        off_grid.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut promoted = 0;
        for &(_, id) in off_grid.iter().take(count) {
            let node = &mut network.nodes[id];
            if !node.pending {
                node.pending = true;
                promoted += 1;
            }
        }
        promoted
    }
}

fn cost_per_person(cost: f64, node: &Node) -> f64 {
    if node.population > 0.0 {
        cost / node.population
    } else {
        f64::INFINITY
    }
}

/// Share of the population that is grid-connected.
fn adoption(network: &Network) -> f64 {
    let (connected, total) = network
        .nodes()
        .iter()
        .fold((0.0, 0.0), |(connected, total), n| {
            let connected = if n.conn_end { connected + n.population } else { connected };
            (connected, total + n.population)
        });
    if total > 0.0 {
        connected / total
    } else {
        0.0
    }
}

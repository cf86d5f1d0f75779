// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Greedy extension of a national grid from the settlements that are
//! already connected.
//!
//! Every pass looks past each disabled arc on the edge of the connected
//! territory for the densest branch of unconnected settlements, and queues
//! the branch if connecting it to the grid is cheaper than serving its
//! settlements off-grid.  All queued branches are connected at the end of the
//! pass, and passes repeat until one connects nothing.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::sizing::{size_low_voltage, LvParams};
use crate::{Error, Network, Node};

use super::{ensure_non_negative, ensure_within_budget};

/// What a branch's density is measured in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityWeight {
    /// People per meter of line.
    #[default]
    Population,
    /// Monthly kWh per meter of line.
    Demand,
}

/// Cost coefficients of grid extension and off-grid supply.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct NationalParams {
    /// Peak demand per person, in kW.
    pub demand_per_person_kw_peak: f64,
    /// Off-grid generator cost, per kW.
    pub mg_gen_cost: f64,
    /// Off-grid distribution line cost, per meter.
    pub mg_lv_cost: f64,
    /// Grid medium-voltage line cost, per meter.
    pub grid_mv_cost: f64,
    /// Grid low-voltage line cost, per meter.
    pub grid_lv_cost: f64,
    /// Cost of a distribution transformer.
    pub transformer_cost: f64,
    /// Cost of a household connection.
    pub connection_cost: f64,
    /// Low-voltage sizing model.
    pub lv: LvParams,
    /// What branch density is measured in.
    pub density_weight: DensityWeight,
}

impl Default for NationalParams {
    fn default() -> Self {
        Self {
            demand_per_person_kw_peak: 0.05,
            mg_gen_cost: 4000.0,
            mg_lv_cost: 10.0,
            grid_mv_cost: 50.0,
            grid_lv_cost: 10.0,
            transformer_cost: 5000.0,
            connection_cost: 125.0,
            lv: LvParams::default(),
            density_weight: DensityWeight::default(),
        }
    }
}

/// How a settlement is served after a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NodeStatus {
    /// Was already connected, and still is.
    Original,
    /// Newly connected to the grid.
    New,
    /// Not connected, and queued for off-grid supply.
    Pending,
    /// Not connected.
    OffGrid,
}

impl NodeStatus {
    pub fn of(node: &Node) -> Self {
        match (node.conn_start, node.conn_end) {
            (true, true) => Self::Original,
            (false, true) => Self::New,
            _ if node.pending => Self::Pending,
            _ => Self::OffGrid,
        }
    }
}

/// A branch of settlements connected to the grid by a single commit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Extension {
    /// The pass that connected the branch, starting at 1.
    pub pass: usize,
    /// The settlements, from the one nearest the grid outwards.
    pub nodes: Vec<usize>,
    /// The arcs, `arcs[i]` leading into `nodes[i]`.
    pub arcs: Vec<usize>,
    /// Weight per meter of line.
    pub density: f64,
    /// Cost of connecting the branch to the grid.
    pub grid_cost: f64,
    /// Total off-grid cost of the branch's settlements.
    pub off_grid_cost: f64,
}

/// Summary figures of a national plan.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NationalSummary {
    /// Settlements newly connected to the grid.
    pub new_conn: usize,
    /// Settlements left off-grid.
    pub new_og: usize,
    /// Off-grid cost of the off-grid settlements, plus the cost of the new
    /// lines and of the newly connected settlements' local networks.
    pub total_cost: f64,
    pub model_pop: f64,
    /// Already electrified population of the originally connected
    /// settlements.
    pub orig_conn_pop: f64,
    pub new_conn_pop: f64,
    pub new_og_pop: f64,
}

/// The outcome of a [`NationalOptimizer`] run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NationalReport {
    pub extensions: Vec<Extension>,
    /// Passes made, including the final one that connected nothing.
    pub passes: usize,
    pub summary: NationalSummary,
}

/// Per-settlement costs of the two ways of supplying it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct NodeCosts {
    pub(crate) off_grid: f64,
    /// Grid cost inside the settlement, excluding the line that reaches it.
    pub(crate) grid_local: f64,
}

/// Extends the grid where that is cheaper than off-grid supply.
#[derive(Clone, Debug)]
pub struct NationalOptimizer {
    params: NationalParams,
}

impl NationalOptimizer {
    /// Creates a new [`NationalOptimizer`], after validating the parameters.
    pub fn try_new(params: NationalParams) -> Result<Self, Error> {
        for (name, value) in [
            ("demand_per_person_kw_peak", params.demand_per_person_kw_peak),
            ("mg_gen_cost", params.mg_gen_cost),
            ("mg_lv_cost", params.mg_lv_cost),
            ("grid_mv_cost", params.grid_mv_cost),
            ("grid_lv_cost", params.grid_lv_cost),
            ("transformer_cost", params.transformer_cost),
            ("connection_cost", params.connection_cost),
        ] {
            ensure_non_negative(name, value)?;
        }
        params.lv.validate()?;

        Ok(Self { params })
    }

    pub fn params(&self) -> &NationalParams {
        &self.params
    }

    /// Extends the grid in place until no further extension pays off.
    pub fn optimize(&self, network: &mut Network) -> Result<NationalReport, Error> {
        let costs = self.assign_off_grid_costs(network);
        let max_iterations = network.config().max_iterations;

        let mut extensions = vec![];
        let mut pass = 0;
        loop {
            pass += 1;
            ensure_within_budget("Grid extension", pass, max_iterations)?;

            let queued = self.plan_pass(network, &costs)?;
            tracing::debug!("Pass {pass}: connecting {} branches.", queued.len());
            if queued.is_empty() {
                break;
            }

            for branch in queued {
                self.commit(network, &costs, &branch);
                extensions.push(Extension { pass, ..branch });
            }
        }

        let summary = self.summary(network);
        tracing::info!(
            "Grid extension connected {} settlements in {pass} passes, leaving {} off-grid.",
            summary.new_conn,
            summary.new_og
        );

        Ok(NationalReport {
            extensions,
            passes: pass,
            summary,
        })
    }

    /// Computes the off-grid cost of every settlement that isn't connected at
    /// the start, and returns the costs of every settlement.
    ///
    /// Settlements connected at the start are marked as connected at the end
    /// too, and arcs touching a settlement that isn't connected are disabled.
    pub(crate) fn assign_off_grid_costs(&self, network: &mut Network) -> Vec<NodeCosts> {
        let costs = network
            .nodes()
            .iter()
            .map(|n| self.node_costs(n))
            .collect::<Vec<_>>();
        for (node, cost) in network.nodes.iter_mut().zip(&costs) {
            if node.conn_start {
                node.conn_end = true;
            } else {
                node.off_grid_cost = cost.off_grid;
            }
        }

        let stranded = network
            .arcs()
            .iter()
            .filter(|a| {
                a.enabled && !(network.nodes[a.start].conn_end && network.nodes[a.end].conn_end)
            })
            .map(|a| a.id)
            .collect::<Vec<_>>();
        for id in stranded {
            network.arcs[id].enabled = false;
        }
        costs
    }

    pub(crate) fn node_costs(&self, node: &Node) -> NodeCosts {
        let p = &self.params;
        let sizing = size_low_voltage(node.population, node.demand, node.area, &p.lv);
        let connections = p.connection_cost * sizing.households;

        NodeCosts {
            off_grid: node.population * p.demand_per_person_kw_peak * p.mg_gen_cost
                + sizing.lv_length * p.mg_lv_cost
                + connections,
            grid_local: sizing.mv_length * p.grid_mv_cost
                + sizing.lv_length * p.grid_lv_cost
                + f64::from(sizing.transformers) * p.transformer_cost
                + connections,
        }
    }

    /// Searches past every frontier arc, and returns the branches worth
    /// connecting.  Of two overlapping branches only the denser is kept; on
    /// equal density, the one found first.
    fn plan_pass(&self, network: &Network, costs: &[NodeCosts]) -> Result<Vec<Extension>, Error> {
        let frontier = network
            .nodes()
            .iter()
            .filter(|n| n.conn_end)
            .flat_map(|n| {
                network
                    .incident_arcs(n.id)
                    .filter(|a| !a.enabled)
                    .map(move |a| (n.id, a.id))
            })
            .collect::<Vec<_>>();

        let candidates = frontier
            .par_iter()
            .map(|&(from, arc)| self.densest_branch(network, costs, from, arc))
            .collect::<Result<Vec<_>, Error>>()?;

        let mut queued: Vec<Extension> = vec![];
        for branch in candidates.into_iter().flatten() {
            if branch.grid_cost >= branch.off_grid_cost {
                continue;
            }
            let overlapping = queued
                .iter()
                .enumerate()
                .filter(|(_, q)| q.nodes.iter().any(|n| branch.nodes.contains(n)))
                .map(|(i, _)| i)
                .collect::<Vec<_>>();
            if overlapping.iter().all(|&i| branch.density > queued[i].density) {
                for i in overlapping.into_iter().rev() {
                    queued.remove(i);
                }
                queued.push(branch);
            }
        }

        Ok(queued)
    }

    /// Finds the path of unconnected settlements past the frontier arc
    /// `arc_id` with the highest weight per meter of line.
    ///
    /// Paths are explored in pre-order, children in ascending arc id order,
    /// and a path replaces the best one only if it is strictly denser.
    fn densest_branch(
        &self,
        network: &Network,
        costs: &[NodeCosts],
        from: usize,
        arc_id: usize,
    ) -> Result<Option<Extension>, Error> {
        let nodes = network.nodes();
        let arcs = network.arcs();
        let min_length = network.config().min_arc_length;
        let max_depth = network.config().max_depth;

        let first = arcs[arc_id].other(from);
        if nodes[first].conn_end {
            return Ok(None);
        }

        let mut parents: HashMap<usize, (usize, usize)> = HashMap::new();
        let mut best: Option<(f64, usize)> = None;
        let mut stack = vec![(
            first,
            arc_id,
            self.weight(&nodes[first]),
            arcs[arc_id].length.max(min_length),
            1_usize,
        )];

        while let Some((index, via, weight, length, depth)) = stack.pop() {
            if depth > max_depth {
                return Err(Error::recursion_limit(format!(
                    "Branch search from node {from} is deeper than the maximum depth of {max_depth}."
                )));
            }

            let density = weight / length;
            if density > best.map_or(0.0, |(d, _)| d) {
                best = Some((density, index));
            }

            let children = network
                .incident_arcs(index)
                .filter(|a| !a.enabled && a.id != via && !nodes[a.other(index)].conn_end)
                .map(|a| (a.other(index), a.id, a.length))
                .collect::<Vec<_>>();
            for (next, next_arc, next_length) in children.into_iter().rev() {
                parents.insert(next, (index, next_arc));
                stack.push((
                    next,
                    next_arc,
                    weight + self.weight(&nodes[next]),
                    length + next_length.max(min_length),
                    depth + 1,
                ));
            }
        }

        let Some((density, last)) = best else {
            return Ok(None);
        };

        let mut branch_nodes = vec![last];
        let mut branch_arcs = vec![];
        let mut current = last;
        while let Some(&(parent, arc)) = parents.get(&current) {
            branch_arcs.push(arc);
            branch_nodes.push(parent);
            current = parent;
        }
        branch_arcs.push(arc_id);
        branch_nodes.reverse();
        branch_arcs.reverse();

        let line_length = branch_arcs.iter().map(|&a| arcs[a].length).sum::<f64>();
        let grid_cost = self.params.grid_mv_cost * line_length
            + branch_nodes.iter().map(|&n| costs[n].grid_local).sum::<f64>();
        let off_grid_cost = branch_nodes.iter().map(|&n| nodes[n].off_grid_cost).sum();

        Ok(Some(Extension {
            pass: 0,
            nodes: branch_nodes,
            arcs: branch_arcs,
            density,
            grid_cost,
            off_grid_cost,
        }))
    }

    fn commit(&self, network: &mut Network, costs: &[NodeCosts], branch: &Extension) {
        for (&node_id, &arc_id) in branch.nodes.iter().zip(&branch.arcs) {
            let arc = &mut network.arcs[arc_id];
            arc.enabled = true;
            let line_cost = self.params.grid_mv_cost * arc.length;

            let node = &mut network.nodes[node_id];
            node.conn_end = true;
            node.pending = false;
            node.grid_cost = costs[node_id].grid_local + line_cost;
        }
    }

    fn weight(&self, node: &Node) -> f64 {
        match self.params.density_weight {
            DensityWeight::Population => node.population,
            DensityWeight::Demand => node.population * node.demand,
        }
    }

    /// Summarizes the current state of the network.
    pub fn summary(&self, network: &Network) -> NationalSummary {
        let mut summary = NationalSummary {
            new_conn: 0,
            new_og: 0,
            total_cost: 0.0,
            model_pop: 0.0,
            orig_conn_pop: 0.0,
            new_conn_pop: 0.0,
            new_og_pop: 0.0,
        };

        for node in network.nodes() {
            summary.model_pop += node.population;
            match NodeStatus::of(node) {
                NodeStatus::Original => summary.orig_conn_pop += node.population * node.coverage,
                NodeStatus::New => {
                    summary.new_conn += 1;
                    summary.new_conn_pop += node.population;
                    summary.total_cost += self.node_costs(node).grid_local;
                }
                NodeStatus::Pending | NodeStatus::OffGrid => {
                    summary.new_og += 1;
                    summary.new_og_pop += node.population;
                    summary.total_cost += node.off_grid_cost;
                }
            }
        }
        summary.total_cost += self.params.grid_mv_cost
            * network
                .arcs()
                .iter()
                .filter(|a| a.enabled && !a.existing)
                .map(|a| a.length)
                .sum::<f64>();

        summary
    }
}

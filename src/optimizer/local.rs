// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Profit-maximizing pruning of a village network.
//!
//! Starting from the complete tree, every sweep evaluates the network with
//! each enabled arc removed in turn, and permanently removes the arc whose
//! removal gives the highest net present value.  This repeats until no
//! removal improves on the current network, or, when a target coverage is
//! given, until the share of enabled arcs drops to the target.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::economics::{cash_flows, fraction_or_percent, npv, validate_rate};
use crate::{Error, Network, Node};

use super::{ensure_non_negative, ensure_within_budget};

/// Economic parameters of a village mini-grid.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LocalParams {
    /// Demand, in kWh per person per month, for nodes that don't have their
    /// own.
    pub demand: f64,
    /// Tariff, per kWh.
    pub tariff: f64,
    /// Generator cost, per kW.
    pub gen_cost: f64,
    /// Wire cost, per meter.
    pub wire_cost: f64,
    /// Cost of a single connection.
    pub connection_cost: f64,
    /// Annual operating cost as a share of capital cost.  Values of 1 or more
    /// are read as percentages.
    pub opex_ratio: f64,
    /// Project duration, in years.
    pub years: usize,
    /// Discount rate.  Values of 1 or more are read as percentages.
    pub discount_rate: f64,
    /// When set, arcs are removed until at most this share of them is
    /// enabled, instead of optimizing the net present value.
    pub target_coverage: Option<f64>,
    /// Occupancy used for nodes without a population.
    pub people_per_m2: f64,
    /// Hours per month over which the monthly demand is drawn at peak.
    pub peak_hours_per_month: f64,
}

impl Default for LocalParams {
    fn default() -> Self {
        Self {
            demand: 6.0,
            tariff: 0.5,
            gen_cost: 1000.0,
            wire_cost: 10.0,
            connection_cost: 150.0,
            opex_ratio: 0.02,
            years: 20,
            discount_rate: 0.06,
            target_coverage: None,
            people_per_m2: 0.15,
            peak_hours_per_month: 120.0,
        }
    }
}

/// Summary figures of an optimized village network.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LocalSummary {
    /// Connected nodes, not counting the root.
    pub connected: usize,
    /// Generator size, in kW.
    pub gen_size_kw: f64,
    /// Length of the enabled lines, in meters.
    pub line_length: f64,
    pub capex: f64,
    pub opex: f64,
    /// Annual income.
    pub income: f64,
    pub npv: f64,
}

/// The outcome of a [`LocalOptimizer`] run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LocalReport {
    /// The net present value of the starting network, followed by the value
    /// after each removal.
    pub accepted_npv: Vec<f64>,
    /// The removed arcs, in removal order.
    pub disabled_arcs: Vec<usize>,
    pub summary: LocalSummary,
}

/// Prunes unprofitable branches from a village network.
#[derive(Clone, Debug)]
pub struct LocalOptimizer {
    params: LocalParams,
}

/// Capital cost and monthly income of the nodes in a subtree.
#[derive(Clone, Copy, Debug, Default)]
struct Totals {
    cost: f64,
    income: f64,
}

impl LocalOptimizer {
    /// Creates a new [`LocalOptimizer`], after validating the parameters.
    pub fn try_new(mut params: LocalParams) -> Result<Self, Error> {
        for (name, value) in [
            ("demand", params.demand),
            ("tariff", params.tariff),
            ("gen_cost", params.gen_cost),
            ("wire_cost", params.wire_cost),
            ("connection_cost", params.connection_cost),
            ("opex_ratio", params.opex_ratio),
            ("people_per_m2", params.people_per_m2),
        ] {
            ensure_non_negative(name, value)?;
        }
        if params.years == 0 {
            return Err(Error::invalid_input("years must be at least 1."));
        }
        if !(params.peak_hours_per_month.is_finite() && params.peak_hours_per_month > 0.0) {
            return Err(Error::numeric_degeneracy(format!(
                "peak_hours_per_month must be positive and finite, got {}.",
                params.peak_hours_per_month
            )));
        }
        if let Some(target) = params.target_coverage {
            if !(target > 0.0 && target < 1.0) {
                return Err(Error::invalid_input(format!(
                    "target_coverage must be between 0 and 1, got {target}."
                )));
            }
        }

        params.opex_ratio = fraction_or_percent(params.opex_ratio);
        params.discount_rate = fraction_or_percent(params.discount_rate);
        validate_rate(params.discount_rate)?;

        Ok(Self { params })
    }

    /// Returns the parameters in use, with ratios normalized to fractions.
    pub fn params(&self) -> &LocalParams {
        &self.params
    }

    /// Prunes the network in place.
    ///
    /// On return, `conn_end` is set on exactly the nodes reachable from the
    /// root over enabled arcs, and no enabled arc touches any other node.
    pub fn optimize(&self, network: &mut Network) -> Result<LocalReport, Error> {
        let own = network
            .nodes()
            .iter()
            .map(|n| self.node_totals(n))
            .collect::<Vec<_>>();
        let gen_cost_total = network
            .nodes()
            .iter()
            .map(|n| self.peak_kw(n) * self.params.gen_cost)
            .sum::<f64>();

        let total_arcs = network.arcs().len();
        let max_iterations = network.config().max_iterations;

        let whole = Self::subtree_totals(network, &own)[network.root()];
        let mut accepted_npv = vec![self.npv(gen_cost_total, whole)];
        let mut disabled_arcs = vec![];

        let mut iteration = 0;
        loop {
            if let Some(target) = self.params.target_coverage {
                let enabled = network.arcs().iter().filter(|a| a.enabled).count();
                if total_arcs == 0 || enabled as f64 / total_arcs as f64 <= target {
                    break;
                }
            }

            iteration += 1;
            ensure_within_budget("Local optimization", iteration, max_iterations)?;

            let (current, best) = self.sweep(network, &own, gen_cost_total);
            let Some((arc_id, value)) = best else {
                break;
            };
            tracing::debug!(
                "Sweep {iteration}: removing arc {arc_id} gives NPV {value:.2}, current NPV {current:.2}."
            );

            if self.params.target_coverage.is_none() && value <= current {
                break;
            }

            network.arcs[arc_id].enabled = false;
            accepted_npv.push(value);
            disabled_arcs.push(arc_id);
        }

        self.connect_reachable(network);
        let summary = self.summary(network);

        tracing::info!(
            "Local optimization removed {} arcs in {iteration} sweeps, connecting {} nodes with NPV {:.2}.",
            disabled_arcs.len(),
            summary.connected,
            summary.npv
        );

        Ok(LocalReport {
            accepted_npv,
            disabled_arcs,
            summary,
        })
    }

    /// Returns the net present value of the current network, and the enabled
    /// arc whose removal gives the highest net present value, with that
    /// value.  Ties go to the lowest arc id.
    ///
    /// Only reads the network, so that the arcs can be evaluated in parallel.
    fn sweep(
        &self,
        network: &Network,
        own: &[Totals],
        gen_cost_total: f64,
    ) -> (f64, Option<(usize, f64)>) {
        let subtree = Self::subtree_totals(network, own);
        let reachable = network.reachable_from_root();
        let whole = subtree[network.root()];

        let best = network
            .arcs()
            .par_iter()
            .filter(|a| a.enabled)
            .map(|arc| {
                let remaining = if reachable[arc.start] {
                    let cut = subtree[arc.end];
                    Totals {
                        cost: whole.cost - cut.cost,
                        income: whole.income - cut.income,
                    }
                } else {
                    whole
                };
                (arc.id, self.npv(gen_cost_total, remaining))
            })
            .reduce_with(|a, b| {
                if b.1 > a.1 || (b.1 == a.1 && b.0 < a.0) {
                    b
                } else {
                    a
                }
            });

        (self.npv(gen_cost_total, whole), best)
    }

    /// Sums the node totals over the enabled subtree below every node that
    /// is reachable from the root.  Unreachable nodes keep their own totals.
    fn subtree_totals(network: &Network, own: &[Totals]) -> Vec<Totals> {
        let mut totals = own.to_vec();
        for id in network
            .downstream(network.root(), |a| a.enabled)
            .into_iter()
            .rev()
        {
            if id == network.root() {
                continue;
            }
            if let Some(arc) = network.incoming_arc(id) {
                let child = totals[id];
                let parent = &mut totals[arc.start];
                parent.cost += child.cost;
                parent.income += child.income;
            }
        }
        totals
    }

    /// Marks the nodes reachable from the root as connected, and disables
    /// arcs stranded by earlier removals.
    fn connect_reachable(&self, network: &mut Network) {
        let reachable = network.reachable_from_root();

        for (node, reached) in network.nodes.iter_mut().zip(reachable.iter()) {
            node.conn_end = *reached;
            node.grid_cost = if *reached {
                self.params.wire_cost * node.marginal_distance + self.params.connection_cost
            } else {
                0.0
            };
        }
        for arc in network.arcs.iter_mut() {
            if arc.enabled && !(reachable[arc.start] && reachable[arc.end]) {
                arc.enabled = false;
            }
        }
    }

    fn summary(&self, network: &Network) -> LocalSummary {
        let p = &self.params;
        let connected_nodes = network.nodes().iter().filter(|n| n.conn_end);

        let (count, gen_size_kw, income_per_month) =
            connected_nodes.fold((0_usize, 0.0, 0.0), |(count, kw, income), n| {
                (count + 1, kw + self.peak_kw(n), income + self.node_totals(n).income)
            });
        let connected = count.saturating_sub(1);
        let line_length = network.enabled_length();

        let capex = gen_size_kw * p.gen_cost
            + p.connection_cost * connected as f64
            + p.wire_cost * line_length;
        let opex = p.opex_ratio * capex;
        let income = income_per_month * 12.0;
        let npv = npv(p.discount_rate, &cash_flows(capex, opex, income, p.years));

        LocalSummary {
            connected,
            gen_size_kw,
            line_length,
            capex,
            opex,
            income,
            npv,
        }
    }

    fn population(&self, node: &Node) -> f64 {
        if node.population > 0.0 {
            node.population
        } else {
            node.area * self.params.people_per_m2
        }
    }

    /// The node's own demand, or the village-wide default when it has none.
    fn demand(&self, node: &Node) -> f64 {
        if node.demand > 0.0 {
            node.demand
        } else {
            self.params.demand
        }
    }

    fn peak_kw(&self, node: &Node) -> f64 {
        self.population(node) * self.demand(node) / self.params.peak_hours_per_month
    }

    fn node_totals(&self, node: &Node) -> Totals {
        Totals {
            cost: self.params.wire_cost * node.marginal_distance + self.params.connection_cost,
            income: self.population(node) * self.demand(node) * self.params.tariff,
        }
    }

    fn npv(&self, gen_cost_total: f64, totals: Totals) -> f64 {
        let capex = gen_cost_total + totals.cost;
        let opex = self.params.opex_ratio * capex;
        let income = totals.income * 12.0;
        npv(
            self.params.discount_rate,
            &cash_flows(capex, opex, income, self.params.years),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::test_utils::{cross, TestSettlement};
    use crate::NetworkConfig;

    fn cross_params() -> LocalParams {
        LocalParams {
            demand: 10.0,
            tariff: 1.0,
            gen_cost: 0.0,
            wire_cost: 6.0,
            connection_cost: 0.0,
            opex_ratio: 0.0,
            years: 10,
            discount_rate: 0.0,
            ..Default::default()
        }
    }

    /// A small village: a ring of houses around a center, with a few far-off
    /// houses.
    fn village() -> Vec<TestSettlement> {
        let mut houses = vec![TestSettlement::new(0.0, 0.0).area(120.0)];
        for i in 0..24 {
            let angle = i as f64 * std::f64::consts::PI / 12.0;
            let radius = 40.0 + 15.0 * (i % 4) as f64;
            houses.push(
                TestSettlement::new(radius * angle.cos(), radius * angle.sin())
                    .area(30.0 + (i % 5) as f64 * 20.0),
            );
        }
        for i in 0..6 {
            houses.push(TestSettlement::new(400.0 + 90.0 * i as f64, -250.0).area(25.0));
        }
        houses
    }

    #[test]
    fn test_only_nearest_arms_are_kept() -> Result<(), Error> {
        let mut network = Network::try_new(cross(1.0), NetworkConfig::default())?;
        let optimizer = LocalOptimizer::try_new(cross_params())?;
        let report = optimizer.optimize(&mut network)?;

        let enabled = network.arcs().iter().filter(|a| a.enabled).collect::<Vec<_>>();
        assert_eq!(enabled.len(), 2);
        assert_eq!(network.enabled_length(), 200.0);
        assert_eq!(report.summary.connected, 2);
        assert_eq!(report.summary.line_length, 200.0);
        assert_eq!(report.disabled_arcs, vec![3, 2]);
        assert_eq!(report.accepted_npv, vec![120.0, 840.0, 960.0]);

        let connected = network
            .nodes()
            .iter()
            .filter(|n| n.conn_end)
            .map(|n| n.id)
            .collect::<Vec<_>>();
        assert_eq!(connected, vec![0, 1, 2]);
        network.validate_enabled_tree()?;

        // 2 arms * (9 years * 120 - 600 wire)
        assert_eq!(report.summary.npv, 960.0);
        Ok(())
    }

    #[test]
    fn test_npv_history_and_final_state() -> Result<(), Error> {
        let mut network = Network::try_new(village(), NetworkConfig::default())?;
        let optimizer = LocalOptimizer::try_new(LocalParams::default())?;
        let report = optimizer.optimize(&mut network)?;

        assert!(report.accepted_npv.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(report.accepted_npv.len(), report.disabled_arcs.len() + 1);
        for arc in &report.disabled_arcs {
            assert!(!network.arc(*arc)?.enabled);
        }
        network.validate_enabled_tree()?;
        network.validate_rooted()?;

        let reachable = network.reachable_from_root();
        for node in network.nodes() {
            assert_eq!(node.conn_end, reachable[node.id]);
        }
        Ok(())
    }

    #[test]
    fn test_optimization_is_idempotent() -> Result<(), Error> {
        for params in [
            LocalParams::default(),
            LocalParams {
                target_coverage: Some(0.5),
                ..Default::default()
            },
        ] {
            let mut network = Network::try_new(village(), NetworkConfig::default())?;
            let optimizer = LocalOptimizer::try_new(params)?;
            let first = optimizer.optimize(&mut network)?;

            let arcs = network.arcs().to_vec();
            let nodes = network.nodes().to_vec();
            let second = optimizer.optimize(&mut network)?;

            assert!(second.disabled_arcs.is_empty());
            assert_eq!(network.arcs(), arcs.as_slice());
            assert_eq!(network.nodes(), nodes.as_slice());
            assert_eq!(second.summary, first.summary);
        }
        Ok(())
    }

    #[test]
    fn test_target_coverage() -> Result<(), Error> {
        let mut network = Network::try_new(village(), NetworkConfig::default())?;
        let total = network.arcs().len();
        let params = LocalParams {
            target_coverage: Some(0.5),
            ..Default::default()
        };
        let report = LocalOptimizer::try_new(params)?.optimize(&mut network)?;

        let enabled = network.arcs().iter().filter(|a| a.enabled).count();
        assert!(enabled as f64 / total as f64 <= 0.5);
        assert!(report.disabled_arcs.len() >= total / 2);
        network.validate_enabled_tree()?;
        Ok(())
    }

    #[test]
    fn test_profitable_network_is_kept() -> Result<(), Error> {
        let mut network = Network::try_new(cross(100.0), NetworkConfig::default())?;
        let report = LocalOptimizer::try_new(cross_params())?.optimize(&mut network)?;
        assert!(report.disabled_arcs.is_empty());
        assert!(network.arcs().iter().all(|a| a.enabled));
        assert_eq!(report.summary.connected, 4);
        Ok(())
    }

    #[test]
    fn test_node_demand_overrides_default() -> Result<(), Error> {
        let params = LocalParams {
            wire_cost: 0.0,
            ..cross_params()
        };
        let village = |demand: f64| {
            vec![
                TestSettlement::new(0.0, 0.0),
                TestSettlement::new(10.0, 0.0).population(5.0).demand(demand),
                TestSettlement::new(20.0, 0.0).population(5.0).demand(demand),
            ]
        };

        let mut network = Network::try_new(village(0.0), NetworkConfig::default())?;
        let defaulted = LocalOptimizer::try_new(params.clone())?.optimize(&mut network)?;
        let mut network = Network::try_new(village(1000.0), NetworkConfig::default())?;
        let own = LocalOptimizer::try_new(params)?.optimize(&mut network)?;

        // 10 people * 12 months, at 10 and at 1000 kWh per month.
        assert_eq!(defaulted.summary.income, 1_200.0);
        assert_eq!(own.summary.income, 120_000.0);
        assert_eq!(own.summary.connected, 2);
        Ok(())
    }

    #[test]
    fn test_percent_inputs() -> Result<(), Error> {
        let optimizer = LocalOptimizer::try_new(LocalParams {
            opex_ratio: 2.0,
            discount_rate: 6.0,
            ..Default::default()
        })?;
        assert_eq!(optimizer.params().opex_ratio, 0.02);
        assert_eq!(optimizer.params().discount_rate, 0.06);
        Ok(())
    }

    #[test]
    fn test_parameter_validation() {
        assert!(LocalOptimizer::try_new(LocalParams {
            years: 0,
            ..Default::default()
        })
        .is_err_and(|e| e == Error::invalid_input("years must be at least 1.")));
        assert!(LocalOptimizer::try_new(LocalParams {
            tariff: -1.0,
            ..Default::default()
        })
        .is_err_and(|e| e == Error::invalid_input("tariff must be a non-negative number, got -1.")));
        assert!(LocalOptimizer::try_new(LocalParams {
            target_coverage: Some(1.5),
            ..Default::default()
        })
        .is_err_and(|e| e
            == Error::invalid_input("target_coverage must be between 0 and 1, got 1.5.")));
        assert!(LocalOptimizer::try_new(LocalParams {
            peak_hours_per_month: 0.0,
            ..Default::default()
        })
        .is_err_and(|e| e.kind() == crate::ErrorKind::NumericDegeneracy));
    }

    #[test]
    fn test_iteration_budget() -> Result<(), Error> {
        let config = NetworkConfig {
            max_iterations: 1,
            ..Default::default()
        };
        let mut network = Network::try_new(cross(1.0), config)?;
        assert!(LocalOptimizer::try_new(cross_params())?
            .optimize(&mut network)
            .is_err_and(|e| e
                == Error::non_convergence(
                    "Local optimization did not converge within 1 iterations."
                )));
        Ok(())
    }

    #[test]
    fn test_params_from_json() -> Result<(), Error> {
        let params: LocalParams =
            serde_json::from_str(r#"{"tariff": 0.3, "years": 15, "target_coverage": 0.8}"#)
                .map_err(|e| Error::invalid_input(e.to_string()))?;
        assert_eq!(params.tariff, 0.3);
        assert_eq!(params.years, 15);
        assert_eq!(params.target_coverage, Some(0.8));
        assert_eq!(params.wire_cost, LocalParams::default().wire_cost);
        Ok(())
    }
}

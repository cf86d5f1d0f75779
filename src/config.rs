// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module contains the configuration options for building a `Network`.

use serde::Deserialize;

/// How the spanning tree over the settlement points is computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanningTreeMode {
    /// Consider every pair of points.
    Exact,
    /// Consider only each point's 50 nearest neighbours.
    #[default]
    Approximate,
}

/// Configuration options for building and optimizing a `Network`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// How the spanning tree is computed.
    pub spanning_tree: SpanningTreeMode,

    /// Projected coordinates of the power source.  When set, the origin is
    /// prepended to the settlements as node 0 and used as the root.
    /// Otherwise the first settlement is the root.
    pub origin: Option<(f64, f64)>,

    /// Whether the settlements flagged as already connected are joined by
    /// existing infrastructure.  When `true`, only arcs between two connected
    /// settlements start out enabled.  When `false`, every arc starts out
    /// enabled.
    pub existing_network: bool,

    /// Maximum depth of any traversal over the tree.
    pub max_depth: usize,

    /// Maximum number of sweeps or passes an optimizer may make before giving
    /// up.
    pub max_iterations: usize,

    /// Floor applied to arc lengths in ratio computations, in meters.
    pub min_arc_length: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            spanning_tree: SpanningTreeMode::default(),
            origin: None,
            existing_network: false,
            max_depth: 1_000_000,
            max_iterations: 100_000,
            min_arc_length: 1.0,
        }
    }
}

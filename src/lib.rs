// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

/*!
# Electrification Network Planner

This is a library for planning electrical distribution networks over a set of
settlements: the buildings of a village, or the population clusters of a
country.

The settlements are joined by a minimum spanning tree of candidate line
segments, which is then rooted at the power source.  Economic optimizers
decide which of those segments are worth building.

## The `Settlement` trait

The main struct is [`Network`], instances of which can be created by passing
an iterator of settlements to the [`try_new`][Network::try_new] method.

The planner doesn't know about the caller's point types, and instead reads
their attributes through the [`Settlement`] trait.  Check out its
documentation for a sample implementation.

## Validation

The [`try_new`][Network::try_new] method checks that:

- There are at least 3 settlements.
- All coordinates and attributes are finite, and none are negative.
- Coverage fractions are between 0 and 1.
- The spanning tree reaches every settlement from the root, within the
  configured maximum depth.

If any of the checks fail, the method will return an [`Error`], and a
[`Network`] instance otherwise.

## Optimization

- [`LocalOptimizer`] prunes a fully built village network, removing the
  subtrees that don't pay for themselves, for maximum NPV or until a target
  share of the population is connected.
- [`NationalOptimizer`] extends a national grid from the settlements that are
  already connected, wherever that is cheaper than off-grid supply.
- [`DynamicOptimizer`] runs the national extension over several time steps,
  with population, GDP and demand growth and an adoption target per step.

The low-voltage network inside a settlement is estimated by
[`size_low_voltage`].
*/

mod config;
pub use config::{NetworkConfig, SpanningTreeMode};

pub mod economics;

mod error;
pub use error::{Error, ErrorKind};

mod network;
pub use network::{spanning_tree, Arc, Network, Node};

mod optimizer;
pub use optimizer::{
    DensityWeight, DynamicOptimizer, DynamicParams, Extension, LocalOptimizer, LocalParams,
    LocalReport, LocalSummary, NationalOptimizer, NationalParams, NationalReport, NationalSummary,
    NodeStatus, Snapshot, StepSpec,
};

mod settlement;
pub use settlement::Settlement;

mod sizing;
pub use sizing::{size_low_voltage, LvParams, LvSizing};

// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Greedy economic optimizers that decide which arcs of a [`Network`] to build.
//!
//! - [`LocalOptimizer`] starts from a fully built village network and prunes
//!   the branches that don't pay for themselves.
//! - [`NationalOptimizer`] starts from the settlements that are already
//!   electrified and extends the grid to the ones where that is cheaper than
//!   going off-grid.
//! - [`DynamicOptimizer`] repeats the national extension over several time
//!   steps, producing one [`Snapshot`] per step.
//!
//! [`Network`]: crate::Network

mod dynamic;
mod local;
mod national;

pub use dynamic::{DynamicOptimizer, DynamicParams, Snapshot, StepSpec};
pub use local::{LocalOptimizer, LocalParams, LocalReport, LocalSummary};
pub use national::{
    DensityWeight, Extension, NationalOptimizer, NationalParams, NationalReport, NationalSummary,
    NodeStatus,
};

use crate::Error;

/// Returns an error if `value` is negative or not finite.
pub(crate) fn ensure_non_negative(name: &str, value: f64) -> Result<(), Error> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::invalid_input(format!(
            "{name} must be a non-negative number, got {value}."
        )));
    }
    Ok(())
}

/// Returns an error if `iteration` exceeds the configured maximum.
pub(crate) fn ensure_within_budget(
    what: &str,
    iteration: usize,
    max_iterations: usize,
) -> Result<(), Error> {
    if iteration > max_iterations {
        return Err(Error::non_convergence(format!(
            "{what} did not converge within {max_iterations} iterations."
        )));
    }
    Ok(())
}

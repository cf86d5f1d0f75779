// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Closed-form estimates of the low-voltage distribution needed inside a
//! settlement.
//!
//! The settlement is approximated as a disk of the given area, served by
//! evenly spread transformers.  Lengths are the expected distance from the
//! center of a disk to a random point in it (two thirds of the radius).

use std::f64::consts::PI;

use serde::Deserialize;

use crate::Error;

const HOURS_PER_YEAR: f64 = 8760.0;
const MONTHS_PER_YEAR: f64 = 12.0;

/// Parameters of the low-voltage sizing model.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LvParams {
    /// Number of people per household connection.
    pub household_size: f64,
    /// Ratio of average load to peak load.
    pub base_to_peak_ratio: f64,
    /// Power factor of the load.
    pub power_factor: f64,
    /// Rating of a single distribution transformer, in kVA.
    pub max_transformer_kva: f64,
}

impl Default for LvParams {
    fn default() -> Self {
        Self {
            household_size: 5.0,
            base_to_peak_ratio: 0.5,
            power_factor: 0.9,
            max_transformer_kva: 50.0,
        }
    }
}

impl LvParams {
    /// Checks that none of the divisors used by [`size_low_voltage`] can be
    /// zero or negative.
    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("household_size", self.household_size),
            ("base_to_peak_ratio", self.base_to_peak_ratio),
            ("power_factor", self.power_factor),
            ("max_transformer_kva", self.max_transformer_kva),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::numeric_degeneracy(format!(
                    "{name} must be positive and finite, got {value}."
                )));
            }
        }
        Ok(())
    }
}

/// The low-voltage equipment estimated for a single settlement.
#[derive(Clone, Debug, PartialEq)]
pub struct LvSizing {
    /// Average load, in kW.
    pub average_load_kw: f64,
    /// Peak apparent power, in kVA.
    pub peak_kva: f64,
    /// Number of distribution transformers, at least 1.
    pub transformers: u32,
    /// Medium-voltage line inside the settlement, in meters.
    pub mv_length: f64,
    /// Low-voltage line to the households, in meters.
    pub lv_length: f64,
    /// Number of household connections.
    pub households: f64,
}

/// Sizes the low-voltage network of a settlement.
///
/// `demand` is in kWh per person per month, `area` in m².  The parameters are
/// expected to have passed [`LvParams::validate`].
pub fn size_low_voltage(population: f64, demand: f64, area: f64, params: &LvParams) -> LvSizing {
    let population = population.max(0.0);
    let area = area.max(0.0);

    let average_load_kw = population * demand.max(0.0) * MONTHS_PER_YEAR / HOURS_PER_YEAR;
    let peak_kva = average_load_kw / params.base_to_peak_ratio / params.power_factor;
    let transformers = ((peak_kva / params.max_transformer_kva).ceil() as u32).max(1);
    let households = population / params.household_size;

    let t = f64::from(transformers);
    let mv_length = 2.0 / 3.0 * (area / PI).sqrt() * t;
    let lv_length = 2.0 / 3.0 * (area / (PI * t)).sqrt() * households;

    LvSizing {
        average_load_kw,
        peak_kva,
        transformers,
        mv_length,
        lv_length,
        households,
    }
}

// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Discounted cash-flow helpers shared by the optimizers.

use crate::Error;

/// Interprets a ratio given either as a fraction (`0.1`) or as a percentage
/// (`10`).  Values of 1 or more are read as percentages.
pub fn fraction_or_percent(value: f64) -> f64 {
    if value >= 1.0 {
        value / 100.0
    } else {
        value
    }
}

/// Builds the yearly cash flows of a project: the capital expenditure in year
/// 0, and the net income in every following year.
pub fn cash_flows(capex: f64, opex: f64, annual_income: f64, years: usize) -> Vec<f64> {
    let mut flows = vec![annual_income - opex; years];
    if let Some(first) = flows.first_mut() {
        *first = -capex;
    }
    flows
}

/// Net present value of `flows`, where `flows[t]` is discounted by
/// `(1 + rate)^t`.
pub fn npv(rate: f64, flows: &[f64]) -> f64 {
    let mut discount = 1.0;
    flows
        .iter()
        .map(|flow| {
            let value = flow / discount;
            discount *= 1.0 + rate;
            value
        })
        .sum()
}

/// Checks that a discount rate doesn't make the discount factor vanish.
pub(crate) fn validate_rate(rate: f64) -> Result<(), Error> {
    if !rate.is_finite() || rate <= -1.0 {
        return Err(Error::numeric_degeneracy(format!(
            "Discount rate must be finite and greater than -1, got {rate}."
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cash_flows() {
        assert_eq!(cash_flows(100.0, 5.0, 30.0, 4), vec![-100.0, 25.0, 25.0, 25.0]);
        assert_eq!(cash_flows(100.0, 5.0, 30.0, 1), vec![-100.0]);
        assert!(cash_flows(100.0, 5.0, 30.0, 0).is_empty());
    }

    #[test]
    fn test_npv() {
        assert_eq!(npv(0.0, &[-100.0, 50.0, 50.0]), 0.0);
        let value = npv(0.1, &[-100.0, 110.0, 121.0]);
        assert!((value - 100.0).abs() < 1e-9);

        // Long horizons keep discounting rather than wrapping around.
        let flows = vec![1.0; 100_000];
        let value = npv(0.05, &flows);
        assert!((value - 21.0).abs() < 1e-6);
    }

    #[test]
    fn test_fraction_or_percent() {
        assert_eq!(fraction_or_percent(0.12), 0.12);
        assert_eq!(fraction_or_percent(12.0), 0.12);
        assert_eq!(fraction_or_percent(1.0), 0.01);
    }

    #[test]
    fn test_validate_rate() {
        assert!(validate_rate(0.05).is_ok());
        assert!(validate_rate(-1.0).is_err_and(|e| e
            == Error::numeric_degeneracy(
                "Discount rate must be finite and greater than -1, got -1."
            )));
    }
}

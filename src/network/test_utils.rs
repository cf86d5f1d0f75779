// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module is only compiled when running unit tests and contains features
//! that are shared by all tests of the crate.
//!
//! - the `TestSettlement` type, which implements the `Settlement` trait.
//! - helpers for laying out common settlement configurations.

use crate::Settlement;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TestSettlement {
    x: f64,
    y: f64,
    area: f64,
    population: f64,
    demand: f64,
    connected: bool,
    gdp: f64,
}

impl TestSettlement {
    pub(crate) fn new(x: f64, y: f64) -> Self {
        TestSettlement {
            x,
            y,
            area: 0.0,
            population: 0.0,
            demand: 0.0,
            connected: false,
            gdp: 1.0,
        }
    }

    pub(crate) fn area(mut self, area: f64) -> Self {
        self.area = area;
        self
    }

    pub(crate) fn population(mut self, population: f64) -> Self {
        self.population = population;
        self
    }

    pub(crate) fn demand(mut self, demand: f64) -> Self {
        self.demand = demand;
        self
    }

    pub(crate) fn connected(mut self) -> Self {
        self.connected = true;
        self
    }
}

impl Settlement for TestSettlement {
    fn x(&self) -> f64 {
        self.x
    }

    fn y(&self) -> f64 {
        self.y
    }

    fn area(&self) -> f64 {
        self.area
    }

    fn population(&self) -> f64 {
        self.population
    }

    fn demand(&self) -> f64 {
        self.demand
    }

    fn conn_start(&self) -> bool {
        self.connected
    }

    fn gdp(&self) -> f64 {
        self.gdp
    }
}

/// A root at the origin with one settlement on each of the four arms of a
/// cross, at 100, 100, 200 and 300 m.
pub(crate) fn cross(population: f64) -> Vec<TestSettlement> {
    vec![
        TestSettlement::new(0.0, 0.0),
        TestSettlement::new(100.0, 0.0).population(population),
        TestSettlement::new(0.0, 100.0).population(population),
        TestSettlement::new(-200.0, 0.0).population(population),
        TestSettlement::new(0.0, -300.0).population(population),
    ]
}

/// Settlements spaced `spacing` meters apart along a straight line, the first
/// one connected.
pub(crate) fn line(count: usize, spacing: f64, population: f64) -> Vec<TestSettlement> {
    (0..count)
        .map(|i| {
            let s = TestSettlement::new(i as f64 * spacing, 0.0)
                .population(population)
                .area(10_000.0)
                .demand(10.0);
            if i == 0 {
                s.connected()
            } else {
                s
            }
        })
        .collect()
}

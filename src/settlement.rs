// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module contains the trait that needs to be implemented by the types
//! that represent a settlement point.

/**
This trait needs to be implemented by the type that represents a settlement
point: a building in a village, or a population cluster in a country.

The planner doesn't know about the point types produced by the clustering
pipeline, and instead reads their attributes through this trait.

Coordinates must be in a projected, meter based reference system.

<details>
<summary>Example implementation for a clustering output row:</summary>

```ignore
impl electrification_network_planner::Settlement for clusters::Cluster {
    fn x(&self) -> f64 {
        self.centroid.x
    }

    fn y(&self) -> f64 {
        self.centroid.y
    }

    fn area(&self) -> f64 {
        self.area_m2
    }

    fn population(&self) -> f64 {
        self.pop
    }

    fn conn_start(&self) -> bool {
        self.grid_dist <= 1000.0 && self.ntl > 50.0
    }
}
```

</details>
*/
pub trait Settlement {
    /// Returns the projected x coordinate, in meters.
    fn x(&self) -> f64;
    /// Returns the projected y coordinate, in meters.
    fn y(&self) -> f64;
    /// Returns the area covered by the settlement, in m².
    fn area(&self) -> f64;
    /// Returns the number of people living in the settlement.
    fn population(&self) -> f64;
    /// Returns the electricity demand, in kWh per person per month.
    fn demand(&self) -> f64 {
        0.0
    }
    /// Returns true if the settlement is electrified before planning starts.
    fn conn_start(&self) -> bool {
        false
    }
    /// Returns the fraction of the settlement's population that is already
    /// electrified.
    fn coverage(&self) -> f64 {
        if self.conn_start() {
            1.0
        } else {
            0.0
        }
    }
    /// Returns a per-capita GDP index for the settlement.
    fn gdp(&self) -> f64 {
        1.0
    }
}

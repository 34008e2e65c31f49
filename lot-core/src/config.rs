use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::billing::BillingPolicy;
use crate::error::{LotError, Result};
use crate::types::{Coordinates, SpotType};

/// One explicitly placed spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct SpotSpec {
    pub spot_type: SpotType,
    pub x: i32,
    pub y: i32,
}

impl SpotSpec {
    pub fn new(spot_type: SpotType, x: i32, y: i32) -> Self {
        Self { spot_type, x, y }
    }

    pub fn coords(&self) -> Coordinates {
        Coordinates::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(from_wasm_abi)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Layout {
    /// `total_spots` laid out on a near-square grid starting at (1, 1),
    /// types assigned round-robin small, medium, large.
    Grid { total_spots: u32 },
    Explicit { spots: Vec<SpotSpec> },
}

impl Layout {
    pub fn spot_specs(&self) -> Vec<SpotSpec> {
        match self {
            Layout::Explicit { spots } => spots.clone(),
            Layout::Grid { total_spots } => grid_spots(*total_spots),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Layout::Grid { total_spots } => *total_spots == 0,
            Layout::Explicit { spots } => spots.is_empty(),
        }
    }
}

fn grid_spots(total: u32) -> Vec<SpotSpec> {
    let root = total.isqrt();
    let mut out = Vec::with_capacity(total as usize);
    let mut counter = 0usize;
    let mut next_type = || {
        let t = [SpotType::Small, SpotType::Medium, SpotType::Large][counter % 3];
        counter += 1;
        t
    };

    for x in 1..=root {
        for y in 1..=root {
            out.push(SpotSpec::new(next_type(), x as i32, y as i32));
        }
    }
    // Whatever doesn't fit the square goes in one extra column
    let remaining = total - root * root;
    for y in 0..remaining {
        out.push(SpotSpec::new(next_type(), root as i32 + 1, y as i32));
    }
    out
}

fn default_entrances() -> Vec<Coordinates> {
    vec![Coordinates::ORIGIN]
}

/// Everything needed to build a directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(from_wasm_abi)]
pub struct LotConfig {
    pub layout: Layout,
    /// Entrance positions; entrance ids are 1-based positions in this list.
    #[serde(default = "default_entrances")]
    pub entrances: Vec<Coordinates>,
    pub rate_per_hour: f64,
    #[serde(default)]
    pub minimum_billed_hours: f64,
}

impl Default for LotConfig {
    fn default() -> Self {
        Self {
            layout: Layout::Grid { total_spots: 20 },
            entrances: default_entrances(),
            rate_per_hour: 5.0,
            minimum_billed_hours: 0.0,
        }
    }
}

impl LotConfig {
    /// Largest generated grid accepted.
    pub const MAX_GRID_SPOTS: u32 = 1_000_000;

    pub fn grid(total_spots: u32, rate_per_hour: f64) -> Self {
        Self {
            layout: Layout::Grid { total_spots },
            rate_per_hour,
            ..Self::default()
        }
    }

    pub fn explicit(spots: Vec<SpotSpec>, rate_per_hour: f64) -> Self {
        Self {
            layout: Layout::Explicit { spots },
            rate_per_hour,
            ..Self::default()
        }
    }

    pub fn with_entrances(mut self, entrances: Vec<Coordinates>) -> Self {
        self.entrances = entrances;
        self
    }

    pub fn with_minimum_billed_hours(mut self, hours: f64) -> Self {
        self.minimum_billed_hours = hours;
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn billing(&self) -> BillingPolicy {
        BillingPolicy {
            rate_per_hour: self.rate_per_hour,
            minimum_billed_hours: self.minimum_billed_hours,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.rate_per_hour.is_finite() || self.rate_per_hour <= 0.0 {
            return Err(LotError::Configuration(format!(
                "rate must be positive, got {}",
                self.rate_per_hour
            )));
        }
        if !self.minimum_billed_hours.is_finite() || self.minimum_billed_hours < 0.0 {
            return Err(LotError::Configuration(format!(
                "minimum billed hours must be non-negative, got {}",
                self.minimum_billed_hours
            )));
        }
        if self.entrances.is_empty() {
            return Err(LotError::Configuration("at least one entrance is required".into()));
        }
        if self.layout.is_empty() {
            return Err(LotError::Configuration("at least one spot is required".into()));
        }
        if let Layout::Grid { total_spots } = self.layout {
            if total_spots > Self::MAX_GRID_SPOTS {
                return Err(LotError::Configuration(format!(
                    "grid of {total_spots} spots exceeds {}",
                    Self::MAX_GRID_SPOTS
                )));
            }
        }
        for coords in &self.entrances {
            coords.validate()?;
        }
        if let Layout::Explicit { spots } = &self.layout {
            let mut seen = HashSet::with_capacity(spots.len());
            for spec in spots {
                let coords = spec.coords().validate()?;
                if !seen.insert(coords) {
                    return Err(LotError::InvalidInput(format!(
                        "two spots placed at {coords}"
                    )));
                }
            }
        }
        Ok(())
    }
}

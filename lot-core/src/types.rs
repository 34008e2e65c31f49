use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::borrow::Borrow;
use std::fmt;
use tsify_next::Tsify;

use crate::error::{LotError, Result};

// ============================================================================
// IDs - Spots use slotmap keys, entrances keep the 1-based numbering callers see
// ============================================================================

new_key_type! {
    pub struct SpotId;
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EntranceId(pub u32);

impl EntranceId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External identifier a spot is held under (a vehicle registration).
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(LotError::InvalidInput("request id must not be empty".into()));
        }
        Ok(Self(id))
    }

    /// Echo a caller-supplied id back in an error without validating it.
    pub(crate) fn unchecked(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RequestId {
    type Error = LotError;

    fn try_from(id: String) -> Result<Self> {
        Self::new(id)
    }
}

impl Borrow<str> for RequestId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Spot Type - Size class of a spot (and of the vehicle asking for one)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "lowercase")]
pub enum SpotType {
    Small,
    Medium,
    Large,
}

impl SpotType {
    /// Resolve the numeric type code used by front ends (1 small, 2 medium, 3 large).
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(SpotType::Small),
            2 => Ok(SpotType::Medium),
            3 => Ok(SpotType::Large),
            other => Err(LotError::InvalidInput(format!("unknown spot type code {other}"))),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            SpotType::Small => 1,
            SpotType::Medium => 2,
            SpotType::Large => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SpotType::Small => "small",
            SpotType::Medium => "medium",
            SpotType::Large => "large",
        }
    }

    /// Position in per-type arrays
    pub(crate) fn slot(self) -> usize {
        self.code() as usize - 1
    }

    /// Returns an iterator over all spot types, in code order
    pub fn all() -> impl Iterator<Item = SpotType> {
        [SpotType::Small, SpotType::Medium, SpotType::Large].into_iter()
    }
}

impl fmt::Display for SpotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Coordinates - A point on the integer plane
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct Coordinates {
    pub x: i32,
    pub y: i32,
}

impl Coordinates {
    pub const ORIGIN: Coordinates = Coordinates { x: 0, y: 0 };

    /// Largest accepted magnitude on either axis; keeps `distance_sq` inside i64.
    pub const LIMIT: i32 = 1_000_000_000;

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Reject points outside the addressable plane.
    pub fn validate(self) -> Result<Self> {
        if self.x.unsigned_abs() > Self::LIMIT as u32 || self.y.unsigned_abs() > Self::LIMIT as u32 {
            return Err(LotError::InvalidInput(format!(
                "coordinates {self} outside +/-{}",
                Self::LIMIT
            )));
        }
        Ok(self)
    }

    /// Squared Euclidean distance. Exact, so it orders spots without float ties.
    pub fn distance_sq(self, other: Coordinates) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }

    pub fn distance(self, other: Coordinates) -> f64 {
        (self.distance_sq(other) as f64).sqrt()
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ============================================================================
// Timestamp - Milliseconds on whatever timeline the directory's clock uses
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// Milliseconds from `earlier` to `self`, zero if the clock went backwards.
    pub fn elapsed_since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

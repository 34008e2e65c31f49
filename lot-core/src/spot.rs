use serde::{Deserialize, Serialize};

use crate::types::{Coordinates, RequestId, SpotType, Timestamp};

// ============================================================================
// Spot - A single located parking resource
// ============================================================================

/// Who holds a spot and since when. Kept together so neither can be set alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
    pub request: RequestId,
    pub since: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spot {
    pub spot_type: SpotType,
    pub coords: Coordinates,
    occupancy: Option<Occupancy>,
}

impl Spot {
    pub fn new(spot_type: SpotType, coords: Coordinates) -> Self {
        Self {
            spot_type,
            coords,
            occupancy: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.occupancy.is_none()
    }

    pub fn occupancy(&self) -> Option<&Occupancy> {
        self.occupancy.as_ref()
    }

    pub fn occupant(&self) -> Option<&RequestId> {
        self.occupancy.as_ref().map(|o| &o.request)
    }

    pub fn occupied_since(&self) -> Option<Timestamp> {
        self.occupancy.as_ref().map(|o| o.since)
    }

    /// Mark the spot as held. Callers check availability first.
    pub(crate) fn occupy(&mut self, request: RequestId, now: Timestamp) {
        debug_assert!(self.occupancy.is_none(), "spot already occupied");
        self.occupancy = Some(Occupancy {
            request,
            since: now,
        });
    }

    pub(crate) fn vacate(&mut self) -> Option<Occupancy> {
        self.occupancy.take()
    }
}

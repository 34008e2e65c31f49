use slotmap::SlotMap;

use crate::proximity::{NotFound, ProximityIndex};
use crate::spot::Spot;
use crate::types::{Coordinates, EntranceId, SpotId, SpotType};

/// An entry point with its own per-type view of which spots are nearest.
#[derive(Debug, Clone)]
pub struct Entrance {
    pub id: EntranceId,
    pub coords: Coordinates,
    indexes: [ProximityIndex; 3],
}

impl Entrance {
    pub fn new(id: EntranceId, coords: Coordinates, spots: &SlotMap<SpotId, Spot>) -> Self {
        let indexes = [SpotType::Small, SpotType::Medium, SpotType::Large]
            .map(|t| ProximityIndex::seeded(coords, t, spots));
        Self {
            id,
            coords,
            indexes,
        }
    }

    /// Take the nearest free spot of `spot_type` out of this entrance's index.
    pub fn nearest_available(
        &mut self,
        spot_type: SpotType,
        spots: &SlotMap<SpotId, Spot>,
    ) -> Result<SpotId, NotFound> {
        self.indexes[spot_type.slot()].pop_nearest_available(spots)
    }

    /// Make a freed spot discoverable from this entrance again.
    pub fn notify_available(&mut self, id: SpotId, spot: &Spot) {
        self.indexes[spot.spot_type.slot()].insert(id, spot);
    }

    pub fn index(&self, spot_type: SpotType) -> &ProximityIndex {
        &self.indexes[spot_type.slot()]
    }

    /// Entries queued for `spot_type`, including ones gone stale.
    pub fn queued(&self, spot_type: SpotType) -> usize {
        self.index(spot_type).len()
    }
}

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use slotmap::SlotMap;
use thiserror::Error;

use crate::spot::Spot;
use crate::types::{Coordinates, SpotId, SpotType};

/// The index ran dry: every spot of its type reachable from its origin is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no available {spot_type} spot reachable from {origin}")]
pub struct NotFound {
    pub spot_type: SpotType,
    pub origin: Coordinates,
}

/// Spots of one type ordered by distance from one fixed point.
///
/// Entries are not removed when their spot is taken through another index;
/// they are skipped when they surface on `pop_nearest_available`. At most one
/// entry per spot is queued at a time, so re-inserting a spot whose stale entry
/// is still in the heap is a no-op and the heap never outgrows the spot set.
#[derive(Debug, Clone)]
pub struct ProximityIndex {
    origin: Coordinates,
    spot_type: SpotType,
    heap: BinaryHeap<Reverse<(i64, SpotId)>>,
    queued: HashSet<SpotId>,
}

impl ProximityIndex {
    pub fn new(origin: Coordinates, spot_type: SpotType) -> Self {
        Self {
            origin,
            spot_type,
            heap: BinaryHeap::new(),
            queued: HashSet::new(),
        }
    }

    /// Build an index over every spot of this type in `spots`.
    pub fn seeded(origin: Coordinates, spot_type: SpotType, spots: &SlotMap<SpotId, Spot>) -> Self {
        let entries: Vec<_> = spots
            .iter()
            .filter(|(_, s)| s.spot_type == spot_type)
            .map(|(id, s)| Reverse((origin.distance_sq(s.coords), id)))
            .collect();
        let queued = entries.iter().map(|Reverse((_, id))| *id).collect();
        Self {
            origin,
            spot_type,
            heap: BinaryHeap::from(entries),
            queued,
        }
    }

    pub fn origin(&self) -> Coordinates {
        self.origin
    }

    pub fn spot_type(&self) -> SpotType {
        self.spot_type
    }

    /// Queued entries, stale ones included.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, id: SpotId) -> bool {
        self.queued.contains(&id)
    }

    /// Queue `spot` under its distance from the origin. Spots of another type
    /// are ignored.
    pub fn insert(&mut self, id: SpotId, spot: &Spot) {
        if spot.spot_type != self.spot_type || !self.queued.insert(id) {
            return;
        }
        self.heap
            .push(Reverse((self.origin.distance_sq(spot.coords), id)));
    }

    /// Remove and return the nearest spot that is still free, dropping any
    /// occupied entries found on the way.
    pub fn pop_nearest_available(
        &mut self,
        spots: &SlotMap<SpotId, Spot>,
    ) -> Result<SpotId, NotFound> {
        while let Some(Reverse((_distance_sq, id))) = self.heap.pop() {
            self.queued.remove(&id);
            match spots.get(id) {
                Some(spot) if spot.is_available() => return Ok(id),
                _ => {
                    #[cfg(feature = "instrument")]
                    tracing::debug!(
                        target: "proximity",
                        spot_type = %self.spot_type,
                        distance_sq = _distance_sq,
                        "discarding stale entry"
                    );
                }
            }
        }
        Err(NotFound {
            spot_type: self.spot_type,
            origin: self.origin,
        })
    }
}

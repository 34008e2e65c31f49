use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tsify_next::Tsify;

use crate::billing::{BillingPolicy, Fee};
use crate::clock::{Clock, SystemClock};
use crate::config::LotConfig;
use crate::entrance::Entrance;
use crate::error::{LotError, Result};
use crate::spot::Spot;
use crate::types::{Coordinates, EntranceId, RequestId, SpotId, SpotType, Timestamp};

// ============================================================================
// Requests - What callers park and what they get back
// ============================================================================

/// A vehicle asking for a spot. The colour is only used by the colour queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub registration: RequestId,
    pub color: String,
    pub size: SpotType,
}

/// Book-keeping for a request that currently holds a spot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRequest {
    pub spot: SpotId,
    pub entrance: EntranceId,
    pub color: Option<String>,
}

/// Result of a successful assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub request: RequestId,
    pub spot: SpotId,
    pub spot_type: SpotType,
    pub coords: Coordinates,
    pub entrance: EntranceId,
    /// Euclidean distance from the entrance used.
    pub distance: f64,
    pub since: Timestamp,
}

/// Result of a release.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub request: RequestId,
    pub spot: SpotId,
    pub spot_type: SpotType,
    pub coords: Coordinates,
    pub fee: Fee,
}

// ============================================================================
// Snapshot - Read-only summary for front ends
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct TypeSnapshot {
    pub spot_type: SpotType,
    pub total: u32,
    pub available: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct EntranceSnapshot {
    pub id: u32,
    pub coords: Coordinates,
    pub queued: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct DirectorySnapshot {
    pub types: Vec<TypeSnapshot>,
    pub entrances: Vec<EntranceSnapshot>,
    pub active_requests: u32,
}

// ============================================================================
// Directory - Owns spots, entrances and the active request map
// ============================================================================

#[derive(Debug)]
pub struct Directory<C: Clock = SystemClock> {
    spots: SlotMap<SpotId, Spot>,
    entrances: Vec<Entrance>,
    active: HashMap<RequestId, ActiveRequest>,
    billing: BillingPolicy,
    clock: C,
}

impl Directory<SystemClock> {
    /// Directory on the wall clock.
    pub fn with_system_clock(config: LotConfig) -> Result<Self> {
        Self::new(config, SystemClock)
    }
}

impl<C: Clock> Directory<C> {
    pub fn new(config: LotConfig, clock: C) -> Result<Self> {
        config.validate()?;

        let specs = config.layout.spot_specs();
        let mut spots = SlotMap::with_capacity_and_key(specs.len());
        for spec in &specs {
            spots.insert(Spot::new(spec.spot_type, spec.coords()));
        }

        let entrances = config
            .entrances
            .iter()
            .enumerate()
            .map(|(i, coords)| Entrance::new(EntranceId::new(i as u32 + 1), *coords, &spots))
            .collect::<Vec<_>>();

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "directory",
            spots = spots.len() as u64,
            entrances = entrances.len() as u64,
            rate_per_hour = config.rate_per_hour,
        );

        Ok(Self {
            spots,
            entrances,
            active: HashMap::new(),
            billing: config.billing(),
            clock,
        })
    }

    // === Assignment ===

    /// Hold the spot of `spot_type` nearest to `entrance` for `request`.
    pub fn assign(&mut self, request: &str, spot_type: SpotType, entrance: EntranceId) -> Result<Placement> {
        let outcome = RequestId::new(request)
            .and_then(|request| self.place(request, spot_type, entrance, None));
        self.log_rejection("assign", request, &outcome);
        outcome
    }

    /// Like [`Directory::assign`], but remembers the vehicle's colour for the colour queries.
    pub fn assign_vehicle(&mut self, vehicle: &Vehicle, entrance: EntranceId) -> Result<Placement> {
        let outcome = self.place(
            vehicle.registration.clone(),
            vehicle.size,
            entrance,
            Some(vehicle.color.clone()),
        );
        self.log_rejection("assign", vehicle.registration.as_str(), &outcome);
        outcome
    }

    fn place(
        &mut self,
        request: RequestId,
        spot_type: SpotType,
        entrance_id: EntranceId,
        color: Option<String>,
    ) -> Result<Placement> {
        let slot = self.entrance_slot(entrance_id)?;
        if self.active.contains_key(&request) {
            return Err(LotError::AlreadyAssigned(request));
        }

        let entrance = &mut self.entrances[slot];
        let spot_id = entrance
            .nearest_available(spot_type, &self.spots)
            .map_err(|cause| LotError::NoSpotAvailable {
                spot_type,
                entrance: entrance_id,
                cause,
            })?;
        let origin = entrance.coords;

        let now = self.clock.now();
        let spot = &mut self.spots[spot_id];
        spot.occupy(request.clone(), now);
        let coords = spot.coords;
        let distance = coords.distance(origin);

        self.active.insert(
            request.clone(),
            ActiveRequest {
                spot: spot_id,
                entrance: entrance_id,
                color,
            },
        );

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "assign",
            request = request.as_str(),
            spot_type = %spot_type,
            entrance = entrance_id.0,
            x = coords.x,
            y = coords.y,
            distance = distance,
            at_ms = now.as_millis(),
        );

        Ok(Placement {
            request,
            spot: spot_id,
            spot_type,
            coords,
            entrance: entrance_id,
            distance,
            since: now,
        })
    }

    // === Release ===

    /// Free the spot held by `request` and bill it. The spot becomes
    /// discoverable from every entrance before this returns.
    pub fn release(&mut self, request: &str) -> Result<Receipt> {
        let outcome = self.vacate(request);
        self.log_rejection("release", request, &outcome);
        outcome
    }

    fn vacate(&mut self, request: &str) -> Result<Receipt> {
        let (request, ticket) = self
            .active
            .remove_entry(request)
            .ok_or_else(|| LotError::UnknownRequest(RequestId::unchecked(request)))?;

        let now = self.clock.now();
        let spot = &mut self.spots[ticket.spot];
        // The active map and spot occupancy are kept in lockstep, so a held
        // spot always has an occupancy here.
        let since = spot.vacate().map(|o| o.since).unwrap_or(now);
        let fee = self.billing.charge(since, now);
        let (spot_type, coords) = (spot.spot_type, spot.coords);

        let spot = &self.spots[ticket.spot];
        for entrance in &mut self.entrances {
            entrance.notify_available(ticket.spot, spot);
        }

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "release",
            request = request.as_str(),
            spot_type = %spot_type,
            entrance = ticket.entrance.0,
            x = coords.x,
            y = coords.y,
            elapsed_ms = fee.elapsed_ms,
            fee = fee.amount,
        );

        Ok(Receipt {
            request,
            spot: ticket.spot,
            spot_type,
            coords,
            fee,
        })
    }

    // === Queries ===

    /// Where `request` is parked.
    pub fn lookup(&self, request: &str) -> Result<Coordinates> {
        self.active
            .get(request)
            .map(|ticket| self.spots[ticket.spot].coords)
            .ok_or_else(|| LotError::UnknownRequest(RequestId::unchecked(request)))
    }

    /// Active requests whose book-keeping satisfies `predicate`, ordered by request id.
    pub fn requests_matching(
        &self,
        mut predicate: impl FnMut(&ActiveRequest) -> bool,
    ) -> Vec<(&RequestId, Coordinates)> {
        let mut hits: Vec<_> = self
            .active
            .iter()
            .filter(|(_, ticket)| predicate(ticket))
            .map(|(id, ticket)| (id, self.spots[ticket.spot].coords))
            .collect();
        hits.sort_by(|a, b| a.0.cmp(b.0));
        hits
    }

    pub fn registrations_by_color(&self, color: &str) -> Vec<RequestId> {
        self.requests_matching(|t| t.color.as_deref() == Some(color))
            .into_iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn positions_by_color(&self, color: &str) -> Vec<Coordinates> {
        self.requests_matching(|t| t.color.as_deref() == Some(color))
            .into_iter()
            .map(|(_, coords)| coords)
            .collect()
    }

    /// Free spots of `spot_type` across the whole lot.
    pub fn available(&self, spot_type: SpotType) -> usize {
        self.spots
            .values()
            .filter(|s| s.spot_type == spot_type && s.is_available())
            .count()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn active(&self) -> impl Iterator<Item = (&RequestId, &ActiveRequest)> {
        self.active.iter()
    }

    pub fn spot(&self, id: SpotId) -> Option<&Spot> {
        self.spots.get(id)
    }

    pub fn spots(&self) -> impl Iterator<Item = (SpotId, &Spot)> {
        self.spots.iter()
    }

    pub fn entrances(&self) -> &[Entrance] {
        &self.entrances
    }

    pub fn billing(&self) -> BillingPolicy {
        self.billing
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn snapshot(&self) -> DirectorySnapshot {
        let types = SpotType::all()
            .map(|spot_type| {
                let (total, available) = self
                    .spots
                    .values()
                    .filter(|s| s.spot_type == spot_type)
                    .fold((0u32, 0u32), |(t, a), s| (t + 1, a + u32::from(s.is_available())));
                TypeSnapshot {
                    spot_type,
                    total,
                    available,
                }
            })
            .collect();
        let entrances = self
            .entrances
            .iter()
            .map(|e| EntranceSnapshot {
                id: e.id.0,
                coords: e.coords,
                queued: SpotType::all().map(|t| e.queued(t) as u32).sum(),
            })
            .collect();
        DirectorySnapshot {
            types,
            entrances,
            active_requests: self.active.len() as u32,
        }
    }

    // === Helpers ===

    fn entrance_slot(&self, id: EntranceId) -> Result<usize> {
        let slot = (id.0 as usize).checked_sub(1);
        match slot {
            Some(slot) if slot < self.entrances.len() => Ok(slot),
            _ => Err(LotError::InvalidInput(format!(
                "entrance {id} does not exist (have 1..={})",
                self.entrances.len()
            ))),
        }
    }

    #[cfg_attr(not(feature = "instrument"), allow(unused_variables))]
    fn log_rejection<T>(&self, operation: &str, request: &str, outcome: &Result<T>) {
        #[cfg(feature = "instrument")]
        if let Err(err) = outcome {
            tracing::info!(
                target: "reject",
                operation = operation,
                kind = err.kind().name(),
                request = request,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::SpotSpec;
    use crate::error::ErrorKind;

    fn three_spot_lot(clock: &ManualClock) -> Directory<ManualClock> {
        let config = LotConfig::explicit(
            vec![
                SpotSpec::new(SpotType::Small, 1, 1),
                SpotSpec::new(SpotType::Medium, 2, 2),
                SpotSpec::new(SpotType::Large, 3, 3),
            ],
            10.0,
        );
        Directory::new(config, clock.clone()).unwrap()
    }

    const GATE: EntranceId = EntranceId(1);

    #[test]
    fn assign_then_release_round_trip() {
        let clock = ManualClock::default();
        let mut lot = three_spot_lot(&clock);

        let placed = lot.assign("R1", SpotType::Small, GATE).unwrap();
        assert_eq!(placed.coords, Coordinates::new(1, 1));
        assert_eq!(lot.lookup("R1").unwrap(), Coordinates::new(1, 1));
        assert_eq!(lot.available(SpotType::Small), 0);

        let receipt = lot.release("R1").unwrap();
        assert_eq!(receipt.fee.amount, 0.0);
        assert_eq!(lot.available(SpotType::Small), 1);
        assert!(lot.assign("R1", SpotType::Small, GATE).is_ok());
    }

    #[test]
    fn fee_follows_clock() {
        let clock = ManualClock::default();
        let mut lot = three_spot_lot(&clock);
        lot.assign("R1", SpotType::Large, GATE).unwrap();
        clock.advance_hours(3);
        let receipt = lot.release("R1").unwrap();
        assert!((receipt.fee.amount - 30.0).abs() < 1e-9);
        assert_eq!(receipt.spot_type, SpotType::Large);
    }

    #[test]
    fn second_request_for_last_spot_fails() {
        let clock = ManualClock::default();
        let mut lot = three_spot_lot(&clock);
        lot.assign("A", SpotType::Large, GATE).unwrap();
        let err = lot.assign("B", SpotType::Large, GATE).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSpotAvailable);
        assert!(lot.lookup("B").is_err());
        assert_eq!(lot.active_count(), 1);
    }

    #[test]
    fn duplicate_request_rejected_without_side_effects() {
        let clock = ManualClock::default();
        let mut lot = three_spot_lot(&clock);
        lot.assign("A", SpotType::Small, GATE).unwrap();
        let before = lot.snapshot();
        let err = lot.assign("A", SpotType::Medium, GATE).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyAssigned);
        assert_eq!(lot.snapshot(), before);
        assert_eq!(lot.available(SpotType::Medium), 1);
    }

    #[test]
    fn bad_inputs_are_invalid() {
        let clock = ManualClock::default();
        let mut lot = three_spot_lot(&clock);
        for entrance in [EntranceId(0), EntranceId(2)] {
            let err = lot.assign("A", SpotType::Small, entrance).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
        let err = lot.assign("", SpotType::Small, GATE).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(lot.active_count(), 0);
        assert_eq!(lot.available(SpotType::Small), 1);
    }

    #[test]
    fn unknown_requests() {
        let clock = ManualClock::default();
        let mut lot = three_spot_lot(&clock);
        assert_eq!(lot.release("ghost").unwrap_err().kind(), ErrorKind::UnknownRequest);
        assert_eq!(lot.lookup("ghost").unwrap_err().kind(), ErrorKind::UnknownRequest);
        assert_eq!(lot.release("").unwrap_err().kind(), ErrorKind::UnknownRequest);

        lot.assign("A", SpotType::Small, GATE).unwrap();
        lot.release("A").unwrap();
        assert_eq!(lot.release("A").unwrap_err().kind(), ErrorKind::UnknownRequest);
    }

    #[test]
    fn color_queries_only_see_active_vehicles() {
        let clock = ManualClock::default();
        let config = LotConfig::grid(9, 5.0);
        let mut lot = Directory::new(config, clock).unwrap();

        let vehicle = |reg: &str, color: &str, size| Vehicle {
            registration: RequestId::new(reg).unwrap(),
            color: color.to_string(),
            size,
        };
        lot.assign_vehicle(&vehicle("KA-2", "white", SpotType::Small), GATE).unwrap();
        lot.assign_vehicle(&vehicle("KA-1", "white", SpotType::Medium), GATE).unwrap();
        lot.assign_vehicle(&vehicle("KA-3", "red", SpotType::Small), GATE).unwrap();
        lot.assign("KA-4", SpotType::Large, GATE).unwrap();

        let white: Vec<_> = lot
            .registrations_by_color("white")
            .into_iter()
            .map(|r| r.as_str().to_string())
            .collect();
        assert_eq!(white, vec!["KA-1", "KA-2"]);
        assert_eq!(
            lot.positions_by_color("white"),
            vec![lot.lookup("KA-1").unwrap(), lot.lookup("KA-2").unwrap()]
        );

        lot.release("KA-2").unwrap();
        assert_eq!(lot.registrations_by_color("white").len(), 1);
        assert!(lot.registrations_by_color("blue").is_empty());
    }

    #[test]
    fn vehicle_from_json_needs_a_registration() {
        let clock = ManualClock::default();
        let mut lot = three_spot_lot(&clock);

        let blank = serde_json::from_str::<Vehicle>(
            r#"{"registration": "", "color": "red", "size": "small"}"#,
        );
        assert!(blank.is_err());

        let vehicle: Vehicle = serde_json::from_str(
            r#"{"registration": "KA-9", "color": "red", "size": "small"}"#,
        )
        .unwrap();
        lot.assign_vehicle(&vehicle, GATE).unwrap();
        assert_eq!(lot.lookup("KA-9").unwrap(), Coordinates::new(1, 1));
        assert_eq!(lot.lookup("").unwrap_err().kind(), ErrorKind::UnknownRequest);
        assert_eq!(lot.active_count(), 1);
    }

    #[test]
    fn snapshot_counts() {
        let clock = ManualClock::default();
        let mut lot = three_spot_lot(&clock);
        lot.assign("A", SpotType::Medium, GATE).unwrap();
        let snap = lot.snapshot();
        assert_eq!(snap.active_requests, 1);
        let medium = snap.types.iter().find(|t| t.spot_type == SpotType::Medium).unwrap();
        assert_eq!((medium.total, medium.available), (1, 0));
        assert_eq!(snap.entrances.len(), 1);
        assert_eq!(snap.entrances[0].queued, 2);
    }
}

use serde::{Deserialize, Serialize};
use tsify_next::Tsify;
use wasm_bindgen::prelude::*;

mod billing;
mod clock;
mod config;
mod directory;
mod entrance;
mod error;
mod proximity;
mod shared;
mod spot;
mod types;

pub use billing::*;
pub use clock::*;
pub use config::*;
pub use directory::*;
pub use entrance::*;
pub use error::*;
pub use proximity::*;
pub use shared::*;
pub use spot::*;
pub use types::*;

// ============================================================================
// WASM API - Parking lot
// ============================================================================

/// Browser clock, milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsClock;

impl Clock for JsClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(js_sys::Date::now() as u64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi)]
pub struct Positions {
    pub positions: Vec<Coordinates>,
}

/// Errors cross the boundary as `"<Kind>: <message>"` so callers can branch on the kind.
fn boundary_message(err: &LotError) -> String {
    format!("{}: {}", err.kind(), err)
}

fn to_js(err: LotError) -> JsError {
    JsError::new(&boundary_message(&err))
}

/// A JS argument that didn't decode into the expected shape.
fn malformed_argument(what: &str, err: impl std::fmt::Display) -> LotError {
    LotError::InvalidInput(format!("malformed {what}: {err}"))
}

#[wasm_bindgen]
pub struct ParkingLot {
    directory: Directory<JsClock>,
}

#[wasm_bindgen]
impl ParkingLot {
    #[wasm_bindgen(constructor)]
    pub fn new(config: LotConfig) -> std::result::Result<ParkingLot, JsError> {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();

        let directory = Directory::new(config, JsClock).map_err(to_js)?;
        Ok(Self { directory })
    }

    /// Grid lot with a single entrance at the origin
    #[wasm_bindgen]
    pub fn with_grid(total_spots: u32, rate_per_hour: f64) -> std::result::Result<ParkingLot, JsError> {
        Self::new(LotConfig::grid(total_spots, rate_per_hour))
    }

    /// Lot from explicit `[{spot_type, x, y}]` spots and `[{x, y}]` entrances
    #[wasm_bindgen]
    pub fn with_spots(
        spots: JsValue,
        entrances: JsValue,
        rate_per_hour: f64,
    ) -> std::result::Result<ParkingLot, JsError> {
        let spots: Vec<SpotSpec> = serde_wasm_bindgen::from_value(spots)
            .map_err(|e| to_js(malformed_argument("spots", e)))?;
        let entrances: Vec<Coordinates> = serde_wasm_bindgen::from_value(entrances)
            .map_err(|e| to_js(malformed_argument("entrances", e)))?;
        Self::new(LotConfig::explicit(spots, rate_per_hour).with_entrances(entrances))
    }

    /// Park a vehicle; `type_code` is 1 small, 2 medium, 3 large
    #[wasm_bindgen]
    pub fn assign(
        &mut self,
        registration: &str,
        color: &str,
        type_code: u8,
        entrance: u32,
    ) -> std::result::Result<Coordinates, JsError> {
        let vehicle = Vehicle {
            registration: RequestId::new(registration).map_err(to_js)?,
            color: color.to_string(),
            size: SpotType::from_code(type_code).map_err(to_js)?,
        };
        self.directory
            .assign_vehicle(&vehicle, EntranceId::new(entrance))
            .map(|placed| placed.coords)
            .map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn release(&mut self, registration: &str) -> std::result::Result<Fee, JsError> {
        self.directory
            .release(registration)
            .map(|receipt| receipt.fee)
            .map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn lookup(&self, registration: &str) -> std::result::Result<Coordinates, JsError> {
        self.directory.lookup(registration).map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn registrations_by_color(&self, color: &str) -> Vec<String> {
        self.directory
            .registrations_by_color(color)
            .into_iter()
            .map(|id| id.as_str().to_string())
            .collect()
    }

    #[wasm_bindgen]
    pub fn positions_by_color(&self, color: &str) -> Positions {
        Positions {
            positions: self.directory.positions_by_color(color),
        }
    }

    /// Per-type totals and availability for rendering
    #[wasm_bindgen]
    pub fn snapshot(&self) -> DirectorySnapshot {
        self.directory.snapshot()
    }
}

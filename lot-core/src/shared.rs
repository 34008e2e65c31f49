use std::sync::Arc;

use parking_lot::RwLock;

use crate::clock::Clock;
use crate::directory::{Directory, DirectorySnapshot, Placement, Receipt, Vehicle};
use crate::error::Result;
use crate::types::{Coordinates, EntranceId, RequestId, SpotType};

/// Cloneable handle for using one directory from several threads.
///
/// Writers (`assign`, `release`) hold the write lock for the whole operation,
/// release fan-out included, so a spot freed by one caller is visible to the
/// next assignment from any entrance. Queries share the read lock.
#[derive(Debug)]
pub struct SharedDirectory<C: Clock> {
    inner: Arc<RwLock<Directory<C>>>,
}

impl<C: Clock> Clone for SharedDirectory<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Clock> SharedDirectory<C> {
    pub fn new(directory: Directory<C>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(directory)),
        }
    }

    pub fn assign(&self, request: &str, spot_type: SpotType, entrance: EntranceId) -> Result<Placement> {
        self.inner.write().assign(request, spot_type, entrance)
    }

    pub fn assign_vehicle(&self, vehicle: &Vehicle, entrance: EntranceId) -> Result<Placement> {
        self.inner.write().assign_vehicle(vehicle, entrance)
    }

    pub fn release(&self, request: &str) -> Result<Receipt> {
        self.inner.write().release(request)
    }

    pub fn lookup(&self, request: &str) -> Result<Coordinates> {
        self.inner.read().lookup(request)
    }

    pub fn registrations_by_color(&self, color: &str) -> Vec<RequestId> {
        self.inner.read().registrations_by_color(color)
    }

    pub fn positions_by_color(&self, color: &str) -> Vec<Coordinates> {
        self.inner.read().positions_by_color(color)
    }

    pub fn available(&self, spot_type: SpotType) -> usize {
        self.inner.read().available(spot_type)
    }

    pub fn snapshot(&self) -> DirectorySnapshot {
        self.inner.read().snapshot()
    }

    /// Run `f` against the directory under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&Directory<C>) -> R) -> R {
        f(&self.inner.read())
    }
}

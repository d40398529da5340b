use mvd_common::GeoPoint;
use serde::{Deserialize, Serialize};

use crate::db_types::{Leg, OrderVendor, VehicleType};

/// Criteria for a driver search.
///
/// Initial assignments search the idle pool (available and not delivering). Reassignments after a
/// rejection search drivers that are mid-delivery, since the replacement takes over a job that is
/// already in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverSearch {
    pub origin: GeoPoint,
    pub radius_km: f64,
    pub vehicle_type: Option<VehicleType>,
    pub exclude: Vec<String>,
    pub require_delivering: bool,
}

impl DriverSearch {
    pub fn near(origin: GeoPoint, radius_km: f64) -> Self {
        Self { origin, radius_km, vehicle_type: None, exclude: Vec::new(), require_delivering: false }
    }

    pub fn with_vehicle(mut self, vehicle_type: VehicleType) -> Self {
        self.vehicle_type = Some(vehicle_type);
        self
    }

    pub fn excluding(mut self, driver_ids: Vec<String>) -> Self {
        self.exclude = driver_ids;
        self
    }

    /// Search drivers that are already out delivering instead of the idle pool.
    pub fn from_delivery_pool(mut self) -> Self {
        self.require_delivering = true;
        self
    }
}

/// The records touched when a vendor block is delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryCompletion {
    pub vendor: OrderVendor,
    pub leg: Leg,
    /// The driver that carried the final leg. Released back into the pool by the caller.
    pub driver_id: String,
}

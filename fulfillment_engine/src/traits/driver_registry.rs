use mvd_common::GeoPoint;
use thiserror::Error;

use crate::{
    db_types::{Driver, DriverStatus, NewDriver},
    traits::data_objects::DriverSearch,
};

#[derive(Debug, Clone, Error)]
pub enum DriverApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Driver {0} does not exist")]
    DriverNotFound(String),
    #[error("Driver {0} is already registered")]
    DriverAlreadyExists(String),
}

impl From<sqlx::Error> for DriverApiError {
    fn from(e: sqlx::Error) -> Self {
        DriverApiError::DatabaseError(e.to_string())
    }
}

/// The `DriverRegistry` trait manages the courier pool.
///
/// The interesting method is [`find_and_claim_nearest`](DriverRegistry::find_and_claim_nearest),
/// which combines the candidate search with an atomic claim so that two orders being confirmed at the
/// same moment can never walk away with the same driver.
#[allow(async_fn_in_trait)]
pub trait DriverRegistry {
    /// Registers a new driver. Drivers start in `Pending` vetting status, available and not
    /// delivering.
    async fn register_driver(&self, driver: NewDriver) -> Result<Driver, DriverApiError>;

    async fn driver_by_id(&self, driver_id: &str) -> Result<Option<Driver>, DriverApiError>;

    async fn set_driver_status(&self, driver_id: &str, status: DriverStatus) -> Result<Driver, DriverApiError>;

    async fn set_driver_location(&self, driver_id: &str, location: GeoPoint) -> Result<Driver, DriverApiError>;

    /// Finds the approved driver closest to the search origin and claims them in one step.
    ///
    /// Candidates are filtered by the search criteria, ranked nearest first by great-circle distance,
    /// and claimed with a conditional update that only succeeds if the driver is still available. If a
    /// concurrent claim wins the race for the nearest candidate, the next one is tried. Returns `None`
    /// when no candidate within the search radius could be claimed.
    ///
    /// A successful claim leaves the driver unavailable and delivering.
    async fn find_and_claim_nearest(&self, search: &DriverSearch) -> Result<Option<Driver>, DriverApiError>;

    /// Puts a driver back in the pool. `end_delivery` also clears the delivering flag; a driver
    /// released mid-job (for example after rejecting a leg) stays marked as delivering.
    async fn release_driver(&self, driver_id: &str, end_delivery: bool) -> Result<(), DriverApiError>;

    /// Number of legs currently assigned to the driver that have not reached a terminal state.
    async fn open_leg_count(&self, driver_id: &str) -> Result<i64, DriverApiError>;
}

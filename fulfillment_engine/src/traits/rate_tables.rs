use thiserror::Error;

use crate::db_types::{Category, DriverType, VehicleType};

#[derive(Debug, Clone, Error)]
pub enum RateError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for RateError {
    fn from(e: sqlx::Error) -> Self {
        RateError::DatabaseError(e.to_string())
    }
}

/// Commission percentages used when an order is settled.
///
/// Driver earnings are keyed on the (driver type, vehicle type) pair; platform commission is keyed on
/// the product category. Both tables are small and administered out of band, so the trait offers
/// simple point lookups plus the upserts needed to maintain them.
#[allow(async_fn_in_trait)]
pub trait RateTables {
    /// The earning percentage for a driver class, or `None` if no rate has been configured.
    async fn driver_commission(
        &self,
        driver_type: DriverType,
        vehicle_type: VehicleType,
    ) -> Result<Option<f64>, RateError>;

    async fn set_driver_commission(
        &self,
        driver_type: DriverType,
        vehicle_type: VehicleType,
        commission_pct: f64,
    ) -> Result<(), RateError>;

    /// The platform commission percentage for a product category.
    async fn category_rate(&self, category_id: &str) -> Result<Option<f64>, RateError>;

    async fn upsert_category(&self, category: Category) -> Result<(), RateError>;
}

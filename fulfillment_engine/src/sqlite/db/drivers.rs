use log::{debug, trace};
use mvd_common::GeoPoint;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{Driver, DriverStatus, NewDriver, VehicleType},
    traits::DriverApiError,
};

pub async fn insert_driver(driver: &NewDriver, conn: &mut SqliteConnection) -> Result<Driver, DriverApiError> {
    let id = driver.id.clone();
    let driver = sqlx::query_as::<_, Driver>(
        r#"
            INSERT INTO drivers (id, name, driver_type, vehicle_type, lat, lon)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(driver.id.clone())
    .bind(driver.name.clone())
    .bind(driver.driver_type)
    .bind(driver.vehicle_type)
    .bind(driver.location.lat)
    .bind(driver.location.lon)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => DriverApiError::DriverAlreadyExists(id),
        _ => DriverApiError::from(e),
    })?;
    debug!("🚚️ Driver [{}] registered ({} on a {})", driver.id, driver.driver_type, driver.vehicle_type);
    Ok(driver)
}

pub async fn fetch_driver(driver_id: &str, conn: &mut SqliteConnection) -> Result<Option<Driver>, sqlx::Error> {
    let driver = sqlx::query_as("SELECT * FROM drivers WHERE id = $1").bind(driver_id).fetch_optional(conn).await?;
    Ok(driver)
}

pub async fn set_status(
    driver_id: &str,
    status: DriverStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Driver>, sqlx::Error> {
    let driver = sqlx::query_as::<_, Driver>(
        "UPDATE drivers SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(status)
    .bind(driver_id)
    .fetch_optional(conn)
    .await?;
    Ok(driver)
}

pub async fn set_location(
    driver_id: &str,
    location: GeoPoint,
    conn: &mut SqliteConnection,
) -> Result<Option<Driver>, sqlx::Error> {
    let driver = sqlx::query_as::<_, Driver>(
        "UPDATE drivers SET lat = $1, lon = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $3 RETURNING *",
    )
    .bind(location.lat)
    .bind(location.lon)
    .bind(driver_id)
    .fetch_optional(conn)
    .await?;
    Ok(driver)
}

/// Approved drivers that could take a job right now. The distance ranking happens in the caller;
/// this query only narrows the pool by availability, vetting status, delivery state, vehicle and the
/// exclusion list.
pub async fn available_candidates(
    vehicle_type: Option<VehicleType>,
    delivering: bool,
    exclude: &[String],
    conn: &mut SqliteConnection,
) -> Result<Vec<Driver>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
    SELECT * FROM drivers WHERE is_available = 1 AND status = 'Approved' AND is_delivering =
    "#,
    );
    builder.push_bind(delivering);
    if let Some(vehicle) = vehicle_type {
        builder.push(" AND vehicle_type = ");
        builder.push_bind(vehicle);
    }
    if !exclude.is_empty() {
        builder.push(" AND id NOT IN (");
        let mut ids = builder.separated(", ");
        for id in exclude {
            ids.push_bind(id.clone());
        }
        builder.push(")");
    }
    trace!("🚚️ Executing candidate query: {}", builder.sql());
    let drivers = builder.build_query_as::<Driver>().fetch_all(conn).await?;
    Ok(drivers)
}

/// Claims a driver with a compare-and-set on the availability flag. Exactly one of any number of
/// concurrent claimants can win; the others see `false` and move on to their next candidate.
pub async fn claim_driver(
    driver_id: &str,
    expect_delivering: bool,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE drivers SET is_available = 0, is_delivering = 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND is_available = 1 AND is_delivering = $2;
        "#,
    )
    .bind(driver_id)
    .bind(expect_delivering)
    .execute(conn)
    .await?;
    let claimed = result.rows_affected() == 1;
    if claimed {
        debug!("🚚️ Driver [{driver_id}] claimed");
    } else {
        trace!("🚚️ Driver [{driver_id}] was not claimable");
    }
    Ok(claimed)
}

/// Returns a driver to the available pool. `end_delivery` also clears the delivering flag.
pub async fn release_driver(
    driver_id: &str,
    end_delivery: bool,
    conn: &mut SqliteConnection,
) -> Result<(), DriverApiError> {
    let result = sqlx::query(
        r#"
            UPDATE drivers
            SET is_available = 1,
                is_delivering = CASE WHEN $1 THEN 0 ELSE is_delivering END,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $2;
        "#,
    )
    .bind(end_delivery)
    .bind(driver_id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(DriverApiError::DriverNotFound(driver_id.to_string()));
    }
    debug!("🚚️ Driver [{driver_id}] released (end_delivery: {end_delivery})");
    Ok(())
}

use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{Leg, LegRejection, NewLeg, VehicleType};

pub async fn insert_leg(order_id: i64, leg: &NewLeg, conn: &mut SqliteConnection) -> Result<Leg, sqlx::Error> {
    let leg = sqlx::query_as::<_, Leg>(
        r#"
            INSERT INTO delivery_legs (
                order_id,
                sequence,
                from_lat,
                from_lon,
                from_label,
                to_lat,
                to_lon,
                to_label,
                cost
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(leg.sequence)
    .bind(leg.from.point.lat)
    .bind(leg.from.point.lon)
    .bind(leg.from.label.clone())
    .bind(leg.to.point.lat)
    .bind(leg.to.point.lon)
    .bind(leg.to.label.clone())
    .bind(leg.cost)
    .fetch_one(conn)
    .await?;
    Ok(leg)
}

pub async fn legs_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Leg>, sqlx::Error> {
    let legs = sqlx::query_as("SELECT * FROM delivery_legs WHERE order_id = $1 ORDER BY sequence")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(legs)
}

pub async fn fetch_leg(order_id: i64, sequence: i64, conn: &mut SqliteConnection) -> Result<Option<Leg>, sqlx::Error> {
    let leg = sqlx::query_as("SELECT * FROM delivery_legs WHERE order_id = $1 AND sequence = $2")
        .bind(order_id)
        .bind(sequence)
        .fetch_optional(conn)
        .await?;
    Ok(leg)
}

/// Snapshots a driver and their vehicle onto an unassigned leg. Returns `None` if the leg does not
/// exist or already has a driver.
pub async fn attach_driver(
    order_id: i64,
    sequence: i64,
    driver_id: &str,
    vehicle_type: VehicleType,
    conn: &mut SqliteConnection,
) -> Result<Option<Leg>, sqlx::Error> {
    let leg = sqlx::query_as::<_, Leg>(
        r#"
            UPDATE delivery_legs
            SET driver_id = $1,
                vehicle_type = $2,
                status = 'DriverAssigned',
                started_at = CURRENT_TIMESTAMP,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $3 AND sequence = $4 AND driver_id IS NULL AND status = 'Pending'
            RETURNING *;
        "#,
    )
    .bind(driver_id)
    .bind(vehicle_type)
    .bind(order_id)
    .bind(sequence)
    .fetch_optional(conn)
    .await?;
    if leg.is_some() {
        debug!("🧭️ Leg {sequence} of order id {order_id} assigned to driver [{driver_id}]");
    }
    Ok(leg)
}

/// Reverts a leg to the unassigned state after its driver rejected the job.
pub async fn clear_driver(
    order_id: i64,
    sequence: i64,
    driver_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Leg>, sqlx::Error> {
    let leg = sqlx::query_as::<_, Leg>(
        r#"
            UPDATE delivery_legs
            SET driver_id = NULL,
                vehicle_type = NULL,
                status = 'Pending',
                started_at = NULL,
                updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND sequence = $2 AND driver_id = $3
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(sequence)
    .bind(driver_id)
    .fetch_optional(conn)
    .await?;
    Ok(leg)
}

/// Closes out a leg when its parcel reaches the customer. The leg must hold a driver and still be
/// open.
pub async fn complete_leg(order_id: i64, sequence: i64, conn: &mut SqliteConnection) -> Result<Option<Leg>, sqlx::Error> {
    let leg = sqlx::query_as::<_, Leg>(
        r#"
            UPDATE delivery_legs
            SET status = 'Delivered', completed_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1
              AND sequence = $2
              AND driver_id IS NOT NULL
              AND status IN ('DriverAssigned', 'Picked', 'InTransit')
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(sequence)
    .fetch_optional(conn)
    .await?;
    Ok(leg)
}

pub async fn insert_rejection(
    leg_id: i64,
    driver_id: &str,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<LegRejection, sqlx::Error> {
    let rejection = sqlx::query_as::<_, LegRejection>(
        r#"
            INSERT INTO leg_rejections (leg_id, driver_id, reason) VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(leg_id)
    .bind(driver_id)
    .bind(reason)
    .fetch_one(conn)
    .await?;
    debug!("🧭️ Driver [{driver_id}] rejected leg id {leg_id}: {reason}");
    Ok(rejection)
}

pub async fn rejections_for_leg(leg_id: i64, conn: &mut SqliteConnection) -> Result<Vec<LegRejection>, sqlx::Error> {
    let rejections = sqlx::query_as("SELECT * FROM leg_rejections WHERE leg_id = $1 ORDER BY id")
        .bind(leg_id)
        .fetch_all(conn)
        .await?;
    Ok(rejections)
}

pub async fn rejected_driver_ids(leg_id: i64, conn: &mut SqliteConnection) -> Result<Vec<String>, sqlx::Error> {
    let ids = sqlx::query_scalar("SELECT DISTINCT driver_id FROM leg_rejections WHERE leg_id = $1")
        .bind(leg_id)
        .fetch_all(conn)
        .await?;
    Ok(ids)
}

/// Number of non-terminal legs currently assigned to a driver.
pub async fn open_leg_count(driver_id: &str, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let count = sqlx::query_scalar(
        r#"
            SELECT COUNT(*) FROM delivery_legs
            WHERE driver_id = $1 AND status IN ('DriverAssigned', 'Picked', 'InTransit');
        "#,
    )
    .bind(driver_id)
    .fetch_one(conn)
    .await?;
    Ok(count)
}

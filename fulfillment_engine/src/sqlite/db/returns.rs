use log::debug;
use sqlx::SqliteConnection;

use crate::{db_types::ReturnRequest, traits::FulfillmentError};

/// Opens a return request. The table holds at most one request per order, enforced by a uniqueness
/// constraint.
pub async fn insert_return(
    order_id: i64,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<ReturnRequest, FulfillmentError> {
    let request = sqlx::query_as::<_, ReturnRequest>(
        r#"
            INSERT INTO return_requests (order_id, reason) VALUES ($1, $2)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(reason)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => FulfillmentError::ReturnAlreadyRequested(order_id),
        _ => FulfillmentError::from(e),
    })?;
    debug!("↩️ Return opened for order id {order_id}: {reason}");
    Ok(request)
}

pub async fn fetch_return(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<ReturnRequest>, sqlx::Error> {
    let request = sqlx::query_as("SELECT * FROM return_requests WHERE order_id = $1")
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(request)
}

pub async fn assign_driver(
    order_id: i64,
    driver_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ReturnRequest>, sqlx::Error> {
    let request = sqlx::query_as::<_, ReturnRequest>(
        r#"
            UPDATE return_requests
            SET status = 'DriverAssigned', driver_id = $1, updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $2 AND status = 'Requested'
            RETURNING *;
        "#,
    )
    .bind(driver_id)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(request)
}

pub async fn mark_picked(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<ReturnRequest>, sqlx::Error> {
    let request = sqlx::query_as::<_, ReturnRequest>(
        r#"
            UPDATE return_requests
            SET status = 'Picked', picked_up_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND status = 'DriverAssigned'
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(request)
}

pub async fn mark_received(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<ReturnRequest>, sqlx::Error> {
    let request = sqlx::query_as::<_, ReturnRequest>(
        r#"
            UPDATE return_requests
            SET status = 'VendorReceived', received_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND status = 'Picked'
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(request)
}

pub async fn mark_completed(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<ReturnRequest>, sqlx::Error> {
    let request = sqlx::query_as::<_, ReturnRequest>(
        r#"
            UPDATE return_requests
            SET status = 'Completed', completed_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND status = 'VendorReceived'
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(request)
}

pub async fn mark_rejected(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<ReturnRequest>, sqlx::Error> {
    let request = sqlx::query_as::<_, ReturnRequest>(
        r#"
            UPDATE return_requests
            SET status = 'Rejected', updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $1 AND status = 'Requested'
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(request)
}

use sqlx::SqliteConnection;

use crate::db_types::StatusAuditEntry;

/// Appends one transition to the audit trail. Called inside the same transaction as the transition it
/// records, so the trail can never disagree with the data.
pub async fn insert_entry(
    order_id: i64,
    entity: &str,
    entity_ref: &str,
    old_status: Option<&str>,
    new_status: &str,
    reason: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO status_audit (order_id, entity, entity_ref, old_status, new_status, reason)
            VALUES ($1, $2, $3, $4, $5, $6);
        "#,
    )
    .bind(order_id)
    .bind(entity)
    .bind(entity_ref)
    .bind(old_status)
    .bind(new_status)
    .bind(reason)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn trail_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<StatusAuditEntry>, sqlx::Error> {
    let entries =
        sqlx::query_as("SELECT * FROM status_audit WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await?;
    Ok(entries)
}

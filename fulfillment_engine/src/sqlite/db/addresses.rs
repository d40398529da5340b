use sqlx::SqliteConnection;

use crate::db_types::{Address, NewAddress};

/// The customer's default delivery address, or `None` if they have never set one. If several rows are
/// flagged as default the most recently updated one wins.
pub async fn default_address_for(
    customer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Address>, sqlx::Error> {
    let address = sqlx::query_as(
        r#"
            SELECT * FROM addresses
            WHERE customer_id = $1 AND is_default = 1
            ORDER BY updated_at DESC, id DESC
            LIMIT 1;
        "#,
    )
    .bind(customer_id)
    .fetch_optional(conn)
    .await?;
    Ok(address)
}

/// Stores a new address. Setting it as the default clears the flag on the customer's other addresses
/// first, so at most one default survives.
pub async fn insert_address(address: &NewAddress, conn: &mut SqliteConnection) -> Result<Address, sqlx::Error> {
    if address.is_default {
        sqlx::query("UPDATE addresses SET is_default = 0, updated_at = CURRENT_TIMESTAMP WHERE customer_id = $1")
            .bind(address.customer_id.clone())
            .execute(&mut *conn)
            .await?;
    }
    let address = sqlx::query_as::<_, Address>(
        r#"
            INSERT INTO addresses (customer_id, lat, lon, street, city, state, country, building, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(address.customer_id.clone())
    .bind(address.location.lat)
    .bind(address.location.lon)
    .bind(address.location.street.clone())
    .bind(address.location.city.clone())
    .bind(address.location.state.clone())
    .bind(address.location.country.clone())
    .bind(address.location.building.clone())
    .bind(address.is_default)
    .fetch_one(conn)
    .await?;
    Ok(address)
}

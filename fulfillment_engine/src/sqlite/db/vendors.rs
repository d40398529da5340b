use sqlx::SqliteConnection;

use crate::db_types::{NewVendor, VendorProfile};

pub async fn upsert_vendor(vendor: &NewVendor, conn: &mut SqliteConnection) -> Result<VendorProfile, sqlx::Error> {
    let vendor = sqlx::query_as::<_, VendorProfile>(
        r#"
            INSERT INTO vendors (
                id,
                name,
                pickup_lat,
                pickup_lon,
                pickup_street,
                pickup_city,
                pickup_state,
                pickup_country,
                pickup_building
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE
            SET name = excluded.name,
                pickup_lat = excluded.pickup_lat,
                pickup_lon = excluded.pickup_lon,
                pickup_street = excluded.pickup_street,
                pickup_city = excluded.pickup_city,
                pickup_state = excluded.pickup_state,
                pickup_country = excluded.pickup_country,
                pickup_building = excluded.pickup_building,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(vendor.id.clone())
    .bind(vendor.name.clone())
    .bind(vendor.pickup.lat)
    .bind(vendor.pickup.lon)
    .bind(vendor.pickup.street.clone())
    .bind(vendor.pickup.city.clone())
    .bind(vendor.pickup.state.clone())
    .bind(vendor.pickup.country.clone())
    .bind(vendor.pickup.building.clone())
    .fetch_one(conn)
    .await?;
    Ok(vendor)
}

pub async fn fetch_vendor(vendor_id: &str, conn: &mut SqliteConnection) -> Result<Option<VendorProfile>, sqlx::Error> {
    let vendor = sqlx::query_as("SELECT * FROM vendors WHERE id = $1").bind(vendor_id).fetch_optional(conn).await?;
    Ok(vendor)
}

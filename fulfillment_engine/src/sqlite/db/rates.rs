use sqlx::SqliteConnection;

use crate::db_types::{Category, DriverType, VehicleType};

pub async fn set_driver_commission(
    driver_type: DriverType,
    vehicle_type: VehicleType,
    commission_pct: f64,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO driver_commissions (driver_type, vehicle_type, commission_pct)
            VALUES ($1, $2, $3)
            ON CONFLICT (driver_type, vehicle_type) DO UPDATE SET commission_pct = excluded.commission_pct;
        "#,
    )
    .bind(driver_type)
    .bind(vehicle_type)
    .bind(commission_pct)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn driver_commission(
    driver_type: DriverType,
    vehicle_type: VehicleType,
    conn: &mut SqliteConnection,
) -> Result<Option<f64>, sqlx::Error> {
    let pct =
        sqlx::query_scalar("SELECT commission_pct FROM driver_commissions WHERE driver_type = $1 AND vehicle_type = $2")
            .bind(driver_type)
            .bind(vehicle_type)
            .fetch_optional(conn)
            .await?;
    Ok(pct)
}

pub async fn upsert_category(category: &Category, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO categories (id, name, commission_pct)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET name = excluded.name, commission_pct = excluded.commission_pct;
        "#,
    )
    .bind(category.id.clone())
    .bind(category.name.clone())
    .bind(category.commission_pct)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn category_rate(category_id: &str, conn: &mut SqliteConnection) -> Result<Option<f64>, sqlx::Error> {
    let pct = sqlx::query_scalar("SELECT commission_pct FROM categories WHERE id = $1")
        .bind(category_id)
        .fetch_optional(conn)
        .await?;
    Ok(pct)
}

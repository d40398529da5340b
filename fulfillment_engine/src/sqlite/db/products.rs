use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{NewProduct, Product};

pub async fn upsert_product(product: &NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let product = sqlx::query_as::<_, Product>(
        r#"
            INSERT INTO products (id, vendor_id, name, price, stock_quantity, cod_allowed, order_kind, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE
            SET name = excluded.name,
                price = excluded.price,
                stock_quantity = excluded.stock_quantity,
                cod_allowed = excluded.cod_allowed,
                order_kind = excluded.order_kind,
                category_id = excluded.category_id,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(product.id.clone())
    .bind(product.vendor_id.clone())
    .bind(product.name.clone())
    .bind(product.price)
    .bind(product.stock_quantity)
    .bind(product.cod_allowed)
    .bind(product.order_kind)
    .bind(product.category_id.clone())
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn fetch_product(product_id: &str, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(product)
}

/// Decrements stock only when enough is on hand. Returns `false` if the guard failed, in which case
/// nothing was changed. Concurrent orders for the last units race through this guard; the loser gets
/// `false` and must roll back.
pub async fn decrement_stock_checked(
    product_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE products
            SET stock_quantity = stock_quantity - $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND stock_quantity >= $1;
        "#,
    )
    .bind(quantity)
    .bind(product_id)
    .execute(conn)
    .await?;
    let decremented = result.rows_affected() == 1;
    if !decremented {
        debug!("🏷️ Product [{product_id}] has insufficient stock for a decrement of {quantity}");
    }
    Ok(decremented)
}

use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::db_types::{CartItem, NewCartItem};

pub async fn cart_for_customer(customer_id: &str, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM cart_items WHERE customer_id = $1 ORDER BY id")
        .bind(customer_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Adds an item to a cart, replacing the quantity if the product is already in it.
pub async fn upsert_cart_item(item: &NewCartItem, conn: &mut SqliteConnection) -> Result<CartItem, sqlx::Error> {
    let item = sqlx::query_as::<_, CartItem>(
        r#"
            INSERT INTO cart_items (customer_id, product_id, vendor_id, quantity, price, total_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (customer_id, product_id) DO UPDATE
            SET quantity = excluded.quantity,
                price = excluded.price,
                total_price = excluded.total_price
            RETURNING *;
        "#,
    )
    .bind(item.customer_id.clone())
    .bind(item.product_id.clone())
    .bind(item.vendor_id.clone())
    .bind(item.quantity)
    .bind(item.price)
    .bind(item.total_price())
    .fetch_one(conn)
    .await?;
    Ok(item)
}

/// Deletes the given products from a customer's cart, returning the number of rows removed. When the
/// whole cart was fulfilled this leaves it empty.
pub async fn delete_cart_items(
    customer_id: &str,
    product_ids: &[String],
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    if product_ids.is_empty() {
        return Ok(0);
    }
    let mut builder = QueryBuilder::new("DELETE FROM cart_items WHERE customer_id = ");
    builder.push_bind(customer_id.to_string());
    builder.push(" AND product_id IN (");
    let mut ids = builder.separated(", ");
    for id in product_ids {
        ids.push_bind(id.clone());
    }
    builder.push(")");
    trace!("🛒️ Executing query: {}", builder.sql());
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn clear_cart(customer_id: &str, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE customer_id = $1").bind(customer_id).execute(conn).await?;
    Ok(result.rows_affected())
}

use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{
        NewOrder,
        NewOrderItem,
        NewVendorBlock,
        Order,
        OrderItem,
        OrderNumber,
        OrderVendor,
        VendorPaymentStatus,
        VendorStatus,
    },
    order_objects::OrderQueryFilter,
    traits::FulfillmentError,
};

/// Inserts the root order record. Vendor blocks, items and legs are inserted separately so the whole
/// assembly can share one transaction.
pub async fn insert_order_row(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Order, FulfillmentError> {
    let number = order.order_number.clone();
    let inserted = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (
                order_number,
                customer_id,
                order_kind,
                payment_method,
                notes,
                drop_lat,
                drop_lon,
                drop_street,
                drop_city,
                drop_state,
                drop_country,
                drop_building,
                total_items,
                sub_total,
                shipping_fee,
                grand_total
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *;
        "#,
    )
    .bind(order.order_number.clone())
    .bind(order.customer_id.clone())
    .bind(order.order_kind)
    .bind(order.payment_method)
    .bind(order.notes.clone())
    .bind(order.drop.lat)
    .bind(order.drop.lon)
    .bind(order.drop.street.clone())
    .bind(order.drop.city.clone())
    .bind(order.drop.state.clone())
    .bind(order.drop.country.clone())
    .bind(order.drop.building.clone())
    .bind(order.total_items)
    .bind(order.sub_total)
    .bind(order.shipping_fee)
    .bind(order.grand_total)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => FulfillmentError::OrderAlreadyExists(number),
        _ => FulfillmentError::from(e),
    })?;
    debug!("📦️ Order [{}] inserted with id {}", inserted.order_number, inserted.id);
    Ok(inserted)
}

pub async fn insert_vendor_block(
    order_id: i64,
    block: &NewVendorBlock,
    conn: &mut SqliteConnection,
) -> Result<OrderVendor, sqlx::Error> {
    let block = sqlx::query_as::<_, OrderVendor>(
        r#"
            INSERT INTO order_vendors (
                order_id,
                vendor_id,
                pickup_lat,
                pickup_lon,
                pickup_street,
                pickup_city,
                pickup_state,
                pickup_country,
                pickup_building,
                sub_total
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(block.vendor_id.clone())
    .bind(block.pickup.lat)
    .bind(block.pickup.lon)
    .bind(block.pickup.street.clone())
    .bind(block.pickup.city.clone())
    .bind(block.pickup.state.clone())
    .bind(block.pickup.country.clone())
    .bind(block.pickup.building.clone())
    .bind(block.sub_total)
    .fetch_one(conn)
    .await?;
    Ok(block)
}

pub async fn insert_order_item(
    order_vendor_id: i64,
    item: &NewOrderItem,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, sqlx::Error> {
    let item = sqlx::query_as::<_, OrderItem>(
        r#"
            INSERT INTO order_items (order_vendor_id, product_id, quantity, price, total_price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(order_vendor_id)
    .bind(item.product_id.clone())
    .bind(item.quantity)
    .bind(item.price)
    .bind(item.total_price)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_order_by_number(
    order_number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_number = $1")
        .bind(order_number.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

pub async fn fetch_order_by_id(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`.
///
/// Resulting orders are sorted newest first.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
    SELECT * FROM orders
    "#,
    );
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_number) = query.order_number {
        where_clause.push("order_number = ");
        where_clause.push_bind_unseparated(order_number.as_str().to_string());
    }
    if let Some(cid) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(cid);
    }
    if let Some(kind) = query.order_kind {
        where_clause.push("order_kind = ");
        where_clause.push_bind_unseparated(kind.to_string());
    }
    if let Some(vid) = query.vendor_id {
        where_clause.push("EXISTS (SELECT 1 FROM order_vendors ov WHERE ov.order_id = orders.id AND ov.vendor_id = ");
        where_clause.push_bind_unseparated(vid);
        where_clause.push_unseparated(")");
    }
    if query.vendor_status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) {
        let mut statuses = vec![];
        query.vendor_status.as_ref().unwrap().iter().for_each(|s| {
            statuses.push(format!("'{s}'"));
        });
        let status_clause = statuses.join(",");
        where_clause
            .push(format!("EXISTS (SELECT 1 FROM order_vendors ov WHERE ov.order_id = orders.id AND ov.status IN ({status_clause}))"));
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at DESC, id DESC");

    trace!("📦️ Executing query: {}", builder.sql());
    let query = builder.build_query_as::<Order>();
    let orders = query.fetch_all(conn).await?;
    trace!("📦️ Result of search_orders: {:?}", orders.len());
    Ok(orders)
}

pub async fn vendor_blocks_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderVendor>, sqlx::Error> {
    let blocks = sqlx::query_as("SELECT * FROM order_vendors WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(blocks)
}

pub async fn fetch_vendor_block(
    order_id: i64,
    vendor_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderVendor>, sqlx::Error> {
    let block = sqlx::query_as("SELECT * FROM order_vendors WHERE order_id = $1 AND vendor_id = $2")
        .bind(order_id)
        .bind(vendor_id)
        .fetch_optional(conn)
        .await?;
    Ok(block)
}

pub async fn items_for_block(block_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_vendor_id = $1 ORDER BY id")
        .bind(block_id)
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Moves a vendor block to a new status, conditional on it still being in the expected one. Returns
/// `None` when the condition did not hold, which callers surface as a stale update.
pub async fn update_vendor_status_checked(
    order_id: i64,
    vendor_id: &str,
    expected: VendorStatus,
    to: VendorStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderVendor>, sqlx::Error> {
    let block = sqlx::query_as::<_, OrderVendor>(
        r#"
            UPDATE order_vendors SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $2 AND vendor_id = $3 AND status = $4
            RETURNING *;
        "#,
    )
    .bind(to)
    .bind(order_id)
    .bind(vendor_id)
    .bind(expected)
    .fetch_optional(conn)
    .await?;
    if block.is_some() {
        debug!("📦️ Vendor block [{vendor_id}] of order id {order_id} moved {expected} -> {to}");
    }
    Ok(block)
}

/// The delivery flip: status and payment status change together, conditional on the expected status.
pub async fn deliver_vendor_block(
    order_id: i64,
    vendor_id: &str,
    expected: VendorStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderVendor>, sqlx::Error> {
    let block = sqlx::query_as::<_, OrderVendor>(
        r#"
            UPDATE order_vendors
            SET status = $1, payment_status = $2, updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $3 AND vendor_id = $4 AND status = $5
            RETURNING *;
        "#,
    )
    .bind(VendorStatus::Delivered)
    .bind(VendorPaymentStatus::Paid)
    .bind(order_id)
    .bind(vendor_id)
    .bind(expected)
    .fetch_optional(conn)
    .await?;
    Ok(block)
}

/// Flips every delivered block of the order to `Returned`. Used when the vendor takes returned goods
/// back. Returns the updated blocks.
pub async fn mark_delivered_blocks_returned(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderVendor>, sqlx::Error> {
    let blocks = sqlx::query_as::<_, OrderVendor>(
        r#"
            UPDATE order_vendors SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $2 AND status = $3
            RETURNING *;
        "#,
    )
    .bind(VendorStatus::Returned)
    .bind(order_id)
    .bind(VendorStatus::Delivered)
    .fetch_all(conn)
    .await?;
    Ok(blocks)
}

/// Marks every returned block of the order as refunded. Returns the updated blocks.
pub async fn refund_returned_blocks(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderVendor>, sqlx::Error> {
    let blocks = sqlx::query_as::<_, OrderVendor>(
        r#"
            UPDATE order_vendors SET payment_status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE order_id = $2 AND status = $3
            RETURNING *;
        "#,
    )
    .bind(VendorPaymentStatus::Refunded)
    .bind(order_id)
    .bind(VendorStatus::Returned)
    .fetch_all(conn)
    .await?;
    Ok(blocks)
}

/// Appends a driver to the set of drivers that have worked on this order. Idempotent.
pub async fn add_order_driver(order_id: i64, driver_id: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO order_drivers (order_id, driver_id) VALUES ($1, $2)
            ON CONFLICT (order_id, driver_id) DO NOTHING;
        "#,
    )
    .bind(order_id)
    .bind(driver_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn drivers_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<String>, sqlx::Error> {
    let ids = sqlx::query_scalar("SELECT driver_id FROM order_drivers WHERE order_id = $1 ORDER BY created_at, driver_id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(ids)
}

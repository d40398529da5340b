//! `SqliteDatabase` is a concrete implementation of a fulfillment engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the
//! [`traits`](crate::traits) module.
use std::fmt::Debug;

use log::*;
use mvd_common::GeoPoint;
use sqlx::SqlitePool;

use super::db::{addresses, audit, carts, db_url, drivers, legs, new_pool, orders, products, rates, returns, vendors};
use crate::{
    db_types::{
        Address,
        CartItem,
        Category,
        Driver,
        DriverStatus,
        DriverType,
        Leg,
        LegRejection,
        LegStatus,
        NewDriver,
        NewOrder,
        Order,
        OrderItem,
        OrderNumber,
        OrderVendor,
        Product,
        ReturnRequest,
        StatusAuditEntry,
        VehicleType,
        VendorProfile,
        VendorStatus,
    },
    order_objects::{FullOrder, OrderQueryFilter, VendorBlockDetail},
    traits::{
        AddressProvider,
        CartProvider,
        DeliveryCompletion,
        DriverApiError,
        DriverRegistry,
        DriverSearch,
        FulfillmentDatabase,
        FulfillmentError,
        OrderManagement,
        OrderQueryError,
        ProductCatalog,
        RateError,
        RateTables,
        StorefrontError,
        VendorDirectory,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl FulfillmentDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<FullOrder, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let inserted = orders::insert_order_row(&order, &mut tx).await?;
        for block in &order.vendors {
            let stored = orders::insert_vendor_block(inserted.id, block, &mut tx).await?;
            for item in &block.items {
                orders::insert_order_item(stored.id, item, &mut tx).await?;
                let decremented = products::decrement_stock_checked(&item.product_id, item.quantity, &mut tx).await?;
                if !decremented {
                    let available = products::fetch_product(&item.product_id, &mut tx)
                        .await?
                        .map(|p| p.stock_quantity)
                        .unwrap_or_default();
                    // Dropping the transaction rolls back the order and every decrement so far.
                    return Err(FulfillmentError::InsufficientStock {
                        product_id: item.product_id.clone(),
                        requested: item.quantity,
                        available,
                    });
                }
            }
        }
        for leg in &order.legs {
            legs::insert_leg(inserted.id, leg, &mut tx).await?;
        }
        let consumed = order.product_ids();
        let removed = carts::delete_cart_items(&inserted.customer_id, &consumed, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Order [{}] persisted with {} vendor blocks and {} legs. {removed} cart rows consumed",
            inserted.order_number,
            order.vendors.len(),
            order.legs.len()
        );
        let full = self
            .full_order(&inserted.order_number)
            .await?
            .ok_or_else(|| FulfillmentError::OrderNotFound(inserted.order_number.clone()))?;
        Ok(full)
    }

    async fn flip_vendor_status(
        &self,
        order_id: i64,
        vendor_id: &str,
        expected: VendorStatus,
        to: VendorStatus,
    ) -> Result<OrderVendor, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let block = orders::update_vendor_status_checked(order_id, vendor_id, expected, to, &mut tx).await?.ok_or_else(
            || {
                FulfillmentError::StaleStatus(format!(
                    "vendor block [{vendor_id}] of order id {order_id} is no longer {expected}"
                ))
            },
        )?;
        audit::insert_entry(
            order_id,
            "vendor",
            vendor_id,
            Some(&expected.to_string()),
            &to.to_string(),
            None,
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        Ok(block)
    }

    async fn attach_driver_to_leg(
        &self,
        order_id: i64,
        vendor_id: &str,
        sequence: i64,
        driver: &Driver,
        expected: VendorStatus,
    ) -> Result<(OrderVendor, Leg), FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let leg = legs::attach_driver(order_id, sequence, &driver.id, driver.vehicle_type, &mut tx)
            .await?
            .ok_or(FulfillmentError::LegNotFound(order_id, sequence))?;
        orders::add_order_driver(order_id, &driver.id, &mut tx).await?;
        let block = orders::update_vendor_status_checked(
            order_id,
            vendor_id,
            expected,
            VendorStatus::Confirmed,
            &mut tx,
        )
        .await?
        .ok_or_else(|| {
            FulfillmentError::StaleStatus(format!(
                "vendor block [{vendor_id}] of order id {order_id} is no longer {expected}"
            ))
        })?;
        audit::insert_entry(
            order_id,
            "vendor",
            vendor_id,
            Some(&expected.to_string()),
            &VendorStatus::Confirmed.to_string(),
            None,
            &mut tx,
        )
        .await?;
        audit::insert_entry(
            order_id,
            "leg",
            &sequence.to_string(),
            Some("Pending"),
            "DriverAssigned",
            Some(&format!("driver {}", driver.id)),
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        debug!("🗃️ Driver [{}] attached to leg {sequence} of order id {order_id}", driver.id);
        Ok((block, leg))
    }

    async fn detach_driver_after_rejection(
        &self,
        order_id: i64,
        sequence: i64,
        driver_id: &str,
        reason: &str,
    ) -> Result<Leg, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let before = legs::fetch_leg(order_id, sequence, &mut tx)
            .await?
            .ok_or(FulfillmentError::LegNotFound(order_id, sequence))?;
        let leg = legs::clear_driver(order_id, sequence, driver_id, &mut tx)
            .await?
            .ok_or(FulfillmentError::LegNotFound(order_id, sequence))?;
        legs::insert_rejection(leg.id, driver_id, reason, &mut tx).await?;
        audit::insert_entry(
            order_id,
            "leg",
            &sequence.to_string(),
            Some(&before.status.to_string()),
            "Pending",
            Some(reason),
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        Ok(leg)
    }

    async fn complete_delivery(
        &self,
        order_id: i64,
        vendor_id: &str,
        sequence: i64,
        expected: VendorStatus,
    ) -> Result<DeliveryCompletion, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let block = orders::deliver_vendor_block(order_id, vendor_id, expected, &mut tx).await?.ok_or_else(|| {
            FulfillmentError::StaleStatus(format!(
                "vendor block [{vendor_id}] of order id {order_id} is no longer {expected}"
            ))
        })?;
        // Multi-hub orders deliver several blocks over the same final leg, so the leg may already
        // be closed by an earlier block. It still must hold the driver that made the handover.
        let (leg, freshly_completed) = match legs::complete_leg(order_id, sequence, &mut tx).await? {
            Some(leg) => (leg, true),
            None => {
                let leg = legs::fetch_leg(order_id, sequence, &mut tx)
                    .await?
                    .filter(|l| l.status == LegStatus::Delivered && l.driver_id.is_some())
                    .ok_or(FulfillmentError::LegNotFound(order_id, sequence))?;
                (leg, false)
            },
        };
        let driver_id = leg
            .driver_id
            .clone()
            .ok_or_else(|| FulfillmentError::DatabaseError("delivered leg has no driver".to_string()))?;
        audit::insert_entry(
            order_id,
            "vendor",
            vendor_id,
            Some(&expected.to_string()),
            &VendorStatus::Delivered.to_string(),
            None,
            &mut tx,
        )
        .await?;
        if freshly_completed {
            audit::insert_entry(
                order_id,
                "leg",
                &sequence.to_string(),
                None,
                "Delivered",
                Some(&format!("driver {driver_id}")),
                &mut tx,
            )
            .await?;
        }
        // Same transaction: a block must never be Delivered while its courier is still marked busy.
        drivers::release_driver(&driver_id, true, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Vendor block [{vendor_id}] of order id {order_id} delivered by [{driver_id}]");
        Ok(DeliveryCompletion { vendor: block, leg, driver_id })
    }

    async fn create_return(&self, order_id: i64, reason: &str) -> Result<ReturnRequest, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        let request = returns::insert_return(order_id, reason, &mut tx).await?;
        audit::insert_entry(order_id, "return", "return", None, "Requested", Some(reason), &mut tx).await?;
        tx.commit().await?;
        Ok(request)
    }

    async fn assign_return_driver(&self, order_id: i64, driver_id: &str) -> Result<ReturnRequest, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        returns::fetch_return(order_id, &mut tx).await?.ok_or(FulfillmentError::ReturnNotFound(order_id))?;
        let request = returns::assign_driver(order_id, driver_id, &mut tx).await?.ok_or_else(|| {
            FulfillmentError::StaleStatus(format!("return for order id {order_id} is not awaiting a driver"))
        })?;
        audit::insert_entry(
            order_id,
            "return",
            "return",
            Some("Requested"),
            "DriverAssigned",
            Some(&format!("driver {driver_id}")),
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        Ok(request)
    }

    async fn mark_return_picked(&self, order_id: i64) -> Result<ReturnRequest, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        returns::fetch_return(order_id, &mut tx).await?.ok_or(FulfillmentError::ReturnNotFound(order_id))?;
        let request = returns::mark_picked(order_id, &mut tx).await?.ok_or_else(|| {
            FulfillmentError::StaleStatus(format!("return for order id {order_id} has no driver to pick it up"))
        })?;
        audit::insert_entry(order_id, "return", "return", Some("DriverAssigned"), "Picked", None, &mut tx).await?;
        tx.commit().await?;
        Ok(request)
    }

    async fn mark_return_received(&self, order_id: i64) -> Result<ReturnRequest, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        returns::fetch_return(order_id, &mut tx).await?.ok_or(FulfillmentError::ReturnNotFound(order_id))?;
        let request = returns::mark_received(order_id, &mut tx).await?.ok_or_else(|| {
            FulfillmentError::StaleStatus(format!("return for order id {order_id} has not been picked up"))
        })?;
        audit::insert_entry(order_id, "return", "return", Some("Picked"), "VendorReceived", None, &mut tx).await?;
        let returned = orders::mark_delivered_blocks_returned(order_id, &mut tx).await?;
        for block in &returned {
            audit::insert_entry(
                order_id,
                "vendor",
                &block.vendor_id,
                Some("Delivered"),
                "Returned",
                Some("return received by vendor"),
                &mut tx,
            )
            .await?;
        }
        // The courier comes free in the same transaction as the status flip.
        if let Some(driver_id) = &request.driver_id {
            drivers::release_driver(driver_id, true, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Return for order id {order_id} received. {} blocks returned", returned.len());
        Ok(request)
    }

    async fn complete_return(&self, order_id: i64) -> Result<ReturnRequest, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        returns::fetch_return(order_id, &mut tx).await?.ok_or(FulfillmentError::ReturnNotFound(order_id))?;
        let request = returns::mark_completed(order_id, &mut tx).await?.ok_or_else(|| {
            FulfillmentError::StaleStatus(format!("return for order id {order_id} has not reached the vendor"))
        })?;
        audit::insert_entry(order_id, "return", "return", Some("VendorReceived"), "Completed", None, &mut tx).await?;
        let refunded = orders::refund_returned_blocks(order_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Return for order id {order_id} completed. {} blocks refunded", refunded.len());
        Ok(request)
    }

    async fn reject_return(&self, order_id: i64, reason: &str) -> Result<ReturnRequest, FulfillmentError> {
        let mut tx = self.pool.begin().await?;
        returns::fetch_return(order_id, &mut tx).await?.ok_or(FulfillmentError::ReturnNotFound(order_id))?;
        let request = returns::mark_rejected(order_id, &mut tx).await?.ok_or_else(|| {
            FulfillmentError::StaleStatus(format!("return for order id {order_id} is past the point of rejection"))
        })?;
        audit::insert_entry(order_id, "return", "return", Some("Requested"), "Rejected", Some(reason), &mut tx).await?;
        tx.commit().await?;
        Ok(request)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_number(order_number, &mut conn).await?)
    }

    async fn order_by_id(&self, order_id: i64) -> Result<Option<Order>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_id(order_id, &mut conn).await?)
    }

    async fn full_order(&self, order_number: &OrderNumber) -> Result<Option<FullOrder>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        let order = match orders::fetch_order_by_number(order_number, &mut conn).await? {
            Some(order) => order,
            None => return Ok(None),
        };
        let blocks = orders::vendor_blocks_for_order(order.id, &mut conn).await?;
        let mut vendor_details = Vec::with_capacity(blocks.len());
        for block in blocks {
            let items = orders::items_for_block(block.id, &mut conn).await?;
            vendor_details.push(VendorBlockDetail { block, items });
        }
        let legs = legs::legs_for_order(order.id, &mut conn).await?;
        let drivers = orders::drivers_for_order(order.id, &mut conn).await?;
        let return_request = returns::fetch_return(order.id, &mut conn).await?;
        Ok(Some(FullOrder { order, vendors: vendor_details, legs, drivers, return_request }))
    }

    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(filter, &mut conn).await?)
    }

    async fn vendor_blocks(&self, order_id: i64) -> Result<Vec<OrderVendor>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::vendor_blocks_for_order(order_id, &mut conn).await?)
    }

    async fn vendor_block(&self, order_id: i64, vendor_id: &str) -> Result<Option<OrderVendor>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_vendor_block(order_id, vendor_id, &mut conn).await?)
    }

    async fn items_for_block(&self, order_vendor_id: i64) -> Result<Vec<OrderItem>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::items_for_block(order_vendor_id, &mut conn).await?)
    }

    async fn legs_for_order(&self, order_id: i64) -> Result<Vec<Leg>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(legs::legs_for_order(order_id, &mut conn).await?)
    }

    async fn leg_by_sequence(&self, order_id: i64, sequence: i64) -> Result<Option<Leg>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(legs::fetch_leg(order_id, sequence, &mut conn).await?)
    }

    async fn rejected_driver_ids(&self, leg_id: i64) -> Result<Vec<String>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(legs::rejected_driver_ids(leg_id, &mut conn).await?)
    }

    async fn leg_rejections(&self, leg_id: i64) -> Result<Vec<LegRejection>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(legs::rejections_for_leg(leg_id, &mut conn).await?)
    }

    async fn drivers_for_order(&self, order_id: i64) -> Result<Vec<String>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::drivers_for_order(order_id, &mut conn).await?)
    }

    async fn return_request(&self, order_id: i64) -> Result<Option<ReturnRequest>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(returns::fetch_return(order_id, &mut conn).await?)
    }

    async fn audit_trail(&self, order_id: i64) -> Result<Vec<StatusAuditEntry>, OrderQueryError> {
        let mut conn = self.pool.acquire().await?;
        Ok(audit::trail_for_order(order_id, &mut conn).await?)
    }
}

impl DriverRegistry for SqliteDatabase {
    async fn register_driver(&self, driver: NewDriver) -> Result<Driver, DriverApiError> {
        let mut conn = self.pool.acquire().await?;
        drivers::insert_driver(&driver, &mut conn).await
    }

    async fn driver_by_id(&self, driver_id: &str) -> Result<Option<Driver>, DriverApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(drivers::fetch_driver(driver_id, &mut conn).await?)
    }

    async fn set_driver_status(&self, driver_id: &str, status: DriverStatus) -> Result<Driver, DriverApiError> {
        let mut conn = self.pool.acquire().await?;
        drivers::set_status(driver_id, status, &mut conn)
            .await?
            .ok_or_else(|| DriverApiError::DriverNotFound(driver_id.to_string()))
    }

    async fn set_driver_location(&self, driver_id: &str, location: GeoPoint) -> Result<Driver, DriverApiError> {
        let mut conn = self.pool.acquire().await?;
        drivers::set_location(driver_id, location, &mut conn)
            .await?
            .ok_or_else(|| DriverApiError::DriverNotFound(driver_id.to_string()))
    }

    async fn find_and_claim_nearest(&self, search: &DriverSearch) -> Result<Option<Driver>, DriverApiError> {
        let mut conn = self.pool.acquire().await?;
        let candidates =
            drivers::available_candidates(search.vehicle_type, search.require_delivering, &search.exclude, &mut conn)
                .await?;
        let mut ranked = candidates
            .into_iter()
            .map(|d| (search.origin.distance_km(&d.location()), d))
            .filter(|(dist, _)| *dist <= search.radius_km)
            .collect::<Vec<_>>();
        ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        trace!("🚚️ {} candidates within {:.1} km", ranked.len(), search.radius_km);
        for (dist, candidate) in ranked {
            if drivers::claim_driver(&candidate.id, search.require_delivering, &mut conn).await? {
                debug!("🚚️ Claimed driver [{}], {dist:.2} km from the search origin", candidate.id);
                let claimed = drivers::fetch_driver(&candidate.id, &mut conn)
                    .await?
                    .ok_or_else(|| DriverApiError::DriverNotFound(candidate.id.clone()))?;
                return Ok(Some(claimed));
            }
        }
        Ok(None)
    }

    async fn release_driver(&self, driver_id: &str, end_delivery: bool) -> Result<(), DriverApiError> {
        let mut conn = self.pool.acquire().await?;
        drivers::release_driver(driver_id, end_delivery, &mut conn).await
    }

    async fn open_leg_count(&self, driver_id: &str) -> Result<i64, DriverApiError> {
        let mut conn = self.pool.acquire().await?;
        Ok(legs::open_leg_count(driver_id, &mut conn).await?)
    }
}

impl CartProvider for SqliteDatabase {
    async fn fetch_cart(&self, customer_id: &str) -> Result<Vec<CartItem>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        Ok(carts::cart_for_customer(customer_id, &mut conn).await?)
    }

    async fn clear_cart(&self, customer_id: &str) -> Result<u64, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        Ok(carts::clear_cart(customer_id, &mut conn).await?)
    }
}

impl ProductCatalog for SqliteDatabase {
    async fn product_by_id(&self, product_id: &str) -> Result<Option<Product>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_product(product_id, &mut conn).await?)
    }
}

impl AddressProvider for SqliteDatabase {
    async fn default_address(&self, customer_id: &str) -> Result<Option<Address>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        Ok(addresses::default_address_for(customer_id, &mut conn).await?)
    }
}

impl VendorDirectory for SqliteDatabase {
    async fn vendor_by_id(&self, vendor_id: &str) -> Result<Option<VendorProfile>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        Ok(vendors::fetch_vendor(vendor_id, &mut conn).await?)
    }
}

impl RateTables for SqliteDatabase {
    async fn driver_commission(
        &self,
        driver_type: DriverType,
        vehicle_type: VehicleType,
    ) -> Result<Option<f64>, RateError> {
        let mut conn = self.pool.acquire().await?;
        Ok(rates::driver_commission(driver_type, vehicle_type, &mut conn).await?)
    }

    async fn set_driver_commission(
        &self,
        driver_type: DriverType,
        vehicle_type: VehicleType,
        commission_pct: f64,
    ) -> Result<(), RateError> {
        let mut conn = self.pool.acquire().await?;
        Ok(rates::set_driver_commission(driver_type, vehicle_type, commission_pct, &mut conn).await?)
    }

    async fn category_rate(&self, category_id: &str) -> Result<Option<f64>, RateError> {
        let mut conn = self.pool.acquire().await?;
        Ok(rates::category_rate(category_id, &mut conn).await?)
    }

    async fn upsert_category(&self, category: Category) -> Result<(), RateError> {
        let mut conn = self.pool.acquire().await?;
        Ok(rates::upsert_category(&category, &mut conn).await?)
    }
}

impl SqliteDatabase {
    /// Connects to the database named by `MVD_DATABASE_URL`, or the default store.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Opening connection pool ({max_connections} connections) at {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// The underlying connection pool, for migrations and raw queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the connection pool. Outstanding connections are drained first.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

use std::fmt::Debug;

use log::*;
use mvd_common::Money;

use crate::{
    config::FulfillmentConfig,
    db_types::{
        CartItem,
        Driver,
        Leg,
        LegPoint,
        Location,
        NewLeg,
        NewOrder,
        NewOrderItem,
        NewVendorBlock,
        OrderKind,
        OrderNumber,
        OrderVendor,
        PaymentMethod,
        Product,
        VehicleType,
        VendorStatus,
    },
    events::{
        DriverAssignedEvent,
        EventProducers,
        OrderCreatedEvent,
        OrderDeliveredEvent,
        VendorStatusChangedEvent,
    },
    helpers::new_order_number,
    ofe_api::{
        notifications::{notification_for, transition_message},
        order_objects::{FullOrder, NewOrderRequest, ReassignmentOutcome, TransitionOutcome},
    },
    traits::{
        AddressProvider,
        CartProvider,
        DriverRegistry,
        DriverSearch,
        FulfillmentDatabase,
        FulfillmentError,
        ProductCatalog,
        VendorDirectory,
    },
};

/// `OrderFlowApi` is the primary API for assembling orders from carts and moving vendor blocks and
/// their transport legs through the fulfillment lifecycle.
pub struct OrderFlowApi<B> {
    db: B,
    config: FulfillmentConfig,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, config: FulfillmentConfig, producers: EventProducers) -> Self {
        Self { db, config, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: FulfillmentDatabase + DriverRegistry + CartProvider + ProductCatalog + AddressProvider + VendorDirectory
{
    /// Assembles and persists a new order from the customer's cart.
    ///
    /// The cart is filtered to the items whose product matches the requested order kind, validated
    /// (stock, cash-on-delivery permission, default address), partitioned into one vendor block per
    /// vendor with the pickup location snapshotted, and routed:
    ///
    /// * `Direct` orders get one leg per vendor block, vendor pickup to customer drop.
    /// * `MultiHub` orders get one leg per vendor to hub A, then hub A to hub B, then hub B to the
    ///   customer.
    ///
    /// The shipping fee is flat: one unit for a single-vendor order, two units otherwise. It is
    /// apportioned over the legs as each leg's `cost`. The order, its stock decrements and the
    /// removal of the fulfilled cart rows are persisted in one transaction; a concurrent sale that
    /// leaves insufficient stock aborts the whole order.
    pub async fn place_order(&self, request: NewOrderRequest) -> Result<FullOrder, FulfillmentError> {
        let cart = self.db.fetch_cart(&request.customer_id).await?;
        if cart.is_empty() {
            return Err(FulfillmentError::EmptyCart(request.customer_id.clone()));
        }
        let mut lines = Vec::with_capacity(cart.len());
        for item in cart {
            let product = self
                .db
                .product_by_id(&item.product_id)
                .await?
                .ok_or_else(|| FulfillmentError::ProductNotFound(item.product_id.clone()))?;
            if product.order_kind == request.order_kind {
                lines.push((item, product));
            }
        }
        if lines.is_empty() {
            return Err(FulfillmentError::NoMatchingItems(request.customer_id.clone()));
        }
        for (item, product) in &lines {
            if request.payment_method == PaymentMethod::Cash && !product.cod_allowed {
                return Err(FulfillmentError::CashNotAllowed(product.id.clone()));
            }
            if item.quantity > product.stock_quantity {
                return Err(FulfillmentError::InsufficientStock {
                    product_id: product.id.clone(),
                    requested: item.quantity,
                    available: product.stock_quantity,
                });
            }
        }
        let address = self
            .db
            .default_address(&request.customer_id)
            .await?
            .ok_or_else(|| FulfillmentError::NoDefaultAddress(request.customer_id.clone()))?;
        // Partition by vendor, preserving the order vendors first appear in the cart so that leg
        // sequences are stable.
        let mut by_vendor: Vec<(String, Vec<(CartItem, Product)>)> = Vec::new();
        for (item, product) in lines {
            match by_vendor.iter_mut().find(|(vendor_id, _)| *vendor_id == item.vendor_id) {
                Some((_, group)) => group.push((item, product)),
                None => by_vendor.push((item.vendor_id.clone(), vec![(item, product)])),
            }
        }
        let shipping_fee =
            if by_vendor.len() == 1 { self.config.shipping_fee_single } else { self.config.shipping_fee_multi };
        let mut blocks = Vec::with_capacity(by_vendor.len());
        let mut total_items = 0i64;
        let mut sub_total = Money::default();
        for (vendor_id, group) in by_vendor {
            let vendor = self
                .db
                .vendor_by_id(&vendor_id)
                .await?
                .ok_or_else(|| FulfillmentError::VendorNotFound(vendor_id.clone()))?;
            let items = group
                .iter()
                .map(|(item, product)| NewOrderItem {
                    product_id: product.id.clone(),
                    quantity: item.quantity,
                    price: product.price,
                    total_price: product.price * item.quantity,
                })
                .collect::<Vec<_>>();
            let block_total = items.iter().map(|i| i.total_price).sum::<Money>();
            total_items += items.iter().map(|i| i.quantity).sum::<i64>();
            sub_total += block_total;
            blocks.push(NewVendorBlock { vendor_id, pickup: vendor.pickup_location(), sub_total: block_total, items });
        }
        let drop = address.location();
        let legs = self.build_legs(request.order_kind, &blocks, &drop, shipping_fee);
        let order = NewOrder {
            order_number: OrderNumber::from(new_order_number()),
            customer_id: request.customer_id.clone(),
            order_kind: request.order_kind,
            payment_method: request.payment_method,
            notes: request.notes.clone(),
            drop,
            total_items,
            sub_total,
            shipping_fee,
            grand_total: sub_total + shipping_fee,
            vendors: blocks,
            legs,
        };
        let full = self.db.insert_order(order).await?;
        self.call_order_created_hook(&full).await;
        info!(
            "🛒️ Order [{}] placed for customer [{}]: {} vendor blocks, {} legs, {} total",
            full.order.order_number,
            full.order.customer_id,
            full.vendors.len(),
            full.legs.len(),
            full.order.grand_total
        );
        Ok(full)
    }

    /// Moves a vendor block to a new status.
    ///
    /// The new status must differ from the current one, and a block in a terminal state cannot
    /// change again. Two statuses carry side effects; the rest are a plain flip plus the
    /// status-specific message and notification copy:
    ///
    /// | New status | Effect |
    /// |------------|--------|
    /// | `Confirmed` | Delegates to [`Self::confirm_vendor`]: a driver is claimed and attached to the leg at `sequence`. Requires `vehicle_type`. |
    /// | `Delivered` | In one transaction, the block is marked delivered and paid, the leg at `sequence` completes, and its driver is released back to the idle pool. |
    /// | anything else | The block status flips, conditional on nobody else having moved it first. |
    ///
    /// Returns the refreshed order aggregate, the transition message, and the customer notification
    /// copy when the status carries any.
    pub async fn update_vendor_status(
        &self,
        order_number: &OrderNumber,
        vendor_id: &str,
        new_status: VendorStatus,
        vehicle_type: Option<VehicleType>,
        sequence: i64,
    ) -> Result<TransitionOutcome, FulfillmentError> {
        let order = self
            .db
            .order_by_number(order_number)
            .await?
            .ok_or_else(|| FulfillmentError::OrderNotFound(order_number.clone()))?;
        let block = self
            .db
            .vendor_block(order.id, vendor_id)
            .await?
            .ok_or_else(|| FulfillmentError::VendorBlockNotFound(order.id, vendor_id.to_string()))?;
        let old_status = block.status;
        if new_status == old_status {
            return Err(FulfillmentError::AlreadyInState(new_status));
        }
        if old_status.is_terminal() {
            return Err(FulfillmentError::TerminalState(old_status));
        }
        match new_status {
            VendorStatus::Confirmed => {
                let vehicle = vehicle_type.ok_or(FulfillmentError::VehicleTypeRequired)?;
                self.confirm_vendor(order_number, vendor_id, vehicle, sequence).await?;
            },
            VendorStatus::Delivered => {
                let completion = self.db.complete_delivery(order.id, vendor_id, sequence, old_status).await?;
                debug!(
                    "🔄️ Vendor block [{vendor_id}] of order [{order_number}] delivered. Driver [{}] released",
                    completion.driver_id
                );
                self.call_vendor_status_hook(VendorStatusChangedEvent::new(
                    order_number.clone(),
                    vendor_id.to_string(),
                    old_status,
                    new_status,
                ))
                .await;
            },
            _ => {
                self.db.flip_vendor_status(order.id, vendor_id, old_status, new_status).await?;
                trace!("🔄️ Vendor block [{vendor_id}] of order [{order_number}] moved {old_status} -> {new_status}");
                self.call_vendor_status_hook(VendorStatusChangedEvent::new(
                    order_number.clone(),
                    vendor_id.to_string(),
                    old_status,
                    new_status,
                ))
                .await;
            },
        }
        let full = self
            .db
            .full_order(order_number)
            .await?
            .ok_or_else(|| FulfillmentError::OrderNotFound(order_number.clone()))?;
        if new_status == VendorStatus::Delivered && full.all_delivered() {
            self.call_order_delivered_hook(OrderDeliveredEvent::new(order_number.clone())).await;
        }
        let message = transition_message(new_status).to_string();
        let notification = notification_for(new_status, order_number);
        Ok(TransitionOutcome { order: full, message, notification })
    }

    /// Confirms a vendor block by claiming the nearest driver and attaching them to the leg at
    /// `sequence`.
    ///
    /// Only approved drivers that are available, not yet delivering, match the vehicle type and sit
    /// within the configured radius of the vendor pickup point are considered, nearest first. The
    /// claim itself is atomic, so two orders confirming at the same moment can never end up with the
    /// same driver; the loser moves on to the next candidate or fails with
    /// [`FulfillmentError::NoDriverAvailable`], leaving the block as it was.
    ///
    /// The claim happens outside the order transaction. If attaching the driver to the order fails,
    /// the claim is released again before the error is returned.
    pub async fn confirm_vendor(
        &self,
        order_number: &OrderNumber,
        vendor_id: &str,
        vehicle_type: VehicleType,
        sequence: i64,
    ) -> Result<(OrderVendor, Leg, Driver), FulfillmentError> {
        let order = self
            .db
            .order_by_number(order_number)
            .await?
            .ok_or_else(|| FulfillmentError::OrderNotFound(order_number.clone()))?;
        let block = self
            .db
            .vendor_block(order.id, vendor_id)
            .await?
            .ok_or_else(|| FulfillmentError::VendorBlockNotFound(order.id, vendor_id.to_string()))?;
        if block.status == VendorStatus::Confirmed {
            return Err(FulfillmentError::AlreadyInState(VendorStatus::Confirmed));
        }
        if block.status.is_terminal() {
            return Err(FulfillmentError::TerminalState(block.status));
        }
        let search =
            DriverSearch::near(block.pickup_point(), self.config.search_radius_km).with_vehicle(vehicle_type);
        let driver =
            self.db.find_and_claim_nearest(&search).await?.ok_or(FulfillmentError::NoDriverAvailable)?;
        match self.db.attach_driver_to_leg(order.id, vendor_id, sequence, &driver, block.status).await {
            Ok((updated, leg)) => {
                info!(
                    "🔄️ Vendor block [{vendor_id}] of order [{order_number}] confirmed. Driver [{}] takes leg \
                     {sequence}",
                    driver.id
                );
                self.call_vendor_status_hook(VendorStatusChangedEvent::new(
                    order_number.clone(),
                    vendor_id.to_string(),
                    block.status,
                    VendorStatus::Confirmed,
                ))
                .await;
                self.call_driver_assigned_hook(DriverAssignedEvent::new(
                    order_number.clone(),
                    vendor_id.to_string(),
                    sequence,
                    driver.clone(),
                ))
                .await;
                Ok((updated, leg, driver))
            },
            Err(e) => {
                warn!(
                    "🔄️ Could not attach driver [{}] to leg {sequence} of order [{order_number}]: {e}. Releasing \
                     the claim",
                    driver.id
                );
                if let Err(release_err) = self.db.release_driver(&driver.id, true).await {
                    error!("🔄️ Compensating release of driver [{}] failed: {release_err}", driver.id);
                }
                Err(e)
            },
        }
    }

    /// Handles a driver rejecting the leg at `sequence` and finds a replacement.
    ///
    /// The rejecting driver is recorded against the leg, detached, and released back into the pool
    /// without clearing their delivering flag. The replacement search runs against drivers that are
    /// available *and already delivering*, since a replacement takes over a job that is in flight;
    /// every driver that has rejected this leg before is excluded.
    ///
    /// Finding nobody is not an error: the leg stays unassigned, the vendor block reverts to
    /// `Pending`, and [`ReassignmentOutcome::NoDriverAvailable`] is returned so the caller can retry
    /// later.
    pub async fn reassign_driver(
        &self,
        order_number: &OrderNumber,
        vendor_id: &str,
        reason: &str,
        sequence: i64,
    ) -> Result<ReassignmentOutcome, FulfillmentError> {
        let order = self
            .db
            .order_by_number(order_number)
            .await?
            .ok_or_else(|| FulfillmentError::OrderNotFound(order_number.clone()))?;
        let block = self
            .db
            .vendor_block(order.id, vendor_id)
            .await?
            .ok_or_else(|| FulfillmentError::VendorBlockNotFound(order.id, vendor_id.to_string()))?;
        if block.status.is_terminal() {
            return Err(FulfillmentError::TerminalState(block.status));
        }
        let leg = self
            .db
            .leg_by_sequence(order.id, sequence)
            .await?
            .ok_or(FulfillmentError::LegNotFound(order.id, sequence))?;
        if let Some(old_driver) = leg.driver_id.clone() {
            self.db.detach_driver_after_rejection(order.id, sequence, &old_driver, reason).await?;
            // The rejecting driver stays in the delivery pool; only availability comes back.
            self.db.release_driver(&old_driver, false).await?;
            debug!("🔄️ Driver [{old_driver}] rejected leg {sequence} of order [{order_number}]: {reason}");
        }
        let rejected = self.db.rejected_driver_ids(leg.id).await?;
        let search = DriverSearch::near(block.pickup_point(), self.config.search_radius_km)
            .excluding(rejected)
            .from_delivery_pool();
        let replacement = match self.db.find_and_claim_nearest(&search).await? {
            Some(driver) => driver,
            None => {
                if block.status != VendorStatus::Pending {
                    self.db.flip_vendor_status(order.id, vendor_id, block.status, VendorStatus::Pending).await?;
                    self.call_vendor_status_hook(VendorStatusChangedEvent::new(
                        order_number.clone(),
                        vendor_id.to_string(),
                        block.status,
                        VendorStatus::Pending,
                    ))
                    .await;
                }
                info!("🔄️ No replacement driver for leg {sequence} of order [{order_number}]. Block back to Pending");
                return Ok(ReassignmentOutcome::NoDriverAvailable);
            },
        };
        match self.db.attach_driver_to_leg(order.id, vendor_id, sequence, &replacement, block.status).await {
            Ok((_, leg)) => {
                info!("🔄️ Leg {sequence} of order [{order_number}] reassigned to driver [{}]", replacement.id);
                if block.status != VendorStatus::Confirmed {
                    self.call_vendor_status_hook(VendorStatusChangedEvent::new(
                        order_number.clone(),
                        vendor_id.to_string(),
                        block.status,
                        VendorStatus::Confirmed,
                    ))
                    .await;
                }
                self.call_driver_assigned_hook(DriverAssignedEvent::new(
                    order_number.clone(),
                    vendor_id.to_string(),
                    sequence,
                    replacement.clone(),
                ))
                .await;
                Ok(ReassignmentOutcome::Reassigned { driver: replacement, leg })
            },
            Err(e) => {
                warn!(
                    "🔄️ Could not attach replacement driver [{}] to leg {sequence} of order [{order_number}]: {e}. \
                     Releasing the claim",
                    replacement.id
                );
                // The replacement came out of the delivery pool, so the delivering flag stays.
                if let Err(release_err) = self.db.release_driver(&replacement.id, false).await {
                    error!("🔄️ Compensating release of driver [{}] failed: {release_err}", replacement.id);
                }
                Err(e)
            },
        }
    }

    fn build_legs(
        &self,
        kind: OrderKind,
        blocks: &[NewVendorBlock],
        drop: &Location,
        shipping_fee: Money,
    ) -> Vec<NewLeg> {
        let customer = LegPoint::new(drop.point(), "customer");
        let mut legs = match kind {
            OrderKind::Direct => blocks
                .iter()
                .enumerate()
                .map(|(i, block)| NewLeg {
                    sequence: i as i64 + 1,
                    from: LegPoint::new(block.pickup.point(), format!("vendor:{}", block.vendor_id)),
                    to: customer.clone(),
                    cost: Money::default(),
                })
                .collect(),
            OrderKind::MultiHub => {
                let hub_a = LegPoint::new(self.config.hub_a, "hub-a");
                let hub_b = LegPoint::new(self.config.hub_b, "hub-b");
                let mut legs = blocks
                    .iter()
                    .enumerate()
                    .map(|(i, block)| NewLeg {
                        sequence: i as i64 + 1,
                        from: LegPoint::new(block.pickup.point(), format!("vendor:{}", block.vendor_id)),
                        to: hub_a.clone(),
                        cost: Money::default(),
                    })
                    .collect::<Vec<_>>();
                let n = blocks.len() as i64;
                legs.push(NewLeg { sequence: n + 1, from: hub_a, to: hub_b.clone(), cost: Money::default() });
                legs.push(NewLeg { sequence: n + 2, from: hub_b, to: customer, cost: Money::default() });
                legs
            },
        };
        // Each leg carries an even share of the shipping fee, in whole cents; the final leg absorbs
        // the division remainder so the leg costs always sum back to the fee.
        let share = shipping_fee.value() / legs.len() as i64;
        let remainder = shipping_fee.value() % legs.len() as i64;
        for leg in &mut legs {
            leg.cost = Money::from_cents(share);
        }
        if let Some(last) = legs.last_mut() {
            last.cost += Money::from_cents(remainder);
        }
        legs
    }

    async fn call_order_created_hook(&self, order: &FullOrder) {
        for emitter in &self.producers.order_created_producer {
            debug!("🛒️ Notifying order created hook subscribers");
            let event = OrderCreatedEvent::new(order.order.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_vendor_status_hook(&self, event: VendorStatusChangedEvent) {
        for emitter in &self.producers.vendor_status_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    async fn call_driver_assigned_hook(&self, event: DriverAssignedEvent) {
        for emitter in &self.producers.driver_assigned_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    async fn call_order_delivered_hook(&self, event: OrderDeliveredEvent) {
        for emitter in &self.producers.order_delivered_producer {
            debug!("🛒️ Notifying order delivered hook subscribers");
            emitter.publish_event(event.clone()).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

use std::fmt::Debug;

use log::*;

use crate::{
    config::FulfillmentConfig,
    db_types::{Driver, Order, OrderNumber, ReturnRequest, ReturnStatus, VendorStatus},
    events::{EventProducers, ReturnStatusChangedEvent},
    traits::{DriverRegistry, DriverSearch, FulfillmentDatabase, FulfillmentError},
};

/// `ReturnsApi` drives the whole-order return workflow.
///
/// The lifecycle is `Requested` -> `DriverAssigned` -> `Picked` -> `VendorReceived` -> `Completed`,
/// with `Rejected` as the terminal alternative for requests turned down before a courier was
/// assigned. A return moves the goods the opposite way to a delivery: the pickup is the customer's
/// drop location and the destination is the vendor.
pub struct ReturnsApi<B> {
    db: B,
    config: FulfillmentConfig,
    producers: EventProducers,
}

impl<B> Debug for ReturnsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReturnsApi")
    }
}

impl<B> ReturnsApi<B> {
    pub fn new(db: B, config: FulfillmentConfig, producers: EventProducers) -> Self {
        Self { db, config, producers }
    }
}

impl<B> ReturnsApi<B>
where B: FulfillmentDatabase + DriverRegistry
{
    /// Opens a return request for an order.
    ///
    /// At least one vendor block must have been delivered, otherwise there is nothing to send back
    /// and the call fails with [`FulfillmentError::NothingDelivered`]. An order can only ever have
    /// one return request.
    pub async fn request_return(
        &self,
        order_number: &OrderNumber,
        reason: &str,
    ) -> Result<ReturnRequest, FulfillmentError> {
        let order = self.order(order_number).await?;
        let blocks = self.db.vendor_blocks(order.id).await?;
        if !blocks.iter().any(|b| b.status == VendorStatus::Delivered) {
            return Err(FulfillmentError::NothingDelivered(order.id));
        }
        let request = self.db.create_return(order.id, reason).await?;
        info!("↩️ Return requested for order [{order_number}]: {reason}");
        self.call_return_status_hook(ReturnStatusChangedEvent::new(
            order_number.clone(),
            None,
            ReturnStatus::Requested,
        ))
        .await;
        Ok(request)
    }

    /// Claims the nearest idle driver to the customer's drop location and assigns them to the
    /// return. If the order mutation fails after the claim, the claim is released again.
    pub async fn assign_return_driver(
        &self,
        order_number: &OrderNumber,
    ) -> Result<(ReturnRequest, Driver), FulfillmentError> {
        let order = self.order(order_number).await?;
        let search = DriverSearch::near(order.drop_point(), self.config.search_radius_km);
        let driver =
            self.db.find_and_claim_nearest(&search).await?.ok_or(FulfillmentError::NoDriverAvailable)?;
        match self.db.assign_return_driver(order.id, &driver.id).await {
            Ok(request) => {
                info!("↩️ Driver [{}] assigned to the return of order [{order_number}]", driver.id);
                self.call_return_status_hook(ReturnStatusChangedEvent::new(
                    order_number.clone(),
                    Some(ReturnStatus::Requested),
                    ReturnStatus::DriverAssigned,
                ))
                .await;
                Ok((request, driver))
            },
            Err(e) => {
                warn!(
                    "↩️ Could not assign driver [{}] to the return of order [{order_number}]: {e}. Releasing the \
                     claim",
                    driver.id
                );
                if let Err(release_err) = self.db.release_driver(&driver.id, true).await {
                    error!("↩️ Compensating release of driver [{}] failed: {release_err}", driver.id);
                }
                Err(e)
            },
        }
    }

    /// Records that the courier collected the goods from the customer.
    pub async fn confirm_pickup(&self, order_number: &OrderNumber) -> Result<ReturnRequest, FulfillmentError> {
        let order = self.order(order_number).await?;
        let request = self.db.mark_return_picked(order.id).await?;
        self.call_return_status_hook(ReturnStatusChangedEvent::new(
            order_number.clone(),
            Some(ReturnStatus::DriverAssigned),
            ReturnStatus::Picked,
        ))
        .await;
        Ok(request)
    }

    /// Records that the vendor has the goods back.
    ///
    /// Every delivered vendor block of the order flips to `Returned` in the same transaction, and
    /// the courier is released back to the idle pool. `VendorReceived` is a durable state; refunds
    /// happen in the separate [`Self::complete_return`] step.
    pub async fn confirm_vendor_receipt(&self, order_number: &OrderNumber) -> Result<ReturnRequest, FulfillmentError> {
        let order = self.order(order_number).await?;
        let request = self.db.mark_return_received(order.id).await?;
        if let Some(driver_id) = &request.driver_id {
            debug!("↩️ Courier [{driver_id}] released after vendor receipt for order [{order_number}]");
        }
        self.call_return_status_hook(ReturnStatusChangedEvent::new(
            order_number.clone(),
            Some(ReturnStatus::Picked),
            ReturnStatus::VendorReceived,
        ))
        .await;
        Ok(request)
    }

    /// Closes the return and marks the returned vendor blocks refunded.
    pub async fn complete_return(&self, order_number: &OrderNumber) -> Result<ReturnRequest, FulfillmentError> {
        let order = self.order(order_number).await?;
        let request = self.db.complete_return(order.id).await?;
        info!("↩️ Return for order [{order_number}] completed");
        self.call_return_status_hook(ReturnStatusChangedEvent::new(
            order_number.clone(),
            Some(ReturnStatus::VendorReceived),
            ReturnStatus::Completed,
        ))
        .await;
        Ok(request)
    }

    /// Turns down a return request. Only a request nobody has acted on yet can be rejected.
    pub async fn reject_return(
        &self,
        order_number: &OrderNumber,
        reason: &str,
    ) -> Result<ReturnRequest, FulfillmentError> {
        let order = self.order(order_number).await?;
        let request = self.db.reject_return(order.id, reason).await?;
        info!("↩️ Return for order [{order_number}] rejected: {reason}");
        self.call_return_status_hook(ReturnStatusChangedEvent::new(
            order_number.clone(),
            Some(ReturnStatus::Requested),
            ReturnStatus::Rejected,
        ))
        .await;
        Ok(request)
    }

    async fn order(&self, order_number: &OrderNumber) -> Result<Order, FulfillmentError> {
        self.db
            .order_by_number(order_number)
            .await?
            .ok_or_else(|| FulfillmentError::OrderNotFound(order_number.clone()))
    }

    async fn call_return_status_hook(&self, event: ReturnStatusChangedEvent) {
        for emitter in &self.producers.return_status_producer {
            emitter.publish_event(event.clone()).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

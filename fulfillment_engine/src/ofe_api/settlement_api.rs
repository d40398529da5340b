use std::fmt::Debug;

use log::*;
use mvd_common::Money;
use serde::{Deserialize, Serialize};

use crate::{
    config::{EarningBasis, FulfillmentConfig},
    db_types::{Leg, LegStatus, OrderItem, OrderKind, OrderNumber, VendorPaymentStatus, VendorStatus},
    ofe_api::errors::SettlementError,
    traits::{DriverRegistry, OrderManagement, ProductCatalog, RateTables},
};

/// One vendor block's share of an order's money.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorSettlement {
    pub vendor_id: String,
    /// The amount the driver commission percentage was applied to.
    pub basis: Money,
    /// The driver that carried this vendor's goods, if one could be identified.
    pub driver_id: Option<String>,
    pub driver_earning: Money,
    pub platform_commission: Money,
    /// What is left for the vendor after the driver and the platform took their cuts.
    pub vendor_earning: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSettlement {
    pub order_number: OrderNumber,
    pub vendors: Vec<VendorSettlement>,
}

impl OrderSettlement {
    pub fn total_driver_earnings(&self) -> Money {
        self.vendors.iter().map(|v| v.driver_earning).sum()
    }

    pub fn total_platform_commission(&self) -> Money {
        self.vendors.iter().map(|v| v.platform_commission).sum()
    }
}

/// `SettlementApi` computes who gets what once goods have been delivered.
///
/// For every vendor block that is `Delivered` and `Paid`:
/// * the driver earning is the commission percentage for the driver's (type, vehicle) class,
///   applied to the configured basis (the order grand total by default, or the block subtotal);
/// * the platform commission sums each line item's category rate applied to the item total;
/// * the vendor earning is the residual after both cuts.
///
/// Blocks without a matching commission row, or whose product categories cannot be resolved, get a
/// zero cut for that component rather than an error. Settlement is a pure read; nothing is written
/// back to the order.
pub struct SettlementApi<B> {
    db: B,
    config: FulfillmentConfig,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B> SettlementApi<B> {
    pub fn new(db: B, config: FulfillmentConfig) -> Self {
        Self { db, config }
    }
}

impl<B> SettlementApi<B>
where B: OrderManagement + DriverRegistry + RateTables + ProductCatalog
{
    /// Settles every delivered and paid vendor block of the order. Blocks that have not reached
    /// that state are skipped.
    pub async fn settle_order(&self, order_number: &OrderNumber) -> Result<OrderSettlement, SettlementError> {
        let full = self
            .db
            .full_order(order_number)
            .await?
            .ok_or_else(|| SettlementError::OrderNotFound(order_number.clone()))?;
        let mut settlements = Vec::new();
        for (index, detail) in full.vendors.iter().enumerate() {
            let block = &detail.block;
            if block.status != VendorStatus::Delivered || block.payment_status != VendorPaymentStatus::Paid {
                trace!(
                    "💵️ Skipping block [{}] of order [{order_number}]: {} / {}",
                    block.vendor_id,
                    block.status,
                    block.payment_status
                );
                continue;
            }
            let basis = match self.config.earning_basis {
                EarningBasis::OrderGrandTotal => full.order.grand_total,
                EarningBasis::VendorSubtotal => block.sub_total,
            };
            let leg = delivering_leg(&full.legs, full.order.order_kind, index as i64 + 1);
            let (driver_id, driver_earning) = match leg.and_then(|l| l.driver_id.clone().map(|d| (l, d))) {
                Some((leg, driver_id)) => {
                    let earning = self.driver_earning(basis, leg, &driver_id).await?;
                    (Some(driver_id), earning)
                },
                None => {
                    warn!(
                        "💵️ No delivered leg with a driver found for block [{}] of order [{order_number}]",
                        block.vendor_id
                    );
                    (None, Money::default())
                },
            };
            let platform_commission = self.platform_commission(&detail.items).await?;
            let vendor_earning = basis - driver_earning - platform_commission;
            settlements.push(VendorSettlement {
                vendor_id: block.vendor_id.clone(),
                basis,
                driver_id,
                driver_earning,
                platform_commission,
                vendor_earning,
            });
        }
        debug!("💵️ Order [{order_number}] settled across {} vendor blocks", settlements.len());
        Ok(OrderSettlement { order_number: order_number.clone(), vendors: settlements })
    }

    /// The settlement for a single vendor block, or `None` if the block does not exist or has not
    /// been delivered and paid yet.
    pub async fn vendor_settlement(
        &self,
        order_number: &OrderNumber,
        vendor_id: &str,
    ) -> Result<Option<VendorSettlement>, SettlementError> {
        let settlement = self.settle_order(order_number).await?;
        Ok(settlement.vendors.into_iter().find(|v| v.vendor_id == vendor_id))
    }

    async fn driver_earning(&self, basis: Money, leg: &Leg, driver_id: &str) -> Result<Money, SettlementError> {
        let Some(driver) = self.db.driver_by_id(driver_id).await? else {
            warn!("💵️ Driver [{driver_id}] on a delivered leg no longer exists. Earning zeroed");
            return Ok(Money::default());
        };
        // The vehicle snapshotted on the leg wins over the driver's current one.
        let vehicle = leg.vehicle_type.unwrap_or(driver.vehicle_type);
        match self.db.driver_commission(driver.driver_type, vehicle).await? {
            Some(pct) => Ok(basis.percent(pct)),
            None => {
                debug!("💵️ No commission configured for {} / {vehicle}. Earning zeroed", driver.driver_type);
                Ok(Money::default())
            },
        }
    }

    async fn platform_commission(&self, items: &[OrderItem]) -> Result<Money, SettlementError> {
        let mut commission = Money::default();
        for item in items {
            let Some(product) = self.db.product_by_id(&item.product_id).await? else {
                continue;
            };
            let Some(category_id) = product.category_id else {
                continue;
            };
            if let Some(rate) = self.db.category_rate(&category_id).await? {
                commission += item.total_price.percent(rate);
            }
        }
        Ok(commission)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

/// The leg whose driver carried this vendor's goods to the customer. Direct orders map blocks to
/// legs one-to-one by sequence; on a multi-hub route the driver of the final delivered leg made the
/// customer handover.
fn delivering_leg(legs: &[Leg], kind: OrderKind, block_sequence: i64) -> Option<&Leg> {
    match kind {
        OrderKind::Direct => legs
            .iter()
            .find(|l| l.sequence == block_sequence && l.status == LegStatus::Delivered && l.driver_id.is_some()),
        OrderKind::MultiHub => legs
            .iter()
            .filter(|l| l.status == LegStatus::Delivered && l.driver_id.is_some())
            .max_by_key(|l| l.sequence),
    }
}

use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{
        Driver,
        Leg,
        Order,
        OrderItem,
        OrderKind,
        OrderNumber,
        OrderVendor,
        PaymentMethod,
        ReturnRequest,
        VendorStatus,
    },
    ofe_api::notifications::CustomerNotification,
    traits::OrderQueryError,
};

/// The complete aggregate for a single order: the root record, every vendor block with its line
/// items, the transport legs, the drivers that have worked on it, and the return request if one
/// was made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullOrder {
    pub order: Order,
    pub vendors: Vec<VendorBlockDetail>,
    pub legs: Vec<Leg>,
    pub drivers: Vec<String>,
    pub return_request: Option<ReturnRequest>,
}

impl FullOrder {
    pub fn block_for(&self, vendor_id: &str) -> Option<&OrderVendor> {
        self.vendors.iter().map(|v| &v.block).find(|b| b.vendor_id == vendor_id)
    }

    pub fn leg(&self, sequence: i64) -> Option<&Leg> {
        self.legs.iter().find(|l| l.sequence == sequence)
    }

    /// True once every vendor block has reached `Delivered`.
    pub fn all_delivered(&self) -> bool {
        !self.vendors.is_empty() && self.vendors.iter().all(|v| v.block.status == VendorStatus::Delivered)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorBlockDetail {
    pub block: OrderVendor,
    pub items: Vec<OrderItem>,
}

/// What a customer submits to place an order. Everything else (cart contents, address, totals,
/// pickup snapshots and legs) is resolved by the order flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub customer_id: String,
    pub payment_method: PaymentMethod,
    pub order_kind: OrderKind,
    pub notes: Option<String>,
}

impl NewOrderRequest {
    pub fn new<S: Into<String>>(customer_id: S, payment_method: PaymentMethod, order_kind: OrderKind) -> Self {
        Self { customer_id: customer_id.into(), payment_method, order_kind, notes: None }
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// The result of a vendor block transition: the refreshed aggregate, the human-readable message
/// for the transition, and the push copy when the new status carries any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub order: FullOrder,
    pub message: String,
    pub notification: Option<CustomerNotification>,
}

/// How a reassignment ended. Finding nobody in the delivery pool is a normal outcome, not an
/// error; the leg stays unassigned and the vendor block reverts to `Pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ReassignmentOutcome {
    Reassigned { driver: Driver, leg: Leg },
    NoDriverAvailable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub order_number: Option<OrderNumber>,
    pub customer_id: Option<String>,
    pub order_kind: Option<OrderKind>,
    pub vendor_id: Option<String>,
    pub vendor_status: Option<Vec<VendorStatus>>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl OrderQueryFilter {
    pub fn with_order_number(mut self, order_number: OrderNumber) -> Self {
        self.order_number = Some(order_number);
        self
    }

    pub fn with_customer_id(mut self, customer_id: String) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_order_kind(mut self, kind: OrderKind) -> Self {
        self.order_kind = Some(kind);
        self
    }

    pub fn with_vendor_id(mut self, vendor_id: String) -> Self {
        self.vendor_id = Some(vendor_id);
        self
    }

    pub fn with_vendor_status(mut self, status: VendorStatus) -> Self {
        self.vendor_status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn since<T>(mut self, since: T) -> Result<Self, OrderQueryError>
    where
        T: TryInto<DateTime<Utc>>,
        T::Error: Display,
    {
        let dt = since.try_into().map_err(|e| OrderQueryError::QueryError(e.to_string()))?;
        self.since = Some(dt);
        Ok(self)
    }

    pub fn until<T>(mut self, until: T) -> Result<Self, OrderQueryError>
    where
        T: TryInto<DateTime<Utc>>,
        T::Error: Display,
    {
        let dt = until.try_into().map_err(|e| OrderQueryError::QueryError(e.to_string()))?;
        self.until = Some(dt);
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.order_number.is_none() &&
            self.customer_id.is_none() &&
            self.order_kind.is_none() &&
            self.vendor_id.is_none() &&
            self.vendor_status.is_none() &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "unfiltered");
        }
        let mut parts = Vec::new();
        if let Some(order_number) = &self.order_number {
            parts.push(format!("number={order_number}"));
        }
        if let Some(customer_id) = &self.customer_id {
            parts.push(format!("customer={customer_id}"));
        }
        if let Some(kind) = &self.order_kind {
            parts.push(format!("kind={kind}"));
        }
        if let Some(vendor_id) = &self.vendor_id {
            parts.push(format!("vendor={vendor_id}"));
        }
        if let Some(statuses) = &self.vendor_status {
            let statuses = statuses.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
            parts.push(format!("vendor_status in [{statuses}]"));
        }
        if let Some(since) = &self.since {
            parts.push(format!("since {since}"));
        }
        if let Some(until) = &self.until {
            parts.push(format!("until {until}"));
        }
        write!(f, "{}", parts.join(", "))
    }
}

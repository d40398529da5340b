use serde::{Deserialize, Serialize};

use crate::db_types::{Driver, Order, OrderNumber, ReturnStatus, VendorStatus};

/// Fired once when a new order has been assembled and persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Fired on every vendor block transition, including the ones that carry side effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorStatusChangedEvent {
    pub order_number: OrderNumber,
    pub vendor_id: String,
    pub old_status: VendorStatus,
    pub new_status: VendorStatus,
}

impl VendorStatusChangedEvent {
    pub fn new(order_number: OrderNumber, vendor_id: String, old_status: VendorStatus, new_status: VendorStatus) -> Self {
        Self { order_number, vendor_id, old_status, new_status }
    }
}

/// Fired when a driver is claimed and attached to a transport leg, both on the first assignment and
/// on every reassignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverAssignedEvent {
    pub order_number: OrderNumber,
    pub vendor_id: String,
    pub sequence: i64,
    pub driver: Driver,
}

impl DriverAssignedEvent {
    pub fn new(order_number: OrderNumber, vendor_id: String, sequence: i64, driver: Driver) -> Self {
        Self { order_number, vendor_id, sequence, driver }
    }
}

/// Fired when the last vendor block of an order reaches `Delivered`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDeliveredEvent {
    pub order_number: OrderNumber,
}

impl OrderDeliveredEvent {
    pub fn new(order_number: OrderNumber) -> Self {
        Self { order_number }
    }
}

/// Fired on every transition of a return request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnStatusChangedEvent {
    pub order_number: OrderNumber,
    pub old_status: Option<ReturnStatus>,
    pub new_status: ReturnStatus,
}

impl ReturnStatusChangedEvent {
    pub fn new(order_number: OrderNumber, old_status: Option<ReturnStatus>, new_status: ReturnStatus) -> Self {
        Self { order_number, old_status, new_status }
    }
}

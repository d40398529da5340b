use thiserror::Error;

use crate::{
    db_types::{Leg, LegRejection, Order, OrderItem, OrderNumber, OrderVendor, ReturnRequest, StatusAuditEntry},
    order_objects::{FullOrder, OrderQueryFilter},
};

#[derive(Debug, Clone, Error)]
pub enum OrderQueryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User error constructing query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for OrderQueryError {
    fn from(e: sqlx::Error) -> Self {
        OrderQueryError::DatabaseError(e.to_string())
    }
}

/// The `OrderManagement` trait is the read side of the engine's storage. The mutating machinery lives
/// in [`FulfillmentDatabase`](crate::traits::FulfillmentDatabase); this trait answers questions about
/// orders, their vendor blocks, transport legs, returns and the audit trail without changing anything.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Fetches the order with the given human-facing order number, or `None` if it does not exist.
    async fn order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderQueryError>;

    async fn order_by_id(&self, order_id: i64) -> Result<Option<Order>, OrderQueryError>;

    /// Assembles the complete aggregate for an order: the root record, every vendor block with its
    /// line items, every transport leg, the set of drivers that worked on it, and the return request
    /// if one was made.
    async fn full_order(&self, order_number: &OrderNumber) -> Result<Option<FullOrder>, OrderQueryError>;

    /// Returns all orders matching the filter, newest first. An empty filter returns every order.
    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, OrderQueryError>;

    async fn vendor_blocks(&self, order_id: i64) -> Result<Vec<OrderVendor>, OrderQueryError>;

    async fn vendor_block(&self, order_id: i64, vendor_id: &str) -> Result<Option<OrderVendor>, OrderQueryError>;

    async fn items_for_block(&self, order_vendor_id: i64) -> Result<Vec<OrderItem>, OrderQueryError>;

    /// Transport legs for an order, ordered by sequence.
    async fn legs_for_order(&self, order_id: i64) -> Result<Vec<Leg>, OrderQueryError>;

    async fn leg_by_sequence(&self, order_id: i64, sequence: i64) -> Result<Option<Leg>, OrderQueryError>;

    /// Ids of drivers that have declined this leg. These drivers are skipped when the leg is
    /// reassigned.
    async fn rejected_driver_ids(&self, leg_id: i64) -> Result<Vec<String>, OrderQueryError>;

    /// The full rejection records for a leg, oldest first, including the reason each driver gave.
    async fn leg_rejections(&self, leg_id: i64) -> Result<Vec<LegRejection>, OrderQueryError>;

    /// Every driver that has ever been attached to a leg of this order.
    async fn drivers_for_order(&self, order_id: i64) -> Result<Vec<String>, OrderQueryError>;

    async fn return_request(&self, order_id: i64) -> Result<Option<ReturnRequest>, OrderQueryError>;

    /// The append-only transition history for an order, oldest first.
    async fn audit_trail(&self, order_id: i64) -> Result<Vec<StatusAuditEntry>, OrderQueryError>;
}

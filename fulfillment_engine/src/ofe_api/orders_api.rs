//! Unified read-only API for orders.

use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, OrderNumber, StatusAuditEntry},
    ofe_api::order_objects::{FullOrder, OrderQueryFilter},
    traits::{OrderManagement, OrderQueryError},
};

/// The `OrdersApi` answers questions about orders without changing anything.
pub struct OrdersApi<B> {
    db: B,
}

impl<B: Debug> Debug for OrdersApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrdersApi ({:?})", self.db)
    }
}

impl<B> OrdersApi<B>
where B: OrderManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Fetches the order with the given order number. If no order exists, `None` is returned.
    pub async fn order_by_number(&self, order_number: &OrderNumber) -> Result<Option<Order>, OrderQueryError> {
        self.db.order_by_number(order_number).await
    }

    /// Fetches the complete aggregate for an order: vendor blocks with their items, transport
    /// legs, drivers and the return request if one was made.
    pub async fn full_order(&self, order_number: &OrderNumber) -> Result<Option<FullOrder>, OrderQueryError> {
        self.db.full_order(order_number).await
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, OrderQueryError> {
        debug!("📦️ Searching orders: {query}");
        self.db.search_orders(query).await
    }

    /// Every order the customer has placed, newest first.
    pub async fn orders_for_customer(&self, customer_id: &str) -> Result<Vec<Order>, OrderQueryError> {
        let query = OrderQueryFilter::default().with_customer_id(customer_id.to_string());
        self.db.search_orders(query).await
    }

    /// The transition history of an order, oldest first, or `None` if the order does not exist.
    pub async fn history_for_order(
        &self,
        order_number: &OrderNumber,
    ) -> Result<Option<Vec<StatusAuditEntry>>, OrderQueryError> {
        match self.db.order_by_number(order_number).await? {
            Some(order) => Ok(Some(self.db.audit_trail(order.id).await?)),
            None => Ok(None),
        }
    }
}

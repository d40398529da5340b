use thiserror::Error;

use crate::{
    db_types::{
        ConversionError,
        Driver,
        Leg,
        NewOrder,
        OrderNumber,
        OrderVendor,
        ReturnRequest,
        VendorStatus,
    },
    order_objects::FullOrder,
    traits::{
        data_objects::DeliveryCompletion,
        DriverApiError,
        OrderManagement,
        OrderQueryError,
        StorefrontError,
    },
};

/// The mutating half of a fulfillment backend:
///
/// * persisting a fully assembled order, with its stock and cart effects, in one transaction;
/// * moving vendor blocks and transport legs through their status lifecycles;
/// * attaching and detaching drivers as legs are claimed, rejected and completed;
/// * the whole-order return workflow.
///
/// Every method here is atomic. When a method makes several writes, implementers must wrap them in a
/// single transaction, so that a failure partway through leaves no partial state behind.
#[allow(async_fn_in_trait)]
pub trait FulfillmentDatabase: Clone + OrderManagement {
    /// The connection string this backend was opened with.
    fn url(&self) -> &str;

    /// Takes an assembled order and, in a single atomic transaction:
    /// * stores the order, its vendor blocks, line items and transport legs;
    /// * decrements stock for every line item, failing with [`FulfillmentError::InsufficientStock`]
    ///   if any product no longer has enough on hand;
    /// * deletes the fulfilled rows from the customer's cart.
    ///
    /// Any failure rolls the whole order back, including the stock decrements already applied.
    async fn insert_order(&self, order: NewOrder) -> Result<FullOrder, FulfillmentError>;

    /// Moves a vendor block from `expected` to `to`, returning the updated block.
    ///
    /// The update is conditional on the block still being in `expected`; if a concurrent writer got
    /// there first the call fails with [`FulfillmentError::StaleStatus`] instead of silently
    /// overwriting. An audit row is written in the same transaction.
    async fn flip_vendor_status(
        &self,
        order_id: i64,
        vendor_id: &str,
        expected: VendorStatus,
        to: VendorStatus,
    ) -> Result<OrderVendor, FulfillmentError>;

    /// Attaches a claimed driver to the leg with the given sequence and confirms the vendor block, in
    /// one transaction:
    /// * the leg must exist and be unassigned, otherwise [`FulfillmentError::LegNotFound`];
    /// * the driver id and vehicle type are snapshotted onto the leg and its status becomes
    ///   `DriverAssigned`;
    /// * the driver is appended to the order's driver set (idempotently);
    /// * the vendor block moves from `expected` to `Confirmed`.
    ///
    /// The caller owns the driver claim and must release it if this call fails.
    async fn attach_driver_to_leg(
        &self,
        order_id: i64,
        vendor_id: &str,
        sequence: i64,
        driver: &Driver,
        expected: VendorStatus,
    ) -> Result<(OrderVendor, Leg), FulfillmentError>;

    /// Records a driver's rejection of a leg and detaches them from it. The rejection is remembered so
    /// the driver is excluded from the next search, and the leg reverts to `Pending` with no driver.
    async fn detach_driver_after_rejection(
        &self,
        order_id: i64,
        sequence: i64,
        driver_id: &str,
        reason: &str,
    ) -> Result<Leg, FulfillmentError>;

    /// Marks a vendor block delivered, in one transaction:
    /// * the block moves from `expected` to `Delivered` and its payment status becomes `Paid`;
    /// * the leg at `sequence` must carry a driver. An open leg becomes `Delivered` with a
    ///   completion timestamp; a leg that is already `Delivered` is accepted as-is, since hub
    ///   routes complete several blocks against the same final leg;
    /// * the leg's driver is released back into the idle pool.
    ///
    /// Returns the updated block and leg together with the id of the released driver.
    async fn complete_delivery(
        &self,
        order_id: i64,
        vendor_id: &str,
        sequence: i64,
        expected: VendorStatus,
    ) -> Result<DeliveryCompletion, FulfillmentError>;

    /// Opens a return request for an order. At most one request may exist per order; a second attempt
    /// fails with [`FulfillmentError::ReturnAlreadyRequested`].
    async fn create_return(&self, order_id: i64, reason: &str) -> Result<ReturnRequest, FulfillmentError>;

    /// Attaches a claimed driver to the return and moves it from `Requested` to `DriverAssigned`.
    /// The caller owns the driver claim and must release it if this call fails.
    async fn assign_return_driver(&self, order_id: i64, driver_id: &str) -> Result<ReturnRequest, FulfillmentError>;

    /// Moves the return from `DriverAssigned` to `Picked` and records the pickup time.
    async fn mark_return_picked(&self, order_id: i64) -> Result<ReturnRequest, FulfillmentError>;

    /// Moves the return from `Picked` to `VendorReceived` and, in the same transaction, flips every
    /// delivered vendor block of the order to `Returned` and releases the courier back into the
    /// idle pool.
    async fn mark_return_received(&self, order_id: i64) -> Result<ReturnRequest, FulfillmentError>;

    /// Moves the return from `VendorReceived` to `Completed` and marks the returned blocks refunded.
    async fn complete_return(&self, order_id: i64) -> Result<ReturnRequest, FulfillmentError>;

    /// Moves the return from `Requested` to `Rejected`. Only an unassigned request can be rejected.
    async fn reject_return(&self, order_id: i64, reason: &str) -> Result<ReturnRequest, FulfillmentError>;
}

#[derive(Debug, Clone, Error)]
pub enum FulfillmentError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("Customer {0} has no cart to fulfil")]
    EmptyCart(String),
    #[error("No items in the cart of customer {0} match the requested order kind")]
    NoMatchingItems(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(String),
    #[error("Product {product_id} has {available} units left but {requested} were requested")]
    InsufficientStock { product_id: String, requested: i64, available: i64 },
    #[error("Product {0} cannot be paid for in cash")]
    CashNotAllowed(String),
    #[error("Customer {0} has no default delivery address")]
    NoDefaultAddress(String),
    #[error("Vendor {0} does not exist")]
    VendorNotFound(String),
    #[error("Cannot insert order, since it already exists with number {0}")]
    OrderAlreadyExists(OrderNumber),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderNumber),
    #[error("Order (internal id {0}) has no block for vendor {1}")]
    VendorBlockNotFound(i64, String),
    #[error("Order (internal id {0}) has no usable leg with sequence {1}")]
    LegNotFound(i64, i64),
    #[error("The block is already in state {0}")]
    AlreadyInState(VendorStatus),
    #[error("The block is in terminal state {0} and cannot change again")]
    TerminalState(VendorStatus),
    #[error("A vehicle type is required to confirm a vendor block")]
    VehicleTypeRequired,
    #[error("No approved driver is available for this assignment")]
    NoDriverAvailable,
    #[error("A concurrent update got there first: {0}")]
    StaleStatus(String),
    #[error("Order (internal id {0}) has no return request")]
    ReturnNotFound(i64),
    #[error("Order (internal id {0}) already has a return request")]
    ReturnAlreadyRequested(i64),
    #[error("Order (internal id {0}) has no delivered blocks to return")]
    NothingDelivered(i64),
    #[error("{0}")]
    QueryError(#[from] OrderQueryError),
    #[error("{0}")]
    DriverError(#[from] DriverApiError),
    #[error("{0}")]
    StorefrontError(#[from] StorefrontError),
    #[error("{0}")]
    ConversionError(#[from] ConversionError),
}

impl From<sqlx::Error> for FulfillmentError {
    fn from(e: sqlx::Error) -> Self {
        FulfillmentError::DatabaseError(e.to_string())
    }
}

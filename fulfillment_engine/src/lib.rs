//! Multi-Vendor Fulfillment Engine
//!
//! The fulfillment engine contains the core logic for a multi-vendor delivery platform: customer
//! carts become orders split into per-vendor blocks, vendors confirm and hand parcels to drivers,
//! drivers are matched by proximity with an atomic claim, and every status change is audited and
//! eventually settled into per-party earnings.
//!
//! There are two layers here. The storage layer sits behind the backend traits in [`mod@traits`];
//! SQLite is the shipped implementation, and apart from the row types in [`mod@db_types`] nothing
//! outside that layer touches the database directly. On top of it sit the public APIs, generic
//! over the backend: order placement, the vendor status lifecycle, driver assignment and
//! reassignment, returns and settlements. The API structs are re-exported at the crate root, and
//! their request/response aggregates live in [`order_objects`].
//!
//! Mutations emit events ([`events::OrderCreatedEvent`] and friends) over an async pub-sub
//! channel, so callers can attach handlers to any point of the order life cycle.
mod ofe_api;
#[cfg(feature = "sqlite")]
mod sqlite;

pub mod config;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use config::{EarningBasis, FulfillmentConfig};
pub use ofe_api::{
    errors::SettlementError,
    notifications,
    order_flow_api::OrderFlowApi,
    order_objects,
    orders_api::OrdersApi,
    returns_api::ReturnsApi,
    settlement_api::{OrderSettlement, SettlementApi, VendorSettlement},
};
pub use traits::{
    AddressProvider,
    CartProvider,
    DriverRegistry,
    FulfillmentDatabase,
    OrderManagement,
    ProductCatalog,
    RateTables,
    VendorDirectory,
};

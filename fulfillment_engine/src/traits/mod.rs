//! # Backend contracts for the fulfillment engine.
//!
//! This module defines the interface contracts that database *backends* must implement to drive the
//! engine. The APIs in [`crate::ofe_api`] are generic over these traits, so a backend can be swapped
//! out without touching any of the order flow logic.
//!
//! ## Orders
//! An order is assembled from a customer's cart, split into one block per vendor, and moved by one or
//! more transport legs. The [`FulfillmentDatabase`] trait carries every state mutation of that
//! lifecycle; each of its methods is atomic, so a failure anywhere inside an operation leaves the
//! order untouched.
//!
//! [`OrderManagement`] provides the read side: single orders, full aggregates, filtered searches and
//! the status audit trail.
//!
//! ## Collaborators
//! Carts, the product catalog, customer addresses and vendor profiles are owned by the storefront.
//! The engine only talks to them through the narrow traits in [`storefront`](self), which keeps those
//! systems free to live in another process. [`DriverRegistry`] manages the courier pool, including the
//! compare-and-set claim that makes concurrent assignment safe, and [`RateTables`] serves the
//! commission percentages used at settlement time.
mod driver_registry;
mod fulfillment_database;
mod order_management;
mod rate_tables;
mod storefront;

mod data_objects;

pub use data_objects::{DeliveryCompletion, DriverSearch};
pub use driver_registry::{DriverApiError, DriverRegistry};
pub use fulfillment_database::{FulfillmentDatabase, FulfillmentError};
pub use order_management::{OrderManagement, OrderQueryError};
pub use rate_tables::{RateError, RateTables};
pub use storefront::{AddressProvider, CartProvider, ProductCatalog, StorefrontError, VendorDirectory};

//! # Fulfillment engine public API
//!
//! Programmatic access to the engine, split by concern so a deployment can run only the pieces it
//! needs. Every API is generic over the backend traits it requires, and several instances can
//! share one database.
//!
//! * [`order_flow_api`] is the primary API: it assembles orders from carts, confirms vendor blocks
//!   with an atomic driver claim, moves blocks through their status lifecycle, and handles driver
//!   rejections and reassignment.
//! * [`returns_api`] drives the whole-order return workflow from request to refund.
//! * [`settlement_api`] computes driver earnings, platform commission and vendor residuals for
//!   delivered orders.
//! * [`orders_api`] is the read side: single orders, full aggregates, filtered searches and the
//!   status audit trail.
//!
//! Construction is uniform across the four: hand the API a backend implementing its traits.
//!
//! ```rust,ignore
//! use fulfillment_engine::{OrdersApi, SqliteDatabase};
//!
//! let db = SqliteDatabase::new(25).await?;
//! let orders = OrdersApi::new(db);
//! let order = orders.order_by_number(&"MVD-123".into()).await?;
//! ```

pub mod errors;
pub mod notifications;
pub mod order_flow_api;
pub mod order_objects;
pub mod orders_api;
pub mod returns_api;
pub mod settlement_api;

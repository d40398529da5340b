use thiserror::Error;

use crate::db_types::{Address, CartItem, Product, VendorProfile};

#[derive(Debug, Clone, Error)]
pub enum StorefrontError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for StorefrontError {
    fn from(e: sqlx::Error) -> Self {
        StorefrontError::DatabaseError(e.to_string())
    }
}

/// Access to a customer's shopping cart. Rows consumed by an order are removed inside the atomic
/// order insert; `clear_cart` abandons a cart wholesale.
#[allow(async_fn_in_trait)]
pub trait CartProvider {
    /// The customer's cart in insertion order. An empty vector means there is nothing to fulfil.
    async fn fetch_cart(&self, customer_id: &str) -> Result<Vec<CartItem>, StorefrontError>;

    /// Deletes every line of the customer's cart and returns the number of rows removed.
    async fn clear_cart(&self, customer_id: &str) -> Result<u64, StorefrontError>;
}

/// Read access to the product catalog.
#[allow(async_fn_in_trait)]
pub trait ProductCatalog {
    async fn product_by_id(&self, product_id: &str) -> Result<Option<Product>, StorefrontError>;
}

/// Read access to customer delivery addresses.
#[allow(async_fn_in_trait)]
pub trait AddressProvider {
    /// The customer's default address, used as the drop location of new orders.
    async fn default_address(&self, customer_id: &str) -> Result<Option<Address>, StorefrontError>;
}

/// Read access to vendor profiles, including the pickup location snapshotted onto new orders.
#[allow(async_fn_in_trait)]
pub trait VendorDirectory {
    async fn vendor_by_id(&self, vendor_id: &str) -> Result<Option<VendorProfile>, StorefrontError>;
}

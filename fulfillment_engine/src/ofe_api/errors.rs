use thiserror::Error;

use crate::{
    db_types::OrderNumber,
    traits::{DriverApiError, OrderQueryError, RateError, StorefrontError},
};

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderNumber),
    #[error("{0}")]
    QueryError(#[from] OrderQueryError),
    #[error("{0}")]
    DriverError(#[from] DriverApiError),
    #[error("{0}")]
    RateError(#[from] RateError),
    #[error("{0}")]
    StorefrontError(#[from] StorefrontError),
}

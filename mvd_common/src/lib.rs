mod geo;
mod money;

pub mod op;

pub use geo::GeoPoint;
pub use money::{Money, MoneyConversionError};

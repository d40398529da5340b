mod order_numbers;

pub use order_numbers::{new_order_number, ORDER_NUMBER_PREFIX};

//! Status-driven customer messaging.
//!
//! The copy lives in a single lookup table rather than branches inside the transition function, so
//! the transitions stay pure and the table can be tested row by row. The engine only *produces*
//! notification copy; delivering it (push, email) is an external concern.

use serde::{Deserialize, Serialize};

use crate::db_types::{OrderNumber, VendorStatus};

/// Copy for a customer-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerNotification {
    pub order_number: OrderNumber,
    pub title: String,
    pub body: String,
}

impl CustomerNotification {
    /// The wire payload handed to whatever service delivers the push message.
    pub fn as_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// One row per vendor block status: the transition message, and the push copy as a
/// `(title, body)` pair for the statuses that notify the customer. `{order}` in the body is
/// replaced with the order number.
const TRANSITION_TABLE: [(VendorStatus, &str, Option<(&str, &str)>); 8] = [
    (VendorStatus::Pending, "Status updated to Pending", None),
    (VendorStatus::Confirmed, "Vendor block confirmed and a driver assigned", None),
    (VendorStatus::Ready, "Status updated to Ready", None),
    (
        VendorStatus::DriverAccepted,
        "Driver accepted the delivery",
        Some(("Driver on the way", "A driver has accepted your order {order} and is heading to the vendor.")),
    ),
    (
        VendorStatus::Picked,
        "Parcel picked up",
        Some(("Order picked up", "Your order {order} has been picked up and is on its way to you.")),
    ),
    (
        VendorStatus::Delivered,
        "Parcel delivered",
        Some(("Order delivered", "Your order {order} has been delivered. Thank you for shopping with us!")),
    ),
    (VendorStatus::Cancelled, "Status updated to Cancelled", None),
    (VendorStatus::Returned, "Status updated to Returned", None),
];

/// The human-readable message attached to a transition into `status`.
pub fn transition_message(status: VendorStatus) -> &'static str {
    TRANSITION_TABLE.iter().find(|(s, ..)| *s == status).map(|(_, msg, _)| *msg).unwrap_or("Status updated")
}

/// The push copy for a transition into `status`, or `None` for statuses the customer is not
/// notified about.
pub fn notification_for(status: VendorStatus, order_number: &OrderNumber) -> Option<CustomerNotification> {
    TRANSITION_TABLE.iter().find(|(s, ..)| *s == status).and_then(|(_, _, copy)| *copy).map(|(title, body)| {
        CustomerNotification {
            order_number: order_number.clone(),
            title: title.to_string(),
            body: body.replace("{order}", &order_number.to_string()),
        }
    })
}

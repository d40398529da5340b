//! The vendor block lifecycle: guarded flips, terminal states, delivery side effects and the
//! customer-facing copy attached to each transition.
use chrono::{DateTime, Utc};
use fulfillment_engine::{
    db_types::{
        DriverType,
        GeoPoint,
        LegStatus,
        Money,
        NewCartItem,
        NewDriver,
        NewProduct,
        OrderKind,
        OrderNumber,
        PaymentMethod,
        VehicleType,
        VendorPaymentStatus,
        VendorStatus,
    },
    events::EventProducers,
    order_objects::{FullOrder, NewOrderRequest, OrderQueryFilter},
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seeds::{add_to_cart, seed_approved_driver, seed_default_address, seed_product, seed_vendor},
    },
    traits::FulfillmentError,
    DriverRegistry,
    FulfillmentConfig,
    FulfillmentDatabase,
    OrderFlowApi,
    OrderManagement,
    OrdersApi,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

async fn setup() -> OrderFlowApi<SqliteDatabase> {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    OrderFlowApi::new(db, FulfillmentConfig::default(), EventProducers::default())
}

async fn tear_down(api: OrderFlowApi<SqliteDatabase>) {
    api.db().close().await;
    Sqlite::drop_database(api.db().url()).await.expect("Error dropping database");
}

async fn place_simple_order(api: &OrderFlowApi<SqliteDatabase>, customer: &str) -> FullOrder {
    let db = api.db();
    seed_vendor(db, "grocer", "Green Grocer", GeoPoint::new(30.05, 31.23)).await;
    seed_product(db, NewProduct::new("apples", "grocer", "Apples 1kg", Money::from_major(50), 10)).await;
    add_to_cart(db, NewCartItem::new(customer, "apples", "grocer", 1, Money::from_major(50))).await;
    seed_default_address(db, customer, GeoPoint::new(30.06, 31.21)).await;
    api.place_order(NewOrderRequest::new(customer, PaymentMethod::Card, OrderKind::Direct))
        .await
        .expect("Error placing order")
}

#[tokio::test]
async fn a_block_cannot_move_to_its_current_state() {
    let api = setup().await;
    let full = place_simple_order(&api, "alice").await;
    let err = api
        .update_vendor_status(&full.order.order_number, "grocer", VendorStatus::Pending, None, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, FulfillmentError::AlreadyInState(VendorStatus::Pending)));
    tear_down(api).await;
}

#[tokio::test]
async fn terminal_states_are_final() {
    let api = setup().await;
    let full = place_simple_order(&api, "alice").await;
    let number = full.order.order_number.clone();
    let outcome = api
        .update_vendor_status(&number, "grocer", VendorStatus::Cancelled, None, 1)
        .await
        .expect("Error cancelling the block");
    assert_eq!(outcome.message, "Status updated to Cancelled");
    assert!(outcome.notification.is_none());

    let err = api.update_vendor_status(&number, "grocer", VendorStatus::Ready, None, 1).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::TerminalState(VendorStatus::Cancelled)));
    tear_down(api).await;
}

#[tokio::test]
async fn unknown_orders_and_vendors_are_reported() {
    let api = setup().await;
    let full = place_simple_order(&api, "alice").await;
    let missing = OrderNumber::from("MVD-NOSUCHORD");
    let err = api.update_vendor_status(&missing, "grocer", VendorStatus::Ready, None, 1).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::OrderNotFound(_)));

    let err = api
        .update_vendor_status(&full.order.order_number, "florist", VendorStatus::Ready, None, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, FulfillmentError::VendorBlockNotFound(_, v) if v == "florist"));
    tear_down(api).await;
}

/// The courier milestones notify the customer, delivery pays the block and frees the driver, and
/// the audit trail records the whole journey.
#[tokio::test]
async fn full_delivery_flow_notifies_and_releases() {
    let api = setup().await;
    let full = place_simple_order(&api, "alice").await;
    let number = full.order.order_number.clone();
    let driver = NewDriver::new("dasha", "dasha", DriverType::FullTime, VehicleType::Motorbike)
        .at(GeoPoint::new(30.05, 31.23));
    seed_approved_driver(api.db(), driver).await;

    api.update_vendor_status(&number, "grocer", VendorStatus::Confirmed, Some(VehicleType::Motorbike), 1)
        .await
        .expect("Error confirming the block");

    let outcome = api
        .update_vendor_status(&number, "grocer", VendorStatus::DriverAccepted, None, 1)
        .await
        .expect("Error accepting");
    let push = outcome.notification.expect("DriverAccepted should notify the customer");
    assert_eq!(push.title, "Driver on the way");

    let outcome =
        api.update_vendor_status(&number, "grocer", VendorStatus::Picked, None, 1).await.expect("Error picking");
    let push = outcome.notification.expect("Picked should notify the customer");
    assert_eq!(push.title, "Order picked up");
    assert!(push.body.contains(&number.to_string()));

    let outcome = api
        .update_vendor_status(&number, "grocer", VendorStatus::Delivered, None, 1)
        .await
        .expect("Error delivering");
    assert_eq!(outcome.message, "Parcel delivered");
    assert_eq!(outcome.notification.expect("Delivered should notify the customer").title, "Order delivered");
    assert!(outcome.order.all_delivered());
    let block = outcome.order.block_for("grocer").unwrap();
    assert_eq!(block.status, VendorStatus::Delivered);
    assert_eq!(block.payment_status, VendorPaymentStatus::Paid);
    let leg = outcome.order.leg(1).unwrap();
    assert_eq!(leg.status, LegStatus::Delivered);
    assert!(leg.completed_at.is_some());

    // The courier goes back to the idle pool once the parcel is handed over.
    let dasha = api.db().driver_by_id("dasha").await.unwrap().unwrap();
    assert!(dasha.is_available);
    assert!(!dasha.is_delivering);

    let orders = OrdersApi::new(api.db().clone());
    let trail = orders.history_for_order(&number).await.unwrap().expect("Order should have a history");
    assert!(trail.iter().any(|e| e.entity == "vendor" && e.new_status == "Delivered"));
    assert!(trail.iter().any(|e| e.entity == "leg" && e.new_status == "DriverAssigned"));
    assert!(trail.iter().any(|e| e.entity == "leg" && e.new_status == "Delivered"));

    // Delivered is terminal.
    let err = api.update_vendor_status(&number, "grocer", VendorStatus::Ready, None, 1).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::TerminalState(VendorStatus::Delivered)));
    tear_down(api).await;
}

/// Delivering a block whose leg never got a driver fails, and the partial work is rolled back.
#[tokio::test]
async fn delivering_an_unassigned_leg_rolls_back() {
    let api = setup().await;
    let full = place_simple_order(&api, "alice").await;
    let err = api
        .update_vendor_status(&full.order.order_number, "grocer", VendorStatus::Delivered, None, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, FulfillmentError::LegNotFound(_, 1)));

    let block = api.db().vendor_block(full.order.id, "grocer").await.unwrap().unwrap();
    assert_eq!(block.status, VendorStatus::Pending);
    assert_eq!(block.payment_status, VendorPaymentStatus::Unpaid);
    tear_down(api).await;
}

/// The block flip and the courier release are one atomic unit: a delivery that fails partway
/// leaves the courier claimed, and a delivery that lands frees them in the same stroke.
#[tokio::test]
async fn a_failed_delivery_leaves_the_driver_claimed() {
    let api = setup().await;
    let full = place_simple_order(&api, "alice").await;
    let number = full.order.order_number.clone();
    let driver = NewDriver::new("dasha", "dasha", DriverType::FullTime, VehicleType::Motorbike)
        .at(GeoPoint::new(30.05, 31.23));
    seed_approved_driver(api.db(), driver).await;
    api.update_vendor_status(&number, "grocer", VendorStatus::Confirmed, Some(VehicleType::Motorbike), 1)
        .await
        .expect("Error confirming the block");

    // A delivery against a sequence the order does not have rolls back wholesale.
    let err = api.update_vendor_status(&number, "grocer", VendorStatus::Delivered, None, 9).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::LegNotFound(_, 9)));
    let block = api.db().vendor_block(full.order.id, "grocer").await.unwrap().unwrap();
    assert_eq!(block.status, VendorStatus::Confirmed);
    assert_eq!(block.payment_status, VendorPaymentStatus::Unpaid);
    let dasha = api.db().driver_by_id("dasha").await.unwrap().unwrap();
    assert!(!dasha.is_available);
    assert!(dasha.is_delivering);

    // The same call against the right leg completes the block and frees her together.
    api.update_vendor_status(&number, "grocer", VendorStatus::Delivered, None, 1)
        .await
        .expect("Error delivering");
    let dasha = api.db().driver_by_id("dasha").await.unwrap().unwrap();
    assert!(dasha.is_available);
    assert!(!dasha.is_delivering);
    tear_down(api).await;
}

/// Searching by customer returns the newest order first; the audit read returns `None` for orders
/// that never existed.
#[tokio::test]
async fn read_side_sees_the_lifecycle() {
    let api = setup().await;
    let first = place_simple_order(&api, "alice").await;
    // A second order from a fresh cart.
    add_to_cart(api.db(), NewCartItem::new("alice", "apples", "grocer", 2, Money::from_major(50))).await;
    let second = api
        .place_order(NewOrderRequest::new("alice", PaymentMethod::Wallet, OrderKind::Direct))
        .await
        .expect("Error placing the second order");

    let orders = OrdersApi::new(api.db().clone());
    let all = orders.orders_for_customer("alice").await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, second.order.id);
    assert_eq!(all[1].id, first.order.id);

    // The other filter arms, singly and combined.
    let by_number = orders
        .search_orders(OrderQueryFilter::default().with_order_number(first.order.order_number.clone()))
        .await
        .unwrap();
    assert_eq!(by_number.len(), 1);
    assert_eq!(by_number[0].id, first.order.id);

    let direct_for_alice =
        OrderQueryFilter::default().with_customer_id("alice".to_string()).with_order_kind(OrderKind::Direct);
    assert_eq!(orders.search_orders(direct_for_alice).await.unwrap().len(), 2);

    let pending_at_grocer =
        OrderQueryFilter::default().with_vendor_id("grocer".to_string()).with_vendor_status(VendorStatus::Pending);
    assert_eq!(orders.search_orders(pending_at_grocer).await.unwrap().len(), 2);

    let cutoff = "2020-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
    assert_eq!(orders.search_orders(OrderQueryFilter::default().since(cutoff).unwrap()).await.unwrap().len(), 2);
    assert!(orders.search_orders(OrderQueryFilter::default().until(cutoff).unwrap()).await.unwrap().is_empty());

    assert!(orders.history_for_order(&OrderNumber::from("MVD-NOSUCHORD")).await.unwrap().is_none());
    tear_down(api).await;
}

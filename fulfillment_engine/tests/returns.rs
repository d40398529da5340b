//! The whole-order return workflow, from the customer's request to the refund, including the
//! guards that keep the state machine honest.
use fulfillment_engine::{
    db_types::{
        DriverType,
        GeoPoint,
        Money,
        NewCartItem,
        NewDriver,
        NewProduct,
        OrderKind,
        PaymentMethod,
        ReturnStatus,
        VehicleType,
        VendorPaymentStatus,
        VendorStatus,
    },
    events::EventProducers,
    order_objects::{FullOrder, NewOrderRequest},
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
    ReturnsApi,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

async fn setup() -> (OrderFlowApi<SqliteDatabase>, ReturnsApi<SqliteDatabase>) {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let orders = OrderFlowApi::new(db.clone(), FulfillmentConfig::default(), EventProducers::default());
    let returns = ReturnsApi::new(db, FulfillmentConfig::default(), EventProducers::default());
    (orders, returns)
}

async fn tear_down(api: OrderFlowApi<SqliteDatabase>) {
    api.db().close().await;
    Sqlite::drop_database(api.db().url()).await.expect("Error dropping database");
}

/// A single-vendor order carried to `Delivered` by the courier "nadia", who ends up back in the
/// idle pool a couple of kilometres from the customer's door.
async fn delivered_order(api: &OrderFlowApi<SqliteDatabase>, customer: &str) -> FullOrder {
    let db = api.db();
    seed_vendor(db, "grocer", "Green Grocer", GeoPoint::new(30.05, 31.23)).await;
    seed_product(db, NewProduct::new("apples", "grocer", "Apples 1kg", Money::from_major(50), 10)).await;
    add_to_cart(db, NewCartItem::new(customer, "apples", "grocer", 1, Money::from_major(50))).await;
    seed_default_address(db, customer, GeoPoint::new(30.06, 31.21)).await;
    let driver =
        NewDriver::new("nadia", "nadia", DriverType::FullTime, VehicleType::Motorbike).at(GeoPoint::new(30.05, 31.23));
    seed_approved_driver(db, driver).await;

    let full = api
        .place_order(NewOrderRequest::new(customer, PaymentMethod::Card, OrderKind::Direct))
        .await
        .expect("Error placing order");
    let number = full.order.order_number.clone();
    api.update_vendor_status(&number, "grocer", VendorStatus::Confirmed, Some(VehicleType::Motorbike), 1)
        .await
        .expect("Error confirming the block");
    let outcome =
        api.update_vendor_status(&number, "grocer", VendorStatus::Delivered, None, 1).await.expect("Error delivering");
    outcome.order
}

#[tokio::test]
async fn a_return_needs_a_delivered_block() {
    let (api, returns) = setup().await;
    let db = api.db();
    seed_vendor(db, "grocer", "Green Grocer", GeoPoint::new(30.05, 31.23)).await;
    seed_product(db, NewProduct::new("apples", "grocer", "Apples 1kg", Money::from_major(50), 10)).await;
    add_to_cart(db, NewCartItem::new("alice", "apples", "grocer", 1, Money::from_major(50))).await;
    seed_default_address(db, "alice", GeoPoint::new(30.06, 31.21)).await;
    let full = api
        .place_order(NewOrderRequest::new("alice", PaymentMethod::Card, OrderKind::Direct))
        .await
        .expect("Error placing order");

    let err = returns.request_return(&full.order.order_number, "changed my mind").await.unwrap_err();
    assert!(matches!(err, FulfillmentError::NothingDelivered(id) if id == full.order.id));
    tear_down(api).await;
}

/// Request, assign, pick up, hand back, refund. Checks the timestamps, the driver pool and the
/// vendor block bookkeeping at every step.
#[tokio::test]
async fn the_full_return_cycle() {
    let (api, returns) = setup().await;
    let full = delivered_order(&api, "alice").await;
    let number = full.order.order_number.clone();

    let request = returns.request_return(&number, "damaged on arrival").await.expect("Error requesting return");
    assert_eq!(request.status, ReturnStatus::Requested);
    assert_eq!(request.reason, "damaged on arrival");
    assert!(request.driver_id.is_none());

    let err = returns.request_return(&number, "asking twice").await.unwrap_err();
    assert!(matches!(err, FulfillmentError::ReturnAlreadyRequested(id) if id == full.order.id));

    // nadia is idle near the customer, so she gets the pickup.
    let (request, driver) = returns.assign_return_driver(&number).await.expect("Error assigning return driver");
    assert_eq!(driver.id, "nadia");
    assert_eq!(request.status, ReturnStatus::DriverAssigned);
    assert_eq!(request.driver_id.as_deref(), Some("nadia"));
    let nadia = api.db().driver_by_id("nadia").await.unwrap().unwrap();
    assert!(!nadia.is_available);

    // The only courier in town is now busy with this very return.
    let err = returns.assign_return_driver(&number).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::NoDriverAvailable));

    let request = returns.confirm_pickup(&number).await.expect("Error confirming pickup");
    assert_eq!(request.status, ReturnStatus::Picked);
    assert!(request.picked_up_at.is_some());
    // Pickup alone does not free the courier; that happens only when the vendor signs off.
    let nadia = api.db().driver_by_id("nadia").await.unwrap().unwrap();
    assert!(!nadia.is_available);

    let request = returns.confirm_vendor_receipt(&number).await.expect("Error confirming vendor receipt");
    assert_eq!(request.status, ReturnStatus::VendorReceived);
    assert!(request.received_at.is_some());
    let block = api.db().vendor_block(full.order.id, "grocer").await.unwrap().unwrap();
    assert_eq!(block.status, VendorStatus::Returned);
    let nadia = api.db().driver_by_id("nadia").await.unwrap().unwrap();
    assert!(nadia.is_available);
    assert!(!nadia.is_delivering);

    let request = returns.complete_return(&number).await.expect("Error completing return");
    assert_eq!(request.status, ReturnStatus::Completed);
    assert!(request.completed_at.is_some());
    let block = api.db().vendor_block(full.order.id, "grocer").await.unwrap().unwrap();
    assert_eq!(block.payment_status, VendorPaymentStatus::Refunded);

    let orders = OrdersApi::new(api.db().clone());
    let trail = orders.history_for_order(&number).await.unwrap().expect("Order should have a history");
    assert_eq!(trail.iter().filter(|e| e.entity == "return").count(), 5);
    assert!(trail.iter().any(|e| e.entity == "vendor" && e.new_status == "Returned"));
    tear_down(api).await;
}

/// Steps taken out of order fail with a stale-status error, and an assignment attempt without a
/// request releases the claimed courier again.
#[tokio::test]
async fn out_of_order_steps_are_rejected() {
    let (api, returns) = setup().await;
    let full = delivered_order(&api, "alice").await;
    let number = full.order.order_number.clone();

    let err = returns.assign_return_driver(&number).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::ReturnNotFound(id) if id == full.order.id));
    // The claim made before the lookup failed must have been rolled back.
    let nadia = api.db().driver_by_id("nadia").await.unwrap().unwrap();
    assert!(nadia.is_available);

    returns.request_return(&number, "damaged on arrival").await.expect("Error requesting return");
    let err = returns.confirm_pickup(&number).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::StaleStatus(_)));
    let err = returns.confirm_vendor_receipt(&number).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::StaleStatus(_)));
    let err = returns.complete_return(&number).await.unwrap_err();
    assert!(matches!(err, FulfillmentError::StaleStatus(_)));
    tear_down(api).await;
}

/// A request nobody has acted on can be turned down; after that the return is closed for good and
/// the delivered goods stay delivered.
#[tokio::test]
async fn only_untouched_requests_can_be_rejected() {
    let (api, returns) = setup().await;
    let full = delivered_order(&api, "alice").await;
    let number = full.order.order_number.clone();

    returns.request_return(&number, "damaged on arrival").await.expect("Error requesting return");
    let request = returns.reject_return(&number, "wear and tear is not covered").await.expect("Error rejecting");
    assert_eq!(request.status, ReturnStatus::Rejected);

    let err = returns.reject_return(&number, "again").await.unwrap_err();
    assert!(matches!(err, FulfillmentError::StaleStatus(_)));
    let err = returns.request_return(&number, "retry").await.unwrap_err();
    assert!(matches!(err, FulfillmentError::ReturnAlreadyRequested(_)));

    let block = api.db().vendor_block(full.order.id, "grocer").await.unwrap().unwrap();
    assert_eq!(block.status, VendorStatus::Delivered);
    assert_eq!(block.payment_status, VendorPaymentStatus::Paid);
    tear_down(api).await;
}

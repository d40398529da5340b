//! Post-delivery money splits: driver commission, platform commission and the vendor residual,
//! under both earning bases and with missing rate rows.
use fulfillment_engine::{
    db_types::{
        Category,
        DriverType,
        GeoPoint,
        Money,
        NewCartItem,
        NewDriver,
        NewProduct,
        OrderKind,
        OrderNumber,
        PaymentMethod,
        VehicleType,
        VendorStatus,
    },
    events::EventProducers,
    order_objects::NewOrderRequest,
    test_utils::{
        prepare_env::{prepare_test_env, random_db_path},
        seeds::{
            add_to_cart,
            seed_approved_driver,
            seed_category,
            seed_default_address,
            seed_driver_commission,
            seed_product,
            seed_vendor,
        },
    },
    EarningBasis,
    FulfillmentConfig,
    FulfillmentDatabase,
    OrderFlowApi,
    RateTables,
    SettlementApi,
    SettlementError,
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

/// One vendor selling a 100.00 television in the "electronics" category (5% platform rate), a
/// 10% commission row for full-time motorbike couriers, and a driver parked next to the shop.
/// Places the order, runs it through to `Delivered` and returns the order number.
async fn delivered_tv_order(api: &OrderFlowApi<SqliteDatabase>, customer: &str) -> OrderNumber {
    let db = api.db();
    seed_vendor(db, "hifi", "HiFi Corner", GeoPoint::new(30.05, 31.23)).await;
    let tv = NewProduct::new("tv", "hifi", "Television", Money::from_major(100), 10).with_category("electronics");
    seed_product(db, tv).await;
    seed_category(db, "electronics", "Electronics", 5.0).await;
    seed_driver_commission(db, DriverType::FullTime, VehicleType::Motorbike, 10.0).await;
    add_to_cart(db, NewCartItem::new(customer, "tv", "hifi", 1, Money::from_major(100))).await;
    seed_default_address(db, customer, GeoPoint::new(30.06, 31.21)).await;
    let driver =
        NewDriver::new("omar", "omar", DriverType::FullTime, VehicleType::Motorbike).at(GeoPoint::new(30.051, 31.231));
    seed_approved_driver(db, driver).await;

    let full = api
        .place_order(NewOrderRequest::new(customer, PaymentMethod::Card, OrderKind::Direct))
        .await
        .expect("Error placing order");
    let number = full.order.order_number.clone();
    api.update_vendor_status(&number, "hifi", VendorStatus::Confirmed, Some(VehicleType::Motorbike), 1)
        .await
        .expect("Error confirming the block");
    api.update_vendor_status(&number, "hifi", VendorStatus::Delivered, None, 1).await.expect("Error delivering");
    number
}

/// 100.00 of goods plus the 1.00 single-vendor shipping fee gives a 101.00 grand total. The driver
/// takes 10% of that, the platform takes 5% of the 100.00 item total, and the vendor keeps the
/// rest.
#[tokio::test]
async fn delivered_block_splits_the_grand_total() {
    let api = setup().await;
    let number = delivered_tv_order(&api, "alice").await;

    let settle = SettlementApi::new(api.db().clone(), FulfillmentConfig::default());
    let settlement = settle.settle_order(&number).await.expect("Error settling order");
    assert_eq!(settlement.order_number, number);
    assert_eq!(settlement.vendors.len(), 1);
    let cut = &settlement.vendors[0];
    assert_eq!(cut.vendor_id, "hifi");
    assert_eq!(cut.basis, Money::from_major(101));
    assert_eq!(cut.driver_id.as_deref(), Some("omar"));
    assert_eq!(cut.driver_earning, Money::from_cents(1010));
    assert_eq!(cut.platform_commission, Money::from_major(5));
    assert_eq!(cut.vendor_earning, Money::from_cents(8590));
    assert_eq!(settlement.total_driver_earnings(), Money::from_cents(1010));
    assert_eq!(settlement.total_platform_commission(), Money::from_major(5));

    let cut = settle.vendor_settlement(&number, "hifi").await.unwrap().expect("Vendor should have a settlement");
    assert_eq!(cut.vendor_earning, Money::from_cents(8590));
    tear_down(api).await;
}

/// Switching the basis to the block subtotal shrinks the driver's cut to 10% of 100.00 and leaves
/// the shipping fee out of the split entirely.
#[tokio::test]
async fn vendor_subtotal_basis_narrows_the_base() {
    let api = setup().await;
    let number = delivered_tv_order(&api, "alice").await;

    let config = FulfillmentConfig::default().with_earning_basis(EarningBasis::VendorSubtotal);
    let settle = SettlementApi::new(api.db().clone(), config);
    let cut = settle.vendor_settlement(&number, "hifi").await.unwrap().expect("Vendor should have a settlement");
    assert_eq!(cut.basis, Money::from_major(100));
    assert_eq!(cut.driver_earning, Money::from_major(10));
    assert_eq!(cut.platform_commission, Money::from_major(5));
    assert_eq!(cut.vendor_earning, Money::from_major(85));
    tear_down(api).await;
}

/// Only blocks that are both delivered and paid take part. A two-vendor order with one block still
/// pending settles the delivered block alone.
#[tokio::test]
async fn undelivered_blocks_are_skipped() {
    let api = setup().await;
    let db = api.db();
    seed_vendor(db, "grocer", "Green Grocer", GeoPoint::new(30.05, 31.23)).await;
    seed_vendor(db, "butcher", "Best Cuts", GeoPoint::new(30.07, 31.25)).await;
    seed_product(db, NewProduct::new("apples", "grocer", "Apples 1kg", Money::from_major(100), 10)).await;
    seed_product(db, NewProduct::new("steak", "butcher", "Ribeye", Money::from_major(30), 10)).await;
    seed_driver_commission(db, DriverType::FullTime, VehicleType::Motorbike, 10.0).await;
    add_to_cart(db, NewCartItem::new("alice", "apples", "grocer", 1, Money::from_major(100))).await;
    add_to_cart(db, NewCartItem::new("alice", "steak", "butcher", 1, Money::from_major(30))).await;
    seed_default_address(db, "alice", GeoPoint::new(30.06, 31.21)).await;
    let driver =
        NewDriver::new("omar", "omar", DriverType::FullTime, VehicleType::Motorbike).at(GeoPoint::new(30.051, 31.231));
    seed_approved_driver(db, driver).await;

    let full = api
        .place_order(NewOrderRequest::new("alice", PaymentMethod::Card, OrderKind::Direct))
        .await
        .expect("Error placing order");
    let number = full.order.order_number.clone();
    api.update_vendor_status(&number, "grocer", VendorStatus::Confirmed, Some(VehicleType::Motorbike), 1)
        .await
        .expect("Error confirming the block");
    api.update_vendor_status(&number, "grocer", VendorStatus::Delivered, None, 1).await.expect("Error delivering");

    let settle = SettlementApi::new(api.db().clone(), FulfillmentConfig::default());
    let settlement = settle.settle_order(&number).await.expect("Error settling order");
    assert_eq!(settlement.vendors.len(), 1);
    let cut = &settlement.vendors[0];
    assert_eq!(cut.vendor_id, "grocer");
    // The default basis is the whole order's grand total, shipping fee for two vendors included.
    assert_eq!(cut.basis, Money::from_major(132));
    assert_eq!(cut.driver_earning, Money::from_cents(1320));
    assert!(cut.platform_commission.is_zero());
    assert!(settle.vendor_settlement(&number, "butcher").await.unwrap().is_none());
    tear_down(api).await;
}

/// No commission row for the courier class and no rate for the product's category mean both cuts
/// fall back to zero and the vendor keeps the full basis. Nothing is written back, so configuring
/// the missing rows afterwards changes the very next settlement.
#[tokio::test]
async fn missing_rates_settle_to_zero() {
    let api = setup().await;
    let db = api.db();
    seed_vendor(db, "oddments", "Oddments", GeoPoint::new(30.05, 31.23)).await;
    let mystery = NewProduct::new("mystery", "oddments", "Mystery box", Money::from_major(100), 10)
        .with_category("misc");
    seed_product(db, mystery).await;
    add_to_cart(db, NewCartItem::new("alice", "mystery", "oddments", 1, Money::from_major(100))).await;
    seed_default_address(db, "alice", GeoPoint::new(30.06, 31.21)).await;
    let driver =
        NewDriver::new("omar", "omar", DriverType::FullTime, VehicleType::Motorbike).at(GeoPoint::new(30.051, 31.231));
    seed_approved_driver(db, driver).await;

    let full = api
        .place_order(NewOrderRequest::new("alice", PaymentMethod::Card, OrderKind::Direct))
        .await
        .expect("Error placing order");
    let number = full.order.order_number.clone();
    api.update_vendor_status(&number, "oddments", VendorStatus::Confirmed, Some(VehicleType::Motorbike), 1)
        .await
        .expect("Error confirming the block");
    api.update_vendor_status(&number, "oddments", VendorStatus::Delivered, None, 1).await.expect("Error delivering");

    let settle = SettlementApi::new(api.db().clone(), FulfillmentConfig::default());
    let settlement = settle.settle_order(&number).await.expect("Error settling order");
    let cut = &settlement.vendors[0];
    assert_eq!(cut.driver_id.as_deref(), Some("omar"));
    assert!(cut.driver_earning.is_zero());
    assert!(cut.platform_commission.is_zero());
    assert_eq!(cut.vendor_earning, cut.basis);
    assert!(settlement.total_driver_earnings().is_zero());

    api.db().set_driver_commission(DriverType::FullTime, VehicleType::Motorbike, 10.0).await.unwrap();
    let misc = Category { id: "misc".to_string(), name: "Miscellany".to_string(), commission_pct: 2.5 };
    api.db().upsert_category(misc).await.unwrap();
    let cut = settle.vendor_settlement(&number, "oddments").await.unwrap().expect("Vendor should have a settlement");
    assert_eq!(cut.driver_earning, Money::from_cents(1010));
    assert_eq!(cut.platform_commission, Money::from_cents(250));
    assert_eq!(cut.vendor_earning, Money::from_cents(8840));
    tear_down(api).await;
}

#[tokio::test]
async fn unknown_orders_cannot_be_settled() {
    let api = setup().await;
    let settle = SettlementApi::new(api.db().clone(), FulfillmentConfig::default());
    let err = settle.settle_order(&OrderNumber::from("MVD-NOSUCHORD")).await.unwrap_err();
    assert!(matches!(err, SettlementError::OrderNotFound(_)));
    tear_down(api).await;
}

/// On a hub route the handover to the customer happens on the last leg, so every delivered block
/// is credited to that leg's driver, even though the blocks were completed one after the other
/// against the same leg.
#[tokio::test]
async fn multi_hub_blocks_share_the_final_leg_driver() {
    let api = setup().await;
    let db = api.db();
    seed_vendor(db, "grocer", "Green Grocer", GeoPoint::new(30.05, 31.23)).await;
    seed_vendor(db, "butcher", "Best Cuts", GeoPoint::new(30.07, 31.25)).await;
    seed_product(db, NewProduct::new("apples", "grocer", "Apples 1kg", Money::from_major(100), 10)).await;
    seed_product(db, NewProduct::new("steak", "butcher", "Ribeye", Money::from_major(30), 10)).await;
    seed_driver_commission(db, DriverType::FullTime, VehicleType::Motorbike, 10.0).await;
    add_to_cart(db, NewCartItem::new("alice", "apples", "grocer", 1, Money::from_major(100))).await;
    add_to_cart(db, NewCartItem::new("alice", "steak", "butcher", 1, Money::from_major(30))).await;
    seed_default_address(db, "alice", GeoPoint::new(30.06, 31.21)).await;
    let driver = NewDriver::new("hubert", "hubert", DriverType::FullTime, VehicleType::Motorbike)
        .at(GeoPoint::new(30.051, 31.231));
    seed_approved_driver(db, driver).await;

    let full = api
        .place_order(NewOrderRequest::new("alice", PaymentMethod::Card, OrderKind::MultiHub))
        .await
        .expect("Error placing order");
    let number = full.order.order_number.clone();
    // The last leg of the route, hub B to the customer.
    let final_leg = full.legs.len() as i64;
    assert_eq!(final_leg, 4);
    api.update_vendor_status(&number, "grocer", VendorStatus::Confirmed, Some(VehicleType::Motorbike), final_leg)
        .await
        .expect("Error confirming the first block");
    api.update_vendor_status(&number, "grocer", VendorStatus::Delivered, None, final_leg)
        .await
        .expect("Error delivering the first block");
    // The second block arrives over the leg the first one already closed.
    let outcome = api
        .update_vendor_status(&number, "butcher", VendorStatus::Delivered, None, final_leg)
        .await
        .expect("Error delivering the second block");
    assert!(outcome.order.all_delivered());

    let config = FulfillmentConfig::default().with_earning_basis(EarningBasis::VendorSubtotal);
    let settle = SettlementApi::new(api.db().clone(), config);
    let settlement = settle.settle_order(&number).await.expect("Error settling order");
    assert_eq!(settlement.vendors.len(), 2);
    for cut in &settlement.vendors {
        assert_eq!(cut.driver_id.as_deref(), Some("hubert"));
    }
    assert_eq!(settlement.vendors[0].driver_earning, Money::from_major(10));
    assert_eq!(settlement.vendors[1].driver_earning, Money::from_major(3));
    assert_eq!(settlement.total_driver_earnings(), Money::from_major(13));
    tear_down(api).await;
}

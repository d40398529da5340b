//! Fires a burst of concurrent confirmations at a single driver. The conditional claim must hand
//! the driver to exactly one order and turn everyone else away.
use std::{sync::Arc, time::Duration};

use fulfillment_engine::{
    db_types::*,
    events::EventProducers,
    order_objects::NewOrderRequest,
    test_utils::{
        prepare_env::prepare_test_env,
        seeds::{add_to_cart, seed_approved_driver, seed_default_address, seed_product, seed_vendor},
    },
    traits::FulfillmentError,
    DriverRegistry,
    FulfillmentConfig,
    OrderFlowApi,
    SqliteDatabase,
};
use log::*;
use tokio::runtime::Runtime;

const NUM_ORDERS: usize = 8;
// Injection pacing, in orders per second.
const RATE: u64 = 100;

#[test]
fn burst_assignment() {
    info!("🚀️ Starting driver contention test");

    let sys = Runtime::new().unwrap();

    let delay = Duration::from_millis(1000 / RATE);

    sys.block_on(async move {
        let url = "sqlite://../data/test_burst_assignment.db";
        prepare_test_env(url).await;
        let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating database");
        let api = Arc::new(OrderFlowApi::new(db, FulfillmentConfig::default(), EventProducers::default()));

        let pickup = GeoPoint::new(30.05, 31.23);
        seed_vendor(api.db(), "grocer", "Green Grocer", pickup).await;
        seed_product(api.db(), NewProduct::new("apples", "grocer", "Apples 1kg", Money::from_major(50), 50)).await;
        let driver = NewDriver::new("solo", "solo", DriverType::FullTime, VehicleType::Motorbike)
            .at(GeoPoint::new(30.051, 31.231));
        seed_approved_driver(api.db(), driver).await;

        let mut timer = tokio::time::interval(delay);
        info!("🚀️ Placing {NUM_ORDERS} orders, one per tick");
        let mut numbers = Vec::with_capacity(NUM_ORDERS);
        for i in 0..NUM_ORDERS {
            timer.tick().await;
            let customer = format!("cust-{i}");
            add_to_cart(api.db(), NewCartItem::new(customer.as_str(), "apples", "grocer", 1, Money::from_major(50))).await;
            seed_default_address(api.db(), &customer, GeoPoint::new(30.06, 31.21)).await;
            let full = api
                .place_order(NewOrderRequest::new(&customer, PaymentMethod::Card, OrderKind::Direct))
                .await
                .unwrap_or_else(|e| panic!("Error placing order {i}: {e}"));
            numbers.push(full.order.order_number.clone());
        }

        info!("🚀️ Confirming all {NUM_ORDERS} orders at once");
        let mut handles = Vec::with_capacity(NUM_ORDERS);
        for number in numbers {
            let api = Arc::clone(&api);
            handles.push(tokio::spawn(async move {
                api.update_vendor_status(&number, "grocer", VendorStatus::Confirmed, Some(VehicleType::Motorbike), 1)
                    .await
            }));
        }

        let mut winner = None;
        let mut turned_away = 0;
        for handle in handles {
            match handle.await.expect("Confirmation task panicked") {
                Ok(outcome) => {
                    assert!(winner.is_none(), "Two orders claimed the same driver");
                    winner = Some(outcome.order);
                },
                Err(FulfillmentError::NoDriverAvailable) => turned_away += 1,
                Err(e) => panic!("Unexpected confirmation error: {e}"),
            }
        }
        let winner = winner.expect("Nobody claimed the driver");
        assert_eq!(turned_away, NUM_ORDERS - 1);
        assert_eq!(winner.leg(1).expect("Winner should have a leg").driver_id.as_deref(), Some("solo"));

        let solo = api.db().driver_by_id("solo").await.unwrap().unwrap();
        assert!(!solo.is_available);
        assert!(solo.is_delivering);
        assert_eq!(api.db().open_leg_count("solo").await.unwrap(), 1);
    });
    info!("🚀️ Contention test complete");
}

//! Fixture seeders for integration tests.
//!
//! These helpers write through the low-level [`crate::sqlite::db`] functions so that tests can stand
//! up vendors, products, drivers, carts and rate tables without going through the public APIs they
//! are exercising.
use mvd_common::{GeoPoint, Money};

use crate::{
    db_types::{
        Category,
        Driver,
        DriverStatus,
        DriverType,
        Location,
        NewAddress,
        NewCartItem,
        NewDriver,
        NewProduct,
        NewVendor,
        VehicleType,
    },
    sqlite::db::{addresses, carts, drivers, products, rates, vendors},
    SqliteDatabase,
};

/// A throwaway street address at the given co-ordinates.
pub fn location_at(lat: f64, lon: f64) -> Location {
    Location {
        lat,
        lon,
        street: "1 Seed Street".to_string(),
        city: "Cairo".to_string(),
        state: "Cairo".to_string(),
        country: "EG".to_string(),
        building: None,
    }
}

pub async fn seed_vendor(db: &SqliteDatabase, id: &str, name: &str, pickup: GeoPoint) {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    let vendor = NewVendor::new(id, name, location_at(pickup.lat, pickup.lon));
    vendors::upsert_vendor(&vendor, &mut conn).await.expect("Error seeding vendor");
}

pub async fn seed_product(db: &SqliteDatabase, product: NewProduct) {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    products::upsert_product(&product, &mut conn).await.expect("Error seeding product");
}

/// Registers a driver and immediately vets them. Only approved drivers can be offered jobs.
pub async fn seed_approved_driver(db: &SqliteDatabase, driver: NewDriver) -> Driver {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    drivers::insert_driver(&driver, &mut conn).await.expect("Error seeding driver");
    drivers::set_status(&driver.id, DriverStatus::Approved, &mut conn)
        .await
        .expect("Error approving driver")
        .expect("Driver disappeared before approval")
}

pub async fn add_to_cart(db: &SqliteDatabase, item: NewCartItem) {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    carts::upsert_cart_item(&item, &mut conn).await.expect("Error seeding cart item");
}

pub async fn seed_default_address(db: &SqliteDatabase, customer_id: &str, drop: GeoPoint) {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    let address = NewAddress::new(customer_id, location_at(drop.lat, drop.lon)).as_default();
    addresses::insert_address(&address, &mut conn).await.expect("Error seeding address");
}

pub async fn seed_driver_commission(db: &SqliteDatabase, driver_type: DriverType, vehicle: VehicleType, pct: f64) {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    rates::set_driver_commission(driver_type, vehicle, pct, &mut conn).await.expect("Error seeding commission rate");
}

pub async fn seed_category(db: &SqliteDatabase, id: &str, name: &str, commission_pct: f64) {
    let mut conn = db.pool().acquire().await.expect("Error acquiring connection");
    let category = Category { id: id.to_string(), name: name.to_string(), commission_pct };
    rates::upsert_category(&category, &mut conn).await.expect("Error seeding category");
}

/// A vendor with one in-stock product, plus one unit of it in the customer's cart. Returns the
/// product id so tests can refer back to it.
pub async fn seed_simple_storefront(
    db: &SqliteDatabase,
    vendor_id: &str,
    customer_id: &str,
    price: Money,
    pickup: GeoPoint,
) -> String {
    seed_vendor(db, vendor_id, &format!("Shop {vendor_id}"), pickup).await;
    let product_id = format!("{vendor_id}-p1");
    let product = NewProduct::new(product_id.as_str(), vendor_id, "Seed product", price, 10);
    seed_product(db, product).await;
    add_to_cart(db, NewCartItem::new(customer_id, product_id.as_str(), vendor_id, 1, price)).await;
    product_id
}

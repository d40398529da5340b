use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use mvd_common::{GeoPoint, Money};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------    OrderNumber     -----------------------------------------------------------
/// A lightweight wrapper around the human-facing order number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

impl FromStr for OrderNumber {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     Location       -----------------------------------------------------------
/// A postal address together with its coordinates. Stored denormalised on the
/// rows that need a snapshot of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub building: Option<String>,
}

impl Location {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}, {}, {}", self.street, self.city, self.state, self.country)
    }
}

//--------------------------------------   ConversionError  -----------------------------------------------------------
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(pub String);

//--------------------------------------     OrderKind      -----------------------------------------------------------
/// How an order moves from vendors to the customer. `Direct` orders ship one
/// leg per vendor straight to the drop location. `MultiHub` orders are routed
/// through the two consolidation warehouses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderKind {
    Direct,
    MultiHub,
}

impl Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderKind::Direct => write!(f, "Direct"),
            OrderKind::MultiHub => write!(f, "MultiHub"),
        }
    }
}

impl FromStr for OrderKind {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" | "Direct" | "direct" => Ok(Self::Direct),
            "2" | "MultiHub" | "multi_hub" => Ok(Self::MultiHub),
            s => Err(ConversionError(format!("Invalid order kind: {s}"))),
        }
    }
}

//--------------------------------------   PaymentMethod    -----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Cash on delivery. Only allowed when every product in the cart permits it.
    Cash,
    Card,
    Wallet,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "Cash"),
            PaymentMethod::Card => write!(f, "Card"),
            PaymentMethod::Wallet => write!(f, "Wallet"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cash" | "cash" | "cod" => Ok(Self::Cash),
            "Card" | "card" => Ok(Self::Card),
            "Wallet" | "wallet" => Ok(Self::Wallet),
            s => Err(ConversionError(format!("Invalid payment method: {s}"))),
        }
    }
}

//--------------------------------------    VendorStatus    -----------------------------------------------------------
/// Lifecycle of one vendor's portion of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum VendorStatus {
    /// The block has been created and the vendor has not acted on it yet.
    Pending,
    /// The vendor accepted the block and a driver has been claimed for its leg.
    Confirmed,
    /// The parcel is packed and waiting for the driver.
    Ready,
    DriverAccepted,
    Picked,
    /// Goods handed to the customer. Terminal, and flips the block to paid.
    Delivered,
    Cancelled,
    /// Goods went back to the vendor through the return workflow. Terminal.
    Returned,
}

impl VendorStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, VendorStatus::Delivered | VendorStatus::Cancelled | VendorStatus::Returned)
    }
}

impl Display for VendorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VendorStatus::Pending => write!(f, "Pending"),
            VendorStatus::Confirmed => write!(f, "Confirmed"),
            VendorStatus::Ready => write!(f, "Ready"),
            VendorStatus::DriverAccepted => write!(f, "DriverAccepted"),
            VendorStatus::Picked => write!(f, "Picked"),
            VendorStatus::Delivered => write!(f, "Delivered"),
            VendorStatus::Cancelled => write!(f, "Cancelled"),
            VendorStatus::Returned => write!(f, "Returned"),
        }
    }
}

impl FromStr for VendorStatus {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" | "pending" => Ok(Self::Pending),
            "Confirmed" | "confirmed" => Ok(Self::Confirmed),
            "Ready" | "ready" => Ok(Self::Ready),
            "DriverAccepted" | "driver_accepted" => Ok(Self::DriverAccepted),
            "Picked" | "picked" => Ok(Self::Picked),
            "Delivered" | "delivered" => Ok(Self::Delivered),
            "Cancelled" | "cancelled" => Ok(Self::Cancelled),
            "Returned" | "returned" => Ok(Self::Returned),
            s => Err(ConversionError(format!("Invalid vendor status: {s}"))),
        }
    }
}

//------------------------------------  VendorPaymentStatus  ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum VendorPaymentStatus {
    Unpaid,
    Paid,
    Refunded,
}

impl Display for VendorPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VendorPaymentStatus::Unpaid => write!(f, "Unpaid"),
            VendorPaymentStatus::Paid => write!(f, "Paid"),
            VendorPaymentStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for VendorPaymentStatus {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unpaid" | "unpaid" => Ok(Self::Unpaid),
            "Paid" | "paid" => Ok(Self::Paid),
            "Refunded" | "refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------     LegStatus      -----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum LegStatus {
    Pending,
    DriverAssigned,
    Picked,
    InTransit,
    Delivered,
    Cancelled,
}

impl LegStatus {
    /// A leg that holds a driver and has not reached a terminal state.
    pub fn is_open(&self) -> bool {
        matches!(self, LegStatus::DriverAssigned | LegStatus::Picked | LegStatus::InTransit)
    }
}

impl Display for LegStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LegStatus::Pending => write!(f, "Pending"),
            LegStatus::DriverAssigned => write!(f, "DriverAssigned"),
            LegStatus::Picked => write!(f, "Picked"),
            LegStatus::InTransit => write!(f, "InTransit"),
            LegStatus::Delivered => write!(f, "Delivered"),
            LegStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for LegStatus {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "DriverAssigned" => Ok(Self::DriverAssigned),
            "Picked" => Ok(Self::Picked),
            "InTransit" => Ok(Self::InTransit),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid leg status: {s}"))),
        }
    }
}

//--------------------------------------    DriverStatus    -----------------------------------------------------------
/// Vetting state of a driver. Only `Approved` drivers are eligible for work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum DriverStatus {
    Pending,
    Approved,
    Rejected,
}

impl Display for DriverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverStatus::Pending => write!(f, "Pending"),
            DriverStatus::Approved => write!(f, "Approved"),
            DriverStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

impl FromStr for DriverStatus {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Approved" => Ok(Self::Approved),
            "Rejected" => Ok(Self::Rejected),
            s => Err(ConversionError(format!("Invalid driver status: {s}"))),
        }
    }
}

//--------------------------------------     DriverType     -----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum DriverType {
    FullTime,
    PartTime,
}

impl Display for DriverType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverType::FullTime => write!(f, "FullTime"),
            DriverType::PartTime => write!(f, "PartTime"),
        }
    }
}

impl FromStr for DriverType {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FullTime" | "full_time" => Ok(Self::FullTime),
            "PartTime" | "part_time" => Ok(Self::PartTime),
            s => Err(ConversionError(format!("Invalid driver type: {s}"))),
        }
    }
}

//--------------------------------------    VehicleType     -----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum VehicleType {
    Motorbike,
    Car,
    Truck,
}

impl Display for VehicleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VehicleType::Motorbike => write!(f, "Motorbike"),
            VehicleType::Car => write!(f, "Car"),
            VehicleType::Truck => write!(f, "Truck"),
        }
    }
}

impl FromStr for VehicleType {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Motorbike" | "motorbike" => Ok(Self::Motorbike),
            "Car" | "car" => Ok(Self::Car),
            "Truck" | "truck" => Ok(Self::Truck),
            s => Err(ConversionError(format!("Invalid vehicle type: {s}"))),
        }
    }
}

//--------------------------------------    ReturnStatus    -----------------------------------------------------------
/// Lifecycle of a whole-order return. `Ready` is accepted on the wire for
/// compatibility but no workflow step currently produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ReturnStatus {
    Requested,
    DriverAssigned,
    Ready,
    Picked,
    /// The vendor has the goods back. The courier is released at this point.
    VendorReceived,
    Completed,
    Rejected,
}

impl Display for ReturnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReturnStatus::Requested => write!(f, "Requested"),
            ReturnStatus::DriverAssigned => write!(f, "DriverAssigned"),
            ReturnStatus::Ready => write!(f, "Ready"),
            ReturnStatus::Picked => write!(f, "Picked"),
            ReturnStatus::VendorReceived => write!(f, "VendorReceived"),
            ReturnStatus::Completed => write!(f, "Completed"),
            ReturnStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

impl FromStr for ReturnStatus {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Requested" => Ok(Self::Requested),
            "DriverAssigned" => Ok(Self::DriverAssigned),
            "Ready" => Ok(Self::Ready),
            "Picked" => Ok(Self::Picked),
            "VendorReceived" => Ok(Self::VendorReceived),
            "Completed" => Ok(Self::Completed),
            "Rejected" => Ok(Self::Rejected),
            s => Err(ConversionError(format!("Invalid return status: {s}"))),
        }
    }
}

//--------------------------------------       Order        -----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub customer_id: String,
    pub order_kind: OrderKind,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub drop_lat: f64,
    pub drop_lon: f64,
    pub drop_street: String,
    pub drop_city: String,
    pub drop_state: String,
    pub drop_country: String,
    pub drop_building: Option<String>,
    pub total_items: i64,
    pub sub_total: Money,
    pub shipping_fee: Money,
    pub grand_total: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn drop_point(&self) -> GeoPoint {
        GeoPoint::new(self.drop_lat, self.drop_lon)
    }
}

//--------------------------------------    OrderVendor     -----------------------------------------------------------
/// One vendor's portion of an order, with a pickup snapshot taken at assembly
/// time so later profile edits cannot change historical orders.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderVendor {
    pub id: i64,
    pub order_id: i64,
    pub vendor_id: String,
    pub status: VendorStatus,
    pub payment_status: VendorPaymentStatus,
    pub pickup_lat: f64,
    pub pickup_lon: f64,
    pub pickup_street: String,
    pub pickup_city: String,
    pub pickup_state: String,
    pub pickup_country: String,
    pub pickup_building: Option<String>,
    pub sub_total: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderVendor {
    pub fn pickup_location(&self) -> Location {
        Location {
            lat: self.pickup_lat,
            lon: self.pickup_lon,
            street: self.pickup_street.clone(),
            city: self.pickup_city.clone(),
            state: self.pickup_state.clone(),
            country: self.pickup_country.clone(),
            building: self.pickup_building.clone(),
        }
    }

    pub fn pickup_point(&self) -> GeoPoint {
        GeoPoint::new(self.pickup_lat, self.pickup_lon)
    }
}

//--------------------------------------     OrderItem      -----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_vendor_id: i64,
    pub product_id: String,
    pub quantity: i64,
    pub price: Money,
    pub total_price: Money,
}

//--------------------------------------        Leg         -----------------------------------------------------------
/// A transport segment of an order. The endpoints are coordinate snapshots
/// with a short label ("vendor:shoes-r-us", "hub-a", "customer"). `cost` is
/// the leg's share of the order's shipping fee, fixed at assembly.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Leg {
    pub id: i64,
    pub order_id: i64,
    pub sequence: i64,
    pub from_lat: f64,
    pub from_lon: f64,
    pub from_label: String,
    pub to_lat: f64,
    pub to_lon: f64,
    pub to_label: String,
    pub driver_id: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub status: LegStatus,
    pub cost: Option<Money>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Leg {
    pub fn from_point(&self) -> GeoPoint {
        GeoPoint::new(self.from_lat, self.from_lon)
    }

    pub fn to_point(&self) -> GeoPoint {
        GeoPoint::new(self.to_lat, self.to_lon)
    }
}

//--------------------------------------   LegRejection     -----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LegRejection {
    pub id: i64,
    pub leg_id: i64,
    pub driver_id: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       Driver       -----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Driver {
    pub id: String,
    pub name: String,
    pub status: DriverStatus,
    pub driver_type: DriverType,
    pub vehicle_type: VehicleType,
    pub is_available: bool,
    pub is_delivering: bool,
    pub lat: f64,
    pub lon: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Driver {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

//--------------------------------------      NewDriver     -----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewDriver {
    pub id: String,
    pub name: String,
    pub driver_type: DriverType,
    pub vehicle_type: VehicleType,
    pub location: GeoPoint,
}

impl NewDriver {
    pub fn new<S: Into<String>>(id: S, name: S, driver_type: DriverType, vehicle_type: VehicleType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            driver_type,
            vehicle_type,
            location: GeoPoint::new(0.0, 0.0),
        }
    }

    pub fn at(mut self, location: GeoPoint) -> Self {
        self.location = location;
        self
    }
}

//--------------------------------------      Product       -----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub vendor_id: String,
    pub name: String,
    pub price: Money,
    pub stock_quantity: i64,
    pub cod_allowed: bool,
    pub order_kind: OrderKind,
    pub category_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     NewProduct     -----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub id: String,
    pub vendor_id: String,
    pub name: String,
    pub price: Money,
    pub stock_quantity: i64,
    pub cod_allowed: bool,
    pub order_kind: OrderKind,
    pub category_id: Option<String>,
}

impl NewProduct {
    pub fn new<S: Into<String>>(id: S, vendor_id: S, name: S, price: Money, stock: i64) -> Self {
        Self {
            id: id.into(),
            vendor_id: vendor_id.into(),
            name: name.into(),
            price,
            stock_quantity: stock,
            cod_allowed: true,
            order_kind: OrderKind::Direct,
            category_id: None,
        }
    }

    pub fn with_kind(mut self, kind: OrderKind) -> Self {
        self.order_kind = kind;
        self
    }

    pub fn with_category<S: Into<String>>(mut self, category_id: S) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn no_cod(mut self) -> Self {
        self.cod_allowed = false;
        self
    }
}

//--------------------------------------     CartItem       -----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    pub customer_id: String,
    pub product_id: String,
    pub vendor_id: String,
    pub quantity: i64,
    pub price: Money,
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    NewCartItem     -----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewCartItem {
    pub customer_id: String,
    pub product_id: String,
    pub vendor_id: String,
    pub quantity: i64,
    pub price: Money,
}

impl NewCartItem {
    pub fn new<S: Into<String>>(customer_id: S, product_id: S, vendor_id: S, quantity: i64, price: Money) -> Self {
        Self {
            customer_id: customer_id.into(),
            product_id: product_id.into(),
            vendor_id: vendor_id.into(),
            quantity,
            price,
        }
    }

    pub fn total_price(&self) -> Money {
        self.price * self.quantity
    }
}

//--------------------------------------      Address       -----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Address {
    pub id: i64,
    pub customer_id: String,
    pub lat: f64,
    pub lon: f64,
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub building: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Address {
    pub fn location(&self) -> Location {
        Location {
            lat: self.lat,
            lon: self.lon,
            street: self.street.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            country: self.country.clone(),
            building: self.building.clone(),
        }
    }
}

//--------------------------------------    NewAddress      -----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewAddress {
    pub customer_id: String,
    pub location: Location,
    pub is_default: bool,
}

impl NewAddress {
    pub fn new<S: Into<String>>(customer_id: S, location: Location) -> Self {
        Self { customer_id: customer_id.into(), location, is_default: false }
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }
}

//--------------------------------------   VendorProfile    -----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct VendorProfile {
    pub id: String,
    pub name: String,
    pub pickup_lat: f64,
    pub pickup_lon: f64,
    pub pickup_street: String,
    pub pickup_city: String,
    pub pickup_state: String,
    pub pickup_country: String,
    pub pickup_building: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VendorProfile {
    pub fn pickup_location(&self) -> Location {
        Location {
            lat: self.pickup_lat,
            lon: self.pickup_lon,
            street: self.pickup_street.clone(),
            city: self.pickup_city.clone(),
            state: self.pickup_state.clone(),
            country: self.pickup_country.clone(),
            building: self.pickup_building.clone(),
        }
    }
}

//--------------------------------------     NewVendor      -----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewVendor {
    pub id: String,
    pub name: String,
    pub pickup: Location,
}

impl NewVendor {
    pub fn new<S: Into<String>>(id: S, name: S, pickup: Location) -> Self {
        Self { id: id.into(), name: name.into(), pickup }
    }
}

//--------------------------------------   ReturnRequest    -----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub id: i64,
    pub order_id: i64,
    pub status: ReturnStatus,
    pub driver_id: Option<String>,
    pub reason: String,
    pub requested_at: DateTime<Utc>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

//------------------------------------   StatusAuditEntry   -----------------------------------------------------------
/// One row of the append-only transition trail. Statuses are stored as plain
/// strings because the entity may be a vendor block, a leg or a return.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StatusAuditEntry {
    pub id: i64,
    pub order_id: i64,
    pub entity: String,
    pub entity_ref: String,
    pub old_status: Option<String>,
    pub new_status: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

//------------------------------------   DriverCommission   -----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DriverCommission {
    pub driver_type: DriverType,
    pub vehicle_type: VehicleType,
    pub commission_pct: f64,
}

//--------------------------------------     Category       -----------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub commission_pct: f64,
}

//--------------------------------------     NewOrder       -----------------------------------------------------------
/// A fully assembled order ready to be persisted. Produced by the order flow
/// from the customer's cart and consumed atomically by the backend.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub customer_id: String,
    pub order_kind: OrderKind,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub drop: Location,
    pub total_items: i64,
    pub sub_total: Money,
    pub shipping_fee: Money,
    pub grand_total: Money,
    pub vendors: Vec<NewVendorBlock>,
    pub legs: Vec<NewLeg>,
}

impl NewOrder {
    /// Product ids of every line item, used to clear the fulfilled cart rows.
    pub fn product_ids(&self) -> Vec<String> {
        self.vendors.iter().flat_map(|v| v.items.iter().map(|i| i.product_id.clone())).collect()
    }
}

//------------------------------------    NewVendorBlock    -----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewVendorBlock {
    pub vendor_id: String,
    pub pickup: Location,
    pub sub_total: Money,
    pub items: Vec<NewOrderItem>,
}

//--------------------------------------   NewOrderItem     -----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: String,
    pub quantity: i64,
    pub price: Money,
    pub total_price: Money,
}

//--------------------------------------      NewLeg        -----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewLeg {
    pub sequence: i64,
    pub from: LegPoint,
    pub to: LegPoint,
    pub cost: Money,
}

//--------------------------------------     LegPoint       -----------------------------------------------------------
/// An endpoint of a transport leg: coordinates plus a short label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegPoint {
    pub point: GeoPoint,
    pub label: String,
}

impl LegPoint {
    pub fn new<S: Into<String>>(point: GeoPoint, label: S) -> Self {
        Self { point, label: label.into() }
    }
}

use std::{env, str::FromStr};

use log::*;
use mvd_common::{GeoPoint, Money};

use crate::db_types::ConversionError;

const DEFAULT_SEARCH_RADIUS_KM: f64 = 10.0;
// Consolidation warehouses for multi-hub orders. Operators override these per deployment.
const DEFAULT_HUB_A_LAT: f64 = 30.0444;
const DEFAULT_HUB_A_LON: f64 = 31.2357;
const DEFAULT_HUB_B_LAT: f64 = 31.2001;
const DEFAULT_HUB_B_LON: f64 = 29.9187;
const DEFAULT_SHIPPING_FEE_SINGLE: i64 = 1;
const DEFAULT_SHIPPING_FEE_MULTI: i64 = 2;

/// Runtime knobs for the fulfillment engine. Everything here can be set through `MVD_*`
/// environment variables; missing or malformed values fall back to the defaults with a logged
/// warning.
#[derive(Clone, Debug)]
pub struct FulfillmentConfig {
    /// Radius of driver searches, in kilometres.
    pub search_radius_km: f64,
    /// First consolidation warehouse on the multi-hub route.
    pub hub_a: GeoPoint,
    /// Second consolidation warehouse on the multi-hub route.
    pub hub_b: GeoPoint,
    /// Flat shipping fee when the order has exactly one vendor, in whole currency units.
    pub shipping_fee_single: Money,
    /// Flat shipping fee when the order spans several vendors, in whole currency units.
    pub shipping_fee_multi: Money,
    /// The amount driver commission percentages are applied to at settlement time.
    pub earning_basis: EarningBasis,
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            search_radius_km: DEFAULT_SEARCH_RADIUS_KM,
            hub_a: GeoPoint::new(DEFAULT_HUB_A_LAT, DEFAULT_HUB_A_LON),
            hub_b: GeoPoint::new(DEFAULT_HUB_B_LAT, DEFAULT_HUB_B_LON),
            shipping_fee_single: Money::from_major(DEFAULT_SHIPPING_FEE_SINGLE),
            shipping_fee_multi: Money::from_major(DEFAULT_SHIPPING_FEE_MULTI),
            earning_basis: EarningBasis::OrderGrandTotal,
        }
    }
}

impl FulfillmentConfig {
    pub fn from_env_or_default() -> Self {
        let defaults = FulfillmentConfig::default();
        let search_radius_km = f64_var("MVD_SEARCH_RADIUS_KM", defaults.search_radius_km);
        let hub_a = GeoPoint::new(
            f64_var("MVD_HUB_A_LAT", defaults.hub_a.lat),
            f64_var("MVD_HUB_A_LON", defaults.hub_a.lon),
        );
        let hub_b = GeoPoint::new(
            f64_var("MVD_HUB_B_LAT", defaults.hub_b.lat),
            f64_var("MVD_HUB_B_LON", defaults.hub_b.lon),
        );
        let shipping_fee_single =
            Money::from_major(i64_var("MVD_SHIPPING_FEE_SINGLE", DEFAULT_SHIPPING_FEE_SINGLE));
        let shipping_fee_multi = Money::from_major(i64_var("MVD_SHIPPING_FEE_MULTI", DEFAULT_SHIPPING_FEE_MULTI));
        let earning_basis = env::var("MVD_EARNING_BASIS")
            .map(|s| {
                EarningBasis::from_str(&s).unwrap_or_else(|e| {
                    error!("🪛️ {e} Using the default, OrderGrandTotal, instead.");
                    EarningBasis::OrderGrandTotal
                })
            })
            .ok()
            .unwrap_or(defaults.earning_basis);
        Self { search_radius_km, hub_a, hub_b, shipping_fee_single, shipping_fee_multi, earning_basis }
    }

    pub fn with_radius(mut self, radius_km: f64) -> Self {
        self.search_radius_km = radius_km;
        self
    }

    pub fn with_hubs(mut self, hub_a: GeoPoint, hub_b: GeoPoint) -> Self {
        self.hub_a = hub_a;
        self.hub_b = hub_b;
        self
    }

    pub fn with_earning_basis(mut self, basis: EarningBasis) -> Self {
        self.earning_basis = basis;
        self
    }
}

/// What driver commission percentages are applied to when an order is settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EarningBasis {
    /// The whole order's grand total, even when several vendors share the order.
    OrderGrandTotal,
    /// The vendor block's own subtotal.
    VendorSubtotal,
}

impl FromStr for EarningBasis {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OrderGrandTotal" | "order_grand_total" | "grand_total" => Ok(Self::OrderGrandTotal),
            "VendorSubtotal" | "vendor_subtotal" | "subtotal" => Ok(Self::VendorSubtotal),
            s => Err(ConversionError(format!("Invalid earning basis: {s}"))),
        }
    }
}

fn f64_var(name: &str, default: f64) -> f64 {
    env::var(name)
        .map(|s| {
            s.parse::<f64>().unwrap_or_else(|e| {
                error!("🪛️ {s} is not a valid value for {name}. {e}. Using the default, {default}, instead.");
                default
            })
        })
        .ok()
        .unwrap_or(default)
}

fn i64_var(name: &str, default: i64) -> i64 {
    env::var(name)
        .map(|s| {
            s.parse::<i64>().unwrap_or_else(|e| {
                error!("🪛️ {s} is not a valid value for {name}. {e}. Using the default, {default}, instead.");
                default
            })
        })
        .ok()
        .unwrap_or(default)
}

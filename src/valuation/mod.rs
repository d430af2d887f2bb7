//! Rent, expense and ROI estimation for a single listing.
//!
//! `rent` and `expenses` hold the two heuristics, `calculator` composes them
//! into a `PropertyValuationResult` without any I/O, and `service` adds the
//! area price lookup in front of the calculator.

pub mod calculator;
pub mod expenses;
pub mod rent;
pub mod service;

pub use service::Valuator;

/// Round to the nearest whole currency unit, halves rounding up.
#[inline]
pub fn round_currency(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Round to `places` decimal places.
#[inline]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

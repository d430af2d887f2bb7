use crate::error::{AppError, Result};
use crate::types::{AreaPriceStat, PropertyValuationInput, PropertyValuationResult};
use crate::valuation::expenses::{estimate_monthly_expenses, expense_ratio};
use crate::valuation::rent::{estimate_monthly_rent, yield_rate};
use crate::valuation::{round_currency, round_to};

/// Check that the listing price is usable.
fn validate_price(price: Option<f64>) -> Result<f64> {
    match price {
        None => Err(AppError::InvalidInput("price is required".to_string())),
        Some(p) if !p.is_finite() || p <= 0.0 => Err(AppError::InvalidInput(format!(
            "price must be a positive amount, got {p}"
        ))),
        Some(p) => Ok(p),
    }
}

/// Optional positive amount. Zero counts as "not supplied"; negative and
/// non-finite values are rejected.
fn optional_amount(value: Option<f64>, field: &str) -> Result<Option<f64>> {
    match value {
        None => Ok(None),
        Some(v) if !v.is_finite() || v < 0.0 => Err(AppError::InvalidInput(format!(
            "{field} must be a positive amount, got {v}"
        ))),
        Some(v) if v == 0.0 => Ok(None),
        Some(v) => Ok(Some(v)),
    }
}

/// Input amounts after validation. Optional amounts that were zero are `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckedAmounts {
    pub price: f64,
    pub monthly_rent: Option<f64>,
    pub monthly_expenses: Option<f64>,
    pub area_square_meters: Option<f64>,
}

/// Validate every numeric field of `input`. Cheap and side-effect free, so it
/// runs before the area lookup as well as inside `calculate`.
pub fn validate(input: &PropertyValuationInput) -> Result<CheckedAmounts> {
    Ok(CheckedAmounts {
        price: validate_price(input.price)?,
        monthly_rent: optional_amount(input.monthly_rent, "monthly_rent")?,
        monthly_expenses: optional_amount(input.monthly_expenses, "monthly_expenses")?,
        area_square_meters: optional_amount(input.area_square_meters, "area_square_meters")?,
    })
}

/// Signed percentage deviation of `price_per_m2` from `area_average`,
/// rounded to the nearest integer. `None` when the average is unusable.
pub fn area_difference_percent(price_per_m2: f64, area_average: f64) -> Option<i64> {
    if !(area_average.is_finite() && area_average > 0.0) {
        return None;
    }
    let diff = round_currency((price_per_m2 - area_average) / area_average * 100.0);
    diff.is_finite().then_some(diff as i64)
}

/// Compute rent, expenses and ROI for a listing.
///
/// `area` is the locality stat for the listing's address, when one was looked
/// up. Price per m² and the area difference are only reported when the floor
/// area is known (and, for the difference, when `area` is present).
pub fn calculate(
    input: &PropertyValuationInput,
    area: Option<AreaPriceStat>,
) -> Result<PropertyValuationResult> {
    let CheckedAmounts {
        price,
        monthly_rent: supplied_rent,
        monthly_expenses: supplied_expenses,
        area_square_meters: square_meters,
    } = validate(input)?;

    let price_per_square_meter = match square_meters.map(|m2| round_currency(price / m2)) {
        Some(ppm) if !ppm.is_finite() => {
            return Err(AppError::InvalidInput(format!(
                "area_square_meters is too small for a price per m², got {}",
                input.area_square_meters.unwrap_or_default()
            )));
        }
        ppm => ppm,
    };
    let area_difference_percent = match (price_per_square_meter, area.as_ref()) {
        (Some(ppm), Some(stat)) => area_difference_percent(ppm, stat.average_price_per_square_meter),
        _ => None,
    };

    let description = input.description.as_deref();

    let (monthly_rent, rent_yield_percent) = match supplied_rent {
        Some(rent) => (rent, round_to(rent / price * 100.0, 4)),
        None => (
            estimate_monthly_rent(price, area_difference_percent),
            round_to(yield_rate(price, area_difference_percent) * 100.0, 4),
        ),
    };

    let (monthly_expenses, expense_ratio_percent) = match supplied_expenses {
        Some(expenses) => (expenses, round_to(expenses / monthly_rent * 100.0, 2)),
        None => (
            estimate_monthly_expenses(monthly_rent, description),
            round_to(expense_ratio(description) * 100.0, 2),
        ),
    };

    let annual_net_income = (monthly_rent - monthly_expenses) * 12.0;
    let roi_percent = round_to(annual_net_income / price * 100.0, 2);

    if !roi_percent.is_finite() || !rent_yield_percent.is_finite() || !expense_ratio_percent.is_finite() {
        return Err(AppError::InvalidInput(
            "amounts are too large to produce a finite valuation".to_string(),
        ));
    }

    Ok(PropertyValuationResult {
        price,
        monthly_rent,
        monthly_expenses,
        roi_percent,
        price_per_square_meter,
        area_difference_percent,
        rent_yield_percent,
        expense_ratio_percent,
        rent_estimated: supplied_rent.is_none(),
        expenses_estimated: supplied_expenses.is_none(),
        area,
    })
}

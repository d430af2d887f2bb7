use crate::config::yield_tiers::*;
use crate::valuation::round_currency;

/// Monthly yield for a price band, before any area adjustment.
pub fn base_yield_rate(price: f64) -> f64 {
    if price > LUXURY_MIN {
        LUXURY
    } else if price > UPPER_MIN {
        UPPER
    } else if price < LOW_MAX {
        LOW
    } else {
        DEFAULT
    }
}

/// Monthly yield after shifting for how the listing compares to its area.
/// Overpriced listings (deviation above the threshold) earn less, underpriced more.
pub fn yield_rate(price: f64, area_difference_percent: Option<i64>) -> f64 {
    let base = base_yield_rate(price);
    match area_difference_percent {
        Some(d) if d > AREA_DEVIATION_THRESHOLD => base - AREA_ADJUSTMENT,
        Some(d) if d < -AREA_DEVIATION_THRESHOLD => base + AREA_ADJUSTMENT,
        _ => base,
    }
}

/// Estimated monthly rent in whole currency units. Never below 1.
pub fn estimate_monthly_rent(price: f64, area_difference_percent: Option<i64>) -> f64 {
    round_currency(price * yield_rate(price, area_difference_percent)).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_price_bands() {
        assert_eq!(base_yield_rate(50_000.0), LOW);
        assert_eq!(base_yield_rate(99_999.0), LOW);
        assert_eq!(base_yield_rate(100_000.0), DEFAULT);
        assert_eq!(base_yield_rate(300_000.0), DEFAULT);
        assert_eq!(base_yield_rate(300_001.0), UPPER);
        assert_eq!(base_yield_rate(500_000.0), UPPER);
        assert_eq!(base_yield_rate(500_001.0), LUXURY);
    }

    #[test]
    fn default_tier_rent() {
        assert_eq!(estimate_monthly_rent(300_000.0, None), 2400.0);
    }

    #[test]
    fn overpriced_listing_lowers_yield() {
        // 0.6% - 0.05pp = 0.55%
        assert_eq!(estimate_monthly_rent(600_000.0, Some(15)), 3300.0);
    }

    #[test]
    fn underpriced_listing_raises_yield() {
        // 0.8% + 0.05pp = 0.85%
        assert_eq!(estimate_monthly_rent(200_000.0, Some(-25)), 1700.0);
    }

    #[test]
    fn deviation_at_threshold_is_ignored() {
        assert_eq!(yield_rate(200_000.0, Some(10)), DEFAULT);
        assert_eq!(yield_rate(200_000.0, Some(-10)), DEFAULT);
        assert_eq!(yield_rate(200_000.0, Some(0)), DEFAULT);
    }

    #[test]
    fn tiny_prices_still_yield_positive_rent() {
        assert_eq!(estimate_monthly_rent(10.0, None), 1.0);
    }
}

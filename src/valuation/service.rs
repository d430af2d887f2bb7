use std::sync::Arc;

use tracing::info;

use crate::area::AreaPriceNormalizer;
use crate::error::Result;
use crate::types::{PropertyValuationInput, PropertyValuationResult};
use crate::valuation::calculator::{calculate, validate};

/// Area lookup followed by the pure calculation.
pub struct Valuator {
    normalizer: Arc<AreaPriceNormalizer>,
}

impl Valuator {
    pub fn new(normalizer: Arc<AreaPriceNormalizer>) -> Self {
        Self { normalizer }
    }

    pub fn normalizer(&self) -> &Arc<AreaPriceNormalizer> {
        &self.normalizer
    }

    /// Every input amount is checked before any lookup; area stats are only
    /// fetched when an address is present.
    pub async fn compute_valuation(
        &self,
        input: &PropertyValuationInput,
    ) -> Result<PropertyValuationResult> {
        validate(input)?;

        let area = match input.address() {
            Some(address) => Some(self.normalizer.get_area_stats(address).await),
            None => None,
        };

        let result = calculate(input, area)?;
        info!(
            event = "VALUATION",
            price = result.price,
            roi = result.roi_percent,
            "[VALUATION] price {:.0} | rent {:.0}{} | expenses {:.0}{} | roi {:.2}%",
            result.price,
            result.monthly_rent,
            if result.rent_estimated { " (est)" } else { "" },
            result.monthly_expenses,
            if result.expenses_estimated { " (est)" } else { "" },
            result.roi_percent,
        );
        Ok(result)
    }
}

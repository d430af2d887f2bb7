use crate::config::expense_ratios::*;
use crate::valuation::round_currency;

/// Expense ratio picked from description keywords. Newer-property keywords
/// take precedence over older-property ones.
pub fn expense_ratio(description: Option<&str>) -> f64 {
    let Some(text) = description else {
        return DEFAULT;
    };
    let text = text.to_lowercase();
    if NEWER_KEYWORDS.iter().any(|k| text.contains(k)) {
        NEWER
    } else if OLDER_KEYWORDS.iter().any(|k| text.contains(k)) {
        OLDER
    } else {
        DEFAULT
    }
}

/// Estimated monthly expenses in whole currency units. Never below 1.
pub fn estimate_monthly_expenses(monthly_rent: f64, description: Option<&str>) -> f64 {
    round_currency(monthly_rent * expense_ratio(description)).max(1.0)
}

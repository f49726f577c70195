//! Custom Askama template filters.

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Item count with the right noun: `1 item`, `3 items`.
///
/// Usage in templates: `{{ cart.item_count|units }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn units(count: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(units_label(&count.to_string()))
}

fn units_label(count: &str) -> String {
    if count == "1" {
        "1 item".to_string()
    } else {
        format!("{count} items")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_label_pluralizes() {
        assert_eq!(units_label("1"), "1 item");
        assert_eq!(units_label("0"), "0 items");
        assert_eq!(units_label("12"), "12 items");
    }
}

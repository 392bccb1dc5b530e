//! Fixed code tables mapping site-facing strings to stable numeric ids.
//!
//! Feeds carry human-readable codes (`"KRW"`, `"1+1"`, `"GS25"`); persisted
//! records carry the ids. Unknown input returns `None` so callers can treat
//! it as a per-item extraction error instead of a panic.

pub const CURRENCY_KRW: i32 = 1;

/// Currencies the price schema accepts.
pub const SUPPORTED_CURRENCIES: &[i32] = &[CURRENCY_KRW];

#[must_use]
pub fn is_supported_currency(code: i32) -> bool {
    SUPPORTED_CURRENCIES.contains(&code)
}

/// Currency code, e.g. `"KRW"` -> 1.
#[must_use]
pub fn currency_id(currency: &str) -> Option<i32> {
    match currency.trim().to_uppercase().as_str() {
        "KRW" => Some(CURRENCY_KRW),
        _ => None,
    }
}

/// Store brand name, e.g. `"GS25"` -> 1.
#[must_use]
pub fn brand_id(brand: &str) -> Option<i32> {
    match brand.trim().to_uppercase().as_str() {
        "GS25" => Some(1),
        "CU" => Some(2),
        "SEVEN ELEVEN" => Some(3),
        "EMART24" => Some(4),
        "C-SPACE" => Some(5),
        _ => None,
    }
}

/// Promotion type, e.g. `"1+1"` -> 1.
#[must_use]
pub fn event_type_id(event: &str) -> Option<i32> {
    match event.trim().to_uppercase().as_str() {
        "1+1" => Some(1),
        "2+1" => Some(2),
        "GIFT" => Some(3),
        "NEW" => Some(4),
        "MONOPOLY" => Some(5),
        // Items that must be reserved ahead of pickup.
        "RESERVATION" => Some(6),
        "DISCOUNT" => Some(7),
        _ => None,
    }
}

/// Product category, e.g. `"DRINK"` -> 1.
#[must_use]
pub fn category_id(category: &str) -> Option<i32> {
    match category.trim().to_uppercase().as_str() {
        "DRINK" => Some(1),
        "ALCOHOL" => Some(2),
        "SNACK" => Some(3),
        "ICE CREAM" => Some(4),
        "CUP NOODLE" => Some(5),
        "LUNCH BOX" => Some(6),
        "SALAD" => Some(7),
        "KIMBAP" => Some(8),
        "SANDWICH" => Some(9),
        "BREAD" => Some(10),
        "FOOD" => Some(11),
        "HOUSEHOLD GOODS" => Some(12),
        _ => None,
    }
}

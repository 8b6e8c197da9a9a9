//! Fixed catalogs for the offer `category` and `location` fields.
//!
//! Both the wizard and the API schema accept only values listed here. The
//! lists are served verbatim to front-ends via `GET /api/catalog`.

use serde::Serialize;

/// Service categories a couple can post an offer under.
pub const CATEGORY_OPTIONS: &[&str] = &[
    "Setup & Breakdown",
    "Decor & Styling",
    "Day-of Coordination",
    "Hair & Makeup",
    "Photography & Video",
    "Catering & Dessert Table",
    "Bartending",
    "Music & DJ",
    "Transportation & Driving",
    "Officiant",
    "Childcare",
    "Cleanup",
    "Other",
];

/// Cities WedFlex currently serves.
pub const CITY_OPTIONS: &[&str] = &[
    "Atlanta, GA",
    "Austin, TX",
    "Charlotte, NC",
    "Chicago, IL",
    "Dallas, TX",
    "Denver, CO",
    "Houston, TX",
    "Los Angeles, CA",
    "Miami, FL",
    "Nashville, TN",
    "New York, NY",
    "Phoenix, AZ",
    "San Diego, CA",
    "Seattle, WA",
    "Washington, DC",
];

/// Returns `true` if `value` (after trimming) is a known category.
pub fn is_known_category(value: &str) -> bool {
    CATEGORY_OPTIONS.contains(&value.trim())
}

/// Returns `true` if `value` (after trimming) is a known city.
pub fn is_known_city(value: &str) -> bool {
    CITY_OPTIONS.contains(&value.trim())
}

/// Both catalogs, shaped for the `/api/catalog` response.
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    pub categories: &'static [&'static str],
    pub cities: &'static [&'static str],
}

impl Catalog {
    pub fn current() -> Self {
        Self {
            categories: CATEGORY_OPTIONS,
            cities: CITY_OPTIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values_match_after_trim() {
        assert!(is_known_category("  Decor & Styling "));
        assert!(is_known_city("Austin, TX"));
    }

    #[test]
    fn unknown_and_empty_values_are_rejected() {
        assert!(!is_known_category(""));
        assert!(!is_known_category("decor & styling"));
        assert!(!is_known_city("Springfield"));
    }
}

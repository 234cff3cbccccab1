//! Filter Validator
//!
//! The worker accepts two enumerated filters. Both are checked here, before
//! anything touches the filesystem or launches a process.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Processing mode understood by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Provisional orders, two days ahead.
    #[serde(rename = "precommandes")]
    PreOrders,
    /// Final orders, one day ahead.
    #[serde(rename = "commandes")]
    Orders,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::PreOrders, Mode::Orders];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::PreOrders => "precommandes",
            Mode::Orders => "commandes",
        }
    }

    /// Days between today and the departure date the worker keeps.
    pub fn day_offset(&self) -> i64 {
        match self {
            Mode::Orders => 1,
            Mode::PreOrders => 2,
        }
    }

    pub fn target_date(&self, today: NaiveDate) -> NaiveDate {
        today + Duration::days(self.day_offset())
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| FilterError::InvalidMode(s.to_string()))
    }
}

/// Service category understood by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "salon")]
    Lounge,
    #[serde(rename = "prestations")]
    Onboard,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Lounge, Category::Onboard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Lounge => "salon",
            Category::Onboard => "prestations",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| FilterError::InvalidCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    #[error("Invalid category: {0}")]
    InvalidCategory(String),
}

/// A validated (mode, category) pair. Only the validator constructs these
/// from untrusted strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterParameters {
    mode: Mode,
    category: Category,
}

impl FilterParameters {
    pub fn new(mode: Mode, category: Category) -> Self {
        Self { mode, category }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn category(&self) -> Category {
        self.category
    }
}

/// Checks raw filter strings against the configured enumerated sets.
#[derive(Debug, Clone)]
pub struct FilterValidator {
    modes: Vec<Mode>,
    categories: Vec<Category>,
}

impl Default for FilterValidator {
    fn default() -> Self {
        Self::new(Mode::ALL.to_vec(), Category::ALL.to_vec())
    }
}

impl FilterValidator {
    pub fn new(modes: Vec<Mode>, categories: Vec<Category>) -> Self {
        Self { modes, categories }
    }

    /// Validate mode first, then category. Pure: no I/O, no logging.
    pub fn validate(&self, mode: &str, category: &str) -> Result<FilterParameters, FilterError> {
        let parsed_mode = Mode::from_str(mode)?;
        if !self.modes.contains(&parsed_mode) {
            return Err(FilterError::InvalidMode(mode.to_string()));
        }

        let parsed_category = Category::from_str(category)?;
        if !self.categories.contains(&parsed_category) {
            return Err(FilterError::InvalidCategory(category.to_string()));
        }

        Ok(FilterParameters::new(parsed_mode, parsed_category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_every_known_pair() {
        let validator = FilterValidator::default();
        for mode in Mode::ALL {
            for category in Category::ALL {
                let params = validator
                    .validate(mode.as_str(), category.as_str())
                    .unwrap();
                assert_eq!(params.mode(), mode);
                assert_eq!(params.category(), category);
            }
        }
    }

    #[test]
    fn test_validate_rejects_unknown_mode() {
        let err = FilterValidator::default()
            .validate("bad", "salon")
            .unwrap_err();
        assert_eq!(err, FilterError::InvalidMode("bad".to_string()));
        assert_eq!(err.to_string(), "Invalid mode: bad");
    }

    #[test]
    fn test_validate_rejects_unknown_category() {
        let err = FilterValidator::default()
            .validate("commandes", "bad")
            .unwrap_err();
        assert_eq!(err, FilterError::InvalidCategory("bad".to_string()));
        assert_eq!(err.to_string(), "Invalid category: bad");
    }

    #[test]
    fn test_mode_checked_before_category() {
        let err = FilterValidator::default().validate("x", "y").unwrap_err();
        assert!(matches!(err, FilterError::InvalidMode(_)));
    }

    #[test]
    fn test_validate_is_case_sensitive() {
        assert!(FilterValidator::default()
            .validate("COMMANDES", "salon")
            .is_err());
    }

    #[test]
    fn test_restricted_sets_reject_known_values() {
        let validator = FilterValidator::new(vec![Mode::Orders], vec![Category::Lounge]);
        assert!(validator.validate("commandes", "salon").is_ok());
        assert_eq!(
            validator.validate("precommandes", "salon").unwrap_err(),
            FilterError::InvalidMode("precommandes".to_string())
        );
        assert_eq!(
            validator.validate("commandes", "prestations").unwrap_err(),
            FilterError::InvalidCategory("prestations".to_string())
        );
    }

    #[test]
    fn test_target_date_offsets() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(
            Mode::Orders.target_date(today),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );
        assert_eq!(
            Mode::PreOrders.target_date(today),
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()
        );
    }

    #[test]
    fn test_wire_names_serde() {
        assert_eq!(serde_json::to_string(&Mode::Orders).unwrap(), "\"commandes\"");
        assert_eq!(
            serde_json::from_str::<Category>("\"prestations\"").unwrap(),
            Category::Onboard
        );
    }
}

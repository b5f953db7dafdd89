//! Range checks for user-entered values.
//!
//! Every validator returns a [`ValidationResult`]: values outside the hard
//! range are `Invalid`, plausible-but-unusual values are `Warning` and still
//! count as valid.

use anyhow::{Result, bail};
use chrono::{DateTime, Duration, Local};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum ValidationResult {
    Valid,
    Warning(String),
    Invalid(String),
}

impl ValidationResult {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !matches!(self, ValidationResult::Invalid(_))
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Warning(m) | ValidationResult::Invalid(m) => Some(m),
        }
    }

    /// `Invalid` becomes an error; a warning is handed back for the caller to report.
    pub fn into_result(self) -> Result<Option<String>> {
        match self {
            ValidationResult::Valid => Ok(None),
            ValidationResult::Warning(m) => Ok(Some(m)),
            ValidationResult::Invalid(m) => bail!(m),
        }
    }

    /// Keep the first non-`Valid` outcome, preferring `Invalid`.
    #[must_use]
    pub fn and(self, other: ValidationResult) -> ValidationResult {
        match (&self, &other) {
            (ValidationResult::Invalid(_), _) => self,
            (_, ValidationResult::Invalid(_)) => other,
            (ValidationResult::Warning(_), _) => self,
            _ => other,
        }
    }
}

pub const MAX_MEAL_NAME_LEN: usize = 100;

/// Hard and soft bounds for one numeric field.
struct Range {
    label: &'static str,
    unit: &'static str,
    min: f64,
    min_inclusive: bool,
    max: f64,
    warn_below: Option<f64>,
    warn_above: Option<f64>,
}

impl Range {
    fn check(&self, value: f64) -> ValidationResult {
        let Range {
            label,
            unit,
            min,
            max,
            ..
        } = *self;
        if !value.is_finite() {
            return ValidationResult::Invalid(format!("{label} must be a valid number"));
        }
        let below_min = if self.min_inclusive {
            value < min
        } else {
            value <= min
        };
        if below_min {
            return ValidationResult::Invalid(if self.min_inclusive {
                format!("{label} must be at least {min}{unit}")
            } else {
                format!("{label} must be greater than {min}{unit}")
            });
        }
        if value > max {
            return ValidationResult::Invalid(format!("{label} must be at most {max}{unit}"));
        }
        if let Some(low) = self.warn_below {
            if value < low {
                return ValidationResult::Warning(format!(
                    "{label} of {value}{unit} is unusually low"
                ));
            }
        }
        if let Some(high) = self.warn_above {
            if value > high {
                return ValidationResult::Warning(format!(
                    "{label} of {value}{unit} is unusually high"
                ));
            }
        }
        ValidationResult::Valid
    }
}

#[must_use]
pub fn validate_weight(weight_kg: f64) -> ValidationResult {
    Range {
        label: "Weight",
        unit: " kg",
        min: 0.0,
        min_inclusive: false,
        max: 500.0,
        warn_below: Some(30.0),
        warn_above: Some(250.0),
    }
    .check(weight_kg)
}

#[must_use]
pub fn validate_height(height_cm: f64) -> ValidationResult {
    Range {
        label: "Height",
        unit: " cm",
        min: 50.0,
        min_inclusive: true,
        max: 300.0,
        warn_below: Some(120.0),
        warn_above: Some(230.0),
    }
    .check(height_cm)
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn validate_age(age: i64) -> ValidationResult {
    Range {
        label: "Age",
        unit: " years",
        min: 1.0,
        min_inclusive: true,
        max: 150.0,
        warn_below: Some(15.0),
        warn_above: Some(100.0),
    }
    .check(age as f64)
}

#[must_use]
pub fn validate_calories(calories: f64) -> ValidationResult {
    Range {
        label: "Calories",
        unit: " kcal",
        min: 0.0,
        min_inclusive: true,
        max: 10_000.0,
        warn_below: None,
        warn_above: Some(3_000.0),
    }
    .check(calories)
}

/// Protein, carbohydrate or fat grams.
#[must_use]
pub fn validate_macro(label: &'static str, grams: f64) -> ValidationResult {
    Range {
        label,
        unit: " g",
        min: 0.0,
        min_inclusive: true,
        max: 1_000.0,
        warn_below: None,
        warn_above: Some(300.0),
    }
    .check(grams)
}

#[must_use]
pub fn validate_water(amount_ml: f64) -> ValidationResult {
    Range {
        label: "Water amount",
        unit: " ml",
        min: 0.0,
        min_inclusive: false,
        max: 5_000.0,
        warn_below: None,
        warn_above: Some(2_000.0),
    }
    .check(amount_ml)
}

/// Timestamps may not be more than five minutes ahead of `now`; entries
/// older than 30 days are flagged.
#[must_use]
pub fn validate_timestamp(ts: &DateTime<Local>, now: &DateTime<Local>) -> ValidationResult {
    if *ts > *now + Duration::minutes(5) {
        return ValidationResult::Invalid("Timestamp cannot be in the future".to_string());
    }
    if *ts < *now - Duration::days(30) {
        return ValidationResult::Warning(format!(
            "Timestamp {} is more than 30 days old",
            ts.format("%Y-%m-%d")
        ));
    }
    ValidationResult::Valid
}

#[must_use]
pub fn validate_meal_name(name: &str) -> ValidationResult {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return ValidationResult::Invalid("Name must not be empty".to_string());
    }
    if trimmed.chars().count() > MAX_MEAL_NAME_LEN {
        return ValidationResult::Invalid(format!(
            "Name must be at most {MAX_MEAL_NAME_LEN} characters"
        ));
    }
    ValidationResult::Valid
}

/// Calories plus the three macros of a meal or custom food.
#[must_use]
pub fn validate_nutrition(
    calories: f64,
    protein_g: f64,
    carbs_g: f64,
    fat_g: f64,
) -> ValidationResult {
    validate_calories(calories)
        .and(validate_macro("Protein", protein_g))
        .and(validate_macro("Carbs", carbs_g))
        .and(validate_macro("Fat", fat_g))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_ranges() {
        assert_eq!(validate_weight(75.0), ValidationResult::Valid);
        assert!(matches!(validate_weight(0.0), ValidationResult::Invalid(_)));
        assert!(matches!(validate_weight(-5.0), ValidationResult::Invalid(_)));
        assert!(matches!(validate_weight(501.0), ValidationResult::Invalid(_)));
        assert!(matches!(validate_weight(25.0), ValidationResult::Warning(_)));
        assert!(matches!(validate_weight(260.0), ValidationResult::Warning(_)));
        assert!(validate_weight(260.0).is_valid());
    }

    #[test]
    fn test_weight_rejects_nan() {
        assert!(!validate_weight(f64::NAN).is_valid());
        assert!(!validate_weight(f64::INFINITY).is_valid());
    }

    #[test]
    fn test_height_ranges() {
        assert_eq!(validate_height(175.0), ValidationResult::Valid);
        assert_eq!(
            validate_height(50.0),
            ValidationResult::Warning("Height of 50 cm is unusually low".to_string())
        );
        assert!(!validate_height(49.9).is_valid());
        assert!(!validate_height(300.1).is_valid());
        assert!(matches!(validate_height(240.0), ValidationResult::Warning(_)));
    }

    #[test]
    fn test_age_ranges() {
        assert_eq!(validate_age(30), ValidationResult::Valid);
        assert!(!validate_age(0).is_valid());
        assert!(!validate_age(151).is_valid());
        assert!(matches!(validate_age(12), ValidationResult::Warning(_)));
        assert!(matches!(validate_age(105), ValidationResult::Warning(_)));
    }

    #[test]
    fn test_calories_ranges() {
        assert_eq!(validate_calories(0.0), ValidationResult::Valid);
        assert_eq!(validate_calories(650.0), ValidationResult::Valid);
        assert!(!validate_calories(-1.0).is_valid());
        assert!(!validate_calories(10_001.0).is_valid());
        assert!(matches!(validate_calories(3_500.0), ValidationResult::Warning(_)));
    }

    #[test]
    fn test_macro_ranges() {
        assert_eq!(validate_macro("Protein", 30.0), ValidationResult::Valid);
        assert!(!validate_macro("Protein", -0.5).is_valid());
        assert!(!validate_macro("Fat", 1_200.0).is_valid());
        assert!(matches!(validate_macro("Carbs", 350.0), ValidationResult::Warning(_)));
    }

    #[test]
    fn test_water_ranges() {
        assert_eq!(validate_water(250.0), ValidationResult::Valid);
        assert!(!validate_water(0.0).is_valid());
        assert!(!validate_water(6_000.0).is_valid());
        assert!(matches!(validate_water(2_500.0), ValidationResult::Warning(_)));
    }

    #[test]
    fn test_timestamp_future_rejected() {
        let now = Local::now();
        assert!(!validate_timestamp(&(now + Duration::hours(1)), &now).is_valid());
        assert_eq!(
            validate_timestamp(&(now + Duration::minutes(1)), &now),
            ValidationResult::Valid
        );
    }

    #[test]
    fn test_timestamp_old_warns() {
        let now = Local::now();
        let old = now - Duration::days(45);
        assert!(matches!(validate_timestamp(&old, &now), ValidationResult::Warning(_)));
        assert_eq!(
            validate_timestamp(&(now - Duration::days(2)), &now),
            ValidationResult::Valid
        );
    }

    #[test]
    fn test_meal_name() {
        assert_eq!(validate_meal_name("Oatmeal"), ValidationResult::Valid);
        assert!(!validate_meal_name("   ").is_valid());
        assert!(!validate_meal_name(&"x".repeat(101)).is_valid());
    }

    #[test]
    fn test_nutrition_prefers_invalid_over_warning() {
        let result = validate_nutrition(3_500.0, -1.0, 10.0, 10.0);
        assert!(matches!(result, ValidationResult::Invalid(_)));
        let result = validate_nutrition(3_500.0, 10.0, 10.0, 10.0);
        assert!(matches!(result, ValidationResult::Warning(_)));
        assert_eq!(validate_nutrition(500.0, 20.0, 60.0, 15.0), ValidationResult::Valid);
    }

    #[test]
    fn test_into_result() {
        assert_eq!(ValidationResult::Valid.into_result().unwrap(), None);
        assert_eq!(
            ValidationResult::Warning("hmm".to_string()).into_result().unwrap(),
            Some("hmm".to_string())
        );
        let err = ValidationResult::Invalid("nope".to_string())
            .into_result()
            .unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }
}

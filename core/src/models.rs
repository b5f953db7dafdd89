use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::health::{DerivedMetrics, HealthProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub const ALL: [MealType; 4] = [
        MealType::Breakfast,
        MealType::Lunch,
        MealType::Dinner,
        MealType::Snack,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            _ => bail!(
                "Invalid meal type '{s}'. Must be one of: breakfast, lunch, dinner, snack"
            ),
        }
    }
}

pub fn validate_meal_type(meal: &str) -> Result<MealType> {
    meal.parse()
}

/// Local calendar day a timestamp falls on, as stored in the `date` columns.
#[must_use]
pub fn date_bucket(ts: &DateTime<Local>) -> String {
    ts.format("%Y-%m-%d").to_string()
}

// --- Meals ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meal {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub name: String,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub meal_type: MealType,
    pub logged_at: String,
    pub date: String,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewMeal {
    pub name: String,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub meal_type: MealType,
    pub logged_at: DateTime<Local>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateMeal {
    pub name: Option<String>,
    pub calories: Option<f64>,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub meal_type: Option<MealType>,
    pub logged_at: Option<DateTime<Local>>,
}

impl UpdateMeal {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.calories.is_none()
            && self.protein_g.is_none()
            && self.carbs_g.is_none()
            && self.fat_g.is_none()
            && self.meal_type.is_none()
            && self.logged_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MealGroup {
    pub meal_type: MealType,
    pub meals: Vec<Meal>,
    pub subtotal_calories: f64,
    pub subtotal_protein_g: f64,
    pub subtotal_carbs_g: f64,
    pub subtotal_fat_g: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DailyTotals {
    pub date: String,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub meal_count: i64,
}

/// Daily goals taken from the saved health profile.
#[derive(Debug, Clone, Serialize)]
pub struct NutritionTarget {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub date: String,
    pub meals: Vec<MealGroup>,
    pub total_calories: f64,
    pub total_protein_g: f64,
    pub total_carbs_g: f64,
    pub total_fat_g: f64,
    pub water_ml: f64,
    pub water_goal_ml: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<NutritionTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_calories: Option<f64>,
}

/// Longest window, in days, accepted by the history reports.
pub const MAX_HISTORY_DAYS: i64 = 3650;

/// Calorie history over a window of days, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryReport {
    pub start: String,
    pub end: String,
    /// One entry per day in the window; days without meals have zero totals.
    pub days: Vec<DailyTotals>,
    /// Mean over the days that have at least one meal.
    pub average_calories: f64,
    pub logging_streak: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_calories: Option<f64>,
}

// --- Water ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterEntry {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub amount_ml: f64,
    pub logged_at: String,
    pub date: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewWaterEntry {
    pub amount_ml: f64,
    pub logged_at: DateTime<Local>,
}

// --- Weight ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightEntry {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub weight_kg: f64,
    pub logged_at: String,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewWeightEntry {
    pub weight_kg: f64,
    pub logged_at: DateTime<Local>,
    pub note: Option<String>,
}

// --- Health metrics ---

/// The stored profile together with the values derived from it.
#[derive(Debug, Clone, Serialize)]
pub struct HealthMetrics {
    #[serde(flatten)]
    pub profile: HealthProfile,
    #[serde(flatten)]
    pub derived: DerivedMetrics,
    pub updated_at: String,
}

impl HealthMetrics {
    #[must_use]
    pub fn target(&self) -> NutritionTarget {
        NutritionTarget {
            calories: self.derived.target_calories,
            protein_g: self.derived.macros.protein_g,
            carbs_g: self.derived.macros.carbs_g,
            fat_g: self.derived.macros.fat_g,
        }
    }
}

// --- Custom foods ---

/// A user-defined food. Nutrition values are per serving.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomFood {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub name: String,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub serving_g: Option<f64>,
    pub is_favorite: bool,
    pub use_count: i64,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewCustomFood {
    pub name: String,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub serving_g: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCustomFood {
    pub name: Option<String>,
    pub calories: Option<f64>,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub serving_g: Option<Option<f64>>,
}

// --- Scan history ---

pub const SCAN_HISTORY_LIMIT: i64 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: i64,
    pub food_name: String,
    pub category: String,
    pub confidence: f64,
    pub scanned_at: String,
}

#[derive(Debug, Clone)]
pub struct NewScanRecord {
    pub food_name: String,
    pub category: String,
    pub confidence: f64,
}

// --- Export / Import ---

pub const EXPORT_VERSION: i64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSetting {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    pub version: i64,
    pub exported_at: String,
    #[serde(default)]
    pub meals: Vec<Meal>,
    #[serde(default)]
    pub water_entries: Vec<WaterEntry>,
    #[serde(default)]
    pub weight_entries: Vec<WeightEntry>,
    #[serde(default)]
    pub custom_foods: Vec<CustomFood>,
    #[serde(default)]
    pub scans: Vec<ScanRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_profile: Option<HealthProfile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub settings: Vec<ExportSetting>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[allow(clippy::struct_field_names)]
pub struct ImportSummary {
    pub meals_imported: i64,
    pub water_entries_imported: i64,
    pub weight_entries_imported: i64,
    pub custom_foods_imported: i64,
    pub scans_imported: i64,
    pub profile_imported: bool,
    /// Snapshot records dropped because they failed validation.
    #[serde(default)]
    pub records_skipped: i64,
}

//! Energy expenditure and target calculations.
//!
//! BMR uses the Mifflin-St Jeor equation; TDEE scales it by an activity
//! multiplier and the daily target applies a goal offset, never dropping
//! below [`MIN_TARGET_CALORIES`].

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Lowest daily calorie target the calculator will suggest.
pub const MIN_TARGET_CALORIES: f64 = 1200.0;

/// Share of target calories assigned to each macro.
pub const PROTEIN_SHARE: f64 = 0.30;
pub const CARBS_SHARE: f64 = 0.40;
pub const FAT_SHARE: f64 = 0.30;

pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
pub const KCAL_PER_G_CARBS: f64 = 4.0;
pub const KCAL_PER_G_FAT: f64 = 9.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Constant term of the Mifflin-St Jeor equation. `Other` uses the
    /// midpoint of the male and female constants.
    #[must_use]
    pub fn bmr_offset(self) -> f64 {
        match self {
            Gender::Male => 5.0,
            Gender::Female => -161.0,
            Gender::Other => -78.0,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "other" | "o" => Ok(Gender::Other),
            _ => bail!("Invalid gender '{s}'. Must be one of: male, female, other"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    /// Little or no exercise
    Sedentary,
    /// Light exercise 1-3 days/week
    #[default]
    LightlyActive,
    /// Moderate exercise 3-5 days/week
    ModeratelyActive,
    /// Hard exercise 6-7 days/week
    VeryActive,
    /// Very hard exercise or a physical job
    ExtraActive,
}

impl ActivityLevel {
    #[must_use]
    pub fn multiplier(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::LightlyActive => 1.375,
            ActivityLevel::ModeratelyActive => 1.55,
            ActivityLevel::VeryActive => 1.725,
            ActivityLevel::ExtraActive => 1.9,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::LightlyActive => "lightly_active",
            ActivityLevel::ModeratelyActive => "moderately_active",
            ActivityLevel::VeryActive => "very_active",
            ActivityLevel::ExtraActive => "extra_active",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "Little or no exercise",
            ActivityLevel::LightlyActive => "Light exercise 1-3 days/week",
            ActivityLevel::ModeratelyActive => "Moderate exercise 3-5 days/week",
            ActivityLevel::VeryActive => "Hard exercise 6-7 days/week",
            ActivityLevel::ExtraActive => "Very hard exercise or physical job",
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "sedentary" => Ok(ActivityLevel::Sedentary),
            "lightly_active" | "light" => Ok(ActivityLevel::LightlyActive),
            "moderately_active" | "moderate" => Ok(ActivityLevel::ModeratelyActive),
            "very_active" | "very" => Ok(ActivityLevel::VeryActive),
            "extra_active" | "extra" => Ok(ActivityLevel::ExtraActive),
            _ => bail!(
                "Invalid activity level '{s}'. Must be one of: sedentary, lightly_active, moderately_active, very_active, extra_active"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FitnessGoal {
    LoseWeight,
    #[default]
    Maintain,
    GainWeight,
}

impl FitnessGoal {
    /// Daily calorie adjustment applied to TDEE.
    #[must_use]
    pub fn calorie_offset(self) -> f64 {
        match self {
            FitnessGoal::LoseWeight => -500.0,
            FitnessGoal::Maintain => 0.0,
            FitnessGoal::GainWeight => 500.0,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FitnessGoal::LoseWeight => "lose_weight",
            FitnessGoal::Maintain => "maintain",
            FitnessGoal::GainWeight => "gain_weight",
        }
    }
}

impl fmt::Display for FitnessGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitnessGoal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "lose_weight" | "lose" => Ok(FitnessGoal::LoseWeight),
            "maintain" | "maintain_weight" => Ok(FitnessGoal::Maintain),
            "gain_weight" | "gain" => Ok(FitnessGoal::GainWeight),
            _ => bail!(
                "Invalid fitness goal '{s}'. Must be one of: lose_weight, maintain, gain_weight"
            ),
        }
    }
}

/// Body measurements and preferences the calculations start from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthProfile {
    pub weight_kg: f64,
    pub height_cm: f64,
    pub age: i64,
    pub gender: Gender,
    pub activity_level: ActivityLevel,
    pub fitness_goal: FitnessGoal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroTargets {
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    pub bmr: f64,
    pub tdee: f64,
    pub target_calories: f64,
    pub bmi: f64,
    pub bmi_category: BmiCategory,
    pub macros: MacroTargets,
}

impl HealthProfile {
    #[must_use]
    pub fn compute(&self) -> DerivedMetrics {
        let bmr = calculate_bmr(self.weight_kg, self.height_cm, self.age, self.gender);
        let tdee = calculate_tdee(bmr, self.activity_level);
        let target_calories = calculate_target_calories(tdee, self.fitness_goal);
        let bmi = calculate_bmi(self.weight_kg, self.height_cm);
        DerivedMetrics {
            bmr,
            tdee,
            target_calories,
            bmi,
            bmi_category: classify_bmi(bmi),
            macros: calculate_macro_targets(target_calories),
        }
    }
}

/// Mifflin-St Jeor: `10 * kg + 6.25 * cm - 5 * age + s`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_bmr(weight_kg: f64, height_cm: f64, age: i64, gender: Gender) -> f64 {
    10.0 * weight_kg + 6.25 * height_cm - 5.0 * age as f64 + gender.bmr_offset()
}

#[must_use]
pub fn calculate_tdee(bmr: f64, activity: ActivityLevel) -> f64 {
    bmr * activity.multiplier()
}

#[must_use]
pub fn calculate_target_calories(tdee: f64, goal: FitnessGoal) -> f64 {
    (tdee + goal.calorie_offset()).max(MIN_TARGET_CALORIES)
}

#[must_use]
pub fn calculate_macro_targets(target_calories: f64) -> MacroTargets {
    MacroTargets {
        protein_g: target_calories * PROTEIN_SHARE / KCAL_PER_G_PROTEIN,
        carbs_g: target_calories * CARBS_SHARE / KCAL_PER_G_CARBS,
        fat_g: target_calories * FAT_SHARE / KCAL_PER_G_FAT,
    }
}

// --- BMI ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::Normal => "Normal",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::Obese => "Obese",
        }
    }
}

/// `kg / m^2`
#[must_use]
pub fn calculate_bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    weight_kg / (height_m * height_m)
}

#[must_use]
pub fn classify_bmi(bmi: f64) -> BmiCategory {
    if bmi < 18.5 {
        BmiCategory::Underweight
    } else if bmi < 25.0 {
        BmiCategory::Normal
    } else if bmi < 30.0 {
        BmiCategory::Overweight
    } else {
        BmiCategory::Obese
    }
}

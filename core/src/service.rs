use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone};

use crate::analyzer::{DetectedObject, FoodAnalyzer, FoodSuggestion, ObjectClassifier};
use crate::db::Database;
use crate::health::HealthProfile;
use crate::mfp_import::{self, MfpImportSummary};
use crate::models::{
    CustomFood, DailySummary, DailyTotals, ExportData, HealthMetrics, HistoryReport,
    ImportSummary, MAX_HISTORY_DAYS, Meal, MealGroup, MealType, NewCustomFood, NewMeal,
    NewScanRecord, NewWaterEntry, NewWeightEntry, ScanRecord, UpdateCustomFood, UpdateMeal,
    WaterEntry, WeightEntry,
};
use crate::nutrition::FoodNutritionDatabase;
use crate::validation::{
    ValidationResult, validate_age, validate_calories, validate_height, validate_macro,
    validate_meal_name, validate_nutrition, validate_timestamp, validate_water, validate_weight,
};

pub const DEFAULT_WATER_GOAL_ML: f64 = 2000.0;
pub const WATER_GOAL_KEY: &str = "water_goal_ml";
const MAX_WATER_GOAL_ML: f64 = 10_000.0;

/// Log a failed repository call before handing the error back.
fn logged<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    if let Err(ref e) = result {
        let message = format!("{e:#}");
        tracing::error!(operation, error = %message, "repository operation failed");
    }
    result
}

/// Reject `Invalid`, log `Warning` and carry on.
fn check(field: &'static str, result: ValidationResult) -> Result<()> {
    if let Some(warning) = result.into_result()? {
        tracing::warn!(field, "{warning}");
    }
    Ok(())
}

fn group_meals(meals: &[Meal]) -> Vec<MealGroup> {
    MealType::ALL
        .into_iter()
        .filter_map(|meal_type| {
            let meals: Vec<Meal> = meals
                .iter()
                .filter(|m| m.meal_type == meal_type)
                .cloned()
                .collect();
            if meals.is_empty() {
                return None;
            }
            Some(MealGroup {
                meal_type,
                subtotal_calories: meals.iter().map(|m| m.calories).sum(),
                subtotal_protein_g: meals.iter().map(|m| m.protein_g).sum(),
                subtotal_carbs_g: meals.iter().map(|m| m.carbs_g).sum(),
                subtotal_fat_g: meals.iter().map(|m| m.fat_g).sum(),
                meals,
            })
        })
        .collect()
}

fn positive(label: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        bail!("{label} must be greater than 0");
    }
    Ok(())
}

fn history_window(days: i64) -> Result<i64> {
    if !(1..=MAX_HISTORY_DAYS).contains(&days) {
        bail!("Days must be between 1 and {MAX_HISTORY_DAYS}");
    }
    Ok(days)
}

fn stored_timestamp(field: &str, value: &str) -> Result<()> {
    DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("{field} {value:?} is not an RFC 3339 timestamp"))?;
    Ok(())
}

fn stored_date(value: &str) -> Result<()> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("date {value:?} is not YYYY-MM-DD"))?;
    Ok(())
}

fn check_imported_meal(meal: &Meal) -> Result<()> {
    check("name", validate_meal_name(&meal.name))?;
    check(
        "nutrition",
        validate_nutrition(meal.calories, meal.protein_g, meal.carbs_g, meal.fat_g),
    )?;
    stored_timestamp("logged_at", &meal.logged_at)?;
    stored_date(&meal.date)
}

fn check_imported_water(entry: &WaterEntry) -> Result<()> {
    check("amount_ml", validate_water(entry.amount_ml))?;
    stored_timestamp("logged_at", &entry.logged_at)?;
    stored_date(&entry.date)
}

fn check_imported_weight(entry: &WeightEntry) -> Result<()> {
    check("weight_kg", validate_weight(entry.weight_kg))?;
    stored_timestamp("logged_at", &entry.logged_at)?;
    stored_date(&entry.date)
}

fn check_imported_food(food: &CustomFood) -> Result<()> {
    check("name", validate_meal_name(&food.name))?;
    check(
        "nutrition",
        validate_nutrition(food.calories, food.protein_g, food.carbs_g, food.fat_g),
    )?;
    if let Some(serving_g) = food.serving_g {
        positive("Serving size", serving_g)?;
    }
    Ok(())
}

fn check_imported_scan(scan: &ScanRecord) -> Result<()> {
    check("food_name", validate_meal_name(&scan.food_name))?;
    if !(0.0..=1.0).contains(&scan.confidence) {
        bail!("confidence {} is outside 0..=1", scan.confidence);
    }
    stored_timestamp("scanned_at", &scan.scanned_at)
}

fn check_profile(profile: &HealthProfile) -> Result<()> {
    check("weight_kg", validate_weight(profile.weight_kg))?;
    check("height_cm", validate_height(profile.height_cm))?;
    check("age", validate_age(profile.age))
}

/// Keep the snapshot records that pass `validate`; the rest are logged and
/// counted in `skipped`.
fn importable<T: Clone>(
    kind: &'static str,
    records: &[T],
    validate: fn(&T) -> Result<()>,
    skipped: &mut i64,
) -> Vec<T> {
    records
        .iter()
        .filter(|record| match validate(record) {
            Ok(()) => true,
            Err(e) => {
                let message = format!("{e:#}");
                tracing::warn!(kind, error = %message, "skipping invalid import record");
                *skipped += 1;
                false
            }
        })
        .cloned()
        .collect()
}

pub struct CaltrackService {
    db: Database,
    foods: FoodNutritionDatabase,
    analyzer: FoodAnalyzer,
}

impl CaltrackService {
    pub fn new(db_path: &Path) -> Result<Self> {
        Ok(Self::from_database(Database::open(db_path)?))
    }

    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    #[must_use]
    pub fn from_database(db: Database) -> Self {
        Self {
            db,
            foods: FoodNutritionDatabase::builtin(),
            analyzer: FoodAnalyzer::new(),
        }
    }

    #[must_use]
    pub fn with_analyzer(mut self, analyzer: FoodAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    #[must_use]
    pub fn foods(&self) -> &FoodNutritionDatabase {
        &self.foods
    }

    // --- Meals ---

    pub fn log_meal(&self, meal: &NewMeal) -> Result<Meal> {
        check("name", validate_meal_name(&meal.name))?;
        check(
            "nutrition",
            validate_nutrition(meal.calories, meal.protein_g, meal.carbs_g, meal.fat_g),
        )?;
        check("logged_at", validate_timestamp(&meal.logged_at, &Local::now()))?;
        logged("insert_meal", self.db.insert_meal(meal))
    }

    pub fn get_meal(&self, id: i64) -> Result<Meal> {
        logged("get_meal", self.db.get_meal(id))
    }

    pub fn update_meal(&self, id: i64, update: &UpdateMeal) -> Result<Meal> {
        if update.is_empty() {
            bail!("Nothing to update");
        }
        if let Some(ref name) = update.name {
            check("name", validate_meal_name(name))?;
        }
        if let Some(calories) = update.calories {
            check("calories", validate_calories(calories))?;
        }
        for (label, value) in [
            ("Protein", update.protein_g),
            ("Carbs", update.carbs_g),
            ("Fat", update.fat_g),
        ] {
            if let Some(grams) = value {
                check("macros", validate_macro(label, grams))?;
            }
        }
        if let Some(ref logged_at) = update.logged_at {
            check("logged_at", validate_timestamp(logged_at, &Local::now()))?;
        }
        logged("update_meal", self.db.update_meal(id, update))
    }

    pub fn delete_meal(&self, id: i64) -> Result<bool> {
        logged("delete_meal", self.db.delete_meal(id))
    }

    pub fn meals_for_date(&self, date: NaiveDate) -> Result<Vec<Meal>> {
        logged("get_meals_for_date", self.db.get_meals_for_date(date))
    }

    pub fn meals_for_date_and_type(
        &self,
        date: NaiveDate,
        meal_type: MealType,
    ) -> Result<Vec<Meal>> {
        logged(
            "get_meals_for_date_and_type",
            self.db.get_meals_for_date_and_type(date, meal_type),
        )
    }

    /// Like [`Self::meals_for_date`], but a failed read yields no meals.
    #[must_use]
    pub fn meals_for_date_or_empty(&self, date: NaiveDate) -> Vec<Meal> {
        self.meals_for_date(date).unwrap_or_default()
    }

    /// Re-log meals from one day on another, keeping each meal's time of day.
    pub fn copy_meals(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        meal_type: Option<MealType>,
    ) -> Result<Vec<Meal>> {
        let source = match meal_type {
            Some(mt) => self.meals_for_date_and_type(from, mt)?,
            None => self.meals_for_date(from)?,
        };
        let mut copied = Vec::with_capacity(source.len());
        for meal in source {
            let original = DateTime::parse_from_rfc3339(&meal.logged_at)
                .with_context(|| format!("Invalid timestamp on meal {}", meal.id))?
                .with_timezone(&Local);
            let logged_at = Local
                .from_local_datetime(&to.and_time(original.time()))
                .earliest()
                .with_context(|| format!("No local time for {to}"))?;
            copied.push(self.log_meal(&NewMeal {
                name: meal.name,
                calories: meal.calories,
                protein_g: meal.protein_g,
                carbs_g: meal.carbs_g,
                fat_g: meal.fat_g,
                meal_type: meal.meal_type,
                logged_at,
            })?);
        }
        Ok(copied)
    }

    /// Log `servings` of a saved custom food and bump its use count.
    pub fn log_custom_food(
        &self,
        name: &str,
        servings: f64,
        meal_type: MealType,
        logged_at: DateTime<Local>,
    ) -> Result<Meal> {
        positive("Servings", servings)?;
        let food = logged("get_custom_food_by_name", self.db.get_custom_food_by_name(name))?
            .with_context(|| format!("No custom food named '{}'", name.trim()))?;
        let meal = self.log_meal(&NewMeal {
            name: food.name.clone(),
            calories: food.calories * servings,
            protein_g: food.protein_g * servings,
            carbs_g: food.carbs_g * servings,
            fat_g: food.fat_g * servings,
            meal_type,
            logged_at,
        })?;
        logged("increment_use_count", self.db.increment_use_count(food.id))?;
        Ok(meal)
    }

    /// Log a food from the built-in table. `grams` defaults to its typical serving.
    pub fn log_nutrition_food(
        &self,
        name: &str,
        grams: Option<f64>,
        meal_type: MealType,
        logged_at: DateTime<Local>,
    ) -> Result<Meal> {
        let info = self
            .foods
            .lookup(name)
            .with_context(|| format!("'{}' is not in the nutrition table", name.trim()))?;
        let grams = grams.unwrap_or(info.serving_g);
        positive("Amount", grams)?;
        let serving = info.for_serving(grams);
        self.log_meal(&NewMeal {
            name: info.name.to_string(),
            calories: serving.calories,
            protein_g: serving.protein_g,
            carbs_g: serving.carbs_g,
            fat_g: serving.fat_g,
            meal_type,
            logged_at,
        })
    }

    // --- Summaries ---

    pub fn daily_summary(&self, date: NaiveDate) -> Result<DailySummary> {
        let meals = self.meals_for_date(date)?;
        let groups = group_meals(&meals);

        let total_calories: f64 = groups.iter().map(|g| g.subtotal_calories).sum();
        let total_protein_g: f64 = groups.iter().map(|g| g.subtotal_protein_g).sum();
        let total_carbs_g: f64 = groups.iter().map(|g| g.subtotal_carbs_g).sum();
        let total_fat_g: f64 = groups.iter().map(|g| g.subtotal_fat_g).sum();

        let target = self.get_profile()?.map(|m| m.target());
        let remaining_calories = target.as_ref().map(|t| t.calories - total_calories);

        Ok(DailySummary {
            date: date.format("%Y-%m-%d").to_string(),
            meals: groups,
            total_calories,
            total_protein_g,
            total_carbs_g,
            total_fat_g,
            water_ml: self.water_total(date)?,
            water_goal_ml: self.water_goal()?,
            target,
            remaining_calories,
        })
    }

    pub fn history(&self, today: NaiveDate, days: i64) -> Result<HistoryReport> {
        let days = history_window(days)?;
        let start = today - Duration::days(days - 1);
        let logged_days = logged(
            "get_daily_totals_between",
            self.db.get_daily_totals_between(start, today),
        )?;

        let mut filled = Vec::new();
        for offset in 0..days {
            let date = (start + Duration::days(offset)).format("%Y-%m-%d").to_string();
            let totals = logged_days
                .iter()
                .find(|t| t.date == date)
                .cloned()
                .unwrap_or(DailyTotals {
                    date,
                    ..DailyTotals::default()
                });
            filled.push(totals);
        }

        Ok(HistoryReport {
            start: start.format("%Y-%m-%d").to_string(),
            end: today.format("%Y-%m-%d").to_string(),
            days: filled,
            average_calories: logged(
                "get_calorie_average",
                self.db.get_calorie_average(today, days),
            )?,
            logging_streak: logged("get_logging_streak", self.db.get_logging_streak(today))?,
            target_calories: self.get_profile()?.map(|m| m.derived.target_calories),
        })
    }

    pub fn logging_streak(&self, today: NaiveDate) -> Result<i64> {
        logged("get_logging_streak", self.db.get_logging_streak(today))
    }

    // --- Water ---

    pub fn log_water(&self, entry: &NewWaterEntry) -> Result<WaterEntry> {
        check("amount_ml", validate_water(entry.amount_ml))?;
        check("logged_at", validate_timestamp(&entry.logged_at, &Local::now()))?;
        logged("insert_water", self.db.insert_water(entry))
    }

    pub fn delete_water(&self, id: i64) -> Result<bool> {
        logged("delete_water", self.db.delete_water(id))
    }

    pub fn water_for_date(&self, date: NaiveDate) -> Result<Vec<WaterEntry>> {
        logged("get_water_for_date", self.db.get_water_for_date(date))
    }

    #[must_use]
    pub fn water_for_date_or_empty(&self, date: NaiveDate) -> Vec<WaterEntry> {
        self.water_for_date(date).unwrap_or_default()
    }

    pub fn water_total(&self, date: NaiveDate) -> Result<f64> {
        logged("get_water_total", self.db.get_water_total(date))
    }

    /// Daily goal in ml; falls back to [`DEFAULT_WATER_GOAL_ML`].
    pub fn water_goal(&self) -> Result<f64> {
        let Some(raw) = logged("get_setting", self.db.get_setting(WATER_GOAL_KEY))? else {
            return Ok(DEFAULT_WATER_GOAL_ML);
        };
        match raw.parse::<f64>() {
            Ok(ml) if ml.is_finite() && ml > 0.0 => Ok(ml),
            _ => {
                tracing::warn!(value = %raw, "ignoring invalid water goal setting");
                Ok(DEFAULT_WATER_GOAL_ML)
            }
        }
    }

    pub fn set_water_goal(&self, ml: f64) -> Result<()> {
        positive("Water goal", ml)?;
        if ml > MAX_WATER_GOAL_ML {
            bail!("Water goal must be at most {MAX_WATER_GOAL_ML} ml");
        }
        logged(
            "set_setting",
            self.db.set_setting(WATER_GOAL_KEY, &ml.to_string()),
        )
    }

    // --- Weight ---

    /// Record a weigh-in. When it is the newest entry and a profile exists,
    /// the profile weight and derived targets follow it.
    pub fn log_weight(&self, entry: &NewWeightEntry) -> Result<WeightEntry> {
        check("weight_kg", validate_weight(entry.weight_kg))?;
        check("logged_at", validate_timestamp(&entry.logged_at, &Local::now()))?;
        let saved = logged("insert_weight", self.db.insert_weight(entry))?;

        if let Some(metrics) = self.get_profile()? {
            let latest = logged("get_latest_weight", self.db.get_latest_weight())?;
            if latest.is_some_and(|w| w.id == saved.id) {
                let profile = HealthProfile {
                    weight_kg: saved.weight_kg,
                    ..metrics.profile
                };
                self.save_profile(&profile)?;
                tracing::debug!(weight_kg = saved.weight_kg, "profile weight updated");
            }
        }
        Ok(saved)
    }

    pub fn weight_history(&self, days: Option<i64>) -> Result<Vec<WeightEntry>> {
        let days = days.map(history_window).transpose()?;
        logged("get_weight_history", self.db.get_weight_history(days))
    }

    #[must_use]
    pub fn weight_history_or_empty(&self, days: Option<i64>) -> Vec<WeightEntry> {
        self.weight_history(days).unwrap_or_default()
    }

    pub fn delete_weight(&self, id: i64) -> Result<()> {
        logged("delete_weight", self.db.delete_weight(id))
    }

    // --- Profile ---

    pub fn save_profile(&self, profile: &HealthProfile) -> Result<HealthMetrics> {
        check_profile(profile)?;
        logged("save_health_metrics", self.db.save_health_metrics(profile))
    }

    pub fn get_profile(&self) -> Result<Option<HealthMetrics>> {
        logged("get_health_metrics", self.db.get_health_metrics())
    }

    pub fn clear_profile(&self) -> Result<bool> {
        logged("clear_health_metrics", self.db.clear_health_metrics())
    }

    // --- Custom foods ---

    pub fn add_custom_food(&self, food: &NewCustomFood) -> Result<CustomFood> {
        check("name", validate_meal_name(&food.name))?;
        check(
            "nutrition",
            validate_nutrition(food.calories, food.protein_g, food.carbs_g, food.fat_g),
        )?;
        if let Some(serving_g) = food.serving_g {
            positive("Serving size", serving_g)?;
        }
        logged("insert_custom_food", self.db.insert_custom_food(food))
    }

    pub fn update_custom_food(&self, id: i64, update: &UpdateCustomFood) -> Result<CustomFood> {
        if let Some(ref name) = update.name {
            check("name", validate_meal_name(name))?;
        }
        if let Some(calories) = update.calories {
            check("calories", validate_calories(calories))?;
        }
        for (label, value) in [
            ("Protein", update.protein_g),
            ("Carbs", update.carbs_g),
            ("Fat", update.fat_g),
        ] {
            if let Some(grams) = value {
                check("macros", validate_macro(label, grams))?;
            }
        }
        if let Some(Some(serving_g)) = update.serving_g {
            positive("Serving size", serving_g)?;
        }
        logged("update_custom_food", self.db.update_custom_food(id, update))
    }

    pub fn list_custom_foods(&self) -> Result<Vec<CustomFood>> {
        logged("list_custom_foods", self.db.list_custom_foods())
    }

    pub fn search_custom_foods(&self, query: &str) -> Result<Vec<CustomFood>> {
        logged("search_custom_foods", self.db.search_custom_foods(query))
    }

    pub fn favorite_foods(&self) -> Result<Vec<CustomFood>> {
        logged("get_favorite_foods", self.db.get_favorite_foods())
    }

    pub fn find_custom_food(&self, name: &str) -> Result<Option<CustomFood>> {
        logged("get_custom_food_by_name", self.db.get_custom_food_by_name(name))
    }

    pub fn toggle_favorite(&self, id: i64) -> Result<CustomFood> {
        logged("toggle_favorite", self.db.toggle_favorite(id))
    }

    pub fn set_favorite(&self, id: i64, favorite: bool) -> Result<CustomFood> {
        logged("set_favorite", self.db.set_favorite(id, favorite))
    }

    pub fn delete_custom_food(&self, id: i64) -> Result<bool> {
        logged("delete_custom_food", self.db.delete_custom_food(id))
    }

    // --- Scanning ---

    /// Run the analyzer over detections and record the best suggestion.
    pub fn analyze_labels(&self, objects: &[DetectedObject]) -> Result<Vec<FoodSuggestion>> {
        let suggestions = self.analyzer.analyze(objects);
        self.record_top_suggestion(&suggestions)?;
        Ok(suggestions)
    }

    /// Classify an image and record the best suggestion.
    pub fn analyze_and_record(
        &self,
        classifier: &dyn ObjectClassifier,
        image: &[u8],
    ) -> Result<Vec<FoodSuggestion>> {
        let suggestions = self
            .analyzer
            .analyze_image(classifier, image)
            .inspect_err(|e| {
                let message = format!("{e:#}");
                tracing::error!(error = %message, "object classification failed");
            })?;
        self.record_top_suggestion(&suggestions)?;
        Ok(suggestions)
    }

    fn record_top_suggestion(&self, suggestions: &[FoodSuggestion]) -> Result<()> {
        if let Some(top) = suggestions.first() {
            logged(
                "insert_scan",
                self.db.insert_scan(&NewScanRecord {
                    food_name: top.name.clone(),
                    category: top.category.clone(),
                    confidence: top.confidence,
                }),
            )?;
        }
        Ok(())
    }

    pub fn recent_scans(&self, limit: i64) -> Result<Vec<ScanRecord>> {
        logged("get_recent_scans", self.db.get_recent_scans(limit))
    }

    #[must_use]
    pub fn recent_scans_or_empty(&self, limit: i64) -> Vec<ScanRecord> {
        self.recent_scans(limit).unwrap_or_default()
    }

    pub fn clear_scan_history(&self) -> Result<usize> {
        logged("clear_scan_history", self.db.clear_scan_history())
    }

    // --- MFP import ---

    pub fn import_mfp_csv(&self, csv_data: &str, dry_run: bool) -> Result<MfpImportSummary> {
        let rows = mfp_import::parse_mfp_csv(csv_data.as_bytes())?;
        logged(
            "import_mfp_meals",
            mfp_import::import_mfp_meals(&self.db, &rows, dry_run),
        )
    }

    // --- Export / Import ---

    pub fn export_all(&self) -> Result<ExportData> {
        logged("export_all", self.db.export_all())
    }

    /// Restore a snapshot. Records that fail validation are skipped, not
    /// stored, and reported in `records_skipped`.
    pub fn import_all(&self, data: &ExportData) -> Result<ImportSummary> {
        let mut skipped = 0;
        let health_profile = match data.health_profile {
            Some(ref profile) => match check_profile(profile) {
                Ok(()) => Some(profile.clone()),
                Err(e) => {
                    let message = format!("{e:#}");
                    tracing::warn!(error = %message, "skipping invalid imported profile");
                    skipped += 1;
                    None
                }
            },
            None => None,
        };
        let cleaned = ExportData {
            version: data.version,
            exported_at: data.exported_at.clone(),
            meals: importable("meal", &data.meals, check_imported_meal, &mut skipped),
            water_entries: importable(
                "water",
                &data.water_entries,
                check_imported_water,
                &mut skipped,
            ),
            weight_entries: importable(
                "weight",
                &data.weight_entries,
                check_imported_weight,
                &mut skipped,
            ),
            custom_foods: importable(
                "custom_food",
                &data.custom_foods,
                check_imported_food,
                &mut skipped,
            ),
            scans: importable("scan", &data.scans, check_imported_scan, &mut skipped),
            health_profile,
            settings: data.settings.clone(),
        };

        let mut summary = logged("import_all", self.db.import_all(&cleaned))?;
        summary.records_skipped = skipped;
        Ok(summary)
    }

    pub fn write_meals_csv<W: Write>(&self, writer: W) -> Result<usize> {
        logged("write_meals_csv", self.db.write_meals_csv(writer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::LabelClassifier;
    use crate::health::{ActivityLevel, FitnessGoal, Gender};
    use crate::models::EXPORT_VERSION;

    struct FailingClassifier;

    impl ObjectClassifier for FailingClassifier {
        fn classify(&self, _image: &[u8]) -> Result<Vec<DetectedObject>> {
            bail!("camera unavailable")
        }
    }

    fn meal(name: &str, calories: f64, meal_type: MealType) -> NewMeal {
        NewMeal {
            name: name.to_string(),
            calories,
            protein_g: 20.0,
            carbs_g: 40.0,
            fat_g: 10.0,
            meal_type,
            logged_at: Local::now(),
        }
    }

    fn profile() -> HealthProfile {
        HealthProfile {
            weight_kg: 80.0,
            height_cm: 180.0,
            age: 30,
            gender: Gender::Male,
            activity_level: ActivityLevel::Sedentary,
            fitness_goal: FitnessGoal::LoseWeight,
        }
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    fn obj(label: &str, confidence: f64) -> DetectedObject {
        DetectedObject {
            label: label.to_string(),
            confidence,
        }
    }

    #[test]
    fn test_log_meal_rejects_invalid_input() {
        let svc = CaltrackService::new_in_memory().unwrap();
        assert!(svc.log_meal(&meal("Soup", -10.0, MealType::Lunch)).is_err());
        assert!(svc.log_meal(&meal("   ", 100.0, MealType::Lunch)).is_err());
        let future = NewMeal {
            logged_at: Local::now() + Duration::hours(2),
            ..meal("Soup", 100.0, MealType::Lunch)
        };
        let err = svc.log_meal(&future).unwrap_err();
        assert!(err.to_string().contains("future"));
        assert!(svc.meals_for_date(today()).unwrap().is_empty());
    }

    #[test]
    fn test_log_meal_accepts_warning() {
        let svc = CaltrackService::new_in_memory().unwrap();
        let logged = svc
            .log_meal(&meal("Feast", 4_000.0, MealType::Dinner))
            .unwrap();
        assert!((logged.calories - 4_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_update_meal_requires_changes() {
        let svc = CaltrackService::new_in_memory().unwrap();
        let logged = svc.log_meal(&meal("Rice", 200.0, MealType::Lunch)).unwrap();
        assert!(svc.update_meal(logged.id, &UpdateMeal::default()).is_err());
        let bad = UpdateMeal {
            fat_g: Some(-1.0),
            ..UpdateMeal::default()
        };
        assert!(svc.update_meal(logged.id, &bad).is_err());
        let good = UpdateMeal {
            name: Some("Fried Rice".to_string()),
            ..UpdateMeal::default()
        };
        assert_eq!(svc.update_meal(logged.id, &good).unwrap().name, "Fried Rice");
    }

    #[test]
    fn test_daily_summary_groups_and_targets() {
        let svc = CaltrackService::new_in_memory().unwrap();
        svc.log_meal(&meal("Eggs", 300.0, MealType::Breakfast)).unwrap();
        svc.log_meal(&meal("Burger", 700.0, MealType::Lunch)).unwrap();
        svc.log_meal(&meal("Fries", 400.0, MealType::Lunch)).unwrap();
        svc.log_water(&NewWaterEntry {
            amount_ml: 750.0,
            logged_at: Local::now(),
        })
        .unwrap();

        let summary = svc.daily_summary(today()).unwrap();
        assert_eq!(summary.meals.len(), 2);
        assert_eq!(summary.meals[0].meal_type, MealType::Breakfast);
        assert_eq!(summary.meals[1].meals.len(), 2);
        assert!((summary.meals[1].subtotal_calories - 1100.0).abs() < f64::EPSILON);
        assert!((summary.total_calories - 1400.0).abs() < f64::EPSILON);
        assert!((summary.total_protein_g - 60.0).abs() < f64::EPSILON);
        assert!((summary.water_ml - 750.0).abs() < f64::EPSILON);
        assert!((summary.water_goal_ml - DEFAULT_WATER_GOAL_ML).abs() < f64::EPSILON);
        assert!(summary.target.is_none());
        assert!(summary.remaining_calories.is_none());

        svc.save_profile(&profile()).unwrap();
        let summary = svc.daily_summary(today()).unwrap();
        let target = summary.target.unwrap();
        assert!((target.calories - 1636.0).abs() < 1e-6);
        assert!((summary.remaining_calories.unwrap() - 236.0).abs() < 1e-6);
    }

    #[test]
    fn test_history_fills_missing_days() {
        let svc = CaltrackService::new_in_memory().unwrap();
        svc.log_meal(&meal("Lunch", 600.0, MealType::Lunch)).unwrap();
        svc.log_meal(&NewMeal {
            logged_at: Local::now() - Duration::days(2),
            ..meal("Old lunch", 1000.0, MealType::Lunch)
        })
        .unwrap();

        let report = svc.history(today(), 7).unwrap();
        assert_eq!(report.days.len(), 7);
        assert_eq!(report.days[6].date, today().format("%Y-%m-%d").to_string());
        assert!((report.days[6].calories - 600.0).abs() < f64::EPSILON);
        assert_eq!(report.days[5].meal_count, 0);
        assert!((report.average_calories - 800.0).abs() < f64::EPSILON);
        assert_eq!(report.logging_streak, 1);
        assert!(report.target_calories.is_none());
    }

    #[test]
    fn test_history_window_bounds() {
        let svc = CaltrackService::new_in_memory().unwrap();
        assert!(svc.history(today(), 200_000_000).is_err());
        assert!(svc.history(today(), 0).is_err());
        let longest = svc.history(today(), MAX_HISTORY_DAYS).unwrap();
        assert_eq!(longest.days.len(), 3650);

        assert!(svc.weight_history(Some(MAX_HISTORY_DAYS + 1)).is_err());
        assert!(svc.weight_history(Some(MAX_HISTORY_DAYS)).unwrap().is_empty());
    }

    #[test]
    fn test_log_custom_food_scales_and_counts() {
        let svc = CaltrackService::new_in_memory().unwrap();
        let food = svc
            .add_custom_food(&NewCustomFood {
                name: "Protein Shake".to_string(),
                calories: 200.0,
                protein_g: 30.0,
                carbs_g: 10.0,
                fat_g: 4.0,
                serving_g: Some(350.0),
            })
            .unwrap();

        let logged = svc
            .log_custom_food("protein shake", 1.5, MealType::Snack, Local::now())
            .unwrap();
        assert_eq!(logged.name, "Protein Shake");
        assert!((logged.calories - 300.0).abs() < f64::EPSILON);
        assert!((logged.protein_g - 45.0).abs() < f64::EPSILON);

        let reloaded = svc.find_custom_food("Protein Shake").unwrap().unwrap();
        assert_eq!(reloaded.id, food.id);
        assert_eq!(reloaded.use_count, 1);

        assert!(svc
            .log_custom_food("protein shake", 0.0, MealType::Snack, Local::now())
            .is_err());
        assert!(svc
            .log_custom_food("unknown", 1.0, MealType::Snack, Local::now())
            .is_err());
    }

    #[test]
    fn test_add_custom_food_validates() {
        let svc = CaltrackService::new_in_memory().unwrap();
        let bad = NewCustomFood {
            name: "Bad".to_string(),
            calories: 100.0,
            protein_g: -2.0,
            carbs_g: 0.0,
            fat_g: 0.0,
            serving_g: None,
        };
        assert!(svc.add_custom_food(&bad).is_err());
        assert!(svc.list_custom_foods().unwrap().is_empty());
    }

    #[test]
    fn test_update_custom_food_validates() {
        let svc = CaltrackService::new_in_memory().unwrap();
        let food = svc
            .add_custom_food(&NewCustomFood {
                name: "Granola".to_string(),
                calories: 220.0,
                protein_g: 5.0,
                carbs_g: 30.0,
                fat_g: 9.0,
                serving_g: Some(50.0),
            })
            .unwrap();
        let bad = UpdateCustomFood {
            calories: Some(-5.0),
            ..UpdateCustomFood::default()
        };
        assert!(svc.update_custom_food(food.id, &bad).is_err());

        let negative_protein = UpdateCustomFood {
            protein_g: Some(-50.0),
            ..UpdateCustomFood::default()
        };
        assert!(svc.update_custom_food(food.id, &negative_protein).is_err());
        let negative_serving = UpdateCustomFood {
            serving_g: Some(Some(-3.0)),
            ..UpdateCustomFood::default()
        };
        assert!(svc.update_custom_food(food.id, &negative_serving).is_err());
        let stored = svc.find_custom_food("Granola").unwrap().unwrap();
        assert!((stored.protein_g - 5.0).abs() < f64::EPSILON);
        assert_eq!(stored.serving_g, Some(50.0));

        let good = UpdateCustomFood {
            name: Some("Honey Granola".to_string()),
            ..UpdateCustomFood::default()
        };
        assert_eq!(svc.update_custom_food(food.id, &good).unwrap().name, "Honey Granola");
        assert!(svc.toggle_favorite(food.id).unwrap().is_favorite);
        assert_eq!(svc.favorite_foods().unwrap().len(), 1);
        assert!(svc.delete_custom_food(food.id).unwrap());
    }

    #[test]
    fn test_log_nutrition_food() {
        let svc = CaltrackService::new_in_memory().unwrap();
        let logged = svc
            .log_nutrition_food("white rice", Some(200.0), MealType::Dinner, Local::now())
            .unwrap();
        assert_eq!(logged.name, "White Rice");
        assert!((logged.calories - 260.0).abs() < 1e-9);

        let default_serving = svc
            .log_nutrition_food("egg", None, MealType::Breakfast, Local::now())
            .unwrap();
        assert!((default_serving.calories - 77.5).abs() < 1e-9);

        assert!(svc
            .log_nutrition_food("unobtainium", None, MealType::Lunch, Local::now())
            .is_err());
    }

    #[test]
    fn test_log_weight_refreshes_profile() {
        let svc = CaltrackService::new_in_memory().unwrap();
        // Without a profile nothing else changes.
        svc.log_weight(&NewWeightEntry {
            weight_kg: 81.0,
            logged_at: Local::now() - Duration::days(1),
            note: None,
        })
        .unwrap();
        assert!(svc.get_profile().unwrap().is_none());

        svc.save_profile(&profile()).unwrap();
        svc.log_weight(&NewWeightEntry {
            weight_kg: 78.0,
            logged_at: Local::now(),
            note: Some("morning".to_string()),
        })
        .unwrap();
        let metrics = svc.get_profile().unwrap().unwrap();
        assert!((metrics.profile.weight_kg - 78.0).abs() < f64::EPSILON);
        // 10*78 + 6.25*180 - 5*30 + 5
        assert!((metrics.derived.bmr - 1760.0).abs() < 1e-9);

        // A back-dated entry does not overwrite the current weight.
        svc.log_weight(&NewWeightEntry {
            weight_kg: 90.0,
            logged_at: Local::now() - Duration::days(3),
            note: None,
        })
        .unwrap();
        let metrics = svc.get_profile().unwrap().unwrap();
        assert!((metrics.profile.weight_kg - 78.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_log_weight_rejects_zero() {
        let svc = CaltrackService::new_in_memory().unwrap();
        let entry = NewWeightEntry {
            weight_kg: 0.0,
            logged_at: Local::now(),
            note: None,
        };
        assert!(svc.log_weight(&entry).is_err());
        assert!(svc.weight_history(None).unwrap().is_empty());
    }

    #[test]
    fn test_save_profile_validates() {
        let svc = CaltrackService::new_in_memory().unwrap();
        let bad = HealthProfile {
            height_cm: 20.0,
            ..profile()
        };
        assert!(svc.save_profile(&bad).is_err());
        assert!(svc.get_profile().unwrap().is_none());
    }

    #[test]
    fn test_water_goal() {
        let svc = CaltrackService::new_in_memory().unwrap();
        assert!((svc.water_goal().unwrap() - DEFAULT_WATER_GOAL_ML).abs() < f64::EPSILON);
        svc.set_water_goal(2500.0).unwrap();
        assert!((svc.water_goal().unwrap() - 2500.0).abs() < f64::EPSILON);
        assert!(svc.set_water_goal(0.0).is_err());
        assert!(svc.set_water_goal(20_000.0).is_err());

        svc.db.set_setting(WATER_GOAL_KEY, "lots").unwrap();
        assert!((svc.water_goal().unwrap() - DEFAULT_WATER_GOAL_ML).abs() < f64::EPSILON);
    }

    #[test]
    fn test_log_water_rejects_zero() {
        let svc = CaltrackService::new_in_memory().unwrap();
        let entry = NewWaterEntry {
            amount_ml: 0.0,
            logged_at: Local::now(),
        };
        assert!(svc.log_water(&entry).is_err());
    }

    #[test]
    fn test_analyze_labels_records_top_suggestion() {
        let svc = CaltrackService::new_in_memory().unwrap();
        let suggestions = svc
            .analyze_labels(&[obj("fruit", 0.7), obj("pizza", 0.9), obj("apple", 0.2)])
            .unwrap();
        assert_eq!(suggestions[0].name, "Pizza");

        let scans = svc.recent_scans(10).unwrap();
        assert_eq!(scans.len(), 1);
        assert_eq!(scans[0].food_name, "Pizza");
        assert_eq!(scans[0].category, "fast_food");
    }

    #[test]
    fn test_analyze_labels_nothing_recognised() {
        let svc = CaltrackService::new_in_memory().unwrap();
        let suggestions = svc.analyze_labels(&[obj("table", 0.99)]).unwrap();
        assert!(suggestions.is_empty());
        assert!(svc.recent_scans(10).unwrap().is_empty());
    }

    #[test]
    fn test_analyze_and_record() {
        let svc = CaltrackService::new_in_memory().unwrap();
        let classifier = LabelClassifier::new(vec![obj("salmon", 0.8)]);
        let suggestions = svc.analyze_and_record(&classifier, b"jpeg").unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(svc.recent_scans(5).unwrap()[0].food_name, "Salmon");

        let err = svc.analyze_and_record(&FailingClassifier, b"jpeg").unwrap_err();
        assert!(format!("{err:#}").contains("camera unavailable"));
        assert_eq!(svc.recent_scans(5).unwrap().len(), 1);
    }

    #[test]
    fn test_or_empty_reads_degrade() {
        let svc = CaltrackService::new_in_memory().unwrap();
        svc.log_meal(&meal("Toast", 150.0, MealType::Breakfast)).unwrap();
        svc.db
            .execute_raw("UPDATE meals SET meal_type = 'elevenses'")
            .unwrap();
        assert!(svc.meals_for_date(today()).is_err());
        assert!(svc.meals_for_date_or_empty(today()).is_empty());

        svc.db
            .execute_raw(
                "DROP TABLE scan_history; DROP TABLE water_entries; DROP TABLE weight_entries;",
            )
            .unwrap();
        assert!(svc.recent_scans_or_empty(10).is_empty());
        assert!(svc.water_for_date_or_empty(today()).is_empty());
        assert!(svc.weight_history_or_empty(None).is_empty());
    }

    #[test]
    fn test_copy_meals_keeps_time_of_day() {
        let svc = CaltrackService::new_in_memory().unwrap();
        let source = today() - Duration::days(2);
        let target = today() - Duration::days(1);
        let source_time = Local
            .from_local_datetime(&source.and_hms_opt(8, 15, 0).unwrap())
            .earliest()
            .unwrap();
        svc.log_meal(&NewMeal {
            logged_at: source_time,
            ..meal("Porridge", 250.0, MealType::Breakfast)
        })
        .unwrap();
        svc.log_meal(&NewMeal {
            logged_at: source_time + Duration::hours(4),
            ..meal("Wrap", 450.0, MealType::Lunch)
        })
        .unwrap();

        let copied = svc
            .copy_meals(source, target, Some(MealType::Breakfast))
            .unwrap();
        assert_eq!(copied.len(), 1);
        assert_eq!(copied[0].name, "Porridge");
        assert_eq!(copied[0].date, target.format("%Y-%m-%d").to_string());
        assert!(copied[0].logged_at.contains("T08:15:00"));
    }

    #[test]
    fn test_import_mfp_through_service() {
        let svc = CaltrackService::new_in_memory().unwrap();
        let csv = "Date,Meal,Food Name,Calories,Fat (g),Protein (g),Carbohydrates (g)\n\
                   2024-01-15,Lunch,Chicken,165,3.6,31,0\n";
        let summary = svc.import_mfp_csv(csv, false).unwrap();
        assert_eq!(summary.meals_logged, 1);
        let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(svc.meals_for_date(day).unwrap().len(), 1);
    }

    #[test]
    fn test_import_all_skips_invalid_records() {
        let svc = CaltrackService::new_in_memory().unwrap();
        let stamp = "2024-03-02T12:00:00+00:00";
        let stored_meal = |uuid: &str, name: &str, calories: f64| Meal {
            id: 0,
            uuid: uuid.to_string(),
            name: name.to_string(),
            calories,
            protein_g: 10.0,
            carbs_g: 20.0,
            fat_g: 5.0,
            meal_type: MealType::Lunch,
            logged_at: stamp.to_string(),
            date: "2024-03-02".to_string(),
            created_at: stamp.to_string(),
            updated_at: String::new(),
        };
        let stored_weight = |uuid: &str, weight_kg: f64| WeightEntry {
            id: 0,
            uuid: uuid.to_string(),
            weight_kg,
            logged_at: stamp.to_string(),
            date: "2024-03-02".to_string(),
            note: None,
            created_at: stamp.to_string(),
            updated_at: String::new(),
        };
        let data = ExportData {
            version: EXPORT_VERSION,
            exported_at: stamp.to_string(),
            meals: vec![
                stored_meal("m-1", "Soup", 300.0),
                stored_meal("m-2", "Feast", -900.0),
                stored_meal("m-3", "   ", 100.0),
                Meal {
                    logged_at: "last tuesday".to_string(),
                    ..stored_meal("m-4", "Salad", 200.0)
                },
            ],
            water_entries: Vec::new(),
            weight_entries: vec![stored_weight("w-1", -70.0), stored_weight("w-2", 72.5)],
            custom_foods: Vec::new(),
            scans: Vec::new(),
            health_profile: Some(HealthProfile {
                height_cm: 0.0,
                ..profile()
            }),
            settings: Vec::new(),
        };

        let summary = svc.import_all(&data).unwrap();
        assert_eq!(summary.meals_imported, 1);
        assert_eq!(summary.weight_entries_imported, 1);
        assert!(!summary.profile_imported);
        assert_eq!(summary.records_skipped, 5);

        let day = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let meals = svc.meals_for_date(day).unwrap();
        assert_eq!(meals.len(), 1);
        assert!((meals[0].calories - 300.0).abs() < f64::EPSILON);
        let weights = svc.weight_history(None).unwrap();
        assert_eq!(weights.len(), 1);
        assert!((weights[0].weight_kg - 72.5).abs() < f64::EPSILON);
        assert!(svc.get_profile().unwrap().is_none());
    }
}

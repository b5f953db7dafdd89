use std::collections::HashSet;
use std::io::Read;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, NaiveTime, TimeZone};
use serde::Serialize;

use crate::db::Database;
use crate::models::{MealType, NewMeal};
use crate::validation::validate_nutrition;

/// A single row parsed from an MFP CSV export.
#[derive(Debug, Clone)]
pub struct MfpRow {
    pub date: String,
    pub meal: String,
    pub food_name: String,
    pub calories: f64,
    pub fat: f64,
    pub protein: f64,
    pub carbs: f64,
}

/// What an MFP import would do (dry run) or did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MfpImportSummary {
    pub rows_parsed: usize,
    pub meals_logged: usize,
    pub rows_skipped: usize,
    /// Rows whose MFP meal name was not one of ours and were filed as snacks.
    pub mapped_to_snack: usize,
    pub dates_spanned: usize,
    pub dry_run: bool,
}

/// Parse an MFP CSV export from any reader.
///
/// Expected header:
/// `Date,Meal,Food Name,Calories,Fat (g),Protein (g),Carbohydrates (g)`
///
/// Extra columns are ignored; the macro columns are optional.
pub fn parse_mfp_csv<R: Read>(reader: R) -> Result<Vec<MfpRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();
    let col =
        |name: &str| -> Option<usize> { headers.iter().position(|h| h.eq_ignore_ascii_case(name)) };

    let idx_date = col("Date").context("Missing required column: Date")?;
    let idx_meal = col("Meal").context("Missing required column: Meal")?;
    let idx_food = col("Food Name").context("Missing required column: Food Name")?;
    let idx_cal = col("Calories").context("Missing required column: Calories")?;
    let idx_fat = col("Fat (g)");
    let idx_protein = col("Protein (g)");
    let idx_carbs = col("Carbohydrates (g)");

    let mut rows = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse CSV row {}", line_num + 2))?;

        let field = |idx: usize| record.get(idx).unwrap_or("").to_string();
        let date = field(idx_date);
        let food_name = field(idx_food);
        if date.is_empty() || food_name.is_empty() {
            continue;
        }

        let number = |idx: Option<usize>| -> f64 {
            idx.and_then(|i| record.get(i))
                .and_then(|v| v.replace(',', "").parse::<f64>().ok())
                .unwrap_or(0.0)
        };

        rows.push(MfpRow {
            date,
            meal: field(idx_meal),
            food_name,
            calories: number(Some(idx_cal)),
            fat: number(idx_fat),
            protein: number(idx_protein),
            carbs: number(idx_carbs),
        });
    }

    Ok(rows)
}

/// Map an MFP meal name onto a [`MealType`]; anything unrecognised is a snack.
/// The flag is false when the name had to be defaulted.
#[must_use]
pub fn normalize_meal_type(mfp_meal: &str) -> (MealType, bool) {
    match mfp_meal.parse::<MealType>() {
        Ok(meal_type) => (meal_type, true),
        Err(_) => (MealType::Snack, false),
    }
}

/// MFP exports dates as `YYYY-MM-DD`, sometimes `M/D/YYYY` or `D/M/YYYY`.
fn normalize_date(mfp_date: &str) -> Result<NaiveDate> {
    for format in ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(mfp_date, format) {
            return Ok(d);
        }
    }
    bail!("Cannot parse date: '{mfp_date}'")
}

/// MFP rows carry no time of day; file each meal at a typical hour.
fn typical_time(meal_type: MealType) -> NaiveTime {
    let (h, m) = match meal_type {
        MealType::Breakfast => (8, 0),
        MealType::Lunch => (12, 30),
        MealType::Dinner => (19, 0),
        MealType::Snack => (15, 0),
    };
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

/// Log parsed MFP rows as meals. When `dry_run` is true nothing is written.
pub fn import_mfp_meals(db: &Database, rows: &[MfpRow], dry_run: bool) -> Result<MfpImportSummary> {
    let mut summary = MfpImportSummary {
        rows_parsed: rows.len(),
        dry_run,
        ..MfpImportSummary::default()
    };
    let mut dates: HashSet<NaiveDate> = HashSet::new();

    for row in rows {
        let date = normalize_date(&row.date)?;
        if let Some(reason) = validate_nutrition(row.calories, row.protein, row.carbs, row.fat)
            .into_result()
            .err()
        {
            tracing::warn!(food = %row.food_name, date = %row.date, %reason, "skipping MFP row");
            summary.rows_skipped += 1;
            continue;
        }

        let (meal_type, recognised) = normalize_meal_type(&row.meal);
        if !recognised {
            summary.mapped_to_snack += 1;
        }

        let logged_at = Local
            .from_local_datetime(&date.and_time(typical_time(meal_type)))
            .earliest()
            .with_context(|| format!("No local time for {date}"))?;

        if !dry_run {
            db.insert_meal(&NewMeal {
                name: row.food_name.clone(),
                calories: row.calories,
                protein_g: row.protein,
                carbs_g: row.carbs,
                fat_g: row.fat,
                meal_type,
                logged_at,
            })?;
        }
        dates.insert(date);
        summary.meals_logged += 1;
    }

    summary.dates_spanned = dates.len();
    tracing::info!(
        meals = summary.meals_logged,
        skipped = summary.rows_skipped,
        dry_run,
        "MFP import processed"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
Date,Meal,Food Name,Calories,Fat (g),Protein (g),Carbohydrates (g),Fiber (g),Sugar (g)
2024-01-15,Breakfast,Oatmeal - Plain,150,3,5,27,4,1
2024-01-15,Lunch,Chicken Breast - Grilled,165,3.6,31,0,0,0
2024-01-15,Dinner,Salmon Fillet,208,13,20,0,0,0
2024-01-16,Breakfast,Greek Yogurt,100,0.7,17,6,0,4
2024-01-16,Snacks,Almonds - Raw,164,14.2,6,6.1,3.5,1.2
";

    #[test]
    fn test_parse_mfp_csv_basic() {
        let rows = parse_mfp_csv(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].date, "2024-01-15");
        assert_eq!(rows[0].meal, "Breakfast");
        assert_eq!(rows[0].food_name, "Oatmeal - Plain");
        assert!((rows[0].calories - 150.0).abs() < f64::EPSILON);
        assert!((rows[0].protein - 5.0).abs() < f64::EPSILON);
        assert!((rows[0].carbs - 27.0).abs() < f64::EPSILON);
        assert!((rows[0].fat - 3.0).abs() < f64::EPSILON);
        assert_eq!(rows[4].food_name, "Almonds - Raw");
    }

    #[test]
    fn test_parse_mfp_csv_missing_required_column() {
        let bad_csv = "Date,Meal,Calories\n2024-01-15,Lunch,100\n";
        let err = parse_mfp_csv(bad_csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Food Name"));
    }

    #[test]
    fn test_parse_mfp_csv_skips_blank_rows() {
        let csv = "\
Date,Meal,Food Name,Calories,Fat (g),Protein (g),Carbohydrates (g)
2024-01-15,Lunch,Chicken,165,3.6,31,0
,,,,,,
2024-01-15,Dinner,Rice,130,0.3,2.7,28
";
        let rows = parse_mfp_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_parse_thousands_separator() {
        let csv = "Date,Meal,Food Name,Calories\n2024-01-15,Dinner,Feast,\"1,250\"\n";
        let rows = parse_mfp_csv(csv.as_bytes()).unwrap();
        assert!((rows[0].calories - 1250.0).abs() < f64::EPSILON);
        assert!(rows[0].protein.abs() < f64::EPSILON);
    }

    #[test]
    fn test_normalize_meal_type() {
        assert_eq!(normalize_meal_type("Breakfast"), (MealType::Breakfast, true));
        assert_eq!(normalize_meal_type("LUNCH"), (MealType::Lunch, true));
        assert_eq!(normalize_meal_type("Snacks"), (MealType::Snack, false));
        assert_eq!(normalize_meal_type("Morning Snack"), (MealType::Snack, false));
    }

    #[test]
    fn test_normalize_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(normalize_date("2024-01-15").unwrap(), expected);
        assert_eq!(normalize_date("1/15/2024").unwrap(), expected);
        assert!(normalize_date("not-a-date").is_err());
    }

    #[test]
    fn test_import_mfp_dry_run() {
        let db = Database::open_in_memory().unwrap();
        let rows = parse_mfp_csv(SAMPLE_CSV.as_bytes()).unwrap();

        let summary = import_mfp_meals(&db, &rows, true).unwrap();
        assert_eq!(summary.rows_parsed, 5);
        assert_eq!(summary.meals_logged, 5);
        assert_eq!(summary.mapped_to_snack, 1);
        assert_eq!(summary.dates_spanned, 2);
        assert!(summary.dry_run);
        assert!(db.get_all_meals().unwrap().is_empty());
    }

    #[test]
    fn test_import_mfp_logs_meals() {
        let db = Database::open_in_memory().unwrap();
        let rows = parse_mfp_csv(SAMPLE_CSV.as_bytes()).unwrap();

        let summary = import_mfp_meals(&db, &rows, false).unwrap();
        assert_eq!(summary.meals_logged, 5);

        let day = NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        let meals = db.get_meals_for_date(day).unwrap();
        assert_eq!(meals.len(), 2);
        assert_eq!(meals[0].name, "Greek Yogurt");
        assert_eq!(meals[0].meal_type, MealType::Breakfast);
        assert_eq!(meals[1].meal_type, MealType::Snack);
        assert!((meals[1].fat_g - 14.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_import_mfp_skips_invalid_rows() {
        let db = Database::open_in_memory().unwrap();
        let csv = "\
Date,Meal,Food Name,Calories
2024-01-15,Lunch,Mystery,-50
2024-01-15,Lunch,Soup,120
";
        let rows = parse_mfp_csv(csv.as_bytes()).unwrap();
        let summary = import_mfp_meals(&db, &rows, false).unwrap();
        assert_eq!(summary.rows_skipped, 1);
        assert_eq!(summary.meals_logged, 1);
        assert_eq!(db.get_all_meals().unwrap().len(), 1);
    }
}

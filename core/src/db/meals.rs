use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};
use rusqlite::params;
use uuid::Uuid;

use super::{Database, date_str, parse_column};
use crate::models::{
    DailyTotals, MAX_HISTORY_DAYS, Meal, MealType, NewMeal, UpdateMeal, date_bucket,
};

const MEAL_COLUMNS: &str = "id, uuid, name, calories, protein_g, carbs_g, fat_g, meal_type,
     logged_at, date, created_at, updated_at";

impl Database {
    pub(super) fn meal_from_row(row: &rusqlite::Row) -> rusqlite::Result<Meal> {
        Ok(Meal {
            id: row.get(0)?,
            uuid: row.get(1)?,
            name: row.get(2)?,
            calories: row.get(3)?,
            protein_g: row.get(4)?,
            carbs_g: row.get(5)?,
            fat_g: row.get(6)?,
            meal_type: parse_column(row, 7)?,
            logged_at: row.get(8)?,
            date: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn query_meals(&self, filter: &str, params: impl rusqlite::Params) -> Result<Vec<Meal>> {
        let sql = format!("SELECT {MEAL_COLUMNS} FROM meals {filter} ORDER BY logged_at, id");
        let mut stmt = self.conn.prepare(&sql)?;
        let meals = stmt
            .query_map(params, Self::meal_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(meals)
    }

    pub fn insert_meal(&self, meal: &NewMeal) -> Result<Meal> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO meals (uuid, name, calories, protein_g, carbs_g, fat_g, meal_type,
                                logged_at, date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                uuid,
                meal.name.trim(),
                meal.calories,
                meal.protein_g,
                meal.carbs_g,
                meal.fat_g,
                meal.meal_type.as_str(),
                meal.logged_at.to_rfc3339(),
                date_bucket(&meal.logged_at),
                now,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_meal(id)
    }

    pub fn get_meal(&self, id: i64) -> Result<Meal> {
        self.conn
            .query_row(
                &format!("SELECT {MEAL_COLUMNS} FROM meals WHERE id = ?1"),
                params![id],
                Self::meal_from_row,
            )
            .context("Meal not found")
    }

    pub fn update_meal(&self, id: i64, update: &UpdateMeal) -> Result<Meal> {
        self.get_meal(id)?;

        let now = Local::now().to_rfc3339();
        if let Some(ref name) = update.name {
            self.conn.execute(
                "UPDATE meals SET name = ?1, updated_at = ?2 WHERE id = ?3",
                params![name.trim(), now, id],
            )?;
        }
        if let Some(calories) = update.calories {
            self.conn.execute(
                "UPDATE meals SET calories = ?1, updated_at = ?2 WHERE id = ?3",
                params![calories, now, id],
            )?;
        }
        if let Some(protein_g) = update.protein_g {
            self.conn.execute(
                "UPDATE meals SET protein_g = ?1, updated_at = ?2 WHERE id = ?3",
                params![protein_g, now, id],
            )?;
        }
        if let Some(carbs_g) = update.carbs_g {
            self.conn.execute(
                "UPDATE meals SET carbs_g = ?1, updated_at = ?2 WHERE id = ?3",
                params![carbs_g, now, id],
            )?;
        }
        if let Some(fat_g) = update.fat_g {
            self.conn.execute(
                "UPDATE meals SET fat_g = ?1, updated_at = ?2 WHERE id = ?3",
                params![fat_g, now, id],
            )?;
        }
        if let Some(meal_type) = update.meal_type {
            self.conn.execute(
                "UPDATE meals SET meal_type = ?1, updated_at = ?2 WHERE id = ?3",
                params![meal_type.as_str(), now, id],
            )?;
        }
        if let Some(logged_at) = update.logged_at {
            self.conn.execute(
                "UPDATE meals SET logged_at = ?1, date = ?2, updated_at = ?3 WHERE id = ?4",
                params![logged_at.to_rfc3339(), date_bucket(&logged_at), now, id],
            )?;
        }

        self.get_meal(id)
    }

    pub fn delete_meal(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM meals WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn get_meals_for_date(&self, date: NaiveDate) -> Result<Vec<Meal>> {
        self.query_meals("WHERE date = ?1", params![date_str(date)])
    }

    pub fn get_meals_for_date_and_type(
        &self,
        date: NaiveDate,
        meal_type: MealType,
    ) -> Result<Vec<Meal>> {
        self.query_meals(
            "WHERE date = ?1 AND meal_type = ?2",
            params![date_str(date), meal_type.as_str()],
        )
    }

    /// Meals whose date bucket falls in `start..=end`.
    pub fn get_meals_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Meal>> {
        self.query_meals(
            "WHERE date >= ?1 AND date <= ?2",
            params![date_str(start), date_str(end)],
        )
    }

    pub fn get_all_meals(&self) -> Result<Vec<Meal>> {
        self.query_meals("", [])
    }

    pub fn get_daily_totals(&self, date: NaiveDate) -> Result<DailyTotals> {
        let date_str = date_str(date);
        let totals = self.conn.query_row(
            "SELECT COALESCE(SUM(calories), 0), COALESCE(SUM(protein_g), 0),
                    COALESCE(SUM(carbs_g), 0), COALESCE(SUM(fat_g), 0), COUNT(*)
             FROM meals WHERE date = ?1",
            params![date_str],
            |row| {
                Ok(DailyTotals {
                    date: date_str.clone(),
                    calories: row.get(0)?,
                    protein_g: row.get(1)?,
                    carbs_g: row.get(2)?,
                    fat_g: row.get(3)?,
                    meal_count: row.get(4)?,
                })
            },
        )?;
        Ok(totals)
    }

    /// Per-day totals for every day in `start..=end` that has at least one meal.
    pub fn get_daily_totals_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyTotals>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, SUM(calories), SUM(protein_g), SUM(carbs_g), SUM(fat_g), COUNT(*)
             FROM meals
             WHERE date >= ?1 AND date <= ?2
             GROUP BY date
             ORDER BY date",
        )?;
        let totals = stmt
            .query_map(params![date_str(start), date_str(end)], |row| {
                Ok(DailyTotals {
                    date: row.get(0)?,
                    calories: row.get(1)?,
                    protein_g: row.get(2)?,
                    carbs_g: row.get(3)?,
                    fat_g: row.get(4)?,
                    meal_count: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(totals)
    }

    /// Consecutive days with at least one meal, ending today or yesterday.
    pub fn get_logging_streak(&self, today: NaiveDate) -> Result<i64> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT date FROM meals WHERE date <= ?1 ORDER BY date DESC",
        )?;
        let dates: Vec<String> = stmt
            .query_map(params![date_str(today)], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let yesterday = today - Duration::days(1);
        let start = match dates.first() {
            Some(d) if *d == date_str(today) => today,
            Some(d) if *d == date_str(yesterday) => yesterday,
            _ => return Ok(0),
        };

        let mut streak: i64 = 0;
        for date in &dates {
            if *date == date_str(start - Duration::days(streak)) {
                streak += 1;
            } else {
                break;
            }
        }
        Ok(streak)
    }

    /// Average calories over the logged days among the last `days` days.
    pub fn get_calorie_average(&self, today: NaiveDate, days: i64) -> Result<f64> {
        if days <= 0 {
            return Ok(0.0);
        }
        let start = today - Duration::days(days.min(MAX_HISTORY_DAYS) - 1);
        let result: Option<f64> = self.conn.query_row(
            "SELECT AVG(daily_total) FROM (
                SELECT SUM(calories) AS daily_total
                FROM meals
                WHERE date >= ?1 AND date <= ?2
                GROUP BY date
            )",
            params![date_str(start), date_str(today)],
            |row| row.get(0),
        )?;
        Ok(result.unwrap_or(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn sample_meal(
        name: &str,
        calories: f64,
        meal_type: MealType,
        logged_at: DateTime<Local>,
    ) -> NewMeal {
        NewMeal {
            name: name.to_string(),
            calories,
            protein_g: 10.0,
            carbs_g: 20.0,
            fat_g: 5.0,
            meal_type,
            logged_at,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_insert_and_get_meal() {
        let db = Database::open_in_memory().unwrap();
        let meal = db
            .insert_meal(&sample_meal("Oatmeal", 300.0, MealType::Breakfast, at(2024, 6, 15, 8)))
            .unwrap();

        assert_eq!(meal.name, "Oatmeal");
        assert_eq!(meal.meal_type, MealType::Breakfast);
        assert_eq!(meal.date, "2024-06-15");
        assert!(!meal.uuid.is_empty());
        assert_eq!(meal.created_at, meal.updated_at);

        let fetched = db.get_meal(meal.id).unwrap();
        assert_eq!(fetched.uuid, meal.uuid);
        assert!((fetched.calories - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_insert_meal_trims_name() {
        let db = Database::open_in_memory().unwrap();
        let meal = db
            .insert_meal(&sample_meal("  Toast ", 120.0, MealType::Snack, at(2024, 6, 15, 8)))
            .unwrap();
        assert_eq!(meal.name, "Toast");
    }

    #[test]
    fn test_get_meal_not_found() {
        let db = Database::open_in_memory().unwrap();
        let err = db.get_meal(999).unwrap_err();
        assert!(err.to_string().contains("Meal not found"));
    }

    #[test]
    fn test_delete_meal() {
        let db = Database::open_in_memory().unwrap();
        let meal = db
            .insert_meal(&sample_meal("Apple", 95.0, MealType::Snack, at(2024, 6, 15, 10)))
            .unwrap();
        assert!(db.delete_meal(meal.id).unwrap());
        assert!(!db.delete_meal(meal.id).unwrap());
        assert!(db.get_meal(meal.id).is_err());
    }

    #[test]
    fn test_update_meal_partial() {
        let db = Database::open_in_memory().unwrap();
        let meal = db
            .insert_meal(&sample_meal("Pasta", 500.0, MealType::Lunch, at(2024, 6, 15, 12)))
            .unwrap();

        let updated = db
            .update_meal(
                meal.id,
                &UpdateMeal {
                    calories: Some(450.0),
                    meal_type: Some(MealType::Dinner),
                    ..UpdateMeal::default()
                },
            )
            .unwrap();
        assert!((updated.calories - 450.0).abs() < f64::EPSILON);
        assert_eq!(updated.meal_type, MealType::Dinner);
        assert_eq!(updated.name, "Pasta");
        assert!((updated.protein_g - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_update_meal_moves_date_bucket() {
        let db = Database::open_in_memory().unwrap();
        let meal = db
            .insert_meal(&sample_meal("Pasta", 500.0, MealType::Lunch, at(2024, 6, 15, 12)))
            .unwrap();
        let updated = db
            .update_meal(
                meal.id,
                &UpdateMeal {
                    logged_at: Some(at(2024, 6, 14, 19)),
                    ..UpdateMeal::default()
                },
            )
            .unwrap();
        assert_eq!(updated.date, "2024-06-14");
        assert!(db.get_meals_for_date(day(2024, 6, 15)).unwrap().is_empty());
        assert_eq!(db.get_meals_for_date(day(2024, 6, 14)).unwrap().len(), 1);
    }

    #[test]
    fn test_update_meal_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.update_meal(42, &UpdateMeal::default()).is_err());
    }

    #[test]
    fn test_get_meals_for_date_ordered_by_time() {
        let db = Database::open_in_memory().unwrap();
        db.insert_meal(&sample_meal("Dinner", 700.0, MealType::Dinner, at(2024, 6, 15, 19)))
            .unwrap();
        db.insert_meal(&sample_meal("Breakfast", 300.0, MealType::Breakfast, at(2024, 6, 15, 7)))
            .unwrap();
        db.insert_meal(&sample_meal("Other day", 100.0, MealType::Snack, at(2024, 6, 16, 9)))
            .unwrap();

        let meals = db.get_meals_for_date(day(2024, 6, 15)).unwrap();
        let names: Vec<&str> = meals.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Breakfast", "Dinner"]);
    }

    #[test]
    fn test_get_meals_for_date_and_type() {
        let db = Database::open_in_memory().unwrap();
        db.insert_meal(&sample_meal("Eggs", 200.0, MealType::Breakfast, at(2024, 6, 15, 7)))
            .unwrap();
        db.insert_meal(&sample_meal("Salad", 250.0, MealType::Lunch, at(2024, 6, 15, 12)))
            .unwrap();

        let lunch = db
            .get_meals_for_date_and_type(day(2024, 6, 15), MealType::Lunch)
            .unwrap();
        assert_eq!(lunch.len(), 1);
        assert_eq!(lunch[0].name, "Salad");
        assert!(db
            .get_meals_for_date_and_type(day(2024, 6, 15), MealType::Dinner)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_get_meals_between_inclusive() {
        let db = Database::open_in_memory().unwrap();
        for d in 10..=14 {
            db.insert_meal(&sample_meal("Meal", 100.0, MealType::Lunch, at(2024, 6, d, 12)))
                .unwrap();
        }
        let meals = db.get_meals_between(day(2024, 6, 11), day(2024, 6, 13)).unwrap();
        assert_eq!(meals.len(), 3);
        assert_eq!(db.get_all_meals().unwrap().len(), 5);
    }

    #[test]
    fn test_daily_totals() {
        let db = Database::open_in_memory().unwrap();
        db.insert_meal(&sample_meal("A", 300.0, MealType::Breakfast, at(2024, 6, 15, 8)))
            .unwrap();
        db.insert_meal(&sample_meal("B", 500.0, MealType::Lunch, at(2024, 6, 15, 13)))
            .unwrap();

        let totals = db.get_daily_totals(day(2024, 6, 15)).unwrap();
        assert_eq!(totals.date, "2024-06-15");
        assert!((totals.calories - 800.0).abs() < f64::EPSILON);
        assert!((totals.protein_g - 20.0).abs() < f64::EPSILON);
        assert_eq!(totals.meal_count, 2);

        let empty = db.get_daily_totals(day(2024, 6, 16)).unwrap();
        assert_eq!(empty.meal_count, 0);
        assert!(empty.calories.abs() < f64::EPSILON);
    }

    #[test]
    fn test_daily_totals_between_skips_empty_days() {
        let db = Database::open_in_memory().unwrap();
        db.insert_meal(&sample_meal("A", 300.0, MealType::Lunch, at(2024, 6, 10, 12)))
            .unwrap();
        db.insert_meal(&sample_meal("B", 400.0, MealType::Lunch, at(2024, 6, 12, 12)))
            .unwrap();
        db.insert_meal(&sample_meal("C", 100.0, MealType::Snack, at(2024, 6, 12, 16)))
            .unwrap();

        let totals = db
            .get_daily_totals_between(day(2024, 6, 10), day(2024, 6, 12))
            .unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[1].date, "2024-06-12");
        assert!((totals[1].calories - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_logging_streak() {
        let db = Database::open_in_memory().unwrap();
        let today = day(2024, 6, 15);
        assert_eq!(db.get_logging_streak(today).unwrap(), 0);

        for d in [13, 14, 15] {
            db.insert_meal(&sample_meal("M", 100.0, MealType::Lunch, at(2024, 6, d, 12)))
                .unwrap();
        }
        db.insert_meal(&sample_meal("M", 100.0, MealType::Lunch, at(2024, 6, 11, 12)))
            .unwrap();
        assert_eq!(db.get_logging_streak(today).unwrap(), 3);
        // Streak still counts when today has nothing logged yet.
        assert_eq!(db.get_logging_streak(day(2024, 6, 16)).unwrap(), 3);
        assert_eq!(db.get_logging_streak(day(2024, 6, 17)).unwrap(), 0);
    }

    #[test]
    fn test_logging_streak_ignores_later_dates() {
        let db = Database::open_in_memory().unwrap();
        for d in [14, 15, 20] {
            db.insert_meal(&sample_meal("M", 100.0, MealType::Dinner, at(2024, 6, d, 19)))
                .unwrap();
        }
        assert_eq!(db.get_logging_streak(day(2024, 6, 15)).unwrap(), 2);
    }

    #[test]
    fn test_calorie_average() {
        let db = Database::open_in_memory().unwrap();
        let today = day(2024, 6, 15);
        assert!(db.get_calorie_average(today, 7).unwrap().abs() < f64::EPSILON);

        db.insert_meal(&sample_meal("A", 1800.0, MealType::Lunch, at(2024, 6, 15, 12)))
            .unwrap();
        db.insert_meal(&sample_meal("B", 2200.0, MealType::Lunch, at(2024, 6, 13, 12)))
            .unwrap();
        // Outside the window.
        db.insert_meal(&sample_meal("C", 5000.0, MealType::Lunch, at(2024, 6, 1, 12)))
            .unwrap();

        let avg = db.get_calorie_average(today, 7).unwrap();
        assert!((avg - 2000.0).abs() < f64::EPSILON);
    }
}

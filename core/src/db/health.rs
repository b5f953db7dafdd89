use anyhow::Result;
use chrono::Local;
use rusqlite::params;

use super::{Database, parse_column};
use crate::health::{DerivedMetrics, HealthProfile, MacroTargets, calculate_bmi, classify_bmi};
use crate::models::HealthMetrics;

impl Database {
    // Columns:
    // 0: weight_kg, 1: height_cm, 2: age, 3: gender, 4: activity_level,
    // 5: fitness_goal, 6: bmr, 7: tdee, 8: target_calories,
    // 9: protein_g, 10: carbs_g, 11: fat_g, 12: updated_at
    fn health_metrics_from_row(row: &rusqlite::Row) -> rusqlite::Result<HealthMetrics> {
        let profile = HealthProfile {
            weight_kg: row.get(0)?,
            height_cm: row.get(1)?,
            age: row.get(2)?,
            gender: parse_column(row, 3)?,
            activity_level: parse_column(row, 4)?,
            fitness_goal: parse_column(row, 5)?,
        };
        let bmi = calculate_bmi(profile.weight_kg, profile.height_cm);
        let derived = DerivedMetrics {
            bmr: row.get(6)?,
            tdee: row.get(7)?,
            target_calories: row.get(8)?,
            bmi,
            bmi_category: classify_bmi(bmi),
            macros: MacroTargets {
                protein_g: row.get(9)?,
                carbs_g: row.get(10)?,
                fat_g: row.get(11)?,
            },
        };
        Ok(HealthMetrics {
            profile,
            derived,
            updated_at: row.get(12)?,
        })
    }

    /// Recompute the derived values and replace the stored profile.
    pub fn save_health_metrics(&self, profile: &HealthProfile) -> Result<HealthMetrics> {
        let derived = profile.compute();
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO health_metrics (id, weight_kg, height_cm, age, gender, activity_level,
                                         fitness_goal, bmr, tdee, target_calories,
                                         protein_g, carbs_g, fat_g, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(id) DO UPDATE SET
                weight_kg = excluded.weight_kg,
                height_cm = excluded.height_cm,
                age = excluded.age,
                gender = excluded.gender,
                activity_level = excluded.activity_level,
                fitness_goal = excluded.fitness_goal,
                bmr = excluded.bmr,
                tdee = excluded.tdee,
                target_calories = excluded.target_calories,
                protein_g = excluded.protein_g,
                carbs_g = excluded.carbs_g,
                fat_g = excluded.fat_g,
                updated_at = excluded.updated_at",
            params![
                profile.weight_kg,
                profile.height_cm,
                profile.age,
                profile.gender.as_str(),
                profile.activity_level.as_str(),
                profile.fitness_goal.as_str(),
                derived.bmr,
                derived.tdee,
                derived.target_calories,
                derived.macros.protein_g,
                derived.macros.carbs_g,
                derived.macros.fat_g,
                now,
            ],
        )?;
        Ok(HealthMetrics {
            profile: profile.clone(),
            derived,
            updated_at: now,
        })
    }

    pub fn get_health_metrics(&self) -> Result<Option<HealthMetrics>> {
        let mut stmt = self.conn.prepare(
            "SELECT weight_kg, height_cm, age, gender, activity_level, fitness_goal,
                    bmr, tdee, target_calories, protein_g, carbs_g, fat_g, updated_at
             FROM health_metrics WHERE id = 1",
        )?;
        let mut rows = stmt.query([])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::health_metrics_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn clear_health_metrics(&self) -> Result<bool> {
        let rows = self.conn.execute("DELETE FROM health_metrics", [])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{ActivityLevel, FitnessGoal, Gender};

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

    #[test]
    fn test_save_and_get_health_metrics() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_health_metrics().unwrap().is_none());

        let saved = db.save_health_metrics(&profile()).unwrap();
        assert!((saved.derived.bmr - 1780.0).abs() < 1e-9);

        let loaded = db.get_health_metrics().unwrap().unwrap();
        assert_eq!(loaded.profile, profile());
        assert!((loaded.derived.tdee - saved.derived.tdee).abs() < 1e-9);
        assert!((loaded.derived.target_calories - 1636.0).abs() < 1e-9);
        assert_eq!(loaded.derived.bmi_category, saved.derived.bmi_category);
    }

    #[test]
    fn test_save_replaces_single_row() {
        let db = Database::open_in_memory().unwrap();
        db.save_health_metrics(&profile()).unwrap();
        let updated = HealthProfile {
            weight_kg: 75.0,
            fitness_goal: FitnessGoal::Maintain,
            ..profile()
        };
        db.save_health_metrics(&updated).unwrap();

        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM health_metrics", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        let loaded = db.get_health_metrics().unwrap().unwrap();
        assert!((loaded.profile.weight_kg - 75.0).abs() < f64::EPSILON);
        assert_eq!(loaded.profile.fitness_goal, FitnessGoal::Maintain);
    }

    #[test]
    fn test_clear_health_metrics() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db.clear_health_metrics().unwrap());
        db.save_health_metrics(&profile()).unwrap();
        assert!(db.clear_health_metrics().unwrap());
        assert!(db.get_health_metrics().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_enum_column_is_error() {
        let db = Database::open_in_memory().unwrap();
        db.save_health_metrics(&profile()).unwrap();
        db.conn
            .execute("UPDATE health_metrics SET gender = 'robot'", [])
            .unwrap();
        assert!(db.get_health_metrics().is_err());
    }
}

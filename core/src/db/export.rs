use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::Local;
use rusqlite::params;
use uuid::Uuid;

use super::Database;
use crate::models::{
    CustomFood, EXPORT_VERSION, ExportData, ImportSummary, Meal, ScanRecord, WaterEntry,
    WeightEntry,
};

/// Fill in a uuid for rows exported before uuids existed.
fn uuid_or_new(uuid: &str) -> String {
    if uuid.is_empty() {
        Uuid::new_v4().to_string()
    } else {
        uuid.to_string()
    }
}

fn updated_or_created<'a>(updated_at: &'a str, created_at: &'a str) -> &'a str {
    if updated_at.is_empty() {
        created_at
    } else {
        updated_at
    }
}

impl Database {
    pub fn export_all(&self) -> Result<ExportData> {
        Ok(ExportData {
            version: EXPORT_VERSION,
            exported_at: Local::now().to_rfc3339(),
            meals: self.get_all_meals()?,
            water_entries: self.get_all_water()?,
            weight_entries: self.get_all_weights()?,
            custom_foods: self.list_custom_foods()?,
            scans: self.get_recent_scans(crate::models::SCAN_HISTORY_LIMIT)?,
            health_profile: self.get_health_metrics()?.map(|m| m.profile),
            settings: self.get_all_settings()?,
        })
    }

    /// Insert every record whose uuid is not present yet. A profile in the
    /// snapshot replaces the stored one; settings are overwritten.
    pub fn import_all(&self, data: &ExportData) -> Result<ImportSummary> {
        if data.version > EXPORT_VERSION {
            bail!(
                "Unsupported export version {} (this build reads up to {EXPORT_VERSION})",
                data.version
            );
        }

        let tx = self.conn.unchecked_transaction()?;
        let mut summary = ImportSummary {
            meals_imported: self.import_meals(&data.meals)?,
            water_entries_imported: self.import_water(&data.water_entries)?,
            weight_entries_imported: self.import_weights(&data.weight_entries)?,
            custom_foods_imported: self.import_custom_foods(&data.custom_foods)?,
            scans_imported: self.import_scans(&data.scans)?,
            profile_imported: false,
            records_skipped: 0,
        };
        if let Some(ref profile) = data.health_profile {
            self.save_health_metrics(profile)?;
            summary.profile_imported = true;
        }
        for setting in &data.settings {
            self.set_setting(&setting.key, &setting.value)?;
        }
        tx.commit().context("Failed to commit import")?;

        tracing::info!(
            meals = summary.meals_imported,
            water = summary.water_entries_imported,
            weights = summary.weight_entries_imported,
            custom_foods = summary.custom_foods_imported,
            scans = summary.scans_imported,
            "import finished"
        );
        Ok(summary)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn import_meals(&self, meals: &[Meal]) -> Result<i64> {
        let mut count: i64 = 0;
        for meal in meals {
            let rows = self.conn.execute(
                "INSERT OR IGNORE INTO meals (uuid, name, calories, protein_g, carbs_g, fat_g,
                                              meal_type, logged_at, date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    uuid_or_new(&meal.uuid),
                    meal.name,
                    meal.calories,
                    meal.protein_g,
                    meal.carbs_g,
                    meal.fat_g,
                    meal.meal_type.as_str(),
                    meal.logged_at,
                    meal.date,
                    meal.created_at,
                    updated_or_created(&meal.updated_at, &meal.created_at),
                ],
            )?;
            count += rows as i64;
        }
        Ok(count)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn import_water(&self, entries: &[WaterEntry]) -> Result<i64> {
        let mut count: i64 = 0;
        for entry in entries {
            let rows = self.conn.execute(
                "INSERT OR IGNORE INTO water_entries (uuid, amount_ml, logged_at, date, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    uuid_or_new(&entry.uuid),
                    entry.amount_ml,
                    entry.logged_at,
                    entry.date,
                    entry.created_at,
                ],
            )?;
            count += rows as i64;
        }
        Ok(count)
    }

    #[allow(clippy::cast_possible_wrap)]
    fn import_weights(&self, entries: &[WeightEntry]) -> Result<i64> {
        let mut count: i64 = 0;
        for entry in entries {
            let rows = self.conn.execute(
                "INSERT OR IGNORE INTO weight_entries (uuid, weight_kg, logged_at, date, note,
                                                       created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    uuid_or_new(&entry.uuid),
                    entry.weight_kg,
                    entry.logged_at,
                    entry.date,
                    entry.note,
                    entry.created_at,
                    updated_or_created(&entry.updated_at, &entry.created_at),
                ],
            )?;
            count += rows as i64;
        }
        Ok(count)
    }

    /// Foods whose uuid or name already exists are skipped.
    #[allow(clippy::cast_possible_wrap)]
    fn import_custom_foods(&self, foods: &[CustomFood]) -> Result<i64> {
        let mut count: i64 = 0;
        for food in foods {
            let rows = self.conn.execute(
                "INSERT OR IGNORE INTO custom_foods (uuid, name, calories, protein_g, carbs_g,
                                                     fat_g, serving_g, is_favorite, use_count,
                                                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    uuid_or_new(&food.uuid),
                    food.name,
                    food.calories,
                    food.protein_g,
                    food.carbs_g,
                    food.fat_g,
                    food.serving_g,
                    food.is_favorite,
                    food.use_count,
                    food.created_at,
                    updated_or_created(&food.updated_at, &food.created_at),
                ],
            )?;
            count += rows as i64;
        }
        Ok(count)
    }

    /// Scans carry no uuid; a scan with the same name and timestamp counts as
    /// already present.
    #[allow(clippy::cast_possible_wrap)]
    fn import_scans(&self, scans: &[ScanRecord]) -> Result<i64> {
        let mut count: i64 = 0;
        for scan in scans {
            let rows = self.conn.execute(
                "INSERT INTO scan_history (food_name, category, confidence, scanned_at)
                 SELECT ?1, ?2, ?3, ?4
                 WHERE NOT EXISTS (
                     SELECT 1 FROM scan_history WHERE food_name = ?1 AND scanned_at = ?4
                 )",
                params![scan.food_name, scan.category, scan.confidence, scan.scanned_at],
            )?;
            count += rows as i64;
        }
        if count > 0 {
            self.prune_scan_history()?;
        }
        Ok(count)
    }

    /// Write every meal as CSV with a header row. Returns the number of rows.
    pub fn write_meals_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let meals = self.get_all_meals()?;
        let mut wtr = csv::Writer::from_writer(writer);
        for meal in &meals {
            wtr.serialize(meal)?;
        }
        wtr.flush()?;
        Ok(meals.len())
    }
}

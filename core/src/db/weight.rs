use anyhow::{Context, Result, bail};
use chrono::{Duration, Local};
use rusqlite::params;
use uuid::Uuid;

use super::{Database, date_str};
use crate::models::{MAX_HISTORY_DAYS, NewWeightEntry, WeightEntry, date_bucket};

const WEIGHT_COLUMNS: &str = "id, uuid, weight_kg, logged_at, date, note, created_at, updated_at";

impl Database {
    pub(super) fn weight_from_row(row: &rusqlite::Row) -> rusqlite::Result<WeightEntry> {
        Ok(WeightEntry {
            id: row.get(0)?,
            uuid: row.get(1)?,
            weight_kg: row.get(2)?,
            logged_at: row.get(3)?,
            date: row.get(4)?,
            note: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    pub fn insert_weight(&self, entry: &NewWeightEntry) -> Result<WeightEntry> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        let note = entry
            .note
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        self.conn.execute(
            "INSERT INTO weight_entries (uuid, weight_kg, logged_at, date, note, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                uuid,
                entry.weight_kg,
                entry.logged_at.to_rfc3339(),
                date_bucket(&entry.logged_at),
                note,
                now,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_weight_entry(id)
    }

    pub fn get_weight_entry(&self, id: i64) -> Result<WeightEntry> {
        self.conn
            .query_row(
                &format!("SELECT {WEIGHT_COLUMNS} FROM weight_entries WHERE id = ?1"),
                params![id],
                Self::weight_from_row,
            )
            .context("Weight entry not found")
    }

    pub fn delete_weight(&self, id: i64) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM weight_entries WHERE id = ?1", params![id])?;
        if rows == 0 {
            bail!("Weight entry not found");
        }
        Ok(())
    }

    /// Newest first. `days` limits the result to entries dated within the
    /// last `days` days, today included.
    pub fn get_weight_history(&self, days: Option<i64>) -> Result<Vec<WeightEntry>> {
        let since = days.map(|n| {
            let n = n.clamp(1, MAX_HISTORY_DAYS);
            date_str(Local::now().date_naive() - Duration::days(n - 1))
        });
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {WEIGHT_COLUMNS} FROM weight_entries
             WHERE ?1 IS NULL OR date >= ?1
             ORDER BY logged_at DESC, id DESC"
        ))?;
        let entries = stmt
            .query_map(params![since], Self::weight_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn get_latest_weight(&self) -> Result<Option<WeightEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {WEIGHT_COLUMNS} FROM weight_entries ORDER BY logged_at DESC, id DESC LIMIT 1"
        ))?;
        let mut rows = stmt.query([])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::weight_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn get_all_weights(&self) -> Result<Vec<WeightEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {WEIGHT_COLUMNS} FROM weight_entries ORDER BY logged_at, id"
        ))?;
        let entries = stmt
            .query_map([], Self::weight_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weigh_in(weight_kg: f64, days_ago: i64) -> NewWeightEntry {
        NewWeightEntry {
            weight_kg,
            logged_at: Local::now() - Duration::days(days_ago),
            note: None,
        }
    }

    #[test]
    fn test_insert_and_get_weight() {
        let db = Database::open_in_memory().unwrap();
        let entry = db
            .insert_weight(&NewWeightEntry {
                note: Some("  after run ".to_string()),
                ..weigh_in(80.5, 0)
            })
            .unwrap();
        assert!((entry.weight_kg - 80.5).abs() < f64::EPSILON);
        assert_eq!(entry.note.as_deref(), Some("after run"));
        assert_eq!(entry.date, date_str(Local::now().date_naive()));

        let fetched = db.get_weight_entry(entry.id).unwrap();
        assert_eq!(fetched.uuid, entry.uuid);
    }

    #[test]
    fn test_blank_note_stored_as_none() {
        let db = Database::open_in_memory().unwrap();
        let entry = db
            .insert_weight(&NewWeightEntry {
                note: Some("   ".to_string()),
                ..weigh_in(80.0, 0)
            })
            .unwrap();
        assert!(entry.note.is_none());
    }

    #[test]
    fn test_multiple_entries_per_day() {
        let db = Database::open_in_memory().unwrap();
        db.insert_weight(&weigh_in(80.0, 0)).unwrap();
        db.insert_weight(&weigh_in(79.8, 0)).unwrap();
        assert_eq!(db.get_all_weights().unwrap().len(), 2);
    }

    #[test]
    fn test_weight_history_newest_first() {
        let db = Database::open_in_memory().unwrap();
        db.insert_weight(&weigh_in(82.0, 40)).unwrap();
        db.insert_weight(&weigh_in(81.0, 3)).unwrap();
        db.insert_weight(&weigh_in(80.0, 1)).unwrap();

        let all = db.get_weight_history(None).unwrap();
        assert_eq!(all.len(), 3);
        assert!((all[0].weight_kg - 80.0).abs() < f64::EPSILON);
        assert!((all[2].weight_kg - 82.0).abs() < f64::EPSILON);

        let recent = db.get_weight_history(Some(7)).unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn test_weight_history_window_is_capped() {
        let db = Database::open_in_memory().unwrap();
        db.insert_weight(&weigh_in(80.0, 1)).unwrap();
        assert_eq!(db.get_weight_history(Some(i64::MAX)).unwrap().len(), 1);
        assert_eq!(db.get_weight_history(Some(0)).unwrap().len(), 0);
    }

    #[test]
    fn test_latest_weight() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_latest_weight().unwrap().is_none());
        db.insert_weight(&weigh_in(81.0, 2)).unwrap();
        db.insert_weight(&weigh_in(80.2, 0)).unwrap();
        let latest = db.get_latest_weight().unwrap().unwrap();
        assert!((latest.weight_kg - 80.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_delete_weight_missing_is_error() {
        let db = Database::open_in_memory().unwrap();
        let entry = db.insert_weight(&weigh_in(80.0, 0)).unwrap();
        db.delete_weight(entry.id).unwrap();
        let err = db.delete_weight(entry.id).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}

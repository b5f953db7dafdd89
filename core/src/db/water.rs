use anyhow::Result;
use chrono::{Local, NaiveDate};
use rusqlite::params;
use uuid::Uuid;

use super::{Database, date_str};
use crate::models::{NewWaterEntry, WaterEntry, date_bucket};

impl Database {
    pub(super) fn water_from_row(row: &rusqlite::Row) -> rusqlite::Result<WaterEntry> {
        Ok(WaterEntry {
            id: row.get(0)?,
            uuid: row.get(1)?,
            amount_ml: row.get(2)?,
            logged_at: row.get(3)?,
            date: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    pub fn insert_water(&self, entry: &NewWaterEntry) -> Result<WaterEntry> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO water_entries (uuid, amount_ml, logged_at, date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                uuid,
                entry.amount_ml,
                entry.logged_at.to_rfc3339(),
                date_bucket(&entry.logged_at),
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        let entry = self.conn.query_row(
            "SELECT id, uuid, amount_ml, logged_at, date, created_at
             FROM water_entries WHERE id = ?1",
            params![id],
            Self::water_from_row,
        )?;
        Ok(entry)
    }

    pub fn delete_water(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM water_entries WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn get_water_for_date(&self, date: NaiveDate) -> Result<Vec<WaterEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, amount_ml, logged_at, date, created_at
             FROM water_entries WHERE date = ?1
             ORDER BY logged_at, id",
        )?;
        let entries = stmt
            .query_map(params![date_str(date)], Self::water_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn get_water_total(&self, date: NaiveDate) -> Result<f64> {
        let total: f64 = self.conn.query_row(
            "SELECT COALESCE(SUM(amount_ml), 0) FROM water_entries WHERE date = ?1",
            params![date_str(date)],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    pub fn get_all_water(&self) -> Result<Vec<WaterEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, amount_ml, logged_at, date, created_at
             FROM water_entries ORDER BY logged_at, id",
        )?;
        let entries = stmt
            .query_map([], Self::water_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

use anyhow::Result;
use chrono::Local;
use rusqlite::params;

use super::Database;
use crate::models::{NewScanRecord, SCAN_HISTORY_LIMIT, ScanRecord};

impl Database {
    pub(super) fn scan_from_row(row: &rusqlite::Row) -> rusqlite::Result<ScanRecord> {
        Ok(ScanRecord {
            id: row.get(0)?,
            food_name: row.get(1)?,
            category: row.get(2)?,
            confidence: row.get(3)?,
            scanned_at: row.get(4)?,
        })
    }

    /// Record a scan and drop everything beyond the most recent
    /// [`SCAN_HISTORY_LIMIT`] rows.
    pub fn insert_scan(&self, scan: &NewScanRecord) -> Result<ScanRecord> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO scan_history (food_name, category, confidence, scanned_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![scan.food_name, scan.category, scan.confidence, now],
        )?;
        let id = self.conn.last_insert_rowid();
        let record = self.conn.query_row(
            "SELECT id, food_name, category, confidence, scanned_at FROM scan_history WHERE id = ?1",
            params![id],
            Self::scan_from_row,
        )?;
        self.prune_scan_history()?;
        Ok(record)
    }

    pub(super) fn prune_scan_history(&self) -> Result<usize> {
        let removed = self.conn.execute(
            "DELETE FROM scan_history WHERE id NOT IN (
                SELECT id FROM scan_history ORDER BY scanned_at DESC, id DESC LIMIT ?1
             )",
            params![SCAN_HISTORY_LIMIT],
        )?;
        if removed > 0 {
            tracing::debug!(removed, "pruned scan history");
        }
        Ok(removed)
    }

    /// Newest first.
    pub fn get_recent_scans(&self, limit: i64) -> Result<Vec<ScanRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, food_name, category, confidence, scanned_at
             FROM scan_history ORDER BY scanned_at DESC, id DESC LIMIT ?1",
        )?;
        let scans = stmt
            .query_map(params![limit], Self::scan_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(scans)
    }

    pub fn clear_scan_history(&self) -> Result<usize> {
        let rows = self.conn.execute("DELETE FROM scan_history", [])?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(name: &str) -> NewScanRecord {
        NewScanRecord {
            food_name: name.to_string(),
            category: "fruit".to_string(),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_insert_and_recent_scans() {
        let db = Database::open_in_memory().unwrap();
        db.insert_scan(&scan("Apple")).unwrap();
        db.insert_scan(&scan("Banana")).unwrap();

        let scans = db.get_recent_scans(10).unwrap();
        assert_eq!(scans.len(), 2);
        assert_eq!(scans[0].food_name, "Banana");
        assert_eq!(db.get_recent_scans(1).unwrap().len(), 1);
    }

    #[test]
    fn test_history_capped_at_limit() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..60 {
            db.insert_scan(&scan(&format!("Food {i}"))).unwrap();
        }
        let scans = db.get_recent_scans(100).unwrap();
        assert_eq!(scans.len(), 50);
        assert_eq!(scans[0].food_name, "Food 59");
        assert_eq!(scans[49].food_name, "Food 10");
    }

    #[test]
    fn test_clear_scan_history() {
        let db = Database::open_in_memory().unwrap();
        db.insert_scan(&scan("Apple")).unwrap();
        db.insert_scan(&scan("Pear")).unwrap();
        assert_eq!(db.clear_scan_history().unwrap(), 2);
        assert!(db.get_recent_scans(10).unwrap().is_empty());
        assert_eq!(db.clear_scan_history().unwrap(), 0);
    }
}

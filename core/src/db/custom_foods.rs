use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::params;
use uuid::Uuid;

use super::{Database, like_pattern};
use crate::models::{CustomFood, NewCustomFood, UpdateCustomFood};

const CUSTOM_FOOD_COLUMNS: &str = "id, uuid, name, calories, protein_g, carbs_g, fat_g, serving_g,
     is_favorite, use_count, created_at, updated_at";

const LIST_ORDER: &str = "ORDER BY is_favorite DESC, use_count DESC, name COLLATE NOCASE";

impl Database {
    pub(super) fn custom_food_from_row(row: &rusqlite::Row) -> rusqlite::Result<CustomFood> {
        Ok(CustomFood {
            id: row.get(0)?,
            uuid: row.get(1)?,
            name: row.get(2)?,
            calories: row.get(3)?,
            protein_g: row.get(4)?,
            carbs_g: row.get(5)?,
            fat_g: row.get(6)?,
            serving_g: row.get(7)?,
            is_favorite: row.get(8)?,
            use_count: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn query_custom_foods(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<CustomFood>> {
        let sql = format!("SELECT {CUSTOM_FOOD_COLUMNS} FROM custom_foods {filter} {LIST_ORDER}");
        let mut stmt = self.conn.prepare(&sql)?;
        let foods = stmt
            .query_map(params, Self::custom_food_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    pub fn insert_custom_food(&self, food: &NewCustomFood) -> Result<CustomFood> {
        let name = food.name.trim();
        if self.get_custom_food_by_name(name)?.is_some() {
            anyhow::bail!("A custom food named '{name}' already exists");
        }
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO custom_foods (uuid, name, calories, protein_g, carbs_g, fat_g, serving_g,
                                       created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                uuid,
                name,
                food.calories,
                food.protein_g,
                food.carbs_g,
                food.fat_g,
                food.serving_g,
                now,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_custom_food(id)
    }

    pub fn get_custom_food(&self, id: i64) -> Result<CustomFood> {
        self.conn
            .query_row(
                &format!("SELECT {CUSTOM_FOOD_COLUMNS} FROM custom_foods WHERE id = ?1"),
                params![id],
                Self::custom_food_from_row,
            )
            .context("Custom food not found")
    }

    /// Case-insensitive match on the full name.
    pub fn get_custom_food_by_name(&self, name: &str) -> Result<Option<CustomFood>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CUSTOM_FOOD_COLUMNS} FROM custom_foods WHERE name = ?1 COLLATE NOCASE"
        ))?;
        let mut rows = stmt.query(params![name.trim()])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::custom_food_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Favorites first, then most used, then by name.
    pub fn list_custom_foods(&self) -> Result<Vec<CustomFood>> {
        self.query_custom_foods("", [])
    }

    pub fn search_custom_foods(&self, query: &str) -> Result<Vec<CustomFood>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.query_custom_foods("WHERE name LIKE ?1 ESCAPE '\\'", params![like_pattern(query)])
    }

    pub fn get_favorite_foods(&self) -> Result<Vec<CustomFood>> {
        self.query_custom_foods("WHERE is_favorite = 1", [])
    }

    pub fn set_favorite(&self, id: i64, favorite: bool) -> Result<CustomFood> {
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE custom_foods SET is_favorite = ?1, updated_at = ?2 WHERE id = ?3",
            params![favorite, now, id],
        )?;
        if rows == 0 {
            anyhow::bail!("Custom food not found");
        }
        self.get_custom_food(id)
    }

    pub fn toggle_favorite(&self, id: i64) -> Result<CustomFood> {
        let food = self.get_custom_food(id)?;
        self.set_favorite(id, !food.is_favorite)
    }

    pub fn increment_use_count(&self, id: i64) -> Result<()> {
        let rows = self.conn.execute(
            "UPDATE custom_foods SET use_count = use_count + 1 WHERE id = ?1",
            params![id],
        )?;
        if rows == 0 {
            anyhow::bail!("Custom food not found");
        }
        Ok(())
    }

    pub fn update_custom_food(&self, id: i64, update: &UpdateCustomFood) -> Result<CustomFood> {
        let current = self.get_custom_food(id)?;
        if let Some(ref name) = update.name {
            let name = name.trim();
            if self
                .get_custom_food_by_name(name)?
                .is_some_and(|other| other.id != id)
            {
                anyhow::bail!("A custom food named '{name}' already exists");
            }
        }

        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "UPDATE custom_foods
             SET name = ?1, calories = ?2, protein_g = ?3, carbs_g = ?4, fat_g = ?5,
                 serving_g = ?6, updated_at = ?7
             WHERE id = ?8",
            params![
                update.name.as_deref().map_or(current.name.as_str(), str::trim),
                update.calories.unwrap_or(current.calories),
                update.protein_g.unwrap_or(current.protein_g),
                update.carbs_g.unwrap_or(current.carbs_g),
                update.fat_g.unwrap_or(current.fat_g),
                update.serving_g.unwrap_or(current.serving_g),
                now,
                id,
            ],
        )?;
        self.get_custom_food(id)
    }

    pub fn delete_custom_food(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM custom_foods WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}

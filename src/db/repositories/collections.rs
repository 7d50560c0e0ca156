use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Row};

use crate::db::{helpers::format_timestamp, Database};
use crate::models::{color_for_name, Collection, DEFAULT_COLLECTION_ICON};

fn row_to_collection(row: &Row) -> Result<Collection> {
    Ok(Collection {
        id: row.get("id")?,
        name: row.get("name")?,
        icon: row.get("icon")?,
        color: row.get("color")?,
        prompt_count: row.get("prompt_count")?,
    })
}

impl Database {
    /// All collections by name, each with the number of prompts that point at it.
    pub async fn list_collections(&self) -> Result<Vec<Collection>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.name, c.icon, c.color, COUNT(p.id) AS prompt_count
                 FROM collections c
                 LEFT JOIN prompts p ON p.collection_id = c.id
                 GROUP BY c.id
                 ORDER BY c.name",
            )?;

            let mut rows = stmt.query([])?;
            let mut collections = Vec::new();
            while let Some(row) = rows.next()? {
                collections.push(row_to_collection(row)?);
            }
            Ok(collections)
        })
        .await
    }

    /// Insert a collection. Duplicate names fail with a constraint violation.
    pub async fn insert_collection(&self, name: String) -> Result<Collection> {
        self.execute(move |conn| {
            let color = color_for_name(&name);
            conn.execute(
                "INSERT INTO collections (name, icon, color, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![name, DEFAULT_COLLECTION_ICON, color, format_timestamp(Utc::now())],
            )?;

            Ok(Collection {
                id: conn.last_insert_rowid(),
                name,
                icon: DEFAULT_COLLECTION_ICON.to_string(),
                color: color.to_string(),
                prompt_count: Some(0),
            })
        })
        .await
    }
}

use anyhow::Result;
use rusqlite::params;

use crate::db::Database;
use crate::models::{Model, DEFAULT_MODELS};

impl Database {
    /// Insert the built-in generation models. Existing rows are left alone.
    pub async fn seed_default_models(&self) -> Result<()> {
        self.execute(|conn| {
            let tx = conn.transaction()?;
            for (name, short_name) in DEFAULT_MODELS {
                tx.execute(
                    "INSERT OR IGNORE INTO models (name, short_name) VALUES (?1, ?2)",
                    params![name, short_name],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn list_active_models(&self) -> Result<Vec<Model>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, short_name, is_active FROM models
                 WHERE is_active = 1
                 ORDER BY name",
            )?;
            let mut rows = stmt.query([])?;
            let mut models = Vec::new();
            while let Some(row) = rows.next()? {
                models.push(Model {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    short_name: row.get(2)?,
                    is_active: row.get(3)?,
                });
            }
            Ok(models)
        })
        .await
    }
}

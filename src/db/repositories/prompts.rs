use anyhow::{anyhow, Result};
use chrono::Utc;
use rusqlite::{params, params_from_iter, types::Value, OptionalExtension, Row};

use crate::db::{
    helpers::{contains_pattern, format_timestamp, parse_datetime},
    Database,
};
use crate::models::{NewPrompt, Prompt, PromptPatch, Tags, DEFAULT_DIMENSIONS};

const PROMPT_COLUMNS: &str = "id, title, prompt_text, negative_prompt, model, dimensions, steps,
     cfg_scale, sampler, seed, image_path, thumbnail_path, tags, is_favorite, collection_id,
     created_at, updated_at";

fn row_to_prompt(row: &Row) -> Result<Prompt> {
    let tags: Option<String> = row.get("tags")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Prompt {
        id: row.get("id")?,
        title: row.get("title")?,
        prompt_text: row.get("prompt_text")?,
        negative_prompt: row.get("negative_prompt")?,
        model: row.get("model")?,
        dimensions: row.get("dimensions")?,
        steps: row.get("steps")?,
        cfg_scale: row.get("cfg_scale")?,
        sampler: row.get("sampler")?,
        seed: row.get("seed")?,
        image_path: row.get("image_path")?,
        thumbnail_path: row.get("thumbnail_path")?,
        tags: tags.map(|raw| Tags::from_json_text(&raw)).unwrap_or_default(),
        is_favorite: row.get("is_favorite")?,
        collection_id: row.get("collection_id")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn query_prompts(
    conn: &rusqlite::Connection,
    sql: &str,
    values: Vec<Value>,
) -> Result<Vec<Prompt>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(values.iter()))?;
    let mut prompts = Vec::new();
    while let Some(row) = rows.next()? {
        prompts.push(row_to_prompt(row)?);
    }
    Ok(prompts)
}

fn select_prompt(conn: &rusqlite::Connection, id: i64) -> Result<Option<Prompt>> {
    let mut stmt = conn.prepare(&format!("SELECT {PROMPT_COLUMNS} FROM prompts WHERE id = ?1"))?;
    let mut rows = stmt.query(params![id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_prompt(row)?)),
        None => Ok(None),
    }
}

impl Database {
    /// Prompts newest first, optionally narrowed to one model and/or collection.
    pub async fn list_prompts(
        &self,
        model: Option<String>,
        collection_id: Option<i64>,
    ) -> Result<Vec<Prompt>> {
        self.execute(move |conn| {
            let mut sql = format!("SELECT {PROMPT_COLUMNS} FROM prompts WHERE 1=1");
            let mut values: Vec<Value> = Vec::new();

            if let Some(model) = model {
                sql.push_str(" AND model = ?");
                values.push(Value::from(model));
            }
            if let Some(collection_id) = collection_id {
                sql.push_str(" AND collection_id = ?");
                values.push(Value::from(collection_id));
            }
            sql.push_str(" ORDER BY created_at DESC, id DESC");

            query_prompts(conn, &sql, values)
        })
        .await
    }

    pub async fn get_prompt(&self, id: i64) -> Result<Option<Prompt>> {
        self.execute(move |conn| select_prompt(conn, id)).await
    }

    pub async fn insert_prompt(
        &self,
        draft: NewPrompt,
        image_path: Option<String>,
        thumbnail_path: Option<String>,
    ) -> Result<Prompt> {
        self.execute(move |conn| {
            let now = format_timestamp(Utc::now());
            let tags = Tags::new(&draft.tags).to_json_text();

            conn.execute(
                "INSERT INTO prompts (title, prompt_text, negative_prompt, model, dimensions, steps,
                     cfg_scale, sampler, seed, image_path, thumbnail_path, tags, collection_id,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
                params![
                    draft.title,
                    draft.prompt_text,
                    draft.negative_prompt.as_deref().unwrap_or(""),
                    draft.model,
                    draft.dimensions.as_deref().unwrap_or(DEFAULT_DIMENSIONS),
                    draft.steps,
                    draft.cfg_scale,
                    draft.sampler,
                    draft.seed,
                    image_path,
                    thumbnail_path,
                    tags,
                    draft.collection_id,
                    now,
                ],
            )?;

            let id = conn.last_insert_rowid();
            select_prompt(conn, id)?.ok_or_else(|| anyhow!("Prompt not found after insert"))
        })
        .await
    }

    /// Apply a sparse patch. Returns `None` when the prompt does not exist.
    pub async fn update_prompt(&self, id: i64, patch: PromptPatch) -> Result<Option<Prompt>> {
        self.execute(move |conn| {
            let mut updates = Vec::new();
            let mut values: Vec<Value> = Vec::new();

            let mut set = |column: &'static str, value: Value| {
                updates.push(format!("{column} = ?"));
                values.push(value);
            };

            if let Some(title) = patch.title {
                set("title", Value::from(title));
            }
            if let Some(text) = patch.prompt_text {
                set("prompt_text", Value::from(text));
            }
            if let Some(negative) = patch.negative_prompt {
                set("negative_prompt", Value::from(negative));
            }
            if let Some(model) = patch.model {
                set("model", Value::from(model));
            }
            if let Some(dimensions) = patch.dimensions {
                set("dimensions", Value::from(dimensions));
            }
            if let Some(steps) = patch.steps {
                set("steps", Value::from(steps));
            }
            if let Some(cfg_scale) = patch.cfg_scale {
                set("cfg_scale", Value::from(cfg_scale));
            }
            if let Some(sampler) = patch.sampler {
                set("sampler", Value::from(sampler));
            }
            if let Some(seed) = patch.seed {
                set("seed", Value::from(seed));
            }
            if let Some(tags) = patch.tags {
                set("tags", Value::from(Tags::new(&tags).to_json_text()));
            }
            if let Some(is_favorite) = patch.is_favorite {
                set("is_favorite", Value::from(is_favorite));
            }
            if let Some(collection_id) = patch.collection_id {
                set("collection_id", Value::from(collection_id));
            }
            set("updated_at", Value::from(format_timestamp(Utc::now())));

            values.push(Value::from(id));
            let sql = format!("UPDATE prompts SET {} WHERE id = ?", updates.join(", "));
            let rows_affected = conn.execute(&sql, params_from_iter(values.iter()))?;
            if rows_affected == 0 {
                return Ok(None);
            }

            select_prompt(conn, id)
        })
        .await
    }

    /// Delete a prompt, returning the removed record so its files can be cleaned up.
    pub async fn delete_prompt(&self, id: i64) -> Result<Option<Prompt>> {
        self.execute(move |conn| {
            let existing = select_prompt(conn, id)?;
            if existing.is_some() {
                conn.execute("DELETE FROM prompts WHERE id = ?1", params![id])?;
            }
            Ok(existing)
        })
        .await
    }

    /// Flip the favorite flag and return the stored value afterwards.
    pub async fn toggle_favorite(&self, id: i64) -> Result<Option<bool>> {
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE prompts SET is_favorite = NOT is_favorite WHERE id = ?1",
                params![id],
            )?;
            if rows_affected == 0 {
                return Ok(None);
            }
            let value = conn
                .query_row(
                    "SELECT is_favorite FROM prompts WHERE id = ?1",
                    params![id],
                    |row| row.get::<_, bool>(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
    }

    /// Case-insensitive substring match on title, prompt text and tags.
    pub async fn search_prompts(&self, query: String) -> Result<Vec<Prompt>> {
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {PROMPT_COLUMNS} FROM prompts
                 WHERE title LIKE ?1 ESCAPE '\\'
                    OR prompt_text LIKE ?1 ESCAPE '\\'
                    OR tags LIKE ?1 ESCAPE '\\'
                 ORDER BY created_at DESC, id DESC"
            );
            query_prompts(conn, &sql, vec![Value::from(contains_pattern(&query))])
        })
        .await
    }
}

use rusqlite::types::Value;
use rusqlite::Row;

use crate::config;
use crate::db::models::{Settings, UpdateSettingsInput};
use crate::db::DbPool;
use crate::error::AppError;

fn map_row(row: &Row) -> rusqlite::Result<Settings> {
    Ok(Settings {
        ai_provider_format: row.get("ai_provider_format")?,
        api_base_url: row.get("api_base_url")?,
        api_key: row.get("api_key")?,
        image_resolution: row.get("image_resolution")?,
        image_aspect_ratio: row.get("image_aspect_ratio")?,
        max_description_workers: row.get("max_description_workers")?,
        max_image_workers: row.get("max_image_workers")?,
        baidu_ocr_api_key: row.get("baidu_ocr_api_key")?,
        // Nullable on databases that predate the column; treat NULL as the
        // compiled default.
        output_language: row
            .get::<_, Option<String>>("output_language")?
            .unwrap_or_else(|| config::DEFAULT_OUTPUT_LANGUAGE.to_string()),
        mineru_token: row.get("mineru_token")?,
        image_caption_model: row.get("image_caption_model")?,
        mineru_api_base: row.get("mineru_api_base")?,
        text_model: row.get("text_model")?,
        image_model: row.get("image_model")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Fetch the settings singleton, creating the default row on first access.
/// The insert is keyed to id = 1, so repeated calls (including concurrent
/// ones) can never create a second row.
pub fn get_or_create(pool: &DbPool) -> Result<Settings, AppError> {
    let conn = pool.get()?;
    conn.execute("INSERT OR IGNORE INTO settings (id) VALUES (1)", [])?;
    let settings = conn.query_row("SELECT * FROM settings WHERE id = 1", [], map_row)?;
    Ok(settings)
}

/// Partial update of the settings singleton; returns the updated row.
pub fn update(pool: &DbPool, input: &UpdateSettingsInput) -> Result<Settings, AppError> {
    let mut sets: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    fn push(sets: &mut Vec<String>, values: &mut Vec<Value>, col: &str, value: Value) {
        values.push(value);
        sets.push(format!("{} = ?{}", col, values.len()));
    }

    fn nullable(value: &Option<String>) -> Value {
        match value {
            Some(s) => Value::Text(s.clone()),
            None => Value::Null,
        }
    }

    if let Some(v) = &input.ai_provider_format {
        push(&mut sets, &mut values, "ai_provider_format", Value::Text(v.clone()));
    }
    if let Some(v) = &input.api_base_url {
        push(&mut sets, &mut values, "api_base_url", nullable(v));
    }
    if let Some(v) = &input.api_key {
        push(&mut sets, &mut values, "api_key", nullable(v));
    }
    if let Some(v) = &input.image_resolution {
        push(&mut sets, &mut values, "image_resolution", Value::Text(v.clone()));
    }
    if let Some(v) = &input.image_aspect_ratio {
        push(&mut sets, &mut values, "image_aspect_ratio", Value::Text(v.clone()));
    }
    if let Some(v) = input.max_description_workers {
        push(&mut sets, &mut values, "max_description_workers", Value::Integer(v as i64));
    }
    if let Some(v) = input.max_image_workers {
        push(&mut sets, &mut values, "max_image_workers", Value::Integer(v as i64));
    }
    if let Some(v) = &input.baidu_ocr_api_key {
        push(&mut sets, &mut values, "baidu_ocr_api_key", nullable(v));
    }
    if let Some(v) = &input.output_language {
        push(&mut sets, &mut values, "output_language", Value::Text(v.clone()));
    }
    if let Some(v) = &input.mineru_token {
        push(&mut sets, &mut values, "mineru_token", nullable(v));
    }
    if let Some(v) = &input.image_caption_model {
        push(&mut sets, &mut values, "image_caption_model", nullable(v));
    }
    if let Some(v) = &input.mineru_api_base {
        push(&mut sets, &mut values, "mineru_api_base", nullable(v));
    }
    if let Some(v) = &input.text_model {
        push(&mut sets, &mut values, "text_model", nullable(v));
    }
    if let Some(v) = &input.image_model {
        push(&mut sets, &mut values, "image_model", nullable(v));
    }

    if sets.is_empty() {
        return get_or_create(pool);
    }

    values.push(Value::Text(chrono::Utc::now().to_rfc3339()));
    sets.push(format!("updated_at = ?{}", values.len()));

    let conn = pool.get()?;
    conn.execute("INSERT OR IGNORE INTO settings (id) VALUES (1)", [])?;
    let sql = format!("UPDATE settings SET {} WHERE id = 1", sets.join(", "));
    conn.execute(&sql, rusqlite::params_from_iter(values))?;
    drop(conn);

    get_or_create(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;

    #[test]
    fn get_or_create_is_a_singleton() {
        let pool = init_test_db().unwrap();

        let first = get_or_create(&pool).unwrap();
        assert_eq!(first.ai_provider_format, "gemini");
        assert_eq!(first.api_key, None);
        assert_eq!(first.output_language, "zh");

        for _ in 0..3 {
            get_or_create(&pool).unwrap();
        }

        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM settings", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn update_distinguishes_clear_from_unset() {
        let pool = init_test_db().unwrap();

        // Set a key.
        let input = UpdateSettingsInput {
            api_key: Some(Some("db-k".into())),
            ..Default::default()
        };
        let settings = update(&pool, &input).unwrap();
        assert_eq!(settings.api_key.as_deref(), Some("db-k"));

        // Explicitly clear it: stored as "", not NULL.
        let input = UpdateSettingsInput {
            api_key: Some(Some(String::new())),
            ..Default::default()
        };
        let settings = update(&pool, &input).unwrap();
        assert_eq!(settings.api_key.as_deref(), Some(""));

        // Reset to never-set: stored as NULL.
        let input = UpdateSettingsInput {
            api_key: Some(None),
            ..Default::default()
        };
        let settings = update(&pool, &input).unwrap();
        assert_eq!(settings.api_key, None);
    }

    #[test]
    fn update_touches_only_named_fields() {
        let pool = init_test_db().unwrap();
        let before = get_or_create(&pool).unwrap();

        let input = UpdateSettingsInput {
            max_image_workers: Some(8),
            output_language: Some("en".into()),
            ..Default::default()
        };
        let after = update(&pool, &input).unwrap();

        assert_eq!(after.max_image_workers, 8);
        assert_eq!(after.output_language, "en");
        assert_eq!(after.max_description_workers, before.max_description_workers);
        assert_eq!(after.image_resolution, before.image_resolution);
        assert_eq!(after.api_base_url, before.api_base_url);
    }

    #[test]
    fn empty_update_returns_current_row() {
        let pool = init_test_db().unwrap();
        let current = update(&pool, &UpdateSettingsInput::default()).unwrap();
        assert_eq!(current.ai_provider_format, "gemini");
    }
}

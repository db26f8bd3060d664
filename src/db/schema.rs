use rusqlite::Connection;

use crate::error::AppError;

/// Create base tables if absent. Runs before schema convergence; the
/// convergence engine only ever adds columns to an existing table.
pub fn create_all(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch(SCHEMA)?;
    tracing::info!("Database tables created/verified");
    Ok(())
}

// The settings table is a singleton row (id fixed to 1) holding every
// user-configurable runtime preference. Its column set is the union of all
// columns ever shipped; older databases converge at startup.
const SCHEMA: &str = r#"

CREATE TABLE IF NOT EXISTS settings (
    id                      INTEGER PRIMARY KEY CHECK (id = 1),
    ai_provider_format      VARCHAR(20)  NOT NULL DEFAULT 'gemini',
    api_base_url            VARCHAR(255),
    api_key                 VARCHAR(500),
    image_resolution        VARCHAR(20)  NOT NULL DEFAULT '2K',
    image_aspect_ratio      VARCHAR(10)  NOT NULL DEFAULT '16:9',
    max_description_workers INTEGER      NOT NULL DEFAULT 5,
    max_image_workers       INTEGER      NOT NULL DEFAULT 3,
    baidu_ocr_api_key       VARCHAR(500),
    output_language         VARCHAR(10)  DEFAULT 'zh',
    mineru_token            VARCHAR(500),
    image_caption_model     VARCHAR(100),
    mineru_api_base         VARCHAR(255),
    text_model              VARCHAR(100),
    image_model             VARCHAR(100),
    created_at              TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at              TEXT NOT NULL DEFAULT (datetime('now'))
);

"#;

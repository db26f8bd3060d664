//! Additive schema convergence for the settings table.
//!
//! SQLite has no `ALTER TABLE ADD COLUMN IF NOT EXISTS`, and migration
//! runners are known to hang in packaged environments, so the expected
//! column set is diffed against `pragma_table_info` in application code
//! and only the missing columns are added. Strictly additive: columns are
//! never removed, renamed, or retyped.

use std::collections::HashSet;

use rusqlite::Connection;

use crate::error::AppError;

/// One column the settings table must have. Compiled in, defined once per
/// deployed version.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub default_literal: Option<&'static str>,
}

/// Columns added after the first shipped schema. Databases created by older
/// versions converge to this list at startup.
pub const SETTINGS_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec { name: "baidu_ocr_api_key", sql_type: "VARCHAR(500)", default_literal: None },
    ColumnSpec { name: "output_language", sql_type: "VARCHAR(10)", default_literal: Some("'zh'") },
    ColumnSpec { name: "mineru_token", sql_type: "VARCHAR(500)", default_literal: None },
    ColumnSpec { name: "image_caption_model", sql_type: "VARCHAR(100)", default_literal: None },
    ColumnSpec { name: "mineru_api_base", sql_type: "VARCHAR(255)", default_literal: None },
    ColumnSpec { name: "text_model", sql_type: "VARCHAR(100)", default_literal: None },
    ColumnSpec { name: "image_model", sql_type: "VARCHAR(100)", default_literal: None },
];

/// Bring the settings table's columns up to a superset of `SETTINGS_COLUMNS`.
///
/// Each missing column is added in its own transaction; a single column
/// failing rolls back only that attempt, logs a warning, and the remaining
/// columns are still applied. The only propagating error is the schema
/// observation itself failing (table missing or unreadable) — base table
/// creation is the collaborator's job, not this engine's.
pub fn converge(conn: &mut Connection) -> Result<(), AppError> {
    converge_table(conn, "settings", SETTINGS_COLUMNS)
}

fn converge_table(
    conn: &mut Connection,
    table: &str,
    specs: &[ColumnSpec],
) -> Result<(), AppError> {
    let observed = observed_columns(conn, table)?;
    if observed.is_empty() {
        return Err(AppError::Internal(format!(
            "table '{}' does not exist; base schema must be created first",
            table
        )));
    }

    let missing: Vec<&ColumnSpec> = specs
        .iter()
        .filter(|spec| !observed.contains(spec.name))
        .collect();

    if missing.is_empty() {
        tracing::debug!(table, "Schema already converged");
        return Ok(());
    }

    for spec in missing {
        match add_column(conn, table, spec) {
            Ok(()) => tracing::info!(table, column = spec.name, "Added missing column"),
            Err(e) => {
                tracing::warn!(table, column = spec.name, "Could not add column: {}", e)
            }
        }
    }

    Ok(())
}

/// Column names currently present on the table.
fn observed_columns(conn: &Connection, table: &str) -> Result<HashSet<String>, AppError> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let names = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(names)
}

fn add_column(conn: &mut Connection, table: &str, spec: &ColumnSpec) -> Result<(), AppError> {
    let mut ddl = format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        table, spec.name, spec.sql_type
    );
    if let Some(default) = spec.default_literal {
        ddl.push_str(" DEFAULT ");
        ddl.push_str(default);
    }

    let tx = conn.transaction()?;
    tx.execute_batch(&ddl)?;
    tx.commit()?;
    Ok(())
}

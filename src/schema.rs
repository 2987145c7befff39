use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::GrayMatchError;

pub const SCHEMA_VERSION: i64 = 1;

pub fn ensure_schema(conn: &Connection) -> Result<(), GrayMatchError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS gm_meta (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS gm_vertices (
            id    INTEGER PRIMARY KEY,
            seq   INTEGER NOT NULL,
            label TEXT,
            props TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS gm_edges (
            id       INTEGER PRIMARY KEY AUTOINCREMENT,
            src      INTEGER NOT NULL,
            dst      INTEGER NOT NULL,
            key      INTEGER NOT NULL,
            label    TEXT,
            kind     TEXT NOT NULL,
            added_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_gm_edges_src ON gm_edges(src);
        CREATE INDEX IF NOT EXISTS idx_gm_edges_dst ON gm_edges(dst);
        CREATE INDEX IF NOT EXISTS idx_gm_edges_added ON gm_edges(added_at);
        CREATE INDEX IF NOT EXISTS idx_gm_vertices_label ON gm_vertices(label);
        "#,
    )
    .map_err(|e| GrayMatchError::storage(format!("schema: {e}")))?;
    let version = read_meta(conn, "schema_version")?;
    match version.as_deref() {
        None => write_meta(conn, "schema_version", &SCHEMA_VERSION.to_string()),
        Some(v) if v == SCHEMA_VERSION.to_string() => Ok(()),
        Some(other) => Err(GrayMatchError::storage(format!(
            "unsupported schema version {other}"
        ))),
    }
}

pub fn read_meta(conn: &Connection, key: &str) -> Result<Option<String>, GrayMatchError> {
    Ok(conn
        .query_row(
            "SELECT value FROM gm_meta WHERE key=?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?)
}

pub fn write_meta(conn: &Connection, key: &str, value: &str) -> Result<(), GrayMatchError> {
    conn.execute(
        "INSERT INTO gm_meta(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

//! Database schema migrations.
//!
//! Applies the initial schema: users, favorites, search_history,
//! conversations, offtopic_tracker, and the schema_migrations table.

use rusqlite::Connection;
use tracing::info;

use jobscout_core::error::JobscoutError;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future
/// migrations can be added by checking the current version and applying
/// incremental changes.
pub fn run_migrations(conn: &Connection) -> Result<(), JobscoutError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| JobscoutError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| JobscoutError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), JobscoutError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            user_id      INTEGER PRIMARY KEY NOT NULL,
            username     TEXT,
            first_name   TEXT,
            last_name    TEXT,
            created_at   INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            last_active  INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            search_count INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS favorites (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id      INTEGER NOT NULL,
            vacancy_id   TEXT NOT NULL,
            vacancy_name TEXT NOT NULL DEFAULT '',
            company_name TEXT NOT NULL DEFAULT '',
            salary       TEXT NOT NULL DEFAULT '',
            location     TEXT NOT NULL DEFAULT '',
            url          TEXT NOT NULL DEFAULT '',
            added_at     INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            FOREIGN KEY (user_id) REFERENCES users (user_id),
            UNIQUE (user_id, vacancy_id)
        );

        CREATE INDEX IF NOT EXISTS idx_favorites_user
            ON favorites (user_id, added_at DESC);

        CREATE TABLE IF NOT EXISTS search_history (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id       INTEGER NOT NULL,
            search_query  TEXT NOT NULL DEFAULT '',
            search_params TEXT NOT NULL DEFAULT '{}',
            results_count INTEGER NOT NULL DEFAULT 0,
            searched_at   INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            FOREIGN KEY (user_id) REFERENCES users (user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_search_history_user
            ON search_history (user_id, searched_at DESC);

        CREATE TABLE IF NOT EXISTS conversations (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id    INTEGER NOT NULL,
            role       TEXT NOT NULL
                       CHECK (role IN ('user', 'assistant')),
            content    TEXT NOT NULL,
            created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            FOREIGN KEY (user_id) REFERENCES users (user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_user
            ON conversations (user_id, id DESC);

        CREATE TABLE IF NOT EXISTS offtopic_tracker (
            user_id              INTEGER PRIMARY KEY NOT NULL,
            offtopic_count       INTEGER NOT NULL DEFAULT 0,
            consecutive_offtopic INTEGER NOT NULL DEFAULT 0,
            last_reset           INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            FOREIGN KEY (user_id) REFERENCES users (user_id)
        );

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| JobscoutError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}

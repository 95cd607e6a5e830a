//! Repository implementations for SQLite-backed persistence.
//!
//! Provides user, favorite, search-history, conversation, and off-topic
//! tracker repositories that operate on the Database struct using raw
//! SQL.

use std::sync::Arc;

use rusqlite::OptionalExtension;
use tracing::debug;

use jobscout_core::error::JobscoutError;
use jobscout_core::types::{ChatRole, ChatTurn};

use crate::db::Database;

/// Stored user profile.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: i64,
    pub last_active: i64,
    pub search_count: i64,
}

/// Denormalized favorite snapshot, captured at add time.
#[derive(Debug, Clone)]
pub struct FavoriteRow {
    pub vacancy_id: String,
    pub vacancy_name: String,
    pub company_name: String,
    pub salary: String,
    pub location: String,
    pub url: String,
    pub added_at: i64,
}

/// One search-history entry.
#[derive(Debug, Clone)]
pub struct SearchHistoryRow {
    pub search_query: String,
    pub search_params: String,
    pub results_count: i64,
    pub searched_at: i64,
}

/// Off-topic counters for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerRow {
    pub total: u32,
    pub consecutive: u32,
    pub last_reset: i64,
}

/// Outcome of a favorite insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteAdd {
    Added,
    AlreadyPresent,
}

// =============================================================================
// UserRepository
// =============================================================================

/// Repository for user profiles.
pub struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a user or refresh the profile fields and last-active time.
    pub fn upsert(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<(), JobscoutError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (user_id, username, first_name, last_name)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                     username = excluded.username,
                     first_name = excluded.first_name,
                     last_name = excluded.last_name,
                     last_active = strftime('%s', 'now')",
                rusqlite::params![user_id, username, first_name, last_name],
            )
            .map_err(|e| JobscoutError::Storage(format!("Failed to upsert user: {}", e)))?;
            Ok(())
        })
    }

    /// Ensure the user row exists and refresh last-active, leaving any
    /// stored profile fields untouched.
    pub fn touch(&self, user_id: i64) -> Result<(), JobscoutError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (user_id) VALUES (?1)
                 ON CONFLICT(user_id) DO UPDATE SET
                     last_active = strftime('%s', 'now')",
                rusqlite::params![user_id],
            )
            .map_err(|e| JobscoutError::Storage(format!("Failed to touch user: {}", e)))?;
            Ok(())
        })
    }

    pub fn get(&self, user_id: i64) -> Result<Option<UserRow>, JobscoutError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT user_id, username, first_name, last_name, created_at, last_active, search_count
                 FROM users WHERE user_id = ?1",
                rusqlite::params![user_id],
                |row| {
                    Ok(UserRow {
                        user_id: row.get(0)?,
                        username: row.get(1)?,
                        first_name: row.get(2)?,
                        last_name: row.get(3)?,
                        created_at: row.get(4)?,
                        last_active: row.get(5)?,
                        search_count: row.get(6)?,
                    })
                },
            )
            .optional()
            .map_err(|e| JobscoutError::Storage(e.to_string()))
        })
    }

    /// Bump the per-user search counter and last-active time.
    pub fn bump_search_count(&self, user_id: i64) -> Result<(), JobscoutError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE users
                 SET search_count = search_count + 1,
                     last_active = strftime('%s', 'now')
                 WHERE user_id = ?1",
                rusqlite::params![user_id],
            )
            .map_err(|e| JobscoutError::Storage(e.to_string()))?;
            Ok(())
        })
    }
}

// =============================================================================
// FavoriteRepository
// =============================================================================

/// Repository for favorite vacancies.
pub struct FavoriteRepository {
    db: Arc<Database>,
}

impl FavoriteRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Add a favorite with its snapshot.
    ///
    /// Duplicate (user, vacancy) pairs report `AlreadyPresent` and leave
    /// the stored snapshot untouched.
    pub fn add(&self, user_id: i64, row: &FavoriteRow) -> Result<FavoriteAdd, JobscoutError> {
        self.db.with_conn(|conn| {
            let result = conn.execute(
                "INSERT INTO favorites (user_id, vacancy_id, vacancy_name, company_name,
                                        salary, location, url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    user_id,
                    row.vacancy_id,
                    row.vacancy_name,
                    row.company_name,
                    row.salary,
                    row.location,
                    row.url,
                ],
            );
            match result {
                Ok(_) => Ok(FavoriteAdd::Added),
                Err(e) if is_unique_violation(&e) => {
                    debug!(user_id, vacancy_id = %row.vacancy_id, "Favorite already present");
                    Ok(FavoriteAdd::AlreadyPresent)
                }
                Err(e) => Err(JobscoutError::Storage(format!(
                    "Failed to add favorite: {}",
                    e
                ))),
            }
        })
    }

    /// Remove a favorite. Returns whether a row was deleted.
    pub fn remove(&self, user_id: i64, vacancy_id: &str) -> Result<bool, JobscoutError> {
        self.db.with_conn(|conn| {
            let affected = conn
                .execute(
                    "DELETE FROM favorites WHERE user_id = ?1 AND vacancy_id = ?2",
                    rusqlite::params![user_id, vacancy_id],
                )
                .map_err(|e| JobscoutError::Storage(e.to_string()))?;
            Ok(affected > 0)
        })
    }

    /// Favorites for a user, most recently added first.
    pub fn list(&self, user_id: i64, limit: u32) -> Result<Vec<FavoriteRow>, JobscoutError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT vacancy_id, vacancy_name, company_name, salary, location, url, added_at
                     FROM favorites
                     WHERE user_id = ?1
                     ORDER BY added_at DESC, id DESC
                     LIMIT ?2",
                )
                .map_err(|e| JobscoutError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], |row| {
                    Ok(FavoriteRow {
                        vacancy_id: row.get(0)?,
                        vacancy_name: row.get(1)?,
                        company_name: row.get(2)?,
                        salary: row.get(3)?,
                        location: row.get(4)?,
                        url: row.get(5)?,
                        added_at: row.get(6)?,
                    })
                })
                .map_err(|e| JobscoutError::Storage(e.to_string()))?;

            let mut favorites = Vec::new();
            for row in rows {
                favorites.push(row.map_err(|e| JobscoutError::Storage(e.to_string()))?);
            }
            Ok(favorites)
        })
    }

    pub fn contains(&self, user_id: i64, vacancy_id: &str) -> Result<bool, JobscoutError> {
        self.db.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM favorites WHERE user_id = ?1 AND vacancy_id = ?2",
                    rusqlite::params![user_id, vacancy_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| JobscoutError::Storage(e.to_string()))?;
            Ok(found.is_some())
        })
    }

    pub fn count(&self, user_id: i64) -> Result<u64, JobscoutError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM favorites WHERE user_id = ?1",
                    rusqlite::params![user_id],
                    |row| row.get(0),
                )
                .map_err(|e| JobscoutError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(rusqlite::ErrorCode::ConstraintViolation)
    )
}

// =============================================================================
// SearchHistoryRepository
// =============================================================================

/// Repository for the append-only search history.
pub struct SearchHistoryRepository {
    db: Arc<Database>,
}

impl SearchHistoryRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn append(
        &self,
        user_id: i64,
        query: &str,
        params_json: &str,
        results_count: u32,
    ) -> Result<(), JobscoutError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO search_history (user_id, search_query, search_params, results_count)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![user_id, query, params_json, results_count],
            )
            .map_err(|e| JobscoutError::Storage(format!("Failed to append history: {}", e)))?;
            Ok(())
        })
    }

    /// Most recent searches, newest first.
    pub fn recent(&self, user_id: i64, limit: u32) -> Result<Vec<SearchHistoryRow>, JobscoutError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT search_query, search_params, results_count, searched_at
                     FROM search_history
                     WHERE user_id = ?1
                     ORDER BY searched_at DESC, id DESC
                     LIMIT ?2",
                )
                .map_err(|e| JobscoutError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], |row| {
                    Ok(SearchHistoryRow {
                        search_query: row.get(0)?,
                        search_params: row.get(1)?,
                        results_count: row.get(2)?,
                        searched_at: row.get(3)?,
                    })
                })
                .map_err(|e| JobscoutError::Storage(e.to_string()))?;

            let mut history = Vec::new();
            for row in rows {
                history.push(row.map_err(|e| JobscoutError::Storage(e.to_string()))?);
            }
            Ok(history)
        })
    }
}

// =============================================================================
// ConversationRepository
// =============================================================================

/// Repository for the per-user conversation history.
pub struct ConversationRepository {
    db: Arc<Database>,
}

impl ConversationRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn append(&self, user_id: i64, role: ChatRole, content: &str) -> Result<(), JobscoutError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conversations (user_id, role, content) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, role.as_str(), content],
            )
            .map_err(|e| JobscoutError::Storage(format!("Failed to append message: {}", e)))?;
            Ok(())
        })
    }

    /// Store a user message and the assistant's reply as one exchange.
    pub fn append_exchange(
        &self,
        user_id: i64,
        user_message: &str,
        assistant_reply: &str,
    ) -> Result<(), JobscoutError> {
        self.append(user_id, ChatRole::User, user_message)?;
        self.append(user_id, ChatRole::Assistant, assistant_reply)
    }

    /// The most recent `limit` turns, in chronological order.
    pub fn recent(&self, user_id: i64, limit: u32) -> Result<Vec<ChatTurn>, JobscoutError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT role, content FROM conversations
                     WHERE user_id = ?1
                     ORDER BY id DESC
                     LIMIT ?2",
                )
                .map_err(|e| JobscoutError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], |row| {
                    let role: String = row.get(0)?;
                    let content: String = row.get(1)?;
                    Ok((role, content))
                })
                .map_err(|e| JobscoutError::Storage(e.to_string()))?;

            let mut turns = Vec::new();
            for row in rows {
                let (role, content) = row.map_err(|e| JobscoutError::Storage(e.to_string()))?;
                let role = ChatRole::parse(&role).ok_or_else(|| {
                    JobscoutError::Storage(format!("unknown conversation role: {}", role))
                })?;
                turns.push(ChatTurn { role, content });
            }
            // Newest-first from the query; callers want chronological.
            turns.reverse();
            Ok(turns)
        })
    }

    /// Delete the whole conversation history for a user.
    pub fn clear(&self, user_id: i64) -> Result<(), JobscoutError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM conversations WHERE user_id = ?1",
                rusqlite::params![user_id],
            )
            .map_err(|e| JobscoutError::Storage(e.to_string()))?;
            Ok(())
        })
    }
}

// =============================================================================
// OfftopicRepository
// =============================================================================

/// Repository for the off-topic drift tracker.
pub struct OfftopicRepository {
    db: Arc<Database>,
}

impl OfftopicRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn get(&self, user_id: i64) -> Result<Option<TrackerRow>, JobscoutError> {
        self.db.with_conn(|conn| Self::get_inner(conn, user_id))
    }

    fn get_inner(
        conn: &rusqlite::Connection,
        user_id: i64,
    ) -> Result<Option<TrackerRow>, JobscoutError> {
        conn.query_row(
            "SELECT offtopic_count, consecutive_offtopic, last_reset
             FROM offtopic_tracker WHERE user_id = ?1",
            rusqlite::params![user_id],
            |row| {
                Ok(TrackerRow {
                    total: row.get::<_, i64>(0)? as u32,
                    consecutive: row.get::<_, i64>(1)? as u32,
                    last_reset: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(|e| JobscoutError::Storage(e.to_string()))
    }

    /// Increment both counters and return the new state.
    pub fn increment(&self, user_id: i64) -> Result<TrackerRow, JobscoutError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO offtopic_tracker (user_id, offtopic_count, consecutive_offtopic)
                 VALUES (?1, 1, 1)
                 ON CONFLICT(user_id) DO UPDATE SET
                     offtopic_count = offtopic_count + 1,
                     consecutive_offtopic = consecutive_offtopic + 1",
                rusqlite::params![user_id],
            )
            .map_err(|e| JobscoutError::Storage(format!("Failed to increment tracker: {}", e)))?;

            Self::get_inner(conn, user_id)?.ok_or_else(|| {
                JobscoutError::Storage("tracker row missing after increment".to_string())
            })
        })
    }

    /// Zero the consecutive counter, leaving the total untouched.
    pub fn reset_consecutive(&self, user_id: i64) -> Result<(), JobscoutError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE offtopic_tracker SET consecutive_offtopic = 0 WHERE user_id = ?1",
                rusqlite::params![user_id],
            )
            .map_err(|e| JobscoutError::Storage(e.to_string()))?;
            Ok(())
        })
    }

    /// Zero both counters and stamp the reset time.
    pub fn reset(&self, user_id: i64) -> Result<(), JobscoutError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO offtopic_tracker (user_id, offtopic_count, consecutive_offtopic)
                 VALUES (?1, 0, 0)
                 ON CONFLICT(user_id) DO UPDATE SET
                     offtopic_count = 0,
                     consecutive_offtopic = 0,
                     last_reset = strftime('%s', 'now')",
                rusqlite::params![user_id],
            )
            .map_err(|e| JobscoutError::Storage(e.to_string()))?;
            Ok(())
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

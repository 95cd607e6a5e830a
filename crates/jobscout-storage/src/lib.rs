//! SQLite persistence for jobscout.
//!
//! Stores user profiles, favorites, search history, conversation
//! history, and the off-topic tracker. Session state is deliberately
//! not persisted; it lives in memory for the process lifetime.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{
    ConversationRepository, FavoriteAdd, FavoriteRepository, FavoriteRow, OfftopicRepository,
    SearchHistoryRepository, SearchHistoryRow, TrackerRow, UserRepository, UserRow,
};

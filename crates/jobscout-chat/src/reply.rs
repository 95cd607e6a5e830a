//! Structured interaction outcomes.
//!
//! The engine never renders text markup; it hands these values to the
//! delivery layer, which owns presentation.

use jobscout_core::types::Vacancy;
use jobscout_storage::FavoriteRow;

/// A vacancy plus the per-user favorite flag for rendering.
#[derive(Debug, Clone)]
pub struct VacancyCard {
    pub vacancy: Vacancy,
    pub is_favorite: bool,
}

/// One page of search results with its position summary.
#[derive(Debug, Clone)]
pub struct VacancyPage {
    pub query: String,
    /// Total matched upstream, not the retrieved count.
    pub total_found: u32,
    pub page: usize,
    pub total_pages: usize,
    pub cards: Vec<VacancyCard>,
}

/// Which end of the ranking a selection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankKind {
    Best,
    Worst,
}

/// Ranked subset of the current results with the model's rationale.
#[derive(Debug, Clone)]
pub struct RankedSelection {
    pub kind: RankKind,
    pub query: String,
    pub rationale: String,
    pub cards: Vec<VacancyCard>,
}

/// Per-user activity summary.
#[derive(Debug, Clone)]
pub struct UserStats {
    pub first_name: Option<String>,
    pub search_count: i64,
    pub favorites_count: u64,
    pub member_since: i64,
    pub recent_queries: Vec<String>,
}

/// What one interaction produced.
#[derive(Debug, Clone)]
pub enum Reply {
    /// A command or menu label; the delivery layer dispatches it.
    Bypass,
    /// Plain text answer.
    Text(String),
    /// A page of vacancies.
    Page(VacancyPage),
    /// Best/worst selection over the current session.
    Ranked(RankedSelection),
    /// The user's saved favorites.
    Favorites(Vec<FavoriteRow>),
    /// Profile counters and recent queries.
    Stats(UserStats),
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Reply::Text(content.into())
    }
}

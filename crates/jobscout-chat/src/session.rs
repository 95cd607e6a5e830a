//! Per-user search sessions with pagination and cached analysis.
//!
//! Purely in-memory, process-lifetime state. One live session per user;
//! creating a new one silently replaces the previous.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::debug;

use jobscout_core::types::{SearchParams, Vacancy};

/// Cached best/worst analysis attached to a session.
#[derive(Debug, Clone)]
pub struct RankedAnalysis {
    /// Indices into the session's result list, best (or worst) first.
    pub indices: Vec<usize>,
    pub rationale: String,
    pub created_at: DateTime<Utc>,
}

/// The most recent search of one user.
#[derive(Debug, Clone)]
pub struct SearchSession {
    pub user_id: i64,
    pub query: String,
    pub results: Vec<Vacancy>,
    /// Total matched upstream; may exceed `results.len()`.
    pub total_found: u32,
    pub params: SearchParams,
    page_size: usize,
    page: usize,
    pub best: Option<RankedAnalysis>,
    pub worst: Option<RankedAnalysis>,
}

impl SearchSession {
    fn new(
        user_id: i64,
        query: String,
        results: Vec<Vacancy>,
        total_found: u32,
        params: SearchParams,
        page_size: usize,
    ) -> Self {
        Self {
            user_id,
            query,
            results,
            total_found,
            params,
            page_size: page_size.max(1),
            page: 0,
            best: None,
            worst: None,
        }
    }

    pub fn current_page(&self) -> usize {
        self.page
    }

    /// `ceil(results / page_size)`.
    pub fn total_pages(&self) -> usize {
        self.results.len().div_ceil(self.page_size)
    }

    fn page_slice(&self, page: usize) -> &[Vacancy] {
        let start = page * self.page_size;
        let end = (start + self.page_size).min(self.results.len());
        if start >= self.results.len() {
            &[]
        } else {
            &self.results[start..end]
        }
    }

    /// Move to `page` if it is in range; out-of-range requests leave the
    /// cursor unchanged. Returns the items of the resulting page.
    pub fn set_page(&mut self, page: usize) -> &[Vacancy] {
        if page < self.total_pages() {
            self.page = page;
        }
        self.page_slice(self.page)
    }

    pub fn next_page(&mut self) -> &[Vacancy] {
        if self.page + 1 < self.total_pages() {
            self.page += 1;
        }
        self.page_slice(self.page)
    }

    pub fn prev_page(&mut self) -> &[Vacancy] {
        if self.page > 0 {
            self.page -= 1;
        }
        self.page_slice(self.page)
    }
}

/// Snapshot of one result page, cloned out of the store.
#[derive(Debug, Clone)]
pub struct PageView {
    pub query: String,
    pub total_found: u32,
    pub page: usize,
    pub total_pages: usize,
    pub items: Vec<Vacancy>,
}

/// Holds the live session of every user.
///
/// Same-user access is last-write-wins: a second in-flight search
/// replaces the session, it does not merge or queue.
pub struct SessionStore {
    sessions: Mutex<HashMap<i64, SearchSession>>,
    page_size: usize,
}

impl SessionStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            page_size: page_size.max(1),
        }
    }

    /// Create (or replace) the session for a user.
    pub fn create(
        &self,
        user_id: i64,
        query: impl Into<String>,
        results: Vec<Vacancy>,
        total_found: u32,
        params: SearchParams,
    ) {
        let session = SearchSession::new(
            user_id,
            query.into(),
            results,
            total_found,
            params,
            self.page_size,
        );
        debug!(user_id, results = session.results.len(), "Search session created");
        self.lock().insert(user_id, session);
    }

    pub fn exists(&self, user_id: i64) -> bool {
        self.lock().contains_key(&user_id)
    }

    pub fn query(&self, user_id: i64) -> Option<String> {
        self.lock().get(&user_id).map(|s| s.query.clone())
    }

    /// Clone of the full result list.
    pub fn results(&self, user_id: i64) -> Option<Vec<Vacancy>> {
        self.lock().get(&user_id).map(|s| s.results.clone())
    }

    /// Run a closure against the user's session, if any.
    pub fn with_session<T>(
        &self,
        user_id: i64,
        f: impl FnOnce(&mut SearchSession) -> T,
    ) -> Option<T> {
        self.lock().get_mut(&user_id).map(f)
    }

    pub fn set_page(&self, user_id: i64, page: usize) -> Option<PageView> {
        self.with_session(user_id, |session| {
            session.set_page(page);
            view_of(session)
        })
    }

    pub fn next_page(&self, user_id: i64) -> Option<PageView> {
        self.with_session(user_id, |session| {
            session.next_page();
            view_of(session)
        })
    }

    pub fn prev_page(&self, user_id: i64) -> Option<PageView> {
        self.with_session(user_id, |session| {
            session.prev_page();
            view_of(session)
        })
    }

    pub fn current_page(&self, user_id: i64) -> Option<PageView> {
        self.with_session(user_id, |session| view_of(session))
    }

    pub fn total_pages(&self, user_id: i64) -> Option<usize> {
        self.lock().get(&user_id).map(|s| s.total_pages())
    }

    pub fn cache_best(&self, user_id: i64, analysis: RankedAnalysis) {
        self.with_session(user_id, |s| s.best = Some(analysis));
    }

    pub fn cache_worst(&self, user_id: i64, analysis: RankedAnalysis) {
        self.with_session(user_id, |s| s.worst = Some(analysis));
    }

    pub fn cached_best(&self, user_id: i64) -> Option<RankedAnalysis> {
        self.lock().get(&user_id).and_then(|s| s.best.clone())
    }

    pub fn cached_worst(&self, user_id: i64) -> Option<RankedAnalysis> {
        self.lock().get(&user_id).and_then(|s| s.worst.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<i64, SearchSession>> {
        // A poisoned session map is unrecoverable in-process state; the
        // panic that poisoned it has already torn the task down.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn view_of(session: &SearchSession) -> PageView {
    PageView {
        query: session.query.clone(),
        total_found: session.total_found,
        page: session.current_page(),
        total_pages: session.total_pages(),
        items: session.page_slice(session.current_page()).to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vacancy(id: usize) -> Vacancy {
        Vacancy {
            id: id.to_string(),
            name: format!("vacancy {}", id),
            ..Vacancy::default()
        }
    }

    fn vacancies(n: usize) -> Vec<Vacancy> {
        (0..n).map(vacancy).collect()
    }

    fn store_with(n: usize, page_size: usize) -> SessionStore {
        let store = SessionStore::new(page_size);
        store.create(1, "python", vacancies(n), n as u32, SearchParams::default());
        store
    }

    // ---- Pagination arithmetic ----

    #[test]
    fn test_total_pages_is_ceiling() {
        assert_eq!(store_with(7, 3).total_pages(1), Some(3));
        assert_eq!(store_with(6, 3).total_pages(1), Some(2));
        assert_eq!(store_with(1, 3).total_pages(1), Some(1));
        assert_eq!(store_with(0, 3).total_pages(1), Some(0));
    }

    #[test]
    fn test_page_slices() {
        let store = store_with(7, 3);
        let view = store.set_page(1, 0).unwrap();
        assert_eq!(view.items.len(), 3);
        assert_eq!(view.items[0].id, "0");

        let view = store.set_page(1, 2).unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].id, "6");
        assert_eq!(view.page, 2);
    }

    #[test]
    fn test_set_page_out_of_range_is_noop() {
        let store = store_with(7, 3);
        store.set_page(1, 1).unwrap();

        let before = store.current_page(1).unwrap();
        let after = store.set_page(1, 99).unwrap();

        assert_eq!(after.page, before.page);
        assert_eq!(
            after.items.iter().map(|v| &v.id).collect::<Vec<_>>(),
            before.items.iter().map(|v| &v.id).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_next_and_prev_clamp_at_bounds() {
        let store = store_with(5, 3);

        let view = store.prev_page(1).unwrap();
        assert_eq!(view.page, 0);

        let view = store.next_page(1).unwrap();
        assert_eq!(view.page, 1);

        // Already on the last page.
        let view = store.next_page(1).unwrap();
        assert_eq!(view.page, 1);
    }

    // ---- Session lifecycle ----

    #[test]
    fn test_create_replaces_previous_session() {
        let store = store_with(5, 3);
        store.set_page(1, 1).unwrap();

        store.create(1, "rust", vacancies(2), 2, SearchParams::default());

        let view = store.current_page(1).unwrap();
        assert_eq!(view.query, "rust");
        assert_eq!(view.page, 0);
        assert_eq!(view.items.len(), 2);
    }

    #[test]
    fn test_sessions_are_per_user() {
        let store = store_with(5, 3);
        store.create(2, "qa", vacancies(1), 1, SearchParams::default());

        store.set_page(2, 0).unwrap();
        assert_eq!(store.query(1).as_deref(), Some("python"));
        assert_eq!(store.query(2).as_deref(), Some("qa"));
    }

    #[test]
    fn test_missing_session() {
        let store = SessionStore::new(3);
        assert!(!store.exists(5));
        assert!(store.set_page(5, 0).is_none());
        assert!(store.results(5).is_none());
        assert!(store.total_pages(5).is_none());
    }

    #[test]
    fn test_total_found_can_exceed_results() {
        let store = SessionStore::new(3);
        store.create(1, "python", vacancies(5), 1342, SearchParams::default());
        let view = store.current_page(1).unwrap();
        assert_eq!(view.total_found, 1342);
        assert_eq!(view.total_pages, 2);
    }

    // ---- Analysis cache ----

    #[test]
    fn test_analysis_cache_round_trip() {
        let store = store_with(5, 3);
        assert!(store.cached_best(1).is_none());

        store.cache_best(
            1,
            RankedAnalysis {
                indices: vec![2, 0],
                rationale: "объяснение".to_string(),
                created_at: Utc::now(),
            },
        );

        let cached = store.cached_best(1).unwrap();
        assert_eq!(cached.indices, vec![2, 0]);
        assert!(store.cached_worst(1).is_none());
    }

    #[test]
    fn test_new_session_drops_cached_analysis() {
        let store = store_with(5, 3);
        store.cache_best(
            1,
            RankedAnalysis {
                indices: vec![0],
                rationale: String::new(),
                created_at: Utc::now(),
            },
        );

        store.create(1, "rust", vacancies(2), 2, SearchParams::default());
        assert!(store.cached_best(1).is_none());
    }

    #[test]
    fn test_zero_page_size_clamped() {
        let store = SessionStore::new(0);
        store.create(1, "q", vacancies(2), 2, SearchParams::default());
        assert_eq!(store.total_pages(1), Some(2));
    }
}

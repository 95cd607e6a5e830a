//! End-to-end tests for the chat engine against an in-memory database,
//! a fake vacancy source, and a scripted completion backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use jobscout_areas::AreaIndex;
use jobscout_chat::{ChatEngine, ChatError, RankKind, Reply};
use jobscout_core::config::JobscoutConfig;
use jobscout_core::types::{Experience, SearchParams, Vacancy};
use jobscout_core::JobscoutError;
use jobscout_listings::{AreaNode, SearchPage, VacancySource};
use jobscout_llm::{CompletionBackend, CompletionService, MockBackend};
use jobscout_storage::{Database, FavoriteAdd, OfftopicRepository};

const USER: i64 = 100;

// =============================================================================
// Fakes
// =============================================================================

#[derive(Default)]
struct FakeListings {
    page: Mutex<SearchPage>,
    vacancies: Mutex<HashMap<String, Vacancy>>,
    fail_search: Mutex<bool>,
    requests: Mutex<Vec<SearchParams>>,
}

impl FakeListings {
    fn with_results(items: Vec<Vacancy>, found: u32) -> Arc<Self> {
        let fake = Self::default();
        *fake.page.lock().unwrap() = SearchPage { items, found };
        Arc::new(fake)
    }

    fn add_vacancy(&self, vacancy: Vacancy) {
        self.vacancies
            .lock()
            .unwrap()
            .insert(vacancy.id.clone(), vacancy);
    }

    fn last_request(&self) -> SearchParams {
        self.requests.lock().unwrap().last().cloned().expect("a search request")
    }
}

#[async_trait]
impl VacancySource for FakeListings {
    async fn search(&self, params: &SearchParams) -> jobscout_core::Result<SearchPage> {
        self.requests.lock().unwrap().push(params.clone());
        if *self.fail_search.lock().unwrap() {
            return Err(JobscoutError::Listings("HTTP 503".into()));
        }
        Ok(self.page.lock().unwrap().clone())
    }

    async fn vacancy(&self, id: &str) -> jobscout_core::Result<Vacancy> {
        self.vacancies
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| JobscoutError::NotFound(format!("vacancy {}", id)))
    }

    async fn areas(&self) -> jobscout_core::Result<Vec<AreaNode>> {
        Ok(area_tree())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn leaf(id: &str, name: &str) -> AreaNode {
    AreaNode {
        id: id.to_string(),
        name: name.to_string(),
        areas: vec![],
    }
}

fn area_tree() -> Vec<AreaNode> {
    vec![AreaNode {
        id: "113".to_string(),
        name: "Россия".to_string(),
        areas: vec![
            leaf("1", "Москва"),
            leaf("2", "Санкт-Петербург"),
            leaf("88", "Казань"),
        ],
    }]
}

fn vacancy(id: usize) -> Vacancy {
    Vacancy {
        id: id.to_string(),
        name: format!("Vacancy {}", id),
        alternate_url: format!("https://example.com/vacancy/{}", id),
        ..Vacancy::default()
    }
}

fn vacancies(n: usize) -> Vec<Vacancy> {
    (0..n).map(vacancy).collect()
}

struct Setup {
    engine: ChatEngine,
    listings: Arc<FakeListings>,
    backend: Arc<MockBackend>,
    db: Arc<Database>,
}

fn setup(items: usize, with_llm: bool) -> Setup {
    let listings = FakeListings::with_results(vacancies(items), items as u32);
    let backend = Arc::new(MockBackend::new());
    let db = Arc::new(Database::in_memory().unwrap());

    let areas = Arc::new(AreaIndex::new());
    areas.build(&area_tree());

    let completions = with_llm.then(|| {
        CompletionService::new(Arc::clone(&backend) as Arc<dyn CompletionBackend>)
    });

    let engine = ChatEngine::new(
        &JobscoutConfig::default(),
        Arc::clone(&listings) as Arc<dyn VacancySource>,
        completions,
        areas,
        Arc::clone(&db),
    );

    Setup {
        engine,
        listings,
        backend,
        db,
    }
}

fn page_of(reply: Reply) -> jobscout_chat::VacancyPage {
    match reply {
        Reply::Page(page) => page,
        other => panic!("expected a page reply, got {:?}", other),
    }
}

fn text_of(reply: Reply) -> String {
    match reply {
        Reply::Text(text) => text,
        other => panic!("expected a text reply, got {:?}", other),
    }
}

// =============================================================================
// Fallback search (no completion service)
// =============================================================================

#[tokio::test]
async fn no_llm_message_runs_fallback_search() {
    let s = setup(7, false);

    let reply = s
        .engine
        .handle_message(USER, "Python junior Москва 150000")
        .await
        .unwrap();

    let page = page_of(reply);
    assert_eq!(page.total_found, 7);
    assert_eq!(page.page, 0);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.cards.len(), 3);

    let request = s.listings.last_request();
    assert_eq!(request.text.as_deref(), Some("Python"));
    assert_eq!(request.area, Some(1));
    assert_eq!(request.salary, Some(150_000));
    assert!(request.only_with_salary);
    assert_eq!(request.experience, Some(Experience::Between1And3));
    assert_eq!(s.backend.call_count(), 0);
}

#[tokio::test]
async fn empty_message_is_an_error() {
    let s = setup(3, false);
    let err = s.engine.handle_message(USER, "   ").await.unwrap_err();
    assert!(matches!(err, ChatError::EmptyMessage));
}

#[tokio::test]
async fn listings_failure_surfaces_as_search_failed() {
    let s = setup(3, false);
    *s.listings.fail_search.lock().unwrap() = true;

    let err = s.engine.handle_message(USER, "python").await.unwrap_err();
    assert!(matches!(err, ChatError::SearchFailed(_)));
    assert!(!err.user_message().contains("503"));
}

#[tokio::test]
async fn empty_result_set_reports_nothing_found() {
    let s = setup(0, false);
    let reply = s.engine.handle_message(USER, "python").await.unwrap();
    assert!(text_of(reply).contains("Ничего не найдено"));
}

// =============================================================================
// Pagination
// =============================================================================

#[tokio::test]
async fn pagination_walks_and_clamps() {
    let s = setup(7, false);
    s.engine.handle_message(USER, "python").await.unwrap();

    let page = page_of(s.engine.next_page(USER).unwrap());
    assert_eq!(page.page, 1);
    assert_eq!(page.cards[0].vacancy.id, "3");

    let page = page_of(s.engine.show_page(USER, 2).unwrap());
    assert_eq!(page.page, 2);
    assert_eq!(page.cards.len(), 1);

    // Out of range leaves the cursor and the slice unchanged.
    let page = page_of(s.engine.show_page(USER, 99).unwrap());
    assert_eq!(page.page, 2);
    assert_eq!(page.cards[0].vacancy.id, "6");

    let page = page_of(s.engine.prev_page(USER).unwrap());
    assert_eq!(page.page, 1);
}

#[tokio::test]
async fn pagination_without_a_session_is_not_found() {
    let s = setup(3, false);
    assert!(matches!(
        s.engine.show_page(USER, 0),
        Err(ChatError::NoActiveSearch)
    ));
    assert!(matches!(
        s.engine.next_page(USER),
        Err(ChatError::NoActiveSearch)
    ));
}

#[tokio::test]
async fn new_search_replaces_the_session() {
    let s = setup(7, false);
    s.engine.handle_message(USER, "python").await.unwrap();
    s.engine.show_page(USER, 2).unwrap();

    let reply = s.engine.handle_message(USER, "rust").await.unwrap();
    let page = page_of(reply);
    assert_eq!(page.page, 0);
    assert_eq!(page.query, "rust");
}

// =============================================================================
// Completion-backed routing
// =============================================================================

#[tokio::test]
async fn llm_pipeline_routes_a_new_search() {
    let s = setup(5, true);
    // 1: relevance classification, 2: intent, 3: relevance filter.
    s.backend
        .push_text(r#"{"is_relevant": true, "category": "job_search"}"#);
    s.backend.push_text(
        r#"{"intent": "new_search", "search_query": "python разработчик", "city": "казань"}"#,
    );
    s.backend.push_text(r#"{"relevant_indices": [0, 1, 4]}"#);

    let reply = s
        .engine
        .handle_message(USER, "хочу работать питонистом в казани")
        .await
        .unwrap();

    let page = page_of(reply);
    assert_eq!(page.query, "python разработчик");
    assert_eq!(page.cards.len(), 3);
    assert_eq!(page.cards[2].vacancy.id, "4");

    let request = s.listings.last_request();
    assert_eq!(request.area, Some(88));
    assert_eq!(request.text.as_deref(), Some("python разработчик"));
    assert_eq!(s.backend.call_count(), 3);
}

#[tokio::test]
async fn classify_failure_with_work_keyword_stays_lenient() {
    let s = setup(4, true);
    // Classification, intent, and parse all fail; the work keyword
    // keeps the message relevant and the token parser takes over.
    s.backend.push_error("down");
    s.backend.push_error("down");
    s.backend.push_error("down");
    // Relevance filter also fails, keeping all items.
    s.backend.push_error("down");

    let reply = s
        .engine
        .handle_message(USER, "ищу вакансии python")
        .await
        .unwrap();
    assert!(matches!(reply, Reply::Page(_)));
}

#[tokio::test]
async fn classify_failure_without_signal_defaults_to_offtopic() {
    let s = setup(4, true);
    // Classification fails, then the nudge generation fails too.
    s.backend.push_error("down");
    s.backend.push_error("down");

    let reply = s
        .engine
        .handle_message(USER, "мне сегодня скучно")
        .await
        .unwrap();
    let text = text_of(reply);
    assert!(text.contains("поиске работы"), "got: {}", text);

    let tracker = OfftopicRepository::new(Arc::clone(&s.db))
        .get(USER)
        .unwrap()
        .unwrap();
    assert_eq!((tracker.total, tracker.consecutive), (1, 1));
}

#[tokio::test]
async fn question_about_results_gets_a_free_form_answer() {
    let s = setup(3, true);
    // Establish a session without the classifier.
    s.backend.push_error("parse down");
    s.backend.push_error("filter down");
    s.engine.search(USER, "python").await.unwrap();

    s.backend
        .push_text(r#"{"is_relevant": true, "category": "job_search"}"#);
    s.backend
        .push_text(r#"{"intent": "question_about_results", "search_query": null, "city": null}"#);
    s.backend.push_text("У этих вакансий сменный график.");

    let reply = s
        .engine
        .handle_message(USER, "какой график у этих вакансий?")
        .await
        .unwrap();
    assert_eq!(text_of(reply), "У этих вакансий сменный график.");
}

#[tokio::test]
async fn refine_reuses_the_original_query_with_new_city() {
    let s = setup(5, true);
    s.backend.push_text(r#"{"text": "python"}"#);
    s.backend.push_error("filter down");
    s.engine.search(USER, "python").await.unwrap();

    s.backend
        .push_text(r#"{"is_relevant": true, "category": "job_search"}"#);
    s.backend
        .push_text(r#"{"intent": "refine_search", "search_query": null, "city": "казань"}"#);
    s.backend
        .push_text(r#"{"text": "python", "area": "казань"}"#);
    s.backend.push_error("filter down");

    let reply = s.engine.handle_message(USER, "а в казани?").await.unwrap();
    let page = page_of(reply);
    assert_eq!(page.query, "python");

    let request = s.listings.last_request();
    assert_eq!(request.area, Some(88));
    assert_eq!(request.text.as_deref(), Some("python"));
}

// =============================================================================
// Drift guard
// =============================================================================

#[tokio::test]
async fn drift_escalates_from_nudge_to_redirect_to_reset() {
    let s = setup(3, true);
    let tracker_repo = OfftopicRepository::new(Arc::clone(&s.db));

    // Messages 1-2: nudges (the scripted backend is empty, so the
    // static fallbacks fire). Messages 3-9: consecutive >= 3 but the
    // total is still below 10, so redirects. Message 10: both
    // thresholds met, full reset.
    for i in 1..=10 {
        let reply = s.engine.handle_message(USER, "привет!").await.unwrap();
        let text = text_of(reply);
        match i {
            1 => assert!(text.contains("не могу помочь"), "msg {}: {}", i, text),
            2 => assert!(text.contains("вернёмся к поиску работы"), "msg {}: {}", i, text),
            3..=9 => assert!(text.contains("специализируюсь"), "msg {}: {}", i, text),
            _ => assert!(text.contains("начнём сначала"), "msg {}: {}", i, text),
        }
    }

    let tracker = tracker_repo.get(USER).unwrap().unwrap();
    assert_eq!((tracker.total, tracker.consecutive), (0, 0));

    // The slate is clean: the next drift starts with a soft nudge.
    let reply = s.engine.handle_message(USER, "привет!").await.unwrap();
    assert!(text_of(reply).contains("не могу помочь"));
}

#[tokio::test]
async fn three_consecutive_with_low_total_redirects_not_resets() {
    let s = setup(3, true);
    for _ in 0..2 {
        s.engine.handle_message(USER, "привет!").await.unwrap();
    }
    let reply = s.engine.handle_message(USER, "привет!").await.unwrap();
    let text = text_of(reply);
    assert!(text.contains("специализируюсь"));
    assert!(!text.contains("начнём сначала"));
}

#[tokio::test]
async fn command_bypass_resets_the_streak() {
    let s = setup(3, true);
    s.engine.handle_message(USER, "привет!").await.unwrap();
    s.engine.handle_message(USER, "привет!").await.unwrap();

    let reply = s.engine.handle_message(USER, "/favorites").await.unwrap();
    assert!(matches!(reply, Reply::Bypass));

    // Streak restarted: the third greeting in a row would have been a
    // redirect, but after the command it is a first-level nudge again.
    let reply = s.engine.handle_message(USER, "привет!").await.unwrap();
    assert!(text_of(reply).contains("не могу помочь"));

    let tracker = OfftopicRepository::new(Arc::clone(&s.db))
        .get(USER)
        .unwrap()
        .unwrap();
    assert_eq!(tracker.consecutive, 1);
    assert_eq!(tracker.total, 3);
}

// =============================================================================
// Ranking
// =============================================================================

#[tokio::test]
async fn analysis_language_short_circuits_to_ranking() {
    let s = setup(5, true);
    s.backend.push_error("parse down");
    s.backend.push_error("filter down");
    s.engine.search(USER, "python").await.unwrap();

    s.backend
        .push_text(r#"{"top_indices": [4, 2, 0], "analysis": "эти три лучшие"}"#);

    let reply = s
        .engine
        .handle_message(USER, "проанализируй результаты")
        .await
        .unwrap();
    match reply {
        Reply::Ranked(selection) => {
            assert_eq!(selection.kind, RankKind::Best);
            assert_eq!(selection.rationale, "эти три лучшие");
            let ids: Vec<&str> = selection.cards.iter().map(|c| c.vacancy.id.as_str()).collect();
            assert_eq!(ids, vec!["4", "2", "0"]);
        }
        other => panic!("expected a ranked reply, got {:?}", other),
    }
}

#[tokio::test]
async fn analysis_without_a_session_asks_for_a_search() {
    let s = setup(5, true);
    let reply = s
        .engine
        .handle_message(USER, "проанализируй результаты")
        .await
        .unwrap();
    assert!(text_of(reply).contains("Сначала выполните поиск"));
}

#[tokio::test]
async fn ranking_fallbacks_use_list_order() {
    let s = setup(5, false);
    s.engine.search(USER, "python").await.unwrap();

    let best = s.engine.best_vacancies(USER, 3).await.unwrap();
    let ids: Vec<&str> = best.cards.iter().map(|c| c.vacancy.id.as_str()).collect();
    assert_eq!(ids, vec!["0", "1", "2"]);

    let worst = s.engine.worst_vacancies(USER, 3).await.unwrap();
    let ids: Vec<&str> = worst.cards.iter().map(|c| c.vacancy.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "3", "4"]);
    assert_eq!(worst.kind, RankKind::Worst);
}

#[tokio::test]
async fn ranking_is_cached_on_the_session() {
    let s = setup(5, true);
    s.backend.push_error("parse down");
    s.backend.push_error("filter down");
    s.engine.search(USER, "python").await.unwrap();

    s.backend
        .push_text(r#"{"top_indices": [1, 0, 2], "analysis": "объяснение"}"#);
    s.engine.best_vacancies(USER, 3).await.unwrap();
    let calls_after_first = s.backend.call_count();

    let again = s.engine.best_vacancies(USER, 3).await.unwrap();
    assert_eq!(s.backend.call_count(), calls_after_first);
    assert_eq!(again.rationale, "объяснение");
}

#[tokio::test]
async fn ranking_without_a_session_is_not_found() {
    let s = setup(5, false);
    assert!(matches!(
        s.engine.best_vacancies(USER, 3).await,
        Err(ChatError::NoActiveSearch)
    ));
}

// =============================================================================
// Favorites and stats
// =============================================================================

#[tokio::test]
async fn favorite_add_is_idempotent_with_distinct_outcomes() {
    let s = setup(3, false);
    s.listings.add_vacancy(Vacancy {
        id: "v1".to_string(),
        name: "Python developer".to_string(),
        alternate_url: "https://example.com/v1".to_string(),
        ..Vacancy::default()
    });

    assert_eq!(
        s.engine.add_favorite(USER, "v1").await.unwrap(),
        FavoriteAdd::Added
    );
    assert_eq!(
        s.engine.add_favorite(USER, "v1").await.unwrap(),
        FavoriteAdd::AlreadyPresent
    );

    match s.engine.favorites(USER).unwrap() {
        Reply::Favorites(rows) => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].vacancy_name, "Python developer");
        }
        other => panic!("expected favorites, got {:?}", other),
    }
}

#[tokio::test]
async fn favorite_of_unknown_vacancy_is_not_found() {
    let s = setup(3, false);
    let err = s.engine.add_favorite(USER, "missing").await.unwrap_err();
    assert!(matches!(err, ChatError::VacancyNotFound(_)));
}

#[tokio::test]
async fn favorite_flag_shows_on_result_cards() {
    let s = setup(3, false);
    s.listings.add_vacancy(vacancy(1));
    s.engine.add_favorite(USER, "1").await.unwrap();

    let reply = s.engine.search(USER, "python").await.unwrap();
    let page = page_of(reply);
    let flagged: Vec<bool> = page.cards.iter().map(|c| c.is_favorite).collect();
    assert_eq!(flagged, vec![false, true, false]);
}

#[tokio::test]
async fn favorite_remove_round_trip() {
    let s = setup(3, false);
    s.listings.add_vacancy(vacancy(1));
    s.engine.add_favorite(USER, "1").await.unwrap();

    assert!(s.engine.remove_favorite(USER, "1").unwrap());
    assert!(!s.engine.remove_favorite(USER, "1").unwrap());
    assert!(!s.engine.is_favorite(USER, "1").unwrap());
}

#[tokio::test]
async fn stats_summarize_activity() {
    let s = setup(3, false);
    s.engine.search(USER, "python").await.unwrap();
    s.engine.search(USER, "rust").await.unwrap();

    match s.engine.stats(USER).unwrap() {
        Reply::Stats(stats) => {
            assert_eq!(stats.search_count, 2);
            assert_eq!(stats.favorites_count, 0);
            assert_eq!(stats.recent_queries, vec!["rust", "python"]);
        }
        other => panic!("expected stats, got {:?}", other),
    }
}

//! Chat engine: central coordinator for the conversational core.
//!
//! Wires the pre-screen cascade, drift guard, query parsing, location
//! resolution, listings search, relevance filtering, and session
//! management into per-interaction [`Reply`] values.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use jobscout_areas::{AreaIndex, AreaLookup};
use jobscout_core::config::JobscoutConfig;
use jobscout_core::error::JobscoutError;
use jobscout_core::types::{Intent, ParsedQuery, SearchParams, Vacancy};
use jobscout_listings::VacancySource;
use jobscout_llm::{CompletionService, Ranking};
use jobscout_storage::{
    ConversationRepository, Database, FavoriteAdd, FavoriteRepository, FavoriteRow,
    OfftopicRepository, SearchHistoryRepository, UserRepository,
};

use crate::cascade::{arbitrate, DecisionCascade};
use crate::drift::{DriftAction, DriftPolicy};
use crate::error::ChatError;
use crate::intent::{pre_screen, Screen};
use crate::keywords::{contains_any, ANALYSIS_KEYWORDS, BEST_KEYWORDS, WORST_KEYWORDS};
use crate::parser::fallback_parse;
use crate::reply::{RankKind, RankedSelection, Reply, UserStats, VacancyCard, VacancyPage};
use crate::session::{PageView, RankedAnalysis, SessionStore};

/// Conversation turns fed to relevance classification and nudges.
const CLASSIFY_HISTORY_TURNS: u32 = 4;
/// How many vacancies a best/worst selection shows.
const RANKED_COUNT: usize = 3;
/// Recent queries included in the stats summary.
const STATS_HISTORY: u32 = 5;
/// Favorites returned per listing request.
const FAVORITES_LIMIT: u32 = 50;

const CAPABILITIES: &str = "🔍 Поиск вакансий: по названию, городу, зарплате и опыту\n\
                            ⭐ Избранное: сохранение интересных вакансий\n\
                            📊 Статистика: количество поисков и история запросов\n\
                            ❓ Помощь: команды и примеры использования";

const RESET_MESSAGE: &str = "🔄 Кажется, мы отошли от темы поиска работы.\n\n\
                             Давай начнём сначала! Я здесь, чтобы помочь тебе найти работу. \
                             Просто напиши, какую вакансию ищешь! 😊";

const REDIRECT_MESSAGE: &str = "Понимаю, но давай вернёмся к поиску работы! 😊\n\n\
                                Я специализируюсь на помощи в карьере. \
                                Какую вакансию ты ищешь?";

const NUDGE_FIRST: &str = "К сожалению, я не могу помочь с этим 😊\n\
                           Зато отлично разбираюсь в поиске работы! Какую вакансию ищешь?";

const NUDGE_REPEAT: &str = "Понимаю, но давай всё же вернёмся к поиску работы? 🔍\n\
                            Я помогу найти что-то интересное!";

const OFFTOPIC_FALLBACK: &str = "Я помогаю искать работу! Какую вакансию ищете?";

const NO_SEARCH_YET: &str =
    "Сначала выполните поиск, чтобы я мог ответить на вопросы о результатах!";

const QUESTION_FALLBACK: &str = "Могу поискать что-то ещё?";

const EMPTY_QUERY_MESSAGE: &str =
    "Укажите название позиции или ключевые слова для поиска!";

const ANALYSIS_UNAVAILABLE: &str =
    "Анализ недоступен: показываю вакансии в порядке выдачи.";

/// Central coordinator owning the per-user session state and the
/// handles to every collaborator.
pub struct ChatEngine {
    listings: Arc<dyn VacancySource>,
    completions: Option<CompletionService>,
    areas: Arc<AreaIndex>,
    sessions: SessionStore,
    users: UserRepository,
    favorites: FavoriteRepository,
    history: SearchHistoryRepository,
    conversations: ConversationRepository,
    offtopic: OfftopicRepository,
    policy: DriftPolicy,
    screen: DecisionCascade<str, Screen>,
    context_turns: u32,
    min_relevance: u8,
    max_results: u32,
    period_days: u32,
}

impl ChatEngine {
    pub fn new(
        config: &JobscoutConfig,
        listings: Arc<dyn VacancySource>,
        completions: Option<CompletionService>,
        areas: Arc<AreaIndex>,
        db: Arc<Database>,
    ) -> Self {
        Self {
            listings,
            completions,
            areas,
            sessions: SessionStore::new(config.chat.page_size),
            users: UserRepository::new(Arc::clone(&db)),
            favorites: FavoriteRepository::new(Arc::clone(&db)),
            history: SearchHistoryRepository::new(Arc::clone(&db)),
            conversations: ConversationRepository::new(Arc::clone(&db)),
            offtopic: OfftopicRepository::new(db),
            policy: DriftPolicy::new(&config.drift),
            screen: pre_screen(config.chat.menu_labels.clone()),
            context_turns: config.chat.context_turns as u32,
            min_relevance: config.chat.min_relevance,
            max_results: config.listings.max_results,
            period_days: config.listings.period_days,
        }
    }

    /// Static description of what the assistant can do.
    pub fn capabilities(&self) -> &'static str {
        CAPABILITIES
    }

    /// Store or refresh a user profile (the delivery layer calls this
    /// when it has real profile data, e.g. on a start command).
    pub fn register_user(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<(), ChatError> {
        self.users.upsert(user_id, username, first_name, last_name)?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Message pipeline
    // -----------------------------------------------------------------

    /// Handle one free-text message through the full pipeline: keyword
    /// pre-screen, drift guard, intent routing.
    pub async fn handle_message(&self, user_id: i64, message: &str) -> Result<Reply, ChatError> {
        let text = message.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.users.touch(user_id)?;

        // Without a completion service there is no classification
        // layer; every message is treated as a search query and the
        // engine runs on its local fallbacks.
        let Some(completions) = &self.completions else {
            return self.search(user_id, text).await;
        };

        match self.screen.decide(text).unwrap_or(Screen::EscalateStrict) {
            Screen::Bypass => {
                self.offtopic.reset_consecutive(user_id)?;
                Ok(Reply::Bypass)
            }
            Screen::Analysis => {
                self.offtopic.reset_consecutive(user_id)?;
                self.results_question(user_id, text).await
            }
            Screen::BotHelp => {
                self.offtopic.reset_consecutive(user_id)?;
                Ok(Reply::text(CAPABILITIES))
            }
            Screen::Offtopic => self.handle_offtopic(user_id, text).await,
            screen @ (Screen::EscalateLenient | Screen::EscalateStrict) => {
                // A local keyword hit keeps the failure default lenient;
                // no signal keeps it strict. Deliberately asymmetric.
                let lenient = screen == Screen::EscalateLenient;
                let history = self.conversations.recent(user_id, CLASSIFY_HISTORY_TURNS)?;
                let verdict = completions
                    .classify_relevance(text, &history)
                    .await
                    .map(|v| v.is_relevant);

                if arbitrate(verdict, lenient) {
                    self.offtopic.reset_consecutive(user_id)?;
                    self.route(user_id, text, completions).await
                } else {
                    self.handle_offtopic(user_id, text).await
                }
            }
        }
    }

    /// Route a message already judged relevant.
    async fn route(
        &self,
        user_id: i64,
        text: &str,
        completions: &CompletionService,
    ) -> Result<Reply, ChatError> {
        let history = self.conversations.recent(user_id, self.context_turns)?;
        let guess = match completions.understand_intent(text, &history).await {
            Ok(guess) => guess,
            Err(e) => {
                warn!(user_id, error = %e, "Intent understanding failed, running a search");
                return self.search(user_id, text).await;
            }
        };
        info!(user_id, intent = ?guess.intent, "Message routed");

        match guess.intent {
            Intent::QuestionAboutResults => self.results_question(user_id, text).await,
            Intent::RefineSearch => match self.sessions.query(user_id) {
                Some(original) => {
                    self.refine(user_id, text, &original, guess.city.as_deref())
                        .await
                }
                None => self.search(user_id, text).await,
            },
            Intent::NewSearch | Intent::ContinuePrevious => {
                let query = guess.search_query.unwrap_or_else(|| text.to_string());
                let parsed = ParsedQuery {
                    text: query.clone(),
                    area: guess.city,
                    ..ParsedQuery::default()
                };
                self.execute_search(user_id, &query, parsed).await
            }
            Intent::Offtopic => self.casual_reply(user_id, text, completions).await,
            Intent::BotHelp => Ok(Reply::text(CAPABILITIES)),
        }
    }

    /// Free-form reply for a message the intent step judged off-topic
    /// after the relevance step let it through. Does not touch the
    /// drift counters.
    async fn casual_reply(
        &self,
        user_id: i64,
        text: &str,
        completions: &CompletionService,
    ) -> Result<Reply, ChatError> {
        let history = self.conversations.recent(user_id, CLASSIFY_HISTORY_TURNS)?;
        match completions
            .assistant_reply(text, &history, CAPABILITIES)
            .await
        {
            Ok(reply) => {
                self.conversations.append_exchange(user_id, text, &reply)?;
                Ok(Reply::Text(reply))
            }
            Err(e) => {
                warn!(user_id, error = %e, "Assistant reply failed");
                Ok(Reply::text(OFFTOPIC_FALLBACK))
            }
        }
    }

    // -----------------------------------------------------------------
    // Drift guard
    // -----------------------------------------------------------------

    async fn handle_offtopic(&self, user_id: i64, text: &str) -> Result<Reply, ChatError> {
        let tracker = self.offtopic.increment(user_id)?;
        info!(
            user_id,
            consecutive = tracker.consecutive,
            total = tracker.total,
            "Off-topic message"
        );

        match self.policy.assess(tracker.consecutive, tracker.total) {
            DriftAction::Reset => {
                self.conversations.clear(user_id)?;
                self.offtopic.reset(user_id)?;
                info!(user_id, "Conversation reset after sustained drift");
                Ok(Reply::text(RESET_MESSAGE))
            }
            DriftAction::Redirect => Ok(Reply::text(REDIRECT_MESSAGE)),
            DriftAction::Nudge => {
                let generated = match &self.completions {
                    Some(svc) => {
                        let history =
                            self.conversations.recent(user_id, CLASSIFY_HISTORY_TURNS)?;
                        svc.assistant_reply(text, &history, CAPABILITIES).await.ok()
                    }
                    None => None,
                };
                match generated {
                    Some(reply) => {
                        self.conversations.append_exchange(user_id, text, &reply)?;
                        Ok(Reply::Text(reply))
                    }
                    None => Ok(Reply::text(if tracker.consecutive <= 1 {
                        NUDGE_FIRST
                    } else {
                        NUDGE_REPEAT
                    })),
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------

    /// Run a search for a free-text query: completion-service parse
    /// first, deterministic token parse when that is unavailable.
    pub async fn search(&self, user_id: i64, query: &str) -> Result<Reply, ChatError> {
        self.users.touch(user_id)?;

        let parsed = match &self.completions {
            Some(svc) => match svc.parse_query(query, self.areas.popular_names()).await {
                Ok(parsed) => parsed,
                Err(e) => {
                    info!(user_id, error = %e, "Query parse degraded to token fallback");
                    fallback_parse(query, &self.areas)
                }
            },
            None => fallback_parse(query, &self.areas),
        };

        if parsed.text.trim().is_empty() {
            return Ok(Reply::text(EMPTY_QUERY_MESSAGE));
        }
        self.execute_search(user_id, query, parsed).await
    }

    /// Re-run the previous search with refinements extracted from the
    /// new message.
    async fn refine(
        &self,
        user_id: i64,
        text: &str,
        original_query: &str,
        mentioned_city: Option<&str>,
    ) -> Result<Reply, ChatError> {
        if let Some(svc) = &self.completions {
            let combined = format!("{}, {}", original_query, text);
            match svc.parse_query(&combined, self.areas.popular_names()).await {
                Ok(mut parsed) => {
                    if parsed.area.is_none() {
                        parsed.area = mentioned_city.map(str::to_string);
                    }
                    // The refinement carries new filters; the search
                    // text stays what the user originally asked for.
                    parsed.text = original_query.to_string();
                    return self.execute_search(user_id, original_query, parsed).await;
                }
                Err(e) => warn!(user_id, error = %e, "Refine parse failed"),
            }
        }

        if let Some(city) = mentioned_city {
            if self.resolve_area(city).is_some() {
                let parsed = ParsedQuery {
                    text: original_query.to_string(),
                    area: Some(city.to_string()),
                    ..ParsedQuery::default()
                };
                return self.execute_search(user_id, original_query, parsed).await;
            }
        }
        self.search(user_id, text).await
    }

    async fn execute_search(
        &self,
        user_id: i64,
        original_query: &str,
        parsed: ParsedQuery,
    ) -> Result<Reply, ChatError> {
        let area_id = parsed.area.as_deref().and_then(|name| self.resolve_area(name));
        if let (Some(name), None) = (parsed.area.as_deref(), area_id) {
            warn!(user_id, area = name, "Place not resolved, searching countrywide");
        }

        let params = SearchParams {
            text: Some(parsed.text.clone()),
            area: area_id,
            salary: parsed.salary,
            only_with_salary: parsed.salary.is_some(),
            experience: parsed.experience,
            schedule: parsed.schedule,
            employment: parsed.employment,
            per_page: self.max_results,
            page: 0,
            period: self.period_days,
        };

        let page = self.listings.search(&params).await.map_err(|e| {
            error!(user_id, query = original_query, error = %e, "Listings search failed");
            ChatError::SearchFailed(e.to_string())
        })?;

        if page.items.is_empty() {
            return Ok(Reply::text(format!(
                "😔 Ничего не найдено по запросу: {}.\nПопробуйте изменить параметры поиска.",
                parsed.text
            )));
        }

        let mut items = page.items;
        if let Some(svc) = &self.completions {
            let area_hint = area_id.and_then(|id| self.areas.display_name(id));
            let filter = svc
                .filter_by_relevance(&items, original_query, area_hint.as_deref(), self.min_relevance)
                .await;
            // An empty kept set means the filter judged everything
            // irrelevant; showing the unfiltered list beats showing
            // nothing, since there is no secondary source.
            if !filter.kept.is_empty() {
                if filter.dropped_count > 0 {
                    info!(
                        user_id,
                        kept = filter.kept.len(),
                        dropped = filter.dropped_count,
                        "Relevance filter applied"
                    );
                }
                items = filter.kept;
            }
        }

        let params_json = serde_json::to_string(&params).map_err(JobscoutError::from)?;
        self.history
            .append(user_id, original_query, &params_json, page.found)?;
        self.users.bump_search_count(user_id)?;

        self.sessions
            .create(user_id, original_query, items, page.found, params);
        let view = self
            .sessions
            .current_page(user_id)
            .ok_or(ChatError::NoActiveSearch)?;
        self.page_reply(user_id, view)
    }

    /// Resolve a place name: index first, the legacy table as a
    /// fallback for misses and while the index has not loaded.
    fn resolve_area(&self, name: &str) -> Option<i64> {
        match self.areas.find(name) {
            AreaLookup::Found(id) => Some(id),
            AreaLookup::Unknown | AreaLookup::NotLoaded => AreaIndex::legacy_find(name),
        }
    }

    // -----------------------------------------------------------------
    // Pagination
    // -----------------------------------------------------------------

    pub fn show_page(&self, user_id: i64, page: usize) -> Result<Reply, ChatError> {
        let view = self
            .sessions
            .set_page(user_id, page)
            .ok_or(ChatError::NoActiveSearch)?;
        self.page_reply(user_id, view)
    }

    pub fn next_page(&self, user_id: i64) -> Result<Reply, ChatError> {
        let view = self
            .sessions
            .next_page(user_id)
            .ok_or(ChatError::NoActiveSearch)?;
        self.page_reply(user_id, view)
    }

    pub fn prev_page(&self, user_id: i64) -> Result<Reply, ChatError> {
        let view = self
            .sessions
            .prev_page(user_id)
            .ok_or(ChatError::NoActiveSearch)?;
        self.page_reply(user_id, view)
    }

    fn page_reply(&self, user_id: i64, view: PageView) -> Result<Reply, ChatError> {
        let cards = self.cards_for(user_id, view.items)?;
        Ok(Reply::Page(VacancyPage {
            query: view.query,
            total_found: view.total_found,
            page: view.page,
            total_pages: view.total_pages,
            cards,
        }))
    }

    fn cards_for(&self, user_id: i64, items: Vec<Vacancy>) -> Result<Vec<VacancyCard>, ChatError> {
        items
            .into_iter()
            .map(|vacancy| {
                let is_favorite = self.favorites.contains(user_id, &vacancy.id)?;
                Ok(VacancyCard {
                    vacancy,
                    is_favorite,
                })
            })
            .collect()
    }

    // -----------------------------------------------------------------
    // Results questions and ranking
    // -----------------------------------------------------------------

    async fn results_question(&self, user_id: i64, text: &str) -> Result<Reply, ChatError> {
        if !self.sessions.exists(user_id) {
            return Ok(Reply::text(NO_SEARCH_YET));
        }

        let lower = text.to_lowercase();
        if contains_any(&lower, WORST_KEYWORDS) {
            return Ok(Reply::Ranked(
                self.worst_vacancies(user_id, RANKED_COUNT).await?,
            ));
        }
        if contains_any(&lower, BEST_KEYWORDS) || contains_any(&lower, ANALYSIS_KEYWORDS) {
            return Ok(Reply::Ranked(
                self.best_vacancies(user_id, RANKED_COUNT).await?,
            ));
        }

        let results = self
            .sessions
            .results(user_id)
            .ok_or(ChatError::NoActiveSearch)?;
        match &self.completions {
            Some(svc) => match svc.answer_about_results(text, &results).await {
                Ok(answer) => {
                    self.conversations.append_exchange(user_id, text, &answer)?;
                    Ok(Reply::Text(answer))
                }
                Err(e) => {
                    warn!(user_id, error = %e, "Results question failed");
                    Ok(Reply::text(QUESTION_FALLBACK))
                }
            },
            None => Ok(Reply::Ranked(
                self.best_vacancies(user_id, RANKED_COUNT).await?,
            )),
        }
    }

    /// Best vacancies of the current session, with the analysis cached
    /// onto the session.
    pub async fn best_vacancies(
        &self,
        user_id: i64,
        top_n: usize,
    ) -> Result<RankedSelection, ChatError> {
        let results = self
            .sessions
            .results(user_id)
            .ok_or(ChatError::NoActiveSearch)?;
        let query = self.sessions.query(user_id).unwrap_or_default();
        let wanted = top_n.min(results.len());

        let analysis = match self.sessions.cached_best(user_id) {
            Some(cached) if cached.indices.len() >= wanted => cached,
            _ => {
                let ranking = match &self.completions {
                    Some(svc) => svc.rank_best(&results, &query, top_n).await,
                    None => Ranking {
                        indices: (0..wanted).collect(),
                        rationale: ANALYSIS_UNAVAILABLE.to_string(),
                    },
                };
                let analysis = RankedAnalysis {
                    indices: ranking.indices,
                    rationale: ranking.rationale,
                    created_at: Utc::now(),
                };
                self.sessions.cache_best(user_id, analysis.clone());
                analysis
            }
        };

        self.ranked_selection(user_id, RankKind::Best, query, &results, &analysis, top_n)
    }

    /// Worst vacancies of the current session, cached like the best.
    pub async fn worst_vacancies(
        &self,
        user_id: i64,
        top_n: usize,
    ) -> Result<RankedSelection, ChatError> {
        let results = self
            .sessions
            .results(user_id)
            .ok_or(ChatError::NoActiveSearch)?;
        let query = self.sessions.query(user_id).unwrap_or_default();
        let wanted = top_n.min(results.len());

        let analysis = match self.sessions.cached_worst(user_id) {
            Some(cached) if cached.indices.len() >= wanted => cached,
            _ => {
                let ranking = match &self.completions {
                    Some(svc) => svc.rank_worst(&results, &query, top_n).await,
                    None => Ranking {
                        indices: (results.len().saturating_sub(top_n)..results.len()).collect(),
                        rationale: ANALYSIS_UNAVAILABLE.to_string(),
                    },
                };
                let analysis = RankedAnalysis {
                    indices: ranking.indices,
                    rationale: ranking.rationale,
                    created_at: Utc::now(),
                };
                self.sessions.cache_worst(user_id, analysis.clone());
                analysis
            }
        };

        self.ranked_selection(user_id, RankKind::Worst, query, &results, &analysis, top_n)
    }

    fn ranked_selection(
        &self,
        user_id: i64,
        kind: RankKind,
        query: String,
        results: &[Vacancy],
        analysis: &RankedAnalysis,
        top_n: usize,
    ) -> Result<RankedSelection, ChatError> {
        let selected: Vec<Vacancy> = analysis
            .indices
            .iter()
            .take(top_n)
            .filter_map(|&index| results.get(index).cloned())
            .collect();
        let cards = self.cards_for(user_id, selected)?;
        Ok(RankedSelection {
            kind,
            query,
            rationale: analysis.rationale.clone(),
            cards,
        })
    }

    // -----------------------------------------------------------------
    // Favorites and stats
    // -----------------------------------------------------------------

    /// Add a vacancy to favorites, snapshotting its current fields.
    ///
    /// Adding an id that is already saved reports `AlreadyPresent`
    /// without touching the stored snapshot.
    pub async fn add_favorite(
        &self,
        user_id: i64,
        vacancy_id: &str,
    ) -> Result<FavoriteAdd, ChatError> {
        self.users.touch(user_id)?;
        if self.favorites.contains(user_id, vacancy_id)? {
            return Ok(FavoriteAdd::AlreadyPresent);
        }

        let vacancy = self.listings.vacancy(vacancy_id).await.map_err(|e| match e {
            JobscoutError::NotFound(_) => ChatError::VacancyNotFound(vacancy_id.to_string()),
            other => ChatError::Core(other),
        })?;

        let row = FavoriteRow {
            vacancy_id: vacancy.id.clone(),
            vacancy_name: vacancy.name.clone(),
            company_name: vacancy.company_name().to_string(),
            salary: vacancy.salary_text(),
            location: vacancy.location().to_string(),
            url: vacancy.alternate_url.clone(),
            added_at: 0,
        };
        Ok(self.favorites.add(user_id, &row)?)
    }

    pub fn remove_favorite(&self, user_id: i64, vacancy_id: &str) -> Result<bool, ChatError> {
        Ok(self.favorites.remove(user_id, vacancy_id)?)
    }

    pub fn is_favorite(&self, user_id: i64, vacancy_id: &str) -> Result<bool, ChatError> {
        Ok(self.favorites.contains(user_id, vacancy_id)?)
    }

    pub fn favorites(&self, user_id: i64) -> Result<Reply, ChatError> {
        Ok(Reply::Favorites(
            self.favorites.list(user_id, FAVORITES_LIMIT)?,
        ))
    }

    pub fn stats(&self, user_id: i64) -> Result<Reply, ChatError> {
        let user = self.users.get(user_id)?.ok_or_else(|| {
            ChatError::Core(JobscoutError::NotFound(format!("user {}", user_id)))
        })?;
        let favorites_count = self.favorites.count(user_id)?;
        let recent = self.history.recent(user_id, STATS_HISTORY)?;

        Ok(Reply::Stats(UserStats {
            first_name: user.first_name,
            search_count: user.search_count,
            favorites_count,
            member_since: user.created_at,
            recent_queries: recent.into_iter().map(|r| r.search_query).collect(),
        }))
    }
}

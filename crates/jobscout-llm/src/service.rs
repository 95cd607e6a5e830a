//! High-level completion operations with deterministic fallbacks.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use jobscout_core::error::Result;
use jobscout_core::types::{ChatTurn, Intent, ParsedQuery, Vacancy};

use crate::client::{CompletionBackend, CompletionOptions};
use crate::decode::decode_json;
use crate::prompt;

/// Rationale used when best-ranking falls back to list order.
const BEST_FALLBACK_RATIONALE: &str = "Показываю первые вакансии из списка результатов.";
/// Rationale used when worst-ranking falls back to list order.
const WORST_FALLBACK_RATIONALE: &str = "Показываю последние вакансии из списка результатов.";

/// Relevance classification verdict for the drift guard.
#[derive(Debug, Clone, Deserialize)]
pub struct RelevanceVerdict {
    pub is_relevant: bool,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntentWire {
    intent: Intent,
    #[serde(default)]
    search_query: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

/// Routed intent with any parameters the model extracted along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentGuess {
    pub intent: Intent,
    pub search_query: Option<String>,
    pub city: Option<String>,
}

/// Outcome of relevance filtering.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    pub kept: Vec<Vacancy>,
    pub dropped_count: usize,
    pub total_count: usize,
}

/// Outcome of best/worst ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    /// Indices into the ranked slice, best (or worst) first.
    pub indices: Vec<usize>,
    pub rationale: String,
}

#[derive(Debug, Deserialize)]
struct FilterWire {
    #[serde(default)]
    relevant_indices: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct BestWire {
    #[serde(default)]
    top_indices: Vec<usize>,
    #[serde(default)]
    analysis: String,
}

#[derive(Debug, Deserialize)]
struct WorstWire {
    #[serde(default)]
    worst_indices: Vec<usize>,
    #[serde(default)]
    explanation: String,
}

/// Completion-backed operations used by the chat engine.
///
/// Parsing and classification return errors so callers can apply their
/// own context-dependent defaults; filtering and ranking absorb every
/// failure into a deterministic local fallback.
pub struct CompletionService {
    backend: Arc<dyn CompletionBackend>,
}

impl CompletionService {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Extract structured search parameters from free text.
    pub async fn parse_query(&self, query: &str, popular_cities: &[&str]) -> Result<ParsedQuery> {
        let messages = prompt::parse_query(query, popular_cities);
        let options = CompletionOptions {
            temperature: 0.1,
            max_tokens: 300,
        };
        let raw = self.backend.complete(&messages, options).await?;
        let mut parsed: ParsedQuery = decode_json(&raw)?;
        if parsed.text.trim().is_empty() {
            parsed.text = query.to_string();
        }
        debug!(?parsed, "Query parsed by completion service");
        Ok(parsed)
    }

    /// Classify whether a message is on topic for job search.
    pub async fn classify_relevance(
        &self,
        message: &str,
        history: &[ChatTurn],
    ) -> Result<RelevanceVerdict> {
        let messages = prompt::classify_relevance(message, history);
        let options = CompletionOptions {
            temperature: 0.0,
            max_tokens: 100,
        };
        let raw = self.backend.complete(&messages, options).await?;
        decode_json(&raw)
    }

    /// Understand what the user wants to do next.
    pub async fn understand_intent(
        &self,
        message: &str,
        history: &[ChatTurn],
    ) -> Result<IntentGuess> {
        let messages = prompt::understand_intent(message, history);
        let options = CompletionOptions {
            temperature: 0.1,
            max_tokens: 200,
        };
        let raw = self.backend.complete(&messages, options).await?;
        let wire: IntentWire = decode_json(&raw)?;
        Ok(IntentGuess {
            intent: wire.intent,
            search_query: wire.search_query.filter(|s| !s.trim().is_empty()),
            city: wire.city.filter(|s| !s.trim().is_empty()),
        })
    }

    /// Drop low-relevance items from a result set.
    ///
    /// Any failure returns the input unchanged with zero dropped.
    pub async fn filter_by_relevance(
        &self,
        items: &[Vacancy],
        query: &str,
        area_hint: Option<&str>,
        min_score: u8,
    ) -> RelevanceFilter {
        let total_count = items.len();
        if items.is_empty() {
            return RelevanceFilter {
                kept: Vec::new(),
                dropped_count: 0,
                total_count,
            };
        }

        let messages = prompt::filter_relevance(items, query, area_hint, min_score);
        let options = CompletionOptions {
            temperature: 0.2,
            max_tokens: 300,
        };
        let indices = match self.backend.complete(&messages, options).await {
            Ok(raw) => match decode_json::<FilterWire>(&raw) {
                Ok(wire) => sanitize_indices(wire.relevant_indices, total_count, total_count),
                Err(e) => {
                    warn!(error = %e, "Relevance filter decode failed, keeping all items");
                    return keep_all(items);
                }
            },
            Err(e) => {
                warn!(error = %e, "Relevance filter call failed, keeping all items");
                return keep_all(items);
            }
        };

        // An empty verdict is treated as a failed filter rather than an
        // empty result set, matching the no-secondary-source policy.
        if indices.is_empty() {
            return keep_all(items);
        }

        let kept: Vec<Vacancy> = indices.iter().map(|&i| items[i].clone()).collect();
        RelevanceFilter {
            dropped_count: total_count - kept.len(),
            total_count,
            kept,
        }
    }

    /// Select the best `top_n` items, best first.
    ///
    /// Falls back to the first `top_n` indices on any failure.
    pub async fn rank_best(&self, items: &[Vacancy], query: &str, top_n: usize) -> Ranking {
        if items.is_empty() {
            return Ranking {
                indices: Vec::new(),
                rationale: BEST_FALLBACK_RATIONALE.to_string(),
            };
        }
        let ranked = items.len().min(prompt::MAX_PROMPT_VACANCIES);

        let messages = prompt::rank_best(items, query, top_n);
        let options = CompletionOptions {
            temperature: 0.3,
            max_tokens: 400,
        };
        match self.backend.complete(&messages, options).await {
            Ok(raw) => match decode_json::<BestWire>(&raw) {
                Ok(wire) => {
                    let indices = sanitize_indices(wire.top_indices, ranked, top_n);
                    if indices.is_empty() {
                        best_fallback(ranked, top_n)
                    } else {
                        Ranking {
                            indices,
                            rationale: wire.analysis,
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Best ranking decode failed, using list order");
                    best_fallback(ranked, top_n)
                }
            },
            Err(e) => {
                warn!(error = %e, "Best ranking call failed, using list order");
                best_fallback(ranked, top_n)
            }
        }
    }

    /// Select the worst `top_n` items.
    ///
    /// Falls back to the last `top_n` indices on any failure.
    pub async fn rank_worst(&self, items: &[Vacancy], query: &str, top_n: usize) -> Ranking {
        if items.is_empty() {
            return Ranking {
                indices: Vec::new(),
                rationale: WORST_FALLBACK_RATIONALE.to_string(),
            };
        }
        let ranked = items.len().min(prompt::MAX_PROMPT_VACANCIES);

        let messages = prompt::rank_worst(items, query, top_n);
        let options = CompletionOptions {
            temperature: 0.3,
            max_tokens: 400,
        };
        match self.backend.complete(&messages, options).await {
            Ok(raw) => match decode_json::<WorstWire>(&raw) {
                Ok(wire) => {
                    let indices = sanitize_indices(wire.worst_indices, ranked, top_n);
                    if indices.is_empty() {
                        worst_fallback(ranked, top_n)
                    } else {
                        Ranking {
                            indices,
                            rationale: wire.explanation,
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Worst ranking decode failed, using list order");
                    worst_fallback(ranked, top_n)
                }
            },
            Err(e) => {
                warn!(error = %e, "Worst ranking call failed, using list order");
                worst_fallback(ranked, top_n)
            }
        }
    }

    /// Answer a free-form question about the vacancies already shown.
    pub async fn answer_about_results(&self, question: &str, items: &[Vacancy]) -> Result<String> {
        let messages = prompt::answer_about_results(question, items);
        let options = CompletionOptions {
            temperature: 0.7,
            max_tokens: 200,
        };
        self.backend.complete(&messages, options).await
    }

    /// Context-aware conversational reply (off-topic nudges).
    pub async fn assistant_reply(
        &self,
        message: &str,
        history: &[ChatTurn],
        capabilities: &str,
    ) -> Result<String> {
        let messages = prompt::assistant_reply(message, history, capabilities);
        let options = CompletionOptions {
            temperature: 0.7,
            max_tokens: 250,
        };
        self.backend.complete(&messages, options).await
    }
}

fn keep_all(items: &[Vacancy]) -> RelevanceFilter {
    RelevanceFilter {
        kept: items.to_vec(),
        dropped_count: 0,
        total_count: items.len(),
    }
}

fn best_fallback(len: usize, top_n: usize) -> Ranking {
    Ranking {
        indices: (0..len.min(top_n)).collect(),
        rationale: BEST_FALLBACK_RATIONALE.to_string(),
    }
}

fn worst_fallback(len: usize, top_n: usize) -> Ranking {
    Ranking {
        indices: (len.saturating_sub(top_n)..len).collect(),
        rationale: WORST_FALLBACK_RATIONALE.to_string(),
    }
}

/// Keep in-bounds indices, drop duplicates, cap the count.
fn sanitize_indices(raw: Vec<usize>, len: usize, cap: usize) -> Vec<usize> {
    let mut seen = vec![false; len];
    let mut indices = Vec::new();
    for index in raw {
        if index < len && !seen[index] {
            seen[index] = true;
            indices.push(index);
            if indices.len() == cap {
                break;
            }
        }
    }
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;

    fn vacancy(id: &str) -> Vacancy {
        Vacancy {
            id: id.to_string(),
            name: format!("vacancy {}", id),
            ..Vacancy::default()
        }
    }

    fn service_with(mock: MockBackend) -> CompletionService {
        CompletionService::new(Arc::new(mock))
    }

    // ---- parse_query ----

    #[tokio::test]
    async fn test_parse_query_decodes_fenced_json() {
        let mock = MockBackend::new();
        mock.push_text(
            "```json\n{\"text\": \"python\", \"area\": \"москва\", \"salary\": 150000}\n```",
        );
        let service = service_with(mock);

        let parsed = service.parse_query("python москва 150000", &["москва"]).await.unwrap();
        assert_eq!(parsed.text, "python");
        assert_eq!(parsed.area.as_deref(), Some("москва"));
        assert_eq!(parsed.salary, Some(150_000));
    }

    #[tokio::test]
    async fn test_parse_query_empty_text_falls_back_to_raw_query() {
        let mock = MockBackend::new();
        mock.push_text("{\"area\": \"казань\"}");
        let service = service_with(mock);

        let parsed = service.parse_query("работа в казани", &[]).await.unwrap();
        assert_eq!(parsed.text, "работа в казани");
    }

    #[tokio::test]
    async fn test_parse_query_propagates_failure() {
        let mock = MockBackend::new();
        mock.push_error("down");
        let service = service_with(mock);
        assert!(service.parse_query("python", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_parse_query_prose_response_is_decode_error() {
        let mock = MockBackend::new();
        mock.push_text("Вот параметры: python, Москва");
        let service = service_with(mock);
        assert!(service.parse_query("python", &[]).await.is_err());
    }

    // ---- classify_relevance / understand_intent ----

    #[tokio::test]
    async fn test_classify_relevance_decodes_verdict() {
        let mock = MockBackend::new();
        mock.push_text("{\"is_relevant\": true, \"category\": \"job_search\"}");
        let service = service_with(mock);

        let verdict = service.classify_relevance("ищу работу", &[]).await.unwrap();
        assert!(verdict.is_relevant);
        assert_eq!(verdict.category.as_deref(), Some("job_search"));
    }

    #[tokio::test]
    async fn test_understand_intent_filters_empty_fields() {
        let mock = MockBackend::new();
        mock.push_text(
            "{\"intent\": \"refine_search\", \"search_query\": \"\", \"city\": \"питер\"}",
        );
        let service = service_with(mock);

        let guess = service.understand_intent("а в питере?", &[]).await.unwrap();
        assert_eq!(guess.intent, Intent::RefineSearch);
        assert_eq!(guess.search_query, None);
        assert_eq!(guess.city.as_deref(), Some("питер"));
    }

    // ---- filter_by_relevance ----

    #[tokio::test]
    async fn test_filter_keeps_selected_indices() {
        let items = vec![vacancy("a"), vacancy("b"), vacancy("c")];
        let mock = MockBackend::new();
        mock.push_text("{\"relevant_indices\": [2, 0]}");
        let service = service_with(mock);

        let filter = service.filter_by_relevance(&items, "q", None, 50).await;
        assert_eq!(filter.total_count, 3);
        assert_eq!(filter.dropped_count, 1);
        assert_eq!(filter.kept[0].id, "c");
        assert_eq!(filter.kept[1].id, "a");
    }

    #[tokio::test]
    async fn test_filter_failure_returns_input_unchanged() {
        let items = vec![vacancy("a"), vacancy("b")];
        let mock = MockBackend::new();
        mock.push_error("down");
        let service = service_with(mock);

        let filter = service.filter_by_relevance(&items, "q", None, 50).await;
        assert_eq!(filter.kept.len(), 2);
        assert_eq!(filter.dropped_count, 0);
        assert_eq!(filter.total_count, 2);
    }

    #[tokio::test]
    async fn test_filter_empty_verdict_keeps_everything() {
        let items = vec![vacancy("a")];
        let mock = MockBackend::new();
        mock.push_text("{\"relevant_indices\": []}");
        let service = service_with(mock);

        let filter = service.filter_by_relevance(&items, "q", None, 50).await;
        assert_eq!(filter.kept.len(), 1);
        assert_eq!(filter.dropped_count, 0);
    }

    #[tokio::test]
    async fn test_filter_empty_input_short_circuits() {
        let mock = MockBackend::new();
        let service = service_with(mock);
        let filter = service.filter_by_relevance(&[], "q", None, 50).await;
        assert!(filter.kept.is_empty());
        assert_eq!(filter.total_count, 0);
    }

    // ---- rank_best / rank_worst ----

    #[tokio::test]
    async fn test_rank_best_uses_model_order() {
        let items = vec![vacancy("a"), vacancy("b"), vacancy("c"), vacancy("d")];
        let mock = MockBackend::new();
        mock.push_text("{\"top_indices\": [3, 1], \"analysis\": \"d и b лучшие\"}");
        let service = service_with(mock);

        let ranking = service.rank_best(&items, "q", 3).await;
        assert_eq!(ranking.indices, vec![3, 1]);
        assert_eq!(ranking.rationale, "d и b лучшие");
    }

    #[tokio::test]
    async fn test_rank_best_failure_returns_first_n() {
        let items = vec![vacancy("a"), vacancy("b"), vacancy("c"), vacancy("d")];
        let mock = MockBackend::new();
        mock.push_error("down");
        let service = service_with(mock);

        let ranking = service.rank_best(&items, "q", 3).await;
        assert_eq!(ranking.indices, vec![0, 1, 2]);
        assert!(!ranking.rationale.is_empty());
    }

    #[tokio::test]
    async fn test_rank_worst_failure_returns_last_n() {
        let items = vec![vacancy("a"), vacancy("b"), vacancy("c"), vacancy("d"), vacancy("e")];
        let mock = MockBackend::new();
        mock.push_error("down");
        let service = service_with(mock);

        let ranking = service.rank_worst(&items, "q", 3).await;
        assert_eq!(ranking.indices, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_rank_fallbacks_with_fewer_items_than_n() {
        let items = vec![vacancy("a"), vacancy("b")];
        let mock = MockBackend::new();
        mock.push_error("down");
        mock.push_error("down");
        let service = service_with(mock);

        assert_eq!(service.rank_best(&items, "q", 5).await.indices, vec![0, 1]);
        assert_eq!(service.rank_worst(&items, "q", 5).await.indices, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_rank_best_sanitizes_model_indices() {
        let items = vec![vacancy("a"), vacancy("b"), vacancy("c")];
        let mock = MockBackend::new();
        mock.push_text("{\"top_indices\": [2, 2, 99, 0], \"analysis\": \"x\"}");
        let service = service_with(mock);

        let ranking = service.rank_best(&items, "q", 3).await;
        assert_eq!(ranking.indices, vec![2, 0]);
    }

    #[tokio::test]
    async fn test_rank_best_garbage_json_falls_back() {
        let items = vec![vacancy("a"), vacancy("b"), vacancy("c")];
        let mock = MockBackend::new();
        mock.push_text("лучшие вакансии: первая и вторая");
        let service = service_with(mock);

        let ranking = service.rank_best(&items, "q", 2).await;
        assert_eq!(ranking.indices, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_rank_empty_items() {
        let service = service_with(MockBackend::new());
        assert!(service.rank_best(&[], "q", 3).await.indices.is_empty());
        assert!(service.rank_worst(&[], "q", 3).await.indices.is_empty());
    }

    // ---- sanitize_indices ----

    #[test]
    fn test_sanitize_indices() {
        assert_eq!(sanitize_indices(vec![1, 1, 5, 0], 3, 10), vec![1, 0]);
        assert_eq!(sanitize_indices(vec![0, 1, 2, 3], 4, 2), vec![0, 1]);
        assert_eq!(sanitize_indices(vec![], 3, 3), Vec::<usize>::new());
    }
}

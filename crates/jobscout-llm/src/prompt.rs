//! Prompt templates for the completion service.
//!
//! Each call site gets a compact, machine-parseable contract: the model
//! is asked for JSON only, and vacancy lists are condensed into short
//! per-item summaries with listings markup stripped.

use std::sync::LazyLock;

use regex::Regex;

use jobscout_core::types::{ChatTurn, Vacancy};

use crate::client::ChatMessage;

/// Per-item excerpt length in the vacancy summaries.
const SNIPPET_CHARS: usize = 150;
/// At most this many vacancies are embedded in a ranking prompt.
pub const MAX_PROMPT_VACANCIES: usize = 20;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

/// Strip listings markup (e.g. `<highlighttext>`) from snippet text.
pub fn strip_markup(text: &str) -> String {
    TAG_RE.replace_all(text, "").to_string()
}

/// Truncate to a character budget without splitting a code point.
fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    text.chars().take(limit).collect()
}

/// One numbered vacancy line for embedding into a prompt.
fn vacancy_line(index: usize, vacancy: &Vacancy) -> String {
    let requirement = vacancy
        .snippet
        .as_ref()
        .and_then(|s| s.requirement.as_deref())
        .map(strip_markup)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "нет данных".to_string());
    let responsibility = vacancy
        .snippet
        .as_ref()
        .and_then(|s| s.responsibility.as_deref())
        .map(strip_markup)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "нет данных".to_string());

    format!(
        "Вакансия {idx}:\n\
         Название: {name}\n\
         Компания: {company}\n\
         Зарплата: {salary}\n\
         Требования: {req}\n\
         Обязанности: {resp}",
        idx = index,
        name = vacancy.name,
        company = vacancy.company_name(),
        salary = vacancy.salary_text(),
        req = truncate_chars(&requirement, SNIPPET_CHARS),
        resp = truncate_chars(&responsibility, SNIPPET_CHARS),
    )
}

/// Numbered summary block for up to [`MAX_PROMPT_VACANCIES`] items.
pub fn vacancy_summaries(items: &[Vacancy]) -> String {
    items
        .iter()
        .take(MAX_PROMPT_VACANCIES)
        .enumerate()
        .map(|(i, v)| vacancy_line(i, v))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Prior conversation turns as wire messages, oldest first.
fn history_messages(history: &[ChatTurn]) -> Vec<ChatMessage> {
    history.iter().map(ChatMessage::from).collect()
}

// =============================================================================
// Call-site templates
// =============================================================================

/// Structured parameter extraction from a free-text search query.
pub fn parse_query(query: &str, popular_cities: &[&str]) -> Vec<ChatMessage> {
    let system = format!(
        "Ты - парсер поисковых запросов о работе. Извлеки параметры из запроса пользователя.\n\n\
         ПОЛЯ:\n\
         - text: название позиции и ключевые слова (строка, обязательно)\n\
         - area: город, если упомянут (строка в нижнем регистре). Известные города: {cities}\n\
         - salary: минимальная зарплата в рублях, если упомянута (число)\n\
         - experience: noExperience | between1And3 | between3And6 | moreThan6\n\
         - schedule: fullDay | shift | flexible | remote | flyInFlyOut\n\
         - employment: full | part | project | volunteer | probation\n\n\
         Отвечай ТОЛЬКО JSON-объектом с заполненными полями, без пояснений.",
        cities = popular_cities.join(", ")
    );
    vec![ChatMessage::system(system), ChatMessage::user(query)]
}

/// Relevance classification for the drift guard.
pub fn classify_relevance(message: &str, history: &[ChatTurn]) -> Vec<ChatMessage> {
    let system = "Ты - классификатор сообщений для ассистента по поиску работы.\n\
                  Определи, относится ли сообщение к поиску работы, карьере или возможностям бота,\n\
                  с учётом контекста разговора (согласие продолжить поиск тоже релевантно).\n\n\
                  ФОРМАТ ОТВЕТА (JSON):\n\
                  {\"is_relevant\": true/false, \"category\": \"job_search|agreement|bot_help|offtopic\"}\n\n\
                  Отвечай ТОЛЬКО в формате JSON без дополнительного текста.";
    let mut messages = vec![ChatMessage::system(system)];
    messages.extend(history_messages(history));
    messages.push(ChatMessage::user(message));
    messages
}

/// Intent understanding for message routing.
pub fn understand_intent(message: &str, history: &[ChatTurn]) -> Vec<ChatMessage> {
    let system = "Ты - ассистент по поиску работы. Определи намерение пользователя.\n\n\
                  НАМЕРЕНИЯ:\n\
                  - new_search: новый поиск вакансий\n\
                  - continue_previous: продолжение предложенного поиска (согласие)\n\
                  - refine_search: уточнение предыдущего поиска (город, зарплата, график)\n\
                  - question_about_results: вопрос о показанных вакансиях\n\
                  - offtopic: не относится к поиску работы\n\n\
                  ФОРМАТ ОТВЕТА (JSON):\n\
                  {\"intent\": \"...\", \"search_query\": \"текст для поиска или null\", \"city\": \"город или null\"}\n\n\
                  Отвечай ТОЛЬКО в формате JSON без дополнительного текста.";
    let mut messages = vec![ChatMessage::system(system)];
    messages.extend(history_messages(history));
    messages.push(ChatMessage::user(message));
    messages
}

/// Relevance filtering of a result set against the original query.
pub fn filter_relevance(
    items: &[Vacancy],
    query: &str,
    area_hint: Option<&str>,
    min_score: u8,
) -> Vec<ChatMessage> {
    let area_line = area_hint
        .map(|a| format!("Город поиска: {}\n", a))
        .unwrap_or_default();
    let system = format!(
        "Ты - карьерный консультант. Оцени релевантность вакансий запросу \"{query}\".\n\
         {area_line}\
         Оставь только вакансии с релевантностью не ниже {min_score} из 100.\n\n\
         ФОРМАТ ОТВЕТА (JSON):\n\
         {{\"relevant_indices\": [0, 2, 5]}}\n\n\
         Отвечай ТОЛЬКО в формате JSON без дополнительного текста."
    );
    vec![
        ChatMessage::system(system),
        ChatMessage::user(format!("Список вакансий:\n\n{}", vacancy_summaries(items))),
    ]
}

/// Best-vacancy ranking.
pub fn rank_best(items: &[Vacancy], query: &str, top_n: usize) -> Vec<ChatMessage> {
    let system = format!(
        "Ты - карьерный консультант. Выбери {top_n} САМЫХ подходящих вакансий из списка.\n\n\
         КРИТЕРИИ ЛУЧШИХ ВАКАНСИЙ:\n\
         1. Релевантность запросу \"{query}\"\n\
         2. Указанная зарплата и ясные условия\n\
         3. Конкретное описание требований и обязанностей\n\n\
         ФОРМАТ ОТВЕТА (JSON):\n\
         {{\"top_indices\": [3, 0, 7], \"analysis\": \"Краткое объяснение (2-3 предложения)\"}}\n\n\
         Отвечай ТОЛЬКО в формате JSON без дополнительного текста."
    );
    vec![
        ChatMessage::system(system),
        ChatMessage::user(format!("Список вакансий:\n\n{}", vacancy_summaries(items))),
    ]
}

/// Worst-vacancy ranking.
pub fn rank_worst(items: &[Vacancy], query: &str, top_n: usize) -> Vec<ChatMessage> {
    let system = format!(
        "Ты - карьерный консультант. Найди {top_n} НАИМЕНЕЕ подходящих вакансий из списка.\n\n\
         КРИТЕРИИ ХУДШИХ ВАКАНСИЙ:\n\
         1. Нерелевантность запросу \"{query}\"\n\
         2. Отсутствие зарплаты или неясные условия\n\
         3. Расплывчатое описание требований и обязанностей\n\n\
         ФОРМАТ ОТВЕТА (JSON):\n\
         {{\"worst_indices\": [18, 15, 12], \"explanation\": \"Краткое объяснение (2-3 предложения)\"}}\n\n\
         Отвечай ТОЛЬКО в формате JSON без дополнительного текста."
    );
    vec![
        ChatMessage::system(system),
        ChatMessage::user(format!("Список вакансий:\n\n{}", vacancy_summaries(items))),
    ]
}

/// Free-form question about the vacancies already shown.
pub fn answer_about_results(question: &str, items: &[Vacancy]) -> Vec<ChatMessage> {
    let listing = items
        .iter()
        .take(3)
        .map(|v| {
            format!(
                "- {} (График: {})",
                v.name,
                v.schedule
                    .as_ref()
                    .map(|s| s.name.as_str())
                    .unwrap_or("Не указано")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    vec![ChatMessage::user(format!(
        "Пользователь спрашивает: \"{question}\"\n\n\
         Последние показанные вакансии:\n{listing}\n\n\
         Ответь на вопрос конкретно, используя информацию о вакансиях. Будь кратким."
    ))]
}

/// Context-aware free-form reply used for soft off-topic nudges.
pub fn assistant_reply(
    message: &str,
    history: &[ChatTurn],
    capabilities: &str,
) -> Vec<ChatMessage> {
    let system = format!(
        "Ты - дружелюбный ассистент по поиску работы. Пользователь отвлёкся от темы.\n\
         Коротко и естественно отреагируй и мягко верни разговор к поиску работы.\n\
         Не выдумывай возможностей, которых у тебя нет.\n\n\
         ТВОИ ВОЗМОЖНОСТИ:\n{capabilities}"
    );
    let mut messages = vec![ChatMessage::system(system)];
    messages.extend(history_messages(history));
    messages.push(ChatMessage::user(message));
    messages
}

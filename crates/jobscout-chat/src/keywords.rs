//! Keyword sets for the local classification rules.
//!
//! All matching is substring-based over the lowercased message, except
//! agreement words which also match as standalone tokens. Russian stems
//! are deliberate: "работ" covers "работа", "работу", "работать".

/// Job-search vocabulary: a hit means the message is probably on topic.
pub static WORK_KEYWORDS: &[&str] = &[
    "работ",
    "вакан",
    "резюме",
    "карьер",
    "зарплат",
    "собеседован",
    "hh",
    "junior",
    "middle",
    "senior",
    "intern",
    "developer",
    "программист",
    "разработчик",
    "it",
    "компани",
    "должност",
    "python",
    "java",
    "frontend",
    "backend",
    "devops",
    "qa",
    "тестировщик",
    "искать",
    "ищу",
    "найти",
    "поиск",
    "устроиться",
    // Activities the user may want a job doing.
    "пилить",
    "готовить",
    "чинить",
    "строить",
    "убирать",
    "водить",
    "учить",
    "лечить",
    "продавать",
    "стричь",
    "ремонтировать",
    "заниматься",
    // Workplaces.
    "пиццери",
    "ресторан",
    "кафе",
    "склад",
    "магазин",
    "офис",
    "хочу",
];

/// Agreement/continuation cues ("yes, let's").
pub static AGREEMENT_KEYWORDS: &[&str] = &[
    "да",
    "давай",
    "хорошо",
    "ок",
    "окей",
    "okay",
    "согласен",
    "конечно",
    "поищем",
    "ищем",
    "начнём",
    "начинаем",
    "го",
    "yeah",
    "yes",
    "yep",
    "угу",
    "ага",
];

/// Requests to analyze or rank the current result set.
pub static ANALYSIS_KEYWORDS: &[&str] = &[
    "проанализ",
    "анализ",
    "отбер",
    "выдел",
    "порекоменд",
    "посовет",
    "какие лучше",
    "что выбрать",
    "analyze",
    "recommend",
];

/// Selecting the best of the current results.
pub static BEST_KEYWORDS: &[&str] = &[
    "топ",
    "лучш",
    "самы",
    "подходящ",
    "оптимальн",
    "интересн",
    "best",
    "top",
];

/// Selecting the worst of the current results.
pub static WORST_KEYWORDS: &[&str] = &["худш", "плох", "неподходящ", "worst"];

/// Questions about the bot itself.
pub static BOT_KEYWORDS: &[&str] = &[
    "помощь",
    "команд",
    "функци",
    "что умее",
    "статистик",
    "избранн",
];

/// Bare greetings and small talk openers.
pub static GREETING_KEYWORDS: &[&str] = &[
    "привет",
    "здравствуй",
    "добрый день",
    "добрый вечер",
    "доброе утро",
    "как дела",
    "как ты",
    "что нового",
    "как настроение",
];

/// Explicitly off-topic subjects.
pub static OFFTOPIC_KEYWORDS: &[&str] = &[
    "бог",
    "погод",
    "температур",
    "анекдот",
    "шутк",
    "расскаж",
    "философи",
    "жизн",
    "любов",
    "смысл",
    "вселенн",
    "религи",
];

/// Substring match over the lowercased text.
pub fn contains_any(lower_text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| lower_text.contains(k))
}

/// Agreement is matched as the whole message or a standalone token, so
/// "да" does not fire inside "выдача".
pub fn is_agreement(lower_text: &str) -> bool {
    AGREEMENT_KEYWORDS.iter().any(|k| {
        *k == lower_text || lower_text.split_whitespace().any(|token| token == *k)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_keywords_match_inflections() {
        assert!(contains_any("ищу работу в москве", WORK_KEYWORDS));
        assert!(contains_any("есть вакансии для джуна?", WORK_KEYWORDS));
        assert!(contains_any("python junior", WORK_KEYWORDS));
    }

    #[test]
    fn test_offtopic_without_work_context() {
        let text = "расскажи анекдот про погоду";
        assert!(contains_any(text, OFFTOPIC_KEYWORDS));
        assert!(!contains_any(text, WORK_KEYWORDS));
    }

    #[test]
    fn test_agreement_whole_message() {
        assert!(is_agreement("да"));
        assert!(is_agreement("ок"));
        assert!(is_agreement("да, давай"));
    }

    #[test]
    fn test_agreement_as_token_only() {
        assert!(is_agreement("ну да пожалуй"));
        // "да" inside another word must not count.
        assert!(!is_agreement("выдача результатов"));
    }

    #[test]
    fn test_greetings() {
        assert!(contains_any("привет!", GREETING_KEYWORDS));
        assert!(contains_any("добрый день", GREETING_KEYWORDS));
        assert!(!contains_any("ищу работу", GREETING_KEYWORDS));
    }

    #[test]
    fn test_analysis_and_ranking_keywords() {
        assert!(contains_any("проанализируй результаты", ANALYSIS_KEYWORDS));
        assert!(contains_any("покажи топ вакансий", BEST_KEYWORDS));
        assert!(contains_any("какие самые худшие?", WORST_KEYWORDS));
    }

    #[test]
    fn test_bot_keywords() {
        assert!(contains_any("что умеет этот бот", BOT_KEYWORDS));
        assert!(contains_any("покажи статистику", BOT_KEYWORDS));
    }
}

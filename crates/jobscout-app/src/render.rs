//! Plain-text rendering of engine replies for the terminal surface.

use jobscout_chat::{RankKind, RankedSelection, Reply, UserStats, VacancyCard, VacancyPage};
use jobscout_core::types::Vacancy;

/// Render one reply as terminal text.
pub fn reply(reply: &Reply) -> String {
    match reply {
        Reply::Bypass => String::new(),
        Reply::Text(text) => text.clone(),
        Reply::Page(page) => render_page(page),
        Reply::Ranked(selection) => render_ranked(selection),
        Reply::Favorites(rows) => render_favorites(rows),
        Reply::Stats(stats) => render_stats(stats),
    }
}

fn render_page(page: &VacancyPage) -> String {
    let mut out = format!(
        "🔍 Найдено {} вакансий по запросу: {}\nСтраница {} из {}\n",
        page.total_found,
        page.query,
        page.page + 1,
        page.total_pages.max(1)
    );
    for card in &page.cards {
        out.push('\n');
        out.push_str(&render_card(card));
    }
    out
}

fn render_ranked(selection: &RankedSelection) -> String {
    let mut out = match selection.kind {
        RankKind::Best => format!(
            "✨ Лучшие вакансии по запросу: {}\n💡 {}\n",
            selection.query, selection.rationale
        ),
        RankKind::Worst => format!(
            "⚠️ Наименее подходящие вакансии\n💡 {}\n",
            selection.rationale
        ),
    };
    for (rank, card) in selection.cards.iter().enumerate() {
        out.push('\n');
        out.push_str(&format!("#{} ", rank + 1));
        out.push_str(&render_card(card));
    }
    out
}

fn render_card(card: &VacancyCard) -> String {
    let mut out = render_vacancy(&card.vacancy);
    if card.is_favorite {
        out.push_str("\n⭐ в избранном");
    }
    out.push('\n');
    out
}

fn render_vacancy(vacancy: &Vacancy) -> String {
    let mut out = format!(
        "💼 {} [{}]\n🏢 {}\n📍 {}\n💰 {}",
        vacancy.name,
        vacancy.id,
        vacancy.company_name(),
        vacancy.location(),
        vacancy.salary_text(),
    );
    if let Some(experience) = vacancy.experience.as_ref().filter(|e| !e.name.is_empty()) {
        out.push_str(&format!("\n📊 Опыт: {}", experience.name));
    }
    if !vacancy.alternate_url.is_empty() {
        out.push_str(&format!("\n🔗 {}", vacancy.alternate_url));
    }
    out
}

fn render_favorites(rows: &[jobscout_storage::FavoriteRow]) -> String {
    if rows.is_empty() {
        return "В избранном пока пусто. Сохраняйте вакансии командой /fav ID.".to_string();
    }
    let mut out = format!("⭐ Избранное ({}):\n", rows.len());
    for row in rows {
        out.push_str(&format!(
            "\n💼 {} [{}]\n🏢 {}\n📍 {}\n💰 {}\n🔗 {}\n",
            row.vacancy_name, row.vacancy_id, row.company_name, row.location, row.salary, row.url
        ));
    }
    out
}

fn render_stats(stats: &UserStats) -> String {
    let mut out = format!(
        "📊 Ваша статистика\n🔍 Всего поисков: {}\n⭐ Избранных вакансий: {}",
        stats.search_count, stats.favorites_count
    );
    if !stats.recent_queries.is_empty() {
        out.push_str("\n\nПоследние запросы:");
        for query in &stats.recent_queries {
            out.push_str(&format!("\n• {}", query));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobscout_core::types::Salary;

    fn card(id: &str, favorite: bool) -> VacancyCard {
        VacancyCard {
            vacancy: Vacancy {
                id: id.to_string(),
                name: "Python developer".to_string(),
                salary: Some(Salary {
                    from: Some(150_000),
                    to: None,
                    currency: Some("RUR".into()),
                }),
                alternate_url: format!("https://example.com/{}", id),
                ..Vacancy::default()
            },
            is_favorite: favorite,
        }
    }

    #[test]
    fn test_render_page_shows_position_and_cards() {
        let page = VacancyPage {
            query: "python".to_string(),
            total_found: 42,
            page: 1,
            total_pages: 3,
            cards: vec![card("1", false), card("2", true)],
        };
        let text = reply(&Reply::Page(page));
        assert!(text.contains("Найдено 42"));
        assert!(text.contains("Страница 2 из 3"));
        assert!(text.contains("от 150 000 ₽"));
        assert!(text.contains("⭐ в избранном"));
    }

    #[test]
    fn test_render_ranked_numbers_cards() {
        let selection = RankedSelection {
            kind: RankKind::Best,
            query: "python".to_string(),
            rationale: "объяснение".to_string(),
            cards: vec![card("1", false), card("2", false)],
        };
        let text = reply(&Reply::Ranked(selection));
        assert!(text.contains("💡 объяснение"));
        assert!(text.contains("#1 "));
        assert!(text.contains("#2 "));
    }

    #[test]
    fn test_render_empty_favorites() {
        let text = reply(&Reply::Favorites(vec![]));
        assert!(text.contains("пусто"));
    }

    #[test]
    fn test_render_text_passthrough() {
        assert_eq!(reply(&Reply::text("привет")), "привет");
    }
}

//! Domain types shared across the jobscout crates.
//!
//! Mirrors the wire shapes of the vacancy listings API (vacancies,
//! salaries, snippets, area references) and defines the enums and
//! parameter structs the search pipeline passes around.

use serde::{Deserialize, Serialize};

// =============================================================================
// Search filter enums
// =============================================================================

/// Required work experience, using the listings API code values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Experience {
    #[serde(rename = "noExperience")]
    NoExperience,
    #[serde(rename = "between1And3")]
    Between1And3,
    #[serde(rename = "between3And6")]
    Between3And6,
    #[serde(rename = "moreThan6")]
    MoreThan6,
}

impl Experience {
    /// Wire code accepted by the listings API.
    pub fn as_code(self) -> &'static str {
        match self {
            Experience::NoExperience => "noExperience",
            Experience::Between1And3 => "between1And3",
            Experience::Between3And6 => "between3And6",
            Experience::MoreThan6 => "moreThan6",
        }
    }

    /// Map a colloquial level keyword (English or Russian) to a level.
    ///
    /// Returns `None` for anything that is not a recognized keyword, so
    /// the token falls through to the free-text bucket.
    pub fn from_keyword(word: &str) -> Option<Experience> {
        match word.to_lowercase().as_str() {
            "junior" | "джуниор" | "джун" => Some(Experience::Between1And3),
            "middle" | "миддл" | "мидл" => Some(Experience::Between3And6),
            "senior" | "сеньор" | "синьор" | "lead" | "лид" => {
                Some(Experience::MoreThan6)
            }
            "intern" | "интерн" | "стажер" | "стажёр" | "безопыта" => {
                Some(Experience::NoExperience)
            }
            _ => None,
        }
    }

    /// Human-readable label for headers and summaries.
    pub fn label(self) -> &'static str {
        match self {
            Experience::NoExperience => "без опыта",
            Experience::Between1And3 => "1-3 года",
            Experience::Between3And6 => "3-6 лет",
            Experience::MoreThan6 => "более 6 лет",
        }
    }
}

/// Work schedule, using the listings API code values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Schedule {
    #[serde(rename = "fullDay")]
    FullDay,
    #[serde(rename = "shift")]
    Shift,
    #[serde(rename = "flexible")]
    Flexible,
    #[serde(rename = "remote")]
    Remote,
    #[serde(rename = "flyInFlyOut")]
    FlyInFlyOut,
}

impl Schedule {
    pub fn as_code(self) -> &'static str {
        match self {
            Schedule::FullDay => "fullDay",
            Schedule::Shift => "shift",
            Schedule::Flexible => "flexible",
            Schedule::Remote => "remote",
            Schedule::FlyInFlyOut => "flyInFlyOut",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Schedule::FullDay => "полный день",
            Schedule::Shift => "сменный график",
            Schedule::Flexible => "гибкий график",
            Schedule::Remote => "удалённая работа",
            Schedule::FlyInFlyOut => "вахтовый метод",
        }
    }
}

/// Employment type, using the listings API code values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Employment {
    Full,
    Part,
    Project,
    Volunteer,
    Probation,
}

impl Employment {
    pub fn as_code(self) -> &'static str {
        match self {
            Employment::Full => "full",
            Employment::Part => "part",
            Employment::Project => "project",
            Employment::Volunteer => "volunteer",
            Employment::Probation => "probation",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Employment::Full => "полная занятость",
            Employment::Part => "частичная занятость",
            Employment::Project => "проектная работа",
            Employment::Volunteer => "волонтёрство",
            Employment::Probation => "стажировка",
        }
    }
}

// =============================================================================
// Vacancy wire model
// =============================================================================

/// Salary block as returned by the listings API.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Salary {
    pub from: Option<i64>,
    pub to: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

impl Salary {
    /// Render the salary as display text ("150 000 - 200 000 ₽",
    /// "от 150 000 ₽", "не указана").
    pub fn display(&self) -> String {
        let symbol = match self.currency.as_deref() {
            Some("RUR") | Some("RUB") | None => "₽",
            Some("USD") => "$",
            Some("EUR") => "€",
            Some("KZT") => "₸",
            Some(other) => other,
        };
        match (self.from, self.to) {
            (Some(from), Some(to)) => {
                format!("{} - {} {}", group_digits(from), group_digits(to), symbol)
            }
            (Some(from), None) => format!("от {} {}", group_digits(from), symbol),
            (None, Some(to)) => format!("до {} {}", group_digits(to), symbol),
            (None, None) => "не указана".to_string(),
        }
    }
}

/// Thousands separator used in salary display text.
fn group_digits(value: i64) -> String {
    let raw = value.abs().to_string();
    let mut grouped = String::with_capacity(raw.len() + raw.len() / 3);
    for (i, c) in raw.chars().enumerate() {
        if i > 0 && (raw.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Employer block (only the fields the core needs).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Employer {
    #[serde(default)]
    pub name: String,
}

/// Reference to an area within a vacancy record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AreaRef {
    #[serde(default)]
    pub name: String,
}

/// A field that only carries a display name (experience, schedule).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Named {
    #[serde(default)]
    pub name: String,
}

/// Short requirement/responsibility excerpt with listings markup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snippet {
    #[serde(default)]
    pub requirement: Option<String>,
    #[serde(default)]
    pub responsibility: Option<String>,
}

/// A vacancy record as returned by the listings API.
///
/// Unknown fields are ignored; everything except the id and title is
/// optional because the API omits blocks freely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vacancy {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub employer: Option<Employer>,
    #[serde(default)]
    pub salary: Option<Salary>,
    #[serde(default)]
    pub area: Option<AreaRef>,
    #[serde(default)]
    pub experience: Option<Named>,
    #[serde(default)]
    pub schedule: Option<Named>,
    #[serde(default)]
    pub snippet: Option<Snippet>,
    #[serde(default)]
    pub alternate_url: String,
}

impl Vacancy {
    pub fn company_name(&self) -> &str {
        self.employer
            .as_ref()
            .map(|e| e.name.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("Неизвестная компания")
    }

    pub fn location(&self) -> &str {
        self.area
            .as_ref()
            .map(|a| a.name.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("Не указано")
    }

    pub fn salary_text(&self) -> String {
        self.salary
            .as_ref()
            .map(Salary::display)
            .unwrap_or_else(|| "не указана".to_string())
    }
}

// =============================================================================
// Search parameters
// =============================================================================

/// Fully resolved parameters for a listings search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    pub text: Option<String>,
    /// Canonical area id (already resolved from a place name).
    pub area: Option<i64>,
    /// Minimum salary.
    pub salary: Option<u32>,
    pub only_with_salary: bool,
    pub experience: Option<Experience>,
    pub schedule: Option<Schedule>,
    pub employment: Option<Employment>,
    /// Results per request; the client caps this at 100.
    pub per_page: u32,
    /// Zero-based request page.
    pub page: u32,
    /// Recency window in days; the client caps this at 30.
    pub period: u32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            text: None,
            area: None,
            salary: None,
            only_with_salary: false,
            experience: None,
            schedule: None,
            employment: None,
            per_page: 10,
            page: 0,
            period: 30,
        }
    }
}

/// Structured parameters extracted from free text, before the area
/// name is resolved to an id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
    /// Free-text part of the query (position, keywords).
    #[serde(default)]
    pub text: String,
    /// Place name as written by the user, not yet resolved.
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub salary: Option<u32>,
    #[serde(default)]
    pub experience: Option<Experience>,
    #[serde(default)]
    pub schedule: Option<Schedule>,
    #[serde(default)]
    pub employment: Option<Employment>,
}

// =============================================================================
// Intent
// =============================================================================

/// What the user is trying to do with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    NewSearch,
    ContinuePrevious,
    RefineSearch,
    QuestionAboutResults,
    Offtopic,
    BotHelp,
}

// =============================================================================
// Conversation turns
// =============================================================================

/// Speaker role in the conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<ChatRole> {
        match s {
            "user" => Some(ChatRole::User),
            "assistant" => Some(ChatRole::Assistant),
            _ => None,
        }
    }
}

/// One role/text turn, the unit of conversation context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Experience keywords ----

    #[test]
    fn test_experience_from_keyword_english() {
        assert_eq!(Experience::from_keyword("junior"), Some(Experience::Between1And3));
        assert_eq!(Experience::from_keyword("middle"), Some(Experience::Between3And6));
        assert_eq!(Experience::from_keyword("senior"), Some(Experience::MoreThan6));
        assert_eq!(Experience::from_keyword("intern"), Some(Experience::NoExperience));
    }

    #[test]
    fn test_experience_from_keyword_russian() {
        assert_eq!(Experience::from_keyword("джун"), Some(Experience::Between1And3));
        assert_eq!(Experience::from_keyword("миддл"), Some(Experience::Between3And6));
        assert_eq!(Experience::from_keyword("сеньор"), Some(Experience::MoreThan6));
        assert_eq!(Experience::from_keyword("стажёр"), Some(Experience::NoExperience));
    }

    #[test]
    fn test_experience_from_keyword_case_insensitive() {
        assert_eq!(Experience::from_keyword("Junior"), Some(Experience::Between1And3));
        assert_eq!(Experience::from_keyword("SENIOR"), Some(Experience::MoreThan6));
    }

    #[test]
    fn test_experience_from_keyword_unknown() {
        assert_eq!(Experience::from_keyword("python"), None);
        assert_eq!(Experience::from_keyword(""), None);
    }

    #[test]
    fn test_experience_codes() {
        assert_eq!(Experience::NoExperience.as_code(), "noExperience");
        assert_eq!(Experience::Between1And3.as_code(), "between1And3");
        assert_eq!(Experience::Between3And6.as_code(), "between3And6");
        assert_eq!(Experience::MoreThan6.as_code(), "moreThan6");
    }

    #[test]
    fn test_enum_serde_round_trip() {
        let json = serde_json::to_string(&Experience::Between1And3).unwrap();
        assert_eq!(json, "\"between1And3\"");
        let back: Experience = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Experience::Between1And3);

        let json = serde_json::to_string(&Schedule::Remote).unwrap();
        assert_eq!(json, "\"remote\"");

        let json = serde_json::to_string(&Employment::Full).unwrap();
        assert_eq!(json, "\"full\"");
    }

    // ---- Salary display ----

    #[test]
    fn test_salary_display_range() {
        let s = Salary {
            from: Some(150_000),
            to: Some(200_000),
            currency: Some("RUR".into()),
        };
        assert_eq!(s.display(), "150 000 - 200 000 ₽");
    }

    #[test]
    fn test_salary_display_from_only() {
        let s = Salary {
            from: Some(90_000),
            to: None,
            currency: Some("RUR".into()),
        };
        assert_eq!(s.display(), "от 90 000 ₽");
    }

    #[test]
    fn test_salary_display_to_only_usd() {
        let s = Salary {
            from: None,
            to: Some(5_000),
            currency: Some("USD".into()),
        };
        assert_eq!(s.display(), "до 5 000 $");
    }

    #[test]
    fn test_salary_display_empty() {
        assert_eq!(Salary::default().display(), "не указана");
    }

    #[test]
    fn test_salary_display_unknown_currency_passthrough() {
        let s = Salary {
            from: Some(1_000),
            to: None,
            currency: Some("GEL".into()),
        };
        assert_eq!(s.display(), "от 1 000 GEL");
    }

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits(5), "5");
        assert_eq!(group_digits(1234), "1 234");
        assert_eq!(group_digits(1_234_567), "1 234 567");
    }

    // ---- Vacancy deserialization ----

    #[test]
    fn test_vacancy_deserialize_full() {
        let json = r#"{
            "id": "12345",
            "name": "Python developer",
            "employer": {"name": "Acme"},
            "salary": {"from": 150000, "to": null, "currency": "RUR"},
            "area": {"name": "Москва"},
            "experience": {"name": "От 1 года до 3 лет"},
            "schedule": {"name": "Удаленная работа"},
            "snippet": {"requirement": "Знание <b>Python</b>", "responsibility": null},
            "alternate_url": "https://example.com/vacancy/12345",
            "unknown_field": 42
        }"#;
        let v: Vacancy = serde_json::from_str(json).unwrap();
        assert_eq!(v.id, "12345");
        assert_eq!(v.company_name(), "Acme");
        assert_eq!(v.location(), "Москва");
        assert_eq!(v.salary_text(), "от 150 000 ₽");
    }

    #[test]
    fn test_vacancy_deserialize_sparse() {
        let v: Vacancy = serde_json::from_str(r#"{"id": "1"}"#).unwrap();
        assert_eq!(v.company_name(), "Неизвестная компания");
        assert_eq!(v.location(), "Не указано");
        assert_eq!(v.salary_text(), "не указана");
        assert!(v.alternate_url.is_empty());
    }

    // ---- ParsedQuery ----

    #[test]
    fn test_parsed_query_deserialize_llm_shape() {
        let json = r#"{"text": "python developer", "area": "москва", "salary": 150000,
                       "experience": "between1And3", "schedule": "remote"}"#;
        let q: ParsedQuery = serde_json::from_str(json).unwrap();
        assert_eq!(q.text, "python developer");
        assert_eq!(q.area.as_deref(), Some("москва"));
        assert_eq!(q.salary, Some(150_000));
        assert_eq!(q.experience, Some(Experience::Between1And3));
        assert_eq!(q.schedule, Some(Schedule::Remote));
        assert_eq!(q.employment, None);
    }

    #[test]
    fn test_parsed_query_deserialize_partial() {
        let q: ParsedQuery = serde_json::from_str(r#"{"text": "qa"}"#).unwrap();
        assert_eq!(q.text, "qa");
        assert!(q.area.is_none() && q.salary.is_none());
    }

    // ---- Chat turns ----

    #[test]
    fn test_chat_role_round_trip() {
        assert_eq!(ChatRole::parse("user"), Some(ChatRole::User));
        assert_eq!(ChatRole::parse("assistant"), Some(ChatRole::Assistant));
        assert_eq!(ChatRole::parse("system"), None);
        assert_eq!(ChatRole::User.as_str(), "user");
    }

    #[test]
    fn test_chat_turn_constructors() {
        let turn = ChatTurn::user("найди работу");
        assert_eq!(turn.role, ChatRole::User);
        assert_eq!(turn.content, "найди работу");
        assert_eq!(ChatTurn::assistant("ок").role, ChatRole::Assistant);
    }

    // ---- Intent ----

    #[test]
    fn test_intent_serde_snake_case() {
        let json = serde_json::to_string(&Intent::QuestionAboutResults).unwrap();
        assert_eq!(json, "\"question_about_results\"");
        let back: Intent = serde_json::from_str("\"new_search\"").unwrap();
        assert_eq!(back, Intent::NewSearch);
        assert!(serde_json::from_str::<Intent>("\"weather\"").is_err());
    }

    // ---- SearchParams ----

    #[test]
    fn test_search_params_defaults() {
        let p = SearchParams::default();
        assert_eq!(p.per_page, 10);
        assert_eq!(p.page, 0);
        assert_eq!(p.period, 30);
        assert!(!p.only_with_salary);
    }
}

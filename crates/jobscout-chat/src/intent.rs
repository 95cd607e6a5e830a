//! Keyword pre-screen that runs before any remote classification.

use crate::cascade::DecisionCascade;
use crate::keywords::{
    contains_any, is_agreement, ANALYSIS_KEYWORDS, BOT_KEYWORDS, GREETING_KEYWORDS,
    OFFTOPIC_KEYWORDS, WORK_KEYWORDS,
};

/// Local verdict for an incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Command or menu label: reset drift counters, let the delivery
    /// layer dispatch it.
    Bypass,
    /// Explicit analyze/rank language: straight to the results path.
    Analysis,
    /// Locally certain off-topic.
    Offtopic,
    /// Question about the bot's capabilities.
    BotHelp,
    /// Needs remote arbitration; a local keyword already suggested
    /// relevance, so failure defaults to relevant.
    EscalateLenient,
    /// Needs remote arbitration with no local signal; failure defaults
    /// to off-topic.
    EscalateStrict,
}

/// Build the pre-screen cascade.
///
/// Rule order matters: analysis language beats the greeting check so
/// "привет, проанализируй" still routes to the results path, and the
/// explicit off-topic rule yields to any work keyword in the same
/// message.
pub fn pre_screen(menu_labels: Vec<String>) -> DecisionCascade<str, Screen> {
    DecisionCascade::new()
        .rule(
            move |m: &str| m.starts_with('/') || menu_labels.iter().any(|label| label == m),
            Screen::Bypass,
        )
        .rule(
            |m: &str| contains_any(&m.to_lowercase(), ANALYSIS_KEYWORDS),
            Screen::Analysis,
        )
        .rule(
            |m: &str| {
                let lower = m.to_lowercase();
                contains_any(&lower, GREETING_KEYWORDS) && !is_agreement(&lower)
            },
            Screen::Offtopic,
        )
        .rule(
            |m: &str| {
                let lower = m.to_lowercase();
                contains_any(&lower, OFFTOPIC_KEYWORDS) && !contains_any(&lower, WORK_KEYWORDS)
            },
            Screen::Offtopic,
        )
        .rule(
            |m: &str| {
                let lower = m.to_lowercase();
                contains_any(&lower, WORK_KEYWORDS) || is_agreement(&lower)
            },
            Screen::EscalateLenient,
        )
        .rule(
            |m: &str| contains_any(&m.to_lowercase(), BOT_KEYWORDS),
            Screen::BotHelp,
        )
}

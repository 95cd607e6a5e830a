//! Conversational core of jobscout.
//!
//! Classifies incoming messages, guards against conversation drift,
//! parses search queries, manages per-user result sessions, and routes
//! everything through the [`ChatEngine`], which returns structured
//! [`Reply`] values for the delivery layer to render.

pub mod cascade;
pub mod drift;
pub mod engine;
pub mod error;
pub mod intent;
pub mod keywords;
pub mod parser;
pub mod reply;
pub mod session;

pub use cascade::{arbitrate, DecisionCascade};
pub use drift::{DriftAction, DriftPolicy};
pub use engine::ChatEngine;
pub use error::ChatError;
pub use intent::Screen;
pub use parser::fallback_parse;
pub use reply::{RankKind, RankedSelection, Reply, UserStats, VacancyCard, VacancyPage};
pub use session::{PageView, RankedAnalysis, SearchSession, SessionStore};

//! Deterministic fallback parser for search queries.
//!
//! Used when the completion service is unavailable or returns garbage.
//! Scans whitespace-separated tokens and captures each parameter kind
//! at most once; everything unconsumed is rejoined into the free-text
//! part of the query.

use jobscout_areas::{AreaIndex, AreaLookup};
use jobscout_core::types::{Experience, ParsedQuery};

/// Parse a query without any remote call. Always succeeds.
///
/// Token rules, first match wins per parameter kind:
/// - a pure-digit token becomes the minimum salary;
/// - a token resolving as a place name (index, else the legacy table
///   while the index has not loaded) becomes the area;
/// - a level keyword (junior/middle/senior/intern and synonyms) becomes
///   the experience filter;
/// - everything else joins the text bucket.
pub fn fallback_parse(query: &str, areas: &AreaIndex) -> ParsedQuery {
    let mut parsed = ParsedQuery::default();
    let mut text_tokens: Vec<&str> = Vec::new();

    for token in query.split_whitespace() {
        if parsed.salary.is_none() && is_pure_digits(token) {
            if let Ok(salary) = token.parse::<u32>() {
                parsed.salary = Some(salary);
                continue;
            }
        }

        if parsed.area.is_none() && resolve_area(token, areas) {
            parsed.area = Some(token.to_lowercase());
            continue;
        }

        if parsed.experience.is_none() {
            if let Some(level) = Experience::from_keyword(token) {
                parsed.experience = Some(level);
                continue;
            }
        }

        text_tokens.push(token);
    }

    parsed.text = if text_tokens.is_empty() {
        query.trim().to_string()
    } else {
        text_tokens.join(" ")
    };
    parsed
}

fn is_pure_digits(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

/// Does the token name a known place?
fn resolve_area(token: &str, areas: &AreaIndex) -> bool {
    match areas.find(token) {
        AreaLookup::Found(_) => true,
        // Exact and fuzzy misses against a loaded index can still hit
        // the legacy table; so can every lookup before load completes.
        AreaLookup::Unknown | AreaLookup::NotLoaded => AreaIndex::legacy_find(token).is_some(),
    }
}

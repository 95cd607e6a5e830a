//! In-memory area index with exact, alias, and fuzzy resolution.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::{debug, error, info, warn};

use jobscout_core::error::{JobscoutError, Result};
use jobscout_listings::{AreaNode, VacancySource};

use crate::similarity::similarity_ratio;

/// Minimum similarity for a fuzzy match to be accepted.
const FUZZY_CUTOFF: f64 = 0.8;

/// Abbreviations and colloquialisms mapped to canonical index keys.
static ALIASES: &[(&str, &str)] = &[
    ("питер", "санкт-петербург"),
    ("спб", "санкт-петербург"),
    ("мск", "москва"),
    ("нн", "нижний новгород"),
    ("екб", "екатеринбург"),
    ("нск", "новосибирск"),
    ("ростов", "ростов-на-дону"),
];

/// Well-known place ids used before the index has loaded.
///
/// Never consulted once the index is ready; the index takes precedence.
static LEGACY_AREAS: &[(&str, i64)] = &[
    ("москва", 1),
    ("moscow", 1),
    ("спб", 2),
    ("санкт-петербург", 2),
    ("saint-petersburg", 2),
    ("екатеринбург", 3),
    ("новосибирск", 4),
    ("казань", 88),
    ("нижний новгород", 66),
    ("россия", 113),
];

/// Largest cities, in display order, used to bias extraction prompts.
static POPULAR_CITIES: &[&str] = &[
    "москва",
    "санкт-петербург",
    "новосибирск",
    "екатеринбург",
    "казань",
    "нижний новгород",
    "челябинск",
    "самара",
    "омск",
    "ростов-на-дону",
    "уфа",
    "красноярск",
    "пермь",
    "воронеж",
    "волгоград",
    "краснодар",
    "саратов",
    "тюмень",
    "тольятти",
    "ижевск",
    "барнаул",
    "ульяновск",
    "иркутск",
    "хабаровск",
    "ярославль",
    "владивосток",
    "махачкала",
    "томск",
    "оренбург",
    "кемерово",
];

/// Shorter list offered while the index has not loaded.
static POPULAR_CITIES_FALLBACK: &[&str] = &[
    "москва",
    "санкт-петербург",
    "екатеринбург",
    "новосибирск",
    "казань",
];

/// Outcome of a place-name lookup.
///
/// `NotLoaded` is distinct from `Unknown` so callers can decide whether
/// to fall back to the legacy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaLookup {
    Found(i64),
    Unknown,
    NotLoaded,
}

impl AreaLookup {
    pub fn found(self) -> Option<i64> {
        match self {
            AreaLookup::Found(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct IndexState {
    name_to_id: HashMap<String, i64>,
    id_to_name: HashMap<i64, String>,
}

/// Index over the listings area tree.
///
/// Built once per process lifetime; rebuilding overwrites. All lookups
/// are read-only once the build has completed.
#[derive(Debug, Default)]
pub struct AreaIndex {
    state: RwLock<Option<IndexState>>,
}

impl AreaIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the area tree from the listings API and build the index.
    ///
    /// Fails softly: on error the index stays in the not-loaded state
    /// and the caller decides whether the legacy table is good enough.
    /// Returns the number of indexed places.
    pub async fn load(&self, source: &dyn VacancySource) -> Result<usize> {
        info!("Loading area tree from the listings API");
        let tree = source.areas().await?;
        if tree.is_empty() {
            return Err(JobscoutError::Listings(
                "area tree response was empty".to_string(),
            ));
        }
        Ok(self.build(&tree))
    }

    /// Build the index from an already-fetched tree, replacing any
    /// previous state. Returns the number of indexed places.
    pub fn build(&self, tree: &[AreaNode]) -> usize {
        let mut state = IndexState::default();
        collect_areas(tree, &mut state);
        let count = state.name_to_id.len();

        match self.state.write() {
            Ok(mut guard) => *guard = Some(state),
            Err(e) => {
                error!("Area index lock poisoned during build: {}", e);
                return 0;
            }
        }

        info!(places = count, "Area index built");
        count
    }

    pub fn is_loaded(&self) -> bool {
        self.state.read().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Resolve a place name to its canonical id.
    ///
    /// Resolution order, first hit wins: exact case-insensitive match,
    /// alias re-resolved against the index, fuzzy match above
    /// [`FUZZY_CUTOFF`].
    pub fn find(&self, name: &str) -> AreaLookup {
        let guard = match self.state.read() {
            Ok(g) => g,
            Err(e) => {
                error!("Area index lock poisoned: {}", e);
                return AreaLookup::NotLoaded;
            }
        };
        let Some(state) = guard.as_ref() else {
            warn!("Area index not loaded; lookup for {:?} unavailable", name);
            return AreaLookup::NotLoaded;
        };

        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return AreaLookup::Unknown;
        }

        // 1. Exact match.
        if let Some(&id) = state.name_to_id.get(&needle) {
            debug!(name, id, "Area resolved (exact)");
            return AreaLookup::Found(id);
        }

        // 2. Alias, re-resolved against the index.
        if let Some((_, canonical)) = ALIASES.iter().find(|(alias, _)| *alias == needle) {
            if let Some(&id) = state.name_to_id.get(*canonical) {
                debug!(name, canonical, id, "Area resolved (alias)");
                return AreaLookup::Found(id);
            }
        }

        // 3. Fuzzy match over all indexed names.
        let mut best: Option<(&str, f64)> = None;
        for key in state.name_to_id.keys() {
            let ratio = similarity_ratio(&needle, key);
            if ratio >= FUZZY_CUTOFF && best.map(|(_, b)| ratio > b).unwrap_or(true) {
                best = Some((key, ratio));
            }
        }
        if let Some((matched, ratio)) = best {
            let id = state.name_to_id[matched];
            info!(name, matched, ratio, id, "Area resolved (fuzzy)");
            return AreaLookup::Found(id);
        }

        debug!(name, "Area not found");
        AreaLookup::Unknown
    }

    /// Canonical display name for an id. `None` when unknown or the
    /// index has not loaded.
    pub fn display_name(&self, id: i64) -> Option<String> {
        self.state
            .read()
            .ok()?
            .as_ref()?
            .id_to_name
            .get(&id)
            .cloned()
    }

    /// Ordered popular-place names for prompt construction.
    pub fn popular_names(&self) -> &'static [&'static str] {
        if self.is_loaded() {
            POPULAR_CITIES
        } else {
            POPULAR_CITIES_FALLBACK
        }
    }

    /// Static pre-load fallback for a handful of well-known cities.
    pub fn legacy_find(name: &str) -> Option<i64> {
        let needle = name.trim().to_lowercase();
        LEGACY_AREAS
            .iter()
            .find(|(known, _)| *known == needle)
            .map(|&(_, id)| id)
    }
}

/// Recursive walk of the area tree, indexing every named node.
fn collect_areas(nodes: &[AreaNode], state: &mut IndexState) {
    for node in nodes {
        let name = node.name.trim();
        if !name.is_empty() {
            match node.id.parse::<i64>() {
                Ok(id) => {
                    state.name_to_id.insert(name.to_lowercase(), id);
                    state.id_to_name.insert(id, name.to_string());
                }
                Err(_) => {
                    warn!(id = %node.id, name, "Skipping area with non-numeric id");
                }
            }
        }
        if !node.areas.is_empty() {
            collect_areas(&node.areas, state);
        }
    }
}

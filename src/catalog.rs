//! Exercise catalog boundary. The engine only needs an opaque
//! `{id, name, source}` for an exercise added by name; search, aliasing,
//! and fuzzy matching live outside this crate.

use serde::{Deserialize, Serialize};

/// Where a session exercise's name came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum Source {
    Builtin,
    Custom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub source: Source,
}

pub trait Catalog {
    /// Resolve a user-typed name to a catalog entry.
    fn find(&self, name: &str) -> Option<CatalogEntry>;
}

/// The builtin movement list. Exact match first (case-insensitive), then
/// unique-prefix match; anything else falls through to the caller, which
/// treats the raw name as a custom entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

const BUILTIN: &[(&str, &str)] = &[
    ("squat", "Squat"),
    ("front-squat", "Front Squat"),
    ("bench-press", "Bench Press"),
    ("incline-bench-press", "Incline Bench Press"),
    ("overhead-press", "Overhead Press"),
    ("deadlift", "Deadlift"),
    ("romanian-deadlift", "Romanian Deadlift"),
    ("barbell-row", "Barbell Row"),
    ("pull-up", "Pull Up"),
    ("chin-up", "Chin Up"),
    ("dip", "Dip"),
    ("lat-pulldown", "Lat Pulldown"),
    ("leg-press", "Leg Press"),
    ("leg-curl", "Leg Curl"),
    ("lunge", "Lunge"),
    ("hip-thrust", "Hip Thrust"),
    ("biceps-curl", "Biceps Curl"),
    ("triceps-extension", "Triceps Extension"),
    ("lateral-raise", "Lateral Raise"),
    ("face-pull", "Face Pull"),
    ("calf-raise", "Calf Raise"),
    ("plank", "Plank"),
];

impl Catalog for BuiltinCatalog {
    fn find(&self, name: &str) -> Option<CatalogEntry> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        let exact = BUILTIN
            .iter()
            .find(|(_, display)| display.to_lowercase() == needle);
        if let Some((id, display)) = exact {
            return Some(CatalogEntry {
                id: (*id).to_string(),
                name: (*display).to_string(),
                source: Source::Builtin,
            });
        }
        let mut prefixed = BUILTIN
            .iter()
            .filter(|(_, display)| display.to_lowercase().starts_with(&needle));
        match (prefixed.next(), prefixed.next()) {
            (Some((id, display)), None) => Some(CatalogEntry {
                id: (*id).to_string(),
                name: (*display).to_string(),
                source: Source::Builtin,
            }),
            _ => None, // ambiguous or no match
        }
    }
}

//! Derived "session item" view: the ordered list of singles and supersets
//! the UI walks through. The flat exercise list stays the source of truth;
//! this projection is pure and stable so repeated calls over the same input
//! always yield the same order.

use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::session::Exercise;

/// Stable identity of a session item: a standalone exercise keeps its
/// exercise id, a superset is addressed by its group id. Keys survive
/// reorders and defers, unlike positional indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKey {
    Exercise(String),
    Group(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionItem {
    Single {
        exercise_id: String,
        is_complete: bool,
    },
    Superset {
        group_id: String,
        exercise_ids: Vec<String>,
        is_complete: bool,
    },
}

impl SessionItem {
    pub fn key(&self) -> ItemKey {
        match self {
            SessionItem::Single { exercise_id, .. } => ItemKey::Exercise(exercise_id.clone()),
            SessionItem::Superset { group_id, .. } => ItemKey::Group(group_id.clone()),
        }
    }

    pub fn exercise_ids(&self) -> Vec<&str> {
        match self {
            SessionItem::Single { exercise_id, .. } => vec![exercise_id.as_str()],
            SessionItem::Superset { exercise_ids, .. } => {
                exercise_ids.iter().map(String::as_str).collect()
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            SessionItem::Single { is_complete, .. } => *is_complete,
            SessionItem::Superset { is_complete, .. } => *is_complete,
        }
    }

    pub fn is_superset(&self) -> bool {
        matches!(self, SessionItem::Superset { .. })
    }
}

/// Project the flat exercise list into ordered session items.
///
/// Exercises sharing a `group_id` with at least two current members collapse
/// into one superset item positioned at the earliest member's index; a
/// `group_id` carried by a single exercise (a half-dissolved group loaded
/// from older data) renders as standalone. Every exercise appears in exactly
/// one item.
pub fn build_items(exercises: &[Exercise]) -> Vec<SessionItem> {
    let member_counts: HashMap<&str, usize> = exercises
        .iter()
        .filter_map(|e| e.group_id.as_deref())
        .counts();

    let mut items = Vec::new();
    let mut emitted_groups: Vec<&str> = Vec::new();

    for exercise in exercises {
        match exercise.group_id.as_deref() {
            Some(gid) if member_counts[gid] >= 2 => {
                if emitted_groups.contains(&gid) {
                    continue; // already emitted at the earliest member
                }
                emitted_groups.push(gid);
                let members: Vec<&Exercise> = exercises
                    .iter()
                    .filter(|e| e.group_id.as_deref() == Some(gid))
                    .collect();
                items.push(SessionItem::Superset {
                    group_id: gid.to_string(),
                    exercise_ids: members.iter().map(|e| e.id.clone()).collect(),
                    is_complete: members.iter().all(|e| e.is_complete),
                });
            }
            _ => items.push(SessionItem::Single {
                exercise_id: exercise.id.clone(),
                is_complete: exercise.is_complete,
            }),
        }
    }

    items
}

/// Find an item by key in a derived list.
pub fn find_item<'a>(items: &'a [SessionItem], key: &ItemKey) -> Option<&'a SessionItem> {
    items.iter().find(|i| &i.key() == key)
}

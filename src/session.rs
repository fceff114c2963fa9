use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Source;
use crate::items::ItemKey;

/// One logged set. Sets are ordered by `logged_at`, not by vector position;
/// the vector order happens to match because logging appends, but edits must
/// never rely on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Set {
    pub id: String,
    pub weight_kg: f64,
    pub reps: u32,
    pub logged_at: DateTime<Utc>,
    /// Seconds of rest that preceded this set, when known.
    pub rest_secs: Option<i64>,
    /// Shared by every set created in one superset "log set" action.
    pub superset_set_id: Option<String>,
}

/// A session-scoped exercise instance. `name` is denormalized from the
/// catalog at add time; the catalog id is not kept because the session only
/// ever addresses exercises by instance id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub source: Source,
    pub sets: Vec<Set>,
    pub is_complete: bool,
    /// Exercises sharing a `group_id` form one superset. None = standalone.
    pub group_id: Option<String>,
    /// Timestamp of the most recently logged set. Monotonic non-decreasing;
    /// set edits and deletes never move it.
    pub last_set_at: Option<DateTime<Utc>>,
}

impl Exercise {
    pub fn new(id: String, name: String, source: Source) -> Self {
        Self {
            id,
            name,
            source,
            sets: Vec::new(),
            is_complete: false,
            group_id: None,
            last_set_at: None,
        }
    }

    pub fn set(&self, set_id: &str) -> Option<&Set> {
        self.sets.iter().find(|s| s.id == set_id)
    }

    pub fn set_mut(&mut self, set_id: &str) -> Option<&mut Set> {
        self.sets.iter_mut().find(|s| s.id == set_id)
    }
}

/// The flat, ordered exercise collection plus session-level bookkeeping.
/// The ordered list is the single source of truth; session items are a
/// derived view (see `items`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub exercises: Vec<Exercise>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Mirror of the most recent set across the whole session, so rest-timer
    /// ownership survives a reload without rescanning eagerly.
    pub last_set_at: Option<DateTime<Utc>>,
    pub last_set_owner: Option<ItemKey>,
    next_exercise_seq: u64,
    next_set_seq: u64,
    next_group_seq: u64,
    next_correlation_seq: u64,
}

impl Session {
    pub fn new(id: String, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            exercises: Vec::new(),
            started_at,
            ended_at: None,
            last_set_at: None,
            last_set_owner: None,
            next_exercise_seq: 0,
            next_set_seq: 0,
            next_group_seq: 0,
            next_correlation_seq: 0,
        }
    }

    pub fn exercise(&self, id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    pub fn exercise_mut(&mut self, id: &str) -> Option<&mut Exercise> {
        self.exercises.iter_mut().find(|e| e.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.exercises.iter().position(|e| e.id == id)
    }

    pub fn group_members(&self, group_id: &str) -> Vec<&Exercise> {
        self.exercises
            .iter()
            .filter(|e| e.group_id.as_deref() == Some(group_id))
            .collect()
    }

    pub fn mint_exercise_id(&mut self) -> String {
        self.next_exercise_seq += 1;
        format!("ex-{}", self.next_exercise_seq)
    }

    pub fn mint_set_id(&mut self) -> String {
        self.next_set_seq += 1;
        format!("set-{}", self.next_set_seq)
    }

    pub fn mint_group_id(&mut self) -> String {
        self.next_group_seq += 1;
        format!("g-{}", self.next_group_seq)
    }

    pub fn mint_correlation_id(&mut self) -> String {
        self.next_correlation_seq += 1;
        format!("ss-{}", self.next_correlation_seq)
    }

    pub fn duration_secs(&self, now: DateTime<Utc>) -> i64 {
        crate::clock::elapsed_secs(self.ended_at.unwrap_or(now), self.started_at)
    }

    /// Record the most recent set across the session (drives ownership
    /// resume after reload).
    pub fn note_set_logged(&mut self, owner: ItemKey, at: DateTime<Utc>) {
        self.last_set_at = Some(at);
        self.last_set_owner = Some(owner);
    }

    pub fn summary(&self, now: DateTime<Utc>) -> SessionSummary {
        let set_count = self.exercises.iter().map(|e| e.sets.len()).sum();
        let total_volume_kg = self
            .exercises
            .iter()
            .flat_map(|e| &e.sets)
            .map(|s| s.weight_kg * s.reps as f64)
            .sum();
        SessionSummary {
            id: self.id.clone(),
            started_at: self.started_at,
            duration_secs: self.duration_secs(now),
            exercise_count: self.exercises.len(),
            set_count,
            total_volume_kg,
        }
    }
}

/// What goes into the history database when a session finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub duration_secs: i64,
    pub exercise_count: usize,
    pub set_count: usize,
    pub total_volume_kg: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn session_with(names: &[&str]) -> Session {
        let mut s = Session::new("s-1".into(), t(0));
        for name in names {
            let id = s.mint_exercise_id();
            s.exercises
                .push(Exercise::new(id, (*name).into(), Source::Custom));
        }
        s
    }

    #[test]
    fn minted_ids_are_unique_and_stable() {
        let mut s = Session::new("s-1".into(), t(0));
        assert_eq!(s.mint_exercise_id(), "ex-1");
        assert_eq!(s.mint_exercise_id(), "ex-2");
        assert_eq!(s.mint_group_id(), "g-1");
        assert_eq!(s.mint_set_id(), "set-1");
        assert_eq!(s.mint_correlation_id(), "ss-1");
    }

    #[test]
    fn lookup_by_id() {
        let s = session_with(&["Squat", "Bench Press"]);
        assert_eq!(s.exercise("ex-2").unwrap().name, "Bench Press");
        assert_eq!(s.position("ex-1"), Some(0));
        assert!(s.exercise("ex-9").is_none());
    }

    #[test]
    fn duration_uses_ended_at_when_finished() {
        let mut s = session_with(&[]);
        assert_eq!(s.duration_secs(t(120)), 120);
        s.ended_at = Some(t(60));
        assert_eq!(s.duration_secs(t(120)), 60);
    }

    #[test]
    fn summary_totals_volume_and_sets() {
        let mut s = session_with(&["Squat"]);
        let set_id = s.mint_set_id();
        let ex = s.exercise_mut("ex-1").unwrap();
        ex.sets.push(Set {
            id: set_id,
            weight_kg: 100.0,
            reps: 5,
            logged_at: t(10),
            rest_secs: None,
            superset_set_id: None,
        });
        let summary = s.summary(t(100));
        assert_eq!(summary.set_count, 1);
        assert_eq!(summary.exercise_count, 1);
        assert_eq!(summary.total_volume_kg, 500.0);
        assert_eq!(summary.duration_secs, 100);
    }
}

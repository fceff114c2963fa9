//! Set ledger: create, edit, and delete the sets hanging off each exercise.
//! Validation happens before any mutation, so a rejected call leaves the
//! session untouched. `last_set_at` moves only on creation — editing or
//! deleting history never changes rest-timer ownership.

use chrono::{DateTime, Utc};

use crate::error::{EngineError, EngineResult};
use crate::session::{Session, Set};

/// One member's numbers in a superset "log set" action.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSetEntry {
    pub exercise_id: String,
    pub weight_kg: f64,
    pub reps: u32,
}

fn validate_weight(weight_kg: f64) -> EngineResult<()> {
    if !weight_kg.is_finite() || weight_kg < 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "weight must be finite and non-negative, got {weight_kg}"
        )));
    }
    Ok(())
}

/// Append a set to an exercise. `rest_secs` is the rest that preceded this
/// set, when the caller (normally the rest timer) knows it. Returns the new
/// set id.
pub fn add_set(
    session: &mut Session,
    exercise_id: &str,
    weight_kg: f64,
    reps: u32,
    rest_secs: Option<i64>,
    now: DateTime<Utc>,
) -> EngineResult<String> {
    validate_weight(weight_kg)?;
    session.exercise(exercise_id).ok_or(EngineError::NotFound)?;

    let set_id = session.mint_set_id();
    let exercise = session.exercise_mut(exercise_id).unwrap();
    exercise.sets.push(Set {
        id: set_id.clone(),
        weight_kg,
        reps,
        logged_at: now,
        rest_secs,
        superset_set_id: None,
    });
    // last_set_at is monotonic even under clock skew
    exercise.last_set_at = Some(exercise.last_set_at.map_or(now, |prev| prev.max(now)));
    Ok(set_id)
}

/// Log one set for every listed member of a group in a single user action.
/// The shared correlation id is stamped on each created set so the sets can
/// later be recognized as entered together. Entries with invalid numbers are
/// skipped individually; an unknown exercise id rejects the whole call
/// before anything is written. Returns the ids of the sets created.
pub fn add_group_set(
    session: &mut Session,
    entries: &[GroupSetEntry],
    correlation_id: &str,
    now: DateTime<Utc>,
) -> EngineResult<Vec<String>> {
    if entries.is_empty() {
        return Err(EngineError::InvalidInput("empty group-set batch".into()));
    }
    for entry in entries {
        if session.exercise(&entry.exercise_id).is_none() {
            return Err(EngineError::NotFound);
        }
    }
    let valid: Vec<&GroupSetEntry> = entries
        .iter()
        .filter(|e| validate_weight(e.weight_kg).is_ok())
        .collect();
    if valid.is_empty() {
        return Err(EngineError::InvalidInput(
            "no valid entries in group-set batch".into(),
        ));
    }

    let mut created = Vec::with_capacity(valid.len());
    for entry in valid {
        let set_id = add_set(
            session,
            &entry.exercise_id,
            entry.weight_kg,
            entry.reps,
            None,
            now,
        )?;
        session
            .exercise_mut(&entry.exercise_id)
            .unwrap()
            .set_mut(&set_id)
            .unwrap()
            .superset_set_id = Some(correlation_id.to_string());
        created.push(set_id);
    }
    Ok(created)
}

/// Rewrite a set's numbers in place. Timestamps and rest are untouched.
pub fn update_set(
    session: &mut Session,
    exercise_id: &str,
    set_id: &str,
    weight_kg: f64,
    reps: u32,
) -> EngineResult<()> {
    validate_weight(weight_kg)?;
    let set = session
        .exercise_mut(exercise_id)
        .ok_or(EngineError::NotFound)?
        .set_mut(set_id)
        .ok_or(EngineError::NotFound)?;
    set.weight_kg = weight_kg;
    set.reps = reps;
    Ok(())
}

/// Remove exactly one set.
pub fn delete_set(session: &mut Session, exercise_id: &str, set_id: &str) -> EngineResult<()> {
    let exercise = session
        .exercise_mut(exercise_id)
        .ok_or(EngineError::NotFound)?;
    let pos = exercise
        .sets
        .iter()
        .position(|s| s.id == set_id)
        .ok_or(EngineError::NotFound)?;
    exercise.sets.remove(pos);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Source;
    use crate::session::Exercise;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn session_with(ids: &[&str]) -> Session {
        let mut s = Session::new("s-1".into(), t(0));
        for id in ids {
            s.exercises
                .push(Exercise::new((*id).into(), format!("name-{id}"), Source::Custom));
        }
        s
    }

    #[test]
    fn add_set_appends_and_bumps_last_set_at() {
        let mut s = session_with(&["a"]);
        let id = add_set(&mut s, "a", 60.0, 10, Some(90), t(10)).unwrap();
        let e = s.exercise("a").unwrap();
        assert_eq!(e.sets.len(), 1);
        assert_eq!(e.sets[0].id, id);
        assert_eq!(e.sets[0].rest_secs, Some(90));
        assert_eq!(e.last_set_at, Some(t(10)));
    }

    #[test]
    fn zero_reps_is_a_valid_timed_hold() {
        let mut s = session_with(&["a"]);
        add_set(&mut s, "a", 0.0, 0, None, t(1)).unwrap();
        assert_eq!(s.exercise("a").unwrap().sets[0].reps, 0);
    }

    #[test]
    fn add_set_rejects_bad_weight_without_mutation() {
        let mut s = session_with(&["a"]);
        for w in [f64::NAN, f64::INFINITY, -1.0] {
            assert_matches!(
                add_set(&mut s, "a", w, 5, None, t(1)),
                Err(EngineError::InvalidInput(_))
            );
        }
        assert!(s.exercise("a").unwrap().sets.is_empty());
        assert_eq!(s.exercise("a").unwrap().last_set_at, None);
    }

    #[test]
    fn add_set_unknown_exercise_is_not_found() {
        let mut s = session_with(&["a"]);
        assert_matches!(
            add_set(&mut s, "zz", 60.0, 5, None, t(1)),
            Err(EngineError::NotFound)
        );
    }

    #[test]
    fn last_set_at_never_moves_backwards() {
        let mut s = session_with(&["a"]);
        add_set(&mut s, "a", 60.0, 5, None, t(100)).unwrap();
        add_set(&mut s, "a", 60.0, 5, None, t(50)).unwrap(); // skewed clock
        assert_eq!(s.exercise("a").unwrap().last_set_at, Some(t(100)));
    }

    #[test]
    fn group_set_stamps_shared_correlation_id() {
        let mut s = session_with(&["a", "b"]);
        let created = add_group_set(
            &mut s,
            &[
                GroupSetEntry {
                    exercise_id: "a".into(),
                    weight_kg: 60.0,
                    reps: 10,
                },
                GroupSetEntry {
                    exercise_id: "b".into(),
                    weight_kg: 40.0,
                    reps: 12,
                },
            ],
            "corr-1",
            t(5),
        )
        .unwrap();
        assert_eq!(created.len(), 2);
        for id in ["a", "b"] {
            let set = &s.exercise(id).unwrap().sets[0];
            assert_eq!(set.superset_set_id.as_deref(), Some("corr-1"));
            assert_eq!(set.logged_at, t(5));
        }
    }

    #[test]
    fn group_set_skips_invalid_entries_individually() {
        let mut s = session_with(&["a", "b"]);
        let created = add_group_set(
            &mut s,
            &[
                GroupSetEntry {
                    exercise_id: "a".into(),
                    weight_kg: f64::NAN,
                    reps: 10,
                },
                GroupSetEntry {
                    exercise_id: "b".into(),
                    weight_kg: 40.0,
                    reps: 12,
                },
            ],
            "corr-2",
            t(5),
        )
        .unwrap();
        assert_eq!(created.len(), 1);
        assert!(s.exercise("a").unwrap().sets.is_empty());
        assert_eq!(s.exercise("b").unwrap().sets.len(), 1);
    }

    #[test]
    fn group_set_with_no_valid_entries_is_rejected_whole() {
        let mut s = session_with(&["a"]);
        let batch = [GroupSetEntry {
            exercise_id: "a".into(),
            weight_kg: -5.0,
            reps: 10,
        }];
        assert_matches!(
            add_group_set(&mut s, &batch, "corr-3", t(5)),
            Err(EngineError::InvalidInput(_))
        );
        assert!(s.exercise("a").unwrap().sets.is_empty());
    }

    #[test]
    fn group_set_rejects_unknown_member_before_writing() {
        let mut s = session_with(&["a"]);
        let batch = [
            GroupSetEntry {
                exercise_id: "a".into(),
                weight_kg: 60.0,
                reps: 10,
            },
            GroupSetEntry {
                exercise_id: "zz".into(),
                weight_kg: 40.0,
                reps: 12,
            },
        ];
        assert_matches!(
            add_group_set(&mut s, &batch, "corr-4", t(5)),
            Err(EngineError::NotFound)
        );
        assert!(s.exercise("a").unwrap().sets.is_empty());
    }

    #[test]
    fn update_then_delete_round_trip() {
        let mut s = session_with(&["a"]);
        let id = add_set(&mut s, "a", 60.0, 10, None, t(10)).unwrap();
        let before = s.exercise("a").unwrap().clone();

        // same-value update changes nothing observable
        update_set(&mut s, "a", &id, 60.0, 10).unwrap();
        assert_eq!(s.exercise("a").unwrap(), &before);

        update_set(&mut s, "a", &id, 62.5, 8).unwrap();
        let set = s.exercise("a").unwrap().set(&id).unwrap();
        assert_eq!(set.weight_kg, 62.5);
        assert_eq!(set.reps, 8);
        // edits never move the ownership timestamp
        assert_eq!(s.exercise("a").unwrap().last_set_at, Some(t(10)));

        delete_set(&mut s, "a", &id).unwrap();
        assert!(s.exercise("a").unwrap().sets.is_empty());
        assert_eq!(s.exercise("a").unwrap().last_set_at, Some(t(10)));
    }

    #[test]
    fn update_and_delete_unknown_ids_are_not_found() {
        let mut s = session_with(&["a"]);
        assert_matches!(
            update_set(&mut s, "a", "set-9", 60.0, 5),
            Err(EngineError::NotFound)
        );
        assert_matches!(delete_set(&mut s, "zz", "set-1"), Err(EngineError::NotFound));
    }
}

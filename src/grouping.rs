//! Superset membership mutations. These operate only on `group_id` and
//! presentation order; sets and completion flags are never touched, so
//! grouping changes commute with set logging.

use crate::error::{EngineError, EngineResult};
use crate::session::Session;

/// Pair two ungrouped exercises into a new superset. Returns the new
/// group id.
pub fn pair(session: &mut Session, id_a: &str, id_b: &str) -> EngineResult<String> {
    if id_a == id_b {
        return Err(EngineError::InvalidInput(
            "cannot pair an exercise with itself".into(),
        ));
    }
    if session.exercise(id_a).is_none() || session.exercise(id_b).is_none() {
        return Err(EngineError::NotFound);
    }
    if session.exercise(id_a).unwrap().group_id.is_some()
        || session.exercise(id_b).unwrap().group_id.is_some()
    {
        return Err(EngineError::AlreadyGrouped);
    }

    let group_id = session.mint_group_id();
    session.exercise_mut(id_a).unwrap().group_id = Some(group_id.clone());
    session.exercise_mut(id_b).unwrap().group_id = Some(group_id.clone());
    Ok(group_id)
}

/// Add an ungrouped exercise to an existing group. Re-adding a member of the
/// same group is rejected like any other grouped target.
pub fn add_to_group(session: &mut Session, group_id: &str, exercise_id: &str) -> EngineResult<()> {
    if session.group_members(group_id).len() < 2 {
        return Err(EngineError::NotFound);
    }
    let exercise = session
        .exercise(exercise_id)
        .ok_or(EngineError::NotFound)?;
    if exercise.group_id.is_some() {
        return Err(EngineError::AlreadyGrouped);
    }
    session.exercise_mut(exercise_id).unwrap().group_id = Some(group_id.to_string());
    Ok(())
}

/// Fold group B into group A. No-op when the ids are equal.
pub fn merge_groups(session: &mut Session, group_a: &str, group_b: &str) -> EngineResult<()> {
    if group_a == group_b {
        return Ok(());
    }
    if session.group_members(group_a).len() < 2 || session.group_members(group_b).len() < 2 {
        return Err(EngineError::NotFound);
    }
    for exercise in &mut session.exercises {
        if exercise.group_id.as_deref() == Some(group_b) {
            exercise.group_id = Some(group_a.to_string());
        }
    }
    Ok(())
}

/// Detach an exercise from its group. A superset cannot exist with one
/// member: when only one remains, its `group_id` is cleared too and the
/// group dissolves entirely.
pub fn remove_from_group(session: &mut Session, exercise_id: &str) -> EngineResult<()> {
    let group_id = session
        .exercise(exercise_id)
        .ok_or(EngineError::NotFound)?
        .group_id
        .clone()
        .ok_or(EngineError::NotFound)?;

    session.exercise_mut(exercise_id).unwrap().group_id = None;

    let remaining: Vec<String> = session
        .group_members(&group_id)
        .iter()
        .map(|e| e.id.clone())
        .collect();
    if remaining.len() < 2 {
        for id in remaining {
            session.exercise_mut(&id).unwrap().group_id = None;
        }
    }
    Ok(())
}

/// Replace `outgoing` with `incoming` inside a group. The incoming exercise
/// takes the outgoing one's presentation position and group id; the outgoing
/// exercise becomes standalone (it is not deleted).
pub fn swap_member(
    session: &mut Session,
    group_id: &str,
    outgoing_id: &str,
    incoming_id: &str,
) -> EngineResult<()> {
    let out_pos = session.position(outgoing_id).ok_or(EngineError::NotFound)?;
    let in_pos = session.position(incoming_id).ok_or(EngineError::NotFound)?;
    if session.exercise(outgoing_id).unwrap().group_id.as_deref() != Some(group_id) {
        return Err(EngineError::NotFound);
    }
    if session.exercise(incoming_id).unwrap().group_id.is_some() {
        return Err(EngineError::AlreadyGrouped);
    }

    session.exercises.swap(out_pos, in_pos);
    session.exercise_mut(incoming_id).unwrap().group_id = Some(group_id.to_string());
    session.exercise_mut(outgoing_id).unwrap().group_id = None;
    Ok(())
}

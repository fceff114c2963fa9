//! The command/result façade over the whole session. One method per user
//! action, each returning a typed result; the UI never mutates session state
//! directly. After every mutation the engine re-derives the item view,
//! repairs the cursors, and snapshots to the store. A failed save is
//! surfaced via `last_save_error` but never rolls back in-memory state, so
//! unsaved work survives for a retry.

use crate::catalog::{BuiltinCatalog, Catalog, CatalogEntry, Source};
use crate::clock::Clock;
use crate::error::{EngineError, EngineResult};
use crate::grouping;
use crate::items::{build_items, ItemKey, SessionItem};
use crate::ledger::{self, GroupSetEntry};
use crate::progression::FlowState;
use crate::rest_timer::RestTimer;
use crate::session::{Exercise, Session, SessionSummary};
use crate::storage::{PersistedSession, SessionStore};

pub struct SessionEngine<C: Clock> {
    session: Session,
    flow: FlowState,
    rest: RestTimer,
    clock: C,
    catalog: Box<dyn Catalog>,
    store: Option<Box<dyn SessionStore>>,
    last_save_error: Option<String>,
}

impl<C: Clock> SessionEngine<C> {
    pub fn start(clock: C, store: Option<Box<dyn SessionStore>>) -> Self {
        let started_at = clock.now();
        let session = Session::new(format!("s-{}", started_at.timestamp()), started_at);
        Self {
            session,
            flow: FlowState::default(),
            rest: RestTimer::default(),
            clock,
            catalog: Box::new(BuiltinCatalog),
            store,
            last_save_error: None,
        }
    }

    /// Rehydrate from a persisted snapshot. Rest-timer ownership is
    /// re-derived by scanning the exercises (group timestamp = max member
    /// `last_set_at`), so the resumed owner is exactly the entity with the
    /// globally latest set regardless of what was on disk.
    pub fn resume(state: PersistedSession, clock: C, store: Option<Box<dyn SessionStore>>) -> Self {
        let rest = RestTimer::resume(&state.session.exercises);
        let mut engine = Self {
            session: state.session,
            flow: state.flow,
            rest,
            clock,
            catalog: Box::new(BuiltinCatalog),
            store,
            last_save_error: None,
        };
        engine.flow.sync(&engine.items());
        engine
    }

    pub fn with_catalog(mut self, catalog: Box<dyn Catalog>) -> Self {
        self.catalog = catalog;
        self
    }

    // ---- read side ----

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn items(&self) -> Vec<SessionItem> {
        build_items(&self.session.exercises)
    }

    pub fn flow(&self) -> &FlowState {
        &self.flow
    }

    pub fn progression(&self) -> Option<ItemKey> {
        self.flow.progression().cloned()
    }

    pub fn focus(&self) -> Option<ItemKey> {
        self.flow.focus().cloned()
    }

    pub fn rest_owner(&self) -> Option<&ItemKey> {
        self.rest.owner()
    }

    pub fn rest_elapsed_secs(&self) -> Option<i64> {
        self.rest.elapsed(self.clock.now())
    }

    pub fn session_duration_secs(&self) -> i64 {
        self.session.duration_secs(self.clock.now())
    }

    pub fn last_save_error(&self) -> Option<&str> {
        self.last_save_error.as_deref()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // ---- exercise collection ----

    /// Add an exercise by name. Unknown names become custom entries with the
    /// raw name — resolving typos is the search subsystem's job, not ours.
    pub fn add_exercise(&mut self, name: &str) -> EngineResult<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidInput("empty exercise name".into()));
        }
        let entry = self.catalog.find(trimmed).unwrap_or(CatalogEntry {
            id: String::new(),
            name: trimmed.to_string(),
            source: Source::Custom,
        });
        let id = self.session.mint_exercise_id();
        self.session
            .exercises
            .push(Exercise::new(id.clone(), entry.name, entry.source));
        self.after_mutation();
        Ok(id)
    }

    /// Remove an exercise from the session entirely. Its group dissolves
    /// first when membership would drop below two.
    pub fn remove_exercise(&mut self, exercise_id: &str) -> EngineResult<()> {
        let grouped = self
            .session
            .exercise(exercise_id)
            .ok_or(EngineError::NotFound)?
            .group_id
            .is_some();
        if grouped {
            grouping::remove_from_group(&mut self.session, exercise_id)?;
        }
        if let Some(pos) = self.session.position(exercise_id) {
            self.session.exercises.remove(pos);
        }
        self.rekey_rest_owner();
        self.after_mutation();
        Ok(())
    }

    // ---- grouping ----

    pub fn pair(&mut self, id_a: &str, id_b: &str) -> EngineResult<String> {
        let group_id = grouping::pair(&mut self.session, id_a, id_b)?;
        self.rekey_rest_owner();
        self.after_mutation();
        Ok(group_id)
    }

    pub fn add_to_group(&mut self, group_id: &str, exercise_id: &str) -> EngineResult<()> {
        grouping::add_to_group(&mut self.session, group_id, exercise_id)?;
        self.rekey_rest_owner();
        self.after_mutation();
        Ok(())
    }

    pub fn merge_groups(&mut self, group_a: &str, group_b: &str) -> EngineResult<()> {
        grouping::merge_groups(&mut self.session, group_a, group_b)?;
        self.rekey_rest_owner();
        self.after_mutation();
        Ok(())
    }

    pub fn remove_from_group(&mut self, exercise_id: &str) -> EngineResult<()> {
        grouping::remove_from_group(&mut self.session, exercise_id)?;
        self.rekey_rest_owner();
        self.after_mutation();
        Ok(())
    }

    pub fn swap_member(
        &mut self,
        group_id: &str,
        outgoing_id: &str,
        incoming_id: &str,
    ) -> EngineResult<()> {
        grouping::swap_member(&mut self.session, group_id, outgoing_id, incoming_id)?;
        self.rekey_rest_owner();
        self.after_mutation();
        Ok(())
    }

    // ---- set ledger ----

    /// Log a set. The rest that preceded it is captured from the active
    /// timer, then ownership transfers to this exercise (or its group).
    pub fn add_set(&mut self, exercise_id: &str, weight_kg: f64, reps: u32) -> EngineResult<String> {
        let now = self.clock.now();
        let rest_secs = self.rest.elapsed(now);
        let set_id = ledger::add_set(&mut self.session, exercise_id, weight_kg, reps, rest_secs, now)?;
        let owner = self
            .rest
            .on_set_logged(self.session.exercise(exercise_id).unwrap(), now);
        self.session.note_set_logged(owner, now);
        self.after_mutation();
        Ok(set_id)
    }

    /// Log one set for each listed member of a group in a single action.
    /// Returns the correlation id stamped on the created sets.
    pub fn add_group_set(&mut self, entries: &[GroupSetEntry]) -> EngineResult<String> {
        let now = self.clock.now();
        let correlation_id = self.session.mint_correlation_id();
        let created = ledger::add_group_set(&mut self.session, entries, &correlation_id, now)?;

        // ownership goes to the (shared) group of the first logged member
        let first = entries
            .iter()
            .find(|e| {
                self.session
                    .exercise(&e.exercise_id)
                    .is_some_and(|ex| ex.sets.iter().any(|s| created.contains(&s.id)))
            })
            .map(|e| e.exercise_id.clone());
        if let Some(exercise_id) = first {
            let owner = self
                .rest
                .on_set_logged(self.session.exercise(&exercise_id).unwrap(), now);
            self.session.note_set_logged(owner, now);
        }
        self.after_mutation();
        Ok(correlation_id)
    }

    pub fn update_set(
        &mut self,
        exercise_id: &str,
        set_id: &str,
        weight_kg: f64,
        reps: u32,
    ) -> EngineResult<()> {
        ledger::update_set(&mut self.session, exercise_id, set_id, weight_kg, reps)?;
        self.after_mutation();
        Ok(())
    }

    pub fn delete_set(&mut self, exercise_id: &str, set_id: &str) -> EngineResult<()> {
        ledger::delete_set(&mut self.session, exercise_id, set_id)?;
        self.after_mutation();
        Ok(())
    }

    // ---- completion & workflow ----

    /// Mark one exercise finished. When that completes the item it belongs
    /// to, the timer it owned is cleared and the cursors advance.
    pub fn complete_exercise(&mut self, exercise_id: &str) -> EngineResult<()> {
        let exercise = self
            .session
            .exercise_mut(exercise_id)
            .ok_or(EngineError::NotFound)?;
        exercise.is_complete = true;
        self.settle_completion(self.item_key_of(exercise_id)?);
        Ok(())
    }

    /// Complete every member of a group at once.
    pub fn complete_group(&mut self, group_id: &str) -> EngineResult<()> {
        let members: Vec<String> = self
            .session
            .group_members(group_id)
            .iter()
            .map(|e| e.id.clone())
            .collect();
        if members.len() < 2 {
            return Err(EngineError::NotFound);
        }
        for id in members {
            self.session.exercise_mut(&id).unwrap().is_complete = true;
        }
        self.settle_completion(ItemKey::Group(group_id.to_string()));
        Ok(())
    }

    /// Flip an item back to incomplete so its sets can grow again.
    pub fn reopen(&mut self, key: &ItemKey) -> EngineResult<()> {
        let items = self.items();
        let item = crate::items::find_item(&items, key).ok_or(EngineError::NotFound)?;
        let ids: Vec<String> = item.exercise_ids().iter().map(|s| s.to_string()).collect();
        for id in ids {
            self.session.exercise_mut(&id).unwrap().is_complete = false;
        }
        self.after_mutation();
        Ok(())
    }

    pub fn skip(&mut self, key: ItemKey) -> EngineResult<()> {
        let items = self.items();
        self.flow.skip(&items, key)?;
        self.persist();
        Ok(())
    }

    pub fn unskip(&mut self, key: &ItemKey) {
        let items = self.items();
        self.flow.unskip(&items, key);
        self.persist();
    }

    /// Push an item to the end of the session order and advance progression
    /// past it. A superset moves atomically — defer never splits a group.
    pub fn defer(&mut self, key: &ItemKey) -> EngineResult<()> {
        let items = self.items();
        let item = crate::items::find_item(&items, key).ok_or(EngineError::NotFound)?;
        let ids: Vec<String> = item.exercise_ids().iter().map(|s| s.to_string()).collect();

        let mut moved = Vec::with_capacity(ids.len());
        self.session.exercises.retain_mut(|e| {
            if ids.contains(&e.id) {
                moved.push(e.clone());
                false
            } else {
                true
            }
        });
        self.session.exercises.extend(moved);

        let items = self.items();
        self.flow.on_item_deferred(&items, key);
        self.persist();
        Ok(())
    }

    pub fn focus_item(&mut self, key: ItemKey) -> EngineResult<()> {
        let items = self.items();
        self.flow.focus_item(&items, key)?;
        self.persist();
        Ok(())
    }

    /// Move an item one slot towards the front. The flat exercise order is
    /// rebuilt from the reordered item list, so groups move as a block.
    pub fn move_item_up(&mut self, key: &ItemKey) -> EngineResult<()> {
        self.move_item(key, -1)
    }

    pub fn move_item_down(&mut self, key: &ItemKey) -> EngineResult<()> {
        self.move_item(key, 1)
    }

    fn move_item(&mut self, key: &ItemKey, delta: isize) -> EngineResult<()> {
        let mut items = self.items();
        let idx = items
            .iter()
            .position(|i| &i.key() == key)
            .ok_or(EngineError::NotFound)?;
        let target = idx as isize + delta;
        if target < 0 || target as usize >= items.len() {
            return Ok(()); // already at the edge
        }
        items.swap(idx, target as usize);

        let order: Vec<String> = items
            .iter()
            .flat_map(|i| i.exercise_ids())
            .map(str::to_string)
            .collect();
        self.session
            .exercises
            .sort_by_key(|e| order.iter().position(|id| id == &e.id));
        self.after_mutation();
        Ok(())
    }

    pub fn dismiss_rest_timer(&mut self) {
        self.rest.clear();
        self.persist();
    }

    /// Finish the session: stamp `ended_at`, clear the resumable snapshot,
    /// and hand back the summary for the history database.
    pub fn finish(&mut self) -> SessionSummary {
        let now = self.clock.now();
        self.session.ended_at = Some(now);
        if let Some(store) = &self.store {
            if let Err(e) = store.clear() {
                self.last_save_error = Some(e.to_string());
            }
        }
        self.session.summary(now)
    }

    // ---- internals ----

    fn item_key_of(&self, exercise_id: &str) -> EngineResult<ItemKey> {
        let items = self.items();
        items
            .iter()
            .find(|i| i.exercise_ids().contains(&exercise_id))
            .map(SessionItem::key)
            .ok_or(EngineError::NotFound)
    }

    fn settle_completion(&mut self, key: ItemKey) {
        let items = self.items();
        let completed = crate::items::find_item(&items, &key)
            .map(SessionItem::is_complete)
            .unwrap_or(false);
        if completed {
            self.rest.clear_if_owner(&key);
            self.flow.on_item_completed(&items, &key);
        } else {
            self.flow.sync(&items);
        }
        self.persist();
    }

    /// Grouping changed item identities; keep the timer's owner key in step
    /// without resurrecting a dismissed timer.
    fn rekey_rest_owner(&mut self) {
        self.rest.rekey(&self.session.exercises);
    }

    fn after_mutation(&mut self) {
        let items = self.items();
        self.flow.sync(&items);
        self.persist();
    }

    fn persist(&mut self) {
        let Some(store) = &self.store else {
            return;
        };
        let snapshot = PersistedSession {
            session: self.session.clone(),
            flow: self.flow.clone(),
            rest: self.rest.clone(),
            updated_at: self.clock.now(),
        };
        match store.save(&snapshot) {
            Ok(()) => self.last_save_error = None,
            Err(e) => self.last_save_error = Some(e.to_string()),
        }
    }
}

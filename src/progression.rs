//! Focus and progression cursors over the derived item list. This is an
//! explicit state object handed to the engine on every operation, not
//! ambient UI state, so the whole workflow is unit-testable headlessly.
//!
//! Progression is "what's next": the first item in list order that is
//! neither complete nor skipped. Focus is "what the user is looking at" and
//! may point at a completed item while its sets are being edited; editing
//! history must never drag the progression cursor around.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::items::{find_item, ItemKey, SessionItem};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowState {
    progression: Option<ItemKey>,
    focus: Option<ItemKey>,
    last_focused: Option<ItemKey>,
    skipped: HashSet<ItemKey>,
}

impl FlowState {
    pub fn progression(&self) -> Option<&ItemKey> {
        self.progression.as_ref()
    }

    pub fn focus(&self) -> Option<&ItemKey> {
        self.focus.as_ref()
    }

    pub fn is_skipped(&self, key: &ItemKey) -> bool {
        self.skipped.contains(key)
    }

    /// The item the editing UI should land on when progression is finished:
    /// the last focused item if it still exists, else the last item in
    /// session order.
    pub fn last_focused_or_default(&self, items: &[SessionItem]) -> Option<ItemKey> {
        self.last_focused
            .as_ref()
            .filter(|k| find_item(items, k).is_some())
            .cloned()
            .or_else(|| items.last().map(SessionItem::key))
    }

    /// Re-derive the cursors after any mutation of the exercise collection.
    ///
    /// Progression always lands on the first not-complete, not-skipped item
    /// (None when every item is done). Focus is only repaired here when it
    /// dangles — a focus parked on a completed item stays put so the user
    /// can keep editing it.
    pub fn sync(&mut self, items: &[SessionItem]) {
        self.skipped.retain(|k| find_item(items, k).is_some());
        self.progression = items
            .iter()
            .find(|i| !i.is_complete() && !self.skipped.contains(&i.key()))
            .map(SessionItem::key);

        let focus_dangles = match &self.focus {
            Some(k) => find_item(items, k).is_none(),
            None => true,
        };
        if focus_dangles {
            self.focus = self.progression.clone();
        }
        if self.focus.is_some() {
            self.last_focused = self.focus.clone();
        }
    }

    /// Point the interaction focus at an item. Works for completed items
    /// (editing history); never moves the progression cursor.
    pub fn focus_item(&mut self, items: &[SessionItem], key: ItemKey) -> EngineResult<()> {
        if find_item(items, &key).is_none() {
            return Err(EngineError::NotFound);
        }
        self.focus = Some(key.clone());
        self.last_focused = Some(key);
        Ok(())
    }

    /// Called with the post-mutation item list after `key` flipped from
    /// incomplete to complete. When the completed item was the one under
    /// focus, focus advances together with progression.
    pub fn on_item_completed(&mut self, items: &[SessionItem], key: &ItemKey) {
        let was_focused = self.focus.as_ref() == Some(key);
        self.sync(items);
        if was_focused {
            self.focus = self.progression.clone();
            if self.focus.is_some() {
                self.last_focused = self.focus.clone();
            }
        }
    }

    /// Exclude an item from future auto-advance. The item stays editable;
    /// it just stops being "next".
    pub fn skip(&mut self, items: &[SessionItem], key: ItemKey) -> EngineResult<()> {
        let item = find_item(items, &key).ok_or(EngineError::NotFound)?;
        if item.is_complete() {
            return Err(EngineError::InvalidInput(
                "cannot skip a completed item".into(),
            ));
        }
        self.skipped.insert(key.clone());
        let was_focused = self.focus.as_ref() == Some(&key);
        self.sync(items);
        if was_focused {
            self.focus = self.progression.clone();
        }
        Ok(())
    }

    /// Undo a skip so the item participates in progression again.
    pub fn unskip(&mut self, items: &[SessionItem], key: &ItemKey) {
        self.skipped.remove(key);
        self.sync(items);
    }

    /// Called after the engine moved a deferred item to the end of the
    /// order; with the order changed, re-deriving progression advances past
    /// it naturally.
    pub fn on_item_deferred(&mut self, items: &[SessionItem], key: &ItemKey) {
        let was_focused = self.focus.as_ref() == Some(key);
        self.sync(items);
        if was_focused {
            self.focus = self.progression.clone();
        }
    }
}

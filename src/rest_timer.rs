//! Rest-timer ownership. The timer is never a running countdown: it is the
//! pair (owner, timestamp of the owner's most recent set), and elapsed time
//! is recomputed from the clock on every read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::elapsed_secs;
use crate::items::ItemKey;
use crate::session::Exercise;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestTimer {
    owner: Option<ItemKey>,
    since: Option<DateTime<Utc>>,
}

impl RestTimer {
    pub fn owner(&self) -> Option<&ItemKey> {
        self.owner.as_ref()
    }

    pub fn since(&self) -> Option<DateTime<Utc>> {
        self.since
    }

    /// Ownership transfer on set logging: the owner becomes the exercise's
    /// group when it has one, the exercise itself otherwise, timestamped
    /// with the just-logged set.
    pub fn on_set_logged(&mut self, exercise: &Exercise, logged_at: DateTime<Utc>) -> ItemKey {
        let owner = match &exercise.group_id {
            Some(gid) => ItemKey::Group(gid.clone()),
            None => ItemKey::Exercise(exercise.id.clone()),
        };
        self.owner = Some(owner.clone());
        self.since = Some(logged_at);
        owner
    }

    /// Rebuild ownership from persisted data. Each group's effective
    /// timestamp is the max `last_set_at` among its members; each standalone
    /// exercise uses its own. The globally latest entity wins; with no sets
    /// anywhere there is no owner and no timer.
    pub fn resume(exercises: &[Exercise]) -> Self {
        let mut best: Option<(ItemKey, DateTime<Utc>)> = None;
        for exercise in exercises {
            let Some(at) = exercise.last_set_at else {
                continue;
            };
            let key = match &exercise.group_id {
                Some(gid) => ItemKey::Group(gid.clone()),
                None => ItemKey::Exercise(exercise.id.clone()),
            };
            match &best {
                Some((_, t)) if *t >= at => {}
                _ => best = Some((key, at)),
            }
        }
        match best {
            Some((owner, since)) => Self {
                owner: Some(owner),
                since: Some(since),
            },
            None => Self::default(),
        }
    }

    /// Remap the owner key after a grouping change so it matches what a
    /// reload scan would produce. An exercise owner that joined a group now
    /// answers to the group key; an owner that vanished (removed exercise,
    /// dissolved group) hands over to the scan. A dismissed timer (no owner)
    /// stays dismissed.
    pub fn rekey(&mut self, exercises: &[Exercise]) {
        let Some(owner) = self.owner.clone() else {
            return;
        };
        match owner {
            ItemKey::Exercise(id) => match exercises.iter().find(|e| e.id == id) {
                Some(e) => {
                    if let Some(gid) = &e.group_id {
                        self.owner = Some(ItemKey::Group(gid.clone()));
                    }
                }
                None => *self = Self::resume(exercises),
            },
            ItemKey::Group(gid) => {
                let members = exercises
                    .iter()
                    .filter(|e| e.group_id.as_deref() == Some(gid.as_str()))
                    .count();
                if members < 2 {
                    *self = Self::resume(exercises);
                }
            }
        }
    }

    /// Explicit dismissal, or implicit clearing when the owner completes.
    pub fn clear(&mut self) {
        self.owner = None;
        self.since = None;
    }

    /// Clear only if `key` currently owns the timer.
    pub fn clear_if_owner(&mut self, key: &ItemKey) {
        if self.owner.as_ref() == Some(key) {
            self.clear();
        }
    }

    /// Seconds since the owner's last set, or None when no timer is active.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<i64> {
        self.since.map(|since| elapsed_secs(now, since))
    }
}

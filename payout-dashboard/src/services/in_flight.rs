//! Per-user markers for actions that are still waiting on the payout API.
//!
//! A second submit/approve/reject/create/delete from the same user on the same
//! target is refused locally until the first one resolves. This only debounces
//! repeated clicks; the API still decides races between different users.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("A {in_progress} request is already in progress, please wait")]
pub struct InFlightConflict {
    pub in_progress: &'static str,
}

#[derive(Clone, Default)]
pub struct InFlightActions {
    active: Arc<DashMap<String, &'static str>>,
}

/// Releases the marker when dropped.
pub struct InFlightGuard {
    active: Arc<DashMap<String, &'static str>>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active.remove(&self.key);
    }
}

impl InFlightActions {
    pub fn try_begin(
        &self,
        owner: &str,
        target: &str,
        action: &'static str,
    ) -> Result<InFlightGuard, InFlightConflict> {
        let key = format!("{owner}:{target}");
        match self.active.entry(key.clone()) {
            Entry::Occupied(existing) => Err(InFlightConflict {
                in_progress: existing.get(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(action);
                Ok(InFlightGuard {
                    active: Arc::clone(&self.active),
                    key,
                })
            }
        }
    }

    #[cfg(test)]
    fn is_active(&self, owner: &str, target: &str) -> bool {
        self.active.contains_key(&format!("{owner}:{target}"))
    }
}

#![forbid(unsafe_code)]

//! Ordered, deduplicating panel registry.
//!
//! # Design
//!
//! Two independent orderings are kept side by side and never merged:
//!
//! - **Creation order**: a `BTreeMap` keyed by a monotonic insertion index.
//!   Indices are assigned on insertion and never reused, so iteration is
//!   always in creation order no matter how panels were promoted. Draw
//!   order and last-writer-wins searches rely on this.
//! - **Recency**: a small stack of insertion indices. The top is the
//!   "current" panel. Promoting a panel only moves its index to the top.
//!
//! Key lookup and panel lookup are hash maps into the creation-order map.
//!
//! | Operation | Time          |
//! |-----------|---------------|
//! | `add`     | O(log n)      |
//! | `get`     | O(1) amort.   |
//! | `remove`  | O(n) recency  |
//! | `bubble`  | O(n) recency  |
//! | `current` | O(log n)      |
//!
//! # Key collisions
//!
//! Adding a *different* panel under a key that is already taken is governed
//! by [`KeyCollisionPolicy`]. `Replace` keeps the historical behavior of
//! evicting the stale entry with a warning; it silently aliases unrelated
//! requests whose keys happen to collide, so `Reject` is available for
//! callers that want the collision surfaced as an error.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::id::PanelId;
use crate::key::PlacementKey;

/// Anything the registry can hold.
pub trait Registrable {
    /// Stable identity of the value.
    fn panel_id(&self) -> PanelId;
}

/// What to do when a new panel is added under a key owned by another panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCollisionPolicy {
    /// Evict the existing entry with a warning and register the new panel.
    #[default]
    Replace,
    /// Fail with [`RegistryError::KeyCollision`].
    Reject,
}

/// Result of [`PanelRegistry::add`].
#[derive(Debug)]
pub enum AddOutcome<P> {
    /// Appended with a fresh insertion index.
    Added { index: u64 },
    /// The panel was already registered (under any key); nothing changed.
    AlreadyPresent,
    /// Appended after evicting the panel that owned the key.
    Replaced { index: u64, evicted: P },
}

impl<P> AddOutcome<P> {
    /// True unless the call was a no-op.
    #[must_use]
    pub fn inserted(&self) -> bool {
        !matches!(self, Self::AlreadyPresent)
    }
}

/// Registry failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The panel is not registered.
    NotFound(PanelId),
    /// The key is owned by another panel and the policy is `Reject`.
    KeyCollision { key: String, existing: PanelId },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "panel {id} is not registered"),
            Self::KeyCollision { key, existing } => {
                write!(f, "key {key} is already owned by panel {existing}")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

#[derive(Debug)]
struct Entry<P> {
    key: PlacementKey,
    panel: P,
}

/// Ordered collection of `(key, panel)` entries with "current" tracking.
#[derive(Debug)]
pub struct PanelRegistry<P> {
    entries: BTreeMap<u64, Entry<P>>,
    by_key: FxHashMap<PlacementKey, u64>,
    by_panel: FxHashMap<PanelId, u64>,
    recency: Vec<u64>,
    next_index: u64,
    generation: u64,
    policy: KeyCollisionPolicy,
}

impl<P: Registrable> PanelRegistry<P> {
    /// Empty registry with the default collision policy.
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(KeyCollisionPolicy::default())
    }

    /// Empty registry with an explicit collision policy.
    #[must_use]
    pub fn with_policy(policy: KeyCollisionPolicy) -> Self {
        Self {
            entries: BTreeMap::new(),
            by_key: FxHashMap::default(),
            by_panel: FxHashMap::default(),
            recency: Vec::new(),
            next_index: 0,
            generation: 0,
            policy,
        }
    }

    #[must_use]
    pub fn policy(&self) -> KeyCollisionPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: KeyCollisionPolicy) {
        self.policy = policy;
    }

    /// Register `panel` under `key`. The new entry becomes current.
    pub fn add(&mut self, key: PlacementKey, panel: P) -> Result<AddOutcome<P>, RegistryError> {
        let id = panel.panel_id();
        if self.by_panel.contains_key(&id) {
            return Ok(AddOutcome::AlreadyPresent);
        }

        let mut evicted = None;
        if let Some(&stale_index) = self.by_key.get(&key) {
            let existing = self.entries[&stale_index].panel.panel_id();
            match self.policy {
                KeyCollisionPolicy::Reject => {
                    return Err(RegistryError::KeyCollision {
                        key: key.to_string(),
                        existing,
                    });
                }
                KeyCollisionPolicy::Replace => {
                    tracing::warn!(
                        target: "figlay.registry",
                        key = %key,
                        evicted = %existing,
                        replacement = %id,
                        "key already existed; panel is being replaced"
                    );
                    evicted = Some(self.detach(stale_index));
                }
            }
        }

        self.next_index += 1;
        let index = self.next_index;
        self.by_key.insert(key.clone(), index);
        self.by_panel.insert(id, index);
        self.entries.insert(index, Entry { key, panel });
        self.recency.push(index);
        self.generation += 1;

        Ok(match evicted {
            Some(evicted) => AddOutcome::Replaced { index, evicted },
            None => AddOutcome::Added { index },
        })
    }

    /// Panel registered under `key`.
    #[must_use]
    pub fn get(&self, key: &PlacementKey) -> Option<&P> {
        let index = self.by_key.get(key)?;
        self.entries.get(index).map(|e| &e.panel)
    }

    /// Panel with identity `id`.
    #[must_use]
    pub fn get_by_id(&self, id: PanelId) -> Option<&P> {
        let index = self.by_panel.get(&id)?;
        self.entries.get(index).map(|e| &e.panel)
    }

    /// Mutable access to the panel with identity `id`.
    pub fn get_mut(&mut self, id: PanelId) -> Option<&mut P> {
        let index = self.by_panel.get(&id)?;
        self.entries.get_mut(index).map(|e| &mut e.panel)
    }

    /// Key the panel was registered under.
    #[must_use]
    pub fn key_of(&self, id: PanelId) -> Option<&PlacementKey> {
        let index = self.by_panel.get(&id)?;
        self.entries.get(index).map(|e| &e.key)
    }

    /// Insertion index of the panel.
    #[must_use]
    pub fn index_of(&self, id: PanelId) -> Option<u64> {
        self.by_panel.get(&id).copied()
    }

    #[must_use]
    pub fn contains(&self, id: PanelId) -> bool {
        self.by_panel.contains_key(&id)
    }

    /// Remove the entry owning `id` and hand the panel back.
    pub fn remove(&mut self, id: PanelId) -> Result<P, RegistryError> {
        let index = *self.by_panel.get(&id).ok_or(RegistryError::NotFound(id))?;
        let panel = self.detach(index);
        self.generation += 1;
        Ok(panel)
    }

    /// Make `id` the current panel without touching creation order.
    pub fn bubble(&mut self, id: PanelId) -> Result<(), RegistryError> {
        let index = *self.by_panel.get(&id).ok_or(RegistryError::NotFound(id))?;
        self.recency.retain(|&i| i != index);
        self.recency.push(index);
        self.generation += 1;
        Ok(())
    }

    /// The most recently added or promoted panel.
    #[must_use]
    pub fn current(&self) -> Option<&P> {
        let index = self.recency.last()?;
        self.entries.get(index).map(|e| &e.panel)
    }

    /// Key and panel of the current entry.
    #[must_use]
    pub fn current_entry(&self) -> Option<(&PlacementKey, &P)> {
        let index = self.recency.last()?;
        self.entries.get(index).map(|e| (&e.key, &e.panel))
    }

    /// Panels in ascending insertion order.
    pub fn ordered(&self) -> impl Iterator<Item = &P> + '_ {
        self.entries.values().map(|e| &e.panel)
    }

    /// Mutable panels in ascending insertion order.
    pub fn ordered_mut(&mut self) -> impl Iterator<Item = &mut P> + '_ {
        self.entries.values_mut().map(|e| &mut e.panel)
    }

    /// Panel ids in ascending insertion order.
    #[must_use]
    pub fn ids(&self) -> Vec<PanelId> {
        self.ordered().map(Registrable::panel_id).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mutation counter; bumped by every add, remove and bubble.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Remove everything, returning panels in insertion order.
    ///
    /// Insertion indices keep counting from where they were.
    pub fn clear(&mut self) -> Vec<P> {
        let drained = std::mem::take(&mut self.entries);
        self.by_key.clear();
        self.by_panel.clear();
        self.recency.clear();
        self.generation += 1;
        drained.into_values().map(|e| e.panel).collect()
    }

    fn detach(&mut self, index: u64) -> P {
        let entry = self
            .entries
            .remove(&index)
            .unwrap_or_else(|| unreachable!("index maps are kept in sync with entries"));
        self.by_key.remove(&entry.key);
        self.by_panel.remove(&entry.panel.panel_id());
        self.recency.retain(|&i| i != index);
        entry.panel
    }
}

impl<P: Registrable> Default for PanelRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

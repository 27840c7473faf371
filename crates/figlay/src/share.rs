#![forbid(unsafe_code)]

//! Axis-sharing groups.
//!
//! Panels that share an axis form a disjoint set. Joining two panels merges
//! their groups; removing a panel takes it out of its group and dissolves
//! the group once a single member is left.

use figlay_core::PanelId;
use rustc_hash::FxHashMap;

/// Disjoint groups of panels sharing one axis.
#[derive(Debug, Clone, Default)]
pub struct ShareGrouper {
    group_of: FxHashMap<PanelId, u64>,
    /// Members in join order.
    groups: FxHashMap<u64, Vec<PanelId>>,
    next_group: u64,
}

impl ShareGrouper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `a` and `b` in the same group.
    pub fn join(&mut self, a: PanelId, b: PanelId) {
        if a == b {
            return;
        }
        let ga = self.group_or_insert(a);
        match self.group_of.get(&b).copied() {
            None => {
                self.group_of.insert(b, ga);
                if let Some(members) = self.groups.get_mut(&ga) {
                    members.push(b);
                }
            }
            Some(gb) if gb == ga => {}
            Some(gb) => {
                let moved = self.groups.remove(&gb).unwrap_or_default();
                for id in &moved {
                    self.group_of.insert(*id, ga);
                }
                if let Some(members) = self.groups.get_mut(&ga) {
                    members.extend(moved);
                }
            }
        }
    }

    fn group_or_insert(&mut self, id: PanelId) -> u64 {
        if let Some(&group) = self.group_of.get(&id) {
            return group;
        }
        self.next_group += 1;
        let group = self.next_group;
        self.group_of.insert(id, group);
        self.groups.insert(group, vec![id]);
        group
    }

    /// True when `a` and `b` share.
    #[must_use]
    pub fn joined(&self, a: PanelId, b: PanelId) -> bool {
        match (self.group_of.get(&a), self.group_of.get(&b)) {
            (Some(ga), Some(gb)) => ga == gb,
            _ => false,
        }
    }

    /// Every panel sharing with `id`, `id` included. Empty when `id` shares
    /// with nothing.
    #[must_use]
    pub fn siblings(&self, id: PanelId) -> Vec<PanelId> {
        self.group_of
            .get(&id)
            .and_then(|g| self.groups.get(g))
            .cloned()
            .unwrap_or_default()
    }

    /// Take `id` out of its group.
    pub fn remove(&mut self, id: PanelId) {
        let Some(group) = self.group_of.remove(&id) else {
            return;
        };
        let Some(members) = self.groups.get_mut(&group) else {
            return;
        };
        members.retain(|&m| m != id);
        if members.len() <= 1 {
            for orphan in self.groups.remove(&group).unwrap_or_default() {
                self.group_of.remove(&orphan);
            }
        }
    }

    pub fn clear(&mut self) {
        self.group_of.clear();
        self.groups.clear();
    }

    /// True when no panel shares with another.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#![forbid(unsafe_code)]

//! Explicit observer registration.
//!
//! Owners (a figure, a coordinate frame) keep one [`ObserverList`] per event
//! kind. Callbacks are invoked synchronously, in registration order, by the
//! owner after the state change they describe has been fully applied.

use std::fmt;

use crate::id::ObserverId;

type Callback<E> = Box<dyn FnMut(&E)>;

/// Ordered list of callbacks for events of type `E`.
pub struct ObserverList<E> {
    entries: Vec<(ObserverId, Callback<E>)>,
}

impl<E> ObserverList<E> {
    /// Empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a callback. The returned handle disconnects it.
    pub fn connect(&mut self, callback: impl FnMut(&E) + 'static) -> ObserverId {
        let id = ObserverId::next();
        self.entries.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback. Returns `false` if the handle is unknown.
    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    /// Invoke every callback with `event`.
    pub fn notify(&mut self, event: &E) {
        for (_, callback) in &mut self.entries {
            callback(event);
        }
    }

    /// Drop every callback.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> Default for ObserverList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for ObserverList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverList")
            .field("len", &self.entries.len())
            .finish()
    }
}

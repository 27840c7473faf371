#![forbid(unsafe_code)]

//! Process-unique identifiers.
//!
//! Panels, figures, grids and observer registrations are identified by
//! opaque `u64` handles allocated from monotonic counters. Identifiers are
//! never reused within a process, so a stale handle can only ever miss.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $counter:ident, $prefix:literal) => {
        static $counter: AtomicU64 = AtomicU64::new(1);

        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Allocate a fresh identifier.
            #[must_use]
            pub fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }

            /// Wrap a raw value. Intended for tests and replay tooling.
            #[must_use]
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw value.
            #[must_use]
            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Identity of a placed panel.
    PanelId,
    NEXT_PANEL,
    "P"
);

define_id!(
    /// Identity of a figure.
    FigureId,
    NEXT_FIGURE,
    "F"
);

define_id!(
    /// Identity of a grid specification.
    GridId,
    NEXT_GRID,
    "G"
);

define_id!(
    /// Handle returned when registering an observer callback.
    ObserverId,
    NEXT_OBSERVER,
    "O"
);

static NEXT_SENTINEL: AtomicU64 = AtomicU64::new(1);

/// Allocate a unique sentinel value for placement keys.
pub(crate) fn next_sentinel() -> u64 {
    NEXT_SENTINEL.fetch_add(1, Ordering::Relaxed)
}

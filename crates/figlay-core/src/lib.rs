#![forbid(unsafe_code)]

//! Panel identity, placement keys, the panel registry and the coordinate
//! frame of a figure.

pub mod frame;
pub mod geometry;
pub mod id;
pub mod key;
pub mod logging;
pub mod observer;
pub mod registry;

pub use frame::{CoordinateFrame, GeometryError, ResolutionChanged, SurfaceHost, figaspect};
pub use id::{FigureId, GridId, ObserverId, PanelId};
pub use key::{KeyArg, KeyAtom, KeyCodec, PlacementKey, SlotKey};
pub use observer::ObserverList;
pub use registry::{AddOutcome, KeyCollisionPolicy, PanelRegistry, Registrable, RegistryError};

pub use kurbo::{Affine, Point, Rect, Size};

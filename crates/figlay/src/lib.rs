#![forbid(unsafe_code)]

//! figlay public facade crate.
//!
//! A [`Figure`] owns an ordered registry of panels, the coordinate frame
//! mapping normalized figure coordinates to device pixels, the grids panels
//! are placed on and the active layout mode. This crate re-exports the
//! building blocks from `figlay-core` and `figlay-layout` so most users only
//! depend on `figlay`.
//!
//! ```rust,ignore
//! use figlay::prelude::*;
//!
//! let mut fig = Figure::new();
//! let grid = fig.subplots(2, 2, ShareMode::All, ShareMode::Independent)?;
//! let mosaic = fig.subplot_mosaic_str("AAB\nCCB")?;
//! fig.subplots_adjust(SubplotParamsUpdate::default().wspace(0.3))?;
//! let rect = fig.panel_rect(mosaic.get("A").unwrap());
//! ```

pub mod config;
pub mod error;
pub mod figure;
pub mod panel;
pub mod share;

pub use config::{FigureConfig, FigureConfigError};
pub use error::{Error, Result};
pub use figure::{
    AxesChange, AxesChangeKind, Figure, MosaicPanels, PanelGrid, ShareMode, SubplotArgs,
};
pub use panel::{DEFAULT_PROJECTION, Panel, PanelOptions};
pub use share::ShareGrouper;

// --- Core re-exports -------------------------------------------------------

pub use figlay_core::{
    Affine, CoordinateFrame, FigureId, GeometryError, KeyArg, KeyAtom, KeyCodec,
    KeyCollisionPolicy, ObserverId, PanelId, PanelRegistry, PlacementKey, Point, Rect,
    RegistryError, ResolutionChanged, Size, SurfaceHost, figaspect, geometry,
};

// --- Layout re-exports -----------------------------------------------------

pub use figlay_layout::{
    ConstrainedPads, ConstrainedPadsUpdate, ConstraintGraph, ConstraintSolver, GridError,
    GridSpec, LayoutMode, ModeError, MosaicCell, MosaicError, MosaicLayout, PassOutcome,
    SolveError, SubplotIndex, SubplotParams, SubplotParamsUpdate, SubplotSpec, TightContext,
    TightFitter, TightPadding,
};

#[cfg(feature = "tracing-json")]
pub use figlay_core::logging::init_json_logging;

/// Everyday imports.
pub mod prelude {
    pub use crate::{
        Error, Figure, FigureConfig, PanelId, PanelOptions, Rect, Result, ShareMode,
        SubplotArgs, SubplotIndex, SubplotParamsUpdate,
    };
}

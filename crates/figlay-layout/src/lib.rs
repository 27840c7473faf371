#![forbid(unsafe_code)]

//! Grid resolution, mosaic planning and layout-mode arbitration.
//!
//! Everything here works in normalized figure coordinates and knows nothing
//! about panels beyond their ids; the `figlay` crate wires it to a figure.

pub mod arbiter;
pub mod constraint_graph;
pub mod grid;
pub mod mosaic;
pub mod params;

pub use arbiter::{
    ConstrainedPads, ConstrainedPadsUpdate, ConstraintSolver, FixedMarginFitter, LayoutArbiter,
    LayoutMode, ModeError, ModeTrigger, PassInput, PassOutcome, SolveError, TightContext,
    TightFitter, TightPadding,
};
pub use constraint_graph::{ConstraintGraph, CycleError, LayoutNode, NodeId, NodeKind};
pub use grid::{
    CellSpan, GridError, GridPositions, GridSpec, SubplotIndex, SubplotSpec, decode_shorthand,
    resolve_index,
};
pub use mosaic::{
    DEFAULT_EMPTY_SENTINEL, MosaicCell, MosaicError, MosaicLayout, MosaicPlan, MosaicPlanner,
    PlannedSlot,
};
pub use params::{SubplotParams, SubplotParamsUpdate};

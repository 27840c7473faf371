#![forbid(unsafe_code)]

//! Layout-mode arbitration.
//!
//! A figure is in exactly one [`LayoutMode`] at a time:
//!
//! ```text
//!            EnableTight            EnableConstrained
//!   Manual ──────────────▶ Tight ─────────────────────▶ Constrained
//!     ▲  ◀──────────────── │ ◀──────────────────────────    │
//!     │        Disable     │       EnableTight               │
//!     └────────────────────┴─────────────────────────────────┘
//!                 Disable / AdjustManual (always → Manual)
//! ```
//!
//! Manual parameter adjustment always wins: it forces `Manual`, warning when
//! it turns constrained layout off.
//!
//! Before each render pass [`LayoutArbiter::prepare_pass`] decides what, if
//! anything, to recompute:
//!
//! - `Constrained`: pads are made figure-relative, the dependency graph is
//!   handed to the [`ConstraintSolver`] and its rectangles are returned.
//!   Solver failures abort the step for this pass only.
//! - `Tight`: the [`TightFitter`] runs once per geometry stamp; failures are
//!   swallowed and the previous parameters kept.
//! - `Manual`: nothing.

use std::fmt;

use figlay_core::{GeometryError, PanelId, Rect, Size, geometry};
use serde::{Deserialize, Serialize};

use crate::constraint_graph::ConstraintGraph;
use crate::params::{SubplotParams, SubplotParamsUpdate};

/// Points per inch.
const POINTS_PER_INCH: f64 = 72.0;

/// Padding for tight fitting, in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TightPadding {
    /// Around the edge of the figure.
    pub pad: f64,
    /// Between adjacent columns; defaults to `pad`.
    pub w_pad: Option<f64>,
    /// Between adjacent rows; defaults to `pad`.
    pub h_pad: Option<f64>,
    /// Region, in normalized figure coordinates, the subplots must fit in.
    pub rect: Rect,
}

impl Default for TightPadding {
    fn default() -> Self {
        // 1.08 × a 10 pt font.
        Self {
            pad: 1.08 * 10.0 / POINTS_PER_INCH,
            w_pad: None,
            h_pad: None,
            rect: geometry::UNIT,
        }
    }
}

impl TightPadding {
    #[must_use]
    pub fn w_pad(&self) -> f64 {
        self.w_pad.unwrap_or(self.pad)
    }

    #[must_use]
    pub fn h_pad(&self) -> f64 {
        self.h_pad.unwrap_or(self.pad)
    }
}

/// Constrained-layout padding: `w_pad`/`h_pad` in inches, spacing as a
/// fraction of the subplot size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstrainedPads {
    pub w_pad: f64,
    pub h_pad: f64,
    pub wspace: f64,
    pub hspace: f64,
}

impl Default for ConstrainedPads {
    fn default() -> Self {
        Self {
            w_pad: 3.0 / POINTS_PER_INCH,
            h_pad: 3.0 / POINTS_PER_INCH,
            wspace: 0.02,
            hspace: 0.02,
        }
    }
}

impl ConstrainedPads {
    /// Pads as fractions of the figure size.
    #[must_use]
    pub fn relative_to(&self, size: Size) -> ConstrainedPads {
        let frac = |pad: f64, extent: f64| if extent > 0.0 { pad / extent } else { 0.0 };
        ConstrainedPads {
            w_pad: frac(self.w_pad, size.width),
            h_pad: frac(self.h_pad, size.height),
            ..*self
        }
    }
}

/// Partial [`ConstrainedPads`]; unset fields fall back to the defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstrainedPadsUpdate {
    pub w_pad: Option<f64>,
    pub h_pad: Option<f64>,
    pub wspace: Option<f64>,
    pub hspace: Option<f64>,
}

impl ConstrainedPadsUpdate {
    /// Resolve against `defaults`.
    #[must_use]
    pub fn resolve(&self, defaults: &ConstrainedPads) -> ConstrainedPads {
        ConstrainedPads {
            w_pad: self.w_pad.unwrap_or(defaults.w_pad),
            h_pad: self.h_pad.unwrap_or(defaults.h_pad),
            wspace: self.wspace.unwrap_or(defaults.wspace),
            hspace: self.hspace.unwrap_or(defaults.hspace),
        }
    }
}

/// The active layout mode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LayoutMode {
    #[default]
    Manual,
    Tight(TightPadding),
    Constrained(ConstrainedPads),
}

impl LayoutMode {
    /// Mode from independent on/off flags, as found in configuration.
    pub fn from_flags(
        tight: Option<TightPadding>,
        constrained: Option<ConstrainedPads>,
    ) -> Result<Self, ModeError> {
        match (tight, constrained) {
            (Some(_), Some(_)) => Err(ModeError::Incompatible {
                requested: "tight",
                active: "constrained",
            }),
            (Some(t), None) => Ok(Self::Tight(t)),
            (None, Some(c)) => Ok(Self::Constrained(c)),
            (None, None) => Ok(Self::Manual),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Tight(_) => "tight",
            Self::Constrained(_) => "constrained",
        }
    }

    #[must_use]
    pub fn is_tight(&self) -> bool {
        matches!(self, Self::Tight(_))
    }

    #[must_use]
    pub fn is_constrained(&self) -> bool {
        matches!(self, Self::Constrained(_))
    }

    /// Next mode for `trigger`. Pure.
    #[must_use]
    pub fn transition(self, trigger: ModeTrigger) -> Self {
        match trigger {
            ModeTrigger::EnableTight(p) => Self::Tight(p),
            ModeTrigger::EnableConstrained(p) => Self::Constrained(p),
            ModeTrigger::Disable | ModeTrigger::AdjustManual => Self::Manual,
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Events that change the layout mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModeTrigger {
    EnableTight(TightPadding),
    EnableConstrained(ConstrainedPads),
    Disable,
    /// Explicit manual parameter adjustment.
    AdjustManual,
}

/// Layout mode conflicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeError {
    Incompatible {
        requested: &'static str,
        active: &'static str,
    },
}

impl fmt::Display for ModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incompatible { requested, active } => write!(
                f,
                "{requested} layout is incompatible with the active {active} layout"
            ),
        }
    }
}

impl std::error::Error for ModeError {}

/// Failure reported by an external solver or fitter.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveError {
    /// No placement satisfies the constraints.
    Infeasible(String),
    /// Numerical breakdown inside the solver.
    Numeric(String),
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Infeasible(msg) => write!(f, "layout is infeasible: {msg}"),
            Self::Numeric(msg) => write!(f, "layout solver failed: {msg}"),
        }
    }
}

impl std::error::Error for SolveError {}

/// External constrained-layout solver.
pub trait ConstraintSolver {
    /// Final rectangles for (some of) the panels in `graph`. `pads` are
    /// figure-relative.
    fn solve(
        &mut self,
        graph: &ConstraintGraph,
        pads: &ConstrainedPads,
    ) -> Result<Vec<(PanelId, Rect)>, SolveError>;
}

/// Inputs to a tight fit.
#[derive(Debug, Clone, Copy)]
pub struct TightContext<'a> {
    /// Figure size in inches.
    pub figure_size: Size,
    pub padding: &'a TightPadding,
    /// Parameters currently in effect.
    pub params: &'a SubplotParams,
    /// Grid-placed panels and their current rectangles.
    pub panels: &'a [(PanelId, Rect)],
}

/// One-shot padding computation for tight layout.
pub trait TightFitter {
    /// Parameters that make the subplots fit; an empty update means "leave
    /// as is".
    fn fit(&mut self, ctx: &TightContext<'_>) -> Result<SubplotParamsUpdate, SolveError>;
}

/// Tight fitter for hosts without text metrics: margins are the padding
/// converted to figure fractions, spacing is left unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedMarginFitter;

impl TightFitter for FixedMarginFitter {
    fn fit(&mut self, ctx: &TightContext<'_>) -> Result<SubplotParamsUpdate, SolveError> {
        if ctx.panels.is_empty() {
            return Ok(SubplotParamsUpdate::default());
        }
        let Size { width, height } = ctx.figure_size;
        if width <= 0.0 || height <= 0.0 {
            return Err(SolveError::Infeasible("figure has zero extent".to_owned()));
        }
        let rect = ctx.padding.rect;
        let pad_x = ctx.padding.pad / width;
        let pad_y = ctx.padding.pad / height;
        let update = SubplotParamsUpdate::default()
            .left(rect.x0 + pad_x)
            .right(rect.x1 - pad_x)
            .bottom(rect.y0 + pad_y)
            .top(rect.y1 - pad_y);
        update
            .validate()
            .map_err(|e| SolveError::Infeasible(e.to_string()))?;
        Ok(update)
    }
}

/// What a render pass must apply.
#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    /// Keep current positions.
    Unchanged,
    /// New manual parameters; grid panels must be repositioned.
    Params(SubplotParams),
    /// Solver-assigned rectangles.
    Rects(Vec<(PanelId, Rect)>),
}

/// Per-pass facts the arbiter needs.
#[derive(Debug, Clone, Copy)]
pub struct PassInput<'a> {
    pub figure_size: Size,
    /// Changes whenever size, resolution or membership changes.
    pub stamp: u64,
    pub panels: &'a [(PanelId, Rect)],
}

/// Owns the active mode, the manual parameters and the external solvers.
pub struct LayoutArbiter {
    mode: LayoutMode,
    params: SubplotParams,
    default_pads: ConstrainedPads,
    tight_stamp: Option<u64>,
    fitter: Box<dyn TightFitter>,
    solver: Option<Box<dyn ConstraintSolver>>,
}

impl fmt::Debug for LayoutArbiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutArbiter")
            .field("mode", &self.mode)
            .field("params", &self.params)
            .field("default_pads", &self.default_pads)
            .field("tight_stamp", &self.tight_stamp)
            .field("solver", &self.solver.is_some())
            .finish()
    }
}

impl Default for LayoutArbiter {
    fn default() -> Self {
        Self::new(LayoutMode::Manual, SubplotParams::default())
    }
}

impl LayoutArbiter {
    #[must_use]
    pub fn new(mode: LayoutMode, params: SubplotParams) -> Self {
        Self {
            mode,
            params,
            default_pads: ConstrainedPads::default(),
            tight_stamp: None,
            fitter: Box::new(FixedMarginFitter),
            solver: None,
        }
    }

    /// Defaults used when constrained layout is enabled without pads.
    #[must_use]
    pub fn with_default_pads(mut self, pads: ConstrainedPads) -> Self {
        self.default_pads = pads;
        self
    }

    #[must_use]
    pub fn mode(&self) -> LayoutMode {
        self.mode
    }

    /// Manual parameters currently in effect.
    #[must_use]
    pub fn params(&self) -> &SubplotParams {
        &self.params
    }

    pub fn set_fitter(&mut self, fitter: Box<dyn TightFitter>) {
        self.fitter = fitter;
        self.tight_stamp = None;
    }

    pub fn set_solver(&mut self, solver: Box<dyn ConstraintSolver>) {
        self.solver = Some(solver);
    }

    #[must_use]
    pub fn has_solver(&self) -> bool {
        self.solver.is_some()
    }

    /// Apply `trigger`, returning the previous mode.
    pub fn transition(&mut self, trigger: ModeTrigger) -> LayoutMode {
        let previous = self.mode;
        self.mode = previous.transition(trigger);
        if matches!(trigger, ModeTrigger::AdjustManual) && previous.is_constrained() {
            tracing::warn!(
                target: "figlay.layout",
                "figure was using constrained layout, which is incompatible with \
                 manual adjustment; disabling constrained layout"
            );
        }
        if previous != self.mode {
            self.tight_stamp = None;
            tracing::debug!(
                target: "figlay.layout",
                from = previous.name(),
                to = self.mode.name(),
                "layout mode changed"
            );
        }
        previous
    }

    /// Manual adjustment: forces `Manual`, then validates and applies
    /// `update`.
    pub fn adjust(&mut self, update: &SubplotParamsUpdate) -> Result<(), GeometryError> {
        self.transition(ModeTrigger::AdjustManual);
        self.params.update(update)
    }

    /// Apply a fitted update without touching the mode.
    pub fn apply_fit(&mut self, update: &SubplotParamsUpdate) -> Result<(), GeometryError> {
        self.params.update(update)
    }

    /// Forget per-pass state so the next pass recomputes from scratch.
    pub fn reset_pass_state(&mut self) {
        self.tight_stamp = None;
    }

    /// Turn tight layout on (`Some`) or off (`None`).
    pub fn set_tight(&mut self, padding: Option<TightPadding>) {
        match padding {
            Some(p) => self.transition(ModeTrigger::EnableTight(p)),
            None if self.mode.is_tight() => self.transition(ModeTrigger::Disable),
            None => self.mode,
        };
    }

    /// Turn constrained layout on (`Some`) or off (`None`). Unset pads come
    /// from the defaults.
    pub fn set_constrained(&mut self, pads: Option<ConstrainedPadsUpdate>) {
        match pads {
            Some(update) => {
                let pads = update.resolve(&self.default_pads);
                self.transition(ModeTrigger::EnableConstrained(pads))
            }
            None if self.mode.is_constrained() => self.transition(ModeTrigger::Disable),
            None => self.mode,
        };
    }

    /// Replace the constrained pads; unset fields reset to the defaults.
    /// Takes effect immediately when constrained layout is active.
    pub fn set_constrained_pads(&mut self, update: ConstrainedPadsUpdate) {
        let pads = update.resolve(&self.default_pads);
        if let LayoutMode::Constrained(active) = &mut self.mode {
            *active = pads;
        }
    }

    /// Active constrained pads (or the defaults), optionally relative to
    /// `size`.
    #[must_use]
    pub fn constrained_pads(&self, relative_to: Option<Size>) -> ConstrainedPads {
        let pads = match self.mode {
            LayoutMode::Constrained(p) => p,
            _ => self.default_pads,
        };
        relative_to.map_or(pads, |size| pads.relative_to(size))
    }

    /// Run the tight fitter now, regardless of mode. Errors propagate.
    pub fn fit_tight(
        &mut self,
        padding: &TightPadding,
        figure_size: Size,
        panels: &[(PanelId, Rect)],
    ) -> Result<SubplotParamsUpdate, SolveError> {
        let ctx = TightContext {
            figure_size,
            padding,
            params: &self.params,
            panels,
        };
        self.fitter.fit(&ctx)
    }

    /// Run the solver now. Only valid in `Constrained` mode.
    pub fn run_constrained(
        &mut self,
        figure_size: Size,
        graph: &ConstraintGraph,
    ) -> Result<Result<Vec<(PanelId, Rect)>, SolveError>, ModeError> {
        let LayoutMode::Constrained(pads) = self.mode else {
            return Err(ModeError::Incompatible {
                requested: "constrained",
                active: self.mode.name(),
            });
        };
        let relative = pads.relative_to(figure_size);
        let Some(solver) = self.solver.as_mut() else {
            return Ok(Ok(Vec::new()));
        };
        Ok(solver.solve(graph, &relative))
    }

    /// Decide what the upcoming render pass must recompute. `build_graph` is
    /// only called in `Constrained` mode.
    pub fn prepare_pass(
        &mut self,
        input: &PassInput<'_>,
        build_graph: impl FnOnce() -> ConstraintGraph,
    ) -> PassOutcome {
        if input.panels.is_empty() {
            return PassOutcome::Unchanged;
        }
        match self.mode {
            LayoutMode::Manual => PassOutcome::Unchanged,
            LayoutMode::Constrained(_) => {
                if self.solver.is_none() {
                    tracing::debug!(target: "figlay.layout", "no constraint solver attached");
                    return PassOutcome::Unchanged;
                }
                let graph = build_graph();
                match self.run_constrained(input.figure_size, &graph) {
                    Ok(Ok(rects)) => PassOutcome::Rects(rects),
                    Ok(Err(err)) => {
                        tracing::warn!(
                            target: "figlay.layout",
                            error = %err,
                            "constrained layout failed; keeping previous positions"
                        );
                        PassOutcome::Unchanged
                    }
                    Err(_) => PassOutcome::Unchanged,
                }
            }
            LayoutMode::Tight(padding) => {
                if self.tight_stamp == Some(input.stamp) {
                    return PassOutcome::Unchanged;
                }
                self.tight_stamp = Some(input.stamp);
                let fitted = self
                    .fit_tight(&padding, input.figure_size, input.panels)
                    .map_err(|e| e.to_string())
                    .and_then(|update| {
                        let mut next = self.params;
                        next.update(&update).map(|()| next).map_err(|e| e.to_string())
                    });
                match fitted {
                    Ok(next) if next != self.params => {
                        self.params = next;
                        PassOutcome::Params(next)
                    }
                    Ok(_) => PassOutcome::Unchanged,
                    Err(reason) => {
                        tracing::debug!(
                            target: "figlay.layout",
                            %reason,
                            "tight layout fit failed; keeping previous parameters"
                        );
                        PassOutcome::Unchanged
                    }
                }
            }
        }
    }
}

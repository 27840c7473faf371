#![forbid(unsafe_code)]

//! The figure: panel registry, grids, coordinate frame and layout mode.
//!
//! # Placement
//!
//! Every placement request (`add_axes`, `add_subplot`, `subplots`,
//! `subplot_mosaic`, `gca`) is reduced to a [`PlacementKey`]:
//!
//! | Request                  | Key arguments        | Key options |
//! |--------------------------|----------------------|-------------|
//! | `add_axes(bounds)`       | the four bounds      | label       |
//! | `add_subplot(...)`       | the resolved slot    | label       |
//! | `subplot_mosaic(layout)` | each planned slot    | mosaic label|
//!
//! A request whose key is already registered returns the existing panel
//! (promoting it to current) as long as the projection matches. A
//! different projection under the same key creates a new panel, which
//! replaces the old one according to the registry's collision policy.
//!
//! # Render passes
//!
//! [`Figure::render_pass`] is the hook a host calls before drawing. It asks
//! the [`LayoutArbiter`] what to recompute for the active mode and applies
//! the result to the registered panels.
//!
//! # Observers
//!
//! Membership changes (added, removed, activated) are reported to axes
//! observers after the registry reflects them.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use figlay_core::{
    AddOutcome, CoordinateFrame, FigureId, GeometryError, KeyArg, KeyCodec, KeyCollisionPolicy,
    ObserverId, ObserverList, PanelId, PanelRegistry, PlacementKey, Rect, ResolutionChanged, Size,
    SurfaceHost, geometry,
};
use figlay_layout::{
    ConstrainedPads, ConstrainedPadsUpdate, ConstraintGraph, ConstraintSolver, GridSpec,
    LayoutArbiter, LayoutMode, ModeError, MosaicLayout, MosaicPlanner, NodeId, PassInput,
    PassOutcome, SubplotIndex, SubplotParams, SubplotParamsUpdate, SubplotSpec, TightFitter,
    TightPadding, decode_shorthand,
};
use rustc_hash::{FxHashMap, FxHasher};

use crate::config::{FigureConfig, FigureConfigError};
use crate::error::{Error, Result};
use crate::panel::{Panel, PanelOptions};
use crate::share::ShareGrouper;

/// Where `add_subplot` should put the panel.
#[derive(Debug, Clone)]
pub enum SubplotArgs {
    /// Three-digit form: `235` is a 2 × 3 grid, index 5.
    Shorthand(u32),
    /// 1-based index (or inclusive range) into an `nrows × ncols` grid.
    /// Grids of the same shape are shared between calls.
    Grid {
        nrows: u16,
        ncols: u16,
        index: SubplotIndex,
    },
    /// An explicit slot.
    Spec(SubplotSpec),
    /// A panel previously removed from this figure.
    Existing(Box<Panel>),
}

impl Default for SubplotArgs {
    fn default() -> Self {
        Self::Grid {
            nrows: 1,
            ncols: 1,
            index: SubplotIndex::Single(1),
        }
    }
}

impl From<u32> for SubplotArgs {
    fn from(n: u32) -> Self {
        Self::Shorthand(n)
    }
}

impl From<(u16, u16, u32)> for SubplotArgs {
    fn from((nrows, ncols, index): (u16, u16, u32)) -> Self {
        Self::Grid {
            nrows,
            ncols,
            index: SubplotIndex::Single(index),
        }
    }
}

impl From<(u16, u16, (u32, u32))> for SubplotArgs {
    fn from((nrows, ncols, (first, last)): (u16, u16, (u32, u32))) -> Self {
        Self::Grid {
            nrows,
            ncols,
            index: SubplotIndex::Range(first, last),
        }
    }
}

impl From<SubplotSpec> for SubplotArgs {
    fn from(spec: SubplotSpec) -> Self {
        Self::Spec(spec)
    }
}

impl From<Panel> for SubplotArgs {
    fn from(panel: Panel) -> Self {
        Self::Existing(Box::new(panel))
    }
}

/// Axis sharing for [`Figure::subplots`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShareMode {
    #[default]
    Independent,
    /// Every panel shares with every other.
    All,
    /// Panels in the same row share.
    Row,
    /// Panels in the same column share.
    Col,
}

/// Panels created by [`Figure::subplots`], row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelGrid {
    nrows: u16,
    ncols: u16,
    ids: Vec<PanelId>,
}

impl PanelGrid {
    #[must_use]
    pub fn nrows(&self) -> u16 {
        self.nrows
    }

    #[must_use]
    pub fn ncols(&self) -> u16 {
        self.ncols
    }

    #[must_use]
    pub fn get(&self, row: u16, col: u16) -> Option<PanelId> {
        if row >= self.nrows || col >= self.ncols {
            return None;
        }
        self.ids
            .get(usize::from(row) * usize::from(self.ncols) + usize::from(col))
            .copied()
    }

    /// One row of panels.
    #[must_use]
    pub fn row(&self, row: u16) -> &[PanelId] {
        let ncols = usize::from(self.ncols);
        let start = usize::from(row) * ncols;
        self.ids.get(start..start + ncols).unwrap_or(&[])
    }

    #[must_use]
    pub fn ids(&self) -> &[PanelId] {
        &self.ids
    }
}

/// Panels created by [`Figure::subplot_mosaic`], in plan order.
#[derive(Debug, Clone, Default)]
pub struct MosaicPanels {
    entries: Vec<(String, PanelId)>,
    index: FxHashMap<String, usize>,
}

impl MosaicPanels {
    fn push(&mut self, label: String, id: PanelId) {
        self.index.insert(label.clone(), self.entries.len());
        self.entries.push((label, id));
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<PanelId> {
        let &i = self.index.get(label)?;
        self.entries.get(i).map(|(_, id)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, PanelId)> + '_ {
        self.entries.iter().map(|(l, id)| (l.as_str(), *id))
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

/// Kind of membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxesChangeKind {
    Added,
    Removed,
    /// Made current without changing membership.
    Activated,
}

/// Event delivered to axes observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxesChange {
    pub figure: FigureId,
    pub panel: PanelId,
    pub kind: AxesChangeKind,
}

/// A figure and everything placed on it.
pub struct Figure {
    id: FigureId,
    frame: CoordinateFrame,
    panels: PanelRegistry<Panel>,
    arbiter: LayoutArbiter,
    grids: Vec<Rc<GridSpec>>,
    /// Grids created implicitly by `add_subplot`, by shape.
    implicit_grids: FxHashMap<(u16, u16), Rc<GridSpec>>,
    share_x: ShareGrouper,
    share_y: ShareGrouper,
    planner: MosaicPlanner,
    empty_sentinel: char,
    observers: ObserverList<AxesChange>,
}

impl fmt::Debug for Figure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Figure")
            .field("id", &self.id)
            .field("frame", &self.frame)
            .field("panels", &self.panels.len())
            .field("grids", &self.grids.len())
            .field("mode", &self.arbiter.mode().name())
            .finish_non_exhaustive()
    }
}

impl Default for Figure {
    fn default() -> Self {
        Self::new()
    }
}

impl Figure {
    /// Figure with the built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        let defaults = FigureConfig::default();
        Self::with_parts(
            CoordinateFrame::default(),
            LayoutArbiter::new(LayoutMode::Manual, defaults.subplot),
            defaults.key_collision,
            defaults.empty_sentinel,
        )
    }

    /// Figure built from `config`.
    ///
    /// Asking for tight and constrained layout at once fails with
    /// [`ModeError::Incompatible`]; any other problem with
    /// [`FigureConfigError::Invalid`].
    pub fn from_config(config: &FigureConfig) -> Result<Self> {
        let tight = config.autolayout.then(TightPadding::default);
        let constrained = config.constrained_layout.then_some(config.constrained_pads);
        let mode = LayoutMode::from_flags(tight, constrained)?;

        let problems = config.validate();
        if !problems.is_empty() {
            return Err(FigureConfigError::Invalid(problems).into());
        }

        let [width, height] = config.figsize;
        let frame = CoordinateFrame::new(width, height, config.dpi)?;
        let arbiter =
            LayoutArbiter::new(mode, config.subplot).with_default_pads(config.constrained_pads);
        Ok(Self::with_parts(
            frame,
            arbiter,
            config.key_collision,
            config.empty_sentinel,
        ))
    }

    fn with_parts(
        frame: CoordinateFrame,
        arbiter: LayoutArbiter,
        policy: KeyCollisionPolicy,
        empty_sentinel: char,
    ) -> Self {
        Self {
            id: FigureId::next(),
            frame,
            panels: PanelRegistry::with_policy(policy),
            arbiter,
            grids: Vec::new(),
            implicit_grids: FxHashMap::default(),
            share_x: ShareGrouper::new(),
            share_y: ShareGrouper::new(),
            planner: MosaicPlanner::new().with_empty_sentinel(empty_sentinel.to_string()),
            empty_sentinel,
            observers: ObserverList::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> FigureId {
        self.id
    }

    #[must_use]
    pub fn frame(&self) -> &CoordinateFrame {
        &self.frame
    }

    #[must_use]
    pub fn layout_mode(&self) -> LayoutMode {
        self.arbiter.mode()
    }

    /// Manual subplot parameters currently in effect.
    #[must_use]
    pub fn subplot_params(&self) -> &SubplotParams {
        self.arbiter.params()
    }

    /// Grids created through this figure, in creation order.
    #[must_use]
    pub fn grids(&self) -> &[Rc<GridSpec>] {
        &self.grids
    }

    pub fn set_tight_fitter(&mut self, fitter: Box<dyn TightFitter>) {
        self.arbiter.set_fitter(fitter);
    }

    pub fn set_constraint_solver(&mut self, solver: Box<dyn ConstraintSolver>) {
        self.arbiter.set_solver(solver);
    }

    // --- Placement ---------------------------------------------------------

    /// Place a free panel at `[left, bottom, width, height]` (normalized
    /// figure coordinates).
    pub fn add_axes(&mut self, bounds: [f64; 4], options: PanelOptions) -> Result<PanelId> {
        let [left, bottom, width, height] = bounds;
        let rect = geometry::from_bounds(left, bottom, width, height);
        if !geometry::is_finite(rect) {
            return Err(GeometryError::InvalidRect(rect).into());
        }
        let key = placement_key(&[KeyArg::from(bounds)], &options);
        let figure = self.id;
        self.place(key, &options, |key| Panel::free(figure, key, rect, &options))
    }

    /// Place a panel on a grid slot, or re-register a removed panel.
    pub fn add_subplot(
        &mut self,
        args: impl Into<SubplotArgs>,
        options: PanelOptions,
    ) -> Result<PanelId> {
        let spec = match args.into() {
            SubplotArgs::Existing(panel) => return self.readd(*panel),
            SubplotArgs::Shorthand(n) => {
                let (nrows, ncols, index) = decode_shorthand(n)?;
                self.implicit_slot(nrows, ncols, SubplotIndex::Single(index))?
            }
            SubplotArgs::Grid {
                nrows,
                ncols,
                index,
            } => self.implicit_slot(nrows, ncols, index)?,
            SubplotArgs::Spec(spec) => spec,
        };
        self.add_in_slot(spec, options)
    }

    /// Create an `nrows × ncols` grid and one panel per cell.
    pub fn subplots(
        &mut self,
        nrows: u16,
        ncols: u16,
        sharex: ShareMode,
        sharey: ShareMode,
    ) -> Result<PanelGrid> {
        let grid = self.add_gridspec(nrows, ncols, None)?;
        let mut ids = Vec::with_capacity(usize::from(nrows) * usize::from(ncols));
        for row in 0..nrows {
            for col in 0..ncols {
                let spec = grid.cell(row, col)?;
                ids.push(self.add_in_slot(spec, PanelOptions::default())?);
            }
        }
        let panels = PanelGrid { nrows, ncols, ids };
        link_shares(&mut self.share_x, &panels, sharex);
        link_shares(&mut self.share_y, &panels, sharey);
        Ok(panels)
    }

    /// Plan `layout` on a fresh grid and create one panel per label.
    pub fn subplot_mosaic(&mut self, layout: &MosaicLayout) -> Result<MosaicPanels> {
        let grid = GridSpec::new(layout.nrows(), layout.ncols())?.into_shared();
        let plan = self.planner.plan(Rc::clone(&grid), layout)?;
        self.grids.push(grid);

        let mut panels = MosaicPanels::default();
        for slot in plan.slots() {
            let options = PanelOptions::default().label(slot.label.clone());
            let id = self.add_in_slot(slot.spec.clone(), options)?;
            panels.push(slot.label.clone(), id);
        }
        tracing::debug!(
            target: "figlay.figure",
            figure = %self.id,
            panels = panels.len(),
            "mosaic placed"
        );
        Ok(panels)
    }

    /// [`Figure::subplot_mosaic`] for a text layout, one character per
    /// cell, using the figure's empty sentinel.
    pub fn subplot_mosaic_str(&mut self, text: &str) -> Result<MosaicPanels> {
        let layout = MosaicLayout::from_text(text, self.empty_sentinel)?;
        self.subplot_mosaic(&layout)
    }

    /// Create a grid tracked by the figure.
    pub fn add_gridspec(
        &mut self,
        nrows: u16,
        ncols: u16,
        params: Option<SubplotParamsUpdate>,
    ) -> Result<Rc<GridSpec>> {
        let mut grid = GridSpec::new(nrows, ncols)?;
        if let Some(params) = params {
            params.validate()?;
            grid = grid.with_params(params);
        }
        let grid = grid.into_shared();
        self.grids.push(Rc::clone(&grid));
        Ok(grid)
    }

    /// The current panel, creating a full-figure subplot when there is none
    /// or when it does not have the requested projection.
    pub fn gca(&mut self, options: PanelOptions) -> Result<PanelId> {
        if let Some(current) = self.panels.current() {
            match &options.projection {
                Some(requested) if requested != current.projection() => {
                    tracing::warn!(
                        target: "figlay.figure",
                        current = %current.id(),
                        projection = current.projection(),
                        requested = requested.as_str(),
                        "current panel has a different projection; creating a new panel"
                    );
                }
                _ => return Ok(current.id()),
            }
        }
        self.add_subplot(SubplotArgs::default(), options)
    }

    /// Make `id` the current panel.
    pub fn sca(&mut self, id: PanelId) -> Result<()> {
        self.activate(id)
    }

    /// Remove a panel, breaking its share links, and hand it back.
    pub fn delaxes(&mut self, id: PanelId) -> Result<Panel> {
        let panel = self.panels.remove(id)?;
        self.forget(id);
        tracing::debug!(target: "figlay.figure", figure = %self.id, panel = %id, "panel removed");
        self.notify(id, AxesChangeKind::Removed);
        Ok(panel)
    }

    /// Remove every panel and grid and reset per-pass layout state. Axes and
    /// resolution observers survive only with `keep_observers`.
    pub fn clear(&mut self, keep_observers: bool) {
        for panel in self.panels.clear() {
            self.notify(panel.id(), AxesChangeKind::Removed);
        }
        self.share_x.clear();
        self.share_y.clear();
        self.grids.clear();
        self.implicit_grids.clear();
        self.arbiter.reset_pass_state();
        if !keep_observers {
            self.observers.clear();
            self.frame.clear_observers();
        }
    }

    fn implicit_slot(
        &mut self,
        nrows: u16,
        ncols: u16,
        index: SubplotIndex,
    ) -> Result<SubplotSpec> {
        let (grid, fresh) = match self.implicit_grids.get(&(nrows, ncols)) {
            Some(grid) => (Rc::clone(grid), false),
            None => (GridSpec::new(nrows, ncols)?.into_shared(), true),
        };
        let spec = grid.slot(index)?;
        if fresh {
            self.implicit_grids.insert((nrows, ncols), Rc::clone(&grid));
            self.grids.push(grid);
        }
        Ok(spec)
    }

    fn add_in_slot(&mut self, spec: SubplotSpec, options: PanelOptions) -> Result<PanelId> {
        let key = placement_key(&[KeyArg::Slot(spec.slot_key())], &options);
        let figure = self.id;
        let params = *self.arbiter.params();
        self.place(key, &options, |key| {
            Panel::in_slot(figure, key, spec, &params, &options)
        })
    }

    fn readd(&mut self, mut panel: Panel) -> Result<PanelId> {
        if panel.figure() != self.id {
            return Err(Error::ForeignPanel {
                panel: panel.id(),
                owner: panel.figure(),
                figure: self.id,
            });
        }
        let id = panel.id();
        panel.reposition(self.arbiter.params());
        let key = panel.key().clone();
        self.register(key, panel)?;
        Ok(id)
    }

    /// Return the panel under `key` if its projection matches, otherwise
    /// register a new one from `build`.
    fn place(
        &mut self,
        key: PlacementKey,
        options: &PanelOptions,
        build: impl FnOnce(PlacementKey) -> Panel,
    ) -> Result<PanelId> {
        if let Some(existing) = self.panels.get(&key)
            && existing.projection() == options.projection_or_default()
        {
            let id = existing.id();
            self.activate(id)?;
            return Ok(id);
        }
        let panel = build(key.clone());
        let id = panel.id();
        self.register(key, panel)?;
        Ok(id)
    }

    fn register(&mut self, key: PlacementKey, panel: Panel) -> Result<()> {
        let id = panel.id();
        match self.panels.add(key, panel)? {
            AddOutcome::AlreadyPresent => return self.activate(id),
            AddOutcome::Replaced { evicted, .. } => {
                let evicted = evicted.id();
                self.forget(evicted);
                self.notify(evicted, AxesChangeKind::Removed);
            }
            AddOutcome::Added { .. } => {}
        }
        tracing::debug!(target: "figlay.figure", figure = %self.id, panel = %id, "panel added");
        self.notify(id, AxesChangeKind::Added);
        Ok(())
    }

    fn activate(&mut self, id: PanelId) -> Result<()> {
        self.panels.bubble(id)?;
        self.notify(id, AxesChangeKind::Activated);
        Ok(())
    }

    fn forget(&mut self, id: PanelId) {
        self.share_x.remove(id);
        self.share_y.remove(id);
    }

    fn notify(&mut self, panel: PanelId, kind: AxesChangeKind) {
        let event = AxesChange {
            figure: self.id,
            panel,
            kind,
        };
        self.observers.notify(&event);
    }

    // --- Sharing -----------------------------------------------------------

    /// Share the x axis of two registered panels.
    pub fn share_x(&mut self, a: PanelId, b: PanelId) -> Result<()> {
        self.require(a)?;
        self.require(b)?;
        self.share_x.join(a, b);
        Ok(())
    }

    /// Share the y axis of two registered panels.
    pub fn share_y(&mut self, a: PanelId, b: PanelId) -> Result<()> {
        self.require(a)?;
        self.require(b)?;
        self.share_y.join(a, b);
        Ok(())
    }

    /// Panels sharing the x axis with `id`, `id` included.
    #[must_use]
    pub fn shared_x(&self, id: PanelId) -> Vec<PanelId> {
        self.share_x.siblings(id)
    }

    /// Panels sharing the y axis with `id`, `id` included.
    #[must_use]
    pub fn shared_y(&self, id: PanelId) -> Vec<PanelId> {
        self.share_y.siblings(id)
    }

    fn require(&self, id: PanelId) -> Result<()> {
        if self.panels.contains(id) {
            Ok(())
        } else {
            Err(figlay_core::RegistryError::NotFound(id).into())
        }
    }

    // --- Layout ------------------------------------------------------------

    /// Manual adjustment. Always switches to manual layout, then moves every
    /// grid-placed panel.
    pub fn subplots_adjust(&mut self, update: SubplotParamsUpdate) -> Result<()> {
        self.arbiter.adjust(&update)?;
        self.reposition_grid_panels();
        Ok(())
    }

    /// Fit the subplot parameters once, now, without changing the mode.
    pub fn tight_layout(&mut self, padding: TightPadding) -> Result<()> {
        if self.arbiter.mode().is_constrained() {
            return Err(ModeError::Incompatible {
                requested: "tight",
                active: "constrained",
            }
            .into());
        }
        let panels = self.grid_panel_rects();
        let update = self
            .arbiter
            .fit_tight(&padding, self.frame.size(), &panels)?;
        self.arbiter.apply_fit(&update)?;
        self.reposition_grid_panels();
        Ok(())
    }

    /// Turn tight layout on (`Some`) or off (`None`).
    pub fn set_tight_layout(&mut self, padding: Option<TightPadding>) {
        self.arbiter.set_tight(padding);
    }

    /// Turn constrained layout on (`Some`) or off (`None`).
    pub fn set_constrained_layout(&mut self, pads: Option<ConstrainedPadsUpdate>) {
        self.arbiter.set_constrained(pads);
    }

    pub fn set_constrained_layout_pads(&mut self, pads: ConstrainedPadsUpdate) {
        self.arbiter.set_constrained_pads(pads);
    }

    /// Constrained pads, in inches or (with `relative`) as fractions of the
    /// figure size.
    #[must_use]
    pub fn constrained_layout_pads(&self, relative: bool) -> ConstrainedPads {
        self.arbiter
            .constrained_pads(relative.then(|| self.frame.size()))
    }

    /// Bring panel positions up to date for the active layout mode.
    pub fn render_pass(&mut self) -> PassOutcome {
        let span = tracing::debug_span!(
            target: "figlay.figure",
            "figure.render_pass",
            figure = %self.id
        );
        let _guard = span.enter();

        let panels = self.grid_panel_rects();
        let params = *self.arbiter.params();
        let input = PassInput {
            figure_size: self.frame.size(),
            stamp: self.layout_stamp(),
            panels: &panels,
        };
        let registry = &self.panels;
        let outcome = self
            .arbiter
            .prepare_pass(&input, || build_constraint_graph(registry, &params));

        match &outcome {
            PassOutcome::Unchanged => {}
            PassOutcome::Params(_) => self.reposition_grid_panels(),
            PassOutcome::Rects(rects) => {
                for &(id, rect) in rects {
                    if !geometry::is_finite(rect) {
                        tracing::warn!(
                            target: "figlay.figure",
                            panel = %id,
                            "solver returned a non-finite rectangle; ignored"
                        );
                        continue;
                    }
                    if let Some(panel) = self.panels.get_mut(id) {
                        panel.set_rect(rect);
                    }
                }
            }
        }
        tracing::debug!(
            target: "figlay.figure",
            mode = self.arbiter.mode().name(),
            changed = !matches!(outcome, PassOutcome::Unchanged),
            "render pass finished"
        );
        outcome
    }

    fn grid_panel_rects(&self) -> Vec<(PanelId, Rect)> {
        self.panels
            .ordered()
            .filter(|p| p.spec().is_some())
            .map(|p| (p.id(), p.rect()))
            .collect()
    }

    fn reposition_grid_panels(&mut self) {
        let params = *self.arbiter.params();
        for panel in self.panels.ordered_mut() {
            panel.reposition(&params);
        }
    }

    /// Changes whenever size, resolution or membership changes.
    fn layout_stamp(&self) -> u64 {
        let mut hasher = FxHasher::default();
        (self.frame.revision(), self.panels.generation()).hash(&mut hasher);
        hasher.finish()
    }

    // --- Coordinate frame --------------------------------------------------

    #[must_use]
    pub fn size_inches(&self) -> Size {
        self.frame.size()
    }

    #[must_use]
    pub fn dpi(&self) -> f64 {
        self.frame.resolution()
    }

    pub fn set_size_inches(&mut self, width: f64, height: f64, forward: bool) -> Result<()> {
        self.frame.set_size(width, height, forward)?;
        Ok(())
    }

    pub fn set_figwidth(&mut self, width: f64, forward: bool) -> Result<()> {
        self.frame.set_width(width, forward)?;
        Ok(())
    }

    pub fn set_figheight(&mut self, height: f64, forward: bool) -> Result<()> {
        self.frame.set_height(height, forward)?;
        Ok(())
    }

    pub fn set_dpi(&mut self, dpi: f64) -> Result<()> {
        self.frame.set_resolution(dpi)?;
        Ok(())
    }

    pub fn attach_surface(&mut self, surface: Box<dyn SurfaceHost>) {
        self.frame.attach_surface(surface);
    }

    pub fn on_dpi_changed(
        &mut self,
        callback: impl FnMut(&ResolutionChanged) + 'static,
    ) -> ObserverId {
        self.frame.on_resolution_changed(callback)
    }

    pub fn remove_dpi_observer(&mut self, id: ObserverId) -> bool {
        self.frame.remove_observer(id)
    }

    // --- Observers ---------------------------------------------------------

    /// Run `callback` after every membership change.
    pub fn add_axes_observer(&mut self, callback: impl FnMut(&AxesChange) + 'static) -> ObserverId {
        self.observers.connect(callback)
    }

    pub fn remove_axes_observer(&mut self, id: ObserverId) -> bool {
        self.observers.disconnect(id)
    }

    // --- Queries -----------------------------------------------------------

    #[must_use]
    pub fn panel(&self, id: PanelId) -> Option<&Panel> {
        self.panels.get_by_id(id)
    }

    /// Panel rectangle in normalized figure coordinates.
    #[must_use]
    pub fn panel_rect(&self, id: PanelId) -> Option<Rect> {
        self.panel(id).map(Panel::rect)
    }

    /// Panel rectangle in device pixels.
    #[must_use]
    pub fn panel_device_rect(&self, id: PanelId) -> Option<Rect> {
        self.panel_rect(id).map(|r| self.frame.to_device_rect(r))
    }

    #[must_use]
    pub fn current_panel(&self) -> Option<&Panel> {
        self.panels.current()
    }

    /// Panels in creation order.
    pub fn ordered_panels(&self) -> impl Iterator<Item = &Panel> + '_ {
        self.panels.ordered()
    }

    #[must_use]
    pub fn panel_ids(&self) -> Vec<PanelId> {
        self.panels.ids()
    }

    #[must_use]
    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    /// Key a panel is registered under.
    #[must_use]
    pub fn placement_key(&self, id: PanelId) -> Option<&PlacementKey> {
        self.panels.key_of(id)
    }
}

fn placement_key(args: &[KeyArg], options: &PanelOptions) -> PlacementKey {
    let label = KeyArg::from(options.label.clone());
    KeyCodec::encode(args, [("label", &label)])
}

fn link_shares(grouper: &mut ShareGrouper, grid: &PanelGrid, mode: ShareMode) {
    for row in 0..grid.nrows {
        for col in 0..grid.ncols {
            let Some(id) = grid.get(row, col) else {
                continue;
            };
            let anchor = match mode {
                ShareMode::Independent => return,
                ShareMode::All => grid.get(0, 0),
                ShareMode::Row => grid.get(row, 0),
                ShareMode::Col => grid.get(0, col),
            };
            if let Some(anchor) = anchor
                && anchor != id
            {
                grouper.join(anchor, id);
            }
        }
    }
}

/// Figure → grid → panel graph for the constrained solver.
fn build_constraint_graph(panels: &PanelRegistry<Panel>, params: &SubplotParams) -> ConstraintGraph {
    let mut graph = ConstraintGraph::new();
    for panel in panels.ordered() {
        let parent = match panel.spec() {
            Some(spec) => grid_node(&mut graph, spec.grid(), params),
            None => NodeId::ROOT,
        };
        if let Err(err) = graph.add_panel(panel.id(), panel.rect(), parent) {
            tracing::warn!(
                target: "figlay.figure",
                panel = %panel.id(),
                error = %err,
                "panel left out of the constraint graph"
            );
        }
    }
    graph
}

fn grid_node(graph: &mut ConstraintGraph, grid: &Rc<GridSpec>, params: &SubplotParams) -> NodeId {
    if let Some(node) = graph.grid_node(grid.id()) {
        return node;
    }
    let (parent, rect) = match grid.parent() {
        Some(slot) => (grid_node(graph, slot.grid(), params), slot.position(params)),
        None => {
            let p = params.merged(grid.overrides());
            (NodeId::ROOT, Rect::new(p.left, p.bottom, p.right, p.top))
        }
    };
    graph
        .add_grid(grid.id(), grid.geometry(), rect, parent)
        .unwrap_or(parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figlay_layout::NodeKind;

    #[test]
    fn same_request_returns_same_panel() {
        let mut fig = Figure::new();
        let a = fig
            .add_subplot(SubplotArgs::Shorthand(221), PanelOptions::default())
            .unwrap();
        let b = fig
            .add_subplot(SubplotArgs::from((2u16, 2u16, 1u32)), PanelOptions::default())
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(fig.panel_count(), 1);
        assert_eq!(fig.grids().len(), 1);
    }

    #[test]
    fn label_forces_a_new_panel() {
        let mut fig = Figure::new();
        let a = fig.add_subplot(SubplotArgs::Shorthand(111), PanelOptions::default()).unwrap();
        let b = fig
            .add_subplot(SubplotArgs::Shorthand(111), PanelOptions::default().label("twin"))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(fig.panel_ids(), vec![a, b]);
    }

    #[test]
    fn projection_mismatch_replaces() {
        let mut fig = Figure::new();
        let a = fig.add_subplot(SubplotArgs::Shorthand(111), PanelOptions::default()).unwrap();
        let b = fig
            .add_subplot(SubplotArgs::Shorthand(111), PanelOptions::default().projection("polar"))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(fig.panel_ids(), vec![b]);
        assert_eq!(fig.panel(b).unwrap().projection(), "polar");
    }

    #[test]
    fn projection_mismatch_rejected_under_reject_policy() {
        let config = FigureConfig {
            key_collision: KeyCollisionPolicy::Reject,
            ..FigureConfig::default()
        };
        let mut fig = Figure::from_config(&config).unwrap();
        let a = fig.add_subplot(SubplotArgs::Shorthand(111), PanelOptions::default()).unwrap();
        let err = fig
            .add_subplot(SubplotArgs::Shorthand(111), PanelOptions::default().projection("polar"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Registry(figlay_core::RegistryError::KeyCollision { existing, .. }) if existing == a
        ));
        assert_eq!(fig.panel_ids(), vec![a]);
    }

    #[test]
    fn add_axes_rejects_non_finite() {
        let mut fig = Figure::new();
        let err = fig
            .add_axes([0.1, f64::NAN, 0.5, 0.5], PanelOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Geometry(GeometryError::InvalidRect(_))));
        assert_eq!(fig.panel_count(), 0);
    }

    #[test]
    fn add_axes_twice_is_one_panel() {
        let mut fig = Figure::new();
        let a = fig
            .add_axes([0.1, 0.1, 0.3, 0.3], PanelOptions::default())
            .unwrap();
        let b = fig
            .add_axes([0.5, 0.5, 0.3, 0.3], PanelOptions::default())
            .unwrap();
        let again = fig
            .add_axes([0.1, 0.1, 0.3, 0.3], PanelOptions::default())
            .unwrap();
        assert_eq!(a, again);
        assert_eq!(fig.current_panel().map(Panel::id), Some(a));
        assert_eq!(fig.panel_ids(), vec![a, b]);
    }

    #[test]
    fn readded_free_panel_keeps_its_key() {
        let mut fig = Figure::new();
        let bounds = [0.1, 0.2, 0.3, 0.4];
        let a = fig.add_axes(bounds, PanelOptions::default()).unwrap();
        let original = fig.placement_key(a).cloned().unwrap();

        let panel = fig.delaxes(a).unwrap();
        assert_eq!(fig.add_subplot(panel, PanelOptions::default()).unwrap(), a);
        assert_eq!(fig.placement_key(a), Some(&original));

        let again = fig.add_axes(bounds, PanelOptions::default()).unwrap();
        assert_eq!(again, a);
        assert_eq!(fig.panel_count(), 1);
    }

    #[test]
    fn readded_grid_panel_follows_current_params() {
        let mut fig = Figure::new();
        let a = fig
            .add_subplot(SubplotArgs::Shorthand(111), PanelOptions::default())
            .unwrap();
        let panel = fig.delaxes(a).unwrap();
        fig.subplots_adjust(SubplotParamsUpdate::default().left(0.3))
            .unwrap();

        fig.add_subplot(panel, PanelOptions::default()).unwrap();
        let rect = fig.panel_rect(a).unwrap();
        assert!((rect.x0 - 0.3).abs() < 1e-12, "{rect:?}");
        assert_eq!(
            fig.add_subplot(SubplotArgs::Shorthand(111), PanelOptions::default())
                .unwrap(),
            a
        );
    }

    #[test]
    fn negative_spacing_never_reaches_panels() {
        let mut fig = Figure::new();
        let err = fig
            .subplots_adjust(SubplotParamsUpdate::default().wspace(-2.0))
            .unwrap_err();
        assert!(matches!(err, Error::Geometry(GeometryError::InvalidParams(_))));
        let grid = fig
            .subplots(1, 2, ShareMode::Independent, ShareMode::Independent)
            .unwrap();
        for &id in grid.ids() {
            assert!(geometry::is_finite(fig.panel_rect(id).unwrap()));
        }
    }

    #[test]
    fn stamp_tracks_size_and_membership() {
        let mut fig = Figure::new();
        let s0 = fig.layout_stamp();
        fig.set_size_inches(4.0, 3.0, false).unwrap();
        let s1 = fig.layout_stamp();
        assert_ne!(s0, s1);
        fig.add_subplot(SubplotArgs::Shorthand(111), PanelOptions::default()).unwrap();
        assert_ne!(s1, fig.layout_stamp());
    }

    #[test]
    fn constraint_graph_nests_grids() {
        let mut fig = Figure::new();
        let outer = fig.add_gridspec(1, 2, None).unwrap();
        let inner = outer.cell(0, 1).unwrap().subgrid(2, 1).unwrap().into_shared();
        let left = fig
            .add_subplot(outer.cell(0, 0).unwrap(), PanelOptions::default())
            .unwrap();
        let nested = fig
            .add_subplot(inner.cell(1, 0).unwrap(), PanelOptions::default())
            .unwrap();
        let free = fig
            .add_axes([0.0, 0.0, 0.1, 0.1], PanelOptions::default())
            .unwrap();

        let graph = build_constraint_graph(&fig.panels, fig.subplot_params());
        let outer_node = graph.grid_node(outer.id()).unwrap();
        let inner_node = graph.grid_node(inner.id()).unwrap();
        assert_eq!(graph.dependencies(inner_node), &[outer_node]);
        assert_eq!(graph.dependencies(outer_node), &[NodeId::ROOT]);
        assert_eq!(
            graph.dependencies(graph.panel_node(left).unwrap()),
            &[outer_node]
        );
        assert_eq!(
            graph.dependencies(graph.panel_node(nested).unwrap()),
            &[inner_node]
        );
        assert_eq!(
            graph.dependencies(graph.panel_node(free).unwrap()),
            &[NodeId::ROOT]
        );
        assert!(matches!(
            graph.node(inner_node).unwrap().kind,
            NodeKind::Grid { nrows: 2, ncols: 1, .. }
        ));
    }

    #[test]
    fn panel_grid_indexing() {
        let grid = PanelGrid {
            nrows: 2,
            ncols: 3,
            ids: (1..=6).map(PanelId::from_raw).collect(),
        };
        assert_eq!(grid.get(1, 2), Some(PanelId::from_raw(6)));
        assert_eq!(grid.get(2, 0), None);
        assert_eq!(grid.row(1).len(), 3);
        assert!(grid.row(5).is_empty());
    }
}

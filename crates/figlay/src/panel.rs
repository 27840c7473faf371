#![forbid(unsafe_code)]

//! Panels: the drawable regions a figure places and tracks.

use figlay_core::{FigureId, PanelId, PlacementKey, Rect, Registrable};
use figlay_layout::{SubplotParams, SubplotSpec};

/// Projection used when none is requested.
pub const DEFAULT_PROJECTION: &str = "rectilinear";

/// Options attached to a placement request.
///
/// `label` takes part in the placement key, so two requests for the same
/// slot with different labels produce two panels. `projection` does not:
/// a different projection under an existing key replaces that panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelOptions {
    pub label: Option<String>,
    pub projection: Option<String>,
}

impl PanelOptions {
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn projection(mut self, projection: impl Into<String>) -> Self {
        self.projection = Some(projection.into());
        self
    }

    /// Requested projection, or the default.
    #[must_use]
    pub fn projection_or_default(&self) -> &str {
        self.projection.as_deref().unwrap_or(DEFAULT_PROJECTION)
    }
}

/// A panel owned by a figure.
///
/// While registered the figure owns it; [`crate::Figure::delaxes`] hands it
/// back, after which it can be registered again with
/// [`crate::SubplotArgs::Existing`].
#[derive(Debug, Clone)]
pub struct Panel {
    id: PanelId,
    figure: FigureId,
    key: PlacementKey,
    rect: Rect,
    spec: Option<SubplotSpec>,
    label: Option<String>,
    projection: String,
}

impl Panel {
    pub(crate) fn free(
        figure: FigureId,
        key: PlacementKey,
        rect: Rect,
        options: &PanelOptions,
    ) -> Self {
        Self {
            id: PanelId::next(),
            figure,
            key,
            rect,
            spec: None,
            label: options.label.clone(),
            projection: options.projection_or_default().to_owned(),
        }
    }

    pub(crate) fn in_slot(
        figure: FigureId,
        key: PlacementKey,
        spec: SubplotSpec,
        params: &SubplotParams,
        options: &PanelOptions,
    ) -> Self {
        Self {
            id: PanelId::next(),
            figure,
            key,
            rect: spec.position(params),
            spec: Some(spec),
            label: options.label.clone(),
            projection: options.projection_or_default().to_owned(),
        }
    }

    #[must_use]
    pub fn id(&self) -> PanelId {
        self.id
    }

    /// Figure that created the panel.
    #[must_use]
    pub fn figure(&self) -> FigureId {
        self.figure
    }

    /// Key the panel was created under; re-adding it reuses this key.
    #[must_use]
    pub fn key(&self) -> &PlacementKey {
        &self.key
    }

    /// Position in normalized figure coordinates.
    #[must_use]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Grid slot, for panels placed on a grid.
    #[must_use]
    pub fn spec(&self) -> Option<&SubplotSpec> {
        self.spec.as_ref()
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    #[must_use]
    pub fn projection(&self) -> &str {
        &self.projection
    }

    pub(crate) fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    /// Recompute the rectangle from the grid slot. Free panels keep theirs.
    pub(crate) fn reposition(&mut self, params: &SubplotParams) {
        if let Some(spec) = &self.spec {
            self.rect = spec.position(params);
        }
    }
}

impl Registrable for Panel {
    fn panel_id(&self) -> PanelId {
        self.id
    }
}

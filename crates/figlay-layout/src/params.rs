#![forbid(unsafe_code)]

//! Manual subplot parameters.
//!
//! Margins are fractions of the figure (`left`, `right`, `bottom`, `top`);
//! spacing is a fraction of the mean cell size (`wspace`, `hspace`).

use figlay_core::GeometryError;
use serde::{Deserialize, Serialize};

/// Margins and spacing used to place grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubplotParams {
    pub left: f64,
    pub right: f64,
    pub bottom: f64,
    pub top: f64,
    pub wspace: f64,
    pub hspace: f64,
}

impl Default for SubplotParams {
    fn default() -> Self {
        Self {
            left: 0.125,
            right: 0.9,
            bottom: 0.11,
            top: 0.88,
            wspace: 0.2,
            hspace: 0.2,
        }
    }
}

impl SubplotParams {
    /// Margins covering the whole unit square; spacing kept from `self`.
    #[must_use]
    pub fn unit_margins(&self) -> Self {
        Self {
            left: 0.0,
            right: 1.0,
            bottom: 0.0,
            top: 1.0,
            ..*self
        }
    }

    /// Check finiteness, `left < right`, `bottom < top` and non-negative
    /// spacing.
    pub fn validate(&self) -> Result<(), GeometryError> {
        let all = [
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.wspace,
            self.hspace,
        ];
        if all.iter().any(|v| !v.is_finite()) {
            return Err(GeometryError::InvalidParams(format!(
                "subplot parameters must be finite, got {self:?}"
            )));
        }
        if self.left >= self.right {
            return Err(GeometryError::InvalidParams(
                "left cannot be >= right".to_owned(),
            ));
        }
        if self.bottom >= self.top {
            return Err(GeometryError::InvalidParams(
                "bottom cannot be >= top".to_owned(),
            ));
        }
        check_spacing(Some(self.wspace), Some(self.hspace))
    }

    /// Copy of `self` with every set field of `update` applied, unvalidated.
    #[must_use]
    pub fn merged(&self, update: &SubplotParamsUpdate) -> Self {
        Self {
            left: update.left.unwrap_or(self.left),
            right: update.right.unwrap_or(self.right),
            bottom: update.bottom.unwrap_or(self.bottom),
            top: update.top.unwrap_or(self.top),
            wspace: update.wspace.unwrap_or(self.wspace),
            hspace: update.hspace.unwrap_or(self.hspace),
        }
    }

    /// Apply `update`. Leaves `self` untouched when the result is invalid.
    pub fn update(&mut self, update: &SubplotParamsUpdate) -> Result<(), GeometryError> {
        let next = self.merged(update);
        next.validate()?;
        *self = next;
        Ok(())
    }
}

/// Partial [`SubplotParams`]; unset fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubplotParamsUpdate {
    pub left: Option<f64>,
    pub right: Option<f64>,
    pub bottom: Option<f64>,
    pub top: Option<f64>,
    pub wspace: Option<f64>,
    pub hspace: Option<f64>,
}

impl SubplotParamsUpdate {
    #[must_use]
    pub fn left(mut self, v: f64) -> Self {
        self.left = Some(v);
        self
    }

    #[must_use]
    pub fn right(mut self, v: f64) -> Self {
        self.right = Some(v);
        self
    }

    #[must_use]
    pub fn bottom(mut self, v: f64) -> Self {
        self.bottom = Some(v);
        self
    }

    #[must_use]
    pub fn top(mut self, v: f64) -> Self {
        self.top = Some(v);
        self
    }

    #[must_use]
    pub fn wspace(mut self, v: f64) -> Self {
        self.wspace = Some(v);
        self
    }

    #[must_use]
    pub fn hspace(mut self, v: f64) -> Self {
        self.hspace = Some(v);
        self
    }

    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Reject pairs that are inconsistent on their own.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if let (Some(l), Some(r)) = (self.left, self.right)
            && l >= r
        {
            return Err(GeometryError::InvalidParams(
                "left cannot be >= right".to_owned(),
            ));
        }
        if let (Some(b), Some(t)) = (self.bottom, self.top)
            && b >= t
        {
            return Err(GeometryError::InvalidParams(
                "bottom cannot be >= top".to_owned(),
            ));
        }
        check_spacing(self.wspace, self.hspace)
    }
}

fn check_spacing(wspace: Option<f64>, hspace: Option<f64>) -> Result<(), GeometryError> {
    for (name, value) in [("wspace", wspace), ("hspace", hspace)] {
        if let Some(v) = value
            && v < 0.0
        {
            return Err(GeometryError::InvalidParams(format!(
                "{name} cannot be negative, got {v}"
            )));
        }
    }
    Ok(())
}

impl From<SubplotParams> for SubplotParamsUpdate {
    fn from(p: SubplotParams) -> Self {
        Self {
            left: Some(p.left),
            right: Some(p.right),
            bottom: Some(p.bottom),
            top: Some(p.top),
            wspace: Some(p.wspace),
            hspace: Some(p.hspace),
        }
    }
}

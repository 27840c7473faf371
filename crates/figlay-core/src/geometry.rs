#![forbid(unsafe_code)]

//! Normalized figure geometry.
//!
//! Panel rectangles are expressed in normalized figure coordinates: the
//! figure occupies the unit square, the origin is the bottom-left corner and
//! `y` grows upward. Rectangles are [`kurbo::Rect`] values with
//! `x0 = left`, `y0 = bottom`, `x1 = right`, `y1 = top`.

use kurbo::{Affine, Rect};

/// The whole figure in normalized coordinates.
pub const UNIT: Rect = Rect::new(0.0, 0.0, 1.0, 1.0);

/// Build a rectangle from `(left, bottom, width, height)`.
#[inline]
#[must_use]
pub fn from_bounds(left: f64, bottom: f64, width: f64, height: f64) -> Rect {
    Rect::new(left, bottom, left + width, bottom + height)
}

/// Decompose a rectangle into `[left, bottom, width, height]`.
#[inline]
#[must_use]
pub fn bounds(rect: Rect) -> [f64; 4] {
    [rect.x0, rect.y0, rect.width(), rect.height()]
}

/// Transform mapping the unit square onto `target`.
///
/// Nested grids compute their cells in the unit square and compose with
/// this transform to land in figure coordinates.
#[inline]
#[must_use]
pub fn unit_to(target: Rect) -> Affine {
    Affine::translate((target.x0, target.y0))
        * Affine::scale_non_uniform(target.width(), target.height())
}

/// Map `rect` through `affine`, keeping the bottom-left/top-right convention.
#[inline]
#[must_use]
pub fn map_rect(affine: Affine, rect: Rect) -> Rect {
    affine.transform_rect_bbox(rect)
}

/// True when every coordinate is finite.
#[inline]
#[must_use]
pub fn is_finite(rect: Rect) -> bool {
    rect.x0.is_finite() && rect.y0.is_finite() && rect.x1.is_finite() && rect.y1.is_finite()
}

/// Component-wise comparison with an absolute tolerance.
#[must_use]
pub fn approx_eq(a: Rect, b: Rect, eps: f64) -> bool {
    (a.x0 - b.x0).abs() <= eps
        && (a.y0 - b.y0).abs() <= eps
        && (a.x1 - b.x1).abs() <= eps
        && (a.y1 - b.y1).abs() <= eps
}

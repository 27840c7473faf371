#![forbid(unsafe_code)]

//! Grid specifications and slot resolution.
//!
//! A [`GridSpec`] divides a region into `nrows × ncols` cells. A
//! [`SubplotSpec`] is a rectangular, half-open block of those cells. Grids
//! can be nested: [`SubplotSpec::subgrid`] roots a new grid at a slot.
//!
//! # Cell geometry
//!
//! For a region `[left, right] × [bottom, top]` with relative spacing `s`
//! (fraction of the mean cell size) and `n` rows:
//!
//! ```text
//! cell = total / (n + s·(n − 1))
//! sep  = s · cell
//! ```
//!
//! Ratios redistribute `n · cell` across the rows. Row 0 is at the top,
//! column 0 at the left.
//!
//! Nested grids lay their cells out in the unit square (zero margins) and
//! then compose with the transform mapping the unit square onto the parent
//! slot, so every reported rectangle is in figure coordinates.

use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use figlay_core::{GridId, Rect, SlotKey, geometry};

use crate::params::{SubplotParams, SubplotParamsUpdate};

/// Grid resolution failures.
#[derive(Debug, Clone, PartialEq)]
pub enum GridError {
    /// A grid with zero rows or columns.
    ZeroDimension { nrows: u16, ncols: u16 },
    /// 1-based index outside `1..=max`.
    IndexOutOfRange { index: u32, max: u32 },
    /// Range index with `first > last`, or an empty span.
    InvalidSpan { first: u32, last: u32 },
    /// Three-digit shorthand outside `100..=999` or with a zero digit.
    InvalidShorthand(u32),
    /// Span outside the grid.
    SpanOutOfBounds {
        rows: Range<u16>,
        cols: Range<u16>,
        nrows: u16,
        ncols: u16,
    },
    /// Ratio list of the wrong length or with non-positive entries.
    InvalidRatios {
        axis: &'static str,
        expected: u16,
        got: usize,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroDimension { nrows, ncols } => write!(
                f,
                "number of rows and columns must be positive, got {nrows}x{ncols}"
            ),
            Self::IndexOutOfRange { index, max } => {
                write!(f, "index must be 1 <= index <= {max}, not {index}")
            }
            Self::InvalidSpan { first, last } => {
                write!(f, "invalid span ({first}, {last}): first must not exceed last")
            }
            Self::InvalidShorthand(n) => write!(
                f,
                "three-digit subplot shorthand must be 100..=999 with non-zero digits, not {n}"
            ),
            Self::SpanOutOfBounds {
                rows,
                cols,
                nrows,
                ncols,
            } => write!(
                f,
                "span rows {rows:?} cols {cols:?} is outside a {nrows}x{ncols} grid"
            ),
            Self::InvalidRatios {
                axis,
                expected,
                got,
            } => write!(
                f,
                "{axis} ratios must be {expected} positive finite values, got {got}"
            ),
        }
    }
}

impl std::error::Error for GridError {}

/// A 1-based slot selector in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubplotIndex {
    /// One cell.
    Single(u32),
    /// The bounding block of cells `first` and `last`, inclusive.
    Range(u32, u32),
}

/// Half-open row and column spans.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellSpan {
    pub rows: Range<u16>,
    pub cols: Range<u16>,
}

/// Resolve a 1-based index against an `nrows × ncols` grid.
pub fn resolve_index(nrows: u16, ncols: u16, index: SubplotIndex) -> Result<CellSpan, GridError> {
    if nrows == 0 || ncols == 0 {
        return Err(GridError::ZeroDimension { nrows, ncols });
    }
    let max = u32::from(nrows) * u32::from(ncols);
    let check = |i: u32| {
        if (1..=max).contains(&i) {
            Ok(i - 1)
        } else {
            Err(GridError::IndexOutOfRange { index: i, max })
        }
    };
    let (first, last) = match index {
        SubplotIndex::Single(i) => {
            let i = check(i)?;
            (i, i)
        }
        SubplotIndex::Range(first, last) => {
            let (a, b) = (check(first)?, check(last)?);
            if a > b {
                return Err(GridError::InvalidSpan { first, last });
            }
            (a, b)
        }
    };
    let ncols32 = u32::from(ncols);
    let (r0, c0) = (first / ncols32, first % ncols32);
    let (r1, c1) = (last / ncols32, last % ncols32);
    // Both fit in u16: they are bounded by nrows and ncols.
    let narrow = |v: u32| u16::try_from(v).unwrap_or(u16::MAX);
    Ok(CellSpan {
        rows: narrow(r0.min(r1))..narrow(r0.max(r1) + 1),
        cols: narrow(c0.min(c1))..narrow(c0.max(c1) + 1),
    })
}

/// Split a three-digit shorthand such as `234` into `(2, 3, 4)`.
pub fn decode_shorthand(n: u32) -> Result<(u16, u16, u32), GridError> {
    if !(100..=999).contains(&n) {
        return Err(GridError::InvalidShorthand(n));
    }
    let rows = n / 100;
    let cols = (n / 10) % 10;
    let index = n % 10;
    if rows == 0 || cols == 0 || index == 0 {
        return Err(GridError::InvalidShorthand(n));
    }
    // Single digits.
    Ok((rows as u16, cols as u16, index))
}

/// Cell edges of a grid in figure coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPositions {
    pub bottoms: Vec<f64>,
    pub tops: Vec<f64>,
    pub lefts: Vec<f64>,
    pub rights: Vec<f64>,
}

/// An `nrows × ncols` grid, optionally nested inside a parent slot.
#[derive(Debug, Clone)]
pub struct GridSpec {
    id: GridId,
    nrows: u16,
    ncols: u16,
    overrides: SubplotParamsUpdate,
    width_ratios: Option<Vec<f64>>,
    height_ratios: Option<Vec<f64>>,
    parent: Option<SubplotSpec>,
}

impl GridSpec {
    /// Top-level grid.
    pub fn new(nrows: u16, ncols: u16) -> Result<Self, GridError> {
        if nrows == 0 || ncols == 0 {
            return Err(GridError::ZeroDimension { nrows, ncols });
        }
        Ok(Self {
            id: GridId::next(),
            nrows,
            ncols,
            overrides: SubplotParamsUpdate::default(),
            width_ratios: None,
            height_ratios: None,
            parent: None,
        })
    }

    /// Per-grid margin and spacing overrides. Margins are ignored for
    /// nested grids, which always fill their parent slot.
    #[must_use]
    pub fn with_params(mut self, overrides: SubplotParamsUpdate) -> Self {
        self.overrides = overrides;
        self
    }

    /// Relative column widths.
    pub fn with_width_ratios(mut self, ratios: Vec<f64>) -> Result<Self, GridError> {
        check_ratios("width", self.ncols, &ratios)?;
        self.width_ratios = Some(ratios);
        Ok(self)
    }

    /// Relative row heights.
    pub fn with_height_ratios(mut self, ratios: Vec<f64>) -> Result<Self, GridError> {
        check_ratios("height", self.nrows, &ratios)?;
        self.height_ratios = Some(ratios);
        Ok(self)
    }

    /// Share the grid so slots can refer back to it.
    #[must_use]
    pub fn into_shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    #[must_use]
    pub fn id(&self) -> GridId {
        self.id
    }

    /// `(nrows, ncols)`.
    #[must_use]
    pub fn geometry(&self) -> (u16, u16) {
        (self.nrows, self.ncols)
    }

    #[must_use]
    pub fn overrides(&self) -> &SubplotParamsUpdate {
        &self.overrides
    }

    /// The slot this grid is nested in.
    #[must_use]
    pub fn parent(&self) -> Option<&SubplotSpec> {
        self.parent.as_ref()
    }

    /// Nesting depth; 0 for a top-level grid.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.parent.as_ref().map_or(0, |p| p.grid.depth() + 1)
    }

    /// Id of the top-level grid this one is nested in (itself if top-level).
    #[must_use]
    pub fn root_id(&self) -> GridId {
        self.parent.as_ref().map_or(self.id, |p| p.grid.root_id())
    }

    /// Single cell at 0-based `(row, col)`.
    pub fn cell(self: &Rc<Self>, row: u16, col: u16) -> Result<SubplotSpec, GridError> {
        self.span(row..row.saturating_add(1), col..col.saturating_add(1))
    }

    /// Block of cells, 0-based half-open.
    pub fn span(
        self: &Rc<Self>,
        rows: Range<u16>,
        cols: Range<u16>,
    ) -> Result<SubplotSpec, GridError> {
        if rows.is_empty() || cols.is_empty() {
            return Err(GridError::InvalidSpan {
                first: u32::from(rows.start.min(cols.start)),
                last: u32::from(rows.end.min(cols.end)),
            });
        }
        if rows.end > self.nrows || cols.end > self.ncols {
            return Err(GridError::SpanOutOfBounds {
                rows,
                cols,
                nrows: self.nrows,
                ncols: self.ncols,
            });
        }
        Ok(SubplotSpec {
            grid: Rc::clone(self),
            rows,
            cols,
        })
    }

    /// Slot selected by a 1-based index.
    pub fn slot(self: &Rc<Self>, index: SubplotIndex) -> Result<SubplotSpec, GridError> {
        let span = resolve_index(self.nrows, self.ncols, index)?;
        self.span(span.rows, span.cols)
    }

    /// Parameters used to lay out this grid's cells in its own region.
    fn effective_params(&self, figure: &SubplotParams) -> SubplotParams {
        let merged = figure.merged(&self.overrides);
        if self.parent.is_some() {
            merged.unit_margins()
        } else {
            merged
        }
    }

    /// Cell edges in figure coordinates.
    #[must_use]
    pub fn positions(&self, figure: &SubplotParams) -> GridPositions {
        let p = self.effective_params(figure);
        let (tops, bottoms) = edges(
            p.top,
            p.top - p.bottom,
            p.hspace,
            self.nrows,
            self.height_ratios.as_deref(),
            -1.0,
        );
        let (lefts, rights) = edges(
            p.left,
            p.right - p.left,
            p.wspace,
            self.ncols,
            self.width_ratios.as_deref(),
            1.0,
        );
        let local = GridPositions {
            bottoms,
            tops,
            lefts,
            rights,
        };
        match &self.parent {
            None => local,
            Some(parent) => {
                let to_parent = geometry::unit_to(parent.position(figure));
                let map_x = |x: f64| (to_parent * kurbo::Point::new(x, 0.0)).x;
                let map_y = |y: f64| (to_parent * kurbo::Point::new(0.0, y)).y;
                GridPositions {
                    bottoms: local.bottoms.into_iter().map(map_y).collect(),
                    tops: local.tops.into_iter().map(map_y).collect(),
                    lefts: local.lefts.into_iter().map(map_x).collect(),
                    rights: local.rights.into_iter().map(map_x).collect(),
                }
            }
        }
    }
}

impl PartialEq for GridSpec {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Walk `count` cells from `origin` in direction `sign`, returning the
/// near and far edge of each cell.
fn edges(
    origin: f64,
    total: f64,
    spacing: f64,
    count: u16,
    ratios: Option<&[f64]>,
    sign: f64,
) -> (Vec<f64>, Vec<f64>) {
    let n = f64::from(count);
    // Overrides set through `with_params` bypass validation.
    let spacing = spacing.max(0.0);
    let cell = total / (n + spacing * (n - 1.0));
    let sep = spacing * cell;
    let sizes: Vec<f64> = match ratios {
        Some(r) => {
            let norm = cell * n / r.iter().sum::<f64>();
            r.iter().map(|v| v * norm).collect()
        }
        None => vec![cell; usize::from(count)],
    };

    let mut near = Vec::with_capacity(sizes.len());
    let mut far = Vec::with_capacity(sizes.len());
    let mut offset = 0.0;
    for (i, size) in sizes.iter().enumerate() {
        if i > 0 {
            offset += sep;
        }
        near.push(origin + sign * offset);
        offset += size;
        far.push(origin + sign * offset);
    }
    (near, far)
}

fn check_ratios(axis: &'static str, expected: u16, ratios: &[f64]) -> Result<(), GridError> {
    if ratios.len() != usize::from(expected)
        || ratios.iter().any(|r| !(r.is_finite() && *r > 0.0))
    {
        return Err(GridError::InvalidRatios {
            axis,
            expected,
            got: ratios.len(),
        });
    }
    Ok(())
}

/// A rectangular block of cells in a grid.
#[derive(Debug, Clone)]
pub struct SubplotSpec {
    grid: Rc<GridSpec>,
    rows: Range<u16>,
    cols: Range<u16>,
}

impl SubplotSpec {
    #[must_use]
    pub fn grid(&self) -> &Rc<GridSpec> {
        &self.grid
    }

    #[must_use]
    pub fn rows(&self) -> Range<u16> {
        self.rows.clone()
    }

    #[must_use]
    pub fn cols(&self) -> Range<u16> {
        self.cols.clone()
    }

    #[must_use]
    pub fn is_first_row(&self) -> bool {
        self.rows.start == 0
    }

    #[must_use]
    pub fn is_last_row(&self) -> bool {
        self.rows.end == self.grid.nrows
    }

    #[must_use]
    pub fn is_first_col(&self) -> bool {
        self.cols.start == 0
    }

    #[must_use]
    pub fn is_last_col(&self) -> bool {
        self.cols.end == self.grid.ncols
    }

    /// Identity of this slot for placement keys.
    #[must_use]
    pub fn slot_key(&self) -> SlotKey {
        SlotKey {
            grid: self.grid.id,
            rows: (self.rows.start, self.rows.end),
            cols: (self.cols.start, self.cols.end),
        }
    }

    /// Normalized figure rectangle of this slot.
    #[must_use]
    pub fn position(&self, figure: &SubplotParams) -> Rect {
        let pos = self.grid.positions(figure);
        let (r0, r1) = (usize::from(self.rows.start), usize::from(self.rows.end) - 1);
        let (c0, c1) = (usize::from(self.cols.start), usize::from(self.cols.end) - 1);
        Rect::new(pos.lefts[c0], pos.bottoms[r1], pos.rights[c1], pos.tops[r0])
    }

    /// Nested `nrows × ncols` grid filling this slot.
    pub fn subgrid(&self, nrows: u16, ncols: u16) -> Result<GridSpec, GridError> {
        let mut grid = GridSpec::new(nrows, ncols)?;
        grid.parent = Some(self.clone());
        Ok(grid)
    }
}

impl PartialEq for SubplotSpec {
    fn eq(&self, other: &Self) -> bool {
        self.grid.id == other.grid.id && self.rows == other.rows && self.cols == other.cols
    }
}

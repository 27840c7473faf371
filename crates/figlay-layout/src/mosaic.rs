#![forbid(unsafe_code)]

//! Declarative mosaic layouts.
//!
//! A mosaic is a 2D array of cells, each holding a label, an empty marker or
//! a nested mosaic. Every label must cover exactly one filled rectangle of
//! cells; the planner turns each label into a grid slot and recurses into
//! nested mosaics through sub-grids.
//!
//! ```text
//! AAB
//! CCB      A → rows 0..1, cols 0..2
//!          B → rows 0..2, cols 2..3
//!          C → rows 1..2, cols 0..2
//! ```
//!
//! The result is an arena: a flat list of [`PlannedSlot`]s plus a label →
//! index map, in a deterministic order (first appearance at each level,
//! outer level before its nested levels).

use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::grid::{GridError, GridSpec, SubplotSpec};
use crate::params::SubplotParamsUpdate;

/// Default empty-cell marker.
pub const DEFAULT_EMPTY_SENTINEL: &str = ".";

/// Mosaic failures.
#[derive(Debug, Clone, PartialEq)]
pub enum MosaicError {
    /// No rows, or rows without cells.
    Empty,
    /// A row whose length differs from the first row's.
    Shape {
        row: usize,
        row_len: usize,
        first_len: usize,
    },
    /// More rows or columns than a grid can hold.
    TooLarge { nrows: usize, ncols: usize },
    /// A label whose cells do not form one filled rectangle.
    NonRectangular { label: String, layout: String },
    /// A label used at more than one nesting level.
    DuplicateLabel {
        label: String,
        outer: String,
        inner: String,
    },
    /// The grid handed to the planner does not match the layout's shape.
    GridMismatch {
        layout: (u16, u16),
        grid: (u16, u16),
    },
    /// Slot allocation failed.
    Grid(GridError),
}

impl fmt::Display for MosaicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("mosaic layout has no cells"),
            Self::Shape {
                row,
                row_len,
                first_len,
            } => write!(
                f,
                "all rows must be the same length, however the first row has length \
                 {first_len} and row {row} has length {row_len}"
            ),
            Self::TooLarge { nrows, ncols } => {
                write!(f, "mosaic layout of {nrows}x{ncols} cells is too large")
            }
            Self::NonRectangular { label, layout } => write!(
                f,
                "while trying to lay out\n{layout}\nwe found that the label {label:?} \
                 specifies a non-rectangular or non-contiguous area"
            ),
            Self::DuplicateLabel {
                label,
                outer,
                inner,
            } => write!(
                f,
                "label {label:?} is used both in the outer layout\n{outer}\nand the nested layout\n{inner}"
            ),
            Self::GridMismatch { layout, grid } => write!(
                f,
                "layout is {}x{} but the grid is {}x{}",
                layout.0, layout.1, grid.0, grid.1
            ),
            Self::Grid(e) => write!(f, "slot allocation failed: {e}"),
        }
    }
}

impl std::error::Error for MosaicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Grid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GridError> for MosaicError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

/// One mosaic cell.
#[derive(Debug, Clone, PartialEq)]
pub enum MosaicCell {
    Label(String),
    Empty,
    Nested(MosaicLayout),
}

impl MosaicCell {
    /// Label cell from anything string-like.
    pub fn label(label: impl Into<String>) -> Self {
        Self::Label(label.into())
    }
}

impl From<&str> for MosaicCell {
    fn from(label: &str) -> Self {
        Self::Label(label.to_owned())
    }
}

impl From<MosaicLayout> for MosaicCell {
    fn from(layout: MosaicLayout) -> Self {
        Self::Nested(layout)
    }
}

/// A rectangular array of [`MosaicCell`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicLayout {
    rows: Vec<Vec<MosaicCell>>,
    nrows: u16,
    ncols: u16,
}

impl MosaicLayout {
    /// Build from explicit rows. Every row must have the first row's length.
    pub fn from_rows(rows: Vec<Vec<MosaicCell>>) -> Result<Self, MosaicError> {
        let first_len = rows.first().map_or(0, Vec::len);
        if first_len == 0 {
            return Err(MosaicError::Empty);
        }
        if let Some((row, r)) = rows
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, r)| r.len() != first_len)
        {
            return Err(MosaicError::Shape {
                row,
                row_len: r.len(),
                first_len,
            });
        }
        let too_large = || MosaicError::TooLarge {
            nrows: rows.len(),
            ncols: first_len,
        };
        let nrows = u16::try_from(rows.len()).map_err(|_| too_large())?;
        let ncols = u16::try_from(first_len).map_err(|_| too_large())?;
        Ok(Self { rows, nrows, ncols })
    }

    /// Parse a text block: one character per cell, one line per row.
    ///
    /// The first line's leading whitespace and the common indentation of
    /// the remaining lines are removed, as are blank lines at either end.
    /// Cells equal to `empty_sentinel` become [`MosaicCell::Empty`].
    pub fn from_text(text: &str, empty_sentinel: char) -> Result<Self, MosaicError> {
        let rows: Vec<Vec<MosaicCell>> = dedent(text)
            .into_iter()
            .map(|line| {
                line.chars()
                    .map(|ch| {
                        if ch == empty_sentinel {
                            MosaicCell::Empty
                        } else {
                            MosaicCell::Label(ch.to_string())
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        Self::from_rows(rows)
    }

    #[must_use]
    pub fn nrows(&self) -> u16 {
        self.nrows
    }

    #[must_use]
    pub fn ncols(&self) -> u16 {
        self.ncols
    }

    /// Cell at 0-based `(row, col)`.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> Option<&MosaicCell> {
        self.rows.get(row)?.get(col)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[MosaicCell]> + '_ {
        self.rows.iter().map(Vec::as_slice)
    }
}

impl fmt::Display for MosaicLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                f.write_str(",\n ")?;
            }
            f.write_str("[")?;
            for (j, cell) in row.iter().enumerate() {
                if j > 0 {
                    f.write_str(", ")?;
                }
                match cell {
                    MosaicCell::Label(l) => write!(f, "{l:?}")?,
                    MosaicCell::Empty => f.write_str("<empty>")?,
                    MosaicCell::Nested(inner) => write!(f, "{inner}")?,
                }
            }
            f.write_str("]")?;
        }
        f.write_str("]")
    }
}

/// Strip indentation the way a docstring would be cleaned.
fn dedent(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim_start().is_empty())
        .map(|l| l.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(usize::MAX);

    let mut out: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(i, l)| {
            if i == 0 {
                l.trim_start().to_owned()
            } else {
                l.chars().skip(margin).collect()
            }
        })
        .collect();
    while out.last().is_some_and(String::is_empty) {
        out.pop();
    }
    let leading = out.iter().take_while(|l| l.is_empty()).count();
    out.drain(..leading);
    out
}

/// A label's slot in the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedSlot {
    pub label: String,
    pub spec: SubplotSpec,
    /// Nesting level; 0 for the outermost layout.
    pub depth: usize,
}

/// Output of [`MosaicPlanner::plan`].
#[derive(Debug, Clone)]
pub struct MosaicPlan {
    grid: Rc<GridSpec>,
    slots: Vec<PlannedSlot>,
    index: FxHashMap<String, usize>,
}

impl MosaicPlan {
    /// The outermost grid.
    #[must_use]
    pub fn grid(&self) -> &Rc<GridSpec> {
        &self.grid
    }

    #[must_use]
    pub fn slots(&self) -> &[PlannedSlot] {
        &self.slots
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<&PlannedSlot> {
        self.index.get(label).map(|&i| &self.slots[i])
    }

    #[must_use]
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Labels in plan order.
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.slots.iter().map(|s| s.label.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Turns a [`MosaicLayout`] into grid slots.
#[derive(Debug, Clone)]
pub struct MosaicPlanner {
    empty_sentinel: String,
    subgrid_params: SubplotParamsUpdate,
}

impl Default for MosaicPlanner {
    fn default() -> Self {
        Self {
            empty_sentinel: DEFAULT_EMPTY_SENTINEL.to_owned(),
            subgrid_params: SubplotParamsUpdate::default(),
        }
    }
}

impl MosaicPlanner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels equal to `sentinel` are treated as empty cells.
    #[must_use]
    pub fn with_empty_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.empty_sentinel = sentinel.into();
        self
    }

    /// Spacing overrides applied to every nested sub-grid.
    #[must_use]
    pub fn with_subgrid_params(mut self, params: SubplotParamsUpdate) -> Self {
        self.subgrid_params = params;
        self
    }

    #[must_use]
    pub fn empty_sentinel(&self) -> &str {
        &self.empty_sentinel
    }

    /// Assign a slot of `grid` to every label of `layout`, recursing into
    /// nested layouts.
    pub fn plan(
        &self,
        grid: Rc<GridSpec>,
        layout: &MosaicLayout,
    ) -> Result<MosaicPlan, MosaicError> {
        let shape = (layout.nrows(), layout.ncols());
        if grid.geometry() != shape {
            return Err(MosaicError::GridMismatch {
                layout: shape,
                grid: grid.geometry(),
            });
        }
        let mut slots = Vec::new();
        let index = self.place(&grid, layout, 0, &mut slots)?;
        tracing::debug!(
            target: "figlay.layout",
            grid = %grid.id(),
            labels = slots.len(),
            "mosaic planned"
        );
        Ok(MosaicPlan { grid, slots, index })
    }

    fn is_empty_cell(&self, cell: &MosaicCell) -> bool {
        match cell {
            MosaicCell::Empty => true,
            MosaicCell::Label(l) => *l == self.empty_sentinel,
            MosaicCell::Nested(_) => false,
        }
    }

    fn place(
        &self,
        grid: &Rc<GridSpec>,
        layout: &MosaicLayout,
        depth: usize,
        slots: &mut Vec<PlannedSlot>,
    ) -> Result<FxHashMap<String, usize>, MosaicError> {
        // Bounding blocks in one pass; `order` keeps first appearance.
        let mut order: Vec<&str> = Vec::new();
        let mut blocks: FxHashMap<&str, Footprint> = FxHashMap::default();
        let mut nested: Vec<(u16, u16, &MosaicLayout)> = Vec::new();
        for (r, row) in layout.rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if self.is_empty_cell(cell) {
                    continue;
                }
                // Indices fit: the layout's dimensions are u16.
                let (r, c) = (r as u16, c as u16);
                match cell {
                    MosaicCell::Label(l) => {
                        blocks
                            .entry(l.as_str())
                            .or_insert_with(|| {
                                order.push(l.as_str());
                                Footprint::at(r, c)
                            })
                            .cover(r, c);
                    }
                    MosaicCell::Nested(inner) => nested.push((r, c, inner)),
                    MosaicCell::Empty => {}
                }
            }
        }

        let mut output = FxHashMap::default();
        for label in order {
            let Some(block) = blocks.get(label) else {
                continue;
            };
            if !block.is_filled() {
                return Err(MosaicError::NonRectangular {
                    label: label.to_owned(),
                    layout: layout.to_string(),
                });
            }
            let spec = grid.span(block.rows.clone(), block.cols.clone())?;
            slots.push(PlannedSlot {
                label: label.to_owned(),
                spec,
                depth,
            });
            output.insert(label.to_owned(), slots.len() - 1);
        }

        for (r, c, inner) in nested {
            let subgrid = grid
                .cell(r, c)?
                .subgrid(inner.nrows(), inner.ncols())?
                .with_params(self.subgrid_params)
                .into_shared();
            let start = slots.len();
            let inner_output = self.place(&subgrid, inner, depth + 1, slots)?;
            if let Some(dup) = slots[start..]
                .iter()
                .find(|s| output.contains_key(&s.label))
            {
                return Err(MosaicError::DuplicateLabel {
                    label: dup.label.clone(),
                    outer: layout.to_string(),
                    inner: inner.to_string(),
                });
            }
            output.extend(inner_output);
        }
        Ok(output)
    }
}

/// Bounding block of a label and how many cells hold it.
#[derive(Debug, Clone)]
struct Footprint {
    rows: Range<u16>,
    cols: Range<u16>,
    cells: usize,
}

impl Footprint {
    fn at(r: u16, c: u16) -> Self {
        Self {
            rows: r..r + 1,
            cols: c..c + 1,
            cells: 0,
        }
    }

    fn cover(&mut self, r: u16, c: u16) {
        self.rows = self.rows.start.min(r)..self.rows.end.max(r + 1);
        self.cols = self.cols.start.min(c)..self.cols.end.max(c + 1);
        self.cells += 1;
    }

    /// Every cell of the block holds the label. Labels occupy distinct
    /// cells, so counting is enough.
    fn is_filled(&self) -> bool {
        self.cells == self.rows.len() * self.cols.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_text(text: &str) -> Result<MosaicPlan, MosaicError> {
        let layout = MosaicLayout::from_text(text, '.')?;
        let grid = GridSpec::new(layout.nrows(), layout.ncols())?.into_shared();
        MosaicPlanner::new().plan(grid, &layout)
    }

    #[test]
    fn simple_text_layout() {
        let plan = plan_text("AAB\nCCB").unwrap();
        assert_eq!(plan.len(), 3);
        let a = &plan.get("A").unwrap().spec;
        assert_eq!((a.rows(), a.cols()), (0..1, 0..2));
        let b = &plan.get("B").unwrap().spec;
        assert_eq!((b.rows(), b.cols()), (0..2, 2..3));
        let c = &plan.get("C").unwrap().spec;
        assert_eq!((c.rows(), c.cols()), (1..2, 0..2));
        assert_eq!(plan.labels().collect::<Vec<_>>(), ["A", "B", "C"]);
    }

    #[test]
    fn crossed_labels_are_non_rectangular() {
        let err = plan_text("AB\nBA").unwrap_err();
        assert!(matches!(err, MosaicError::NonRectangular { ref label, .. } if label == "A"));
    }

    #[test]
    fn holes_are_non_rectangular() {
        assert!(matches!(
            plan_text("AAA\nA.A").unwrap_err(),
            MosaicError::NonRectangular { .. }
        ));
    }

    #[test]
    fn empty_cells_are_skipped() {
        let plan = plan_text("A.\n.B").unwrap();
        assert_eq!(plan.len(), 2);
        assert!(plan.get(".").is_none());
    }

    #[test]
    fn indented_text_is_dedented() {
        let plan = plan_text(
            "
            AB
            AC
            ",
        )
        .unwrap();
        assert_eq!(plan.grid().geometry(), (2, 2));
        assert_eq!(plan.get("A").unwrap().spec.rows(), 0..2);
    }

    #[test]
    fn ragged_rows_report_shape() {
        let err = MosaicLayout::from_text("AAB\nCC", '.').unwrap_err();
        assert_eq!(
            err,
            MosaicError::Shape {
                row: 1,
                row_len: 2,
                first_len: 3
            }
        );
        assert_eq!(MosaicLayout::from_text("  \n ", '.'), Err(MosaicError::Empty));
    }

    #[test]
    fn nested_layouts_recurse_into_subgrids() {
        let inner = MosaicLayout::from_rows(vec![vec!["x".into()], vec!["y".into()]]).unwrap();
        let outer = MosaicLayout::from_rows(vec![vec!["a".into(), inner.into()]]).unwrap();
        let grid = GridSpec::new(1, 2).unwrap().into_shared();
        let plan = MosaicPlanner::new().plan(grid, &outer).unwrap();

        assert_eq!(plan.labels().collect::<Vec<_>>(), ["a", "x", "y"]);
        let x = plan.get("x").unwrap();
        assert_eq!(x.depth, 1);
        assert_eq!(x.spec.grid().geometry(), (2, 1));
        assert_eq!(x.spec.grid().root_id(), plan.grid().id());
    }

    #[test]
    fn outer_label_reused_inside_is_duplicate() {
        let inner = MosaicLayout::from_rows(vec![vec!["a".into(), "b".into()]]).unwrap();
        let outer = MosaicLayout::from_rows(vec![vec!["a".into(), inner.into()]]).unwrap();
        let grid = GridSpec::new(1, 2).unwrap().into_shared();
        let err = MosaicPlanner::new().plan(grid, &outer).unwrap_err();
        assert!(matches!(err, MosaicError::DuplicateLabel { ref label, .. } if label == "a"));
    }

    #[test]
    fn sibling_nested_layouts_share_namespace() {
        let left = MosaicLayout::from_rows(vec![vec!["x".into()]]).unwrap();
        let right = MosaicLayout::from_rows(vec![vec!["x".into()]]).unwrap();
        let outer = MosaicLayout::from_rows(vec![vec![left.into(), right.into()]]).unwrap();
        let grid = GridSpec::new(1, 2).unwrap().into_shared();
        assert!(matches!(
            MosaicPlanner::new().plan(grid, &outer),
            Err(MosaicError::DuplicateLabel { .. })
        ));
    }

    #[test]
    fn custom_sentinel_label_is_empty() {
        let layout = MosaicLayout::from_rows(vec![vec!["a".into(), "-".into()]]).unwrap();
        let grid = GridSpec::new(1, 2).unwrap().into_shared();
        let plan = MosaicPlanner::new()
            .with_empty_sentinel("-")
            .plan(grid, &layout)
            .unwrap();
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn grid_shape_must_match() {
        let layout = MosaicLayout::from_text("AB", '.').unwrap();
        let grid = GridSpec::new(2, 2).unwrap().into_shared();
        assert!(matches!(
            MosaicPlanner::new().plan(grid, &layout),
            Err(MosaicError::GridMismatch { .. })
        ));
    }

    #[test]
    fn labels_keep_first_appearance_order() {
        let plan = plan_text("CAA\nCBB\nDDD").unwrap();
        assert_eq!(plan.labels().collect::<Vec<_>>(), ["C", "A", "B", "D"]);
        let d = &plan.get("D").unwrap().spec;
        assert_eq!((d.rows(), d.cols()), (2..3, 0..3));
        assert!(matches!(
            plan_text("AB.\nBBA"),
            Err(MosaicError::NonRectangular { label, .. }) if label == "A"
        ));
    }
}

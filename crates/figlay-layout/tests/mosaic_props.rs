//! Property tests for mosaic planning.
//!
//! Random label grids are planned and checked against a brute-force
//! rectangle test: planning must succeed exactly when every label fills its
//! bounding block, and then each slot must be that block.

use figlay_layout::{
    GridSpec, MosaicCell, MosaicError, MosaicLayout, MosaicPlanner, SubplotParams,
};
use proptest::prelude::*;

const ALPHABET: [char; 5] = ['A', 'B', 'C', 'D', '.'];

fn grid_strategy() -> impl Strategy<Value = Vec<Vec<char>>> {
    (1usize..5, 1usize..5).prop_flat_map(|(rows, cols)| {
        prop::collection::vec(
            prop::collection::vec(prop::sample::select(ALPHABET.to_vec()), cols),
            rows,
        )
    })
}

fn bounding_block(cells: &[Vec<char>], label: char) -> (usize, usize, usize, usize) {
    let mut block = (usize::MAX, 0, usize::MAX, 0);
    for (r, row) in cells.iter().enumerate() {
        for (c, &ch) in row.iter().enumerate() {
            if ch == label {
                block.0 = block.0.min(r);
                block.1 = block.1.max(r + 1);
                block.2 = block.2.min(c);
                block.3 = block.3.max(c + 1);
            }
        }
    }
    block
}

fn is_filled(cells: &[Vec<char>], label: char) -> bool {
    let (r0, r1, c0, c1) = bounding_block(cells, label);
    (r0..r1).all(|r| (c0..c1).all(|c| cells[r][c] == label))
}

fn present_labels(cells: &[Vec<char>]) -> Vec<char> {
    let mut labels: Vec<char> = cells.iter().flatten().copied().filter(|&c| c != '.').collect();
    labels.sort_unstable();
    labels.dedup();
    labels
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn plan_agrees_with_brute_force(cells in grid_strategy()) {
        let text: String = cells
            .iter()
            .map(|row| row.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n");
        let layout = MosaicLayout::from_text(&text, '.').expect("rectangular by construction");
        let grid = GridSpec::new(layout.nrows(), layout.ncols()).expect("non-empty").into_shared();
        let labels = present_labels(&cells);
        let expect_ok = labels.iter().all(|&l| is_filled(&cells, l));

        match MosaicPlanner::new().plan(grid, &layout) {
            Ok(plan) => {
                prop_assert!(expect_ok);
                prop_assert_eq!(plan.len(), labels.len());
                for label in labels {
                    let slot = plan.get(&label.to_string()).expect("every label planned");
                    let (r0, r1, c0, c1) = bounding_block(&cells, label);
                    prop_assert_eq!(usize::from(slot.spec.rows().start), r0);
                    prop_assert_eq!(usize::from(slot.spec.rows().end), r1);
                    prop_assert_eq!(usize::from(slot.spec.cols().start), c0);
                    prop_assert_eq!(usize::from(slot.spec.cols().end), c1);
                }
            }
            Err(MosaicError::NonRectangular { label, .. }) => {
                prop_assert!(!expect_ok);
                let ch = label.chars().next().expect("single-char label");
                prop_assert!(!is_filled(&cells, ch));
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }

    #[test]
    fn planned_slots_do_not_overlap(cells in grid_strategy()) {
        let rows: Vec<Vec<MosaicCell>> = cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&c| if c == '.' { MosaicCell::Empty } else { MosaicCell::label(c) })
                    .collect::<Vec<_>>()
            })
            .collect();
        let layout = MosaicLayout::from_rows(rows).expect("rectangular by construction");
        let grid = GridSpec::new(layout.nrows(), layout.ncols()).expect("non-empty").into_shared();
        let Ok(plan) = MosaicPlanner::new().plan(grid, &layout) else {
            return Ok(());
        };

        let params = SubplotParams::default();
        let rects: Vec<_> = plan.slots().iter().map(|s| s.spec.position(&params)).collect();
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                let overlap = a.intersect(*b);
                prop_assert!(overlap.area() < 1e-12, "slots {a:?} and {b:?} overlap");
            }
        }
    }
}

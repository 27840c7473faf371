#![no_main]

use arbitrary::Arbitrary;
use figlay_layout::grid::{decode_shorthand, resolve_index};
use figlay_layout::SubplotIndex;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    shorthand: u32,
    nrows: u8,
    ncols: u8,
    first: u32,
    last: Option<u32>,
}

fuzz_target!(|input: Input| {
    if let Ok((rows, cols, index)) = decode_shorthand(input.shorthand) {
        assert!((1..=9).contains(&rows) && (1..=9).contains(&cols));
        assert!((1..=9).contains(&index));
    }

    let (nrows, ncols) = (u16::from(input.nrows), u16::from(input.ncols));
    let index = match input.last {
        Some(last) => SubplotIndex::Range(input.first, last),
        None => SubplotIndex::Single(input.first),
    };
    let Ok(span) = resolve_index(nrows, ncols, index) else {
        return;
    };
    assert!(span.rows.start < span.rows.end && span.rows.end <= nrows);
    assert!(span.cols.start < span.cols.end && span.cols.end <= ncols);
    if matches!(index, SubplotIndex::Single(_)) {
        assert_eq!(span.rows.len(), 1);
        assert_eq!(span.cols.len(), 1);
    }
});

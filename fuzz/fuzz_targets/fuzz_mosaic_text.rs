#![no_main]

use figlay_layout::{GridSpec, MosaicLayout, MosaicPlanner, SubplotParams};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if text.len() > 512 {
        return;
    }

    // Parsing must never panic, whatever the input.
    let Ok(layout) = MosaicLayout::from_text(text, '.') else {
        return;
    };
    let Ok(grid) = GridSpec::new(layout.nrows(), layout.ncols()) else {
        return;
    };
    let Ok(plan) = MosaicPlanner::new().plan(grid.into_shared(), &layout) else {
        return;
    };

    let params = SubplotParams::default();
    let rects: Vec<_> = plan
        .slots()
        .iter()
        .map(|slot| slot.spec.position(&params))
        .collect();
    for rect in &rects {
        assert!(rect.x0 >= -1e-9 && rect.x1 <= 1.0 + 1e-9, "slot outside figure: {rect:?}");
        assert!(rect.y0 >= -1e-9 && rect.y1 <= 1.0 + 1e-9, "slot outside figure: {rect:?}");
    }
    for (i, a) in rects.iter().enumerate() {
        for b in &rects[i + 1..] {
            assert!(a.intersect(*b).area() < 1e-12, "slots {a:?} and {b:?} overlap");
        }
    }

    // Every planned label is reachable by name.
    for slot in plan.slots() {
        assert!(plan.get(&slot.label).is_some());
    }
});

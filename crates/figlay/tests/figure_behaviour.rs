//! End-to-end behaviour of `Figure`: placement, membership, layout modes and
//! the coordinate frame.

use std::cell::RefCell;
use std::rc::Rc;

use figlay::{
    AxesChange, AxesChangeKind, ConstrainedPads, ConstrainedPadsUpdate, ConstraintGraph,
    ConstraintSolver, Error, Figure, GeometryError, LayoutMode, ModeError, MosaicCell,
    MosaicError, MosaicLayout, PanelId, PanelOptions, PassOutcome, Rect, RegistryError,
    ShareMode, SolveError, SubplotArgs, SubplotIndex, SubplotParamsUpdate, SurfaceHost,
    TightPadding,
};

fn grid(nrows: u16, ncols: u16, index: u32) -> SubplotArgs {
    SubplotArgs::Grid {
        nrows,
        ncols,
        index: SubplotIndex::Single(index),
    }
}

fn spans(fig: &Figure, id: PanelId) -> ((u16, u16), (u16, u16)) {
    let spec = fig.panel(id).and_then(|p| p.spec()).expect("grid panel");
    (
        (spec.rows().start, spec.rows().end),
        (spec.cols().start, spec.cols().end),
    )
}

fn record_axes(fig: &mut Figure) -> Rc<RefCell<Vec<AxesChange>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    fig.add_axes_observer(move |e| sink.borrow_mut().push(*e));
    events
}

// --- Coordinate frame ------------------------------------------------------

#[test]
fn invalid_sizes_are_rejected_and_valid_ones_round_trip() {
    let mut fig = Figure::new();
    for (w, h) in [(-1.0, 2.0), (f64::NAN, 2.0), (3.0, f64::INFINITY)] {
        let err = fig.set_size_inches(w, h, false).unwrap_err();
        assert!(
            matches!(err, Error::Geometry(GeometryError::InvalidSize { .. })),
            "{err}"
        );
    }
    assert_eq!(fig.size_inches().width, 6.4);

    for (w, h) in [(0.0, 0.0), (3.3, 7.1), (1e-3, 123.456)] {
        fig.set_size_inches(w, h, false).unwrap();
        assert_eq!(fig.size_inches().width, w);
        assert_eq!(fig.size_inches().height, h);
    }
}

#[test]
fn device_rect_follows_dpi() {
    let mut fig = Figure::new();
    let id = fig
        .add_axes([0.0, 0.0, 0.5, 0.5], PanelOptions::default())
        .unwrap();
    assert_eq!(
        fig.panel_device_rect(id),
        Some(Rect::new(0.0, 0.0, 320.0, 240.0))
    );
    fig.set_dpi(200.0).unwrap();
    assert_eq!(
        fig.panel_device_rect(id),
        Some(Rect::new(0.0, 0.0, 640.0, 480.0))
    );
}

struct RecordingSurface(Rc<RefCell<Vec<(u32, u32)>>>);

impl SurfaceHost for RecordingSurface {
    fn request_resize(&mut self, width: u32, height: u32) {
        self.0.borrow_mut().push((width, height));
    }
}

#[test]
fn forwarded_resize_reaches_surface() {
    let requests = Rc::new(RefCell::new(Vec::new()));
    let mut fig = Figure::new();
    fig.attach_surface(Box::new(RecordingSurface(Rc::clone(&requests))));

    fig.set_size_inches(4.0, 3.0, false).unwrap();
    assert!(requests.borrow().is_empty());
    fig.set_figwidth(5.0, true).unwrap();
    assert_eq!(requests.borrow().as_slice(), &[(500, 300)]);
}

#[test]
fn dpi_observers_fire_on_change_only() {
    let mut fig = Figure::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let id = fig.on_dpi_changed(move |e| sink.borrow_mut().push((e.old, e.new)));

    fig.set_dpi(100.0).unwrap();
    fig.set_dpi(150.0).unwrap();
    fig.set_dpi(150.0).unwrap();
    assert_eq!(seen.borrow().as_slice(), &[(100.0, 150.0)]);

    assert!(fig.remove_dpi_observer(id));
    fig.set_dpi(72.0).unwrap();
    assert_eq!(seen.borrow().len(), 1);
}

// --- Grids and mosaics -----------------------------------------------------

#[test]
fn mosaic_text_places_three_panels() {
    let mut fig = Figure::new();
    let panels = fig.subplot_mosaic_str("AAB\nCCB").unwrap();
    assert_eq!(panels.len(), 3);

    let a = panels.get("A").unwrap();
    let b = panels.get("B").unwrap();
    let c = panels.get("C").unwrap();
    assert_eq!(spans(&fig, a), ((0, 1), (0, 2)));
    assert_eq!(spans(&fig, b), ((0, 2), (2, 3)));
    assert_eq!(spans(&fig, c), ((1, 2), (0, 2)));
    assert_eq!(fig.panel(a).unwrap().label(), Some("A"));
    assert_eq!(fig.panel_ids(), vec![a, b, c]);
}

#[test]
fn crossed_labels_are_not_rectangular() {
    let mut fig = Figure::new();
    let err = fig.subplot_mosaic_str("AB\nBA").unwrap_err();
    assert!(
        matches!(err, Error::Mosaic(MosaicError::NonRectangular { .. })),
        "{err}"
    );
    assert_eq!(fig.panel_count(), 0);
    assert!(fig.grids().is_empty());
}

#[test]
fn nested_reuse_of_outer_label_is_a_duplicate() {
    let inner = MosaicLayout::from_text("AB", '.').unwrap();
    let layout = MosaicLayout::from_rows(vec![vec![
        MosaicCell::label("A"),
        MosaicCell::Nested(inner),
    ]])
    .unwrap();
    let mut fig = Figure::new();
    let err = fig.subplot_mosaic(&layout).unwrap_err();
    match err {
        Error::Mosaic(MosaicError::DuplicateLabel { label, .. }) => assert_eq!(label, "A"),
        other => panic!("unexpected {other}"),
    }
}

#[test]
fn nested_mosaic_panels_sit_inside_their_slot() {
    let inner = MosaicLayout::from_text("x\ny", '.').unwrap();
    let layout = MosaicLayout::from_rows(vec![vec![
        MosaicCell::label("main"),
        MosaicCell::Nested(inner),
    ]])
    .unwrap();
    let mut fig = Figure::new();
    let panels = fig.subplot_mosaic(&layout).unwrap();
    assert_eq!(panels.iter().map(|(l, _)| l).collect::<Vec<_>>(), ["main", "x", "y"]);

    let main = fig.panel_rect(panels.get("main").unwrap()).unwrap();
    let x = fig.panel_rect(panels.get("x").unwrap()).unwrap();
    let y = fig.panel_rect(panels.get("y").unwrap()).unwrap();
    assert!(x.y0 > y.y0, "row 0 is on top");
    assert!(x.x0 > main.x1);
    assert!((x.x1 - 0.9).abs() < 1e-12);
}

#[test]
fn range_index_covers_bounding_block() {
    let mut fig = Figure::new();
    let id = fig
        .add_subplot(
            SubplotArgs::Grid {
                nrows: 3,
                ncols: 1,
                index: SubplotIndex::Range(1, 2),
            },
            PanelOptions::default(),
        )
        .unwrap();
    assert_eq!(spans(&fig, id), ((0, 2), (0, 1)));
}

#[test]
fn bad_shorthand_and_index_fail() {
    let mut fig = Figure::new();
    assert!(matches!(
        fig.add_subplot(SubplotArgs::Shorthand(1234), PanelOptions::default()),
        Err(Error::Grid(_))
    ));
    assert!(matches!(
        fig.add_subplot(grid(2, 2, 5), PanelOptions::default()),
        Err(Error::Grid(_))
    ));
    assert_eq!(fig.panel_count(), 0);
    assert!(fig.grids().is_empty());
}

#[test]
fn subplots_share_by_row_and_column() {
    let mut fig = Figure::new();
    let panels = fig.subplots(2, 2, ShareMode::Col, ShareMode::Row).unwrap();
    let at = |r, c| panels.get(r, c).unwrap();

    assert_eq!(fig.shared_x(at(0, 1)), vec![at(0, 1), at(1, 1)]);
    assert_eq!(fig.shared_y(at(1, 0)), vec![at(1, 0), at(1, 1)]);
    assert_eq!(fig.current_panel().map(|p| p.id()), Some(at(1, 1)));

    let removed = fig.delaxes(at(1, 1)).unwrap();
    assert_eq!(removed.id(), at(1, 1));
    assert!(fig.shared_x(at(0, 1)).is_empty());
    assert!(fig.shared_y(at(1, 0)).is_empty());
}

// --- Membership ------------------------------------------------------------

#[test]
fn delaxes_then_readd_keeps_identity() {
    let mut fig = Figure::new();
    let events = record_axes(&mut fig);
    let a = fig.add_subplot(grid(1, 2, 1), PanelOptions::default()).unwrap();
    let b = fig.add_subplot(grid(1, 2, 2), PanelOptions::default()).unwrap();

    let panel = fig.delaxes(a).unwrap();
    assert_eq!(fig.current_panel().map(|p| p.id()), Some(b));
    assert!(matches!(
        fig.delaxes(a),
        Err(Error::Registry(RegistryError::NotFound(id))) if id == a
    ));

    let again = fig.add_subplot(panel, PanelOptions::default()).unwrap();
    assert_eq!(again, a);
    assert_eq!(fig.panel_ids(), vec![b, a]);

    let kinds: Vec<_> = events.borrow().iter().map(|e| (e.panel, e.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            (a, AxesChangeKind::Added),
            (b, AxesChangeKind::Added),
            (a, AxesChangeKind::Removed),
            (a, AxesChangeKind::Added),
        ]
    );
}

#[test]
fn foreign_panels_are_refused() {
    let mut first = Figure::new();
    let mut second = Figure::new();
    let id = first.gca(PanelOptions::default()).unwrap();
    let panel = first.delaxes(id).unwrap();
    let err = second.add_subplot(panel, PanelOptions::default()).unwrap_err();
    assert!(matches!(err, Error::ForeignPanel { panel, .. } if panel == id));
}

#[test]
fn gca_creates_once_and_sca_promotes() {
    let mut fig = Figure::new();
    let first = fig.gca(PanelOptions::default()).unwrap();
    assert_eq!(fig.gca(PanelOptions::default()).unwrap(), first);

    let other = fig
        .add_axes([0.6, 0.6, 0.3, 0.3], PanelOptions::default())
        .unwrap();
    assert_eq!(fig.gca(PanelOptions::default()).unwrap(), other);

    let events = record_axes(&mut fig);
    fig.sca(first).unwrap();
    assert_eq!(fig.gca(PanelOptions::default()).unwrap(), first);
    assert_eq!(fig.panel_ids(), vec![first, other]);
    assert_eq!(
        events.borrow().as_slice(),
        &[AxesChange {
            figure: fig.id(),
            panel: first,
            kind: AxesChangeKind::Activated,
        }]
    );
}

#[test]
fn gca_with_other_projection_makes_new_panel() {
    let mut fig = Figure::new();
    let flat = fig.gca(PanelOptions::default()).unwrap();
    let polar = fig
        .gca(PanelOptions::default().projection("polar"))
        .unwrap();
    assert_ne!(flat, polar);
    assert_eq!(fig.panel_ids(), vec![polar]);
    assert_eq!(
        fig.gca(PanelOptions::default().projection("polar")).unwrap(),
        polar
    );
}

#[test]
fn clear_respects_keep_observers() {
    let mut fig = Figure::new();
    let events = record_axes(&mut fig);
    fig.subplots(1, 2, ShareMode::All, ShareMode::All).unwrap();
    events.borrow_mut().clear();

    fig.clear(true);
    assert_eq!(fig.panel_count(), 0);
    assert!(fig.grids().is_empty());
    assert_eq!(events.borrow().len(), 2);
    assert!(
        events
            .borrow()
            .iter()
            .all(|e| e.kind == AxesChangeKind::Removed)
    );

    fig.gca(PanelOptions::default()).unwrap();
    assert_eq!(events.borrow().len(), 3);

    fig.clear(false);
    fig.gca(PanelOptions::default()).unwrap();
    assert_eq!(events.borrow().len(), 4, "removal is reported, then observers go");
}

// --- Layout modes ----------------------------------------------------------

#[test]
fn manual_adjustment_after_constrained_is_manual() {
    let mut fig = Figure::new();
    fig.set_constrained_layout(Some(ConstrainedPadsUpdate::default()));
    assert!(fig.layout_mode().is_constrained());

    fig.subplots_adjust(SubplotParamsUpdate::default().left(0.2))
        .unwrap();
    assert_eq!(fig.layout_mode(), LayoutMode::Manual);
    assert_eq!(fig.subplot_params().left, 0.2);
}

#[test]
fn subplots_adjust_moves_grid_panels_only() {
    let mut fig = Figure::new();
    let gridded = fig.gca(PanelOptions::default()).unwrap();
    let free = fig
        .add_axes([0.05, 0.05, 0.2, 0.2], PanelOptions::default())
        .unwrap();
    let before = fig.panel_rect(free).unwrap();

    fig.subplots_adjust(SubplotParamsUpdate::default().left(0.3).right(0.7))
        .unwrap();
    let moved = fig.panel_rect(gridded).unwrap();
    assert!((moved.x0 - 0.3).abs() < 1e-12);
    assert!((moved.x1 - 0.7).abs() < 1e-12);
    assert_eq!(fig.panel_rect(free), Some(before));

    let err = fig
        .subplots_adjust(SubplotParamsUpdate::default().bottom(0.9))
        .unwrap_err();
    assert!(matches!(err, Error::Geometry(GeometryError::InvalidParams(_))));
    assert_eq!(fig.panel_rect(gridded), Some(moved));
}

#[test]
fn tight_mode_refits_when_size_changes() {
    let mut fig = Figure::new();
    let id = fig.gca(PanelOptions::default()).unwrap();
    fig.set_tight_layout(Some(TightPadding {
        pad: 0.5,
        ..TightPadding::default()
    }));

    let PassOutcome::Params(params) = fig.render_pass() else {
        panic!("first pass must fit");
    };
    assert!((params.left - 0.5 / 6.4).abs() < 1e-12);
    assert!((fig.panel_rect(id).unwrap().x0 - 0.5 / 6.4).abs() < 1e-12);
    assert_eq!(fig.render_pass(), PassOutcome::Unchanged);

    fig.set_size_inches(10.0, 4.8, false).unwrap();
    assert!(matches!(fig.render_pass(), PassOutcome::Params(p) if (p.left - 0.05).abs() < 1e-12));
}

#[test]
fn explicit_tight_layout_keeps_mode_and_refuses_constrained() {
    let mut fig = Figure::new();
    fig.gca(PanelOptions::default()).unwrap();
    fig.tight_layout(TightPadding {
        pad: 0.64,
        ..TightPadding::default()
    })
    .unwrap();
    assert_eq!(fig.layout_mode(), LayoutMode::Manual);
    assert!((fig.subplot_params().left - 0.1).abs() < 1e-12);

    let err = fig
        .tight_layout(TightPadding {
            pad: 100.0,
            ..TightPadding::default()
        })
        .unwrap_err();
    assert!(matches!(err, Error::Solve(SolveError::Infeasible(_))));

    fig.set_constrained_layout(Some(ConstrainedPadsUpdate::default()));
    assert!(matches!(
        fig.tight_layout(TightPadding::default()),
        Err(Error::Mode(ModeError::Incompatible { .. }))
    ));
}

struct Shrink;

impl ConstraintSolver for Shrink {
    fn solve(
        &mut self,
        graph: &ConstraintGraph,
        pads: &ConstrainedPads,
    ) -> Result<Vec<(PanelId, Rect)>, SolveError> {
        Ok(graph
            .panels()
            .map(|(id, r)| {
                (
                    id,
                    Rect::new(r.x0 + pads.w_pad, r.y0 + pads.h_pad, r.x1, r.y1),
                )
            })
            .collect())
    }
}

#[test]
fn constrained_pass_applies_solver_rects() {
    let mut fig = Figure::new();
    fig.set_size_inches(3.0, 3.0, false).unwrap();
    let id = fig.gca(PanelOptions::default()).unwrap();
    let before = fig.panel_rect(id).unwrap();

    fig.set_constraint_solver(Box::new(Shrink));
    fig.set_constrained_layout(Some(ConstrainedPadsUpdate {
        w_pad: Some(0.3),
        h_pad: Some(0.6),
        ..ConstrainedPadsUpdate::default()
    }));
    let pads = fig.constrained_layout_pads(true);
    assert!((pads.w_pad - 0.1).abs() < 1e-12);
    assert!((pads.h_pad - 0.2).abs() < 1e-12);

    assert!(matches!(fig.render_pass(), PassOutcome::Rects(r) if r.len() == 1));
    let after = fig.panel_rect(id).unwrap();
    assert!((after.x0 - (before.x0 + 0.1)).abs() < 1e-12);
    assert!((after.y0 - (before.y0 + 0.2)).abs() < 1e-12);
}

#[test]
fn constrained_pads_inches_and_defaults() {
    let mut fig = Figure::new();
    assert_eq!(fig.constrained_layout_pads(false), ConstrainedPads::default());
    fig.set_constrained_layout(Some(ConstrainedPadsUpdate::default()));
    fig.set_constrained_layout_pads(ConstrainedPadsUpdate {
        wspace: Some(0.1),
        ..ConstrainedPadsUpdate::default()
    });
    assert_eq!(fig.constrained_layout_pads(false).wspace, 0.1);
    fig.set_constrained_layout(None);
    assert_eq!(fig.layout_mode(), LayoutMode::Manual);
}

#![forbid(unsafe_code)]

//! Physical size, resolution and the figure-to-device transform.
//!
//! The chain is `normalized figure → inches → device pixels`:
//!
//! ```text
//! figure_to_device = scale(dpi) · scale(width_in, height_in)
//! ```
//!
//! Both factors are recomputed into a fresh value and swapped in only after
//! validation, so a reader never sees a transform built from one old and one
//! new factor. Device space keeps the figure's orientation (origin at the
//! bottom-left, `y` up).

use std::fmt;

use kurbo::{Affine, Rect, Size};

use crate::geometry;
use crate::id::ObserverId;
use crate::observer::ObserverList;

/// Default figure size in inches.
pub const DEFAULT_SIZE: Size = Size::new(6.4, 4.8);
/// Default resolution in dots per inch.
pub const DEFAULT_DPI: f64 = 100.0;

/// Invalid geometric input.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Non-finite or negative figure size.
    InvalidSize { width: f64, height: f64 },
    /// Non-finite or non-positive resolution.
    InvalidResolution(f64),
    /// Rectangle with non-finite coordinates.
    InvalidRect(Rect),
    /// Inconsistent layout parameters.
    InvalidParams(String),
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSize { width, height } => write!(
                f,
                "figure size must be positive finite, not ({width}, {height})"
            ),
            Self::InvalidResolution(dpi) => {
                write!(f, "resolution must be positive finite, not {dpi}")
            }
            Self::InvalidRect(rect) => write!(
                f,
                "rectangle must be finite, not [{}, {}, {}, {}]",
                rect.x0,
                rect.y0,
                rect.width(),
                rect.height()
            ),
            Self::InvalidParams(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for GeometryError {}

/// Hosting display surface. Resize requests are best effort.
pub trait SurfaceHost {
    /// Ask the host to resize to `width × height` device pixels.
    fn request_resize(&mut self, width: u32, height: u32);

    /// Physical pixels per logical pixel.
    fn device_pixel_ratio(&self) -> f64 {
        1.0
    }
}

/// Payload delivered to resolution observers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionChanged {
    pub old: f64,
    pub new: f64,
}

/// Size, resolution and derived transform of one figure.
pub struct CoordinateFrame {
    size: Size,
    dpi: f64,
    inches_to_device: Affine,
    figure_to_device: Affine,
    revision: u64,
    surface: Option<Box<dyn SurfaceHost>>,
    resolution_observers: ObserverList<ResolutionChanged>,
}

impl CoordinateFrame {
    /// Frame of `width × height` inches at `dpi`.
    pub fn new(width: f64, height: f64, dpi: f64) -> Result<Self, GeometryError> {
        validate_size(width, height)?;
        validate_dpi(dpi)?;
        let size = Size::new(width, height);
        let (inches_to_device, figure_to_device) = derive(size, dpi);
        Ok(Self {
            size,
            dpi,
            inches_to_device,
            figure_to_device,
            revision: 0,
            surface: None,
            resolution_observers: ObserverList::new(),
        })
    }

    /// Size in inches.
    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    /// Dots per inch.
    #[must_use]
    pub fn resolution(&self) -> f64 {
        self.dpi
    }

    /// Normalized figure coordinates to device pixels.
    #[must_use]
    pub fn figure_to_device(&self) -> Affine {
        self.figure_to_device
    }

    /// Inches to device pixels.
    #[must_use]
    pub fn inches_to_device(&self) -> Affine {
        self.inches_to_device
    }

    /// Figure extent in device pixels.
    #[must_use]
    pub fn device_size(&self) -> Size {
        self.size * self.dpi
    }

    /// Map a normalized rectangle into device pixels.
    #[must_use]
    pub fn to_device_rect(&self, rect: Rect) -> Rect {
        geometry::map_rect(self.figure_to_device, rect)
    }

    /// Bumped on every effective size or resolution change.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Resize the figure. With `forward`, the attached surface is asked to
    /// follow.
    pub fn set_size(&mut self, width: f64, height: f64, forward: bool) -> Result<(), GeometryError> {
        validate_size(width, height)?;
        self.apply(Size::new(width, height), self.dpi);
        tracing::trace!(target: "figlay.frame", width, height, forward, "size set");
        if forward {
            self.forward_size();
        }
        Ok(())
    }

    /// Change only the width.
    pub fn set_width(&mut self, width: f64, forward: bool) -> Result<(), GeometryError> {
        self.set_size(width, self.size.height, forward)
    }

    /// Change only the height.
    pub fn set_height(&mut self, height: f64, forward: bool) -> Result<(), GeometryError> {
        self.set_size(self.size.width, height, forward)
    }

    /// Change the resolution.
    ///
    /// Setting the current value is a no-op and fires nothing. Otherwise the
    /// transform is rebuilt, the size is re-applied (forwarding to the
    /// surface) and resolution observers run once the frame is consistent.
    pub fn set_resolution(&mut self, dpi: f64) -> Result<(), GeometryError> {
        validate_dpi(dpi)?;
        if dpi == self.dpi {
            return Ok(());
        }
        let old = self.dpi;
        self.apply(self.size, dpi);
        self.forward_size();
        tracing::debug!(target: "figlay.frame", old, new = dpi, "resolution changed");
        self.resolution_observers
            .notify(&ResolutionChanged { old, new: dpi });
        Ok(())
    }

    /// Attach the hosting surface, replacing any previous one.
    pub fn attach_surface(&mut self, surface: Box<dyn SurfaceHost>) {
        self.surface = Some(surface);
    }

    /// Detach and return the hosting surface.
    pub fn detach_surface(&mut self) -> Option<Box<dyn SurfaceHost>> {
        self.surface.take()
    }

    #[must_use]
    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    /// Run `callback` after every effective resolution change.
    pub fn on_resolution_changed(
        &mut self,
        callback: impl FnMut(&ResolutionChanged) + 'static,
    ) -> ObserverId {
        self.resolution_observers.connect(callback)
    }

    /// Disconnect a resolution observer.
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.resolution_observers.disconnect(id)
    }

    /// Drop every resolution observer.
    pub fn clear_observers(&mut self) {
        self.resolution_observers.clear();
    }

    fn apply(&mut self, size: Size, dpi: f64) {
        let (inches_to_device, figure_to_device) = derive(size, dpi);
        self.size = size;
        self.dpi = dpi;
        self.inches_to_device = inches_to_device;
        self.figure_to_device = figure_to_device;
        self.revision += 1;
    }

    fn forward_size(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let ratio = surface.device_pixel_ratio();
        let ratio = if ratio.is_finite() && ratio > 0.0 { ratio } else { 1.0 };
        let px = self.size * self.dpi / ratio;
        let (w, h) = (to_pixels(px.width), to_pixels(px.height));
        tracing::trace!(target: "figlay.frame", w, h, ratio, "forwarding resize");
        surface.request_resize(w, h);
    }
}

impl Default for CoordinateFrame {
    fn default() -> Self {
        let (inches_to_device, figure_to_device) = derive(DEFAULT_SIZE, DEFAULT_DPI);
        Self {
            size: DEFAULT_SIZE,
            dpi: DEFAULT_DPI,
            inches_to_device,
            figure_to_device,
            revision: 0,
            surface: None,
            resolution_observers: ObserverList::new(),
        }
    }
}

impl fmt::Debug for CoordinateFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinateFrame")
            .field("size", &self.size)
            .field("dpi", &self.dpi)
            .field("revision", &self.revision)
            .field("surface", &self.surface.is_some())
            .field("resolution_observers", &self.resolution_observers)
            .finish()
    }
}

/// Width and height in inches for a figure with the given `height / width`
/// aspect ratio.
///
/// The height defaults to 4.8 in; the result is scaled to fit within
/// `[4, 16] × [2, 16]` inches, then clamped.
#[must_use]
pub fn figaspect(ratio: f64) -> Size {
    const MIN: Size = Size::new(4.0, 2.0);
    const MAX: Size = Size::new(16.0, 16.0);
    const HEIGHT: f64 = 4.8;

    let mut size = Size::new(HEIGHT / ratio, HEIGHT);
    let shrink = (MIN.width / size.width).max(MIN.height / size.height);
    if shrink > 1.0 {
        size = size * shrink;
    }
    let grow = (size.width / MAX.width).max(size.height / MAX.height);
    if grow > 1.0 {
        size = size / grow;
    }
    Size::new(
        size.width.clamp(MIN.width, MAX.width),
        size.height.clamp(MIN.height, MAX.height),
    )
}

fn derive(size: Size, dpi: f64) -> (Affine, Affine) {
    let inches_to_device = Affine::scale(dpi);
    let figure_to_device =
        inches_to_device * Affine::scale_non_uniform(size.width, size.height);
    (inches_to_device, figure_to_device)
}

fn validate_size(width: f64, height: f64) -> Result<(), GeometryError> {
    if width.is_finite() && height.is_finite() && width >= 0.0 && height >= 0.0 {
        Ok(())
    } else {
        Err(GeometryError::InvalidSize { width, height })
    }
}

fn validate_dpi(dpi: f64) -> Result<(), GeometryError> {
    if dpi.is_finite() && dpi > 0.0 {
        Ok(())
    } else {
        Err(GeometryError::InvalidResolution(dpi))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_pixels(value: f64) -> u32 {
    value.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct RecordingSurface {
        ratio: f64,
        requests: Rc<RefCell<Vec<(u32, u32)>>>,
    }

    impl SurfaceHost for RecordingSurface {
        fn request_resize(&mut self, width: u32, height: u32) {
            self.requests.borrow_mut().push((width, height));
        }

        fn device_pixel_ratio(&self) -> f64 {
            self.ratio
        }
    }

    fn surface(ratio: f64) -> (RecordingSurface, Rc<RefCell<Vec<(u32, u32)>>>) {
        let s = RecordingSurface {
            ratio,
            requests: Rc::default(),
        };
        let requests = Rc::clone(&s.requests);
        (s, requests)
    }

    #[test]
    fn rejects_bad_sizes() {
        let mut frame = CoordinateFrame::default();
        assert!(matches!(
            frame.set_size(-1.0, 2.0, false),
            Err(GeometryError::InvalidSize { .. })
        ));
        assert!(frame.set_size(3.0, f64::NAN, false).is_err());
        assert!(frame.set_size(f64::INFINITY, 3.0, false).is_err());
        assert_eq!(frame.size(), DEFAULT_SIZE);
        assert_eq!(frame.revision(), 0);
    }

    #[test]
    fn valid_size_round_trips() {
        let mut frame = CoordinateFrame::default();
        frame.set_size(7.25, 3.5, false).unwrap();
        assert_eq!(frame.size(), Size::new(7.25, 3.5));
        frame.set_size(0.0, 0.0, false).unwrap();
        assert_eq!(frame.size(), Size::ZERO);
    }

    #[test]
    fn transform_is_size_times_dpi() {
        let mut frame = CoordinateFrame::new(4.0, 3.0, 50.0).unwrap();
        assert_eq!(frame.device_size(), Size::new(200.0, 150.0));
        let r = frame.to_device_rect(geometry::UNIT);
        assert!(geometry::approx_eq(r, Rect::new(0.0, 0.0, 200.0, 150.0), 1e-9));

        frame.set_resolution(100.0).unwrap();
        let r = frame.to_device_rect(Rect::new(0.5, 0.5, 1.0, 1.0));
        assert!(geometry::approx_eq(r, Rect::new(200.0, 150.0, 400.0, 300.0), 1e-9));
    }

    #[test]
    fn rejects_bad_resolution() {
        let mut frame = CoordinateFrame::default();
        assert_eq!(
            frame.set_resolution(0.0),
            Err(GeometryError::InvalidResolution(0.0))
        );
        assert!(frame.set_resolution(f64::NAN).is_err());
        assert!(CoordinateFrame::new(1.0, 1.0, -3.0).is_err());
    }

    #[test]
    fn unchanged_resolution_fires_nothing() {
        let mut frame = CoordinateFrame::default();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        frame.on_resolution_changed(move |e| sink.borrow_mut().push(*e));

        frame.set_resolution(DEFAULT_DPI).unwrap();
        assert!(events.borrow().is_empty());
        assert_eq!(frame.revision(), 0);

        frame.set_resolution(200.0).unwrap();
        assert_eq!(
            *events.borrow(),
            vec![ResolutionChanged {
                old: 100.0,
                new: 200.0
            }]
        );
    }

    #[test]
    fn observer_sees_consistent_state_count() {
        let mut frame = CoordinateFrame::default();
        let hits = Rc::new(RefCell::new(0));
        let h = Rc::clone(&hits);
        let id = frame.on_resolution_changed(move |_| *h.borrow_mut() += 1);
        frame.set_resolution(72.0).unwrap();
        assert!(frame.remove_observer(id));
        frame.set_resolution(96.0).unwrap();
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn forwarding_requests_rounded_pixels() {
        let mut frame = CoordinateFrame::default();
        let (s, requests) = surface(2.0);
        frame.attach_surface(Box::new(s));

        frame.set_size(3.333, 2.0, true).unwrap();
        frame.set_size(5.0, 5.0, false).unwrap();
        assert_eq!(*requests.borrow(), vec![(167, 100)]);

        frame.set_resolution(50.0).unwrap();
        assert_eq!(requests.borrow().last(), Some(&(125, 125)));
    }

    #[test]
    fn forwarding_without_surface_is_fine() {
        let mut frame = CoordinateFrame::default();
        frame.set_size(2.0, 2.0, true).unwrap();
        assert!(!frame.has_surface());
    }

    #[test]
    fn figaspect_clamps() {
        let s = figaspect(1.0);
        assert!((s.width - 4.8).abs() < 1e-12 && (s.height - 4.8).abs() < 1e-12);

        let wide = figaspect(0.1);
        assert!((wide.width - 16.0).abs() < 1e-12);
        assert!((wide.height - 2.0).abs() < 1e-12);

        let tall = figaspect(10.0);
        assert!(tall.width >= 4.0 && tall.height <= 16.0);
    }
}

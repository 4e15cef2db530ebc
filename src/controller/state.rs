//! Zoom, pan and scroll bookkeeping for the diagram surface.
//!
//! [`RenderState`] never touches the diagram itself: its only output is the
//! affine transform applied when the installed SVG is drawn.

use resvg::tiny_skia::Transform;

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 3.0;
pub const ZOOM_STEP: f32 = 0.1;

/// A point in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Interaction state of the diagram surface.
///
/// # Example
///
/// ```
/// use mindmapper::controller::RenderState;
///
/// let mut state = RenderState::default();
/// for _ in 0..50 {
///     state.zoom_in();
/// }
/// assert_eq!(state.zoom(), 3.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    zoom: f32,
    pan: Point,
    dragging: bool,
    drag_anchor: Point,
    drag_moved: bool,
    full_screen: bool,
    scroll: Point,
    rendered: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Point::ORIGIN,
            dragging: false,
            drag_anchor: Point::ORIGIN,
            drag_moved: false,
            full_screen: false,
            scroll: Point::ORIGIN,
            rendered: false,
        }
    }
}

impl RenderState {
    pub const fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Zoom as a whole percentage, as shown in the status bar.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn zoom_percent(&self) -> u16 {
        (self.zoom * 100.0).round() as u16
    }

    pub const fn pan(&self) -> Point {
        self.pan
    }

    pub const fn scroll(&self) -> Point {
        self.scroll
    }

    pub const fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Whether the current (or last) drag gesture moved the pointer.
    pub const fn drag_moved(&self) -> bool {
        self.drag_moved
    }

    pub const fn is_full_screen(&self) -> bool {
        self.full_screen
    }

    pub const fn is_rendered(&self) -> bool {
        self.rendered
    }

    pub(crate) const fn set_rendered(&mut self, rendered: bool) {
        self.rendered = rendered;
    }

    pub fn zoom_in(&mut self) {
        self.step_zoom(ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.step_zoom(-ZOOM_STEP);
    }

    fn step_zoom(&mut self, delta: f32) {
        // Round to one decimal so repeated steps land exactly on the bounds.
        let next = ((self.zoom + delta) * 10.0).round() / 10.0;
        self.zoom = next.clamp(MIN_ZOOM, MAX_ZOOM);
        tracing::debug!(zoom = self.zoom, "zoom changed");
    }

    /// Zoom 1, pan and scroll back at the origin.
    pub const fn reset_view(&mut self) {
        self.zoom = 1.0;
        self.pan = Point::ORIGIN;
        self.scroll = Point::ORIGIN;
    }

    pub const fn toggle_full_screen(&mut self) {
        self.full_screen = !self.full_screen;
        self.reset_view();
    }

    pub const fn pointer_down(&mut self, at: Point) {
        self.dragging = true;
        self.drag_anchor = at;
        self.drag_moved = false;
    }

    /// Pan by the distance moved since the previous pointer position.
    pub fn pointer_move(&mut self, at: Point) {
        if !self.dragging {
            return;
        }
        let dx = at.x - self.drag_anchor.x;
        let dy = at.y - self.drag_anchor.y;
        if dx != 0.0 || dy != 0.0 {
            self.drag_moved = true;
        }
        self.pan = Point::new(self.pan.x + dx, self.pan.y + dy);
        self.drag_anchor = at;
    }

    pub const fn pointer_up(&mut self) {
        self.dragging = false;
    }

    pub const fn pointer_leave(&mut self) {
        self.dragging = false;
    }

    pub fn scroll_by(&mut self, dx: f32, dy: f32) {
        self.scroll = Point::new(self.scroll.x + dx, self.scroll.y + dy);
    }

    pub const fn set_scroll(&mut self, scroll: Point) {
        self.scroll = scroll;
    }

    /// Transform from SVG canvas pixels to surface pixels.
    ///
    /// The diagram is first fitted and centered in the surface, then scaled
    /// by the zoom factor and translated by the pan offset about the surface
    /// center, then shifted by the scroll offset.
    pub fn view_transform(&self, content: (f32, f32), surface: (f32, f32)) -> Transform {
        let (cw, ch) = content;
        let (sw, sh) = surface;
        let base = if cw > 0.0 && ch > 0.0 && sw > 0.0 && sh > 0.0 {
            let fit = (sw / cw).min(sh / ch);
            Transform::from_row(
                fit,
                0.0,
                0.0,
                fit,
                (sw - cw * fit) / 2.0,
                (sh - ch * fit) / 2.0,
            )
        } else {
            Transform::identity()
        };

        let (cx, cy) = (sw / 2.0, sh / 2.0);
        base.post_translate(-cx, -cy)
            .post_translate(self.pan.x, self.pan.y)
            .post_scale(self.zoom, self.zoom)
            .post_translate(cx, cy)
            .post_translate(-self.scroll.x, -self.scroll.y)
    }

    /// Map a surface point back into SVG canvas pixels.
    pub fn surface_to_canvas(
        &self,
        at: Point,
        content: (f32, f32),
        surface: (f32, f32),
    ) -> Option<Point> {
        let inverse = self.view_transform(content, surface).invert()?;
        Some(apply(&inverse, at))
    }
}

/// Apply an affine transform to a point.
pub fn apply(ts: &Transform, p: Point) -> Point {
    Point::new(
        ts.sx * p.x + ts.kx * p.y + ts.tx,
        ts.ky * p.x + ts.sy * p.y + ts.ty,
    )
}

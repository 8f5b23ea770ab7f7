//! Pointer/wheel interaction state machine.
//!
//! One persistent controller holds the live camera and gesture state; every
//! event handler reads it fresh instead of closing over a snapshot. The
//! widget glue in `shader.rs` translates iced events into the methods here
//! and maps the returned [`Outcome`] onto redraw/capture/publish actions.

use crate::camera::{Camera, Viewport};
use crate::scatter::PointSet;
use tracing::debug;

/// Surface geometry and configuration for one event, derived from the
/// widget's current bounds and style.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Context {
    /// `(data_width, data_height)` from the point set's bounding box.
    pub extent: (f32, f32),
    /// Widget size in pixels.
    pub size: (f32, f32),
    /// Marker radius in pixels; also scales the hover threshold.
    pub marker_radius: f32,
    pub pan: bool,
    pub zoom: bool,
    pub zoom_speed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    Dragging {
        anchor_mouse: (f32, f32),
        anchor_center: (f32, f32),
    },
}

/// What an event did, from the widget's perspective.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Outcome {
    Ignored,
    /// A drag gesture started.
    Grabbed,
    /// The camera center moved.
    Panned,
    /// A drag gesture ended as a pan; no selection fires.
    Released,
    /// The hover index changed.
    Hovered,
    /// The zoom level changed.
    Zoomed,
    /// A completed click gesture; emit a selection event.
    Clicked(Option<usize>),
}

#[derive(Debug)]
pub(crate) struct Controller {
    camera: Camera,
    phase: Phase,
    cursor: (f32, f32),
    hovering: Option<usize>,
}

impl Controller {
    pub(crate) fn new() -> Self {
        Self {
            camera: Camera::default(),
            phase: Phase::Idle,
            cursor: (0.0, 0.0),
            hovering: None,
        }
    }

    pub(crate) fn camera(&self) -> Camera {
        self.camera
    }

    pub(crate) fn hovering(&self) -> Option<usize> {
        self.hovering
    }

    pub(crate) fn is_dragging(&self) -> bool {
        matches!(self.phase, Phase::Dragging { .. })
    }

    fn viewport(&self, ctx: &Context) -> Viewport {
        Viewport {
            camera: self.camera,
            extent: ctx.extent,
            size: ctx.size,
        }
    }

    fn hover_at(&self, pos: (f32, f32), data: &PointSet, ctx: &Context) -> Option<usize> {
        let viewport = self.viewport(ctx);
        let (qx, qy) = viewport.screen_to_data(pos);
        let hit = data.nearest(qx, qy, 1);
        let nearest = hit.first()?;
        (nearest.distance < viewport.hover_threshold(ctx.marker_radius)).then_some(nearest.index)
    }

    /// Left button pressed. `pos` is the pointer position within the widget,
    /// or `None` when the press landed outside it.
    pub(crate) fn mouse_down(&mut self, pos: Option<(f32, f32)>) -> Outcome {
        let Some(pos) = pos else {
            return Outcome::Ignored;
        };

        self.cursor = pos;
        self.phase = Phase::Dragging {
            anchor_mouse: pos,
            anchor_center: self.camera.center,
        };
        Outcome::Grabbed
    }

    /// Pointer moved. The position is always tracked; outside the widget it
    /// drives neither panning nor hover.
    pub(crate) fn mouse_move(
        &mut self,
        pos: (f32, f32),
        inside: bool,
        data: &PointSet,
        ctx: &Context,
    ) -> Outcome {
        self.cursor = pos;

        match self.phase {
            Phase::Dragging {
                anchor_mouse,
                anchor_center,
            } => {
                if !inside || !ctx.pan {
                    return Outcome::Ignored;
                }
                self.camera.center = self
                    .viewport(ctx)
                    .pan_target(anchor_center, anchor_mouse, pos);
                Outcome::Panned
            }
            Phase::Idle => {
                if !inside {
                    return Outcome::Ignored;
                }
                let hover = self.hover_at(pos, data, ctx);
                if hover != self.hovering {
                    self.hovering = hover;
                    Outcome::Hovered
                } else {
                    Outcome::Ignored
                }
            }
        }
    }

    /// Left button released. A release at exactly the anchor position (both
    /// axes) is a click: the selection is re-evaluated at that position and
    /// emitted. Any net movement means the gesture was a pan. A release
    /// outside the widget ends the drag without a selection.
    pub(crate) fn mouse_up(
        &mut self,
        pos: Option<(f32, f32)>,
        data: &PointSet,
        ctx: &Context,
    ) -> Outcome {
        let Phase::Dragging { anchor_mouse, .. } = self.phase else {
            return Outcome::Ignored;
        };
        self.phase = Phase::Idle;

        let Some(pos) = pos else {
            return Outcome::Released;
        };
        self.cursor = pos;

        if pos == anchor_mouse {
            self.hovering = self.hover_at(pos, data, ctx);
            debug!(index = ?self.hovering, "click gesture completed");
            Outcome::Clicked(self.hovering)
        } else {
            Outcome::Released
        }
    }

    /// Wheel scrolled, in lines (positive = up = zoom in). Zoom rescales
    /// about the current center; the pointer position does not anchor it.
    pub(crate) fn wheel(&mut self, lines: f32, inside: bool, ctx: &Context) -> Outcome {
        if !inside || !ctx.zoom {
            return Outcome::Ignored;
        }

        let before = self.camera.zoom;
        self.camera.apply_wheel(lines, ctx.zoom_speed);
        if self.camera.zoom != before {
            Outcome::Zoomed
        } else {
            Outcome::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{MAX_ZOOM, MIN_ZOOM};

    // Three collinear points; 100x100 surface. The larger range is 20, so
    // the padded extent is 24x24 and the hover threshold at zoom 1 is
    // 3 px * 24 / 100 = 0.72 data units.
    fn data() -> PointSet {
        PointSet::new(&[0.0, 10.0, 20.0], &[0.0, 0.0, 0.0])
    }

    fn ctx(data: &PointSet) -> Context {
        Context {
            extent: data.bounds().extent(100.0, 100.0),
            size: (100.0, 100.0),
            marker_radius: 3.0,
            pan: true,
            zoom: true,
            zoom_speed: 1.0 / 3.0,
        }
    }

    fn centered_on_middle_point() -> Controller {
        let mut controller = Controller::new();
        controller.camera = Camera {
            center: (10.0, 0.0),
            zoom: 1.0,
        };
        controller
    }

    #[test]
    fn test_drag_pans_and_never_selects() {
        let data = data();
        let ctx = ctx(&data);
        let mut controller = Controller::new();

        assert_eq!(controller.mouse_down(Some((10.0, 10.0))), Outcome::Grabbed);
        assert_eq!(
            controller.mouse_move((50.0, 50.0), true, &data, &ctx),
            Outcome::Panned
        );
        // 40 px of 100 px across a 24-unit extent = 9.6 data units.
        let center = controller.camera().center;
        assert!((center.0 - -9.6).abs() < 1e-4);
        assert!((center.1 - 9.6).abs() < 1e-4);

        assert_eq!(
            controller.mouse_up(Some((50.0, 50.0)), &data, &ctx),
            Outcome::Released
        );
        assert!(!controller.is_dragging());
    }

    #[test]
    fn test_click_selects_nearest_point_within_threshold() {
        let data = data();
        let ctx = ctx(&data);
        let mut controller = centered_on_middle_point();

        // Pixel (50, 50) maps to data (10, 0), exactly on point 1.
        let _ = controller.mouse_down(Some((50.0, 50.0)));
        assert_eq!(
            controller.mouse_up(Some((50.0, 50.0)), &data, &ctx),
            Outcome::Clicked(Some(1))
        );
    }

    #[test]
    fn test_click_outside_threshold_clears_selection() {
        let data = data();
        let ctx = ctx(&data);
        let mut controller = centered_on_middle_point();

        // Pixel (50, 10) maps to data (10, 9.6): 9.6 units from the nearest
        // point, far past the 0.72-unit threshold.
        let _ = controller.mouse_down(Some((50.0, 10.0)));
        assert_eq!(
            controller.mouse_up(Some((50.0, 10.0)), &data, &ctx),
            Outcome::Clicked(None)
        );
    }

    // Click-vs-drag disambiguation requires the pointer to be still on BOTH
    // axes. A tolerance that only compares one axis would misread this
    // vertical drag as a click.
    #[test]
    fn test_single_axis_return_is_a_drag_not_a_click() {
        let data = data();
        let ctx = ctx(&data);
        let mut controller = centered_on_middle_point();

        let _ = controller.mouse_down(Some((50.0, 50.0)));
        let _ = controller.mouse_move((50.0, 80.0), true, &data, &ctx);
        assert_eq!(
            controller.mouse_up(Some((50.0, 80.0)), &data, &ctx),
            Outcome::Released
        );
    }

    #[test]
    fn test_hover_tracks_nearest_point() {
        let data = data();
        let ctx = ctx(&data);
        let mut controller = centered_on_middle_point();

        assert_eq!(
            controller.mouse_move((50.0, 50.0), true, &data, &ctx),
            Outcome::Hovered
        );
        assert_eq!(controller.hovering(), Some(1));

        // Same hover target again: no change to report.
        assert_eq!(
            controller.mouse_move((51.0, 50.0), true, &data, &ctx),
            Outcome::Ignored
        );

        // Far from every point: hover clears.
        assert_eq!(
            controller.mouse_move((50.0, 10.0), true, &data, &ctx),
            Outcome::Hovered
        );
        assert_eq!(controller.hovering(), None);
    }

    #[test]
    fn test_moves_outside_bounds_track_position_but_change_nothing() {
        let data = data();
        let ctx = ctx(&data);
        let mut controller = centered_on_middle_point();

        let _ = controller.mouse_move((50.0, 50.0), true, &data, &ctx);
        assert_eq!(controller.hovering(), Some(1));

        assert_eq!(
            controller.mouse_move((150.0, 150.0), false, &data, &ctx),
            Outcome::Ignored
        );
        // Hover is untouched by the outside move.
        assert_eq!(controller.hovering(), Some(1));
        assert_eq!(controller.cursor, (150.0, 150.0));
    }

    #[test]
    fn test_release_outside_bounds_ends_drag_without_selection() {
        let data = data();
        let ctx = ctx(&data);
        let mut controller = Controller::new();

        let _ = controller.mouse_down(Some((50.0, 50.0)));
        assert_eq!(controller.mouse_up(None, &data, &ctx), Outcome::Released);
        assert!(!controller.is_dragging());
    }

    #[test]
    fn test_zoom_stays_clamped_for_any_wheel_sequence() {
        let data = data();
        let ctx = ctx(&data);
        let mut controller = Controller::new();

        for lines in [3.0, -1.0, 40.0, 40.0, -0.25, 100.0] {
            let _ = controller.wheel(lines, true, &ctx);
            let zoom = controller.camera().zoom;
            assert!((MIN_ZOOM..=MAX_ZOOM).contains(&zoom));
        }

        for _ in 0..100 {
            let _ = controller.wheel(-50.0, true, &ctx);
        }
        assert_eq!(controller.camera().zoom, MIN_ZOOM);

        // Clamped at the floor: another wheel-down reports no change.
        assert_eq!(controller.wheel(-1.0, true, &ctx), Outcome::Ignored);
    }

    #[test]
    fn test_wheel_outside_bounds_is_ignored() {
        let data = data();
        let ctx = ctx(&data);
        let mut controller = Controller::new();

        assert_eq!(controller.wheel(2.0, false, &ctx), Outcome::Ignored);
        assert_eq!(controller.camera().zoom, 1.0);
    }
}

//! Shader widget integration: event routing and the per-frame primitive.

use crate::camera::Camera;
use crate::controller::{Controller, Outcome};
use crate::gpu_types::{HighlightInstance, PointInstance, Uniforms};
use crate::pipeline::Pipeline;
use crate::scatter::Scatter;

use iced::mouse::{self, Cursor};
use iced::wgpu;
use iced::widget::shader::{self, Viewport};
use iced::{Color, Event, Point, Rectangle};

use std::sync::Arc;
use tracing::debug;

/// State persisted across frames in iced's widget tree: the interaction
/// controller, keyed to the dataset revision it was built against. A new
/// dataset resets the camera, cancels any drag, and clears the hover.
pub struct ScatterState {
    revision: Option<u64>,
    controller: Controller,
}

impl Default for ScatterState {
    fn default() -> Self {
        Self {
            revision: None,
            controller: Controller::new(),
        }
    }
}

/// Everything one frame needs on the GPU: the (shared) instance slice, the
/// camera uniforms, and the hover/selection overlay instances.
#[derive(Debug)]
pub struct ScatterPrimitive {
    instances: Arc<[PointInstance]>,
    revision: u64,
    uniforms: Uniforms,
    highlights: Vec<HighlightInstance>,
}

impl shader::Primitive for ScatterPrimitive {
    type Pipeline = Pipeline;

    fn prepare(
        &self,
        pipeline: &mut Self::Pipeline,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        _bounds: &Rectangle,
        _viewport: &Viewport,
    ) {
        pipeline.upload(
            device,
            queue,
            &self.uniforms,
            self.revision,
            &self.instances,
            &self.highlights,
        );
    }

    fn draw(&self, pipeline: &Self::Pipeline, render_pass: &mut wgpu::RenderPass<'_>) -> bool {
        pipeline.render(render_pass)
    }
}

impl shader::Pipeline for Pipeline {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        Pipeline::new(device, queue, format)
    }
}

fn rgba(color: Color) -> [f32; 4] {
    [color.r, color.g, color.b, color.a]
}

fn relative(position: Point, bounds: Rectangle) -> (f32, f32) {
    (position.x - bounds.x, position.y - bounds.y)
}

impl<Message: Clone> shader::Program<Message> for Scatter<'_, Message> {
    type State = ScatterState;
    type Primitive = ScatterPrimitive;

    fn update(
        &self,
        state: &mut Self::State,
        event: &Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> Option<shader::Action<Message>> {
        if state.revision != Some(self.data.revision()) {
            state.revision = Some(self.data.revision());
            state.controller = Controller::new();
        }

        let ctx = self.context(bounds);

        let outcome = match event {
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) => {
                let pos = cursor.position_in(bounds).map(|p| (p.x, p.y));
                state.controller.mouse_down(pos)
            }
            Event::Mouse(mouse::Event::CursorMoved { position }) => state.controller.mouse_move(
                relative(*position, bounds),
                bounds.contains(*position),
                self.data,
                &ctx,
            ),
            Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
                let pos = cursor.position_in(bounds).map(|p| (p.x, p.y));
                state.controller.mouse_up(pos, self.data, &ctx)
            }
            Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                let lines = match delta {
                    mouse::ScrollDelta::Lines { y, .. } => *y,
                    // One browser wheel notch is ~100 px.
                    mouse::ScrollDelta::Pixels { y, .. } => *y / 100.0,
                };
                state.controller.wheel(lines, cursor.is_over(bounds), &ctx)
            }
            _ => Outcome::Ignored,
        };

        match outcome {
            Outcome::Ignored => None,
            Outcome::Hovered => Some(shader::Action::request_redraw()),
            Outcome::Grabbed | Outcome::Released => Some(shader::Action::capture()),
            Outcome::Panned | Outcome::Zoomed => {
                Some(shader::Action::request_redraw().and_capture())
            }
            Outcome::Clicked(selection) => {
                if let Some(on_select) = &self.on_select {
                    Some(shader::Action::publish((on_select)(selection)).and_capture())
                } else {
                    Some(shader::Action::capture())
                }
            }
        }
    }

    fn draw(&self, state: &Self::State, _cursor: Cursor, bounds: Rectangle) -> Self::Primitive {
        // Until the first event after a dataset swap, the stored controller
        // may belong to the previous dataset; render with a fresh camera.
        let (camera, hovering) = if state.revision == Some(self.data.revision()) {
            (state.controller.camera(), state.controller.hovering())
        } else {
            (Camera::default(), None)
        };

        let extent = self.data.bounds().extent(bounds.width, bounds.height);
        let uniforms = Uniforms {
            extent: [extent.0, extent.1],
            center: [camera.center.0, camera.center.1],
            viewport_size: [bounds.width, bounds.height],
            zoom: camera.zoom,
            marker_radius: self.marker.size,
            marker_color: rgba(self.marker.color),
        };

        let mut highlights = Vec::with_capacity(2);
        if let Some(index) = hovering {
            if let Some((x, y)) = self.data.position(index) {
                highlights.push(HighlightInstance {
                    position: [x, y],
                    color: rgba(self.marker.hover_color),
                });
            }
        }
        if let Some(index) = self.selected {
            match self.data.position(index) {
                Some((x, y)) => highlights.push(HighlightInstance {
                    position: [x, y],
                    color: rgba(self.marker.selected_color),
                }),
                // Controlled selection can outlive a shrinking dataset.
                None => debug!(index, "selected index out of range, not drawn"),
            }
        }

        ScatterPrimitive {
            instances: self.data.instances(),
            revision: self.data.revision(),
            uniforms,
            highlights,
        }
    }

    fn mouse_interaction(
        &self,
        state: &Self::State,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> mouse::Interaction {
        if state.controller.is_dragging() {
            mouse::Interaction::Grabbing
        } else if cursor.is_over(bounds) {
            mouse::Interaction::Grab
        } else {
            mouse::Interaction::default()
        }
    }
}

//! GPU-accelerated scatter widget for iced.
//!
//! Renders point clouds of up to millions of points with smooth pan/zoom and
//! precise nearest-point picking. Points are drawn as instanced markers with
//! the camera transform applied on the GPU, so panning and zooming never
//! re-upload vertex data; picking goes through a kd-tree rebuilt per dataset.
//!
//! ```no_run
//! use iced_fastscatter::{PointSet, Scatter};
//!
//! #[derive(Clone)]
//! enum Message {
//!     Selected(Option<usize>),
//! }
//!
//! let data = PointSet::new(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.5]);
//! let widget = Scatter::new(&data)
//!     .selected(None)
//!     .on_select(Message::Selected)
//!     .draw();
//! # let _: iced::Element<'_, Message> = widget;
//! ```

pub mod camera;
mod controller;
pub mod gpu_types;
pub mod kdtree;
pub mod pipeline;
pub mod scatter;
pub mod shader;

pub use scatter::{InteractionConfig, MarkerStyle, PointSet, Scatter};

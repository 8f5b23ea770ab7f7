//! Public widget surface: point sets, styling, and the [`Scatter`] widget.

use crate::camera::Bounds;
use crate::controller::Context;
use crate::gpu_types::PointInstance;
use crate::kdtree::{KdTree, Neighbor};
use bon::Builder;
use iced::widget::shader;
use iced::{Color, Element, Length, Rectangle};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

static NEXT_REVISION: AtomicU64 = AtomicU64::new(0);

/// An immutable point cloud: the coordinates in GPU upload order, their
/// bounding box, and the spatial index for picking. Point `i` of the input
/// slices keeps `i` as its stable identity.
///
/// Datasets are replaced wholesale: build a new `PointSet` whenever the
/// coordinates change and hand it to the next [`Scatter`].
pub struct PointSet {
    instances: Arc<[PointInstance]>,
    tree: KdTree,
    bounds: Bounds,
    revision: u64,
}

impl PointSet {
    /// Builds a point set over the common prefix of `x` and `y`. Unequal
    /// lengths are not an error: the extra trailing coordinates are dropped.
    pub fn new(x: &[f32], y: &[f32]) -> Self {
        let len = x.len().min(y.len());
        if x.len() != y.len() {
            warn!(
                x_len = x.len(),
                y_len = y.len(),
                "coordinate slices differ in length, truncating to the shorter"
            );
        }
        let (x, y) = (&x[..len], &y[..len]);

        let instances: Arc<[PointInstance]> = (0..len)
            .map(|i| PointInstance {
                position: [x[i], y[i]],
            })
            .collect();
        let tree = KdTree::build(x, y);
        let bounds = Bounds::of(x, y);
        let revision = NEXT_REVISION.fetch_add(1, Ordering::Relaxed);
        debug!(points = len, revision, "point set built");

        Self {
            instances,
            tree,
            bounds,
            revision,
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Data-space position of point `index`, if it exists.
    pub fn position(&self, index: usize) -> Option<(f32, f32)> {
        self.instances
            .get(index)
            .map(|p| (p.position[0], p.position[1]))
    }

    /// The `k` points closest to `(x, y)`, ascending by distance.
    pub fn nearest(&self, x: f32, y: f32, k: usize) -> Vec<Neighbor> {
        self.tree.nearest(x, y, k)
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn instances(&self) -> Arc<[PointInstance]> {
        self.instances.clone()
    }
}

/// Visual style shared by every point marker.
#[derive(Debug, Clone, Copy, PartialEq, Builder)]
pub struct MarkerStyle {
    /// Marker radius in pixels; also scales the hover threshold.
    #[builder(default = 3.0)]
    pub size: f32,
    #[builder(default = Color::from_rgb(0.0, 0.5, 0.0))]
    pub color: Color,
    /// Indicator drawn over the point under the pointer.
    #[builder(default = Color::from_rgb(0.8, 0.1, 0.1))]
    pub hover_color: Color,
    /// Indicator drawn over the externally-selected point.
    #[builder(default = Color::from_rgb(0.0, 0.7, 0.7))]
    pub selected_color: Color,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Which gestures are live and how fast the wheel zooms.
#[derive(Debug, Clone, Copy, PartialEq, Builder)]
pub struct InteractionConfig {
    #[builder(default = true)]
    pub pan: bool,
    #[builder(default = true)]
    pub zoom: bool,
    /// Zoom change per wheel line, as a fraction of the current zoom.
    #[builder(default = 1.0 / 3.0)]
    pub zoom_speed: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// GPU-accelerated scatter widget: renders a [`PointSet`] as uniformly
/// styled markers with pan (drag), zoom (wheel), hover picking, and
/// click-to-select.
///
/// Selection is controlled: the widget renders `selected` and reports clicks
/// through `on_select`, but never owns the selected index itself.
pub struct Scatter<'a, Message> {
    pub(crate) data: &'a PointSet,
    pub(crate) marker: MarkerStyle,
    pub(crate) interaction: InteractionConfig,
    pub(crate) selected: Option<usize>,
    pub(crate) on_select: Option<Box<dyn Fn(Option<usize>) -> Message + 'a>>,
}

impl<'a, Message> Scatter<'a, Message> {
    pub fn new(data: &'a PointSet) -> Self {
        Self {
            data,
            marker: MarkerStyle::default(),
            interaction: InteractionConfig::default(),
            selected: None,
            on_select: None,
        }
    }

    pub fn marker(mut self, marker: MarkerStyle) -> Self {
        self.marker = marker;
        self
    }

    pub fn interaction(mut self, interaction: InteractionConfig) -> Self {
        self.interaction = interaction;
        self
    }

    /// Externally-owned selection, rendered as an indicator marker.
    pub fn selected(mut self, selected: Option<usize>) -> Self {
        self.selected = selected;
        self
    }

    /// Message produced once per completed click gesture, with the index of
    /// the point under the click or `None` when the click missed.
    pub fn on_select(mut self, on_select: impl Fn(Option<usize>) -> Message + 'a) -> Self {
        self.on_select = Some(Box::new(on_select));
        self
    }

    /// Builds the widget element using GPU shaders.
    pub fn draw(self) -> Element<'a, Message>
    where
        Message: Clone + 'a,
    {
        shader(self).width(Length::Fill).height(Length::Fill).into()
    }

    pub(crate) fn context(&self, bounds: Rectangle) -> Context {
        Context {
            extent: self.data.bounds().extent(bounds.width, bounds.height),
            size: (bounds.width, bounds.height),
            marker_radius: self.marker.size,
            pan: self.interaction.pan,
            zoom: self.interaction.zoom,
            zoom_speed: self.interaction.zoom_speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unequal_lengths_truncate_to_shorter() {
        let data = PointSet::new(&[0.0, 1.0, 2.0, 3.0, 4.0], &[0.0, 1.0, 2.0]);
        assert_eq!(data.len(), 3);
        assert_eq!(data.position(2), Some((2.0, 2.0)));
        assert_eq!(data.position(3), None);
    }

    #[test]
    fn test_replacing_with_shorter_dataset_queries_safely() {
        let _old = PointSet::new(&[0.0, 10.0, 20.0, 30.0], &[0.0, 0.0, 0.0, 0.0]);
        let new = PointSet::new(&[0.0, 10.0], &[0.0, 0.0]);

        let hits = new.nearest(25.0, 0.0, 4);
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|n| n.index < new.len()));
    }

    #[test]
    fn test_revisions_are_distinct_per_build() {
        let a = PointSet::new(&[0.0], &[0.0]);
        let b = PointSet::new(&[0.0], &[0.0]);
        assert_ne!(a.revision(), b.revision());
    }

    #[test]
    fn test_empty_point_set() {
        let data = PointSet::new(&[], &[]);
        assert!(data.is_empty());
        assert!(data.nearest(0.0, 0.0, 1).is_empty());
        assert_eq!(data.position(0), None);
    }
}

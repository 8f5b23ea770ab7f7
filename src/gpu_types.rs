//! GPU-compatible data types for the scatter pipeline.

use bytemuck::{Pod, Zeroable};

/// One point marker instance: the raw data-space position. The full
/// data-to-clip transform runs in the vertex stage from [`Uniforms`], so the
/// instance buffer only changes when the dataset does.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct PointInstance {
    pub position: [f32; 2],
}

/// Overlay marker instance for the hover/selection indicators, colored per
/// instance.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct HighlightInstance {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

/// Uniform data passed to the shaders every frame.
///
/// Field order is layout-matched to the WGSL uniform block: three vec2s, two
/// scalars, then a 16-byte-aligned vec4 at offset 32.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Uniforms {
    /// Full data extent `(data_width, data_height)` at zoom 1.
    pub extent: [f32; 2],
    /// Camera center in data space.
    pub center: [f32; 2],
    /// Surface size in pixels.
    pub viewport_size: [f32; 2],
    pub zoom: f32,
    /// Marker radius in pixels.
    pub marker_radius: f32,
    /// RGBA color shared by all point markers.
    pub marker_color: [f32; 4],
}

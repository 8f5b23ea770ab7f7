//! GPU rendering pipeline for the scatter widget.

use crate::gpu_types::{HighlightInstance, PointInstance, Uniforms};
use iced::wgpu;
use tracing::{error, trace};

/// A dynamically resizable GPU buffer.
struct DynamicBuffer {
    buffer: wgpu::Buffer,
    capacity: u64,
    usage: wgpu::BufferUsages,
    label: &'static str,
}

impl DynamicBuffer {
    fn new(
        device: &wgpu::Device,
        label: &'static str,
        initial_capacity: u64,
        usage: wgpu::BufferUsages,
    ) -> Self {
        let usage = usage | wgpu::BufferUsages::COPY_DST;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: initial_capacity,
            usage,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            capacity: initial_capacity,
            usage,
            label,
        }
    }

    /// Ensure the buffer can hold at least `size` bytes, recreating if needed.
    fn ensure_capacity(&mut self, device: &wgpu::Device, size: u64) {
        if size > self.capacity {
            // Grow by 50% or to required size, whichever is larger
            let new_capacity = (self.capacity * 3 / 2).max(size);
            self.buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(self.label),
                size: new_capacity,
                usage: self.usage,
                mapped_at_creation: false,
            });
            self.capacity = new_capacity;
        }
    }
}

/// The GPU rendering pipeline for the scatter widget. A pipeline that fails
/// validation at creation disables drawing for the session instead of
/// panicking mid-frame.
pub struct Pipeline {
    inner: Option<Inner>,
}

struct Inner {
    marker_pipeline: wgpu::RenderPipeline,
    highlight_pipeline: wgpu::RenderPipeline,
    point_buffer: DynamicBuffer,
    highlight_buffer: DynamicBuffer,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    uploaded_revision: Option<u64>,
    point_count: u32,
    highlight_count: u32,
}

impl Pipeline {
    pub fn new(device: &wgpu::Device, _queue: &wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        // wgpu reports shader compile and pipeline link failures through
        // error scopes, not return values; catch them here so a broken
        // module degrades to a disabled renderer.
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let inner = Self::build(device, format);

        match pollster::block_on(device.pop_error_scope()) {
            None => Self { inner: Some(inner) },
            Some(err) => {
                error!("scatter pipeline failed validation, rendering disabled: {err}");
                Self { inner: None }
            }
        }
    }

    fn build(device: &wgpu::Device, format: wgpu::TextureFormat) -> Inner {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scatter_shader"),
            source: wgpu::ShaderSource::Wgsl(std::borrow::Cow::Borrowed(include_str!(
                "shaders/scatter.wgsl"
            ))),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scatter_uniforms"),
            size: std::mem::size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scatter_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scatter_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scatter_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        // Point vertex buffer layout (per-instance data)
        let point_vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: 0,
                shader_location: 0,
            }],
        };

        // Highlight layout adds a per-instance color after the position.
        let highlight_vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<HighlightInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x2,
                    offset: 0,
                    shader_location: 0,
                },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x4,
                    offset: 8,
                    shader_location: 1,
                },
            ],
        };

        // Blend state for transparency
        let blend_state = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
        };

        let marker_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("scatter_marker_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_marker"),
                buffers: &[point_vertex_layout],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_marker"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(blend_state),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let highlight_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("scatter_highlight_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_highlight"),
                buffers: &[highlight_vertex_layout],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_marker"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(blend_state),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let point_buffer = DynamicBuffer::new(
            device,
            "scatter_point_buffer",
            1024 * std::mem::size_of::<PointInstance>() as u64,
            wgpu::BufferUsages::VERTEX,
        );

        let highlight_buffer = DynamicBuffer::new(
            device,
            "scatter_highlight_buffer",
            2 * std::mem::size_of::<HighlightInstance>() as u64,
            wgpu::BufferUsages::VERTEX,
        );

        Inner {
            marker_pipeline,
            highlight_pipeline,
            point_buffer,
            highlight_buffer,
            uniform_buffer,
            bind_group,
            uploaded_revision: None,
            point_count: 0,
            highlight_count: 0,
        }
    }

    /// Push the per-frame uniforms and (re)upload instance data. The point
    /// buffer is rewritten only when the dataset revision changed; the
    /// highlight overlay is tiny and rewritten every frame.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        uniforms: &Uniforms,
        revision: u64,
        points: &[PointInstance],
        highlights: &[HighlightInstance],
    ) {
        let Some(inner) = &mut self.inner else {
            return;
        };

        queue.write_buffer(&inner.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        if inner.uploaded_revision != Some(revision) {
            if !points.is_empty() {
                let data = bytemuck::cast_slice(points);
                inner
                    .point_buffer
                    .ensure_capacity(device, data.len() as u64);
                queue.write_buffer(&inner.point_buffer.buffer, 0, data);
            }
            inner.point_count = points.len() as u32;
            inner.uploaded_revision = Some(revision);
            trace!(points = points.len(), revision, "point buffer uploaded");
        }

        if !highlights.is_empty() {
            let data = bytemuck::cast_slice(highlights);
            inner
                .highlight_buffer
                .ensure_capacity(device, data.len() as u64);
            queue.write_buffer(&inner.highlight_buffer.buffer, 0, data);
        }
        inner.highlight_count = highlights.len() as u32;
    }

    /// Draw all point markers, then the hover/selection indicators on top.
    /// Returns whether anything could be drawn at all.
    pub fn render(&self, render_pass: &mut wgpu::RenderPass<'_>) -> bool {
        let Some(inner) = &self.inner else {
            return false;
        };

        if inner.point_count > 0 {
            render_pass.set_pipeline(&inner.marker_pipeline);
            render_pass.set_bind_group(0, &inner.bind_group, &[]);
            render_pass.set_vertex_buffer(0, inner.point_buffer.buffer.slice(..));
            // 6 vertices per quad (2 triangles), one instance per point
            render_pass.draw(0..6, 0..inner.point_count);
        }

        if inner.highlight_count > 0 {
            render_pass.set_pipeline(&inner.highlight_pipeline);
            render_pass.set_bind_group(0, &inner.bind_group, &[]);
            render_pass.set_vertex_buffer(0, inner.highlight_buffer.buffer.slice(..));
            render_pass.draw(0..6, 0..inner.highlight_count);
        }

        true
    }
}

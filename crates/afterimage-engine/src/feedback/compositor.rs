use crate::render::RenderCtx;

use super::blend::BlendFn;

/// Full-screen blend of the current scene render with the previous
/// accumulated frame.
///
/// One pipeline per blend strategy, both sharing a bind group layout and
/// uniform block; pipelines are (re)built lazily when the output format
/// changes. Bind groups are rebuilt per call because the texture views come
/// from the pool and change on resize.
#[derive(Default)]
pub struct FeedbackCompositor {
    pipeline_format: Option<wgpu::TextureFormat>,
    decay_pipeline: Option<wgpu::RenderPipeline>,
    flood_pipeline: Option<wgpu::RenderPipeline>,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    sampler: Option<wgpu::Sampler>,
    uniform_buffer: Option<wgpu::Buffer>,
}

impl FeedbackCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blends `source` and `previous` into `destination`.
    ///
    /// `destination` must be a different physical target from both inputs;
    /// the sequencer's schedule guarantees this by construction.
    #[allow(clippy::too_many_arguments)]
    pub fn composite(
        &mut self,
        ctx: &RenderCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        source: &wgpu::TextureView,
        previous: &wgpu::TextureView,
        destination: &wgpu::TextureView,
        format: wgpu::TextureFormat,
        resolution: (u32, u32),
        time: f32,
        blend: BlendFn,
    ) {
        self.ensure_pipelines(ctx, format);

        let (Some(bgl), Some(sampler), Some(ubo)) = (
            self.bind_group_layout.as_ref(),
            self.sampler.as_ref(),
            self.uniform_buffer.as_ref(),
        ) else {
            return;
        };

        ctx.queue
            .write_buffer(ubo, 0, bytemuck::bytes_of(&blend.to_uniforms(resolution, time)));

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("afterimage composite bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(source),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(previous),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: ubo.as_entire_binding(),
                },
            ],
        });

        let pipeline = match blend {
            BlendFn::Decay(_) => self.decay_pipeline.as_ref(),
            BlendFn::Flood(_) => self.flood_pipeline.as_ref(),
        };
        let Some(pipeline) = pipeline else { return };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("afterimage composite pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: destination,
                resolve_target: None,
                ops: wgpu::Operations {
                    // The full-screen triangle covers every pixel; the clear
                    // only matters for the very first pass on a fresh target.
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.draw(0..3, 0..1);
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn ensure_pipelines(&mut self, ctx: &RenderCtx<'_>, format: wgpu::TextureFormat) {
        if self.pipeline_format == Some(format)
            && self.decay_pipeline.is_some()
            && self.flood_pipeline.is_some()
        {
            return;
        }

        let bgl = ctx
            .device
            .create_bind_group_layout(&composite_bgl_descriptor("afterimage composite bgl"));

        let pipeline_layout =
            ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("afterimage composite pipeline layout"),
                bind_group_layouts: &[&bgl],
                immediate_size: 0,
            });

        let decay = build_fullscreen_pipeline(
            ctx.device,
            &pipeline_layout,
            format,
            "afterimage composite decay",
            include_str!("shaders/decay.wgsl"),
        );
        let flood = build_fullscreen_pipeline(
            ctx.device,
            &pipeline_layout,
            format,
            "afterimage composite flood",
            include_str!("shaders/flood.wgsl"),
        );

        let sampler = self.sampler.take().unwrap_or_else(|| {
            ctx.device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("afterimage composite sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                ..Default::default()
            })
        });

        let ubo = self.uniform_buffer.take().unwrap_or_else(|| {
            ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("afterimage composite ubo"),
                size: std::mem::size_of::<super::blend::CompositeUniforms>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        self.pipeline_format = Some(format);
        self.decay_pipeline = Some(decay);
        self.flood_pipeline = Some(flood);
        self.bind_group_layout = Some(bgl);
        self.sampler = Some(sampler);
        self.uniform_buffer = Some(ubo);
    }
}

/// Bind group layout shared by the composite shaders:
/// source texture, previous texture, sampler, uniforms.
fn composite_bgl_descriptor(label: &str) -> wgpu::BindGroupLayoutDescriptor<'_> {
    const ENTRIES: [wgpu::BindGroupLayoutEntry; 4] = [
        wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: 3,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        },
    ];

    wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &ENTRIES,
    }
}

pub(crate) fn build_fullscreen_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
    label: &str,
    wgsl: &str,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(wgsl.into()),
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

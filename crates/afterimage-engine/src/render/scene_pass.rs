use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::scene::{Camera, NodeId, Scene, Vertex};

use super::RenderCtx;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Dynamic-offset stride for per-node uniforms; matches the default
/// `min_uniform_buffer_offset_alignment`.
const NODE_UBO_STRIDE: u64 = 256;

/// Renders the 3D scene into an offscreen color target.
///
/// The pass binds the destination as its color output, clears it, draws every
/// visible node with depth testing, and releases the binding when the render
/// pass drops — including on early return, so a failed draw cannot leave the
/// target bound.
///
/// Node meshes are treated as immutable: vertex/index buffers are uploaded on
/// first sight of a node and cached by id.
#[derive(Default)]
pub struct ScenePass {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    bind_group: Option<wgpu::BindGroup>,
    camera_ubo: Option<wgpu::Buffer>,
    node_ubo: Option<wgpu::Buffer>,
    node_capacity: usize,

    depth: Option<DepthBuffer>,

    meshes: HashMap<NodeId, GpuMesh>,
}

struct DepthBuffer {
    size: (u32, u32),
    view: wgpu::TextureView,
}

struct GpuMesh {
    vbo: wgpu::Buffer,
    ibo: wgpu::Buffer,
    index_count: u32,
}

impl ScenePass {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops cached per-node mesh buffers.
    ///
    /// Call when the scene is rebuilt from scratch; resize does not require
    /// it (meshes are size-independent).
    pub fn clear_mesh_cache(&mut self) {
        self.meshes.clear();
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        destination: &wgpu::TextureView,
        format: wgpu::TextureFormat,
        size: (u32, u32),
        scene: &Scene,
        camera: &Camera,
        clear: wgpu::Color,
    ) {
        self.ensure_pipeline(ctx, format);
        self.ensure_depth(ctx, size);
        self.ensure_node_capacity(ctx, scene.len().max(1));

        let aspect = size.0.max(1) as f32 / size.1.max(1) as f32;

        if let Some(ubo) = self.camera_ubo.as_ref() {
            ctx.queue.write_buffer(
                ubo,
                0,
                bytemuck::bytes_of(&CameraUniform {
                    view_proj: camera.view_proj(aspect).to_cols_array_2d(),
                }),
            );
        }

        // Upload per-node transforms at their dynamic offsets and make sure
        // every mesh is resident.
        let mut draws: Vec<(NodeId, u32)> = Vec::new();
        for (id, node) in scene.iter() {
            if !node.visible {
                continue;
            }

            let slot = draws.len() as u32;
            if let Some(ubo) = self.node_ubo.as_ref() {
                ctx.queue.write_buffer(
                    ubo,
                    u64::from(slot) * NODE_UBO_STRIDE,
                    bytemuck::bytes_of(&NodeUniform {
                        model: node.model().to_cols_array_2d(),
                        color: node.color,
                    }),
                );
            }

            self.meshes.entry(id).or_insert_with(|| GpuMesh {
                vbo: ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("afterimage scene mesh vbo"),
                    contents: bytemuck::cast_slice(&node.mesh.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
                ibo: ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("afterimage scene mesh ibo"),
                    contents: bytemuck::cast_slice(&node.mesh.indices),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                index_count: node.mesh.indices.len() as u32,
            });

            draws.push((id, slot));
        }

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(bind_group) = self.bind_group.as_ref() else { return };
        let Some(depth) = self.depth.as_ref() else { return };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("afterimage scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: destination,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);

        for (id, slot) in draws {
            let Some(mesh) = self.meshes.get(&id) else { continue };

            let offset = (u64::from(slot) * NODE_UBO_STRIDE) as u32;
            rpass.set_bind_group(0, bind_group, &[offset]);
            rpass.set_vertex_buffer(0, mesh.vbo.slice(..));
            rpass.set_index_buffer(mesh.ibo.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>, format: wgpu::TextureFormat) {
        if self.pipeline_format == Some(format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("afterimage scene shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/scene.wgsl").into()),
        });

        let bind_group_layout =
            ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("afterimage scene bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: Some(
                                std::num::NonZeroU64::new(
                                    std::mem::size_of::<CameraUniform>() as u64,
                                )
                                .unwrap(),
                            ),
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: true,
                            min_binding_size: Some(
                                std::num::NonZeroU64::new(
                                    std::mem::size_of::<NodeUniform>() as u64,
                                )
                                .unwrap(),
                            ),
                        },
                        count: None,
                    },
                ],
            });

        let pipeline_layout =
            ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("afterimage scene pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                immediate_size: 0,
            });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("afterimage scene pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[Vertex::layout()],
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
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        self.pipeline_format = Some(format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);
        self.bind_group = None;
        self.camera_ubo = None;
        self.node_ubo = None;
        self.node_capacity = 0;
    }

    fn ensure_depth(&mut self, ctx: &RenderCtx<'_>, size: (u32, u32)) {
        let size = (size.0.max(1), size.1.max(1));
        if self.depth.as_ref().is_some_and(|d| d.size == size) {
            return;
        }

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("afterimage scene depth"),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        self.depth = Some(DepthBuffer {
            size,
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
        });
    }

    fn ensure_node_capacity(&mut self, ctx: &RenderCtx<'_>, required: usize) {
        if required <= self.node_capacity && self.node_ubo.is_some() && self.bind_group.is_some() {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };

        let new_cap = required.next_power_of_two().max(16);

        let camera_ubo = self.camera_ubo.take().unwrap_or_else(|| {
            ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("afterimage scene camera ubo"),
                size: std::mem::size_of::<CameraUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        let node_ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("afterimage scene node ubo"),
            size: new_cap as u64 * NODE_UBO_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("afterimage scene bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &node_ubo,
                        offset: 0,
                        size: std::num::NonZeroU64::new(
                            std::mem::size_of::<NodeUniform>() as u64
                        ),
                    }),
                },
            ],
        });

        self.camera_ubo = Some(camera_ubo);
        self.node_ubo = Some(node_ubo);
        self.bind_group = Some(bind_group);
        self.node_capacity = new_cap;
    }
}

// ── GPU types ─────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct NodeUniform {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

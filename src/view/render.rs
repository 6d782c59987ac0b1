use std::collections::HashMap;
use std::num::NonZeroU64;

use image::RgbaImage;
use wgpu::util::DeviceExt;
use wgpu::*;

use crate::controller::FrameSink;
use crate::model::{Camera, EnvironmentMap, Mesh, MeshBuffer, MeshId, Scene, Vertex};
use crate::view::uniforms::{aligned_stride, GlobalsUniform, ModelUniform, SkyUniform, WaterUniform};
use crate::view::{GpuContext, RenderError};

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
const ENV_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

const SKY_SHADER: &str = concat!(include_str!("shaders/common.wgsl"), include_str!("shaders/sky.wgsl"));
const WATER_SHADER: &str = concat!(include_str!("shaders/common.wgsl"), include_str!("shaders/water.wgsl"));
const MESH_SHADER: &str = concat!(include_str!("shaders/common.wgsl"), include_str!("shaders/mesh.wgsl"));

pub fn create_depth_texture(device: &Device, width: u32, height: u32) -> (Texture, TextureView) {
    let depth_texture = device.create_texture(&TextureDescriptor {
        label: Some("depth_texture"),
        size: Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

fn uniform_entry(binding: u32, visibility: ShaderStages, dynamic: Option<u64>) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: dynamic.is_some(),
            min_binding_size: dynamic.and_then(NonZeroU64::new),
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::FRAGMENT,
        ty: BindingType::Texture {
            sample_type: TextureSampleType::Float { filterable: true },
            view_dimension: TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::FRAGMENT,
        ty: BindingType::Sampler(SamplerBindingType::Filtering),
        count: None,
    }
}

fn uniform_buffer(device: &Device, label: &str, size: u64) -> Buffer {
    device.create_buffer(&BufferDescriptor {
        label: Some(label),
        size,
        usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn rgba_texture(device: &Device, queue: &Queue, label: &str, width: u32, height: u32, pixels: &[u8]) -> Texture {
    device.create_texture_with_data(
        queue,
        &TextureDescriptor {
            label: Some(label),
            size: Extent3d { width, height, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: ENV_FORMAT,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        },
        util::TextureDataOrder::LayerMajor,
        pixels,
    )
}

struct PipelineDesc<'a> {
    label: &'a str,
    source: &'a str,
    layouts: &'a [&'a BindGroupLayout],
    with_vertices: bool,
    blend: BlendState,
    depth_write: bool,
    depth_compare: CompareFunction,
}

fn create_pipeline(device: &Device, format: TextureFormat, desc: PipelineDesc) -> RenderPipeline {
    let shader = device.create_shader_module(ShaderModuleDescriptor {
        label: Some(desc.label),
        source: ShaderSource::Wgsl(desc.source.into()),
    });

    let layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
        label: Some(desc.label),
        bind_group_layouts: desc.layouts,
        push_constant_ranges: &[],
    });

    let vertex_layouts = [Vertex::layout()];
    let buffers: &[VertexBufferLayout] = if desc.with_vertices { &vertex_layouts } else { &[] };

    device.create_render_pipeline(&RenderPipelineDescriptor {
        label: Some(desc.label),
        layout: Some(&layout),
        vertex: VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(ColorTargetState { format, blend: Some(desc.blend), write_mask: ColorWrites::ALL })],
            compilation_options: Default::default(),
        }),
        primitive: PrimitiveState {
            topology: PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: FrontFace::Ccw,
            // imported models mix winding orders and negative scales
            cull_mode: None,
            polygon_mode: PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: desc.depth_write,
            depth_compare: desc.depth_compare,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        }),
        multisample: MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    })
}

/// egui output waiting to be drawn over the next frame.
pub struct UiFrame {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

/// GPU side of the viewer: pipelines, per-mesh buffers and the egui overlay.
pub struct RenderState {
    gpu: GpuContext,
    depth_view: TextureView,

    globals_buffer: Buffer,
    sky_buffer: Buffer,
    globals_layout: BindGroupLayout,
    globals_bind_group: BindGroup,
    env_sampler: Sampler,
    env_texture: Texture,
    env_revision: Option<u64>,

    sky_pipeline: RenderPipeline,
    water_pipeline: RenderPipeline,
    mesh_pipeline: RenderPipeline,

    water_mesh: MeshBuffer,
    water_buffer: Buffer,
    water_bind_group: BindGroup,

    model_layout: BindGroupLayout,
    model_buffer: Buffer,
    model_bind_group: BindGroup,
    model_stride: u64,
    model_capacity: u64,

    meshes: HashMap<MeshId, MeshBuffer>,

    egui_renderer: egui_wgpu::Renderer,
    ui_frame: Option<UiFrame>,
}

impl RenderState {
    pub fn new(gpu: GpuContext, water_normals: &RgbaImage, water_extent: f32) -> Self {
        let device = gpu.device.clone();
        let queue = gpu.queue.clone();
        let format = gpu.format;
        let (_, depth_view) = create_depth_texture(&device, gpu.config.width, gpu.config.height);

        // Group 0: camera, lights, environment and sky
        let globals_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("globals_layout"),
            entries: &[
                uniform_entry(0, ShaderStages::VERTEX | ShaderStages::FRAGMENT, None),
                texture_entry(1),
                sampler_entry(2),
                uniform_entry(3, ShaderStages::FRAGMENT, None),
            ],
        });
        let globals_buffer = uniform_buffer(&device, "globals_buffer", std::mem::size_of::<GlobalsUniform>() as u64);
        let sky_buffer = uniform_buffer(&device, "sky_buffer", std::mem::size_of::<SkyUniform>() as u64);
        let env_sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("env_sampler"),
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });
        let env_texture = rgba_texture(&device, &queue, "env_texture", 1, 1, &[0, 0, 0, 255]);
        let globals_bind_group =
            Self::globals_bind_group(&device, &globals_layout, &globals_buffer, &env_texture, &env_sampler, &sky_buffer);

        // Group 1 for the water
        let water_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("water_layout"),
            entries: &[
                uniform_entry(0, ShaderStages::VERTEX | ShaderStages::FRAGMENT, None),
                texture_entry(1),
                sampler_entry(2),
            ],
        });
        let water_buffer = uniform_buffer(&device, "water_buffer", std::mem::size_of::<WaterUniform>() as u64);
        let normals_texture = rgba_texture(
            &device,
            &queue,
            "water_normals",
            water_normals.width(),
            water_normals.height(),
            water_normals.as_raw(),
        );
        let normals_view = normals_texture.create_view(&TextureViewDescriptor::default());
        let normals_sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("water_normals_sampler"),
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });
        let water_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("water_bind_group"),
            layout: &water_layout,
            entries: &[
                BindGroupEntry { binding: 0, resource: water_buffer.as_entire_binding() },
                BindGroupEntry { binding: 1, resource: BindingResource::TextureView(&normals_view) },
                BindGroupEntry { binding: 2, resource: BindingResource::Sampler(&normals_sampler) },
            ],
        });
        let water_mesh = Mesh::plane_xz(water_extent).upload(&device);

        // Group 1 for models, one dynamic slot per draw
        let model_size = std::mem::size_of::<ModelUniform>() as u64;
        let model_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("model_layout"),
            entries: &[uniform_entry(0, ShaderStages::VERTEX | ShaderStages::FRAGMENT, Some(model_size))],
        });
        let model_stride = aligned_stride(model_size, device.limits().min_uniform_buffer_offset_alignment as u64);
        let model_capacity = 64;
        let (model_buffer, model_bind_group) =
            Self::model_resources(&device, &model_layout, model_stride, model_capacity);

        let sky_pipeline = create_pipeline(
            &device,
            format,
            PipelineDesc {
                label: "sky_pipeline",
                source: SKY_SHADER,
                layouts: &[&globals_layout],
                with_vertices: false,
                blend: BlendState::REPLACE,
                depth_write: false,
                depth_compare: CompareFunction::LessEqual,
            },
        );
        let water_pipeline = create_pipeline(
            &device,
            format,
            PipelineDesc {
                label: "water_pipeline",
                source: WATER_SHADER,
                layouts: &[&globals_layout, &water_layout],
                with_vertices: true,
                blend: BlendState::ALPHA_BLENDING,
                depth_write: true,
                depth_compare: CompareFunction::Less,
            },
        );
        let mesh_pipeline = create_pipeline(
            &device,
            format,
            PipelineDesc {
                label: "mesh_pipeline",
                source: MESH_SHADER,
                layouts: &[&globals_layout, &model_layout],
                with_vertices: true,
                blend: BlendState::ALPHA_BLENDING,
                depth_write: true,
                depth_compare: CompareFunction::Less,
            },
        );

        let egui_renderer = egui_wgpu::Renderer::new(&device, format, egui_wgpu::RendererOptions::default());

        Self {
            gpu,
            depth_view,
            globals_buffer,
            sky_buffer,
            globals_layout,
            globals_bind_group,
            env_sampler,
            env_texture,
            env_revision: None,
            sky_pipeline,
            water_pipeline,
            mesh_pipeline,
            water_mesh,
            water_buffer,
            water_bind_group,
            model_layout,
            model_buffer,
            model_bind_group,
            model_stride,
            model_capacity,
            meshes: HashMap::new(),
            egui_renderer,
            ui_frame: None,
        }
    }

    fn globals_bind_group(
        device: &Device,
        layout: &BindGroupLayout,
        globals: &Buffer,
        env_texture: &Texture,
        env_sampler: &Sampler,
        sky: &Buffer,
    ) -> BindGroup {
        let env_view = env_texture.create_view(&TextureViewDescriptor::default());
        device.create_bind_group(&BindGroupDescriptor {
            label: Some("globals_bind_group"),
            layout,
            entries: &[
                BindGroupEntry { binding: 0, resource: globals.as_entire_binding() },
                BindGroupEntry { binding: 1, resource: BindingResource::TextureView(&env_view) },
                BindGroupEntry { binding: 2, resource: BindingResource::Sampler(env_sampler) },
                BindGroupEntry { binding: 3, resource: sky.as_entire_binding() },
            ],
        })
    }

    fn model_resources(device: &Device, layout: &BindGroupLayout, stride: u64, capacity: u64) -> (Buffer, BindGroup) {
        let buffer = uniform_buffer(device, "model_buffer", stride * capacity);
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("model_bind_group"),
            layout,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: BindingResource::Buffer(BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(std::mem::size_of::<ModelUniform>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.gpu.config.width, self.gpu.config.height)
    }

    /// Queue egui output for the next submitted frame.
    pub fn set_ui(&mut self, frame: UiFrame) {
        self.ui_frame = Some(frame);
    }

    /// Re-upload the environment map when its revision moved on.
    fn sync_environment(&mut self, environment: &EnvironmentMap) {
        if self.env_revision == Some(environment.revision) {
            return;
        }
        let pixels = environment.to_rgba8();
        let size = self.env_texture.size();
        if size.width == environment.width && size.height == environment.height {
            self.gpu.queue.write_texture(
                TexelCopyTextureInfo {
                    texture: &self.env_texture,
                    mip_level: 0,
                    origin: Origin3d::ZERO,
                    aspect: TextureAspect::All,
                },
                &pixels,
                TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * environment.width),
                    rows_per_image: Some(environment.height),
                },
                size,
            );
        } else {
            self.env_texture = rgba_texture(
                &self.gpu.device,
                &self.gpu.queue,
                "env_texture",
                environment.width,
                environment.height,
                &pixels,
            );
            self.globals_bind_group = Self::globals_bind_group(
                &self.gpu.device,
                &self.globals_layout,
                &self.globals_buffer,
                &self.env_texture,
                &self.env_sampler,
                &self.sky_buffer,
            );
        }
        self.env_revision = Some(environment.revision);
        tracing::debug!("uploaded environment revision {}", environment.revision);
    }

    fn ensure_model_capacity(&mut self, draws: u64) {
        if draws <= self.model_capacity {
            return;
        }
        let capacity = draws.next_power_of_two();
        let (buffer, bind_group) = Self::model_resources(&self.gpu.device, &self.model_layout, self.model_stride, capacity);
        self.model_buffer = buffer;
        self.model_bind_group = bind_group;
        self.model_capacity = capacity;
        tracing::debug!("grew model uniform buffer to {capacity} slots");
    }

    /// Upload meshes seen for the first time and write one uniform slot per draw.
    /// Returns the mesh of every draw in slot order.
    fn prepare_draws(&mut self, scene: &Scene) -> Vec<MeshId> {
        let mut slots = Vec::new();
        let mut staging: Vec<u8> = Vec::new();

        for item in scene.draw_list() {
            let Some(primitive) = scene.primitive(item.mesh) else {
                continue;
            };
            if primitive.mesh.is_empty() {
                continue;
            }
            self.meshes
                .entry(item.mesh)
                .or_insert_with(|| primitive.mesh.upload(&self.gpu.device));

            let uniform = ModelUniform::new(item.world, primitive.base_color);
            staging.extend_from_slice(bytemuck::bytes_of(&uniform));
            staging.resize(staging.len() + (self.model_stride as usize - std::mem::size_of::<ModelUniform>()), 0);
            slots.push(item.mesh);
        }

        self.ensure_model_capacity(slots.len() as u64);
        if !staging.is_empty() {
            self.gpu.queue.write_buffer(&self.model_buffer, 0, &staging);
        }
        slots
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError> {
        let frame = match self.gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                tracing::debug!("surface lost or outdated, reconfiguring and skipping frame");
                self.gpu.reconfigure();
                return Ok(());
            }
            Err(SurfaceError::Timeout) => {
                tracing::debug!("surface timed out, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(RenderError::Surface(e)),
        };

        if let Some(environment) = &scene.environment {
            self.sync_environment(environment);
        }
        let queue = self.gpu.queue.clone();
        queue.write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&GlobalsUniform::new(scene, camera)));
        queue.write_buffer(&self.sky_buffer, 0, bytemuck::bytes_of(&SkyUniform::new(&scene.sky)));
        queue.write_buffer(&self.water_buffer, 0, bytemuck::bytes_of(&WaterUniform::new(&scene.water)));
        let slots = self.prepare_draws(scene);

        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let device = self.gpu.device.clone();
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor { label: Some("encoder") });

        {
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color::BLACK),
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rp.set_bind_group(0, &self.globals_bind_group, &[]);

            rp.set_pipeline(&self.sky_pipeline);
            rp.draw(0..3, 0..1);

            rp.set_pipeline(&self.mesh_pipeline);
            for (slot, mesh_id) in slots.iter().enumerate() {
                let Some(mesh) = self.meshes.get(mesh_id) else {
                    continue;
                };
                let offset = (slot as u64 * self.model_stride) as DynamicOffset;
                rp.set_bind_group(1, &self.model_bind_group, &[offset]);
                rp.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                rp.set_index_buffer(mesh.index_buffer.slice(..), IndexFormat::Uint32);
                rp.draw_indexed(0..mesh.index_count, 0, 0..1);
            }

            // water last so submerged geometry shows through where it is translucent
            rp.set_pipeline(&self.water_pipeline);
            rp.set_bind_group(1, &self.water_bind_group, &[]);
            rp.set_vertex_buffer(0, self.water_mesh.vertex_buffer.slice(..));
            rp.set_index_buffer(self.water_mesh.index_buffer.slice(..), IndexFormat::Uint32);
            rp.draw_indexed(0..self.water_mesh.index_count, 0, 0..1);
        }

        if let Some(ui) = self.ui_frame.take() {
            self.draw_ui(&mut encoder, &view, ui);
        }

        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn draw_ui(&mut self, encoder: &mut CommandEncoder, view: &TextureView, ui: UiFrame) {
        let device = self.gpu.device.clone();
        let queue = self.gpu.queue.clone();
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gpu.config.width, self.gpu.config.height],
            pixels_per_point: ui.pixels_per_point,
        };

        for (id, image_delta) in &ui.textures_delta.set {
            self.egui_renderer.update_texture(&device, &queue, *id, image_delta);
        }
        self.egui_renderer
            .update_buffers(&device, &queue, encoder, &ui.primitives, &screen_descriptor);

        {
            let egui_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("egui_render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Load,
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.egui_renderer
                .render(&mut egui_pass.forget_lifetime(), &ui.primitives, &screen_descriptor);
        }

        for id in &ui.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

impl FrameSink for RenderState {
    type Error = RenderError;

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || self.size() == (width, height) {
            return;
        }
        self.gpu.resize(width, height);
        let (_, depth_view) = create_depth_texture(&self.gpu.device, width, height);
        self.depth_view = depth_view;
        tracing::debug!("resized surface to {width}x{height}");
    }

    fn submit(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError> {
        self.render(scene, camera)
    }
}

use fnv::FnvHashMap;
use glam::Mat4;
use pano_core::{
    default_marker, default_sphere, MeshData, MeshHandle, PanoError, PanoramaImage, SceneRenderer,
    SceneView, StationId, Vertex,
};
use web_sys as web;
use wgpu::util::DeviceExt;

use crate::constants::{CLEAR_COLOR, MARKER_TINT};

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawUniforms {
    mvp: [[f32; 4]; 4],
    tint: [f32; 4],
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, label: &str, mesh: &MeshData) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }
}

/// One drawable: its own uniforms bound with a texture.
struct DrawBinding {
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct Textured {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// WebGPU renderer for the panorama sphere and its direction markers.
pub struct GpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    bgl: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    sphere_pipeline: wgpu::RenderPipeline,
    marker_pipeline: wgpu::RenderPipeline,
    sphere_mesh: GpuMesh,
    marker_mesh: GpuMesh,
    panorama: Textured,
    sphere_binding: DrawBinding,
    marker_texture: Textured,
    markers: FnvHashMap<MeshHandle, DrawBinding>,
    next_handle: u32,
    clear_color: wgpu::Color,
}

impl GpuRenderer {
    pub async fn new(canvas: &web::HtmlCanvasElement) -> anyhow::Result<Self> {
        let width = canvas.width().max(1);
        let height = canvas.height().max(1);

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow::anyhow!("No WebGPU adapter"))?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                    label: None,
                },
                None,
            )
            .await
            .map_err(|e| anyhow::anyhow!(format!("request_device error: {:?}", e)))?;
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| {
                matches!(
                    f,
                    wgpu::TextureFormat::Bgra8UnormSrgb | wgpu::TextureFormat::Rgba8UnormSrgb
                )
            })
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("surface has no formats"))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("panorama_shader"),
            source: wgpu::ShaderSource::Wgsl(pano_core::PANORAMA_WGSL.into()),
        });
        let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let pl = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("draw_pl"),
            bind_group_layouts: &[&bgl],
            push_constant_ranges: &[],
        });
        let sphere_pipeline = make_pipeline(&device, &pl, &shader, "fs_panorama", format, None);
        let marker_pipeline = make_pipeline(
            &device,
            &pl,
            &shader,
            "fs_marker",
            format,
            Some(wgpu::BlendState::ALPHA_BLENDING),
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("linear_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let sphere_mesh = GpuMesh::upload(&device, "sphere_mesh", &default_sphere());
        let marker_mesh = GpuMesh::upload(&device, "marker_mesh", &default_marker());
        let grey = [40u8, 40, 44, 255];
        let panorama = create_texture(&device, &queue, "panorama_placeholder", 1, 1, &grey);
        let white = [255u8; 4];
        let marker_texture = create_texture(&device, &queue, "marker_placeholder", 1, 1, &white);
        let sphere_binding = make_binding(&device, &bgl, &sampler, &panorama.view, "sphere");

        let [r, g, b, a] = CLEAR_COLOR;
        Ok(Self {
            surface,
            device,
            queue,
            config,
            bgl,
            sampler,
            sphere_pipeline,
            marker_pipeline,
            sphere_mesh,
            marker_mesh,
            panorama,
            sphere_binding,
            marker_texture,
            markers: FnvHashMap::default(),
            next_handle: 0,
            clear_color: wgpu::Color { r, g, b, a },
        })
    }

    /// Replace the arrow texture on every marker, current and future.
    pub fn set_marker_texture(&mut self, image: &PanoramaImage) {
        self.marker_texture = create_texture(
            &self.device,
            &self.queue,
            "marker_texture",
            image.width,
            image.height,
            &image.rgba,
        );
        for binding in self.markers.values_mut() {
            *binding = make_binding(
                &self.device,
                &self.bgl,
                &self.sampler,
                &self.marker_texture.view,
                "marker",
            );
        }
    }

    fn write_uniforms(&self, binding: &DrawBinding, mvp: Mat4, tint: [f32; 4]) {
        let u = DrawUniforms {
            mvp: mvp.to_cols_array_2d(),
            tint,
        };
        self.queue
            .write_buffer(&binding.uniform_buffer, 0, bytemuck::bytes_of(&u));
    }
}

impl SceneRenderer for GpuRenderer {
    fn create_marker(&mut self, target: &StationId) -> MeshHandle {
        self.next_handle = self.next_handle.wrapping_add(1);
        let handle = MeshHandle(self.next_handle);
        let binding = make_binding(
            &self.device,
            &self.bgl,
            &self.sampler,
            &self.marker_texture.view,
            "marker",
        );
        self.markers.insert(handle, binding);
        log::debug!("[render] marker {:?} -> {}", handle, target);
        handle
    }

    fn dispose_marker(&mut self, handle: MeshHandle) {
        if let Some(b) = self.markers.remove(&handle) {
            b.uniform_buffer.destroy();
        }
    }

    fn set_panorama(&mut self, image: &PanoramaImage) -> Result<(), PanoError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if image.width > max || image.height > max {
            return Err(PanoError::Render(format!(
                "panorama {}x{} exceeds texture limit {}",
                image.width, image.height, max
            )));
        }
        let next = create_texture(
            &self.device,
            &self.queue,
            "panorama",
            image.width,
            image.height,
            &image.rgba,
        );
        self.sphere_binding =
            make_binding(&self.device, &self.bgl, &self.sampler, &next.view, "sphere");
        let old = std::mem::replace(&mut self.panorama, next);
        old.texture.destroy();
        Ok(())
    }

    fn release_panorama(&mut self) {
        let grey = [40u8, 40, 44, 255];
        let placeholder = create_texture(&self.device, &self.queue, "panorama_placeholder", 1, 1, &grey);
        self.sphere_binding = make_binding(
            &self.device,
            &self.bgl,
            &self.sampler,
            &placeholder.view,
            "sphere",
        );
        let old = std::mem::replace(&mut self.panorama, placeholder);
        old.texture.destroy();
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if width != self.config.width || height != self.config.height {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    fn draw(&mut self, view: &SceneView) -> Result<(), PanoError> {
        let frame = self
            .surface
            .get_current_texture()
            .map_err(|e| PanoError::Render(format!("{:?}", e)))?;
        let target = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let sphere_mvp = view.view_proj * Mat4::from_rotation_y(view.sphere_yaw_rad);
        self.write_uniforms(&self.sphere_binding, sphere_mvp, [1.0; 4]);
        let markers: Vec<(&DrawBinding, Mat4)> = view
            .markers
            .iter()
            .filter_map(|m| self.markers.get(&m.handle).map(|b| (b, m.model)))
            .collect();
        for (binding, model) in &markers {
            self.write_uniforms(binding, view.view_proj * *model, MARKER_TINT);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(&self.sphere_pipeline);
            rpass.set_bind_group(0, &self.sphere_binding.bind_group, &[]);
            rpass.set_vertex_buffer(0, self.sphere_mesh.vertex_buffer.slice(..));
            rpass.set_index_buffer(
                self.sphere_mesh.index_buffer.slice(..),
                wgpu::IndexFormat::Uint32,
            );
            rpass.draw_indexed(0..self.sphere_mesh.index_count, 0, 0..1);

            // markers sit inside the sphere, so plain draw order is enough
            rpass.set_pipeline(&self.marker_pipeline);
            rpass.set_vertex_buffer(0, self.marker_mesh.vertex_buffer.slice(..));
            rpass.set_index_buffer(
                self.marker_mesh.index_buffer.slice(..),
                wgpu::IndexFormat::Uint32,
            );
            for (binding, _) in &markers {
                rpass.set_bind_group(0, &binding.bind_group, &[]);
                rpass.draw_indexed(0..self.marker_mesh.index_count, 0, 0..1);
            }
        }
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn make_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    frag_entry: &str,
    color_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(frag_entry),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2],
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(frag_entry),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        cache: None,
        multiview: None,
    })
}

fn create_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    rgba: &[u8],
) -> Textured {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Textured {
        texture,
        view,
    }
}

fn make_binding(
    device: &wgpu::Device,
    bgl: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    view: &wgpu::TextureView,
    label: &str,
) -> DrawBinding {
    let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: std::mem::size_of::<DrawUniforms>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout: bgl,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });
    DrawBinding {
        uniform_buffer,
        bind_group,
    }
}

#[cfg(target_arch = "wasm32")]
mod imp {
    use std::borrow::Cow;

    use ::wgpu::util::DeviceExt;
    use formats::ModelAsset;
    use foundation::math::Mat4;
    use scene::{LightRig, RenderSurface, RenderView, SurfaceError, Viewport};

    const MAX_DIRECTIONAL: usize = 3;

    const MESH_SHADER: &str = r#"
struct Globals {
    clip_from_model: mat4x4<f32>,
    ambient: vec4<f32>,
    sky: vec4<f32>,
    ground: vec4<f32>,
    light_dirs: array<vec4<f32>, 3>,
    light_colors: array<vec4<f32>, 3>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;

struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) color: vec4<f32>,
};

@vertex
fn vs_main(
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec4<f32>,
) -> VsOut {
    var out: VsOut;
    out.position = globals.clip_from_model * vec4<f32>(position, 1.0);
    out.normal = normal;
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VsOut) -> @location(0) vec4<f32> {
    let n = normalize(in.normal);
    let hemi_t = 0.5 * n.y + 0.5;
    var light = globals.ambient.rgb + mix(globals.ground.rgb, globals.sky.rgb, hemi_t);
    for (var i = 0u; i < 3u; i = i + 1u) {
        let l = globals.light_dirs[i];
        light = light + globals.light_colors[i].rgb * max(dot(n, l.xyz), 0.0) * l.w;
    }
    // Rig intensities are tuned for a tone-mapped pipeline; bring them into display range.
    let shaded = in.color.rgb * light * 0.25;
    return vec4<f32>(min(shaded, vec3<f32>(1.0)), in.color.a);
}
"#;

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct Vertex {
        position: [f32; 3],
        normal: [f32; 3],
        color: [f32; 4],
    }

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct Globals {
        clip_from_model: [[f32; 4]; 4],
        ambient: [f32; 4],
        sky: [f32; 4],
        ground: [f32; 4],
        light_dirs: [[f32; 4]; MAX_DIRECTIONAL],
        light_colors: [[f32; 4]; MAX_DIRECTIONAL],
    }

    impl Globals {
        fn new(clip_from_model: Mat4, lights: &LightRig) -> Self {
            let mut light_dirs = [[0.0; 4]; MAX_DIRECTIONAL];
            let mut light_colors = [[0.0; 4]; MAX_DIRECTIONAL];
            for (i, light) in lights.directional.iter().take(MAX_DIRECTIONAL).enumerate() {
                let d = light.position.normalize();
                light_dirs[i] = [d.x as f32, d.y as f32, d.z as f32, light.intensity];
                light_colors[i] = [light.color[0], light.color[1], light.color[2], 0.0];
            }
            let scaled = |c: [f32; 3], k: f32| [c[0] * k, c[1] * k, c[2] * k, 0.0];
            Self {
                clip_from_model: clip_from_model.to_cols_f32(),
                ambient: scaled(lights.ambient_color, lights.ambient_intensity),
                sky: scaled(lights.hemisphere.sky, lights.hemisphere.intensity),
                ground: scaled(lights.hemisphere.ground, lights.hemisphere.intensity),
                light_dirs,
                light_colors,
            }
        }
    }

    /// Maps OpenGL clip depth (-w..w) to the 0..w range wgpu expects.
    fn gl_to_wgpu_depth() -> Mat4 {
        let mut m = Mat4::IDENTITY;
        m.cols[2][2] = 0.5;
        m.cols[3][2] = 0.5;
        m
    }

    struct GpuMesh {
        vertex_buffer: ::wgpu::Buffer,
        index_buffer: ::wgpu::Buffer,
        index_count: u32,
    }

    pub struct WgpuSurface {
        _instance: &'static ::wgpu::Instance,
        surface: ::wgpu::Surface<'static>,
        device: ::wgpu::Device,
        queue: ::wgpu::Queue,
        config: ::wgpu::SurfaceConfiguration,
        canvas: web_sys::HtmlCanvasElement,
        pipeline: ::wgpu::RenderPipeline,
        uniform_buffer: ::wgpu::Buffer,
        uniform_bind_group: ::wgpu::BindGroup,
        depth_view: ::wgpu::TextureView,
        meshes: Vec<GpuMesh>,
        disposed: bool,
    }

    fn create_depth_view(
        device: &::wgpu::Device,
        config: &::wgpu::SurfaceConfiguration,
    ) -> ::wgpu::TextureView {
        let tex = device.create_texture(&::wgpu::TextureDescriptor {
            label: Some("tour-depth"),
            size: ::wgpu::Extent3d {
                width: config.width.max(1),
                height: config.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: ::wgpu::TextureDimension::D2,
            format: ::wgpu::TextureFormat::Depth24Plus,
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        tex.create_view(&::wgpu::TextureViewDescriptor::default())
    }

    /// Create a wgpu surface on `canvas`, sized to `viewport`.
    pub async fn init_surface(
        canvas: web_sys::HtmlCanvasElement,
        viewport: Viewport,
    ) -> Result<WgpuSurface, SurfaceError> {
        canvas.set_width(viewport.width.max(1));
        canvas.set_height(viewport.height.max(1));

        // `wgpu::Surface` must not outlive its `wgpu::Instance`; the instance
        // is leaked for the lifetime of the page.
        let instance: &'static ::wgpu::Instance = Box::leak(Box::new(::wgpu::Instance::new(
            &::wgpu::InstanceDescriptor {
                backends: ::wgpu::Backends::BROWSER_WEBGPU | ::wgpu::Backends::GL,
                ..Default::default()
            },
        )));

        let surface = instance
            .create_surface(::wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(|e| SurfaceError::Gpu(format!("surface: {e}")))?;

        let adapter = instance
            .request_adapter(&::wgpu::RequestAdapterOptions {
                power_preference: ::wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| SurfaceError::Unsupported(format!("adapter: {e}")))?;

        let (device, queue) = adapter
            .request_device(&::wgpu::DeviceDescriptor {
                label: Some("tour-wgpu-device"),
                required_features: ::wgpu::Features::empty(),
                required_limits: ::wgpu::Limits::downlevel_webgl2_defaults(),
                ..Default::default()
            })
            .await
            .map_err(|e| SurfaceError::Gpu(format!("device: {e}")))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| SurfaceError::Unsupported("no surface formats".to_string()))?;
        // Transparent clear: prefer an alpha mode that lets the page show through.
        let alpha_mode = [
            ::wgpu::CompositeAlphaMode::PreMultiplied,
            ::wgpu::CompositeAlphaMode::PostMultiplied,
        ]
        .into_iter()
        .find(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(::wgpu::CompositeAlphaMode::Auto);

        let config = ::wgpu::SurfaceConfiguration {
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: viewport.width.max(1),
            height: viewport.height.max(1),
            desired_maximum_frame_latency: 2,
            present_mode: ::wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, &config);

        let shader = device.create_shader_module(::wgpu::ShaderModuleDescriptor {
            label: Some("tour-mesh-shader"),
            source: ::wgpu::ShaderSource::Wgsl(Cow::Borrowed(MESH_SHADER)),
        });

        let uniform_buffer = device.create_buffer(&::wgpu::BufferDescriptor {
            label: Some("tour-globals"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: ::wgpu::BufferUsages::UNIFORM | ::wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
                label: Some("tour-globals-bgl"),
                entries: &[::wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ::wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: ::wgpu::BindingType::Buffer {
                        ty: ::wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_bind_group = device.create_bind_group(&::wgpu::BindGroupDescriptor {
            label: Some("tour-globals-bg"),
            layout: &uniform_bind_group_layout,
            entries: &[::wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
            label: Some("tour-mesh-pipeline-layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
            label: Some("tour-mesh-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: ::wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[::wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as ::wgpu::BufferAddress,
                    step_mode: ::wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        ::wgpu::VertexAttribute {
                            format: ::wgpu::VertexFormat::Float32x3,
                            offset: 0,
                            shader_location: 0,
                        },
                        ::wgpu::VertexAttribute {
                            format: ::wgpu::VertexFormat::Float32x3,
                            offset: 12,
                            shader_location: 1,
                        },
                        ::wgpu::VertexAttribute {
                            format: ::wgpu::VertexFormat::Float32x4,
                            offset: 24,
                            shader_location: 2,
                        },
                    ],
                }],
            },
            fragment: Some(::wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(::wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(::wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: ::wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: ::wgpu::PrimitiveState {
                topology: ::wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: ::wgpu::FrontFace::Ccw,
                // Exported building models are frequently single-sided walls
                // viewed from both sides.
                cull_mode: None,
                polygon_mode: ::wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(::wgpu::DepthStencilState {
                format: ::wgpu::TextureFormat::Depth24Plus,
                depth_write_enabled: true,
                depth_compare: ::wgpu::CompareFunction::Less,
                stencil: ::wgpu::StencilState::default(),
                bias: ::wgpu::DepthBiasState::default(),
            }),
            multisample: ::wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let globals = Globals::new(Mat4::IDENTITY, &LightRig::standard());
        queue.write_buffer(&uniform_buffer, 0, bytemuck::bytes_of(&globals));

        Ok(WgpuSurface {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            canvas,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            depth_view,
            meshes: Vec::new(),
            disposed: false,
        })
    }

    impl RenderSurface for WgpuSurface {
        fn resize(&mut self, viewport: Viewport) {
            if self.disposed || viewport.is_empty() {
                return;
            }
            self.canvas.set_width(viewport.width);
            self.canvas.set_height(viewport.height);
            self.config.width = viewport.width;
            self.config.height = viewport.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }

        fn upload_model(&mut self, asset: &ModelAsset) -> Result<(), SurfaceError> {
            if self.disposed {
                return Err(SurfaceError::Gpu("surface disposed".to_string()));
            }
            self.meshes.clear();
            for (i, mesh) in asset.meshes.iter().enumerate() {
                if mesh.indices.is_empty() {
                    continue;
                }
                let vertices: Vec<Vertex> = mesh
                    .positions
                    .iter()
                    .enumerate()
                    .map(|(v, position)| Vertex {
                        position: *position,
                        normal: mesh.normals.get(v).copied().unwrap_or([0.0, 1.0, 0.0]),
                        color: mesh.base_color,
                    })
                    .collect();
                let vertex_buffer =
                    self.device
                        .create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                            label: Some("tour-mesh-vertices"),
                            contents: bytemuck::cast_slice(&vertices),
                            usage: ::wgpu::BufferUsages::VERTEX,
                        });
                let index_buffer =
                    self.device
                        .create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                            label: Some("tour-mesh-indices"),
                            contents: bytemuck::cast_slice(&mesh.indices),
                            usage: ::wgpu::BufferUsages::INDEX,
                        });
                tracing::trace!(mesh = i, vertices = vertices.len(), "uploaded mesh");
                self.meshes.push(GpuMesh {
                    vertex_buffer,
                    index_buffer,
                    index_count: mesh.indices.len() as u32,
                });
            }
            Ok(())
        }

        fn clear_model(&mut self) {
            self.meshes.clear();
        }

        fn render(&mut self, view: &RenderView<'_>) {
            if self.disposed {
                return;
            }
            let frame = match self.surface.get_current_texture() {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::debug!(error = %e, "surface acquire failed; reconfiguring");
                    self.surface.configure(&self.device, &self.config);
                    return;
                }
            };
            let target = frame
                .texture
                .create_view(&::wgpu::TextureViewDescriptor::default());

            let clip_from_model = gl_to_wgpu_depth() * view.view_proj * view.model;
            let globals = Globals::new(clip_from_model, view.lights);
            self.queue
                .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&globals));

            let mut encoder = self
                .device
                .create_command_encoder(&::wgpu::CommandEncoderDescriptor {
                    label: Some("tour-mesh-encoder"),
                });

            {
                let mut rpass = encoder.begin_render_pass(&::wgpu::RenderPassDescriptor {
                    label: Some("tour-mesh-pass"),
                    color_attachments: &[Some(::wgpu::RenderPassColorAttachment {
                        view: &target,
                        resolve_target: None,
                        depth_slice: None,
                        ops: ::wgpu::Operations {
                            load: ::wgpu::LoadOp::Clear(::wgpu::Color::TRANSPARENT),
                            store: ::wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(::wgpu::RenderPassDepthStencilAttachment {
                        view: &self.depth_view,
                        depth_ops: Some(::wgpu::Operations {
                            load: ::wgpu::LoadOp::Clear(1.0),
                            store: ::wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                    multiview_mask: None,
                });

                rpass.set_pipeline(&self.pipeline);
                rpass.set_bind_group(0, &self.uniform_bind_group, &[]);
                for mesh in &self.meshes {
                    rpass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                    rpass.set_index_buffer(mesh.index_buffer.slice(..), ::wgpu::IndexFormat::Uint32);
                    rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
                }
            }

            self.queue.submit(std::iter::once(encoder.finish()));
            frame.present();
        }

        fn dispose(&mut self) {
            if self.disposed {
                return;
            }
            self.disposed = true;
            self.meshes.clear();
            self.canvas.remove();
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod imp {
    use formats::ModelAsset;
    use scene::{RenderSurface, RenderView, SurfaceError, Viewport};

    #[derive(Debug, Default)]
    pub struct WgpuSurface;

    pub async fn init_surface(
        _canvas: web_sys::HtmlCanvasElement,
        _viewport: Viewport,
    ) -> Result<WgpuSurface, SurfaceError> {
        Err(SurfaceError::Unsupported(
            "wgpu rendering is only available on wasm32 targets".to_string(),
        ))
    }

    impl RenderSurface for WgpuSurface {
        fn resize(&mut self, _viewport: Viewport) {}

        fn upload_model(&mut self, _asset: &ModelAsset) -> Result<(), SurfaceError> {
            Ok(())
        }

        fn clear_model(&mut self) {}

        fn render(&mut self, _view: &RenderView<'_>) {}

        fn dispose(&mut self) {}
    }
}

pub use imp::{WgpuSurface, init_surface};

//! wgpu-based GPU evaluator for the trajectory search (§4.F), compiled
//! only with the `gpu` feature. Mirrors [`super::cpu::CpuBackend`]'s
//! contract exactly; the shader in `shaders/trajectory_search.wgsl`
//! implements the same inner loop one thread per starting pixel.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::error::{KbmodError, Result};
use crate::psi_phi::PsiPhiStack;
use crate::search::{SearchSpec, Trajectory};

use super::ComputeBackend;

const MAX_K: u32 = 32;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SearchParams {
    width: u32,
    height: u32,
    n_frames: u32,
    grid_count: u32,
    min_obs: u32,
    k: u32,
    _pad: [u32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct GpuTrajectory {
    x: u32,
    y: u32,
    vx: f32,
    vy: f32,
    lh: f32,
    flux: f32,
    obs_count: u32,
    _pad: u32,
}

pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    adapter_name: String,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl WgpuBackend {
    pub fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| KbmodError::DeviceUnavailable(format!("no suitable GPU adapter: {e}")))?;

        let adapter_name = adapter.get_info().name.clone();
        tracing::info!("GPU adapter: {adapter_name}");

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("kbmod"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            },
        ))
        .map_err(|e| KbmodError::DeviceUnavailable(format!("failed to create GPU device: {e}")))?;

        let device: Arc<wgpu::Device> = Arc::new(device);
        let queue: Arc<wgpu::Queue> = Arc::new(queue);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("trajectory_search"),
            source: wgpu::ShaderSource::Wgsl(
                include_str!("shaders/trajectory_search.wgsl").into(),
            ),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("trajectory_search_layout"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, true),
                storage_entry(2, true),
                storage_entry(3, true),
                storage_entry(4, true),
                storage_entry(5, false),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("trajectory_search_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("trajectory_search_pipeline"),
            layout: Some(&pipeline_layout),
            module: &module,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self {
            device,
            queue,
            adapter_name,
            pipeline,
            bind_group_layout,
        })
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    let ty = if binding == 0 {
        wgpu::BufferBindingType::Uniform
    } else {
        wgpu::BufferBindingType::Storage { read_only }
    };
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl ComputeBackend for WgpuBackend {
    fn name(&self) -> &str {
        &self.adapter_name
    }

    fn is_gpu(&self) -> bool {
        true
    }

    fn search(&self, psi_phi: &PsiPhiStack, spec: &SearchSpec) -> Result<Vec<Trajectory>> {
        spec.validate()?;
        if psi_phi.is_empty() {
            return Err(KbmodError::EmptyStack);
        }
        if spec.k as u32 > MAX_K {
            return Err(KbmodError::BadSearchSpec(format!(
                "k={} exceeds the GPU backend's per-pixel heap capacity ({MAX_K})",
                spec.k
            )));
        }

        let width = psi_phi.width() as u32;
        let height = psi_phi.height() as u32;
        let n_frames = psi_phi.len() as u32;
        let pixel_count = (width * height) as usize;

        let mut psi_flat = Vec::with_capacity(pixel_count * n_frames as usize);
        let mut phi_flat = Vec::with_capacity(pixel_count * n_frames as usize);
        for frame in psi_phi.frames() {
            psi_flat.extend(frame.psi.data().iter().copied());
            phi_flat.extend(frame.phi.data().iter().copied());
        }

        let times = psi_phi.times();
        let grid = spec.velocity_grid();
        let grid_flat: Vec<[f32; 2]> = grid.iter().map(|&(vx, vy)| [vx, vy]).collect();

        let params = SearchParams {
            width,
            height,
            n_frames,
            grid_count: grid.len() as u32,
            min_obs: spec.min_obs as u32,
            k: spec.k as u32,
            _pad: [0; 2],
        };

        let device = &self.device;

        let params_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("search_params"),
            contents: bytemuck::bytes_of(&params),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let psi_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("psi_planes"),
            contents: bytemuck::cast_slice(&psi_flat),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let phi_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("phi_planes"),
            contents: bytemuck::cast_slice(&phi_flat),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let times_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("times"),
            contents: bytemuck::cast_slice(&times),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let velocities_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("velocities"),
            contents: bytemuck::cast_slice(&grid_flat),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let output_len = pixel_count * spec.k;
        let output_size = (output_len * std::mem::size_of::<GpuTrajectory>()) as u64;
        let output_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("trajectory_output"),
            size: output_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let readback_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("trajectory_readback"),
            size: output_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("trajectory_search_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: psi_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: phi_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: times_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: velocities_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: output_buf.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("trajectory_search_encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("trajectory_search_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            let workgroups = pixel_count.div_ceil(64) as u32;
            pass.dispatch_workgroups(workgroups, 1, 1);
        }
        encoder.copy_buffer_to_buffer(&output_buf, 0, &readback_buf, 0, output_size);
        self.queue.submit(Some(encoder.finish()));

        let slice = readback_buf.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        device.poll(wgpu::PollType::Wait).map_err(|e| {
            KbmodError::AllocationFailure(format!("device poll failed: {e}"))
        })?;
        rx.recv()
            .map_err(|e| KbmodError::AllocationFailure(format!("map_async channel closed: {e}")))?
            .map_err(|e| KbmodError::AllocationFailure(format!("buffer map failed: {e}")))?;

        let data = slice.get_mapped_range();
        let raw: &[GpuTrajectory] = bytemuck::cast_slice(&data);
        let results = raw
            .iter()
            .filter(|t| t.obs_count > 0)
            .map(|t| Trajectory {
                x: t.x,
                y: t.y,
                vx: t.vx,
                vy: t.vy,
                lh: t.lh,
                flux: t.flux,
                obs_count: t.obs_count,
            })
            .collect();
        drop(data);
        readback_buf.unmap();

        Ok(results)
    }
}

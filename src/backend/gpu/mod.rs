//! wgpu implementation of [`ComputeBackend`].
//!
//! Surfaces are storage buffers of `vec4<f32>`. Dispatches between two
//! barriers share one compute pass; `barrier()` ends the pass so the next
//! dispatch opens a new one. Work accumulates in a single command encoder
//! until `submit()` or a readback.

mod context;
mod kernels;

pub use context::GpuContext;
pub use kernels::{GpuKernels, KernelPipeline, WORKGROUP_SIZE};

use std::collections::HashMap;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::{ComputeBackend, Dispatch, HazardTracker, PassTableId, SurfaceId, Texel};
use crate::error::{validate_texture_size, OceanError, OceanResult};
use crate::params::{FftPassUniform, OceanUniforms};

const TEXEL_BYTES: u64 = std::mem::size_of::<Texel>() as u64;

struct GpuSurface {
    size: u32,
    buffer: wgpu::Buffer,
}

pub struct GpuBackend {
    context: Arc<GpuContext>,
    kernels: Arc<GpuKernels>,
    surfaces: HashMap<SurfaceId, GpuSurface>,
    pass_tables: HashMap<PassTableId, (wgpu::Buffer, u32)>,
    uniforms: wgpu::Buffer,
    uniforms_written: bool,
    hazards: HazardTracker,
    encoder: Option<wgpu::CommandEncoder>,
    pass: Option<wgpu::ComputePass<'static>>,
    pass_stride: u64,
    next_id: u32,
}

impl GpuBackend {
    pub fn new(context: Arc<GpuContext>) -> OceanResult<Self> {
        let kernels = context.kernels()?;
        let device = context.device();

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Ocean Uniforms"),
            size: std::mem::size_of::<OceanUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Dynamic offsets must respect the device alignment
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let pass_stride = (std::mem::size_of::<FftPassUniform>() as u64).max(alignment);

        Ok(Self {
            context,
            kernels,
            surfaces: HashMap::new(),
            pass_tables: HashMap::new(),
            uniforms,
            uniforms_written: false,
            hazards: HazardTracker::new(),
            encoder: None,
            pass: None,
            pass_stride,
            next_id: 0,
        })
    }

    /// Backend on a freshly acquired headless device
    pub fn new_default() -> OceanResult<Self> {
        Self::new(GpuContext::new_blocking()?)
    }

    pub fn context(&self) -> &Arc<GpuContext> {
        &self.context
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn surface(&self, id: SurfaceId) -> OceanResult<&GpuSurface> {
        self.surfaces
            .get(&id)
            .ok_or_else(|| OceanError::invariant(format!("unknown surface {:?}", id)))
    }

    /// Create a buffer, mapping allocation failure to `ResourceExhausted`
    fn create_buffer_checked(
        &self,
        label: &str,
        create: impl FnOnce(&wgpu::Device) -> wgpu::Buffer,
    ) -> OceanResult<wgpu::Buffer> {
        let device = self.context.device();
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = create(device);
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            log::error!("Allocation of '{}' failed: {}", label, error);
            return Err(OceanError::ResourceExhausted(format!("{}: {}", label, error)));
        }
        Ok(buffer)
    }

    fn open_pass(&mut self) -> &mut wgpu::ComputePass<'static> {
        let device = self.context.device();
        let encoder = self.encoder.get_or_insert_with(|| {
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Ocean Compute Encoder"),
            })
        });
        self.pass.get_or_insert_with(|| {
            encoder
                .begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Ocean Compute Pass"),
                    timestamp_writes: None,
                })
                .forget_lifetime()
        })
    }

    fn bind_group(&self, dispatch: &Dispatch<'_>) -> OceanResult<(wgpu::BindGroup, Vec<u32>)> {
        let kernel = self.kernels.get(dispatch.kernel)?;

        let (uniform, offsets) = match dispatch.pass {
            Some(pass) if dispatch.kernel.uses_pass_table() => {
                let (buffer, rows) = self
                    .pass_tables
                    .get(&pass.table)
                    .ok_or_else(|| {
                        OceanError::invariant(format!("unknown pass table {:?}", pass.table))
                    })?;
                if pass.index >= *rows {
                    return Err(OceanError::invariant(format!("pass row {:?} out of range", pass)));
                }
                let binding = wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<FftPassUniform>() as u64),
                });
                (binding, vec![(pass.index as u64 * self.pass_stride) as u32])
            }
            _ => {
                if !self.uniforms_written {
                    return Err(OceanError::invariant(format!(
                        "{:?} dispatched before parameters were uploaded",
                        dispatch.kernel
                    )));
                }
                (self.uniforms.as_entire_binding(), Vec::new())
            }
        };

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform,
        }];
        for (i, id) in dispatch.reads.iter().chain(dispatch.writes).enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: i as u32 + 1,
                resource: self.surface(*id)?.buffer.as_entire_binding(),
            });
        }

        let bind_group = self
            .context
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(dispatch.kernel.entry_point()),
                layout: &kernel.layout,
                entries: &entries,
            });
        Ok((bind_group, offsets))
    }

    fn flush(&mut self) {
        self.pass = None;
        if let Some(encoder) = self.encoder.take() {
            self.context.queue().submit(Some(encoder.finish()));
        }
    }
}

impl ComputeBackend for GpuBackend {
    fn create_surface(&mut self, size: u32, label: &str) -> OceanResult<SurfaceId> {
        validate_texture_size(size)?;
        let bytes = size as u64 * size as u64 * TEXEL_BYTES;
        let buffer = self.create_buffer_checked(label, |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: bytes,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        })?;

        let id = SurfaceId(self.allocate_id());
        self.surfaces.insert(id, GpuSurface { size, buffer });
        Ok(id)
    }

    fn destroy_surface(&mut self, surface: SurfaceId) {
        if let Some(s) = self.surfaces.remove(&surface) {
            s.buffer.destroy();
        }
        self.hazards.release(surface);
    }

    fn write_surface(&mut self, surface: SurfaceId, texels: &[Texel]) -> OceanResult<()> {
        let target = self.surface(surface)?;
        if texels.len() as u64 != target.size as u64 * target.size as u64 {
            return Err(OceanError::invariant(format!(
                "upload of {} texels into {}x{} surface",
                texels.len(),
                target.size,
                target.size
            )));
        }
        // Queue writes land before the next submission, so recorded work goes first
        self.flush();
        let target = self.surface(surface)?;
        self.context
            .queue()
            .write_buffer(&target.buffer, 0, bytemuck::cast_slice(texels));
        Ok(())
    }

    fn read_surface(&mut self, surface: SurfaceId) -> OceanResult<Vec<Texel>> {
        self.flush();

        let source = self.surface(surface)?;
        let bytes = source.size as u64 * source.size as u64 * TEXEL_BYTES;
        let device = self.context.device();

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Ocean Readback"),
            size: bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Ocean Readback Encoder"),
        });
        encoder.copy_buffer_to_buffer(&source.buffer, 0, &staging, 0, bytes);
        self.context.queue().submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device.poll(wgpu::Maintain::Wait);

        pollster::block_on(receiver)
            .map_err(|_| OceanError::device("readback channel closed"))?
            .map_err(|e| OceanError::device(format!("readback failed: {}", e)))?;

        let texels = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, Texel>(&data).to_vec()
        };
        staging.unmap();
        Ok(texels)
    }

    fn create_pass_table(&mut self, passes: &[FftPassUniform]) -> OceanResult<PassTableId> {
        let stride = self.pass_stride as usize;
        let mut contents = vec![0u8; stride * passes.len().max(1)];
        for (i, row) in passes.iter().enumerate() {
            contents[i * stride..i * stride + std::mem::size_of::<FftPassUniform>()]
                .copy_from_slice(bytemuck::bytes_of(row));
        }

        let buffer = self.create_buffer_checked("FFT Pass Table", |device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("FFT Pass Table"),
                contents: &contents,
                usage: wgpu::BufferUsages::UNIFORM,
            })
        })?;

        let id = PassTableId(self.allocate_id());
        self.pass_tables.insert(id, (buffer, passes.len() as u32));
        Ok(id)
    }

    fn destroy_pass_table(&mut self, table: PassTableId) {
        if let Some((buffer, _)) = self.pass_tables.remove(&table) {
            buffer.destroy();
        }
    }

    fn write_uniforms(&mut self, uniforms: &OceanUniforms) -> OceanResult<()> {
        uniforms.validate()?;
        self.flush();
        self.context
            .queue()
            .write_buffer(&self.uniforms, 0, bytemuck::bytes_of(uniforms));
        self.uniforms_written = true;
        Ok(())
    }

    fn dispatch(&mut self, dispatch: &Dispatch<'_>) -> OceanResult<()> {
        let size = dispatch.threads[0];
        for id in dispatch.reads.iter().chain(dispatch.writes) {
            let surface = self.surface(*id)?;
            if surface.size != size || dispatch.threads[1] != size {
                return Err(OceanError::invariant(format!(
                    "{:?} dispatched over {:?} but {:?} is {}x{}",
                    dispatch.kernel, dispatch.threads, id, surface.size, surface.size
                )));
            }
        }
        self.hazards.check(dispatch)?;

        let (bind_group, offsets) = self.bind_group(dispatch)?;
        let kernels = Arc::clone(&self.kernels);
        let pipeline = &kernels.get(dispatch.kernel)?.pipeline;
        let groups = [
            dispatch.threads[0].div_ceil(WORKGROUP_SIZE),
            dispatch.threads[1].div_ceil(WORKGROUP_SIZE),
            dispatch.threads[2].max(1),
        ];

        let pass = self.open_pass();
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &offsets);
        pass.dispatch_workgroups(groups[0], groups[1], groups[2]);
        Ok(())
    }

    fn barrier(&mut self) {
        // Ending the compute pass makes its writes visible to the next one
        self.pass = None;
        self.hazards.barrier();
    }

    fn submit(&mut self) {
        self.flush();
    }
}

impl Drop for GpuBackend {
    fn drop(&mut self) {
        self.flush();
    }
}

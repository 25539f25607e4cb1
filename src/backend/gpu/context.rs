use std::sync::{Arc, Mutex, Weak};

use super::kernels::GpuKernels;
use crate::error::{OceanError, OceanResult};

/// Device and queue shared by every GPU-backed simulation.
///
/// Also holds the compiled kernel set. The set is compiled by the first
/// backend that asks for it and released when the last one drops its `Arc`.
pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    kernels: Mutex<Weak<GpuKernels>>,
}

impl GpuContext {
    /// Acquire a headless adapter and device
    pub async fn new() -> OceanResult<Arc<Self>> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| OceanError::device("no compatible GPU adapter"))?;

        let info = adapter.get_info();
        log::info!("GPU adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Ocean Compute Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| OceanError::device(format!("failed to request device: {}", e)))?;

        Ok(Arc::new(Self {
            device,
            queue,
            kernels: Mutex::new(Weak::new()),
        }))
    }

    /// Blocking variant of [`GpuContext::new`]
    pub fn new_blocking() -> OceanResult<Arc<Self>> {
        pollster::block_on(Self::new())
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Shared kernel set, compiled on first use
    pub fn kernels(&self) -> OceanResult<Arc<GpuKernels>> {
        let mut cached = self
            .kernels
            .lock()
            .map_err(|_| OceanError::invariant("kernel cache lock poisoned"))?;

        if let Some(kernels) = cached.upgrade() {
            return Ok(kernels);
        }

        log::info!("Compiling ocean compute kernels");
        let kernels = Arc::new(GpuKernels::compile(&self.device)?);
        *cached = Arc::downgrade(&kernels);
        Ok(kernels)
    }

    /// Whether a compiled kernel set is currently alive
    pub fn has_kernels(&self) -> bool {
        self.kernels
            .lock()
            .map(|cached| cached.strong_count() > 0)
            .unwrap_or(false)
    }
}

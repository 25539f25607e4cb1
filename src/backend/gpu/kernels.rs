//! Compiled compute pipelines, one per [`Kernel`].

use std::borrow::Cow;
use std::collections::HashMap;

use crate::backend::Kernel;
use crate::error::{OceanError, OceanResult};
use crate::params::{FftPassUniform, OceanUniforms};

const COMMON_WGSL: &str = include_str!("../../shaders/common.wgsl");
const SPECTRUM_WGSL: &str = include_str!("../../shaders/spectrum.wgsl");
const FFT_WGSL: &str = include_str!("../../shaders/fft.wgsl");
const COMBINE_WGSL: &str = include_str!("../../shaders/combine.wgsl");

/// Workgroup edge used by every kernel (8×8 invocations)
pub const WORKGROUP_SIZE: u32 = 8;

fn module_source(kernel: Kernel) -> (&'static str, &'static str) {
    match kernel {
        Kernel::GenerateSpectrum | Kernel::PropagateWaves => ("spectrum", SPECTRUM_WGSL),
        Kernel::FftShift | Kernel::BitReverse | Kernel::Butterfly => ("fft", FFT_WGSL),
        Kernel::CombineFields => ("combine", COMBINE_WGSL),
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Binding 0 is the parameter record (or pass row), then reads, then writes
fn layout_entries(kernel: Kernel) -> Vec<wgpu::BindGroupLayoutEntry> {
    let uniform_size = if kernel.uses_pass_table() {
        std::mem::size_of::<FftPassUniform>()
    } else {
        std::mem::size_of::<OceanUniforms>()
    };

    let mut entries = vec![wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: kernel.uses_pass_table(),
            min_binding_size: wgpu::BufferSize::new(uniform_size as u64),
        },
        count: None,
    }];

    let (reads, writes) = kernel.arity();
    let mut binding = 1;
    for _ in 0..reads {
        entries.push(storage_entry(binding, true));
        binding += 1;
    }
    for _ in 0..writes {
        entries.push(storage_entry(binding, false));
        binding += 1;
    }
    entries
}

/// Layout and pipeline for one kernel
pub struct KernelPipeline {
    pub layout: wgpu::BindGroupLayout,
    pub pipeline: wgpu::ComputePipeline,
}

/// Immutable set of compute pipelines shared between backends
pub struct GpuKernels {
    pipelines: HashMap<Kernel, KernelPipeline>,
}

impl GpuKernels {
    pub fn compile(device: &wgpu::Device) -> OceanResult<Self> {
        let mut modules: HashMap<&'static str, wgpu::ShaderModule> = HashMap::new();
        let mut pipelines = HashMap::new();

        for kernel in Kernel::ALL {
            let (name, body) = module_source(kernel);
            if !modules.contains_key(name) {
                let source = format!("{}\n{}", COMMON_WGSL, body);
                device.push_error_scope(wgpu::ErrorFilter::Validation);
                let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(name),
                    source: wgpu::ShaderSource::Wgsl(Cow::Owned(source)),
                });
                check_scope(device, kernel)?;
                modules.insert(name, module);
            }
            let module = modules
                .get(name)
                .ok_or_else(|| OceanError::invariant(format!("shader module {} missing", name)))?;

            device.push_error_scope(wgpu::ErrorFilter::Validation);
            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(kernel.entry_point()),
                entries: &layout_entries(kernel),
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(kernel.entry_point()),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });
            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(kernel.entry_point()),
                layout: Some(&pipeline_layout),
                module,
                entry_point: Some(kernel.entry_point()),
                compilation_options: Default::default(),
                cache: None,
            });
            check_scope(device, kernel)?;

            log::debug!("Compiled kernel {}", kernel.entry_point());
            pipelines.insert(kernel, KernelPipeline { layout, pipeline });
        }

        Ok(Self { pipelines })
    }

    pub fn get(&self, kernel: Kernel) -> OceanResult<&KernelPipeline> {
        self.pipelines
            .get(&kernel)
            .ok_or_else(|| OceanError::invariant(format!("kernel {:?} not compiled", kernel)))
    }
}

impl Drop for GpuKernels {
    fn drop(&mut self) {
        log::debug!("Releasing ocean compute kernels");
    }
}

fn check_scope(device: &wgpu::Device, kernel: Kernel) -> OceanResult<()> {
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => {
            let message = error.to_string();
            log::error!("Kernel {:?} failed to compile: {}", kernel, message);
            Err(OceanError::KernelCompilation { kernel, message })
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_arity() {
        let combine = layout_entries(Kernel::CombineFields);
        assert_eq!(combine.len(), 8);

        let butterfly = layout_entries(Kernel::Butterfly);
        assert_eq!(butterfly.len(), 3);
        assert!(matches!(
            butterfly[0].ty,
            wgpu::BindingType::Buffer {
                has_dynamic_offset: true,
                ..
            }
        ));
    }

    #[test]
    fn test_entry_points_present_in_sources() {
        for kernel in Kernel::ALL {
            let (_, body) = module_source(kernel);
            assert!(body.contains(&format!("fn {}(", kernel.entry_point())));
        }
    }
}

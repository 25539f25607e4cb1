//! Host-memory backend running the reference kernels immediately.

use std::collections::HashMap;

use super::{ComputeBackend, Dispatch, HazardTracker, Kernel, PassTableId, SurfaceId, Texel};
use crate::combine::{combine_fields, CombineOutputs};
use crate::error::{validate_texture_size, OceanError, OceanResult};
use crate::fft::kernels::{bit_reverse, butterfly, fft_shift};
use crate::params::{FftPassUniform, OceanUniforms};
use crate::spectrum::{generate_spectrum, propagate_waves};

struct Surface {
    size: u32,
    label: String,
    texels: Vec<Texel>,
}

/// Deterministic CPU implementation of [`ComputeBackend`].
///
/// Dispatches execute as soon as they are recorded, but the same hazard
/// rules as the GPU apply, so a missing barrier fails here too.
#[derive(Default)]
pub struct CpuBackend {
    surfaces: HashMap<SurfaceId, Surface>,
    pass_tables: HashMap<PassTableId, Vec<FftPassUniform>>,
    uniforms: Option<OceanUniforms>,
    hazards: HazardTracker,
    next_id: u32,
    dispatches: u64,
    barriers: u64,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatches recorded since creation
    pub fn dispatch_count(&self) -> u64 {
        self.dispatches
    }

    /// Barriers recorded since creation
    pub fn barrier_count(&self) -> u64 {
        self.barriers
    }

    /// Number of live surfaces
    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn surface_label(&self, surface: SurfaceId) -> Option<&str> {
        self.surfaces.get(&surface).map(|s| s.label.as_str())
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn surface(&self, id: SurfaceId) -> OceanResult<&Surface> {
        self.surfaces
            .get(&id)
            .ok_or_else(|| OceanError::invariant(format!("unknown surface {:?}", id)))
    }

    fn uniforms(&self, kernel: Kernel) -> OceanResult<&OceanUniforms> {
        self.uniforms.as_ref().ok_or_else(|| {
            OceanError::invariant(format!(
                "{:?} dispatched before parameters were uploaded",
                kernel
            ))
        })
    }

    fn pass_row(&self, dispatch: &Dispatch<'_>) -> OceanResult<FftPassUniform> {
        let pass = dispatch.pass.ok_or_else(|| {
            OceanError::invariant(format!("{:?} needs a pass table row", dispatch.kernel))
        })?;
        self.pass_tables
            .get(&pass.table)
            .and_then(|rows| rows.get(pass.index as usize))
            .copied()
            .ok_or_else(|| OceanError::invariant(format!("pass row {:?} out of range", pass)))
    }

    /// Size shared by every bound surface
    fn dispatch_size(&self, dispatch: &Dispatch<'_>) -> OceanResult<u32> {
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
        Ok(size)
    }

    fn execute(&self, dispatch: &Dispatch<'_>, size: u32) -> OceanResult<Vec<Vec<Texel>>> {
        let inputs: Vec<&[Texel]> = dispatch
            .reads
            .iter()
            .map(|id| self.surface(*id).map(|s| s.texels.as_slice()))
            .collect::<OceanResult<_>>()?;
        let texel_count = (size * size) as usize;
        let mut outputs = vec![vec![[0.0f32; 4]; texel_count]; dispatch.writes.len()];

        match dispatch.kernel {
            Kernel::GenerateSpectrum => {
                let u = self.uniforms(dispatch.kernel)?;
                check_uniform_size(u, size)?;
                generate_spectrum(inputs[0], &mut outputs[0], u);
            }
            Kernel::PropagateWaves => {
                let u = self.uniforms(dispatch.kernel)?;
                check_uniform_size(u, size)?;
                let (displacement, derivatives) = outputs.split_at_mut(1);
                propagate_waves(inputs[0], &mut displacement[0], &mut derivatives[0], u);
            }
            Kernel::FftShift => fft_shift(inputs[0], &mut outputs[0], size),
            Kernel::BitReverse => bit_reverse(inputs[0], &mut outputs[0], size),
            Kernel::Butterfly => {
                let row = self.pass_row(dispatch)?;
                if row.size != size {
                    return Err(OceanError::invariant(format!(
                        "pass row for size {} used on a {}x{} surface",
                        row.size, size, size
                    )));
                }
                butterfly(inputs[0], &mut outputs[0], &row);
            }
            Kernel::CombineFields => {
                let u = self.uniforms(dispatch.kernel)?;
                check_uniform_size(u, size)?;
                if let [height, displacement, normal, foam] = outputs.as_mut_slice() {
                    combine_fields(
                        inputs[0],
                        inputs[1],
                        inputs[2],
                        CombineOutputs {
                            height: height.as_mut_slice(),
                            displacement: displacement.as_mut_slice(),
                            normal: normal.as_mut_slice(),
                            foam: foam.as_mut_slice(),
                        },
                        u,
                    );
                }
            }
        }
        Ok(outputs)
    }
}

fn check_uniform_size(u: &OceanUniforms, size: u32) -> OceanResult<()> {
    if u.size != size {
        return Err(OceanError::invariant(format!(
            "parameter record is for size {} but dispatch covers {}",
            u.size, size
        )));
    }
    Ok(())
}

impl ComputeBackend for CpuBackend {
    fn create_surface(&mut self, size: u32, label: &str) -> OceanResult<SurfaceId> {
        validate_texture_size(size)?;
        let id = SurfaceId(self.allocate_id());
        self.surfaces.insert(
            id,
            Surface {
                size,
                label: label.to_string(),
                texels: vec![[0.0; 4]; (size * size) as usize],
            },
        );
        Ok(id)
    }

    fn destroy_surface(&mut self, surface: SurfaceId) {
        self.surfaces.remove(&surface);
        self.hazards.release(surface);
    }

    fn write_surface(&mut self, surface: SurfaceId, texels: &[Texel]) -> OceanResult<()> {
        let target = self
            .surfaces
            .get_mut(&surface)
            .ok_or_else(|| OceanError::invariant(format!("unknown surface {:?}", surface)))?;
        if texels.len() != target.texels.len() {
            return Err(OceanError::invariant(format!(
                "upload of {} texels into {}x{} surface '{}'",
                texels.len(),
                target.size,
                target.size,
                target.label
            )));
        }
        target.texels.copy_from_slice(texels);
        Ok(())
    }

    fn read_surface(&mut self, surface: SurfaceId) -> OceanResult<Vec<Texel>> {
        Ok(self.surface(surface)?.texels.clone())
    }

    fn create_pass_table(&mut self, passes: &[FftPassUniform]) -> OceanResult<PassTableId> {
        let id = PassTableId(self.allocate_id());
        self.pass_tables.insert(id, passes.to_vec());
        Ok(id)
    }

    fn destroy_pass_table(&mut self, table: PassTableId) {
        self.pass_tables.remove(&table);
    }

    fn write_uniforms(&mut self, uniforms: &OceanUniforms) -> OceanResult<()> {
        uniforms.validate()?;
        self.uniforms = Some(*uniforms);
        Ok(())
    }

    fn dispatch(&mut self, dispatch: &Dispatch<'_>) -> OceanResult<()> {
        let size = self.dispatch_size(dispatch)?;
        self.hazards.check(dispatch)?;
        let outputs = self.execute(dispatch, size)?;

        for (id, texels) in dispatch.writes.iter().zip(outputs) {
            if let Some(surface) = self.surfaces.get_mut(id) {
                surface.texels = texels;
            }
        }
        self.dispatches += 1;
        Ok(())
    }

    fn barrier(&mut self) {
        self.hazards.barrier();
        self.barriers += 1;
    }

    fn submit(&mut self) {
        // Work already ran at dispatch time
    }
}

//! Per-patch simulation: owns every surface and records one tick of work.

use crate::backend::{ComputeBackend, Dispatch, Kernel, SurfaceId, Texel};
use crate::error::OceanResult;
use crate::fft::{FftDirection, FftEngine};
use crate::params::{Clamp, OceanParams, OceanUniforms, SimulationConfig};
use crate::spectrum::NoiseField;

/// Fields that can be read back for diagnostics
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DerivedField {
    /// Time-invariant spectrum H₀ (channels x, y)
    InitialSpectrum,
    /// (h, 0, 0, 0)
    Height,
    /// (λ·Dx, h, λ·Dz, 0)
    Displacement,
    /// (nx, ny, nz, 0)
    Normal,
    /// (foam, jacobian, 0, 0)
    Foam,
}

struct Surfaces {
    noise: SurfaceId,
    h0: SurfaceId,
    displacement_spectrum: SurfaceId,
    derivative_spectrum: SurfaceId,
    height: SurfaceId,
    displacement: SurfaceId,
    normal: SurfaceId,
    foam: [SurfaceId; 2],
}

/// Every backend resource one simulation owns for a given size
struct Resources {
    surfaces: Surfaces,
    displacement_fft: FftEngine,
    derivative_fft: FftEngine,
}

impl Resources {
    fn create<B: ComputeBackend>(backend: &mut B, size: u32) -> OceanResult<Self> {
        let surfaces = Surfaces {
            noise: backend.create_surface(size, "noise")?,
            h0: backend.create_surface(size, "h0 spectrum")?,
            displacement_spectrum: backend.create_surface(size, "displacement spectrum")?,
            derivative_spectrum: backend.create_surface(size, "derivative spectrum")?,
            height: backend.create_surface(size, "height map")?,
            displacement: backend.create_surface(size, "displacement map")?,
            normal: backend.create_surface(size, "normal map")?,
            foam: [
                backend.create_surface(size, "foam map a")?,
                backend.create_surface(size, "foam map b")?,
            ],
        };
        Ok(Self {
            surfaces,
            displacement_fft: FftEngine::new(backend, size)?,
            derivative_fft: FftEngine::new(backend, size)?,
        })
    }

    fn release<B: ComputeBackend>(self, backend: &mut B) {
        let s = &self.surfaces;
        for id in [
            s.noise,
            s.h0,
            s.displacement_spectrum,
            s.derivative_spectrum,
            s.height,
            s.displacement,
            s.normal,
            s.foam[0],
            s.foam[1],
        ] {
            backend.destroy_surface(id);
        }
        self.displacement_fft.destroy(backend);
        self.derivative_fft.destroy(backend);
    }
}

/// One simulated ocean patch.
///
/// Per tick: propagate H₀ to H(k,t), inverse-transform the packed
/// displacement and derivative spectra, then combine them into the height,
/// displacement, normal and foam maps. Every surface is owned exclusively
/// by this instance.
pub struct OceanSimulation<B: ComputeBackend> {
    backend: B,
    params: OceanParams,
    clamps: Vec<Clamp>,
    config: SimulationConfig,
    config_clamps: Vec<Clamp>,
    /// Accumulated in f64 so long runs keep phase precision
    time: f64,
    spectrum_dirty: bool,
    noise: NoiseField,
    resources: Resources,
    /// Index into `surfaces.foam` holding the latest foam
    foam_current: usize,
}

impl<B: ComputeBackend> OceanSimulation<B> {
    /// Build a simulation and generate its initial spectrum.
    ///
    /// Fails with a configuration error for an invalid texture size.
    pub fn new(mut backend: B, params: OceanParams, config: SimulationConfig) -> OceanResult<Self> {
        if let Err(e) = config.validate() {
            log::error!("Ocean simulation not started: {}", e);
            return Err(e);
        }

        let (params, clamps) = params.sanitized();
        let (config, config_clamps) = config.sanitized();
        let size = config.texture_size;
        let noise = NoiseField::generate(size, config.noise_seed)?;
        let resources = Resources::create(&mut backend, size)?;

        let mut sim = Self {
            backend,
            params,
            clamps,
            config,
            config_clamps,
            time: 0.0,
            spectrum_dirty: true,
            noise,
            resources,
            foam_current: 0,
        };
        sim.upload_noise()?;
        sim.regenerate_spectrum()?;

        log::info!(
            "Ocean simulation ready: {}x{} over {} m",
            size,
            size,
            sim.params.patch_size_m
        );
        Ok(sim)
    }

    fn uniforms(&self, dt: f32) -> OceanUniforms {
        OceanUniforms::new(&self.params, &self.config, self.time as f32, dt)
    }

    fn upload_noise(&mut self) -> OceanResult<()> {
        self.backend
            .write_surface(self.resources.surfaces.noise, self.noise.texels())
    }

    /// Regenerate H₀ right away (construction, resize)
    fn regenerate_spectrum(&mut self) -> OceanResult<()> {
        let u = self.uniforms(0.0);
        self.backend.write_uniforms(&u)?;
        self.record_spectrum()?;
        self.backend.submit();
        Ok(())
    }

    /// Record GenerateSpectrum; the parameter record must be current
    fn record_spectrum(&mut self) -> OceanResult<()> {
        let size = self.config.texture_size;
        let s = &self.resources.surfaces;
        let reads = [s.noise];
        let writes = [s.h0];
        self.backend
            .dispatch(&Dispatch::per_texel(Kernel::GenerateSpectrum, size, &reads, &writes))?;
        self.backend.barrier();
        self.spectrum_dirty = false;
        log::debug!("Regenerated H0 spectrum");
        Ok(())
    }

    /// Advance simulated time by `dt` seconds and record one full tick
    pub fn advance(&mut self, dt: f32) -> OceanResult<()> {
        let dt = if dt.is_finite() && dt >= 0.0 {
            dt
        } else {
            log::warn!("Clamped timestep {} to 0", dt);
            0.0
        };
        self.time += f64::from(dt);
        let size = self.config.texture_size;

        let u = self.uniforms(dt);
        self.backend.write_uniforms(&u)?;

        if self.spectrum_dirty {
            self.record_spectrum()?;
        }

        let r = &self.resources;
        let s = &r.surfaces;
        let reads = [s.h0];
        let writes = [s.displacement_spectrum, s.derivative_spectrum];
        self.backend
            .dispatch(&Dispatch::per_texel(Kernel::PropagateWaves, size, &reads, &writes))?;
        self.backend.barrier();

        let displacement = r
            .displacement_fft
            .transform(&mut self.backend, s.displacement_spectrum, FftDirection::Inverse)?
            .surface(s.displacement_spectrum, &r.displacement_fft);
        let derivatives = r
            .derivative_fft
            .transform(&mut self.backend, s.derivative_spectrum, FftDirection::Inverse)?
            .surface(s.derivative_spectrum, &r.derivative_fft);

        // Previous foam is read before the other buffer is written
        let previous_foam = s.foam[self.foam_current];
        let next_foam = s.foam[1 - self.foam_current];
        let reads = [displacement, derivatives, previous_foam];
        let writes = [s.height, s.displacement, s.normal, next_foam];
        self.backend
            .dispatch(&Dispatch::per_texel(Kernel::CombineFields, size, &reads, &writes))?;
        self.backend.barrier();
        self.foam_current = 1 - self.foam_current;

        self.backend.submit();
        Ok(())
    }

    /// Regenerate H₀ before the next propagation
    pub fn mark_spectrum_dirty(&mut self) {
        self.spectrum_dirty = true;
    }

    pub fn is_spectrum_dirty(&self) -> bool {
        self.spectrum_dirty
    }

    /// Replace the physical parameters (clamped) and mark the spectrum dirty
    pub fn set_params(&mut self, params: OceanParams) {
        let (params, clamps) = params.sanitized();
        self.params = params;
        self.clamps = clamps;
        self.mark_spectrum_dirty();
    }

    /// Active (sanitized) parameters
    pub fn params(&self) -> &OceanParams {
        &self.params
    }

    /// Clamps applied to the last parameters supplied
    pub fn clamps(&self) -> &[Clamp] {
        &self.clamps
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Clamps applied to the configuration at construction
    pub fn config_clamps(&self) -> &[Clamp] {
        &self.config_clamps
    }

    /// Simulated time in seconds
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn size(&self) -> u32 {
        self.config.texture_size
    }

    /// Rebuild every surface for a new texture size.
    ///
    /// Noise is regenerated for the new size, H₀ is regenerated and foam
    /// starts from zero. Simulated time is kept. On error the simulation
    /// keeps its previous size.
    pub fn resize(&mut self, size: u32) -> OceanResult<()> {
        let config = SimulationConfig {
            texture_size: size,
            ..self.config.clone()
        };
        if let Err(e) = config.validate() {
            log::error!("Ocean resize rejected: {}", e);
            return Err(e);
        }

        let noise = NoiseField::generate(size, config.noise_seed)?;
        let fresh = Resources::create(&mut self.backend, size)?;
        let old = std::mem::replace(&mut self.resources, fresh);
        old.release(&mut self.backend);

        self.config = config;
        self.noise = noise;
        self.foam_current = 0;

        self.upload_noise()?;
        self.regenerate_spectrum()?;
        log::info!("Ocean simulation resized to {}x{}", size, size);
        Ok(())
    }

    pub fn height_map(&self) -> SurfaceId {
        self.resources.surfaces.height
    }

    pub fn displacement_map(&self) -> SurfaceId {
        self.resources.surfaces.displacement
    }

    pub fn normal_map(&self) -> SurfaceId {
        self.resources.surfaces.normal
    }

    /// Foam surface written by the latest tick
    pub fn foam_map(&self) -> SurfaceId {
        self.resources.surfaces.foam[self.foam_current]
    }

    pub fn initial_spectrum(&self) -> SurfaceId {
        self.resources.surfaces.h0
    }

    pub fn noise(&self) -> &NoiseField {
        &self.noise
    }

    /// Read a field back to host memory (flushes recorded work)
    pub fn read_field(&mut self, field: DerivedField) -> OceanResult<Vec<Texel>> {
        let surface = match field {
            DerivedField::InitialSpectrum => self.initial_spectrum(),
            DerivedField::Height => self.height_map(),
            DerivedField::Displacement => self.displacement_map(),
            DerivedField::Normal => self.normal_map(),
            DerivedField::Foam => self.foam_map(),
        };
        self.backend.read_surface(surface)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Release every surface and pass table, returning the backend
    pub fn destroy(self) -> B {
        let Self {
            mut backend,
            resources,
            ..
        } = self;
        resources.release(&mut backend);
        log::debug!("Ocean simulation destroyed");
        backend
    }
}

impl<B: ComputeBackend> std::fmt::Debug for OceanSimulation<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OceanSimulation")
            .field("size", &self.config.texture_size)
            .field("time", &self.time)
            .field("spectrum_dirty", &self.spectrum_dirty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;
    use crate::error::OceanError;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            texture_size: 16,
            ..Default::default()
        }
    }

    fn small_sim() -> OceanSimulation<CpuBackend> {
        OceanSimulation::new(CpuBackend::new(), OceanParams::default(), small_config()).unwrap()
    }

    #[test]
    fn test_rejects_invalid_size() {
        let config = SimulationConfig {
            texture_size: 24,
            ..Default::default()
        };
        let err =
            OceanSimulation::new(CpuBackend::new(), OceanParams::default(), config).unwrap_err();
        assert!(matches!(err, OceanError::Configuration(_)));
    }

    #[test]
    fn test_construction_generates_spectrum() {
        let mut sim = small_sim();
        assert!(!sim.is_spectrum_dirty());

        let h0 = sim.read_field(DerivedField::InitialSpectrum).unwrap();
        assert!(h0.iter().any(|t| t[0] != 0.0));
        // DC bin
        assert_eq!(h0[8 * 16 + 8], [0.0; 4]);
    }

    #[test]
    fn test_advance_accumulates_time_and_flips_foam() {
        let mut sim = small_sim();
        let first = sim.foam_map();
        sim.advance(0.5).unwrap();
        let second = sim.foam_map();
        sim.advance(0.25).unwrap();

        assert_ne!(first, second);
        assert_eq!(sim.foam_map(), first);
        assert!((sim.time() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_negative_timestep_is_clamped() {
        let mut sim = small_sim();
        sim.advance(-1.0).unwrap();
        assert_eq!(sim.time(), 0.0);
    }

    #[test]
    fn test_set_params_marks_dirty_and_clamps() {
        let mut sim = small_sim();
        sim.set_params(OceanParams {
            depth_m: -3.0,
            ..Default::default()
        });
        assert!(sim.is_spectrum_dirty());
        assert!(sim.params().depth_m > 0.0);
        assert!(!sim.clamps().is_empty());

        sim.advance(0.1).unwrap();
        assert!(!sim.is_spectrum_dirty());
    }

    #[test]
    fn test_bad_tunables_are_clamped_not_rejected() {
        let config = SimulationConfig {
            displacement_scale: f32::NAN,
            foam_decay_rate: -5.0,
            ..small_config()
        };
        let mut sim =
            OceanSimulation::new(CpuBackend::new(), OceanParams::default(), config).unwrap();

        assert_eq!(sim.config().displacement_scale, 1.0);
        assert_eq!(sim.config().foam_decay_rate, 0.0);
        assert_eq!(sim.config_clamps().len(), 2);
        sim.advance(0.1).unwrap();
        assert!(sim
            .read_field(DerivedField::Displacement)
            .unwrap()
            .iter()
            .flatten()
            .all(|v| v.is_finite()));
    }

    #[test]
    fn test_time_keeps_precision_over_long_runs() {
        let mut sim = small_sim();
        for _ in 0..100_000 {
            sim.time += 1.0 / 60.0;
        }
        sim.advance(1.0 / 60.0).unwrap();
        assert!((sim.time() - 100_001.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_destroy_releases_everything() {
        let sim = small_sim();
        let backend = sim.destroy();
        assert_eq!(backend.surface_count(), 0);
    }
}

//! Parameter records shared between CPU and GPU.
//!
//! Both records are `#[repr(C)]` and consist only of 4-byte scalars, so the
//! WGSL structs in `shaders/*.wgsl` follow the same field order with no
//! implicit padding. Sizes are multiples of 16 bytes as uniform buffers
//! require. Bump [`UNIFORM_LAYOUT_VERSION`] whenever a field moves.

use bytemuck::{Pod, Zeroable};

use crate::error::{OceanError, OceanResult};
use crate::params::{OceanParams, SimulationConfig};

/// Layout version written into every [`OceanUniforms`] record
pub const UNIFORM_LAYOUT_VERSION: u32 = 2;

/// Flag bit: wavelength bounding enabled
pub const FLAG_WAVELENGTH_BOUNDS: u32 = 1;

/// Spectrum, propagation and combine parameters (96 bytes)
///
/// Field order:
/// 0 version, size, model, flags,
/// 16 patch_size, gravity, depth, wind_speed,
/// 32 wind_direction, fetch, swell, spread,
/// 48 amplitude_scale, peak_enhancement, wavelength_min, wavelength_max,
/// 64 time, delta_time, displacement_scale, foam_decay,
/// 80 foam_threshold, foam_gain, _pad0, _pad1
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct OceanUniforms {
    pub version: u32,
    pub size: u32,
    pub model: u32,
    pub flags: u32,

    pub patch_size: f32,
    pub gravity: f32,
    pub depth: f32,
    pub wind_speed: f32,

    pub wind_direction: f32,
    pub fetch: f32,
    pub swell: f32,
    pub spread: f32,

    pub amplitude_scale: f32,
    pub peak_enhancement: f32,
    pub wavelength_min: f32,
    pub wavelength_max: f32,

    pub time: f32,
    pub delta_time: f32,
    pub displacement_scale: f32,
    /// Multiplicative foam decay for this tick, e^(-rate·dt)
    pub foam_decay: f32,

    pub foam_threshold: f32,
    pub foam_gain: f32,
    pub _pad0: f32,
    pub _pad1: f32,
}

impl OceanUniforms {
    /// Build the record for one tick. `params` must already be sanitized.
    pub fn new(params: &OceanParams, config: &SimulationConfig, time: f32, dt: f32) -> Self {
        let (flags, wavelength_min, wavelength_max) = match params.wavelength_bounds_m {
            Some((min, max)) => (FLAG_WAVELENGTH_BOUNDS, min, max),
            None => (0, 0.0, f32::MAX),
        };

        Self {
            version: UNIFORM_LAYOUT_VERSION,
            size: config.texture_size,
            model: params.model.id(),
            flags,
            patch_size: params.patch_size_m,
            gravity: params.gravity_m_per_s2,
            depth: params.depth_m,
            wind_speed: params.wind_speed_m_per_s,
            wind_direction: params.wind_direction_rad,
            fetch: params.fetch_m,
            swell: params.swell,
            spread: params.directional_spread,
            amplitude_scale: params.amplitude_scale,
            peak_enhancement: params.peak_enhancement,
            wavelength_min,
            wavelength_max,
            time,
            delta_time: dt,
            displacement_scale: config.displacement_scale,
            foam_decay: config.foam_decay_factor(dt),
            foam_threshold: config.foam_threshold,
            foam_gain: config.foam_gain,
            _pad0: 0.0,
            _pad1: 0.0,
        }
    }

    pub fn bounded_wavelengths(&self) -> bool {
        self.flags & FLAG_WAVELENGTH_BOUNDS != 0
    }

    /// Checked at upload time by every backend
    pub fn validate(&self) -> OceanResult<()> {
        if self.version != UNIFORM_LAYOUT_VERSION {
            return Err(OceanError::invariant(format!(
                "uniform layout version {} does not match {}",
                self.version, UNIFORM_LAYOUT_VERSION
            )));
        }
        if !self.size.is_power_of_two() || self.size < 4 {
            return Err(OceanError::invariant(format!(
                "uniform record carries invalid size {}",
                self.size
            )));
        }
        let floats = [
            self.patch_size,
            self.gravity,
            self.depth,
            self.wind_speed,
            self.wind_direction,
            self.fetch,
            self.swell,
            self.spread,
            self.amplitude_scale,
            self.peak_enhancement,
            self.wavelength_min,
            self.time,
            self.delta_time,
            self.displacement_scale,
            self.foam_decay,
            self.foam_threshold,
            self.foam_gain,
        ];
        if floats.iter().any(|v| !v.is_finite()) {
            return Err(OceanError::invariant(
                "uniform record contains a non-finite value",
            ));
        }
        Ok(())
    }
}

/// One row of the FFT pass table (16 bytes)
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct FftPassUniform {
    pub pass_index: u32,
    /// 1 for column passes, 0 otherwise
    pub vertical: u32,
    pub size: u32,
    /// 1 for the inverse transform (positive twiddle exponent)
    pub inverse: u32,
}

const _: () = assert!(std::mem::size_of::<OceanUniforms>() == 96);
const _: () = assert!(std::mem::size_of::<FftPassUniform>() == 16);

//! Physical ocean parameters driving spectrum generation and propagation.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::OceanResult;

/// Which frequency spectrum shapes the initial amplitudes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpectrumModel {
    /// Fetch-limited JONSWAP spectrum with TMA depth attenuation
    Jonswap,
    /// Classic Phillips spectrum (wind speed and direction only).
    ///
    /// Its directional factor is the built-in |k̂·ŵ|², so `swell`,
    /// `directional_spread`, `fetch`, `depth` and `peak_enhancement` have no
    /// effect under this model.
    Phillips,
}

impl SpectrumModel {
    /// Numeric id used by the GPU parameter record
    pub fn id(self) -> u32 {
        match self {
            SpectrumModel::Jonswap => 0,
            SpectrumModel::Phillips => 1,
        }
    }
}

/// Ocean physics parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OceanParams {
    /// Wind speed 10m above the surface (meters per second)
    pub wind_speed_m_per_s: f32,

    /// Wind direction, angle from +X towards +Z (radians)
    pub wind_direction_rad: f32,

    /// Gravitational acceleration (m/s²)
    pub gravity_m_per_s2: f32,

    /// Water depth (meters). Large values approach the deep-water relation.
    pub depth_m: f32,

    /// Distance over which the wind has blown (meters)
    pub fetch_m: f32,

    /// Fraction of energy spread isotropically as swell (0..1)
    pub swell: f32,

    /// Multiplier on the directional spreading power (0 = isotropic wind sea)
    pub directional_spread: f32,

    /// Side length of the simulated square patch (meters)
    pub patch_size_m: f32,

    /// Inclusive (min, max) wavelength band kept by this patch (meters)
    pub wavelength_bounds_m: Option<(f32, f32)>,

    /// Overall amplitude multiplier (dimensionless)
    pub amplitude_scale: f32,

    /// JONSWAP peak enhancement factor γ
    pub peak_enhancement: f32,

    /// Spectrum shape
    pub model: SpectrumModel,
}

impl Default for OceanParams {
    fn default() -> Self {
        Self {
            wind_speed_m_per_s: 10.0,
            wind_direction_rad: 0.0,
            gravity_m_per_s2: 9.81,
            depth_m: 500.0,
            fetch_m: 100_000.0,
            swell: 0.2,
            directional_spread: 1.0,
            patch_size_m: 250.0,
            wavelength_bounds_m: None,
            amplitude_scale: 1.0,
            peak_enhancement: 3.3,
            model: SpectrumModel::Jonswap,
        }
    }
}

/// A parameter that was moved into its safe domain
#[derive(Debug, Clone, PartialEq)]
pub struct Clamp {
    pub field: &'static str,
    pub requested: f32,
    pub applied: f32,
}

/// Clamp `value` to at least `min`, replacing non-finite values by `fallback`.
pub(super) fn clamp_min(
    field: &'static str,
    value: &mut f32,
    min: f32,
    fallback: f32,
    clamps: &mut Vec<Clamp>,
) {
    let requested = *value;
    let applied = if !requested.is_finite() {
        fallback
    } else {
        requested.max(min)
    };
    if applied != requested {
        *value = applied;
        clamps.push(Clamp {
            field,
            requested,
            applied,
        });
    }
}

impl OceanParams {
    /// Return a copy with every field moved into its safe domain.
    ///
    /// Extreme inputs are clamped instead of rejected so that no NaN/Inf
    /// reaches the spectrum. Every clamp is logged at `warn` level and
    /// returned so callers can surface it.
    pub fn sanitized(&self) -> (OceanParams, Vec<Clamp>) {
        let defaults = OceanParams::default();
        let mut p = self.clone();
        let mut clamps = Vec::new();

        clamp_min(
            "wind_speed_m_per_s",
            &mut p.wind_speed_m_per_s,
            0.1,
            defaults.wind_speed_m_per_s,
            &mut clamps,
        );
        clamp_min(
            "wind_direction_rad",
            &mut p.wind_direction_rad,
            f32::MIN,
            defaults.wind_direction_rad,
            &mut clamps,
        );
        clamp_min(
            "gravity_m_per_s2",
            &mut p.gravity_m_per_s2,
            0.01,
            defaults.gravity_m_per_s2,
            &mut clamps,
        );
        clamp_min("depth_m", &mut p.depth_m, 0.01, defaults.depth_m, &mut clamps);
        clamp_min("fetch_m", &mut p.fetch_m, 1.0, defaults.fetch_m, &mut clamps);
        clamp_min("swell", &mut p.swell, 0.0, defaults.swell, &mut clamps);
        if p.swell > 1.0 {
            clamps.push(Clamp {
                field: "swell",
                requested: p.swell,
                applied: 1.0,
            });
            p.swell = 1.0;
        }
        clamp_min(
            "directional_spread",
            &mut p.directional_spread,
            0.0,
            defaults.directional_spread,
            &mut clamps,
        );
        clamp_min(
            "patch_size_m",
            &mut p.patch_size_m,
            0.01,
            defaults.patch_size_m,
            &mut clamps,
        );
        clamp_min(
            "amplitude_scale",
            &mut p.amplitude_scale,
            0.0,
            defaults.amplitude_scale,
            &mut clamps,
        );
        clamp_min(
            "peak_enhancement",
            &mut p.peak_enhancement,
            1.0,
            defaults.peak_enhancement,
            &mut clamps,
        );

        if let Some((mut min, mut max)) = p.wavelength_bounds_m {
            clamp_min("wavelength_min_m", &mut min, 0.0, 0.0, &mut clamps);
            clamp_min("wavelength_max_m", &mut max, 0.0, f32::MAX, &mut clamps);
            if max < min {
                clamps.push(Clamp {
                    field: "wavelength_max_m",
                    requested: max,
                    applied: min,
                });
                std::mem::swap(&mut min, &mut max);
            }
            p.wavelength_bounds_m = Some((min, max));
        }

        for clamp in &clamps {
            log::warn!(
                "Clamped ocean parameter {}: requested {}, using {}",
                clamp.field,
                clamp.requested,
                clamp.applied
            );
        }

        (p, clamps)
    }

    /// Wind direction as a unit vector in the XZ plane
    pub fn wind_direction(&self) -> glam::Vec2 {
        glam::Vec2::from_angle(self.wind_direction_rad)
    }

    /// Load parameters from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> OceanResult<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save parameters to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> OceanResult<()> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        Ok(())
    }
}

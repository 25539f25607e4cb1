//! Simulation-instance configuration (texture size, seed, foam tuning).

use serde::{Deserialize, Serialize};

use super::ocean::clamp_min;
use super::Clamp;
use crate::error::{validate_texture_size, OceanResult};

/// Per-instance simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Texture side length N (must be power of 2, at least 4)
    pub texture_size: u32,

    /// Seed for the Gaussian noise field
    pub noise_seed: u64,

    /// Horizontal displacement multiplier λ ("choppiness")
    pub displacement_scale: f32,

    /// Foam decay rate (1/seconds). Foam falls by e^(-rate·dt) per tick.
    pub foam_decay_rate: f32,

    /// Jacobian value below which foam is injected (0 = folded surface)
    pub foam_threshold: f32,

    /// Foam injected per unit of jacobian below the threshold
    pub foam_gain: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            texture_size: 256,
            noise_seed: 42,
            displacement_scale: 1.0,
            foam_decay_rate: 1.5,
            foam_threshold: 0.0,
            foam_gain: 1.0,
        }
    }
}

impl SimulationConfig {
    /// Validate construction-time configuration
    pub fn validate(&self) -> OceanResult<()> {
        validate_texture_size(self.texture_size)
    }

    /// Return a copy with the tunables moved into their safe domain.
    ///
    /// Like [`crate::params::OceanParams::sanitized`], out-of-domain values
    /// are clamped and logged at `warn`, never rejected. Only the texture
    /// size is a configuration error (see [`SimulationConfig::validate`]).
    pub fn sanitized(&self) -> (SimulationConfig, Vec<Clamp>) {
        let defaults = SimulationConfig::default();
        let mut c = self.clone();
        let mut clamps = Vec::new();

        clamp_min(
            "displacement_scale",
            &mut c.displacement_scale,
            0.0,
            defaults.displacement_scale,
            &mut clamps,
        );
        clamp_min(
            "foam_decay_rate",
            &mut c.foam_decay_rate,
            0.0,
            defaults.foam_decay_rate,
            &mut clamps,
        );
        clamp_min(
            "foam_threshold",
            &mut c.foam_threshold,
            f32::MIN,
            defaults.foam_threshold,
            &mut clamps,
        );
        clamp_min("foam_gain", &mut c.foam_gain, 0.0, defaults.foam_gain, &mut clamps);

        for clamp in &clamps {
            log::warn!(
                "Clamped simulation setting {}: requested {}, using {}",
                clamp.field,
                clamp.requested,
                clamp.applied
            );
        }

        (c, clamps)
    }

    /// Number of butterfly passes per axis (log₂N)
    pub fn log2_size(&self) -> u32 {
        self.texture_size.trailing_zeros()
    }

    /// Foam decay factor applied over one tick of length `dt_s`.
    /// Expects a sanitized config.
    pub fn foam_decay_factor(&self, dt_s: f32) -> f32 {
        (-self.foam_decay_rate * dt_s.max(0.0)).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_non_power_of_two() {
        let config = SimulationConfig {
            texture_size: 300,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_foam_decay_factor() {
        let config = SimulationConfig::default();
        assert_eq!(config.foam_decay_factor(0.0), 1.0);
        let f = config.foam_decay_factor(0.1);
        assert!(f > 0.0 && f < 1.0);
        assert!((f - (-0.15f32).exp()).abs() < 1e-6);
    }

    #[test]
    fn test_defaults_need_no_clamping() {
        let (config, clamps) = SimulationConfig::default().sanitized();
        assert!(clamps.is_empty());
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn test_negative_decay_rate_is_clamped_and_reported() {
        let config = SimulationConfig {
            foam_decay_rate: -5.0,
            foam_gain: -1.0,
            ..Default::default()
        };
        let (clean, clamps) = config.sanitized();

        assert_eq!(clean.foam_decay_rate, 0.0);
        assert_eq!(clean.foam_gain, 0.0);
        assert_eq!(clamps.len(), 2);
        assert_eq!(clamps[0].field, "foam_decay_rate");
        assert_eq!(clamps[0].requested, -5.0);
        assert_eq!(clean.foam_decay_factor(1.0), 1.0);
    }

    #[test]
    fn test_non_finite_tunables_fall_back_to_defaults() {
        let config = SimulationConfig {
            displacement_scale: f32::NAN,
            foam_threshold: f32::INFINITY,
            ..Default::default()
        };
        let (clean, clamps) = config.sanitized();

        assert_eq!(clean.displacement_scale, 1.0);
        assert_eq!(clean.foam_threshold, 0.0);
        assert_eq!(clamps.len(), 2);
        assert!(clean.validate().is_ok());
    }

    #[test]
    fn test_log2_size() {
        let config = SimulationConfig {
            texture_size: 512,
            ..Default::default()
        };
        assert_eq!(config.log2_size(), 9);
    }
}

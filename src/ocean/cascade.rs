//! Several patches of different physical size covering disjoint wavelength
//! bands, so detail and swell come from different simulations without
//! counting any band twice.

use super::simulation::OceanSimulation;
use crate::backend::ComputeBackend;
use crate::error::{validate_texture_size, OceanError, OceanResult};
use crate::params::{OceanParams, SimulationConfig};

/// Smallest f32 strictly greater than a positive finite `value`
fn next_above(value: f32) -> f32 {
    f32::from_bits(value.to_bits() + 1)
}

/// Assign each patch an inclusive wavelength band `(min, max)` in meters.
///
/// Patches are ordered largest first. A patch keeps every wavelength its
/// grid resolves along an axis, down to L / (N/2 - 1); the next smaller
/// patch takes everything at or below that boundary. The largest patch is
/// unbounded above and the smallest reaches down to zero. Bands are returned
/// in the order of `patch_sizes`.
pub fn cascade_wavelength_bounds(patch_sizes: &[f32], size: u32) -> OceanResult<Vec<(f32, f32)>> {
    validate_texture_size(size)?;
    if patch_sizes.is_empty() {
        return Err(OceanError::configuration("at least one cascade is required"));
    }
    if patch_sizes.iter().any(|l| !l.is_finite() || *l <= 0.0) {
        return Err(OceanError::configuration(format!(
            "cascade patch sizes must be positive, got {:?}",
            patch_sizes
        )));
    }

    let mut order: Vec<usize> = (0..patch_sizes.len()).collect();
    order.sort_by(|a, b| patch_sizes[*b].total_cmp(&patch_sizes[*a]));
    for pair in order.windows(2) {
        if patch_sizes[pair[0]] == patch_sizes[pair[1]] {
            return Err(OceanError::configuration(format!(
                "duplicate cascade patch size {}",
                patch_sizes[pair[0]]
            )));
        }
    }

    let shortest_cycles = (size / 2 - 1) as f32;
    let mut bounds = vec![(0.0, f32::MAX); patch_sizes.len()];
    let mut upper = f32::MAX;
    for (rank, &i) in order.iter().enumerate() {
        let patch = patch_sizes[i];
        match order.get(rank + 1) {
            Some(&next) => {
                let boundary = patch / shortest_cycles;
                if patch_sizes[next] < boundary {
                    log::warn!(
                        "Cascade {} m cannot reach wavelengths between {} m and {} m",
                        patch_sizes[next],
                        patch_sizes[next],
                        boundary
                    );
                }
                bounds[i] = (next_above(boundary), upper);
                upper = boundary;
            }
            None => bounds[i] = (0.0, upper),
        }
    }
    Ok(bounds)
}

/// A set of simulations sharing one configuration but differing in patch size
pub struct OceanCascades<B: ComputeBackend> {
    cascades: Vec<OceanSimulation<B>>,
    patch_sizes: Vec<f32>,
}

impl<B: ComputeBackend> OceanCascades<B> {
    /// One simulation per `(backend, patch size)` pair
    pub fn new(
        backends: Vec<B>,
        params: OceanParams,
        config: SimulationConfig,
        patch_sizes: &[f32],
    ) -> OceanResult<Self> {
        if backends.len() != patch_sizes.len() {
            return Err(OceanError::configuration(format!(
                "{} backends for {} cascades",
                backends.len(),
                patch_sizes.len()
            )));
        }
        let bounds = cascade_wavelength_bounds(patch_sizes, config.texture_size)?;

        let mut cascades = Vec::with_capacity(patch_sizes.len());
        for ((backend, &patch), &band) in backends.into_iter().zip(patch_sizes).zip(&bounds) {
            let cascade_params = Self::cascade_params(&params, patch, band);
            cascades.push(OceanSimulation::new(backend, cascade_params, config.clone())?);
            log::info!("Cascade {} m covers wavelengths {:?}", patch, band);
        }

        Ok(Self {
            cascades,
            patch_sizes: patch_sizes.to_vec(),
        })
    }

    fn cascade_params(params: &OceanParams, patch: f32, band: (f32, f32)) -> OceanParams {
        OceanParams {
            patch_size_m: patch,
            wavelength_bounds_m: Some(band),
            ..params.clone()
        }
    }

    /// Advance every cascade by the same timestep
    pub fn advance(&mut self, dt: f32) -> OceanResult<()> {
        for cascade in &mut self.cascades {
            cascade.advance(dt)?;
        }
        Ok(())
    }

    /// Apply new physical parameters to every cascade, keeping each one's
    /// patch size and wavelength band
    pub fn set_params(&mut self, params: OceanParams) -> OceanResult<()> {
        let size = self
            .cascades
            .first()
            .map(|c| c.size())
            .ok_or_else(|| OceanError::invariant("cascade set is empty"))?;
        let bounds = cascade_wavelength_bounds(&self.patch_sizes, size)?;
        let targets = self.cascades.iter_mut().zip(&self.patch_sizes).zip(&bounds);
        for ((cascade, &patch), &band) in targets {
            cascade.set_params(Self::cascade_params(&params, patch, band));
        }
        Ok(())
    }

    pub fn cascades(&self) -> &[OceanSimulation<B>] {
        &self.cascades
    }

    pub fn cascades_mut(&mut self) -> &mut [OceanSimulation<B>] {
        &mut self.cascades
    }

    pub fn patch_sizes(&self) -> &[f32] {
        &self.patch_sizes
    }

    /// Tear down every cascade and hand back the backends
    pub fn destroy(self) -> Vec<B> {
        self.cascades.into_iter().map(OceanSimulation::destroy).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;

    #[test]
    fn test_bands_are_contiguous_and_disjoint() {
        let bounds = cascade_wavelength_bounds(&[20.0, 250.0, 4.0], 16).unwrap();

        // Largest patch is unbounded above, smallest reaches zero
        assert_eq!(bounds[1].1, f32::MAX);
        assert_eq!(bounds[2].0, 0.0);

        // 250 m hands over at 250 / 7, 20 m at 20 / 7
        assert_eq!(bounds[0].1, 250.0 / 7.0);
        assert!(bounds[1].0 > bounds[0].1);
        assert_eq!(bounds[2].1, 20.0 / 7.0);
        assert!(bounds[0].0 > bounds[2].1);
        for (min, max) in &bounds {
            assert!(min < max);
        }
    }

    #[test]
    fn test_invalid_cascades_rejected() {
        assert!(cascade_wavelength_bounds(&[], 16).is_err());
        assert!(cascade_wavelength_bounds(&[10.0, 10.0], 16).is_err());
        assert!(cascade_wavelength_bounds(&[10.0, -1.0], 16).is_err());
        assert!(cascade_wavelength_bounds(&[10.0], 12).is_err());
    }

    #[test]
    fn test_single_cascade_is_unbounded() {
        assert_eq!(
            cascade_wavelength_bounds(&[100.0], 8).unwrap(),
            vec![(0.0, f32::MAX)]
        );
    }

    #[test]
    fn test_cascades_advance_together() {
        let config = SimulationConfig {
            texture_size: 8,
            ..Default::default()
        };
        let mut cascades = OceanCascades::new(
            vec![CpuBackend::new(), CpuBackend::new()],
            OceanParams::default(),
            config,
            &[200.0, 30.0],
        )
        .unwrap();

        cascades.advance(0.1).unwrap();
        for cascade in cascades.cascades() {
            assert!((cascade.time() - 0.1).abs() < 1e-6);
            assert!(cascade.params().wavelength_bounds_m.is_some());
        }

        let backends = cascades.destroy();
        assert!(backends.iter().all(|b| b.surface_count() == 0));
    }

    #[test]
    fn test_backend_count_must_match() {
        let result = OceanCascades::new(
            vec![CpuBackend::new()],
            OceanParams::default(),
            SimulationConfig::default(),
            &[200.0, 30.0],
        );
        assert!(result.is_err());
    }
}

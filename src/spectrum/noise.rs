//! Gaussian noise field seeding the initial spectrum.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use crate::backend::Texel;
use crate::error::{validate_texture_size, OceanResult};

/// N×N complex standard-normal samples, one per spectrum bin.
///
/// Each component is scaled by 1/√2 so the complex magnitude has unit
/// variance. Stored as texels `[re, im, 0, 0]`, row-major (z * N + x).
#[derive(Debug, Clone)]
pub struct NoiseField {
    size: u32,
    seed: u64,
    texels: Vec<Texel>,
}

impl NoiseField {
    /// Generate the field for side length `size`; deterministic per seed
    pub fn generate(size: u32, seed: u64) -> OceanResult<Self> {
        validate_texture_size(size)?;

        let mut rng = StdRng::seed_from_u64(seed);
        let scale = std::f32::consts::FRAC_1_SQRT_2;
        let count = (size * size) as usize;

        let mut texels = Vec::with_capacity(count);
        for _ in 0..count {
            let re: f32 = StandardNormal.sample(&mut rng);
            let im: f32 = StandardNormal.sample(&mut rng);
            texels.push([re * scale, im * scale, 0.0, 0.0]);
        }

        log::debug!("Generated {}x{} noise field (seed {})", size, size, seed);

        Ok(Self { size, seed, texels })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn texels(&self) -> &[Texel] {
        &self.texels
    }
}

//! Time evolution of H₀ and spectral derivation of the companion fields.
//!
//! Eight real spatial fields are produced from one evolved spectrum and
//! packed two per complex channel, so two surfaces carry everything the
//! combiner needs:
//!
//! | surface      | xy             | zw               |
//! |--------------|----------------|------------------|
//! | displacement | Dx + i·h       | Dz + i·∂Dx/∂z    |
//! | derivatives  | ∂h/∂x + i·∂h/∂z | ∂Dx/∂x + i·∂Dz/∂z |
//!
//! Packing is valid because every field's spectrum is Hermitian, so each
//! transforms to a purely real signal.

use glam::Vec2;
use rustfft::num_complex::Complex32;

use super::generator::{dispersion, wave_vector};
use crate::backend::Texel;
use crate::params::OceanUniforms;

/// Frequency-domain fields derived from H(k, t)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpectralFields {
    pub height: Complex32,
    pub displacement_x: Complex32,
    pub displacement_z: Complex32,
    pub slope_x: Complex32,
    pub slope_z: Complex32,
    pub displacement_x_dx: Complex32,
    pub displacement_z_dz: Complex32,
    pub displacement_x_dz: Complex32,
}

/// Texel index of -k for texel (x, z)
pub fn mirrored_index(x: u32, z: u32, size: u32) -> (u32, u32) {
    ((size - x) % size, (size - z) % size)
}

/// H(k,t) = H₀(k)·e^{iωt} + conj(H₀(-k))·e^{-iωt}
pub fn evolve(h0_k: Complex32, h0_minus_k: Complex32, omega: f32, time: f32) -> Complex32 {
    let phase = Complex32::from_polar(1.0, omega * time);
    h0_k * phase + h0_minus_k.conj() * phase.conj()
}

fn times_i(c: Complex32) -> Complex32 {
    Complex32::new(-c.im, c.re)
}

/// Derive slope and displacement spectra from H(k,t)
pub fn spectral_fields(h: Complex32, k: Vec2) -> SpectralFields {
    let k_len = k.length();
    let inv_k = if k_len > 1e-6 { 1.0 / k_len } else { 0.0 };

    // D = i·(k/|k|)·H moves points toward crests under the +i inverse
    // transform; ∂/∂x = i·kx
    let displacement_x = times_i(h) * (k.x * inv_k);
    let displacement_z = times_i(h) * (k.y * inv_k);

    SpectralFields {
        height: h,
        displacement_x,
        displacement_z,
        slope_x: times_i(h) * k.x,
        slope_z: times_i(h) * k.y,
        displacement_x_dx: h * (-k.x * k.x * inv_k),
        displacement_z_dz: h * (-k.y * k.y * inv_k),
        displacement_x_dz: h * (-k.x * k.y * inv_k),
    }
}

impl SpectralFields {
    /// Pack into (displacement texel, derivative texel)
    pub fn pack(&self) -> (Texel, Texel) {
        let a = self.displacement_x + times_i(self.height);
        let b = self.displacement_z + times_i(self.displacement_x_dz);
        let c = self.slope_x + times_i(self.slope_z);
        let d = self.displacement_x_dx + times_i(self.displacement_z_dz);
        ([a.re, a.im, b.re, b.im], [c.re, c.im, d.re, d.im])
    }
}

fn first_complex(t: &Texel) -> Complex32 {
    Complex32::new(t[0], t[1])
}

/// Evolved height spectrum H(k,t) at texel (x, z)
pub fn evolved_height(x: u32, z: u32, h0: &[Texel], u: &OceanUniforms) -> Complex32 {
    let size = u.size;
    let (mx, mz) = mirrored_index(x, z, size);
    let k = wave_vector(x, z, size, u.patch_size);
    let (omega, _) = dispersion(k.length(), u.gravity, u.depth);

    evolve(
        first_complex(&h0[(z * size + x) as usize]),
        first_complex(&h0[(mz * size + mx) as usize]),
        omega,
        u.time,
    )
}

/// Packed (displacement, derivative) texels at (x, z)
pub fn propagate_texel(x: u32, z: u32, h0: &[Texel], u: &OceanUniforms) -> (Texel, Texel) {
    let h = evolved_height(x, z, h0, u);
    let k = wave_vector(x, z, u.size, u.patch_size);
    spectral_fields(h, k).pack()
}

/// Run the propagation kernel over a whole surface
pub fn propagate_waves(
    h0: &[Texel],
    displacement: &mut [Texel],
    derivatives: &mut [Texel],
    u: &OceanUniforms,
) {
    let size = u.size;
    for z in 0..size {
        for x in 0..size {
            let idx = (z * size + x) as usize;
            let (d, s) = propagate_texel(x, z, h0, u);
            displacement[idx] = d;
            derivatives[idx] = s;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirrored_index_wraps() {
        assert_eq!(mirrored_index(0, 0, 8), (0, 0));
        assert_eq!(mirrored_index(5, 4, 8), (3, 4));
        assert_eq!(mirrored_index(1, 7, 8), (7, 1));
    }

    #[test]
    fn test_evolve_at_time_zero() {
        let a = Complex32::new(1.0, 2.0);
        let b = Complex32::new(-0.5, 0.25);
        let h = evolve(a, b, 3.0, 0.0);
        assert_eq!(h, a + b.conj());
    }

    #[test]
    fn test_derived_spectra_are_hermitian() {
        let h = Complex32::new(0.3, -0.7);
        let k = Vec2::new(0.4, -0.2);
        let pos = spectral_fields(h, k);
        let neg = spectral_fields(h.conj(), -k);

        let pairs = [
            (pos.displacement_x, neg.displacement_x),
            (pos.displacement_z, neg.displacement_z),
            (pos.slope_x, neg.slope_x),
            (pos.slope_z, neg.slope_z),
            (pos.displacement_x_dx, neg.displacement_x_dx),
            (pos.displacement_z_dz, neg.displacement_z_dz),
            (pos.displacement_x_dz, neg.displacement_x_dz),
        ];
        for (a, b) in pairs {
            assert!((a - b.conj()).norm() < 1e-6);
        }
    }

    #[test]
    fn test_displacement_points_toward_crests() {
        // Real H along +x: D̂x = i·H, ∂D̂x/∂x = -|k|·H
        let fields = spectral_fields(Complex32::new(2.0, 0.0), Vec2::new(0.5, 0.0));
        assert_eq!(fields.displacement_x, Complex32::new(0.0, 2.0));
        assert_eq!(fields.displacement_x_dx, Complex32::new(-1.0, 0.0));
        assert_eq!(fields.displacement_z, Complex32::new(0.0, 0.0));
    }

    #[test]
    fn test_dc_has_no_derivatives() {
        let fields = spectral_fields(Complex32::new(1.0, 0.0), Vec2::ZERO);
        assert_eq!(fields.displacement_x, Complex32::new(0.0, 0.0));
        assert_eq!(fields.slope_x, Complex32::new(0.0, 0.0));
    }
}

//! Initial spectrum H₀(k) from noise and physical parameters.
//!
//! Texel (x, z) holds wavevector index (m, n) = (x - N/2, z - N/2), so the DC
//! bin sits at the center of the surface. The same math runs in
//! `shaders/spectrum.wgsl`; keep the two in step.

use std::f32::consts::PI;

use glam::Vec2;

use crate::backend::Texel;
use crate::params::OceanUniforms;

/// Phillips constant used by the Phillips model
const PHILLIPS_ALPHA: f32 = 0.0081;

/// Below this angular frequency the spectrum is treated as empty
const MIN_OMEGA: f32 = 1e-4;

/// Signed wavevector index of a texel along one axis
pub fn wave_index(coord: u32, size: u32) -> i32 {
    coord as i32 - (size / 2) as i32
}

/// Wavevector (rad/m) of texel (x, z) for a patch of side `patch_size` meters
pub fn wave_vector(x: u32, z: u32, size: u32, patch_size: f32) -> Vec2 {
    let dk = 2.0 * PI / patch_size;
    Vec2::new(
        wave_index(x, size) as f32 * dk,
        wave_index(z, size) as f32 * dk,
    )
}

/// Angular frequency ω(k) = √(g·k·tanh(k·h)) and its derivative dω/dk
pub fn dispersion(k: f32, gravity: f32, depth: f32) -> (f32, f32) {
    let kh = (k * depth).min(20.0);
    let t = kh.tanh();
    let omega = (gravity * k * t).sqrt();
    if omega <= 0.0 {
        return (0.0, 0.0);
    }
    let sech = 1.0 / kh.cosh();
    let d_omega = gravity * (t + kh * sech * sech) / (2.0 * omega);
    (omega, d_omega)
}

/// JONSWAP peak angular frequency for the given wind and fetch
pub fn peak_omega(u: &OceanUniforms) -> f32 {
    22.0 * (u.gravity * u.gravity / (u.wind_speed * u.fetch)).powf(1.0 / 3.0)
}

/// TMA shallow-water attenuation
fn tma_attenuation(omega: f32, gravity: f32, depth: f32) -> f32 {
    let omega_h = omega * (depth / gravity).sqrt();
    if omega_h <= 1.0 {
        0.5 * omega_h * omega_h
    } else if omega_h < 2.0 {
        1.0 - 0.5 * (2.0 - omega_h) * (2.0 - omega_h)
    } else {
        1.0
    }
}

/// JONSWAP frequency spectrum S(ω) with TMA depth attenuation
pub fn jonswap(omega: f32, u: &OceanUniforms) -> f32 {
    if omega < MIN_OMEGA {
        return 0.0;
    }
    let g = u.gravity;
    let alpha = 0.076 * (u.wind_speed * u.wind_speed / (u.fetch * g)).powf(0.22);
    let omega_p = peak_omega(u);

    let sigma = if omega <= omega_p { 0.07 } else { 0.09 };
    let r = (-(omega - omega_p).powi(2) / (2.0 * sigma * sigma * omega_p * omega_p)).exp();
    let shape = (-1.25 * (omega_p / omega).powi(4)).exp();

    alpha * g * g / omega.powi(5) * shape * u.peak_enhancement.powf(r)
        * tma_attenuation(omega, g, u.depth)
}

/// ln Γ(x) for x > 0 (Stirling series after shifting x above 7)
pub fn ln_gamma(x: f32) -> f32 {
    let mut x = x;
    let mut shift = 0.0;
    while x < 7.0 {
        shift += x.ln();
        x += 1.0;
    }
    let inv = 1.0 / x;
    let inv2 = inv * inv;
    let series = inv * (1.0 / 12.0 - inv2 * (1.0 / 360.0 - inv2 / 1260.0));
    (x - 0.5) * x.ln() - x + 0.5 * (2.0 * PI).ln() + series - shift
}

/// Normalization of |cos(θ/2)|^(2s) over θ ∈ [-π, π]
pub fn cos2s_normalization(s: f32) -> f32 {
    (ln_gamma(s + 1.0) - ln_gamma(s + 0.5)).exp() / (2.0 * PI.sqrt())
}

/// Hasselmann spreading power for frequency ω relative to the peak
fn spread_power(omega: f32, omega_p: f32) -> f32 {
    let ratio = omega / omega_p;
    if omega > omega_p {
        9.77 * ratio.powf(-2.5)
    } else {
        6.97 * ratio.powi(5)
    }
}

/// Directional distribution D(θ, ω), integrating to 1 over θ.
///
/// The wind lobe is the half-angle form |cos((θ - θw)/2)|^(2s), not
/// cos^(2s)(θ - θw): it is positive everywhere except against the wind, so
/// no direction has zero energy and a single normalization covers [-π, π].
pub fn directional_spreading(theta: f32, omega: f32, u: &OceanUniforms) -> f32 {
    let s = u.spread * spread_power(omega, peak_omega(u));
    let lobe = ((theta - u.wind_direction) * 0.5).cos().abs().powf(2.0 * s);
    let wind = cos2s_normalization(s) * lobe;
    (1.0 - u.swell) * wind + u.swell / (2.0 * PI)
}

/// Phillips wavenumber spectrum (Tessendorf) with small-wave suppression
fn phillips(k: Vec2, u: &OceanUniforms) -> f32 {
    let k_len = k.length();
    let l = u.wind_speed * u.wind_speed / u.gravity;
    let k_dot_w = (k / k_len).dot(Vec2::from_angle(u.wind_direction));
    let small = l * 0.001;
    PHILLIPS_ALPHA * (-1.0 / (k_len * l).powi(2)).exp() / k_len.powi(4)
        * k_dot_w
        * k_dot_w
        * (-k_len * k_len * small * small).exp()
}

/// Wavenumber-space energy density S(kx, kz)
pub fn spectrum_density(k: Vec2, u: &OceanUniforms) -> f32 {
    let k_len = k.length();
    if k_len <= 0.0 {
        return 0.0;
    }
    match u.model {
        1 => phillips(k, u),
        _ => {
            let (omega, d_omega) = dispersion(k_len, u.gravity, u.depth);
            let theta = k.y.atan2(k.x);
            jonswap(omega, u) * directional_spreading(theta, omega, u) * d_omega / k_len
        }
    }
}

/// Whether a wavenumber passes the inclusive wavelength band
pub fn wavelength_in_bounds(k_len: f32, u: &OceanUniforms) -> bool {
    if !u.bounded_wavelengths() {
        return true;
    }
    let wavelength = 2.0 * PI / k_len;
    wavelength >= u.wavelength_min && wavelength <= u.wavelength_max
}

/// H₀ for texel (x, z). DC, the Nyquist row/column and out-of-band bins
/// are exactly zero.
pub fn initial_amplitude(x: u32, z: u32, noise: Texel, u: &OceanUniforms) -> Texel {
    let size = u.size;
    let half = size / 2;
    if x == 0 || z == 0 || (x == half && z == half) {
        return [0.0; 4];
    }

    let k = wave_vector(x, z, size, u.patch_size);
    let k_len = k.length();
    if !wavelength_in_bounds(k_len, u) {
        return [0.0; 4];
    }

    let dk = 2.0 * PI / u.patch_size;
    let density = spectrum_density(k, u).max(0.0);
    let amplitude = (density * dk * dk).sqrt() * u.amplitude_scale;
    if !amplitude.is_finite() {
        return [0.0; 4];
    }

    [noise[0] * amplitude, noise[1] * amplitude, 0.0, 0.0]
}

/// Run the spectrum kernel over a whole surface
pub fn generate_spectrum(noise: &[Texel], out: &mut [Texel], u: &OceanUniforms) {
    let size = u.size;
    for z in 0..size {
        for x in 0..size {
            let idx = (z * size + x) as usize;
            out[idx] = initial_amplitude(x, z, noise[idx], u);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{OceanParams, SimulationConfig};

    fn uniforms(params: &OceanParams, size: u32) -> OceanUniforms {
        let config = SimulationConfig {
            texture_size: size,
            ..Default::default()
        };
        OceanUniforms::new(params, &config, 0.0, 0.0)
    }

    #[test]
    fn test_deep_water_dispersion() {
        let (omega, d_omega) = dispersion(0.5, 9.81, 10_000.0);
        assert!((omega - (9.81f32 * 0.5).sqrt()).abs() < 1e-4);
        // Deep water group velocity is half the phase velocity
        assert!((d_omega - 0.5 * omega / 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_shallow_water_is_slower() {
        let (deep, _) = dispersion(0.1, 9.81, 1000.0);
        let (shallow, _) = dispersion(0.1, 9.81, 1.0);
        assert!(shallow < deep);
    }

    #[test]
    fn test_ln_gamma_matches_factorials() {
        assert!(ln_gamma(1.0).abs() < 1e-4);
        assert!((ln_gamma(5.0) - 24f32.ln()).abs() < 1e-4);
        assert!((ln_gamma(0.5) - PI.sqrt().ln()).abs() < 1e-4);
    }

    #[test]
    fn test_spreading_integrates_to_one() {
        let params = OceanParams::default();
        let u = uniforms(&params, 64);
        let omega = peak_omega(&u) * 1.3;

        let steps = 4096;
        let d_theta = 2.0 * PI / steps as f32;
        let total: f32 = (0..steps)
            .map(|i| {
                let theta = -PI + (i as f32 + 0.5) * d_theta;
                directional_spreading(theta, omega, &u) * d_theta
            })
            .sum();

        assert!((total - 1.0).abs() < 0.01, "integral = {}", total);
    }

    #[test]
    fn test_jonswap_peaks_near_peak_frequency() {
        let u = uniforms(&OceanParams::default(), 64);
        let omega_p = peak_omega(&u);
        let at_peak = jonswap(omega_p, &u);
        assert!(at_peak > jonswap(omega_p * 0.6, &u));
        assert!(at_peak > jonswap(omega_p * 2.0, &u));
    }

    #[test]
    fn test_dc_and_nyquist_are_zero() {
        let u = uniforms(&OceanParams::default(), 16);
        let noise = [1.0, 1.0, 0.0, 0.0];

        assert_eq!(initial_amplitude(8, 8, noise, &u), [0.0; 4]);
        assert_eq!(initial_amplitude(0, 5, noise, &u), [0.0; 4]);
        assert_eq!(initial_amplitude(5, 0, noise, &u), [0.0; 4]);
        assert_ne!(initial_amplitude(9, 8, noise, &u), [0.0; 4]);
    }

    #[test]
    fn test_phillips_has_no_energy_across_the_wind() {
        let params = OceanParams {
            model: crate::params::SpectrumModel::Phillips,
            ..Default::default()
        };
        let u = uniforms(&params, 16);
        // (m, n) = (0, 3): perpendicular to a +X wind
        assert_eq!(spectrum_density(wave_vector(8, 11, 16, u.patch_size), &u), 0.0);
        assert!(spectrum_density(wave_vector(11, 8, 16, u.patch_size), &u) > 0.0);
    }
}

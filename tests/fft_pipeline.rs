//! Transform correctness on the CPU backend: normalization, agreement with
//! a reference DFT, forward/inverse round trip, the single-bin cosine and
//! where that cosine folds.

use oceanfft::backend::{ComputeBackend, CpuBackend, Dispatch, Kernel, Texel};
use oceanfft::combine::jacobian;
use oceanfft::fft::{FftDirection, FftEngine, FieldOwner};
use oceanfft::params::{OceanParams, OceanUniforms, SimulationConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustfft::num_complex::Complex32;
use rustfft::FftPlanner;

fn random_field(size: u32, seed: u64) -> Vec<Texel> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..size * size)
        .map(|_| {
            [
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            ]
        })
        .collect()
}

fn transform(size: u32, input: &[Texel], direction: FftDirection) -> Vec<Texel> {
    let mut backend = CpuBackend::new();
    let engine = FftEngine::new(&mut backend, size).unwrap();
    let field = backend.create_surface(size, "field").unwrap();
    backend.write_surface(field, input).unwrap();

    let owner = engine.transform(&mut backend, field, direction).unwrap();
    backend.read_surface(owner.surface(field, &engine)).unwrap()
}

/// Centered-layout inverse 2D DFT of one complex channel via rustfft
fn reference_inverse(size: u32, input: &[Texel], channel: usize) -> Vec<Complex32> {
    let n = size as usize;
    let half = n / 2;
    let mut data = vec![Complex32::new(0.0, 0.0); n * n];
    for z in 0..n {
        for x in 0..n {
            // Texel (x, z) holds index (x - N/2, z - N/2)
            let t = input[((z + half) % n) * n + (x + half) % n];
            data[z * n + x] = Complex32::new(t[channel], t[channel + 1]);
        }
    }

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_inverse(n);
    for row in data.chunks_mut(n) {
        fft.process(row);
    }
    let mut column = vec![Complex32::new(0.0, 0.0); n];
    for x in 0..n {
        for z in 0..n {
            column[z] = data[z * n + x];
        }
        fft.process(&mut column);
        for z in 0..n {
            data[z * n + x] = column[z];
        }
    }
    data
}

#[test]
fn test_dc_bin_gives_constant_field() {
    for size in [4u32, 8, 16, 32] {
        let mut input = vec![[0.0; 4]; (size * size) as usize];
        let center = (size / 2 * size + size / 2) as usize;
        input[center] = [1.0, 0.0, 1.0, 0.0];

        let out = transform(size, &input, FftDirection::Inverse);
        for t in &out {
            assert!((t[0] - 1.0).abs() < 1e-5, "size {}: {:?}", size, t);
            assert!(t[1].abs() < 1e-5);
            assert!((t[2] - 1.0).abs() < 1e-5);
        }
    }
}

#[test]
fn test_matches_reference_dft() {
    let size = 16;
    let input = random_field(size, 7);
    let out = transform(size, &input, FftDirection::Inverse);

    for channel in [0usize, 2] {
        let expected = reference_inverse(size, &input, channel);
        for (i, e) in expected.iter().enumerate() {
            let got = Complex32::new(out[i][channel], out[i][channel + 1]);
            assert!(
                (got - e).norm() < 1e-3,
                "channel {} texel {}: {} vs {}",
                channel,
                i,
                got,
                e
            );
        }
    }
}

#[test]
fn test_forward_undoes_inverse_up_to_n_squared() {
    let size = 8;
    let input = random_field(size, 11);

    let spatial = transform(size, &input, FftDirection::Inverse);
    let back = transform(size, &spatial, FftDirection::Forward);

    let scale = (size * size) as f32;
    for (a, b) in input.iter().zip(&back) {
        for c in 0..4 {
            assert!((a[c] * scale - b[c]).abs() < 1e-3, "{:?} vs {:?}", a, b);
        }
    }
}

#[test]
fn test_result_stays_in_primary_surface() {
    let mut backend = CpuBackend::new();
    let engine = FftEngine::new(&mut backend, 32).unwrap();
    let field = backend.create_surface(32, "field").unwrap();
    for direction in [FftDirection::Inverse, FftDirection::Forward] {
        let owner = engine.transform(&mut backend, field, direction).unwrap();
        assert_eq!(owner, FieldOwner::Primary);
    }
}

/// Spatial (displacement, derivative) fields of a single bin at (kx, kz) = (1, 0)
fn single_bin_fields(size: u32, amplitude: f32) -> (Vec<Texel>, Vec<Texel>) {
    let config = SimulationConfig {
        texture_size: size,
        ..Default::default()
    };
    let uniforms = OceanUniforms::new(&OceanParams::default(), &config, 0.0, 0.0);

    let mut backend = CpuBackend::new();
    let h0 = backend.create_surface(size, "h0").unwrap();
    let displacement = backend.create_surface(size, "displacement").unwrap();
    let derivatives = backend.create_surface(size, "derivatives").unwrap();
    let displacement_fft = FftEngine::new(&mut backend, size).unwrap();
    let derivative_fft = FftEngine::new(&mut backend, size).unwrap();

    // (kx, kz) = (1, 0) lives at texel (N/2 + 1, N/2)
    let mut spectrum = vec![[0.0; 4]; (size * size) as usize];
    spectrum[(size / 2 * size + size / 2 + 1) as usize] = [amplitude, 0.0, 0.0, 0.0];
    backend.write_surface(h0, &spectrum).unwrap();
    backend.write_uniforms(&uniforms).unwrap();

    backend
        .dispatch(&Dispatch::per_texel(
            Kernel::PropagateWaves,
            size,
            &[h0],
            &[displacement, derivatives],
        ))
        .unwrap();
    backend.barrier();

    let owner = displacement_fft
        .transform(&mut backend, displacement, FftDirection::Inverse)
        .unwrap();
    let spatial = backend
        .read_surface(owner.surface(displacement, &displacement_fft))
        .unwrap();
    let owner = derivative_fft
        .transform(&mut backend, derivatives, FftDirection::Inverse)
        .unwrap();
    let slopes = backend
        .read_surface(owner.surface(derivatives, &derivative_fft))
        .unwrap();
    (spatial, slopes)
}

#[test]
fn test_single_bin_becomes_cosine() {
    let size = 8u32;
    let amplitude = 0.75f32;
    let (out, _) = single_bin_fields(size, amplitude);

    for z in 0..size {
        for x in 0..size {
            let phase = 2.0 * std::f32::consts::PI * x as f32 / size as f32;
            let t = out[(z * size + x) as usize];
            // Height in y, horizontal displacement in x
            assert!((t[1] - 2.0 * amplitude * phase.cos()).abs() < 1e-5, "h at ({}, {})", x, z);
            assert!((t[0] + 2.0 * amplitude * phase.sin()).abs() < 1e-5, "Dx at ({}, {})", x, z);
        }
    }
}

#[test]
fn test_surface_folds_at_the_crest() {
    let size = 8u32;
    let (displacement, derivatives) = single_bin_fields(size, 0.5);
    let row = |x: u32| (size / 2 * size + x) as usize;

    // Crest at x = 0, trough at x = N/2
    assert!(displacement[row(0)][1] > 0.0);
    assert!(displacement[row(size / 2)][1] < 0.0);

    // Points past the crest move back toward it, points before it move forward
    assert!(displacement[row(1)][0] < 0.0);
    assert!(displacement[row(size - 1)][0] > 0.0);

    // Horizontal compression (∂Dx/∂x < 0) at the crest, stretching at the trough
    assert!(derivatives[row(0)][2] < 0.0);
    assert!(derivatives[row(size / 2)][2] > 0.0);

    let jacobians: Vec<f32> = (0..size)
        .map(|x| {
            let d = displacement[row(x)];
            let s = derivatives[row(x)];
            jacobian(s[2], s[3], d[3], 1.0)
        })
        .collect();
    let min = jacobians.iter().copied().fold(f32::MAX, f32::min);
    assert_eq!(jacobians[0], min);
    assert!(jacobians[0] < 1.0);
}

//! Reference implementations of the FFT kernels over host texel slices.
//!
//! Each function is one dispatch: it reads `input` and writes every texel of
//! `output`. Both complex channels of a texel are transformed independently.
//! `shaders/fft.wgsl` implements the same indexing.

use std::f32::consts::PI;

use rustfft::num_complex::Complex32;

use crate::backend::Texel;
use crate::params::FftPassUniform;

/// Reverse the low `bits` bits of `value`
pub fn reverse_bits(value: u32, bits: u32) -> u32 {
    if bits == 0 {
        return 0;
    }
    value.reverse_bits() >> (32 - bits)
}

/// Quadrant swap: out(x, z) = in((x + N/2) mod N, (z + N/2) mod N)
pub fn fft_shift(input: &[Texel], output: &mut [Texel], size: u32) {
    let half = size / 2;
    for z in 0..size {
        for x in 0..size {
            let src = ((z + half) % size) * size + (x + half) % size;
            output[(z * size + x) as usize] = input[src as usize];
        }
    }
}

/// Bit-reversal permutation along both axes
pub fn bit_reverse(input: &[Texel], output: &mut [Texel], size: u32) {
    let bits = size.trailing_zeros();
    for z in 0..size {
        for x in 0..size {
            let src = reverse_bits(z, bits) * size + reverse_bits(x, bits);
            output[(z * size + x) as usize] = input[src as usize];
        }
    }
}

/// Twiddle factor e^{±2πi·p/span}, positive exponent for the inverse transform
pub fn twiddle(p: u32, span: u32, inverse: bool) -> Complex32 {
    let sign = if inverse { 1.0 } else { -1.0 };
    Complex32::from_polar(1.0, sign * 2.0 * PI * p as f32 / span as f32)
}

/// One radix-2 decimation-in-time pass along the axis named by `pass`
pub fn butterfly(input: &[Texel], output: &mut [Texel], pass: &FftPassUniform) {
    let size = pass.size;
    let half = 1u32 << pass.pass_index;
    let span = half << 1;
    let vertical = pass.vertical != 0;

    for z in 0..size {
        for x in 0..size {
            let j = if vertical { z } else { x };
            let p = j % span;
            let lo = j - p + p % half;
            let hi = lo + half;
            let (lo_idx, hi_idx) = if vertical {
                (lo * size + x, hi * size + x)
            } else {
                (z * size + lo, z * size + hi)
            };

            let a = input[lo_idx as usize];
            let c = input[hi_idx as usize];
            let w = twiddle(p, span, pass.inverse != 0);

            let first = Complex32::new(a[0], a[1]) + w * Complex32::new(c[0], c[1]);
            let second = Complex32::new(a[2], a[3]) + w * Complex32::new(c[2], c[3]);
            output[(z * size + x) as usize] = [first.re, first.im, second.re, second.im];
        }
    }
}

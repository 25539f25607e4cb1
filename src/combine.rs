//! Pointwise combination of the spatial fields into renderer-facing maps.
//!
//! After the inverse transform the packed surfaces hold real values:
//! displacement = (Dx, h, Dz, ∂Dx/∂z), derivatives = (∂h/∂x, ∂h/∂z, ∂Dx/∂x, ∂Dz/∂z).

use glam::Vec3;

use crate::backend::Texel;
use crate::params::OceanUniforms;

/// One texel of each output map
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CombinedTexel {
    pub height: Texel,
    pub displacement: Texel,
    pub normal: Texel,
    pub foam: Texel,
}

/// Determinant of the horizontal displacement jacobian with choppiness λ
pub fn jacobian(dx_dx: f32, dz_dz: f32, dx_dz: f32, lambda: f32) -> f32 {
    (1.0 + lambda * dx_dx) * (1.0 + lambda * dz_dz) - (lambda * dx_dz).powi(2)
}

/// First-order foam filter. Folding (J below threshold) injects foam and
/// never lowers it; otherwise the previous value decays.
pub fn accumulate_foam(previous: f32, jacobian: f32, u: &OceanUniforms) -> f32 {
    let decayed = previous * u.foam_decay;
    if jacobian < u.foam_threshold {
        (decayed + u.foam_gain * (u.foam_threshold - jacobian))
            .max(previous)
            .min(1.0)
    } else {
        decayed
    }
}

pub fn combine_texel(
    displacement: Texel,
    derivatives: Texel,
    previous_foam: Texel,
    u: &OceanUniforms,
) -> CombinedTexel {
    let lambda = u.displacement_scale;
    let [dx, h, dz, dx_dz] = displacement;
    let [slope_x, slope_z, dx_dx, dz_dz] = derivatives;

    let normal = Vec3::new(-slope_x, 1.0, -slope_z).normalize();
    let j = jacobian(dx_dx, dz_dz, dx_dz, lambda);
    let foam = accumulate_foam(previous_foam[0], j, u);

    CombinedTexel {
        height: [h, 0.0, 0.0, 0.0],
        displacement: [lambda * dx, h, lambda * dz, 0.0],
        normal: [normal.x, normal.y, normal.z, 0.0],
        foam: [foam, j, 0.0, 0.0],
    }
}

/// Output surfaces written by [`combine_fields`]
pub struct CombineOutputs<'a> {
    pub height: &'a mut [Texel],
    pub displacement: &'a mut [Texel],
    pub normal: &'a mut [Texel],
    pub foam: &'a mut [Texel],
}

/// Run the combine kernel over a whole surface
pub fn combine_fields(
    displacement: &[Texel],
    derivatives: &[Texel],
    previous_foam: &[Texel],
    out: CombineOutputs<'_>,
    u: &OceanUniforms,
) {
    for idx in 0..(u.size * u.size) as usize {
        let c = combine_texel(displacement[idx], derivatives[idx], previous_foam[idx], u);
        out.height[idx] = c.height;
        out.displacement[idx] = c.displacement;
        out.normal[idx] = c.normal;
        out.foam[idx] = c.foam;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniforms() -> OceanUniforms {
        OceanUniforms {
            size: 4,
            displacement_scale: 1.0,
            foam_decay: 0.5,
            foam_threshold: 0.0,
            foam_gain: 1.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_flat_sea() {
        let c = combine_texel([0.0; 4], [0.0; 4], [0.0; 4], &uniforms());
        assert_eq!(c.normal, [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(c.foam, [0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_displacement_scaled_by_choppiness() {
        let u = OceanUniforms {
            displacement_scale: 2.0,
            ..uniforms()
        };
        let c = combine_texel([0.5, 1.5, -0.25, 0.0], [0.0; 4], [0.0; 4], &u);
        assert_eq!(c.height, [1.5, 0.0, 0.0, 0.0]);
        assert_eq!(c.displacement, [1.0, 1.5, -0.5, 0.0]);
    }

    #[test]
    fn test_fold_injects_foam() {
        let u = uniforms();
        // Dxx = -2 folds the surface: J = (1 - 2)(1) = -1
        let c = combine_texel([0.0; 4], [0.0, 0.0, -2.0, 0.0], [0.3, 0.0, 0.0, 0.0], &u);
        assert_eq!(c.foam[1], -1.0);
        assert!(c.foam[0] >= 0.3);
        assert!(c.foam[0] <= 1.0);
    }

    #[test]
    fn test_foam_decays_without_fold() {
        let u = uniforms();
        assert_eq!(accumulate_foam(0.8, 1.0, &u), 0.4);
    }

    #[test]
    fn test_jacobian_shear_term() {
        assert!((jacobian(0.0, 0.0, 1.0, 1.0)).abs() < 1e-6);
    }
}

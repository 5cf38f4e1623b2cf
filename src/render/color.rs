//! Engine color to renderer color conversion.

use crate::types::Vec3;

/// Converts the engine's native color into sRGB with components in `[0, 1]`.
#[cfg_attr(test, mockall::automock)]
pub trait ColorConverter {
    fn to_rgb(&self, native: Vec3) -> Vec3;
}

/// D65 reference white.
const WHITE: [f32; 3] = [0.950_47, 1.0, 1.088_83];

/// Converts normalized CIE LAB (every component scaled to `[0, 1]`).
///
/// `L` spans `0..=100`, `a` and `b` span `-128..=127`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CieLabConverter;

impl CieLabConverter {
    /// Undo the engine's normalization.
    pub fn denormalize(lab: Vec3) -> Vec3 {
        [lab[0] * 100.0, lab[1] * 255.0 - 128.0, lab[2] * 255.0 - 128.0]
    }

    /// CIE LAB to linear-light XYZ.
    fn lab_to_xyz([l, a, b]: Vec3) -> Vec3 {
        const DELTA: f32 = 6.0 / 29.0;
        let finv = |t: f32| {
            if t > DELTA {
                t * t * t
            } else {
                3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
            }
        };
        let fy = (l + 16.0) / 116.0;
        let fx = fy + a / 500.0;
        let fz = fy - b / 200.0;
        [WHITE[0] * finv(fx), WHITE[1] * finv(fy), WHITE[2] * finv(fz)]
    }

    fn xyz_to_srgb([x, y, z]: Vec3) -> Vec3 {
        let gamma = |c: f32| {
            let c = if c <= 0.003_130_8 {
                12.92 * c
            } else {
                1.055 * c.powf(1.0 / 2.4) - 0.055
            };
            c.clamp(0.0, 1.0)
        };
        [
            gamma(3.240_454_2 * x - 1.537_138_5 * y - 0.498_531_4 * z),
            gamma(-0.969_266 * x + 1.876_010_8 * y + 0.041_556 * z),
            gamma(0.055_643_4 * x - 0.204_025_9 * y + 1.057_225_2 * z),
        ]
    }
}

impl ColorConverter for CieLabConverter {
    fn to_rgb(&self, native: Vec3) -> Vec3 {
        Self::xyz_to_srgb(Self::lab_to_xyz(Self::denormalize(native)))
    }
}

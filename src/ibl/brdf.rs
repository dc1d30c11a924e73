use crate::error::{IblError, IblResult};
use crate::ibl::ggx::{importance_sample, reflect};
use crate::ibl::sequence::SampleSequence;
use crate::ibl::visibility::geometry_smith;
use glam::Vec3;
use half::f16;
use rayon::prelude::*;

pub const DEFAULT_BRDF_SAMPLES: u32 = 1024;
const MIN_N_DOT_V: f32 = 0.0001;

/// Split-sum scale and bias for one `(N·V, roughness)` pair, returned as `(scale, bias)`.
pub fn integrate_brdf(sequence: &SampleSequence, n_dot_v: f32, roughness: f32, num_samples: u32) -> (f32, f32) {
    let n_dot_v = n_dot_v.max(MIN_N_DOT_V);
    let view = Vec3::new((1.0 - n_dot_v * n_dot_v).sqrt(), 0.0, n_dot_v);
    let normal = Vec3::Z;
    let mut scale = 0.0f32;
    let mut bias = 0.0f32;

    for xi in sequence.points(num_samples).iter() {
        let h = importance_sample(*xi, normal, roughness);
        let light = reflect(view, h).normalize();
        let n_dot_l = light.z.max(0.0);
        if n_dot_l > 0.0 {
            let n_dot_h = h.z.max(0.0);
            let v_dot_h = view.dot(h).max(0.0);
            let g = geometry_smith(normal, view, light, roughness);
            let g_vis = (g * v_dot_h) / (n_dot_h * n_dot_v);
            let fc = (1.0 - v_dot_h).powi(5);
            scale += (1.0 - fc) * g_vis;
            bias += fc * g_vis;
        }
    }

    // Rejected samples still count towards the average.
    let inv = 1.0 / num_samples as f32;
    (scale * inv, bias * inv)
}

/// Square split-sum lookup table. Texel `(x, y)` holds `[bias, scale]` for `N·V = x / size`
/// and `roughness = y / size`.
#[derive(Debug, Clone, PartialEq)]
pub struct BrdfLut {
    size: u32,
    texels: Vec<[f32; 2]>,
}

impl BrdfLut {
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn texel(&self, x: u32, y: u32) -> [f32; 2] {
        self.texels[(y * self.size + x) as usize]
    }

    pub fn texels(&self) -> &[[f32; 2]] {
        &self.texels
    }

    /// RG16F payload in `[bias, scale]` order, row-major.
    pub fn to_f16_bits(&self) -> Vec<u16> {
        self.texels.iter().flat_map(|texel| texel.map(|value| f16::from_f32(value).to_bits())).collect()
    }
}

pub fn generate_lut(sequence: &SampleSequence, size: u32, num_samples: u32) -> IblResult<BrdfLut> {
    if size == 0 {
        return Err(IblError::invalid_parameter("BRDF LUT size must be positive"));
    }
    if num_samples == 0 {
        return Err(IblError::invalid_parameter("BRDF LUT sample count must be positive"));
    }
    log::debug!("integrating {size}x{size} BRDF LUT with {num_samples} samples");

    let texels = (0..size * size)
        .into_par_iter()
        .map(|idx| {
            let x = idx % size;
            let y = idx / size;
            let (scale, bias) =
                integrate_brdf(sequence, x as f32 / size as f32, y as f32 / size as f32, num_samples);
            [bias, scale]
        })
        .collect();
    Ok(BrdfLut { size, texels })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smooth_surface_sums_to_one() {
        let sequence = SampleSequence::new();
        for n_dot_v in [0.1, 0.5, 1.0] {
            let (scale, bias) = integrate_brdf(&sequence, n_dot_v, 0.0, 256);
            assert!((scale + bias - 1.0).abs() < 1e-4, "n_dot_v {n_dot_v}: {scale} + {bias}");
            let fc = (1.0 - n_dot_v).powi(5);
            assert!((bias - fc).abs() < 1e-4);
        }
    }

    #[test]
    fn grazing_view_is_floored() {
        let sequence = SampleSequence::new();
        let (scale, bias) = integrate_brdf(&sequence, 0.0, 0.5, 64);
        assert!(scale.is_finite() && bias.is_finite());
    }

    #[test]
    fn lut_stores_bias_before_scale() {
        let sequence = SampleSequence::new();
        let lut = generate_lut(&sequence, 8, 64).expect("lut");
        assert_eq!(lut.texels().len(), 64);
        let (scale, bias) = integrate_brdf(&sequence, 3.0 / 8.0, 5.0 / 8.0, 64);
        assert_eq!(lut.texel(3, 5), [bias, scale]);
        assert_eq!(lut.to_f16_bits().len(), 128);
    }

    #[test]
    fn lut_rejects_zero_size() {
        let sequence = SampleSequence::new();
        assert!(generate_lut(&sequence, 0, 64).is_err());
        assert!(generate_lut(&sequence, 4, 0).is_err());
    }
}

use glam::{Vec2, Vec3};
use std::f32::consts::TAU;

/// GGX importance sample of a half-vector around `normal` (alpha = roughness²).
pub fn importance_sample(xi: Vec2, normal: Vec3, roughness: f32) -> Vec3 {
    let alpha = roughness * roughness;
    let phi = TAU * xi.x;
    let cos_theta = ((1.0 - xi.y) / (1.0 + (alpha * alpha - 1.0) * xi.y)).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
    let h = Vec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta);
    tangent_to_world(normal, h).normalize()
}

pub fn tangent_to_world(normal: Vec3, vec: Vec3) -> Vec3 {
    let up = if normal.z.abs() < 0.999 { Vec3::Z } else { Vec3::X };
    let tangent = up.cross(normal).normalize();
    let bitangent = normal.cross(tangent);
    tangent * vec.x + bitangent * vec.y + normal * vec.z
}

/// Mirrors `v` about `h`; both point away from the surface.
pub fn reflect(v: Vec3, h: Vec3) -> Vec3 {
    h * 2.0 * v.dot(h) - v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ibl::sequence::hammersley;

    #[test]
    fn zero_roughness_returns_the_normal() {
        let normal = Vec3::new(0.3, -0.4, 0.5).normalize();
        for index in 0..16 {
            let h = importance_sample(hammersley(index, 16), normal, 0.0);
            assert!((h - normal).length() < 1e-5, "sample {index}: {h:?}");
        }
    }

    #[test]
    fn samples_are_unit_and_in_the_upper_hemisphere() {
        for normal in [Vec3::Z, Vec3::NEG_Z, Vec3::X, Vec3::new(1.0, 1.0, 1.0).normalize()] {
            for roughness in [0.25, 0.5, 1.0] {
                for index in 0..64 {
                    let h = importance_sample(hammersley(index, 64), normal, roughness);
                    assert!((h.length() - 1.0).abs() < 1e-5);
                    assert!(h.dot(normal) >= -1e-6, "normal {normal:?} roughness {roughness}");
                }
            }
        }
    }

    #[test]
    fn tangent_frame_is_orthonormal_near_the_pole() {
        let normal = Vec3::new(0.0, 0.01, 0.99995).normalize();
        let tangent = tangent_to_world(normal, Vec3::X);
        let bitangent = tangent_to_world(normal, Vec3::Y);
        assert!(tangent.dot(normal).abs() < 1e-5);
        assert!(bitangent.dot(normal).abs() < 1e-5);
        assert!(tangent.dot(bitangent).abs() < 1e-5);
        assert!((tangent.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn reflect_about_normal_mirrors_view() {
        let view = Vec3::new(0.6, 0.0, 0.8);
        let light = reflect(view, Vec3::Z);
        assert!((light - Vec3::new(-0.6, 0.0, 0.8)).length() < 1e-6);
    }
}

use crate::cubemap::{validate_cubemap, CubemapSource};
use crate::error::IblResult;
use crate::ibl::direction::{direction_for_texel, solid_angle_weight, CubeFace};
use glam::Vec3;
use rayon::prelude::*;
use std::f32::consts::PI;
use std::ops::{Add, AddAssign};

pub const SH_COEFFICIENT_COUNT: usize = 9;

/// Cosine-lobe convolution per band. The last quadratic term is stored unscaled.
const COSINE_LOBE: [f32; SH_COEFFICIENT_COUNT] = [
    PI,
    2.0 * PI / 3.0,
    2.0 * PI / 3.0,
    2.0 * PI / 3.0,
    PI / 4.0,
    PI / 4.0,
    PI / 4.0,
    PI / 4.0,
    1.0,
];

/// Second-order real SH basis, ordered constant, linear (x, z, y), then quadratic.
pub fn sh_basis(dir: Vec3) -> [f32; SH_COEFFICIENT_COUNT] {
    let Vec3 { x, y, z } = dir;
    [
        0.282095,
        0.488603 * x,
        0.488603 * z,
        0.488603 * y,
        1.092548 * x * z,
        1.092548 * y * z,
        1.092548 * y * x,
        0.946176 * z * z - 0.315392,
        0.546274 * (x * x - y * y),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShCoefficients {
    coefficients: [Vec3; SH_COEFFICIENT_COUNT],
}

impl ShCoefficients {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_array(coefficients: [Vec3; SH_COEFFICIENT_COUNT]) -> Self {
        Self { coefficients }
    }

    pub fn coefficients(&self) -> &[Vec3; SH_COEFFICIENT_COUNT] {
        &self.coefficients
    }

    pub fn get(&self, index: usize) -> Option<Vec3> {
        self.coefficients.get(index).copied()
    }

    pub fn to_arrays(&self) -> [[f32; 3]; SH_COEFFICIENT_COUNT] {
        self.coefficients.map(|c| c.to_array())
    }

    fn accumulate(&mut self, color: Vec3, dir: Vec3) {
        for (coefficient, basis) in self.coefficients.iter_mut().zip(sh_basis(dir)) {
            *coefficient += color * basis;
        }
    }

    fn apply_cosine_lobe(&mut self) {
        for (coefficient, scale) in self.coefficients.iter_mut().zip(COSINE_LOBE) {
            *coefficient *= scale;
        }
    }

    /// Irradiance arriving around `normal`, reconstructed from the baked coefficients.
    pub fn irradiance(&self, normal: Vec3) -> Vec3 {
        self.coefficients.iter().zip(sh_basis(normal)).fold(Vec3::ZERO, |acc, (c, b)| acc + *c * b)
    }
}

impl Add for ShCoefficients {
    type Output = ShCoefficients;

    fn add(mut self, rhs: ShCoefficients) -> ShCoefficients {
        self += rhs;
        self
    }
}

impl AddAssign for ShCoefficients {
    fn add_assign(&mut self, rhs: ShCoefficients) {
        for (lhs, rhs) in self.coefficients.iter_mut().zip(rhs.coefficients) {
            *lhs += rhs;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShProjectionOptions {
    /// Normalise texel directions before evaluating the basis. Off by default; the
    /// unnormalised cube-face vectors are what irradiance consumers expect.
    pub normalize_directions: bool,
}

pub fn project_irradiance<S: CubemapSource + ?Sized>(source: &S) -> IblResult<ShCoefficients> {
    project_irradiance_with(source, ShProjectionOptions::default())
}

pub fn project_irradiance_with<S: CubemapSource + ?Sized>(
    source: &S,
    options: ShProjectionOptions,
) -> IblResult<ShCoefficients> {
    let dim = validate_cubemap(source)?;
    let invdim = 1.0 / dim as f32;
    log::debug!("projecting {dim}x{dim} cube map onto SH (normalize: {})", options.normalize_directions);

    // One partial sum per (face, row), collected in order so the reduction is reproducible.
    let rows: Vec<ShCoefficients> = (0..6 * dim)
        .into_par_iter()
        .map(|row| {
            let face = CubeFace::ALL[(row / dim) as usize];
            let y = row % dim;
            let mut partial = ShCoefficients::zero();
            for x in 0..dim {
                let color = source.texel(face, x, y) * solid_angle_weight(invdim, x, y);
                let mut dir = direction_for_texel(dim, face, x, y);
                if options.normalize_directions {
                    dir = dir.normalize();
                }
                partial.accumulate(color, dir);
            }
            partial
        })
        .collect();

    let mut coefficients = rows.into_iter().fold(ShCoefficients::zero(), |acc, row| acc + row);
    coefficients.apply_cosine_lobe();
    Ok(coefficients)
}

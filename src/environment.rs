use crate::config::BakeConfig;
use crate::cubemap::{Cubemap, CubemapSource};
use crate::error::{IblError, IblResult};
use crate::ibl::brdf::{generate_lut, BrdfLut};
use crate::ibl::direction::{direction_for_texel, CubeFace};
use crate::ibl::prefilter::{prefilter, PrefilteredCubemap};
use crate::ibl::sequence::SampleSequence;
use crate::ibl::sh::{project_irradiance_with, ShCoefficients};
use anyhow::{Context, Result};
use glam::{Vec2, Vec3};
use image::{DynamicImage, ImageReader};
use std::f32::consts::{PI, TAU};
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct EnvironmentMaps {
    pub irradiance: ShCoefficients,
    pub specular: PrefilteredCubemap,
    pub brdf: BrdfLut,
}

/// Runs the precompute stages with one shared sample cache.
pub struct EnvironmentBaker {
    config: BakeConfig,
    sequence: SampleSequence,
}

impl EnvironmentBaker {
    pub fn new(config: BakeConfig) -> Self {
        Self { config, sequence: SampleSequence::new() }
    }

    pub fn config(&self) -> &BakeConfig {
        &self.config
    }

    pub fn sequence(&self) -> &SampleSequence {
        &self.sequence
    }

    pub fn bake_irradiance<S: CubemapSource + ?Sized>(&self, source: &S) -> IblResult<ShCoefficients> {
        let start = Instant::now();
        let coefficients = project_irradiance_with(source, self.config.sh.options())?;
        log::info!("[ibl] SH irradiance projected in {:.2?}", start.elapsed());
        Ok(coefficients)
    }

    pub fn bake_specular<S: CubemapSource + ?Sized>(&self, source: &S) -> IblResult<PrefilteredCubemap> {
        let start = Instant::now();
        let specular = prefilter(&self.sequence, source, &self.config.specular.settings())?;
        log::info!(
            "[ibl] prefiltered {} specular mip(s) from {}px in {:.2?}",
            specular.mip_count(),
            specular.base_size(),
            start.elapsed()
        );
        Ok(specular)
    }

    /// Independent of any environment; bake once and reuse.
    pub fn bake_brdf_lut(&self) -> IblResult<BrdfLut> {
        let start = Instant::now();
        let lut = generate_lut(&self.sequence, self.config.brdf.lut_size, self.config.brdf.sample_count)?;
        log::info!("[ibl] BRDF LUT {}x{} integrated in {:.2?}", lut.size(), lut.size(), start.elapsed());
        Ok(lut)
    }

    pub fn bake<S: CubemapSource + ?Sized>(&self, source: &S) -> IblResult<EnvironmentMaps> {
        let irradiance = self.bake_irradiance(source)?;
        let specular = self.bake_specular(source)?;
        let brdf = self.bake_brdf_lut()?;
        Ok(EnvironmentMaps { irradiance, specular, brdf })
    }

    /// Loads an equirectangular image and resamples it onto a cube map of the configured size.
    pub fn load_cubemap(&self, path: impl AsRef<Path>) -> Result<Cubemap> {
        let path = path.as_ref();
        let image = load_hdr_image(path).with_context(|| format!("loading environment '{}'", path.display()))?;
        Ok(image.to_cubemap(self.config.source.cube_size).with_filter(self.config.specular.filter))
    }

    pub fn default_cubemap(&self) -> Cubemap {
        HdrImage::neutral_gradient().to_cubemap(self.config.source.cube_size).with_filter(self.config.specular.filter)
    }
}

#[derive(Debug, Clone)]
pub struct HdrImage {
    width: u32,
    height: u32,
    pixels: Vec<Vec3>,
}

impl HdrImage {
    pub fn new(width: u32, height: u32, pixels: Vec<Vec3>) -> IblResult<Self> {
        if width == 0 || height == 0 {
            return Err(IblError::invalid_parameter(format!("HDR image must not be empty, got {width}x{height}")));
        }
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(IblError::invalid_parameter(format!(
                "HDR image holds {} pixels, expected {expected} for {width}x{height}",
                pixels.len()
            )));
        }
        Ok(Self { width, height, pixels })
    }

    /// Procedural sky used when no environment file is supplied: blue zenith, warm sun,
    /// dark ground, brightest along the horizon band.
    pub fn neutral_gradient() -> Self {
        let (width, height) = (256u32, 128u32);
        let pixels = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| gradient_texel(x as f32 / (width - 1) as f32, y as f32 / (height - 1) as f32))
            .collect();
        Self { width, height, pixels }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn pixel(&self, x: u32, y: u32) -> Vec3 {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Latitude/longitude position of `dir` in pixel units, +Y up.
    fn project(&self, dir: Vec3) -> Vec2 {
        let d = dir.normalize();
        let longitude = (d.z.atan2(d.x) + PI) / TAU;
        let latitude = d.y.clamp(-1.0, 1.0).acos() / PI;
        Vec2::new(longitude * (self.width - 1) as f32, latitude * (self.height - 1) as f32)
    }

    /// Bilinear lookup along `dir`; wraps horizontally, clamps at the poles.
    pub fn sample(&self, dir: Vec3) -> Vec3 {
        let pos = self.project(dir);
        let base = pos.floor();
        let t = pos - base;
        let column = |offset: f32| (base.x + offset).rem_euclid(self.width as f32) as u32;
        let row = |offset: f32| (base.y + offset).clamp(0.0, (self.height - 1) as f32) as u32;
        let (left, right) = (column(0.0), column(1.0));
        let (top, bottom) = (row(0.0), row(1.0));

        let upper = self.pixel(left, top).lerp(self.pixel(right, top), t.x);
        let lower = self.pixel(left, bottom).lerp(self.pixel(right, bottom), t.x);
        upper.lerp(lower, t.y)
    }

    /// Resamples the panorama onto a cube map with `size`-texel faces.
    pub fn to_cubemap(&self, size: u32) -> Cubemap {
        Cubemap::from_fn(size, |face: CubeFace, x, y| self.sample(direction_for_texel(size, face, x, y)))
    }
}

fn gradient_texel(u: f32, v: f32) -> Vec3 {
    const ZENITH: Vec3 = Vec3::new(0.25, 0.35, 0.6);
    const HAZE: Vec3 = Vec3::new(0.65, 0.7, 0.9);
    const SOIL: Vec3 = Vec3::new(0.08, 0.07, 0.05);
    const DUST: Vec3 = Vec3::new(0.2, 0.18, 0.16);
    const SUN: Vec3 = Vec3::new(1.0, 0.9, 0.75);

    let horizon = (1.0 - (2.0 * v - 1.0).abs()).clamp(0.0, 1.0);
    let sky = ZENITH.lerp(HAZE, v) * (0.6 + 0.4 * horizon);
    let ground = SOIL.lerp(DUST, horizon) * (1.0 - horizon);
    let sun_distance = Vec2::new(u - 0.2, v - 0.35).length();
    let sun = (1.0 - sun_distance * 6.0).max(0.0).powf(12.0);
    sky + ground + SUN * (sun * 8.0)
}

pub fn load_hdr_image(path: impl AsRef<Path>) -> IblResult<HdrImage> {
    let reader = ImageReader::open(path.as_ref())?.with_guessed_format()?;
    let decoded = reader.decode()?;
    convert_to_hdr(&decoded)
}

fn convert_to_hdr(image: &DynamicImage) -> IblResult<HdrImage> {
    let rgb = image.to_rgb32f();
    let pixels = rgb.pixels().map(|pixel| Vec3::from_array(pixel.0)).collect();
    HdrImage::new(rgb.width(), rgb.height(), pixels)
}

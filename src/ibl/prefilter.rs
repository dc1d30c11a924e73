use crate::cubemap::{validate_cubemap, CubemapSink, CubemapSource, SamplerHint};
use crate::error::{IblError, IblResult};
use crate::ibl::direction::{direction_for_texel, CubeFace};
use crate::ibl::ggx::{importance_sample, reflect};
use crate::ibl::sequence::SampleSequence;
use glam::Vec3;
use half::f16;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefilterSettings {
    pub mip_levels: u32,
    pub base_size: u32,
    pub sample_count: u32,
}

impl Default for PrefilterSettings {
    fn default() -> Self {
        Self { mip_levels: 4, base_size: 16, sample_count: 4 }
    }
}

/// Face size of mip `level`; halves per level and bottoms out at one texel.
pub fn mip_size(base_size: u32, level: u32) -> u32 {
    base_size.checked_shr(level).unwrap_or(0).max(1)
}

impl PrefilterSettings {
    pub fn level_size(&self, level: u32) -> u32 {
        mip_size(self.base_size, level)
    }

    pub fn level_roughness(&self, level: u32) -> f32 {
        level as f32 / self.mip_levels as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredSample {
    pub color: Vec3,
    pub total_weight: f32,
}

impl FilteredSample {
    /// Every sample fell below the horizon; `color` is zero.
    pub fn is_degenerate(&self) -> bool {
        self.total_weight <= 0.0
    }
}

/// A texel whose samples were all rejected and was written as black.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegenerateSample {
    pub level: u32,
    pub face: CubeFace,
    pub x: u32,
    pub y: u32,
    pub roughness: f32,
}

/// Filters the environment for a texel looking along `direction` (N = V = R).
///
/// The environment is read along `direction` itself for every accepted sample, weighted by
/// `N·L`; the GGX lobe only decides which samples count and how much.
pub fn filter_sample<S: CubemapSource + ?Sized>(
    sequence: &SampleSequence,
    direction: Vec3,
    envmap: &S,
    roughness: f32,
    num_samples: u32,
) -> FilteredSample {
    let normal = direction.normalize();
    let view = normal;
    let mut color = Vec3::ZERO;
    let mut total_weight = 0.0f32;

    for xi in sequence.points(num_samples).iter() {
        let h = importance_sample(*xi, normal, roughness);
        let light = reflect(view, h).normalize();
        let n_dot_l = normal.dot(light).max(0.0);
        if n_dot_l > 0.0 {
            color += envmap.sample(direction) * n_dot_l;
            total_weight += n_dot_l;
        }
    }

    if total_weight > 0.0 {
        color /= total_weight;
    } else {
        color = Vec3::ZERO;
    }
    FilteredSample { color, total_weight }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CubemapLevel {
    size: u32,
    faces: [Vec<Vec3>; 6],
}

impl CubemapLevel {
    fn empty(size: u32) -> Self {
        Self { size, faces: std::array::from_fn(|_| Vec::new()) }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn face(&self, face: CubeFace) -> &[Vec3] {
        &self.faces[face.index()]
    }

    pub fn texel(&self, face: CubeFace, x: u32, y: u32) -> Vec3 {
        self.faces[face.index()][(y * self.size + x) as usize]
    }
}

/// Roughness-indexed specular mip chain, 3-channel float per texel.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefilteredCubemap {
    base_size: u32,
    levels: Vec<CubemapLevel>,
    degenerate: Vec<DegenerateSample>,
}

impl PrefilteredCubemap {
    pub fn new() -> Self {
        Self { base_size: 0, levels: Vec::new(), degenerate: Vec::new() }
    }

    pub fn base_size(&self) -> u32 {
        self.base_size
    }

    pub fn mip_count(&self) -> u32 {
        self.levels.len() as u32
    }

    pub fn levels(&self) -> &[CubemapLevel] {
        &self.levels
    }

    pub fn level(&self, level: u32) -> Option<&CubemapLevel> {
        self.levels.get(level as usize)
    }

    pub fn roughness(&self, level: u32) -> f32 {
        level as f32 / self.mip_count().max(1) as f32
    }

    pub fn sampler_hint(&self) -> SamplerHint {
        SamplerHint::TRILINEAR
    }

    pub fn degenerate(&self) -> &[DegenerateSample] {
        &self.degenerate
    }

    /// RGBA16F payload for one level: faces in order, rows top to bottom, alpha 1.
    pub fn to_f16_rgba(&self, level: u32) -> Option<Vec<u16>> {
        let level = self.level(level)?;
        let one = f16::from_f32(1.0).to_bits();
        let data = level
            .faces
            .iter()
            .flatten()
            .flat_map(|texel| {
                let [r, g, b] = texel.to_array().map(|value| f16::from_f32(value).to_bits());
                [r, g, b, one]
            })
            .collect();
        Some(data)
    }
}

impl Default for PrefilteredCubemap {
    fn default() -> Self {
        Self::new()
    }
}

impl CubemapSink for PrefilteredCubemap {
    fn allocate(&mut self, base_size: u32, mip_levels: u32) {
        self.base_size = base_size;
        self.levels = (0..mip_levels).map(|level| CubemapLevel::empty(mip_size(base_size, level))).collect();
        self.degenerate.clear();
    }

    fn write_level(&mut self, level: u32, face: CubeFace, texels: Vec<Vec3>) {
        if let Some(target) = self.levels.get_mut(level as usize) {
            debug_assert_eq!(texels.len(), (target.size * target.size) as usize);
            target.faces[face.index()] = texels;
        }
    }
}

struct FilteredLevel {
    faces: [Vec<Vec3>; 6],
    degenerate: Vec<DegenerateSample>,
}

fn filter_level<S: CubemapSource + ?Sized>(
    sequence: &SampleSequence,
    envmap: &S,
    settings: &PrefilterSettings,
    level: u32,
) -> FilteredLevel {
    let size = settings.level_size(level);
    let roughness = settings.level_roughness(level);
    let texels: Vec<(Vec3, bool)> = (0..6 * size * size)
        .into_par_iter()
        .map(|idx| {
            let face = CubeFace::ALL[(idx / (size * size)) as usize];
            let x = idx % size;
            let y = (idx / size) % size;
            let dir = direction_for_texel(size, face, x, y);
            let sample = filter_sample(sequence, dir, envmap, roughness, settings.sample_count);
            (sample.color, sample.is_degenerate())
        })
        .collect();

    let mut faces: [Vec<Vec3>; 6] = std::array::from_fn(|_| Vec::with_capacity((size * size) as usize));
    let mut degenerate = Vec::new();
    for (idx, (color, is_degenerate)) in texels.into_iter().enumerate() {
        let idx = idx as u32;
        let face = CubeFace::ALL[(idx / (size * size)) as usize];
        if is_degenerate {
            degenerate.push(DegenerateSample { level, face, x: idx % size, y: (idx / size) % size, roughness });
        }
        faces[face.index()].push(color);
    }
    if !degenerate.is_empty() {
        log::warn!(
            "prefilter level {level} (roughness {roughness:.3}): {} texel(s) had no contributing samples and were written as black",
            degenerate.len()
        );
    }
    FilteredLevel { faces, degenerate }
}

/// Filters `envmap` into every level of `sink`. Levels are computed concurrently.
pub fn prefilter_into<S, T>(
    sequence: &SampleSequence,
    envmap: &S,
    settings: &PrefilterSettings,
    sink: &mut T,
) -> IblResult<Vec<DegenerateSample>>
where
    S: CubemapSource + ?Sized,
    T: CubemapSink + ?Sized,
{
    validate_cubemap(envmap)?;
    if settings.base_size == 0 {
        return Err(IblError::invalid_parameter("prefilter base size must be positive"));
    }
    log::debug!(
        "prefiltering {} mip level(s) from base size {} with {} sample(s)",
        settings.mip_levels,
        settings.base_size,
        settings.sample_count
    );

    let levels: Vec<FilteredLevel> = (0..settings.mip_levels)
        .into_par_iter()
        .map(|level| filter_level(sequence, envmap, settings, level))
        .collect();

    sink.allocate(settings.base_size, settings.mip_levels);
    let mut degenerate = Vec::new();
    for (level, filtered) in levels.into_iter().enumerate() {
        for (face, texels) in CubeFace::ALL.into_iter().zip(filtered.faces) {
            sink.write_level(level as u32, face, texels);
        }
        degenerate.extend(filtered.degenerate);
    }
    Ok(degenerate)
}

pub fn prefilter<S: CubemapSource + ?Sized>(
    sequence: &SampleSequence,
    envmap: &S,
    settings: &PrefilterSettings,
) -> IblResult<PrefilteredCubemap> {
    let mut filtered = PrefilteredCubemap::new();
    let degenerate = prefilter_into(sequence, envmap, settings, &mut filtered)?;
    filtered.degenerate = degenerate;
    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cubemap::Cubemap;

    #[test]
    fn level_sizes_halve_and_roughness_steps() {
        let settings = PrefilterSettings::default();
        let sizes: Vec<u32> = (0..4).map(|level| settings.level_size(level)).collect();
        assert_eq!(sizes, vec![16, 8, 4, 2]);
        assert_eq!(settings.level_roughness(0), 0.0);
        assert_eq!(settings.level_roughness(2), 0.5);
        let tiny = PrefilterSettings { mip_levels: 6, base_size: 4, sample_count: 4 };
        assert_eq!(tiny.level_size(5), 1);
    }

    #[test]
    fn long_mip_chains_bottom_out_at_one_texel() {
        assert_eq!(mip_size(16, 31), 1);
        assert_eq!(mip_size(16, 32), 1);
        assert_eq!(mip_size(u32::MAX, 40), 1);

        let sequence = SampleSequence::new();
        let envmap = Cubemap::new(4, Vec3::ONE);
        let settings = PrefilterSettings { mip_levels: 33, base_size: 16, sample_count: 1 };
        let filtered = prefilter(&sequence, &envmap, &settings).expect("prefilter");
        assert_eq!(filtered.mip_count(), 33);
        let sizes: Vec<u32> = filtered.levels().iter().map(|level| level.size()).collect();
        assert_eq!(&sizes[..5], &[16, 8, 4, 2, 1]);
        assert!(sizes[4..].iter().all(|size| *size == 1));
        for level in filtered.levels() {
            let texels = (level.size() * level.size()) as usize;
            assert!(CubeFace::ALL.into_iter().all(|face| level.face(face).len() == texels));
        }
        assert!(filtered.degenerate().is_empty());
    }

    #[test]
    fn filter_reads_along_the_texel_direction() {
        let sequence = SampleSequence::new();
        let size = 4;
        let envmap = Cubemap::from_fn(size, |face, x, y| Vec3::new(face.index() as f32, x as f32, y as f32));
        let dir = direction_for_texel(size, CubeFace::NegativeY, 1, 2);
        let sample = filter_sample(&sequence, dir, &envmap, 0.75, 16);
        assert!(!sample.is_degenerate());
        let expected = envmap.texel(CubeFace::NegativeY, 1, 2);
        assert!((sample.color - expected).length() < 1e-4, "{:?}", sample.color);
    }

    #[test]
    fn zero_samples_yield_black_and_are_flagged() {
        let sequence = SampleSequence::new();
        let envmap = Cubemap::new(2, Vec3::ONE);
        let sample = filter_sample(&sequence, Vec3::X, &envmap, 0.5, 0);
        assert!(sample.is_degenerate());
        assert_eq!(sample.color, Vec3::ZERO);

        let settings = PrefilterSettings { mip_levels: 2, base_size: 2, sample_count: 0 };
        let filtered = prefilter(&sequence, &envmap, &settings).expect("prefilter");
        assert_eq!(filtered.degenerate().len(), 6 * 4 + 6);
        assert!(filtered.levels().iter().all(|level| CubeFace::ALL
            .into_iter()
            .all(|face| level.face(face).iter().all(|texel| *texel == Vec3::ZERO))));
    }

    #[test]
    fn rgba_payload_has_unit_alpha() {
        let sequence = SampleSequence::new();
        let envmap = Cubemap::new(4, Vec3::new(0.25, 0.5, 2.0));
        let settings = PrefilterSettings { mip_levels: 2, base_size: 4, sample_count: 4 };
        let filtered = prefilter(&sequence, &envmap, &settings).expect("prefilter");
        let payload = filtered.to_f16_rgba(1).expect("level 1");
        assert_eq!(payload.len(), 6 * 2 * 2 * 4);
        assert_eq!(payload[3], f16::from_f32(1.0).to_bits());
        assert!(filtered.to_f16_rgba(2).is_none());
    }
}

use crate::error::{IblError, IblResult};
use crate::ibl::direction::CubeFace;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Read side of a cube-map-shaped image.
pub trait CubemapSource: Sync {
    fn face_count(&self) -> usize;

    /// Width and height of one face at the base level.
    fn face_size(&self) -> (u32, u32);

    fn can_read_texels(&self) -> bool {
        true
    }

    fn texel(&self, face: CubeFace, x: u32, y: u32) -> Vec3;

    /// Looks the map up along `direction`, which need not be normalised.
    fn sample(&self, direction: Vec3) -> Vec3;
}

/// Write side of a mip-mapped cube map. Each `(level, face)` is written exactly once.
pub trait CubemapSink {
    fn allocate(&mut self, base_size: u32, mip_levels: u32);

    /// `texels` is row-major, `size * size` entries for the level's size.
    fn write_level(&mut self, level: u32, face: CubeFace, texels: Vec<Vec3>);
}

/// Checks the shape of `source` and returns its face dimension.
pub fn validate_cubemap<S: CubemapSource + ?Sized>(source: &S) -> IblResult<u32> {
    let faces = source.face_count();
    if faces != 6 {
        return Err(IblError::NotCubemap { faces });
    }
    let (width, height) = source.face_size();
    if width != height {
        return Err(IblError::NonSquareFace { width, height });
    }
    if !source.can_read_texels() {
        return Err(IblError::Unreadable);
    }
    Ok(width)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CubemapFilter {
    #[default]
    Nearest,
    Bilinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    Nearest,
    Linear,
    LinearMipmapLinear,
}

/// Sampling policy a consumer should configure for a produced texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerHint {
    pub mag: FilterMode,
    pub min: FilterMode,
}

impl SamplerHint {
    pub const TRILINEAR: SamplerHint = SamplerHint { mag: FilterMode::Linear, min: FilterMode::LinearMipmapLinear };
}

/// Single-level RGB float cube map held in memory.
#[derive(Debug, Clone)]
pub struct Cubemap {
    size: u32,
    faces: [Vec<Vec3>; 6],
    filter: CubemapFilter,
}

impl Cubemap {
    pub fn new(size: u32, fill: Vec3) -> Self {
        let texels = (size * size) as usize;
        Self { size, faces: std::array::from_fn(|_| vec![fill; texels]), filter: CubemapFilter::Nearest }
    }

    pub fn from_faces(size: u32, faces: [Vec<Vec3>; 6]) -> IblResult<Self> {
        let expected = (size * size) as usize;
        if let Some((index, face)) = faces.iter().enumerate().find(|(_, face)| face.len() != expected) {
            return Err(IblError::invalid_parameter(format!(
                "face {index} holds {} texels, expected {expected} for a {size}x{size} face",
                face.len()
            )));
        }
        Ok(Self { size, faces, filter: CubemapFilter::Nearest })
    }

    pub fn from_fn(size: u32, mut texel: impl FnMut(CubeFace, u32, u32) -> Vec3) -> Self {
        let faces = std::array::from_fn(|index| {
            let face = CubeFace::ALL[index];
            let mut data = Vec::with_capacity((size * size) as usize);
            for y in 0..size {
                for x in 0..size {
                    data.push(texel(face, x, y));
                }
            }
            data
        });
        Self { size, faces, filter: CubemapFilter::Nearest }
    }

    pub fn with_filter(mut self, filter: CubemapFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn filter(&self) -> CubemapFilter {
        self.filter
    }

    pub fn face(&self, face: CubeFace) -> &[Vec3] {
        &self.faces[face.index()]
    }

    pub fn texel_mut(&mut self, face: CubeFace, x: u32, y: u32) -> &mut Vec3 {
        let idx = (y * self.size + x) as usize;
        &mut self.faces[face.index()][idx]
    }

    fn fetch(&self, face: CubeFace, x: u32, y: u32) -> Vec3 {
        self.faces[face.index()][(y * self.size + x) as usize]
    }

    fn sample_nearest(&self, face: CubeFace, u: f32, v: f32) -> Vec3 {
        let max = (self.size - 1) as f32;
        let x = ((u + 1.0) * 0.5 * self.size as f32).floor().clamp(0.0, max) as u32;
        let y = ((1.0 - v) * 0.5 * self.size as f32).floor().clamp(0.0, max) as u32;
        self.fetch(face, x, y)
    }

    fn sample_bilinear(&self, face: CubeFace, u: f32, v: f32) -> Vec3 {
        let max = (self.size - 1) as f32;
        let x = ((u + 1.0) * 0.5 * self.size as f32 - 0.5).clamp(0.0, max);
        let y = ((1.0 - v) * 0.5 * self.size as f32 - 0.5).clamp(0.0, max);
        let x0 = x.floor();
        let y0 = y.floor();
        let tx = x - x0;
        let ty = y - y0;
        let ix0 = x0 as u32;
        let iy0 = y0 as u32;
        let ix1 = (ix0 + 1).min(self.size - 1);
        let iy1 = (iy0 + 1).min(self.size - 1);

        let c0 = self.fetch(face, ix0, iy0).lerp(self.fetch(face, ix1, iy0), tx);
        let c1 = self.fetch(face, ix0, iy1).lerp(self.fetch(face, ix1, iy1), tx);
        c0.lerp(c1, ty)
    }
}

impl CubemapSource for Cubemap {
    fn face_count(&self) -> usize {
        self.faces.len()
    }

    fn face_size(&self) -> (u32, u32) {
        (self.size, self.size)
    }

    fn can_read_texels(&self) -> bool {
        self.size > 0
    }

    fn texel(&self, face: CubeFace, x: u32, y: u32) -> Vec3 {
        self.fetch(face, x, y)
    }

    fn sample(&self, direction: Vec3) -> Vec3 {
        let (face, u, v) = CubeFace::locate(direction);
        match self.filter {
            CubemapFilter::Nearest => self.sample_nearest(face, u, v),
            CubemapFilter::Bilinear => self.sample_bilinear(face, u, v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ibl::direction::direction_for_texel;

    struct FakeSource {
        faces: usize,
        size: (u32, u32),
        readable: bool,
    }

    impl CubemapSource for FakeSource {
        fn face_count(&self) -> usize {
            self.faces
        }

        fn face_size(&self) -> (u32, u32) {
            self.size
        }

        fn can_read_texels(&self) -> bool {
            self.readable
        }

        fn texel(&self, _face: CubeFace, _x: u32, _y: u32) -> Vec3 {
            Vec3::ZERO
        }

        fn sample(&self, _direction: Vec3) -> Vec3 {
            Vec3::ZERO
        }
    }

    #[test]
    fn validation_rejects_bad_shapes() {
        let flat = FakeSource { faces: 1, size: (8, 8), readable: true };
        assert!(matches!(validate_cubemap(&flat), Err(IblError::NotCubemap { faces: 1 })));
        let wide = FakeSource { faces: 6, size: (8, 4), readable: true };
        assert!(matches!(validate_cubemap(&wide), Err(IblError::NonSquareFace { width: 8, height: 4 })));
        let opaque = FakeSource { faces: 6, size: (8, 8), readable: false };
        let err = validate_cubemap(&opaque).unwrap_err();
        assert!(matches!(err, IblError::Unreadable));
        assert!(err.is_invalid_input());
        let good = FakeSource { faces: 6, size: (8, 8), readable: true };
        assert_eq!(validate_cubemap(&good).expect("valid"), 8);
    }

    #[test]
    fn from_faces_checks_texel_counts() {
        let mut faces: [Vec<Vec3>; 6] = std::array::from_fn(|_| vec![Vec3::ONE; 4]);
        assert!(Cubemap::from_faces(2, faces.clone()).is_ok());
        faces[3].pop();
        let err = Cubemap::from_faces(2, faces).unwrap_err();
        assert!(err.to_string().contains("face 3"));
    }

    #[test]
    fn nearest_sample_hits_the_texel_it_came_from() {
        let size = 8;
        let cubemap = Cubemap::from_fn(size, |face, x, y| Vec3::new(face.index() as f32, x as f32, y as f32));
        for face in CubeFace::ALL {
            for (x, y) in [(0, 0), (7, 0), (2, 6), (7, 7)] {
                let dir = direction_for_texel(size, face, x, y);
                assert_eq!(cubemap.sample(dir), cubemap.texel(face, x, y), "{} ({x}, {y})", face.label());
            }
        }
    }

    #[test]
    fn bilinear_blends_neighbouring_texels() {
        let cubemap = Cubemap::from_fn(2, |_, x, _| Vec3::splat(x as f32)).with_filter(CubemapFilter::Bilinear);
        // centre of the +Z face sits halfway between columns 0 and 1
        let mid = cubemap.sample(Vec3::Z);
        assert!((mid.x - 0.5).abs() < 1e-6);
        let edge = cubemap.sample(Vec3::new(-0.99, 0.0, 1.0));
        assert!(edge.x.abs() < 1e-6);
    }
}

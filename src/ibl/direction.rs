use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            CubeFace::PositiveX => "+X",
            CubeFace::NegativeX => "-X",
            CubeFace::PositiveY => "+Y",
            CubeFace::NegativeY => "-Y",
            CubeFace::PositiveZ => "+Z",
            CubeFace::NegativeZ => "-Z",
        }
    }

    /// Places the face-local coordinates `(u, v)` in [-1, 1] on the face of the unit cube.
    pub fn direction(self, u: f32, v: f32) -> Vec3 {
        match self {
            CubeFace::PositiveX => Vec3::new(1.0, v, -u),
            CubeFace::NegativeX => Vec3::new(-1.0, v, u),
            CubeFace::PositiveY => Vec3::new(u, 1.0, -v),
            CubeFace::NegativeY => Vec3::new(u, -1.0, v),
            CubeFace::PositiveZ => Vec3::new(u, v, 1.0),
            CubeFace::NegativeZ => Vec3::new(-u, v, -1.0),
        }
    }

    /// Inverse of [`CubeFace::direction`]: picks the face along the major axis of `dir` and
    /// returns the face-local coordinates of the point where `dir` pierces it.
    pub fn locate(dir: Vec3) -> (CubeFace, f32, f32) {
        let abs = dir.abs();
        if abs.x >= abs.y && abs.x >= abs.z {
            let m = abs.x.max(f32::MIN_POSITIVE);
            if dir.x >= 0.0 {
                (CubeFace::PositiveX, -dir.z / m, dir.y / m)
            } else {
                (CubeFace::NegativeX, dir.z / m, dir.y / m)
            }
        } else if abs.y >= abs.z {
            let m = abs.y;
            if dir.y >= 0.0 {
                (CubeFace::PositiveY, dir.x / m, -dir.z / m)
            } else {
                (CubeFace::NegativeY, dir.x / m, dir.z / m)
            }
        } else {
            let m = abs.z;
            if dir.z >= 0.0 {
                (CubeFace::PositiveZ, dir.x / m, dir.y / m)
            } else {
                (CubeFace::NegativeZ, -dir.x / m, dir.y / m)
            }
        }
    }
}

/// Face-local coordinates of the centre of texel `(x, y)`; `v` grows towards the top row.
pub fn texel_to_uv(dim: u32, x: u32, y: u32) -> (f32, f32) {
    let dim = dim as f32;
    let u = (2.0 * x as f32 + 1.0) / dim - 1.0;
    let v = 1.0 - (2.0 * y as f32 + 1.0) / dim;
    (u, v)
}

/// Direction through the centre of texel `(x, y)` on `face`. Not normalised.
pub fn direction_for_texel(dim: u32, face: CubeFace, x: u32, y: u32) -> Vec3 {
    let (u, v) = texel_to_uv(dim, x, y);
    face.direction(u, v)
}

fn sphere_quadrant_area(x: f32, y: f32) -> f32 {
    (x * y).atan2((x * x + y * y + 1.0).sqrt())
}

/// Solid angle subtended by texel `(x, y)` of a face with `1 / dim == invdim`.
pub fn solid_angle_weight(invdim: f32, x: u32, y: u32) -> f32 {
    let s = (x as f32 + 0.5) * 2.0 * invdim - 1.0;
    let t = (y as f32 + 0.5) * 2.0 * invdim - 1.0;
    let x0 = s - invdim;
    let y0 = t - invdim;
    let x1 = s + invdim;
    let y1 = t + invdim;
    sphere_quadrant_area(x0, y0) - sphere_quadrant_area(x0, y1) - sphere_quadrant_area(x1, y0)
        + sphere_quadrant_area(x1, y1)
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IblError {
    #[error("supplied texture is not a cube map (expected 6 faces, found {faces})")]
    NotCubemap { faces: usize },
    #[error("cube map faces must be square, found {width}x{height}")]
    NonSquareFace { width: u32, height: u32 },
    #[error("cube map texels cannot be read back")]
    Unreadable,
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IblError {
    pub fn invalid_parameter<T: ToString>(msg: T) -> Self {
        IblError::InvalidParameter(msg.to_string())
    }

    /// True for the shape/readback failures raised before any texel is touched.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, IblError::NotCubemap { .. } | IblError::NonSquareFace { .. } | IblError::Unreadable)
    }
}

pub type IblResult<T> = Result<T, IblError>;

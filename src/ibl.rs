pub mod brdf;
pub mod direction;
pub mod ggx;
pub mod prefilter;
pub mod sequence;
pub mod sh;
pub mod visibility;

pub use brdf::{generate_lut, integrate_brdf, BrdfLut, DEFAULT_BRDF_SAMPLES};
pub use direction::{direction_for_texel, solid_angle_weight, CubeFace};
pub use ggx::importance_sample;
pub use prefilter::{
    filter_sample, mip_size, prefilter, prefilter_into, CubemapLevel, DegenerateSample, FilteredSample,
    PrefilterSettings, PrefilteredCubemap,
};
pub use sequence::{hammersley, van_der_corput, SampleSequence};
pub use sh::{project_irradiance, project_irradiance_with, ShCoefficients, ShProjectionOptions};
pub use visibility::{geometry_schlick_ggx, geometry_smith};

pub mod cli;
pub mod config;
pub mod cubemap;
pub mod environment;
pub mod error;
pub mod export;
pub mod ibl;

pub use cubemap::{Cubemap, CubemapSink, CubemapSource};
pub use environment::{EnvironmentBaker, EnvironmentMaps};
pub use error::{IblError, IblResult};

use crate::cubemap::CubemapFilter;
use crate::ibl::prefilter::PrefilterSettings;
use crate::ibl::sh::ShProjectionOptions;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShConfig {
    #[serde(default)]
    pub normalize_directions: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrdfConfig {
    #[serde(default = "BrdfConfig::default_lut_size")]
    pub lut_size: u32,
    #[serde(default = "BrdfConfig::default_sample_count")]
    pub sample_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpecularConfig {
    #[serde(default = "SpecularConfig::default_base_size")]
    pub base_size: u32,
    #[serde(default = "SpecularConfig::default_mip_levels")]
    pub mip_levels: u32,
    #[serde(default = "SpecularConfig::default_sample_count")]
    pub sample_count: u32,
    #[serde(default)]
    pub filter: CubemapFilter,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Face size used when an equirectangular image is resampled onto a cube map.
    #[serde(default = "SourceConfig::default_cube_size")]
    pub cube_size: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BakeConfig {
    #[serde(default)]
    pub sh: ShConfig,
    #[serde(default)]
    pub brdf: BrdfConfig,
    #[serde(default)]
    pub specular: SpecularConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BakeConfigOverrides {
    pub lut_size: Option<u32>,
    pub lut_samples: Option<u32>,
    pub base_size: Option<u32>,
    pub mip_levels: Option<u32>,
    pub specular_samples: Option<u32>,
    pub threads: Option<usize>,
}

impl BrdfConfig {
    const fn default_lut_size() -> u32 {
        128
    }

    const fn default_sample_count() -> u32 {
        1024
    }
}

impl Default for BrdfConfig {
    fn default() -> Self {
        Self { lut_size: Self::default_lut_size(), sample_count: Self::default_sample_count() }
    }
}

impl SpecularConfig {
    const fn default_base_size() -> u32 {
        16
    }

    const fn default_mip_levels() -> u32 {
        4
    }

    const fn default_sample_count() -> u32 {
        4
    }

    pub fn settings(&self) -> PrefilterSettings {
        PrefilterSettings { mip_levels: self.mip_levels, base_size: self.base_size, sample_count: self.sample_count }
    }
}

impl Default for SpecularConfig {
    fn default() -> Self {
        Self {
            base_size: Self::default_base_size(),
            mip_levels: Self::default_mip_levels(),
            sample_count: Self::default_sample_count(),
            filter: CubemapFilter::default(),
        }
    }
}

impl ShConfig {
    pub fn options(&self) -> ShProjectionOptions {
        ShProjectionOptions { normalize_directions: self.normalize_directions }
    }
}

impl SourceConfig {
    const fn default_cube_size() -> u32 {
        64
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self { cube_size: Self::default_cube_size() }
    }
}

impl BakeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &BakeConfigOverrides) {
        if let Some(lut_size) = overrides.lut_size {
            self.brdf.lut_size = lut_size;
        }
        if let Some(samples) = overrides.lut_samples {
            self.brdf.sample_count = samples;
        }
        if let Some(base_size) = overrides.base_size {
            self.specular.base_size = base_size;
        }
        if let Some(mip_levels) = overrides.mip_levels {
            self.specular.mip_levels = mip_levels;
        }
        if let Some(samples) = overrides.specular_samples {
            self.specular.sample_count = samples;
        }
        if let Some(threads) = overrides.threads {
            self.threads = Some(threads);
        }
    }
}

impl BakeConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.applied_fields().is_empty()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.lut_size.is_some() {
            fields.push("lut_size");
        }
        if self.lut_samples.is_some() {
            fields.push("lut_samples");
        }
        if self.base_size.is_some() {
            fields.push("base_size");
        }
        if self.mip_levels.is_some() {
            fields.push("mip_levels");
        }
        if self.specular_samples.is_some() {
            fields.push("specular_samples");
        }
        if self.threads.is_some() {
            fields.push("threads");
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_sections_use_defaults() {
        let cfg: BakeConfig = serde_json::from_str("{}").expect("parse");
        assert!(!cfg.sh.normalize_directions);
        assert_eq!(cfg.brdf.lut_size, 128);
        assert_eq!(cfg.brdf.sample_count, 1024);
        assert_eq!(cfg.specular.settings(), PrefilterSettings::default());
        assert_eq!(cfg.specular.filter, CubemapFilter::Nearest);
        assert_eq!(cfg.threads, None);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg: BakeConfig =
            serde_json::from_str(r#"{ "specular": { "mip_levels": 6, "filter": "bilinear" }, "threads": 2 }"#)
                .expect("parse");
        assert_eq!(cfg.specular.mip_levels, 6);
        assert_eq!(cfg.specular.base_size, 16);
        assert_eq!(cfg.specular.filter, CubemapFilter::Bilinear);
        assert_eq!(cfg.threads, Some(2));
    }

    #[test]
    fn load_reads_json_file() {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "brdf": {{ "lut_size": 32 }}, "sh": {{ "normalize_directions": true }} }}"#)
            .expect("write config");
        let cfg = BakeConfig::load(file.path()).expect("load config");
        assert_eq!(cfg.brdf.lut_size, 32);
        assert!(cfg.sh.options().normalize_directions);
    }

    #[test]
    fn load_or_default_falls_back_on_bad_json() {
        let mut file = NamedTempFile::new().expect("temp file");
        write!(file, "not json").expect("write config");
        let cfg = BakeConfig::load_or_default(file.path());
        assert_eq!(cfg.brdf.lut_size, 128);
    }

    #[test]
    fn overrides_replace_selected_fields() {
        let mut cfg = BakeConfig::default();
        let overrides = BakeConfigOverrides { mip_levels: Some(5), threads: Some(3), ..Default::default() };
        assert_eq!(overrides.applied_fields(), vec!["mip_levels", "threads"]);
        cfg.apply_overrides(&overrides);
        assert_eq!(cfg.specular.mip_levels, 5);
        assert_eq!(cfg.specular.base_size, 16);
        assert_eq!(cfg.threads, Some(3));
        assert!(BakeConfigOverrides::default().is_empty());
    }
}

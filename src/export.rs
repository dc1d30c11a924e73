use crate::cubemap::SamplerHint;
use crate::environment::EnvironmentMaps;
use crate::ibl::sh::SH_COEFFICIENT_COUNT;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const MANIFEST_FILE: &str = "manifest.json";
const SH_FILE: &str = "sh.json";
const BRDF_FILE: &str = "brdf_lut.rg16f";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShFile {
    /// Cosine-lobe convolution is already applied.
    pub coefficients: [[f32; 3]; SH_COEFFICIENT_COUNT],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LutEntry {
    pub file: String,
    pub size: u32,
    pub format: String,
    pub channels: [String; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MipEntry {
    pub level: u32,
    pub size: u32,
    pub roughness: f32,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecularEntry {
    pub base_size: u32,
    pub format: String,
    pub sampler: SamplerHint,
    pub levels: Vec<MipEntry>,
    pub degenerate_texels: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub byte_order: String,
    pub sh: String,
    pub brdf_lut: LutEntry,
    pub specular: SpecularEntry,
}

fn byte_order() -> &'static str {
    if cfg!(target_endian = "little") {
        "little"
    } else {
        "big"
    }
}

fn write_bytes(path: &Path, data: &[u16]) -> Result<()> {
    fs::write(path, bytemuck::cast_slice::<u16, u8>(data))
        .with_context(|| format!("writing '{}'", path.display()))
}

/// Writes every artifact of `maps` into `dir` and returns the manifest that describes them.
pub fn write_maps(maps: &EnvironmentMaps, dir: impl AsRef<Path>) -> Result<ExportManifest> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("creating output directory '{}'", dir.display()))?;

    let sh = ShFile { coefficients: maps.irradiance.to_arrays() };
    let sh_path = dir.join(SH_FILE);
    fs::write(&sh_path, serde_json::to_vec_pretty(&sh)?)
        .with_context(|| format!("writing '{}'", sh_path.display()))?;

    write_bytes(&dir.join(BRDF_FILE), &maps.brdf.to_f16_bits())?;

    let mut levels = Vec::with_capacity(maps.specular.mip_count() as usize);
    for (index, level) in maps.specular.levels().iter().enumerate() {
        let index = index as u32;
        let file = format!("specular_mip{index}.rgba16f");
        let payload =
            maps.specular.to_f16_rgba(index).ok_or_else(|| anyhow!("specular level {index} disappeared"))?;
        write_bytes(&dir.join(&file), &payload)?;
        levels.push(MipEntry { level: index, size: level.size(), roughness: maps.specular.roughness(index), file });
    }
    if !maps.specular.degenerate().is_empty() {
        log::warn!("[export] {} specular texel(s) were written as black", maps.specular.degenerate().len());
    }

    let manifest = ExportManifest {
        byte_order: byte_order().to_string(),
        sh: SH_FILE.to_string(),
        brdf_lut: LutEntry {
            file: BRDF_FILE.to_string(),
            size: maps.brdf.size(),
            format: "rg16f".to_string(),
            channels: ["bias".to_string(), "scale".to_string()],
        },
        specular: SpecularEntry {
            base_size: maps.specular.base_size(),
            format: "rgba16f".to_string(),
            sampler: maps.specular.sampler_hint(),
            levels,
            degenerate_texels: maps.specular.degenerate().len(),
        },
    };
    let manifest_path = dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?)
        .with_context(|| format!("writing '{}'", manifest_path.display()))?;
    log::info!("[export] wrote IBL artifacts to '{}'", dir.display());
    Ok(manifest)
}

pub fn read_manifest(dir: impl AsRef<Path>) -> Result<ExportManifest> {
    let path = dir.as_ref().join(MANIFEST_FILE);
    let bytes = fs::read(&path).with_context(|| format!("reading '{}'", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing '{}'", path.display()))
}

pub fn read_sh(dir: impl AsRef<Path>) -> Result<ShFile> {
    let path = dir.as_ref().join(SH_FILE);
    let bytes = fs::read(&path).with_context(|| format!("reading '{}'", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BakeConfig;
    use crate::cubemap::{Cubemap, FilterMode};
    use crate::environment::EnvironmentBaker;
    use glam::Vec3;
    use tempfile::tempdir;

    #[test]
    fn writes_manifest_and_payloads() {
        let mut config = BakeConfig::default();
        config.brdf.lut_size = 4;
        config.brdf.sample_count = 16;
        config.specular.base_size = 4;
        config.specular.mip_levels = 3;
        let baker = EnvironmentBaker::new(config);
        let maps = baker.bake(&Cubemap::new(4, Vec3::new(0.2, 0.4, 0.8))).expect("bake");

        let dir = tempdir().expect("temp dir");
        let manifest = write_maps(&maps, dir.path()).expect("write maps");
        assert_eq!(read_manifest(dir.path()).expect("read manifest"), manifest);
        assert_eq!(manifest.brdf_lut.channels, ["bias".to_string(), "scale".to_string()]);
        assert_eq!(manifest.specular.sampler.min, FilterMode::LinearMipmapLinear);
        assert_eq!(manifest.specular.degenerate_texels, 0);

        let lut_bytes = fs::read(dir.path().join(&manifest.brdf_lut.file)).expect("lut file");
        assert_eq!(lut_bytes.len(), 4 * 4 * 2 * 2);
        let sizes: Vec<u32> = manifest.specular.levels.iter().map(|level| level.size).collect();
        assert_eq!(sizes, vec![4, 2, 1]);
        for level in &manifest.specular.levels {
            let bytes = fs::read(dir.path().join(&level.file)).expect("mip file");
            assert_eq!(bytes.len(), (6 * level.size * level.size * 4 * 2) as usize);
        }

        let sh = read_sh(dir.path()).expect("read sh");
        for (read, baked) in sh.coefficients.iter().flatten().zip(maps.irradiance.to_arrays().iter().flatten()) {
            assert!((read - baked).abs() <= baked.abs() * 1e-6 + 1e-9, "{read} vs {baked}");
        }
    }
}

use crate::config::BakeConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliOverrides {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    lut_size: Option<u32>,
    lut_samples: Option<u32>,
    base_size: Option<u32>,
    mip_levels: Option<u32>,
    specular_samples: Option<u32>,
    threads: Option<usize>,
}

const SUPPORTED_FLAGS: &str = "--input, --output, --config, --lut-size, --lut-samples, --base-size, \
                               --mip-levels, --specular-samples, --threads";

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            let Some(key) = flag.strip_prefix("--") else {
                bail!("Unexpected argument '{flag}'. Flags take the form --name value.");
            };
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "input" => overrides.input = Some(PathBuf::from(value)),
                "output" => overrides.output = Some(PathBuf::from(value)),
                "config" => overrides.config = Some(PathBuf::from(value)),
                "lut-size" => overrides.lut_size = Some(parse_count("lut-size", &value)?),
                "lut-samples" => overrides.lut_samples = Some(parse_count("lut-samples", &value)?),
                "base-size" => overrides.base_size = Some(parse_count("base-size", &value)?),
                "mip-levels" => overrides.mip_levels = Some(parse_count("mip-levels", &value)?),
                "specular-samples" => {
                    overrides.specular_samples = Some(parse_count("specular-samples", &value)?);
                }
                "threads" => {
                    overrides.threads = Some(
                        value.parse::<usize>().with_context(|| format!("Invalid threads '{value}'"))?,
                    );
                }
                _ => bail!("Unknown flag '{flag}'. Supported flags: {SUPPORTED_FLAGS}."),
            }
        }
        Ok(overrides)
    }

    pub fn input(&self) -> Option<&PathBuf> {
        self.input.as_ref()
    }

    pub fn output(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| PathBuf::from("ibl_out"))
    }

    pub fn config(&self) -> Option<&PathBuf> {
        self.config.as_ref()
    }

    pub fn config_overrides(&self) -> BakeConfigOverrides {
        BakeConfigOverrides {
            lut_size: self.lut_size,
            lut_samples: self.lut_samples,
            base_size: self.base_size,
            mip_levels: self.mip_levels,
            specular_samples: self.specular_samples,
            threads: self.threads,
        }
    }
}

fn parse_count(flag: &str, value: &str) -> Result<u32> {
    value.parse::<u32>().with_context(|| format!("Invalid {flag} '{value}'"))
}

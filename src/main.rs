use anyhow::{Context, Result};
use kestrel_ibl::cli::CliOverrides;
use kestrel_ibl::config::BakeConfig;
use kestrel_ibl::environment::EnvironmentBaker;
use kestrel_ibl::export::write_maps;

fn run(cli: CliOverrides) -> Result<()> {
    let mut config = match cli.config() {
        Some(path) => BakeConfig::load(path)?,
        None => BakeConfig::default(),
    };
    let overrides = cli.config_overrides();
    if !overrides.is_empty() {
        log::debug!("[cli] overriding {}", overrides.applied_fields().join(", "));
    }
    config.apply_overrides(&overrides);

    if let Some(threads) = config.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    let baker = EnvironmentBaker::new(config);
    let cubemap = match cli.input() {
        Some(path) => baker.load_cubemap(path)?,
        None => {
            log::info!("[ibl] no --input given, baking the neutral gradient environment");
            baker.default_cubemap()
        }
    };
    let maps = baker.bake(&cubemap)?;
    write_maps(&maps, cli.output())?;
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = run(cli) {
        log::error!("Bake failed: {err:?}");
        std::process::exit(1);
    }
}

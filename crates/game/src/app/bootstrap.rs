use std::env;
use std::path::{Path, PathBuf};

use isoworld_engine::{
    resolve_app_paths, AppPaths, ConfigError, EngineConfig, StartupError, CONFIG_ENV_VAR,
    SEED_ENV_VAR,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{var} must be an unsigned integer, got {value:?}")]
    InvalidSeed { var: &'static str, value: String },
}

pub(crate) struct AppWiring {
    pub(crate) config: EngineConfig,
    pub(crate) paths: AppPaths,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Isoworld Startup ===");

    let paths = resolve_app_paths()?;
    info!(
        root = %paths.root.display(),
        asset_dir = %paths.asset_dir.display(),
        "startup"
    );

    let config_path = env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
    let seed_override = env::var(SEED_ENV_VAR).ok();
    let config = load_config(config_path.as_deref(), seed_override.as_deref())?;
    info!(
        source = %config_path
            .as_deref()
            .map_or_else(|| "defaults".to_string(), |path| path.display().to_string()),
        seed = config.seed,
        map_width = config.map_width,
        map_height = config.map_height,
        "config_loaded"
    );

    Ok(AppWiring { config, paths })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// Defaults, then the optional JSON file, then the seed override. The result
/// is validated before it is returned.
fn load_config(
    path: Option<&Path>,
    seed_override: Option<&str>,
) -> Result<EngineConfig, BootstrapError> {
    let mut config = match path {
        Some(path) => EngineConfig::load_from_path(path)?,
        None => EngineConfig::default(),
    };
    if let Some(raw) = seed_override.map(str::trim).filter(|raw| !raw.is_empty()) {
        config.seed = raw.parse().map_err(|_| BootstrapError::InvalidSeed {
            var: SEED_ENV_VAR,
            value: raw.to_string(),
        })?;
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_file_or_override() {
        let config = load_config(None, None).expect("defaults");
        assert_eq!(config.seed, EngineConfig::default().seed);
    }

    #[test]
    fn seed_override_wins_over_file() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("isoworld.json");
        fs::write(&path, r#"{ "seed": 7, "map_width": 20 }"#).expect("write config");

        let from_file = load_config(Some(&path), None).expect("file config");
        assert_eq!(from_file.seed, 7);
        assert_eq!(from_file.map_width, 20);

        let overridden = load_config(Some(&path), Some(" 99 ")).expect("override");
        assert_eq!(overridden.seed, 99);
        assert_eq!(overridden.map_width, 20);
    }

    #[test]
    fn bad_seed_is_rejected() {
        let error = load_config(None, Some("forty-two")).expect_err("bad seed");
        assert!(matches!(error, BootstrapError::InvalidSeed { .. }));
    }

    #[test]
    fn invalid_file_values_fail_validation() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("isoworld.json");
        fs::write(&path, r#"{ "map_width": 0 }"#).expect("write config");

        let error = load_config(Some(&path), None).expect_err("invalid config");
        assert!(matches!(error, BootstrapError::Config(_)));
    }
}

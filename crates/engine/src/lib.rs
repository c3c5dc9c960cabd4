use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod assets;
pub mod config;
pub mod math;
mod sprite_keys;
pub mod world;

pub use app::{
    run_app, screen_to_world_px, world_to_screen, world_to_screen_px, AppError, InputAction,
    Intent, IntentBatch, IsoProjection, PixelsRenderer, RenderError, Renderer, Viewport,
};
pub use assets::{AssetCatalog, AssetError, AssetSizes, FileSurfaceSource, Surface, SurfaceSource};
pub use config::{ConfigError, EngineConfig, TerrainConfig};
pub use math::{Cell, Vec2};
pub use sprite_keys::{AssetCategory, SpriteKey, SpriteKeyError};
pub use world::{TickReport, TileMap, TileType, World, WorldError, WorldEvent};

pub const ROOT_ENV_VAR: &str = "ISOWORLD_ROOT";
pub const CONFIG_ENV_VAR: &str = "ISOWORLD_CONFIG";
pub const SEED_ENV_VAR: &str = "ISOWORLD_SEED";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub asset_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "{env_var} is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot {
        path: PathBuf,
        env_var: &'static str,
    },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/isoworld\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

/// Finds the project root from `ISOWORLD_ROOT` or by walking up from the
/// executable. Sprites live under `<root>/assets/sprites`.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = match env::var(ROOT_ENV_VAR) {
        Ok(value) => root_from_env(Path::new(&value))?,
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;
            find_root_above(&exe_dir)?
        }
        Err(source) => {
            return Err(StartupError::EnvVar {
                var: ROOT_ENV_VAR,
                source,
            })
        }
    };
    Ok(AppPaths {
        asset_dir: root.join("assets"),
        root,
    })
}

fn root_from_env(raw: &Path) -> Result<PathBuf, StartupError> {
    let normalized = normalize_path(raw);
    if is_repo_marker(&normalized) {
        Ok(normalized)
    } else {
        Err(StartupError::InvalidEnvRoot {
            path: normalized,
            env_var: ROOT_ENV_VAR,
        })
    }
}

fn find_root_above(start_dir: &Path) -> Result<PathBuf, StartupError> {
    start_dir
        .ancestors()
        .find(|candidate| is_repo_marker(candidate))
        .map(normalize_path)
        .ok_or_else(|| StartupError::RootNotFound {
            start_dir: normalize_path(start_dir),
            env_var: ROOT_ENV_VAR,
        })
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_root(dir: &Path) {
        fs::write(dir.join("Cargo.toml"), "[workspace]\n").expect("write manifest");
        fs::create_dir_all(dir.join("assets")).expect("assets dir");
    }

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let temp = TempDir::new().expect("temp dir");
        fs::create_dir_all(temp.path().join("assets")).expect("assets dir");
        assert!(!is_repo_marker(temp.path()));
        make_root(temp.path());
        assert!(is_repo_marker(temp.path()));
    }

    #[test]
    fn root_is_found_from_nested_directory() {
        let temp = TempDir::new().expect("temp dir");
        make_root(temp.path());
        let nested = temp.path().join("target").join("debug");
        fs::create_dir_all(&nested).expect("nested dir");

        let found = find_root_above(&nested).expect("root");
        assert_eq!(found, normalize_path(temp.path()));
    }

    #[test]
    fn missing_root_reports_start_dir() {
        let temp = TempDir::new().expect("temp dir");
        let error = find_root_above(temp.path()).expect_err("no marker");
        assert!(matches!(error, StartupError::RootNotFound { .. }));
        assert!(error.to_string().contains(ROOT_ENV_VAR));
    }

    #[test]
    fn env_root_must_be_a_marker() {
        let temp = TempDir::new().expect("temp dir");
        assert!(matches!(
            root_from_env(temp.path()),
            Err(StartupError::InvalidEnvRoot { .. })
        ));
        make_root(temp.path());
        assert!(root_from_env(temp.path()).is_ok());
    }
}

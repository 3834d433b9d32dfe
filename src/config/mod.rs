//! Where the engine binaries live.
//!
//! Resolution order: explicit value (CLI flag), then the
//! [`BIN_DIR_ENV`](crate::consts::BIN_DIR_ENV) environment variable, then
//! [`default_bin_dir`](crate::consts::default_bin_dir).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::consts::{BIN_DIR_ENV, WASM_EXTENSION, default_bin_dir};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub bin_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bin_dir: default_bin_dir(),
        }
    }
}

impl Config {
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
        }
    }

    /// Read the binary directory from the environment, or fall back to the default.
    pub fn from_env() -> Self {
        Self::resolve(None, std::env::var_os(BIN_DIR_ENV).map(PathBuf::from))
    }

    /// Pick the first of `flag`, `env`, default. Empty values are skipped.
    pub fn resolve(flag: Option<PathBuf>, env: Option<PathBuf>) -> Self {
        let bin_dir = flag
            .into_iter()
            .chain(env)
            .find(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(default_bin_dir);
        Self { bin_dir }
    }

    /// Path of the binary for an engine called `name`.
    pub fn binary_path(&self, name: &str) -> PathBuf {
        self.bin_dir.join(name).with_extension(WASM_EXTENSION)
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_env() {
        let config = Config::resolve(Some("/flag".into()), Some("/env".into()));
        assert_eq!(config.bin_dir, PathBuf::from("/flag"));
    }

    #[test]
    fn env_used_without_flag() {
        let config = Config::resolve(None, Some("/env".into()));
        assert_eq!(config.bin_dir, PathBuf::from("/env"));
    }

    #[test]
    fn empty_values_are_skipped() {
        let config = Config::resolve(Some(PathBuf::new()), Some(PathBuf::new()));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn falls_back_to_default() {
        assert_eq!(Config::resolve(None, None), Config::default());
    }

    #[test]
    fn binary_path_appends_extension() {
        let config = Config::new("/opt/hogs");
        assert_eq!(
            config.binary_path("warthog"),
            PathBuf::from("/opt/hogs/warthog.wasm")
        );
    }

    #[test]
    fn serializes_to_json() {
        let config = Config::new("/opt/hogs");
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}

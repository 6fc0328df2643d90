use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::enroll::EnrollOptions;
use crate::index::Backend;
use crate::matcher::DEFAULT_THRESHOLD;
use crate::scorer::ScoreWeights;

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> = Lazy::new(|| ProjectDirs::from("", "", "facefuse"));

pub static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| match option_env!("FACEFUSE_CONFIG_PATH") {
    Some(p) => PathBuf::from(p),
    None => PROJECT_DIRS
        .as_ref()
        .map(|d| d.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("/usr/local/etc/facefuse/config.toml")),
});

pub static GALLERY_DIR: Lazy<PathBuf> = Lazy::new(|| match option_env!("FACEFUSE_GALLERY_DIR") {
    Some(p) => PathBuf::from(p),
    None => PROJECT_DIRS
        .as_ref()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/usr/local/var/facefuse")),
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cosine score a match must exceed
    pub threshold: f32,
    pub select_top: usize,
    pub min_images: usize,
    pub weights: ScoreWeights,
    pub index_backend: Backend,
    pub gallery_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            select_top: 10,
            min_images: 3,
            weights: ScoreWeights::default(),
            index_backend: Backend::Auto,
            gallery_dir: GALLERY_DIR.clone(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.threshold.is_finite(),
            "threshold must be finite, got {}",
            self.threshold
        );
        self.weights.validate()?;
        Ok(())
    }

    pub fn enroll_options(&self) -> EnrollOptions {
        EnrollOptions {
            select_top: self.select_top.max(1),
            min_images: self.min_images,
            weights: self.weights,
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}

/// Path of the config file, written with defaults first if it does not exist.
pub fn ensure_config(path: Option<&Path>) -> Result<PathBuf> {
    let path = path.unwrap_or(&CONFIG_PATH).to_path_buf();
    if !path.exists() {
        save_config(&Config::default(), Some(&path))
            .with_context(|| format!("writing default config to {}", path.display()))?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("facefuse-config-{}-{}", std::process::id(), name))
            .join("config.toml")
    }

    #[test]
    fn test_missing_file_yields_defaults() -> Result<()> {
        let cfg = load_config(Some(Path::new("/nonexistent/facefuse/config.toml")))?;
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.threshold, 0.85);
        assert_eq!(cfg.select_top, 10);
        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<()> {
        let path = temp_path("partial");
        std::fs::create_dir_all(path.parent().unwrap())?;
        std::fs::write(
            &path,
            "threshold = 0.7\nindex_backend = \"linear\"\n[weights]\narea = 0.5\n",
        )?;
        let cfg = load_config(Some(&path))?;
        assert_eq!(cfg.threshold, 0.7);
        assert_eq!(cfg.index_backend, Backend::Linear);
        assert_eq!(cfg.weights.area, 0.5);
        assert_eq!(cfg.weights.frontalness, 0.4);
        assert_eq!(cfg.select_top, 10);
        std::fs::remove_dir_all(path.parent().unwrap())?;
        Ok(())
    }

    #[test]
    fn test_round_trip_and_rejects_negative_weight() -> Result<()> {
        let path = temp_path("roundtrip");
        let cfg = Config {
            select_top: 4,
            ..Config::default()
        };
        save_config(&cfg, Some(&path))?;
        assert_eq!(load_config(Some(&path))?, cfg);

        std::fs::write(&path, "[weights]\nsharpness = -1.0\n")?;
        assert!(load_config(Some(&path)).is_err());
        std::fs::remove_dir_all(path.parent().unwrap())?;
        Ok(())
    }

    #[test]
    fn test_ensure_config_writes_defaults_once() -> Result<()> {
        let path = temp_path("ensure");
        assert_eq!(ensure_config(Some(&path))?, path);
        assert_eq!(load_config(Some(&path))?, Config::default());

        std::fs::write(&path, "threshold = 0.6\n")?;
        ensure_config(Some(&path))?;
        assert_eq!(load_config(Some(&path))?.threshold, 0.6);
        std::fs::remove_dir_all(path.parent().unwrap())?;
        Ok(())
    }

    #[test]
    fn test_enroll_options_clamps_select_top() {
        let cfg = Config {
            select_top: 0,
            ..Config::default()
        };
        assert_eq!(cfg.enroll_options().select_top, 1);
    }
}

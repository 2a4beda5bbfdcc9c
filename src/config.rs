// config.rs - 运行时配置：settings.json / hotspots.json / 命令行
//
// 查找顺序与资源目录一致：
// 1) <exe_dir>/assets/<file>
// 2) ./assets/<file>  (开发时的工作目录)
//
// 命令行: --settings <path> --hotspots <path> --lang <code>
// 环境变量: PANORAMA_LANG

use crate::hotspot::Hotspot;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_LANG: &str = "en";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("sphere_diameter must be positive and finite, got {0}")]
    InvalidDiameter(f64),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Must match the range the hotspot coordinates were authored in.
    pub sphere_diameter: f64,
    pub fov_deg: f64,
    /// Marker radius as a percentage of the sphere radius.
    pub hotspot_size: f64,
    pub brightness: f64,
    pub sensitivity: f64,
    pub inertia: f64,
    pub panorama: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sphere_diameter: 4096.0,
            fov_deg: crate::camera::DEFAULT_FOV_DEG,
            hotspot_size: 1.5,
            brightness: 1.0,
            sensitivity: 1.0,
            inertia: 0.7,
            panorama: None,
        }
    }
}

impl Settings {
    pub fn sphere_radius(&self) -> f64 {
        self.sphere_diameter / 2.0
    }

    pub fn marker_size(&self) -> f64 {
        self.sphere_radius() * self.hotspot_size / 100.0
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        if !(self.sphere_diameter.is_finite() && self.sphere_diameter > 0.0) {
            return Err(ConfigError::InvalidDiameter(self.sphere_diameter));
        }
        Ok(self)
    }

    pub fn from_json(path: &Path, text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()
    }

    /// Load from `path`, or from the asset directories when `path` is `None`.
    /// A missing file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path.map(Path::to_path_buf).or_else(|| find_asset("settings.json")) else {
            log::warn!("settings.json not found, using defaults");
            return Ok(Self::default());
        };
        let text = read(&path)?;
        let settings = Self::from_json(&path, &text)?;
        log::info!("loaded settings from {}", path.display());
        Ok(settings)
    }
}

pub fn hotspots_from_json(path: &Path, text: &str) -> Result<Vec<Hotspot>, ConfigError> {
    serde_json::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the authored hotspots; a missing file means an empty panorama.
pub fn load_hotspots(path: Option<&Path>) -> Result<Vec<Hotspot>, ConfigError> {
    let Some(path) = path.map(Path::to_path_buf).or_else(|| find_asset("hotspots.json")) else {
        log::warn!("hotspots.json not found, no hotspots will be shown");
        return Ok(Vec::new());
    };
    let text = read(&path)?;
    let hotspots = hotspots_from_json(&path, &text)?;
    log::info!("loaded {} hotspots from {}", hotspots.len(), path.display());
    Ok(hotspots)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn find_asset(relative: impl AsRef<Path>) -> Option<PathBuf> {
    let relative = relative.as_ref();

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let p = dir.join("assets").join(relative);
            if p.exists() {
                return Some(p);
            }
        }
    }

    let p = PathBuf::from("assets").join(relative);
    p.exists().then_some(p)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    pub lang: Option<String>,
    pub settings: Option<PathBuf>,
    pub hotspots: Option<PathBuf>,
}

impl CliArgs {
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Self {
        let mut out = Self::default();
        let mut it = args.into_iter();
        while let Some(a) = it.next() {
            match a.as_str() {
                "--lang" => out.lang = it.next(),
                "--settings" => out.settings = it.next().map(PathBuf::from),
                "--hotspots" => out.hotspots = it.next().map(PathBuf::from),
                _ => {}
            }
        }
        out
    }

    /// CLI first, then `PANORAMA_LANG`, then the default language.
    pub fn resolve_lang(&self) -> String {
        if let Some(lang) = &self.lang {
            return lang.clone();
        }
        match std::env::var("PANORAMA_LANG") {
            Ok(v) if !v.trim().is_empty() => v,
            _ => DEFAULT_LANG.to_string(),
        }
    }
}

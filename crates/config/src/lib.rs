//! Layered configuration for tankobon.
//!
//! Values are resolved from, in increasing priority:
//! 1. built-in defaults,
//! 2. a configuration file (TOML, YAML or JSON, picked by extension),
//! 3. environment variables prefixed with `TANKOBON_`, where `__` separates
//!    nested keys (`TANKOBON_THUMBNAILS__MAX_SIZE=200`).
//!
//! ```toml
//! [[roots]]
//! path = "/home/jane/Comics"
//! pattern = "{artist}/{series}/{issue}"
//!
//! [thumbnails]
//! max_size = 300
//! quality = 80
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tankobon_extract::NamingPattern;
use tracing::instrument;

pub const ENV_PREFIX: &str = "TANKOBON_";
pub const DEFAULT_PATTERN: &str = "{artist}/{series}/{issue}";
const APPLICATION: &str = "tankobon";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APPLICATION)
}

/// Where the configuration file lives when none is given explicitly.
pub fn default_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".tankobon"))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Library roots, scanned in order.
    pub roots: Vec<RootConfig>,
    pub catalog: CatalogConfig,
    pub thumbnails: ThumbnailConfig,
    pub resolver: ResolverConfig,
    pub render: RenderConfig,
}

/// A library folder and the layout of its sub-folders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootConfig {
    pub path: PathBuf,
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

fn default_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

impl RootConfig {
    pub fn new(path: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            pattern: pattern.into(),
        }
    }

    /// Compile the naming pattern.
    pub fn naming_pattern(&self) -> Result<NamingPattern> {
        self.pattern
            .parse::<NamingPattern>()
            .or_raise(|| ErrorKind::Invalid(format!("bad naming pattern for root {}", self.path.display())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// SQLite database file.
    pub path: PathBuf,
}
impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("catalog.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    pub directory: PathBuf,
    /// Longest side of a thumbnail, in pixels.
    pub max_size: u32,
    /// JPEG quality, 1 to 100.
    pub quality: u8,
}
impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            directory: data_dir().join("thumbnails"),
            max_size: 300,
            quality: 80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// How many resolved pages to remember.
    pub capacity: usize,
    /// Scale factor for full-size document pages.
    pub full_scale: f32,
    /// JPEG quality for full-size document pages.
    pub full_quality: u8,
}
impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            full_scale: 1.2,
            full_quality: 90,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Directory holding the pdfium shared library. The system library path
    /// is searched when unset or when the library isn't found there.
    pub pdfium_library: Option<PathBuf>,
}

impl Config {
    /// Build the provider stack without extracting it.
    ///
    /// An explicit `file` must exist. Without one, the default file is used
    /// if present.
    pub fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match file {
            Some(file) => {
                if !file.is_file() {
                    exn::bail!(ErrorKind::FileNotFound(file.to_path_buf()));
                }
                figment = Self::merge_file(figment, file)?;
            },
            None => {
                if let Some(file) = default_file().filter(|file| file.is_file()) {
                    figment = Self::merge_file(figment, &file)?;
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    fn merge_file(figment: Figment, file: &Path) -> Result<Figment> {
        let extension = file.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
        let figment = match extension.as_deref() {
            Some("toml") => figment.merge(Toml::file(file)),
            Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
            Some("json") => figment.merge(Json::file(file)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(file.to_path_buf())),
        };
        tracing::debug!(file = %file.display(), "Merged configuration file");
        Ok(figment)
    }

    /// Load and validate the configuration.
    #[instrument(skip_all, fields(file = ?file))]
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(file)?)
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values that serde can't.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for root in &self.roots {
            if !root.path.is_absolute() {
                exn::bail!(ErrorKind::Invalid(format!("root must be an absolute path: {}", root.path.display())));
            }
            if !seen.insert(root.path.as_path()) {
                exn::bail!(ErrorKind::Invalid(format!("root configured twice: {}", root.path.display())));
            }
            root.naming_pattern()?;
        }
        if self.thumbnails.max_size == 0 {
            exn::bail!(ErrorKind::Invalid("thumbnail size must be greater than zero".to_string()));
        }
        if !(1..=100).contains(&self.thumbnails.quality) {
            exn::bail!(ErrorKind::Invalid("thumbnail quality must be between 1 and 100".to_string()));
        }
        if self.resolver.capacity == 0 {
            exn::bail!(ErrorKind::Invalid("resolver capacity must be greater than zero".to_string()));
        }
        if !(self.resolver.full_scale.is_finite() && self.resolver.full_scale > 0.0) {
            exn::bail!(ErrorKind::Invalid("document render scale must be greater than zero".to_string()));
        }
        if !(1..=100).contains(&self.resolver.full_quality) {
            exn::bail!(ErrorKind::Invalid("document render quality must be between 1 and 100".to_string()));
        }
        Ok(())
    }
}

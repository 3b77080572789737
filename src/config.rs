//! Configuration management for the splitter
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (splitter.toml)
//! - Environment variables (PROTO_SPLIT__*)
//!
//! ## Example config file (splitter.toml):
//! ```toml
//! [output]
//! dir = "output_protos"
//! extension = "proto"
//! import_prefix = "gen/"
//! preserve_package = true
//!
//! [resolve]
//! max_break_passes = 64
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::emit::RenderOptions;

/// Main configuration for the splitter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplitterConfig {
    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Cycle resolution settings
    #[serde(default)]
    pub resolve: ResolveConfig,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the split files are written to
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// File extension, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Prepended to every import path
    #[serde(default)]
    pub import_prefix: String,

    /// Syntax version for the header; the input's declaration is used if unset
    #[serde(default)]
    pub syntax: Option<String>,

    /// Repeat the input's package declaration in every file
    #[serde(default = "default_true")]
    pub preserve_package: bool,
}

/// Cycle resolution limits. Unset means `|V| + 1`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolveConfig {
    #[serde(default)]
    pub max_break_passes: Option<usize>,

    #[serde(default)]
    pub max_merge_rounds: Option<usize>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output_protos")
}

fn default_extension() -> String {
    "proto".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            extension: default_extension(),
            import_prefix: String::new(),
            syntax: None,
            preserve_package: true,
        }
    }
}

impl SplitterConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["splitter.toml", ".splitter.toml", "config/splitter.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "proto", "splitter") {
            let xdg_config = config_dir.config_dir().join("splitter.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // PROTO_SPLIT__OUTPUT__DIR=... and so on
        builder = builder.add_source(
            Environment::with_prefix("PROTO_SPLIT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Output directory (resolves relative paths against the working directory)
    pub fn output_dir(&self) -> PathBuf {
        if self.output.dir.is_absolute() {
            self.output.dir.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.output.dir)
        }
    }

    /// Rendering options derived from the output section
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            extension: self.output.extension.clone(),
            import_prefix: self.output.import_prefix.clone(),
            syntax: self.output.syntax.clone(),
            preserve_package: self.output.preserve_package,
        }
    }
}

//! Configuration for the migration tool
//!
//! Reads configuration from:
//! - `.jsf2migrate.yaml` / `.jsf2migrate.yml` / `.jsf2migrate.json` in the
//!   analysed project directory
//! - an explicit file given with `--config`
//!
//! Command line flags are merged on top with [`Config::merge_cli`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// File names looked up in a project directory
pub const CONFIG_FILE_NAMES: &[&str] = &[
    ".jsf2migrate.yaml",
    ".jsf2migrate.yml",
    ".jsf2migrate.json",
];

/// Template discovery settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Template file extension, without the dot
    pub extension: String,

    /// Template root relative to a project directory
    pub template_root: PathBuf,

    /// Directory name that anchors platform-relative template paths
    pub root_marker: String,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            extension: "xhtml".to_string(),
            template_root: PathBuf::from("src/main/resources/web/nuxeo.war"),
            root_marker: "nuxeo.war".to_string(),
        }
    }
}

/// Platform template lists used for override detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Templates currently shipped by the platform
    pub current: Option<PathBuf>,

    /// Templates removed or renamed by the platform
    pub compat: Option<PathBuf>,

    /// Compare paths relative to the root marker instead of bare file names
    pub complete_path: bool,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            current: None,
            compat: None,
            complete_path: true,
        }
    }
}

/// Indentation style for migrated output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndentStyle {
    #[default]
    Space,
    Tab,
}

/// Output settings for migrated templates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub indent_style: IndentStyle,

    /// Indent width (spaces per level, or tabs per level)
    pub indent_size: usize,

    pub insert_final_newline: bool,

    /// Suffix appended to a template path to name its migrated copy
    pub migrated_suffix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            indent_style: IndentStyle::Space,
            indent_size: 2,
            insert_final_newline: true,
            migrated_suffix: ".migrated".to_string(),
        }
    }
}

impl OutputConfig {
    /// One indentation level
    pub fn indent_str(&self) -> String {
        match self.indent_style {
            IndentStyle::Space => " ".repeat(self.indent_size),
            IndentStyle::Tab => "\t".repeat(self.indent_size),
        }
    }
}

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            _ => Err(format!("Unknown report format: {}", s)),
        }
    }
}

/// Report settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Report file name, relative to the project directory
    pub file: PathBuf,

    pub format: ReportFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("report.txt"),
            format: ReportFormat::Text,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Write migrated copies of templates with findings
    pub migrate: bool,

    /// Also reformat the original templates in place
    pub format: bool,

    pub files: FilesConfig,

    pub templates: TemplatesConfig,

    pub output: OutputConfig,

    pub report: ReportConfig,
}

impl Config {
    /// Load configuration from a file
    ///
    /// Relative template list paths are resolved against the directory of
    /// the configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let mut config: Self = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown config file format: {}",
                    ext
                )))
            }
        };

        let base_dir = path.parent().unwrap_or(Path::new("."));
        config.templates.current = config.templates.current.map(|p| base_dir.join(p));
        config.templates.compat = config.templates.compat.map(|p| base_dir.join(p));

        config.validate()?;
        Ok(config)
    }

    /// Load the first configuration file found in a directory, if any
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>, ConfigError> {
        for name in CONFIG_FILE_NAMES {
            let path = dir.join(name);
            if path.is_file() {
                return Self::load(&path).map(Some);
            }
        }
        Ok(None)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.files.extension.is_empty() {
            return Err(ConfigError::Invalid(
                "files.extension must not be empty".to_string(),
            ));
        }
        if self.output.migrated_suffix.is_empty() {
            return Err(ConfigError::Invalid(
                "output.migrated_suffix must not be empty".to_string(),
            ));
        }
        if self.format && !self.migrate {
            log::warn!("'format' has no effect unless 'migrate' is enabled");
        }
        Ok(())
    }

    /// Merge CLI arguments into configuration
    #[allow(clippy::too_many_arguments)]
    pub fn merge_cli(
        &mut self,
        migrate: bool,
        format: bool,
        report_file: Option<PathBuf>,
        report_format: Option<ReportFormat>,
        current_templates: Option<PathBuf>,
        compat_templates: Option<PathBuf>,
    ) {
        if migrate {
            self.migrate = true;
        }
        if format {
            self.format = true;
        }
        if let Some(file) = report_file {
            self.report.file = file;
        }
        if let Some(f) = report_format {
            self.report.format = f;
        }
        if let Some(path) = current_templates {
            self.templates.current = Some(path);
        }
        if let Some(path) = compat_templates {
            self.templates.compat = Some(path);
        }
    }
}

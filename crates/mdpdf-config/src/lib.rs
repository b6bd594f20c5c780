//! Configuration management for mdpdf.
//!
//! Parses `mdpdf.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//! Configuration errors are always fatal: they are reported before any
//! document is read.
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `diagrams.cache_dir`
//! - `diagrams.output_dir`
//! - `diagrams.mermaid.program`
//! - `diagrams.plantuml.program`
//! - `include.pandoc`
//!
//! The default renderer programs are `${MERMAID_BIN:-mmdc}` and
//! `${PLANTUML_BIN:-plantuml}`.

mod expand;
mod style;

pub use style::{LanguageColors, Rgb, StyleConfig};

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mdpdf.toml";

/// Default renderer timeout in seconds.
const DEFAULT_TIMEOUT_SECS: f64 = 60.0;

/// Upper bound for the renderer timeout in seconds.
const MAX_TIMEOUT_SECS: f64 = 3600.0;

static LATEX_LENGTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?(pt|mm|cm|in|em|ex|bp)$").unwrap());

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override fail-fast mode.
    pub fail_fast: Option<bool>,
    /// Override the persistent cache directory.
    pub cache_dir: Option<PathBuf>,
    /// Override cache enabled flag (`Some(false)` drops any cache directory).
    pub cache_enabled: Option<bool>,
    /// Override renderer timeout in seconds.
    pub timeout_seconds: Option<f64>,
    /// Override the parser used for included documents.
    pub parser: Option<ParserKind>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dispatcher behaviour.
    pub filter: FilterConfig,
    /// Diagram rendering configuration (paths are relative strings from TOML).
    diagrams: DiagramsConfigRaw,
    /// Document inclusion configuration.
    pub include: IncludeConfig,
    /// Listing style.
    pub style: StyleConfig,

    /// Resolved diagrams configuration (set after loading).
    #[serde(skip)]
    pub diagrams_resolved: DiagramsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Dispatcher behaviour.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Abort the whole run on the first per-node error.
    pub fail_fast: bool,
    /// Maximum nesting of `mdinclude` documents.
    pub max_include_depth: usize,
    /// Vertical space inserted after level-4 headers in LaTeX output.
    /// Empty disables the spacing.
    pub header_spacing: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            fail_fast: false,
            max_include_depth: 16,
            header_spacing: "5pt".to_owned(),
        }
    }
}

/// Command template for an external diagram renderer.
///
/// `program` may carry leading arguments (`java -jar plantuml.jar`).
/// Arguments support the placeholders `{input}`, `{output}`, `{output_dir}`
/// and `{format}`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RendererCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl RendererCommand {
    /// Default Mermaid CLI invocation.
    #[must_use]
    pub fn mermaid() -> Self {
        Self {
            program: "${MERMAID_BIN:-mmdc}".to_owned(),
            args: ["-i", "{input}", "-o", "{output}", "--scale", "4"]
                .map(str::to_owned)
                .to_vec(),
        }
    }

    /// Default `PlantUML` invocation.
    #[must_use]
    pub fn plantuml() -> Self {
        Self {
            program: "${PLANTUML_BIN:-plantuml}".to_owned(),
            args: ["-t{format}", "-o", "{output_dir}", "{input}"]
                .map(str::to_owned)
                .to_vec(),
        }
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        require_non_empty(self.program.trim(), &format!("{field}.program"))?;
        if !self.args.iter().any(|a| a.contains("{input}")) {
            return Err(ConfigError::Validation(format!(
                "{field}.args must reference {{input}}"
            )));
        }
        Ok(())
    }
}

/// Raw diagrams configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct DiagramsConfigRaw {
    render_timeout_seconds: Option<f64>,
    cache_dir: Option<String>,
    output_dir: Option<String>,
    format: Option<String>,
    mermaid: Option<RendererCommand>,
    plantuml: Option<RendererCommand>,
}

/// Resolved diagram rendering configuration with absolute paths.
#[derive(Debug)]
pub struct DiagramsConfig {
    /// Timeout for a single renderer invocation.
    pub render_timeout: Duration,
    /// Persistent artifact cache; `None` disables reuse across runs.
    pub cache_dir: Option<PathBuf>,
    /// Where artifacts go when no cache directory is set.
    pub output_dir: PathBuf,
    /// Forced artifact format (`png`, `pdf`, `svg`); `None` picks by output format.
    pub format: Option<String>,
    pub mermaid: RendererCommand,
    pub plantuml: RendererCommand,
}

impl DiagramsConfig {
    fn with_base(base: &Path) -> Self {
        Self {
            render_timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            cache_dir: None,
            output_dir: base.join("diagram-images"),
            format: None,
            mermaid: RendererCommand::mermaid(),
            plantuml: RendererCommand::plantuml(),
        }
    }
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self::with_base(Path::new("."))
    }
}

/// Parser used for documents pulled in by `mdinclude`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserKind {
    /// Spawn `pandoc -f markdown -t json`, matching the host pipeline.
    #[default]
    Pandoc,
    /// In-process `CommonMark` parser.
    Builtin,
}

impl FromStr for ParserKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pandoc" => Ok(Self::Pandoc),
            "builtin" => Ok(Self::Builtin),
            other => Err(ConfigError::Validation(format!(
                "unknown parser '{other}' (valid: pandoc, builtin)"
            ))),
        }
    }
}

/// Document inclusion configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IncludeConfig {
    pub parser: ParserKind,
    /// Pandoc executable for [`ParserKind::Pandoc`].
    pub pandoc: String,
}

impl Default for IncludeConfig {
    fn default() -> Self {
        Self {
            parser: ParserKind::default(),
            pandoc: "pandoc".to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`diagrams.cache_dir`").
        field: String,
        /// Error message (e.g., "${`CACHE_ROOT`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mdpdf.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values. The result is
    /// validated after the overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// the final configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()?
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) -> Result<(), ConfigError> {
        if let Some(fail_fast) = settings.fail_fast {
            self.filter.fail_fast = fail_fast;
        }
        if let Some(cache_dir) = &settings.cache_dir {
            self.diagrams_resolved.cache_dir = Some(cache_dir.clone());
        }
        if settings.cache_enabled == Some(false) {
            self.diagrams_resolved.cache_dir = None;
        }
        if let Some(seconds) = settings.timeout_seconds {
            self.diagrams_resolved.render_timeout = timeout_from_secs(seconds)?;
        }
        if let Some(parser) = settings.parser {
            self.include.parser = parser;
        }
        Ok(())
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_filter()?;
        self.validate_diagrams()?;
        require_non_empty(self.include.pandoc.trim(), "include.pandoc")?;
        self.style.validate()?;
        Ok(())
    }

    fn validate_filter(&self) -> Result<(), ConfigError> {
        const MAX_DEPTH: usize = 256;

        if self.filter.max_include_depth == 0 || self.filter.max_include_depth > MAX_DEPTH {
            return Err(ConfigError::Validation(format!(
                "filter.max_include_depth must be between 1 and {MAX_DEPTH}"
            )));
        }

        let spacing = &self.filter.header_spacing;
        if !spacing.is_empty() && !LATEX_LENGTH.is_match(spacing) {
            return Err(ConfigError::Validation(format!(
                "filter.header_spacing '{spacing}' is not a LaTeX length (e.g. 5pt)"
            )));
        }

        Ok(())
    }

    fn validate_diagrams(&self) -> Result<(), ConfigError> {
        let diagrams = &self.diagrams_resolved;

        if diagrams.render_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "diagrams.render_timeout_seconds must be greater than 0".to_owned(),
            ));
        }
        if let Some(format) = &diagrams.format
            && !matches!(format.as_str(), "png" | "pdf" | "svg")
        {
            return Err(ConfigError::Validation(format!(
                "diagrams.format '{format}' is not one of png, pdf, svg"
            )));
        }
        diagrams.mermaid.validate("diagrams.mermaid")?;
        diagrams.plantuml.validate("diagrams.plantuml")?;

        Ok(())
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().unwrap_or_default();
        let mut config = Self::default_with_base(&cwd);
        config.resolve_paths(&cwd)?;
        Ok(config)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            filter: FilterConfig::default(),
            diagrams: DiagramsConfigRaw::default(),
            include: IncludeConfig::default(),
            style: StyleConfig::default(),
            diagrams_resolved: DiagramsConfig::with_base(base),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Expand environment variables and resolve relative paths against the
    /// config directory.
    fn resolve_paths(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let raw = &self.diagrams;

        let resolve_dir = |value: Option<&str>, field: &str| -> Result<Option<PathBuf>, ConfigError> {
            value
                .map(|v| expand::expand_env(v, field).map(|v| config_dir.join(v)))
                .transpose()
        };

        let render_timeout = match raw.render_timeout_seconds {
            Some(seconds) => timeout_from_secs(seconds)?,
            None => Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
        };

        let mut mermaid = raw.mermaid.clone().unwrap_or_else(RendererCommand::mermaid);
        mermaid.program = expand::expand_env(&mermaid.program, "diagrams.mermaid.program")?;
        let mut plantuml = raw
            .plantuml
            .clone()
            .unwrap_or_else(RendererCommand::plantuml);
        plantuml.program = expand::expand_env(&plantuml.program, "diagrams.plantuml.program")?;

        self.diagrams_resolved = DiagramsConfig {
            render_timeout,
            cache_dir: resolve_dir(raw.cache_dir.as_deref(), "diagrams.cache_dir")?,
            output_dir: resolve_dir(raw.output_dir.as_deref(), "diagrams.output_dir")?
                .unwrap_or_else(|| config_dir.join("diagram-images")),
            format: raw.format.clone(),
            mermaid,
            plantuml,
        };

        self.include.pandoc = expand::expand_env(&self.include.pandoc, "include.pandoc")?;

        Ok(())
    }
}

fn timeout_from_secs(seconds: f64) -> Result<Duration, ConfigError> {
    if !seconds.is_finite() || seconds <= 0.0 || seconds > MAX_TIMEOUT_SECS {
        return Err(ConfigError::Validation(format!(
            "diagrams.render_timeout_seconds must be between 0 and {MAX_TIMEOUT_SECS}"
        )));
    }
    Ok(Duration::from_secs_f64(seconds))
}

//! Assembler configuration management.
//!
//! Handles loading, parsing, and validating the `bindery.toml` configuration file.

use crate::cli::Cli;
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Default values for serde deserialization
pub mod config_defaults {
    pub mod template {
        pub fn source() -> Option<String> {
            None
        }
        pub fn embedded_title() -> String {
            "Blog Template".into()
        }
    }

    pub mod data {
        pub fn path() -> String {
            "/tests/data".into()
        }
        pub fn host() -> String {
            "localhost".into()
        }
        pub fn local_hosts() -> Vec<String> {
            vec!["localhost".into(), "127.0.0.1".into()]
        }
    }

    pub mod output {
        use std::path::PathBuf;

        pub fn container() -> String {
            "_app".into()
        }
        pub fn dir() -> PathBuf {
            "public".into()
        }
    }
}

/// `[template]` section in bindery.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct TemplateConfig {
    /// Template source locator for authoring builds,
    /// e.g.: "/templates/blog.html"
    #[serde(default = "config_defaults::template::source")]
    #[educe(Default = config_defaults::template::source())]
    pub source: Option<String>,

    /// `data-title` value marking the working template embedded in a
    /// published page
    #[serde(default = "config_defaults::template::embedded_title")]
    #[educe(Default = config_defaults::template::embedded_title())]
    pub embedded_title: String,

    /// Fragment name -> retrieval target mapping for `<file>` placeholders
    #[serde(default)]
    pub fragments: HashMap<String, String>,
}

/// `[data]` section in bindery.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    /// Data document path template; the page's file name is appended,
    /// e.g.: "/tests/data"
    #[serde(default = "config_defaults::data::path")]
    #[educe(Default = config_defaults::data::path())]
    pub path: String,

    /// Host this build runs on. Substituted for "localhost" in the data
    /// path when it is not a recognized local-development host.
    #[serde(default = "config_defaults::data::host")]
    #[educe(Default = config_defaults::data::host())]
    pub host: String,

    /// Hosts treated as local development
    #[serde(default = "config_defaults::data::local_hosts")]
    #[educe(Default = config_defaults::data::local_hosts())]
    pub local_hosts: Vec<String>,
}

/// `[output]` section in bindery.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Class of the host page element that receives the assembled tree
    #[serde(default = "config_defaults::output::container")]
    #[educe(Default = config_defaults::output::container())]
    pub container: String,

    /// Output directory path (relative to root)
    #[serde(default = "config_defaults::output::dir")]
    #[educe(Default = config_defaults::output::dir())]
    pub dir: PathBuf,
}

/// Root configuration structure representing bindery.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BinderyConfig {
    /// CLI arguments reference
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Project root; template, fragment and data targets resolve here
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Template sources and fragment mappings
    #[serde(default)]
    pub template: TemplateConfig,

    /// Data document retrieval settings
    #[serde(default)]
    pub data: DataConfig,

    /// Assembled page output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// User-defined extra fields
    #[serde(default)]
    pub extra: HashMap<String, toml::Value>,
}

#[test]
fn validate_full_config() {
    let config = r#"
        root = "site"

        [template]
        source = "/templates/blog.html"
        embedded_title = "Journal Template"

        [template.fragments]
        nav = "/templates/nav.html"
        footer = "/templates/footer.html"

        [data]
        path = "//localhost/data"
        host = "blog.example.com"
        local_hosts = ["localhost"]

        [output]
        container = "_content"
        dir = "dist"
    "#;
    let config: BinderyConfig = toml::from_str(config).unwrap();

    assert_eq!(config.root, Some(PathBuf::from("site")));
    assert_eq!(config.template.source.as_deref(), Some("/templates/blog.html"));
    assert_eq!(config.template.embedded_title, "Journal Template");
    assert_eq!(
        config.template.fragments.get("nav").map(String::as_str),
        Some("/templates/nav.html")
    );
    assert_eq!(config.data.path, "//localhost/data");
    assert_eq!(config.data.host, "blog.example.com");
    assert_eq!(config.data.local_hosts, vec!["localhost".to_string()]);
    assert_eq!(config.output.container, "_content");
    assert_eq!(config.output.dir, PathBuf::from("dist"));
}

#[test]
fn test_template_config_defaults() {
    let config: BinderyConfig = toml::from_str("").unwrap();

    assert_eq!(config.template.source, None);
    assert_eq!(config.template.embedded_title, "Blog Template");
    assert!(config.template.fragments.is_empty());
}

#[test]
fn test_data_config_defaults() {
    let config: BinderyConfig = toml::from_str("").unwrap();

    assert_eq!(config.data.path, "/tests/data");
    assert_eq!(config.data.host, "localhost");
    assert_eq!(
        config.data.local_hosts,
        vec!["localhost".to_string(), "127.0.0.1".to_string()]
    );
}

#[test]
fn test_output_config_defaults() {
    let config: BinderyConfig = toml::from_str("").unwrap();

    assert_eq!(config.output.container, "_app");
    assert_eq!(config.output.dir, PathBuf::from("public"));
}

#[test]
fn test_extra_fields() {
    let config = r#"
        [extra]
        custom_field = "custom_value"
        number_field = 42
    "#;
    let config: BinderyConfig = toml::from_str(config).unwrap();

    assert_eq!(
        config.extra.get("custom_field").and_then(|v| v.as_str()),
        Some("custom_value")
    );
    assert_eq!(
        config.extra.get("number_field").and_then(|v| v.as_integer()),
        Some(42)
    );
}

#[test]
fn test_unknown_field_rejection_in_template() {
    let config = r#"
        [template]
        unknown_field = "should_fail"
    "#;
    let result: Result<BinderyConfig, _> = toml::from_str(config);

    assert!(result.is_err());
    let err = result.unwrap_err().to_string();
    assert!(err.contains("unknown field"));
}

#[test]
fn test_unknown_field_rejection_in_data() {
    let config = r#"
        [data]
        unknown_field = "should_fail"
    "#;
    let result: Result<BinderyConfig, _> = toml::from_str(config);

    assert!(result.is_err());
}

#[test]
fn test_unknown_field_rejection_in_output() {
    let config = r#"
        [output]
        unknown_field = "should_fail"
    "#;
    let result: Result<BinderyConfig, _> = toml::from_str(config);

    assert!(result.is_err());
}

#[test]
fn test_from_str_invalid_toml() {
    let invalid_config = r#"
        [template
        source = "/t.html"
    "#;
    let result = BinderyConfig::from_str(invalid_config);

    assert!(result.is_err());
}

#[test]
fn test_get_root_default() {
    let config = BinderyConfig::default();
    assert_eq!(config.get_root(), Path::new("./"));
}

#[test]
fn test_set_root() {
    let mut config = BinderyConfig::default();
    config.set_root(Path::new("/custom/path"));
    assert_eq!(config.get_root(), Path::new("/custom/path"));
}

#[test]
fn test_config_error_display() {
    let io_err = ConfigError::Io(
        PathBuf::from("bindery.toml"),
        std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
    );
    let display = format!("{}", io_err);
    assert!(display.contains("IO error"));
    assert!(display.contains("bindery.toml"));

    let validation_err = ConfigError::Validation("Test validation error".to_string());
    let display = format!("{}", validation_err);
    assert!(display.contains("Test validation error"));
}

impl BinderyConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: BinderyConfig = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.root = Some(path.to_path_buf())
    }

    /// Get CLI arguments reference
    pub fn get_cli(&self) -> &'static Cli {
        self.cli.unwrap()
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &'static Cli) {
        self.cli = Some(cli);

        let root = cli.root.clone().unwrap_or_else(|| self.get_root().to_owned());
        self.set_root(&root);
        self.output.dir = root.join(&self.output.dir);

        let args = cli.assemble_args();
        Self::update_option(&mut self.data.path, args.data_path.as_ref());
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Validate configuration for the current command
    pub fn validate(&self) -> Result<()> {
        let cli = self.get_cli();
        let args = cli.assemble_args();

        if cli.is_export() && args.published {
            bail!(ConfigError::Validation(
                "export needs an authoring build; drop --published".into()
            ));
        }

        if !args.published && self.template.source.is_none() {
            bail!(ConfigError::Validation(
                "[template.source] is required in authoring mode".into()
            ));
        }

        if self.output.container.is_empty() {
            bail!(ConfigError::Validation(
                "[output.container] must not be empty".into()
            ));
        }

        if self.data.path.is_empty() {
            bail!(ConfigError::Validation(
                "[data.path] must not be empty".into()
            ));
        }

        Ok(())
    }
}

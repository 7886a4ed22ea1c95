//! Configuration management for webdoc.
//!
//! Parses `wd.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//! - any other `$` is kept as is
//!
//! Expanded fields:
//! - `templates.dir`
//! - `cache.dir`
//! - `cache.secret`
//! - `render.tmp_dir`
//!
//! When `cache.secret` is absent the `WD_SECRET` environment variable is used.

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override template root directory.
    pub templates_dir: Option<PathBuf>,
    /// Override cache root directory.
    pub cache_dir: Option<PathBuf>,
    /// Override render temp directory.
    pub tmp_dir: Option<PathBuf>,
    /// Override cache key secret.
    pub secret: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "wd.toml";

/// Environment variable consulted when `cache.secret` is not configured.
pub const SECRET_ENV_VAR: &str = "WD_SECRET";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    templates: TemplatesConfigRaw,
    cache: CacheConfigRaw,
    render: RenderConfigRaw,

    /// Resolved templates configuration (set after loading).
    #[serde(skip)]
    pub templates_resolved: TemplatesConfig,
    /// Resolved cache configuration (set after loading).
    #[serde(skip)]
    pub cache_resolved: CacheConfig,
    /// Resolved render configuration (set after loading).
    #[serde(skip)]
    pub render_resolved: RenderConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TemplatesConfigRaw {
    dir: Option<String>,
    preprocessors: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheConfigRaw {
    dir: Option<String>,
    secret: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RenderConfigRaw {
    tmp_dir: Option<String>,
}

/// Resolved templates configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TemplatesConfig {
    /// Template root directory.
    pub dir: PathBuf,
    /// Preprocessor identifiers, in order. `None` selects the standard chain.
    pub preprocessors: Option<Vec<String>>,
}

/// Resolved cache configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Cache root directory.
    pub dir: PathBuf,
    /// Secret mixed into every cache key.
    pub secret: String,
}

/// Resolved render configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Directory for render working trees and output files.
    pub tmp_dir: PathBuf,
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
        /// Config field path (e.g., "`cache.secret`").
        field: String,
        /// Error message (e.g., "${`WD_SECRET`} not set").
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
    /// Otherwise, searches for `wd.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
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
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(dir) = &settings.templates_dir {
            self.templates_resolved.dir.clone_from(dir);
        }
        if let Some(dir) = &settings.cache_dir {
            self.cache_resolved.dir.clone_from(dir);
        }
        if let Some(dir) = &settings.tmp_dir {
            self.render_resolved.tmp_dir.clone_from(dir);
        }
        if let Some(secret) = &settings.secret {
            self.cache_resolved.secret.clone_from(secret);
        }
    }

    /// Cache key secret, required to be non-empty.
    ///
    /// Only commands that touch the cache call this, so rendering works
    /// without a secret configured.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the secret is empty.
    pub fn require_secret(&self) -> Result<&str, ConfigError> {
        require_non_empty(&self.cache_resolved.secret, "cache.secret")?;
        Ok(&self.cache_resolved.secret)
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

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            templates: TemplatesConfigRaw::default(),
            cache: CacheConfigRaw::default(),
            render: RenderConfigRaw::default(),
            templates_resolved: TemplatesConfig {
                dir: base.join("templates"),
                preprocessors: None,
            },
            cache_resolved: CacheConfig {
                dir: base.join(".wd/cache"),
                secret: secret_from_env(),
            },
            render_resolved: RenderConfig {
                tmp_dir: base.join(".wd/tmp"),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any preprocessor entry is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(names) = &self.templates_resolved.preprocessors {
            for (i, name) in names.iter().enumerate() {
                require_non_empty(name.trim(), &format!("templates.preprocessors[{i}]"))?;
            }
        }
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        expand::expand_opt(&mut self.templates.dir, "templates.dir")?;
        expand::expand_opt(&mut self.cache.dir, "cache.dir")?;
        expand::expand_opt(&mut self.cache.secret, "cache.secret")?;
        expand::expand_opt(&mut self.render.tmp_dir, "render.tmp_dir")?;
        Ok(())
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.templates_resolved = TemplatesConfig {
            dir: resolve(self.templates.dir.as_deref(), "templates"),
            preprocessors: self.templates.preprocessors.clone(),
        };
        self.cache_resolved = CacheConfig {
            dir: resolve(self.cache.dir.as_deref(), ".wd/cache"),
            secret: self.cache.secret.clone().unwrap_or_else(secret_from_env),
        };
        self.render_resolved = RenderConfig {
            tmp_dir: resolve(self.render.tmp_dir.as_deref(), ".wd/tmp"),
        };
    }
}

fn secret_from_env() -> String {
    std::env::var(SECRET_ENV_VAR).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/project"));
        assert_eq!(
            config.templates_resolved.dir,
            PathBuf::from("/project/templates")
        );
        assert_eq!(config.templates_resolved.preprocessors, None);
        assert_eq!(config.cache_resolved.dir, PathBuf::from("/project/.wd/cache"));
        assert_eq!(
            config.render_resolved.tmp_dir,
            PathBuf::from("/project/.wd/tmp")
        );
        assert!(config.config_path.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.templates.dir.is_none());
        assert!(config.cache.secret.is_none());
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[templates]
dir = "tpl"
preprocessors = ["unescape_template_tags"]

[cache]
dir = "/var/cache/wd"
secret = "s3cret"

[render]
tmp_dir = "scratch"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.templates_resolved,
            TemplatesConfig {
                dir: PathBuf::from("/project/tpl"),
                preprocessors: Some(vec!["unescape_template_tags".to_owned()]),
            }
        );
        assert_eq!(
            config.cache_resolved,
            CacheConfig {
                dir: PathBuf::from("/var/cache/wd"),
                secret: "s3cret".to_owned(),
            }
        );
        assert_eq!(
            config.render_resolved.tmp_dir,
            PathBuf::from("/project/scratch")
        );
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            "[cache]\nsecret = \"abc\"\n\n[templates]\ndir = \"layouts\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(config.templates_resolved.dir, tmp.path().join("layouts"));
        assert_eq!(config.cache_resolved.dir, tmp.path().join(".wd/cache"));
        assert_eq!(config.require_secret().unwrap(), "abc");
    }

    #[test]
    fn test_load_secret_with_dollar_sign() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[cache]\nsecret = \"k8$ab#x$\"\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.require_secret().unwrap(), "k8$ab#x$");
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.toml");
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(p) if p == path));
    }

    #[test]
    fn test_load_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[cache\n").unwrap();
        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/project"));
        let settings = CliSettings {
            templates_dir: Some(PathBuf::from("/elsewhere/templates")),
            cache_dir: None,
            tmp_dir: Some(PathBuf::from("/tmp/wd")),
            secret: Some("override".to_owned()),
        };
        config.apply_cli_settings(&settings);

        assert_eq!(
            config.templates_resolved.dir,
            PathBuf::from("/elsewhere/templates")
        );
        assert_eq!(config.cache_resolved.dir, PathBuf::from("/project/.wd/cache"));
        assert_eq!(config.render_resolved.tmp_dir, PathBuf::from("/tmp/wd"));
        assert_eq!(config.cache_resolved.secret, "override");
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/project"));
        let before = config.cache_resolved.clone();
        config.apply_cli_settings(&CliSettings::default());
        assert_eq!(config.cache_resolved, before);
    }

    #[test]
    fn test_expand_env_vars_cache_secret() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("WD_CONFIG_TEST_SECRET", "from-env");
        }

        let toml = r#"
[cache]
secret = "${WD_CONFIG_TEST_SECRET}"
dir = "${WD_CONFIG_TEST_UNSET_DIR:-store}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(config.cache.secret.as_deref(), Some("from-env"));
        assert_eq!(config.cache.dir.as_deref(), Some("store"));

        unsafe {
            std::env::remove_var("WD_CONFIG_TEST_SECRET");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("WD_CONFIG_TEST_MISSING");
        }

        let toml = r#"
[render]
tmp_dir = "${WD_CONFIG_TEST_MISSING}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("WD_CONFIG_TEST_MISSING"));
        assert!(err.to_string().contains("render.tmp_dir"));
    }

    #[test]
    fn test_expand_env_vars_literal_unchanged() {
        let toml = r#"
[templates]
dir = "templates"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();
        assert_eq!(config.templates.dir.as_deref(), Some("templates"));
    }

    // Validation tests

    fn assert_validation_error(config: &Config, expected_substrings: &[&str]) {
        let result = config.validate();
        assert!(result.is_err(), "Expected validation to fail");
        let err = result.unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let msg = err.to_string();
        for s in expected_substrings {
            assert!(
                msg.contains(s),
                "Expected error to contain '{s}', got: {msg}"
            );
        }
    }

    #[test]
    fn test_validate_default_config_passes() {
        let config = Config::default_with_base(Path::new("/test"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_preprocessor_entry() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.templates_resolved.preprocessors =
            Some(vec!["strip_markup_in_tags".to_owned(), " ".to_owned()]);
        assert_validation_error(&config, &["templates.preprocessors[1]", "cannot be empty"]);
    }

    #[test]
    fn test_validate_empty_preprocessor_list_passes() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.templates_resolved.preprocessors = Some(Vec::new());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_require_secret_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.cache_resolved.secret = String::new();
        let err = config.require_secret().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("cache.secret"));
    }
}

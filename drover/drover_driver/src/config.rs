//! Configuration for the driver factory
//!
//! Handles loading driver configuration from TOML or from a flat
//! `key=value` properties file.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use drover_core::{ConfigError, ConfigValue, LogLevel};
use drover_pool::PoolConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "DROVER_CONFIG";

/// Configuration file used when neither a path nor the environment names one.
pub const DEFAULT_CONFIG_PATH: &str = "drover.toml";

/// PhantomJS options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhantomJsConfig {
    /// Path to the PhantomJS executable; required for the phantomjs backend
    #[serde(default)]
    pub exec_path: Option<PathBuf>,

    /// Path to an external GhostDriver; the built-in one is used if unset
    #[serde(default)]
    pub driver_path: Option<PathBuf>,

    /// GhostDriver log level
    #[serde(default)]
    pub driver_log_level: LogLevel,
}

/// Chrome options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChromeConfig {
    /// Path to chromedriver; looked up on `PATH` if unset
    #[serde(default)]
    pub driver_path: Option<PathBuf>,

    /// Extra browser arguments appended after the defaults
    #[serde(default)]
    pub args: Vec<String>,
}

/// Firefox options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FirefoxConfig {
    /// Path to geckodriver; looked up on `PATH` if unset
    #[serde(default)]
    pub driver_path: Option<PathBuf>,
}

/// Driver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Backend selector: `phantomjs`, `chrome`, `firefox` or a remote URL
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Pool settings
    #[serde(default)]
    pub pool: PoolConfig,

    /// Prefix for per-session Chrome profile directories
    #[serde(default = "default_sessions_path_prefix")]
    pub sessions_path_prefix: String,

    #[serde(default)]
    pub phantomjs: PhantomJsConfig,

    #[serde(default)]
    pub chrome: ChromeConfig,

    #[serde(default)]
    pub firefox: FirefoxConfig,

    /// Additional configuration
    #[serde(default)]
    pub extra: HashMap<String, ConfigValue>,
}

fn default_driver() -> String {
    "phantomjs".to_string()
}

fn default_sessions_path_prefix() -> String {
    "/tmp/selenium".to_string()
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            pool: PoolConfig::default(),
            sessions_path_prefix: default_sessions_path_prefix(),
            phantomjs: PhantomJsConfig::default(),
            chrome: ChromeConfig::default(),
            firefox: FirefoxConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl DriverConfig {
    /// Work out which file to load: the explicit path, else
    /// `DROVER_CONFIG`, else [`DEFAULT_CONFIG_PATH`].
    ///
    /// The flag is true when the path was asked for explicitly.
    pub fn resolve_path(path: Option<&Path>) -> (PathBuf, bool) {
        if let Some(path) = path {
            return (path.to_path_buf(), true);
        }
        match env::var_os(CONFIG_ENV_VAR) {
            Some(value) if !value.is_empty() => (PathBuf::from(value), true),
            _ => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        }
    }

    /// Load configuration.
    ///
    /// A missing file is an error only if it was named explicitly; otherwise
    /// defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = Self::resolve_path(path);

        if !path.exists() {
            if explicit {
                return Err(ConfigError::LoadFailed(format!(
                    "configuration file not found: {}",
                    path.display()
                )));
            }
            info!("No configuration file at {}, using defaults", path.display());
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }

        info!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(&path).map_err(|e| {
            ConfigError::LoadFailed(format!("failed to read {}: {}", path.display(), e))
        })?;

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("properties") | Some("ini") => Self::from_properties_str(&content)?,
            _ => Self::from_toml_str(&content)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse TOML configuration.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Parse a flat `key=value` properties file.
    ///
    /// Recognized keys are `driver`, `capacity`, `acquire_timeout_ms`,
    /// `sessions_path_prefix`, `phantomjs_exec_path`, `phantomjs_driver_path`,
    /// `phantomjs_driver_loglevel`, `chrome_driver_path`, `chrome_args`
    /// (comma separated) and `firefox_driver_path`. Anything else goes to
    /// `extra`.
    pub fn from_properties_str(content: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') || line.starts_with('!') {
                continue;
            }
            // Section headers carry no meaning in the flat format
            if line.starts_with('[') && line.ends_with(']') {
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .or_else(|| line.split_once(':'))
                .ok_or_else(|| {
                    ConfigError::ParseFailed(format!(
                        "line {}: expected key=value, found '{}'",
                        lineno + 1,
                        line
                    ))
                })?;
            let (key, value) = (key.trim(), value.trim());

            match key {
                "driver" => config.driver = value.to_string(),
                "capacity" => config.pool.capacity = parse_number(key, value)?,
                "acquire_timeout_ms" => config.pool.acquire_timeout_ms = Some(parse_number(key, value)?),
                "sessions_path_prefix" => config.sessions_path_prefix = value.to_string(),
                "phantomjs_exec_path" => config.phantomjs.exec_path = non_empty_path(value),
                "phantomjs_driver_path" => config.phantomjs.driver_path = non_empty_path(value),
                "phantomjs_driver_loglevel" => config.phantomjs.driver_log_level = value.parse()?,
                "chrome_driver_path" => config.chrome.driver_path = non_empty_path(value),
                "chrome_args" => {
                    config.chrome.args = value
                        .split(',')
                        .map(str::trim)
                        .filter(|a| !a.is_empty())
                        .map(String::from)
                        .collect()
                }
                "firefox_driver_path" => config.firefox.driver_path = non_empty_path(value),
                _ => {
                    debug!("Unrecognized configuration key '{}' kept in extra", key);
                    config
                        .extra
                        .insert(key.to_string(), ConfigValue::parse_scalar(value));
                }
            }
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.driver.trim().is_empty() {
            return Err(ConfigError::Invalid("driver cannot be empty".to_string()));
        }

        self.pool.validate()?;

        if self.sessions_path_prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "sessions path prefix cannot be empty".to_string(),
            ));
        }

        if self.driver == "phantomjs" && self.phantomjs.exec_path.is_none() {
            warn!("phantomjs backend selected but phantomjs.exec_path is not set");
        }

        Ok(())
    }

    /// Merge with another configuration
    ///
    /// Values in `other` that differ from the defaults win.
    pub fn merge(&mut self, other: DriverConfig) {
        let defaults = DriverConfig::default();

        if other.driver != defaults.driver {
            self.driver = other.driver;
        }

        if other.pool.capacity != defaults.pool.capacity {
            self.pool.capacity = other.pool.capacity;
        }
        if other.pool.acquire_timeout_ms.is_some() {
            self.pool.acquire_timeout_ms = other.pool.acquire_timeout_ms;
        }

        if other.sessions_path_prefix != defaults.sessions_path_prefix {
            self.sessions_path_prefix = other.sessions_path_prefix;
        }

        if other.phantomjs.exec_path.is_some() {
            self.phantomjs.exec_path = other.phantomjs.exec_path;
        }
        if other.phantomjs.driver_path.is_some() {
            self.phantomjs.driver_path = other.phantomjs.driver_path;
        }
        if other.phantomjs.driver_log_level != defaults.phantomjs.driver_log_level {
            self.phantomjs.driver_log_level = other.phantomjs.driver_log_level;
        }

        if other.chrome.driver_path.is_some() {
            self.chrome.driver_path = other.chrome.driver_path;
        }
        self.chrome.args.extend(other.chrome.args);

        if other.firefox.driver_path.is_some() {
            self.firefox.driver_path = other.firefox.driver_path;
        }

        for (key, value) in other.extra {
            self.extra.insert(key, value);
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::ParseFailed(format!("'{}' is not a valid number for {}", value, key)))
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| PathBuf::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    #[test]
    fn test_default_config() {
        let config = DriverConfig::default();

        assert_eq!(config.driver, "phantomjs");
        assert_eq!(config.pool.capacity, 5);
        assert_eq!(config.sessions_path_prefix, "/tmp/selenium");
        assert_eq!(config.phantomjs.driver_log_level, LogLevel::Info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_toml() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
driver = "chrome"
sessions_path_prefix = "/var/tmp/profiles/"

[pool]
capacity = 3
acquire_timeout_ms = 1500

[chrome]
driver_path = "/opt/chromedriver"
args = ["headless"]

[extra]
region = "eu"
"#
        )
        .unwrap();

        let config = DriverConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.driver, "chrome");
        assert_eq!(config.pool.capacity, 3);
        assert_eq!(config.pool.acquire_timeout_ms, Some(1500));
        assert_eq!(config.sessions_path_prefix, "/var/tmp/profiles/");
        assert_eq!(config.chrome.driver_path, Some(PathBuf::from("/opt/chromedriver")));
        assert_eq!(config.chrome.args, vec!["headless".to_string()]);
        assert_eq!(config.extra.get("region"), Some(&ConfigValue::from("eu")));
    }

    #[test]
    fn test_load_properties() {
        let mut file = Builder::new().suffix(".ini").tempfile().unwrap();
        writeln!(file, "# selenium pool").unwrap();
        writeln!(file, "driver=phantomjs").unwrap();
        writeln!(file, "phantomjs_exec_path=/usr/local/bin/phantomjs").unwrap();
        writeln!(file, "phantomjs_driver_loglevel=debug").unwrap();
        writeln!(file, "capacity = 2").unwrap();
        writeln!(file, "retries=3").unwrap();

        let config = DriverConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.driver, "phantomjs");
        assert_eq!(
            config.phantomjs.exec_path,
            Some(PathBuf::from("/usr/local/bin/phantomjs"))
        );
        assert!(config.phantomjs.driver_path.is_none());
        assert_eq!(config.phantomjs.driver_log_level, LogLevel::Debug);
        assert_eq!(config.pool.capacity, 2);
        assert_eq!(config.extra.get("retries"), Some(&ConfigValue::Integer(3)));
    }

    #[test]
    fn test_properties_rejects_garbage() {
        let result = DriverConfig::from_properties_str("driver\n");
        assert!(matches!(result, Err(ConfigError::ParseFailed(_))));

        let result = DriverConfig::from_properties_str("capacity=lots\n");
        assert!(matches!(result, Err(ConfigError::ParseFailed(_))));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            DriverConfig::load(Some(&path)),
            Err(ConfigError::LoadFailed(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "[pool]\ncapacity = 0\n").unwrap();

        assert!(matches!(
            DriverConfig::load(Some(file.path())),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_prefix() {
        let mut config = DriverConfig::default();
        config.sessions_path_prefix = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_merge_config() {
        let mut base = DriverConfig::default();
        base.phantomjs.exec_path = Some(PathBuf::from("/usr/bin/phantomjs"));

        let mut override_config = DriverConfig::default();
        override_config.driver = "firefox".to_string();
        override_config.pool.capacity = 8;
        override_config
            .extra
            .insert("headless".to_string(), ConfigValue::Bool(true));

        base.merge(override_config);

        assert_eq!(base.driver, "firefox");
        assert_eq!(base.pool.capacity, 8);
        // Untouched settings survive
        assert_eq!(base.phantomjs.exec_path, Some(PathBuf::from("/usr/bin/phantomjs")));
        assert_eq!(base.extra.get("headless"), Some(&ConfigValue::Bool(true)));
    }
}

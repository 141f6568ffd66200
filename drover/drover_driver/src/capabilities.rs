//! WebDriver capabilities requested for every session.

use std::path::PathBuf;

use drover_core::FactoryError;
use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::config::DriverConfig;

/// Arguments passed to the PhantomJS process.
pub const PHANTOMJS_CLI_ARGS: [&str; 3] = [
    "--web-security=false",
    "--ssl-protocol=any",
    "--ignore-ssl-errors=true",
];

/// Arguments passed to Chrome before any configured extras.
pub const CHROME_DEFAULT_ARGS: [&str; 3] = [
    "websecurity=false",
    "ssl-protocol=any",
    "ignore-ssl-errors=true",
];

/// Desired capabilities, serialized with the WebDriver key names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(rename = "browserName")]
    pub browser_name: String,

    #[serde(rename = "javascriptEnabled")]
    pub javascript_enabled: bool,

    #[serde(rename = "takesScreenshot")]
    pub takes_screenshot: bool,

    #[serde(
        rename = "phantomjs.binary.path",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub phantomjs_exec_path: Option<PathBuf>,

    #[serde(
        rename = "phantomjs.ghostdriver.path",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ghostdriver_path: Option<PathBuf>,

    #[serde(rename = "phantomjs.cli.args", default)]
    pub phantomjs_cli_args: Vec<String>,

    #[serde(rename = "phantomjs.ghostdriver.cli.args", default)]
    pub ghostdriver_cli_args: Vec<String>,

    #[serde(rename = "chromeArgs", default, skip_serializing_if = "Vec::is_empty")]
    pub chrome_args: Vec<String>,
}

impl Capabilities {
    /// Build the capabilities for `backend` from configuration.
    ///
    /// The phantomjs backend requires `phantomjs.exec_path`.
    pub fn resolve(config: &DriverConfig, backend: &Backend) -> Result<Self, FactoryError> {
        let mut caps = Self {
            browser_name: backend.browser_name().to_string(),
            javascript_enabled: true,
            takes_screenshot: false,
            phantomjs_exec_path: None,
            ghostdriver_path: None,
            phantomjs_cli_args: PHANTOMJS_CLI_ARGS.iter().map(|s| s.to_string()).collect(),
            ghostdriver_cli_args: vec![format!(
                "--logLevel={}",
                config.phantomjs.driver_log_level
            )],
            chrome_args: Vec::new(),
        };

        match backend {
            Backend::PhantomJs => {
                let exec_path = config
                    .phantomjs
                    .exec_path
                    .clone()
                    .ok_or_else(|| FactoryError::MissingOption("phantomjs.exec_path".to_string()))?;
                caps.phantomjs_exec_path = Some(exec_path);
                caps.ghostdriver_path = config.phantomjs.driver_path.clone();
            }
            Backend::Chrome => {
                caps.chrome_args = CHROME_DEFAULT_ARGS
                    .iter()
                    .map(|s| s.to_string())
                    .chain(config.chrome.args.iter().cloned())
                    .collect();
            }
            Backend::Firefox | Backend::Remote(_) => {}
        }

        Ok(caps)
    }

    /// Copy of these capabilities pinned to a Chrome profile directory.
    pub fn with_user_data_dir(&self, prefix: &str, slot: usize) -> Self {
        let mut caps = self.clone();
        caps.chrome_args.push(format!("user-data-dir={}{}", prefix, slot));
        caps
    }

    /// Whether PhantomJS should use the GhostDriver it ships with.
    pub fn uses_builtin_ghostdriver(&self) -> bool {
        self.ghostdriver_path.is_none()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

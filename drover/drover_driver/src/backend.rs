//! Backend selection.

use std::fmt;

use drover_core::FactoryError;
use http::Uri;

/// The kind of browser session a factory produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// A WebDriver server that is already running somewhere
    Remote(Uri),

    /// Local chromedriver
    Chrome,

    /// Local geckodriver
    Firefox,

    /// Local PhantomJS with GhostDriver
    PhantomJs,
}

impl Backend {
    /// Pick a backend from the `driver` selector.
    ///
    /// An absolute `http`/`https` URL selects a remote server; `chrome`,
    /// `firefox` and `phantomjs` select a local driver.
    pub fn select(selector: &str) -> Result<Self, FactoryError> {
        let selector = selector.trim();

        if let Some(uri) = parse_remote(selector) {
            return Ok(Backend::Remote(uri));
        }

        match selector {
            "chrome" => Ok(Backend::Chrome),
            "firefox" => Ok(Backend::Firefox),
            "phantomjs" => Ok(Backend::PhantomJs),
            other => Err(FactoryError::UnknownBackend(other.to_string())),
        }
    }

    /// Name of the browser, as reported in capabilities.
    ///
    /// Remote servers are driven as PhantomJS.
    pub fn browser_name(&self) -> &'static str {
        match self {
            Backend::Remote(_) | Backend::PhantomJs => "phantomjs",
            Backend::Chrome => "chrome",
            Backend::Firefox => "firefox",
        }
    }

    /// Name of the driver executable for local backends.
    pub fn driver_binary(&self) -> Option<&'static str> {
        match self {
            Backend::Remote(_) => None,
            Backend::Chrome => Some("chromedriver"),
            Backend::Firefox => Some("geckodriver"),
            Backend::PhantomJs => Some("phantomjs"),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Backend::Remote(_))
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Remote(uri) => write!(f, "remote({})", uri),
            Backend::Chrome => write!(f, "chrome"),
            Backend::Firefox => write!(f, "firefox"),
            Backend::PhantomJs => write!(f, "phantomjs"),
        }
    }
}

fn parse_remote(selector: &str) -> Option<Uri> {
    let uri: Uri = selector.parse().ok()?;
    let scheme = uri.scheme_str()?;
    if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
        return None;
    }
    uri.authority()?;
    Some(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_local_backends() {
        assert_eq!(Backend::select("chrome").unwrap(), Backend::Chrome);
        assert_eq!(Backend::select("firefox").unwrap(), Backend::Firefox);
        assert_eq!(Backend::select(" phantomjs ").unwrap(), Backend::PhantomJs);
    }

    #[test]
    fn test_select_remote() {
        let backend = Backend::select("http://grid.local:4444/wd/hub").unwrap();
        match &backend {
            Backend::Remote(uri) => {
                assert_eq!(uri.host(), Some("grid.local"));
                assert_eq!(uri.port_u16(), Some(4444));
                assert_eq!(uri.path(), "/wd/hub");
            }
            other => panic!("expected remote backend, got {:?}", other),
        }
        assert!(backend.is_remote());
        assert_eq!(backend.browser_name(), "phantomjs");
        assert_eq!(backend.driver_binary(), None);
    }

    #[test]
    fn test_select_unknown() {
        match Backend::select("opera") {
            Err(FactoryError::UnknownBackend(name)) => assert_eq!(name, "opera"),
            other => panic!("expected UnknownBackend, got {:?}", other),
        }

        // Not a URL the pool can attach to
        assert!(Backend::select("ftp://grid.local/").is_err());
        assert!(Backend::select("/wd/hub").is_err());
        assert!(Backend::select("").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Backend::Chrome.to_string(), "chrome");
        assert_eq!(
            Backend::select("https://grid.example.com/").unwrap().to_string(),
            "remote(https://grid.example.com/)"
        );
    }
}

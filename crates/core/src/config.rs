//! Client runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the HTTP client and
//! session store. Services never read process-wide environment variables themselves.

use crate::constants::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS, DEFAULT_TOKEN_FILE};
use crate::{LabError, LabResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Client configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    api_url: String,
    timeout: Duration,
    token_file: PathBuf,
}

impl ClientConfig {
    /// Create a new `ClientConfig`.
    ///
    /// # Errors
    ///
    /// Returns `LabError::InvalidInput` if:
    /// - `api_url` is empty or not an `http://`/`https://` URL,
    /// - `timeout` is zero.
    pub fn new(api_url: &str, timeout: Duration, token_file: PathBuf) -> LabResult<Self> {
        let api_url = api_url.trim().trim_end_matches('/');
        if api_url.is_empty() {
            return Err(LabError::InvalidInput("api_url cannot be empty".into()));
        }
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(LabError::InvalidInput(format!(
                "api_url must start with http:// or https://, got {api_url:?}"
            )));
        }
        if timeout.is_zero() {
            return Err(LabError::InvalidInput("timeout must be greater than zero".into()));
        }

        Ok(Self {
            api_url: api_url.to_string(),
            timeout,
            token_file,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn token_file(&self) -> &Path {
        &self.token_file
    }

    /// Absolute URL for an endpoint path relative to the API base.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.api_url, endpoint.trim_start_matches('/'))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
        }
    }
}

/// Parse the request timeout from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default timeout.
pub fn timeout_from_env_value(value: Option<String>) -> LabResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let Some(raw) = value else {
        return Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    };

    let secs: u64 = raw
        .parse()
        .map_err(|_| LabError::InvalidInput(format!("timeout is not a whole number: {raw:?}")))?;
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_trailing_slashes() {
        let cfg = ClientConfig::new(
            "https://lab.example/api/",
            Duration::from_secs(5),
            PathBuf::from("t"),
        )
        .unwrap();
        assert_eq!(cfg.api_url(), "https://lab.example/api");
        assert_eq!(
            cfg.endpoint_url("report/userReports/4"),
            "https://lab.example/api/report/userReports/4"
        );
    }

    #[test]
    fn new_rejects_bad_urls_and_zero_timeout() {
        let err = ClientConfig::new("", Duration::from_secs(1), PathBuf::new()).unwrap_err();
        assert!(matches!(err, LabError::InvalidInput(msg) if msg.contains("cannot be empty")));

        let err =
            ClientConfig::new("ftp://lab", Duration::from_secs(1), PathBuf::new()).unwrap_err();
        assert!(matches!(err, LabError::InvalidInput(msg) if msg.contains("http://")));

        let err = ClientConfig::new("http://lab", Duration::ZERO, PathBuf::new()).unwrap_err();
        assert!(matches!(err, LabError::InvalidInput(msg) if msg.contains("greater than zero")));
    }

    #[test]
    fn default_points_at_local_backend() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.api_url(), DEFAULT_API_URL);
        assert_eq!(cfg.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn timeout_from_env_value_handles_missing_and_invalid() {
        assert_eq!(
            timeout_from_env_value(None).unwrap(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
        assert_eq!(
            timeout_from_env_value(Some("  ".into())).unwrap(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
        assert_eq!(
            timeout_from_env_value(Some("12".into())).unwrap(),
            Duration::from_secs(12)
        );
        assert!(timeout_from_env_value(Some("soon".into())).is_err());
    }
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings shared by the server and the client.
///
/// Defaults describe a local setup; [`Settings::from_env`] overlays the
/// `GRAPHING_*` environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Address the server binds to
    pub host: String,

    /// Port the server listens on
    pub port: u16,

    /// Directory uploaded files are stored in
    pub upload_dir: PathBuf,

    /// Largest request body the server accepts, in megabytes
    pub max_upload_mb: u64,

    /// Base URL clients send requests to
    pub server_url: String,

    /// Client request timeout; `None` waits as long as the server takes
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            host: "0.0.0.0".to_string(),
            port: 5001,
            upload_dir: PathBuf::from("uploads"),
            max_upload_mb: 1024,
            server_url: "http://127.0.0.1:5001".to_string(),
            request_timeout_secs: None,
        }
    }
}

impl Settings {
    /// Defaults overlaid with the process environment
    pub fn from_env() -> Self {
        let mut settings = Settings::default();
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings
    }

    /// Applies every `GRAPHING_*` override `lookup` knows about.
    ///
    /// Values that do not parse are skipped with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("GRAPHING_HOST") {
            self.host = host;
        }
        if let Some(port) = parse_var(&lookup, "GRAPHING_PORT") {
            self.port = port;
        }
        if let Some(dir) = lookup("GRAPHING_UPLOAD_DIR") {
            self.upload_dir = PathBuf::from(dir);
        }
        if let Some(limit) = parse_var(&lookup, "GRAPHING_MAX_UPLOAD_MB") {
            self.max_upload_mb = limit;
        }
        if let Some(url) = lookup("GRAPHING_SERVER_URL") {
            self.server_url = url;
        }
        if let Some(secs) = parse_var(&lookup, "GRAPHING_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = Some(secs);
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb as usize).saturating_mul(1024 * 1024)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// `server_url` joined with an endpoint path
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.server_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}

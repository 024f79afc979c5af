//! Connection settings, read from flags with environment fallbacks.
//!
//! `main` loads a `.env` file (if any) before parsing, so values there
//! behave like exported variables.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use safelink_client::{ClientConfig, SessionStore};

const TOKEN_FILE_NAME: &str = "token";
const FALLBACK_TOKEN_FILE: &str = ".safelink-token";

#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Base URL of the alert API.
    #[arg(long, global = true, env = "SAFELINK_API_BASE", default_value = "http://localhost:8000")]
    pub api_base: String,

    /// WebSocket base for live pushes; derived from the API base when unset.
    #[arg(long, global = true, env = "SAFELINK_WS_BASE")]
    pub ws_base: Option<String>,

    /// Where the session token is kept.
    #[arg(long, global = true, env = "SAFELINK_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Request timeout in seconds.
    #[arg(long, global = true, env = "SAFELINK_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Log filter, e.g. `info` or `safelink_client=debug`.
    #[arg(long, global = true, env = "SAFELINK_LOG", default_value = "info")]
    pub log: String,
}

impl Settings {
    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new(self.api_base.as_str())
            .with_timeout(Duration::from_secs(self.timeout_secs));
        match &self.ws_base {
            Some(ws) if !ws.trim().is_empty() => config.with_ws_base(ws.as_str()),
            _ => config,
        }
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(self.token_path(std::env::var_os("HOME").map(PathBuf::from)))
    }

    fn token_path(&self, home: Option<PathBuf>) -> PathBuf {
        if let Some(path) = &self.token_file {
            return path.clone();
        }
        match home {
            Some(home) if !home.as_os_str().is_empty() => {
                home.join(".safelink").join(TOKEN_FILE_NAME)
            }
            _ => PathBuf::from(FALLBACK_TOKEN_FILE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            api_base: "https://api.safelink.example/".into(),
            ws_base: None,
            token_file: None,
            timeout_secs: 5,
            log: "info".into(),
        }
    }

    #[test]
    fn token_path_defaults_under_home() {
        let path = settings().token_path(Some(PathBuf::from("/home/mod")));
        assert_eq!(path, PathBuf::from("/home/mod/.safelink/token"));
    }

    #[test]
    fn token_path_without_home_is_local() {
        assert_eq!(settings().token_path(None), PathBuf::from(".safelink-token"));
    }

    #[test]
    fn explicit_token_file_wins() {
        let mut s = settings();
        s.token_file = Some(PathBuf::from("/tmp/t"));
        assert_eq!(s.token_path(Some(PathBuf::from("/home/mod"))), PathBuf::from("/tmp/t"));
    }

    #[test]
    fn client_config_derives_ws_url() {
        let config = settings().client_config();
        assert_eq!(config.api_base, "https://api.safelink.example");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.alerts_ws_url(), "wss://api.safelink.example/ws/alerts");

        let mut s = settings();
        s.ws_base = Some("ws://localhost:9001".into());
        assert_eq!(s.client_config().alerts_ws_url(), "ws://localhost:9001/ws/alerts");
    }
}

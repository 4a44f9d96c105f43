use std::env;

use serde::{Deserialize, Serialize};

fn d_host() -> String {
    "0.0.0.0".to_string()
}

fn d_port() -> u16 {
    8080
}

fn d_gemini_model() -> String {
    "gemini-2.0-flash-live-001".to_string()
}

fn d_voice_name() -> String {
    "Aoede".to_string()
}

fn d_voice_language_code() -> String {
    "en-US".to_string()
}

fn d_max_concurrent_requests() -> usize {
    256
}

/// CORS policy for the HTTP surface. Mirrors the shape the teacher's gateway
/// config carries, trimmed to what this service actually needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorsConfig {
    /// Empty means "allow any origin" (dev-mode default).
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
        }
    }
}

/// Voice parameters surfaced read-only via the voice-config endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    #[serde(default = "d_voice_name")]
    pub name: String,
    #[serde(default = "d_voice_language_code")]
    pub language_code: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            name: d_voice_name(),
            language_code: d_voice_language_code(),
        }
    }
}

/// Listen address, backpressure, and transport-layer policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_port")]
    pub port: u16,
    #[serde(default = "d_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Unset (dev mode): no bearer-token check on mutating routes.
    #[serde(default)]
    pub api_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: d_host(),
            port: d_port(),
            max_concurrent_requests: d_max_concurrent_requests(),
            cors: CorsConfig::default(),
            api_token: None,
        }
    }
}

/// Top-level configuration tree. Loaded from an optional TOML file
/// (`CONCIERGE_CONFIG`, default `./concierge.toml`) and then overlaid field
/// by field with environment variables, matching the teacher's
/// file-then-env overlay order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default = "d_gemini_model")]
    pub gemini_model: String,
    #[serde(default)]
    pub google_api_key: Option<String>,
    #[serde(default)]
    pub enable_manual_activity_signals: bool,
    #[serde(default)]
    pub voice: VoiceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            gemini_model: d_gemini_model(),
            google_api_key: None,
            enable_manual_activity_signals: false,
            voice: VoiceConfig::default(),
        }
    }
}

impl Config {
    /// Loads the optional TOML file named by `CONCIERGE_CONFIG` (defaulting
    /// to `./concierge.toml`, silently skipped if absent), then overlays
    /// every environment variable from the configuration table.
    pub fn load() -> crate::Result<Self> {
        let path = env::var("CONCIERGE_CONFIG").unwrap_or_else(|_| "./concierge.toml".to_string());
        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents)
                .map_err(|e| crate::Error::InvalidInput(format!("invalid config at {path}: {e}")))?,
            Err(_) => Config::default(),
        };
        config.apply_env_overlay();
        Ok(config)
    }

    fn apply_env_overlay(&mut self) {
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            if let Ok(port) = v.parse() {
                self.server.port = port;
            }
        }
        if let Ok(v) = env::var("CONCIERGE_MAX_CONCURRENT_REQUESTS") {
            if let Ok(n) = v.parse() {
                self.server.max_concurrent_requests = n;
            }
        }
        if let Ok(v) = env::var("CONCIERGE_API_TOKEN") {
            self.server.api_token = Some(v);
        }
        if let Ok(v) = env::var("GEMINI_MODEL") {
            self.gemini_model = v;
        }
        if let Ok(v) = env::var("GOOGLE_API_KEY") {
            self.google_api_key = Some(v);
        }
        if let Ok(v) = env::var("ENABLE_MANUAL_ACTIVITY_SIGNALS") {
            self.enable_manual_activity_signals = v == "true" || v == "1";
        }
        if let Ok(v) = env::var("VOICE_NAME") {
            self.voice.name = v;
        }
        if let Ok(v) = env::var("VOICE_LANGUAGE_CODE") {
            self.voice.language_code = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.max_concurrent_requests, 256);
        assert_eq!(config.voice.name, "Aoede");
        assert_eq!(config.voice.language_code, "en-US");
        assert!(!config.enable_manual_activity_signals);
        assert!(config.server.api_token.is_none());
    }
}

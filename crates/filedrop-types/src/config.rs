//! Runtime configuration split per §6.4: a client-visible half served over
//! `/config`, and a server-only half that is never serialized out.
//!
//! Grounded on `haven-server/src/main.rs`'s env-var-driven config locals,
//! lifted into a struct pair here so `filedrop-server`'s `main.rs` has one
//! place to call `ServerConfig::from_env()`.

use serde::{Deserialize, Serialize};

/// One entry of the `iceServers` list handed to the browser's
/// `RTCPeerConnection` constructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// Client-visible keys served verbatim by `GET /config` (§6.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    pub ice_servers: Vec<IceServer>,
    pub default_chunk_size: u32,
    pub min_chunk_size: u32,
    pub max_chunk_size: u32,
    pub buffer_high_water: u64,
    pub buffer_low_water: u64,
    pub max_in_memory_size: u64,
    pub max_file_size: u64,
    pub app_title: String,
    pub theme_color: String,
    pub donate_url: String,
    pub terms_url: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServer {
                urls: vec!["stun:stun.l.google.com:19302".to_string()],
                username: None,
                credential: None,
            }],
            default_chunk_size: 131_072,
            min_chunk_size: 16_384,
            max_chunk_size: 262_144,
            buffer_high_water: 1 << 20,
            buffer_low_water: 1 << 18,
            max_in_memory_size: 200 << 20,
            max_file_size: 0,
            app_title: "filedrop".to_string(),
            theme_color: "#0b5fff".to_string(),
            donate_url: String::new(),
            terms_url: String::new(),
        }
    }
}

/// Server-only keys (§6.4): never exposed via `/config`.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub trust_proxy: bool,
    pub cors_origins: Vec<String>,
    pub max_signal_payload_bytes: usize,
    pub max_peers_per_room: usize,
    pub room_ttl_ms: u64,
    pub sweep_interval_ms: u64,
    pub rate_window_ms: u64,
    pub rate_max: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            trust_proxy: false,
            cors_origins: Vec::new(),
            max_signal_payload_bytes: 65_536,
            max_peers_per_room: 2,
            room_ttl_ms: 30 * 60 * 1_000,
            sweep_interval_ms: 10 * 60 * 1_000,
            rate_window_ms: 1_000,
            rate_max: 10,
        }
    }
}

impl ServerConfig {
    /// Overlays `FILEDROP_*` environment variables onto the defaults.
    /// Unset or unparsable variables fall back silently to the default;
    /// the caller is expected to have already run `dotenvy::dotenv()`.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("FILEDROP_HOST") {
            cfg.host = v;
        }
        if let Some(v) = parse_env("FILEDROP_PORT") {
            cfg.port = v;
        }
        if let Ok(v) = std::env::var("FILEDROP_TRUST_PROXY") {
            cfg.trust_proxy = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Ok(v) = std::env::var("FILEDROP_CORS_ORIGINS") {
            cfg.cors_origins = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }
        if let Some(v) = parse_env("FILEDROP_MAX_SIGNAL_PAYLOAD") {
            cfg.max_signal_payload_bytes = v;
        }
        if let Some(v) = parse_env("FILEDROP_MAX_PEERS_PER_ROOM") {
            cfg.max_peers_per_room = v;
        }
        if let Some(v) = parse_env("FILEDROP_ROOM_TTL_SECS") {
            let secs: u64 = v;
            cfg.room_ttl_ms = secs * 1_000;
        }
        if let Some(v) = parse_env("FILEDROP_RATE_WINDOW_MS") {
            cfg.rate_window_ms = v;
        }
        if let Some(v) = parse_env("FILEDROP_RATE_MAX") {
            cfg.rate_max = v;
        }
        cfg
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let rc = RuntimeConfig::default();
        assert_eq!(rc.default_chunk_size, 131_072);
        assert_eq!(rc.buffer_high_water, 1 << 20);

        let sc = ServerConfig::default();
        assert_eq!(sc.max_peers_per_room, 2);
        assert_eq!(sc.max_signal_payload_bytes, 65_536);
        assert_eq!(sc.room_ttl_ms, 1_800_000);
        assert_eq!(sc.rate_window_ms, 1_000);
        assert_eq!(sc.rate_max, 10);
    }

    #[test]
    fn runtime_config_serializes_camel_case() {
        let json = serde_json::to_value(RuntimeConfig::default()).unwrap();
        assert!(json.get("defaultChunkSize").is_some());
        assert!(json.get("iceServers").is_some());
    }
}

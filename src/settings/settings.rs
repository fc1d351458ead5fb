use anyhow::{Result, anyhow};
use config::{Config, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub filter: Filter,
    pub http: Http,
    pub log: Log,
    pub member: MemberBackend,
    pub mysql: Mysql,
    pub redis: Redis,
}

/// Signing keys and token lifetimes. Secrets are base64-encoded HMAC
/// keys; access and refresh tokens are signed with distinct keys.
#[derive(Debug, Deserialize)]
pub struct Auth {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_ms: u64,
    pub refresh_ttl_ms: u64,
}

/// Per-path authentication policy for the request gate.
///
/// Precedence is exclude > optional > include > `default_policy`.
/// Patterns are segment globs: `*` matches one segment, a trailing
/// `**` matches any remainder.
#[derive(Debug, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub exclude_path_patterns: Vec<String>,
    #[serde(default)]
    pub optional_path_patterns: Vec<String>,
    #[serde(default)]
    pub include_path_patterns: Vec<String>,
    #[serde(default = "default_policy")]
    pub default_policy: String, // "exclude" or "required"
    #[serde(default)]
    pub exclude_methods: Vec<String>,
    #[serde(default)]
    pub cookie_fallback: bool,
    #[serde(default = "default_at_cookie")]
    pub at_cookie: String,
    #[serde(default)]
    pub context_path: String,
}

fn default_policy() -> String {
    "required".to_string()
}

fn default_at_cookie() -> String {
    "Access-Token".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub cert_path: String,
    pub key_path: String,
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct MemberBackend {
    pub backend: String, // "fake" or "real"
}

#[derive(Debug, Deserialize)]
pub struct Mysql {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct Redis {
    pub url: String,
    pub prefix: String,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Template written by `chatrelay init` and used when no config file exists
pub const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_cors")]
    pub cors: bool,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8888
}
fn default_path() -> String {
    chatrelay_gateway::protocol::DEFAULT_CHAT_PATH.to_string()
}
fn default_cors() -> bool {
    true
}
fn default_max_body_bytes() -> usize {
    chatrelay_gateway::server::DEFAULT_MAX_BODY_BYTES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            path: default_path(),
            cors: default_cors(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Timeout for each outbound provider call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

fn default_gemini_base_url() -> String {
    chatrelay_core::providers::gemini::DEFAULT_BASE_URL.to_string()
}
fn default_gemini_model() -> String {
    chatrelay_core::providers::gemini::DEFAULT_MODEL.to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openrouter_base_url")]
    pub base_url: String,
    #[serde(default = "default_openrouter_model")]
    pub model: String,
}

impl std::fmt::Debug for OpenRouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

fn default_openrouter_base_url() -> String {
    chatrelay_core::providers::openrouter::DEFAULT_BASE_URL.to_string()
}
fn default_openrouter_model() -> String {
    chatrelay_core::providers::openrouter::DEFAULT_MODEL.to_string()
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_openrouter_base_url(),
            model: default_openrouter_model(),
        }
    }
}

/// Credentials are never shown, not even in part. A blank key reads as unset
/// because providers treat it as absent.
fn mask_secret(s: &str) -> String {
    if s.trim().is_empty() {
        "(unset)".to_string()
    } else {
        "(set)".to_string()
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".chatrelay")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

impl RelayConfig {
    /// Load the config file, or the embedded template when the default path
    /// does not exist. An explicit `--config` path must exist.
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = custom_path.clone().unwrap_or_else(default_config_path);

        let content = if custom_path.is_none() && !path.exists() {
            info!(
                "No config at {}, using built-in defaults with keys from the environment",
                path.display()
            );
            DEFAULT_CONFIG.to_string()
        } else {
            check_permissions(&path)?;
            std::fs::read_to_string(&path).with_context(|| {
                format!(
                    "Failed to read config at {}. Run `chatrelay init` first.",
                    path.display()
                )
            })?
        };

        let config = Self::parse(&content, |name| std::env::var(name).ok())
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;
        Ok(config)
    }

    /// Expand allowlisted `${VAR}` references through `lookup`, then parse
    pub fn parse<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expanded = expand_env_vars(content, lookup);
        let config: Self = toml::from_str(&expanded)?;

        warn_if_hardcoded(
            content,
            "GEMINI_API_KEY",
            &config.providers.gemini.api_key,
            "providers.gemini.api_key",
        );
        warn_if_hardcoded(
            content,
            "OPENROUTER_API_KEY",
            &config.providers.openrouter.api_key,
            "providers.openrouter.api_key",
        );

        Ok(config)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let raw = format!("{}:{}", self.server.bind, self.server.port);
        raw.parse()
            .with_context(|| format!("Invalid bind address: {}", raw))
    }

    /// Copy with every credential masked, for display
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        copy.providers.gemini.api_key = mask_secret(&copy.providers.gemini.api_key);
        copy.providers.openrouter.api_key = mask_secret(&copy.providers.openrouter.api_key);
        copy
    }
}

fn warn_if_hardcoded(raw: &str, var: &str, value: &str, field: &str) {
    if !value.is_empty() && !raw.contains(&format!("${{{}}}", var)) {
        warn!(
            "{} is hardcoded in config file. For security, use environment variables: api_key = \"${{{}}}\"",
            field, var
        );
    }
}

/// Refuse config files that group or other can read (Unix only)
fn check_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(path) {
            let mode = metadata.permissions().mode();
            if mode & 0o077 != 0 {
                return Err(anyhow::anyhow!(
                    "Config file {:?} has overly permissive permissions ({:o}). \
                     It may contain secrets. Fix with: chmod 600 {:?}",
                    path,
                    mode & 0o777,
                    path
                ));
            }
        }
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Allowlist of environment variable names that may be expanded in config files.
const ALLOWED_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "OPENROUTER_API_KEY", "HOME", "USER"];

fn expand_env_vars<F>(s: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = s.to_string();
    let mut pos = 0;
    while pos < result.len() {
        let Some(start) = result[pos..].find("${") else {
            break;
        };
        let abs_start = pos + start;
        let Some(end) = result[abs_start..].find('}') else {
            break;
        };
        let var_name = result[abs_start + 2..abs_start + end].to_string();

        if !ALLOWED_ENV_VARS.contains(&var_name.as_str()) {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                var_name
            );
            // Leave the ${VAR} unexpanded so it's obvious
            pos = abs_start + end + 1;
            continue;
        }

        let value = lookup(&var_name).unwrap_or_default();
        let value_len = value.len();
        result = format!(
            "{}{}{}",
            &result[..abs_start],
            value,
            &result[abs_start + end + 1..]
        );
        pos = abs_start + value_len;
    }
    result
}

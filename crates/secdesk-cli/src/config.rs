use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecdeskConfig {
    pub provider: ProviderConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub geolocation: GeolocationConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_max_tokens() -> u32 {
    1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_file")]
    pub file: PathBuf,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_history_file() -> PathBuf {
    config_dir().join("search_history.json")
}

fn default_max_entries() -> usize {
    secdesk_core::history::DEFAULT_MAX_ENTRIES
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            file: default_history_file(),
            max_entries: default_max_entries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeolocationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_geo_endpoint")]
    pub endpoint: String,
}

fn default_geo_endpoint() -> String {
    secdesk_core::geo::DEFAULT_ENDPOINT.to_string()
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_geo_endpoint(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_monitor_interval")]
    pub interval_secs: u64,
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
}

fn default_monitor_interval() -> u64 {
    300
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            interval_secs: default_monitor_interval(),
            smtp: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub from: String,
    pub to: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &mask_secret(&self.password))
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

fn default_smtp_port() -> u16 {
    465
}

fn default_true() -> bool {
    true
}

/// Mask a secret string for safe display in Debug output / logs.
/// Shows first 3 and last 4 chars for keys longer than 7 chars, otherwise "***".
/// Uses char-boundary-safe slicing to avoid panics on multi-byte UTF-8.
fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".secdesk")
}

impl SecdeskConfig {
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = custom_path
            .clone()
            .unwrap_or_else(|| config_dir().join("config.toml"));

        // The config can contain secrets; refuse group/other-readable files
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = std::fs::metadata(&path) {
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

        let content = std::fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `secdesk init` first.",
                path.display()
            )
        })?;

        // Expand environment variables before parsing
        let expanded = expand_env_vars(&content);

        let config: Self = toml::from_str(&expanded)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;

        // Check for hardcoded secrets
        if config.provider.api_key.starts_with("sk-") {
            warn!(
                "API key is hardcoded in config file. For security, use environment variables: api_key = \"${{OPENAI_API_KEY}}\""
            );
        }

        if let Some(smtp) = &config.monitor.smtp {
            if !smtp.password.is_empty() && !smtp.password.contains("${") {
                warn!(
                    "SMTP password is hardcoded in config file. For security, use environment variables: password = \"${{SECDESK_SMTP_PASSWORD}}\""
                );
            }
        }

        Ok(config)
    }
}

/// Allowlist of environment variable names that may be expanded in config files.
/// This prevents an attacker who can modify the config from reading arbitrary env vars.
const ALLOWED_ENV_VARS: &[&str] = &[
    "OPENAI_API_KEY",
    "SECDESK_SMTP_USERNAME",
    "SECDESK_SMTP_PASSWORD",
    "SECDESK_HEALTH_URL",
    "HOME",
    "USER",
];

fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while pos < result.len() {
        if let Some(start) = result[pos..].find("${") {
            let abs_start = pos + start;
            if let Some(end) = result[abs_start..].find('}') {
                let var_name = result[abs_start + 2..abs_start + end].to_string();

                // Only expand variables in the allowlist
                let value = if ALLOWED_ENV_VARS.contains(&var_name.as_str()) {
                    std::env::var(&var_name).unwrap_or_default()
                } else {
                    warn!(
                        "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                        var_name
                    );
                    // Leave the ${VAR} unexpanded so it's obvious
                    pos = abs_start + end + 1;
                    continue;
                };

                let value_len = value.len();
                result = format!(
                    "{}{}{}",
                    &result[..abs_start],
                    value,
                    &result[abs_start + end + 1..]
                );
                pos = abs_start + value_len; // Skip past the expanded value
            } else {
                break;
            }
        } else {
            break;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(empty)");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("sk-abcdefgh1234"), "sk-...1234");
    }

    #[test]
    fn test_expand_allowed_var() {
        // SAFETY: test-local env mutation; no other test reads this var
        unsafe { std::env::set_var("OPENAI_API_KEY", "test-value") };
        let expanded = expand_env_vars("api_key = \"${OPENAI_API_KEY}\"");
        assert_eq!(expanded, "api_key = \"test-value\"");
    }

    #[test]
    fn test_disallowed_var_left_unexpanded() {
        let expanded = expand_env_vars("token = \"${TOTALLY_UNLISTED_VAR}\"");
        assert_eq!(expanded, "token = \"${TOTALLY_UNLISTED_VAR}\"");
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config: SecdeskConfig = toml::from_str(
            r#"
            [provider]
            api_key = "test-key"
            "#,
        )
        .unwrap();
        assert_eq!(config.provider.base_url, "https://api.openai.com");
        assert_eq!(config.provider.model, "gpt-3.5-turbo");
        assert_eq!(config.provider.max_tokens, 1024);
        assert_eq!(config.history.max_entries, 100);
        assert!(config.geolocation.enabled);
        assert!(!config.monitor.enabled);
        assert_eq!(config.monitor.interval_secs, 300);
        assert!(config.monitor.smtp.is_none());
    }

    #[test]
    fn test_monitor_section_parses() {
        let config: SecdeskConfig = toml::from_str(
            r#"
            [provider]
            api_key = "test-key"

            [monitor]
            enabled = true
            url = "https://status.example.org/healthz"
            interval_secs = 60

            [monitor.smtp]
            host = "smtp.example.org"
            username = "alerts"
            password = "secret"
            from = "alerts@example.org"
            to = "oncall@example.org"
            "#,
        )
        .unwrap();
        assert!(config.monitor.enabled);
        assert_eq!(config.monitor.interval_secs, 60);
        let smtp = config.monitor.smtp.unwrap();
        assert_eq!(smtp.port, 465);
        assert_eq!(smtp.host, "smtp.example.org");
    }

    #[test]
    fn test_debug_masks_secrets() {
        let config: SecdeskConfig = toml::from_str(
            r#"
            [provider]
            api_key = "sk-verysecretkey9876"

            [monitor.smtp]
            host = "smtp.example.org"
            password = "smtp-password-123"
            from = "a@example.org"
            to = "b@example.org"
            "#,
        )
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-verysecretkey9876"));
        assert!(!debug.contains("smtp-password-123"));
    }

    #[cfg(unix)]
    #[test]
    fn test_load_from_file_with_strict_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[provider]\napi_key = \"test-key\"\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();

        let config = SecdeskConfig::load(&Some(path)).unwrap();
        assert_eq!(config.provider.api_key, "test-key");
    }

    #[cfg(unix)]
    #[test]
    fn test_load_rejects_world_readable_config() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[provider]\napi_key = \"test-key\"\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let err = SecdeskConfig::load(&Some(path)).unwrap_err();
        assert!(err.to_string().contains("permissive"));
    }
}

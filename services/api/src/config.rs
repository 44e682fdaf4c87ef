//! Environment configuration and startup validation.
//!
//! Configuration is read once at process start. The four credentials the
//! service cannot run without are tracked by [`EnvironmentSnapshot`], which
//! is also re-derived on demand for the `/health` readiness map. Secret
//! values are never logged beyond a four-character preview.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// The environment variables the service requires to do real work.
pub const REQUIRED_ENV_VARS: [&str; 4] = [
    "LIVEKIT_URL",
    "LIVEKIT_API_KEY",
    "LIVEKIT_API_SECRET",
    "OPENAI_API_KEY",
];

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// What to do at startup when required variables are absent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartupPolicy {
    /// Abort the process with a non-zero exit code.
    FailFast,
    /// Start anyway; the gap is logged and surfaced via `/health`.
    Degraded,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub livekit_url: Option<String>,
    pub livekit_api_key: Option<String>,
    pub livekit_api_secret: Option<String>,
    pub openai_api_key: Option<String>,
    pub realtime_model: String,
    pub log_level: Level,
    pub prompts_path: PathBuf,
    pub startup_policy: StartupPolicy,
    pub worker_auto_start: bool,
    pub agent_room_name: String,
    pub join_token_ttl: Duration,
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let startup_policy_str =
            std::env::var("STARTUP_POLICY").unwrap_or_else(|_| "degraded".to_string());
        let startup_policy = match startup_policy_str.to_lowercase().as_str() {
            "fail-fast" | "fail_fast" => StartupPolicy::FailFast,
            "degraded" => StartupPolicy::Degraded,
            other => {
                return Err(ConfigError::InvalidValue(
                    "STARTUP_POLICY".to_string(),
                    format!("'{}' is not 'fail-fast' or 'degraded'", other),
                ));
            }
        };

        let snapshot = EnvironmentSnapshot::capture();
        if startup_policy == StartupPolicy::FailFast && !snapshot.all_present() {
            return Err(ConfigError::MissingVar(snapshot.missing().join(", ")));
        }

        let realtime_model = std::env::var("REALTIME_MODEL")
            .unwrap_or_else(|_| govi_core::agent::DEFAULT_MODEL.to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        let worker_auto_start_str =
            std::env::var("WORKER_AUTO_START").unwrap_or_else(|_| "true".to_string());
        let worker_auto_start = match worker_auto_start_str.to_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            other => {
                return Err(ConfigError::InvalidValue(
                    "WORKER_AUTO_START".to_string(),
                    format!("'{}' is not a boolean", other),
                ));
            }
        };

        let agent_room_name =
            std::env::var("AGENT_ROOM_NAME").unwrap_or_else(|_| "govi-room".to_string());

        let ttl_str = std::env::var("JOIN_TOKEN_TTL_SECS").unwrap_or_else(|_| "900".to_string());
        let join_token_ttl = ttl_str
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| {
                ConfigError::InvalidValue("JOIN_TOKEN_TTL_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            bind_address,
            livekit_url: non_empty_var("LIVEKIT_URL"),
            livekit_api_key: non_empty_var("LIVEKIT_API_KEY"),
            livekit_api_secret: non_empty_var("LIVEKIT_API_SECRET"),
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            realtime_model,
            log_level,
            prompts_path,
            startup_policy,
            worker_auto_start,
            agent_room_name,
            join_token_ttl,
        })
    }
}

/// Presence map over [`REQUIRED_ENV_VARS`], captured from the process
/// environment. A variable counts as present only when non-empty.
#[derive(Debug, Clone)]
pub struct EnvironmentSnapshot {
    readiness: BTreeMap<String, bool>,
}

impl EnvironmentSnapshot {
    /// Reads the current process environment.
    pub fn capture() -> Self {
        let readiness = REQUIRED_ENV_VARS
            .iter()
            .map(|name| (name.to_string(), non_empty_var(name).is_some()))
            .collect();
        Self { readiness }
    }

    /// One boolean per required variable name.
    pub fn readiness(&self) -> &BTreeMap<String, bool> {
        &self.readiness
    }

    /// Names of the variables that are absent or empty.
    pub fn missing(&self) -> Vec<String> {
        self.readiness
            .iter()
            .filter(|(_, present)| !**present)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn all_present(&self) -> bool {
        self.readiness.values().all(|present| *present)
    }
}

/// First four characters of a secret, the rest masked. Safe to log.
pub fn redacted_preview(value: &str) -> String {
    if value.chars().count() > 4 {
        format!("{}***", value.chars().take(4).collect::<String>())
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("LIVEKIT_URL");
            env::remove_var("LIVEKIT_API_KEY");
            env::remove_var("LIVEKIT_API_SECRET");
            env::remove_var("OPENAI_API_KEY");
            env::remove_var("REALTIME_MODEL");
            env::remove_var("RUST_LOG");
            env::remove_var("PROMPTS_PATH");
            env::remove_var("STARTUP_POLICY");
            env::remove_var("WORKER_AUTO_START");
            env::remove_var("AGENT_ROOM_NAME");
            env::remove_var("JOIN_TOKEN_TTL_SECS");
        }
    }

    fn set_all_required() {
        unsafe {
            env::set_var("LIVEKIT_URL", "wss://example.livekit.cloud");
            env::set_var("LIVEKIT_API_KEY", "lk_test_key");
            env::set_var("LIVEKIT_API_SECRET", "lk_test_secret");
            env::set_var("OPENAI_API_KEY", "sk-test-openai");
        }
    }

    #[test]
    fn test_config_error_display() {
        let missing_var = ConfigError::MissingVar("TEST_VAR".to_string());
        assert_eq!(
            format!("{}", missing_var),
            "Missing environment variable: TEST_VAR"
        );

        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_defaults_with_full_environment() {
        clear_env_vars();
        set_all_required();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(
            config.livekit_url.as_deref(),
            Some("wss://example.livekit.cloud")
        );
        assert_eq!(config.livekit_api_key.as_deref(), Some("lk_test_key"));
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test-openai"));
        assert_eq!(config.realtime_model, "gpt-4o-mini-realtime-preview");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.prompts_path, PathBuf::from("./prompts"));
        assert_eq!(config.startup_policy, StartupPolicy::Degraded);
        assert!(config.worker_auto_start);
        assert_eq!(config.agent_room_name, "govi-room");
        assert_eq!(config.join_token_ttl, Duration::from_secs(900));
    }

    #[test]
    #[serial]
    fn test_config_degraded_mode_tolerates_missing_credentials() {
        clear_env_vars();

        let config = Config::from_env().expect("degraded startup should succeed");

        assert_eq!(config.startup_policy, StartupPolicy::Degraded);
        assert!(config.livekit_url.is_none());
        assert!(config.livekit_api_key.is_none());
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_config_fail_fast_rejects_missing_credentials() {
        clear_env_vars();
        unsafe {
            env::set_var("STARTUP_POLICY", "fail-fast");
            env::set_var("LIVEKIT_URL", "wss://example.livekit.cloud");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => {
                assert!(msg.contains("LIVEKIT_API_KEY"));
                assert!(msg.contains("LIVEKIT_API_SECRET"));
                assert!(msg.contains("OPENAI_API_KEY"));
                assert!(!msg.contains("LIVEKIT_URL"));
            }
            _ => panic!("Expected MissingVar under fail-fast"),
        }
    }

    #[test]
    #[serial]
    fn test_config_custom_values() {
        clear_env_vars();
        set_all_required();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("REALTIME_MODEL", "gpt-4o-realtime-preview");
            env::set_var("RUST_LOG", "debug");
            env::set_var("PROMPTS_PATH", "/custom/prompts");
            env::set_var("WORKER_AUTO_START", "false");
            env::set_var("AGENT_ROOM_NAME", "demo-room");
            env::set_var("JOIN_TOKEN_TTL_SECS", "60");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.realtime_model, "gpt-4o-realtime-preview");
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.prompts_path, PathBuf::from("/custom/prompts"));
        assert!(!config.worker_auto_start);
        assert_eq!(config.agent_room_name, "demo-room");
        assert_eq!(config.join_token_ttl, Duration::from_secs(60));
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "BIND_ADDRESS"),
            _ => panic!("Expected InvalidValue for BIND_ADDRESS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_startup_policy() {
        clear_env_vars();
        unsafe {
            env::set_var("STARTUP_POLICY", "sometimes");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "STARTUP_POLICY"),
            _ => panic!("Expected InvalidValue for STARTUP_POLICY"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_token_ttl() {
        clear_env_vars();
        unsafe {
            env::set_var("JOIN_TOKEN_TTL_SECS", "soon");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "JOIN_TOKEN_TTL_SECS"),
            _ => panic!("Expected InvalidValue for JOIN_TOKEN_TTL_SECS"),
        }
    }

    #[test]
    #[serial]
    fn test_snapshot_has_one_entry_per_required_variable() {
        clear_env_vars();
        set_all_required();

        let snapshot = EnvironmentSnapshot::capture();
        assert_eq!(snapshot.readiness().len(), REQUIRED_ENV_VARS.len());
        assert!(snapshot.all_present());
        assert!(snapshot.missing().is_empty());
    }

    #[test]
    #[serial]
    fn test_snapshot_flags_missing_and_empty_variables() {
        clear_env_vars();
        set_all_required();
        unsafe {
            env::remove_var("LIVEKIT_API_KEY");
            env::set_var("OPENAI_API_KEY", "");
        }

        let snapshot = EnvironmentSnapshot::capture();
        assert_eq!(snapshot.readiness().get("LIVEKIT_API_KEY"), Some(&false));
        assert_eq!(snapshot.readiness().get("OPENAI_API_KEY"), Some(&false));
        assert_eq!(snapshot.readiness().get("LIVEKIT_URL"), Some(&true));
        assert!(!snapshot.all_present());

        let missing = snapshot.missing();
        assert!(missing.contains(&"LIVEKIT_API_KEY".to_string()));
        assert!(missing.contains(&"OPENAI_API_KEY".to_string()));
        assert_eq!(missing.len(), 2);
    }

    #[test]
    fn test_redacted_preview_masks_all_but_prefix() {
        assert_eq!(redacted_preview("sk-abcdef123456"), "sk-a***");
        assert_eq!(redacted_preview("abcd"), "***");
        assert_eq!(redacted_preview(""), "***");
    }
}

// SPDX-License-Identifier: MIT OR Apache-2.0
//! Server configuration types.

use std::net::SocketAddr;
use std::path::PathBuf;

use aura_progression::ProgressionConfig;

use crate::audit::AuditConfig;
use crate::error::{Result, ServerError};

// Environment variable names for configuration.

/// Bind address environment variable.
pub const ENV_BIND_ADDR: &str = "AURA_BIND_ADDR";
/// Progression TOML file environment variable.
pub const ENV_PROGRESSION_CONFIG: &str = "AURA_PROGRESSION_CONFIG";
/// Maximum request body size environment variable.
pub const ENV_MAX_BODY_SIZE: &str = "AURA_MAX_BODY_SIZE";
/// Enable audit logging environment variable.
pub const ENV_AUDIT_ENABLED: &str = "AURA_AUDIT_ENABLED";
/// Audit retention environment variable.
pub const ENV_AUDIT_MAX_ENTRIES: &str = "AURA_AUDIT_MAX_ENTRIES";
/// Level curve base XP override.
pub const ENV_BASE_XP: &str = "AURA_BASE_XP";
/// Level curve multiplier override.
pub const ENV_XP_MULTIPLIER: &str = "AURA_XP_MULTIPLIER";
/// Level ceiling override.
pub const ENV_LEVEL_CEILING: &str = "AURA_LEVEL_CEILING";

/// Default maximum request body size (64KB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024;

/// Environment variable parsing helpers.
mod env_parse {
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use std::str::FromStr;

    use super::{Result, ServerError};

    fn parse<T>(key: &str) -> Option<Result<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        std::env::var(key).ok().map(|val| {
            val.trim()
                .parse()
                .map_err(|e| ServerError::Config(format!("invalid {key}: {e}")))
        })
    }

    /// Parse a socket address from an environment variable.
    pub fn parse_socket_addr(key: &str) -> Option<Result<SocketAddr>> {
        parse(key)
    }

    /// Parse a usize from an environment variable.
    pub fn parse_usize(key: &str) -> Option<Result<usize>> {
        parse(key)
    }

    /// Parse a u32 from an environment variable.
    pub fn parse_u32(key: &str) -> Option<Result<u32>> {
        parse(key)
    }

    /// Parse a u64 from an environment variable.
    pub fn parse_u64(key: &str) -> Option<Result<u64>> {
        parse(key)
    }

    /// Parse an f64 from an environment variable.
    pub fn parse_f64(key: &str) -> Option<Result<f64>> {
        parse(key)
    }

    /// Parse a boolean from an environment variable.
    /// Accepts "true", "1", "yes", "on" as true (case-insensitive).
    /// Accepts "false", "0", "no", "off" as false (case-insensitive).
    pub fn parse_bool(key: &str) -> Option<Result<bool>> {
        std::env::var(key)
            .ok()
            .map(|val| match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(ServerError::Config(format!(
                    "invalid {key}: expected boolean (true/false/1/0/yes/no/on/off)"
                ))),
            })
    }

    /// Parse a path from an environment variable.
    pub fn parse_path(key: &str) -> Option<PathBuf> {
        std::env::var(key)
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }
}

/// Overrides applied on top of the progression file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurveOverrides {
    /// Replacement base XP.
    pub base_xp: Option<u64>,
    /// Replacement multiplier.
    pub multiplier: Option<f64>,
    /// Replacement level ceiling.
    pub level_ceiling: Option<u32>,
}

impl CurveOverrides {
    fn apply(&self, config: &mut ProgressionConfig) {
        if let Some(base_xp) = self.base_xp {
            config.curve.base_xp = base_xp;
        }
        if let Some(multiplier) = self.multiplier {
            config.curve.multiplier = multiplier;
        }
        if let Some(level_ceiling) = self.level_ceiling {
            config.curve.level_ceiling = level_ceiling;
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
    /// Progression TOML file; built-in defaults when absent.
    pub progression_path: Option<PathBuf>,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
    /// Audit logging configuration (None disables auditing).
    pub audit: Option<AuditConfig>,
    /// Level curve overrides from the environment.
    pub curve_overrides: CurveOverrides,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            progression_path: None,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            audit: Some(AuditConfig::default()),
            curve_overrides: CurveOverrides::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(result) = env_parse::parse_socket_addr(ENV_BIND_ADDR) {
            config.bind_addr = result?;
        }
        if let Some(result) = env_parse::parse_usize(ENV_MAX_BODY_SIZE) {
            config.max_body_size = result?;
        }
        config.progression_path = env_parse::parse_path(ENV_PROGRESSION_CONFIG);

        // Audit logging
        if let Some(result) = env_parse::parse_bool(ENV_AUDIT_ENABLED) {
            if !result? {
                config.audit = None;
            }
        }
        if let Some(result) = env_parse::parse_usize(ENV_AUDIT_MAX_ENTRIES) {
            let max_entries = result?;
            config.audit = config.audit.map(|audit| audit.with_max_entries(max_entries));
        }

        // Curve overrides
        if let Some(result) = env_parse::parse_u64(ENV_BASE_XP) {
            config.curve_overrides.base_xp = Some(result?);
        }
        if let Some(result) = env_parse::parse_f64(ENV_XP_MULTIPLIER) {
            config.curve_overrides.multiplier = Some(result?);
        }
        if let Some(result) = env_parse::parse_u32(ENV_LEVEL_CEILING) {
            config.curve_overrides.level_ceiling = Some(result?);
        }

        Ok(config)
    }

    /// Set the bind address.
    #[must_use]
    pub const fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the progression file.
    #[must_use]
    pub fn with_progression_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.progression_path = Some(path.into());
        self
    }

    /// Set the maximum request body size.
    #[must_use]
    pub const fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set or disable audit logging.
    #[must_use]
    pub fn with_audit(mut self, audit: Option<AuditConfig>) -> Self {
        self.audit = audit;
        self
    }

    /// Builds the progression configuration: file (or defaults) plus overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or the result is invalid.
    pub fn progression_config(&self) -> Result<ProgressionConfig> {
        let mut config = match &self.progression_path {
            Some(path) => ProgressionConfig::from_file(path)?,
            None => ProgressionConfig::default(),
        };
        self.curve_overrides.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max_body_size == 0 {
            return Err(ServerError::Config(
                "max_body_size must be greater than 0".to_string(),
            ));
        }
        if let Some(path) = &self.progression_path {
            if !path.exists() {
                return Err(ServerError::Config(format!(
                    "progression config not found: {}",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_body_size, DEFAULT_MAX_BODY_SIZE);
        assert!(config.audit.is_some());
        assert!(config.progression_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let addr: SocketAddr = "0.0.0.0:9000".parse().unwrap();
        let config = ServerConfig::new()
            .with_bind_addr(addr)
            .with_max_body_size(1024)
            .with_audit(None);
        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_body_size, 1024);
        assert!(config.audit.is_none());
    }

    #[test]
    fn test_validate_zero_body_size() {
        let config = ServerConfig::new().with_max_body_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_missing_progression_file() {
        let config = ServerConfig::new().with_progression_path("/nonexistent/aura.toml");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_progression_config_from_file_with_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "daily_login_xp = 5\n[curve]\nbase_xp = 200\n").unwrap();
        file.flush().unwrap();

        let mut config = ServerConfig::new().with_progression_path(file.path());
        config.curve_overrides.level_ceiling = Some(20);

        let progression = config.progression_config().unwrap();
        assert_eq!(progression.daily_login_xp, 5);
        assert_eq!(progression.curve.base_xp, 200);
        assert_eq!(progression.curve.level_ceiling, 20);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut config = ServerConfig::new();
        config.curve_overrides.multiplier = Some(0.5);
        assert!(matches!(
            config.progression_config(),
            Err(ServerError::Progression(_))
        ));
    }

    // Environment variable tests
    mod env_tests {
        use std::sync::Mutex;

        use super::*;

        // Use a mutex to ensure env var tests don't interfere with each other
        static ENV_MUTEX: Mutex<()> = Mutex::new(());

        const ALL_KEYS: &[&str] = &[
            ENV_BIND_ADDR,
            ENV_PROGRESSION_CONFIG,
            ENV_MAX_BODY_SIZE,
            ENV_AUDIT_ENABLED,
            ENV_AUDIT_MAX_ENTRIES,
            ENV_BASE_XP,
            ENV_XP_MULTIPLIER,
            ENV_LEVEL_CEILING,
        ];

        fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
        where
            F: FnOnce() -> R,
        {
            let _guard = ENV_MUTEX
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);

            let saved: Vec<_> = ALL_KEYS
                .iter()
                .map(|k| {
                    let old = std::env::var(k).ok();
                    std::env::remove_var(k);
                    (*k, old)
                })
                .collect();
            for (k, v) in vars {
                std::env::set_var(k, v);
            }

            let result = f();

            for (k, old) in saved {
                match old {
                    Some(v) => std::env::set_var(k, v),
                    None => std::env::remove_var(k),
                }
            }

            result
        }

        #[test]
        fn test_from_env_defaults() {
            with_env_vars(&[], || {
                let config = ServerConfig::from_env().unwrap();
                assert_eq!(config.bind_addr.port(), 8080);
                assert!(config.audit.is_some());
                assert_eq!(config.curve_overrides, CurveOverrides::default());
            });
        }

        #[test]
        fn test_from_env_values() {
            with_env_vars(
                &[
                    (ENV_BIND_ADDR, "0.0.0.0:7000"),
                    (ENV_MAX_BODY_SIZE, "2048"),
                    (ENV_AUDIT_MAX_ENTRIES, "10"),
                    (ENV_BASE_XP, "250"),
                    (ENV_XP_MULTIPLIER, "1.2"),
                    (ENV_LEVEL_CEILING, "50"),
                ],
                || {
                    let config = ServerConfig::from_env().unwrap();
                    assert_eq!(config.bind_addr.port(), 7000);
                    assert_eq!(config.max_body_size, 2048);
                    assert_eq!(config.audit.as_ref().unwrap().max_entries, 10);
                    assert_eq!(config.curve_overrides.base_xp, Some(250));
                    assert_eq!(config.curve_overrides.multiplier, Some(1.2));
                    assert_eq!(config.curve_overrides.level_ceiling, Some(50));
                },
            );
        }

        #[test]
        fn test_from_env_audit_disabled() {
            with_env_vars(&[(ENV_AUDIT_ENABLED, "off")], || {
                let config = ServerConfig::from_env().unwrap();
                assert!(config.audit.is_none());
            });
        }

        #[test]
        fn test_from_env_invalid_values() {
            with_env_vars(&[(ENV_BIND_ADDR, "not-an-addr")], || {
                assert!(ServerConfig::from_env().is_err());
            });
            with_env_vars(&[(ENV_AUDIT_ENABLED, "maybe")], || {
                assert!(ServerConfig::from_env().is_err());
            });
            with_env_vars(&[(ENV_XP_MULTIPLIER, "fast")], || {
                assert!(ServerConfig::from_env().is_err());
            });
        }
    }
}

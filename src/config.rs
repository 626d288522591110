//! Runtime configuration.
//!
//! Values come from built-in defaults, then an optional TOML file named by
//! `SAFEPATH_CONFIG`, then individual environment variables:
//!
//! | Env | TOML key |
//! |---|---|
//! | `BIND_ADDR` | `bind_addr` |
//! | `PORT` | `port` |
//! | `TOMTOM_BASE_URL` | `provider.base_url` |
//! | `TOMTOM_API_KEY` | `provider.api_key` |
//! | `PROVIDER_TIMEOUT_SECS` | `provider.timeout_secs` (0 disables the deadline) |
//! | `SAFETY_BONUS` | `policy.safety_bonus` |
//! | `DURATION_PENALTY_SECS` | `policy.duration_penalty_secs` |
//! | `SAFETY_SEED_PATH` | `seed.path` |
//! | `SAFETY_RANDOM_SEED` | `seed.random_seed` |
//! | `EMERGENCY_CONTACTS` | `emergency_contacts` (comma-separated in env) |

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::composer::RoutePolicy;
use crate::error::ConfigError;
use crate::provider::tomtom::DEFAULT_BASE_URL;

pub const CONFIG_PATH_VAR: &str = "SAFEPATH_CONFIG";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    pub provider: ProviderSettings,
    pub policy: RoutePolicy,
    pub seed: SeedSettings,
    pub emergency_contacts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SeedSettings {
    /// JSON seed file; the deterministic mock grid is used when unset.
    pub path: Option<PathBuf>,
    pub random_seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 3000,
            provider: ProviderSettings::default(),
            policy: RoutePolicy::default(),
            seed: SeedSettings::default(),
            emergency_contacts: vec!["+1234567890".to_string(), "+1987654321".to_string()],
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

impl Default for SeedSettings {
    fn default() -> Self {
        Self {
            path: None,
            random_seed: 42,
        }
    }
}

impl Config {
    /// Reads the optional config file and applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// environment variable holds an unparsable value.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loading config from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid TOML or mistyped values, and
    /// [`ConfigError::InvalidValue`] for a non-finite policy number.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.check_policy()?;
        Ok(config)
    }

    /// Overrides fields from `lookup` (normally the process environment).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unparsable numbers or a
    /// non-finite policy number.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = var("PORT") {
            self.port = parse_value("PORT", &v)?;
        }
        if let Some(v) = var("TOMTOM_BASE_URL") {
            self.provider.base_url = v;
        }
        if let Some(v) = var("TOMTOM_API_KEY") {
            self.provider.api_key = Some(v);
        }
        if let Some(v) = var("PROVIDER_TIMEOUT_SECS") {
            self.provider.timeout_secs = parse_value("PROVIDER_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = var("SAFETY_BONUS") {
            self.policy.safety_bonus = parse_value("SAFETY_BONUS", &v)?;
        }
        if let Some(v) = var("DURATION_PENALTY_SECS") {
            self.policy.duration_penalty_secs = parse_value("DURATION_PENALTY_SECS", &v)?;
        }
        if let Some(v) = var("SAFETY_SEED_PATH") {
            self.seed.path = Some(PathBuf::from(v));
        }
        if let Some(v) = var("SAFETY_RANDOM_SEED") {
            self.seed.random_seed = parse_value("SAFETY_RANDOM_SEED", &v)?;
        }
        if let Some(v) = var("EMERGENCY_CONTACTS") {
            self.emergency_contacts = v
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
        }

        self.check_policy()
    }

    fn check_policy(&self) -> Result<(), ConfigError> {
        let knobs = [
            ("policy.safety_bonus", self.policy.safety_bonus),
            ("policy.duration_penalty_secs", self.policy.duration_penalty_secs),
        ];
        for (key, value) in knobs {
            if !value.is_finite() {
                return Err(ConfigError::InvalidValue {
                    key,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Per-call provider deadline; `None` when `timeout_secs` is 0.
    #[must_use]
    pub const fn provider_timeout(&self) -> Option<Duration> {
        match self.provider.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// The configured policy with the provider deadline filled in.
    #[must_use]
    pub fn route_policy(&self) -> RoutePolicy {
        RoutePolicy {
            provider_timeout: self.provider_timeout(),
            ..self.policy
        }
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

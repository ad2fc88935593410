//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional:
//! - `CART_STORAGE_KEY` - Key the cart is read from and written to
//!   (default: `@GoMarketPlace:products`)
//! - `CART_LEGACY_KEYS` - Comma-separated keys migrated into the storage key
//!   when it is empty (default: `@GoMarketPLace:products,@GoMarketPLace:product`,
//!   set to an empty string to disable)
//! - `CART_STORAGE_PATH` - File used by the JSON file store
//!   (default: `.go-marketplace/cart.json`)
//! - `CART_STORAGE_TIMEOUT_MS` - Timeout per storage call (default: 5000)
//! - `CART_PERSIST_RETRIES` - Extra attempts for a failed write (default: 2)
//! - `CART_ZERO_QUANTITY_POLICY` - `remove` or `clamp` (default: `remove`)

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Canonical storage key for the cart collection.
pub const DEFAULT_STORAGE_KEY: &str = "@GoMarketPlace:products";

/// Keys older builds of the mobile client wrote the cart to and read it from,
/// in the order they are consulted.
pub const LEGACY_STORAGE_KEYS: [&str; 2] = ["@GoMarketPLace:products", "@GoMarketPLace:product"];

const DEFAULT_STORAGE_PATH: &str = ".go-marketplace/cart.json";
const DEFAULT_TIMEOUT_MS: u64 = 5000;
const DEFAULT_PERSIST_RETRIES: u32 = 2;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// What `decrement` does to a line whose quantity would reach zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ZeroQuantityPolicy {
    /// Drop the line from the cart.
    #[default]
    Remove,
    /// Keep the line at quantity 0; only `remove` deletes it.
    Clamp,
}

impl ZeroQuantityPolicy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Remove => "remove",
            Self::Clamp => "clamp",
        }
    }
}

impl fmt::Display for ZeroQuantityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZeroQuantityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remove" => Ok(Self::Remove),
            "clamp" => Ok(Self::Clamp),
            other => Err(format!("expected `remove` or `clamp`, got `{other}`")),
        }
    }
}

/// Cart store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartConfig {
    /// Key used for both reading and writing the cart
    pub storage_key: String,
    /// Keys consulted, in order, when `storage_key` holds nothing
    pub legacy_keys: Vec<String>,
    /// Path of the JSON file store
    pub storage_path: PathBuf,
    /// Upper bound for a single storage call
    pub storage_timeout: Duration,
    /// Extra attempts for a write that failed with a transient error
    pub persist_retries: u32,
    /// Behaviour of `decrement` at quantity zero
    pub zero_quantity_policy: ZeroQuantityPolicy,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            legacy_keys: LEGACY_STORAGE_KEYS.iter().map(ToString::to_string).collect(),
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            storage_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            persist_retries: DEFAULT_PERSIST_RETRIES,
            zero_quantity_policy: ZeroQuantityPolicy::default(),
        }
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let storage_key = lookup("CART_STORAGE_KEY")
            .filter(|key| !key.trim().is_empty())
            .unwrap_or(defaults.storage_key);

        let legacy_keys = lookup("CART_LEGACY_KEYS").map_or(defaults.legacy_keys, |raw| {
            parse_key_list(&raw, &storage_key)
        });

        let storage_path = lookup("CART_STORAGE_PATH")
            .map_or(defaults.storage_path, PathBuf::from);

        let storage_timeout = lookup("CART_STORAGE_TIMEOUT_MS")
            .map(|raw| parse_var::<u64>("CART_STORAGE_TIMEOUT_MS", &raw))
            .transpose()?
            .map_or(defaults.storage_timeout, Duration::from_millis);

        if storage_timeout.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "CART_STORAGE_TIMEOUT_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let persist_retries = lookup("CART_PERSIST_RETRIES")
            .map(|raw| parse_var::<u32>("CART_PERSIST_RETRIES", &raw))
            .transpose()?
            .unwrap_or(defaults.persist_retries);

        let zero_quantity_policy = lookup("CART_ZERO_QUANTITY_POLICY")
            .map(|raw| parse_var::<ZeroQuantityPolicy>("CART_ZERO_QUANTITY_POLICY", &raw))
            .transpose()?
            .unwrap_or(defaults.zero_quantity_policy);

        Ok(Self {
            storage_key,
            legacy_keys,
            storage_path,
            storage_timeout,
            persist_retries,
            zero_quantity_policy,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a variable value, naming the variable in the error.
fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Split a comma-separated key list, dropping blanks and the canonical key.
fn parse_key_list(raw: &str, storage_key: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty() && *key != storage_key)
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = CartConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, CartConfig::default());
        assert_eq!(config.storage_key, "@GoMarketPlace:products");
        assert_eq!(
            config.legacy_keys,
            vec!["@GoMarketPLace:products", "@GoMarketPLace:product"]
        );
        assert_eq!(config.zero_quantity_policy, ZeroQuantityPolicy::Remove);
    }

    #[test]
    fn test_overrides() {
        let config = CartConfig::from_lookup(lookup_from(&[
            ("CART_STORAGE_KEY", "cart:v2"),
            ("CART_LEGACY_KEYS", "cart:v0, cart:v1,,cart:v2"),
            ("CART_STORAGE_PATH", "/tmp/cart.json"),
            ("CART_STORAGE_TIMEOUT_MS", "250"),
            ("CART_PERSIST_RETRIES", "0"),
            ("CART_ZERO_QUANTITY_POLICY", "Clamp"),
        ]))
        .unwrap();

        assert_eq!(config.storage_key, "cart:v2");
        assert_eq!(config.legacy_keys, vec!["cart:v0", "cart:v1"]);
        assert_eq!(config.storage_path, PathBuf::from("/tmp/cart.json"));
        assert_eq!(config.storage_timeout, Duration::from_millis(250));
        assert_eq!(config.persist_retries, 0);
        assert_eq!(config.zero_quantity_policy, ZeroQuantityPolicy::Clamp);
    }

    #[test]
    fn test_empty_legacy_keys_disables_migration() {
        let config = CartConfig::from_lookup(lookup_from(&[("CART_LEGACY_KEYS", "")])).unwrap();
        assert!(config.legacy_keys.is_empty());
    }

    #[test]
    fn test_invalid_timeout() {
        let result = CartConfig::from_lookup(lookup_from(&[("CART_STORAGE_TIMEOUT_MS", "soon")]));
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(key, _)) if key == "CART_STORAGE_TIMEOUT_MS"));

        let result = CartConfig::from_lookup(lookup_from(&[("CART_STORAGE_TIMEOUT_MS", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_policy() {
        let result =
            CartConfig::from_lookup(lookup_from(&[("CART_ZERO_QUANTITY_POLICY", "negative")]));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("CART_ZERO_QUANTITY_POLICY"));
    }

    #[test]
    fn test_policy_display_roundtrip() {
        for policy in [ZeroQuantityPolicy::Remove, ZeroQuantityPolicy::Clamp] {
            assert_eq!(policy.to_string().parse::<ZeroQuantityPolicy>(), Ok(policy));
        }
    }
}

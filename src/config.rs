use std::collections::HashSet;
use std::env;

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;

use crate::screener::auth::DEFAULT_MAX_BODY_BYTES;
use crate::screener::freshness::DEFAULT_CLOCK_SKEW_SECONDS;
use crate::screener::{Config, SigningKeyConfig};

/// Top-level settings: the `config.toml` layout, also buildable from env.
#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub log_level: String,
    pub screener: Config,
}

/// Environment variable configuration loader
/// Supports multiple signing keys via indexed environment variables
/// and JSON-based key configuration
pub struct ConfigLoader;

#[derive(Deserialize)]
struct SigningKeysJson {
    keys: Vec<SigningKeyConfig>,
}

impl ConfigLoader {
    /// Load configuration from environment variables with fallback defaults
    pub fn load() -> Result<Settings> {
        let location = env::var("SCREENER_LOCATION").unwrap_or_else(|_| "./static".to_string());
        let port = env::var("SCREENER_PORT").unwrap_or_else(|_| "8080".to_string());
        let address = env::var("SCREENER_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string());
        let log_level = env::var("SCREENER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let clock_skew_seconds = match env::var("SCREENER_CLOCK_SKEW_SECONDS") {
            Ok(value) => value
                .parse()
                .map_err(|_| anyhow!("Invalid SCREENER_CLOCK_SKEW_SECONDS: {}", value))?,
            Err(_) => DEFAULT_CLOCK_SKEW_SECONDS,
        };

        let max_body_bytes = match env::var("SCREENER_MAX_BODY_BYTES") {
            Ok(value) => value
                .parse()
                .map_err(|_| anyhow!("Invalid SCREENER_MAX_BODY_BYTES: {}", value))?,
            Err(_) => DEFAULT_MAX_BODY_BYTES,
        };

        let signing_keys = Self::load_signing_keys()?;

        Ok(Settings {
            log_level,
            screener: Config {
                location,
                port,
                address,
                clock_skew_seconds,
                max_body_bytes,
                signing_keys,
            },
        })
    }

    /// Load signing keys from environment variables
    /// Supports two methods, combined:
    /// 1. JSON format via SCREENER_SIGNING_KEYS
    /// 2. Indexed environment variables (SCREENER_KEY_ID_0, SCREENER_SECRET_0, ...)
    fn load_signing_keys() -> Result<Vec<SigningKeyConfig>> {
        let mut keys = Vec::new();

        if let Ok(json_keys) = env::var("SCREENER_SIGNING_KEYS") {
            let parsed: SigningKeysJson = serde_json::from_str(&json_keys)
                .map_err(|e| anyhow!("Invalid SCREENER_SIGNING_KEYS JSON format: {}", e))?;
            keys.extend(parsed.keys);
        }

        let mut index = 0;
        while let (Ok(key_id), Ok(secret)) = (
            env::var(format!("SCREENER_KEY_ID_{}", index)),
            env::var(format!("SCREENER_SECRET_{}", index)),
        ) {
            keys.push(SigningKeyConfig { key_id, secret });
            index += 1;
        }

        Ok(keys)
    }

    /// Print configuration help
    pub fn print_help() {
        println!("Screener Configuration - Environment Variables");
        println!("==============================================");
        println!();
        println!("Core Configuration:");
        println!("  SCREENER_LOCATION            Static file directory (default: ./static)");
        println!("  SCREENER_PORT                Server port (default: 8080)");
        println!("  SCREENER_ADDRESS             Bind address (default: 0.0.0.0)");
        println!("  SCREENER_LOG_LEVEL           Log level (default: info)");
        println!(
            "  SCREENER_CLOCK_SKEW_SECONDS  Accepted date header skew (default: {})",
            DEFAULT_CLOCK_SKEW_SECONDS
        );
        println!(
            "  SCREENER_MAX_BODY_BYTES      Largest signed request body (default: {})",
            DEFAULT_MAX_BODY_BYTES
        );
        println!();
        println!("Signing Keys (secrets are base64 encoded):");
        println!();
        println!("Method 1 - JSON Format:");
        println!("  SCREENER_SIGNING_KEYS        JSON object with a list of keys");
        println!("  Example: '{{\"keys\":[{{\"key_id\":\"abc\",\"secret\":\"c2VjcmV0\"}}]}}'");
        println!();
        println!("Method 2 - Indexed Variables:");
        println!("  SCREENER_KEY_ID_0            First key id");
        println!("  SCREENER_SECRET_0            First secret");
        println!("  SCREENER_KEY_ID_1            Second key id");
        println!("  SCREENER_SECRET_1            Second secret");
        println!("  ... (continue with _2, _3, etc.)");
    }

    /// Validate loaded configuration
    pub fn validate(settings: &Settings) -> Result<()> {
        let config = &settings.screener;

        config
            .port
            .parse::<u16>()
            .map_err(|_| anyhow!("Invalid port number: {}", config.port))?;

        match settings.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(anyhow!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    settings.log_level
                ))
            }
        }

        if config.clock_skew_seconds == 0 {
            return Err(anyhow!("Clock skew window must be greater than zero"));
        }

        if config.max_body_bytes == 0 {
            return Err(anyhow!("Maximum body size must be greater than zero"));
        }

        let mut seen = HashSet::new();
        for (i, key) in config.signing_keys.iter().enumerate() {
            if key.key_id.is_empty() {
                return Err(anyhow!("Signing key {} has empty key id", i));
            }
            if !seen.insert(key.key_id.as_str()) {
                return Err(anyhow!("Duplicate signing key id: {}", key.key_id));
            }
            let secret = general_purpose::STANDARD
                .decode(&key.secret)
                .map_err(|_| anyhow!("Secret for signing key {} must be valid base64", key.key_id))?;
            if secret.is_empty() {
                return Err(anyhow!("Secret for signing key {} is empty", key.key_id));
            }
        }

        Ok(())
    }
}

//! Shop configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STRIPE_SECRET_KEY` - Stripe API secret key
//! - `STRIPE_WEBHOOK_SECRET` - Stripe webhook signing secret
//!
//! ## Optional
//! - `SHOP_UPLOAD_DIR` - Directory for uploaded image blobs (default: `uploads`)
//! - `SHOP_CURRENCY` - ISO 4217 currency code sent to the gateway (default: `usd`)

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_CURRENCY: &str = "usd";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Shop core configuration.
#[derive(Clone)]
pub struct ShopConfig {
    /// Directory where uploaded image blobs are written.
    pub upload_dir: PathBuf,
    /// Payment gateway configuration.
    pub stripe: StripeConfig,
}

/// Stripe payment gateway configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe API secret key (server-side only).
    pub secret_key: SecretString,
    /// Webhook signing secret used to verify inbound events.
    pub webhook_secret: SecretString,
    /// Lowercase ISO 4217 currency code for payment intents.
    pub currency: String,
}

impl std::fmt::Debug for ShopConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopConfig")
            .field("upload_dir", &self.upload_dir)
            .field("stripe", &self.stripe)
            .finish()
    }
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("currency", &self.currency)
            .finish()
    }
}

impl ShopConfig {
    /// Load configuration from the environment, reading `.env` if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is absent or a value
    /// fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine; real deployments set the environment.
        dotenvy::dotenv().ok();

        let upload_dir = std::env::var("SHOP_UPLOAD_DIR")
            .unwrap_or_else(|_| DEFAULT_UPLOAD_DIR.to_owned())
            .into();

        let currency =
            std::env::var("SHOP_CURRENCY").unwrap_or_else(|_| DEFAULT_CURRENCY.to_owned());
        validate_currency(&currency)?;

        Ok(Self {
            upload_dir,
            stripe: StripeConfig {
                secret_key: require_secret("STRIPE_SECRET_KEY")?,
                webhook_secret: require_secret("STRIPE_WEBHOOK_SECRET")?,
                currency,
            },
        })
    }
}

fn require_secret(name: &str) -> Result<SecretString, ConfigError> {
    std::env::var(name)
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(name.to_owned()))
}

fn validate_currency(code: &str) -> Result<(), ConfigError> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_lowercase()) {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            "SHOP_CURRENCY".to_owned(),
            format!("expected a lowercase ISO 4217 code, got {code:?}"),
        ))
    }
}

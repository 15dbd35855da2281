//! Configuration for the ledger and the payment webhook.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CarbonexError, Result, constants};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

/// Unit-of-work bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Max wait to acquire the ledger lock before failing.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
    /// A unit of work whose body runs longer than this is rolled back.
    #[serde(default = "default_unit_of_work_timeout_ms")]
    pub unit_of_work_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: constants::DEFAULT_LOCK_TIMEOUT_MS,
            unit_of_work_timeout_ms: constants::DEFAULT_UNIT_OF_WORK_TIMEOUT_MS,
        }
    }
}

/// Payment webhook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Shared HMAC secret. Never logged.
    #[serde(default, skip_serializing)]
    pub signing_secret: String,
    /// Replay window in seconds.
    #[serde(default = "default_tolerance_secs")]
    pub tolerance_secs: i64,
    /// Currency for payment intents.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Recently settled event ids to remember.
    #[serde(default = "default_delivery_cache_size")]
    pub delivery_cache_size: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            signing_secret: String::new(),
            tolerance_secs: constants::DEFAULT_WEBHOOK_TOLERANCE_SECS,
            currency: constants::DEFAULT_CURRENCY.to_string(),
            delivery_cache_size: constants::DEFAULT_DELIVERY_CACHE_SIZE,
        }
    }
}

fn default_lock_timeout_ms() -> u64 {
    constants::DEFAULT_LOCK_TIMEOUT_MS
}

fn default_unit_of_work_timeout_ms() -> u64 {
    constants::DEFAULT_UNIT_OF_WORK_TIMEOUT_MS
}

fn default_tolerance_secs() -> i64 {
    constants::DEFAULT_WEBHOOK_TOLERANCE_SECS
}

fn default_currency() -> String {
    constants::DEFAULT_CURRENCY.to_string()
}

fn default_delivery_cache_size() -> usize {
    constants::DEFAULT_DELIVERY_CACHE_SIZE
}

impl MarketConfig {
    /// Build a config from `CARBONEX_*` environment variables over defaults.
    ///
    /// # Errors
    /// Returns [`CarbonexError::Configuration`] on malformed numeric values
    /// or if the result fails [`MarketConfig::validate`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(secret) = lookup("CARBONEX_WEBHOOK_SECRET") {
            config.webhook.signing_secret = secret;
        }
        if let Some(raw) = lookup("CARBONEX_WEBHOOK_TOLERANCE_SECS") {
            config.webhook.tolerance_secs = parse_var("CARBONEX_WEBHOOK_TOLERANCE_SECS", &raw)?;
        }
        if let Some(currency) = lookup("CARBONEX_CURRENCY") {
            config.webhook.currency = currency.trim().to_lowercase();
        }
        if let Some(raw) = lookup("CARBONEX_LOCK_TIMEOUT_MS") {
            config.ledger.lock_timeout_ms = parse_var("CARBONEX_LOCK_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = lookup("CARBONEX_UOW_TIMEOUT_MS") {
            config.ledger.unit_of_work_timeout_ms = parse_var("CARBONEX_UOW_TIMEOUT_MS", &raw)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    ///
    /// # Errors
    /// Returns [`CarbonexError::Configuration`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.webhook.signing_secret.trim().is_empty() {
            return Err(CarbonexError::Configuration(
                "webhook signing secret is empty".into(),
            ));
        }
        if self.webhook.tolerance_secs <= 0 {
            return Err(CarbonexError::Configuration(
                "webhook tolerance must be positive".into(),
            ));
        }
        if self.webhook.currency.is_empty() {
            return Err(CarbonexError::Configuration("currency is empty".into()));
        }
        if self.webhook.delivery_cache_size == 0 {
            return Err(CarbonexError::Configuration(
                "delivery cache size must be > 0".into(),
            ));
        }
        if self.ledger.lock_timeout_ms == 0 || self.ledger.unit_of_work_timeout_ms == 0 {
            return Err(CarbonexError::Configuration(
                "ledger timeouts must be > 0".into(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| CarbonexError::Configuration(format!("{key}: cannot parse {raw:?}")))
}

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::warn;

/// How a guest cart meets the persisted cart at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartMergePolicy {
    /// Sum quantities per product, capped at known stock.
    Combine,
    /// Keep only the server cart and drop the guest cart.
    ServerAuthoritative,
}

impl FromStr for CartMergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "combine" => Ok(CartMergePolicy::Combine),
            "server" => Ok(CartMergePolicy::ServerAuthoritative),
            other => Err(format!("unknown cart merge policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

/// Service configuration.
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | ACTOR_BUFFER_SIZE | 32 | mpsc buffer per actor |
/// | SHIPPING_FEE | 500 | flat shipping charged per order |
/// | TAX_RATE | 0 | fraction of the subtotal charged as tax |
/// | CONFIRM_RETRY_ATTEMPTS | 3 | confirmation attempts after a recorded payment |
/// | CONFIRM_RETRY_BACKOFF_MS | 50 | pause between confirmation attempts |
/// | REMINDER_TIMEOUT_MS | 500 | wait bound for reminder scheduling |
/// | ADMIN_PAGE_SIZE | 10 | orders per page in the admin view |
/// | MAX_PRESCRIPTION_DOCUMENTS | 5 | documents per prescription |
/// | CART_MERGE_POLICY | combine | `combine` or `server` |
/// | LOG_FORMAT | compact | `compact` or `json` |
#[derive(Debug, Clone)]
pub struct Config {
    pub actor_buffer_size: usize,
    pub shipping_fee: Decimal,
    pub tax_rate: Decimal,
    pub confirm_retry_attempts: u32,
    pub confirm_retry_backoff_ms: u64,
    pub reminder_timeout_ms: u64,
    pub admin_page_size: usize,
    pub max_prescription_documents: usize,
    pub cart_merge_policy: CartMergePolicy,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            actor_buffer_size: 32,
            shipping_fee: Decimal::new(500, 0),
            tax_rate: Decimal::ZERO,
            confirm_retry_attempts: 3,
            confirm_retry_backoff_ms: 50,
            reminder_timeout_ms: 500,
            admin_page_size: 10,
            max_prescription_documents: 5,
            cart_merge_policy: CartMergePolicy::Combine,
            log_format: LogFormat::Compact,
        }
    }
}

/// Parses `key` through `lookup`. Unset keys take the default; malformed ones
/// are logged and take the default too.
fn env_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(e) => {
            warn!(key, value = %raw, error = %e, "Ignoring malformed setting, using default");
            default
        }
    }
}

/// Money settings feed every order's totals; a negative one would make each creation fail.
fn non_negative(key: &str, value: Decimal, default: Decimal) -> Decimal {
    if value < Decimal::ZERO {
        warn!(key, %value, "Negative money setting rejected, using default");
        return default;
    }
    value
}

impl LogFormat {
    /// Read ahead of `Config::from_env` so that logging is up before settings are validated.
    pub fn from_env() -> Self {
        let _ = dotenv::dotenv();
        env_or(&|key: &str| std::env::var(key).ok(), "LOG_FORMAT", LogFormat::Compact)
    }
}

impl Config {
    /// Load from the environment (after `.env`, if present), falling back to defaults.
    pub fn from_env() -> Self {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let shipping_fee = env_or(&lookup, "SHIPPING_FEE", defaults.shipping_fee);
        let tax_rate = env_or(&lookup, "TAX_RATE", defaults.tax_rate);
        Self {
            actor_buffer_size: env_or(&lookup, "ACTOR_BUFFER_SIZE", defaults.actor_buffer_size).max(1),
            shipping_fee: non_negative("SHIPPING_FEE", shipping_fee, defaults.shipping_fee),
            tax_rate: non_negative("TAX_RATE", tax_rate, defaults.tax_rate),
            confirm_retry_attempts: env_or(&lookup, "CONFIRM_RETRY_ATTEMPTS", defaults.confirm_retry_attempts).max(1),
            confirm_retry_backoff_ms: env_or(&lookup, "CONFIRM_RETRY_BACKOFF_MS", defaults.confirm_retry_backoff_ms),
            reminder_timeout_ms: env_or(&lookup, "REMINDER_TIMEOUT_MS", defaults.reminder_timeout_ms),
            admin_page_size: env_or(&lookup, "ADMIN_PAGE_SIZE", defaults.admin_page_size).max(1),
            max_prescription_documents: env_or(
                &lookup,
                "MAX_PRESCRIPTION_DOCUMENTS",
                defaults.max_prescription_documents,
            ),
            cart_merge_policy: env_or(&lookup, "CART_MERGE_POLICY", defaults.cart_merge_policy),
            log_format: env_or(&lookup, "LOG_FORMAT", defaults.log_format),
        }
    }

    pub fn order_settings(&self) -> OrderSettings {
        OrderSettings {
            shipping_fee: self.shipping_fee,
            tax_rate: self.tax_rate,
            admin_page_size: self.admin_page_size,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.confirm_retry_attempts,
            backoff: Duration::from_millis(self.confirm_retry_backoff_ms),
            reminder_timeout: Duration::from_millis(self.reminder_timeout_ms),
        }
    }
}

/// Pricing and listing knobs used by the order clients.
#[derive(Debug, Clone, Copy)]
pub struct OrderSettings {
    pub shipping_fee: Decimal,
    pub tax_rate: Decimal,
    pub admin_page_size: usize,
}

/// Timing knobs for the payment/confirmation saga.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
    pub reminder_timeout: Duration,
}

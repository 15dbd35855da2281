//! System-wide constants for the Carbonex settlement engine.

/// Fractional digits kept on credit quantities and prices.
pub const CREDIT_PRECISION: u32 = 2;

/// Default maximum wait to acquire the ledger lock, in milliseconds.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Default deadline for one unit of work, in milliseconds.
pub const DEFAULT_UNIT_OF_WORK_TIMEOUT_MS: u64 = 10_000;

/// Webhook replay window: max |now - t| in seconds.
pub const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Settlement currency used for payment intents.
pub const DEFAULT_CURRENCY: &str = "sgd";

/// Number of provider event ids the webhook handler remembers.
pub const DEFAULT_DELIVERY_CACHE_SIZE: usize = 10_000;

/// Provider event type that triggers a purchase settlement.
pub const PAYMENT_SUCCEEDED_EVENT: &str = "payment_intent.succeeded";

/// Acknowledgement body returned to the payment provider.
pub const WEBHOOK_ACK: &str = "ok";

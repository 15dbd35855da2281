//! # carbonex-webhook
//!
//! The payment side of a purchase:
//!
//! - [`Checkout`] validates a buyer's request and creates a payment intent
//!   through an external [`PaymentIntentCreator`]. It never mutates the ledger.
//! - [`WebhookHandler`] verifies the provider's `payment_intent.succeeded`
//!   delivery ([`SignatureVerifier`]), recovers the purchase from the
//!   intent metadata and applies it with `buy_via_webhook`.
//!
//! Redelivered events are absorbed twice over: a bounded
//! [`DeliveryGuard`] of recently settled event ids, and the stored
//! payment record the engine checks inside the purchase unit of work.

pub mod checkout;
pub mod delivery_guard;
pub mod envelope;
pub mod handler;
pub mod signature;

pub use checkout::{
    Checkout, CheckoutSession, PaymentIntentCreator, PaymentIntentHandle, PaymentIntentParams,
};
pub use delivery_guard::DeliveryGuard;
pub use envelope::{PaymentIntentObject, PurchaseMetadata, WebhookEvent};
pub use handler::{Delivery, WebhookHandler, WebhookResponse};
pub use signature::{SignatureHeader, SignatureVerifier};

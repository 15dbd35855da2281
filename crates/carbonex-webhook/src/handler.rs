//! Payment webhook delivery handler.
//!
//! Status codes follow what the payment provider needs to see:
//! - `400` only for deliveries that cannot be trusted or read (empty
//!   body, bad signature, stale timestamp, non-JSON envelope). The
//!   provider retries these.
//! - `200 ok` for everything else, including domain failures such as a
//!   closed listing. Retrying those would never succeed, so they are
//!   logged and acknowledged.

use carbonex_settlement::{BuyOutcome, PurchaseRequest, SettlementEngine};
use carbonex_types::{
    CarbonexError, ErrorKind, PaymentDetails, Result, TransactionId, WebhookConfig, constants,
};
use chrono::Utc;
use parking_lot::Mutex;

use crate::delivery_guard::DeliveryGuard;
use crate::envelope::WebhookEvent;
use crate::signature::SignatureVerifier;

/// What the handler did with one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// A purchase was applied.
    Settled { transaction: TransactionId },
    /// The payment intent had already been settled by an earlier delivery.
    AlreadySettled { transaction: TransactionId },
    /// The event id was in the recent-delivery guard; the store was not touched.
    Redelivered,
    /// Nothing to settle (other event type or unusable metadata).
    Ignored(&'static str),
    /// The purchase failed in the engine and nothing was applied.
    Failed(ErrorKind),
    /// The delivery was refused with `400`.
    Rejected(ErrorKind),
}

/// Transport-neutral response for the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: String,
    pub delivery: Delivery,
}

impl WebhookResponse {
    fn ack(delivery: Delivery) -> Self {
        Self {
            status: 200,
            body: constants::WEBHOOK_ACK.to_string(),
            delivery,
        }
    }

    fn reject(err: &CarbonexError) -> Self {
        Self {
            status: 400,
            body: err.to_string(),
            delivery: Delivery::Rejected(err.kind()),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Verifies and applies payment-succeeded deliveries.
#[derive(Debug)]
pub struct WebhookHandler {
    engine: SettlementEngine,
    verifier: SignatureVerifier,
    recent: Mutex<DeliveryGuard>,
}

impl WebhookHandler {
    /// # Errors
    /// `Configuration` if the signing secret is empty or the tolerance is
    /// not positive.
    pub fn new(engine: SettlementEngine, config: &WebhookConfig) -> Result<Self> {
        Ok(Self {
            engine,
            verifier: SignatureVerifier::new(&config.signing_secret, config.tolerance_secs)?,
            recent: Mutex::new(DeliveryGuard::new(config.delivery_cache_size)),
        })
    }

    #[must_use]
    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    /// Handle one delivery against the current clock.
    pub fn handle(&self, raw_body: &[u8], signature_header: Option<&str>) -> WebhookResponse {
        self.handle_at(raw_body, signature_header, Utc::now().timestamp())
    }

    /// Handle one delivery as if received at `now` (unix seconds).
    pub fn handle_at(
        &self,
        raw_body: &[u8],
        signature_header: Option<&str>,
        now: i64,
    ) -> WebhookResponse {
        if raw_body.is_empty() {
            return rejected(&CarbonexError::EmptyBody);
        }
        if let Err(err) = self.verifier.verify(raw_body, signature_header, now) {
            return rejected(&err);
        }
        let event: WebhookEvent = match serde_json::from_slice(raw_body) {
            Ok(event) => event,
            Err(e) => return rejected(&CarbonexError::MalformedPayload(e.to_string())),
        };

        if !event.is_payment_succeeded() {
            tracing::debug!(event = %event.id, kind = %event.event_type, "event type ignored");
            return WebhookResponse::ack(Delivery::Ignored("unhandled event type"));
        }
        if self.recent.lock().is_settled(&event.id) {
            tracing::debug!(event = %event.id, "recent delivery acknowledged");
            return WebhookResponse::ack(Delivery::Redelivered);
        }

        let intent = match event.payment_intent() {
            Ok(intent) => intent,
            Err(e) => {
                tracing::debug!(event = %event.id, error = %e, "payment intent undecodable");
                return WebhookResponse::ack(Delivery::Ignored("payment intent undecodable"));
            }
        };
        let purchase = match intent.purchase_metadata() {
            Ok(purchase) => purchase,
            Err(reason) => {
                tracing::debug!(event = %event.id, payment_intent = %intent.id, reason, "metadata skipped");
                return WebhookResponse::ack(Delivery::Ignored(reason));
            }
        };

        let request = PurchaseRequest {
            listing_id: purchase.listing_id,
            buyer_org_id: purchase.buyer_org_id,
            amount: purchase.credits_amount,
            payment: PaymentDetails {
                payment_intent_id: intent.id.clone(),
                event_id: event.id.clone(),
                amount_paid_cents: intent.amount_received,
                currency: intent.currency,
                status: intent.status,
                raw_payload: String::from_utf8_lossy(raw_body).into_owned(),
            },
        };

        match self.engine.buy_via_webhook(request) {
            Ok(outcome) => {
                self.recent.lock().mark_settled(&event.id);
                let transaction = outcome.transaction_id();
                match outcome {
                    BuyOutcome::Applied(_) => {
                        WebhookResponse::ack(Delivery::Settled { transaction })
                    }
                    BuyOutcome::Duplicate { .. } => {
                        WebhookResponse::ack(Delivery::AlreadySettled { transaction })
                    }
                }
            }
            Err(err) => {
                tracing::error!(
                    event = %event.id,
                    payment_intent = %intent.id,
                    listing = %purchase.listing_id,
                    error = %err,
                    "webhook purchase failed; acknowledging"
                );
                WebhookResponse::ack(Delivery::Failed(err.kind()))
            }
        }
    }
}

fn rejected(err: &CarbonexError) -> WebhookResponse {
    tracing::warn!(error = %err, "webhook delivery rejected");
    WebhookResponse::reject(err)
}

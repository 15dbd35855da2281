//! Payment idempotency records.
//!
//! A [`Payment`] is written in the same unit of work that applies a
//! webhook-triggered purchase. Its presence for a payment reference is
//! what makes redelivered webhooks no-ops.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ListingId, OrgId, PaymentId, TransactionId};

/// Provider-side facts about a settled payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    /// Payment intent id. This is the idempotency key.
    pub payment_intent_id: String,
    /// Provider event id. Also unique.
    pub event_id: String,
    pub amount_paid_cents: i64,
    pub currency: String,
    pub status: String,
    /// Raw, unmodified webhook body.
    pub raw_payload: String,
}

/// Stored idempotency record for one settled payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: PaymentId,
    pub stripe_payment_intent_id: String,
    pub stripe_event_id: String,
    pub buyer_org_id: OrgId,
    pub listing_id: ListingId,
    pub credits_amount: Decimal,
    pub amount_paid_cents: i64,
    pub currency: String,
    pub status: String,
    pub raw_payload: String,
    /// The `buy` transaction this payment produced.
    pub transaction_id: TransactionId,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[must_use]
    pub fn record(
        details: PaymentDetails,
        buyer_org_id: OrgId,
        listing_id: ListingId,
        credits_amount: Decimal,
        transaction_id: TransactionId,
    ) -> Self {
        Self {
            payment_id: PaymentId::new(),
            stripe_payment_intent_id: details.payment_intent_id,
            stripe_event_id: details.event_id,
            buyer_org_id,
            listing_id,
            credits_amount,
            amount_paid_cents: details.amount_paid_cents,
            currency: details.currency,
            status: details.status,
            raw_payload: details.raw_payload,
            transaction_id,
            created_at: Utc::now(),
        }
    }
}

/// Fixture payment details for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl PaymentDetails {
    pub fn dummy(payment_intent_id: &str) -> Self {
        Self {
            payment_intent_id: payment_intent_id.to_string(),
            event_id: format!("evt_{}", rand::random::<u32>()),
            amount_paid_cents: 0,
            currency: "sgd".to_string(),
            status: "succeeded".to_string(),
            raw_payload: "{}".to_string(),
        }
    }
}

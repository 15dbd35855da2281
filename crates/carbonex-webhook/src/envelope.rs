//! Provider event envelope and the payment-intent object it carries.

use std::collections::HashMap;
use std::str::FromStr;

use carbonex_types::{ListingId, OrgId, constants};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Outer webhook event: `{id, type, data: {object}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    /// Left raw; decoded per event type.
    pub object: serde_json::Value,
}

impl WebhookEvent {
    #[must_use]
    pub fn is_payment_succeeded(&self) -> bool {
        self.event_type == constants::PAYMENT_SUCCEEDED_EVENT
    }

    /// Decode `data.object` as a payment intent.
    ///
    /// # Errors
    /// Returns the decode error if the object does not have that shape.
    pub fn payment_intent(&self) -> serde_json::Result<PaymentIntentObject> {
        PaymentIntentObject::deserialize(&self.data.object)
    }
}

/// The fields of a payment intent the handler reads.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    #[serde(default)]
    pub amount_received: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Purchase parameters recovered from payment-intent metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseMetadata {
    pub listing_id: ListingId,
    pub buyer_org_id: OrgId,
    pub credits_amount: Decimal,
}

impl PaymentIntentObject {
    /// Read `listing_id`, `buyer_org_id` and `credits_amount` from metadata.
    ///
    /// # Errors
    /// A short reason when a key is missing or unusable, or the amount is
    /// not positive. Such deliveries are acknowledged and skipped.
    pub fn purchase_metadata(&self) -> Result<PurchaseMetadata, &'static str> {
        let field = |key: &str| {
            self.metadata
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };
        let listing = field("listing_id").ok_or("listing_id missing")?;
        let buyer = field("buyer_org_id").ok_or("buyer_org_id missing")?;
        let amount = field("credits_amount").ok_or("credits_amount missing")?;

        let listing_id = ListingId::parse(listing).map_err(|_| "listing_id malformed")?;
        let buyer_org_id = OrgId::parse(buyer).map_err(|_| "buyer_org_id malformed")?;
        let credits_amount = Decimal::from_str(amount).map_err(|_| "credits_amount malformed")?;
        if credits_amount <= Decimal::ZERO {
            return Err("credits_amount not positive");
        }
        Ok(PurchaseMetadata {
            listing_id,
            buyer_org_id,
            credits_amount,
        })
    }
}

//! Checkout: the first half of a purchase.
//!
//! A buyer asks to purchase from a listing; checkout validates the request
//! against the current listing and asks the payment provider for a payment
//! intent carrying the purchase in its metadata. Nothing is written to the
//! ledger. The purchase is applied later by the webhook handler once the
//! provider reports the payment as succeeded.

use std::collections::BTreeMap;

use carbonex_settlement::SettlementEngine;
use carbonex_types::{Actor, CarbonexError, ListingId, Result, credits};
use rust_decimal::Decimal;
use serde::Serialize;

/// Parameters for one payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentIntentParams {
    /// Charge in minor currency units.
    pub amount_cents: i64,
    pub currency: String,
    /// Echoed back on the `payment_intent.succeeded` event.
    pub metadata: BTreeMap<String, String>,
}

/// Provider reply for a created payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentHandle {
    pub id: String,
    pub client_secret: String,
}

/// External payment provider.
pub trait PaymentIntentCreator: Send + Sync {
    /// # Errors
    /// Provider failures, mapped onto [`CarbonexError`] by the implementor.
    fn create_payment_intent(&self, params: &PaymentIntentParams) -> Result<PaymentIntentHandle>;
}

/// Result of [`Checkout::begin_purchase`], handed back to the buyer's client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSession {
    pub payment_intent_id: String,
    pub client_secret: String,
    pub listing_id: ListingId,
    pub credits_amount: Decimal,
    pub amount_cents: i64,
    pub currency: String,
}

/// Creates payment intents for purchases from open listings.
#[derive(Debug)]
pub struct Checkout<C> {
    engine: SettlementEngine,
    creator: C,
    currency: String,
}

impl<C: PaymentIntentCreator> Checkout<C> {
    #[must_use]
    pub fn new(engine: SettlementEngine, creator: C, currency: impl Into<String>) -> Self {
        Self {
            engine,
            creator,
            currency: currency.into(),
        }
    }

    /// Validate a purchase and create its payment intent.
    ///
    /// The amount is re-checked at settlement, so a listing that sells out
    /// in between makes the later webhook fail, not this call.
    ///
    /// # Errors
    /// `ActorWithoutOrg`, `OrgNotFound`, `InvalidAmount`, `ListingNotFound`,
    /// `ListingNotOpen`, `InsufficientInventory`, or whatever the provider
    /// returns.
    pub fn begin_purchase(
        &self,
        actor: &Actor,
        listing_id: ListingId,
        amount: Decimal,
    ) -> Result<CheckoutSession> {
        let buyer = actor.org()?;
        let amount = credits::validate_amount("amount", amount)?;
        if self.engine.org(buyer)?.is_none() {
            return Err(CarbonexError::OrgNotFound(buyer));
        }
        let listing = self
            .engine
            .listing(listing_id)?
            .ok_or(CarbonexError::ListingNotFound(listing_id))?;
        listing.ensure_open()?;
        if amount > listing.credits_available {
            return Err(CarbonexError::InsufficientInventory {
                requested: amount,
                listed: listing.credits_available,
            });
        }

        let amount_cents = credits::total_cents(amount, listing.price_per_credit)?;
        let mut shown = amount;
        shown.rescale(2);
        let metadata = BTreeMap::from([
            ("listing_id".to_string(), listing_id.to_string()),
            ("buyer_org_id".to_string(), buyer.to_string()),
            ("credits_amount".to_string(), shown.to_string()),
        ]);
        let params = PaymentIntentParams {
            amount_cents,
            currency: self.currency.clone(),
            metadata,
        };
        let handle = self.creator.create_payment_intent(&params)?;

        tracing::info!(
            payment_intent = %handle.id,
            listing = %listing_id,
            buyer = %buyer,
            amount = %amount,
            amount_cents,
            "payment intent created"
        );
        Ok(CheckoutSession {
            payment_intent_id: handle.id,
            client_secret: handle.client_secret,
            listing_id,
            credits_amount: amount,
            amount_cents,
            currency: params.currency,
        })
    }
}

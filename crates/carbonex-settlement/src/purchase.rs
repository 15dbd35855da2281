//! Webhook-driven purchase settlement.
//!
//! A purchase is applied exactly once per payment intent:
//! 1. Return the prior result if a payment is already recorded
//! 2. Take `amount` from the listing (closing it at zero)
//! 3. Consume the seller's locked credits (none for registry listings)
//! 4. Credit the buyer
//! 5. Append the `buy` transaction
//! 6. Record the payment in the same unit of work
//!
//! Any failure aborts the whole unit, payment record included, so a
//! redelivery after a failure is processed afresh.

use carbonex_ledger::{holding_ledger, listing_store};
use carbonex_types::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::SettlementEngine;

/// A verified, paid purchase to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub listing_id: ListingId,
    pub buyer_org_id: OrgId,
    pub amount: Decimal,
    /// Provider facts; `payment.payment_intent_id` is the idempotency key.
    pub payment: PaymentDetails,
}

/// What a newly applied purchase did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReceipt {
    pub transaction: Transaction,
    pub payment_id: PaymentId,
    /// Inventory left on the listing.
    pub remaining: Decimal,
    /// Whether this purchase depleted and closed the listing.
    pub listing_closed: bool,
}

/// Result of [`SettlementEngine::buy_via_webhook`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuyOutcome {
    /// The purchase was applied by this call.
    Applied(PurchaseReceipt),
    /// The payment was already settled; nothing changed.
    Duplicate {
        payment_reference: String,
        prior_transaction: TransactionId,
    },
}

impl BuyOutcome {
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }

    /// The `buy` transaction, whether created now or earlier.
    #[must_use]
    pub fn transaction_id(&self) -> TransactionId {
        match self {
            Self::Applied(receipt) => receipt.transaction.tx_id,
            Self::Duplicate {
                prior_transaction, ..
            } => *prior_transaction,
        }
    }
}

impl SettlementEngine {
    /// Apply a paid purchase from a listing.
    ///
    /// Only the payment webhook calls this. A payment intent that is
    /// already recorded yields [`BuyOutcome::Duplicate`] with no mutation.
    ///
    /// # Errors
    /// `InvalidAmount`, `MissingField`, `OrgNotFound`, `ListingNotFound`,
    /// `ListingNotOpen`, `InsufficientInventory`,
    /// `InsufficientLockedCredits`, `HoldingNotFound` or
    /// `DuplicateSettlement` (provider event id reused under another
    /// payment intent).
    pub fn buy_via_webhook(&self, request: PurchaseRequest) -> Result<BuyOutcome> {
        let amount = credits::validate_amount("credits_amount", request.amount)?;
        if request.payment.payment_intent_id.trim().is_empty() {
            return Err(CarbonexError::MissingField("payment_intent_id"));
        }
        let PurchaseRequest {
            listing_id,
            buyer_org_id,
            payment,
            ..
        } = request;

        self.store().transaction("buy_via_webhook", move |uow| {
            if let Some(prior) = uow.payment(&payment.payment_intent_id) {
                tracing::info!(
                    payment_intent = %prior.stripe_payment_intent_id,
                    tx = %prior.transaction_id,
                    "payment already settled"
                );
                return Ok(BuyOutcome::Duplicate {
                    payment_reference: prior.stripe_payment_intent_id,
                    prior_transaction: prior.transaction_id,
                });
            }

            let buyer = uow.org(buyer_org_id)?;
            let (listing, fill) =
                listing_store::reduce_available(uow, listing_id, amount, Some(buyer.org_code))?;
            let project_id = listing.project_id;

            match listing.seller_id {
                Some(seller) => {
                    holding_ledger::fulfill(uow, seller, project_id, amount)?;
                }
                None => uow.record_issuance(project_id, amount)?,
            }
            holding_ledger::credit(uow, buyer_org_id, project_id, amount)?;

            let tx = Transaction::buy(listing.seller_id, buyer_org_id, project_id, amount, listing_id);
            uow.append_transaction(tx.clone());

            let record = Payment::record(payment, buyer_org_id, listing_id, amount, tx.tx_id);
            let payment_id = record.payment_id;
            let payment_intent = record.stripe_payment_intent_id.clone();
            uow.insert_payment(record)?;

            tracing::info!(
                tx = %tx.tx_id,
                payment_intent = %payment_intent,
                listing = %listing_id,
                buyer = %buyer_org_id,
                amount = %amount,
                remaining = %fill.remaining,
                closed = fill.closed,
                "purchase settled"
            );
            Ok(BuyOutcome::Applied(PurchaseReceipt {
                transaction: tx,
                payment_id,
                remaining: fill.remaining,
                listing_closed: fill.closed,
            }))
        })
    }
}

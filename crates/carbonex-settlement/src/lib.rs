//! # carbonex-settlement
//!
//! **Settlement engine**: every operation that changes credit balances,
//! listing inventory or the audit trail.
//!
//! ## Operations
//!
//! Each runs as one atomic unit of work; any failure leaves no trace.
//!
//! | Operation | Balances | Locks | Listing | Records |
//! |---|---|---|---|---|
//! | `sell_credits` | | +amount | create or merge | CREATED / UPDATED |
//! | `edit_listing` | | ±delta | price / quantity | UPDATED |
//! | `cancel_listing` | | −remaining | close | CANCELLED |
//! | `transfer_credits` | sender → receiver | | | `transfer` tx |
//! | `retire_credits` | −amount | | | `retire` tx + certificate |
//! | `buy_via_webhook` | seller → buyer | −amount | reduce / close | fill events, `buy` tx, payment |

pub mod engine;
pub mod listing_ops;
pub mod purchase;
pub mod transfer;

pub use engine::SettlementEngine;
pub use listing_ops::{EditRequest, SellReceipt, SellRequest};
pub use purchase::{BuyOutcome, PurchaseReceipt, PurchaseRequest};
pub use transfer::{RetireRequest, RetirementReceipt, TransferRequest};

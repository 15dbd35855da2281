//! # carbonex-types
//!
//! Shared types, errors, and configuration for the **Carbonex** credit
//! ledger and listing settlement engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`OrgId`], [`ProjectId`], [`ListingId`], [`TransactionId`], [`CertificateId`], [`OrgCode`]
//! - **Holding model**: [`Holding`]
//! - **Listing model**: [`Listing`], [`ListingStatus`], [`ListingMetadata`]
//! - **History**: [`Transaction`], [`RetirementCertificate`], [`ListingEvent`], [`Payment`]
//! - **Directory**: [`Organization`], [`Project`], [`Actor`]
//! - **Arithmetic**: two-decimal fixed-point helpers in [`credits`]
//! - **Configuration**: [`MarketConfig`], [`LedgerConfig`], [`WebhookConfig`]
//! - **Errors**: [`CarbonexError`] with `CX_ERR_` prefix codes and [`ErrorKind`]
//! - **Constants**: system-wide limits and defaults

pub mod actor;
pub mod certificate;
pub mod config;
pub mod constants;
pub mod credits;
pub mod directory;
pub mod error;
pub mod event;
pub mod holding;
pub mod ids;
pub mod listing;
pub mod payment;
pub mod transaction;

// Re-export all primary types at crate root for ergonomic imports:
//   use carbonex_types::{Holding, Listing, Transaction, ...};

pub use actor::*;
pub use certificate::*;
pub use config::*;
pub use directory::*;
pub use error::*;
pub use event::*;
pub use holding::*;
pub use ids::*;
pub use listing::*;
pub use payment::*;
pub use transaction::*;

// Constants and credit arithmetic are accessed via their modules
// (`carbonex_types::constants::FOO`, `carbonex_types::credits::add`).

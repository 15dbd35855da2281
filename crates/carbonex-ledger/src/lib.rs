//! # carbonex-ledger
//!
//! Ledger plane for **Carbonex**: the committed market tables and the
//! transactional unit of work every settlement operation runs in.
//!
//! ## Components
//!
//! - [`MarketStore`]: lock-guarded owner of all state; runs units of work
//! - [`UnitOfWork`]: staged writes over committed state, applied atomically
//! - [`holding_ledger`]: credit, debit, lock, unlock and fulfill on holdings
//! - [`listing_store`]: listing lifecycle with audit events
//! - [`event_log`]: append and query listing events
//! - [`SupplyRegister`]: issued and retired totals per project

pub mod event_log;
pub mod holding_ledger;
pub mod listing_store;
pub mod state;
pub mod store;
pub mod supply_conservation;
pub mod unit_of_work;

pub use listing_store::EditOutcome;
pub use state::MarketState;
pub use store::MarketStore;
pub use supply_conservation::{ProjectSupply, SupplyRegister};
pub use unit_of_work::{ChangeSet, UnitOfWork};

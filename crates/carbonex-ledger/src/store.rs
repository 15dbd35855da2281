//! The shared market store.
//!
//! One [`parking_lot::Mutex`] guards all committed state. A unit of work
//! holds the lock for its whole duration, so units of work are
//! serializable and a reader never observes a half-applied operation.
//!
//! ```text
//!   try_lock_for(lock_timeout) ──▶ run op on UnitOfWork ──┬─ Err ──────────▶ drop changes
//!                                                        ├─ past deadline ─▶ drop changes
//!                                                        └─ Ok ───────────▶ apply changes
//! ```

use std::time::{Duration, Instant};

use carbonex_types::*;
use parking_lot::Mutex;

use crate::state::MarketState;
use crate::unit_of_work::UnitOfWork;

/// Thread-safe owner of the market tables.
#[derive(Debug)]
pub struct MarketStore {
    state: Mutex<MarketState>,
    config: LedgerConfig,
}

impl MarketStore {
    #[must_use]
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            state: Mutex::new(MarketState::new()),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Run `op` as one atomic unit of work.
    ///
    /// The staged writes are applied only if `op` returns `Ok` within the
    /// configured deadline. `name` labels the operation in logs.
    ///
    /// # Errors
    /// `LockTimeout` if the store stays busy past `lock_timeout_ms`,
    /// `UnitOfWorkTimeout` if `op` overruns its deadline, or whatever `op`
    /// returns.
    pub fn transaction<T>(
        &self,
        name: &'static str,
        op: impl FnOnce(&mut UnitOfWork<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self
            .state
            .try_lock_for(Duration::from_millis(self.config.lock_timeout_ms))
            .ok_or_else(|| {
                tracing::warn!(op = name, timeout_ms = self.config.lock_timeout_ms, "ledger lock busy");
                CarbonexError::LockTimeout(self.config.lock_timeout_ms)
            })?;

        let started = Instant::now();
        let (value, changes) = {
            let mut uow = UnitOfWork::new(&guard);
            match op(&mut uow) {
                Ok(value) => (value, uow.into_changes()),
                Err(e) => {
                    tracing::debug!(op = name, error = %e, "unit of work rolled back");
                    return Err(e);
                }
            }
        };

        let elapsed = started.elapsed();
        if elapsed > Duration::from_millis(self.config.unit_of_work_timeout_ms) {
            tracing::warn!(
                op = name,
                elapsed = ?elapsed,
                deadline_ms = self.config.unit_of_work_timeout_ms,
                "unit of work exceeded deadline, rolled back"
            );
            return Err(CarbonexError::UnitOfWorkTimeout(
                self.config.unit_of_work_timeout_ms,
            ));
        }

        guard.apply(changes);
        Ok(value)
    }

    /// Run `f` against committed state.
    ///
    /// # Errors
    /// `LockTimeout` if the store stays busy past `lock_timeout_ms`.
    pub fn read<T>(&self, f: impl FnOnce(&MarketState) -> T) -> Result<T> {
        let guard = self
            .state
            .try_lock_for(Duration::from_millis(self.config.lock_timeout_ms))
            .ok_or(CarbonexError::LockTimeout(self.config.lock_timeout_ms))?;
        Ok(f(&guard))
    }
}

impl Default for MarketStore {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

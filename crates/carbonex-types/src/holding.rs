//! Per-(organization, project) credit holdings.
//!
//! Every holding has a `credit_balance` (credits owned) and the portion of
//! it that is `locked_for_sale` by open listings. Only the difference,
//! `available`, may be listed, transferred or retired.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CarbonexError, OrgId, ProjectId, Result};

/// Credit balance of one organization for one project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Holding {
    pub org_id: OrgId,
    pub project_id: ProjectId,
    /// Credits owned, locked or not.
    pub credit_balance: Decimal,
    /// Credits reserved by open listings.
    pub locked_for_sale: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Holding {
    /// Create an empty holding.
    #[must_use]
    pub fn new(org_id: OrgId, project_id: ProjectId) -> Self {
        let now = Utc::now();
        Self {
            org_id,
            project_id,
            credit_balance: Decimal::ZERO,
            locked_for_sale: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Credits free to list, transfer or retire.
    #[must_use]
    pub fn available(&self) -> Decimal {
        self.credit_balance - self.locked_for_sale
    }

    /// Whether `0 <= locked_for_sale <= credit_balance` holds.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.locked_for_sale >= Decimal::ZERO && self.locked_for_sale <= self.credit_balance
    }

    /// Check the lock invariant.
    ///
    /// # Errors
    /// Returns [`CarbonexError::InvalidLockState`] if the holding is inconsistent.
    pub fn check_invariants(&self) -> Result<()> {
        if self.is_consistent() {
            Ok(())
        } else {
            Err(CarbonexError::InvalidLockState {
                reason: format!(
                    "org {} project {}: locked {} outside [0, {}]",
                    self.org_id, self.project_id, self.locked_for_sale, self.credit_balance
                ),
            })
        }
    }

    /// Key into the holdings table.
    #[must_use]
    pub fn key(&self) -> (OrgId, ProjectId) {
        (self.org_id, self.project_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(balance: i64, locked: i64) -> Holding {
        let mut h = Holding::new(OrgId::new(), ProjectId::new());
        h.credit_balance = Decimal::new(balance, 0);
        h.locked_for_sale = Decimal::new(locked, 0);
        h
    }

    #[test]
    fn new_holding_is_empty() {
        let h = Holding::new(OrgId::new(), ProjectId::new());
        assert_eq!(h.available(), Decimal::ZERO);
        assert!(h.is_consistent());
    }

    #[test]
    fn available_subtracts_lock() {
        let h = holding(100, 40);
        assert_eq!(h.available(), Decimal::new(60, 0));
        assert!(h.check_invariants().is_ok());
    }

    #[test]
    fn over_locked_is_inconsistent() {
        let h = holding(10, 11);
        assert!(!h.is_consistent());
        let err = h.check_invariants().unwrap_err();
        assert!(matches!(err, CarbonexError::InvalidLockState { .. }));
    }

    #[test]
    fn negative_lock_is_inconsistent() {
        let h = holding(10, -1);
        assert!(h.check_invariants().is_err());
    }

    #[test]
    fn holding_serde_roundtrip() {
        let h = holding(100, 25);
        let json = serde_json::to_string(&h).unwrap();
        let back: Holding = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);
    }
}

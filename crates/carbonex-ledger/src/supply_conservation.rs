//! Registry totals behind the conservation check.
//!
//! For every project the credits held by organizations must add up to what
//! the registry has issued minus what has been retired:
//! ```text
//! Σ credit_balance == issued − retired
//! ```
//!
//! Issuance happens when holdings are seeded and when a buyer takes credits
//! from a registry-owned listing. Retirement burns credits for a
//! certificate. Org-to-org purchases and transfers only move credits, so
//! they leave both totals alone.

use std::collections::HashMap;

use carbonex_types::{CarbonexError, ProjectId, Result};
use rust_decimal::Decimal;

/// Issued and retired totals of one project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectSupply {
    pub issued: Decimal,
    pub retired: Decimal,
}

impl ProjectSupply {
    /// Credits that should be sitting in holdings.
    #[must_use]
    pub fn outstanding(&self) -> Decimal {
        self.issued - self.retired
    }

    /// Totals after the registry issues `amount` more.
    ///
    /// # Errors
    /// Returns [`CarbonexError::InvalidAmount`] if the issued total would overflow.
    pub fn issue(self, amount: Decimal) -> Result<Self> {
        let issued = bump(self.issued, amount, "issued")?;
        Ok(Self { issued, ..self })
    }

    /// Totals after `amount` is retired.
    ///
    /// # Errors
    /// Returns [`CarbonexError::InvalidAmount`] if the retired total would overflow.
    pub fn retire(self, amount: Decimal) -> Result<Self> {
        let retired = bump(self.retired, amount, "retired")?;
        Ok(Self { retired, ..self })
    }
}

fn bump(total: Decimal, amount: Decimal, field: &'static str) -> Result<Decimal> {
    total
        .checked_add(amount)
        .ok_or_else(|| CarbonexError::InvalidAmount {
            field,
            reason: format!("{field} total {total} cannot grow by {amount}"),
        })
}

/// Committed [`ProjectSupply`] per project.
#[derive(Debug, Clone, Default)]
pub struct SupplyRegister {
    projects: HashMap<ProjectId, ProjectSupply>,
}

impl SupplyRegister {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Totals for `project`, zero if the registry never touched it.
    #[must_use]
    pub fn project(&self, project: ProjectId) -> ProjectSupply {
        self.projects.get(&project).copied().unwrap_or_default()
    }

    pub(crate) fn set(&mut self, project: ProjectId, supply: ProjectSupply) {
        self.projects.insert(project, supply);
    }

    /// Projects with any issuance or retirement, in no particular order.
    pub fn projects(&self) -> impl Iterator<Item = ProjectId> + '_ {
        self.projects.keys().copied()
    }

    /// Compare the credits found in holdings with the registry totals.
    ///
    /// # Errors
    /// Returns [`CarbonexError::SupplyInvariantViolation`] when they differ.
    pub fn reconcile(&self, project: ProjectId, held: Decimal) -> Result<()> {
        let supply = self.project(project);
        if held == supply.outstanding() {
            return Ok(());
        }
        Err(CarbonexError::SupplyInvariantViolation {
            reason: format!(
                "holdings of project {project} add up to {held}, but the registry issued {} \
                 and retired {}",
                supply.issued, supply.retired,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    #[test]
    fn untouched_project_reconciles_at_zero() {
        let register = SupplyRegister::new();
        let p = ProjectId::new();
        assert_eq!(register.project(p), ProjectSupply::default());
        register.reconcile(p, Decimal::ZERO).unwrap();
        assert_eq!(register.projects().count(), 0);
    }

    #[test]
    fn retirement_shrinks_outstanding() {
        let supply = ProjectSupply::default()
            .issue(dec(1000))
            .unwrap()
            .retire(dec(300))
            .unwrap();
        assert_eq!(supply.outstanding(), dec(700));

        let mut register = SupplyRegister::new();
        let p = ProjectId::new();
        register.set(p, supply);
        register.reconcile(p, dec(700)).unwrap();
    }

    #[test]
    fn mismatch_names_the_totals() {
        let mut register = SupplyRegister::new();
        let p = ProjectId::new();
        register.set(p, ProjectSupply::default().issue(dec(10)).unwrap());
        let err = register.reconcile(p, dec(11)).unwrap_err();
        let CarbonexError::SupplyInvariantViolation { reason } = err else {
            panic!("unexpected error: {err}");
        };
        assert!(reason.contains("add up to 11"));
        assert!(reason.contains("issued 10"));
    }

    #[test]
    fn totals_refuse_to_overflow() {
        let full = ProjectSupply::default().issue(Decimal::MAX).unwrap();
        let err = full.issue(Decimal::ONE).unwrap_err();
        assert!(matches!(err, CarbonexError::InvalidAmount { field: "issued", .. }));

        let burnt = ProjectSupply::default().retire(Decimal::MAX).unwrap();
        let err = burnt.retire(Decimal::ONE).unwrap_err();
        assert!(matches!(err, CarbonexError::InvalidAmount { field: "retired", .. }));
    }

    #[test]
    fn projects_kept_apart() {
        let mut register = SupplyRegister::new();
        let (a, b) = (ProjectId::new(), ProjectId::new());
        register.set(a, ProjectSupply::default().issue(dec(5)).unwrap());
        register.set(b, ProjectSupply::default().retire(Decimal::ONE).unwrap());
        assert_eq!(register.project(a).outstanding(), dec(5));
        assert_eq!(register.project(b).outstanding(), Decimal::NEGATIVE_ONE);
        assert_eq!(register.projects().count(), 2);
    }
}

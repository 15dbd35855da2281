//! Retirement certificates.
//!
//! A certificate is issued 1:1 with a `retire` transaction and is the
//! proof that the underlying credits were burned.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{CertificateId, OrgId, ProjectId, TransactionId};

/// Certificate status. Every certificate starts `Issued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    Issued,
}

/// Proof of an irreversible credit burn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetirementCertificate {
    pub certificate_id: CertificateId,
    pub org_id: OrgId,
    pub project_id: ProjectId,
    pub amount: Decimal,
    pub retired_at: DateTime<Utc>,
    pub purpose: Option<String>,
    pub beneficiary: Option<String>,
    /// The `retire` transaction that decremented the credits.
    pub transaction_id: TransactionId,
    /// Unique, human-readable number (`CERT-<unix_ms>-<8 hex>`).
    pub certificate_number: String,
    pub status: CertificateStatus,
}

impl RetirementCertificate {
    /// Issue a certificate backed by `transaction_id`.
    #[must_use]
    pub fn issue(
        org_id: OrgId,
        project_id: ProjectId,
        amount: Decimal,
        transaction_id: TransactionId,
        purpose: Option<String>,
        beneficiary: Option<String>,
    ) -> Self {
        let retired_at = Utc::now();
        Self {
            certificate_id: CertificateId::new(),
            org_id,
            project_id,
            amount,
            retired_at,
            purpose,
            beneficiary,
            transaction_id,
            certificate_number: certificate_number(retired_at, transaction_id),
            status: CertificateStatus::Issued,
        }
    }
}

/// Derive a certificate number.
///
/// Format: `CERT-<unix_ms>-<first 8 hex of SHA-256("carbonex:cert:v1:" || tx_id)>`.
/// The suffix makes numbers distinct even when two retirements land in
/// the same millisecond, since transaction ids are unique.
#[must_use]
pub fn certificate_number(retired_at: DateTime<Utc>, transaction_id: TransactionId) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"carbonex:cert:v1:");
    hasher.update(transaction_id.0.as_bytes());
    let digest = hasher.finalize();
    format!(
        "CERT-{}-{}",
        retired_at.timestamp_millis(),
        hex::encode(&digest[..4]).to_uppercase()
    )
}

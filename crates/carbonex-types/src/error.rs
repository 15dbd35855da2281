//! Error types for the Carbonex settlement engine.
//!
//! All errors use the `CX_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by taxonomy class:
//! - 1xx: Validation (malformed input)
//! - 2xx: Not found
//! - 3xx: Authorization (wrong seller, registry listing, self-transfer)
//! - 4xx: Insufficient funds (balance, lock or inventory shortfall)
//! - 5xx: Conflict (no-op edits, closed listings, uniqueness)
//! - 6xx: Settlement
//! - 7xx: Webhook signature / payload
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{ListingId, ListingStatus, OrgCode, OrgId, ProjectId};

/// Taxonomy class of a [`CarbonexError`].
///
/// Callers map these onto transport status codes; the engine itself only
/// guarantees that any error aborts the whole unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Authorization,
    InsufficientFunds,
    Conflict,
    DuplicateSettlement,
    Signature,
    Internal,
}

/// Central error enum for all Carbonex operations.
#[derive(Debug, Error)]
pub enum CarbonexError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// An amount was zero, negative or otherwise unusable.
    #[error("CX_ERR_100: Invalid amount for {field}: {reason}")]
    InvalidAmount { field: &'static str, reason: String },

    /// A price was zero or negative.
    #[error("CX_ERR_101: Invalid price: {0}")]
    InvalidPrice(Decimal),

    /// An identifier failed to parse.
    #[error("CX_ERR_102: Invalid identifier for {field}: {value:?}")]
    InvalidIdentifier { field: &'static str, value: String },

    /// A required field was missing or empty.
    #[error("CX_ERR_103: Missing required field: {0}")]
    MissingField(&'static str),

    // =================================================================
    // Not Found Errors (2xx)
    // =================================================================
    /// No organization with this ID.
    #[error("CX_ERR_200: Organization not found: {0}")]
    OrgNotFound(OrgId),

    /// No organization with this public code.
    #[error("CX_ERR_201: Target organization not found: {0}")]
    OrgCodeNotFound(OrgCode),

    /// No project with this ID.
    #[error("CX_ERR_202: Project not found: {0}")]
    ProjectNotFound(ProjectId),

    /// No listing with this ID.
    #[error("CX_ERR_203: Listing not found: {0}")]
    ListingNotFound(ListingId),

    /// The organization holds nothing for this project.
    #[error("CX_ERR_204: No holdings found for org {org} in project {project}")]
    HoldingNotFound { org: OrgId, project: ProjectId },

    /// No retirement certificate with this ID.
    #[error("CX_ERR_205: Retirement certificate not found: {0}")]
    CertificateNotFound(crate::CertificateId),

    // =================================================================
    // Authorization Errors (3xx)
    // =================================================================
    /// The acting organization does not own the listing.
    #[error("CX_ERR_300: Unauthorized: org {actor} does not own listing {listing}")]
    NotListingOwner { listing: ListingId, actor: OrgId },

    /// Registry-owned listings are never edited or cancelled by an org.
    #[error("CX_ERR_301: Registry listing {0} cannot be modified by an organization")]
    RegistryListingImmutable(ListingId),

    /// Sender and recipient are the same organization.
    #[error("CX_ERR_302: Cannot transfer to the same organization")]
    SelfTransfer,

    /// The actor is not attached to the organization it claims to act for.
    #[error("CX_ERR_303: Actor has no organization")]
    ActorWithoutOrg,

    // =================================================================
    // Insufficient Funds Errors (4xx)
    // =================================================================
    /// Available (unlocked) credits do not cover the request.
    #[error("CX_ERR_400: Insufficient credits: need {needed}, available {available}")]
    InsufficientCredits { needed: Decimal, available: Decimal },

    /// The listing has fewer credits than requested.
    #[error("CX_ERR_401: Insufficient inventory on listing: requested {requested}, listed {listed}")]
    InsufficientInventory { requested: Decimal, listed: Decimal },

    /// The seller's lock is smaller than a fill. Indicates ledger corruption.
    #[error("CX_ERR_402: Seller does not have enough locked credits: need {needed}, locked {locked}")]
    InsufficientLockedCredits { needed: Decimal, locked: Decimal },

    /// A lock adjustment would leave `locked_for_sale` out of `[0, credit_balance]`.
    #[error("CX_ERR_403: Invalid lock state: {reason}")]
    InvalidLockState { reason: String },

    // =================================================================
    // Conflict Errors (5xx)
    // =================================================================
    /// The listing is not open.
    #[error("CX_ERR_500: Listing {listing} is not open (status: {status})")]
    ListingNotOpen { listing: ListingId, status: ListingStatus },

    /// An edit carried no effective change.
    #[error("CX_ERR_501: No valid changes provided")]
    NoValidChanges,

    /// A write would violate a uniqueness constraint.
    #[error("CX_ERR_502: Duplicate {what}: {value}")]
    DuplicateRecord { what: &'static str, value: String },

    // =================================================================
    // Settlement Errors (6xx)
    // =================================================================
    /// This payment reference was already settled.
    #[error("CX_ERR_600: Payment already settled: {0}")]
    DuplicateSettlement(String),

    /// Post-commit invariant check failed. Critical.
    #[error("CX_ERR_601: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // Webhook Errors (7xx)
    // =================================================================
    /// The request body was empty.
    #[error("CX_ERR_700: Webhook Error: empty body")]
    EmptyBody,

    /// Signature header or signing secret missing.
    #[error("CX_ERR_701: Webhook Error: missing signature or secret")]
    MissingSignature,

    /// Signature header did not contain a timestamp and at least one `v1`.
    #[error("CX_ERR_702: Webhook Error: invalid signature format")]
    MalformedSignatureHeader,

    /// No provided signature matched the expected HMAC.
    #[error("CX_ERR_703: Webhook Error: signature mismatch")]
    SignatureMismatch,

    /// Timestamp outside the replay window.
    #[error("CX_ERR_704: Webhook Error: timestamp outside tolerance ({skew_secs}s skew)")]
    TimestampOutsideTolerance { skew_secs: i64 },

    /// The event envelope was not valid JSON.
    #[error("CX_ERR_705: Webhook Error: malformed payload: {0}")]
    MalformedPayload(String),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("CX_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("CX_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (missing secret, malformed value).
    #[error("CX_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// Could not acquire the store within the configured bound.
    #[error("CX_ERR_903: Timed out waiting for ledger lock after {0}ms")]
    LockTimeout(u64),

    /// A unit of work ran past its deadline and was rolled back.
    #[error("CX_ERR_904: Unit of work exceeded {0}ms and was rolled back")]
    UnitOfWorkTimeout(u64),
}

impl CarbonexError {
    /// The taxonomy class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount { .. }
            | Self::InvalidPrice(_)
            | Self::InvalidIdentifier { .. }
            | Self::MissingField(_) => ErrorKind::Validation,
            Self::OrgNotFound(_)
            | Self::OrgCodeNotFound(_)
            | Self::ProjectNotFound(_)
            | Self::ListingNotFound(_)
            | Self::HoldingNotFound { .. }
            | Self::CertificateNotFound(_) => ErrorKind::NotFound,
            Self::NotListingOwner { .. }
            | Self::RegistryListingImmutable(_)
            | Self::SelfTransfer
            | Self::ActorWithoutOrg => ErrorKind::Authorization,
            Self::InsufficientCredits { .. }
            | Self::InsufficientInventory { .. }
            | Self::InsufficientLockedCredits { .. }
            | Self::InvalidLockState { .. } => ErrorKind::InsufficientFunds,
            Self::ListingNotOpen { .. } | Self::NoValidChanges | Self::DuplicateRecord { .. } => {
                ErrorKind::Conflict
            }
            Self::DuplicateSettlement(_) => ErrorKind::DuplicateSettlement,
            Self::EmptyBody
            | Self::MissingSignature
            | Self::MalformedSignatureHeader
            | Self::SignatureMismatch
            | Self::TimestampOutsideTolerance { .. }
            | Self::MalformedPayload(_) => ErrorKind::Signature,
            Self::SupplyInvariantViolation { .. }
            | Self::Internal(_)
            | Self::Serialization(_)
            | Self::Configuration(_)
            | Self::LockTimeout(_)
            | Self::UnitOfWorkTimeout(_) => ErrorKind::Internal,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, CarbonexError>;

impl From<serde_json::Error> for CarbonexError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = CarbonexError::ListingNotFound(ListingId::new());
        let msg = format!("{err}");
        assert!(msg.starts_with("CX_ERR_203"), "Got: {msg}");
    }

    #[test]
    fn insufficient_credits_display() {
        let err = CarbonexError::InsufficientCredits {
            needed: Decimal::new(1000, 0),
            available: Decimal::new(60, 0),
        };
        let msg = format!("{err}");
        assert!(msg.contains("CX_ERR_400"));
        assert!(msg.contains("1000"));
        assert!(msg.contains("60"));
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    }

    #[test]
    fn listing_not_open_mentions_status() {
        let err = CarbonexError::ListingNotOpen {
            listing: ListingId::new(),
            status: ListingStatus::Closed,
        };
        assert!(format!("{err}").contains("closed"));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn taxonomy_classes() {
        assert_eq!(CarbonexError::SelfTransfer.kind(), ErrorKind::Authorization);
        assert_eq!(CarbonexError::NoValidChanges.kind(), ErrorKind::Conflict);
        assert_eq!(CarbonexError::SignatureMismatch.kind(), ErrorKind::Signature);
        assert_eq!(
            CarbonexError::DuplicateSettlement("pi_1".into()).kind(),
            ErrorKind::DuplicateSettlement
        );
        assert_eq!(
            CarbonexError::MissingField("project_id").kind(),
            ErrorKind::Validation
        );
        assert_eq!(CarbonexError::LockTimeout(10).kind(), ErrorKind::Internal);
    }

    #[test]
    fn all_errors_have_cx_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(CarbonexError::NoValidChanges),
            Box::new(CarbonexError::EmptyBody),
            Box::new(CarbonexError::SelfTransfer),
            Box::new(CarbonexError::Internal("test".into())),
            Box::new(CarbonexError::UnitOfWorkTimeout(5)),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("CX_ERR_"),
                "Error missing CX_ERR_ prefix: {msg}"
            );
        }
    }
}

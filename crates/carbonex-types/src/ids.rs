//! Globally unique identifiers used throughout Carbonex.
//!
//! Entity IDs minted by the engine use UUIDv7 for time-ordered sorting.
//! IDs that arrive from callers (orgs, projects) are parsed from their
//! canonical string form; a malformed string is a validation error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CarbonexError;

/// Declares a UUID-backed identifier newtype with the shared impls.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            #[must_use]
            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }

            /// Parse the canonical hyphenated form.
            ///
            /// # Errors
            /// Returns [`CarbonexError::InvalidIdentifier`] if `s` is not a UUID.
            pub fn parse(s: &str) -> crate::Result<Self> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| CarbonexError::InvalidIdentifier {
                        field: $label,
                        value: s.to_string(),
                    })
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = CarbonexError;

            fn from_str(s: &str) -> crate::Result<Self> {
                Self::parse(s)
            }
        }
    };
}

uuid_id!(
    /// Identifier of an organization (the credit-holding account).
    OrgId,
    "org_id"
);

uuid_id!(
    /// Identifier of a registry project that issues credits.
    ProjectId,
    "project_id"
);

uuid_id!(
    /// Identifier of a sale listing.
    ListingId,
    "listing_id"
);

uuid_id!(
    /// Identifier of a ledger transaction record.
    TransactionId,
    "tx_id"
);

uuid_id!(
    /// Identifier of a retirement certificate.
    CertificateId,
    "certificate_id"
);

uuid_id!(
    /// Identifier of a listing audit event.
    EventId,
    "event_id"
);

uuid_id!(
    /// Identifier of a stored payment record.
    PaymentId,
    "payment_id"
);

uuid_id!(
    /// Identifier of an authenticated user.
    UserId,
    "user_id"
);

// ---------------------------------------------------------------------------
// OrgCode
// ---------------------------------------------------------------------------

/// Short public code of an organization (e.g. `BBB-123456`).
///
/// Transfers address the recipient by code rather than by UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgCode(pub String);

impl OrgCode {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrgCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

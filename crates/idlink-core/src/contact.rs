//! The contact record: the sole persisted entity of the identity store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonically assigned contact identifier. Sortable by creation order.
pub type ContactId = i64;

/// Whether a contact is the canonical representative of its group or a
/// record merged into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPrecedence {
    Primary,
    Secondary,
}

impl LinkPrecedence {
    /// Parses the stored text form. Returns `None` for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "primary" => Some(Self::Primary),
            "secondary" => Some(Self::Secondary),
            _ => None,
        }
    }

    /// The text form persisted in the store.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

impl fmt::Display for LinkPrecedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted contact row.
///
/// Invariants (enforced by the reconciler and, where expressible, by the
/// store schema):
/// - a `Primary` contact has `linked_id = None`;
/// - a `Secondary` contact has `linked_id = Some(id)` pointing at a `Primary`
///   (the hierarchy is flat, never deeper than two levels);
/// - at least one of `email` / `phone_number` is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub linked_id: Option<ContactId>,
    pub link_precedence: LinkPrecedence,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker. Deleted contacts are excluded from all queries
    /// and matching.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Contact {
    /// Returns `true` if this contact is the canonical representative of
    /// its group.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.link_precedence == LinkPrecedence::Primary
    }

    /// The id of this contact's group primary: itself when primary,
    /// otherwise the contact it links to.
    #[must_use]
    pub fn primary_id(&self) -> ContactId {
        self.linked_id.unwrap_or(self.id)
    }

    /// Returns `true` if this row carries exactly the given (email, phone)
    /// pair. Used for the exact-duplicate idempotence guard.
    #[must_use]
    pub fn matches_pair(&self, email: &str, phone: &str) -> bool {
        self.email.as_deref() == Some(email) && self.phone_number.as_deref() == Some(phone)
    }
}

/// Payload for creating a contact row. Ids and timestamps are assigned by
/// the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub linked_id: Option<ContactId>,
    pub link_precedence: LinkPrecedence,
}

impl NewContact {
    /// A fresh primary carrying the given identifying fields.
    #[must_use]
    pub fn primary(email: Option<&str>, phone_number: Option<&str>) -> Self {
        Self {
            email: email.map(str::to_owned),
            phone_number: phone_number.map(str::to_owned),
            linked_id: None,
            link_precedence: LinkPrecedence::Primary,
        }
    }

    /// A secondary attached to the given primary.
    #[must_use]
    pub fn secondary(email: Option<&str>, phone_number: Option<&str>, primary: ContactId) -> Self {
        Self {
            email: email.map(str::to_owned),
            phone_number: phone_number.map(str::to_owned),
            linked_id: Some(primary),
            link_precedence: LinkPrecedence::Secondary,
        }
    }
}

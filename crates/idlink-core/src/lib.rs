pub mod contact;
pub mod identity;
pub mod normalize;

pub use contact::{Contact, ContactId, LinkPrecedence, NewContact};
pub use identity::{ConsolidatedIdentity, CONTACT_ENVELOPE_KEY};
pub use normalize::{coerce_phone, validate_email, NormalizeError};

//! The consolidated identity view returned by the reconciler.
//!
//! Field names on the wire are compatibility-sensitive and case-sensitive,
//! including the historical `primaryContatctId` misspelling. Do not rename.

use serde::{Deserialize, Serialize};

use crate::contact::ContactId;

/// Key under which the consolidated view is nested in the HTTP response body.
pub const CONTACT_ENVELOPE_KEY: &str = "contact";

/// Deduplicated view of all emails, phones, and secondary ids belonging to
/// one group. The primary's own email/phone (when present) is always the
/// first entry of its list; the remaining entries follow in ascending
/// creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidatedIdentity {
    #[serde(rename = "primaryContatctId")]
    pub primary_contact_id: ContactId,
    pub emails: Vec<String>,
    #[serde(rename = "phoneNumbers")]
    pub phone_numbers: Vec<String>,
    /// Always present, empty when the group has no secondaries.
    #[serde(rename = "secondaryContactIds")]
    pub secondary_contact_ids: Vec<ContactId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_field_names_are_locked() {
        let identity = ConsolidatedIdentity {
            primary_contact_id: 1,
            emails: vec!["lorraine@hillvalley.edu".into()],
            phone_numbers: vec!["123456".into()],
            secondary_contact_ids: vec![],
        };

        let value = serde_json::to_value(&identity).unwrap();
        assert_eq!(value["primaryContatctId"], 1);
        assert_eq!(value["emails"][0], "lorraine@hillvalley.edu");
        assert_eq!(value["phoneNumbers"][0], "123456");
        // Empty list is serialized, never dropped.
        assert!(value["secondaryContactIds"].as_array().unwrap().is_empty());
    }

    #[test]
    fn deserializes_from_wire_shape() {
        let identity: ConsolidatedIdentity = serde_json::from_str(
            r#"{
                "primaryContatctId": 11,
                "emails": ["george@hillvalley.edu", "biffsucks@hillvalley.edu"],
                "phoneNumbers": ["919191", "717171"],
                "secondaryContactIds": [27]
            }"#,
        )
        .unwrap();

        assert_eq!(identity.primary_contact_id, 11);
        assert_eq!(identity.secondary_contact_ids, vec![27]);
    }
}

//! The reconciliation algorithm.
//!
//! One `resolve` call is a short-lived unit of work against the shared
//! contact store; no state is held between invocations. The merge step
//! (demoting losing primaries and re-pointing their secondaries) runs inside
//! a single store transaction, with a row lock on the surviving primary for
//! the merge-and-create phase.

use std::sync::Arc;

use tracing::{debug, instrument};

use idlink_core::{ConsolidatedIdentity, Contact, ContactId, NewContact};
use idlink_storage::{ContactStore, ContactTx, StorageError};

use crate::error::ReconcileError;

/// Resolves (email, phone) pairs into consolidated identity groups.
///
/// The store is a constructed dependency so tests can substitute an isolated
/// backend.
pub struct Reconciler {
    store: Arc<dyn ContactStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self { store }
    }

    /// Resolves the given pair into its consolidated group, creating or
    /// merging contacts as needed.
    ///
    /// # Errors
    ///
    /// `ReconcileError::InvalidInput` when both arguments are absent;
    /// `ReconcileError::Storage` for any store failure.
    #[instrument(skip_all, fields(backend = self.store.backend_name()))]
    pub async fn resolve(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<ConsolidatedIdentity, ReconcileError> {
        if email.is_none() && phone.is_none() {
            return Err(ReconcileError::InvalidInput);
        }

        let matches = self.store.find_by_email_or_phone(email, phone).await?;

        if matches.is_empty() {
            let created = self.store.create(&NewContact::primary(email, phone)).await?;
            debug!(contact_id = created.id, "no match, created fresh primary");
            return assemble(std::slice::from_ref(&created));
        }

        // Every matched contact resolves to its group's primary: itself if
        // already primary, otherwise the contact it links to.
        let mut primary_ids: Vec<ContactId> = Vec::new();
        for contact in &matches {
            let pid = contact.primary_id();
            if !primary_ids.contains(&pid) {
                primary_ids.push(pid);
            }
        }

        let primaries = self.store.find_by_ids(&primary_ids).await?;
        let true_primary = primaries.first().cloned().ok_or_else(|| {
            StorageError::internal("matched contacts reference no live primary")
        })?;

        if primaries.len() > 1 {
            // Oldest primary wins; the rest are absorbed into its group.
            self.merge_groups(&true_primary, &primaries[1..], email, phone)
                .await?;
        } else if let (Some(email), Some(phone)) = (email, phone) {
            self.attach_if_new(&true_primary, email, phone).await?;
        }

        let members = self.store.group_members(true_primary.id).await?;
        assemble(&members)
    }

    /// Demotes every losing primary into `true_primary`'s group and
    /// re-points their former secondaries, then runs the new-information
    /// check inside the same transaction. All-or-nothing: any failure rolls
    /// the whole merge back (the transaction auto-rolls-back on drop).
    async fn merge_groups(
        &self,
        true_primary: &Contact,
        demoted: &[Contact],
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<(), ReconcileError> {
        let mut tx = self.store.begin().await?;
        tx.lock_contact(true_primary.id).await?;

        for loser in demoted {
            tx.demote_to_secondary(loser.id, true_primary.id).await?;
            let relinked = tx.relink_secondaries(loser.id, true_primary.id).await?;
            debug!(
                demoted = loser.id,
                into = true_primary.id,
                relinked,
                "merged primary into older group"
            );
        }

        if let (Some(email), Some(phone)) = (email, phone) {
            let members = tx.group_members(true_primary.id).await?;
            if let Some(new) = new_secondary_needed(&members, email, phone, true_primary.id) {
                let created = tx.create(&new).await?;
                debug!(contact_id = created.id, "attached new secondary during merge");
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Step 6 outside a merge: creates a secondary when the supplied pair
    /// carries information the group does not yet have.
    async fn attach_if_new(
        &self,
        primary: &Contact,
        email: &str,
        phone: &str,
    ) -> Result<(), ReconcileError> {
        let members = self.store.group_members(primary.id).await?;
        if let Some(new) = new_secondary_needed(&members, email, phone, primary.id) {
            let created = self.store.create(&new).await?;
            debug!(
                contact_id = created.id,
                primary = primary.id,
                "attached new secondary"
            );
        }
        Ok(())
    }
}

/// Decides whether the supplied pair warrants a new secondary row.
///
/// Two conditions, both required: the exact (email, phone) row must be
/// absent from the group (the idempotence guard), and at least one of the
/// two values must be unknown to the group (the creation trigger). Kept as
/// two separate checks deliberately; collapsing them changes behavior for
/// rows with a null field.
fn new_secondary_needed(
    members: &[Contact],
    email: &str,
    phone: &str,
    primary_id: ContactId,
) -> Option<NewContact> {
    let exact_pair_exists = members.iter().any(|c| c.matches_pair(email, phone));
    let email_known = members.iter().any(|c| c.email.as_deref() == Some(email));
    let phone_known = members.iter().any(|c| c.phone_number.as_deref() == Some(phone));

    if !exact_pair_exists && (!email_known || !phone_known) {
        Some(NewContact::secondary(Some(email), Some(phone), primary_id))
    } else {
        None
    }
}

/// Builds the consolidated view from a group's members (creation order).
///
/// The primary's own email/phone lead their lists; secondaries' values
/// follow in creation order, values already present are skipped.
fn assemble(members: &[Contact]) -> Result<ConsolidatedIdentity, ReconcileError> {
    let primary = members
        .iter()
        .find(|c| c.is_primary())
        .or_else(|| members.first())
        .ok_or_else(|| StorageError::internal("group vanished during resolve"))?;

    let mut emails: Vec<String> = Vec::new();
    let mut phone_numbers: Vec<String> = Vec::new();
    let mut secondary_contact_ids: Vec<ContactId> = Vec::new();

    if let Some(email) = &primary.email {
        emails.push(email.clone());
    }
    if let Some(phone) = &primary.phone_number {
        phone_numbers.push(phone.clone());
    }

    for contact in members {
        if let Some(email) = &contact.email
            && !emails.contains(email)
        {
            emails.push(email.clone());
        }
        if let Some(phone) = &contact.phone_number
            && !phone_numbers.contains(phone)
        {
            phone_numbers.push(phone.clone());
        }
        if contact.id != primary.id {
            secondary_contact_ids.push(contact.id);
        }
    }

    Ok(ConsolidatedIdentity {
        primary_contact_id: primary.id,
        emails,
        phone_numbers,
        secondary_contact_ids,
    })
}

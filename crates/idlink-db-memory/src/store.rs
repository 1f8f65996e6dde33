use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use idlink_core::{Contact, ContactId, NewContact};
use idlink_storage::{ContactStore, ContactTx, StorageError};

type Table = Vec<Contact>;

/// In-memory contact store.
///
/// Cheap to clone; clones share the same table.
#[derive(Debug, Clone)]
pub struct MemoryContactStore {
    table: Arc<RwLock<Table>>,
    next_id: Arc<AtomicI64>,
}

impl MemoryContactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Number of rows currently in the table, soft-deleted included.
    /// Test helper.
    pub async fn row_count(&self) -> usize {
        self.table.read().await.len()
    }

    /// Soft-deletes a contact. Test helper; the reconciliation flow itself
    /// never deletes.
    pub async fn soft_delete(&self, id: ContactId) -> Result<(), StorageError> {
        let mut table = self.table.write().await;
        let row = table
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StorageError::not_found(id))?;
        row.deleted_at = Some(Utc::now());
        row.updated_at = Utc::now();
        Ok(())
    }
}

impl Default for MemoryContactStore {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_by_creation(rows: &mut [Contact]) {
    rows.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
}

fn insert_row(table: &mut Table, next_id: &AtomicI64, new: &NewContact) -> Result<Contact, StorageError> {
    if new.email.is_none() && new.phone_number.is_none() {
        return Err(StorageError::invalid_contact(
            "contact requires at least one of email or phone number",
        ));
    }

    let now = Utc::now();
    let contact = Contact {
        id: next_id.fetch_add(1, Ordering::SeqCst),
        email: new.email.clone(),
        phone_number: new.phone_number.clone(),
        linked_id: new.linked_id,
        link_precedence: new.link_precedence,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };
    table.push(contact.clone());
    Ok(contact)
}

fn collect_group(table: &Table, primary_id: ContactId) -> Vec<Contact> {
    let mut rows: Vec<Contact> = table
        .iter()
        .filter(|c| c.deleted_at.is_none() && (c.id == primary_id || c.linked_id == Some(primary_id)))
        .cloned()
        .collect();
    sort_by_creation(&mut rows);
    rows
}

#[async_trait]
impl ContactStore for MemoryContactStore {
    async fn find_by_email_or_phone(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Vec<Contact>, StorageError> {
        if email.is_none() && phone.is_none() {
            return Err(StorageError::invalid_contact(
                "lookup requires at least one of email or phone number",
            ));
        }

        let table = self.table.read().await;
        let mut rows: Vec<Contact> = table
            .iter()
            .filter(|c| c.deleted_at.is_none())
            .filter(|c| {
                let email_hit = matches!(email, Some(e) if c.email.as_deref() == Some(e));
                let phone_hit = matches!(phone, Some(p) if c.phone_number.as_deref() == Some(p));
                email_hit || phone_hit
            })
            .cloned()
            .collect();
        sort_by_creation(&mut rows);
        Ok(rows)
    }

    async fn find_by_ids(&self, ids: &[ContactId]) -> Result<Vec<Contact>, StorageError> {
        let table = self.table.read().await;
        let mut rows: Vec<Contact> = table
            .iter()
            .filter(|c| c.deleted_at.is_none() && ids.contains(&c.id))
            .cloned()
            .collect();
        sort_by_creation(&mut rows);
        Ok(rows)
    }

    async fn group_members(&self, primary_id: ContactId) -> Result<Vec<Contact>, StorageError> {
        let table = self.table.read().await;
        Ok(collect_group(&table, primary_id))
    }

    async fn create(&self, new: &NewContact) -> Result<Contact, StorageError> {
        let mut table = self.table.write().await;
        insert_row(&mut table, &self.next_id, new)
    }

    async fn begin(&self) -> Result<Box<dyn ContactTx>, StorageError> {
        let guard = self.table.clone().write_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemoryTx {
            guard: Some(guard),
            snapshot,
            next_id: self.next_id.clone(),
        }))
    }

    fn supports_transactions(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// In-memory transaction.
///
/// Holds the table's write lock until commit or rollback, which also stands
/// in for row-level locking: no other resolve can touch the table while a
/// merge is in flight.
pub struct MemoryTx {
    guard: Option<OwnedRwLockWriteGuard<Table>>,
    snapshot: Table,
    next_id: Arc<AtomicI64>,
}

impl MemoryTx {
    fn table(&mut self) -> Result<&mut Table, StorageError> {
        self.guard
            .as_deref_mut()
            .ok_or_else(|| StorageError::transaction_error("transaction already completed"))
    }
}

#[async_trait]
impl ContactTx for MemoryTx {
    async fn commit(mut self: Box<Self>) -> Result<(), StorageError> {
        self.guard
            .take()
            .ok_or_else(|| StorageError::transaction_error("transaction already completed"))?;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), StorageError> {
        let mut guard = self
            .guard
            .take()
            .ok_or_else(|| StorageError::transaction_error("transaction already completed"))?;
        *guard = std::mem::take(&mut self.snapshot);
        Ok(())
    }

    async fn lock_contact(&mut self, id: ContactId) -> Result<(), StorageError> {
        // The write guard already excludes every other transaction; just
        // check the row exists.
        let table = self.table()?;
        if table.iter().any(|c| c.id == id && c.deleted_at.is_none()) {
            Ok(())
        } else {
            Err(StorageError::not_found(id))
        }
    }

    async fn demote_to_secondary(
        &mut self,
        id: ContactId,
        new_primary: ContactId,
    ) -> Result<(), StorageError> {
        let table = self.table()?;
        let row = table
            .iter_mut()
            .find(|c| c.id == id && c.deleted_at.is_none())
            .ok_or(StorageError::not_found(id))?;
        row.link_precedence = idlink_core::LinkPrecedence::Secondary;
        row.linked_id = Some(new_primary);
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn relink_secondaries(
        &mut self,
        from_primary: ContactId,
        to_primary: ContactId,
    ) -> Result<u64, StorageError> {
        let table = self.table()?;
        let mut updated = 0;
        for row in table
            .iter_mut()
            .filter(|c| c.linked_id == Some(from_primary))
        {
            row.linked_id = Some(to_primary);
            row.updated_at = Utc::now();
            updated += 1;
        }
        Ok(updated)
    }

    async fn create(&mut self, new: &NewContact) -> Result<Contact, StorageError> {
        let next_id = self.next_id.clone();
        let table = self.table()?;
        insert_row(table, &next_id, new)
    }

    async fn group_members(&mut self, primary_id: ContactId) -> Result<Vec<Contact>, StorageError> {
        let table = self.table()?;
        Ok(collect_group(table, primary_id))
    }
}

impl Drop for MemoryTx {
    /// Restores the snapshot if the transaction was neither committed nor
    /// rolled back.
    fn drop(&mut self) {
        if let Some(mut guard) = self.guard.take() {
            *guard = std::mem::take(&mut self.snapshot);
        }
    }
}

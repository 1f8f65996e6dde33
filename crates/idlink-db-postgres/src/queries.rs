//! SQL queries for the contact table.
//!
//! All functions are generic over the executor so the same query text
//! serves both pooled reads and transaction-scoped operations.

use chrono::{DateTime, Utc};
use sqlx_core::executor::Executor;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::Postgres;

use idlink_core::{Contact, ContactId, LinkPrecedence, NewContact};
use idlink_storage::StorageError;

/// Column list shared by every contact read.
const CONTACT_COLUMNS: &str =
    "id, email, phone_number, linked_id, link_precedence, created_at, updated_at, deleted_at";

/// Raw tuple row for the contact table.
type ContactRow = (
    i64,
    Option<String>,
    Option<String>,
    Option<i64>,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

fn row_to_contact(row: ContactRow) -> Result<Contact, StorageError> {
    let (id, email, phone_number, linked_id, precedence, created_at, updated_at, deleted_at) = row;
    let link_precedence = LinkPrecedence::parse(&precedence).ok_or_else(|| {
        StorageError::internal(format!(
            "unknown link_precedence '{precedence}' for contact {id}"
        ))
    })?;
    Ok(Contact {
        id,
        email,
        phone_number,
        linked_id,
        link_precedence,
        created_at,
        updated_at,
        deleted_at,
    })
}

fn rows_to_contacts(rows: Vec<ContactRow>) -> Result<Vec<Contact>, StorageError> {
    rows.into_iter().map(row_to_contact).collect()
}

/// Finds all live contacts matching the supplied fields with OR semantics.
/// A condition participates only when its argument is non-null.
pub async fn find_by_email_or_phone<'e, E>(
    executor: E,
    email: Option<&str>,
    phone: Option<&str>,
) -> Result<Vec<Contact>, StorageError>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        r#"SELECT {CONTACT_COLUMNS}
           FROM contact
           WHERE deleted_at IS NULL
             AND (($1::text IS NOT NULL AND email = $1)
               OR ($2::text IS NOT NULL AND phone_number = $2))
           ORDER BY created_at ASC, id ASC"#
    );

    let rows: Vec<ContactRow> = query_as(&sql)
        .bind(email.map(str::to_owned))
        .bind(phone.map(str::to_owned))
        .fetch_all(executor)
        .await
        .map_err(|e| StorageError::internal(format!("Failed to match contacts: {e}")))?;

    rows_to_contacts(rows)
}

/// Fetches live contacts by id, in creation order.
pub async fn find_by_ids<'e, E>(
    executor: E,
    ids: &[ContactId],
) -> Result<Vec<Contact>, StorageError>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        r#"SELECT {CONTACT_COLUMNS}
           FROM contact
           WHERE deleted_at IS NULL AND id = ANY($1)
           ORDER BY created_at ASC, id ASC"#
    );

    let rows: Vec<ContactRow> = query_as(&sql)
        .bind(ids.to_vec())
        .fetch_all(executor)
        .await
        .map_err(|e| StorageError::internal(format!("Failed to fetch contacts by id: {e}")))?;

    rows_to_contacts(rows)
}

/// Fetches a full group: the primary plus every contact linking to it.
pub async fn group_members<'e, E>(
    executor: E,
    primary_id: ContactId,
) -> Result<Vec<Contact>, StorageError>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        r#"SELECT {CONTACT_COLUMNS}
           FROM contact
           WHERE deleted_at IS NULL AND (id = $1 OR linked_id = $1)
           ORDER BY created_at ASC, id ASC"#
    );

    let rows: Vec<ContactRow> = query_as(&sql)
        .bind(primary_id)
        .fetch_all(executor)
        .await
        .map_err(|e| StorageError::internal(format!("Failed to fetch group members: {e}")))?;

    rows_to_contacts(rows)
}

/// Inserts a contact row. Id and timestamps are assigned by the database.
pub async fn insert<'e, E>(executor: E, new: &NewContact) -> Result<Contact, StorageError>
where
    E: Executor<'e, Database = Postgres>,
{
    if new.email.is_none() && new.phone_number.is_none() {
        return Err(StorageError::invalid_contact(
            "contact requires at least one of email or phone number",
        ));
    }

    let sql = format!(
        r#"INSERT INTO contact (email, phone_number, linked_id, link_precedence)
           VALUES ($1, $2, $3, $4)
           RETURNING {CONTACT_COLUMNS}"#
    );

    let row: ContactRow = query_as(&sql)
        .bind(new.email.clone())
        .bind(new.phone_number.clone())
        .bind(new.linked_id)
        .bind(new.link_precedence.as_str())
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if crate::error::is_check_violation(&e) {
                StorageError::invalid_contact(format!("Contact violates schema constraints: {e}"))
            } else {
                StorageError::internal(format!("Failed to create contact: {e}"))
            }
        })?;

    row_to_contact(row)
}

/// Takes a row-level lock on the given live contact (`FOR UPDATE`).
pub async fn lock_contact<'e, E>(executor: E, id: ContactId) -> Result<(), StorageError>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: Option<(i64,)> =
        query_as("SELECT id FROM contact WHERE id = $1 AND deleted_at IS NULL FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await
            .map_err(|e| StorageError::internal(format!("Failed to lock contact: {e}")))?;

    match row {
        Some(_) => Ok(()),
        None => Err(StorageError::not_found(id)),
    }
}

/// Demotes a primary to secondary, pointing it at `new_primary`.
pub async fn demote_to_secondary<'e, E>(
    executor: E,
    id: ContactId,
    new_primary: ContactId,
) -> Result<(), StorageError>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = query(
        r#"UPDATE contact
           SET link_precedence = 'secondary', linked_id = $2, updated_at = now()
           WHERE id = $1 AND deleted_at IS NULL"#,
    )
    .bind(id)
    .bind(new_primary)
    .execute(executor)
    .await
    .map_err(|e| StorageError::internal(format!("Failed to demote contact: {e}")))?;

    if result.rows_affected() == 0 {
        return Err(StorageError::not_found(id));
    }
    Ok(())
}

/// Re-points every secondary of `from_primary` at `to_primary`.
/// Returns the number of rows updated.
pub async fn relink_secondaries<'e, E>(
    executor: E,
    from_primary: ContactId,
    to_primary: ContactId,
) -> Result<u64, StorageError>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = query(
        r#"UPDATE contact
           SET linked_id = $2, updated_at = now()
           WHERE linked_id = $1"#,
    )
    .bind(from_primary)
    .bind(to_primary)
    .execute(executor)
    .await
    .map_err(|e| StorageError::internal(format!("Failed to relink secondaries: {e}")))?;

    Ok(result.rows_affected())
}

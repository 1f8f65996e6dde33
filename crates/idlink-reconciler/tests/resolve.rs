//! End-to-end reconciliation behavior against the in-memory store.

use std::sync::Arc;

use idlink_core::ContactId;
use idlink_db_memory::MemoryContactStore;
use idlink_reconciler::{ReconcileError, Reconciler};
use idlink_storage::ContactStore;

fn setup() -> (Reconciler, Arc<MemoryContactStore>) {
    let store = Arc::new(MemoryContactStore::new());
    (Reconciler::new(store.clone()), store)
}

/// Checks that no contact's linked_id refers to a contact that itself links
/// onward (the two-level hierarchy stays flat).
async fn assert_flat_hierarchy(store: &MemoryContactStore, ids: &[ContactId]) {
    let rows = store.find_by_ids(ids).await.unwrap();
    for row in &rows {
        if let Some(parent_id) = row.linked_id {
            let parent = &store.find_by_ids(&[parent_id]).await.unwrap()[0];
            assert!(
                parent.linked_id.is_none(),
                "contact {} links to {}, which links onward to {:?}",
                row.id,
                parent.id,
                parent.linked_id
            );
        }
    }
}

#[tokio::test]
async fn no_match_creates_primary() {
    let (reconciler, store) = setup();

    let identity = reconciler
        .resolve(Some("lorraine@x.edu"), Some("123456"))
        .await
        .unwrap();

    assert_eq!(identity.emails, vec!["lorraine@x.edu"]);
    assert_eq!(identity.phone_numbers, vec!["123456"]);
    assert!(identity.secondary_contact_ids.is_empty());
    assert_eq!(store.row_count().await, 1);

    let row = &store
        .find_by_ids(&[identity.primary_contact_id])
        .await
        .unwrap()[0];
    assert!(row.is_primary());
}

#[tokio::test]
async fn email_only_request_creates_primary() {
    let (reconciler, store) = setup();

    let identity = reconciler.resolve(Some("doc@x.edu"), None).await.unwrap();

    assert_eq!(identity.emails, vec!["doc@x.edu"]);
    assert!(identity.phone_numbers.is_empty());
    assert!(identity.secondary_contact_ids.is_empty());
    assert_eq!(store.row_count().await, 1);
}

#[tokio::test]
async fn partial_match_creates_secondary() {
    let (reconciler, store) = setup();

    let first = reconciler
        .resolve(Some("lorraine@x.edu"), Some("123456"))
        .await
        .unwrap();
    let second = reconciler
        .resolve(Some("mcfly@x.edu"), Some("123456"))
        .await
        .unwrap();

    assert_eq!(second.primary_contact_id, first.primary_contact_id);
    assert_eq!(second.emails, vec!["lorraine@x.edu", "mcfly@x.edu"]);
    assert_eq!(second.phone_numbers, vec!["123456"]);
    assert_eq!(second.secondary_contact_ids.len(), 1);
    assert_eq!(store.row_count().await, 2);
}

#[tokio::test]
async fn exact_duplicate_submission_is_idempotent() {
    let (reconciler, store) = setup();

    reconciler
        .resolve(Some("lorraine@x.edu"), Some("123456"))
        .await
        .unwrap();
    let before = reconciler
        .resolve(Some("mcfly@x.edu"), Some("123456"))
        .await
        .unwrap();
    let after = reconciler
        .resolve(Some("mcfly@x.edu"), Some("123456"))
        .await
        .unwrap();

    assert_eq!(before, after);
    assert_eq!(store.row_count().await, 2);
}

#[tokio::test]
async fn known_fields_under_different_rows_create_nothing() {
    let (reconciler, store) = setup();

    reconciler
        .resolve(Some("george@x.edu"), Some("919191"))
        .await
        .unwrap();
    reconciler
        .resolve(Some("biffsucks@x.edu"), Some("919191"))
        .await
        .unwrap();
    assert_eq!(store.row_count().await, 2);

    // Both values already known to the group, just never on one row.
    let identity = reconciler
        .resolve(Some("george@x.edu"), Some("919191"))
        .await
        .unwrap();
    assert_eq!(store.row_count().await, 2);
    assert_eq!(identity.secondary_contact_ids.len(), 1);
}

#[tokio::test]
async fn merge_keeps_oldest_primary() {
    let (reconciler, store) = setup();

    let a = reconciler
        .resolve(Some("george@x.edu"), Some("919191"))
        .await
        .unwrap();
    let b = reconciler
        .resolve(Some("biffsucks@x.edu"), Some("717171"))
        .await
        .unwrap();
    assert_ne!(a.primary_contact_id, b.primary_contact_id);

    // A's email plus B's phone bridges the two groups.
    let merged = reconciler
        .resolve(Some("george@x.edu"), Some("717171"))
        .await
        .unwrap();

    assert_eq!(merged.primary_contact_id, a.primary_contact_id);
    assert_eq!(merged.emails, vec!["george@x.edu", "biffsucks@x.edu"]);
    assert_eq!(merged.phone_numbers, vec!["919191", "717171"]);
    assert_eq!(
        merged.secondary_contact_ids,
        vec![b.primary_contact_id],
        "the younger primary is demoted into the secondary list"
    );
    // The bridging pair carried no new values, so no extra row appeared.
    assert_eq!(store.row_count().await, 2);

    let all: Vec<ContactId> = vec![a.primary_contact_id, b.primary_contact_id];
    assert_flat_hierarchy(&store, &all).await;
}

#[tokio::test]
async fn merge_relinks_former_secondaries() {
    let (reconciler, store) = setup();

    // Group A: primary + one secondary.
    let a = reconciler
        .resolve(Some("old@x.edu"), Some("111"))
        .await
        .unwrap();
    reconciler
        .resolve(Some("old2@x.edu"), Some("111"))
        .await
        .unwrap();

    // Group B: primary + one secondary.
    let b = reconciler
        .resolve(Some("new@x.edu"), Some("222"))
        .await
        .unwrap();
    reconciler
        .resolve(Some("new2@x.edu"), Some("222"))
        .await
        .unwrap();

    // Bridge the groups.
    let merged = reconciler
        .resolve(Some("old@x.edu"), Some("222"))
        .await
        .unwrap();

    assert_eq!(merged.primary_contact_id, a.primary_contact_id);
    assert_eq!(merged.secondary_contact_ids.len(), 3);
    assert!(merged
        .secondary_contact_ids
        .contains(&b.primary_contact_id));

    // Every surviving row links directly at the true primary.
    let group = store.group_members(a.primary_contact_id).await.unwrap();
    assert_eq!(group.len(), 4);
    for member in group.iter().filter(|c| c.id != a.primary_contact_id) {
        assert_eq!(member.linked_id, Some(a.primary_contact_id));
    }

    let ids: Vec<ContactId> = group.iter().map(|c| c.id).collect();
    assert_flat_hierarchy(&store, &ids).await;
}

#[tokio::test]
async fn merge_then_new_pair_attaches_to_survivor() {
    let (reconciler, store) = setup();

    let a = reconciler.resolve(Some("a@x.edu"), Some("111")).await.unwrap();
    reconciler.resolve(Some("b@x.edu"), Some("222")).await.unwrap();

    // New email attaches as a secondary under group B.
    let merged = reconciler
        .resolve(Some("c@x.edu"), Some("222"))
        .await
        .unwrap();

    // Bridge A and B; B's secondaries must follow into A's group.
    let bridged = reconciler
        .resolve(Some("a@x.edu"), Some("222"))
        .await
        .unwrap();

    assert_eq!(bridged.primary_contact_id, a.primary_contact_id);
    assert!(bridged.emails.contains(&"c@x.edu".to_string()));
    assert_eq!(merged.phone_numbers, vec!["222"]);

    let group = store.group_members(a.primary_contact_id).await.unwrap();
    let ids: Vec<ContactId> = group.iter().map(|c| c.id).collect();
    assert_flat_hierarchy(&store, &ids).await;
}

#[tokio::test]
async fn repeated_resolve_is_stable_after_merge() {
    let (reconciler, store) = setup();

    reconciler.resolve(Some("a@x.edu"), Some("111")).await.unwrap();
    reconciler.resolve(Some("b@x.edu"), Some("222")).await.unwrap();
    let first = reconciler
        .resolve(Some("a@x.edu"), Some("222"))
        .await
        .unwrap();
    let rows = store.row_count().await;

    let second = reconciler
        .resolve(Some("a@x.edu"), Some("222"))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(store.row_count().await, rows);
}

#[tokio::test]
async fn lookup_by_single_known_field_returns_whole_group() {
    let (reconciler, _store) = setup();

    reconciler
        .resolve(Some("lorraine@x.edu"), Some("123456"))
        .await
        .unwrap();
    reconciler
        .resolve(Some("mcfly@x.edu"), Some("123456"))
        .await
        .unwrap();

    // Phone-only lookup, no new information.
    let identity = reconciler.resolve(None, Some("123456")).await.unwrap();
    assert_eq!(identity.emails, vec!["lorraine@x.edu", "mcfly@x.edu"]);
    assert_eq!(identity.secondary_contact_ids.len(), 1);

    // Email-only lookup through a secondary's email.
    let identity = reconciler.resolve(Some("mcfly@x.edu"), None).await.unwrap();
    assert_eq!(identity.phone_numbers, vec!["123456"]);
}

#[tokio::test]
async fn primary_values_lead_their_lists() {
    let (reconciler, _store) = setup();

    reconciler.resolve(Some("p@x.edu"), Some("100")).await.unwrap();
    reconciler.resolve(Some("s1@x.edu"), Some("100")).await.unwrap();
    reconciler.resolve(Some("p@x.edu"), Some("200")).await.unwrap();

    let identity = reconciler.resolve(None, Some("100")).await.unwrap();
    assert_eq!(identity.emails[0], "p@x.edu");
    assert_eq!(identity.phone_numbers[0], "100");
}

#[tokio::test]
async fn missing_both_fields_is_invalid_input() {
    let (reconciler, store) = setup();

    let err = reconciler.resolve(None, None).await.unwrap_err();
    assert!(matches!(err, ReconcileError::InvalidInput));
    assert_eq!(store.row_count().await, 0);
}

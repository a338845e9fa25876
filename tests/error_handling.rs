//! Error handling and edge case tests.

use cdc_store::{
    ChangeKind, CrudService, ListenResponse, RecordId, Store, StoreConfig, StoreError,
    SubscriptionConfig,
};
use cdc_store::wire::{DeleteRequest, ReadRequest};
use std::time::Duration;

fn test_store() -> Store {
    Store::new(StoreConfig::default()).unwrap()
}

// --- NotFound ---

#[test]
fn test_read_missing() {
    let store = test_store();
    let result = store.read(&RecordId::generate());
    assert!(matches!(result, Err(StoreError::RecordNotFound(_))));
}

#[test]
fn test_update_missing_does_not_create() {
    let store = test_store();
    let id = RecordId::generate();

    let result = store.update(&id, b"ghost".to_vec());
    assert!(matches!(result, Err(StoreError::RecordNotFound(_))));
    assert!(store.read(&id).is_err());
    assert!(store.is_empty());
}

#[test]
fn test_update_after_delete() {
    let store = test_store();
    let id = store.create(vec![1]).unwrap();
    store.delete(&id).unwrap();

    assert!(store.update(&id, vec![2]).unwrap_err().is_not_found());
}

#[test]
fn test_error_message_names_id() {
    let store = test_store();
    let id = RecordId::generate();
    let message = store.read(&id).unwrap_err().to_string();
    assert!(message.contains(&id.to_string()));
}

// --- Delete Semantics ---

#[test]
fn test_delete_missing_succeeds() {
    let store = test_store();
    assert!(store.delete(&RecordId::generate()).is_ok());
}

#[test]
fn test_delete_twice_succeeds() {
    let store = test_store();
    let id = store.create(vec![1]).unwrap();
    store.delete(&id).unwrap();
    store.delete(&id).unwrap();
    assert!(store.read(&id).unwrap_err().is_not_found());
}

#[test]
fn test_delete_malformed_id_via_service() {
    let store = test_store();
    let feed = store.subscribe(SubscriptionConfig::default()).unwrap();

    assert!(CrudService::delete(&store, DeleteRequest { id: "nope".into() }).is_ok());

    // Announced like any other delete, under the id as given
    let event = feed.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(event.kind, ChangeKind::Deleted);
    assert_eq!(event.id(), "nope");
    assert!(event.raw().is_empty());
    assert!(feed.recv_timeout(Duration::from_millis(50)).is_err());

    let listen = ListenResponse::from(&event);
    assert_eq!(listen.data.id, "nope");
}

#[test]
fn test_read_malformed_id_via_service() {
    let store = test_store();
    let result = CrudService::read(&store, ReadRequest { id: "nope".into() });
    assert!(matches!(result, Err(StoreError::RecordNotFound(_))));
}

// --- Empty Payloads ---

#[test]
fn test_empty_payload_roundtrip() {
    let store = test_store();
    let id = store.create(Vec::new()).unwrap();
    assert!(store.read(&id).unwrap().is_empty());

    store.update(&id, vec![1]).unwrap();
    store.update(&id, Vec::new()).unwrap();
    assert!(store.read(&id).unwrap().is_empty());
}

// --- Shutdown ---

#[test]
fn test_operations_after_shutdown() {
    let store = test_store();
    let id = store.create(vec![1]).unwrap();
    store.shutdown();
    assert!(!store.is_running());

    assert!(matches!(store.create(vec![2]), Err(StoreError::ShutDown)));
    assert!(matches!(store.update(&id, vec![2]), Err(StoreError::ShutDown)));
    assert!(matches!(store.delete(&id), Err(StoreError::ShutDown)));

    // Reads still work and the failed mutations left no trace
    assert_eq!(store.read(&id).unwrap(), vec![1]);
    assert_eq!(store.len(), 1);

    // Idempotent
    store.shutdown();
}

#[test]
fn test_queued_events_delivered_on_shutdown() {
    let store = test_store();
    let feed = store.subscribe(SubscriptionConfig::default()).unwrap();

    let ids: Vec<RecordId> = (0..5u8).map(|i| store.create(vec![i]).unwrap()).collect();
    store.shutdown();

    let seen: Vec<RecordId> = feed
        .receiver
        .try_iter()
        .map(|e| e.record_id().unwrap())
        .collect();
    assert_eq!(seen, ids);
}

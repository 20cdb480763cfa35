//! Integration tests for the sync engine against the reference server.

use cartsync_engine::{
    apply, merge, ItemId, ItemStore, MemoryItemStore, MergeAction, RetryConfig, SyncConfig,
    SyncError, SyncOutcome, TransportError,
};
use cartsync_protocol::{RemoteItem, UploadRequest, Watermark};
use cartsync_server::{ServerConfig, SyncServer};
use cartsync_testkit::prelude::*;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

/// Puts `items` on the server as if another client had uploaded them.
fn seed_server(server: &SyncServer, items: Vec<RemoteItem>) {
    server
        .handle_upload(UploadRequest::new(items, Watermark::BEGINNING))
        .unwrap();
}

fn completed(outcome: SyncOutcome) -> cartsync_engine::SyncCycleResult {
    match outcome {
        SyncOutcome::Completed(result) => result,
        SyncOutcome::Skipped => panic!("cycle was skipped"),
    }
}

#[tokio::test]
async fn older_remote_copy_leaves_local_unchanged() {
    let server = Arc::new(SyncServer::default());
    seed_server(&server, vec![remote_item("x", "Remote name", 50)]);
    let store = store_with(vec![local_item("x", "Local name", 100)]);
    let harness = LoopbackHarness::with_server(Arc::clone(&server), Arc::clone(&store));

    let result = completed(harness.engine.sync_now().await.unwrap());
    assert_eq!(result.fetched, 1);
    assert_eq!(result.adopted, 0);

    let local = store.get(&ItemId::from_string("x")).unwrap();
    assert_eq!(local.name, "Local name");
    assert_eq!(local.updated_at, millis(100));
    // The upload carried the newer local copy to the server.
    assert_eq!(server.ledger().get("x").unwrap().item.name, "Local name");
}

#[tokio::test]
async fn newer_remote_copy_is_adopted() {
    let server = Arc::new(SyncServer::default());
    seed_server(&server, vec![remote_item("x", "Y", 100)]);
    let store = store_with(vec![local_item("x", "X", 50)]);
    let harness = LoopbackHarness::with_server(server, Arc::clone(&store));

    let result = completed(harness.engine.sync_now().await.unwrap());
    assert_eq!(result.adopted, 1);

    let local = store.get(&ItemId::from_string("x")).unwrap();
    assert_eq!(local.name, "Y");
    // Stamped by the store, not copied from the remote.
    assert!(local.updated_at > millis(100));
    assert_eq!(local.created_at, millis(0));
}

#[tokio::test]
async fn unknown_remote_item_is_created_once() {
    let server = Arc::new(SyncServer::default());
    let mut zucchini = remote_item("z", "Zucchini", 10);
    zucchini.quantity = 3;
    zucchini.note = Some("small ones".into());
    seed_server(&server, vec![zucchini]);
    let store = store_with(vec![local_item("a", "Apples", 5)]);
    let harness = LoopbackHarness::with_server(server, Arc::clone(&store));

    completed(harness.engine.sync_now().await.unwrap());
    let second = completed(harness.engine.sync_now().await.unwrap());
    assert_eq!(second.created, 0);

    let items = store.fetch_all().unwrap();
    assert_eq!(items.len(), 2);
    let created = store.get(&ItemId::from_string("z")).unwrap();
    assert_eq!(created.name, "Zucchini");
    assert_eq!(created.quantity, 3);
    assert_eq!(created.note.as_deref(), Some("small ones"));
}

#[tokio::test(start_paused = true)]
async fn unreachable_server_leaves_everything_in_place() {
    let config = SyncConfig::new(LOOPBACK_URL).with_retry(
        RetryConfig::new(3)
            .with_base_delay(Duration::from_millis(10))
            .with_max_jitter(Duration::ZERO),
    );
    let store = store_with(vec![local_item("a", "Apples", 5)]);
    let harness = LoopbackHarness::with_config(
        config,
        Arc::new(SyncServer::default()),
        Arc::clone(&store),
    );
    harness.adapter().set_offline(true);

    let err = harness.engine.sync_now().await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Transport(TransportError::Server { status: 503, .. })
    ));

    let status = harness.engine.status();
    assert!(status.watermark.is_beginning());
    assert!(status.last_error.unwrap().contains("service unavailable"));
    assert_eq!(harness.adapter().request_count(), 4);
    assert_eq!(store.fetch_all().unwrap(), vec![local_item("a", "Apples", 5)]);
    assert_eq!(harness.server.item_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn recovers_when_server_returns_during_backoff() {
    let config = SyncConfig::new(LOOPBACK_URL).with_retry(
        RetryConfig::new(3)
            .with_base_delay(Duration::from_secs(1))
            .with_max_jitter(Duration::ZERO),
    );
    let harness = LoopbackHarness::with_config(
        config,
        Arc::new(SyncServer::default()),
        store_with(vec![local_item("a", "Apples", 5)]),
    );
    harness.adapter().set_offline(true);

    let task = {
        let engine = Arc::clone(&harness.engine);
        tokio::spawn(async move { engine.sync_now().await })
    };
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    harness.adapter().set_offline(false);

    completed(task.await.unwrap().unwrap());
    // Failed attempts at 0s and 1s, success at 3s, then the upload.
    assert_eq!(harness.adapter().request_count(), 4);
    assert_eq!(harness.server.item_count(), 1);
    assert_eq!(harness.engine.last_error(), None);
}

#[tokio::test]
async fn rejected_upload_keeps_watermark_and_merged_items() {
    let server = Arc::new(SyncServer::new(ServerConfig::new().with_max_upload_batch(1)));
    seed_server(&server, vec![remote_item("z", "Zucchini", 10)]);
    let store = store_with(vec![local_item("a", "Apples", 5)]);
    let harness = LoopbackHarness::with_server(server, Arc::clone(&store));

    let err = harness.engine.sync_now().await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Transport(TransportError::Server { status: 413, .. })
    ));
    assert!(harness.engine.watermark().is_beginning());
    assert!(store.get(&ItemId::from_string("z")).is_some());
}

#[tokio::test]
async fn watermark_limits_later_fetches() {
    let harness = LoopbackHarness::new();
    harness.store.create("Milk", 1, None).unwrap();

    let first = completed(harness.engine.sync_now().await.unwrap());
    assert_eq!(first.uploaded, 1);
    assert!(!harness.engine.watermark().is_beginning());

    // Our own upload comes back once; it is a tie and changes nothing.
    let second = completed(harness.engine.sync_now().await.unwrap());
    assert_eq!(second.fetched, 1);
    assert_eq!((second.created, second.adopted), (0, 0));
    assert!(second.watermark > first.watermark);

    let third = completed(harness.engine.sync_now().await.unwrap());
    assert_eq!(third.fetched, 0);
}

#[tokio::test]
async fn two_clients_converge() {
    let server = Arc::new(SyncServer::default());
    let alice = LoopbackHarness::with_server(
        Arc::clone(&server),
        store_with(vec![local_item("milk", "Milk", 1_000)]),
    );
    let bob = LoopbackHarness::with_server(Arc::clone(&server), Arc::new(MemoryItemStore::new()));

    completed(alice.engine.sync_now().await.unwrap());
    completed(bob.engine.sync_now().await.unwrap());
    let milk = bob.store.get(&ItemId::from_string("milk")).unwrap();
    assert!(!milk.is_bought);

    bob.store.set_bought(&milk, true).unwrap();
    completed(bob.engine.sync_now().await.unwrap());
    completed(alice.engine.sync_now().await.unwrap());

    let seen_by_alice = alice.store.get(&ItemId::from_string("milk")).unwrap();
    assert!(seen_by_alice.is_bought);
    assert_eq!(alice.store.len(), 1);
    assert_eq!(server.item_count(), 1);
}

#[tokio::test]
async fn deleted_item_returns_while_server_keeps_it() {
    let server = Arc::new(SyncServer::default());
    let harness = LoopbackHarness::with_server(
        Arc::clone(&server),
        store_with(vec![local_item("a", "Apples", 5)]),
    );
    completed(harness.engine.sync_now().await.unwrap());

    let apples = harness.store.get(&ItemId::from_string("a")).unwrap();
    harness.store.delete(&apples).unwrap();
    completed(harness.engine.sync_now().await.unwrap());

    // Deletions stay local; the server copy is fetched and recreated.
    assert_eq!(harness.store.len(), 1);
    assert_eq!(server.item_count(), 1);
}

proptest! {
    #[test]
    fn merge_is_idempotent(remote in remote_batch_strategy(12), local in local_set_strategy(12)) {
        let store = MemoryItemStore::with_items(local);
        let before = store.fetch_all().unwrap();
        apply(&store, &merge(&remote, &before)).unwrap();

        let after = store.fetch_all().unwrap();
        prop_assert!(merge(&remote, &after).is_empty());
    }

    #[test]
    fn matching_ids_follow_last_write_wins((local, remote) in conflicting_pair_strategy()) {
        let actions = merge(std::slice::from_ref(&remote), std::slice::from_ref(&local));
        if remote.updated_at > local.updated_at {
            let adopted = matches!(actions.as_slice(), [MergeAction::AdoptRemote { .. }]);
            prop_assert!(adopted);
        } else {
            prop_assert!(actions.is_empty());
        }
    }

    #[test]
    fn unmatched_remote_items_are_always_created(remote in remote_item_strategy()) {
        let actions = merge(std::slice::from_ref(&remote), &[]);
        prop_assert_eq!(actions, vec![MergeAction::CreateFromRemote(remote)]);
    }
}

//! Last-write-wins reconciliation of remote and local items.
//!
//! [`merge`] is a pure function over two snapshots; [`apply`] carries its
//! decisions out against an [`ItemStore`] and stops at the first store
//! failure.

use crate::error::StoreResult;
use crate::item::{Item, ItemId};
use crate::store::ItemStore;
use cartsync_protocol::RemoteItem;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A change the reconciler wants applied to the local store.
///
/// "Keep local" is not an action: items where local wins produce nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeAction {
    /// The remote copy is newer; overwrite the local fields.
    AdoptRemote {
        /// The local item as it was when the decision was made.
        local: Item,
        /// The newer remote copy.
        remote: RemoteItem,
    },
    /// No local item has this id; create one.
    CreateFromRemote(RemoteItem),
}

impl MergeAction {
    /// The remote item driving this action.
    pub fn remote(&self) -> &RemoteItem {
        match self {
            MergeAction::AdoptRemote { remote, .. } => remote,
            MergeAction::CreateFromRemote(remote) => remote,
        }
    }
}

/// Counts of what [`apply`] changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Local items created from remote ones.
    pub created: usize,
    /// Local items overwritten by newer remote copies.
    pub adopted: usize,
}

impl MergeSummary {
    /// Returns true if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.created == 0 && self.adopted == 0
    }
}

/// Decides, for each remote item, whether to adopt it, create it, or keep
/// the local copy.
///
/// - no local item with the same id: `CreateFromRemote`
/// - `remote.updated_at > local.updated_at`: `AdoptRemote`
/// - otherwise the local copy wins (ties included) and nothing is emitted
///
/// Local-only items are ignored; they reach the server through upload. If
/// the batch repeats an id, only the copy with the latest `updated_at`
/// counts (the first one on a tie). Remote items without a usable name or
/// quantity are skipped before duplicates are collapsed, so an invalid copy
/// never hides a valid one.
///
/// Merging is idempotent as long as the local clock is not behind the
/// remote one. A remote copy stamped in the local future is adopted, and
/// the adoption stamps local time, so the same copy wins again on the next
/// merge until the local clock catches up.
pub fn merge(remote_items: &[RemoteItem], local_items: &[Item]) -> Vec<MergeAction> {
    let local_by_id: HashMap<&str, &Item> = local_items
        .iter()
        .map(|item| (item.sync_id.as_str(), item))
        .collect();

    let valid = remote_items.iter().filter(|remote| {
        let ok = remote.has_valid_content();
        if !ok {
            warn!(id = %remote.id, "skipping remote item with invalid content");
        }
        ok
    });

    latest_per_id(valid)
        .into_iter()
        .filter_map(|remote| match local_by_id.get(remote.id.as_str()) {
            None => {
                debug!(id = %remote.id, "remote item has no local counterpart");
                Some(MergeAction::CreateFromRemote(remote.clone()))
            }
            Some(local) if remote.updated_at > local.updated_at => {
                debug!(
                    id = %remote.id,
                    remote_updated_at = %remote.updated_at,
                    local_updated_at = %local.updated_at,
                    "remote copy is newer"
                );
                Some(MergeAction::AdoptRemote {
                    local: (*local).clone(),
                    remote: remote.clone(),
                })
            }
            Some(_) => None,
        })
        .collect()
}

/// Collapses repeated ids, keeping first-seen order.
fn latest_per_id<'a>(remote_items: impl Iterator<Item = &'a RemoteItem>) -> Vec<&'a RemoteItem> {
    let mut latest: Vec<&RemoteItem> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();

    for remote in remote_items {
        match position.get(remote.id.as_str()) {
            Some(&index) => {
                if remote.updated_at > latest[index].updated_at {
                    latest[index] = remote;
                }
            }
            None => {
                position.insert(remote.id.as_str(), latest.len());
                latest.push(remote);
            }
        }
    }

    latest
}

/// Applies merge actions to the store, in order.
///
/// Stops at the first store error; actions already applied stay applied.
pub fn apply<S>(store: &S, actions: &[MergeAction]) -> StoreResult<MergeSummary>
where
    S: ItemStore + ?Sized,
{
    let mut summary = MergeSummary::default();

    for action in actions {
        match action {
            MergeAction::CreateFromRemote(remote) => {
                let created = store.create_with_id(
                    &ItemId::from_string(remote.id.clone()),
                    &remote.name,
                    remote.quantity,
                    remote.note.as_deref(),
                )?;
                // Creation starts unbought; carry the remote flag over separately.
                if remote.is_bought {
                    store.set_bought(&created, true)?;
                }
                summary.created += 1;
            }
            MergeAction::AdoptRemote { local, remote } => {
                let updated =
                    store.update(local, &remote.name, remote.quantity, remote.note.as_deref())?;
                if updated.is_bought != remote.is_bought {
                    store.set_bought(&updated, remote.is_bought)?;
                }
                summary.adopted += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MemoryItemStore;
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn local(id: &str, name: &str, updated_ms: i64) -> Item {
        Item {
            sync_id: ItemId::from_string(id),
            name: name.into(),
            quantity: 1,
            note: None,
            is_bought: false,
            created_at: at(0),
            updated_at: at(updated_ms),
        }
    }

    fn remote(id: &str, name: &str, updated_ms: i64) -> RemoteItem {
        RemoteItem {
            id: id.into(),
            name: name.into(),
            quantity: 1,
            note: None,
            is_bought: false,
            created_at: at(0),
            updated_at: at(updated_ms),
        }
    }

    #[test]
    fn newer_remote_is_adopted() {
        let actions = merge(&[remote("x", "Y", 100)], &[local("x", "X", 50)]);
        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], MergeAction::AdoptRemote { remote, .. } if remote.name == "Y"));
    }

    #[test]
    fn older_remote_is_ignored() {
        let actions = merge(&[remote("x", "Y", 50)], &[local("x", "X", 100)]);
        assert!(actions.is_empty());
    }

    #[test]
    fn tie_keeps_local() {
        let actions = merge(&[remote("x", "Y", 100)], &[local("x", "X", 100)]);
        assert!(actions.is_empty());
    }

    #[test]
    fn unknown_id_is_created() {
        let actions = merge(&[remote("z", "Zucchini", 1)], &[local("x", "X", 100)]);
        assert_eq!(actions, vec![MergeAction::CreateFromRemote(remote("z", "Zucchini", 1))]);
    }

    #[test]
    fn local_only_items_are_untouched() {
        let actions = merge(&[], &[local("x", "X", 100), local("y", "Y", 5)]);
        assert!(actions.is_empty());
    }

    #[test]
    fn repeated_ids_collapse_to_latest() {
        let batch = [remote("x", "old", 10), remote("x", "new", 30), remote("x", "mid", 20)];
        let actions = merge(&batch, &[]);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].remote().name, "new");
    }

    #[test]
    fn invalid_newer_copy_does_not_hide_valid_one() {
        let batch = [remote("z", "Zucchini", 10), remote("z", "  ", 20)];
        let actions = merge(&batch, &[]);
        assert_eq!(actions, vec![MergeAction::CreateFromRemote(remote("z", "Zucchini", 10))]);
    }

    #[test]
    fn invalid_remote_content_is_skipped() {
        let mut blank = remote("b", "   ", 10);
        blank.quantity = 3;
        let mut empty_qty = remote("q", "Pears", 10);
        empty_qty.quantity = 0;
        assert!(merge(&[blank, empty_qty], &[]).is_empty());
    }

    #[test]
    fn apply_creates_with_remote_identity_and_bought_flag() {
        let store = MemoryItemStore::new();
        let mut bought = remote("r1", "Coffee", 10);
        bought.is_bought = true;
        bought.note = Some("beans".into());

        let summary = apply(&store, &merge(&[bought], &[])).unwrap();
        assert_eq!(summary, MergeSummary { created: 1, adopted: 0 });

        let item = store.get(&ItemId::from_string("r1")).unwrap();
        assert_eq!(item.name, "Coffee");
        assert_eq!(item.note.as_deref(), Some("beans"));
        assert!(item.is_bought);
    }

    #[test]
    fn apply_adopts_fields_and_bought_flag() {
        let store = MemoryItemStore::new();
        store.insert(local("x", "X", 50)).unwrap();
        let mut newer = remote("x", "Y", 100);
        newer.quantity = 4;
        newer.is_bought = true;

        let local_items = store.fetch_all().unwrap();
        let summary = apply(&store, &merge(&[newer], &local_items)).unwrap();
        assert_eq!(summary.adopted, 1);

        let item = store.get(&ItemId::from_string("x")).unwrap();
        assert_eq!(item.name, "Y");
        assert_eq!(item.quantity, 4);
        assert!(item.is_bought);
        assert!(item.updated_at > at(100));
    }

    #[test]
    fn apply_stops_at_first_store_error() {
        let store = MemoryItemStore::new();
        store.insert(local("dup", "Existing", 500)).unwrap();
        // Stale snapshot: "dup" is missing from it, so merge asks for a create.
        let actions = merge(&[remote("a", "A", 1), remote("dup", "D", 1), remote("c", "C", 1)], &[]);

        let err = apply(&store, &actions).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert!(store.get(&ItemId::from_string("a")).is_some());
        assert!(store.get(&ItemId::from_string("c")).is_none());
    }

    #[test]
    fn second_merge_is_a_no_op() {
        let store = MemoryItemStore::new();
        store.insert(local("x", "X", 50)).unwrap();
        store.insert(local("k", "Kept", 900)).unwrap();
        let batch = [remote("x", "Y", 100), remote("k", "Lost", 200), remote("n", "New", 5)];

        let first = store.fetch_all().unwrap();
        apply(&store, &merge(&batch, &first)).unwrap();

        let second = store.fetch_all().unwrap();
        assert!(merge(&batch, &second).is_empty());
    }

    #[test]
    fn copy_from_local_future_wins_again() {
        let store = MemoryItemStore::new();
        store.insert(local("x", "X", 50)).unwrap();
        let ahead = (Utc::now() + chrono::TimeDelta::hours(1)).timestamp_millis();
        let batch = [remote("x", "Y", ahead)];

        apply(&store, &merge(&batch, &store.fetch_all().unwrap())).unwrap();
        let again = merge(&batch, &store.fetch_all().unwrap());
        assert_eq!(again.len(), 1);
        assert_eq!(store.get(&ItemId::from_string("x")).unwrap().name, "Y");
    }

    fn arb_timestamp() -> impl Strategy<Value = i64> {
        0i64..1_000
    }

    proptest! {
        #[test]
        fn decision_follows_timestamps(local_ms in arb_timestamp(), remote_ms in arb_timestamp()) {
            let actions = merge(&[remote("x", "R", remote_ms)], &[local("x", "L", local_ms)]);
            if remote_ms > local_ms {
                prop_assert_eq!(actions.len(), 1);
                let adopted = matches!(actions[0], MergeAction::AdoptRemote { .. });
                prop_assert!(adopted);
            } else {
                prop_assert!(actions.is_empty());
            }
        }

        #[test]
        fn unmatched_remote_never_adopts(ids in prop::collection::hash_set("[a-z]{1,6}", 1..8)) {
            let batch: Vec<_> = ids.iter().map(|id| remote(id, "R", 10)).collect();
            let local_items = [local("UPPER-ONLY", "L", 10)];
            let actions = merge(&batch, &local_items);
            prop_assert_eq!(actions.len(), batch.len());
            let all_creates = actions
                .iter()
                .all(|action| matches!(action, MergeAction::CreateFromRemote(_)));
            prop_assert!(all_creates);
        }
    }
}

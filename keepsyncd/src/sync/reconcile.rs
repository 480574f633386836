//! Three-way reconciliation of remote and local list snapshots.
//!
//! `reconcile` is a pure function: it reads the last agreed state, a fresh
//! remote snapshot, the current local snapshot and the identity map, and
//! returns the operations that bring both sides to the same items. It holds
//! no state between calls and performs no I/O.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::merge::{FieldDecision, local_write_wins, merged, resolve_field};
use super::model::{
    AgreedItem, AgreedList, AgreedSnapshot, Anomaly, IdentityMap, IdentityUpdate, ItemRef,
    ListPlan, LocalItem, LocalOp, LocalSnapshot, Reconciliation, RemoteItem, RemoteList, RemoteOp,
    RemoteSnapshot, TargetItem,
};
use super::policy::ListPolicy;

pub fn reconcile(
    agreed: &AgreedSnapshot,
    remote: &RemoteSnapshot,
    local: &LocalSnapshot,
    identity: &IdentityMap,
    policy: &ListPolicy,
) -> Reconciliation {
    let mut out = Reconciliation::default();
    for (list_id, local_items) in &local.lists {
        match remote.list(list_id) {
            Some(remote_list) if !remote_list.trashed => {
                ListReconciler {
                    list_id,
                    agreed: agreed.lists.get(list_id),
                    remote: remote_list,
                    fetched_at: remote.fetched_at,
                    local: local_items,
                    identity,
                    policy,
                }
                .run(&mut out);
            }
            _ => out.removed_lists.push(list_id.clone()),
        }
    }
    out
}

struct Pair<'a> {
    remote_id: &'a str,
    local_uid: &'a str,
    linked_at: Option<i64>,
    base: Option<&'a AgreedItem>,
}

struct ListReconciler<'a> {
    list_id: &'a str,
    agreed: Option<&'a AgreedList>,
    remote: &'a RemoteList,
    fetched_at: i64,
    local: &'a [LocalItem],
    identity: &'a IdentityMap,
    policy: &'a ListPolicy,
}

impl<'a> ListReconciler<'a> {
    fn run(&self, out: &mut Reconciliation) {
        let remote_items = self.sanitize_remote(out);
        let remote_by_id: HashMap<&str, &RemoteItem> = remote_items
            .iter()
            .map(|item| (item.id.as_str(), *item))
            .collect();
        let local_by_uid: HashMap<&str, &LocalItem> = self
            .local
            .iter()
            .map(|item| (item.uid.as_str(), item))
            .collect();
        let pairs = self.collect_pairs(out);

        // Target items keyed by remote id for ordering; local-only ones follow.
        let mut targets_by_remote: HashMap<&str, TargetItem> = HashMap::new();
        let mut paired_remote: HashSet<&str> = HashSet::new();
        let mut paired_local: HashSet<&str> = HashSet::new();
        let mut removed_local: HashSet<&str> = HashSet::new();

        for pair in &pairs {
            paired_remote.insert(pair.remote_id);
            paired_local.insert(pair.local_uid);
            let remote_item = remote_by_id.get(pair.remote_id).copied();
            let local_item = local_by_uid.get(pair.local_uid).copied();
            match (remote_item, local_item) {
                (Some(remote_item), Some(local_item)) => {
                    let local_wins = local_write_wins(local_item.updated_at, self.fetched_at);
                    let target = self.merge_pair(pair, remote_item, local_item, local_wins, out);
                    targets_by_remote.insert(pair.remote_id, target);
                }
                (Some(_), None) => {
                    debug!(list_id = self.list_id, remote_id = pair.remote_id, "item deleted locally");
                    out.remote_ops.push(RemoteOp::Remove {
                        list_id: self.list_id.to_string(),
                        remote_id: pair.remote_id.to_string(),
                    });
                    self.unlink(pair, out);
                }
                (None, Some(_)) => {
                    let pending = pair.base.is_none()
                        && pair
                            .linked_at
                            .is_some_and(|linked_at| linked_at >= self.fetched_at);
                    if pending {
                        debug!(
                            list_id = self.list_id,
                            remote_id = pair.remote_id,
                            "link newer than snapshot, waiting for next pass"
                        );
                        removed_local.insert(pair.local_uid);
                        continue;
                    }
                    debug!(list_id = self.list_id, remote_id = pair.remote_id, "item deleted remotely");
                    out.local_ops.push(LocalOp::Remove {
                        list_id: self.list_id.to_string(),
                        local_uid: pair.local_uid.to_string(),
                    });
                    removed_local.insert(pair.local_uid);
                    self.unlink(pair, out);
                }
                (None, None) => self.unlink(pair, out),
            }
        }

        // Remote-only items: new remotely, created locally.
        let mut remote_created: Vec<&str> = Vec::new();
        for item in &remote_items {
            if paired_remote.contains(item.id.as_str()) {
                continue;
            }
            let text = self.policy.normalize(&item.text);
            if text != item.text {
                out.remote_ops.push(RemoteOp::Update {
                    list_id: self.list_id.to_string(),
                    remote_id: item.id.clone(),
                    text: Some(text.clone()),
                    completed: None,
                });
            }
            out.local_ops.push(LocalOp::Add {
                list_id: self.list_id.to_string(),
                remote_id: item.id.clone(),
                text: text.clone(),
                completed: item.checked,
                notify: !item.checked,
            });
            remote_created.push(item.id.as_str());
            targets_by_remote.insert(
                item.id.as_str(),
                TargetItem {
                    item: ItemRef::Remote(item.id.clone()),
                    text,
                    completed: item.checked,
                },
            );
        }

        // Local-only items: new locally, created remotely. Never matched by text.
        let mut local_created: Vec<TargetItem> = Vec::new();
        for item in self.local {
            if paired_local.contains(item.uid.as_str()) {
                continue;
            }
            if item.text.trim().is_empty() {
                debug!(list_id = self.list_id, local_uid = %item.uid, "blank local item, not synced");
                continue;
            }
            let text = self.policy.normalize(&item.text);
            if text != item.text {
                out.local_ops.push(LocalOp::Update {
                    list_id: self.list_id.to_string(),
                    local_uid: item.uid.clone(),
                    text: Some(text.clone()),
                    completed: None,
                });
            }
            out.remote_ops.push(RemoteOp::Add {
                list_id: self.list_id.to_string(),
                local_uid: item.uid.clone(),
                text: text.clone(),
                completed: item.completed,
            });
            local_created.push(TargetItem {
                item: ItemRef::Local(item.uid.clone()),
                text,
                completed: item.completed,
            });
        }

        // Remote order first, then local creations which the remote appends.
        let mut base_order: Vec<TargetItem> = remote_items
            .iter()
            .filter_map(|item| targets_by_remote.remove(item.id.as_str()))
            .collect();
        base_order.extend(local_created);
        let target_order = self.policy.arrange(base_order.clone());
        let refs = |items: &[TargetItem]| items.iter().map(|t| t.item.clone()).collect::<Vec<_>>();

        if target_order != base_order {
            out.remote_ops.push(RemoteOp::Reorder {
                list_id: self.list_id.to_string(),
                order: refs(&target_order),
            });
        }

        let remote_moved = self.remote_order_changed(&remote_items, &target_order, &remote_created);
        if remote_moved || target_order != base_order {
            let expected_local = self.expected_local_order(&target_order, &removed_local);
            let target_refs = refs(&target_order);
            if expected_local != target_refs {
                out.local_ops.push(LocalOp::Reorder {
                    list_id: self.list_id.to_string(),
                    order: target_refs,
                });
            }
        }

        out.plans.push(ListPlan {
            list_id: self.list_id.to_string(),
            title: self.remote.title.clone(),
            fetched_at: self.fetched_at,
            items: target_order,
        });
    }

    /// Drops items that are not synced and records malformed ones.
    fn sanitize_remote(&self, out: &mut Reconciliation) -> Vec<&'a RemoteItem> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut items = Vec::with_capacity(self.remote.items.len());
        for item in &self.remote.items {
            if item.id.trim().is_empty() {
                out.anomalies.push(Anomaly::MissingItemId {
                    list_id: self.list_id.to_string(),
                    text: item.text.clone(),
                });
                continue;
            }
            if !seen.insert(item.id.as_str()) {
                out.anomalies.push(Anomaly::DuplicateItemId {
                    list_id: self.list_id.to_string(),
                    remote_id: item.id.clone(),
                });
                continue;
            }
            if !item.show_checkboxes || item.text.trim().is_empty() {
                continue;
            }
            items.push(item);
        }
        items
    }

    /// Known pairs: agreed items plus identity links not yet agreed.
    fn collect_pairs(&self, out: &mut Reconciliation) -> Vec<Pair<'a>> {
        let mut pairs: Vec<Pair<'a>> = Vec::new();
        let mut seen_remote: HashSet<&str> = HashSet::new();
        let mut seen_local: HashSet<&str> = HashSet::new();

        let agreed_items = self.agreed.map(|list| list.items.as_slice()).unwrap_or(&[]);
        for item in agreed_items {
            if !seen_remote.insert(item.remote_id.as_str()) {
                continue;
            }
            if !seen_local.insert(item.local_uid.as_str()) {
                out.anomalies.push(Anomaly::ConflictingLink {
                    list_id: self.list_id.to_string(),
                    local_uid: item.local_uid.clone(),
                });
                continue;
            }
            pairs.push(Pair {
                remote_id: &item.remote_id,
                local_uid: &item.local_uid,
                linked_at: self
                    .identity
                    .by_remote(self.list_id, &item.remote_id)
                    .map(|entry| entry.linked_at),
                base: Some(item),
            });
        }

        for entry in self.identity.entries_for(self.list_id) {
            if seen_remote.contains(entry.remote_id.as_str()) {
                continue;
            }
            if !seen_local.insert(entry.local_uid.as_str()) {
                out.anomalies.push(Anomaly::ConflictingLink {
                    list_id: self.list_id.to_string(),
                    local_uid: entry.local_uid.clone(),
                });
                continue;
            }
            seen_remote.insert(entry.remote_id.as_str());
            pairs.push(Pair {
                remote_id: &entry.remote_id,
                local_uid: &entry.local_uid,
                linked_at: Some(entry.linked_at),
                base: None,
            });
        }
        pairs
    }

    fn merge_pair(
        &self,
        pair: &Pair<'a>,
        remote: &RemoteItem,
        local: &LocalItem,
        local_wins: bool,
        out: &mut Reconciliation,
    ) -> TargetItem {
        let text_decision = resolve_field(
            pair.base.map(|base| &base.text),
            &local.text,
            &remote.text,
            local_wins,
        );
        let completed_decision = resolve_field(
            pair.base.map(|base| &base.completed),
            &local.completed,
            &remote.checked,
            local_wins,
        );
        if text_decision != FieldDecision::NoOp || completed_decision != FieldDecision::NoOp {
            debug!(
                list_id = self.list_id,
                remote_id = pair.remote_id,
                ?text_decision,
                ?completed_decision,
                "merging item fields"
            );
        }
        let text = self
            .policy
            .normalize(merged(text_decision, &local.text, &remote.text));
        let completed = *merged(completed_decision, &local.completed, &remote.checked);

        let remote_text = (remote.text != text).then(|| text.clone());
        let remote_completed = (remote.checked != completed).then_some(completed);
        if remote_text.is_some() || remote_completed.is_some() {
            out.remote_ops.push(RemoteOp::Update {
                list_id: self.list_id.to_string(),
                remote_id: pair.remote_id.to_string(),
                text: remote_text,
                completed: remote_completed,
            });
        }
        let local_text = (local.text != text).then(|| text.clone());
        let local_completed = (local.completed != completed).then_some(completed);
        if local_text.is_some() || local_completed.is_some() {
            out.local_ops.push(LocalOp::Update {
                list_id: self.list_id.to_string(),
                local_uid: pair.local_uid.to_string(),
                text: local_text,
                completed: local_completed,
            });
        }

        TargetItem {
            item: ItemRef::Paired {
                remote_id: pair.remote_id.to_string(),
                local_uid: pair.local_uid.to_string(),
            },
            text,
            completed,
        }
    }

    fn unlink(&self, pair: &Pair<'a>, out: &mut Reconciliation) {
        out.identity_updates.push(IdentityUpdate::Unlink {
            list_id: self.list_id.to_string(),
            remote_id: pair.remote_id.to_string(),
        });
    }

    /// Whether the remote moved items relative to the agreed order, or inserted
    /// new ones anywhere but the tail.
    fn remote_order_changed(
        &self,
        remote_items: &[&RemoteItem],
        target: &[TargetItem],
        remote_created: &[&str],
    ) -> bool {
        let Some(agreed) = self.agreed else {
            return true;
        };
        let kept: HashSet<&str> = target
            .iter()
            .filter_map(|item| match &item.item {
                ItemRef::Paired { remote_id, .. } => Some(remote_id.as_str()),
                _ => None,
            })
            .collect();
        let agreed_seq: Vec<&str> = agreed
            .items
            .iter()
            .map(|item| item.remote_id.as_str())
            .filter(|id| kept.contains(id))
            .collect();
        let remote_seq: Vec<&str> = remote_items
            .iter()
            .map(|item| item.id.as_str())
            .filter(|id| kept.contains(id))
            .collect();
        if agreed_seq != remote_seq {
            return true;
        }
        let created: HashSet<&str> = remote_created.iter().copied().collect();
        let first_created = remote_items
            .iter()
            .position(|item| created.contains(item.id.as_str()));
        let last_kept = remote_items
            .iter()
            .rposition(|item| kept.contains(item.id.as_str()));
        matches!((first_created, last_kept), (Some(first), Some(last)) if first < last)
    }

    /// Local order after this pass's adds append, without any reorder.
    fn expected_local_order(
        &self,
        target: &[TargetItem],
        removed_local: &HashSet<&str>,
    ) -> Vec<ItemRef> {
        let by_local: HashMap<&str, &ItemRef> = target
            .iter()
            .filter_map(|item| match &item.item {
                ItemRef::Paired { local_uid, .. } | ItemRef::Local(local_uid) => {
                    Some((local_uid.as_str(), &item.item))
                }
                ItemRef::Remote(_) => None,
            })
            .collect();
        let mut order: Vec<ItemRef> = self
            .local
            .iter()
            .filter(|item| !removed_local.contains(item.uid.as_str()))
            .filter_map(|item| by_local.get(item.uid.as_str()).map(|r| (*r).clone()))
            .collect();
        order.extend(
            target
                .iter()
                .filter(|item| matches!(item.item, ItemRef::Remote(_)))
                .map(|item| item.item.clone()),
        );
        order
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;

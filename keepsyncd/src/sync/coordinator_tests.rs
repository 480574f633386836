use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize};
use std::time::Duration;

use async_trait::async_trait;
use keepsync_core::{ChangeOutcome, ChangeStatus, RemoteItem, RemoteList, StatusCode};
use keepsync_integrations::ItemOrigin;
use tempfile::TempDir;
use tracing_test::traced_test;

use super::*;
use crate::sync::local_store::SqliteListStore;
use crate::sync::origin::{ItemAdded, RawItemAdded};

const LIST: &str = "list-1";

type FetchHook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct FakeRemote {
    lists: Mutex<Vec<RemoteList>>,
    next_id: AtomicU64,
    fetches: AtomicUsize,
    fetch_error: Mutex<Option<StatusCode>>,
    rejected_texts: Mutex<HashSet<String>>,
    on_fetch: Mutex<Option<FetchHook>>,
}

impl FakeRemote {
    fn with_list(title: &str, items: Vec<RemoteItem>) -> Self {
        let remote = Self::default();
        remote.lists.lock().unwrap().push(RemoteList {
            id: LIST.to_string(),
            title: title.to_string(),
            trashed: false,
            items,
        });
        remote
    }

    fn items(&self) -> Vec<RemoteItem> {
        self.lists
            .lock()
            .unwrap()
            .iter()
            .find(|list| list.id == LIST)
            .map(|list| list.items.clone())
            .unwrap_or_default()
    }

    fn with_list_mut(&self, edit: impl FnOnce(&mut RemoteList)) {
        let mut lists = self.lists.lock().unwrap();
        let list = lists.iter_mut().find(|list| list.id == LIST).unwrap();
        edit(list);
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn set_fetch_error(&self, status: Option<StatusCode>) {
        *self.fetch_error.lock().unwrap() = status;
    }

    fn apply(&self, change: &Change) -> ChangeOutcome {
        let mut lists = self.lists.lock().unwrap();
        let list_id = match change {
            Change::AddItem { list_id, .. }
            | Change::UpdateItem { list_id, .. }
            | Change::RemoveItem { list_id, .. }
            | Change::ReorderList { list_id, .. } => list_id,
        };
        let Some(list) = lists.iter_mut().find(|list| &list.id == list_id) else {
            return failed("no such list");
        };
        match change {
            Change::AddItem { text, checked, .. } => {
                if self.rejected_texts.lock().unwrap().contains(text) {
                    return failed("rejected");
                }
                let id = format!("r{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
                list.items.push(remote_item(&id, text, *checked));
                ChangeOutcome {
                    status: ChangeStatus::Ok,
                    item_id: Some(id),
                    message: None,
                }
            }
            Change::UpdateItem {
                item_id,
                text,
                checked,
                ..
            } => {
                let Some(item) = list.items.iter_mut().find(|item| &item.id == item_id) else {
                    return failed("no such item");
                };
                if let Some(text) = text {
                    item.text = text.clone();
                }
                if let Some(checked) = checked {
                    item.checked = *checked;
                }
                ok()
            }
            Change::RemoveItem { item_id, .. } => {
                list.items.retain(|item| &item.id != item_id);
                ok()
            }
            Change::ReorderList { item_ids, .. } => {
                let mut reordered = Vec::with_capacity(list.items.len());
                for id in item_ids {
                    if let Some(pos) = list.items.iter().position(|item| &item.id == id) {
                        reordered.push(list.items.remove(pos));
                    }
                }
                reordered.append(&mut list.items);
                list.items = reordered;
                ok()
            }
        }
    }
}

fn ok() -> ChangeOutcome {
    ChangeOutcome {
        status: ChangeStatus::Ok,
        item_id: None,
        message: None,
    }
}

fn failed(message: &str) -> ChangeOutcome {
    ChangeOutcome {
        status: ChangeStatus::Failed,
        item_id: None,
        message: Some(message.to_string()),
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn fetch_snapshot(&self) -> Result<Vec<RemoteList>, KeepError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let hook = self.on_fetch.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
        let status = *self.fetch_error.lock().unwrap();
        if let Some(status) = status {
            return Err(KeepError::Api {
                status,
                body: "fake failure".to_string(),
            });
        }
        Ok(self.lists.lock().unwrap().clone())
    }

    async fn mutate(&self, changes: &[Change]) -> Result<Vec<ChangeOutcome>, KeepError> {
        Ok(changes.iter().map(|change| self.apply(change)).collect())
    }
}

/// Local store that can be told to reject item creation, or to let a user
/// add the same text just before the next creation with that text.
struct FlakyLocal {
    inner: SqliteListStore,
    fail_adds: AtomicBool,
    user_add_before: Mutex<Option<String>>,
}

#[async_trait]
impl LocalStore for FlakyLocal {
    async fn ensure_list(&self, list: &SyncedList, name: &str) -> Result<bool, LocalStoreError> {
        self.inner.ensure_list(list, name).await
    }

    async fn has_list(&self, list_id: &str) -> Result<bool, LocalStoreError> {
        self.inner.has_list(list_id).await
    }

    async fn remove_list(&self, list_id: &str) -> Result<(), LocalStoreError> {
        self.inner.remove_list(list_id).await
    }

    async fn get_items(&self, list_id: &str) -> Result<Vec<LocalItem>, LocalStoreError> {
        self.inner.get_items(list_id).await
    }

    async fn add_item(
        &self,
        list_id: &str,
        text: &str,
        completed: bool,
    ) -> Result<String, LocalStoreError> {
        if self.fail_adds.load(Ordering::SeqCst) {
            return Err(LocalStoreError::ListNotFound(list_id.to_string()));
        }
        let user_text = {
            let mut pending = self.user_add_before.lock().unwrap();
            pending.take_if(|pending| pending.as_str() == text)
        };
        if let Some(user_text) = user_text {
            self.inner.add_item(list_id, &user_text, false).await?;
        }
        self.inner.add_item(list_id, text, completed).await
    }

    async fn update_item(
        &self,
        list_id: &str,
        uid: &str,
        text: Option<&str>,
        completed: Option<bool>,
    ) -> Result<(), LocalStoreError> {
        self.inner.update_item(list_id, uid, text, completed).await
    }

    async fn remove_item(&self, list_id: &str, uid: &str) -> Result<(), LocalStoreError> {
        self.inner.remove_item(list_id, uid).await
    }

    async fn reorder_list(&self, list_id: &str, uids: &[String]) -> Result<(), LocalStoreError> {
        self.inner.reorder_list(list_id, uids).await
    }
}

struct Harness {
    _dir: TempDir,
    coordinator: Arc<SyncCoordinator>,
    remote: Arc<FakeRemote>,
    local: Arc<FlakyLocal>,
    state: StateStore,
    tagger: Arc<OriginTagger>,
    added: mpsc::UnboundedReceiver<RawItemAdded>,
    events: mpsc::UnboundedReceiver<SyncEvent>,
}

impl Harness {
    async fn new(remote: FakeRemote) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let state = StateStore::open(dir.path().join("state.db")).await.unwrap();
        let (added_tx, added) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let local = Arc::new(FlakyLocal {
            inner: SqliteListStore::new(state.pool().clone(), added_tx),
            fail_adds: AtomicBool::new(false),
            user_add_before: Mutex::new(None),
        });
        let tagger = Arc::new(OriginTagger::new(Duration::from_secs(60)));
        let remote = Arc::new(remote);
        let shared = SharedParts {
            local: local.clone(),
            state: state.clone(),
            cooldown: Arc::new(CooldownGate::new(Duration::from_secs(60))),
            tagger: tagger.clone(),
            ledger: ForwardLedger::new(),
            events: Some(events_tx),
        };
        let config = CoordinatorConfig {
            account: "alice".to_string(),
            lists: vec![LIST.to_string()],
            list_prefix: "Keep".to_string(),
            policy: ListPolicy::default(),
            fetch_retries: 2,
            backoff: Backoff::new(Duration::from_millis(1), Duration::from_millis(2), false),
        };
        let coordinator = Arc::new(SyncCoordinator::new(config, remote.clone(), shared));
        Self {
            _dir: dir,
            coordinator,
            remote,
            local,
            state,
            tagger,
            added,
            events,
        }
    }

    async fn pass(&self, trigger: PassTrigger) -> PassReport {
        match self.coordinator.run_pass(trigger).await.unwrap() {
            PassOutcome::Completed(report) => report,
            other => panic!("expected a completed pass, got {other:?}"),
        }
    }

    async fn local_items(&self) -> Vec<LocalItem> {
        self.local.get_items(LIST).await.unwrap()
    }

    fn tagged(&mut self) -> Vec<ItemAdded> {
        let mut out = Vec::new();
        while let Ok(raw) = self.added.try_recv() {
            out.extend(self.tagger.classify(&raw).into_item());
        }
        out
    }
}

fn remote_item(id: &str, text: &str, checked: bool) -> RemoteItem {
    RemoteItem {
        id: id.to_string(),
        text: text.to_string(),
        checked,
        show_checkboxes: true,
    }
}

#[tokio::test]
async fn first_pass_pulls_remote_items_and_notifies_once() {
    let mut h = Harness::new(FakeRemote::with_list(
        "Groceries",
        vec![remote_item("1", "milk", false), remote_item("2", "eggs", true)],
    ))
    .await;

    let report = h.pass(PassTrigger::Timer).await;
    assert_eq!(report.pass, 1);
    assert_eq!(report.local_changes, 2);

    let items = h.local_items().await;
    let got: Vec<_> = items
        .iter()
        .map(|item| (item.text.as_str(), item.completed))
        .collect();
    assert_eq!(got, vec![("milk", false), ("eggs", true)]);
    assert_eq!(h.state.load_identity("alice").await.unwrap().len(), 2);

    let tagged = h.tagged();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].text, "milk");
    assert_eq!(tagged[0].origin, ItemOrigin::Remote);
    assert_eq!(h.coordinator.health(), AccountHealth::Online);
}

#[tokio::test]
async fn forwarded_local_item_is_linked_and_not_recreated() {
    let mut h = Harness::new(FakeRemote::with_list("Groceries", vec![])).await;
    h.pass(PassTrigger::Timer).await;

    let uid = h.coordinator.add_local_item(LIST, "bread").await.unwrap();

    let remote_items = h.remote.items();
    assert_eq!(remote_items.len(), 1);
    let identity = h.state.load_identity("alice").await.unwrap();
    assert_eq!(
        identity.by_local(LIST, &uid).map(|entry| entry.remote_id.clone()),
        Some(remote_items[0].id.clone())
    );
    let tagged = h.tagged();
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].origin, ItemOrigin::Local);

    let report = h.pass(PassTrigger::Timer).await;
    assert_eq!(report.remote_changes, 0);
    assert_eq!(report.local_changes, 0);
    assert_eq!(h.remote.items().len(), 1);
    assert_eq!(h.local_items().await.len(), 1);
}

#[tokio::test]
async fn local_completion_and_remote_text_edit_both_survive() {
    let h = Harness::new(FakeRemote::with_list(
        "Groceries",
        vec![remote_item("1", "milk", false)],
    ))
    .await;
    h.pass(PassTrigger::Timer).await;

    h.remote.with_list_mut(|list| list.items[0].text = "oat milk".to_string());
    let uid = h.local_items().await[0].uid.clone();
    h.local
        .update_item(LIST, &uid, None, Some(true))
        .await
        .unwrap();

    h.pass(PassTrigger::Timer).await;

    let remote = &h.remote.items()[0];
    assert_eq!((remote.text.as_str(), remote.checked), ("oat milk", true));
    let local = &h.local_items().await[0];
    assert_eq!((local.text.as_str(), local.completed), ("oat milk", true));
}

#[tokio::test]
async fn later_remote_text_edit_wins_over_earlier_local_edit() {
    let h = Harness::new(FakeRemote::with_list(
        "Groceries",
        vec![remote_item("1", "milk", false)],
    ))
    .await;
    h.pass(PassTrigger::Timer).await;

    let uid = h.local_items().await[0].uid.clone();
    h.local
        .update_item(LIST, &uid, Some("whole milk"), None)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.remote
        .with_list_mut(|list| list.items[0].text = "oat milk".to_string());

    h.pass(PassTrigger::Timer).await;

    assert_eq!(h.remote.items()[0].text, "oat milk");
    assert_eq!(h.local_items().await[0].text, "oat milk");
    let report = h.pass(PassTrigger::Timer).await;
    assert_eq!((report.remote_changes, report.local_changes), (0, 0));
}

#[tokio::test]
async fn blank_item_text_is_rejected_and_never_synced() {
    let h = Harness::new(FakeRemote::with_list(
        "Groceries",
        vec![remote_item("1", "milk", false)],
    ))
    .await;
    h.pass(PassTrigger::Timer).await;
    let uid = h.local_items().await[0].uid.clone();

    let err = h.coordinator.add_local_item(LIST, "   ").await.unwrap_err();
    assert!(matches!(err, PassError::BlankText(ref id) if id == LIST));
    let err = h
        .coordinator
        .update_local_item(LIST, &uid, Some(""), None)
        .await
        .unwrap_err();
    assert!(matches!(err, PassError::BlankText(_)));
    assert_eq!(h.local_items().await.len(), 1);
    assert_eq!(h.remote.items().len(), 1);

    // A blank item written straight to the store stays local-only.
    h.local.add_item(LIST, "  ", false).await.unwrap();
    let first = h.pass(PassTrigger::Timer).await;
    let second = h.pass(PassTrigger::Timer).await;

    assert_eq!(first.remote_changes, 0);
    assert_eq!((second.remote_changes, second.local_changes), (0, 0));
    assert_eq!(h.remote.items().len(), 1);
    assert_eq!(h.local_items().await.len(), 2);
}

#[tokio::test]
async fn same_text_user_add_during_pass_keeps_origins_apart() {
    let mut h = Harness::new(FakeRemote::with_list("Groceries", vec![])).await;
    h.pass(PassTrigger::Timer).await;
    h.remote
        .with_list_mut(|list| list.items.push(remote_item("1", "milk", false)));
    *h.local.user_add_before.lock().unwrap() = Some("milk".to_string());

    h.pass(PassTrigger::Timer).await;

    let identity = h.state.load_identity("alice").await.unwrap();
    let pulled = identity.by_remote(LIST, "1").unwrap().local_uid.clone();
    let items = h.local_items().await;
    assert_eq!(items.len(), 2);
    let user = items
        .iter()
        .map(|item| item.uid.clone())
        .find(|uid| *uid != pulled)
        .unwrap();

    let tagged = h.tagged();
    assert_eq!(tagged.len(), 2);
    let origin_of = |uid: &str| tagged.iter().find(|item| item.uid == uid).unwrap().origin;
    assert_eq!(origin_of(&pulled), ItemOrigin::Remote);
    assert_eq!(origin_of(&user), ItemOrigin::Local);
    assert_eq!(h.tagger.pending(), 0);
}

#[tokio::test]
#[traced_test]
async fn manual_requests_within_cooldown_run_one_pass() {
    let h = Harness::new(FakeRemote::with_list("Groceries", vec![])).await;

    let mut completed = 0;
    for _ in 0..5 {
        match h.coordinator.request_manual_sync().await.unwrap() {
            PassOutcome::Completed(_) => completed += 1,
            PassOutcome::Skipped(reason) => assert_eq!(reason, SkipReason::Cooldown),
        }
    }

    assert_eq!(completed, 1);
    assert_eq!(h.remote.fetches(), 1);
    assert!(logs_contain("manual sync requested during cooldown"));
}

#[tokio::test]
async fn pass_is_skipped_while_another_holds_the_lock() {
    let h = Harness::new(FakeRemote::with_list("Groceries", vec![])).await;
    let guard = h.coordinator.pass_lock.lock().await;

    assert_eq!(
        h.coordinator.run_pass(PassTrigger::Timer).await.unwrap(),
        PassOutcome::Skipped(SkipReason::Busy)
    );
    assert_eq!(
        h.coordinator.request_manual_sync().await.unwrap(),
        PassOutcome::Skipped(SkipReason::Busy)
    );
    assert_eq!(
        h.coordinator.run_pass(PassTrigger::LocalEdit).await.unwrap(),
        PassOutcome::Skipped(SkipReason::Busy)
    );
    assert!(h.coordinator.rerun.load(Ordering::SeqCst));
    drop(guard);

    assert_eq!(h.remote.fetches(), 0);
}

#[tokio::test]
async fn busy_manual_request_leaves_cooldown_unclaimed() {
    let h = Harness::new(FakeRemote::with_list("Groceries", vec![])).await;
    let guard = h.coordinator.pass_lock.lock().await;
    assert_eq!(
        h.coordinator.request_manual_sync().await.unwrap(),
        PassOutcome::Skipped(SkipReason::Busy)
    );
    drop(guard);

    assert!(matches!(
        h.coordinator.request_manual_sync().await.unwrap(),
        PassOutcome::Completed(_)
    ));
    assert_eq!(
        h.coordinator.request_manual_sync().await.unwrap(),
        PassOutcome::Skipped(SkipReason::Cooldown)
    );
    assert_eq!(h.remote.fetches(), 1);
}

#[tokio::test]
async fn edit_during_pass_triggers_one_follow_up() {
    let h = Harness::new(FakeRemote::with_list("Groceries", vec![])).await;
    let coordinator = h.coordinator.clone();
    *h.remote.on_fetch.lock().unwrap() = Some(Box::new(move || coordinator.note_local_edit()));

    let report = h.pass(PassTrigger::Timer).await;

    assert_eq!(report.pass, 2);
    assert_eq!(h.remote.fetches(), 2);
    assert_eq!(h.state.pass_counter("alice").await.unwrap(), 2);
}

#[tokio::test]
async fn auth_failure_halts_until_resumed() {
    let h = Harness::new(FakeRemote::with_list("Groceries", vec![])).await;
    h.remote.set_fetch_error(Some(StatusCode::UNAUTHORIZED));

    let err = h.coordinator.run_pass(PassTrigger::Timer).await.unwrap_err();
    assert!(matches!(err, PassError::Auth(_)));
    assert!(h.coordinator.is_halted());
    assert_eq!(h.coordinator.health(), AccountHealth::Error);
    assert_eq!(h.remote.fetches(), 1);

    assert_eq!(
        h.coordinator.request_manual_sync().await.unwrap(),
        PassOutcome::Skipped(SkipReason::Halted)
    );
    assert_eq!(h.remote.fetches(), 1);

    h.remote.set_fetch_error(None);
    h.coordinator.resume();
    h.pass(PassTrigger::Timer).await;
    assert_eq!(h.coordinator.health(), AccountHealth::Online);
    assert!(h.coordinator.last_error().is_none());
}

#[tokio::test]
async fn transient_fetch_failure_retries_then_aborts_without_commit() {
    let h = Harness::new(FakeRemote::with_list(
        "Groceries",
        vec![remote_item("1", "milk", false)],
    ))
    .await;
    h.remote.set_fetch_error(Some(StatusCode::SERVICE_UNAVAILABLE));

    let err = h.coordinator.run_pass(PassTrigger::Timer).await.unwrap_err();

    assert!(matches!(err, PassError::Transient(_)));
    assert_eq!(h.remote.fetches(), 3);
    assert_eq!(h.state.pass_counter("alice").await.unwrap(), 0);
    assert_eq!(h.coordinator.health(), AccountHealth::Offline);
    assert!(!h.coordinator.is_halted());
    assert!(h.local_items().await.is_empty());
}

#[tokio::test]
async fn partial_remote_failure_keeps_successful_links_and_retries_rest() {
    let h = Harness::new(FakeRemote::with_list("Groceries", vec![])).await;
    h.pass(PassTrigger::Timer).await;
    let bread = h.local.add_item(LIST, "bread", false).await.unwrap();
    h.local.add_item(LIST, "tea", false).await.unwrap();
    h.remote
        .rejected_texts
        .lock()
        .unwrap()
        .insert("tea".to_string());

    let err = h.coordinator.run_pass(PassTrigger::Timer).await.unwrap_err();
    assert!(matches!(
        err,
        PassError::PartialRemote {
            failed: 1,
            total: 2
        }
    ));
    let identity = h.state.load_identity("alice").await.unwrap();
    assert!(identity.by_local(LIST, &bread).is_some());
    assert_eq!(h.state.pass_counter("alice").await.unwrap(), 1);

    h.remote.rejected_texts.lock().unwrap().clear();
    h.pass(PassTrigger::Timer).await;

    let mut texts: Vec<_> = h.remote.items().into_iter().map(|item| item.text).collect();
    texts.sort();
    assert_eq!(texts, vec!["bread", "tea"]);
}

#[tokio::test]
async fn local_apply_failure_aborts_before_commit() {
    let h = Harness::new(FakeRemote::with_list("Groceries", vec![])).await;
    h.pass(PassTrigger::Timer).await;
    h.remote
        .with_list_mut(|list| list.items.push(remote_item("1", "milk", false)));
    h.local.fail_adds.store(true, Ordering::SeqCst);

    let err = h.coordinator.run_pass(PassTrigger::Timer).await.unwrap_err();
    assert!(matches!(err, PassError::Local(_)));
    assert_eq!(h.tagger.pending(), 0);
    assert_eq!(h.state.pass_counter("alice").await.unwrap(), 1);

    h.local.fail_adds.store(false, Ordering::SeqCst);
    h.pass(PassTrigger::Timer).await;
    let items = h.local_items().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].text, "milk");
}

#[tokio::test]
async fn list_with_forward_in_flight_is_deferred() {
    let h = Harness::new(FakeRemote::with_list(
        "Groceries",
        vec![remote_item("1", "milk", false)],
    ))
    .await;
    let in_flight = h.coordinator.shared.ledger.begin("alice", LIST);

    let report = h.pass(PassTrigger::Timer).await;
    assert_eq!(report.deferred_lists, vec![LIST.to_string()]);
    assert!(h.local_items().await.is_empty());

    drop(in_flight);
    let report = h.pass(PassTrigger::Timer).await;
    assert!(report.deferred_lists.is_empty());
    assert_eq!(h.local_items().await.len(), 1);
}

#[tokio::test]
async fn vanished_remote_list_is_unlinked_and_announced() {
    let mut h = Harness::new(FakeRemote::with_list(
        "Groceries",
        vec![remote_item("1", "milk", false)],
    ))
    .await;
    h.pass(PassTrigger::Timer).await;
    h.remote.lists.lock().unwrap().clear();

    let report = h.pass(PassTrigger::Timer).await;

    assert_eq!(report.removed_lists, vec![LIST.to_string()]);
    assert!(!h.local.has_list(LIST).await.unwrap());
    assert!(h.coordinator.lists().is_empty());
    assert!(h.state.load_identity("alice").await.unwrap().is_empty());
    assert_eq!(
        h.events.try_recv().unwrap(),
        SyncEvent::ListRemoved {
            account: "alice".to_string(),
            list_id: LIST.to_string(),
        }
    );
}

#[tokio::test]
async fn remote_title_change_renames_local_list() {
    let h = Harness::new(FakeRemote::with_list("Groceries", vec![])).await;
    h.pass(PassTrigger::Timer).await;
    assert_eq!(
        h.local.inner.list_name(LIST).await.unwrap().as_deref(),
        Some("Keep Groceries")
    );

    h.remote
        .with_list_mut(|list| list.title = "Shopping".to_string());
    h.pass(PassTrigger::Timer).await;

    assert_eq!(
        h.local.inner.list_name(LIST).await.unwrap().as_deref(),
        Some("Keep Shopping")
    );
}

#[tokio::test]
async fn forwarded_update_and_remove_reach_remote() {
    let h = Harness::new(FakeRemote::with_list(
        "Groceries",
        vec![remote_item("1", "milk", false)],
    ))
    .await;
    h.pass(PassTrigger::Timer).await;
    let uid = h.local_items().await[0].uid.clone();

    h.coordinator
        .update_local_item(LIST, &uid, None, Some(true))
        .await
        .unwrap();
    assert!(h.remote.items()[0].checked);

    h.coordinator.remove_local_item(LIST, &uid).await.unwrap();
    assert!(h.remote.items().is_empty());
    assert!(h.local_items().await.is_empty());

    let report = h.pass(PassTrigger::Timer).await;
    assert_eq!(report.remote_changes, 0);
}

#[tokio::test]
async fn edits_to_unsynchronized_lists_are_rejected() {
    let h = Harness::new(FakeRemote::with_list("Groceries", vec![])).await;
    let err = h.coordinator.add_local_item("list-9", "milk").await.unwrap_err();
    assert!(matches!(err, PassError::UnknownList(id) if id == "list-9"));
}

#[test]
fn list_names_join_prefix_and_title() {
    assert_eq!(local_list_name("Keep", "Groceries"), "Keep Groceries");
    assert_eq!(local_list_name("", "Groceries"), "Groceries");
}

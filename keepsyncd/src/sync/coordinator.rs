//! Per-account orchestration of synchronization passes.
//!
//! One coordinator serves one account. Every pass runs under the account's
//! single-flight lock: fetch, read local, reconcile, apply remote, apply
//! local, commit. Local edits are forwarded outside the lock.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use keepsync_core::{Change, KeepError};
use keepsync_integrations::AccountHealth;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::backoff::Backoff;
use super::cooldown::CooldownGate;
use super::ledger::ForwardLedger;
use super::local_store::{LocalStore, LocalStoreError};
use super::model::{
    AgreedItem, AgreedList, AgreedSnapshot, IdentityEntry, ItemRef, LocalItem, LocalOp,
    LocalSnapshot, Reconciliation, RemoteOp, RemoteSnapshot, SyncedList,
};
use super::now_ms;
use super::origin::OriginTagger;
use super::policy::ListPolicy;
use super::reconcile::reconcile;
use super::remote::RemoteStore;
use super::state_store::{StateStore, StoreError};

#[derive(Debug, Error)]
pub enum PassError {
    #[error("remote credential rejected: {0}")]
    Auth(#[source] KeepError),
    #[error("remote unreachable: {0}")]
    Transient(#[source] KeepError),
    #[error("remote request failed: {0}")]
    Remote(#[source] KeepError),
    #[error("{failed} of {total} remote changes failed")]
    PartialRemote { failed: usize, total: usize },
    #[error("local store error: {0}")]
    Local(#[from] LocalStoreError),
    #[error("state store error: {0}")]
    Store(#[from] StoreError),
    #[error("list {0} is not synchronized")]
    UnknownList(String),
    #[error("item text in list {0} is blank")]
    BlankText(String),
}

impl PassError {
    fn from_remote(err: KeepError) -> Self {
        if err.is_auth() {
            PassError::Auth(err)
        } else if err.is_retryable() {
            PassError::Transient(err)
        } else {
            PassError::Remote(err)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTrigger {
    Timer,
    Manual,
    LocalEdit,
}

impl PassTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            PassTrigger::Timer => "timer",
            PassTrigger::Manual => "manual",
            PassTrigger::LocalEdit => "local_edit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Cooldown,
    Busy,
    Halted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub pass: u64,
    pub remote_changes: usize,
    pub local_changes: usize,
    pub anomalies: usize,
    pub deferred_lists: Vec<String>,
    pub removed_lists: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Completed(PassReport),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    ListRemoved { account: String, list_id: String },
}

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub account: String,
    pub lists: Vec<String>,
    pub list_prefix: String,
    pub policy: ListPolicy,
    pub fetch_retries: u32,
    pub backoff: Backoff,
}

/// Collaborators shared by every account's coordinator.
#[derive(Clone)]
pub struct SharedParts {
    pub local: Arc<dyn LocalStore>,
    pub state: StateStore,
    pub cooldown: Arc<CooldownGate>,
    pub tagger: Arc<OriginTagger>,
    pub ledger: Arc<ForwardLedger>,
    pub events: Option<mpsc::UnboundedSender<SyncEvent>>,
}

pub struct SyncCoordinator {
    config: CoordinatorConfig,
    lists: RwLock<Vec<String>>,
    remote: Arc<dyn RemoteStore>,
    shared: SharedParts,
    pass_lock: tokio::sync::Mutex<()>,
    rerun: AtomicBool,
    halted: AtomicBool,
    status: Mutex<(AccountHealth, Option<String>)>,
}

/// Name of the local list entity mirroring a remote list.
pub fn local_list_name(prefix: &str, title: &str) -> String {
    format!("{prefix} {title}").trim().to_string()
}

impl SyncCoordinator {
    pub fn new(config: CoordinatorConfig, remote: Arc<dyn RemoteStore>, shared: SharedParts) -> Self {
        Self {
            lists: RwLock::new(config.lists.clone()),
            config,
            remote,
            shared,
            pass_lock: tokio::sync::Mutex::new(()),
            rerun: AtomicBool::new(false),
            halted: AtomicBool::new(false),
            status: Mutex::new((AccountHealth::Offline, None)),
        }
    }

    pub fn account(&self) -> &str {
        &self.config.account
    }

    /// Remote list ids currently synchronized.
    pub fn lists(&self) -> Vec<String> {
        match self.lists.read() {
            Ok(lists) => lists.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn health(&self) -> AccountHealth {
        self.status_guard().0
    }

    pub fn last_error(&self) -> Option<String> {
        self.status_guard().1.clone()
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Lifts an authentication halt once the credential has been refreshed.
    pub fn resume(&self) {
        if self.halted.swap(false, Ordering::SeqCst) {
            info!(account = %self.config.account, "passes resumed");
            self.set_status(AccountHealth::Offline, None);
        }
    }

    /// Manual sync of every list of the account, gated by the cooldown.
    pub async fn request_manual_sync(&self) -> Result<PassOutcome, PassError> {
        self.run_pass(PassTrigger::Manual).await
    }

    /// Queues a follow-up pass for an edit made while a pass may be running.
    pub fn note_local_edit(&self) {
        self.rerun.store(true, Ordering::SeqCst);
    }

    pub fn spawn_pass(self: &Arc<Self>, trigger: PassTrigger) {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = coordinator.run_pass(trigger).await {
                debug!(account = %coordinator.config.account, error = %err, "background pass failed");
            }
        });
    }

    pub async fn run_pass(&self, trigger: PassTrigger) -> Result<PassOutcome, PassError> {
        let account = self.config.account.as_str();
        if self.is_halted() {
            if trigger == PassTrigger::Manual {
                warn!(account, "sync halted until the credential is refreshed");
            } else {
                debug!(account, trigger = trigger.as_str(), "sync halted, skipping pass");
            }
            return Ok(PassOutcome::Skipped(SkipReason::Halted));
        }
        if trigger == PassTrigger::LocalEdit {
            self.note_local_edit();
        }

        let Ok(mut guard) = self.pass_lock.try_lock() else {
            match trigger {
                PassTrigger::Manual => warn!(account, "sync already running, manual request rejected"),
                PassTrigger::Timer => debug!(account, "sync already running, skipping timer pass"),
                PassTrigger::LocalEdit => debug!(account, "sync already running, follow-up queued"),
            }
            return Ok(PassOutcome::Skipped(SkipReason::Busy));
        };
        // Only a manual request that will actually run claims the window.
        if trigger == PassTrigger::Manual && !self.shared.cooldown.try_acquire(account) {
            warn!(
                account,
                cooldown_secs = self.shared.cooldown.period().as_secs(),
                "manual sync requested during cooldown, ignoring"
            );
            return Ok(PassOutcome::Skipped(SkipReason::Cooldown));
        }

        let mut trigger = trigger;
        loop {
            // This pass covers every edit that queued a follow-up so far.
            self.rerun.store(false, Ordering::SeqCst);
            let result = self.locked_pass(trigger).await;
            drop(guard);
            self.record_result(&result);
            if result.is_err() || !self.rerun.load(Ordering::SeqCst) {
                return result.map(PassOutcome::Completed);
            }
            match self.pass_lock.try_lock() {
                Ok(next) => {
                    guard = next;
                    trigger = PassTrigger::LocalEdit;
                }
                Err(_) => return result.map(PassOutcome::Completed),
            }
        }
    }

    async fn locked_pass(&self, trigger: PassTrigger) -> Result<PassReport, PassError> {
        let account = self.config.account.as_str();
        let agreed = self.shared.state.load_agreed(account).await?;
        let pass = agreed.pass + 1;
        debug!(account, pass, trigger = trigger.as_str(), "pass started");

        let fetched_at = now_ms();
        let lists = self
            .config
            .backoff
            .retry(self.config.fetch_retries, KeepError::is_retryable, || {
                self.remote.fetch_snapshot()
            })
            .await
            .map_err(PassError::from_remote)?;
        let remote = RemoteSnapshot {
            pass,
            fetched_at,
            lists,
        };

        let (local, vanished) = self.read_local(&remote).await?;
        let (local, deferred) = self.defer_in_flight(local);
        let identity = self.shared.state.load_identity(account).await?;

        let plan = reconcile(&agreed, &remote, &local, &identity, &self.config.policy);
        for anomaly in &plan.anomalies {
            warn!(account, ?anomaly, "anomalous remote snapshot data");
        }
        if plan.is_noop() {
            debug!(account, pass, "lists already agree");
        }

        let created_remote = self.apply_remote(&plan).await?;
        let created_local = self.apply_local(&plan).await?;

        let next = next_agreed(&agreed, &plan, pass, &created_remote, &created_local, &self.lists());
        self.shared
            .state
            .commit_pass(account, &next, &plan.identity_updates)
            .await?;

        let mut removed = plan.removed_lists.clone();
        removed.extend(vanished);
        for list_id in &removed {
            self.drop_list(list_id).await?;
        }

        let report = PassReport {
            pass,
            remote_changes: plan.remote_ops.len(),
            local_changes: plan.local_ops.len(),
            anomalies: plan.anomalies.len(),
            deferred_lists: deferred,
            removed_lists: removed,
        };
        info!(
            account,
            pass,
            remote_changes = report.remote_changes,
            local_changes = report.local_changes,
            deferred = report.deferred_lists.len(),
            "pass committed"
        );
        Ok(report)
    }

    /// Creates or renames local lists for active remote lists and reads them.
    /// Also returns configured lists that exist on neither side.
    async fn read_local(
        &self,
        remote: &RemoteSnapshot,
    ) -> Result<(LocalSnapshot, Vec<String>), PassError> {
        let local_store = &self.shared.local;
        let mut snapshot = LocalSnapshot::default();
        let mut vanished = Vec::new();
        for list_id in self.lists() {
            if let Some(list) = remote.list(&list_id).filter(|list| !list.trashed) {
                let name = local_list_name(&self.config.list_prefix, &list.title);
                if local_store
                    .ensure_list(&SyncedList::for_remote(&list_id), &name)
                    .await?
                {
                    info!(account = %self.config.account, list_id = %list_id, name = %name, "local list created");
                }
            } else if !local_store.has_list(&list_id).await? {
                vanished.push(list_id);
                continue;
            }
            let items = local_store.get_items(&list_id).await?;
            snapshot.lists.insert(list_id, items);
        }
        Ok((snapshot, vanished))
    }

    /// Holds back lists with a forwarded creation still in flight.
    fn defer_in_flight(&self, mut local: LocalSnapshot) -> (LocalSnapshot, Vec<String>) {
        let in_flight = self.shared.ledger.in_flight_lists(&self.config.account);
        let deferred: Vec<String> = local
            .lists
            .keys()
            .filter(|list_id| in_flight.contains(*list_id))
            .cloned()
            .collect();
        for list_id in &deferred {
            debug!(account = %self.config.account, list_id = %list_id, "local creation in flight, deferring list");
            local.lists.remove(list_id);
        }
        (local, deferred)
    }

    /// Applies add/update/remove, then reorders once new ids are known.
    /// Returns the remote ids assigned to local creations.
    async fn apply_remote(
        &self,
        plan: &Reconciliation,
    ) -> Result<HashMap<(String, String), String>, PassError> {
        let account = self.config.account.as_str();
        let mut created = HashMap::new();

        let edits: Vec<&RemoteOp> = plan
            .remote_ops
            .iter()
            .filter(|op| !matches!(op, RemoteOp::Reorder { .. }))
            .collect();
        let changes: Vec<Change> = edits.iter().filter_map(|op| edit_change(op)).collect();
        let outcomes = self
            .remote
            .mutate(&changes)
            .await
            .map_err(PassError::from_remote)?;

        let mut failed = 0;
        for (op, outcome) in edits.iter().zip(&outcomes) {
            if !outcome.is_ok() {
                failed += 1;
                warn!(account, ?op, message = ?outcome.message, "remote change rejected");
                continue;
            }
            let RemoteOp::Add {
                list_id, local_uid, ..
            } = op
            else {
                continue;
            };
            let Some(remote_id) = outcome.item_id.clone() else {
                failed += 1;
                warn!(account, list_id = %list_id, local_uid = %local_uid, "remote add returned no item id");
                continue;
            };
            self.shared
                .state
                .link(
                    account,
                    &IdentityEntry {
                        list_id: list_id.clone(),
                        remote_id: remote_id.clone(),
                        local_uid: local_uid.clone(),
                        linked_at: now_ms(),
                    },
                )
                .await?;
            created.insert((list_id.clone(), local_uid.clone()), remote_id);
        }
        if failed > 0 {
            return Err(PassError::PartialRemote {
                failed,
                total: changes.len(),
            });
        }

        let reorders: Vec<Change> = plan
            .remote_ops
            .iter()
            .filter_map(|op| match op {
                RemoteOp::Reorder { list_id, order } => Some(Change::ReorderList {
                    list_id: list_id.clone(),
                    item_ids: order
                        .iter()
                        .filter_map(|item| remote_id_of(list_id, item, &created))
                        .collect(),
                }),
                _ => None,
            })
            .collect();
        let outcomes = self
            .remote
            .mutate(&reorders)
            .await
            .map_err(PassError::from_remote)?;
        let failed = outcomes.iter().filter(|outcome| !outcome.is_ok()).count();
        if failed > 0 {
            return Err(PassError::PartialRemote {
                failed,
                total: reorders.len(),
            });
        }
        Ok(created)
    }

    /// Applies local operations in order. Returns the uids of local creations.
    async fn apply_local(
        &self,
        plan: &Reconciliation,
    ) -> Result<HashMap<(String, String), String>, PassError> {
        let account = self.config.account.as_str();
        let local_store = &self.shared.local;
        let mut created = HashMap::new();
        for op in &plan.local_ops {
            match op {
                LocalOp::Add {
                    list_id,
                    remote_id,
                    text,
                    completed,
                    notify,
                } => {
                    self.shared.tagger.expect(list_id, text, *notify);
                    let uid = match local_store.add_item(list_id, text, *completed).await {
                        Ok(uid) => uid,
                        Err(err) => {
                            self.shared.tagger.forget(list_id, text);
                            return Err(err.into());
                        }
                    };
                    self.shared.tagger.bind(list_id, text, &uid);
                    self.shared
                        .state
                        .link(
                            account,
                            &IdentityEntry {
                                list_id: list_id.clone(),
                                remote_id: remote_id.clone(),
                                local_uid: uid.clone(),
                                linked_at: now_ms(),
                            },
                        )
                        .await?;
                    created.insert((list_id.clone(), remote_id.clone()), uid);
                }
                LocalOp::Update {
                    list_id,
                    local_uid,
                    text,
                    completed,
                } => {
                    local_store
                        .update_item(list_id, local_uid, text.as_deref(), *completed)
                        .await?;
                }
                LocalOp::Remove { list_id, local_uid } => {
                    local_store.remove_item(list_id, local_uid).await?;
                }
                LocalOp::Reorder { list_id, order } => {
                    let uids: Vec<String> = order
                        .iter()
                        .filter_map(|item| local_uid_of(list_id, item, &created))
                        .collect();
                    local_store.reorder_list(list_id, &uids).await?;
                }
            }
        }
        Ok(created)
    }

    /// Unlinks a list that no longer exists remotely.
    async fn drop_list(&self, list_id: &str) -> Result<(), PassError> {
        let account = self.config.account.as_str();
        self.shared.state.purge_list(account, list_id).await?;
        self.shared.local.remove_list(list_id).await?;
        match self.lists.write() {
            Ok(mut lists) => lists.retain(|id| id != list_id),
            Err(poisoned) => poisoned.into_inner().retain(|id| id != list_id),
        }
        info!(account, list_id, "remote list gone, unlinked");
        if let Some(events) = &self.shared.events {
            let _ = events.send(SyncEvent::ListRemoved {
                account: account.to_string(),
                list_id: list_id.to_string(),
            });
        }
        Ok(())
    }

    pub async fn list_items(&self, list_id: &str) -> Result<Vec<LocalItem>, PassError> {
        self.require_list(list_id)?;
        Ok(self.shared.local.get_items(list_id).await?)
    }

    /// Adds an item locally and forwards it. A failed forward is left for the
    /// next pass to create.
    pub async fn add_local_item(&self, list_id: &str, text: &str) -> Result<String, PassError> {
        self.require_list(list_id)?;
        require_text(list_id, Some(text))?;
        let account = self.config.account.as_str();
        let _in_flight = self.shared.ledger.begin(account, list_id);
        let uid = self.shared.local.add_item(list_id, text, false).await?;
        if self.is_halted() {
            return Ok(uid);
        }

        let change = Change::AddItem {
            list_id: list_id.to_string(),
            text: text.to_string(),
            checked: false,
        };
        match self.remote.mutate(&[change]).await {
            Ok(outcomes) => {
                if let Some(outcome) = outcomes.first()
                    && outcome.is_ok()
                    && let Some(remote_id) = outcome.item_id.clone()
                {
                    self.shared
                        .state
                        .link(
                            account,
                            &IdentityEntry {
                                list_id: list_id.to_string(),
                                remote_id,
                                local_uid: uid.clone(),
                                linked_at: now_ms(),
                            },
                        )
                        .await?;
                    debug!(account, list_id, uid = %uid, "local item forwarded");
                } else {
                    warn!(account, list_id, "remote rejected forwarded item, next pass retries");
                }
            }
            Err(err) => self.forward_failed(err),
        }
        Ok(uid)
    }

    pub async fn update_local_item(
        &self,
        list_id: &str,
        uid: &str,
        text: Option<&str>,
        completed: Option<bool>,
    ) -> Result<(), PassError> {
        self.require_list(list_id)?;
        require_text(list_id, text)?;
        self.shared
            .local
            .update_item(list_id, uid, text, completed)
            .await?;
        let Some(remote_id) = self.linked_remote_id(list_id, uid).await? else {
            return Ok(());
        };
        self.forward(Change::UpdateItem {
            list_id: list_id.to_string(),
            item_id: remote_id,
            text: text.map(str::to_string),
            checked: completed,
        })
        .await;
        Ok(())
    }

    pub async fn remove_local_item(&self, list_id: &str, uid: &str) -> Result<(), PassError> {
        self.require_list(list_id)?;
        self.shared.local.remove_item(list_id, uid).await?;
        let Some(remote_id) = self.linked_remote_id(list_id, uid).await? else {
            return Ok(());
        };
        self.forward(Change::RemoveItem {
            list_id: list_id.to_string(),
            item_id: remote_id,
        })
        .await;
        Ok(())
    }

    async fn linked_remote_id(&self, list_id: &str, uid: &str) -> Result<Option<String>, PassError> {
        let identity = self
            .shared
            .state
            .load_identity(&self.config.account)
            .await?;
        Ok(identity
            .by_local(list_id, uid)
            .map(|entry| entry.remote_id.clone()))
    }

    async fn forward(&self, change: Change) {
        if self.is_halted() {
            return;
        }
        match self.remote.mutate(std::slice::from_ref(&change)).await {
            Ok(outcomes) if outcomes.iter().all(|outcome| outcome.is_ok()) => {
                debug!(account = %self.config.account, ?change, "local edit forwarded");
            }
            Ok(_) => warn!(
                account = %self.config.account,
                ?change,
                "remote rejected forwarded edit, next pass reconciles"
            ),
            Err(err) => self.forward_failed(err),
        }
    }

    fn forward_failed(&self, err: KeepError) {
        warn!(account = %self.config.account, error = %err, "forwarding local edit failed, next pass reconciles");
        if err.is_auth() {
            self.record_result(&Err(PassError::Auth(err)));
        }
    }

    fn require_list(&self, list_id: &str) -> Result<(), PassError> {
        if self.lists().iter().any(|id| id == list_id) {
            Ok(())
        } else {
            Err(PassError::UnknownList(list_id.to_string()))
        }
    }

    fn record_result(&self, result: &Result<PassReport, PassError>) {
        let account = self.config.account.as_str();
        match result {
            Ok(_) => self.set_status(AccountHealth::Online, None),
            Err(PassError::Auth(err)) => {
                self.halted.store(true, Ordering::SeqCst);
                error!(account, error = %err, "authentication failed, passes halted");
                self.set_status(AccountHealth::Error, Some(err.to_string()));
            }
            Err(PassError::Transient(err)) => {
                warn!(account, error = %err, "remote unreachable, retrying next pass");
                self.set_status(AccountHealth::Offline, Some(err.to_string()));
            }
            Err(err) => {
                warn!(account, error = %err, "pass aborted without commit");
                self.set_status(AccountHealth::Error, Some(err.to_string()));
            }
        }
    }

    fn set_status(&self, health: AccountHealth, last_error: Option<String>) {
        *self.status_guard() = (health, last_error);
    }

    fn status_guard(&self) -> std::sync::MutexGuard<'_, (AccountHealth, Option<String>)> {
        match self.status.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Blank items are never synced, so they are never created or written.
fn require_text(list_id: &str, text: Option<&str>) -> Result<(), PassError> {
    match text {
        Some(text) if text.trim().is_empty() => Err(PassError::BlankText(list_id.to_string())),
        _ => Ok(()),
    }
}

fn edit_change(op: &RemoteOp) -> Option<Change> {
    match op {
        RemoteOp::Add {
            list_id,
            text,
            completed,
            ..
        } => Some(Change::AddItem {
            list_id: list_id.clone(),
            text: text.clone(),
            checked: *completed,
        }),
        RemoteOp::Update {
            list_id,
            remote_id,
            text,
            completed,
        } => Some(Change::UpdateItem {
            list_id: list_id.clone(),
            item_id: remote_id.clone(),
            text: text.clone(),
            checked: *completed,
        }),
        RemoteOp::Remove { list_id, remote_id } => Some(Change::RemoveItem {
            list_id: list_id.clone(),
            item_id: remote_id.clone(),
        }),
        RemoteOp::Reorder { .. } => None,
    }
}

fn remote_id_of(
    list_id: &str,
    item: &ItemRef,
    created: &HashMap<(String, String), String>,
) -> Option<String> {
    match item {
        ItemRef::Paired { remote_id, .. } | ItemRef::Remote(remote_id) => Some(remote_id.clone()),
        ItemRef::Local(uid) => created.get(&(list_id.to_string(), uid.clone())).cloned(),
    }
}

fn local_uid_of(
    list_id: &str,
    item: &ItemRef,
    created: &HashMap<(String, String), String>,
) -> Option<String> {
    match item {
        ItemRef::Paired { local_uid, .. } | ItemRef::Local(local_uid) => Some(local_uid.clone()),
        ItemRef::Remote(remote_id) => created
            .get(&(list_id.to_string(), remote_id.clone()))
            .cloned(),
    }
}

/// Agreed state after a fully applied pass. Deferred lists keep their old
/// base; lists that are no longer synchronized are dropped.
fn next_agreed(
    previous: &AgreedSnapshot,
    plan: &Reconciliation,
    pass: u64,
    created_remote: &HashMap<(String, String), String>,
    created_local: &HashMap<(String, String), String>,
    active: &[String],
) -> AgreedSnapshot {
    let removed: HashSet<&String> = plan.removed_lists.iter().collect();
    let mut lists: BTreeMap<String, AgreedList> = previous
        .lists
        .iter()
        .filter(|(list_id, _)| active.contains(*list_id) && !removed.contains(list_id))
        .map(|(list_id, list)| (list_id.clone(), list.clone()))
        .collect();

    for list_plan in &plan.plans {
        let items = list_plan
            .items
            .iter()
            .filter_map(|target| {
                let remote_id = remote_id_of(&list_plan.list_id, &target.item, created_remote)?;
                let local_uid = local_uid_of(&list_plan.list_id, &target.item, created_local)?;
                Some(AgreedItem {
                    remote_id,
                    local_uid,
                    text: target.text.clone(),
                    completed: target.completed,
                })
            })
            .collect();
        lists.insert(
            list_plan.list_id.clone(),
            AgreedList {
                title: list_plan.title.clone(),
                fetched_at: list_plan.fetched_at,
                items,
            },
        );
    }

    AgreedSnapshot { pass, lists }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;

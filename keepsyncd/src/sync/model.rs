use std::collections::{BTreeMap, HashMap};

pub use keepsync_core::{RemoteItem, RemoteList};

/// One line of a local list entity as the host platform reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalItem {
    pub uid: String,
    pub text: String,
    pub completed: bool,
    /// Wall-clock time of the last write, in milliseconds.
    pub updated_at: i64,
}

/// Pairing of a remote list with the local list entity that mirrors it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedList {
    pub remote_list_id: String,
    pub local_list_id: String,
}

impl SyncedList {
    pub fn for_remote(remote_list_id: &str) -> Self {
        Self {
            remote_list_id: remote_list_id.to_string(),
            local_list_id: format!("keep.list.{remote_list_id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSnapshot {
    pub pass: u64,
    /// Time the fetch was started, in milliseconds.
    pub fetched_at: i64,
    pub lists: Vec<RemoteList>,
}

impl RemoteSnapshot {
    pub fn list(&self, list_id: &str) -> Option<&RemoteList> {
        self.lists.iter().find(|list| list.id == list_id)
    }
}

/// Local items keyed by remote list id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalSnapshot {
    pub lists: BTreeMap<String, Vec<LocalItem>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgreedItem {
    pub remote_id: String,
    pub local_uid: String,
    pub text: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgreedList {
    pub title: String,
    /// Fetch time of the remote snapshot this list was agreed against.
    pub fetched_at: i64,
    /// Items in remote order.
    pub items: Vec<AgreedItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgreedSnapshot {
    pub pass: u64,
    pub lists: BTreeMap<String, AgreedList>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityEntry {
    pub list_id: String,
    pub remote_id: String,
    pub local_uid: String,
    /// When both sides were first known to hold the item, in milliseconds.
    pub linked_at: i64,
}

/// Bidirectional `remote_id <-> local_uid` mapping, scoped per list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityMap {
    by_remote: BTreeMap<(String, String), IdentityEntry>,
    by_local: HashMap<(String, String), String>,
}

impl IdentityMap {
    pub fn from_entries(entries: impl IntoIterator<Item = IdentityEntry>) -> Self {
        let mut map = Self::default();
        for entry in entries {
            map.insert(entry);
        }
        map
    }

    /// Inserts a link, displacing any link that claimed either id in the same list.
    pub fn insert(&mut self, entry: IdentityEntry) {
        let remote_key = (entry.list_id.clone(), entry.remote_id.clone());
        let local_key = (entry.list_id.clone(), entry.local_uid.clone());
        if let Some(previous) = self.by_remote.remove(&remote_key) {
            self.by_local
                .remove(&(previous.list_id.clone(), previous.local_uid.clone()));
        }
        if let Some(previous_remote) = self.by_local.remove(&local_key) {
            self.by_remote
                .remove(&(entry.list_id.clone(), previous_remote));
        }
        self.by_local.insert(local_key, entry.remote_id.clone());
        self.by_remote.insert(remote_key, entry);
    }

    pub fn remove(&mut self, list_id: &str, remote_id: &str) -> Option<IdentityEntry> {
        let entry = self
            .by_remote
            .remove(&(list_id.to_string(), remote_id.to_string()))?;
        self.by_local
            .remove(&(entry.list_id.clone(), entry.local_uid.clone()));
        Some(entry)
    }

    pub fn by_remote(&self, list_id: &str, remote_id: &str) -> Option<&IdentityEntry> {
        self.by_remote
            .get(&(list_id.to_string(), remote_id.to_string()))
    }

    pub fn by_local(&self, list_id: &str, local_uid: &str) -> Option<&IdentityEntry> {
        let remote_id = self
            .by_local
            .get(&(list_id.to_string(), local_uid.to_string()))?;
        self.by_remote(list_id, remote_id)
    }

    pub fn entries_for<'a>(&'a self, list_id: &'a str) -> impl Iterator<Item = &'a IdentityEntry> {
        self.by_remote
            .values()
            .filter(move |entry| entry.list_id == list_id)
    }

    pub fn len(&self) -> usize {
        self.by_remote.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_remote.is_empty()
    }
}

/// Reference to an item in a merge target, before or after it has ids on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemRef {
    Paired { remote_id: String, local_uid: String },
    /// Exists remotely, will be created locally.
    Remote(String),
    /// Exists locally, will be created remotely.
    Local(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOp {
    Add {
        list_id: String,
        local_uid: String,
        text: String,
        completed: bool,
    },
    Update {
        list_id: String,
        remote_id: String,
        text: Option<String>,
        completed: Option<bool>,
    },
    Remove {
        list_id: String,
        remote_id: String,
    },
    Reorder {
        list_id: String,
        order: Vec<ItemRef>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalOp {
    Add {
        list_id: String,
        remote_id: String,
        text: String,
        completed: bool,
        /// Raise an item-added notification for this creation.
        notify: bool,
    },
    Update {
        list_id: String,
        local_uid: String,
        text: Option<String>,
        completed: Option<bool>,
    },
    Remove {
        list_id: String,
        local_uid: String,
    },
    Reorder {
        list_id: String,
        order: Vec<ItemRef>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityUpdate {
    Unlink { list_id: String, remote_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetItem {
    pub item: ItemRef,
    pub text: String,
    pub completed: bool,
}

/// The state both sides should hold for one list once the pass has applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPlan {
    pub list_id: String,
    pub title: String,
    pub fetched_at: i64,
    pub items: Vec<TargetItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    MissingItemId { list_id: String, text: String },
    DuplicateItemId { list_id: String, remote_id: String },
    ConflictingLink { list_id: String, local_uid: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub remote_ops: Vec<RemoteOp>,
    pub local_ops: Vec<LocalOp>,
    pub identity_updates: Vec<IdentityUpdate>,
    pub plans: Vec<ListPlan>,
    /// Synced lists missing from the remote snapshot (deleted or trashed).
    pub removed_lists: Vec<String>,
    pub anomalies: Vec<Anomaly>,
}

impl Reconciliation {
    pub fn is_noop(&self) -> bool {
        self.remote_ops.is_empty() && self.local_ops.is_empty() && self.identity_updates.is_empty()
    }
}

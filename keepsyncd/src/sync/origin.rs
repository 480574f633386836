//! Origin tagging for the local store's generic item-added notifications.
//!
//! The coordinator registers each local creation it is about to make and binds
//! it to the uid the local store assigns; the notification carrying that uid
//! is then attributed to the remote side (or suppressed for items that arrive
//! completed). Anything unregistered came from a local edit.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use keepsync_integrations::ItemOrigin;
use tokio::sync::{Notify, mpsc};
use tracing::{debug, warn};

/// Notification raised by the local store for any item entering a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItemAdded {
    pub list_id: String,
    pub uid: String,
    pub text: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemAdded {
    pub list_id: String,
    pub uid: String,
    pub text: String,
    pub origin: ItemOrigin,
}

/// Decision for one raw notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tagging {
    Notify(ItemAdded),
    Silent,
    /// A creation with the same text is still waiting for its uid.
    Undecided,
}

impl Tagging {
    pub fn into_item(self) -> Option<ItemAdded> {
        match self {
            Tagging::Notify(item) => Some(item),
            Tagging::Silent | Tagging::Undecided => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Expectation {
    notify: bool,
    registered: Instant,
    uid: Option<String>,
}

type ExpectationKey = (String, String);

#[derive(Debug)]
pub struct OriginTagger {
    ttl: Duration,
    expected: Mutex<HashMap<ExpectationKey, VecDeque<Expectation>>>,
    changed: Notify,
}

impl OriginTagger {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            expected: Mutex::new(HashMap::new()),
            changed: Notify::new(),
        }
    }

    /// Marks a creation the coordinator is about to make in `list_id`.
    pub fn expect(&self, list_id: &str, text: &str, notify: bool) {
        self.expect_at(list_id, text, notify, Instant::now());
    }

    pub fn expect_at(&self, list_id: &str, text: &str, notify: bool, now: Instant) {
        self.lock()
            .entry((list_id.to_string(), text.to_string()))
            .or_default()
            .push_back(Expectation {
                notify,
                registered: now,
                uid: None,
            });
    }

    /// Attaches the uid the local store assigned to the oldest unbound
    /// expectation for `text`. Only the notification carrying that uid
    /// consumes it.
    pub fn bind(&self, list_id: &str, text: &str, uid: &str) {
        {
            let mut expected = self.lock();
            let key = (list_id.to_string(), text.to_string());
            if let Some(expectation) = expected
                .get_mut(&key)
                .and_then(|queue| queue.iter_mut().find(|e| e.uid.is_none()))
            {
                expectation.uid = Some(uid.to_string());
            }
        }
        self.changed.notify_waiters();
    }

    /// Withdraws the latest unbound expectation after a creation failed.
    pub fn forget(&self, list_id: &str, text: &str) {
        {
            let mut expected = self.lock();
            let key = (list_id.to_string(), text.to_string());
            if let Some(queue) = expected.get_mut(&key) {
                if let Some(pos) = queue.iter().rposition(|e| e.uid.is_none()) {
                    queue.remove(pos);
                }
                if queue.is_empty() {
                    expected.remove(&key);
                }
            }
        }
        self.changed.notify_waiters();
    }

    /// Tags a raw notification.
    pub fn classify(&self, raw: &RawItemAdded) -> Tagging {
        self.classify_at(raw, Instant::now())
    }

    pub fn classify_at(&self, raw: &RawItemAdded, now: Instant) -> Tagging {
        let origin = match self.take_expectation(raw, now) {
            Lookup::Found(expectation) if expectation.notify => ItemOrigin::Remote,
            Lookup::Found(_) => return Tagging::Silent,
            Lookup::Unbound => return Tagging::Undecided,
            Lookup::Missing if raw.completed => return Tagging::Silent,
            Lookup::Missing => ItemOrigin::Local,
        };
        Tagging::Notify(ItemAdded {
            list_id: raw.list_id.clone(),
            uid: raw.uid.clone(),
            text: raw.text.clone(),
            origin,
        })
    }

    pub fn pending(&self) -> usize {
        self.lock().values().map(VecDeque::len).sum()
    }

    fn take_expectation(&self, raw: &RawItemAdded, now: Instant) -> Lookup {
        let mut expected = self.lock();
        let key = (raw.list_id.clone(), raw.text.clone());
        let Some(queue) = expected.get_mut(&key) else {
            return Lookup::Missing;
        };
        queue.retain(|expectation| {
            let fresh = now.saturating_duration_since(expectation.registered) <= self.ttl;
            if !fresh {
                debug!(list_id = %raw.list_id, text = %raw.text, "dropping stale creation expectation");
            }
            fresh
        });
        let lookup = match queue
            .iter()
            .position(|e| e.uid.as_deref() == Some(raw.uid.as_str()))
        {
            Some(pos) => queue.remove(pos).map_or(Lookup::Missing, Lookup::Found),
            None if queue.iter().any(|e| e.uid.is_none()) => Lookup::Unbound,
            None => Lookup::Missing,
        };
        if queue.is_empty() {
            expected.remove(&key);
        }
        lookup
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ExpectationKey, VecDeque<Expectation>>> {
        match self.expected.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

enum Lookup {
    Found(Expectation),
    Unbound,
    Missing,
}

/// Forwards tagged notifications in arrival order until the raw channel
/// closes. An undecided notification holds the queue until its expectation
/// is bound, withdrawn or expires.
pub async fn tag_notifications(
    tagger: Arc<OriginTagger>,
    mut raw: mpsc::UnboundedReceiver<RawItemAdded>,
    tagged: mpsc::UnboundedSender<ItemAdded>,
) {
    while let Some(event) = raw.recv().await {
        let decision = loop {
            let changed = tagger.changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();
            match tagger.classify(&event) {
                Tagging::Undecided => {
                    let _ = tokio::time::timeout(tagger.ttl, changed).await;
                }
                decision => break decision,
            }
        };
        let Some(item) = decision.into_item() else {
            continue;
        };
        debug!(list_id = %item.list_id, origin = item.origin.as_str(), "item added");
        if tagged.send(item).is_err() {
            warn!("item-added listener closed");
            break;
        }
    }
}

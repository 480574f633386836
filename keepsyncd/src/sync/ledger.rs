use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

type LedgerKey = (String, String);

/// Local creations being forwarded to the remote store outside a pass.
///
/// A pass defers any list that still has one in flight: the remote id is not
/// linked yet, so the item would otherwise look like a new local creation.
#[derive(Debug, Default)]
pub struct ForwardLedger {
    in_flight: Mutex<HashMap<LedgerKey, usize>>,
}

impl ForwardLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Marks a forward as started; it stays in flight until the guard drops.
    pub fn begin(self: &Arc<Self>, account: &str, list_id: &str) -> ForwardGuard {
        let key = (account.to_string(), list_id.to_string());
        *self.lock().entry(key.clone()).or_insert(0) += 1;
        ForwardGuard {
            ledger: Arc::clone(self),
            key,
        }
    }

    pub fn is_in_flight(&self, account: &str, list_id: &str) -> bool {
        self.lock()
            .contains_key(&(account.to_string(), list_id.to_string()))
    }

    pub fn in_flight_lists(&self, account: &str) -> HashSet<String> {
        self.lock()
            .keys()
            .filter(|(owner, _)| owner == account)
            .map(|(_, list_id)| list_id.clone())
            .collect()
    }

    fn finish(&self, key: &LedgerKey) {
        let mut in_flight = self.lock();
        if let Some(count) = in_flight.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                in_flight.remove(key);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<LedgerKey, usize>> {
        match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[derive(Debug)]
pub struct ForwardGuard {
    ledger: Arc<ForwardLedger>,
    key: LedgerKey,
}

impl Drop for ForwardGuard {
    fn drop(&mut self) {
        self.ledger.finish(&self.key);
    }
}

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Rate limit for manual sync requests, tracked per account.
///
/// Independent of the poll timer: a timer-driven pass neither consumes nor
/// resets the window.
#[derive(Debug)]
pub struct CooldownGate {
    period: Duration,
    last_run: Mutex<HashMap<String, Instant>>,
}

impl CooldownGate {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_run: Mutex::new(HashMap::new()),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Returns `true` and starts a new window when the previous one has elapsed.
    pub fn try_acquire(&self, account: &str) -> bool {
        self.try_acquire_at(account, Instant::now())
    }

    pub fn try_acquire_at(&self, account: &str, now: Instant) -> bool {
        let mut last_run = match self.last_run.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = last_run.get(account)
            && now.saturating_duration_since(*previous) < self.period
        {
            return false;
        }
        last_run.insert(account.to_string(), now);
        true
    }

    /// Time left until the next manual request for `account` is accepted.
    pub fn remaining_at(&self, account: &str, now: Instant) -> Duration {
        let last_run = match self.last_run.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        last_run
            .get(account)
            .map(|previous| {
                self.period
                    .saturating_sub(now.saturating_duration_since(*previous))
            })
            .unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_request_is_accepted() {
        let gate = CooldownGate::new(Duration::from_secs(60));
        assert!(gate.try_acquire("alice"));
    }

    #[test]
    fn burst_within_window_runs_once() {
        let gate = CooldownGate::new(Duration::from_secs(60));
        let start = Instant::now();
        let accepted = (0..20)
            .filter(|i| gate.try_acquire_at("alice", start + Duration::from_secs(*i)))
            .count();
        assert_eq!(accepted, 1);
    }

    #[test]
    fn window_reopens_after_period() {
        let gate = CooldownGate::new(Duration::from_secs(60));
        let start = Instant::now();
        assert!(gate.try_acquire_at("alice", start));
        assert!(!gate.try_acquire_at("alice", start + Duration::from_secs(59)));
        assert!(gate.try_acquire_at("alice", start + Duration::from_secs(60)));
        assert_eq!(
            gate.remaining_at("alice", start + Duration::from_secs(70)),
            Duration::from_secs(50)
        );
    }

    #[test]
    fn denied_requests_do_not_extend_the_window() {
        let gate = CooldownGate::new(Duration::from_secs(60));
        let start = Instant::now();
        assert!(gate.try_acquire_at("alice", start));
        assert!(!gate.try_acquire_at("alice", start + Duration::from_secs(30)));
        assert!(gate.try_acquire_at("alice", start + Duration::from_secs(61)));
    }

    #[test]
    fn accounts_are_gated_independently() {
        let gate = CooldownGate::new(Duration::from_secs(60));
        let now = Instant::now();
        assert!(gate.try_acquire_at("alice", now));
        assert!(gate.try_acquire_at("bob", now));
        assert!(!gate.try_acquire_at("alice", now));
        assert_eq!(gate.remaining_at("carol", now), Duration::ZERO);
    }
}

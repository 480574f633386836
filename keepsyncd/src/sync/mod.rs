pub mod backoff;
pub mod cooldown;
pub mod coordinator;
pub mod ledger;
pub mod local_store;
mod merge;
pub mod model;
pub mod origin;
pub mod policy;
pub mod reconcile;
pub mod remote;
pub mod state_store;

/// Wall-clock time in milliseconds, the unit of every revision marker.
pub fn now_ms() -> i64 {
    let nanos = time::OffsetDateTime::now_utc().unix_timestamp_nanos();
    (nanos / 1_000_000) as i64
}

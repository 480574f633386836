use async_trait::async_trait;
use keepsync_core::{Change, ChangeOutcome, KeepClient, KeepError, RemoteList};

/// Snapshot and batched-mutation access to one account's remote lists.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<Vec<RemoteList>, KeepError>;

    /// Applies `changes` and flushes them. Outcomes line up with `changes`.
    async fn mutate(&self, changes: &[Change]) -> Result<Vec<ChangeOutcome>, KeepError>;
}

#[async_trait]
impl RemoteStore for KeepClient {
    async fn fetch_snapshot(&self) -> Result<Vec<RemoteList>, KeepError> {
        self.fetch_lists().await
    }

    async fn mutate(&self, changes: &[Change]) -> Result<Vec<ChangeOutcome>, KeepError> {
        self.apply_changes(changes).await
    }
}

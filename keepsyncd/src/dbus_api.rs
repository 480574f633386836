use std::collections::BTreeMap;
use std::sync::Arc;

use keepsync_integrations::ids::{
    DBUS_ERROR_FAILED, DBUS_ERROR_HALTED, DBUS_ERROR_INVALID_TEXT, DBUS_ERROR_NOT_FOUND,
};
use thiserror::Error;
use tracing::info;
use zbus::{interface, object_server::SignalEmitter};

use crate::sync::coordinator::{
    PassError, PassOutcome, PassTrigger, SkipReason, SyncCoordinator,
};
use crate::sync::local_store::LocalStoreError;

#[derive(Debug, Error)]
pub enum DbusServiceError {
    #[error("unknown account, list or item")]
    NotFound,
    #[error("account halted until its credential is refreshed")]
    Halted,
    #[error("item text must not be blank")]
    InvalidText,
    #[error("operation failed: {0}")]
    Failed(String),
}

pub fn dbus_error_name(err: &DbusServiceError) -> &'static str {
    match err {
        DbusServiceError::NotFound => DBUS_ERROR_NOT_FOUND,
        DbusServiceError::Halted => DBUS_ERROR_HALTED,
        DbusServiceError::InvalidText => DBUS_ERROR_INVALID_TEXT,
        DbusServiceError::Failed(_) => DBUS_ERROR_FAILED,
    }
}

fn map_to_fdo(err: DbusServiceError) -> zbus::fdo::Error {
    zbus::fdo::Error::Failed(format!("{}: {}", dbus_error_name(&err), err))
}

fn classify_pass_error(err: &PassError) -> DbusServiceError {
    match err {
        PassError::UnknownList(_)
        | PassError::Local(LocalStoreError::ListNotFound(_))
        | PassError::Local(LocalStoreError::ItemNotFound { .. }) => DbusServiceError::NotFound,
        PassError::Auth(_) => DbusServiceError::Halted,
        PassError::BlankText(_) => DbusServiceError::InvalidText,
        other => DbusServiceError::Failed(other.to_string()),
    }
}

fn map_pass_error(err: PassError) -> zbus::fdo::Error {
    map_to_fdo(classify_pass_error(&err))
}

/// Bus surface over every account's coordinator.
pub struct SyncDbusService {
    coordinators: BTreeMap<String, Arc<SyncCoordinator>>,
}

impl SyncDbusService {
    pub fn new(coordinators: impl IntoIterator<Item = Arc<SyncCoordinator>>) -> Self {
        Self {
            coordinators: coordinators
                .into_iter()
                .map(|coordinator| (coordinator.account().to_string(), coordinator))
                .collect(),
        }
    }

    fn coordinator(&self, account: &str) -> zbus::fdo::Result<&Arc<SyncCoordinator>> {
        self.coordinators
            .get(account)
            .ok_or_else(|| map_to_fdo(DbusServiceError::NotFound))
    }
}

#[interface(name = "dev.keepsync.Sync1")]
impl SyncDbusService {
    /// Runs a manual pass. Cooldown and busy denials are reported, not raised.
    async fn sync_now(&self, account: &str) -> zbus::fdo::Result<String> {
        let coordinator = self.coordinator(account)?;
        match coordinator
            .request_manual_sync()
            .await
            .map_err(map_pass_error)?
        {
            PassOutcome::Completed(_) => Ok("completed".to_string()),
            PassOutcome::Skipped(SkipReason::Cooldown) => Ok("cooldown".to_string()),
            PassOutcome::Skipped(SkipReason::Busy) => Ok("busy".to_string()),
            PassOutcome::Skipped(SkipReason::Halted) => Err(map_to_fdo(DbusServiceError::Halted)),
        }
    }

    async fn list_accounts(&self) -> zbus::fdo::Result<Vec<String>> {
        Ok(self.coordinators.keys().cloned().collect())
    }

    async fn list_items(
        &self,
        account: &str,
        list_id: &str,
    ) -> zbus::fdo::Result<Vec<(String, String, bool)>> {
        let items = self
            .coordinator(account)?
            .list_items(list_id)
            .await
            .map_err(map_pass_error)?;
        Ok(items
            .into_iter()
            .map(|item| (item.uid, item.text, item.completed))
            .collect())
    }

    async fn add_item(&self, account: &str, list_id: &str, text: &str) -> zbus::fdo::Result<String> {
        let coordinator = self.coordinator(account)?;
        let uid = coordinator
            .add_local_item(list_id, text)
            .await
            .map_err(map_pass_error)?;
        coordinator.spawn_pass(PassTrigger::LocalEdit);
        Ok(uid)
    }

    async fn set_item_text(
        &self,
        account: &str,
        list_id: &str,
        uid: &str,
        text: &str,
    ) -> zbus::fdo::Result<()> {
        let coordinator = self.coordinator(account)?;
        coordinator
            .update_local_item(list_id, uid, Some(text), None)
            .await
            .map_err(map_pass_error)?;
        coordinator.spawn_pass(PassTrigger::LocalEdit);
        Ok(())
    }

    async fn set_item_completed(
        &self,
        account: &str,
        list_id: &str,
        uid: &str,
        completed: bool,
    ) -> zbus::fdo::Result<()> {
        let coordinator = self.coordinator(account)?;
        coordinator
            .update_local_item(list_id, uid, None, Some(completed))
            .await
            .map_err(map_pass_error)?;
        coordinator.spawn_pass(PassTrigger::LocalEdit);
        Ok(())
    }

    async fn remove_item(&self, account: &str, list_id: &str, uid: &str) -> zbus::fdo::Result<()> {
        let coordinator = self.coordinator(account)?;
        coordinator
            .remove_local_item(list_id, uid)
            .await
            .map_err(map_pass_error)?;
        coordinator.spawn_pass(PassTrigger::LocalEdit);
        Ok(())
    }

    /// Health (`online`, `offline` or `error`) and the last failure message.
    async fn account_state(&self, account: &str) -> zbus::fdo::Result<(String, String)> {
        let coordinator = self.coordinator(account)?;
        Ok((
            coordinator.health().as_str().to_string(),
            coordinator.last_error().unwrap_or_default(),
        ))
    }

    async fn resume(&self, account: &str) -> zbus::fdo::Result<()> {
        let coordinator = self.coordinator(account)?;
        if coordinator.is_halted() {
            info!(account, "resume requested over D-Bus");
            coordinator.resume();
        }
        Ok(())
    }

    #[zbus(signal)]
    pub async fn item_added(
        ctxt: &SignalEmitter<'_>,
        list_id: &str,
        text: &str,
        origin: &str,
    ) -> zbus::Result<()>;

    #[zbus(signal)]
    pub async fn list_removed(
        ctxt: &SignalEmitter<'_>,
        account: &str,
        list_id: &str,
    ) -> zbus::Result<()>;
}

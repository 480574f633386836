use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use keepsync_core::{KeepClient, KeepError};
use keepsync_integrations::ids::{DBUS_NAME_SYNC, DBUS_OBJECT_PATH_SYNC};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use zbus::connection::Builder as ConnectionBuilder;
use zbus::object_server::SignalEmitter;

use crate::dbus_api::SyncDbusService;
use crate::storage::{AccountConfig, AccountsFile, TokenStorage, default_accounts_path};
use crate::sync::backoff::Backoff;
use crate::sync::cooldown::CooldownGate;
use crate::sync::coordinator::{
    CoordinatorConfig, PassOutcome, PassTrigger, SharedParts, SyncCoordinator, SyncEvent,
};
use crate::sync::ledger::ForwardLedger;
use crate::sync::local_store::SqliteListStore;
use crate::sync::origin::{ItemAdded, OriginTagger, RawItemAdded, tag_notifications};
use crate::sync::state_store::{StateStore, default_db_path};

const DEFAULT_POLL_SECS: u64 = 15 * 60;
const DEFAULT_COOLDOWN_SECS: u64 = 60;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_FETCH_RETRIES: u64 = 3;
const ORIGIN_TTL: Duration = Duration::from_secs(5 * 60);
const BACKOFF_BASE: Duration = Duration::from_millis(500);
const BACKOFF_MAX: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct DaemonConfig {
    pub poll_interval: Duration,
    pub cooldown: Duration,
    pub http_timeout: Duration,
    pub fetch_retries: u32,
    pub base_url: Option<String>,
    pub db_path: PathBuf,
    pub accounts_path: PathBuf,
}

impl DaemonConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let home = dirs::home_dir().context("home directory is unavailable")?;
        let db_path = match std::env::var("KEEPSYNC_DB") {
            Ok(value) => expand_with_home(&value, &home),
            Err(_) => default_db_path()?,
        };
        let accounts_path = match std::env::var("KEEPSYNC_ACCOUNTS") {
            Ok(value) => expand_with_home(&value, &home),
            Err(_) => default_accounts_path()?,
        };
        let base_url = std::env::var("KEEPSYNC_BASE_URL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let poll_interval =
            Duration::from_secs(read_u64_env("KEEPSYNC_POLL_SECS", DEFAULT_POLL_SECS));
        let cooldown =
            Duration::from_secs(read_u64_env("KEEPSYNC_COOLDOWN_SECS", DEFAULT_COOLDOWN_SECS));
        let http_timeout = Duration::from_secs(read_u64_env(
            "KEEPSYNC_HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
        ));
        let fetch_retries =
            u32::try_from(read_u64_env("KEEPSYNC_FETCH_RETRIES", DEFAULT_FETCH_RETRIES))
                .unwrap_or(u32::MAX);

        Ok(Self {
            poll_interval,
            cooldown,
            http_timeout,
            fetch_retries,
            base_url,
            db_path,
            accounts_path,
        })
    }
}

pub struct DaemonRuntime {
    config: DaemonConfig,
    accounts: AccountsFile,
    tagger: Arc<OriginTagger>,
    coordinators: Vec<Arc<SyncCoordinator>>,
    added_rx: mpsc::UnboundedReceiver<RawItemAdded>,
    events_rx: mpsc::UnboundedReceiver<SyncEvent>,
}

impl DaemonRuntime {
    pub async fn bootstrap(config: DaemonConfig) -> anyhow::Result<Self> {
        let accounts = AccountsFile::load(&config.accounts_path)
            .await
            .with_context(|| format!("failed to load accounts from {:?}", config.accounts_path))?;
        let state = StateStore::open(config.db_path.clone())
            .await
            .context("failed to initialize state store")?;
        let runtime = Self::assemble(config, accounts, state, resolve_token)?;
        if runtime.coordinators.is_empty() {
            anyhow::bail!("no configured account has a usable credential");
        }
        Ok(runtime)
    }

    /// Builds one coordinator per account whose credential resolves.
    fn assemble<F>(
        config: DaemonConfig,
        accounts: AccountsFile,
        state: StateStore,
        token_for: F,
    ) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (added_tx, added_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let tagger = Arc::new(OriginTagger::new(ORIGIN_TTL));
        let shared = SharedParts {
            local: Arc::new(SqliteListStore::new(state.pool().clone(), added_tx)),
            state,
            cooldown: Arc::new(CooldownGate::new(config.cooldown)),
            tagger: Arc::clone(&tagger),
            ledger: ForwardLedger::new(),
            events: Some(events_tx),
        };

        let mut coordinators = Vec::with_capacity(accounts.accounts.len());
        for account in &accounts.accounts {
            let Some(token) = token_for(&account.username) else {
                error!(account = %account.username, "no credential available, account skipped");
                continue;
            };
            let client = build_client(config.base_url.as_deref(), token, config.http_timeout)
                .with_context(|| format!("failed to build client for {}", account.username))?;
            coordinators.push(Arc::new(SyncCoordinator::new(
                coordinator_config(account, config.fetch_retries),
                Arc::new(client),
                shared.clone(),
            )));
        }

        Ok(Self {
            config,
            accounts,
            tagger,
            coordinators,
            added_rx,
            events_rx,
        })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let Self {
            config,
            mut accounts,
            tagger,
            coordinators,
            added_rx,
            mut events_rx,
        } = self;
        info!(
            accounts = coordinators.len(),
            poll_secs = config.poll_interval.as_secs(),
            cooldown_secs = config.cooldown.as_secs(),
            "keepsyncd started"
        );

        let dbus_connection = ConnectionBuilder::session()?
            .name(DBUS_NAME_SYNC)?
            .serve_at(
                DBUS_OBJECT_PATH_SYNC,
                SyncDbusService::new(coordinators.iter().cloned()),
            )?
            .build()
            .await
            .context("failed to start D-Bus object server")?;
        let signal_emitter = SignalEmitter::new(&dbus_connection, DBUS_OBJECT_PATH_SYNC)
            .context("failed to create D-Bus signal emitter")?
            .into_owned();

        let (tagged_tx, mut tagged_rx) = mpsc::unbounded_channel::<ItemAdded>();
        let tag_handle = tokio::spawn(tag_notifications(tagger, added_rx, tagged_tx));

        let emitter = signal_emitter.clone();
        let notify_handle = tokio::spawn(async move {
            while let Some(item) = tagged_rx.recv().await {
                if let Err(err) = SyncDbusService::item_added(
                    &emitter,
                    &item.list_id,
                    &item.text,
                    item.origin.as_str(),
                )
                .await
                {
                    warn!(error = %err, "failed to emit ItemAdded");
                }
            }
        });

        let accounts_path = config.accounts_path.clone();
        let emitter = signal_emitter.clone();
        let events_handle = tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                match event {
                    SyncEvent::ListRemoved { account, list_id } => {
                        forget_removed_list(&mut accounts, &accounts_path, &account, &list_id)
                            .await;
                        if let Err(err) =
                            SyncDbusService::list_removed(&emitter, &account, &list_id).await
                        {
                            warn!(error = %err, "failed to emit ListRemoved");
                        }
                    }
                }
            }
        });

        let poll_handles: Vec<_> = coordinators
            .iter()
            .map(|coordinator| spawn_poll_loop(Arc::clone(coordinator), config.poll_interval))
            .collect();

        tokio::signal::ctrl_c()
            .await
            .context("failed waiting for shutdown signal")?;
        info!("shutdown requested");

        for handle in poll_handles {
            handle.abort();
        }
        notify_handle.abort();
        events_handle.abort();
        tag_handle.abort();

        Ok(())
    }
}

include!("daemon_helpers.rs");

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;

fn resolve_token(username: &str) -> Option<String> {
    let storage = match TokenStorage::for_account(username) {
        Ok(storage) => storage,
        Err(err) => {
            warn!(account = username, error = %err, "keyring unavailable");
            return None;
        }
    };
    match storage.get_token() {
        Ok(token) => Some(token),
        Err(err) => {
            warn!(account = username, error = %err, "credential lookup failed");
            None
        }
    }
}

fn build_client(
    base_url: Option<&str>,
    token: String,
    timeout: Duration,
) -> Result<KeepClient, KeepError> {
    let client = match base_url {
        Some(base_url) => KeepClient::with_base_url(base_url, token)?,
        None => KeepClient::new(token)?,
    };
    client.with_timeout(timeout)
}

fn coordinator_config(account: &AccountConfig, fetch_retries: u32) -> CoordinatorConfig {
    CoordinatorConfig {
        account: account.username.clone(),
        lists: account.lists.clone(),
        list_prefix: account.list_prefix.clone(),
        policy: account.policy(),
        fetch_retries,
        backoff: Backoff::new(BACKOFF_BASE, BACKOFF_MAX, true),
    }
}

/// Timer-driven passes for one account. The first tick fires immediately.
fn spawn_poll_loop(coordinator: Arc<SyncCoordinator>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match coordinator.run_pass(PassTrigger::Timer).await {
                Ok(PassOutcome::Completed(report)) => {
                    debug!(account = coordinator.account(), pass = report.pass, "timer pass done");
                }
                Ok(PassOutcome::Skipped(reason)) => {
                    debug!(account = coordinator.account(), ?reason, "timer pass skipped");
                }
                Err(err) => {
                    debug!(account = coordinator.account(), error = %err, "timer pass failed");
                }
            }
        }
    })
}

async fn forget_removed_list(
    accounts: &mut AccountsFile,
    path: &Path,
    account: &str,
    list_id: &str,
) {
    if !accounts.remove_list(account, list_id) {
        return;
    }
    match accounts.save(path).await {
        Ok(()) => info!(account, list_id, "list dropped from account config"),
        Err(err) => warn!(account, list_id, error = %err, "failed to persist account config"),
    }
}

fn expand_with_home(value: &str, home: &Path) -> PathBuf {
    if value == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(value)
}

fn read_u64_env(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

use super::*;
use crate::sync::policy::{ItemCase, ListPolicy};
use crate::sync::remote::RemoteStore;
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn account(username: &str, lists: &[&str]) -> AccountConfig {
    AccountConfig {
        username: username.to_string(),
        lists: lists.iter().map(|id| id.to_string()).collect(),
        list_prefix: "Keep".to_string(),
        auto_sort: false,
        item_case: ItemCase::NoChange,
    }
}

fn test_config(dir: &Path, base_url: Option<String>) -> DaemonConfig {
    DaemonConfig {
        poll_interval: Duration::from_millis(20),
        cooldown: Duration::from_secs(60),
        http_timeout: Duration::from_secs(5),
        fetch_retries: 0,
        base_url,
        db_path: dir.join("state.db"),
        accounts_path: dir.join("accounts.json"),
    }
}

async fn mount_groceries(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/lists"))
        .and(query_param("type", "checklist"))
        .and(header("Authorization", "Bearer alice-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lists": [{
                "id": "list-1",
                "title": "Groceries",
                "items": [
                    {"id": "r1", "text": "milk", "checked": false},
                    {"id": "r2", "text": "eggs", "checked": true}
                ]
            }]
        })))
        .mount(server)
        .await;
}

#[test]
fn expands_tilde_to_home() {
    let home = PathBuf::from("/tmp/home-user");
    assert_eq!(
        expand_with_home("~/.local/share/keepsync/state.db", &home),
        PathBuf::from("/tmp/home-user/.local/share/keepsync/state.db")
    );
    assert_eq!(expand_with_home("~", &home), home);
    assert_eq!(
        expand_with_home("/var/lib/keepsync.db", &home),
        PathBuf::from("/var/lib/keepsync.db")
    );
}

#[test]
fn reads_intervals_from_env_or_default() {
    assert_eq!(read_u64_env("NO_SUCH_KEEPSYNC_ENV_FOR_TEST", 900), 900);
}

#[test]
fn coordinator_config_carries_account_policy() {
    let mut alice = account("alice", &["list-1", "list-2"]);
    alice.auto_sort = true;
    alice.item_case = ItemCase::Upper;

    let config = coordinator_config(&alice, 3);
    assert_eq!(config.account, "alice");
    assert_eq!(config.lists, vec!["list-1", "list-2"]);
    assert_eq!(config.list_prefix, "Keep");
    assert_eq!(config.fetch_retries, 3);
    assert_eq!(
        config.policy,
        ListPolicy {
            item_case: ItemCase::Upper,
            auto_sort: true,
        }
    );
}

#[tokio::test]
async fn built_client_fetches_with_bearer_token() {
    let server = MockServer::start().await;
    mount_groceries(&server).await;

    let client = build_client(
        Some(&server.uri()),
        "alice-token".to_string(),
        Duration::from_secs(5),
    )
    .unwrap();
    let lists = client.fetch_snapshot().await.unwrap();
    assert_eq!(lists.len(), 1);
    assert_eq!(lists[0].title, "Groceries");
    assert_eq!(lists[0].items.len(), 2);
}

#[tokio::test]
async fn assemble_skips_accounts_without_credentials() {
    let dir = tempdir().unwrap();
    let config = test_config(dir.path(), Some("http://127.0.0.1:9".to_string()));
    let state = StateStore::open(config.db_path.clone()).await.unwrap();
    let accounts = AccountsFile {
        accounts: vec![account("alice", &["list-1"]), account("bob", &["list-2"])],
    };

    let runtime = DaemonRuntime::assemble(config, accounts, state, |username| {
        (username == "alice").then(|| "alice-token".to_string())
    })
    .unwrap();

    let names: Vec<_> = runtime
        .coordinators
        .iter()
        .map(|coordinator| coordinator.account().to_string())
        .collect();
    assert_eq!(names, vec!["alice"]);
}

#[tokio::test]
async fn assembled_runtime_mirrors_remote_lists_and_notifies() {
    let server = MockServer::start().await;
    mount_groceries(&server).await;
    let dir = tempdir().unwrap();
    let config = test_config(dir.path(), Some(server.uri()));
    let state = StateStore::open(config.db_path.clone()).await.unwrap();
    let accounts = AccountsFile {
        accounts: vec![account("alice", &["list-1"])],
    };
    let mut runtime = DaemonRuntime::assemble(config, accounts, state, |_| {
        Some("alice-token".to_string())
    })
    .unwrap();

    let coordinator = Arc::clone(&runtime.coordinators[0]);
    let outcome = coordinator.run_pass(PassTrigger::Timer).await.unwrap();
    assert!(matches!(outcome, PassOutcome::Completed(ref report) if report.local_changes == 2));

    let items = coordinator.list_items("list-1").await.unwrap();
    let texts: Vec<_> = items.iter().map(|item| item.text.as_str()).collect();
    assert_eq!(texts, vec!["milk", "eggs"]);

    let mut notified = Vec::new();
    while let Ok(raw) = runtime.added_rx.try_recv() {
        notified.extend(runtime.tagger.classify(&raw).into_item());
    }
    assert_eq!(notified.len(), 1);
    assert_eq!(notified[0].text, "milk");
    assert_eq!(notified[0].origin.as_str(), "remote");
}

#[tokio::test]
async fn poll_loop_runs_timer_passes() {
    let server = MockServer::start().await;
    mount_groceries(&server).await;
    let dir = tempdir().unwrap();
    let config = test_config(dir.path(), Some(server.uri()));
    let poll_interval = config.poll_interval;
    let state = StateStore::open(config.db_path.clone()).await.unwrap();
    let accounts = AccountsFile {
        accounts: vec![account("alice", &["list-1"])],
    };
    let runtime = DaemonRuntime::assemble(config, accounts, state, |_| {
        Some("alice-token".to_string())
    })
    .unwrap();

    let handle = spawn_poll_loop(Arc::clone(&runtime.coordinators[0]), poll_interval);
    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.abort();

    let fetches = server.received_requests().await.unwrap_or_default().len();
    assert!(fetches >= 2, "expected repeated fetches, got {fetches}");
    assert_eq!(
        runtime.coordinators[0].health().as_str(),
        "online"
    );
}

#[tokio::test]
async fn removed_list_is_dropped_from_saved_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("accounts.json");
    let mut accounts = AccountsFile {
        accounts: vec![account("alice", &["list-1", "list-2"])],
    };
    accounts.save(&path).await.unwrap();

    forget_removed_list(&mut accounts, &path, "alice", "list-1").await;

    let saved = AccountsFile::load(&path).await.unwrap();
    assert_eq!(saved.accounts[0].lists, vec!["list-2"]);
    assert_eq!(saved, accounts);
}

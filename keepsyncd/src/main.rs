use keepsyncd::daemon::{DaemonConfig, DaemonRuntime};
use keepsyncd::storage::TokenStorage;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliMode {
    Run,
    Logout(String),
    Help,
}

fn parse_cli_mode<I>(args: I) -> anyhow::Result<CliMode>
where
    I: IntoIterator<Item = String>,
{
    let mut mode = CliMode::Run;
    let mut args = args.into_iter().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--logout" => {
                let Some(username) = args.next() else {
                    anyhow::bail!("--logout needs a username");
                };
                mode = CliMode::Logout(username);
            }
            "--help" | "-h" => mode = CliMode::Help,
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(mode)
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("keepsyncd=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    match parse_cli_mode(std::env::args())? {
        CliMode::Logout(username) => {
            let storage = TokenStorage::for_account(&username)?;
            storage.delete_token()?;
            info!(account = %username, "saved token removed");
            return Ok(());
        }
        CliMode::Help => {
            println!("Usage: keepsyncd [--logout <username>]");
            println!("  --logout <username>   Remove the saved token for an account and exit");
            return Ok(());
        }
        CliMode::Run => {}
    }
    let config = DaemonConfig::from_env()?;
    let daemon = DaemonRuntime::bootstrap(config).await?;
    daemon.run().await
}

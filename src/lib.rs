pub mod cli;
pub mod credentials;
pub mod display;
pub mod poller;
pub mod settings;
pub mod usage;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use cli::{Cli, Command};
use credentials::{resolve_credential, CredentialStore, KeyringStore};
use display::DisplayState;
use poller::{spawn_poller, StatusSink};
use settings::{
    default_settings_path, load_settings, update_settings, AppSettings, SettingsUpdate,
};
use usage::UsageClient;

/// Prints the indicator whenever it changes and keeps the latest state for
/// the `d` (details) command.
struct ConsoleSink {
    latest: Mutex<DisplayState>,
}

impl ConsoleSink {
    fn new() -> Self {
        Self {
            latest: Mutex::new(DisplayState::default()),
        }
    }

    fn print_details(&self) {
        let state = self.latest.lock().unwrap_or_else(|e| e.into_inner()).clone();
        for line in state.detail_lines(chrono::Utc::now()) {
            println!("{}", line);
        }
    }
}

impl StatusSink for ConsoleSink {
    fn publish(&self, state: &DisplayState) {
        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        match &state.error_message {
            Some(message) => println!("{}  ! {}", state.indicator_text(), message),
            None => println!("{}", state.indicator_text()),
        }
        *latest = state.clone();
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let env = env_logger::Env::default().default_filter_or(default_level);
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn settings_path(cli: &Cli) -> Result<PathBuf, String> {
    cli.config.clone().map(Ok).unwrap_or_else(default_settings_path)
}

fn resolve_settings(cli: &Cli) -> AppSettings {
    let path = match settings_path(cli) {
        Ok(p) => p,
        Err(e) => {
            log::warn!("Settings: {}", e);
            return apply_overrides(AppSettings::default(), cli);
        }
    };
    log::debug!("Settings: loading {:?}", path);
    apply_overrides(load_settings(&path), cli)
}

fn apply_overrides(mut settings: AppSettings, cli: &Cli) -> AppSettings {
    if let Some(interval) = cli.interval {
        settings.poll_interval_secs = interval;
    }
    settings
}

/// Client with the session key from the environment or keyring, if any.
fn build_client(
    settings: &AppSettings,
    store: &dyn CredentialStore,
) -> Result<UsageClient, String> {
    let mut client = UsageClient::new(settings).map_err(|e| e.to_string())?;
    match resolve_credential(store) {
        Some(key) => client.set_credential(&key),
        None => log::warn!("Credentials: no session key configured (run `set-key`)"),
    }
    Ok(client)
}

async fn watch(settings: AppSettings, store: &dyn CredentialStore) -> Result<(), String> {
    let client = build_client(&settings, store)?;
    let sink = Arc::new(ConsoleSink::new());
    let handle = spawn_poller(
        client,
        Duration::from_secs(settings.poll_interval_secs),
        sink.clone(),
    );

    println!("r = refresh, d = details, q = quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => match line.trim() {
                    "r" | "refresh" => handle.refresh().await?,
                    "d" | "details" => sink.print_details(),
                    "q" | "quit" => break,
                    "" => {}
                    other => println!("unknown command: {}", other),
                },
                Ok(None) => stdin_open = false,
                Err(e) => {
                    log::warn!("Failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },
        }
    }

    handle.shutdown().await?;
    Ok(())
}

async fn status(settings: AppSettings, store: &dyn CredentialStore) -> Result<(), String> {
    let mut client = build_client(&settings, store)?;
    let outcome = client.fetch_usage().await;

    let mut state = DisplayState::new(client.has_credential());
    let now = chrono::Utc::now();
    state.apply(&outcome, now);
    for line in state.detail_lines(now) {
        println!("{}", line);
    }

    outcome.map(|_| ()).map_err(|e| e.to_string())
}

/// First line of stdin, so the key stays out of shell history and `ps`.
async fn read_key_from_stdin() -> Result<String, String> {
    eprintln!("Paste the sessionKey cookie value and press Enter:");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    match lines.next_line().await {
        Ok(Some(line)) => Ok(line.trim().to_string()),
        Ok(None) => Err("No session key given on stdin".to_string()),
        Err(e) => Err(format!("Failed to read stdin: {}", e)),
    }
}

async fn set_key(
    settings: AppSettings,
    store: &dyn CredentialStore,
    key: Option<String>,
) -> Result<(), String> {
    let key = match key {
        Some(key) => key.trim().to_string(),
        None => read_key_from_stdin().await?,
    };
    if key.is_empty() {
        return Err("Session key is empty".to_string());
    }

    let client = UsageClient::new(&settings).map_err(|e| e.to_string())?;
    match client.validate_credential(&key).await {
        Ok(true) => {
            store.save(&key)?;
            println!("Session key saved");
            Ok(())
        }
        Ok(false) => Err("Session key rejected - copy a fresh sessionKey cookie".to_string()),
        Err(e) => Err(format!("Could not validate session key: {}", e)),
    }
}

fn write_config(cli: &Cli, update: &SettingsUpdate) -> Result<(), String> {
    let path = settings_path(cli)?;
    if update.is_empty() {
        println!("{}", path.display());
    } else {
        update_settings(&path, update)?;
        println!("Settings saved to {}", path.display());
    }
    let json = serde_json::to_string_pretty(&load_settings(&path))
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;
    println!("{}", json);
    Ok(())
}

async fn dispatch(cli: &Cli, settings: AppSettings) -> Result<(), String> {
    let store = KeyringStore;
    match cli.command.clone().unwrap_or(Command::Watch) {
        Command::Watch => watch(settings, &store).await,
        Command::Status => status(settings, &store).await,
        Command::SetKey { key } => set_key(settings, &store, key).await,
        Command::ClearKey => {
            store.clear()?;
            println!("Session key removed");
            Ok(())
        }
        Command::Config {
            poll_interval,
            request_timeout,
            base_url,
            user_agent,
        } => {
            let update = SettingsUpdate {
                poll_interval_secs: poll_interval,
                request_timeout_secs: request_timeout,
                base_url,
                user_agent,
            };
            write_config(cli, &update)
        }
    }
}

// ============================================================================
// Application entry point
// ============================================================================

/// Run the CLI. Returns the process exit code.
pub fn run(cli: Cli) -> i32 {
    init_logging(cli.debug);
    let settings = resolve_settings(&cli);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("Failed to start async runtime: {}", e);
            return 1;
        }
    };

    match runtime.block_on(dispatch(&cli, settings)) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    }
}

//! kidgroups - terminal console for moving kindergarten children between
//! groups and maintaining the group list.
//!
//! Without arguments this starts the TUI. A few flags run one-shot commands
//! against the gateway and print JSON instead.

mod app;
mod ui;

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kidgroups_core::api::{Gateway, GatewayClient};
use kidgroups_core::auth::{self, AuthStatus, CredentialStore, Session};
use kidgroups_core::config::{Config, ENV_EMAIL, ENV_PASSWORD};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const LOG_FILE: &str = "kidgroups.log";

/// Row cap for `--find-children`
const FIND_LIMIT: usize = 50;

const USAGE: &str = "\
Usage: kidgroups [COMMAND]

Without a command, starts the interactive console.

Commands:
  --login                 Sign in and store the session
  --logout                Sign out and forget the session
  --list-groups           Print all groups as JSON
  --group <ID>            Print one group as JSON
  --find-children <TEXT>  Print children whose last name contains TEXT
  --help                  Show this help";

fn env_filter() -> EnvFilter {
    // RUST_LOG controls the level (e.g. RUST_LOG=kidgroups_core=debug)
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Logging for one-shot commands goes to stderr
fn init_stderr_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter())
        .init();
}

/// The TUI owns the terminal, so it logs to a file in the cache directory
fn init_file_tracing(cache_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(cache_dir)
        .with_context(|| format!("Failed to create {}", cache_dir.display()))?;
    let appender = tracing_appender::rolling::never(cache_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter())
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        None => run_tui().await,
        Some("--help") | Some("-h") => {
            println!("{}", USAGE);
            Ok(())
        }
        Some(command) => {
            init_stderr_tracing();
            run_command(command, args.get(2).map(String::as_str)).await
        }
    }
}

async fn run_tui() -> Result<()> {
    let config = Config::load().context("Failed to load config")?;
    let _log_guard = init_file_tracing(&config.cache_dir()?)?;
    info!("kidgroups starting");

    let mut app = App::new(config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.authenticate().await;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("kidgroups shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| render(f, app))?;

        // Poll with a timeout so background results get picked up
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }
                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        app.check_background_tasks();
        app.keep_session_fresh().await;

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

// ============================================================================
// One-shot commands
// ============================================================================

async fn run_command(command: &str, argument: Option<&str>) -> Result<()> {
    match command {
        "--login" => login().await,
        "--logout" => logout().await,
        "--list-groups" => {
            let client = signed_in_client().await?;
            print_json(&client.fetch_groups().await?)
        }
        "--group" => {
            let id = argument.context("--group needs a group id")?;
            let client = signed_in_client().await?;
            print_json(&client.fetch_group(id).await?)
        }
        "--find-children" => {
            let needle = argument.context("--find-children needs a search text")?;
            let client = signed_in_client().await?;
            print_json(&client.find_children(needle, FIND_LIMIT).await?)
        }
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_session(config: &Config) -> Result<(Session, GatewayClient)> {
    let (url, key) = config.gateway()?;
    let client = GatewayClient::new(url, key)?;
    let mut session = Session::new(config.cache_dir()?);
    session.load().context("Failed to read session file")?;
    Ok((session, client))
}

/// Client carrying a verified session, or an error telling the user to log in
async fn signed_in_client() -> Result<GatewayClient> {
    let config = Config::load()?;
    let (mut session, mut client) = open_session(&config)?;
    match auth::require_session(&mut session, &mut client).await? {
        AuthStatus::Authenticated { .. } => Ok(client),
        AuthStatus::NeedsLogin => bail!("Not signed in. Run `kidgroups --login` first."),
    }
}

async fn login() -> Result<()> {
    let mut config = Config::load()?;
    let (mut session, mut client) = open_session(&config)?;

    let email = match std::env::var(ENV_EMAIL).ok().filter(|e| !e.is_empty()) {
        Some(email) => email,
        None => prompt_email(config.last_email.as_deref())?,
    };
    let password = match std::env::var(ENV_PASSWORD).ok().filter(|p| !p.is_empty()) {
        Some(password) => password,
        None => rpassword::prompt_password("Password: ")?,
    };

    let data = auth::sign_in(&mut session, &mut client, &email, &password)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    if let Err(e) = CredentialStore::store(&email, &password) {
        tracing::warn!(error = %e, "Failed to store credentials");
    }
    config.last_email = Some(email);
    config.save()?;

    eprintln!(
        "Signed in as {}",
        data.email.as_deref().unwrap_or(data.user_id.as_str())
    );
    Ok(())
}

fn prompt_email(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => eprint!("Email [{}]: ", last),
        None => eprint!("Email: "),
    }
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    match (input.is_empty(), last) {
        (false, _) => Ok(input.to_string()),
        (true, Some(last)) => Ok(last.to_string()),
        (true, None) => bail!("Email required"),
    }
}

async fn logout() -> Result<()> {
    let config = Config::load()?;
    let (mut session, mut client) = open_session(&config)?;
    if let Some(token) = session.token() {
        client.set_token(token);
    }
    auth::sign_out(&mut session, &mut client).await;
    if let Some(ref email) = config.last_email {
        if let Err(e) = CredentialStore::delete(email) {
            tracing::debug!(error = %e, "No stored credentials to delete");
        }
    }
    eprintln!("Signed out");
    Ok(())
}

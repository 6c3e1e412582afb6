//! tokenward - keeps a staff session alive from the terminal.
//!
//! Logs in against the authentication backend, shows the session status,
//! watches the token and offers to renew it before it expires, and can serve
//! the login relay.

mod terminal;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tokenward_core::{
    relay, Capabilities, Clock, Config, Credentials, FileTokenStore, HttpAuthBackend, KeyringTokenStore,
    SessionController, SessionSettings, SessionState, SystemClock, TokenStorage, TokenStore,
};

use terminal::{StdinPrompt, TerminalRouter};

/// Keyring account used before any username is known
const DEFAULT_ACCOUNT: &str = "default";

const USAGE: &str = "\
Usage: tokenward <command>

Commands:
  login     Log in and store the session token
  status    Show whether a session is active and when it expires
  refresh   Renew the session token now
  logout    Forget the session token
  watch     Keep the session alive, asking before it expires (Ctrl+C to stop)
  relay     Serve the login relay in front of the backend";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("status");

    let mut config = Config::load().context("Failed to load config")?;

    match command {
        "login" => login(&mut config).await,
        "status" => status(&config),
        "refresh" => refresh(&config).await,
        "logout" => logout(&config),
        "watch" => watch(&config).await,
        "relay" => serve_relay(&config).await,
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            std::process::exit(2);
        }
    }
}

fn token_store(config: &Config) -> Result<Arc<dyn TokenStore>> {
    Ok(match config.token_storage {
        TokenStorage::File => Arc::new(FileTokenStore::new(config.cache_dir()?)),
        TokenStorage::Keyring => Arc::new(KeyringTokenStore::new(
            config.last_username.as_deref().unwrap_or(DEFAULT_ACCOUNT),
        )),
    })
}

fn build_controller(config: &Config) -> Result<SessionController> {
    let backend = HttpAuthBackend::from_config(config).context("Failed to create HTTP client")?;

    let caps = Capabilities {
        backend: Arc::new(backend),
        store: token_store(config)?,
        router: Arc::new(TerminalRouter),
        prompt: Arc::new(StdinPrompt),
        clock: Arc::new(SystemClock),
    };

    let controller = SessionController::new(caps, SessionSettings::from(config));
    controller.restore();
    Ok(controller)
}

fn prompt_username(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(match (input.is_empty(), last) {
        (true, Some(last)) => last.to_string(),
        _ => input.to_string(),
    })
}

async fn login(config: &mut Config) -> Result<()> {
    let username = match std::env::var("TOKENWARD_USERNAME") {
        Ok(username) => username,
        Err(_) => prompt_username(config.last_username.as_deref())?,
    };
    let password = match std::env::var("TOKENWARD_PASSWORD") {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password("Password: ")?,
    };

    if username.is_empty() || password.is_empty() {
        anyhow::bail!("Username and password required");
    }

    // Keychain entries are per account, so pick the account before building
    config.last_username = Some(username.clone());
    let controller = build_controller(config)?;

    println!("\nAuthenticating...");
    controller
        .login(&Credentials::new(username, password))
        .await?;

    if let Err(e) = config.save() {
        tracing::warn!(error = %e, "Failed to save config");
    }

    println!("Login successful!");
    Ok(())
}

fn status(config: &Config) -> Result<()> {
    let controller = build_controller(config)?;
    let session = controller.session();

    match (session.state(), session.token) {
        (SessionState::Authenticated, Some(token)) => {
            let now = SystemClock.now();
            let seconds_left = token.seconds_until_expiry(now)?;
            println!(
                "Logged in{} - token expires in {}",
                config
                    .last_username
                    .as_deref()
                    .map(|u| format!(" as {}", u))
                    .unwrap_or_default(),
                terminal::format_remaining(seconds_left)
            );
        }
        _ => println!("Not logged in"),
    }
    Ok(())
}

async fn refresh(config: &Config) -> Result<()> {
    let controller = build_controller(config)?;
    if !controller.session().is_authenticated() {
        println!("Not logged in");
        return Ok(());
    }

    controller.refresh().await;

    if controller.session().is_authenticated() {
        println!("Session renewed");
    } else {
        println!("Session could not be renewed and has ended");
    }
    Ok(())
}

fn logout(config: &Config) -> Result<()> {
    let controller = build_controller(config)?;
    controller.logout();
    println!("Logged out");
    Ok(())
}

async fn watch(config: &Config) -> Result<()> {
    let controller = build_controller(config)?;
    if !controller.session().is_authenticated() {
        println!("Not logged in - run `tokenward login` first");
        return Ok(());
    }

    let handle = controller.start_watch();
    let mut changes = controller.subscribe();
    let mut previous = changes.borrow_and_update().clone();
    println!("Watching session (Ctrl+C to stop)");
    info!("Expiry watch running");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = changes.borrow_and_update().clone();
                if let Some(message) = terminal::describe_change(&previous, &current) {
                    println!("{}", message);
                }
                if !current.is_authenticated() {
                    break;
                }
                previous = current;
            }
        }
    }

    handle.stop().await;
    Ok(())
}

async fn serve_relay(config: &Config) -> Result<()> {
    let backend = HttpAuthBackend::new(&config.base_url, config.request_timeout())
        .context("Failed to create HTTP client")?;
    println!("Relaying logins on http://{}{}", config.relay_addr, relay::LOGIN_ROUTE);
    relay::serve(&config.relay_addr, Arc::new(backend)).await
}

//! hookchat - terminal chat client for an automation webhook
//!
//! USAGE:
//!   hookchat                         # sign in, then chat
//!   hookchat doctor                  # check config and endpoints
//!   hookchat config set <key> <url>  # non-interactive config

use anyhow::Result;
use std::sync::Arc;

use hookchat::client::{self, Webhook, WebhookClient};
use hookchat::config;
use hookchat::credential::CredentialStore;
use hookchat::gate::SessionGate;
use hookchat::logging;
use hookchat::ui::{self, ChatExit};

// ═══════════════════════════════════════════════════════════════
// CLI
// ═══════════════════════════════════════════════════════════════

#[derive(Debug)]
enum Command {
    Interactive,
    Doctor,
    ConfigSet { key: String, value: String },
    Help,
}

fn parse_args() -> Command {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        return Command::Help;
    }

    match args.first().map(|s| s.as_str()) {
        None => Command::Interactive,
        Some("doctor") => Command::Doctor,
        Some("config") if args.get(1).map(|s| s.as_str()) == Some("set") => Command::ConfigSet {
            key: args.get(2).cloned().unwrap_or_default(),
            value: args.get(3).cloned().unwrap_or_default(),
        },
        Some(_) => Command::Help,
    }
}

fn print_help() {
    println!(r#"hookchat - terminal chat client for an automation webhook

USAGE:
    hookchat                          # sign in, then chat
    hookchat doctor                   # check config and endpoints
    hookchat config set <key> <url>   # set chat_url, refresh_url or verify_url

CONFIG:
    ~/.config/hookchat/config.json    Webhook endpoints
    ~/.local/state/hookchat/logs/     Diagnostic log

ENVIRONMENT:
    HOOKCHAT_CHAT_URL                 Override chat webhook URL
    HOOKCHAT_REFRESH_URL              Override refresh webhook URL
    HOOKCHAT_VERIFY_URL               Override login probe URL
    HOOKCHAT_LOG                      Log filter (default: info)

CONTROLS (chat view):
    Enter / Ctrl+S        Send
    Shift+Enter / Alt+Enter   New line
    Ctrl+R                Refresh knowledgebase
    Esc / Ctrl+C          Quit

Credentials are kept in memory only and forgotten on exit.
"#);
}

// ═══════════════════════════════════════════════════════════════
// MAIN
// ═══════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() -> Result<()> {
    match parse_args() {
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Doctor => run_doctor().await,
        Command::ConfigSet { key, value } => run_config_set(&key, &value),
        Command::Interactive => run_interactive().await,
    }
}

// ═══════════════════════════════════════════════════════════════
// COMMANDS
// ═══════════════════════════════════════════════════════════════

async fn run_doctor() -> Result<()> {
    println!("hookchat doctor\n");

    let path = config::config_path()?;
    println!("[{}] Config: {}", if path.exists() { "✓" } else { "✗" }, path.display());

    let cfg = config::Config::load()?;
    let endpoints = match cfg.endpoints() {
        Ok(ep) => ep,
        Err(e) => {
            println!("[✗] Chat URL: {}", e);
            return Ok(());
        }
    };
    println!("[✓] Chat URL: {}", endpoints.chat_url);
    println!("[✓] Login probe URL: {}", endpoints.verify_url);
    match &endpoints.refresh_url {
        Some(url) => println!("[✓] Refresh URL: {}", url),
        None => println!("[✗] Refresh URL: not set (refresh will fail)"),
    }

    print!("[?] Network: checking...");
    match client::check_reachable(&endpoints.chat_url).await {
        Ok(status) => println!("\r[✓] Network: reachable (HTTP {})   ", status),
        Err(e) => println!("\r[✗] Network: {:#}", e),
    }

    Ok(())
}

fn run_config_set(key: &str, value: &str) -> Result<()> {
    let path = config::config_path()?;
    let mut cfg = config::Config::load_from(&path)?;
    cfg.set(key, value)?;
    cfg.save_to(&path)?;
    println!("{} saved to {}", key, path.display());
    Ok(())
}

async fn run_interactive() -> Result<()> {
    let _log_guard = logging::init()?;

    let endpoints = config::Config::load()?.endpoints()?;
    tracing::info!(chat_url = %endpoints.chat_url, "starting");

    let webhook: Arc<dyn Webhook> = Arc::new(WebhookClient::new(endpoints));
    let gate = SessionGate::new(Arc::new(CredentialStore::new()));

    loop {
        match ui::run_chat(&gate, webhook.clone()).await? {
            ChatExit::Quit => return Ok(()),
            ChatExit::RedirectToLogin => {
                if !ui::run_login(&gate, webhook.as_ref()).await? {
                    return Ok(());
                }
            }
        }
    }
}

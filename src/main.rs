//! modbotd - modular chat-bot daemon.
//!
//! Loads configuration and save data, connects one bot per stored account
//! token, and drives the operator console until `stop`.

use anyhow::bail;
use modbot::bot::{Bot, ControlSignal};
use modbot::config::{self, Config};
use modbot::console::{ConsoleCommand, ConsoleParseError, HELP_TEXT, parse_console_line};
use modbot::gateway::{BotIdentity, ChannelId, LocalGateway, UserId, UserRef};
use modbot::modules::default_modules;
use modbot::store::{Store, StoreHandle};
use modbot::tier::AccountMode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Channel the operator console injects messages into.
const CONSOLE_CHANNEL: ChannelId = ChannelId(1);

struct RunningBot {
    bot: Arc<Bot>,
    gateway: Arc<LocalGateway>,
    run_task: JoinHandle<()>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;
    if let Err(errors) = config::validate(&config) {
        for err in &errors {
            error!(error = %err, "Invalid configuration");
        }
        bail!("refusing to start with invalid configuration");
    }

    let store = Store::load(&config.store.path)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if store.with(|d| d.tokens.is_empty()) {
        info!("no stored account tokens");
        token_entry(&store, &mut lines).await?;
        store.save()?;
    }

    let (control_tx, mut control_rx) = mpsc::channel::<ControlSignal>(8);
    let mut bots = start_bots(&config, &store, &control_tx).await;
    println!("{HELP_TEXT}");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_console_line(&line) {
                    Ok(ConsoleCommand::Stop) => break,
                    Ok(ConsoleCommand::Restart) => {
                        restart_all(&mut bots, &config, &store, &control_tx).await;
                    }
                    Ok(ConsoleCommand::Say(text)) => say(&config, &bots, &text).await,
                    Ok(ConsoleCommand::Help) => println!("{HELP_TEXT}"),
                    Ok(ConsoleCommand::List) => list_tokens(&store),
                    Ok(ConsoleCommand::Add(token)) => {
                        store.update(|d| d.tokens.push(token));
                        store.save()?;
                        println!("Token stored. `restart` to connect it.");
                    }
                    Ok(ConsoleCommand::Remove(index)) => {
                        let removed = store.update(|d| {
                            (index <= d.tokens.len()).then(|| d.tokens.remove(index - 1))
                        });
                        match removed {
                            Some(_) => {
                                store.save()?;
                                println!("Token removed. `restart` to disconnect it.");
                            }
                            None => println!("No token at index {index}."),
                        }
                    }
                    Ok(ConsoleCommand::Done) => {}
                    Err(ConsoleParseError::Empty) => {}
                    Err(err) => println!("{err}"),
                }
            }
            signal = control_rx.recv() => match signal {
                Some(ControlSignal::Restart) => {
                    restart_all(&mut bots, &config, &store, &control_tx).await;
                }
                Some(ControlSignal::Shutdown) | None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!("shutting down");
    stop_bots(std::mem::take(&mut bots)).await;
    store.save()?;
    Ok(())
}

/// Interactive token collection, like first-run setup.
async fn token_entry(store: &StoreHandle, lines: &mut Lines<BufReader<Stdin>>) -> anyhow::Result<()> {
    println!("Enter account tokens (`add <token>`, `remove <index>`, `list`, `done`):");
    loop {
        let Some(line) = lines.next_line().await? else {
            bail!("stdin closed during token entry");
        };
        match parse_console_line(&line) {
            Ok(ConsoleCommand::Add(token)) => {
                store.update(|d| d.tokens.push(token));
                println!("Token added.");
            }
            Ok(ConsoleCommand::Remove(index)) => {
                let removed = store.update(|d| {
                    (index <= d.tokens.len()).then(|| d.tokens.remove(index - 1))
                });
                println!("{}", if removed.is_some() { "Token removed." } else { "No such index." });
            }
            Ok(ConsoleCommand::List) => list_tokens(store),
            Ok(ConsoleCommand::Done) => {
                if store.with(|d| d.tokens.is_empty()) {
                    println!("At least one token is required.");
                } else {
                    return Ok(());
                }
            }
            Ok(ConsoleCommand::Stop) => bail!("stopped during token entry"),
            Ok(_) => println!("Finish token entry first (`done`)."),
            Err(ConsoleParseError::Empty) => {}
            Err(err) => println!("{err}"),
        }
    }
}

fn list_tokens(store: &StoreHandle) {
    store.with(|d| {
        if d.tokens.is_empty() {
            println!("No tokens stored.");
        }
        for (i, token) in d.tokens.iter().enumerate() {
            // Tokens are credentials; only show a stub.
            let stub: String = token.chars().take(8).collect();
            println!("  {}: {}... ({} chars)", i + 1, stub, token.len());
        }
    });
}

/// Bring up one bot per stored token.
///
/// The loopback gateway stands in for a real platform connector, which
/// would derive the identity from the token instead.
async fn start_bots(
    config: &Config,
    store: &StoreHandle,
    control_tx: &mpsc::Sender<ControlSignal>,
) -> Vec<RunningBot> {
    let tokens = store.with(|d| d.tokens.clone());
    let mut bots = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let mode = AccountMode::from_token(token);
        let identity = BotIdentity {
            id: UserId(i as u64 + 1),
            name: format!("modbot{}", i + 1),
            discriminator: format!("{:04}", i + 1),
        };
        info!(bot = %identity.tag(), ?mode, "starting bot");

        let (gateway, events) = LocalGateway::new(identity);
        let modules = default_modules(mode, store);
        let bot = Arc::new(Bot::new(
            gateway.clone(),
            mode,
            &config.bot,
            control_tx.clone(),
            modules,
        ));
        bot.init_modules().await;

        let runner = bot.clone();
        let run_task = tokio::spawn(async move {
            runner.run(events).await;
        });
        bots.push(RunningBot { bot, gateway, run_task });
    }

    info!(count = bots.len(), "bots started");
    bots
}

async fn stop_bots(bots: Vec<RunningBot>) {
    for running in bots {
        running.run_task.abort();
        running.bot.unload_modules().await;
    }
}

async fn restart_all(
    bots: &mut Vec<RunningBot>,
    config: &Config,
    store: &StoreHandle,
    control_tx: &mpsc::Sender<ControlSignal>,
) {
    info!("restarting all bots");
    stop_bots(std::mem::take(bots)).await;
    tokio::time::sleep(Duration::from_millis(2500)).await;
    *bots = start_bots(config, store, control_tx).await;
}

/// Inject a chat line as the operator principal into every bot.
async fn say(config: &Config, bots: &[RunningBot], text: &str) {
    let operator = UserRef {
        id: UserId(0xFFFF),
        name: config.operator.name.clone(),
        discriminator: config.operator.discriminator.clone(),
        is_bot: false,
    };
    for running in bots {
        if let Err(err) = running
            .gateway
            .inject_message(operator.clone(), CONSOLE_CHANNEL, text)
            .await
        {
            error!(error = %err, "failed to inject console message");
        }
    }
}

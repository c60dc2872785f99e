//! Integration test common infrastructure.
//!
//! Provides a loopback bot harness, configurable fixture modules and
//! commands, and a recording parse-failed observer.

use async_trait::async_trait;
use modbot::bot::{Bot, ControlSignal};
use modbot::command::{Command, CommandContext};
use modbot::config::BotConfig;
use modbot::dispatch::{Dispatcher, ParseFailedObserver};
use modbot::error::{HandlerError, HandlerResult, ModuleError};
use modbot::gateway::{
    BotIdentity, ChannelId, LocalGateway, MessageEvent, MessageId, UserId, UserRef,
};
use modbot::module::{Module, ModuleHost};
use modbot::tier::{AccountMode, Tier};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub const CHANNEL: ChannelId = ChannelId(1);
pub const BOT_USER: UserId = UserId(42);

/// What a fixture command does when invoked.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Return `Ok(true)`.
    Succeed,
    /// Return `Ok(false)` so the dispatcher shows usage.
    Decline,
    /// Return an internal error.
    Fail(&'static str),
}

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub args: Vec<String>,
    pub rest: String,
}

/// A configurable command that records its invocations.
pub struct FixtureCommand {
    name: &'static str,
    aliases: &'static [&'static str],
    requires: Tier,
    use_module_prefix: bool,
    usage: &'static str,
    behavior: Behavior,
    calls: Mutex<Vec<Call>>,
}

impl FixtureCommand {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            aliases: &[],
            requires: Tier::None,
            use_module_prefix: true,
            usage: "",
            behavior: Behavior::Succeed,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn requires(mut self, tier: Tier) -> Self {
        self.requires = tier;
        self
    }

    pub fn bare(mut self) -> Self {
        self.use_module_prefix = false;
        self
    }

    pub fn usage(mut self, usage: &'static str) -> Self {
        self.usage = usage;
        self
    }

    pub fn behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Command for FixtureCommand {
    fn name(&self) -> &'static str {
        self.name
    }

    fn aliases(&self) -> &'static [&'static str] {
        self.aliases
    }

    fn requires(&self) -> Tier {
        self.requires
    }

    fn use_module_prefix(&self) -> bool {
        self.use_module_prefix
    }

    fn usage(&self) -> &'static str {
        self.usage
    }

    fn description(&self) -> &'static str {
        "Fixture command."
    }

    async fn run(
        &self,
        _ctx: &CommandContext,
        _event: &MessageEvent,
        args: &[&str],
        rest: &str,
    ) -> HandlerResult {
        self.calls.lock().unwrap().push(Call {
            args: args.iter().map(|a| a.to_string()).collect(),
            rest: rest.to_string(),
        });
        match self.behavior {
            Behavior::Succeed => Ok(true),
            Behavior::Decline => Ok(false),
            Behavior::Fail(message) => Err(HandlerError::Internal(message.to_string())),
        }
    }
}

/// Records parse-failed notifications.
#[derive(Default)]
pub struct RecordingObserver {
    notified: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn notifications(&self) -> Vec<String> {
        self.notified.lock().unwrap().clone()
    }
}

#[async_trait]
impl ParseFailedObserver for RecordingObserver {
    async fn on_parse_failed(&self, _ctx: &CommandContext, event: &MessageEvent) {
        self.notified.lock().unwrap().push(event.text.clone());
    }
}

/// A module assembled from fixture commands.
pub struct FixtureModule {
    name: &'static str,
    prefix: Option<&'static str>,
    commands: Vec<Arc<dyn Command>>,
    observers: Vec<Arc<dyn ParseFailedObserver>>,
    /// Deliberately leak registrations on unload, for leak-warning tests.
    skip_unload: bool,
}

impl FixtureModule {
    pub fn new(name: &'static str, prefix: Option<&'static str>) -> Self {
        Self {
            name,
            prefix,
            commands: Vec::new(),
            observers: Vec::new(),
            skip_unload: false,
        }
    }

    pub fn command(mut self, command: Arc<dyn Command>) -> Self {
        self.commands.push(command);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn ParseFailedObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn leaky(mut self) -> Self {
        self.skip_unload = true;
        self
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl Module for FixtureModule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn prefix(&self) -> Option<&str> {
        self.prefix
    }

    fn description(&self) -> Option<&str> {
        Some("Fixture module.")
    }

    async fn init(&self, host: &mut ModuleHost<'_>) -> Result<(), ModuleError> {
        for command in &self.commands {
            host.add_command(command.clone());
        }
        for observer in &self.observers {
            host.observe_parse_failed(observer.clone());
        }
        Ok(())
    }

    async fn unload(&self, host: &mut ModuleHost<'_>) -> Result<(), ModuleError> {
        if self.skip_unload {
            return Ok(());
        }
        for command in &self.commands {
            host.remove_command(command);
        }
        host.detach_observers();
        Ok(())
    }
}

/// A fully wired loopback bot.
pub struct TestBot {
    pub bot: Arc<Bot>,
    pub gateway: Arc<LocalGateway>,
    pub dispatcher: Dispatcher,
    pub control_rx: mpsc::Receiver<ControlSignal>,
    // Keeps the loopback event stream open.
    _events: mpsc::Receiver<MessageEvent>,
}

/// Build and initialize a bot with the given modules.
pub async fn spawn_bot(mode: AccountMode, modules: Vec<Arc<dyn Module>>) -> TestBot {
    let identity = BotIdentity {
        id: BOT_USER,
        name: "BotName".to_string(),
        discriminator: "0042".to_string(),
    };
    let (gateway, events) = LocalGateway::new(identity);
    let config = BotConfig {
        command_prefix: "!".to_string(),
        mention_bare_name: true,
        roster: vec!["alice#1234".to_string()],
    };
    let (control_tx, control_rx) = mpsc::channel(8);
    let bot = Arc::new(Bot::new(gateway.clone(), mode, &config, control_tx, modules));
    bot.init_modules().await;
    let dispatcher = bot.dispatcher();
    TestBot {
        bot,
        gateway,
        dispatcher,
        control_rx,
        _events: events,
    }
}

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1000);

/// Build an inbound message event from `sender`.
pub fn message(sender: UserRef, text: &str) -> MessageEvent {
    MessageEvent {
        id: MessageId(NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed)),
        channel: CHANNEL,
        sender,
        text: text.to_string(),
    }
}

/// The whitelisted principal from the harness roster.
pub fn whitelisted() -> UserRef {
    UserRef {
        id: UserId(7),
        name: "alice".to_string(),
        discriminator: "1234".to_string(),
        is_bot: false,
    }
}

/// A principal with no special standing.
pub fn stranger() -> UserRef {
    UserRef {
        id: UserId(8),
        name: "bob".to_string(),
        discriminator: "5678".to_string(),
        is_bot: false,
    }
}

/// The bot's own controlling account.
pub fn controlling_account() -> UserRef {
    UserRef {
        id: BOT_USER,
        name: "BotName".to_string(),
        discriminator: "0042".to_string(),
        is_bot: false,
    }
}

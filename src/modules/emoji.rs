//! Emoji substitution module.
//!
//! Watches messages that matched no command and rewrites ASCII shortcuts
//! in the bot's own messages (selfbot accounts only load this module).
//! The enabled flag survives restarts via the save-data store.

use crate::command::{Command, CommandContext};
use crate::dispatch::ParseFailedObserver;
use crate::error::{HandlerResult, ModuleError};
use crate::gateway::MessageEvent;
use crate::module::{Module, ModuleHost};
use crate::store::StoreHandle;
use crate::tier::Tier;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Shortcut table applied to free text.
const REPLACEMENTS: &[(&str, &str)] = &[
    // Emojis
    ("/shrug", "¯\\_(ツ)_/¯"),
    ("/lenny", "( ͡° ͜ʖ ͡°)"),
    ("/lod", "ಠ_ಠ"),
    ("/zoidberg", "(V) (°,,,°) (V)"),
    // Arrows
    ("-->", "→"),
    ("<--", "←"),
    ("==>", "⇒"),
    ("<==", "⇐"),
    // Math
    ("/inf", "∞"),
    ("/deg", "°"),
    ("/pi", "π"),
    ("/tau", "τ"),
    ("+/-", "±"),
    ("-/+", "∓"),
];

/// Apply every shortcut to `text`, returning `None` when nothing changed.
fn substitute(text: &str) -> Option<String> {
    let mut out = text.to_string();
    for (from, to) in REPLACEMENTS {
        if out.contains(from) {
            out = out.replace(from, to);
        }
    }
    (out != text).then_some(out)
}

pub struct Emoji {
    store: StoreHandle,
    enabled: Arc<AtomicBool>,
    observer: Arc<EmojiObserver>,
    activate: Arc<dyn Command>,
    deactivate: Arc<dyn Command>,
    list: Arc<dyn Command>,
}

impl Emoji {
    pub fn new(store: StoreHandle) -> Self {
        let enabled = Arc::new(AtomicBool::new(false));
        Self {
            observer: Arc::new(EmojiObserver { enabled: enabled.clone() }),
            activate: Arc::new(ActivateCommand {
                enabled: enabled.clone(),
                store: store.clone(),
            }),
            deactivate: Arc::new(DeactivateCommand {
                enabled: enabled.clone(),
                store: store.clone(),
            }),
            list: Arc::new(ListCommand),
            store,
            enabled,
        }
    }
}

#[async_trait]
impl Module for Emoji {
    fn name(&self) -> &'static str {
        "emoji"
    }

    fn prefix(&self) -> Option<&str> {
        Some("emoji")
    }

    fn description(&self) -> Option<&str> {
        Some(
            "Replaces custom ASCII emojis in chat messages.\n\
             For example, writing /shrug will result in ¯\\_(ツ)_/¯",
        )
    }

    async fn init(&self, host: &mut ModuleHost<'_>) -> Result<(), ModuleError> {
        self.enabled
            .store(self.store.with(|d| d.emoji_replace), Ordering::Release);

        host.add_command(self.activate.clone());
        host.add_command(self.deactivate.clone());
        host.add_command(self.list.clone());
        host.observe_parse_failed(self.observer.clone());
        Ok(())
    }

    async fn unload(&self, host: &mut ModuleHost<'_>) -> Result<(), ModuleError> {
        self.store
            .update(|d| d.emoji_replace = self.enabled.load(Ordering::Acquire));

        host.remove_command(&self.activate);
        host.remove_command(&self.deactivate);
        host.remove_command(&self.list);
        host.detach_observers();
        Ok(())
    }
}

/// Rewrites the bot's own free-text messages when substitution is active.
struct EmojiObserver {
    enabled: Arc<AtomicBool>,
}

#[async_trait]
impl ParseFailedObserver for EmojiObserver {
    async fn on_parse_failed(&self, ctx: &CommandContext, event: &MessageEvent) {
        if !self.enabled.load(Ordering::Acquire) {
            return;
        }
        // Only the controlling account's own messages get rewritten.
        if event.sender.id != ctx.gateway.identity().id {
            return;
        }
        let Some(replaced) = substitute(&event.text) else {
            return;
        };
        if let Err(err) = ctx
            .gateway
            .edit_message(event.channel, event.id, &replaced)
            .await
        {
            warn!(message = %event.id, error = %err, "emoji substitution edit failed");
        }
    }
}

struct ActivateCommand {
    enabled: Arc<AtomicBool>,
    store: StoreHandle,
}

#[async_trait]
impl Command for ActivateCommand {
    fn name(&self) -> &'static str {
        "activate"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["on"]
    }

    fn requires(&self) -> Tier {
        Tier::Selfbot
    }

    fn description(&self) -> &'static str {
        "Turns emoji substitution on."
    }

    async fn run(
        &self,
        ctx: &CommandContext,
        event: &MessageEvent,
        _args: &[&str],
        _rest: &str,
    ) -> HandlerResult {
        self.enabled.store(true, Ordering::Release);
        self.store.update(|d| d.emoji_replace = true);
        ctx.gateway
            .send_message(event.channel, "Emoji substitution is now **on**.")
            .await?;
        Ok(true)
    }
}

struct DeactivateCommand {
    enabled: Arc<AtomicBool>,
    store: StoreHandle,
}

#[async_trait]
impl Command for DeactivateCommand {
    fn name(&self) -> &'static str {
        "deactivate"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["off"]
    }

    fn requires(&self) -> Tier {
        Tier::Selfbot
    }

    fn description(&self) -> &'static str {
        "Turns emoji substitution off."
    }

    async fn run(
        &self,
        ctx: &CommandContext,
        event: &MessageEvent,
        _args: &[&str],
        _rest: &str,
    ) -> HandlerResult {
        self.enabled.store(false, Ordering::Release);
        self.store.update(|d| d.emoji_replace = false);
        ctx.gateway
            .send_message(event.channel, "Emoji substitution is now **off**.")
            .await?;
        Ok(true)
    }
}

struct ListCommand;

#[async_trait]
impl Command for ListCommand {
    fn name(&self) -> &'static str {
        "list"
    }

    fn description(&self) -> &'static str {
        "Lists the available ASCII emoji shortcuts."
    }

    async fn run(
        &self,
        ctx: &CommandContext,
        event: &MessageEvent,
        _args: &[&str],
        _rest: &str,
    ) -> HandlerResult {
        let mut lines = vec!["**Available shortcuts:**".to_string()];
        for (from, to) in REPLACEMENTS {
            lines.push(format!("`{from}` {to}"));
        }
        ctx.gateway
            .send_message(event.channel, &lines.join("\n"))
            .await?;
        Ok(true)
    }
}

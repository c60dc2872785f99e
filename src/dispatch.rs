//! Per-message command dispatch.
//!
//! For each inbound message the dispatcher resolves the sender's tier
//! once, probes modules in registration order through the parser, and
//! invokes at most one matching command (or answers a module-info
//! request). Handler failures are contained here: logged, reported inline
//! to the originating channel, and never propagated to the event loop.

use crate::bot::Shared;
use crate::command::{Command, CommandContext, is_help_marker};
use crate::gateway::MessageEvent;
use crate::module::module_info;
use crate::parse::{ParseOutcome, message_mentions_bot, parse_line};
use crate::registry::ModuleId;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{error, info, warn};

/// Callback invoked when no module matched a message.
///
/// Modules attach these on init to implement free-text side effects (for
/// example emoji substitution); the dispatcher is the one place that
/// invokes them.
#[async_trait]
pub trait ParseFailedObserver: Send + Sync {
    async fn on_parse_failed(&self, ctx: &CommandContext, event: &MessageEvent);
}

/// Observer list owned by the dispatcher. Written only by module
/// init/unload, while dispatch is quiescent.
#[derive(Default)]
pub struct ObserverList {
    entries: Vec<(ModuleId, Arc<dyn ParseFailedObserver>)>,
}

impl ObserverList {
    pub fn attach(&mut self, module: ModuleId, observer: Arc<dyn ParseFailedObserver>) {
        self.entries.push((module, observer));
    }

    /// Detach every observer a module attached, returning how many.
    pub fn detach_module(&mut self, module: ModuleId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(m, _)| *m != module);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn snapshot(&self) -> Vec<Arc<dyn ParseFailedObserver>> {
        self.entries.iter().map(|(_, o)| o.clone()).collect()
    }
}

/// Owned match plan, extracted under the registry read lock so no guard is
/// held across handler awaits.
enum Matched<'t> {
    Command {
        name: &'static str,
        handler: Arc<dyn Command>,
        help: String,
        args: Vec<&'t str>,
        rest: String,
    },
    ModuleInfo {
        module_name: &'static str,
        info: Option<String>,
    },
}

/// Routes inbound messages to command handlers.
///
/// Cheap to clone; all state lives in the owning bot.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Handle one inbound message end to end.
    pub async fn handle_event(&self, event: MessageEvent) {
        let shared = &self.shared;

        if event.sender.is_bot {
            return;
        }
        if !shared.initialized.load(Ordering::Acquire) {
            return;
        }
        if event.text.trim().is_empty() {
            return;
        }

        // Tier resolution happens once per message, not per module.
        let mentioned = message_mentions_bot(
            &event.text,
            &shared.identity,
            shared.options.mention_bare_name,
        );
        let tier = shared.resolver.resolve(&event.sender, mentioned);

        let matched: Option<Matched<'_>> = {
            let registry = shared.registry.read();
            let mut found = None;
            for module in 0..registry.module_count() {
                match parse_line(&registry, module, &shared.identity, &shared.options, &event.text, tier)
                {
                    Some(ParseOutcome::Command { entry, args, rest }) => {
                        found = Some(Matched::Command {
                            name: entry.handler.name(),
                            handler: entry.handler.clone(),
                            help: entry.help_text(&shared.options.command_prefix),
                            args,
                            rest,
                        });
                        break;
                    }
                    Some(ParseOutcome::ModuleInfo) => {
                        found = Some(Matched::ModuleInfo {
                            module_name: registry.module(module).name,
                            info: module_info(&registry, module, &shared.options.command_prefix),
                        });
                        break;
                    }
                    None => continue,
                }
            }
            found
        };

        match matched {
            Some(Matched::Command { name, handler, help, args, rest }) => {
                if is_help_marker(rest.trim()) {
                    self.send_quoted(&event, &help).await;
                    return;
                }

                info!(command = name, sender = %event.sender.tag(), "running command");
                match handler.run(&shared.ctx, &event, &args, &rest).await {
                    Ok(true) => {}
                    Ok(false) => {
                        // The handler declined the invocation: show usage.
                        self.send_quoted(&event, &help).await;
                    }
                    Err(err) => {
                        error!(
                            command = name,
                            code = err.error_code(),
                            error = %err,
                            "error executing command"
                        );
                        self.send_inline(&event, &format!("Error executing command!\n```{err}```"))
                            .await;
                    }
                }
            }
            Some(Matched::ModuleInfo { module_name, info }) => {
                let Some(info) = info else { return };
                info!(module = module_name, sender = %event.sender.tag(), "sending module info");
                self.send_quoted(&event, &info).await;
            }
            None => self.notify_parse_failed(&event).await,
        }
    }

    /// Echo the triggering line back, then the payload, like a quoted reply.
    async fn send_quoted(&self, event: &MessageEvent, body: &str) {
        let text = format!("`{}`\n{}", event.text, body);
        self.send_inline(event, &text).await;
    }

    async fn send_inline(&self, event: &MessageEvent, text: &str) {
        if let Err(err) = self.shared.ctx.gateway.send_message(event.channel, text).await {
            warn!(channel = %event.channel, error = %err, "failed to send dispatch reply");
        }
    }

    async fn notify_parse_failed(&self, event: &MessageEvent) {
        let observers = self.shared.observers.read().snapshot();
        for observer in observers {
            observer.on_parse_failed(&self.shared.ctx, event).await;
        }
    }
}

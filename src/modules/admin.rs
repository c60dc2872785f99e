//! Administrative module: bulk delete, status, restart.

use crate::bot::ControlSignal;
use crate::command::{Command, CommandContext};
use crate::error::{HandlerError, HandlerResult, ModuleError};
use crate::gateway::{MessageEvent, MessageId};
use crate::module::{Module, ModuleHost};
use crate::tier::{AccountMode, Tier};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashSet;
use std::sync::Arc;
use tracing::info;

/// Administrative commands. Loaded under the `self` scope on selfbot
/// accounts and `bot` on service accounts so both can coexist in one
/// channel without clashing.
pub struct Admin {
    prefix: &'static str,
    clear: Arc<dyn Command>,
    status: Arc<dyn Command>,
    restart: Arc<dyn Command>,
}

impl Admin {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            clear: Arc::new(ClearCommand::default()),
            status: Arc::new(StatusCommand),
            restart: Arc::new(RestartCommand),
        }
    }
}

#[async_trait]
impl Module for Admin {
    fn name(&self) -> &'static str {
        "admin"
    }

    fn prefix(&self) -> Option<&str> {
        Some(self.prefix)
    }

    fn description(&self) -> Option<&str> {
        Some("Administrative commands for managing the bot and its channels.")
    }

    async fn init(&self, host: &mut ModuleHost<'_>) -> Result<(), ModuleError> {
        host.add_command(self.clear.clone());
        host.add_command(self.status.clone());
        host.add_command(self.restart.clone());
        Ok(())
    }

    async fn unload(&self, host: &mut ModuleHost<'_>) -> Result<(), ModuleError> {
        host.remove_command(&self.clear);
        host.remove_command(&self.status);
        host.remove_command(&self.restart);
        Ok(())
    }
}

/// Bulk-delete the most recent messages in the triggering channel.
#[derive(Default)]
pub struct ClearCommand {
    /// Triggering-message ids currently being handled. Guards against a
    /// double invocation when multiple bot instances watch one channel.
    in_flight: DashSet<MessageId>,
}

#[async_trait]
impl Command for ClearCommand {
    fn name(&self) -> &'static str {
        "clear"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["c"]
    }

    fn requires(&self) -> Tier {
        Tier::Whitelist
    }

    fn use_module_prefix(&self) -> bool {
        false
    }

    fn usage(&self) -> &'static str {
        "[count]"
    }

    fn description(&self) -> &'static str {
        "Removes the most recent message, or the X most recent messages, where X is the \
         argument you supply. The count excludes the command message itself."
    }

    async fn run(
        &self,
        ctx: &CommandContext,
        event: &MessageEvent,
        args: &[&str],
        rest: &str,
    ) -> HandlerResult {
        let _ = rest;
        if args.len() > 2 {
            return Ok(false);
        }

        // Another invocation for the same trigger is already running.
        if !self.in_flight.insert(event.id) {
            return Ok(true);
        }
        let result = self.clear_messages(ctx, event, args).await;
        self.in_flight.remove(&event.id);
        result
    }
}

impl ClearCommand {
    async fn clear_messages(
        &self,
        ctx: &CommandContext,
        event: &MessageEvent,
        args: &[&str],
    ) -> HandlerResult {
        // Default removes the command message plus the one before it.
        let mut count: usize = 2;
        if let Some(arg) = args.get(1) {
            match arg.parse::<i64>() {
                Ok(n) => count = (n.unsigned_abs() as usize + 1).clamp(2, 200),
                Err(_) => {
                    ctx.gateway
                        .send_message(
                            event.channel,
                            "Unable to interpret the clear count. Please specify a valid integer.",
                        )
                        .await?;
                    return Ok(false);
                }
            }
        }

        info!(channel = %event.channel, count, "started clearing chat");

        let mut messages = match ctx.gateway.recent_messages(event.channel, count).await {
            Ok(messages) => messages,
            Err(err) => {
                ctx.gateway
                    .send_message(
                        event.channel,
                        &format!(
                            "An error occurred while fetching messages. \
                             *Maybe you tried deleting too many?*\n```{err}```"
                        ),
                    )
                    .await?;
                return Err(err.into());
            }
        };

        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        for message in messages.into_iter().take(count) {
            ctx.gateway.delete_message(event.channel, message.id).await?;
        }

        info!(channel = %event.channel, "clearing complete");
        Ok(true)
    }
}

/// Report uptime and account mode.
pub struct StatusCommand;

#[async_trait]
impl Command for StatusCommand {
    fn name(&self) -> &'static str {
        "status"
    }

    fn requires(&self) -> Tier {
        Tier::Whitelist
    }

    fn description(&self) -> &'static str {
        "Shows how long the bot has been running and in which account mode."
    }

    async fn run(
        &self,
        ctx: &CommandContext,
        event: &MessageEvent,
        _args: &[&str],
        _rest: &str,
    ) -> HandlerResult {
        let uptime = Utc::now() - ctx.active_since;
        let mode = match ctx.mode {
            AccountMode::Selfbot => "selfbot",
            AccountMode::Service => "service",
        };
        let text = format!(
            "**{}** up {}d {}h {}m {}s ({} mode)",
            ctx.gateway.identity().tag(),
            uptime.num_days(),
            uptime.num_hours() % 24,
            uptime.num_minutes() % 60,
            uptime.num_seconds() % 60,
            mode,
        );
        ctx.gateway.send_message(event.channel, &text).await?;
        Ok(true)
    }
}

/// Ask the supervisor to restart all bots.
pub struct RestartCommand;

#[async_trait]
impl Command for RestartCommand {
    fn name(&self) -> &'static str {
        "restart"
    }

    fn requires(&self) -> Tier {
        Tier::Whitelist
    }

    fn description(&self) -> &'static str {
        "Restarts all connected bots, reloading every module."
    }

    async fn run(
        &self,
        ctx: &CommandContext,
        event: &MessageEvent,
        _args: &[&str],
        _rest: &str,
    ) -> HandlerResult {
        ctx.gateway.send_message(event.channel, "Restarting...").await?;
        ctx.control
            .send(ControlSignal::Restart)
            .await
            .map_err(|_| HandlerError::Internal("supervisor unavailable".to_string()))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{BotIdentity, ChannelId, Gateway, LocalGateway, UserId, UserRef};
    use tokio::sync::mpsc;

    fn identity() -> BotIdentity {
        BotIdentity {
            id: UserId(1),
            name: "Bot".to_string(),
            discriminator: "0001".to_string(),
        }
    }

    fn context(gateway: Arc<LocalGateway>) -> (CommandContext, mpsc::Receiver<ControlSignal>) {
        let (control, control_rx) = mpsc::channel(4);
        (
            CommandContext {
                gateway,
                control,
                mode: AccountMode::Service,
                active_since: Utc::now(),
            },
            control_rx,
        )
    }

    fn event(id: u64, channel: ChannelId, text: &str) -> MessageEvent {
        MessageEvent {
            id: MessageId(id),
            channel,
            sender: UserRef {
                id: UserId(9),
                name: "alice".to_string(),
                discriminator: "1234".to_string(),
                is_bot: false,
            },
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_clear_deletes_requested_count() {
        let (gateway, _events) = LocalGateway::new(identity());
        let chan = ChannelId(1);
        for i in 0..5 {
            gateway.send_message(chan, &format!("msg {i}")).await.unwrap();
        }
        let (ctx, _control_rx) = context(gateway.clone());

        // "!clear 2" removes 2 messages plus the command message slot: 3.
        let cmd = ClearCommand::default();
        let outcome = cmd
            .run(&ctx, &event(100, chan, "!clear 2"), &["clear", "2"], "2")
            .await
            .unwrap();
        assert!(outcome);
        assert_eq!(gateway.recent_messages(chan, 100).await.unwrap().len(), 2);
        assert!(cmd.in_flight.is_empty());
    }

    #[tokio::test]
    async fn test_clear_dedups_concurrent_trigger() {
        let (gateway, _events) = LocalGateway::new(identity());
        let chan = ChannelId(1);
        gateway.send_message(chan, "msg").await.unwrap();
        let (ctx, _control_rx) = context(gateway.clone());

        let cmd = ClearCommand::default();
        cmd.in_flight.insert(MessageId(100));
        let outcome = cmd
            .run(&ctx, &event(100, chan, "!clear"), &["clear"], "")
            .await
            .unwrap();
        // Claimed handled so no usage text shows, but nothing was deleted.
        assert!(outcome);
        assert_eq!(gateway.recent_messages(chan, 100).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_rejects_garbage_count() {
        let (gateway, _events) = LocalGateway::new(identity());
        let chan = ChannelId(1);
        gateway.send_message(chan, "msg").await.unwrap();
        let (ctx, _control_rx) = context(gateway.clone());

        let cmd = ClearCommand::default();
        let outcome = cmd
            .run(&ctx, &event(100, chan, "!clear lots"), &["clear", "lots"], "lots")
            .await
            .unwrap();
        assert!(!outcome);
        assert!(cmd.in_flight.is_empty());
        let sent = gateway.sent_texts();
        assert!(sent.iter().any(|t| t.contains("Unable to interpret")));
    }

    #[tokio::test]
    async fn test_restart_signals_supervisor() {
        let (gateway, _events) = LocalGateway::new(identity());
        let chan = ChannelId(1);
        let (ctx, mut control_rx) = context(gateway.clone());

        let outcome = RestartCommand
            .run(&ctx, &event(100, chan, "!bot.restart"), &["restart"], "")
            .await
            .unwrap();
        assert!(outcome);
        assert_eq!(control_rx.recv().await, Some(ControlSignal::Restart));
    }
}

//! Platform gateway abstraction.
//!
//! The connection to the messaging platform is an external collaborator:
//! the dispatch core only needs an event stream, the bot's own identity,
//! and a handful of message operations. Everything platform-specific lives
//! behind the [`Gateway`] trait. [`LocalGateway`] is the in-process
//! implementation used by the operator console and the test harness.

use crate::error::GatewayError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

/// Unique id of a platform user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(pub u64);

/// Unique id of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(pub u64);

/// Unique id of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A message sender as seen by the dispatch core.
#[derive(Debug, Clone)]
pub struct UserRef {
    pub id: UserId,
    pub name: String,
    pub discriminator: String,
    /// Whether the platform marks this account as a bot.
    pub is_bot: bool,
}

impl UserRef {
    /// The `name#discriminator` form used by the whitelist roster.
    pub fn tag(&self) -> String {
        format!("{}#{}", self.name, self.discriminator)
    }
}

/// An inbound chat message delivered by the gateway.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub id: MessageId,
    pub channel: ChannelId,
    pub sender: UserRef,
    pub text: String,
}

/// The connected account's own identity.
#[derive(Debug, Clone)]
pub struct BotIdentity {
    pub id: UserId,
    pub name: String,
    pub discriminator: String,
}

impl BotIdentity {
    /// Canonical mention form.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id.0)
    }

    /// Canonical nickname mention form.
    pub fn nickname_mention(&self) -> String {
        format!("<@!{}>", self.id.0)
    }

    /// The `name#discriminator` form.
    pub fn tag(&self) -> String {
        format!("{}#{}", self.name, self.discriminator)
    }
}

/// A message as stored by the platform, returned by history queries.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub id: MessageId,
    pub channel: ChannelId,
    pub sender: UserId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Platform connection surface needed by the dispatch core and modules.
///
/// All operations resolve to a terminal "sent" state or a [`GatewayError`];
/// the core never retries on its own.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// The connected account's identity.
    fn identity(&self) -> &BotIdentity;

    /// Send a message to a channel, returning the new message's id.
    async fn send_message(&self, channel: ChannelId, text: &str) -> Result<MessageId, GatewayError>;

    /// Edit an existing message.
    async fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        text: &str,
    ) -> Result<(), GatewayError>;

    /// Delete an existing message.
    async fn delete_message(&self, channel: ChannelId, message: MessageId)
        -> Result<(), GatewayError>;

    /// Fetch up to `limit` of the most recent messages in a channel.
    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, GatewayError>;
}

/// Outbound action recorded by [`LocalGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundAction {
    Send { channel: ChannelId, text: String },
    Edit { channel: ChannelId, message: MessageId, text: String },
    Delete { channel: ChannelId, message: MessageId },
}

/// In-process loopback gateway.
///
/// Keeps per-channel history in memory and records every outbound action.
/// Backs the operator console's `say` command and the integration tests;
/// a real platform connector implements [`Gateway`] the same way.
pub struct LocalGateway {
    identity: BotIdentity,
    events_tx: mpsc::Sender<MessageEvent>,
    next_id: AtomicU64,
    channels: DashMap<ChannelId, Vec<StoredMessage>>,
    actions: Mutex<Vec<OutboundAction>>,
}

impl LocalGateway {
    /// Create a gateway and the event stream the bot will consume.
    pub fn new(identity: BotIdentity) -> (Arc<Self>, mpsc::Receiver<MessageEvent>) {
        let (events_tx, events_rx) = mpsc::channel(64);
        let gateway = Arc::new(Self {
            identity,
            events_tx,
            next_id: AtomicU64::new(1),
            channels: DashMap::new(),
            actions: Mutex::new(Vec::new()),
        });
        (gateway, events_rx)
    }

    fn alloc_id(&self) -> MessageId {
        MessageId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Deliver a message into the event stream, as if received from the
    /// platform. Returns the id assigned to the message.
    pub async fn inject_message(
        &self,
        sender: UserRef,
        channel: ChannelId,
        text: &str,
    ) -> Result<MessageId, GatewayError> {
        let id = self.alloc_id();
        let stored = StoredMessage {
            id,
            channel,
            sender: sender.id,
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        self.channels.entry(channel).or_default().push(stored);

        let event = MessageEvent {
            id,
            channel,
            sender,
            text: text.to_string(),
        };
        self.events_tx
            .send(event)
            .await
            .map_err(|_| GatewayError::Closed)?;
        Ok(id)
    }

    /// Everything the bot has sent, edited, or deleted so far.
    pub fn actions(&self) -> Vec<OutboundAction> {
        self.actions.lock().clone()
    }

    /// Text of all `Send` actions, in order.
    pub fn sent_texts(&self) -> Vec<String> {
        self.actions
            .lock()
            .iter()
            .filter_map(|a| match a {
                OutboundAction::Send { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Gateway for LocalGateway {
    fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    async fn send_message(&self, channel: ChannelId, text: &str) -> Result<MessageId, GatewayError> {
        let id = self.alloc_id();
        debug!(%channel, %id, text, "local gateway send");
        self.channels.entry(channel).or_default().push(StoredMessage {
            id,
            channel,
            sender: self.identity.id,
            text: text.to_string(),
            timestamp: Utc::now(),
        });
        self.actions.lock().push(OutboundAction::Send {
            channel,
            text: text.to_string(),
        });
        Ok(id)
    }

    async fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        text: &str,
    ) -> Result<(), GatewayError> {
        let mut entry = self
            .channels
            .get_mut(&channel)
            .ok_or(GatewayError::UnknownChannel(channel))?;
        let stored = entry
            .iter_mut()
            .find(|m| m.id == message)
            .ok_or(GatewayError::UnknownMessage(message))?;
        stored.text = text.to_string();
        drop(entry);
        self.actions.lock().push(OutboundAction::Edit {
            channel,
            message,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), GatewayError> {
        let mut entry = self
            .channels
            .get_mut(&channel)
            .ok_or(GatewayError::UnknownChannel(channel))?;
        let before = entry.len();
        entry.retain(|m| m.id != message);
        if entry.len() == before {
            return Err(GatewayError::UnknownMessage(message));
        }
        drop(entry);
        self.actions.lock().push(OutboundAction::Delete { channel, message });
        Ok(())
    }

    async fn recent_messages(
        &self,
        channel: ChannelId,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, GatewayError> {
        let entry = self
            .channels
            .get(&channel)
            .ok_or(GatewayError::UnknownChannel(channel))?;
        let start = entry.len().saturating_sub(limit);
        Ok(entry[start..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> BotIdentity {
        BotIdentity {
            id: UserId(42),
            name: "TestBot".to_string(),
            discriminator: "0042".to_string(),
        }
    }

    fn sender() -> UserRef {
        UserRef {
            id: UserId(7),
            name: "alice".to_string(),
            discriminator: "1234".to_string(),
            is_bot: false,
        }
    }

    #[test]
    fn test_mention_forms() {
        let id = identity();
        assert_eq!(id.mention(), "<@42>");
        assert_eq!(id.nickname_mention(), "<@!42>");
        assert_eq!(id.tag(), "TestBot#0042");
    }

    #[tokio::test]
    async fn test_inject_delivers_event_and_records_history() {
        let (gw, mut events) = LocalGateway::new(identity());
        let chan = ChannelId(1);

        gw.inject_message(sender(), chan, "hello").await.unwrap();
        let event = events.recv().await.unwrap();
        assert_eq!(event.text, "hello");
        assert_eq!(event.channel, chan);

        let history = gw.recent_messages(chan, 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, "hello");
    }

    #[tokio::test]
    async fn test_edit_and_delete_update_history() {
        let (gw, _events) = LocalGateway::new(identity());
        let chan = ChannelId(1);
        let id = gw.send_message(chan, "one").await.unwrap();

        gw.edit_message(chan, id, "two").await.unwrap();
        let history = gw.recent_messages(chan, 10).await.unwrap();
        assert_eq!(history[0].text, "two");

        gw.delete_message(chan, id).await.unwrap();
        assert!(gw.recent_messages(chan, 10).await.unwrap().is_empty());

        assert!(matches!(
            gw.delete_message(chan, id).await,
            Err(GatewayError::UnknownMessage(_))
        ));
    }
}

//! Command descriptors and the handler trait.
//!
//! A command is stateless template data (name, aliases, required tier,
//! usage text) plus an async callback. Commands belong to exactly one
//! module and are registered into the shared registry when that module
//! initializes.

use crate::bot::ControlSignal;
use crate::error::HandlerResult;
use crate::gateway::{Gateway, MessageEvent};
use crate::tier::{AccountMode, Tier};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Trailing tokens that request a command's help text instead of running it.
pub const HELP_MARKERS: &[&str] = &["?", "-h", "--help"];

/// Whether `text` (already trimmed) is a recognized help marker.
pub fn is_help_marker(text: &str) -> bool {
    HELP_MARKERS.contains(&text)
}

/// Shared services handed to every command invocation.
#[derive(Clone)]
pub struct CommandContext {
    /// The platform connection of the owning bot.
    pub gateway: Arc<dyn Gateway>,
    /// Channel to the supervisor, for restart/shutdown requests.
    pub control: mpsc::Sender<ControlSignal>,
    /// Operating mode of the owning account.
    pub mode: AccountMode,
    /// When the owning bot came up.
    pub active_since: DateTime<Utc>,
}

/// A named, alias-able, permission-gated handler contributed by a module.
///
/// `run` receives the parsed argument tokens (`args[0]` is the matched
/// command token) and the raw remainder after the command token. Returning
/// `Ok(false)` makes the dispatcher send the command's usage text; errors
/// are caught at the dispatch boundary.
#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Minimum tier a sender must resolve to.
    fn requires(&self) -> Tier {
        Tier::None
    }

    /// Whether the owning module's scope prefix must precede the command
    /// token.
    fn use_module_prefix(&self) -> bool {
        true
    }

    fn usage(&self) -> &'static str {
        ""
    }

    fn description(&self) -> &'static str {
        ""
    }

    async fn run(
        &self,
        ctx: &CommandContext,
        event: &MessageEvent,
        args: &[&str],
        rest: &str,
    ) -> HandlerResult;
}

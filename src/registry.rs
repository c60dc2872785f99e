//! The shared command registry.
//!
//! One ordered, in-memory collection of command descriptors, each owned by
//! exactly one loaded module. The only writers are module init/unload,
//! which run while dispatch is quiescent; ordinary dispatch only reads.

use crate::command::Command;
use crate::tier::{AccountMode, Tier};
use std::sync::Arc;
use tracing::{debug, warn};

/// Index of a module in the bot's registration order.
pub type ModuleId = usize;

/// Metadata a module declares when it is loaded.
#[derive(Debug, Clone)]
pub struct ModuleMeta {
    pub name: &'static str,
    /// Scope token, unique among loaded modules when non-empty.
    pub prefix: Option<String>,
    pub description: Option<String>,
}

/// A command registered into the shared registry.
pub struct RegisteredCommand {
    /// Derived identifier: `prefix.name`, or bare `name` if the owning
    /// module has no prefix.
    pub id: String,
    /// Owning module.
    pub module: ModuleId,
    pub handler: Arc<dyn Command>,
}

impl std::fmt::Debug for RegisteredCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCommand")
            .field("id", &self.id)
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

impl RegisteredCommand {
    /// One-line invocation pattern, e.g. `!self.status` or `!clear [count]`.
    pub fn full_usage(&self, command_prefix: &str) -> String {
        let usage = self.handler.usage();
        if usage.is_empty() {
            format!("{}{}", command_prefix, self.id)
        } else {
            format!("{}{} {}", command_prefix, self.id, usage)
        }
    }

    /// Help block sent in response to a help marker or a failed invocation.
    pub fn help_text(&self, command_prefix: &str) -> String {
        let mut out = format!("**{}**", self.full_usage(command_prefix));
        let aliases = self.handler.aliases();
        if !aliases.is_empty() {
            out.push_str(&format!("\naliases: {}", aliases.join(", ")));
        }
        let description = self.handler.description();
        if !description.is_empty() {
            out.push_str(&format!("\n```\n{}\n```", description));
        }
        out
    }
}

/// Ordered registry of commands across all loaded modules.
#[derive(Default)]
pub struct CommandRegistry {
    modules: Vec<ModuleMeta>,
    entries: Vec<RegisteredCommand>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a loaded module's metadata, returning its id. Called by the
    /// lifecycle manager before the module's `init` runs.
    pub fn declare_module(&mut self, meta: ModuleMeta) -> ModuleId {
        self.modules.push(meta);
        self.modules.len() - 1
    }

    pub fn module(&self, id: ModuleId) -> &ModuleMeta {
        &self.modules[id]
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Compose a command id from a module prefix and a command name.
    pub fn command_id(prefix: Option<&str>, name: &str) -> String {
        match prefix {
            Some(p) if !p.trim().is_empty() => format!("{p}.{name}"),
            _ => name.to_string(),
        }
    }

    /// Register a command for `module`.
    ///
    /// Nameless commands are rejected silently. A duplicate id, or an id
    /// colliding with a loaded module's bare prefix, is a conflict: logged,
    /// the command stays unavailable, the module keeps initializing. A
    /// Selfbot-gated command on a service account is skipped quietly.
    pub fn register(
        &mut self,
        module: ModuleId,
        mode: AccountMode,
        handler: Arc<dyn Command>,
    ) -> bool {
        if handler.requires() == Tier::Selfbot && mode == AccountMode::Service {
            debug!(
                command = handler.name(),
                "skipping selfbot-only command on service account"
            );
            return false;
        }
        let name = handler.name();
        if name.trim().is_empty() {
            return false;
        }

        let id = Self::command_id(self.modules[module].prefix.as_deref(), name);
        let conflicts = self.entries.iter().any(|e| e.id == id)
            || self
                .modules
                .iter()
                .enumerate()
                .any(|(i, m)| i != module && m.prefix.as_deref() == Some(id.as_str()));
        if conflicts {
            warn!(%id, "command id conflicts with an existing command or module prefix, skipping");
            return false;
        }

        debug!(%id, "registered command");
        self.entries.push(RegisteredCommand { id, module, handler });
        true
    }

    /// Remove a command by handler identity, never by id: removing one
    /// command must not remove another with an equal id. Returns `false`
    /// if the handler was not registered.
    pub fn unregister(&mut self, handler: &Arc<dyn Command>) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| !Arc::ptr_eq(&e.handler, handler));
        self.entries.len() != before
    }

    /// Commands owned by `module`, in registration order.
    pub fn commands_of(&self, module: ModuleId) -> impl Iterator<Item = &RegisteredCommand> {
        self.entries.iter().filter(move |e| e.module == module)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids still registered. Used for the unload-leak warning.
    pub fn registered_ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    /// Drop everything: module metadata and any leftover commands. Runs
    /// after all modules have unloaded.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.modules.clear();
    }
}

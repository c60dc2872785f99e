//! Feature modules and their lifecycle surface.
//!
//! A module is a self-contained feature unit owning zero or more commands
//! and an optional scope prefix. `init` registers its commands and
//! observers through the [`ModuleHost`]; `unload` removes them. The host
//! is the only writer of the command registry and the observer list, and
//! both run while dispatch is quiescent.

use crate::command::Command;
use crate::dispatch::{ObserverList, ParseFailedObserver};
use crate::error::ModuleError;
use crate::registry::{CommandRegistry, ModuleId};
use crate::tier::AccountMode;
use async_trait::async_trait;
use std::sync::Arc;

/// A named feature unit contributed to the bot.
#[async_trait]
pub trait Module: Send + Sync {
    fn name(&self) -> &'static str;

    /// Scope token disambiguating same-named commands across modules.
    fn prefix(&self) -> Option<&str> {
        None
    }

    fn description(&self) -> Option<&str> {
        None
    }

    /// Register commands and observers. Called once after the module is
    /// appended to the bot's module list.
    async fn init(&self, host: &mut ModuleHost<'_>) -> Result<(), ModuleError>;

    /// Unregister everything `init` registered. Called once, in
    /// registration order, at shutdown or restart.
    async fn unload(&self, host: &mut ModuleHost<'_>) -> Result<(), ModuleError>;
}

/// Registration surface handed to a module during init/unload.
pub struct ModuleHost<'a> {
    module: ModuleId,
    mode: AccountMode,
    registry: &'a mut CommandRegistry,
    observers: &'a mut ObserverList,
}

impl<'a> ModuleHost<'a> {
    pub(crate) fn new(
        module: ModuleId,
        mode: AccountMode,
        registry: &'a mut CommandRegistry,
        observers: &'a mut ObserverList,
    ) -> Self {
        Self { module, mode, registry, observers }
    }

    /// Operating mode of the owning account.
    pub fn mode(&self) -> AccountMode {
        self.mode
    }

    /// Register a command owned by this module. Returns `false` when the
    /// command was skipped (conflict, nameless, or selfbot-only on a
    /// service account).
    pub fn add_command(&mut self, handler: Arc<dyn Command>) -> bool {
        self.registry.register(self.module, self.mode, handler)
    }

    /// Remove a previously registered command by identity.
    pub fn remove_command(&mut self, handler: &Arc<dyn Command>) -> bool {
        self.registry.unregister(handler)
    }

    /// Attach a parse-failed observer owned by this module.
    pub fn observe_parse_failed(&mut self, observer: Arc<dyn ParseFailedObserver>) {
        self.observers.attach(self.module, observer);
    }

    /// Detach all observers this module attached.
    pub fn detach_observers(&mut self) -> usize {
        self.observers.detach_module(self.module)
    }
}

/// Generated info block for a module: name, description and the usage of
/// every command it currently owns, sorted by id. `None` when the module
/// has no prefix (it cannot be addressed) or nothing to show.
pub fn module_info(
    registry: &CommandRegistry,
    module: ModuleId,
    command_prefix: &str,
) -> Option<String> {
    let meta = registry.module(module);
    let prefix = meta.prefix.as_deref()?;
    if prefix.trim().is_empty() {
        return None;
    }

    let mut out = format!("**{} / {}**", meta.name, prefix);
    if let Some(description) = meta.description.as_deref() {
        if !description.trim().is_empty() {
            out.push_str(&format!("\n**Description**:\n```\n{description}\n```"));
        }
    }

    let mut usages: Vec<String> = registry
        .commands_of(module)
        .map(|entry| entry.full_usage(command_prefix))
        .collect();
    if !usages.is_empty() {
        usages.sort();
        let plural = if usages.len() == 1 { "command" } else { "commands" };
        out.push_str(&format!(
            "\n**{} available {}:**\n```\n{}\n```",
            usages.len(),
            plural,
            usages.join("\n")
        ));
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandContext;
    use crate::error::HandlerResult;
    use crate::gateway::MessageEvent;
    use crate::registry::ModuleMeta;
    use crate::tier::Tier;

    struct NamedCommand(&'static str, &'static str);

    #[async_trait]
    impl Command for NamedCommand {
        fn name(&self) -> &'static str {
            self.0
        }

        fn requires(&self) -> Tier {
            Tier::Whitelist
        }

        fn usage(&self) -> &'static str {
            self.1
        }

        async fn run(
            &self,
            _ctx: &CommandContext,
            _event: &MessageEvent,
            _args: &[&str],
            _rest: &str,
        ) -> HandlerResult {
            Ok(true)
        }
    }

    #[test]
    fn test_module_info_lists_sorted_usages() {
        let mut reg = CommandRegistry::new();
        let m = reg.declare_module(ModuleMeta {
            name: "admin",
            prefix: Some("self".to_string()),
            description: Some("Administrative commands.".to_string()),
        });
        reg.register(m, AccountMode::Service, Arc::new(NamedCommand("status", "")));
        reg.register(m, AccountMode::Service, Arc::new(NamedCommand("log", "[lines]")));

        let info = module_info(&reg, m, "!").expect("info");
        assert!(info.contains("**admin / self**"));
        assert!(info.contains("Administrative commands."));
        assert!(info.contains("2 available commands"));
        // Sorted by id: self.log before self.status.
        let log_at = info.find("!self.log [lines]").unwrap();
        let status_at = info.find("!self.status").unwrap();
        assert!(log_at < status_at);
    }

    #[test]
    fn test_module_info_none_without_prefix() {
        let mut reg = CommandRegistry::new();
        let m = reg.declare_module(ModuleMeta {
            name: "plain",
            prefix: None,
            description: None,
        });
        assert!(module_info(&reg, m, "!").is_none());
    }
}

//! A single connected bot instance and its module lifecycle.
//!
//! The bot owns the ordered module list, the shared command registry and
//! the dispatcher's observer list. Registry mutation happens only here,
//! during `init_modules`/`unload_modules`, which callers run with no
//! dispatch in flight (startup, shutdown, restart).

use crate::command::CommandContext;
use crate::config::BotConfig;
use crate::dispatch::{Dispatcher, ObserverList};
use crate::gateway::{BotIdentity, Gateway, MessageEvent};
use crate::module::{Module, ModuleHost};
use crate::parse::ParseOptions;
use crate::registry::{CommandRegistry, ModuleMeta};
use crate::tier::{AccountMode, TierResolver};
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Request from a command or the console to the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Tear all bots down and bring them back up.
    Restart,
    /// Shut the process down cleanly.
    Shutdown,
}

/// State shared between the bot and its dispatchers.
pub(crate) struct Shared {
    pub(crate) identity: BotIdentity,
    pub(crate) options: ParseOptions,
    pub(crate) resolver: TierResolver,
    pub(crate) registry: RwLock<CommandRegistry>,
    pub(crate) observers: RwLock<ObserverList>,
    /// Dispatch is refused until module init completes, and again once
    /// unload begins.
    pub(crate) initialized: AtomicBool,
    pub(crate) ctx: CommandContext,
}

/// One account's bot: gateway, module list, registry, dispatcher.
pub struct Bot {
    shared: Arc<Shared>,
    modules: Vec<Arc<dyn Module>>,
    mode: AccountMode,
}

impl Bot {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        mode: AccountMode,
        config: &BotConfig,
        control: mpsc::Sender<ControlSignal>,
        modules: Vec<Arc<dyn Module>>,
    ) -> Self {
        let identity = gateway.identity().clone();
        let shared = Arc::new(Shared {
            resolver: TierResolver::new(identity.id, config.roster.clone()),
            options: ParseOptions {
                command_prefix: config.command_prefix.clone(),
                mention_bare_name: config.mention_bare_name,
            },
            identity,
            registry: RwLock::new(CommandRegistry::new()),
            observers: RwLock::new(ObserverList::default()),
            initialized: AtomicBool::new(false),
            ctx: CommandContext {
                gateway,
                control,
                mode,
                active_since: Utc::now(),
            },
        });
        Self { shared, modules, mode }
    }

    pub fn mode(&self) -> AccountMode {
        self.mode
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.shared.identity
    }

    pub fn initialized(&self) -> bool {
        self.shared.initialized.load(Ordering::Acquire)
    }

    /// A dispatcher bound to this bot's shared state.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.shared.clone())
    }

    /// Number of commands currently registered.
    pub fn command_count(&self) -> usize {
        self.shared.registry.read().len()
    }

    /// Initialize every module in registration order.
    ///
    /// A failing module is logged and skipped; the rest still initialize.
    /// Must not run concurrently with dispatch.
    pub async fn init_modules(&self) {
        info!(mode = ?self.mode, bot = %self.shared.identity.tag(), "initializing modules");

        // Dispatch is quiescent here, so the shared collections can be
        // taken out of their locks for the duration.
        let mut registry = std::mem::take(&mut *self.shared.registry.write());
        let mut observers = std::mem::take(&mut *self.shared.observers.write());

        for module in &self.modules {
            let id = registry.declare_module(ModuleMeta {
                name: module.name(),
                prefix: module.prefix().map(str::to_string),
                description: module.description().map(str::to_string),
            });
            let mut host = ModuleHost::new(id, self.mode, &mut registry, &mut observers);
            match module.init(&mut host).await {
                Ok(()) => info!(module = module.name(), "initialized module"),
                Err(err) => error!(module = module.name(), error = %err, "error initializing module"),
            }
        }

        let commands = registry.len();
        *self.shared.registry.write() = registry;
        *self.shared.observers.write() = observers;
        self.shared.initialized.store(true, Ordering::Release);

        info!(modules = self.modules.len(), commands, "modules initialized");
    }

    /// Unload every module in registration order, then verify the registry
    /// and observer list drained. Leftovers are a module bug: logged as a
    /// warning and dropped, never fatal.
    pub async fn unload_modules(&self) {
        self.shared.initialized.store(false, Ordering::Release);
        info!(bot = %self.shared.identity.tag(), "unloading modules");

        let mut registry = std::mem::take(&mut *self.shared.registry.write());
        let mut observers = std::mem::take(&mut *self.shared.observers.write());

        for (id, module) in self.modules.iter().enumerate() {
            let mut host = ModuleHost::new(id, self.mode, &mut registry, &mut observers);
            match module.unload(&mut host).await {
                Ok(()) => info!(module = module.name(), "unloaded module"),
                Err(err) => error!(module = module.name(), error = %err, "error unloading module"),
            }
        }

        if !registry.is_empty() {
            warn!(
                count = registry.len(),
                ids = ?registry.registered_ids(),
                "commands did not get properly removed"
            );
        }
        if !observers.is_empty() {
            warn!(count = observers.len(), "observers did not get properly detached");
        }
        registry.clear();
        observers.clear();

        *self.shared.registry.write() = registry;
        *self.shared.observers.write() = observers;
    }

    /// Consume the gateway's event stream, dispatching each message on its
    /// own task. Returns when the stream closes.
    pub async fn run(&self, mut events: mpsc::Receiver<MessageEvent>) {
        let dispatcher = self.dispatcher();
        while let Some(event) = events.recv().await {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher.handle_event(event).await;
            });
        }
        info!(bot = %self.shared.identity.tag(), "event stream closed");
    }
}

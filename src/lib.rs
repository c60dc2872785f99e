//! modbot - modular chat-bot daemon.
//!
//! A command dispatch and permission-resolution engine for chat bots:
//! inbound messages are parsed into mention/prefix/command/argument
//! structure, matched against a registry of commands contributed by
//! independently loaded modules, permission-gated by sender tier, and
//! routed to exactly one handler. The platform connection lives behind
//! the [`gateway::Gateway`] trait.

pub mod bot;
pub mod command;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod module;
pub mod modules;
pub mod parse;
pub mod registry;
pub mod store;
pub mod tier;

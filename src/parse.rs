//! Tokenizer/parser for inbound chat lines.
//!
//! Splits a raw message into mention marker, command-prefix, module scope
//! token, command name and remainder, then matches it against one module's
//! registered commands. The dispatcher probes modules in registration
//! order; the first module+command that matches wins, with no scoring.

use crate::command::is_help_marker;
use crate::gateway::BotIdentity;
use crate::registry::{CommandRegistry, ModuleId, RegisteredCommand};
use crate::tier::Tier;

/// Parser knobs taken from the bot configuration.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Literal that must precede the command token when no mention is used.
    pub command_prefix: String,
    /// Whether a bare `@Name` (no discriminator) counts as a mention.
    pub mention_bare_name: bool,
}

/// Result of probing one module against one message.
#[derive(Debug)]
pub enum ParseOutcome<'r, 't> {
    /// A command matched. `args[0]` is the command token (prefix stripped);
    /// `rest` is the space-joined remainder after it.
    Command {
        entry: &'r RegisteredCommand,
        args: Vec<&'t str>,
        rest: String,
    },
    /// The bare module prefix was addressed with no (or help-marker)
    /// trailing text: respond with the module's info block.
    ModuleInfo,
}

/// Whether a single token addresses the bot.
///
/// Either canonical mention form matches exactly; otherwise the token must
/// start with `@` and name the bot as `@Name#discriminator`, or as a bare
/// `@Name` when `bare_name` is enabled.
pub fn token_mentions_bot(token: &str, identity: &BotIdentity, bare_name: bool) -> bool {
    if token == identity.mention() || token == identity.nickname_mention() {
        return true;
    }
    match token.strip_prefix('@') {
        Some(name) if !name.is_empty() => {
            name == identity.tag() || (bare_name && name == identity.name)
        }
        _ => false,
    }
}

/// Whether the first token of `text` addresses the bot. The dispatcher
/// computes this once per message for tier resolution.
pub fn message_mentions_bot(text: &str, identity: &BotIdentity, bare_name: bool) -> bool {
    text.trim()
        .split(' ')
        .next()
        .is_some_and(|t| token_mentions_bot(t, identity, bare_name))
}

/// Probe `module` for a match against `text` under `tier`.
///
/// Implements the ordered matching algorithm; any failing step yields
/// `None` and the dispatcher moves on to the next module.
pub fn parse_line<'r, 't>(
    registry: &'r CommandRegistry,
    module: ModuleId,
    identity: &BotIdentity,
    opts: &ParseOptions,
    text: &'t str,
    tier: Tier,
) -> Option<ParseOutcome<'r, 't>> {
    let mut tokens: Vec<&'t str> = text.trim().split(' ').collect();
    let mut cursor = 0usize;

    if tokens.is_empty() || tokens[0].trim().is_empty() {
        return None;
    }

    // Mention marker consumes the first token.
    if token_mentions_bot(tokens[0], identity, opts.mention_bare_name) {
        cursor += 1;
    }
    if cursor >= tokens.len() {
        return None;
    }

    // A mention or the command prefix is mandatory; bare words never
    // trigger a command.
    match tokens[cursor].strip_prefix(opts.command_prefix.as_str()) {
        Some(stripped) => tokens[cursor] = stripped,
        None if cursor == 0 => return None,
        None => {}
    }

    let module_prefix = registry
        .module(module)
        .prefix
        .clone()
        .unwrap_or_default();

    for entry in registry.commands_of(module) {
        let mut at = cursor;

        // Module scope alignment.
        if entry.handler.use_module_prefix() && !module_prefix.is_empty() {
            if tokens[at].eq_ignore_ascii_case(&module_prefix) {
                at += 1;
                if at >= tokens.len() {
                    continue;
                }
            } else {
                continue;
            }
        }

        let candidate = tokens[at];
        let named = candidate.eq_ignore_ascii_case(entry.handler.name())
            || entry
                .handler
                .aliases()
                .iter()
                .any(|alias| candidate.eq_ignore_ascii_case(alias));
        if !named {
            continue;
        }

        // Permission gate: skipped candidates are indistinguishable from
        // unknown commands, so nothing leaks to unauthorized senders.
        if tier < entry.handler.requires() {
            continue;
        }

        let args = tokens[at..].to_vec();
        let rest = tokens[at + 1..].join(" ");
        return Some(ParseOutcome::Command { entry, args, rest });
    }

    // Module-info fallback: the bare module prefix, optionally followed by
    // a help marker.
    if !module_prefix.is_empty() && tokens[cursor].eq_ignore_ascii_case(&module_prefix) {
        if cursor == 0 && tier == Tier::Mention {
            return None;
        }
        let rest = tokens[cursor + 1..].join(" ");
        let trimmed = rest.trim();
        if trimmed.is_empty() || is_help_marker(trimmed) {
            return Some(ParseOutcome::ModuleInfo);
        }
    }

    None
}

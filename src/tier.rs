//! Permission tiers and per-message tier resolution.
//!
//! Every inbound message resolves to exactly one [`Tier`] before any module
//! is probed; the parser then gates command candidates with a `>=`
//! threshold check against the command's declared minimum tier.

use crate::gateway::{UserId, UserRef};

/// Ordered permission level a message sender resolves to.
///
/// The declaration order is the lattice: `None < Mention < Whitelist <
/// Selfbot`. A command declares the minimum tier it requires; a sender is
/// eligible when its resolved tier is greater or equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Anyone.
    None,
    /// The message addressed the bot directly.
    Mention,
    /// The sender is on the approved roster.
    Whitelist,
    /// The sender is the bot's own controlling account.
    Selfbot,
}

/// Operating mode of a connected account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountMode {
    /// First-person automation agent: only the controlling principal gets
    /// an elevated tier, and Selfbot-gated commands are available.
    Selfbot,
    /// Conventional service agent relying on the whitelist roster.
    Service,
}

impl AccountMode {
    /// Infer the mode from the account token. User tokens are longer than
    /// bot tokens on the target platform.
    pub fn from_token(token: &str) -> Self {
        if token.len() > 70 {
            Self::Selfbot
        } else {
            Self::Service
        }
    }
}

/// Resolves a message sender to a [`Tier`].
///
/// Resolution depends only on the sender and whether the message addressed
/// the bot, so it runs once per inbound message and the result is passed
/// down to every module probe.
#[derive(Debug, Clone)]
pub struct TierResolver {
    own_account: UserId,
    roster: Vec<String>,
}

impl TierResolver {
    pub fn new(own_account: UserId, roster: Vec<String>) -> Self {
        Self { own_account, roster }
    }

    /// Classify `sender`. `mentioned` is whether the message carried a
    /// valid address-the-bot token.
    pub fn resolve(&self, sender: &UserRef, mentioned: bool) -> Tier {
        if sender.id == self.own_account {
            Tier::Selfbot
        } else if self.roster.iter().any(|entry| *entry == sender.tag()) {
            Tier::Whitelist
        } else if mentioned {
            Tier::Mention
        } else {
            Tier::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64, name: &str, disc: &str) -> UserRef {
        UserRef {
            id: UserId(id),
            name: name.to_string(),
            discriminator: disc.to_string(),
            is_bot: false,
        }
    }

    fn resolver() -> TierResolver {
        TierResolver::new(UserId(1), vec!["alice#1234".to_string()])
    }

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::None < Tier::Mention);
        assert!(Tier::Mention < Tier::Whitelist);
        assert!(Tier::Whitelist < Tier::Selfbot);
    }

    #[test]
    fn test_own_account_resolves_selfbot() {
        let r = resolver();
        assert_eq!(r.resolve(&user(1, "me", "0001"), false), Tier::Selfbot);
    }

    #[test]
    fn test_roster_resolves_whitelist() {
        let r = resolver();
        assert_eq!(r.resolve(&user(9, "alice", "1234"), false), Tier::Whitelist);
        // Same name, different discriminator: not on the roster.
        assert_eq!(r.resolve(&user(9, "alice", "9999"), false), Tier::None);
    }

    #[test]
    fn test_mention_resolves_mention_else_none() {
        let r = resolver();
        assert_eq!(r.resolve(&user(9, "bob", "5678"), true), Tier::Mention);
        assert_eq!(r.resolve(&user(9, "bob", "5678"), false), Tier::None);
    }

    #[test]
    fn test_account_mode_from_token() {
        assert_eq!(AccountMode::from_token(&"x".repeat(59)), AccountMode::Service);
        assert_eq!(AccountMode::from_token(&"x".repeat(71)), AccountMode::Selfbot);
    }
}

//! Built-in feature modules.
//!
//! Which modules load depends on the account mode, mirroring the split
//! between first-person automation accounts and service accounts.

pub mod admin;
pub mod emoji;

use crate::module::Module;
use crate::store::StoreHandle;
use crate::tier::AccountMode;
use std::sync::Arc;

/// The default module set for an account mode, in registration order.
pub fn default_modules(mode: AccountMode, store: &StoreHandle) -> Vec<Arc<dyn Module>> {
    match mode {
        AccountMode::Selfbot => vec![
            Arc::new(admin::Admin::new("self")),
            Arc::new(emoji::Emoji::new(store.clone())),
        ],
        AccountMode::Service => vec![Arc::new(admin::Admin::new("bot"))],
    }
}

//! Unified error handling for modbot.
//!
//! Centralized error hierarchy for the daemon: gateway failures, command
//! handler failures, module lifecycle failures, and save-data failures.
//! Dispatch-time errors never cross the boundary of a single message; they
//! are logged and surfaced to the originating channel as a short diagnostic.

use crate::gateway::{ChannelId, MessageId};
use thiserror::Error;

/// Errors surfaced by a platform gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway connection closed")]
    Closed,

    #[error("unknown channel: {0}")]
    UnknownChannel(ChannelId),

    #[error("unknown message: {0}")]
    UnknownMessage(MessageId),

    #[error("platform error: {0}")]
    Platform(String),
}

/// Errors raised inside a command callback.
///
/// Caught at the dispatch boundary: logged with full detail, the user sees
/// a short inline error message, and processing of that message stops.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("bad argument: {0}")]
    BadArgument(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadArgument(_) => "bad_argument",
            Self::Gateway(_) => "gateway_error",
            Self::Store(_) => "store_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Result type for command handlers.
///
/// `Ok(true)` means the command handled the message; `Ok(false)` asks the
/// dispatcher to send the command's usage text as a courtesy.
pub type HandlerResult = Result<bool, HandlerError>;

/// Errors raised during module init/unload.
///
/// Module lifecycle failures are logged and skipped; they never abort the
/// initialization of the remaining modules.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("{0}")]
    Other(String),
}

/// Errors from the persisted save-data store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access save file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed save file: {0}")]
    Format(#[from] serde_json::Error),
}

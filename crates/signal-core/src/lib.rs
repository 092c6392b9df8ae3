//! Signal Core - Shared types, errors, and configuration for the signaling relay
//!
//! This crate contains the foundational types used by the relay server.
//! It has no dependencies on networking code.

pub mod config;
pub mod error;
pub mod path;
pub mod types;

pub use config::{Config, ConfigError, RelayConfig};
pub use error::*;
pub use types::*;

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Default time allowed for a connection's request head and handshake
pub const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 5_000;

/// Maximum size of a single signaling message (64 KB)
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Number of random bytes in a connection identifier
pub const CONNECTION_ID_BYTES: usize = 8;

/// Maximum request path length in bytes
pub const MAX_PATH_LEN: usize = 1024;

/// Maximum filename length in bytes
pub const MAX_FILENAME_LEN: usize = 255;

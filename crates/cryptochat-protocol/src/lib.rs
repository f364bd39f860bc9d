//! CryptoChat protocol
//!
//! Relay request/reply contract and transports, the polling [`SyncLoop`]
//! and the [`ChatClient`] facade used by front ends.

pub mod client;
pub mod config;
pub mod error;
pub mod relay;
pub mod sync;

pub use client::{ChatClient, ConversationEntry, ConversationSummary};
pub use config::{ClientConfig, NetworkConfig, SyncConfig};
pub use error::{ProtocolError, Result};
pub use relay::{HttpRelayClient, MemoryRelay, Method, RelayApi, RelayClient, RelayReply, RelayRequest};
pub use sync::{SyncEvent, SyncLoop};

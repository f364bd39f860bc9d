//! CryptoChat core
//!
//! Account and message types, the byte-blob persistence seam, and the
//! [`LocalStore`] that owns profile, private key, contacts and messages.

pub mod blob;
pub mod error;
pub mod store;
pub mod types;

pub use blob::{BlobStore, MemoryBlobStore, SledBlobStore};
pub use error::{Error, Result};
pub use store::{LocalState, LocalStore};
pub use types::{Account, AccountId, Message, MessageId, NewAccount};

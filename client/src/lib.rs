//! Local host and command-line tooling for the Mescrow escrow state machine.

pub use error::{ClientError, Result};
pub use host::LocalHost;
pub use keys::{KeyFile, LocalKey};
pub use store::FileStore;

pub mod error;
pub mod host;
pub mod keys;
pub mod store;
pub mod util;

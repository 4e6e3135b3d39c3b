//! Moderated three-party escrow.
//!
//! A buyer deposits funds for a seller; a moderator accepts the escrow and
//! may settle it after a time-lock. This crate decides who may receive the
//! funds and signals payouts; moving value is left to the host ledger.

/// Escrow parameters and JSON helpers
pub mod config;
pub mod error;
/// Escrow state machine: dispatch and transitions
pub mod escrow;
/// Authorization gate backed by invocation witnesses
pub mod gate;
/// Party addresses and public keys
pub mod identity;
pub mod invocation;
pub mod receipt;
/// Persisted escrow record and its codec
pub mod record;
pub mod store;
pub mod transfer;
pub mod utils;

pub use config::EscrowConfig;
pub use error::{EscrowError, IdentityError, WitnessError};
pub use escrow::{EscrowContract, Session};
pub use gate::{AuthorizationGate, InvocationContext, Witness};
pub use identity::{Address, KeyScheme, PublicKey};
pub use invocation::{Invocation, Operation};
pub use receipt::{Event, Payout, Receipt, ReturnValue};
pub use record::{EscrowId, EscrowRecord, EscrowStatus};
pub use store::{MemoryStore, RecordStore};
pub use transfer::{Output, Transfer};

pub type Result<T> = std::result::Result<T, EscrowError>;

use std::path::PathBuf;

use mescrow_core::{EscrowError, IdentityError};

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("escrow rejected invocation [{tag}]: {0}", tag = .0.tag())]
    Escrow(#[from] EscrowError),
    #[error("Keypair error: {0}")]
    Keypair(String),
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),
    #[error("Invalid argument {0:?}: expected hex or base58 bytes")]
    InvalidArgument(String),
    #[error("Store error: {0}")]
    Store(String),
    #[error("Store is locked by another writer; remove {0:?} if none is running")]
    StoreBusy(PathBuf),
    #[error("Store changed since it was opened (generation {expected}, found {found})")]
    StaleStore { expected: u64, found: u64 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<bincode::error::EncodeError> for ClientError {
    fn from(value: bincode::error::EncodeError) -> Self {
        Self::Store(value.to_string())
    }
}

impl From<bincode::error::DecodeError> for ClientError {
    fn from(value: bincode::error::DecodeError) -> Self {
        Self::Store(value.to_string())
    }
}

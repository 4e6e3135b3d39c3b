//! Invocation surface of the escrow: operation names, arities and arguments.

use core::fmt;
use core::str::FromStr;

use bincode::config::standard;
use bincode::{Decode, Encode};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::identity::Address;
use crate::record::EscrowId;
use crate::transfer::Transfer;
use crate::{EscrowError, Result};

/// The five escrow transitions.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `register(sender, seller_addr) -> escrow_id`
    Register,
    /// `accept_escrow(sender, escrow_id) -> bool`
    AcceptEscrow,
    /// `release_escrow(sender, to, escrow_id) -> bool`
    ReleaseEscrow,
    /// `refund(sender, escrow_id) -> bool`
    Refund,
    /// `moderate(sender, to, escrow_id) -> bool`
    Moderate,
}

impl Operation {
    /// Fixed number of positional arguments.
    pub fn arity(&self) -> usize {
        match self {
            Self::Register | Self::AcceptEscrow | Self::Refund => 2,
            Self::ReleaseEscrow | Self::Moderate => 3,
        }
    }
}

impl AsRef<str> for Operation {
    fn as_ref(&self) -> &str {
        match self {
            Self::Register => "registerEscrow",
            Self::AcceptEscrow => "acceptEscrow",
            Self::ReleaseEscrow => "releaseEscrow",
            Self::Refund => "refund",
            Self::Moderate => "moderate",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl FromStr for Operation {
    type Err = EscrowError;

    /// Accepts the camelCase interface names and their snake_case aliases.
    ///
    /// # Errors
    ///
    /// Returns `EscrowError::InvalidOperation` on unrecognized input.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "registerEscrow" | "register" | "register_escrow" => Ok(Self::Register),
            "acceptEscrow" | "accept_escrow" => Ok(Self::AcceptEscrow),
            "releaseEscrow" | "release_escrow" => Ok(Self::ReleaseEscrow),
            "refund" => Ok(Self::Refund),
            "moderate" => Ok(Self::Moderate),
            other => Err(EscrowError::InvalidOperation(other.to_string())),
        }
    }
}

/// One call into the escrow.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Encode, Decode, PartialEq, Eq)]
pub struct Invocation {
    /// Operation name as sent by the caller.
    pub operation: String,
    /// Opaque positional arguments.
    pub args: Vec<Vec<u8>>,
    /// Transfer that triggered this call, if any.
    pub transfer: Option<Transfer>,
}

impl Invocation {
    pub fn new<S: Into<String>>(operation: S, args: Vec<Vec<u8>>) -> Self {
        Self {
            operation: operation.into(),
            args,
            transfer: None,
        }
    }

    pub fn with_transfer(mut self, transfer: Transfer) -> Self {
        self.transfer = Some(transfer);
        self
    }

    /// Message every witness of this invocation signs:
    /// `SHA-256` over the canonical encoding of the whole invocation.
    pub fn signing_digest(&self) -> Result<[u8; 32]> {
        let bytes = bincode::encode_to_vec(self, standard())?;
        Ok(Sha256::digest(bytes).into())
    }

    /// Decodes the argument at `index` as an [`Address`].
    pub fn address_arg(&self, index: usize) -> Result<Address> {
        self.arg(index)
            .and_then(|bytes| Address::try_from(bytes).ok())
            .ok_or(EscrowError::InvalidArgument { index })
    }

    /// Decodes the argument at `index` as an [`EscrowId`].
    pub fn escrow_id_arg(&self, index: usize) -> Result<EscrowId> {
        self.arg(index)
            .and_then(|bytes| EscrowId::try_from(bytes).ok())
            .ok_or(EscrowError::InvalidArgument { index })
    }

    fn arg(&self, index: usize) -> Option<&[u8]> {
        self.args.get(index).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::Output;

    #[test]
    fn operation_names_and_arity() {
        for (name, op, arity) in [
            ("registerEscrow", Operation::Register, 2),
            ("acceptEscrow", Operation::AcceptEscrow, 2),
            ("releaseEscrow", Operation::ReleaseEscrow, 3),
            ("refund", Operation::Refund, 2),
            ("moderate", Operation::Moderate, 3),
        ] {
            let parsed: Operation = name.parse().unwrap();
            assert_eq!(parsed, op);
            assert_eq!(parsed.arity(), arity);
            assert_eq!(parsed.to_string(), name);
        }
        assert_eq!("release_escrow".parse::<Operation>().unwrap(), Operation::ReleaseEscrow);
        assert_eq!(
            "withdraw".parse::<Operation>(),
            Err(EscrowError::InvalidOperation("withdraw".into()))
        );
    }

    #[test]
    fn digest_covers_transfer() {
        let base = Invocation::new("registerEscrow", vec![vec![1; 32], vec![2; 32]]);
        let with_transfer = base.clone().with_transfer(Transfer {
            hash: [7; 32],
            outputs: vec![Output {
                destination: Address([9; 32]),
                value: 100,
            }],
        });
        assert_eq!(base.signing_digest().unwrap(), base.signing_digest().unwrap());
        assert_ne!(
            base.signing_digest().unwrap(),
            with_transfer.signing_digest().unwrap()
        );
    }

    #[test]
    fn typed_args() {
        let inv = Invocation::new("refund", vec![vec![1; 32], vec![2; 31]]);
        assert_eq!(inv.address_arg(0).unwrap(), Address([1; 32]));
        assert_eq!(
            inv.escrow_id_arg(1),
            Err(EscrowError::InvalidArgument { index: 1 })
        );
        assert_eq!(
            inv.address_arg(5),
            Err(EscrowError::InvalidArgument { index: 5 })
        );
    }
}

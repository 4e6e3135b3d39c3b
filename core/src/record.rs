//! Persisted escrow record and its canonical byte encoding.

use core::fmt;
use core::str::FromStr;

use bincode::config::standard;
use bincode::{Decode, Encode};
#[cfg(feature = "json")]
use hex::serde as hex_serde;
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::error::IdentityError;
use crate::identity::Address;
use crate::{EscrowError, Result};

/// Byte length of an [`EscrowId`].
pub const ESCROW_ID_LEN: usize = 32;

/// Key of an escrow record, taken from the registering transfer's hash.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(transparent))]
#[derive(Debug, Clone, Copy, Encode, Decode, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EscrowId(#[cfg_attr(feature = "json", serde(with = "hex_serde"))] pub [u8; ESCROW_ID_LEN]);

impl EscrowId {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for EscrowId {
    type Error = IdentityError;

    fn try_from(bytes: &[u8]) -> std::result::Result<Self, Self::Error> {
        <[u8; ESCROW_ID_LEN]>::try_from(bytes)
            .map(Self)
            .map_err(|_| IdentityError::InvalidLength {
                expected: ESCROW_ID_LEN,
                got: bytes.len(),
            })
    }
}

impl FromStr for EscrowId {
    type Err = IdentityError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
        Self::try_from(bytes.as_slice())
    }
}

impl fmt::Display for EscrowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Lifecycle of an escrow.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Encode, Decode, PartialEq, Eq)]
pub enum EscrowStatus {
    /// Funds deposited; waiting for a moderator.
    Registered,
    /// A moderator has accepted the escrow.
    Accepted,
    /// Buyer released the funds to the seller.
    Released,
    /// Funds returned to the buyer after expiry.
    Refunded,
    /// Moderator settled the escrow after expiry.
    Moderated,
}

/// Full persisted escrow state.
///
/// Field order is part of the stored format and must not change.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Encode, Decode, PartialEq, Eq)]
pub struct EscrowRecord {
    /// Intended final recipient.
    pub seller_addr: Address,
    /// Depositor.
    pub buyer_addr: Address,
    /// Value held in custody.
    pub amount: u64,
    /// Arbiter, unset until accepted.
    pub moderator: Option<Address>,
    /// Height at which refund and moderation unlock.
    pub expiry: Option<u64>,
    pub status: EscrowStatus,
}

impl EscrowRecord {
    /// Whether the time-lock has elapsed at `height`.
    ///
    /// A record without an expiry never unlocks.
    pub fn is_expired(&self, height: u64) -> bool {
        self.expiry.is_some_and(|expiry| height >= expiry)
    }

    /// Canonical byte encoding written to the record store.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::encode_to_vec(self, standard())?)
    }

    /// Decodes a record previously produced by [`EscrowRecord::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::Codec`] on malformed input or trailing bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (record, read): (Self, usize) = bincode::decode_from_slice(bytes, standard())?;
        if read != bytes.len() {
            return Err(EscrowError::Codec(format!(
                "{} trailing bytes after record",
                bytes.len() - read
            )));
        }
        Ok(record)
    }
}

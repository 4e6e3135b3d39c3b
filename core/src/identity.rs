//! Identity handles of escrow parties and the public keys that control them.

use core::fmt;
use core::str::FromStr;

use bincode::{Decode, Encode};
#[cfg(feature = "json")]
use hex::serde as hex_serde;
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::IdentityError;

/// Byte length of an [`Address`].
pub const ADDRESS_LEN: usize = 32;

/// Identity handle of a buyer, seller, moderator or custody account.
///
/// An address is the SHA-256 digest of a key scheme tag followed by the
/// public key bytes, see [`PublicKey::address`].
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(transparent))]
#[derive(Debug, Clone, Copy, Encode, Decode, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(#[cfg_attr(feature = "json", serde(with = "hex_serde"))] pub [u8; ADDRESS_LEN]);

impl Address {
    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Constant-time equality, used when matching witnesses against claimed identities.
    pub fn ct_eq(&self, other: &Address) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = IdentityError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        <[u8; ADDRESS_LEN]>::try_from(bytes)
            .map(Self)
            .map_err(|_| IdentityError::InvalidLength {
                expected: ADDRESS_LEN,
                got: bytes.len(),
            })
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = IdentityError;

    /// Parses a `0x`-prefixed or bare 64-char hex string, or a base58 string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IdentityError::EmptyIdentity);
        }

        let bytes = if let Some(stripped) = s.strip_prefix("0x") {
            hex::decode(stripped)?
        } else if s.len() == ADDRESS_LEN * 2 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            hex::decode(s)?
        } else {
            bs58::decode(s).into_vec()?
        };
        Self::try_from(bytes.as_slice())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Signature schemes a witness may use.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, Encode, Decode, PartialEq, Eq)]
pub enum KeyScheme {
    Ed25519,
    Secp256k1,
}

impl KeyScheme {
    /// Domain-separation byte prepended to key bytes before hashing into an address.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Ed25519 => 0x01,
            Self::Secp256k1 => 0x02,
        }
    }
}

impl AsRef<str> for KeyScheme {
    fn as_ref(&self) -> &str {
        match self {
            Self::Ed25519 => "ed25519",
            Self::Secp256k1 => "secp256k1",
        }
    }
}

impl FromStr for KeyScheme {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ed25519" => Ok(Self::Ed25519),
            "secp256k1" | "k256" => Ok(Self::Secp256k1),
            other => Err(IdentityError::UnsupportedScheme(other.to_string())),
        }
    }
}

/// Public half of a party's key.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Encode, Decode, PartialEq, Eq)]
pub enum PublicKey {
    /// 32-byte compressed Edwards point.
    Ed25519(#[cfg_attr(feature = "json", serde(with = "hex_serde"))] [u8; 32]),
    /// SEC1-encoded point, compressed or uncompressed.
    Secp256k1(#[cfg_attr(feature = "json", serde(with = "hex_serde"))] Vec<u8>),
}

impl PublicKey {
    pub fn scheme(&self) -> KeyScheme {
        match self {
            Self::Ed25519(_) => KeyScheme::Ed25519,
            Self::Secp256k1(_) => KeyScheme::Secp256k1,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Ed25519(bytes) => bytes,
            Self::Secp256k1(bytes) => bytes,
        }
    }

    /// Derives the address controlled by this key.
    pub fn address(&self) -> Address {
        let digest = Sha256::new()
            .chain_update([self.scheme().tag()])
            .chain_update(self.as_bytes())
            .finalize();
        Address(digest.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_address_formats() {
        let addr = Address([0xab; ADDRESS_LEN]);

        let prefixed = addr.to_string();
        assert!(prefixed.starts_with("0x"));
        assert_eq!(prefixed.parse::<Address>().unwrap(), addr);

        let bare = hex::encode(addr.0);
        assert_eq!(bare.parse::<Address>().unwrap(), addr);

        let b58 = bs58::encode(addr.0).into_string();
        assert_eq!(b58.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn reject_bad_addresses() {
        assert_eq!("".parse::<Address>(), Err(IdentityError::EmptyIdentity));
        assert_eq!(
            "0xdeadbeef".parse::<Address>(),
            Err(IdentityError::InvalidLength {
                expected: ADDRESS_LEN,
                got: 4
            })
        );
        assert!(matches!(
            "0xzz".parse::<Address>(),
            Err(IdentityError::Hex(_))
        ));
        assert!(matches!(
            "not-base58-0OIl".parse::<Address>(),
            Err(IdentityError::Base58(_))
        ));
    }

    #[test]
    fn address_depends_on_scheme() {
        let ed = PublicKey::Ed25519([7u8; 32]);
        let k = PublicKey::Secp256k1([7u8; 32].to_vec());
        assert_ne!(ed.address(), k.address());
        assert_eq!(ed.address(), PublicKey::Ed25519([7u8; 32]).address());
        assert!(ed.address().ct_eq(&ed.address()));
    }

    #[test]
    fn parse_scheme() {
        assert_eq!("Ed25519".parse::<KeyScheme>().unwrap(), KeyScheme::Ed25519);
        assert_eq!("k256".parse::<KeyScheme>().unwrap(), KeyScheme::Secp256k1);
        assert!("rsa".parse::<KeyScheme>().is_err());
    }
}

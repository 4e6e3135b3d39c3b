//! Authorization gate: identity proofs and the block-height clock.

use bincode::{Decode, Encode};
use ed25519_dalek::{Signature as Ed25519Sig, Verifier, VerifyingKey as Ed25519Pub};
#[cfg(feature = "json")]
use hex::serde as hex_serde;
use k256::ecdsa::{Signature as Secp256k1Sig, VerifyingKey as Secp256k1Pub};
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WitnessError;
use crate::identity::{Address, PublicKey};
use crate::invocation::Invocation;
use crate::Result;

/// External context queried by the state machine.
///
/// Implementations are built fresh for each invocation and must not cache
/// answers across invocations.
pub trait AuthorizationGate {
    /// True iff the current invocation proves control of `identity`.
    fn is_authorized(&self, identity: &Address) -> bool;

    /// Current block height as supplied by the host.
    fn current_height(&self) -> u64;
}

/// Proof that the signer of an invocation controls `public_key`.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Encode, Decode, PartialEq, Eq)]
pub struct Witness {
    pub public_key: PublicKey,

    /// Raw 64-byte signature for Ed25519, DER for secp256k1.
    #[cfg_attr(feature = "json", serde(with = "hex_serde"))]
    pub signature: Vec<u8>,
}

impl Witness {
    /// Verify that `signature` is a valid signature of `message` under `public_key`.
    pub fn verify(&self, message: &[u8]) -> std::result::Result<(), WitnessError> {
        match &self.public_key {
            PublicKey::Ed25519(public_key) => {
                let pk = Ed25519Pub::from_bytes(public_key)
                    .map_err(|e| WitnessError::InvalidPublicKey(e.to_string()))?;
                let sig = Ed25519Sig::from_slice(&self.signature)
                    .map_err(|e| WitnessError::InvalidSignature(e.to_string()))?;
                pk.verify(message, &sig)
                    .map_err(|_| WitnessError::VerificationFailed)
            }
            PublicKey::Secp256k1(public_key) => {
                let vk = Secp256k1Pub::from_sec1_bytes(public_key)
                    .map_err(|e| WitnessError::InvalidPublicKey(e.to_string()))?;
                let sig = Secp256k1Sig::from_der(&self.signature)
                    .map_err(|e| WitnessError::InvalidSignature(e.to_string()))?;
                vk.verify(message, &sig)
                    .map_err(|_| WitnessError::VerificationFailed)
            }
        }
    }
}

/// Gate backed by the witnesses attached to one invocation.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    digest: [u8; 32],
    witnesses: Vec<Witness>,
    height: u64,
}

impl InvocationContext {
    /// Binds `witnesses` to the signing digest of `invocation` at block `height`.
    pub fn new(invocation: &Invocation, witnesses: Vec<Witness>, height: u64) -> Result<Self> {
        Ok(Self {
            digest: invocation.signing_digest()?,
            witnesses,
            height,
        })
    }
}

impl AuthorizationGate for InvocationContext {
    fn is_authorized(&self, identity: &Address) -> bool {
        self.witnesses
            .iter()
            .filter(|w| w.public_key.address().ct_eq(identity))
            .any(|w| match w.verify(&self.digest) {
                Ok(()) => true,
                Err(err) => {
                    debug!(%identity, %err, "Rejected witness");
                    false
                }
            })
    }

    fn current_height(&self) -> u64 {
        self.height
    }
}

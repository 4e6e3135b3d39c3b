//! Local key files and the witnesses they produce.

use std::path::Path;

use ed25519_dalek::Signer as _;
use mescrow_core::{Address, Invocation, KeyScheme, PublicKey, Witness};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};
use crate::util::{load_input_data, save_output};

/// On-disk form of a party's secret key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyFile {
    pub scheme: KeyScheme,
    #[serde(with = "hex::serde")]
    pub secret_key: Vec<u8>,
}

/// A secret key able to sign invocations.
pub enum LocalKey {
    Ed25519(ed25519_dalek::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
}

impl LocalKey {
    /// Generates a fresh key from the OS random source.
    pub fn generate(scheme: KeyScheme) -> Result<Self> {
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);
        Self::from_key_file(&KeyFile {
            scheme,
            secret_key: secret.to_vec(),
        })
    }

    pub fn from_key_file(file: &KeyFile) -> Result<Self> {
        match file.scheme {
            KeyScheme::Ed25519 => {
                let secret: [u8; 32] = file.secret_key.as_slice().try_into().map_err(|_| {
                    ClientError::Keypair(format!(
                        "ed25519 secret key must be 32 bytes, got {}",
                        file.secret_key.len()
                    ))
                })?;
                Ok(Self::Ed25519(ed25519_dalek::SigningKey::from_bytes(&secret)))
            }
            KeyScheme::Secp256k1 => k256::ecdsa::SigningKey::from_slice(&file.secret_key)
                .map(Self::Secp256k1)
                .map_err(|e| ClientError::Keypair(e.to_string())),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let file: KeyFile = load_input_data(path)?;
        Ok(Self::from_key_file(&file)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        save_output(path, &self.to_key_file())
    }

    pub fn to_key_file(&self) -> KeyFile {
        match self {
            Self::Ed25519(sk) => KeyFile {
                scheme: KeyScheme::Ed25519,
                secret_key: sk.to_bytes().to_vec(),
            },
            Self::Secp256k1(sk) => KeyFile {
                scheme: KeyScheme::Secp256k1,
                secret_key: sk.to_bytes().to_vec(),
            },
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            Self::Ed25519(sk) => PublicKey::Ed25519(sk.verifying_key().to_bytes()),
            Self::Secp256k1(sk) => PublicKey::Secp256k1(
                sk.verifying_key()
                    .to_encoded_point(true)
                    .as_bytes()
                    .to_vec(),
            ),
        }
    }

    pub fn address(&self) -> Address {
        self.public_key().address()
    }

    /// Signs the digest of `invocation`.
    pub fn witness(&self, invocation: &Invocation) -> Result<Witness> {
        let digest = invocation.signing_digest()?;
        let signature = match self {
            Self::Ed25519(sk) => sk.sign(&digest).to_bytes().to_vec(),
            Self::Secp256k1(sk) => {
                let sig: k256::ecdsa::Signature = sk.sign(&digest);
                sig.to_der().as_bytes().to_vec()
            }
        };
        Ok(Witness {
            public_key: self.public_key(),
            signature,
        })
    }
}

//! Escrow parameters and their JSON (de)serialization.

#[cfg(feature = "json")]
use std::path::Path;

#[cfg(feature = "json")]
use anyhow::Context;
#[cfg(feature = "json")]
use serde::de::DeserializeOwned;
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::identity::Address;
use crate::{EscrowError, Result};

/// Blocks between registration and the unlock of refund/moderation,
/// roughly one month.
pub const LOCK_PERIOD: u64 = 10_950;

/// Moderator share of a refund, in basis points (1%).
pub const DEFAULT_MODERATOR_FEE_BPS: u16 = 100;

/// Denominator of basis-point rates.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Parameters of one escrow deployment.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowConfig {
    /// Account holding deposited funds; only outputs paid here count as deposit.
    pub custody: Address,

    /// Blocks added to the registration height to get the expiry.
    #[cfg_attr(feature = "json", serde(default = "default_lock_period"))]
    pub lock_period: u64,

    /// Moderator share of a refund, in basis points.
    #[cfg_attr(feature = "json", serde(default = "default_fee_bps"))]
    pub moderator_fee_bps: u16,
}

#[cfg(feature = "json")]
fn default_lock_period() -> u64 {
    LOCK_PERIOD
}

#[cfg(feature = "json")]
fn default_fee_bps() -> u16 {
    DEFAULT_MODERATOR_FEE_BPS
}

impl EscrowConfig {
    /// Config with the default lock period and fee for the given custody account.
    pub fn new(custody: Address) -> Self {
        Self {
            custody,
            lock_period: LOCK_PERIOD,
            moderator_fee_bps: DEFAULT_MODERATOR_FEE_BPS,
        }
    }

    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidConfig`] if the lock period is zero
    /// or the fee exceeds 100%.
    pub fn validate(&self) -> Result<()> {
        if self.lock_period == 0 {
            return Err(EscrowError::InvalidConfig(
                "lock_period must be non-zero".to_string(),
            ));
        }
        if u64::from(self.moderator_fee_bps) > BPS_DENOMINATOR {
            return Err(EscrowError::InvalidConfig(format!(
                "moderator_fee_bps must be <= {BPS_DENOMINATOR}, got {}",
                self.moderator_fee_bps
            )));
        }
        Ok(())
    }

    /// Splits a refunded `amount` into `(buyer_share, moderator_fee)`.
    pub fn split_refund(&self, amount: u64) -> (u64, u64) {
        let fee = u128::from(amount) * u128::from(self.moderator_fee_bps)
            / u128::from(BPS_DENOMINATOR);
        // fee <= amount because moderator_fee_bps <= BPS_DENOMINATOR
        let fee = fee as u64;
        (amount - fee, fee)
    }
}

/// Reads a JSON-encoded file from the given `path` and deserializes into type `T`.
///
/// # Errors
///
/// Returns an `anyhow::Error` if the file cannot be opened, read, or parsed.
#[cfg(feature = "json")]
pub fn load_json<P, T>(path: P) -> anyhow::Result<T>
where
    P: AsRef<Path>,
    T: DeserializeOwned,
{
    let path = path.as_ref();
    let content =
        std::fs::read_to_string(path).with_context(|| format!("loading {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("parsing JSON from {:?}", path))
}

/// Loads and validates an [`EscrowConfig`] from a JSON file.
#[cfg(feature = "json")]
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<EscrowConfig> {
    let config: EscrowConfig = load_json(&path)?;
    config
        .validate()
        .with_context(|| format!("validating config {:?}", path.as_ref()))?;
    Ok(config)
}

//! Introspection of the transfer that triggered an invocation.

use bincode::{Decode, Encode};
#[cfg(feature = "json")]
use hex::serde as hex_serde;
#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::identity::Address;
use crate::{EscrowError, Result};

/// A single value output of a transfer.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Encode, Decode, PartialEq, Eq)]
pub struct Output {
    /// Account receiving the value.
    pub destination: Address,
    /// Value in the smallest native unit.
    pub value: u64,
}

/// The host transfer an invocation rides on.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Encode, Decode, PartialEq, Eq)]
pub struct Transfer {
    /// Globally unique transfer identifier.
    #[cfg_attr(feature = "json", serde(with = "hex_serde"))]
    pub hash: [u8; 32],

    /// All outputs, including change returned to the sender.
    pub outputs: Vec<Output>,
}

impl Transfer {
    /// Sums the outputs paid into `custody`, excluding everything else.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::Overflow`] if the sum does not fit in a `u64`.
    pub fn deposit_to(&self, custody: &Address) -> Result<u64> {
        self.outputs
            .iter()
            .filter(|out| &out.destination == custody)
            .try_fold(0u64, |acc, out| acc.checked_add(out.value))
            .ok_or(EscrowError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(dest: u8, value: u64) -> Output {
        Output {
            destination: Address([dest; 32]),
            value,
        }
    }

    #[test]
    fn deposit_excludes_change() {
        let custody = Address([9; 32]);
        let transfer = Transfer {
            hash: [1; 32],
            outputs: vec![output(9, 60), output(2, 35), output(9, 40)],
        };
        assert_eq!(transfer.deposit_to(&custody).unwrap(), 100);
        assert_eq!(transfer.deposit_to(&Address([3; 32])).unwrap(), 0);
    }

    #[test]
    fn deposit_overflow() {
        let transfer = Transfer {
            hash: [1; 32],
            outputs: vec![output(9, u64::MAX), output(9, 1)],
        };
        assert_eq!(
            transfer.deposit_to(&Address([9; 32])),
            Err(EscrowError::Overflow)
        );
    }
}

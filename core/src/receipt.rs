//! What a successful invocation hands back to the host.

use core::fmt;

#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::identity::Address;
use crate::record::{EscrowId, EscrowStatus};

/// Instruction to the host ledger to move `amount` out of custody to `to`.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Payout {
    pub to: Address,
    pub amount: u64,
}

/// Value returned to the caller.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnValue {
    /// Returned by `register`.
    EscrowId(EscrowId),
    /// Returned by every other transition.
    Success(bool),
}

/// Informational notification emitted on success.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "json", serde(tag = "event", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Registered { escrow_id: EscrowId, amount: u64 },
    Accepted { escrow_id: EscrowId, moderator: Address },
    Released { escrow_id: EscrowId },
    Refunded { escrow_id: EscrowId },
    Moderated { escrow_id: EscrowId, to: Address },
}

impl Event {
    pub fn escrow_id(&self) -> &EscrowId {
        match self {
            Self::Registered { escrow_id, .. }
            | Self::Accepted { escrow_id, .. }
            | Self::Released { escrow_id }
            | Self::Refunded { escrow_id }
            | Self::Moderated { escrow_id, .. } => escrow_id,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registered { escrow_id, amount } => {
                write!(f, "Registered[{escrow_id}: {amount}]")
            }
            Self::Accepted {
                escrow_id,
                moderator,
            } => write!(f, "Accepted[{escrow_id} by {moderator}]"),
            Self::Released { escrow_id } => write!(f, "Released[{escrow_id}]"),
            Self::Refunded { escrow_id } => write!(f, "Refunded[{escrow_id}]"),
            Self::Moderated { escrow_id, to } => write!(f, "Moderated[{escrow_id} to {to}]"),
        }
    }
}

/// Outcome of a successful invocation.
///
/// Payouts are data: the host applies them only after the invocation
/// returned, so a failed invocation never moves value.
#[cfg_attr(feature = "json", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub result: ReturnValue,
    /// Status of the record after the transition.
    pub status: EscrowStatus,
    pub payouts: Vec<Payout>,
    pub event: Event,
}

impl Receipt {
    /// Sum of all payouts.
    pub fn total_paid(&self) -> u64 {
        self.payouts.iter().map(|p| p.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_its_escrow() {
        let id = EscrowId([7; 32]);
        let to = Address([9; 32]);
        let event = Event::Moderated { escrow_id: id, to };
        assert_eq!(event.escrow_id(), &id);
        assert_eq!(event.to_string(), format!("Moderated[{id} to {to}]"));

        let event = Event::Registered {
            escrow_id: id,
            amount: 5,
        };
        assert_eq!(event.escrow_id(), &id);
    }
}

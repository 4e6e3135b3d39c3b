//! Escrow state machine: dispatch and the five transitions.
//!
//! ```text
//! Registered --accept--> Accepted --release--> Released
//!                        Accepted --refund (after expiry)--> Refunded
//!                        Accepted --moderate (after expiry)--> Moderated
//! ```

use tracing::{debug, info, info_span, warn};

use crate::config::EscrowConfig;
use crate::gate::AuthorizationGate;
use crate::identity::Address;
use crate::invocation::{Invocation, Operation};
use crate::receipt::{Event, Payout, Receipt, ReturnValue};
use crate::record::{EscrowId, EscrowRecord, EscrowStatus};
use crate::store::RecordStore;
use crate::transfer::Transfer;
use crate::{EscrowError, Result};

/// Entry point of the escrow: holds the deployment parameters, no state.
#[derive(Debug, Clone)]
pub struct EscrowContract {
    config: EscrowConfig,
}

impl EscrowContract {
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: EscrowConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Runs one invocation against `store`, consulting `gate` for identity
    /// proofs and the current height.
    ///
    /// On error nothing has been written to `store`.
    pub fn invoke<S, G>(&self, store: &mut S, gate: &G, invocation: &Invocation) -> Result<Receipt>
    where
        S: RecordStore,
        G: AuthorizationGate,
    {
        let _span = info_span!("invoke", operation = %invocation.operation).entered();

        let result = self.dispatch(store, gate, invocation);
        match &result {
            Ok(receipt) => info!(
                escrow_id = %receipt.event.escrow_id(),
                event = %receipt.event,
                paid = receipt.total_paid(),
                "Invocation succeeded"
            ),
            Err(err) => warn!(tag = err.tag(), %err, "Invocation rejected"),
        }
        result
    }

    fn dispatch<S, G>(&self, store: &mut S, gate: &G, invocation: &Invocation) -> Result<Receipt>
    where
        S: RecordStore,
        G: AuthorizationGate,
    {
        let operation: Operation = invocation.operation.parse()?;
        if invocation.args.len() != operation.arity() {
            return Err(EscrowError::ArgError {
                expected: operation.arity(),
                got: invocation.args.len(),
            });
        }

        let mut session = Session::new(store, gate, &self.config);
        match operation {
            Operation::Register => {
                let sender = invocation.address_arg(0)?;
                let seller = invocation.address_arg(1)?;
                session.register(invocation.transfer.as_ref(), &sender, &seller)
            }
            Operation::AcceptEscrow => {
                let sender = invocation.address_arg(0)?;
                let id = invocation.escrow_id_arg(1)?;
                session.accept_escrow(&sender, &id)
            }
            Operation::ReleaseEscrow => {
                let sender = invocation.address_arg(0)?;
                let to = invocation.address_arg(1)?;
                let id = invocation.escrow_id_arg(2)?;
                session.release_escrow(&sender, &to, &id)
            }
            Operation::Refund => {
                let sender = invocation.address_arg(0)?;
                let id = invocation.escrow_id_arg(1)?;
                session.refund(&sender, &id)
            }
            Operation::Moderate => {
                let sender = invocation.address_arg(0)?;
                let to = invocation.address_arg(1)?;
                let id = invocation.escrow_id_arg(2)?;
                session.moderate(&sender, &to, &id)
            }
        }
    }
}

/// Handles threaded through the transitions of a single invocation.
pub struct Session<'a, S, G> {
    store: &'a mut S,
    gate: &'a G,
    config: &'a EscrowConfig,
}

impl<'a, S, G> Session<'a, S, G>
where
    S: RecordStore,
    G: AuthorizationGate,
{
    pub fn new(store: &'a mut S, gate: &'a G, config: &'a EscrowConfig) -> Self {
        Self {
            store,
            gate,
            config,
        }
    }

    /// Opens an escrow funded by the custody outputs of `transfer`.
    pub fn register(
        &mut self,
        transfer: Option<&Transfer>,
        sender: &Address,
        seller: &Address,
    ) -> Result<Receipt> {
        self.authorize(sender)?;

        let transfer = transfer.ok_or(EscrowError::MissingTransfer)?;
        let escrow_id = EscrowId(transfer.hash);
        if self.store.contains(escrow_id.as_bytes()) {
            return Err(EscrowError::DuplicateEscrow);
        }
        if seller == sender {
            return Err(EscrowError::WrongUser);
        }

        let amount = transfer.deposit_to(&self.config.custody)?;
        if amount == 0 {
            return Err(EscrowError::ZeroDeposit);
        }
        let height = self.gate.current_height();
        let expiry = height
            .checked_add(self.config.lock_period)
            .ok_or(EscrowError::Overflow)?;

        let record = EscrowRecord {
            seller_addr: *seller,
            buyer_addr: *sender,
            amount,
            moderator: None,
            expiry: Some(expiry),
            status: EscrowStatus::Registered,
        };
        self.save(&escrow_id, &record)?;
        debug!(%escrow_id, amount, height, expiry, "Escrow registered");

        Ok(Receipt {
            result: ReturnValue::EscrowId(escrow_id),
            status: record.status,
            payouts: Vec::new(),
            event: Event::Registered { escrow_id, amount },
        })
    }

    /// Binds `sender` as the moderator of a freshly registered escrow.
    pub fn accept_escrow(&mut self, sender: &Address, escrow_id: &EscrowId) -> Result<Receipt> {
        self.authorize(sender)?;

        let mut record = self.load(escrow_id)?;
        if record.status != EscrowStatus::Registered || record.moderator.is_some() {
            return Err(EscrowError::InvalidState);
        }
        if sender == &record.buyer_addr || sender == &record.seller_addr {
            return Err(EscrowError::WrongUser);
        }

        record.moderator = Some(*sender);
        record.status = EscrowStatus::Accepted;
        self.save(escrow_id, &record)?;

        Ok(success(
            record.status,
            Vec::new(),
            Event::Accepted {
                escrow_id: *escrow_id,
                moderator: *sender,
            },
        ))
    }

    /// Buyer hands the deposit to the seller.
    pub fn release_escrow(
        &mut self,
        sender: &Address,
        to: &Address,
        escrow_id: &EscrowId,
    ) -> Result<Receipt> {
        self.authorize(sender)?;

        let mut record = self.load_accepted(escrow_id)?;
        if sender != &record.buyer_addr || to != &record.seller_addr {
            return Err(EscrowError::WrongUser);
        }

        record.status = EscrowStatus::Released;
        self.save(escrow_id, &record)?;

        Ok(success(
            record.status,
            payouts([(record.seller_addr, record.amount)]),
            Event::Released {
                escrow_id: *escrow_id,
            },
        ))
    }

    /// Buyer reclaims the deposit after expiry, minus the moderator fee.
    pub fn refund(&mut self, sender: &Address, escrow_id: &EscrowId) -> Result<Receipt> {
        self.authorize(sender)?;

        let mut record = self.load_accepted(escrow_id)?;
        if sender != &record.buyer_addr {
            return Err(EscrowError::WrongUser);
        }
        self.require_expired(&record)?;
        let moderator = record.moderator.ok_or(EscrowError::InvalidState)?;

        let (buyer_share, fee) = self.config.split_refund(record.amount);
        record.status = EscrowStatus::Refunded;
        self.save(escrow_id, &record)?;

        Ok(success(
            record.status,
            payouts([(record.buyer_addr, buyer_share), (moderator, fee)]),
            Event::Refunded {
                escrow_id: *escrow_id,
            },
        ))
    }

    /// Moderator settles the escrow to either party after expiry.
    pub fn moderate(
        &mut self,
        sender: &Address,
        to: &Address,
        escrow_id: &EscrowId,
    ) -> Result<Receipt> {
        self.authorize(sender)?;

        let mut record = self.load_accepted(escrow_id)?;
        if record.moderator.as_ref() != Some(sender) {
            return Err(EscrowError::WrongUser);
        }
        self.require_expired(&record)?;
        if to != &record.seller_addr && to != &record.buyer_addr {
            return Err(EscrowError::WrongUser);
        }

        record.status = EscrowStatus::Moderated;
        self.save(escrow_id, &record)?;

        Ok(success(
            record.status,
            payouts([(*to, record.amount)]),
            Event::Moderated {
                escrow_id: *escrow_id,
                to: *to,
            },
        ))
    }

    fn authorize(&self, identity: &Address) -> Result<()> {
        if self.gate.is_authorized(identity) {
            Ok(())
        } else {
            Err(EscrowError::NotSender)
        }
    }

    fn load(&self, escrow_id: &EscrowId) -> Result<EscrowRecord> {
        let bytes = self
            .store
            .get(escrow_id.as_bytes())
            .ok_or(EscrowError::UnknownEscrow)?;
        EscrowRecord::decode(&bytes)
    }

    fn load_accepted(&self, escrow_id: &EscrowId) -> Result<EscrowRecord> {
        let record = self.load(escrow_id)?;
        if record.status != EscrowStatus::Accepted {
            return Err(EscrowError::InvalidState);
        }
        Ok(record)
    }

    fn require_expired(&self, record: &EscrowRecord) -> Result<()> {
        let height = self.gate.current_height();
        if record.is_expired(height) {
            return Ok(());
        }
        Err(EscrowError::NotExpired {
            height,
            expiry: record.expiry.unwrap_or(u64::MAX),
        })
    }

    // Must stay the last fallible step of every transition.
    fn save(&mut self, escrow_id: &EscrowId, record: &EscrowRecord) -> Result<()> {
        let bytes = record.encode()?;
        self.store.put(escrow_id.as_bytes(), bytes);
        Ok(())
    }
}

fn success(status: EscrowStatus, payouts: Vec<Payout>, event: Event) -> Receipt {
    Receipt {
        result: ReturnValue::Success(true),
        status,
        payouts,
        event,
    }
}

// Zero-value payouts are dropped.
fn payouts<I>(entries: I) -> Vec<Payout>
where
    I: IntoIterator<Item = (Address, u64)>,
{
    entries
        .into_iter()
        .filter(|(_, amount)| *amount > 0)
        .map(|(to, amount)| Payout { to, amount })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::store::MemoryStore;
    use crate::transfer::Output;
    use crate::utils::assert_err;

    const CUSTODY: Address = Address([0xcc; 32]);
    const BUYER: Address = Address([0xb0; 32]);
    const SELLER: Address = Address([0x5e; 32]);
    const MODERATOR: Address = Address([0x30; 32]);

    /// Gate that trusts a fixed set of identities.
    struct TrustedGate {
        signers: HashSet<Address>,
        height: u64,
    }

    impl TrustedGate {
        fn new(signers: &[Address], height: u64) -> Self {
            Self {
                signers: signers.iter().copied().collect(),
                height,
            }
        }
    }

    impl AuthorizationGate for TrustedGate {
        fn is_authorized(&self, identity: &Address) -> bool {
            self.signers.contains(identity)
        }

        fn current_height(&self) -> u64 {
            self.height
        }
    }

    fn deposit(hash: u8, value: u64) -> Transfer {
        Transfer {
            hash: [hash; 32],
            outputs: vec![
                Output {
                    destination: CUSTODY,
                    value,
                },
                Output {
                    destination: BUYER,
                    value: 7,
                },
            ],
        }
    }

    fn registered(store: &mut MemoryStore, config: &EscrowConfig) -> EscrowId {
        let gate = TrustedGate::new(&[BUYER], 1_000);
        let receipt = Session::new(store, &gate, config)
            .register(Some(&deposit(1, 100)), &BUYER, &SELLER)
            .unwrap();
        match receipt.result {
            ReturnValue::EscrowId(id) => id,
            other => panic!("unexpected result {other:?}"),
        }
    }

    fn accepted(store: &mut MemoryStore, config: &EscrowConfig) -> EscrowId {
        let id = registered(store, config);
        let gate = TrustedGate::new(&[MODERATOR], 1_001);
        Session::new(store, &gate, config)
            .accept_escrow(&MODERATOR, &id)
            .unwrap();
        id
    }

    fn stored(store: &MemoryStore, id: &EscrowId) -> EscrowRecord {
        EscrowRecord::decode(&store.get(id.as_bytes()).unwrap()).unwrap()
    }

    #[test]
    fn register_sums_custody_outputs_only() {
        let config = EscrowConfig::new(CUSTODY);
        let mut store = MemoryStore::new();
        let id = registered(&mut store, &config);

        assert_eq!(id, EscrowId([1; 32]));
        let record = stored(&store, &id);
        assert_eq!(record.amount, 100);
        assert_eq!(record.buyer_addr, BUYER);
        assert_eq!(record.seller_addr, SELLER);
        assert_eq!(record.moderator, None);
        assert_eq!(record.expiry, Some(1_000 + config.lock_period));
        assert_eq!(record.status, EscrowStatus::Registered);
    }

    #[test]
    fn register_rejections() {
        let config = EscrowConfig::new(CUSTODY);
        let mut store = MemoryStore::new();
        let gate = TrustedGate::new(&[BUYER], 1_000);
        let mut session = Session::new(&mut store, &gate, &config);

        assert_err(
            session.register(Some(&deposit(1, 100)), &SELLER, &BUYER),
            EscrowError::NotSender,
        );
        assert_err(
            session.register(None, &BUYER, &SELLER),
            EscrowError::MissingTransfer,
        );
        assert_err(
            session.register(Some(&deposit(1, 100)), &BUYER, &BUYER),
            EscrowError::WrongUser,
        );
        assert_err(
            session.register(Some(&deposit(1, 0)), &BUYER, &SELLER),
            EscrowError::ZeroDeposit,
        );
        assert!(store.is_empty());

        let gate = TrustedGate::new(&[BUYER], u64::MAX);
        assert_err(
            Session::new(&mut store, &gate, &config).register(
                Some(&deposit(1, 100)),
                &BUYER,
                &SELLER,
            ),
            EscrowError::Overflow,
        );
        assert!(store.is_empty());
    }

    #[test]
    fn accept_is_write_once() {
        let config = EscrowConfig::new(CUSTODY);
        let mut store = MemoryStore::new();
        let id = accepted(&mut store, &config);

        let intruder = Address([0x77; 32]);
        let gate = TrustedGate::new(&[intruder], 1_002);
        assert_err(
            Session::new(&mut store, &gate, &config).accept_escrow(&intruder, &id),
            EscrowError::InvalidState,
        );
        assert_eq!(stored(&store, &id).moderator, Some(MODERATOR));
    }

    #[test]
    fn parties_cannot_moderate() {
        let config = EscrowConfig::new(CUSTODY);
        let mut store = MemoryStore::new();
        let id = registered(&mut store, &config);
        let gate = TrustedGate::new(&[BUYER, SELLER], 1_001);
        let mut session = Session::new(&mut store, &gate, &config);

        assert_err(session.accept_escrow(&BUYER, &id), EscrowError::WrongUser);
        assert_err(session.accept_escrow(&SELLER, &id), EscrowError::WrongUser);
        assert_eq!(stored(&store, &id).status, EscrowStatus::Registered);
    }

    #[test]
    fn release_requires_acceptance() {
        let config = EscrowConfig::new(CUSTODY);
        let mut store = MemoryStore::new();
        let id = registered(&mut store, &config);
        let gate = TrustedGate::new(&[BUYER], 1_001);

        assert_err(
            Session::new(&mut store, &gate, &config).release_escrow(&BUYER, &SELLER, &id),
            EscrowError::InvalidState,
        );
    }

    #[test]
    fn refund_pays_moderator_fee() {
        let config = EscrowConfig {
            moderator_fee_bps: 500,
            ..EscrowConfig::new(CUSTODY)
        };
        let mut store = MemoryStore::new();
        let id = accepted(&mut store, &config);
        let gate = TrustedGate::new(&[BUYER], 1_000 + config.lock_period);

        let receipt = Session::new(&mut store, &gate, &config)
            .refund(&BUYER, &id)
            .unwrap();
        assert_eq!(
            receipt.payouts,
            vec![
                Payout {
                    to: BUYER,
                    amount: 95
                },
                Payout {
                    to: MODERATOR,
                    amount: 5
                },
            ]
        );
        assert_eq!(receipt.total_paid(), 100);
        assert_eq!(stored(&store, &id).status, EscrowStatus::Refunded);
    }

    #[test]
    fn refund_without_fee_pays_buyer_only() {
        let config = EscrowConfig {
            moderator_fee_bps: 0,
            ..EscrowConfig::new(CUSTODY)
        };
        let mut store = MemoryStore::new();
        let id = accepted(&mut store, &config);
        let gate = TrustedGate::new(&[BUYER], u64::MAX);

        let receipt = Session::new(&mut store, &gate, &config)
            .refund(&BUYER, &id)
            .unwrap();
        assert_eq!(
            receipt.payouts,
            vec![Payout {
                to: BUYER,
                amount: 100
            }]
        );
    }

    #[test]
    fn moderate_pays_buyer() {
        let config = EscrowConfig::new(CUSTODY);
        let mut store = MemoryStore::new();
        let id = accepted(&mut store, &config);
        let gate = TrustedGate::new(&[MODERATOR], 1_000 + config.lock_period);

        let receipt = Session::new(&mut store, &gate, &config)
            .moderate(&MODERATOR, &BUYER, &id)
            .unwrap();
        assert_eq!(
            receipt.payouts,
            vec![Payout {
                to: BUYER,
                amount: 100
            }]
        );
        assert_eq!(receipt.status, EscrowStatus::Moderated);
    }

    #[test]
    fn corrupted_record_is_codec_error() {
        let config = EscrowConfig::new(CUSTODY);
        let mut store = MemoryStore::new();
        store.put(&[9; 32], vec![0xff; 3]);
        let gate = TrustedGate::new(&[MODERATOR], 1);

        assert!(matches!(
            Session::new(&mut store, &gate, &config).accept_escrow(&MODERATOR, &EscrowId([9; 32])),
            Err(EscrowError::Codec(_))
        ));
    }

    #[test]
    fn dispatch_checks_arity_before_state() {
        let contract = EscrowContract::new(EscrowConfig::new(CUSTODY)).unwrap();
        let mut store = MemoryStore::new();
        let gate = TrustedGate::new(&[BUYER], 1);

        let inv = Invocation::new("refund", vec![BUYER.0.to_vec()]);
        assert_err(
            contract.invoke(&mut store, &gate, &inv),
            EscrowError::ArgError {
                expected: 2,
                got: 1,
            },
        );

        let inv = Invocation::new("withdraw", vec![]);
        assert_err(
            contract.invoke(&mut store, &gate, &inv),
            EscrowError::InvalidOperation("withdraw".to_string()),
        );

        let inv = Invocation::new("acceptEscrow", vec![BUYER.0.to_vec(), vec![1, 2, 3]]);
        assert_err(
            contract.invoke(&mut store, &gate, &inv),
            EscrowError::InvalidArgument { index: 1 },
        );
        assert!(store.is_empty());
    }

    #[test]
    fn contract_rejects_invalid_config() {
        let config = EscrowConfig {
            lock_period: 0,
            ..EscrowConfig::new(CUSTODY)
        };
        assert!(matches!(
            EscrowContract::new(config),
            Err(EscrowError::InvalidConfig(_))
        ));
    }
}

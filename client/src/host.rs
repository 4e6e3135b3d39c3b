//! Local host for the escrow: signs invocations, runs them, commits the store.

use mescrow_core::{
    EscrowConfig, EscrowContract, EscrowId, EscrowRecord, Invocation, InvocationContext, Receipt,
    RecordStore,
};
use tracing::{info, info_span, warn};

use crate::error::Result;
use crate::keys::LocalKey;
use crate::store::FileStore;

/// Runs escrow invocations against a [`FileStore`].
pub struct LocalHost {
    contract: EscrowContract,
    store: FileStore,
}

impl LocalHost {
    pub fn new(config: EscrowConfig, store: FileStore) -> Result<Self> {
        Ok(Self {
            contract: EscrowContract::new(config)?,
            store,
        })
    }

    /// Signs `invocation` with every key in `signers`, runs it at `height`
    /// and flushes the store if it succeeded.
    ///
    /// If the flush is refused the transition is discarded, the store is
    /// reloaded from disk and no payout is signalled.
    pub fn execute(
        &mut self,
        invocation: &Invocation,
        signers: &[LocalKey],
        height: u64,
    ) -> Result<Receipt> {
        let _span = info_span!("host", height, signers = signers.len()).entered();

        let witnesses = signers
            .iter()
            .map(|key| key.witness(invocation))
            .collect::<Result<Vec<_>>>()?;
        let gate = InvocationContext::new(invocation, witnesses, height)?;

        let receipt = self.contract.invoke(&mut self.store, &gate, invocation)?;
        if let Err(err) = self.store.flush() {
            warn!(%err, "Discarding uncommitted transition");
            self.store.reload()?;
            return Err(err);
        }

        for payout in &receipt.payouts {
            info!(to = %payout.to, amount = payout.amount, "Payout signalled to ledger");
        }
        Ok(receipt)
    }

    /// Reads the record stored under `escrow_id`.
    pub fn record(&self, escrow_id: &EscrowId) -> Result<Option<EscrowRecord>> {
        self.store
            .get(escrow_id.as_bytes())
            .map(|bytes| EscrowRecord::decode(&bytes))
            .transpose()
            .map_err(Into::into)
    }
}

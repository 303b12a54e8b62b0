//! In-process ledger implementing every collaborator trait against a single
//! staking contract and reward token held in memory.
//!
//! Writes take effect at dispatch; the receipt stream reports `Pending`
//! after one confirmation delay and the final outcome after another. This is
//! plumbing for the console and tests, not a model of real reward accrual.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::Mutex;

use crate::address::{Address, TxHash};
use crate::intent::{
    FN_BALANCE_OF, FN_CLAIM_REWARD, FN_EARNED, FN_STAKE, FN_STAKED_BALANCE, FN_UNSTAKE,
};
use crate::ledger::{CallArg, ContractCall, LedgerReader, LedgerWriter, ReceiptStatus, ReceiptWatcher};

/// Everything the sandbox tracks for one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Holdings {
    pub native: u128,
    pub staked: u128,
    pub earned: u128,
    pub reward_tokens: u128,
}

#[derive(Default)]
struct SandboxState {
    holdings: HashMap<Address, Holdings>,
    receipts: HashMap<TxHash, ReceiptStatus>,
}

pub struct SandboxLedger {
    signer: Address,
    staking_contract: Address,
    reward_token: Address,
    reward_rate: u128,
    confirmation_delay: Duration,
    state: Arc<Mutex<SandboxState>>,
    next_tx: AtomicU64,
    reads: AtomicUsize,
    writes: AtomicUsize,
    reads_failing: AtomicBool,
    fail_next: AtomicBool,
    reject_next: AtomicBool,
}

impl SandboxLedger {
    pub fn new(signer: Address, staking_contract: Address, reward_token: Address) -> Self {
        Self {
            signer,
            staking_contract,
            reward_token,
            reward_rate: 0,
            confirmation_delay: Duration::ZERO,
            state: Arc::new(Mutex::new(SandboxState::default())),
            next_tx: AtomicU64::new(1),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            reads_failing: AtomicBool::new(false),
            fail_next: AtomicBool::new(false),
            reject_next: AtomicBool::new(false),
        }
    }

    /// Earned reward added after each confirmed stake or unstake that leaves
    /// a non-zero stake.
    pub fn with_reward_rate(mut self, rate: u128) -> Self {
        self.reward_rate = rate;
        self
    }

    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    pub fn signer(&self) -> Address {
        self.signer
    }

    pub async fn holdings(&self, owner: &Address) -> Holdings {
        self.state
            .lock()
            .await
            .holdings
            .get(owner)
            .copied()
            .unwrap_or_default()
    }

    pub async fn set_holdings(&self, owner: Address, holdings: Holdings) {
        self.state.lock().await.holdings.insert(owner, holdings);
    }

    /// Credit native balance to `owner`.
    pub async fn fund(&self, owner: Address, amount: u128) {
        let mut state = self.state.lock().await;
        let entry = state.holdings.entry(owner).or_default();
        entry.native = entry.native.saturating_add(amount);
    }

    /// The next accepted transaction will be included but revert.
    pub fn fail_next_transaction(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// The next write will be declined before it gets a hash.
    pub fn reject_next_signature(&self) {
        self.reject_next.store(true, Ordering::SeqCst);
    }

    pub fn set_reads_failing(&self, failing: bool) {
        self.reads_failing.store(failing, Ordering::SeqCst);
    }

    /// Number of balance reads served so far, failed ones included.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of writes attempted so far, rejected ones included.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn begin_read(&self) -> Result<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.reads_failing.load(Ordering::SeqCst) {
            bail!("sandbox node unreachable");
        }
        Ok(())
    }

    fn next_hash(&self) -> TxHash {
        let n = self.next_tx.fetch_add(1, Ordering::SeqCst);
        let mut bytes = [0u8; 32];
        bytes[..20].copy_from_slice(self.signer.as_bytes());
        bytes[24..].copy_from_slice(&n.to_be_bytes());
        TxHash::new(bytes)
    }

    /// Check `call` against `holdings` and return the holdings after it runs.
    fn execute(&self, call: &ContractCall, holdings: Holdings) -> Result<Holdings> {
        if call.contract != self.staking_contract {
            bail!("no staking contract at {}", call.contract);
        }
        let mut next = holdings;
        match call.function {
            FN_STAKE => {
                let amount = call.uint_arg().unwrap_or(0);
                if call.value != Some(amount) {
                    bail!("execution reverted: value must equal amount");
                }
                if amount == 0 {
                    bail!("execution reverted: amount must be greater than zero");
                }
                if holdings.native < amount {
                    bail!("insufficient funds for transfer");
                }
                next.native -= amount;
                next.staked = checked_credit(holdings.staked, amount)?;
            }
            FN_UNSTAKE => {
                let amount = call.uint_arg().unwrap_or(0);
                if amount == 0 {
                    bail!("execution reverted: amount must be greater than zero");
                }
                if holdings.staked < amount {
                    bail!("execution reverted: insufficient staked balance");
                }
                next.staked -= amount;
                next.native = checked_credit(holdings.native, amount)?;
            }
            FN_CLAIM_REWARD => {
                if holdings.earned == 0 {
                    bail!("execution reverted: no reward to claim");
                }
                next.reward_tokens = checked_credit(holdings.reward_tokens, holdings.earned)?;
                next.earned = 0;
            }
            other => bail!("staking contract has no function '{other}'"),
        }
        if call.function != FN_CLAIM_REWARD && next.staked > 0 {
            next.earned = next.earned.saturating_add(self.reward_rate);
        }
        Ok(next)
    }
}

fn checked_credit(balance: u128, amount: u128) -> Result<u128> {
    match balance.checked_add(amount) {
        Some(total) => Ok(total),
        None => bail!("execution reverted: balance overflow"),
    }
}

#[async_trait]
impl LedgerReader for SandboxLedger {
    async fn native_balance(&self, owner: &Address) -> Result<u128> {
        self.begin_read()?;
        Ok(self.holdings(owner).await.native)
    }

    async fn read(&self, call: &ContractCall) -> Result<u128> {
        self.begin_read()?;
        let owner = match call.args.first() {
            Some(CallArg::Address(owner)) => *owner,
            _ => bail!("{} expects an address argument", call.function),
        };
        let holdings = self.holdings(&owner).await;
        match call.function {
            FN_STAKED_BALANCE if call.contract == self.staking_contract => Ok(holdings.staked),
            FN_EARNED if call.contract == self.staking_contract => Ok(holdings.earned),
            FN_BALANCE_OF if call.contract == self.reward_token => Ok(holdings.reward_tokens),
            other => bail!("no view '{other}' at {}", call.contract),
        }
    }
}

#[async_trait]
impl LedgerWriter for SandboxLedger {
    async fn write(&self, call: ContractCall) -> Result<TxHash> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.reject_next.swap(false, Ordering::SeqCst) {
            bail!("User rejected the request");
        }

        let mut state = self.state.lock().await;
        let holdings = state.holdings.get(&self.signer).copied().unwrap_or_default();
        let next = self.execute(&call, holdings)?;

        let tx = self.next_hash();
        let status = if self.fail_next.swap(false, Ordering::SeqCst) {
            ReceiptStatus::Error("execution reverted".to_string())
        } else {
            state.holdings.insert(self.signer, next);
            ReceiptStatus::Success
        };
        tracing::debug!(%tx, %call, ?status, "sandbox accepted transaction");
        state.receipts.insert(tx, status);
        Ok(tx)
    }
}

impl ReceiptWatcher for SandboxLedger {
    fn watch(&self, tx: TxHash) -> BoxStream<'static, ReceiptStatus> {
        let state = self.state.clone();
        let delay = self.confirmation_delay;
        stream::unfold(0u8, move |step| {
            let state = state.clone();
            async move {
                match step {
                    0 => {
                        tokio::time::sleep(delay).await;
                        Some((ReceiptStatus::Pending, 1))
                    }
                    1 => {
                        tokio::time::sleep(delay).await;
                        let status = state
                            .lock()
                            .await
                            .receipts
                            .get(&tx)
                            .cloned()
                            .unwrap_or_else(|| ReceiptStatus::Error(format!("unknown transaction {tx}")));
                        Some((status, 2))
                    }
                    _ => None,
                }
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::TransactionIntent;

    const STAKING: Address = Address::new([0xaa; 20]);
    const TOKEN: Address = Address::new([0xbb; 20]);
    const USER: Address = Address::new([0x11; 20]);

    async fn ledger() -> SandboxLedger {
        let ledger = SandboxLedger::new(USER, STAKING, TOKEN).with_reward_rate(5);
        ledger.fund(USER, 100).await;
        ledger
    }

    #[tokio::test]
    async fn stake_moves_native_into_stake() {
        let ledger = ledger().await;
        let tx = ledger
            .write(TransactionIntent::stake(40).to_call(STAKING))
            .await
            .unwrap();
        let statuses: Vec<_> = ledger.watch(tx).collect().await;
        assert_eq!(statuses.last(), Some(&ReceiptStatus::Success));
        let h = ledger.holdings(&USER).await;
        assert_eq!((h.native, h.staked, h.earned), (60, 40, 5));
    }

    #[tokio::test]
    async fn stake_without_matching_value_is_rejected() {
        let ledger = ledger().await;
        let call = ContractCall::new(STAKING, FN_STAKE).arg(CallArg::Uint(10));
        assert!(ledger.write(call).await.is_err());
        assert_eq!(ledger.holdings(&USER).await.native, 100);
    }

    #[tokio::test]
    async fn claim_converts_earned_into_tokens() {
        let ledger = ledger().await;
        ledger
            .write(TransactionIntent::stake(10).to_call(STAKING))
            .await
            .unwrap();
        ledger
            .write(TransactionIntent::claim().to_call(STAKING))
            .await
            .unwrap();
        let call = ContractCall::new(TOKEN, FN_BALANCE_OF).arg(CallArg::Address(USER));
        assert_eq!(ledger.read(&call).await.unwrap(), 5);
        assert_eq!(ledger.holdings(&USER).await.earned, 0);
    }

    #[tokio::test]
    async fn failed_transaction_leaves_state_alone() {
        let ledger = ledger().await;
        ledger.fail_next_transaction();
        let tx = ledger
            .write(TransactionIntent::stake(10).to_call(STAKING))
            .await
            .unwrap();
        let statuses: Vec<_> = ledger.watch(tx).collect().await;
        assert!(matches!(statuses.last(), Some(ReceiptStatus::Error(_))));
        assert_eq!(ledger.holdings(&USER).await.native, 100);
    }

    #[tokio::test]
    async fn credit_past_the_maximum_is_refused() {
        let ledger = ledger().await;
        let holdings = Holdings {
            native: u128::MAX,
            staked: 1,
            earned: 0,
            reward_tokens: 0,
        };
        ledger.set_holdings(USER, holdings).await;
        let err = ledger
            .write(TransactionIntent::unstake(1).to_call(STAKING))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("overflow"));
        assert_eq!(ledger.holdings(&USER).await, holdings);
    }

    #[tokio::test]
    async fn rejected_signature_yields_no_hash() {
        let ledger = ledger().await;
        ledger.reject_next_signature();
        let err = ledger
            .write(TransactionIntent::stake(10).to_call(STAKING))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rejected"));
        // Only the next one
        assert!(ledger
            .write(TransactionIntent::stake(10).to_call(STAKING))
            .await
            .is_ok());
        assert_eq!(ledger.write_count(), 2);
    }

    #[tokio::test]
    async fn watch_reports_pending_then_outcome() {
        let ledger = ledger().await;
        let tx = ledger
            .write(TransactionIntent::stake(1).to_call(STAKING))
            .await
            .unwrap();
        let statuses: Vec<_> = ledger.watch(tx).collect().await;
        assert_eq!(statuses, vec![ReceiptStatus::Pending, ReceiptStatus::Success]);
    }

    #[tokio::test]
    async fn hashes_are_distinct() {
        let ledger = ledger().await;
        let a = ledger.write(TransactionIntent::stake(1).to_call(STAKING)).await.unwrap();
        let b = ledger.write(TransactionIntent::stake(1).to_call(STAKING)).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn failing_reads_are_counted() {
        let ledger = ledger().await;
        ledger.set_reads_failing(true);
        assert!(ledger.native_balance(&USER).await.is_err());
        assert_eq!(ledger.read_count(), 1);
    }
}

//! The staking form controller: owns the mode, the amount field, the
//! submission guard, and the lifecycle of the last dispatched transaction.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::Mutex;

use crate::address::TxHash;
use crate::amount::{slider_value, AmountInput, Edit};
use crate::balances::BalanceSet;
use crate::error::{Result, StakingError};
use crate::intent::{ActionMode, PendingOperation, TransactionIntent, TransactionKind};
use crate::ledger::{LedgerWriter, ReceiptStatus, ReceiptWatcher};
use crate::lifecycle::{LifecycleEffect, LifecycleState, LifecycleWatcher};
use crate::notify::{Notification, Notifier};
use crate::session::{Account, Session};

/// Result of a submit or claim request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Exactly one write went out and the ledger returned this identifier.
    Dispatched(TxHash),
    /// Another operation was still pending; nothing was sent.
    Ignored,
}

#[derive(Debug, Default)]
struct FormState {
    mode: ActionMode,
    amount: AmountInput,
    pending: Option<PendingOperation>,
    lifecycle: LifecycleWatcher,
}

pub struct StakingController {
    session: Session,
    writer: Arc<dyn LedgerWriter>,
    receipts: Arc<dyn ReceiptWatcher>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<FormState>,
}

impl StakingController {
    pub fn new(
        session: Session,
        writer: Arc<dyn LedgerWriter>,
        receipts: Arc<dyn ReceiptWatcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            session,
            writer,
            receipts,
            notifier,
            state: Mutex::new(FormState::default()),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn account(&self) -> &Account {
        self.session.account()
    }

    /// End the session. Cached balances and form state are dropped with it.
    pub fn disconnect(self) -> Account {
        self.session.disconnect()
    }

    pub async fn balances(&self) -> BalanceSet {
        self.session.balances().snapshot().await
    }

    pub async fn mode(&self) -> ActionMode {
        self.state.lock().await.mode
    }

    pub async fn amount(&self) -> String {
        self.state.lock().await.amount.as_str().to_string()
    }

    pub async fn pending(&self) -> Option<PendingOperation> {
        self.state.lock().await.pending
    }

    pub async fn lifecycle(&self) -> LifecycleState {
        self.state.lock().await.lifecycle.state()
    }

    /// Label for the operation in flight: the dispatch awaiting its write,
    /// then a tracked transaction that has not settled yet.
    pub async fn progress_label(&self) -> Option<&'static str> {
        let state = self.state.lock().await;
        if let Some(pending) = state.pending {
            return Some(pending.progress_label());
        }
        match state.lifecycle.state() {
            LifecycleState::Submitted(_) | LifecycleState::Confirming(_) => {
                state.lifecycle.kind().map(TransactionKind::progress_label)
            }
            _ => None,
        }
    }

    /// Ceiling for the current mode in base units.
    pub async fn ceiling(&self) -> u128 {
        let balances = self.balances().await;
        self.state.lock().await.mode.ceiling(&balances)
    }

    /// Switch mode. The amount always goes back to zero, even when the mode
    /// does not actually change.
    pub async fn set_mode(&self, mode: ActionMode) {
        let mut state = self.state.lock().await;
        state.mode = mode;
        state.amount.reset();
        tracing::debug!(%mode, "mode selected, amount reset");
    }

    pub async fn set_amount(&self, raw: &str) -> Edit {
        let balances = self.balances().await;
        let mut state = self.state.lock().await;
        let ceiling = state.mode.ceiling(&balances);
        let edit = state.amount.set_amount(raw, ceiling);
        tracing::debug!(input = raw, stored = state.amount.as_str(), ?edit, "amount edited");
        edit
    }

    pub async fn set_max(&self) {
        let balances = self.balances().await;
        let mut state = self.state.lock().await;
        let ceiling = state.mode.ceiling(&balances);
        state.amount.set_max(ceiling);
        tracing::debug!(stored = state.amount.as_str(), "amount set to max");
    }

    /// Store a slider-produced base-unit value as is.
    pub async fn set_by_slider(&self, value: u128) {
        let mut state = self.state.lock().await;
        state.amount.set_by_slider(value);
        tracing::debug!(stored = state.amount.as_str(), "amount set by slider");
    }

    /// Position the slider at `percent` of the current ceiling.
    pub async fn set_slider_percent(&self, percent: u8) -> u128 {
        let value = slider_value(percent, self.ceiling().await);
        self.set_by_slider(value).await;
        value
    }

    /// Submit the amount-bearing operation for the current mode.
    pub async fn submit(&self) -> Result<Submission> {
        let balances = self.balances().await;
        let mut state = self.state.lock().await;
        if let Some(pending) = state.pending {
            tracing::debug!(kind = %pending.kind, "submission ignored, operation pending");
            return Ok(Submission::Ignored);
        }

        let mode = state.mode;
        let ceiling = mode.ceiling(&balances);
        let validated = validate_amount(&state.amount, mode, ceiling);
        let intent = match validated {
            Ok(amount) => TransactionIntent {
                kind: mode.kind(),
                amount: Some(amount),
            },
            Err(e) => {
                drop(state);
                tracing::debug!(%mode, error = %e, "submission failed validation");
                self.notifier.notify(Notification::error(e.to_string()));
                return Err(e);
            }
        };

        state.pending = Some(PendingOperation::new(intent.kind));
        drop(state);
        self.dispatch(intent).await
    }

    /// Claim accrued rewards. Refused when nothing is claimable.
    pub async fn claim(&self) -> Result<Submission> {
        let earned = self.session.balances().snapshot().await.earned;
        let mut state = self.state.lock().await;
        if let Some(pending) = state.pending {
            tracing::debug!(kind = %pending.kind, "claim ignored, operation pending");
            return Ok(Submission::Ignored);
        }
        if earned.unwrap_or(0) == 0 {
            drop(state);
            let e = StakingError::InvalidState("Nothing to claim".to_string());
            self.notifier.notify(Notification::error(e.to_string()));
            return Err(e);
        }

        state.pending = Some(PendingOperation::new(TransactionKind::Claim));
        drop(state);
        self.dispatch(TransactionIntent::claim()).await
    }

    /// Send one write for `intent`. The caller has already recorded the
    /// pending operation; it is cleared here once the write settles.
    async fn dispatch(&self, intent: TransactionIntent) -> Result<Submission> {
        let call = intent.to_call(self.session.staking_contract());
        tracing::info!(kind = %intent.kind, %call, "dispatching transaction");
        let outcome = self.writer.write(call).await;

        let mut state = self.state.lock().await;
        state.pending = None;
        match outcome {
            Ok(tx) => {
                state.lifecycle.track(intent.kind, tx);
                tracing::info!(kind = %intent.kind, %tx, "transaction submitted");
                Ok(Submission::Dispatched(tx))
            }
            Err(e) => {
                drop(state);
                tracing::warn!(kind = %intent.kind, error = %e, "dispatch rejected");
                let err = StakingError::DispatchRejected(e.to_string());
                self.notifier.notify(Notification::error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Feed one receipt status into the lifecycle and run whatever effects
    /// the transition asks for.
    pub async fn handle_receipt(&self, tx: TxHash, status: ReceiptStatus) -> LifecycleState {
        let (effects, state) = {
            let mut form = self.state.lock().await;
            let effects = form.lifecycle.apply(tx, &status);
            (effects, form.lifecycle.state())
        };
        for effect in effects {
            match effect {
                LifecycleEffect::Notify(n) => self.notifier.notify(n),
                LifecycleEffect::RefreshBalances => {
                    self.session.balances().refresh_all().await;
                }
            }
        }
        state
    }

    /// Drive the lifecycle of `tx` from the receipt watcher until it reaches
    /// a terminal state or the stream ends. The result reflects the watcher:
    /// once `tx` is no longer the tracked transaction the current state is
    /// returned as is, and only a tracked failure is reported as an error.
    pub async fn follow(&self, tx: TxHash) -> Result<LifecycleState> {
        let mut last = self.lifecycle().await;
        if last.tx() != Some(tx) {
            tracing::debug!(%tx, current = ?last, "transaction no longer tracked");
            return Ok(last);
        }

        let mut statuses = self.receipts.watch(tx);
        let mut reason = None;
        while let Some(status) = statuses.next().await {
            if let ReceiptStatus::Error(r) = &status {
                reason = Some(r.clone());
            }
            last = self.handle_receipt(tx, status).await;
            if last.tx() != Some(tx) {
                tracing::debug!(%tx, current = ?last, "transaction replaced while following");
                return Ok(last);
            }
            if last == LifecycleState::Failed(tx) {
                return Err(StakingError::TransactionFailed(
                    reason.unwrap_or_else(|| "transaction reverted".to_string()),
                ));
            }
            if last.is_terminal() {
                break;
            }
        }
        Ok(last)
    }

    /// Explicit re-fetch of every balance slot.
    pub async fn refresh(&self) -> BalanceSet {
        self.session.balances().refresh_all().await
    }

    pub async fn reward_token_balance(&self) -> Result<Option<u128>> {
        self.session.reward_token_balance().await
    }
}

fn validate_amount(input: &AmountInput, mode: ActionMode, ceiling: u128) -> Result<u128> {
    match input.text().base_units() {
        Some(0) => Err(StakingError::InvalidAmount(
            "Please enter a valid amount".to_string(),
        )),
        Some(amount) if amount <= ceiling => Ok(amount),
        _ => Err(StakingError::InsufficientBalance(match mode {
            ActionMode::Stake => "Insufficient balance".to_string(),
            ActionMode::Unstake => "Insufficient staked balance".to_string(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::BASE_PER_UNIT;

    const ONE: u128 = BASE_PER_UNIT;

    fn input(ceiling: u128, raw: &str) -> AmountInput {
        let mut input = AmountInput::default();
        input.set_amount(raw, ceiling);
        input
    }

    #[test]
    fn zero_and_blank_are_invalid() {
        for raw in ["0", "", ".", "0.000"] {
            let err = validate_amount(&input(ONE, raw), ActionMode::Stake, ONE).unwrap_err();
            assert!(matches!(err, StakingError::InvalidAmount(_)), "{raw}");
        }
    }

    #[test]
    fn over_ceiling_after_balance_drop() {
        // Entered against 2.0, then the ceiling shrank underneath
        let amount = input(2 * ONE, "1.5");
        let err = validate_amount(&amount, ActionMode::Unstake, ONE).unwrap_err();
        assert!(matches!(err, StakingError::InsufficientBalance(ref m) if m.contains("staked")));
    }

    #[test]
    fn within_ceiling_yields_base_units() {
        let amount = input(2 * ONE, "1.25");
        assert_eq!(
            validate_amount(&amount, ActionMode::Stake, 2 * ONE).unwrap(),
            ONE + ONE / 4
        );
    }
}

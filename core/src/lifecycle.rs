//! Confirmation tracking for the most recently dispatched transaction.
//!
//! The watcher never polls. It is handed receipt statuses and answers with the
//! side effects the caller must perform. Each identifier produces at most one
//! "processing" notification and at most one terminal outcome; anything that
//! arrives after the terminal state, or for an identifier that is no longer
//! tracked, yields no effects.

use crate::address::TxHash;
use crate::intent::TransactionKind;
use crate::ledger::ReceiptStatus;
use crate::notify::Notification;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Idle,
    Submitted(TxHash),
    Confirming(TxHash),
    Confirmed(TxHash),
    Failed(TxHash),
}

impl LifecycleState {
    pub fn tx(&self) -> Option<TxHash> {
        match self {
            LifecycleState::Idle => None,
            LifecycleState::Submitted(tx)
            | LifecycleState::Confirming(tx)
            | LifecycleState::Confirmed(tx)
            | LifecycleState::Failed(tx) => Some(*tx),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::Confirmed(_) | LifecycleState::Failed(_)
        )
    }
}

/// Side effect requested by a transition, in the order it must run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEffect {
    Notify(Notification),
    RefreshBalances,
}

#[derive(Debug, Default)]
pub struct LifecycleWatcher {
    state: LifecycleState,
    kind: Option<TransactionKind>,
}

impl LifecycleWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn kind(&self) -> Option<TransactionKind> {
        self.kind
    }

    /// Start tracking a freshly dispatched transaction, replacing whatever
    /// was tracked before.
    pub fn track(&mut self, kind: TransactionKind, tx: TxHash) {
        if let Some(previous) = self.state.tx().filter(|_| !self.state.is_terminal()) {
            tracing::debug!(%previous, %tx, "superseding unresolved transaction");
        }
        self.state = LifecycleState::Submitted(tx);
        self.kind = Some(kind);
    }

    /// Feed one receipt status for `tx`.
    pub fn apply(&mut self, tx: TxHash, status: &ReceiptStatus) -> Vec<LifecycleEffect> {
        if self.state.tx() != Some(tx) {
            tracing::debug!(%tx, "receipt for untracked transaction ignored");
            return Vec::new();
        }
        if self.state.is_terminal() {
            return Vec::new();
        }
        let kind = self.kind.map(title).unwrap_or("Transaction");

        match status {
            ReceiptStatus::Pending => match self.state {
                LifecycleState::Submitted(_) => {
                    self.state = LifecycleState::Confirming(tx);
                    tracing::info!(%tx, "transaction confirming");
                    vec![LifecycleEffect::Notify(Notification::info(
                        "Processing transaction...",
                    ))]
                }
                _ => Vec::new(),
            },
            ReceiptStatus::Success => {
                self.state = LifecycleState::Confirmed(tx);
                tracing::info!(%tx, "transaction confirmed");
                vec![
                    LifecycleEffect::Notify(Notification::success(format!(
                        "{kind} successful! ({tx})"
                    ))),
                    LifecycleEffect::RefreshBalances,
                ]
            }
            ReceiptStatus::Error(reason) => {
                self.state = LifecycleState::Failed(tx);
                tracing::warn!(%tx, %reason, "transaction failed");
                vec![LifecycleEffect::Notify(Notification::error(format!(
                    "{kind} failed: {reason}"
                )))]
            }
        }
    }
}

fn title(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Stake => "Stake",
        TransactionKind::Unstake => "Unstake",
        TransactionKind::Claim => "Claim",
    }
}

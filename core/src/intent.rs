//! Action modes, transaction intents, and their mapping onto contract calls.

use std::fmt;

use serde::Serialize;

use crate::address::Address;
use crate::balances::{BalanceSet, BalanceSlot};
use crate::ledger::{CallArg, ContractCall};

pub const FN_STAKE: &str = "stake";
pub const FN_UNSTAKE: &str = "unstake";
pub const FN_CLAIM_REWARD: &str = "claimReward";
pub const FN_STAKED_BALANCE: &str = "s_balances";
pub const FN_EARNED: &str = "earned";
pub const FN_BALANCE_OF: &str = "balanceOf";

/// Which amount-bearing operation the form currently targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionMode {
    #[default]
    Stake,
    Unstake,
}

impl ActionMode {
    /// The balance slot that bounds amounts in this mode.
    pub fn ceiling_slot(&self) -> BalanceSlot {
        match self {
            ActionMode::Stake => BalanceSlot::Available,
            ActionMode::Unstake => BalanceSlot::Staked,
        }
    }

    /// Current ceiling in base units; unfetched slots count as zero.
    pub fn ceiling(&self, balances: &BalanceSet) -> u128 {
        balances.get(self.ceiling_slot()).unwrap_or(0)
    }

    pub fn kind(&self) -> TransactionKind {
        match self {
            ActionMode::Stake => TransactionKind::Stake,
            ActionMode::Unstake => TransactionKind::Unstake,
        }
    }
}

impl fmt::Display for ActionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionMode::Stake => write!(f, "stake"),
            ActionMode::Unstake => write!(f, "unstake"),
        }
    }
}

impl std::str::FromStr for ActionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stake" => Ok(Self::Stake),
            "unstake" => Ok(Self::Unstake),
            other => Err(format!("Unknown mode: '{other}'. Use 'stake' or 'unstake'.")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Stake,
    Unstake,
    Claim,
}

impl TransactionKind {
    /// Status shown while an operation of this kind is in flight.
    pub fn progress_label(self) -> &'static str {
        match self {
            TransactionKind::Stake => "STAKING...",
            TransactionKind::Unstake => "UNSTAKING...",
            TransactionKind::Claim => "CLAIMING...",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Stake => write!(f, "stake"),
            TransactionKind::Unstake => write!(f, "unstake"),
            TransactionKind::Claim => write!(f, "claim"),
        }
    }
}

/// A validated request to perform one write operation. `amount` is in base
/// units and is `None` exactly for claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionIntent {
    pub kind: TransactionKind,
    pub amount: Option<u128>,
}

impl TransactionIntent {
    pub fn stake(amount: u128) -> Self {
        Self {
            kind: TransactionKind::Stake,
            amount: Some(amount),
        }
    }

    pub fn unstake(amount: u128) -> Self {
        Self {
            kind: TransactionKind::Unstake,
            amount: Some(amount),
        }
    }

    pub fn claim() -> Self {
        Self {
            kind: TransactionKind::Claim,
            amount: None,
        }
    }

    /// Build the write call against the staking contract. Stake carries the
    /// amount both as argument and as attached value; unstake only as
    /// argument; claim takes no arguments.
    pub fn to_call(&self, staking_contract: Address) -> ContractCall {
        let amount = self.amount.unwrap_or(0);
        match self.kind {
            TransactionKind::Stake => ContractCall::new(staking_contract, FN_STAKE)
                .arg(CallArg::Uint(amount))
                .with_value(amount),
            TransactionKind::Unstake => {
                ContractCall::new(staking_contract, FN_UNSTAKE).arg(CallArg::Uint(amount))
            }
            TransactionKind::Claim => ContractCall::new(staking_contract, FN_CLAIM_REWARD),
        }
    }
}

/// The write operation currently awaiting its dispatch to settle. It is
/// cleared in the same step that receives the transaction identifier, which
/// from then on is tracked by [`LifecycleWatcher`](crate::lifecycle::LifecycleWatcher).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOperation {
    pub kind: TransactionKind,
}

impl PendingOperation {
    pub fn new(kind: TransactionKind) -> Self {
        Self { kind }
    }

    pub fn progress_label(&self) -> &'static str {
        self.kind.progress_label()
    }
}

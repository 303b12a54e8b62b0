/// Last-known values of the three balances the form depends on.
///
/// Each slot is fetched independently. A failed fetch keeps whatever was
/// there before; overwrites are idempotent, so the last write wins.
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::address::Address;
use crate::error::{Result, StakingError};
use crate::intent::{FN_EARNED, FN_STAKED_BALANCE};
use crate::ledger::{CallArg, ContractCall, LedgerReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceSlot {
    /// Spendable native balance.
    Available,
    /// Principal locked in the staking contract.
    Staked,
    /// Claimable reward.
    Earned,
}

impl BalanceSlot {
    pub const ALL: [BalanceSlot; 3] = [
        BalanceSlot::Available,
        BalanceSlot::Staked,
        BalanceSlot::Earned,
    ];
}

impl fmt::Display for BalanceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BalanceSlot::Available => write!(f, "available"),
            BalanceSlot::Staked => write!(f, "staked"),
            BalanceSlot::Earned => write!(f, "earned"),
        }
    }
}

/// Base-unit values; `None` until the slot's first successful fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BalanceSet {
    pub available: Option<u128>,
    pub staked: Option<u128>,
    pub earned: Option<u128>,
}

impl BalanceSet {
    pub fn get(&self, slot: BalanceSlot) -> Option<u128> {
        match slot {
            BalanceSlot::Available => self.available,
            BalanceSlot::Staked => self.staked,
            BalanceSlot::Earned => self.earned,
        }
    }

    pub fn set(&mut self, slot: BalanceSlot, value: u128) {
        match slot {
            BalanceSlot::Available => self.available = Some(value),
            BalanceSlot::Staked => self.staked = Some(value),
            BalanceSlot::Earned => self.earned = Some(value),
        }
    }

    pub fn available_or_zero(&self) -> u128 {
        self.available.unwrap_or(0)
    }

    pub fn staked_or_zero(&self) -> u128 {
        self.staked.unwrap_or(0)
    }

    pub fn earned_or_zero(&self) -> u128 {
        self.earned.unwrap_or(0)
    }
}

pub struct BalanceCache {
    reader: Arc<dyn LedgerReader>,
    owner: Address,
    staking_contract: Address,
    values: RwLock<BalanceSet>,
}

impl BalanceCache {
    pub fn new(reader: Arc<dyn LedgerReader>, owner: Address, staking_contract: Address) -> Self {
        Self {
            reader,
            owner,
            staking_contract,
            values: RwLock::new(BalanceSet::default()),
        }
    }

    pub async fn snapshot(&self) -> BalanceSet {
        *self.values.read().await
    }

    pub async fn get(&self, slot: BalanceSlot) -> Option<u128> {
        self.values.read().await.get(slot)
    }

    async fn fetch(&self, slot: BalanceSlot) -> anyhow::Result<u128> {
        match slot {
            BalanceSlot::Available => self.reader.native_balance(&self.owner).await,
            BalanceSlot::Staked => self.reader.read(&self.view(FN_STAKED_BALANCE)).await,
            BalanceSlot::Earned => self.reader.read(&self.view(FN_EARNED)).await,
        }
    }

    fn view(&self, function: &'static str) -> ContractCall {
        ContractCall::new(self.staking_contract, function).arg(CallArg::Address(self.owner))
    }

    /// Re-fetch one slot. On failure the previous value stays in place and
    /// the error is returned for callers that want to retry.
    pub async fn refresh(&self, slot: BalanceSlot) -> Result<u128> {
        match self.fetch(slot).await {
            Ok(value) => {
                self.values.write().await.set(slot, value);
                tracing::debug!(%slot, value = %value, "balance refreshed");
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(%slot, error = %e, "balance fetch failed, keeping cached value");
                Err(StakingError::ReadFetch(format!(
                    "Failed to fetch {slot} balance: {e}"
                )))
            }
        }
    }

    /// Re-fetch all three slots. Failures are tolerated per slot.
    pub async fn refresh_all(&self) -> BalanceSet {
        futures::future::join_all(BalanceSlot::ALL.map(|slot| self.refresh(slot))).await;
        self.snapshot().await
    }
}

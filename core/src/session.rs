/// Session context created on wallet connect and torn down on disconnect.
/// Owns the connected account and the balance cache bound to it.
use std::sync::Arc;

use crate::address::Address;
use crate::balances::BalanceCache;
use crate::config::ContractConfig;
use crate::error::{Result, StakingError};
use crate::intent::FN_BALANCE_OF;
use crate::ledger::{CallArg, ContractCall, LedgerReader};

/// The connected identity, as supplied by the wallet provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Account {
    pub address: Address,
}

impl Account {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

pub struct Session {
    account: Account,
    contracts: ContractConfig,
    staking_contract: Address,
    reader: Arc<dyn LedgerReader>,
    balances: BalanceCache,
}

impl Session {
    /// Bind a freshly connected account to the configured contracts and
    /// perform the initial balance fetch. Fetch failures leave slots unknown.
    pub async fn connect(
        account: Account,
        contracts: ContractConfig,
        reader: Arc<dyn LedgerReader>,
    ) -> Result<Self> {
        let staking_contract = contracts.require_staking_contract()?;
        let balances = BalanceCache::new(reader.clone(), account.address, staking_contract);
        balances.refresh_all().await;
        tracing::info!(
            address = %account.address,
            network = %contracts.network,
            "session connected"
        );
        Ok(Self {
            account,
            contracts,
            staking_contract,
            reader,
            balances,
        })
    }

    /// End the session, dropping all cached balances.
    pub fn disconnect(self) -> Account {
        tracing::info!(address = %self.account.address, "session disconnected");
        self.account
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn contracts(&self) -> &ContractConfig {
        &self.contracts
    }

    pub fn staking_contract(&self) -> Address {
        self.staking_contract
    }

    pub fn balances(&self) -> &BalanceCache {
        &self.balances
    }

    /// Reward-token holdings of the account, read on demand. `None` when no
    /// reward token is configured.
    pub async fn reward_token_balance(&self) -> Result<Option<u128>> {
        let Some(token) = self.contracts.reward_token else {
            return Ok(None);
        };
        let call =
            ContractCall::new(token, FN_BALANCE_OF).arg(CallArg::Address(self.account.address));
        self.reader.read(&call).await.map(Some).map_err(|e| {
            tracing::warn!(error = %e, "reward token balance fetch failed");
            StakingError::ReadFetch(format!("Failed to fetch reward token balance: {e}"))
        })
    }
}

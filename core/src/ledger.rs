/// Ledger abstraction that decouples the controller from any concrete node
/// transport or wallet. Values crossing these traits are base units.
use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::address::{Address, TxHash};

/// A single argument of a contract call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallArg {
    Address(Address),
    Uint(u128),
}

impl fmt::Display for CallArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallArg::Address(a) => write!(f, "{a}"),
            CallArg::Uint(v) => write!(f, "{v}"),
        }
    }
}

/// Contract address + function name + arguments, with an optional native
/// value transfer attached (payable functions only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub contract: Address,
    pub function: &'static str,
    pub args: Vec<CallArg>,
    pub value: Option<u128>,
}

impl ContractCall {
    pub fn new(contract: Address, function: &'static str) -> Self {
        Self {
            contract,
            function,
            args: Vec::new(),
            value: None,
        }
    }

    pub fn arg(mut self, arg: CallArg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn with_value(mut self, value: u128) -> Self {
        self.value = Some(value);
        self
    }

    /// First `Uint` argument, if any.
    pub fn uint_arg(&self) -> Option<u128> {
        self.args.iter().find_map(|a| match a {
            CallArg::Uint(v) => Some(*v),
            CallArg::Address(_) => None,
        })
    }
}

impl fmt::Display for ContractCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(|a| a.to_string()).collect();
        write!(f, "{}({}) @ {}", self.function, args.join(", "), self.contract)?;
        if let Some(value) = self.value {
            write!(f, " value={value}")?;
        }
        Ok(())
    }
}

/// What the receipt watcher reports for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptStatus {
    Pending,
    Success,
    Error(String),
}

impl ReceiptStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReceiptStatus::Pending)
    }
}

#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Spendable native balance of `owner`.
    async fn native_balance(&self, owner: &Address) -> Result<u128>;

    /// Evaluate a view function and return its numeric result.
    async fn read(&self, call: &ContractCall) -> Result<u128>;
}

#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Sign and submit `call`. Fails without a hash when the wallet declines
    /// to sign or the pre-flight check rejects the call.
    async fn write(&self, call: ContractCall) -> Result<TxHash>;
}

pub trait ReceiptWatcher: Send + Sync {
    /// Status updates for `tx`, ending after the first terminal status.
    fn watch(&self, tx: TxHash) -> BoxStream<'static, ReceiptStatus>;
}

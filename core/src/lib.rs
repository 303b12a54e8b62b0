pub mod address;
pub mod amount;
pub mod balances;
pub mod commands;
pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod intent;
pub mod ledger;
pub mod lifecycle;
pub mod notify;
pub mod sandbox;
pub mod session;

pub use address::{Address, TxHash};
pub use amount::{AmountInput, AmountText, Edit};
pub use balances::{BalanceCache, BalanceSet, BalanceSlot};
pub use commands::Command;
pub use config::{data_dir, ContractConfig, Network};
pub use controller::{StakingController, Submission};
pub use error::StakingError;
pub use intent::{ActionMode, PendingOperation, TransactionIntent, TransactionKind};
pub use ledger::{ContractCall, LedgerReader, LedgerWriter, ReceiptStatus, ReceiptWatcher};
pub use lifecycle::{LifecycleState, LifecycleWatcher};
pub use notify::{Level, Notification, NotificationLog, Notifier};
pub use sandbox::SandboxLedger;
pub use session::{Account, Session};

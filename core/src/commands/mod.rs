/// Command definitions and parsing for the staking REPL and one-shot mode.
mod execute;
mod help;
mod parse;

pub use help::help_text;

use crate::intent::ActionMode;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Show cached balances and reward-token holdings
    Balance,
    /// Show the connected address
    Address,
    /// Switch between staking and unstaking: mode <stake|unstake>
    Mode(ActionMode),
    /// Type into the amount field: amount <decimal>
    Amount(String),
    /// Fill the amount field with the full ceiling
    Max,
    /// Move the slider: slider <0-100>
    Slider(u8),
    /// Submit the current mode with the current amount
    Submit,
    /// Claim accrued rewards
    Claim,
    /// Re-fetch all balances
    Refresh,
    /// Show form state and contract configuration
    Status,
    /// Print help
    Help { command: Option<String> },
    /// Exit the console
    Exit,
}

impl Command {
    /// Whether running this command may dispatch a transaction.
    pub fn dispatches(&self) -> bool {
        matches!(self, Command::Submit | Command::Claim)
    }
}

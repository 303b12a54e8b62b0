use anyhow::{bail, Context, Result};

use super::Command;
use crate::intent::ActionMode;

impl Command {
    /// Parse a command from a raw input string.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            bail!("No command entered. Type 'help' for a list of commands.");
        }

        let mut parts = input.splitn(2, char::is_whitespace);
        let cmd = parts.next().unwrap_or_default().to_lowercase();
        let arg = parts.next().map(str::trim).filter(|s| !s.is_empty());

        match cmd.as_str() {
            "balance" | "bal" => Ok(Command::Balance),

            "address" | "addr" => Ok(Command::Address),

            "mode" => {
                let mode_str = arg.ok_or_else(|| {
                    anyhow::anyhow!("Missing mode. Usage: mode <stake|unstake>")
                })?;
                let mode = mode_str.parse::<ActionMode>().map_err(anyhow::Error::msg)?;
                Ok(Command::Mode(mode))
            }

            // Shortcuts for switching mode
            "stake" => Ok(Command::Mode(ActionMode::Stake)),
            "unstake" => Ok(Command::Mode(ActionMode::Unstake)),

            "amount" | "amt" => {
                let raw = arg.ok_or_else(|| {
                    anyhow::anyhow!("Missing amount. Usage: amount <decimal>")
                })?;
                Ok(Command::Amount(raw.to_string()))
            }

            "max" => Ok(Command::Max),

            "slider" | "pct" => {
                let pct_str = arg.ok_or_else(|| {
                    anyhow::anyhow!("Missing position. Usage: slider <0-100>")
                })?;
                let pct: u8 = pct_str
                    .trim_end_matches('%')
                    .parse()
                    .with_context(|| format!("Invalid slider position '{pct_str}'"))?;
                if pct > 100 {
                    bail!("Slider position must be between 0 and 100.");
                }
                Ok(Command::Slider(pct))
            }

            "submit" | "go" => Ok(Command::Submit),

            "claim" => Ok(Command::Claim),

            "refresh" | "sync" => Ok(Command::Refresh),

            "status" | "info" => Ok(Command::Status),

            "help" | "?" => Ok(Command::Help {
                command: arg.map(|s| s.to_lowercase()),
            }),

            "exit" | "quit" | "q" => Ok(Command::Exit),

            other => bail!("Unknown command: '{other}'. Type 'help' for a list of commands."),
        }
    }
}

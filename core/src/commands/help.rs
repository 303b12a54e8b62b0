#[must_use]
pub fn help_text(command: Option<&str>) -> String {
    match command {
        Some("balance") | Some("bal") => {
            "balance\n  Show available, staked and earned balances.\n  Reward-token holdings are listed when a reward token is configured.\n  Alias: bal".to_string()
        }
        Some("address") | Some("addr") => {
            "address\n  Show the connected address.\n  Alias: addr".to_string()
        }
        Some("mode") | Some("stake") | Some("unstake") => {
            "mode <stake|unstake>\n  Choose what 'submit' does. Switching always resets the amount to 0.\n  Stake is bounded by the available balance, unstake by the staked balance.\n  Shortcuts: stake, unstake".to_string()
        }
        Some("amount") | Some("amt") => {
            "amount <decimal>\n  Type into the amount field (e.g. '1.5').\n  Values above the current maximum are clamped to it.\n  Text that is not a plain decimal is ignored.\n  Alias: amt".to_string()
        }
        Some("max") => "max\n  Set the amount to the full current maximum.".to_string(),
        Some("slider") | Some("pct") => {
            "slider <0-100>\n  Set the amount to a percentage of the current maximum,\n  in steps of 0.01.\n  Example: slider 50\n  Alias: pct".to_string()
        }
        Some("submit") | Some("go") => {
            "submit\n  Send a stake or unstake transaction for the current amount\n  and follow it until it is confirmed or fails.\n  Ignored while another operation is pending.\n  Alias: go".to_string()
        }
        Some("claim") => {
            "claim\n  Claim accrued rewards. Refused when nothing has been earned.".to_string()
        }
        Some("refresh") | Some("sync") => {
            "refresh\n  Re-fetch all balances from the ledger.\n  Alias: sync".to_string()
        }
        Some("status") | Some("info") => {
            "status\n  Show mode, amount, pending operation, last transaction\n  and contract configuration.\n  Alias: info".to_string()
        }
        Some("exit") | Some("quit") | Some("q") => {
            "exit\n  Exit the console.\n  Aliases: quit, q".to_string()
        }
        Some("help") => "help [command]\n  Show help for a command.".to_string(),
        Some(other) => format!("Unknown command: '{other}'. Type 'help' for a list."),
        None => {
            "Available commands:\n\
             \n\
             \x20 balance          Show balances\n\
             \x20 address          Show connected address\n\
             \x20 mode             Switch between stake and unstake\n\
             \x20 amount           Enter an amount\n\
             \x20 max              Use the full maximum\n\
             \x20 slider           Pick a percentage of the maximum\n\
             \x20 submit           Send the stake or unstake transaction\n\
             \x20 claim            Claim rewards\n\
             \x20 refresh          Re-fetch balances\n\
             \x20 status           Show form and contract status\n\
             \x20 help [cmd]       Show help for a command\n\
             \x20 exit             Exit the console\n\
             \n\
             Type 'help <command>' for detailed help on a specific command."
                .to_string()
        }
    }
}

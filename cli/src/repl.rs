use crate::{connect, Cli, Console};
/// REPL shell: Reedline-based interactive staking session.
use anyhow::Result;
use reedline::{DefaultCompleter, DefaultPrompt, DefaultPromptSegment, Reedline, Signal};
use stake_console_core::commands::Command;
use stake_console_core::display;

pub async fn run_repl(cli: &Cli) -> Result<()> {
    println!("Stake Console v{}", env!("CARGO_PKG_VERSION"));

    let console = connect(cli).await?;
    let contracts = console.controller.session().contracts();
    println!(
        "Network: {} (chain id {}), in-process ledger",
        contracts.network,
        contracts.network.chain_id()
    );
    let balances = console.controller.balances().await;
    println!(
        "{}",
        display::format_header(console.controller.account(), &balances)
    );
    println!("Type 'help' for a list of commands.");
    println!();

    let commands: Vec<String> = vec![
        "balance".into(),
        "bal".into(),
        "address".into(),
        "addr".into(),
        "mode".into(),
        "stake".into(),
        "unstake".into(),
        "amount".into(),
        "amt".into(),
        "max".into(),
        "slider".into(),
        "pct".into(),
        "submit".into(),
        "go".into(),
        "claim".into(),
        "refresh".into(),
        "sync".into(),
        "status".into(),
        "info".into(),
        "help".into(),
        "exit".into(),
        "quit".into(),
        "q".into(),
    ];
    let completer = Box::new(DefaultCompleter::new(commands));
    let mut line_editor = Reedline::create().with_completer(completer);

    loop {
        let prompt = build_prompt(&console).await;
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match Command::parse(line) {
                    Ok(Command::Exit) => {
                        println!("Goodbye.");
                        break;
                    }
                    Ok(cmd) => {
                        if let Err(e) = console.run(&cmd).await {
                            eprintln!("Error: {e}");
                        }
                    }
                    Err(e) => {
                        eprintln!("{e}");
                    }
                }
            }
            Ok(Signal::CtrlD) | Ok(Signal::CtrlC) => {
                println!("Goodbye.");
                break;
            }
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        }
    }

    let account = console.controller.disconnect();
    tracing::debug!(address = %account.address, "console closed");
    Ok(())
}

/// `[stake 0x1234...abcd 1.5]`, or the progress label while an operation
/// is still in flight.
async fn build_prompt(console: &Console) -> DefaultPrompt {
    let controller = &console.controller;
    let status = match controller.progress_label().await {
        Some(label) => label.to_string(),
        None => controller.amount().await,
    };
    let prompt_str = format!(
        "[{} {} {status}]",
        controller.mode().await,
        controller.account().address.short()
    );
    DefaultPrompt::new(
        DefaultPromptSegment::Basic(prompt_str),
        DefaultPromptSegment::Empty,
    )
}

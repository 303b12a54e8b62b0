mod repl;

use anyhow::{Context, Result};
use clap::Parser;
use stake_console_core::config::{data_dir, profile_path};
use stake_console_core::display::parse_units;
use stake_console_core::{
    Account, Address, Command, ContractConfig, LifecycleState, Level, Network, NotificationLog,
    SandboxLedger, Session, StakingController,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// First account of a local development chain.
const DEFAULT_ACCOUNT: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

#[derive(Parser)]
#[command(
    name = "stake-console",
    about = "Stake, unstake and claim rewards from a terminal",
    version
)]
pub(crate) struct Cli {
    /// Config profile name (default: "default")
    #[arg(long, default_value = "default")]
    profile: String,

    /// Config directory (default: platform data directory)
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Network: mainnet, sepolia or localhost
    #[arg(long)]
    network: Option<Network>,

    /// Staking contract address (or set STAKING_CONTRACT_ADDRESS)
    #[arg(long)]
    staking_contract: Option<String>,

    /// Reward token address (or set REWARD_TOKEN_ADDRESS)
    #[arg(long)]
    reward_token: Option<String>,

    /// Write the effective network and addresses back to the profile
    #[arg(long)]
    save: bool,

    /// Connected account address
    #[arg(long, default_value = DEFAULT_ACCOUNT)]
    account: String,

    /// Native balance credited to the account at start
    #[arg(long, default_value = "10")]
    fund: String,

    /// Reward earned per confirmed stake or unstake
    #[arg(long, default_value = "0.1")]
    reward_rate: String,

    /// Delay between receipt updates, in milliseconds
    #[arg(long, default_value_t = 500)]
    confirm_delay_ms: u64,

    /// Run a single command and exit
    #[arg(long)]
    cmd: Option<String>,

    /// Output in JSON format (useful with --cmd)
    #[arg(long)]
    json: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config_path(&self) -> Result<PathBuf> {
        let dir = match &self.config_dir {
            Some(dir) => dir.clone(),
            None => data_dir()?,
        };
        profile_path(&dir, &self.profile)
    }

    fn parse_address(flag: &str, value: &str) -> Result<Address> {
        Address::from_hex(value).with_context(|| format!("Invalid {flag} '{value}'"))
    }

    /// Resolve the effective contract config: stored profile, then the
    /// environment, then explicit flags. Warns when a flag overrides a
    /// different value from the lower layers.
    fn resolve_contracts(&self, stored: ContractConfig) -> Result<ContractConfig> {
        let mut config = stored.with_env()?;

        if let Some(network) = self.network {
            if network != config.network {
                eprintln!(
                    "Warning: --network ({network}) overrides configured network ({})",
                    config.network
                );
            }
            config.network = network;
        }
        if let Some(raw) = &self.staking_contract {
            let addr = Self::parse_address("--staking-contract", raw)?;
            if let Some(prev) = config.staking_contract.filter(|prev| *prev != addr) {
                eprintln!("Warning: --staking-contract overrides configured {prev}");
            }
            config.staking_contract = Some(addr);
        }
        if let Some(raw) = &self.reward_token {
            let addr = Self::parse_address("--reward-token", raw)?;
            if let Some(prev) = config.reward_token.filter(|prev| *prev != addr) {
                eprintln!("Warning: --reward-token overrides configured {prev}");
            }
            config.reward_token = Some(addr);
        }
        Ok(config)
    }
}

/// Everything a front-end needs once the account is connected.
pub(crate) struct Console {
    pub controller: StakingController,
    pub notifications: Arc<NotificationLog>,
    pub json: bool,
}

impl Console {
    /// Print and clear queued notifications. Returns whether any was an error.
    pub fn flush_notifications(&self) -> bool {
        let mut failed = false;
        for note in self.notifications.drain() {
            failed |= note.level == Level::Error;
            if self.json {
                match serde_json::to_string(&note) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::warn!(error = %e, "failed to encode notification"),
                }
            } else {
                println!("{note}");
            }
        }
        failed
    }

    /// Run one command, then follow the receipt of anything it dispatched.
    /// Returns whether the command ended in an error notification.
    pub async fn run(&self, command: &Command) -> Result<bool> {
        let output = command.execute(&self.controller, self.json).await?;
        if !output.is_empty() {
            println!("{output}");
        }
        let mut failed = self.flush_notifications();

        if command.dispatches() {
            if let LifecycleState::Submitted(tx) = self.controller.lifecycle().await {
                if !self.json {
                    if let Some(label) = self.controller.progress_label().await {
                        println!("{label}");
                    }
                }
                // Failure has already been notified
                if let Err(e) = self.controller.follow(tx).await {
                    tracing::debug!(error = %e, %tx, "transaction did not confirm");
                }
                failed |= self.flush_notifications();
            }
        }
        Ok(failed)
    }
}

async fn connect(cli: &Cli) -> Result<Console> {
    let config_path = cli.config_path()?;
    let stored = ContractConfig::load(&config_path)?;
    let contracts = cli.resolve_contracts(stored)?;
    if cli.save {
        contracts.save(&config_path)?;
        eprintln!("Saved config to {}", config_path.display());
    }

    let account = Account::new(Cli::parse_address("--account", &cli.account)?);
    let staking_contract = contracts.require_staking_contract()?;
    let fund = parse_units(&cli.fund)
        .map_err(anyhow::Error::msg)
        .context("Invalid --fund")?;
    let reward_rate = parse_units(&cli.reward_rate)
        .map_err(anyhow::Error::msg)
        .context("Invalid --reward-rate")?;

    // No node transport: every collaborator is the in-process sandbox
    let ledger = Arc::new(
        SandboxLedger::new(
            account.address,
            staking_contract,
            contracts.reward_token.unwrap_or(Address::ZERO),
        )
        .with_reward_rate(reward_rate)
        .with_confirmation_delay(Duration::from_millis(cli.confirm_delay_ms)),
    );
    ledger.fund(account.address, fund).await;

    let session = Session::connect(account, contracts, ledger.clone()).await?;
    let notifications = Arc::new(NotificationLog::new());
    let controller =
        StakingController::new(session, ledger.clone(), ledger, notifications.clone());

    Ok(Console {
        controller,
        notifications,
        json: cli.json,
    })
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(cmd_str) = &cli.cmd {
        // One-shot mode
        run_oneshot(&cli, cmd_str).await
    } else {
        // REPL mode
        repl::run_repl(&cli).await
    }
}

async fn run_oneshot(cli: &Cli, cmd_str: &str) -> Result<()> {
    let command = Command::parse(cmd_str)?;
    if command == Command::Exit {
        return Ok(());
    }

    let console = connect(cli).await?;
    let failed = console.run(&command).await?;
    if failed {
        std::process::exit(1);
    }
    Ok(())
}

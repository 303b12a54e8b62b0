use anyhow::Result;

use super::help::help_text;
use super::Command;
use crate::amount::Edit;
use crate::controller::{StakingController, Submission};
use crate::display::{self, NATIVE_SYMBOL};
use crate::lifecycle::LifecycleState;

impl Command {
    /// Execute a command and return the output string.
    ///
    /// Submission and claim failures have already reached the notification
    /// sink by the time they surface here, so they produce no text of their
    /// own (JSON mode reports them in the payload).
    pub async fn execute(&self, controller: &StakingController, json_output: bool) -> Result<String> {
        match self {
            Command::Balance => {
                let balances = controller.balances().await;
                // Reward-token holdings are optional extras; a failed read
                // must not hide the cached balances.
                let reward_tokens = controller.reward_token_balance().await.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "reward token balance unavailable");
                    None
                });
                if json_output {
                    Ok(display::format_balances_json(&balances, reward_tokens))
                } else {
                    Ok(display::format_balances(&balances, reward_tokens))
                }
            }

            Command::Address => {
                let addr = controller.account().address.to_string();
                if json_output {
                    Ok(serde_json::json!({ "address": addr }).to_string())
                } else {
                    Ok(addr)
                }
            }

            Command::Mode(mode) => {
                controller.set_mode(*mode).await;
                let ceiling = controller.ceiling().await;
                if json_output {
                    Ok(serde_json::json!({
                        "mode": mode,
                        "amount": controller.amount().await,
                        "max": display::format_units(ceiling),
                    })
                    .to_string())
                } else {
                    Ok(format!(
                        "Mode: {mode}  (max {})",
                        display::format_balance(ceiling, NATIVE_SYMBOL)
                    ))
                }
            }

            Command::Amount(raw) => {
                let edit = controller.set_amount(raw).await;
                let stored = controller.amount().await;
                if json_output {
                    let outcome = match edit {
                        Edit::Accepted => "accepted",
                        Edit::Clamped => "clamped",
                        Edit::Rejected => "rejected",
                    };
                    return Ok(serde_json::json!({
                        "amount": stored,
                        "edit": outcome,
                    })
                    .to_string());
                }
                Ok(match edit {
                    Edit::Accepted => format!("Amount: {stored}"),
                    Edit::Clamped => format!("Amount: {stored} (clamped to max)"),
                    Edit::Rejected => format!("Amount unchanged: {stored}"),
                })
            }

            Command::Max => {
                controller.set_max().await;
                let stored = controller.amount().await;
                if json_output {
                    Ok(serde_json::json!({ "amount": stored }).to_string())
                } else {
                    Ok(format!("Amount: {stored}"))
                }
            }

            Command::Slider(pct) => {
                controller.set_slider_percent(*pct).await;
                let stored = controller.amount().await;
                if json_output {
                    Ok(serde_json::json!({ "percent": pct, "amount": stored }).to_string())
                } else {
                    Ok(format!("Amount: {stored} ({pct}%)"))
                }
            }

            Command::Submit | Command::Claim => {
                let outcome = if matches!(self, Command::Submit) {
                    controller.submit().await
                } else {
                    controller.claim().await
                };
                Ok(match (outcome, json_output) {
                    (Ok(Submission::Dispatched(tx)), true) => {
                        serde_json::json!({ "status": "submitted", "tx": tx.to_string() })
                            .to_string()
                    }
                    (Ok(Submission::Dispatched(tx)), false) => format!("Transaction sent: {tx}"),
                    (Ok(Submission::Ignored), true) => {
                        serde_json::json!({ "status": "ignored" }).to_string()
                    }
                    (Ok(Submission::Ignored), false) => String::new(),
                    (Err(e), true) => {
                        let status = if e.is_input_validation() { "invalid" } else { "rejected" };
                        serde_json::json!({ "status": status, "error": e.to_string() })
                            .to_string()
                    }
                    (Err(_), false) => String::new(),
                })
            }

            Command::Refresh => {
                let balances = controller.refresh().await;
                if json_output {
                    Ok(display::format_balances_json(&balances, None))
                } else {
                    Ok(display::format_balances(&balances, None))
                }
            }

            Command::Status => {
                let mode = controller.mode().await;
                let amount = controller.amount().await;
                let ceiling = controller.ceiling().await;
                let pending = controller.pending().await;
                let progress = controller.progress_label().await;
                let lifecycle = controller.lifecycle().await;
                let contracts = controller.session().contracts();
                if json_output {
                    return Ok(serde_json::json!({
                        "mode": mode,
                        "amount": amount,
                        "max": display::format_units(ceiling),
                        "pending": pending.map(|p| p.kind),
                        "last_tx": lifecycle.tx().map(|tx| tx.to_string()),
                        "lifecycle": lifecycle_label(&lifecycle),
                        "network": contracts.network,
                        "chain_id": contracts.network.chain_id(),
                        "staking_contract": contracts.staking_contract.map(|a| a.to_string()),
                        "reward_token": contracts.reward_token.map(|a| a.to_string()),
                    })
                    .to_string());
                }
                let last_tx = match lifecycle.tx() {
                    Some(tx) => format!("{tx} ({})", lifecycle_label(&lifecycle)),
                    None => "none".to_string(),
                };
                Ok(format!(
                    "  Mode:     {mode}\n  Amount:   {amount} / {}\n  Pending:  {}\n  Last tx:  {last_tx}\n{}",
                    display::format_balance(ceiling, NATIVE_SYMBOL),
                    progress.unwrap_or("none"),
                    display::format_status(contracts),
                ))
            }

            Command::Help { command } => Ok(help_text(command.as_deref())),

            Command::Exit => Ok(String::new()),
        }
    }
}

fn lifecycle_label(state: &LifecycleState) -> &'static str {
    match state {
        LifecycleState::Idle => "idle",
        LifecycleState::Submitted(_) => "submitted",
        LifecycleState::Confirming(_) => "confirming",
        LifecycleState::Confirmed(_) => "confirmed",
        LifecycleState::Failed(_) => "failed",
    }
}

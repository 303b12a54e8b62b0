/// Output formatting: base-unit conversion and display helpers.
///
/// Ledger values use 18 decimal places. 1 display unit = 10^18 base units.
use crate::balances::BalanceSet;
use crate::config::ContractConfig;
use crate::session::Account;

pub const DECIMALS: usize = 18;
pub const BASE_PER_UNIT: u128 = 1_000_000_000_000_000_000;

pub const NATIVE_SYMBOL: &str = "ETH";
pub const REWARD_SYMBOL: &str = "KRK";

/// Canonical decimal form of a base-unit value: every significant fractional
/// digit and at least one.
/// Examples: 2_500_000_000_000_000_000 -> "2.5", 10^18 -> "1.0", 0 -> "0.0"
#[must_use]
pub fn format_units(value: u128) -> String {
    let whole = value / BASE_PER_UNIT;
    let frac = value % BASE_PER_UNIT;
    let digits = format!("{frac:018}");
    let trimmed = digits.trim_end_matches('0');
    if trimmed.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{trimmed}")
    }
}

/// Fixed-point rendering rounded half-up to `places` decimals (max 18).
/// Example: format_fixed(2_123_456_000_000_000_000, 4) -> "2.1235"
#[must_use]
pub fn format_fixed(value: u128, places: usize) -> String {
    let places = places.min(DECIMALS);
    let step = 10u128.pow((DECIMALS - places) as u32);
    let rounded = value.saturating_add(step / 2) / step;
    if places == 0 {
        return rounded.to_string();
    }
    let scale = 10u128.pow(places as u32);
    let whole = rounded / scale;
    let frac = rounded % scale;
    format!("{whole}.{frac:0width$}", width = places)
}

/// Format a balance with its symbol for display.
#[must_use]
pub fn format_balance(value: u128, symbol: &str) -> String {
    format!("{} {symbol}", format_units(value))
}

/// Parse a human-readable decimal amount into base units.
/// Accepts: "1.5" -> 1.5 * 10^18, "1" -> 10^18, ".5" -> 0.5 * 10^18, "1." -> 10^18
#[must_use = "parsing result should be checked"]
pub fn parse_units(input: &str) -> Result<u128, String> {
    let input = input.trim();

    if input.is_empty() {
        return Err("Amount cannot be empty".to_string());
    }

    if input.starts_with('-') {
        return Err("Amount must be positive".to_string());
    }

    let (whole_str, frac_str) = match input.split_once('.') {
        Some((w, f)) => (w, f),
        None => (input, ""),
    };
    if frac_str.contains('.') {
        return Err("Invalid amount format. Use decimal units like '1.5' or '0.001'.".to_string());
    }
    if whole_str.is_empty() && frac_str.is_empty() {
        return Err(format!("Invalid amount '{input}'"));
    }
    if !whole_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("Invalid whole part: '{whole_str}'"));
    }
    if !frac_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("Invalid fractional part: '{frac_str}'"));
    }
    if frac_str.len() > DECIMALS {
        return Err(format!("Too many decimal places. Up to {DECIMALS} are supported."));
    }

    let whole: u128 = if whole_str.is_empty() {
        0
    } else {
        whole_str
            .parse()
            .map_err(|_| "Amount too large".to_string())?
    };
    let frac: u128 = if frac_str.is_empty() {
        0
    } else {
        // Pad to 18 digits
        format!("{frac_str:0<width$}", width = DECIMALS)
            .parse()
            .map_err(|_| format!("Invalid fractional part: '{frac_str}'"))?
    };

    whole
        .checked_mul(BASE_PER_UNIT)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(|| "Amount too large".to_string())
}

/// Format the three cached balances for display. Unfetched slots show zero.
/// Reward-token holdings are appended when known.
#[must_use]
pub fn format_balances(balances: &BalanceSet, reward_tokens: Option<u128>) -> String {
    let mut out = format!(
        "  Available: {}\n  Staked:    {}\n  Earned:    {}",
        format_balance(balances.available_or_zero(), NATIVE_SYMBOL),
        format_balance(balances.staked_or_zero(), NATIVE_SYMBOL),
        format_balance(balances.earned_or_zero(), REWARD_SYMBOL),
    );
    if let Some(tokens) = reward_tokens {
        out.push_str(&format!(
            "\n  Rewards:   {}",
            format_balance(tokens, REWARD_SYMBOL)
        ));
    }
    out
}

/// Format the cached balances as JSON, keeping unfetched slots as `null`.
#[must_use]
pub fn format_balances_json(balances: &BalanceSet, reward_tokens: Option<u128>) -> String {
    let slot = |v: Option<u128>| match v {
        Some(v) => serde_json::json!({
            "base_units": v.to_string(),
            "display": format_units(v),
        }),
        None => serde_json::Value::Null,
    };
    serde_json::json!({
        "available": slot(balances.available),
        "staked": slot(balances.staked),
        "earned": slot(balances.earned),
        "reward_tokens": slot(reward_tokens),
    })
    .to_string()
}

/// One-line account header: abbreviated address and native balance.
#[must_use]
pub fn format_header(account: &Account, balances: &BalanceSet) -> String {
    format!(
        "ADDR: {}  BAL: {} {NATIVE_SYMBOL}",
        account.address.short(),
        format_fixed(balances.available_or_zero(), 4),
    )
}

/// Format contract configuration for display.
#[must_use]
pub fn format_status(config: &ContractConfig) -> String {
    let show = |a: Option<crate::Address>| {
        a.map(|a| a.to_string())
            .unwrap_or_else(|| "(not configured)".to_string())
    };
    format!(
        "  Network:  {} (chain id {})\n  Staking:  {}\n  Reward:   {}",
        config.network,
        config.network.chain_id(),
        show(config.staking_contract),
        show(config.reward_token),
    )
}

//! Constants, units and fee values for the Ijarah SDK

use eyre::{ensure, eyre, Result};

/// ALGO has 6 decimals (1 ALGO = 1,000,000 µAlgo)
pub const ALGO_DECIMALS: u8 = 6;

/// µAlgo per ALGO
pub const MICROALGOS_PER_ALGO: u64 = 1_000_000;

/// Minimum lease deposit enforced by the contract (1 ALGO)
pub const MIN_LEASE_DEPOSIT: u64 = 1_000_000;

/// Network minimum fee per transaction
pub const MIN_TXN_FEE: u64 = 1_000;

/// Flat fee for state-changing app calls; covers the inner payment and box resizing
pub const STATE_CHANGING_FEE: u64 = 2_000;

/// Rounds to wait for confirmation before reporting a timeout
pub const DEFAULT_CONFIRMATION_ROUNDS: u64 = 4;

/// Validity window for assembled transactions
pub const VALIDITY_WINDOW: u64 = 1_000;

/// Annual ujrah rate in basis points (3%)
pub const ANNUAL_UJRAH_RATE_BP: u64 = 300;

/// 365.25 days
pub const SECONDS_PER_YEAR: u64 = 31_557_600;

pub const BASIS_POINTS_DIVISOR: u64 = 10_000;

/// Prefix of the per-lessor box key; followed by the 32-byte public key
pub const BOX_PREFIX: &[u8] = b"ijarah_";

/// principal (8) + rental start (8) + last claim (8)
pub const BOX_VALUE_SIZE: u64 = 24;

/// Flat part of the box minimum balance requirement
pub const BOX_FLAT_MBR: u64 = 2_500;

/// Per-byte part of the box minimum balance requirement
pub const BOX_BYTE_MBR: u64 = 400;

/// Deployed Tawf Sharia application id (TestNet)
pub const DEFAULT_APP_ID: u64 = 749_014_050;

/// Minimum balance the lessor's box locks in the application account
pub fn box_min_balance() -> u64 {
    let name_len = (BOX_PREFIX.len() + 32) as u64;
    BOX_FLAT_MBR + BOX_BYTE_MBR * (name_len + BOX_VALUE_SIZE)
}

/// Ujrah accrued on `principal` over `elapsed_secs`, as the contract computes it
pub fn estimate_ujrah(principal: u64, elapsed_secs: u64, annual_rate_bp: u64) -> u64 {
    let numerator = principal as u128 * elapsed_secs as u128 * annual_rate_bp as u128;
    let denominator = SECONDS_PER_YEAR as u128 * BASIS_POINTS_DIVISOR as u128;
    (numerator / denominator).min(u64::MAX as u128) as u64
}

/// Ujrah estimate for a lease held `days` days at the default rate
pub fn estimate_for_days(principal: u64, days: u64) -> u64 {
    estimate_ujrah(principal, days.saturating_mul(86_400), ANNUAL_UJRAH_RATE_BP)
}

/// Format µAlgo as an exact decimal ALGO string, e.g. `2000000` -> `"2.0"`
pub fn format_algo(micro_algos: u64) -> String {
    let whole = micro_algos / MICROALGOS_PER_ALGO;
    let frac = micro_algos % MICROALGOS_PER_ALGO;
    if frac == 0 {
        return format!("{}.0", whole);
    }
    let digits = format!("{:0width$}", frac, width = ALGO_DECIMALS as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Parse a decimal ALGO string into µAlgo without going through floating point
pub fn parse_algo(input: &str) -> Result<u64> {
    let input = input.trim();
    ensure!(!input.is_empty(), "Empty amount");

    let (whole, frac) = match input.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (input, ""),
    };
    ensure!(
        frac.len() <= ALGO_DECIMALS as usize,
        "At most {} decimal places allowed",
        ALGO_DECIMALS
    );
    ensure!(
        whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()),
        "Invalid amount: {}",
        input
    );

    let whole: u64 = if whole.is_empty() { 0 } else { whole.parse()? };
    let frac_scaled: u64 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = ALGO_DECIMALS as usize);
        padded.parse()?
    };

    whole
        .checked_mul(MICROALGOS_PER_ALGO)
        .and_then(|w| w.checked_add(frac_scaled))
        .ok_or_else(|| eyre!("Amount out of range: {}", input))
}

/// Unscale µAlgo to floating point ALGO, for display only
pub fn micro_to_algo(micro_algos: u64) -> f64 {
    micro_algos as f64 / MICROALGOS_PER_ALGO as f64
}

/// Format a rate in basis points as a percentage, e.g. `300` -> `"3.00%"`
pub fn format_rate(rate_bp: u64) -> String {
    format!("{:.2}%", rate_bp as f64 / 100.0)
}

/// Format a duration in seconds, e.g. `"2d 3h 4m"`
pub fn format_duration(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

//! Monetary helpers for tenge amounts
//!
//! All amounts in the ledger are plain `rust_decimal::Decimal` values in a
//! single currency (KZT). Rounding to two decimal places happens at the
//! point of computation so that stored breakdowns always agree with their
//! sums, never only at display time.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a monetary amount to 2 decimal places, half away from zero.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Formats an amount the way operators expect to read tenge values:
/// thousands grouped by spaces, two decimal places, `тг` suffix.
///
/// ```
/// use rust_decimal_macros::dec;
/// assert_eq!(ledger_kernel::format_tenge(dec!(2650)), "2 650.00 тг");
/// ```
pub fn format_tenge(amount: Decimal) -> String {
    let rounded = round2(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = rounded.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i.to_string(), format!("{:0<2}", f)),
        None => (text, "00".to_string()),
    };

    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(*digit);
    }

    let sign = if negative { "-" } else { "" };
    format!("{}{}.{} тг", sign, grouped, frac_part)
}

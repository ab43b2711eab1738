//! Money Parsing & Fee Math
//!
//! All amounts cross module boundaries as whole cents (`i64`). Decimal
//! arithmetic is confined to this module.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::FeeSchedule;
use crate::error::DraftError;

/// Parse a locale-tolerant money string into whole cents, clamped to
/// `[0, ceiling_cents]`.
///
/// Accepts thousands separators and either `.` or `,` as the decimal
/// separator; strips currency symbols. Rejects empty, non-numeric,
/// negative and zero input.
pub fn parse_amount_cents(raw: &str, ceiling_cents: i64) -> Result<i64, DraftError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DraftError::AmountMissing);
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if cleaned.is_empty() || !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return Err(DraftError::AmountInvalid);
    }
    if cleaned.contains('-') {
        return Err(DraftError::AmountNotPositive);
    }

    let normalized = normalize_separators(&cleaned);
    let value: Decimal = normalized.parse().map_err(|_| DraftError::AmountInvalid)?;
    if value <= Decimal::ZERO {
        return Err(DraftError::AmountNotPositive);
    }

    let cents = (value * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(DraftError::AmountInvalid)?;

    Ok(cents.min(ceiling_cents))
}

/// Collapse grouping separators and normalize the decimal separator to `.`.
///
/// When both `.` and `,` appear, the rightmost one is the decimal
/// separator. A single separator followed by exactly three digits is a
/// grouping separator ("1,234" is one thousand, not 1.234).
fn normalize_separators(s: &str) -> String {
    let last_dot = s.rfind('.');
    let last_comma = s.rfind(',');

    match (last_dot, last_comma) {
        (Some(d), Some(c)) => {
            let (dec_sep, group_sep) = if d > c { ('.', ',') } else { (',', '.') };
            s.chars()
                .filter(|&ch| ch != group_sep)
                .map(|ch| if ch == dec_sep { '.' } else { ch })
                .collect()
        }
        (Some(_), None) | (None, Some(_)) => {
            let sep = if last_dot.is_some() { '.' } else { ',' };
            let occurrences = s.matches(sep).count();
            let digits_after = s.len() - 1 - s.rfind(sep).unwrap_or(0);
            if occurrences > 1 || digits_after == 3 {
                s.chars().filter(|&ch| ch != sep).collect()
            } else {
                s.replace(',', ".")
            }
        }
        (None, None) => s.to_string(),
    }
}

/// Render whole cents as a display string with two decimals: `2550 -> "25.50"`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Smallest addition that lifts `base_cents` to the next whole unit of
/// `denomination_cents`. Zero when already aligned or when either input
/// is non-positive.
pub fn round_up_cents(base_cents: i64, denomination_cents: i64) -> i64 {
    if base_cents <= 0 || denomination_cents <= 0 {
        return 0;
    }
    (denomination_cents - base_cents % denomination_cents) % denomination_cents
}

/// Fee-cover amounts for a given net donation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeBreakdown {
    /// Algebraic gross-up: authoritative for billing.
    pub exact_cents: i64,
    /// Naive `net * pct + fixed` figure. Under-covers; display only.
    pub approximate_cents: i64,
}

/// Compute the fee cover needed so that, after the processor deducts
/// `pct * gross + fixed`, the net received equals `net_cents`.
///
/// `gross = ceil((net + fixed) / (1 - pct))`
pub fn fee_cover_cents(net_cents: i64, schedule: &FeeSchedule) -> FeeBreakdown {
    if net_cents <= 0 {
        return FeeBreakdown {
            exact_cents: 0,
            approximate_cents: 0,
        };
    }

    let net = Decimal::from(net_cents);
    let fixed = Decimal::from(schedule.fixed_cents);
    let gross = ((net + fixed) / (Decimal::ONE - schedule.percent)).ceil();
    let exact = (gross - net).to_i64().unwrap_or(0).max(0);

    let approximate = ((net * schedule.percent).ceil() + fixed)
        .to_i64()
        .unwrap_or(0)
        .max(0);

    FeeBreakdown {
        exact_cents: exact,
        approximate_cents: approximate,
    }
}

/// Syntactic email check. Deliberately shallow: deliverability is the
/// server's problem, this only gates obviously broken input.
pub fn is_valid_email(raw: &str) -> bool {
    let s = raw.trim();
    if s.is_empty() || s.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = s.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const CEILING: i64 = 100_000_00;

    fn schedule() -> FeeSchedule {
        FeeSchedule {
            percent: dec!(0.029),
            fixed_cents: 30,
        }
    }

    #[test]
    fn test_parse_plain_amounts() {
        assert_eq!(parse_amount_cents("25", CEILING).unwrap(), 2500);
        assert_eq!(parse_amount_cents("25.50", CEILING).unwrap(), 2550);
        assert_eq!(parse_amount_cents("  $25.50 ", CEILING).unwrap(), 2550);
        assert_eq!(parse_amount_cents("2.5", CEILING).unwrap(), 250);
    }

    #[test]
    fn test_parse_grouping_separators() {
        assert_eq!(parse_amount_cents("1,000", CEILING).unwrap(), 100_000);
        assert_eq!(parse_amount_cents("1,234.56", CEILING).unwrap(), 123_456);
        assert_eq!(parse_amount_cents("1.234,56", CEILING).unwrap(), 123_456);
        assert_eq!(parse_amount_cents("12,5", CEILING).unwrap(), 1250);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(parse_amount_cents("", CEILING), Err(DraftError::AmountMissing));
        assert_eq!(parse_amount_cents("abc", CEILING), Err(DraftError::AmountInvalid));
        assert_eq!(
            parse_amount_cents("-5", CEILING),
            Err(DraftError::AmountNotPositive)
        );
        assert_eq!(
            parse_amount_cents("0", CEILING),
            Err(DraftError::AmountNotPositive)
        );
        assert_eq!(
            parse_amount_cents("0.00", CEILING),
            Err(DraftError::AmountNotPositive)
        );
    }

    #[test]
    fn test_parse_clamps_to_ceiling() {
        assert_eq!(parse_amount_cents("999999999", 50_000_00).unwrap(), 50_000_00);
    }

    #[test]
    fn test_display_round_trip() {
        for cents in [1, 99, 100, 2550, 10_000, 123_456, CEILING] {
            let display = format_cents(cents);
            assert_eq!(parse_amount_cents(&display, CEILING).unwrap(), cents);
        }
    }

    #[test]
    fn test_round_up() {
        assert_eq!(round_up_cents(2550, 100), 50);
        assert_eq!(round_up_cents(2500, 100), 0);
        assert_eq!(round_up_cents(1, 500), 499);
        assert_eq!(round_up_cents(0, 100), 0);
        assert_eq!(round_up_cents(2550, 0), 0);
    }

    #[test]
    fn test_fee_cover_exact_actually_covers() {
        let schedule = schedule();
        for net in [100, 500, 2500, 9999, 100_000] {
            let breakdown = fee_cover_cents(net, &schedule);
            let gross = Decimal::from(net + breakdown.exact_cents);
            let deducted = gross * schedule.percent + Decimal::from(schedule.fixed_cents);
            assert!(
                gross - deducted >= Decimal::from(net),
                "net {net}: gross {gross} does not cover the fee"
            );
        }
    }

    #[test]
    fn test_fee_cover_naive_under_covers() {
        let schedule = schedule();
        let breakdown = fee_cover_cents(2500, &schedule);
        // ceil(2530 / 0.971) - 2500 = 106, vs ceil(72.5) + 30 = 103
        assert_eq!(breakdown.exact_cents, 106);
        assert_eq!(breakdown.approximate_cents, 103);
        assert!(breakdown.approximate_cents < breakdown.exact_cents);
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("donor@example.com"));
        assert!(is_valid_email(" donor@sub.example.org "));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("donor"));
        assert!(!is_valid_email("donor@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("donor@example"));
        assert!(!is_valid_email("do nor@example.com"));
        assert!(!is_valid_email("a@b@c.com"));
    }
}

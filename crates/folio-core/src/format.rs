//! Display formatting shared by reports, the renderer and the CLI.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

/// US-dollar amount with thousands separators and two decimals, e.g.
/// `$1,234.50`. Half-cents round away from zero.
pub fn format_currency(amount: Decimal) -> String {
  let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
  let digits = format!("{:.2}", rounded.abs());
  let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

  let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
  for (i, ch) in int_part.chars().enumerate() {
    if i > 0 && (int_part.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(ch);
  }

  let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
  format!("{sign}${grouped}.{frac_part}")
}

/// Long-form date, e.g. `March 5, 2024`.
pub fn format_date(date: NaiveDate) -> String { date.format("%B %-d, %Y").to_string() }

/// A quantity without trailing zeros: `2`, `1.5`.
pub fn format_quantity(quantity: Decimal) -> String { quantity.normalize().to_string() }

/// A percentage rate, e.g. `8.25%`.
pub fn format_rate(rate: Decimal) -> String { format!("{}%", rate.normalize()) }

#[cfg(test)]
mod tests {
  use rust_decimal_macros::dec;

  use super::*;

  #[test]
  fn currency() {
    assert_eq!(format_currency(dec!(0)), "$0.00");
    assert_eq!(format_currency(dec!(5)), "$5.00");
    assert_eq!(format_currency(dec!(999.999)), "$1,000.00");
    assert_eq!(format_currency(dec!(1234.5)), "$1,234.50");
    assert_eq!(format_currency(dec!(1234567.891)), "$1,234,567.89");
    assert_eq!(format_currency(dec!(0.005)), "$0.01");
    assert_eq!(format_currency(dec!(-42.1)), "-$42.10");
  }

  #[test]
  fn dates() {
    let d = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
    assert_eq!(format_date(d), "March 5, 2024");
    let d = NaiveDate::from_ymd_opt(2023, 12, 25).unwrap();
    assert_eq!(format_date(d), "December 25, 2023");
  }

  #[test]
  fn quantities_and_rates() {
    assert_eq!(format_quantity(dec!(2.00)), "2");
    assert_eq!(format_quantity(dec!(1.50)), "1.5");
    assert_eq!(format_rate(dec!(10.0)), "10%");
    assert_eq!(format_rate(dec!(8.25)), "8.25%");
  }
}

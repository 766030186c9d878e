// server/src/services/order_numbers.rs

//! Human-readable order numbers: `MRY` followed by the low eight digits of
//! the issuing millisecond.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

pub const ORDER_NUMBER_PREFIX: &str = "MRY";

const DIGITS: usize = 8;
const MODULUS: u64 = 100_000_000;

/// Issues order numbers from a millisecond clock that never repeats within
/// the process. Two requests in the same millisecond get consecutive values.
#[derive(Debug, Default)]
pub struct OrderNumberGenerator {
  last_issued_ms: AtomicU64,
}

impl OrderNumberGenerator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn next(&self) -> String {
    let now_ms = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    self.next_at(now_ms)
  }

  /// Issues the number for clock reading `now_ms`, or for the value after the
  /// last issued one when the clock has not moved past it.
  pub fn next_at(&self, now_ms: u64) -> String {
    let previous = self
      .last_issued_ms
      .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| Some(now_ms.max(last + 1)))
      .unwrap_or_else(|last| last);
    format_order_number(now_ms.max(previous + 1))
  }
}

pub fn format_order_number(ms: u64) -> String {
  format!("{}{:0width$}", ORDER_NUMBER_PREFIX, ms % MODULUS, width = DIGITS)
}

/// Finds the first order-number-shaped token (`MRY` plus digits, any case) in `text`.
pub fn find_order_number(text: &str) -> Option<String> {
  let upper = text.to_ascii_uppercase();
  let mut from = 0;
  while let Some(pos) = upper[from..].find(ORDER_NUMBER_PREFIX) {
    let start = from + pos;
    let digits_start = start + ORDER_NUMBER_PREFIX.len();
    let digit_count = upper[digits_start..].bytes().take_while(u8::is_ascii_digit).count();
    if digit_count > 0 {
      return Some(upper[start..digits_start + digit_count].to_string());
    }
    from = digits_start;
  }
  None
}

//! Time source used by identity expiry checks.

use chrono::{DateTime, Utc};
#[cfg(test)]
use chrono::TimeDelta;

/// Wall-clock time; tests pin it to a fixed instant.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
  #[default]
  System,
  #[cfg(test)]
  Fixed(DateTime<Utc>),
}

impl Clock {
  pub fn now(&self) -> DateTime<Utc> {
    match self {
      Clock::System => Utc::now(),
      #[cfg(test)]
      Clock::Fixed(t) => *t,
    }
  }

  #[cfg(test)]
  pub fn advance(&mut self, delta: TimeDelta) {
    if let Clock::Fixed(t) = self {
      *t += delta;
    }
  }
}

/// 2023-11-14T22:13:20Z
#[cfg(test)]
pub fn fixed_now() -> DateTime<Utc> {
  DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("fixed timestamp should be valid")
}

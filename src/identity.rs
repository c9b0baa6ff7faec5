//! Identity store: the `username` cookie with a time-to-live.
//!
//! Expiration is lazy. Nothing sweeps the jar; every `get_identity` call
//! compares the stored expiry against the clock.

use chrono::TimeDelta;
use tracing::{debug, info, instrument};

use crate::clock::Clock;
use crate::cookies::{CookieJar, StoredCookie};
use crate::storage::StorageError;

pub const USERNAME_COOKIE: &str = "username";

#[derive(Clone)]
pub struct IdentityStore {
  jar: CookieJar,
  clock: Clock,
}

impl IdentityStore {
  pub fn new(jar: CookieJar, clock: Clock) -> Self {
    Self { jar, clock }
  }

  /// Current username, if a live, non-empty identity cookie exists.
  #[instrument(level = "debug", skip(self))]
  pub fn get_identity(&self) -> Result<Option<String>, StorageError> {
    let now = self.clock.now();
    let identity = self
      .jar
      .get(USERNAME_COOKIE)?
      .filter(|c| c.is_live_at(now))
      .map(|c| c.value)
      .filter(|v| !v.is_empty());
    debug!(target: "trivia_quiz", present = identity.is_some(), "Identity lookup");
    Ok(identity)
  }

  /// Persist `username` until `now + ttl_days`. Overwrites any existing identity.
  /// A TTL that overflows the calendar is rejected before anything is written.
  #[instrument(level = "info", skip(self))]
  pub fn set_identity(&self, username: &str, ttl_days: i64) -> Result<(), StorageError> {
    let expires = TimeDelta::try_days(ttl_days)
      .and_then(|ttl| self.clock.now().checked_add_signed(ttl))
      .ok_or(StorageError::ExpiryOutOfRange(ttl_days))?;
    self.jar.set(&StoredCookie {
      name: USERNAME_COOKIE.to_string(),
      value: username.to_string(),
      expires,
      path: "/".to_string(),
    })?;
    info!(target: "trivia_quiz", %username, %expires, "Identity stored");
    Ok(())
  }

  /// Overwrite the identity with an empty, already-expired cookie.
  #[instrument(level = "info", skip(self))]
  pub fn clear_identity(&self) -> Result<(), StorageError> {
    self.set_identity("", -1)
  }
}

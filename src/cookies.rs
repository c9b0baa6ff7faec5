//! Browser-style cookie jar on top of a key-value store.
//!
//! Each cookie is kept as the `Set-Cookie` style line a page would assign to
//! `document.cookie`: `name=value; Path=/; Expires=<RFC 1123 date>`, with
//! the name and value percent-encoded. Expired cookies are kept; readers
//! decide whether a cookie is live.

use std::sync::Arc;

use axum_extra::extract::cookie::Cookie;
use chrono::{DateTime, Utc};
use time::OffsetDateTime;
use tracing::{instrument, warn};

use crate::storage::{KeyValueStore, StorageError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredCookie {
  pub name: String,
  pub value: String,
  pub expires: DateTime<Utc>,
  pub path: String,
}

impl StoredCookie {
  pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
    self.expires > now
  }

  /// Encode as a cookie line. Expiry is kept to whole seconds.
  pub fn to_line(&self) -> Result<String, StorageError> {
    let expires = OffsetDateTime::from_unix_timestamp(self.expires.timestamp())
      .map_err(|e| StorageError::Serialization(format!("cookie expiry {}: {e}", self.expires)))?;
    let cookie = Cookie::build((self.name.clone(), self.value.clone()))
      .path(self.path.clone())
      .expires(expires)
      .build();
    Ok(cookie.encoded().to_string())
  }

  /// Parse a cookie line. Returns `None` for anything without a name and a
  /// valid expiry date.
  pub fn parse_line(line: &str) -> Option<Self> {
    let cookie = Cookie::parse_encoded(line).ok()?;
    let expires = cookie.expires_datetime()?;
    Some(Self {
      name: cookie.name().to_string(),
      value: cookie.value().to_string(),
      expires: DateTime::<Utc>::from_timestamp(expires.unix_timestamp(), 0)?,
      path: cookie.path().unwrap_or("/").to_string(),
    })
  }
}

#[derive(Clone)]
pub struct CookieJar {
  store: Arc<dyn KeyValueStore>,
}

impl CookieJar {
  pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
    Self { store }
  }

  /// Store (or overwrite) a cookie.
  #[instrument(level = "debug", skip(self, cookie), fields(name = %cookie.name))]
  pub fn set(&self, cookie: &StoredCookie) -> Result<(), StorageError> {
    self.store.set_item(&cookie.name, &cookie.to_line()?)
  }

  /// Read a cookie regardless of expiry. Unparsable entries read as absent.
  #[instrument(level = "debug", skip(self))]
  pub fn get(&self, name: &str) -> Result<Option<StoredCookie>, StorageError> {
    let Some(line) = self.store.get_item(name)? else {
      return Ok(None);
    };
    match StoredCookie::parse_line(&line) {
      Some(cookie) if cookie.name == name => Ok(Some(cookie)),
      _ => {
        warn!(target: "trivia_quiz", %name, "Malformed cookie in jar; treating as absent");
        Ok(None)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::clock::fixed_now;
  use crate::storage::MemoryStore;

  fn username_cookie(value: &str) -> StoredCookie {
    StoredCookie {
      name: "username".into(),
      value: value.into(),
      expires: fixed_now(),
      path: "/".into(),
    }
  }

  #[test]
  fn formats_line_like_set_cookie() {
    let cookie = username_cookie("alice");
    let line = cookie.to_line().unwrap();
    assert_eq!(line, "username=alice; Path=/; Expires=Tue, 14 Nov 2023 22:13:20 GMT");
    assert_eq!(StoredCookie::parse_line(&line), Some(cookie));
  }

  #[test]
  fn escapes_separator_characters_in_values() {
    let cookie = username_cookie("a;b,c%d\ne");
    let line = cookie.to_line().unwrap();
    let (pair, _) = line.split_once("; ").unwrap();
    assert!(pair.starts_with("username=a%3Bb"));
    assert!(!pair.contains(';') && !pair.contains('\n'));
    assert!(pair.contains("%25d%0Ae"));
    assert_eq!(StoredCookie::parse_line(&line).unwrap().value, "a;b,c%d\ne");
  }

  #[test]
  fn empty_value_round_trips() {
    let cookie = username_cookie("");
    assert_eq!(StoredCookie::parse_line(&cookie.to_line().unwrap()), Some(cookie));
  }

  #[test]
  fn reads_lowercase_attribute_lines() {
    let parsed = StoredCookie::parse_line("username=bob; expires=Tue, 14 Nov 2023 22:13:20 GMT; path=/").unwrap();
    assert_eq!(parsed, username_cookie("bob"));
  }

  #[test]
  fn rejects_lines_without_expiry_or_name() {
    assert_eq!(StoredCookie::parse_line("username=alice; path=/"), None);
    assert_eq!(StoredCookie::parse_line("=alice; expires=Tue, 14 Nov 2023 22:13:20 GMT"), None);
    assert_eq!(StoredCookie::parse_line("username=alice; expires=tomorrow"), None);
    assert_eq!(StoredCookie::parse_line("garbage"), None);
  }

  #[test]
  fn jar_reads_back_lines_and_hides_garbage() {
    let store = Arc::new(MemoryStore::new());
    let jar = CookieJar::new(store.clone());

    jar.set(&username_cookie("bob")).unwrap();
    assert_eq!(jar.get("username").unwrap().unwrap().value, "bob");
    assert_eq!(jar.get("theme").unwrap(), None);

    store.set_item("username", "username=bob; expires=not-a-date").unwrap();
    assert_eq!(jar.get("username").unwrap(), None);
  }
}

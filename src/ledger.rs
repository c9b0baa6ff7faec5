//! Score ledger: append-only history of `(username, score)` records.
//!
//! Stored under the `scores` key as a JSON array and rewritten whole on
//! every append. Readers never fail: absent, unreadable or malformed data
//! reads as an empty ledger.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::domain::ScoreRecord;
use crate::storage::{KeyValueStore, StorageError};

pub const SCORES_KEY: &str = "scores";

#[derive(Clone)]
pub struct ScoreLedger {
  store: Arc<dyn KeyValueStore>,
}

impl ScoreLedger {
  pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
    Self { store }
  }

  /// All records in insertion order.
  #[instrument(level = "debug", skip(self))]
  pub fn list_all(&self) -> Vec<ScoreRecord> {
    match self.store.get_item(SCORES_KEY) {
      Ok(Some(raw)) => decode_records(&raw),
      Ok(None) => Vec::new(),
      Err(e) => {
        warn!(target: "trivia_quiz", error = %e, "Score ledger unreadable; showing empty ledger");
        Vec::new()
      }
    }
  }

  /// Load, push, write back. Malformed existing data is replaced.
  #[instrument(level = "info", skip(self))]
  pub fn append(&self, username: &str, score: u32) -> Result<ScoreRecord, StorageError> {
    let mut records = match self.store.get_item(SCORES_KEY)? {
      Some(raw) => decode_records(&raw),
      None => Vec::new(),
    };
    let record = ScoreRecord { username: username.to_string(), score };
    records.push(record.clone());

    let body = serde_json::to_string(&records).map_err(|e| StorageError::Serialization(e.to_string()))?;
    self.store.set_item(SCORES_KEY, &body)?;
    info!(target: "trivia_quiz", %username, score, entries = records.len(), "Score recorded");
    Ok(record)
  }
}

fn decode_records(raw: &str) -> Vec<ScoreRecord> {
  match serde_json::from_str::<Vec<ScoreRecord>>(raw) {
    Ok(records) => records,
    Err(e) => {
      warn!(target: "trivia_quiz", error = %e, raw_len = raw.len(), "Malformed score ledger; treating as empty");
      Vec::new()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::storage::MemoryStore;

  fn ledger() -> (ScoreLedger, Arc<MemoryStore>) {
    let backing = Arc::new(MemoryStore::new());
    (ScoreLedger::new(backing.clone()), backing)
  }

  #[test]
  fn append_grows_by_one_and_ends_with_record() {
    let (ledger, _) = ledger();
    ledger.append("bob", 3).unwrap();
    let before = ledger.list_all();

    let rec = ledger.append("ann", 5).unwrap();
    let after = ledger.list_all();

    assert_eq!(after.len(), before.len() + 1);
    assert_eq!(after.last(), Some(&rec));
  }

  #[test]
  fn serialized_ledger_reads_back_in_order() {
    let (ledger, backing) = ledger();
    let records = vec![
      ScoreRecord { username: "bob".into(), score: 3 },
      ScoreRecord { username: "ann".into(), score: 5 },
    ];
    backing.set_item(SCORES_KEY, &serde_json::to_string(&records).unwrap()).unwrap();
    assert_eq!(ledger.list_all(), records);
  }

  #[test]
  fn keeps_duplicates_without_aggregating() {
    let (ledger, _) = ledger();
    ledger.append("bob", 3).unwrap();
    ledger.append("bob", 3).unwrap();
    assert_eq!(ledger.list_all().len(), 2);
  }

  #[test]
  fn truncated_data_lists_as_empty() {
    let (ledger, backing) = ledger();
    backing.set_item(SCORES_KEY, r#"[{"username":"bob","sco"#).unwrap();
    assert_eq!(ledger.list_all(), Vec::<ScoreRecord>::new());
  }

  #[test]
  fn append_replaces_malformed_data() {
    let (ledger, backing) = ledger();
    backing.set_item(SCORES_KEY, "{not json").unwrap();
    ledger.append("ann", 4).unwrap();
    assert_eq!(ledger.list_all(), vec![ScoreRecord { username: "ann".into(), score: 4 }]);
  }

  #[test]
  fn reads_the_browser_layout() {
    let (ledger, backing) = ledger();
    backing
      .set_item(SCORES_KEY, r#"[{"username":"Anonymous","score":0},{"username":"zoe","score":10}]"#)
      .unwrap();
    let all = ledger.list_all();
    assert_eq!(all[0].username, "Anonymous");
    assert_eq!(all[1].score, 10);
  }
}

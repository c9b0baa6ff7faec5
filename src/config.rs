//! Application configuration: optional TOML file plus environment overrides.
//!
//! `QUIZ_CONFIG_PATH` points at the TOML file. When it is set the file must
//! exist and parse; a broken configuration stops startup.
//!
//! Example:
//!
//! ```toml
//! port = 3000
//! profile_dir = "./profile"
//!
//! [quiz]
//! question_count = 10
//! identity_ttl_days = 7
//!
//! [provider]
//! kind = "local_bank"
//!
//! [[questions]]
//! prompt = "What is the capital of France?"
//! correct_answer = "Paris"
//! incorrect_answers = ["London", "Berlin", "Rome"]
//! ```

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::domain::Question;
use crate::provider::INCORRECT_ANSWERS_PER_QUESTION;
use crate::session::SessionSettings;

pub const DEFAULT_TRIVIA_API_URL: &str = "https://opentdb.com/api.php";
/// About a century; cookie expiry dates past this are not representable everywhere.
pub const MAX_IDENTITY_TTL_DAYS: i64 = 36_500;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
  #[error("failed to read config file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("invalid value for {var}: {value:?}")]
  Env { var: &'static str, value: String },

  #[error("invalid configuration: {0}")]
  Invalid(String),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub port: u16,
  pub profile_dir: PathBuf,
  /// Keep cookies and scores in memory only; nothing survives a restart.
  pub ephemeral_profile: bool,
  pub static_dir: PathBuf,
  pub quiz: QuizCfg,
  pub provider: ProviderCfg,
  /// Local question bank, used when `provider.kind = "local_bank"`.
  pub questions: Vec<Question>,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      port: 3000,
      profile_dir: PathBuf::from("./profile"),
      ephemeral_profile: false,
      static_dir: PathBuf::from("./static"),
      quiz: QuizCfg::default(),
      provider: ProviderCfg::default(),
      questions: Vec::new(),
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct QuizCfg {
  pub question_count: usize,
  pub identity_ttl_days: i64,
  pub anonymous_name: String,
  /// Sync the username input / "New Player" button with the cookie on startup.
  pub sync_identity_on_start: bool,
}

impl Default for QuizCfg {
  fn default() -> Self {
    let s = SessionSettings::default();
    Self {
      question_count: s.question_count,
      identity_ttl_days: s.identity_ttl_days,
      anonymous_name: s.anonymous_name,
      sync_identity_on_start: s.sync_identity_on_start,
    }
  }
}

impl QuizCfg {
  pub fn session_settings(&self) -> SessionSettings {
    SessionSettings {
      question_count: self.question_count,
      identity_ttl_days: self.identity_ttl_days,
      anonymous_name: self.anonymous_name.clone(),
      sync_identity_on_start: self.sync_identity_on_start,
    }
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
  #[default]
  OpenTdb,
  LocalBank,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ProviderCfg {
  pub kind: ProviderKind,
  pub url: String,
  pub timeout_secs: u64,
}

impl Default for ProviderCfg {
  fn default() -> Self {
    Self {
      kind: ProviderKind::OpenTdb,
      url: DEFAULT_TRIVIA_API_URL.into(),
      timeout_secs: 20,
    }
  }
}

impl AppConfig {
  /// Parse TOML text and validate it.
  pub fn from_toml_str(s: &str, path: PathBuf) -> Result<Self, ConfigError> {
    let cfg: AppConfig = toml::from_str(s).map_err(|source| ConfigError::Parse { path, source })?;
    cfg.validate()?;
    Ok(cfg)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.quiz.question_count == 0 {
      return Err(ConfigError::Invalid("quiz.question_count must be at least 1".into()));
    }
    if !(1..=MAX_IDENTITY_TTL_DAYS).contains(&self.quiz.identity_ttl_days) {
      return Err(ConfigError::Invalid(format!(
        "quiz.identity_ttl_days must be between 1 and {MAX_IDENTITY_TTL_DAYS}"
      )));
    }
    if self.provider.kind == ProviderKind::LocalBank && self.questions.is_empty() {
      return Err(ConfigError::Invalid("provider.kind = \"local_bank\" needs [[questions]] entries".into()));
    }
    for (i, q) in self.questions.iter().enumerate() {
      if q.prompt.trim().is_empty() || q.correct_answer.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("questions[{i}] needs a prompt and a correct_answer")));
      }
      if q.incorrect_answers.len() != INCORRECT_ANSWERS_PER_QUESTION {
        return Err(ConfigError::Invalid(format!(
          "questions[{i}] needs exactly {INCORRECT_ANSWERS_PER_QUESTION} incorrect_answers"
        )));
      }
    }
    Ok(())
  }

  /// Load from `QUIZ_CONFIG_PATH` (if set), then apply env overrides.
  pub fn load_from_env() -> Result<Self, ConfigError> {
    let mut cfg = match std::env::var("QUIZ_CONFIG_PATH") {
      Ok(path) => {
        let path = PathBuf::from(path);
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read { path: path.clone(), source })?;
        let cfg = Self::from_toml_str(&raw, path.clone())?;
        info!(target: "trivia_quiz", path = %path.display(), "Loaded quiz config (TOML)");
        cfg
      }
      Err(_) => AppConfig::default(),
    };
    cfg.apply_env(|k| std::env::var(k).ok())?;
    cfg.validate()?;
    Ok(cfg)
  }

  fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
    if let Some(v) = get("PORT") {
      self.port = v.parse().map_err(|_| ConfigError::Env { var: "PORT", value: v })?;
    }
    if let Some(v) = get("PROFILE_DIR") {
      self.profile_dir = PathBuf::from(v);
    }
    if let Some(v) = get("TRIVIA_API_URL") {
      self.provider.url = v;
    }
    if let Some(v) = get("QUESTION_COUNT") {
      self.quiz.question_count = v.parse().map_err(|_| ConfigError::Env { var: "QUESTION_COUNT", value: v })?;
    }
    if let Some(v) = get("IDENTITY_TTL_DAYS") {
      self.quiz.identity_ttl_days = v.parse().map_err(|_| ConfigError::Env { var: "IDENTITY_TTL_DAYS", value: v })?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  #[test]
  fn empty_file_gives_defaults() {
    let cfg = AppConfig::from_toml_str("", "quiz.toml".into()).unwrap();
    assert_eq!(cfg.port, 3000);
    assert_eq!(cfg.quiz.question_count, 10);
    assert_eq!(cfg.quiz.identity_ttl_days, 7);
    assert_eq!(cfg.provider.kind, ProviderKind::OpenTdb);
    assert_eq!(cfg.provider.url, DEFAULT_TRIVIA_API_URL);
    assert!(cfg.quiz.sync_identity_on_start);
    assert!(!cfg.ephemeral_profile);
  }

  #[test]
  fn parses_local_bank() {
    let cfg = AppConfig::from_toml_str(
      r#"
        profile_dir = "/tmp/quiz"
        [quiz]
        question_count = 2
        [provider]
        kind = "local_bank"
        [[questions]]
        prompt = "Capital of France?"
        correct_answer = "Paris"
        incorrect_answers = ["London", "Berlin", "Rome"]
        category = "Geography"
      "#,
      "quiz.toml".into(),
    )
    .unwrap();
    assert_eq!(cfg.provider.kind, ProviderKind::LocalBank);
    assert_eq!(cfg.questions.len(), 1);
    assert_eq!(cfg.questions[0].category.as_deref(), Some("Geography"));
    assert_eq!(cfg.quiz.session_settings().question_count, 2);
    assert_eq!(cfg.profile_dir, PathBuf::from("/tmp/quiz"));
  }

  #[test]
  fn rejects_bank_question_with_wrong_answer_count() {
    let err = AppConfig::from_toml_str(
      r#"
        [[questions]]
        prompt = "Q?"
        correct_answer = "A"
        incorrect_answers = ["B"]
      "#,
      "quiz.toml".into(),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
  }

  #[test]
  fn local_bank_without_questions_is_invalid() {
    let err = AppConfig::from_toml_str("[provider]\nkind = \"local_bank\"\n", "quiz.toml".into()).unwrap_err();
    assert!(err.to_string().contains("[[questions]]"));
  }

  #[test]
  fn env_overrides_apply_and_bad_values_fail() {
    let env: HashMap<&str, &str> = HashMap::from([("PORT", "8080"), ("QUESTION_COUNT", "5"), ("PROFILE_DIR", "/srv/p")]);
    let mut cfg = AppConfig::default();
    cfg.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.quiz.question_count, 5);
    assert_eq!(cfg.profile_dir, PathBuf::from("/srv/p"));

    let err = cfg.apply_env(|k| (k == "PORT").then(|| "eighty".to_string())).unwrap_err();
    assert!(matches!(err, ConfigError::Env { var: "PORT", .. }));
  }

  #[test]
  fn identity_ttl_must_fit_the_calendar() {
    let err = AppConfig::from_toml_str("[quiz]\nidentity_ttl_days = 100000000\n", "quiz.toml".into()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(AppConfig::from_toml_str("[quiz]\nidentity_ttl_days = 0\n", "quiz.toml".into()).is_err());

    let cfg = AppConfig::from_toml_str("[quiz]\nidentity_ttl_days = 36500\n", "quiz.toml".into()).unwrap();
    assert_eq!(cfg.quiz.identity_ttl_days, MAX_IDENTITY_TTL_DAYS);

    let mut cfg = AppConfig::default();
    cfg.apply_env(|k| (k == "IDENTITY_TTL_DAYS").then(|| "100000000".to_string())).unwrap();
    assert!(cfg.validate().is_err());
  }

  #[test]
  fn garbage_toml_is_a_parse_error() {
    let err = AppConfig::from_toml_str("port = [", "quiz.toml".into()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
  }
}

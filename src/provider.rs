//! Question providers.
//!
//!   - `OpenTdb`: Open Trivia DB over HTTP, base64-encoded payloads
//!   - `QuestionBank`: questions listed in the TOML config, sampled per round
//!
//! Calls are instrumented and log counts and latencies, never question text.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::seq::SliceRandom;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::domain::Question;

pub const INCORRECT_ANSWERS_PER_QUESTION: usize = 3;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
  #[error("question request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("question provider returned HTTP {0}")]
  Status(reqwest::StatusCode),

  #[error("question provider refused the request: {reason} (code {code})")]
  ResponseCode { code: u8, reason: &'static str },

  #[error("malformed question data: {0}")]
  Malformed(String),

  #[error("local question bank is empty")]
  EmptyBank,
}

/// Open Trivia DB `response_code` meanings.
pub fn describe_response_code(code: u8) -> &'static str {
  match code {
    0 => "success",
    1 => "not enough questions for the query",
    2 => "invalid parameter",
    3 => "session token not found",
    4 => "session token exhausted",
    5 => "rate limited, try again in a few seconds",
    _ => "unknown response code",
  }
}

#[async_trait]
pub trait QuestionProvider: Send + Sync {
  /// Fetch one batch of `count` questions.
  async fn fetch(&self, count: usize) -> Result<Vec<Question>, ProviderError>;

  fn name(&self) -> &'static str;
}

#[derive(Clone)]
pub struct OpenTdb {
  client: reqwest::Client,
  pub url: String,
}

#[derive(Deserialize)]
struct OpenTdbResponse {
  response_code: u8,
  #[serde(default)]
  results: Vec<OpenTdbQuestion>,
}

#[derive(Deserialize)]
struct OpenTdbQuestion {
  #[serde(default)]
  category: Option<String>,
  #[serde(default)]
  difficulty: Option<String>,
  question: String,
  correct_answer: String,
  incorrect_answers: Vec<String>,
}

impl OpenTdb {
  pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(concat!("trivia-quiz/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self { client, url: url.into() })
  }
}

#[async_trait]
impl QuestionProvider for OpenTdb {
  #[instrument(level = "info", skip(self), fields(url = %self.url))]
  async fn fetch(&self, count: usize) -> Result<Vec<Question>, ProviderError> {
    let started = Instant::now();
    let amount = count.to_string();
    let res = self
      .client
      .get(&self.url)
      .query(&[("amount", amount.as_str()), ("type", "multiple"), ("encode", "base64")])
      .send()
      .await?;

    if !res.status().is_success() {
      let status = res.status();
      error!(target: "round", %status, "Question provider HTTP error");
      return Err(ProviderError::Status(status));
    }

    let body: OpenTdbResponse = res.json().await?;
    let questions = decode_response(body)?;
    info!(target: "round", count = questions.len(), elapsed_ms = started.elapsed().as_millis() as u64, "Questions fetched");
    Ok(questions)
  }

  fn name(&self) -> &'static str {
    "open_tdb"
  }
}

fn decode_response(body: OpenTdbResponse) -> Result<Vec<Question>, ProviderError> {
  if body.response_code != 0 {
    return Err(ProviderError::ResponseCode {
      code: body.response_code,
      reason: describe_response_code(body.response_code),
    });
  }
  body.results.into_iter().map(decode_question).collect()
}

fn decode_question(raw: OpenTdbQuestion) -> Result<Question, ProviderError> {
  if raw.incorrect_answers.len() != INCORRECT_ANSWERS_PER_QUESTION {
    return Err(ProviderError::Malformed(format!(
      "expected {} incorrect answers, got {}",
      INCORRECT_ANSWERS_PER_QUESTION,
      raw.incorrect_answers.len()
    )));
  }
  Ok(Question {
    prompt: decode_field(&raw.question)?,
    correct_answer: decode_field(&raw.correct_answer)?,
    incorrect_answers: raw
      .incorrect_answers
      .iter()
      .map(|a| decode_field(a))
      .collect::<Result<_, _>>()?,
    category: raw.category.as_deref().map(decode_field).transpose()?,
    difficulty: raw.difficulty.as_deref().map(decode_field).transpose()?,
  })
}

fn decode_field(encoded: &str) -> Result<String, ProviderError> {
  let bytes = STANDARD
    .decode(encoded.trim())
    .map_err(|e| ProviderError::Malformed(format!("invalid base64: {e}")))?;
  String::from_utf8(bytes).map_err(|e| ProviderError::Malformed(format!("invalid UTF-8: {e}")))
}

/// Fixed set of questions, sampled without replacement each round.
#[derive(Clone, Debug)]
pub struct QuestionBank {
  questions: Vec<Question>,
}

impl QuestionBank {
  pub fn new(questions: Vec<Question>) -> Self {
    Self { questions }
  }

  pub fn len(&self) -> usize {
    self.questions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.questions.is_empty()
  }

  fn sample(&self, count: usize) -> Vec<Question> {
    let mut rng = rand::thread_rng();
    self.questions.choose_multiple(&mut rng, count).cloned().collect()
  }
}

#[async_trait]
impl QuestionProvider for QuestionBank {
  #[instrument(level = "info", skip(self), fields(bank_size = self.questions.len()))]
  async fn fetch(&self, count: usize) -> Result<Vec<Question>, ProviderError> {
    if self.is_empty() {
      return Err(ProviderError::EmptyBank);
    }
    let picked = self.sample(count);
    info!(target: "round", count = picked.len(), "Questions drawn from local bank");
    Ok(picked)
  }

  fn name(&self) -> &'static str {
    "local_bank"
  }
}

#[cfg(test)]
pub(crate) fn sample_question(correct: &str, incorrect: [&str; 3]) -> Question {
  Question {
    prompt: format!("Which one is {correct}?"),
    correct_answer: correct.to_string(),
    incorrect_answers: incorrect.iter().map(|s| s.to_string()).collect(),
    category: None,
    difficulty: None,
  }
}

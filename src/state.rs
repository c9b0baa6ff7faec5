//! Application state: the quiz session, its page, and the question provider.
//!
//! This module owns:
//!   - building the profile-backed stores (cookie jar + local storage files)
//!   - choosing the question provider from configuration
//!   - wiring them into one `QuizSession` behind an async mutex

use std::{path::Path, sync::Arc};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::clock::Clock;
use crate::config::{AppConfig, ProviderKind};
use crate::cookies::CookieJar;
use crate::identity::{IdentityStore, USERNAME_COOKIE};
use crate::ledger::{ScoreLedger, SCORES_KEY};
use crate::provider::{OpenTdb, ProviderError, QuestionBank, QuestionProvider};
use crate::render::HtmlPresenter;
use crate::session::{QuizSession, SessionSettings};
use crate::storage::{FileStore, KeyValueStore, MemoryStore, StorageError};

pub const COOKIE_FILE: &str = "cookies.json";
pub const LOCAL_STORAGE_FILE: &str = "local_storage.json";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StartupError {
  #[error("profile storage unusable: {0}")]
  Storage(#[from] StorageError),

  #[error("question provider unusable: {0}")]
  Provider(#[from] ProviderError),
}

pub struct AppState {
  pub session: Mutex<QuizSession>,
  pub page: HtmlPresenter,
  pub provider: Arc<dyn QuestionProvider>,
}

impl AppState {
  pub fn new(
    provider: Arc<dyn QuestionProvider>,
    cookies: Arc<dyn KeyValueStore>,
    local: Arc<dyn KeyValueStore>,
    clock: Clock,
    settings: SessionSettings,
  ) -> Self {
    let page = HtmlPresenter::new();
    let session = QuizSession::new(
      IdentityStore::new(CookieJar::new(cookies), clock),
      ScoreLedger::new(local),
      Box::new(page.clone()),
      settings,
    );
    Self { session: Mutex::new(session), page, provider }
  }

  /// Build state from config: open the profile files and the provider.
  #[instrument(level = "info", skip_all, fields(profile = %cfg.profile_dir.display()))]
  pub fn from_config(cfg: &AppConfig) -> Result<Self, StartupError> {
    let (cookies, local) = if cfg.ephemeral_profile {
      info!(target: "trivia_quiz", "Ephemeral profile; cookies and scores stay in memory");
      let cookies: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
      let local: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
      (cookies, local)
    } else {
      open_profile(&cfg.profile_dir)?
    };

    let provider: Arc<dyn QuestionProvider> = match cfg.provider.kind {
      ProviderKind::OpenTdb => {
        let client = OpenTdb::new(cfg.provider.url.clone(), std::time::Duration::from_secs(cfg.provider.timeout_secs))?;
        info!(target: "trivia_quiz", url = %client.url, timeout_secs = cfg.provider.timeout_secs, "Using Open Trivia DB");
        Arc::new(client)
      }
      ProviderKind::LocalBank => {
        let bank = QuestionBank::new(cfg.questions.clone());
        info!(target: "trivia_quiz", questions = bank.len(), "Using local question bank");
        Arc::new(bank)
      }
    };

    Ok(Self::new(provider, cookies, local, Clock::System, cfg.quiz.session_settings()))
  }
}

/// Open the cookie jar and local storage files under `dir`.
fn open_profile(dir: &Path) -> Result<(Arc<dyn KeyValueStore>, Arc<dyn KeyValueStore>), StorageError> {
  let cookies = FileStore::open(dir.join(COOKIE_FILE))?;
  let local = FileStore::open(dir.join(LOCAL_STORAGE_FILE))?;
  // Probe reads so an unreadable profile fails here, not mid-round.
  cookies.get_item(USERNAME_COOKIE)?;
  local.get_item(SCORES_KEY)?;
  info!(target: "trivia_quiz", cookies = %cookies.path().display(), local = %local.path().display(), "Profile storage ready");
  Ok((Arc::new(cookies), Arc::new(local)))
}

//! Presentation layer.
//!
//! This module owns:
//!   - turning fetched questions into selectable options (shuffle + marker)
//!   - the `Presenter` callbacks the quiz session drives
//!   - the HTML page built from the presenter's `PageModel`
//!
//! Correct-answer markers live only in `AnswerOption`; the page carries the
//! option position, never the marker.

use std::{
  fmt::Write as _,
  sync::{Arc, RwLock},
};

use rand::{seq::SliceRandom, Rng};

use crate::domain::{AnswerOption, Question, RenderedQuestion, RoundId, ScoreRecord};
use crate::util::escape_html;

/// Build the options for one question: uniform shuffle, then mark the first
/// option whose text equals the designated correct answer.
pub fn build_options<R: Rng + ?Sized>(question: &Question, question_index: usize, rng: &mut R) -> Vec<AnswerOption> {
  let mut texts: Vec<&str> = Vec::with_capacity(question.incorrect_answers.len() + 1);
  texts.push(&question.correct_answer);
  texts.extend(question.incorrect_answers.iter().map(String::as_str));
  texts.shuffle(rng);

  let marked = texts.iter().position(|t| *t == question.correct_answer);
  texts
    .into_iter()
    .enumerate()
    .map(|(pos, text)| AnswerOption {
      display_text: text.to_string(),
      is_correct: Some(pos) == marked,
      question_index,
    })
    .collect()
}

pub fn build_round<R: Rng + ?Sized>(questions: &[Question], rng: &mut R) -> Vec<RenderedQuestion> {
  questions
    .iter()
    .enumerate()
    .map(|(index, q)| RenderedQuestion {
      index,
      prompt: q.prompt.clone(),
      category: q.category.clone(),
      difficulty: q.difficulty.clone(),
      options: build_options(q, index, rng),
    })
    .collect()
}

/// Callbacks the quiz session uses to update whatever is showing the quiz.
pub trait Presenter: Send {
  fn show_loading(&mut self, loading: bool);
  fn render_questions(&mut self, round: Option<RoundId>, questions: &[RenderedQuestion]);
  fn render_scores(&mut self, scores: &[ScoreRecord]);
  fn sync_identity(&mut self, username: Option<&str>);
  fn show_error(&mut self, message: Option<&str>);
}

/// Everything the quiz page displays.
#[derive(Clone, Debug, Default)]
pub struct PageModel {
  pub loading: bool,
  pub round: Option<RoundId>,
  pub questions: Vec<RenderedQuestion>,
  pub scores: Vec<ScoreRecord>,
  pub username: Option<String>,
  pub error: Option<String>,
}

/// Presenter that keeps a shared `PageModel` for the HTTP layer to render.
#[derive(Clone, Default)]
pub struct HtmlPresenter {
  model: Arc<RwLock<PageModel>>,
}

impl HtmlPresenter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn snapshot(&self) -> PageModel {
    self.model.read().unwrap_or_else(|e| e.into_inner()).clone()
  }

  pub fn render_page(&self) -> String {
    render_page(&self.snapshot())
  }

  fn update(&self, f: impl FnOnce(&mut PageModel)) {
    let mut guard = self.model.write().unwrap_or_else(|e| e.into_inner());
    f(&mut guard);
  }
}

impl Presenter for HtmlPresenter {
  fn show_loading(&mut self, loading: bool) {
    self.update(|m| m.loading = loading);
  }

  fn render_questions(&mut self, round: Option<RoundId>, questions: &[RenderedQuestion]) {
    self.update(|m| {
      m.round = round;
      m.questions = questions.to_vec();
    });
  }

  fn render_scores(&mut self, scores: &[ScoreRecord]) {
    self.update(|m| m.scores = scores.to_vec());
  }

  fn sync_identity(&mut self, username: Option<&str>) {
    self.update(|m| m.username = username.map(str::to_string));
  }

  fn show_error(&mut self, message: Option<&str>) {
    self.update(|m| m.error = message.map(str::to_string));
  }
}

fn hidden_if(cond: bool) -> &'static str {
  if cond { " class=\"hidden\"" } else { "" }
}

/// Render the full quiz document.
pub fn render_page(model: &PageModel) -> String {
  let mut html = String::with_capacity(4096);
  html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>Trivia Quiz</title>\n");
  if model.loading {
    html.push_str("<meta http-equiv=\"refresh\" content=\"1\">\n");
  }
  // The visibility toggle must work even without the optional stylesheet.
  html.push_str("<style>.hidden{display:none}</style>\n");
  html.push_str("<link rel=\"stylesheet\" href=\"/static/style.css\">\n</head>\n<body>\n<h1>Trivia Quiz</h1>\n");

  if let Some(err) = &model.error {
    let _ = writeln!(html, "<div id=\"error-container\" role=\"alert\">{}</div>", escape_html(err));
  }
  let _ = writeln!(html, "<div id=\"loading-container\"{}>Loading questions&hellip;</div>", hidden_if(!model.loading));

  html.push_str("<form id=\"trivia-form\" method=\"post\" action=\"/submit\">\n");
  if let Some(round) = model.round {
    let _ = writeln!(html, "<input type=\"hidden\" name=\"round\" value=\"{round}\">");
  }
  let _ = writeln!(html, "<div id=\"question-container\"{}>", hidden_if(model.loading));
  for q in &model.questions {
    render_question(&mut html, q);
  }
  html.push_str("</div>\n");

  let _ = writeln!(
    html,
    "<input type=\"text\" id=\"username\" name=\"username\" placeholder=\"Enter your name\"{}>",
    hidden_if(model.username.is_some())
  );
  html.push_str("<button type=\"submit\">Submit Answers</button>\n</form>\n");

  if let Some(name) = &model.username {
    let _ = writeln!(html, "<p id=\"current-player\">Playing as <strong>{}</strong></p>", escape_html(name));
  }
  let _ = writeln!(
    html,
    "<form method=\"post\" action=\"/new-player\"><button id=\"new-player\" type=\"submit\"{}>New Player</button></form>",
    hidden_if(model.username.is_none())
  );

  html.push_str("<table id=\"score-table\">\n<thead><tr><th>Player</th><th>Score</th></tr></thead>\n<tbody>\n");
  for rec in &model.scores {
    let _ = writeln!(html, "<tr><td>{}</td><td>{}</td></tr>", escape_html(&rec.username), rec.score);
  }
  html.push_str("</tbody>\n</table>\n</body>\n</html>\n");
  html
}

fn render_question(html: &mut String, q: &RenderedQuestion) {
  html.push_str("<div class=\"question\">\n");
  let _ = writeln!(html, "<p>{}</p>", escape_html(&q.prompt));
  let meta: Vec<String> = [q.category.as_deref(), q.difficulty.as_deref()]
    .into_iter()
    .flatten()
    .map(escape_html)
    .collect();
  if !meta.is_empty() {
    let _ = writeln!(html, "<p class=\"meta\">{}</p>", meta.join(" &middot; "));
  }
  for (pos, opt) in q.options.iter().enumerate() {
    let _ = writeln!(
      html,
      "<label><input type=\"radio\" name=\"answer{}\" value=\"{}\"> {}</label>",
      opt.question_index,
      pos,
      escape_html(&opt.display_text)
    );
  }
  html.push_str("</div>\n");
}

#[cfg(test)]
mod tests {
  use rand::{rngs::StdRng, SeedableRng};

  use super::*;
  use crate::provider::sample_question;

  #[test]
  fn paris_question_has_four_options_one_marked() {
    let q = sample_question("Paris", ["London", "Berlin", "Rome"]);
    let mut rng = StdRng::seed_from_u64(7);
    let opts = build_options(&q, 3, &mut rng);

    assert_eq!(opts.len(), 4);
    let marked: Vec<_> = opts.iter().filter(|o| o.is_correct).collect();
    assert_eq!(marked.len(), 1);
    assert_eq!(marked[0].display_text, "Paris");
    assert!(opts.iter().all(|o| o.question_index == 3));
  }

  #[test]
  fn duplicate_answer_text_marks_only_one_option() {
    let q = sample_question("Paris", ["Paris", "Berlin", "Rome"]);
    let mut rng = StdRng::seed_from_u64(1);
    let opts = build_options(&q, 0, &mut rng);
    assert_eq!(opts.iter().filter(|o| o.is_correct).count(), 1);
  }

  #[test]
  fn shuffle_places_correct_answer_in_every_slot() {
    let q = sample_question("Paris", ["London", "Berlin", "Rome"]);
    let mut rng = StdRng::seed_from_u64(42);
    let mut seen = [0usize; 4];
    for _ in 0..400 {
      let opts = build_options(&q, 0, &mut rng);
      let pos = opts.iter().position(|o| o.is_correct).unwrap();
      seen[pos] += 1;
    }
    // Uniform would be 100 each; anything this far off means a biased shuffle.
    assert!(seen.iter().all(|&n| n > 50), "positions: {seen:?}");
  }

  #[test]
  fn page_hides_username_input_once_identity_is_known() {
    let mut presenter = HtmlPresenter::new();
    presenter.sync_identity(None);
    let page = presenter.render_page();
    assert!(page.contains("id=\"username\" name=\"username\" placeholder=\"Enter your name\">"));
    assert!(page.contains("id=\"new-player\" type=\"submit\" class=\"hidden\""));

    presenter.sync_identity(Some("alice"));
    let page = presenter.render_page();
    assert!(page.contains("placeholder=\"Enter your name\" class=\"hidden\""));
    assert!(page.contains("Playing as <strong>alice</strong>"));
  }

  #[test]
  fn page_escapes_text_and_never_emits_markers() {
    let mut presenter = HtmlPresenter::new();
    let q = sample_question("<script>", ["a&b", "\"q\"", "ok"]);
    let round = RoundId::new();
    let rendered = build_round(&[q], &mut StdRng::seed_from_u64(3));
    presenter.render_questions(Some(round), &rendered);
    presenter.render_scores(&[ScoreRecord { username: "<img>".into(), score: 2 }]);

    let page = presenter.render_page();
    assert!(!page.contains("<script>"));
    assert!(page.contains("&lt;script&gt;"));
    assert!(page.contains("<td>&lt;img&gt;</td><td>2</td>"));
    assert!(!page.contains("data-correct"));
    assert!(page.contains(&format!("name=\"round\" value=\"{round}\"")));
    assert!(page.contains("name=\"answer0\" value=\"3\""));
  }

  #[test]
  fn loading_page_refreshes_and_hides_questions() {
    let mut presenter = HtmlPresenter::new();
    presenter.show_loading(true);
    let page = presenter.render_page();
    assert!(page.contains("http-equiv=\"refresh\""));
    assert!(page.contains("<div id=\"question-container\" class=\"hidden\">"));

    presenter.show_loading(false);
    presenter.show_error(Some("Could not load questions"));
    let page = presenter.render_page();
    assert!(!page.contains("http-equiv"));
    assert!(page.contains("<div id=\"loading-container\" class=\"hidden\">"));
    assert!(page.contains("role=\"alert\">Could not load questions</div>"));
  }
}

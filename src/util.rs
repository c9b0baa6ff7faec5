//! Small helpers shared by rendering and request handling.

/// Longest username kept from form input, in characters.
pub const MAX_USERNAME_CHARS: usize = 40;

/// Escape text for use inside HTML element content and quoted attributes.
pub fn escape_html(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for ch in s.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      _ => out.push(ch),
    }
  }
  out
}

/// Trim form input and cap its length. Returns `None` when nothing is left.
pub fn clean_username(input: &str) -> Option<String> {
  let trimmed: String = input
    .trim()
    .chars()
    .filter(|c| !c.is_control())
    .take(MAX_USERNAME_CHARS)
    .collect();
  let trimmed = trimmed.trim_end().to_string();
  if trimmed.is_empty() { None } else { Some(trimmed) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn escapes_markup() {
    assert_eq!(escape_html(r#"<b>"Tom" & 'Jerry'</b>"#), "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
  }

  #[test]
  fn cleans_usernames() {
    assert_eq!(clean_username("  alice \n"), Some("alice".into()));
    assert_eq!(clean_username("   "), None);
    assert_eq!(clean_username(&"x".repeat(100)).unwrap().chars().count(), MAX_USERNAME_CHARS);
  }
}

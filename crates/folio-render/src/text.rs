//! Approximate text metrics and word wrapping.
//!
//! Widths are estimated from an average glyph advance rather than real font
//! tables. That is accurate enough for right-alignment and wrapping of the
//! short strings that appear on business documents.

/// Millimetres per typographic point.
pub const PT_TO_MM: f32 = 25.4 / 72.0;

const AVG_ADVANCE_EM: f32 = 0.5;
const AVG_ADVANCE_BOLD_EM: f32 = 0.55;
const LEADING: f32 = 1.4;

/// Estimated rendered width of `text` in millimetres.
pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
  let em = if bold { AVG_ADVANCE_BOLD_EM } else { AVG_ADVANCE_EM };
  text.chars().count() as f32 * size * em * PT_TO_MM
}

/// Baseline-to-baseline distance for `size` in millimetres.
pub fn line_height(size: f32) -> f32 { size * PT_TO_MM * LEADING }

/// Greedy word wrap to `max_width` millimetres.
///
/// Explicit newlines start a new line. A single word wider than the limit
/// is broken between characters. Always returns at least one line.
pub fn wrap(text: &str, max_width: f32, size: f32, bold: bool) -> Vec<String> {
  let per_char = text_width("x", size, bold);
  let max_chars = ((max_width / per_char).floor() as usize).max(1);

  let mut lines = Vec::new();
  for paragraph in text.lines() {
    let mut current = String::new();
    for word in paragraph.split_whitespace() {
      let mut word: Vec<char> = word.chars().collect();
      while word.len() > max_chars {
        if !current.is_empty() {
          lines.push(std::mem::take(&mut current));
        }
        let rest = word.split_off(max_chars);
        lines.push(word.into_iter().collect());
        word = rest;
      }
      let word: String = word.into_iter().collect();

      let needed = if current.is_empty() {
        word.chars().count()
      } else {
        current.chars().count() + 1 + word.chars().count()
      };
      if needed > max_chars && !current.is_empty() {
        lines.push(std::mem::take(&mut current));
      }
      if !current.is_empty() {
        current.push(' ');
      }
      current.push_str(&word);
    }
    lines.push(current);
  }

  if lines.is_empty() {
    lines.push(String::new());
  }
  lines
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn short_text_is_one_line() {
    assert_eq!(wrap("Design work", 100.0, 10.0, false), vec!["Design work"]);
    assert_eq!(wrap("", 100.0, 10.0, false), vec![""]);
  }

  #[test]
  fn long_text_wraps_on_words() {
    let text = "one two three four five six seven eight nine ten";
    // 10pt at 0.5em is ~1.76mm per char, so 20mm holds 11 chars.
    let lines = wrap(text, 20.0, 10.0, false);
    assert!(lines.len() > 1);
    assert!(lines.iter().all(|l| l.chars().count() <= 11));
    assert_eq!(lines.join(" "), text);
  }

  #[test]
  fn overlong_word_is_split() {
    let lines = wrap("abcdefghijklmnopqrstuvwxyz", 10.0, 10.0, false);
    assert!(lines.len() > 1);
    assert_eq!(lines.concat(), "abcdefghijklmnopqrstuvwxyz");
  }

  #[test]
  fn newlines_are_kept() {
    assert_eq!(wrap("a\nb", 100.0, 10.0, false), vec!["a", "b"]);
  }

  #[test]
  fn bold_is_wider() {
    assert!(text_width("Total", 10.0, true) > text_width("Total", 10.0, false));
  }
}

//! The paginated document model.
//!
//! All coordinates are millimetres measured from the top-left corner of the
//! page. Text `y` is the baseline. Font sizes are points.

use std::sync::Arc;

use folio_core::template::{Color, FontFamily, Margins};

use crate::logo::RasterImage;

// ─── Styling primitives ──────────────────────────────────────────────────────

/// An RGB color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
  pub r: f32,
  pub g: f32,
  pub b: f32,
}

impl Rgb {
  pub const BLACK: Self = Self { r: 0.0, g: 0.0, b: 0.0 };
  pub const WHITE: Self = Self { r: 1.0, g: 1.0, b: 1.0 };

  pub fn gray(level: f32) -> Self { Self { r: level, g: level, b: level } }

  /// Mix toward white; `amount = 1.0` is white.
  pub fn lighten(self, amount: f32) -> Self {
    let mix = |c: f32| c + (1.0 - c) * amount;
    Self { r: mix(self.r), g: mix(self.g), b: mix(self.b) }
  }

  pub fn is_white(self) -> bool { self == Self::WHITE }

  pub fn hex(self) -> String {
    let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!("#{:02x}{:02x}{:02x}", c(self.r), c(self.g), c(self.b))
  }
}

impl From<&Color> for Rgb {
  fn from(color: &Color) -> Self {
    let (r, g, b) = color.rgb_unit();
    Self { r, g, b }
  }
}

/// The two typefaces available to the PDF encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
  Sans,
  Serif,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Font {
  pub face: Face,
  pub bold: bool,
}

impl Font {
  pub fn new(family: FontFamily, bold: bool) -> Self {
    let face = if family.is_serif() { Face::Serif } else { Face::Sans };
    Self { face, bold }
  }
}

/// Horizontal anchoring of a text run relative to its `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
  Left,
  Center,
  Right,
}

// ─── Elements ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
  pub x:     f32,
  pub y:     f32,
  pub text:  String,
  pub size:  f32,
  pub font:  Font,
  pub color: Rgb,
  pub align: Align,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
  pub x1:    f32,
  pub y1:    f32,
  pub x2:    f32,
  pub y2:    f32,
  pub width: f32,
  pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
  pub x:     f32,
  pub y:     f32,
  pub w:     f32,
  pub h:     f32,
  pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageBox {
  pub x:     f32,
  pub y:     f32,
  pub w:     f32,
  pub h:     f32,
  pub image: Arc<RasterImage>,
}

/// Large rotated text centered on the page, drawn beneath everything else.
#[derive(Debug, Clone, PartialEq)]
pub struct Watermark {
  pub text:  String,
  pub size:  f32,
  pub angle: f32,
  pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
  Text(TextRun),
  Rule(Rule),
  Fill(Fill),
  Image(ImageBox),
  Watermark(Watermark),
}

// ─── Pages ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
  pub elements: Vec<Element>,
}

impl Page {
  /// Every text run on the page in drawing order, watermark included.
  pub fn texts(&self) -> impl Iterator<Item = &str> {
    self.elements.iter().filter_map(|e| match e {
      Element::Text(t) => Some(t.text.as_str()),
      Element::Watermark(w) => Some(w.text.as_str()),
      _ => None,
    })
  }
}

/// A laid-out document, ready to encode.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedDocument {
  pub width:   f32,
  pub height:  f32,
  pub margins: Margins,
  pub pages:   Vec<Page>,
}

impl PagedDocument {
  pub fn page_count(&self) -> usize { self.pages.len() }

  /// All text of all pages, one run per line.
  pub fn plain_text(&self) -> String {
    self
      .pages
      .iter()
      .flat_map(Page::texts)
      .collect::<Vec<_>>()
      .join("\n")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rgb_from_template_color() {
    let rgb = Rgb::from(&Color::from("#ff0000"));
    assert_eq!(rgb, Rgb { r: 1.0, g: 0.0, b: 0.0 });
    assert_eq!(rgb.hex(), "#ff0000");
    assert_eq!(Rgb::from(&Color::from("garbage")), Rgb::BLACK);
  }

  #[test]
  fn lighten_moves_toward_white() {
    assert_eq!(Rgb::BLACK.lighten(1.0), Rgb::WHITE);
    assert_eq!(Rgb::BLACK.lighten(0.5), Rgb::gray(0.5));
  }

  #[test]
  fn serif_families_map_to_serif_face() {
    assert_eq!(Font::new(FontFamily::Georgia, false).face, Face::Serif);
    assert_eq!(Font::new(FontFamily::Inter, true).face, Face::Sans);
  }
}

//! Document templates: the single parameterisation surface for rendering.
//!
//! Every setting is a named, enumerated field so the renderer can match on
//! them exhaustively. Four presets ship built in; they are immutable, and
//! custom templates start life as a copy of one of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Layout ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum HeaderLayout {
  Classic,
  Modern,
  Minimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FooterLayout {
  None,
  Simple,
  Detailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum LogoPosition {
  None,
  TopLeft,
  TopCenter,
  TopRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CompanyInfoPosition {
  Hidden,
  Left,
  Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TableStyle {
  Borders,
  Striped,
  Minimal,
}

// ─── Typography ──────────────────────────────────────────────────────────────

/// The fixed set of font names a template may choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
pub enum FontFamily {
  Arial,
  #[serde(rename = "Times New Roman")]
  #[strum(to_string = "Times New Roman")]
  TimesNewRoman,
  Inter,
  Helvetica,
  Georgia,
  Verdana,
}

impl FontFamily {
  pub fn is_serif(self) -> bool { matches!(self, Self::TimesNewRoman | Self::Georgia) }

  /// CSS `font-family` value with a generic fallback.
  pub fn css_stack(self) -> String {
    let generic = if self.is_serif() { "serif" } else { "sans-serif" };
    format!("'{self}', {generic}")
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FontSize {
  Small,
  Medium,
  Large,
}

impl FontSize {
  /// Point size of the document title.
  pub fn heading_pt(self) -> f32 {
    match self {
      Self::Small => 28.0,
      Self::Medium => 32.0,
      Self::Large => 36.0,
    }
  }

  /// Point size of body text.
  pub fn body_pt(self) -> f32 {
    match self {
      Self::Small => 9.0,
      Self::Medium => 10.0,
      Self::Large => 11.0,
    }
  }
}

// ─── Paper ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaperSize {
  A4,
  Letter,
  Legal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Orientation {
  Portrait,
  Landscape,
}

impl PaperSize {
  /// `(width, height)` in millimetres for `orientation`.
  pub fn dimensions_mm(self, orientation: Orientation) -> (f32, f32) {
    let (w, h) = match self {
      Self::A4 => (210.0, 297.0),
      Self::Letter => (215.9, 279.4),
      Self::Legal => (215.9, 355.6),
    };
    match orientation {
      Orientation::Portrait => (w, h),
      Orientation::Landscape => (h, w),
    }
  }
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
  pub top:    f32,
  pub right:  f32,
  pub bottom: f32,
  pub left:   f32,
}

impl Margins {
  pub const fn uniform(mm: f32) -> Self {
    Self { top: mm, right: mm, bottom: mm, left: mm }
  }
}

// ─── Color ───────────────────────────────────────────────────────────────────

/// A CSS-style hex color, e.g. `#1a1a1a` or `#fff`.
///
/// Stored as written; no contrast checks or derivation happen anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub String);

impl Color {
  pub fn new(hex: impl Into<String>) -> Self { Self(hex.into()) }

  pub fn as_str(&self) -> &str { &self.0 }

  /// Parse into 8-bit RGB components. `None` if not a 3- or 6-digit hex.
  pub fn rgb(&self) -> Option<(u8, u8, u8)> {
    let hex = self.0.trim().strip_prefix('#')?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
      return None;
    }
    match hex.len() {
      6 => {
        let c = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some((c(0)?, c(2)?, c(4)?))
      }
      3 => {
        let c = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
        Some((c(0)?, c(1)?, c(2)?))
      }
      _ => None,
    }
  }

  pub fn is_valid(&self) -> bool { self.rgb().is_some() }

  /// RGB as fractions in `0.0..=1.0`, black when unparseable.
  pub fn rgb_unit(&self) -> (f32, f32, f32) {
    let (r, g, b) = self.rgb().unwrap_or((0, 0, 0));
    (f32::from(r) / 255.0, f32::from(g) / 255.0, f32::from(b) / 255.0)
  }
}

impl From<&str> for Color {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

// ─── Custom fields ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomFieldKind {
  Text,
  Number,
  Date,
  Select,
}

/// Where on the document a custom field is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomFieldPosition {
  Header,
  Footer,
  Items,
  Totals,
}

/// An extra labelled value printed on documents, e.g. a PO number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
  pub id:            String,
  pub name:          String,
  pub label:         String,
  #[serde(rename = "type")]
  pub kind:          CustomFieldKind,
  #[serde(default)]
  pub required:      bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options:       Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default_value: Option<String>,
  pub position:      CustomFieldPosition,
  pub order:         u32,
}

// ─── Settings ────────────────────────────────────────────────────────────────

/// Every rendering toggle and value a template controls.
///
/// A `show_*` flag only permits a section; the section is still omitted
/// when the data backing it is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSettings {
  // layout
  pub header_layout:           HeaderLayout,
  pub footer_layout:           FooterLayout,
  pub logo_position:           LogoPosition,
  pub company_info_position:   CompanyInfoPosition,

  // color
  pub primary_color:           Color,
  pub secondary_color:         Color,
  pub accent_color:            Color,
  pub background_color:        Color,
  pub text_color:              Color,
  pub border_color:            Color,
  pub header_background_color: Color,
  pub header_text_color:       Color,

  // typography
  pub header_font:             FontFamily,
  pub body_font:               FontFamily,
  pub font_size:               FontSize,

  pub table_style:             TableStyle,

  // paper
  pub paper_size:              PaperSize,
  pub orientation:             Orientation,
  pub margins:                 Margins,

  // field visibility
  pub show_logo:               bool,
  pub show_company_info:       bool,
  pub show_customer_info:      bool,
  pub show_payment_info:       bool,
  pub show_tax_id:             bool,
  pub show_registration_number: bool,
  pub show_due_date:           bool,
  pub show_bank_info:          bool,
  pub show_terms:              bool,
  pub show_notes:              bool,

  pub show_watermark:          bool,
  #[serde(default)]
  pub watermark_text:          String,
  pub show_page_numbers:       bool,

  #[serde(default)]
  pub show_custom_fields:      bool,
  #[serde(default)]
  pub custom_fields:           Vec<CustomField>,
}

impl TemplateSettings {
  /// Every color setting paired with its wire name.
  pub fn colors(&self) -> [(&'static str, &Color); 8] {
    [
      ("primaryColor", &self.primary_color),
      ("secondaryColor", &self.secondary_color),
      ("accentColor", &self.accent_color),
      ("backgroundColor", &self.background_color),
      ("textColor", &self.text_color),
      ("borderColor", &self.border_color),
      ("headerBackgroundColor", &self.header_background_color),
      ("headerTextColor", &self.header_text_color),
    ]
  }

  /// The watermark text, when watermarking is on and the text is non-blank.
  pub fn watermark(&self) -> Option<&str> {
    let text = self.watermark_text.trim();
    (self.show_watermark && !text.is_empty()).then_some(text)
  }

  /// Custom fields at `position` in display order, or none when disabled.
  pub fn custom_fields_at(&self, position: CustomFieldPosition) -> Vec<&CustomField> {
    if !self.show_custom_fields {
      return Vec::new();
    }
    let mut fields: Vec<_> = self
      .custom_fields
      .iter()
      .filter(|f| f.position == position)
      .collect();
    fields.sort_by_key(|f| f.order);
    fields
  }
}

// ─── DocumentTemplate ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTemplate {
  pub id:          String,
  pub name:        String,
  #[serde(default)]
  pub description: String,
  /// Built-in presets carry `true`; they can be neither saved nor deleted.
  pub is_default:  bool,
  pub settings:    TemplateSettings,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl DocumentTemplate {
  /// A new custom template whose settings are copied from `base`.
  pub fn clone_from_base(
    name: impl Into<String>,
    description: impl Into<String>,
    base: &DocumentTemplate,
  ) -> Self {
    let now = Utc::now();
    Self {
      id: format!("template-{}", Uuid::new_v4()),
      name: name.into(),
      description: description.into(),
      is_default: false,
      settings: base.settings.clone(),
      created_at: now,
      updated_at: now,
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.is_default || is_preset_id(&self.id) {
      return Err(Error::DefaultTemplateImmutable(self.id.clone()));
    }
    if self.name.trim().is_empty() {
      return Err(Error::validation("template name is required"));
    }
    if let Some((field, color)) = self.settings.colors().into_iter().find(|(_, c)| !c.is_valid()) {
      return Err(Error::validation(format!(
        "{field} must be a 3- or 6-digit hex color, got {:?}",
        color.as_str()
      )));
    }
    Ok(())
  }
}

// ─── Presets ─────────────────────────────────────────────────────────────────

pub const MODERN_STANDARD: &str = "modern-standard";
pub const CLASSIC_PROFESSIONAL: &str = "classic-professional";
pub const MINIMAL_CLEAN: &str = "minimal-clean";
pub const CREATIVE_MODERN: &str = "creative-modern";

pub fn is_preset_id(id: &str) -> bool {
  matches!(id, MODERN_STANDARD | CLASSIC_PROFESSIONAL | MINIMAL_CLEAN | CREATIVE_MODERN)
}

fn preset(id: &str, name: &str, description: &str, settings: TemplateSettings) -> DocumentTemplate {
  DocumentTemplate {
    id: id.to_owned(),
    name: name.to_owned(),
    description: description.to_owned(),
    is_default: true,
    settings,
    created_at: DateTime::<Utc>::UNIX_EPOCH,
    updated_at: DateTime::<Utc>::UNIX_EPOCH,
  }
}

fn modern_standard() -> TemplateSettings {
  TemplateSettings {
    header_layout: HeaderLayout::Modern,
    footer_layout: FooterLayout::Detailed,
    logo_position: LogoPosition::TopLeft,
    company_info_position: CompanyInfoPosition::Right,
    primary_color: "#1a1a1a".into(),
    secondary_color: "#64748b".into(),
    accent_color: "#3b82f6".into(),
    background_color: "#ffffff".into(),
    text_color: "#333333".into(),
    border_color: "#e5e7eb".into(),
    header_background_color: "#f8fafc".into(),
    header_text_color: "#1a1a1a".into(),
    header_font: FontFamily::Inter,
    body_font: FontFamily::Inter,
    font_size: FontSize::Medium,
    table_style: TableStyle::Borders,
    paper_size: PaperSize::A4,
    orientation: Orientation::Portrait,
    margins: Margins::uniform(20.0),
    show_logo: true,
    show_company_info: true,
    show_customer_info: true,
    show_payment_info: true,
    show_tax_id: true,
    show_registration_number: false,
    show_due_date: true,
    show_bank_info: false,
    show_terms: true,
    show_notes: true,
    show_watermark: false,
    watermark_text: String::new(),
    show_page_numbers: true,
    show_custom_fields: false,
    custom_fields: Vec::new(),
  }
}

fn classic_professional() -> TemplateSettings {
  TemplateSettings {
    header_layout: HeaderLayout::Classic,
    footer_layout: FooterLayout::Simple,
    logo_position: LogoPosition::TopCenter,
    company_info_position: CompanyInfoPosition::Left,
    primary_color: "#1f2937".into(),
    secondary_color: "#374151".into(),
    accent_color: "#dc2626".into(),
    background_color: "#ffffff".into(),
    text_color: "#000000".into(),
    border_color: "#000000".into(),
    header_background_color: "#ffffff".into(),
    header_text_color: "#000000".into(),
    header_font: FontFamily::TimesNewRoman,
    body_font: FontFamily::TimesNewRoman,
    font_size: FontSize::Medium,
    table_style: TableStyle::Striped,
    paper_size: PaperSize::A4,
    orientation: Orientation::Portrait,
    margins: Margins::uniform(25.0),
    show_logo: true,
    show_company_info: true,
    show_customer_info: true,
    show_payment_info: true,
    show_tax_id: true,
    show_registration_number: true,
    show_due_date: true,
    show_bank_info: true,
    show_terms: true,
    show_notes: true,
    show_watermark: true,
    watermark_text: "DRAFT".to_owned(),
    show_page_numbers: true,
    show_custom_fields: false,
    custom_fields: Vec::new(),
  }
}

fn minimal_clean() -> TemplateSettings {
  TemplateSettings {
    header_layout: HeaderLayout::Minimal,
    footer_layout: FooterLayout::None,
    logo_position: LogoPosition::None,
    company_info_position: CompanyInfoPosition::Hidden,
    primary_color: "#000000".into(),
    secondary_color: "#666666".into(),
    accent_color: "#999999".into(),
    background_color: "#ffffff".into(),
    text_color: "#000000".into(),
    border_color: "#cccccc".into(),
    header_background_color: "#ffffff".into(),
    header_text_color: "#000000".into(),
    header_font: FontFamily::Arial,
    body_font: FontFamily::Arial,
    font_size: FontSize::Small,
    table_style: TableStyle::Minimal,
    paper_size: PaperSize::A4,
    orientation: Orientation::Portrait,
    margins: Margins::uniform(15.0),
    show_logo: false,
    show_company_info: false,
    show_customer_info: true,
    show_payment_info: false,
    show_tax_id: false,
    show_registration_number: false,
    show_due_date: false,
    show_bank_info: false,
    show_terms: false,
    show_notes: false,
    show_watermark: false,
    watermark_text: String::new(),
    show_page_numbers: false,
    show_custom_fields: false,
    custom_fields: Vec::new(),
  }
}

fn creative_modern() -> TemplateSettings {
  let header_field = |id: &str, label: &str, order: u32| CustomField {
    id: id.to_owned(),
    name: label.to_owned(),
    label: label.to_owned(),
    kind: CustomFieldKind::Text,
    required: false,
    options: None,
    default_value: None,
    position: CustomFieldPosition::Header,
    order,
  };

  TemplateSettings {
    header_layout: HeaderLayout::Modern,
    footer_layout: FooterLayout::Detailed,
    logo_position: LogoPosition::TopRight,
    company_info_position: CompanyInfoPosition::Left,
    primary_color: "#6366f1".into(),
    secondary_color: "#a78bfa".into(),
    accent_color: "#f59e0b".into(),
    background_color: "#fef3c7".into(),
    text_color: "#1f2937".into(),
    border_color: "#e5e7eb".into(),
    header_background_color: "#6366f1".into(),
    header_text_color: "#ffffff".into(),
    header_font: FontFamily::Inter,
    body_font: FontFamily::Inter,
    font_size: FontSize::Large,
    table_style: TableStyle::Borders,
    paper_size: PaperSize::A4,
    orientation: Orientation::Portrait,
    margins: Margins::uniform(30.0),
    show_logo: true,
    show_company_info: true,
    show_customer_info: true,
    show_payment_info: true,
    show_tax_id: true,
    show_registration_number: false,
    show_due_date: true,
    show_bank_info: false,
    show_terms: true,
    show_notes: true,
    show_watermark: false,
    watermark_text: String::new(),
    show_page_numbers: true,
    show_custom_fields: true,
    custom_fields: vec![
      header_field("po-number", "PO Number", 1),
      header_field("department", "Department", 2),
    ],
  }
}

/// The four built-in templates, in their canonical order.
pub fn presets() -> Vec<DocumentTemplate> {
  vec![
    preset(
      MODERN_STANDARD,
      "Modern Standard",
      "Clean, professional layout with modern styling",
      modern_standard(),
    ),
    preset(
      CLASSIC_PROFESSIONAL,
      "Classic Professional",
      "Traditional business document with formal styling",
      classic_professional(),
    ),
    preset(
      MINIMAL_CLEAN,
      "Minimal Clean",
      "Simple, clean layout with minimal styling",
      minimal_clean(),
    ),
    preset(
      CREATIVE_MODERN,
      "Creative Modern",
      "Modern layout with creative styling and colors",
      creative_modern(),
    ),
  ]
}

/// The template used when no active template has been chosen.
pub fn fallback_template() -> DocumentTemplate {
  preset(
    MODERN_STANDARD,
    "Modern Standard",
    "Clean, professional layout with modern styling",
    modern_standard(),
  )
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn fallback_is_first_preset() {
    assert_eq!(presets()[0], fallback_template());
    assert_eq!(fallback_template().id, MODERN_STANDARD);
  }

  #[test]
  fn presets_are_immutable_defaults() {
    for t in presets() {
      assert!(t.is_default);
      assert!(is_preset_id(&t.id));
      assert!(matches!(t.validate(), Err(Error::DefaultTemplateImmutable(_))));
    }
  }

  #[test]
  fn clone_from_base_copies_settings_only() {
    let base = &presets()[1];
    let custom = DocumentTemplate::clone_from_base("Mine", "copy", base);
    assert!(!custom.is_default);
    assert_ne!(custom.id, base.id);
    assert_eq!(custom.settings, base.settings);
    assert!(custom.validate().is_ok());
  }

  #[test]
  fn settings_use_camel_case_wire_names() {
    let json = serde_json::to_value(&presets()[3].settings).unwrap();
    assert_eq!(json["logoPosition"], "top-right");
    assert_eq!(json["companyInfoPosition"], "left");
    assert_eq!(json["paperSize"], "a4");
    assert_eq!(json["margins"]["top"], 30.0);
    assert_eq!(json["customFields"][0]["type"], "text");

    let classic = serde_json::to_value(&presets()[1].settings).unwrap();
    assert_eq!(classic["headerFont"], "Times New Roman");
  }

  #[test]
  fn non_hex_colors_fail_validation() {
    let mut custom = DocumentTemplate::clone_from_base("Mine", "", &presets()[0]);
    custom.settings.header_text_color = Color::from("#FFF");
    assert!(custom.validate().is_ok());

    custom.settings.primary_color = Color::from("red}</style><script>alert(1)</script><style>");
    let err = custom.validate().unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(err.to_string().contains("primaryColor"));

    custom.settings.primary_color = Color::from("#6366f1");
    custom.settings.border_color = Color::from("blue");
    assert!(custom.validate().is_err());
  }

  #[test]
  fn color_parsing() {
    assert_eq!(Color::from("#6366f1").rgb(), Some((0x63, 0x66, 0xf1)));
    assert_eq!(Color::from("#fff").rgb(), Some((255, 255, 255)));
    assert_eq!(Color::from("red").rgb(), None);
    assert_eq!(Color::from("#12345").rgb(), None);
    assert_eq!(Color::from("#+f+f+f").rgb(), None);
    assert_eq!(Color::from("nope").rgb_unit(), (0.0, 0.0, 0.0));
  }

  #[test]
  fn paper_dimensions_swap_for_landscape() {
    assert_eq!(PaperSize::A4.dimensions_mm(Orientation::Portrait), (210.0, 297.0));
    assert_eq!(PaperSize::Legal.dimensions_mm(Orientation::Landscape), (355.6, 215.9));
  }

  #[test]
  fn font_names_parse() {
    assert_eq!(FontFamily::from_str("Times New Roman").unwrap(), FontFamily::TimesNewRoman);
    assert!(FontFamily::Georgia.is_serif());
    assert_eq!(FontSize::Large.heading_pt(), 36.0);
  }

  #[test]
  fn watermark_requires_flag_and_text() {
    let mut s = presets()[1].settings.clone();
    assert_eq!(s.watermark(), Some("DRAFT"));
    s.watermark_text = "  ".into();
    assert_eq!(s.watermark(), None);
    s.watermark_text = "PAID".into();
    s.show_watermark = false;
    assert_eq!(s.watermark(), None);
  }

  #[test]
  fn custom_fields_are_ordered_and_gated() {
    let mut s = presets()[3].settings.clone();
    let ids: Vec<_> = s
      .custom_fields_at(CustomFieldPosition::Header)
      .iter()
      .map(|f| f.id.as_str())
      .collect();
    assert_eq!(ids, ["po-number", "department"]);
    s.show_custom_fields = false;
    assert!(s.custom_fields_at(CustomFieldPosition::Header).is_empty());
  }
}

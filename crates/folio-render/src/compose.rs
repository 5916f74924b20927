//! The layout engine: document + template + profile → [`PagedDocument`].
//!
//! Layout is a single top-to-bottom pass with a vertical cursor. Before any
//! block is placed the engine checks whether it still fits above the bottom
//! limit and starts a fresh page if not. Per-page decorations (background,
//! watermark) are laid down when a page is opened; footers and page numbers
//! are stamped once the final page count is known.

use std::sync::Arc;

use folio_core::{
  document::{Amounts, Document},
  format::{format_currency, format_date, format_quantity, format_rate},
  profile::CompanyProfile,
  template::{
    CompanyInfoPosition, CustomField, CustomFieldPosition, DocumentTemplate, FooterLayout,
    HeaderLayout, LogoPosition, TableStyle, TemplateSettings,
  },
};

use crate::{
  layout::{Align, Element, Fill, Font, ImageBox, Page, PagedDocument, Rgb, Rule, TextRun, Watermark},
  logo::{decode_logo, RasterImage},
  text::{line_height, wrap, PT_TO_MM},
};

const SECTION_GAP: f32 = 6.0;
const RULE_GAP: f32 = 4.0;
const CELL_PAD: f32 = 1.5;
const LOGO_HEIGHT: f32 = 20.0;
const LOGO_MAX_WIDTH: f32 = 50.0;
const DETAILS_WIDTH: f32 = 70.0;
const TOTALS_WIDTH: f32 = 60.0;
const WATERMARK_SIZE: f32 = 72.0;

/// Lay out `document` with `template`. `profile` may be absent, in which case
/// every company-derived section is skipped.
pub fn render(
  document: &Document,
  template: &DocumentTemplate,
  profile: Option<&CompanyProfile>,
) -> PagedDocument {
  let mut c = Composer::new(&template.settings);

  c.company_header(profile);
  c.title(document.title());
  c.parties(document);
  c.items_table(document);
  c.totals(document.amounts());
  c.field_lines(document, CustomFieldPosition::Totals);
  if let Some(profile) = profile {
    c.closing_blocks(profile);
  }
  c.field_lines(document, CustomFieldPosition::Footer);

  let doc = c.finish(profile);
  tracing::debug!(
    document = document.id(),
    template = %template.id,
    pages = doc.page_count(),
    "laid out document"
  );
  doc
}

/// The value to print for a custom field: the document's own value, else
/// the field default. Blank values count as absent.
fn field_value<'d>(document: &'d Document, field: &'d CustomField) -> Option<&'d str> {
  fn non_blank(v: &str) -> Option<&str> { Some(v.trim()).filter(|v| !v.is_empty()) }
  document
    .custom_fields()
    .get(&field.id)
    .map(String::as_str)
    .and_then(non_blank)
    .or_else(|| field.default_value.as_deref().and_then(non_blank))
}

fn logo_size(image: &RasterImage) -> (f32, f32) {
  let w = LOGO_HEIGHT * image.aspect();
  if w > LOGO_MAX_WIDTH {
    (LOGO_MAX_WIDTH, LOGO_MAX_WIDTH / image.aspect())
  } else {
    (w, LOGO_HEIGHT)
  }
}

/// One line of a text column: content, point size, bold.
type Line = (String, f32, bool);

struct Composer<'a> {
  s:       &'a TemplateSettings,
  width:   f32,
  height:  f32,
  left:    f32,
  right:   f32,
  top:     f32,
  /// Lowest baseline content may reach; footers live below it.
  bottom:  f32,
  y:       f32,
  pages:   Vec<Page>,
  body:    f32,
  text:    Rgb,
  border:  Rgb,
  primary: Rgb,
}

impl<'a> Composer<'a> {
  fn new(s: &'a TemplateSettings) -> Self {
    let (width, height) = s.paper_size.dimensions_mm(s.orientation);
    let footer_reserve = match s.footer_layout {
      FooterLayout::None => 0.0,
      FooterLayout::Simple => 8.0,
      FooterLayout::Detailed => 12.0,
    };
    let mut c = Self {
      s,
      width,
      height,
      left: s.margins.left,
      right: width - s.margins.right,
      top: s.margins.top,
      bottom: height - s.margins.bottom - footer_reserve,
      y: s.margins.top,
      pages: Vec::new(),
      body: s.font_size.body_pt(),
      text: Rgb::from(&s.text_color),
      border: Rgb::from(&s.border_color),
      primary: Rgb::from(&s.primary_color),
    };
    c.new_page();
    c
  }

  // ── Page handling ────────────────────────────────────────────────────────

  fn new_page(&mut self) {
    let mut page = Page::default();
    let background = Rgb::from(&self.s.background_color);
    if !background.is_white() {
      page.elements.push(Element::Fill(Fill {
        x:     0.0,
        y:     0.0,
        w:     self.width,
        h:     self.height,
        color: background,
      }));
    }
    if let Some(text) = self.s.watermark() {
      page.elements.push(Element::Watermark(Watermark {
        text:  text.to_owned(),
        size:  WATERMARK_SIZE,
        angle: 45.0,
        color: Rgb::gray(0.88),
      }));
    }
    self.pages.push(page);
    self.y = self.top;
  }

  /// Break to a new page unless `height` fits above the bottom limit.
  /// Returns whether a break happened. A block taller than a whole page is
  /// placed anyway rather than looping.
  fn ensure(&mut self, height: f32) -> bool {
    if self.y + height > self.bottom && self.y > self.top {
      self.new_page();
      return true;
    }
    false
  }

  fn push(&mut self, element: Element) {
    if let Some(page) = self.pages.last_mut() {
      page.elements.push(element);
    }
  }

  fn content_width(&self) -> f32 { self.right - self.left }

  fn body_font(&self, bold: bool) -> Font { Font::new(self.s.body_font, bold) }

  fn text_at(&mut self, x: f32, y: f32, text: impl Into<String>, size: f32, font: Font, color: Rgb, align: Align) {
    self.push(Element::Text(TextRun { x, y, text: text.into(), size, font, color, align }));
  }

  /// Place one line at the cursor and advance past it.
  fn write_line(&mut self, x: f32, align: Align, text: &str, size: f32, font: Font, color: Rgb) {
    let lh = line_height(size);
    self.ensure(lh);
    let baseline = self.y + size * PT_TO_MM;
    self.text_at(x, baseline, text, size, font, color, align);
    self.y += lh;
  }

  fn hrule(&mut self, x1: f32, x2: f32, width: f32, color: Rgb) {
    let y = self.y;
    self.push(Element::Rule(Rule { x1, y1: y, x2, y2: y, width, color }));
  }

  fn separator(&mut self, width: f32) {
    self.ensure(RULE_GAP);
    self.y += RULE_GAP / 2.0;
    self.hrule(self.left, self.right, width, self.border);
    self.y += RULE_GAP;
  }

  // ── Header: logo, company info, first separator ─────────────────────────

  fn company_lines(&self, profile: &CompanyProfile) -> Vec<Line> {
    let mut lines = Vec::new();
    let name = profile.company_name.trim();
    if !name.is_empty() {
      lines.push((name.to_owned(), self.body + 4.0, true));
    }
    for line in profile.address_lines().into_iter().chain(profile.contact_lines()) {
      lines.push((line, self.body, false));
    }
    lines
  }

  fn company_header(&mut self, profile: Option<&CompanyProfile>) {
    let s = self.s;
    let logo = profile
      .filter(|_| s.show_logo && s.logo_position != LogoPosition::None)
      .and_then(CompanyProfile::logo)
      .and_then(decode_logo)
      .map(Arc::new);
    let info = profile
      .filter(|_| s.show_company_info && s.company_info_position != CompanyInfoPosition::Hidden)
      .map(|p| self.company_lines(p))
      .filter(|lines| !lines.is_empty());

    let side_by_side = logo.is_some()
      && info.is_some()
      && matches!(
        (s.logo_position, s.company_info_position),
        (LogoPosition::TopLeft, CompanyInfoPosition::Right)
          | (LogoPosition::TopRight, CompanyInfoPosition::Left)
      );

    let page = self.pages.len();
    let mut logo_bottom = self.y;
    if let Some(image) = logo {
      let (w, h) = logo_size(&image);
      self.ensure(h);
      let x = match s.logo_position {
        LogoPosition::TopCenter => (self.left + self.right - w) / 2.0,
        LogoPosition::TopRight => self.right - w,
        LogoPosition::TopLeft | LogoPosition::None => self.left,
      };
      let y = self.y;
      self.push(Element::Image(ImageBox { x, y, w, h, image }));
      logo_bottom = y + h;
      if !side_by_side {
        self.y = logo_bottom + RULE_GAP;
      }
    }

    if let Some(lines) = info {
      let (x, align) = match s.company_info_position {
        CompanyInfoPosition::Right => (self.right, Align::Right),
        _ => (self.left, Align::Left),
      };
      for (line, size, bold) in lines {
        let font = self.body_font(bold);
        self.write_line(x, align, &line, size, font, self.text);
      }
    }

    if side_by_side && self.pages.len() == page {
      self.y = self.y.max(logo_bottom);
    }
    self.separator(0.5);
  }

  // ── Title ────────────────────────────────────────────────────────────────

  fn title(&mut self, title: &str) {
    let s = self.s;
    let size = s.font_size.heading_pt();
    let font = Font::new(s.header_font, true);
    let lh = line_height(size);
    let center = (self.left + self.right) / 2.0;

    match s.header_layout {
      HeaderLayout::Classic => {
        self.ensure(lh + RULE_GAP * 2.0);
        self.write_line(center, Align::Center, title, size, font, self.primary);
        self.separator(0.5);
      }
      HeaderLayout::Modern => {
        let band = lh + CELL_PAD * 2.0;
        self.ensure(band + RULE_GAP * 2.0);
        self.push(Element::Fill(Fill {
          x:     self.left,
          y:     self.y,
          w:     self.content_width(),
          h:     band,
          color: Rgb::from(&s.header_background_color),
        }));
        let baseline = self.y + CELL_PAD + size * PT_TO_MM;
        self.text_at(center, baseline, title, size, font, Rgb::from(&s.header_text_color), Align::Center);
        self.y += band;
        self.separator(0.5);
      }
      HeaderLayout::Minimal => {
        self.ensure(lh + RULE_GAP * 2.0);
        self.write_line(self.left, Align::Left, title, size, font, self.text);
        self.separator(0.2);
      }
    }
    self.y += SECTION_GAP / 2.0;
  }

  // ── Bill-to and details ──────────────────────────────────────────────────

  fn parties(&mut self, document: &Document) {
    let body = self.body;
    let column = self.content_width() / 2.0 - 5.0;

    let mut bill_to: Vec<Line> = Vec::new();
    if self.s.show_customer_info {
      bill_to.push(("Bill To:".to_owned(), body + 1.0, true));
      for line in wrap(document.customer_name(), column, body + 2.0, true) {
        bill_to.push((line, body + 2.0, true));
      }
      for line in wrap(document.customer_contact(), column, body, false) {
        bill_to.push((line, body, false));
      }
    }

    let mut details: Vec<Line> = vec![(format!("{} Details:", document.kind_label()), body + 1.0, true)];
    let detail = |text: String| (text, body, false);
    match document {
      Document::Quotation(q) => {
        details.push(detail(format!("Date: {}", format_date(q.quotation_date))));
      }
      Document::Invoice(i) => {
        details.push(detail(format!("Invoice #: {}", i.invoice_number)));
        details.push(detail(format!("Date: {}", format_date(i.invoice_date))));
        if self.s.show_due_date {
          if let Some(due) = i.due_date {
            details.push(detail(format!("Due Date: {}", format_date(due))));
          }
        }
      }
    }
    details.push(detail(format!("Status: {}", document.status_label().to_uppercase())));
    for field in self.s.custom_fields_at(CustomFieldPosition::Header) {
      if let Some(value) = field_value(document, field) {
        details.push(detail(format!("{}: {value}", field.label)));
      }
    }

    let column_height = |lines: &[Line]| lines.iter().map(|(_, size, _)| line_height(*size)).sum::<f32>();
    self.ensure(column_height(&bill_to).max(column_height(&details)));

    let start = self.y;
    for (line, size, bold) in &bill_to {
      let font = self.body_font(*bold);
      self.write_line(self.left, Align::Left, line, *size, font, self.text);
    }
    let left_end = self.y;

    self.y = start;
    let x = self.right - DETAILS_WIDTH;
    for (line, size, bold) in &details {
      let font = self.body_font(*bold);
      self.write_line(x, Align::Left, line, *size, font, self.text);
    }

    self.y = self.y.max(left_end) + SECTION_GAP;
  }

  // ── Line items ───────────────────────────────────────────────────────────

  fn columns(&self) -> Columns {
    let w = self.content_width();
    Columns {
      desc_x:  self.left + CELL_PAD,
      desc_w:  w * 0.5 - CELL_PAD * 2.0,
      qty_x:   self.left + w * 0.64,
      price_x: self.left + w * 0.82,
      total_x: self.right - CELL_PAD,
    }
  }

  fn table_header(&mut self, cols: &Columns) {
    let s = self.s;
    let size = self.body;
    let h = line_height(size) + CELL_PAD * 2.0;
    let top = self.y;

    if s.table_style != TableStyle::Minimal {
      self.push(Element::Fill(Fill {
        x:     self.left,
        y:     top,
        w:     self.content_width(),
        h,
        color: Rgb::from(&s.header_background_color),
      }));
    }

    let font = self.body_font(true);
    let color = Rgb::from(&s.header_text_color);
    let baseline = top + CELL_PAD + size * PT_TO_MM;
    self.text_at(cols.desc_x, baseline, "Item Description", size, font, color, Align::Left);
    self.text_at(cols.qty_x, baseline, "Quantity", size, font, color, Align::Right);
    self.text_at(cols.price_x, baseline, "Unit Price", size, font, color, Align::Right);
    self.text_at(cols.total_x, baseline, "Total", size, font, color, Align::Right);

    self.y = top + h;
    match s.table_style {
      TableStyle::Borders => {
        self.push(Element::Rule(Rule { x1: self.left, y1: top, x2: self.right, y2: top, width: 0.3, color: self.border }));
        self.hrule(self.left, self.right, 0.3, self.border);
      }
      TableStyle::Striped => self.hrule(self.left, self.right, 0.3, self.border),
      TableStyle::Minimal => self.hrule(self.left, self.right, 0.2, self.border),
    }
  }

  fn items_table(&mut self, document: &Document) {
    let cols = self.columns();
    let body = self.body;
    let lh = line_height(body);
    let header_h = lh + CELL_PAD * 2.0;
    let items = document.amounts().items();

    let rows: Vec<Vec<String>> = items.iter().map(|i| wrap(i.name(), cols.desc_w, body, false)).collect();
    let row_height = |lines: &[String]| lines.len() as f32 * lh + CELL_PAD * 2.0;

    self.ensure(header_h + rows.first().map_or(0.0, |r| row_height(r)));
    self.table_header(&cols);

    let stripe = self.primary.lighten(0.92);
    for (index, (item, lines)) in items.iter().zip(&rows).enumerate() {
      let h = row_height(lines);
      if self.ensure(h) {
        self.table_header(&cols);
      }
      let top = self.y;

      if self.s.table_style == TableStyle::Striped && index % 2 == 1 {
        self.push(Element::Fill(Fill { x: self.left, y: top, w: self.content_width(), h, color: stripe }));
      }

      let font = self.body_font(false);
      let first = top + CELL_PAD + body * PT_TO_MM;
      for (n, line) in lines.iter().enumerate() {
        self.text_at(cols.desc_x, first + n as f32 * lh, line.as_str(), body, font, self.text, Align::Left);
      }
      self.text_at(cols.qty_x, first, format_quantity(item.quantity()), body, font, self.text, Align::Right);
      self.text_at(cols.price_x, first, format_currency(item.unit_price()), body, font, self.text, Align::Right);
      self.text_at(cols.total_x, first, format_currency(item.total()), body, font, self.text, Align::Right);

      self.y = top + h;
      if self.s.table_style == TableStyle::Borders {
        for x in [self.left, self.right] {
          self.push(Element::Rule(Rule { x1: x, y1: top, x2: x, y2: self.y, width: 0.3, color: self.border }));
        }
        self.hrule(self.left, self.right, 0.3, self.border);
      }
    }

    self.y += SECTION_GAP;
    self.field_lines(document, CustomFieldPosition::Items);
  }

  // ── Totals ───────────────────────────────────────────────────────────────

  fn totals(&mut self, amounts: &Amounts) {
    let body = self.body;
    let total_size = body + 2.0;
    let tax = match (amounts.tax_rate(), amounts.tax_amount()) {
      (Some(rate), Some(amount)) if !rate.is_zero() && !amount.is_zero() => Some((rate, amount)),
      _ => None,
    };

    let lines = if tax.is_some() { 2.0 } else { 1.0 };
    self.ensure(line_height(body) * lines + RULE_GAP + line_height(total_size));

    let label_x = self.right - TOTALS_WIDTH;
    self.pair(label_x, "Subtotal:", &format_currency(amounts.subtotal()), body, false, self.text);
    if let Some((rate, amount)) = tax {
      let label = format!("Tax ({}):", format_rate(rate));
      self.pair(label_x, &label, &format_currency(amount), body, false, self.text);
    }

    self.y += RULE_GAP / 4.0;
    self.hrule(label_x - 5.0, self.right, 0.6, self.primary);
    self.y += RULE_GAP * 0.75;
    self.pair(label_x, "Total:", &format_currency(amounts.total()), total_size, true, self.primary);
    self.y += SECTION_GAP;
  }

  fn pair(&mut self, label_x: f32, label: &str, value: &str, size: f32, bold: bool, color: Rgb) {
    let lh = line_height(size);
    self.ensure(lh);
    let font = self.body_font(bold);
    let baseline = self.y + size * PT_TO_MM;
    self.text_at(label_x, baseline, label, size, font, color, Align::Left);
    self.text_at(self.right, baseline, value, size, font, color, Align::Right);
    self.y += lh;
  }

  // ── Payment info, terms, notes, custom fields ────────────────────────────

  fn closing_blocks(&mut self, profile: &CompanyProfile) {
    let s = self.s;

    if s.show_payment_info {
      let mut lines = Vec::new();
      if s.show_bank_info && profile.has_bank_info() {
        let bank = [
          ("Bank", profile.bank_name()),
          ("Account", profile.bank_account()),
          ("Routing", profile.bank_routing()),
        ];
        for (label, value) in bank {
          if let Some(value) = value {
            lines.push(format!("{label}: {value}"));
          }
        }
      }
      if s.show_tax_id {
        if let Some(tax_id) = profile.tax_id() {
          lines.push(format!("Tax ID: {tax_id}"));
        }
      }
      if s.show_registration_number {
        if let Some(reg) = profile.registration_number() {
          lines.push(format!("Registration No: {reg}"));
        }
      }
      self.labeled_block("Payment Information:", &lines);
    }

    if s.show_terms {
      if let Some(terms) = profile.payment_terms() {
        self.labeled_block("Payment Terms:", &[terms.to_owned()]);
      }
    }

    if s.show_notes {
      if let Some(notes) = profile.notes() {
        self.labeled_block("Notes:", &[notes.to_owned()]);
      }
    }
  }

  /// A bold heading followed by wrapped lines. Nothing when `lines` is empty.
  fn labeled_block(&mut self, heading: &str, lines: &[String]) {
    if lines.is_empty() {
      return;
    }
    let body = self.body;
    self.ensure(line_height(body) * 2.0);
    let bold = self.body_font(true);
    let regular = self.body_font(false);
    self.write_line(self.left, Align::Left, heading, body, bold, self.text);
    for line in lines {
      for wrapped in wrap(line, self.content_width(), body, false) {
        self.write_line(self.left, Align::Left, &wrapped, body, regular, self.text);
      }
    }
    self.y += SECTION_GAP / 2.0;
  }

  /// `Label: value` lines for the custom fields at `position`.
  fn field_lines(&mut self, document: &Document, position: CustomFieldPosition) {
    let fields = self.s.custom_fields_at(position);
    let lines: Vec<String> = fields
      .into_iter()
      .filter_map(|f| field_value(document, f).map(|v| format!("{}: {v}", f.label)))
      .collect();
    if lines.is_empty() {
      return;
    }
    let font = self.body_font(false);
    for line in &lines {
      self.write_line(self.left, Align::Left, line, self.body, font, self.text);
    }
    self.y += SECTION_GAP / 2.0;
  }

  // ── Footers and page numbers ─────────────────────────────────────────────

  fn footer_lines(&self, profile: Option<&CompanyProfile>) -> Vec<String> {
    let Some(profile) = profile else {
      return Vec::new();
    };
    let name = profile.company_name.trim();
    let mut lines = Vec::new();
    if !name.is_empty() {
      lines.push(name.to_owned());
    }
    if self.s.footer_layout == FooterLayout::Detailed {
      let contact = profile.contact_lines().join("  |  ");
      if !contact.is_empty() {
        lines.push(contact);
      }
    }
    lines
  }

  fn finish(mut self, profile: Option<&CompanyProfile>) -> PagedDocument {
    let s = self.s;
    let footer = match s.footer_layout {
      FooterLayout::None => Vec::new(),
      FooterLayout::Simple | FooterLayout::Detailed => self.footer_lines(profile),
    };
    let size = self.body - 1.0;
    let font = self.body_font(false);
    let muted = Rgb::from(&s.secondary_color);
    let center = self.width / 2.0;
    let total = self.pages.len();

    for (index, page) in self.pages.iter_mut().enumerate() {
      if !footer.is_empty() {
        let rule_y = self.bottom + 1.0;
        page.elements.push(Element::Rule(Rule {
          x1:    self.left,
          y1:    rule_y,
          x2:    self.right,
          y2:    rule_y,
          width: 0.2,
          color: self.border,
        }));
        let mut y = rule_y + 1.0;
        for line in &footer {
          y += line_height(size);
          page.elements.push(Element::Text(TextRun {
            x: center,
            y,
            text: line.clone(),
            size,
            font,
            color: muted,
            align: Align::Center,
          }));
        }
      }

      if s.show_page_numbers {
        page.elements.push(Element::Text(TextRun {
          x: center,
          y: self.height - s.margins.bottom / 2.0,
          text: format!("Page {} of {total}", index + 1),
          size,
          font,
          color: muted,
          align: Align::Center,
        }));
      }
    }

    PagedDocument {
      width:   self.width,
      height:  self.height,
      margins: s.margins,
      pages:   self.pages,
    }
  }
}

struct Columns {
  desc_x:  f32,
  desc_w:  f32,
  qty_x:   f32,
  price_x: f32,
  total_x: f32,
}

#[cfg(test)]
mod tests {
  use base64::{engine::general_purpose, Engine as _};
  use chrono::NaiveDate;
  use folio_core::{
    document::{Invoice, Quotation, QuotationItem},
    template::{self, presets, CustomFieldKind},
  };
  use rust_decimal_macros::dec;

  use super::*;

  fn date() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 3, 5).unwrap() }

  fn quotation(items: usize) -> Document {
    let items = (0..items)
      .map(|n| QuotationItem::new(format!("Line item {n}"), dec!(2), dec!(50)))
      .collect();
    Quotation::new("Jane Doe", "jane@example.com", date(), Amounts::new(items, Some(dec!(10)))).into()
  }

  fn invoice() -> Document {
    let amounts = Amounts::new(vec![QuotationItem::new("Design", dec!(1), dec!(100))], Some(dec!(10)));
    let mut inv = Invoice::new("INV-007", "Jane Doe", "jane@example.com", date(), amounts);
    inv.due_date = NaiveDate::from_ymd_opt(2024, 4, 4);
    inv.into()
  }

  fn profile() -> CompanyProfile {
    let mut p = CompanyProfile::new("Acme Studio");
    p.company_city = "Springfield".into();
    p.company_email = "hello@acme.test".into();
    p.bank_name = Some("First Federal".into());
    p.bank_account = Some("123456789".into());
    p.bank_routing = Some("021000021".into());
    p.tax_id = Some("TX-99".into());
    p.payment_terms = Some("Net 30".into());
    p.notes = Some("Thank you for your business.".into());
    p
  }

  fn template_with(edit: impl FnOnce(&mut TemplateSettings)) -> DocumentTemplate {
    let mut t = template::fallback_template();
    edit(&mut t.settings);
    t
  }

  #[test]
  fn renders_core_sections() {
    let doc = render(&invoice(), &template::fallback_template(), Some(&profile()));
    let text = doc.plain_text();
    for expected in [
      "Acme Studio",
      "INVOICE",
      "Bill To:",
      "Jane Doe",
      "Invoice #: INV-007",
      "Date: March 5, 2024",
      "Due Date: April 4, 2024",
      "Status: DRAFT",
      "Design",
      "$100.00",
      "Tax (10%):",
      "$110.00",
      "Tax ID: TX-99",
      "Net 30",
      "Thank you for your business.",
    ] {
      assert!(text.contains(expected), "missing {expected:?} in:\n{text}");
    }
    assert_eq!((doc.width, doc.height), (210.0, 297.0));
  }

  #[test]
  fn bank_info_is_suppressed_when_disabled() {
    let t = template_with(|s| {
      s.show_payment_info = true;
      s.show_bank_info = false;
    });
    let text = render(&invoice(), &t, Some(&profile())).plain_text();
    assert!(!text.contains("First Federal"));
    assert!(!text.contains("123456789"));
    assert!(!text.contains("021000021"));
    assert!(!text.contains("Bank:"));

    let t = template_with(|s| {
      s.show_payment_info = true;
      s.show_bank_info = true;
    });
    let text = render(&invoice(), &t, Some(&profile())).plain_text();
    assert!(text.contains("Bank: First Federal"));
    assert!(text.contains("Routing: 021000021"));
  }

  #[test]
  fn blank_bank_details_leave_no_payment_block() {
    let t = template_with(|s| {
      s.show_payment_info = true;
      s.show_bank_info = true;
      s.show_tax_id = false;
      s.show_registration_number = false;
    });
    let mut p = profile();
    p.bank_name = Some("  ".into());
    p.bank_account = None;
    p.bank_routing = Some(String::new());
    let text = render(&invoice(), &t, Some(&p)).plain_text();
    assert!(!text.contains("Payment Information"));
    assert!(!text.contains("Bank:"));
  }

  #[test]
  fn due_date_omitted_when_hidden_or_absent() {
    let t = template_with(|s| s.show_due_date = false);
    assert!(!render(&invoice(), &t, None).plain_text().contains("Due Date"));

    let q = render(&quotation(1), &template::fallback_template(), None).plain_text();
    assert!(q.contains("QUOTATION"));
    assert!(!q.contains("Due Date"));
  }

  #[test]
  fn tax_line_needs_a_rate() {
    let amounts = Amounts::new(vec![QuotationItem::new("x", dec!(1), dec!(5))], None);
    let doc: Document = Quotation::new("A", "b", date(), amounts).into();
    let text = render(&doc, &template::fallback_template(), None).plain_text();
    assert!(!text.contains("Tax ("));
    assert!(text.contains("Subtotal:"));
  }

  #[test]
  fn long_documents_paginate_with_numbers() {
    let doc = render(&quotation(80), &template::fallback_template(), Some(&profile()));
    let n = doc.page_count();
    assert!(n > 1);
    for (i, page) in doc.pages.iter().enumerate() {
      let label = format!("Page {} of {n}", i + 1);
      assert!(page.texts().any(|t| t == label), "page {i} lacks {label:?}");
    }
  }

  #[test]
  fn content_stays_above_bottom_limit() {
    let t = template::fallback_template();
    let doc = render(&quotation(80), &t, Some(&profile()));
    let limit = doc.height - t.settings.margins.bottom;
    for page in &doc.pages {
      for element in &page.elements {
        if let Element::Text(run) = element {
          assert!(run.y <= doc.height, "{:?} below page", run.text);
          if !run.text.starts_with("Page ") {
            assert!(run.y <= limit, "{:?} in bottom margin", run.text);
          }
        }
      }
    }
  }

  #[test]
  fn page_numbers_can_be_disabled() {
    let t = template_with(|s| s.show_page_numbers = false);
    let text = render(&quotation(1), &t, None).plain_text();
    assert!(!text.contains("Page 1 of"));
  }

  #[test]
  fn watermark_on_every_page_beneath_content() {
    let t = template_with(|s| {
      s.show_watermark = true;
      s.watermark_text = "DRAFT".into();
    });
    let doc = render(&quotation(80), &t, None);
    for page in &doc.pages {
      let first_content = page
        .elements
        .iter()
        .position(|e| !matches!(e, Element::Fill(_)))
        .unwrap();
      assert!(matches!(&page.elements[first_content], Element::Watermark(w) if w.text == "DRAFT"));
    }

    let t = template_with(|s| {
      s.show_watermark = true;
      s.watermark_text = "  ".into();
    });
    let doc = render(&quotation(1), &t, None);
    assert!(!doc.pages[0].elements.iter().any(|e| matches!(e, Element::Watermark(_))));
  }

  #[test]
  fn customer_and_company_sections_can_be_hidden() {
    let t = template_with(|s| {
      s.show_customer_info = false;
      s.show_company_info = false;
      s.footer_layout = FooterLayout::None;
    });
    let text = render(&invoice(), &t, Some(&profile())).plain_text();
    assert!(!text.contains("Bill To:"));
    assert!(!text.contains("Acme Studio"));
    assert!(text.contains("Invoice Details:"));
  }

  #[test]
  fn long_item_names_wrap_with_figures_on_first_line() {
    let name = "A very long line item description that certainly will not fit in one table cell";
    let amounts = Amounts::new(vec![QuotationItem::new(name, dec!(3), dec!(7))], None);
    let doc: Document = Quotation::new("Zed", "z@example.com", date(), amounts).into();
    let page = &render(&doc, &template::fallback_template(), None).pages[0];

    let runs: Vec<&TextRun> = page
      .elements
      .iter()
      .filter_map(|e| match e {
        Element::Text(t) => Some(t),
        _ => None,
      })
      .collect();
    let first = runs.iter().find(|r| name.starts_with(r.text.as_str()) && !r.text.is_empty()).unwrap();
    let qty = runs.iter().find(|r| r.text == "3").unwrap();
    assert_eq!(first.y, qty.y);
    let wrapped = runs.iter().filter(|r| name.contains(r.text.as_str()) && r.x == first.x).count();
    assert!(wrapped > 1);
  }

  #[test]
  fn header_custom_fields_use_document_value_or_default() {
    let mut t = presets().into_iter().find(|t| t.id == template::CREATIVE_MODERN).unwrap();
    t.settings.custom_fields.push(CustomField {
      id:            "ref".into(),
      name:          "Reference".into(),
      label:         "Reference".into(),
      kind:          CustomFieldKind::Text,
      required:      false,
      options:       None,
      default_value: Some("N/A".into()),
      position:      CustomFieldPosition::Header,
      order:         3,
    });

    let mut q = Quotation::new("A", "b", date(), Amounts::new(vec![QuotationItem::new("x", dec!(1), dec!(1))], None));
    q.custom_fields.insert("po-number".into(), "PO-7".into());
    let text = render(&q.into(), &t, None).plain_text();
    assert!(text.contains("PO Number: PO-7"));
    assert!(text.contains("Reference: N/A"));
    assert!(!text.contains("Department:"));
  }

  #[test]
  fn bad_logo_does_not_fail_render() {
    let mut p = profile();
    p.company_logo = Some("definitely-not-an-image".into());
    let doc = render(&invoice(), &template::fallback_template(), Some(&p));
    assert!(!doc.pages[0].elements.iter().any(|e| matches!(e, Element::Image(_))));
    assert!(doc.plain_text().contains("Acme Studio"));
  }

  #[test]
  fn valid_logo_is_placed() {
    let img = image::RgbaImage::from_pixel(40, 20, image::Rgba([0, 0, 255, 255]));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    let mut p = profile();
    p.company_logo = Some(format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(buf.into_inner())));

    let doc = render(&invoice(), &template::fallback_template(), Some(&p));
    let image = doc.pages[0]
      .elements
      .iter()
      .find_map(|e| match e {
        Element::Image(i) => Some(i),
        _ => None,
      })
      .unwrap();
    assert_eq!((image.w, image.h), (40.0, 20.0));
    assert_eq!(image.x, 20.0);
  }

  #[test]
  fn landscape_letter_dimensions() {
    let t = template_with(|s| {
      s.paper_size = folio_core::template::PaperSize::Letter;
      s.orientation = folio_core::template::Orientation::Landscape;
    });
    let doc = render(&quotation(1), &t, None);
    assert_eq!((doc.width, doc.height), (279.4, 215.9));
  }
}

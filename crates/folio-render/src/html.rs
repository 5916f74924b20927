//! Print markup: a self-contained HTML page styled from the template.
//!
//! The markup follows the same section order and the same visibility rules
//! as the paginated layout; pagination itself is left to the browser, with
//! an `@page` rule carrying paper size and margins. All user-supplied text
//! is escaped.

use std::borrow::Cow;

use folio_core::{
  document::Document,
  format::{format_currency, format_date, format_quantity, format_rate},
  profile::CompanyProfile,
  template::{
    Color, CompanyInfoPosition, CustomFieldPosition, DocumentTemplate, FooterLayout, HeaderLayout,
    LogoPosition, TableStyle, TemplateSettings,
  },
};
use quick_xml::escape::escape;

use crate::{layout::Rgb, logo::decode_logo};

fn esc(s: &str) -> Cow<'_, str> { escape(s) }

/// Colors always reach the stylesheet normalised to `#rrggbb`.
fn css(color: &Color) -> String { Rgb::from(color).hex() }

fn stylesheet(s: &TemplateSettings) -> String {
  let m = s.margins;
  let stripe = Rgb::from(&s.primary_color).lighten(0.92).hex();
  let table_rules = match s.table_style {
    TableStyle::Borders => format!(
      "table.items th, table.items td {{ border: 1px solid {}; }}",
      css(&s.border_color)
    ),
    TableStyle::Striped => format!(
      "table.items tbody tr:nth-child(even) td {{ background: {stripe}; }}\n\
       table.items th {{ border-bottom: 1px solid {}; }}",
      css(&s.border_color)
    ),
    TableStyle::Minimal => format!(
      "table.items th {{ background: none; border-bottom: 1px solid {}; }}",
      css(&s.border_color)
    ),
  };
  let title_rules = match s.header_layout {
    HeaderLayout::Classic => format!("h1 {{ text-align: center; color: {}; }}", css(&s.primary_color)),
    HeaderLayout::Modern => format!(
      "h1 {{ text-align: center; background: {}; color: {}; padding: 2mm 0; }}",
      css(&s.header_background_color),
      css(&s.header_text_color)
    ),
    HeaderLayout::Minimal => format!("h1 {{ text-align: left; color: {}; }}", css(&s.text_color)),
  };
  let page_numbers = if s.show_page_numbers {
    "@bottom-center { content: \"Page \" counter(page) \" of \" counter(pages); }"
  } else {
    ""
  };

  format!(
    "@page {{ size: {paper} {orientation}; margin: {top}mm {right}mm {bottom}mm {left}mm; {page_numbers} }}\n\
     body {{ font-family: {body_font}; font-size: {body_pt}pt; color: {text}; background: {background}; margin: 0; }}\n\
     h1 {{ font-family: {header_font}; font-size: {heading_pt}pt; margin: 4mm 0; }}\n\
     {title_rules}\n\
     hr {{ border: none; border-top: 1px solid {border}; }}\n\
     .header {{ display: flex; justify-content: space-between; align-items: flex-start; }}\n\
     .logo {{ max-height: 20mm; max-width: 50mm; }}\n\
     .logo-top-center {{ display: block; margin: 0 auto; }}\n\
     .company {{ text-align: left; }}\n\
     .company.right {{ text-align: right; margin-left: auto; }}\n\
     .company .name {{ font-weight: bold; font-size: 1.4em; }}\n\
     .parties {{ display: flex; justify-content: space-between; margin: 6mm 0; }}\n\
     .details {{ width: 70mm; }}\n\
     table.items {{ width: 100%; border-collapse: collapse; }}\n\
     table.items th {{ background: {header_bg}; color: {header_text}; text-align: left; }}\n\
     table.items th, table.items td {{ padding: 1.5mm; vertical-align: top; }}\n\
     table.items .num {{ text-align: right; white-space: nowrap; }}\n\
     {table_rules}\n\
     .totals {{ margin: 6mm 0 6mm auto; width: 60mm; }}\n\
     .totals div {{ display: flex; justify-content: space-between; }}\n\
     .totals .grand {{ font-weight: bold; font-size: 1.2em; color: {primary}; border-top: 2px solid {primary}; }}\n\
     .block h3 {{ font-size: 1em; margin: 4mm 0 1mm; }}\n\
     .block p {{ margin: 0; white-space: pre-wrap; }}\n\
     .watermark {{ position: fixed; top: 50%; left: 50%; transform: translate(-50%, -50%) rotate(-45deg); \
     font-size: 72pt; font-weight: bold; color: rgba(0, 0, 0, 0.08); z-index: -1; }}\n\
     footer {{ text-align: center; color: {secondary}; font-size: 0.9em; border-top: 1px solid {border}; margin-top: 8mm; }}",
    paper = s.paper_size,
    orientation = s.orientation,
    top = m.top,
    right = m.right,
    bottom = m.bottom,
    left = m.left,
    body_font = s.body_font.css_stack(),
    body_pt = s.font_size.body_pt(),
    header_font = s.header_font.css_stack(),
    heading_pt = s.font_size.heading_pt(),
    text = css(&s.text_color),
    background = css(&s.background_color),
    border = css(&s.border_color),
    header_bg = css(&s.header_background_color),
    header_text = css(&s.header_text_color),
    primary = css(&s.primary_color),
    secondary = css(&s.secondary_color),
  )
}

fn logo_tag(s: &TemplateSettings, profile: &CompanyProfile) -> Option<String> {
  if !s.show_logo || s.logo_position == LogoPosition::None {
    return None;
  }
  let data = profile.logo()?;
  decode_logo(data)?;
  let src = if data.starts_with("data:") {
    data.to_owned()
  } else {
    format!("data:image/png;base64,{data}")
  };
  Some(format!(
    "<img class=\"logo logo-{}\" src=\"{}\" alt=\"logo\">",
    s.logo_position,
    esc(&src)
  ))
}

fn company_block(s: &TemplateSettings, profile: &CompanyProfile) -> Option<String> {
  if !s.show_company_info || s.company_info_position == CompanyInfoPosition::Hidden {
    return None;
  }
  let mut out = String::new();
  let name = profile.company_name.trim();
  if !name.is_empty() {
    out.push_str(&format!("<div class=\"name\">{}</div>", esc(name)));
  }
  for line in profile.address_lines().into_iter().chain(profile.contact_lines()) {
    out.push_str(&format!("<div>{}</div>", esc(&line)));
  }
  if out.is_empty() {
    return None;
  }
  let class = match s.company_info_position {
    CompanyInfoPosition::Right => "company right",
    _ => "company",
  };
  Some(format!("<div class=\"{class}\">{out}</div>"))
}

fn block(heading: &str, lines: &[String]) -> String {
  if lines.is_empty() {
    return String::new();
  }
  let body: String = lines.iter().map(|l| format!("<p>{}</p>", esc(l))).collect();
  format!("<section class=\"block\"><h3>{}</h3>{body}</section>\n", esc(heading))
}

fn custom_field_lines(document: &Document, s: &TemplateSettings, position: CustomFieldPosition) -> Vec<String> {
  s.custom_fields_at(position)
    .into_iter()
    .filter_map(|f| {
      let stored = document.custom_fields().get(&f.id).map(|v| v.trim()).filter(|v| !v.is_empty());
      let value = stored.or_else(|| f.default_value.as_deref().map(str::trim).filter(|v| !v.is_empty()))?;
      Some(format!("{}: {value}", f.label))
    })
    .collect()
}

/// Render print markup for `document`.
pub fn render_html(
  document: &Document,
  template: &DocumentTemplate,
  profile: Option<&CompanyProfile>,
) -> String {
  let s = &template.settings;
  let mut body = String::new();

  if let Some(text) = s.watermark() {
    body.push_str(&format!("<div class=\"watermark\">{}</div>\n", esc(text)));
  }

  // header
  if let Some(profile) = profile {
    let logo = logo_tag(s, profile);
    let company = company_block(s, profile);
    if logo.is_some() || company.is_some() {
      body.push_str("<header class=\"header\">");
      match (logo, company) {
        (Some(logo), Some(company)) if s.logo_position == LogoPosition::TopRight => {
          body.push_str(&company);
          body.push_str(&logo);
        }
        (logo, company) => {
          body.push_str(&logo.unwrap_or_default());
          body.push_str(&company.unwrap_or_default());
        }
      }
      body.push_str("</header>\n");
    }
  }
  body.push_str("<hr>\n");
  body.push_str(&format!("<h1>{}</h1>\n<hr>\n", document.title()));

  // parties
  body.push_str("<div class=\"parties\">");
  if s.show_customer_info {
    body.push_str(&format!(
      "<div class=\"bill-to\"><strong>Bill To:</strong><div><strong>{}</strong></div><div>{}</div></div>",
      esc(document.customer_name()),
      esc(document.customer_contact()),
    ));
  } else {
    body.push_str("<div></div>");
  }
  let mut details = Vec::new();
  match document {
    Document::Quotation(q) => details.push(format!("Date: {}", format_date(q.quotation_date))),
    Document::Invoice(i) => {
      details.push(format!("Invoice #: {}", i.invoice_number));
      details.push(format!("Date: {}", format_date(i.invoice_date)));
      if let (true, Some(due)) = (s.show_due_date, i.due_date) {
        details.push(format!("Due Date: {}", format_date(due)));
      }
    }
  }
  details.push(format!("Status: {}", document.status_label().to_uppercase()));
  details.extend(custom_field_lines(document, s, CustomFieldPosition::Header));
  body.push_str(&format!("<div class=\"details\"><strong>{} Details:</strong>", document.kind_label()));
  for line in &details {
    body.push_str(&format!("<div>{}</div>", esc(line)));
  }
  body.push_str("</div></div>\n");

  // items
  body.push_str(
    "<table class=\"items\"><thead><tr><th>Item Description</th><th class=\"num\">Quantity</th>\
     <th class=\"num\">Unit Price</th><th class=\"num\">Total</th></tr></thead><tbody>\n",
  );
  for item in document.amounts().items() {
    body.push_str(&format!(
      "<tr><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>\n",
      esc(item.name()),
      format_quantity(item.quantity()),
      format_currency(item.unit_price()),
      format_currency(item.total()),
    ));
  }
  body.push_str("</tbody></table>\n");
  for line in custom_field_lines(document, s, CustomFieldPosition::Items) {
    body.push_str(&format!("<p>{}</p>\n", esc(&line)));
  }

  // totals
  let amounts = document.amounts();
  body.push_str("<div class=\"totals\">");
  body.push_str(&format!("<div><span>Subtotal:</span><span>{}</span></div>", format_currency(amounts.subtotal())));
  if let (Some(rate), Some(amount)) = (amounts.tax_rate(), amounts.tax_amount()) {
    if !rate.is_zero() && !amount.is_zero() {
      body.push_str(&format!(
        "<div><span>Tax ({}):</span><span>{}</span></div>",
        format_rate(rate),
        format_currency(amount)
      ));
    }
  }
  body.push_str(&format!(
    "<div class=\"grand\"><span>Total:</span><span>{}</span></div></div>\n",
    format_currency(amounts.total())
  ));
  for line in custom_field_lines(document, s, CustomFieldPosition::Totals) {
    body.push_str(&format!("<p>{}</p>\n", esc(&line)));
  }

  // closing blocks
  if let Some(profile) = profile {
    if s.show_payment_info {
      let mut lines = Vec::new();
      if s.show_bank_info && profile.has_bank_info() {
        for (label, value) in [
          ("Bank", profile.bank_name()),
          ("Account", profile.bank_account()),
          ("Routing", profile.bank_routing()),
        ] {
          if let Some(value) = value {
            lines.push(format!("{label}: {value}"));
          }
        }
      }
      if let (true, Some(tax_id)) = (s.show_tax_id, profile.tax_id()) {
        lines.push(format!("Tax ID: {tax_id}"));
      }
      if let (true, Some(reg)) = (s.show_registration_number, profile.registration_number()) {
        lines.push(format!("Registration No: {reg}"));
      }
      body.push_str(&block("Payment Information:", &lines));
    }
    if let (true, Some(terms)) = (s.show_terms, profile.payment_terms()) {
      body.push_str(&block("Payment Terms:", &[terms.to_owned()]));
    }
    if let (true, Some(notes)) = (s.show_notes, profile.notes()) {
      body.push_str(&block("Notes:", &[notes.to_owned()]));
    }
  }
  for line in custom_field_lines(document, s, CustomFieldPosition::Footer) {
    body.push_str(&format!("<p>{}</p>\n", esc(&line)));
  }

  // footer
  if let (Some(profile), false) = (profile, s.footer_layout == FooterLayout::None) {
    let mut lines = vec![profile.company_name.trim().to_owned()];
    if s.footer_layout == FooterLayout::Detailed {
      lines.push(profile.contact_lines().join("  |  "));
    }
    let lines: Vec<String> = lines.into_iter().filter(|l| !l.is_empty()).collect();
    if !lines.is_empty() {
      body.push_str("<footer>");
      for line in &lines {
        body.push_str(&format!("<div>{}</div>", esc(line)));
      }
      body.push_str("</footer>\n");
    }
  }

  let title = match document {
    Document::Quotation(q) => format!("Quotation - {}", q.customer_name),
    Document::Invoice(i) => format!("Invoice {}", i.invoice_number),
  };
  format!(
    "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{}\n</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
    esc(&title),
    stylesheet(s),
  )
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use folio_core::{
    document::{Amounts, Invoice, Quotation, QuotationItem},
    template,
  };
  use rust_decimal_macros::dec;

  use super::*;

  fn date() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 3, 5).unwrap() }

  fn invoice() -> Document {
    let amounts = Amounts::new(vec![QuotationItem::new("Design & build", dec!(2), dec!(50))], Some(dec!(10)));
    Invoice::new("INV-001", "<script>alert(1)</script>", "x@example.com", date(), amounts).into()
  }

  fn profile() -> CompanyProfile {
    let mut p = CompanyProfile::new("Acme");
    p.bank_name = Some("First Federal".into());
    p.bank_account = Some("123456789".into());
    p.notes = Some("Thanks!".into());
    p
  }

  #[test]
  fn user_text_is_escaped() {
    let html = render_html(&invoice(), &template::fallback_template(), Some(&profile()));
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;"));
    assert!(html.contains("Design &amp; build"));
  }

  #[test]
  fn page_rule_carries_paper_and_margins() {
    let html = render_html(&invoice(), &template::fallback_template(), None);
    assert!(html.contains("@page { size: a4 portrait; margin: 20mm 20mm 20mm 20mm;"));
    assert!(html.contains("counter(pages)"));
  }

  #[test]
  fn colors_cannot_escape_the_stylesheet() {
    let mut t = template::fallback_template();
    t.settings.primary_color = Color::from("red}</style><script>alert(1)</script><style>");
    t.settings.text_color = Color::from("#ABC");
    let html = render_html(&invoice(), &t, None);
    assert!(!html.contains("<script>"));
    assert!(!html.contains("red}"));
    assert!(html.contains("color: #000000;"));
    assert!(html.contains("color: #aabbcc;"));
  }

  #[test]
  fn totals_and_details() {
    let html = render_html(&invoice(), &template::fallback_template(), None);
    assert!(html.contains("Invoice #: INV-001"));
    assert!(html.contains("Date: March 5, 2024"));
    assert!(html.contains("Tax (10%):"));
    assert!(html.contains("$110.00"));
  }

  #[test]
  fn bank_info_follows_flag() {
    let mut t = template::fallback_template();
    t.settings.show_payment_info = true;
    t.settings.show_bank_info = false;
    let html = render_html(&invoice(), &t, Some(&profile()));
    assert!(!html.contains("First Federal"));
    assert!(!html.contains("123456789"));

    t.settings.show_bank_info = true;
    let html = render_html(&invoice(), &t, Some(&profile()));
    assert!(html.contains("Bank: First Federal"));
  }

  #[test]
  fn watermark_only_when_enabled() {
    let mut t = template::fallback_template();
    let q: Document = Quotation::new(
      "A",
      "b",
      date(),
      Amounts::new(vec![QuotationItem::new("x", dec!(1), dec!(1))], None),
    )
    .into();
    assert!(!render_html(&q, &t, None).contains("class=\"watermark\""));

    t.settings.show_watermark = true;
    t.settings.watermark_text = "PAID".into();
    let html = render_html(&q, &t, None);
    assert!(html.contains("<div class=\"watermark\">PAID</div>"));
    assert!(!html.contains("Tax ("));
  }
}

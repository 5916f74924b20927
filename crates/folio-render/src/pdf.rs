//! PDF encoding of a [`PagedDocument`] with `lopdf`.
//!
//! Only the 14 standard fonts are used, so nothing is embedded: sans faces
//! map to Helvetica and serif faces to Times. Text is written in
//! WinAnsiEncoding; characters outside it are replaced with `?`.

use lopdf::{
  content::{Content, Operation},
  dictionary, Dictionary, Document as Pdf, Object, Stream, StringFormat,
};

use crate::{
  layout::{Align, Element, Face, Font, ImageBox, Page, PagedDocument, Rgb, Rule, TextRun, Watermark},
  logo::RasterImage,
  text::{text_width, PT_TO_MM},
  Result,
};

const FONTS: [(&str, &str); 4] = [
  ("F1", "Helvetica"),
  ("F2", "Helvetica-Bold"),
  ("F3", "Times-Roman"),
  ("F4", "Times-Bold"),
];

fn font_key(font: Font) -> &'static str {
  match (font.face, font.bold) {
    (Face::Sans, false) => "F1",
    (Face::Sans, true) => "F2",
    (Face::Serif, false) => "F3",
    (Face::Serif, true) => "F4",
  }
}

fn pt(mm: f32) -> f32 { mm / PT_TO_MM }

fn real(v: f32) -> Object { Object::Real(v) }

/// Encode `text` as WinAnsiEncoding bytes.
pub(crate) fn win_ansi(text: &str) -> Vec<u8> {
  text
    .chars()
    .map(|c| match c {
      ' '..='~' => c as u8,
      '\u{a0}'..='\u{ff}' => c as u32 as u8,
      '€' => 0x80,
      '‘' => 0x91,
      '’' => 0x92,
      '“' => 0x93,
      '”' => 0x94,
      '•' => 0x95,
      '\u{2013}' => 0x96,
      '\u{2014}' => 0x97,
      _ => b'?',
    })
    .collect()
}

// ─── Content streams ─────────────────────────────────────────────────────────

/// Turns page elements into content-stream operations, flipping the y axis
/// from top-down millimetres to bottom-up points.
struct Painter {
  page_height: f32,
  ops:         Vec<Operation>,
}

impl Painter {
  fn new(page_height_mm: f32) -> Self { Self { page_height: pt(page_height_mm), ops: Vec::new() } }

  fn op(&mut self, operator: &str, operands: Vec<Object>) { self.ops.push(Operation::new(operator, operands)); }

  fn y(&self, mm: f32) -> f32 { self.page_height - pt(mm) }

  fn fill_color(&mut self, c: Rgb) { self.op("rg", vec![real(c.r), real(c.g), real(c.b)]); }

  fn stroke_color(&mut self, c: Rgb) { self.op("RG", vec![real(c.r), real(c.g), real(c.b)]); }

  fn text(&mut self, run: &TextRun) {
    let width = text_width(&run.text, run.size, run.font.bold);
    let x = match run.align {
      Align::Left => run.x,
      Align::Center => run.x - width / 2.0,
      Align::Right => run.x - width,
    };
    self.fill_color(run.color);
    self.op("BT", vec![]);
    self.op("Tf", vec![Object::Name(font_key(run.font).into()), real(run.size)]);
    self.op("Td", vec![real(pt(x)), real(self.y(run.y))]);
    self.op("Tj", vec![Object::String(win_ansi(&run.text), StringFormat::Literal)]);
    self.op("ET", vec![]);
  }

  fn rule(&mut self, rule: &Rule) {
    self.stroke_color(rule.color);
    self.op("w", vec![real(pt(rule.width))]);
    self.op("m", vec![real(pt(rule.x1)), real(self.y(rule.y1))]);
    self.op("l", vec![real(pt(rule.x2)), real(self.y(rule.y2))]);
    self.op("S", vec![]);
  }

  fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
    self.fill_color(color);
    self.op("re", vec![real(pt(x)), real(self.y(y + h)), real(pt(w)), real(pt(h))]);
    self.op("f", vec![]);
  }

  fn image(&mut self, img: &ImageBox, name: &str) {
    self.op("q", vec![]);
    self.op(
      "cm",
      vec![real(pt(img.w)), real(0.0), real(0.0), real(pt(img.h)), real(pt(img.x)), real(self.y(img.y + img.h))],
    );
    self.op("Do", vec![Object::Name(name.into())]);
    self.op("Q", vec![]);
  }

  /// Rotated text whose midpoint sits at the page centre.
  fn watermark(&mut self, mark: &Watermark, page_width_mm: f32) {
    let (sin, cos) = mark.angle.to_radians().sin_cos();
    let width = pt(text_width(&mark.text, mark.size, true));
    let drop = mark.size * 0.35;
    let (cx, cy) = (pt(page_width_mm) / 2.0, self.page_height / 2.0);
    let x = cx - width / 2.0 * cos + drop * sin;
    let y = cy - width / 2.0 * sin - drop * cos;

    self.op("q", vec![]);
    self.fill_color(mark.color);
    self.op("BT", vec![]);
    self.op("Tf", vec![Object::Name(b"F2".to_vec()), real(mark.size)]);
    self.op("Tm", vec![real(cos), real(sin), real(-sin), real(cos), real(x), real(y)]);
    self.op("Tj", vec![Object::String(win_ansi(&mark.text), StringFormat::Literal)]);
    self.op("ET", vec![]);
    self.op("Q", vec![]);
  }
}

fn image_stream(image: &RasterImage) -> Stream {
  Stream::new(
    dictionary! {
      "Type" => "XObject",
      "Subtype" => "Image",
      "Width" => i64::from(image.width),
      "Height" => i64::from(image.height),
      "ColorSpace" => "DeviceRGB",
      "BitsPerComponent" => 8,
    },
    image.rgb.clone(),
  )
}

/// Operations for one page plus the image XObjects it references, keyed by
/// resource name.
fn paint_page<'p>(page: &'p Page, width: f32, height: f32) -> (Vec<Operation>, Vec<(String, &'p RasterImage)>) {
  let mut painter = Painter::new(height);
  let mut images = Vec::new();
  for element in &page.elements {
    match element {
      Element::Text(run) => painter.text(run),
      Element::Rule(rule) => painter.rule(rule),
      Element::Fill(f) => painter.rect(f.x, f.y, f.w, f.h, f.color),
      Element::Watermark(mark) => painter.watermark(mark, width),
      Element::Image(img) => {
        let name = format!("Im{}", images.len() + 1);
        painter.image(img, &name);
        images.push((name, img.image.as_ref()));
      }
    }
  }
  (painter.ops, images)
}

// ─── Document ────────────────────────────────────────────────────────────────

/// Encode `doc` as a complete PDF file.
pub fn to_pdf_bytes(doc: &PagedDocument) -> Result<Vec<u8>> {
  let mut pdf = Pdf::with_version("1.5");
  let pages_id = pdf.new_object_id();

  let mut fonts = Dictionary::new();
  for (key, base) in FONTS {
    let id = pdf.add_object(dictionary! {
      "Type" => "Font",
      "Subtype" => "Type1",
      "BaseFont" => base,
      "Encoding" => "WinAnsiEncoding",
    });
    fonts.set(key, id);
  }

  let media_box = vec![real(0.0), real(0.0), real(pt(doc.width)), real(pt(doc.height))];
  let mut kids = Vec::with_capacity(doc.pages.len());

  for page in &doc.pages {
    let (operations, images) = paint_page(page, doc.width, doc.height);

    let mut xobjects = Dictionary::new();
    for (name, image) in images {
      let id = pdf.add_object(image_stream(image));
      xobjects.set(name, id);
    }

    let content = Content { operations }.encode()?;
    let content_id = pdf.add_object(Stream::new(Dictionary::new(), content));
    let page_id = pdf.add_object(dictionary! {
      "Type" => "Page",
      "Parent" => pages_id,
      "MediaBox" => media_box.clone(),
      "Contents" => content_id,
      "Resources" => dictionary! {
        "Font" => fonts.clone(),
        "XObject" => xobjects,
      },
    });
    kids.push(Object::Reference(page_id));
  }

  let count = kids.len() as i64;
  pdf.objects.insert(
    pages_id,
    Object::Dictionary(dictionary! {
      "Type" => "Pages",
      "Kids" => kids,
      "Count" => count,
    }),
  );
  let catalog_id = pdf.add_object(dictionary! {
    "Type" => "Catalog",
    "Pages" => pages_id,
  });
  pdf.trailer.set("Root", catalog_id);
  pdf.compress();

  let mut bytes = Vec::new();
  pdf.save_to(&mut bytes)?;
  tracing::debug!(pages = doc.pages.len(), bytes = bytes.len(), "encoded pdf");
  Ok(bytes)
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use folio_core::{
    document::{Amounts, Document, Quotation, QuotationItem},
    template,
  };
  use rust_decimal_macros::dec;

  use super::*;
  use crate::render;

  fn document(items: usize) -> Document {
    let items = (0..items)
      .map(|n| QuotationItem::new(format!("Item {n}"), dec!(1), dec!(9.99)))
      .collect();
    Quotation::new(
      "Jane",
      "jane@example.com",
      NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
      Amounts::new(items, None),
    )
    .into()
  }

  #[test]
  fn win_ansi_maps_latin1_and_replaces_the_rest() {
    assert_eq!(win_ansi("Café"), b"Caf\xe9".to_vec());
    assert_eq!(win_ansi("5 €"), b"5 \x80".to_vec());
    assert_eq!(win_ansi("日本"), b"??".to_vec());
  }

  #[test]
  fn produces_a_loadable_pdf_with_every_page() {
    let laid_out = render(&document(80), &template::fallback_template(), None);
    assert!(laid_out.page_count() > 1);

    let bytes = to_pdf_bytes(&laid_out).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.5"));

    let loaded = Pdf::load_mem(&bytes).unwrap();
    assert_eq!(loaded.get_pages().len(), laid_out.page_count());
  }

  #[test]
  fn page_text_is_written_with_standard_fonts() {
    let mut t = template::fallback_template();
    t.settings.body_font = folio_core::template::FontFamily::Georgia;
    let laid_out = render(&document(1), &t, None);
    let (ops, images) = paint_page(&laid_out.pages[0], laid_out.width, laid_out.height);
    assert!(images.is_empty());

    let shown: Vec<Vec<u8>> = ops
      .iter()
      .filter(|op| op.operator == "Tj")
      .filter_map(|op| match op.operands.first() {
        Some(Object::String(bytes, _)) => Some(bytes.clone()),
        _ => None,
      })
      .collect();
    assert!(shown.contains(&b"QUOTATION".to_vec()));
    assert!(shown.contains(&b"$9.99".to_vec()));

    let uses_times = ops
      .iter()
      .any(|op| op.operator == "Tf" && matches!(op.operands.first(), Some(Object::Name(n)) if n == b"F3"));
    assert!(uses_times);
  }

  #[test]
  fn right_aligned_text_ends_at_its_anchor() {
    let run = TextRun {
      x:     100.0,
      y:     50.0,
      text:  "$10.00".into(),
      size:  10.0,
      font:  Font { face: Face::Sans, bold: false },
      color: Rgb::BLACK,
      align: Align::Right,
    };
    let mut painter = Painter::new(297.0);
    painter.text(&run);
    let td = painter.ops.iter().find(|op| op.operator == "Td").unwrap();
    let Object::Real(x) = td.operands[0] else { panic!("expected a real") };
    let expected = pt(100.0 - text_width("$10.00", 10.0, false));
    assert!((x - expected).abs() < 0.01);
  }
}

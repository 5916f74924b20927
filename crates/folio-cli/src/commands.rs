//! Subcommand handlers. Each one is a thin call into the repository or the
//! renderer followed by plain-text output on stdout.

use std::{collections::BTreeMap, path::Path};

use anyhow::{ensure, Context as _, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::{Datelike as _, Utc};
use folio_core::{
  catalog::{CatalogItem, ItemCategory},
  document::{Amounts, Document, Invoice, Quotation, QuotationItem},
  format::{format_currency, format_date},
  lifecycle::format_invoice_number,
  profile::{CompanyProfile, Customer},
  report::YearSummary,
  store::KeyValueStore,
  template::{DocumentTemplate, TemplateSettings},
  Repository,
};
use folio_render::export::{save_file, RenderJob};
use serde::Serialize;
use serde_json::Value;

use crate::{
  cli::{
    CatalogCommand, CatalogRef, CategoryCommand, Command, CustomerArgs, CustomerChanges,
    CustomerCommand, DraftArgs, EditArgs, InvoiceCommand, ProfileArgs, ProfileCommand,
    QuoteCommand, TemplateCommand,
  },
  settings::FolioConfig,
};

pub async fn run<S: KeyValueStore>(repo: &Repository<S>, cfg: &FolioConfig, command: Command) -> Result<()> {
  match command {
    Command::Profile(cmd) => profile(repo, cmd).await,
    Command::Customer(cmd) => customer(repo, cmd).await,
    Command::Catalog(cmd) => catalog(repo, cmd).await,
    Command::Category(cmd) => category(repo, cmd).await,
    Command::Quote(cmd) => quote(repo, cmd).await,
    Command::Invoice(cmd) => invoice(repo, cmd).await,
    Command::Convert { quotation_id } => {
      let invoice = repo
        .convert_quotation_to_invoice(&quotation_id)
        .await
        .context("conversion failed")?
        .with_context(|| format!("no quotation with id {quotation_id}"))?;
      println!("{} {} due {}", invoice.id, invoice.invoice_number, due_label(&invoice));
      Ok(())
    }
    Command::Documents => {
      for document in repo.all_documents().await? {
        print_document_row(&document);
      }
      Ok(())
    }
    Command::Template(cmd) => template(repo, cmd).await,
    Command::Export { document_id, template, out } => {
      let job = RenderJob::load(repo, &document_id, template.as_deref())
        .await
        .context("cannot export")?;
      let dir = out.unwrap_or_else(|| cfg.output_dir.clone());
      let path = job
        .export(&dir, cfg.export_timeout())
        .await
        .with_context(|| format!("export of {document_id} failed"))?;
      println!("{}", path.display());
      Ok(())
    }
    Command::Print { document_id, template, out } => {
      let job = RenderJob::load(repo, &document_id, template.as_deref())
        .await
        .context("cannot print")?;
      let html = job.to_html();
      match out {
        Some(path) => {
          tokio::fs::write(&path, html)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
          println!("{}", path.display());
        }
        None => print!("{html}"),
      }
      Ok(())
    }
    Command::Report { year, month, save } => {
      let year = year.unwrap_or_else(|| Utc::now().year());
      let summary = repo.year_summary(year).await?;
      match month {
        None => print_summary(&summary),
        Some(month) => {
          let Some(report) = summary.months.iter().find(|r| r.month == month) else {
            println!("No invoices in {year}-{month:02}");
            return Ok(());
          };
          if save {
            let path = save_file(
              &cfg.output_dir,
              &report.file_name(),
              report.to_text().into_bytes(),
              cfg.export_timeout(),
            )
            .await
            .context("failed to save report")?;
            println!("{}", path.display());
          } else {
            print!("{}", report.to_text());
          }
        }
      }
      Ok(())
    }
  }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn due_label(invoice: &Invoice) -> String {
  invoice.due_date.map_or_else(|| "-".to_owned(), format_date)
}

fn print_document_row(document: &Document) {
  let number = match document {
    Document::Quotation(_) => "",
    Document::Invoice(i) => i.invoice_number.as_str(),
  };
  println!(
    "{:<44} {:<9} {:<8} {:<9} {:<24} {:>14}  {}",
    document.id(),
    document.kind_label(),
    number,
    document.status_label(),
    document.customer_name(),
    format_currency(document.amounts().total()),
    document.date(),
  );
}

fn print_summary(s: &YearSummary) {
  println!("{}: {} invoices, {}", s.year, s.year_invoices, format_currency(s.year_revenue));
  println!(
    "All time: {} invoices, {} (average {})",
    s.all_time_invoices,
    format_currency(s.all_time_revenue),
    format_currency(s.average_invoice_value),
  );
  for month in &s.months {
    println!(
      "  {:<10} {:>4}  {:>14}",
      month.month_name(),
      month.total_invoices,
      format_currency(month.total_amount)
    );
  }
}

// ─── Profile ─────────────────────────────────────────────────────────────────

async fn profile<S: KeyValueStore>(repo: &Repository<S>, cmd: ProfileCommand) -> Result<()> {
  match cmd {
    ProfileCommand::Show => match repo.company_profile().await? {
      Some(profile) => print_json(&profile),
      None => {
        println!("No company profile yet; create one with `folio profile set --name ...`");
        Ok(())
      }
    },
    ProfileCommand::Set(args) => {
      let current = repo.company_profile().await?;
      let profile = apply_profile(current.unwrap_or_else(|| CompanyProfile::new("")), args).await?;
      let saved = repo
        .save_company_profile(profile)
        .await
        .context("company profile rejected")?;
      println!("Saved profile for {}", saved.company_name);
      Ok(())
    }
  }
}

/// `data:` URL for an image file.
async fn logo_data_url(path: &Path) -> Result<String> {
  let bytes = tokio::fs::read(path)
    .await
    .with_context(|| format!("failed to read logo {}", path.display()))?;
  let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
  let mime = match ext.as_deref() {
    Some("jpg" | "jpeg") => "image/jpeg",
    _ => "image/png",
  };
  Ok(format!("data:{mime};base64,{}", general_purpose::STANDARD.encode(bytes)))
}

fn set(field: &mut String, value: Option<String>) {
  if let Some(value) = value {
    *field = value;
  }
}

/// A given blank value clears the field.
fn set_opt(field: &mut Option<String>, value: Option<String>) {
  if let Some(value) = value {
    *field = (!value.trim().is_empty()).then_some(value);
  }
}

async fn apply_profile(mut p: CompanyProfile, a: ProfileArgs) -> Result<CompanyProfile> {
  set(&mut p.company_name, a.name);
  set(&mut p.company_address, a.address);
  set(&mut p.company_city, a.city);
  set(&mut p.company_state, a.state);
  set(&mut p.company_zip, a.zip);
  set(&mut p.company_country, a.country);
  set(&mut p.company_phone, a.phone);
  set(&mut p.company_email, a.email);
  set(&mut p.company_website, a.website);

  set_opt(&mut p.tax_id, a.tax_id);
  set_opt(&mut p.registration_number, a.registration_number);
  set_opt(&mut p.bank_name, a.bank_name);
  set_opt(&mut p.bank_account, a.bank_account);
  set_opt(&mut p.bank_routing, a.bank_routing);
  set_opt(&mut p.payment_terms, a.payment_terms);
  set_opt(&mut p.notes, a.notes);

  if a.clear_logo {
    p.company_logo = None;
  } else if let Some(path) = a.logo {
    p.company_logo = Some(logo_data_url(&path).await?);
  }
  Ok(p)
}

// ─── Customers, catalog, categories ──────────────────────────────────────────

async fn customer<S: KeyValueStore>(repo: &Repository<S>, cmd: CustomerCommand) -> Result<()> {
  match cmd {
    CustomerCommand::List => {
      for c in repo.customers().await? {
        println!("{:<44} {:<24} {}", c.id, c.name, c.contact_line());
      }
    }
    CustomerCommand::Show { id } => {
      let c = repo.customer(&id).await?.with_context(|| format!("no customer with id {id}"))?;
      print_json(&c)?;
    }
    CustomerCommand::Add(args) => {
      let saved = repo.save(new_customer(args)).await.context("customer rejected")?;
      println!("{}", saved.id);
    }
    CustomerCommand::Edit { id, changes } => {
      let c = repo.customer(&id).await?.with_context(|| format!("no customer with id {id}"))?;
      let saved = repo.save(edit_customer(c, changes)).await.context("customer rejected")?;
      println!("{}", saved.id);
    }
    CustomerCommand::Remove { id } => repo.delete::<Customer>(&id).await?,
  }
  Ok(())
}

fn new_customer(a: CustomerArgs) -> Customer {
  let mut c = Customer::new(a.name, a.email);
  c.company = a.company;
  c.phone = a.phone;
  c.address = a.address;
  c.city = a.city;
  c.state = a.state;
  c.zip = a.zip;
  c.country = a.country;
  c.tax_id = a.tax_id;
  c.notes = a.notes;
  c
}

fn edit_customer(mut c: Customer, a: CustomerChanges) -> Customer {
  set(&mut c.name, a.name);
  set(&mut c.email, a.email);
  set_opt(&mut c.company, a.company);
  set_opt(&mut c.phone, a.phone);
  set_opt(&mut c.address, a.address);
  set_opt(&mut c.city, a.city);
  set_opt(&mut c.state, a.state);
  set_opt(&mut c.zip, a.zip);
  set_opt(&mut c.country, a.country);
  set_opt(&mut c.tax_id, a.tax_id);
  set_opt(&mut c.notes, a.notes);
  c
}

fn print_catalog_row(item: &CatalogItem) {
  println!(
    "{:<44} {:<28} {:>12}  {}{}",
    item.id,
    item.name,
    format_currency(item.unit_price),
    item.sku.as_deref().unwrap_or("-"),
    if item.is_active { "" } else { "  (inactive)" },
  );
}

async fn catalog<S: KeyValueStore>(repo: &Repository<S>, cmd: CatalogCommand) -> Result<()> {
  match cmd {
    CatalogCommand::List { category, all } => {
      let items = match category {
        Some(id) => repo.catalog_items_by_category(&id).await?,
        None if all => repo.catalog_items().await?,
        None => repo.catalog_items().await?.into_iter().filter(|i| i.is_active).collect(),
      };
      items.iter().for_each(print_catalog_row);
    }
    CatalogCommand::Search { query } => {
      repo.search_catalog_items(&query).await?.iter().for_each(print_catalog_row);
    }
    CatalogCommand::Add { name, price, description, category, sku } => {
      let mut item = CatalogItem::new(name, price);
      item.description = description;
      item.category = category;
      item.sku = sku;
      let saved = repo.save(item).await.context("catalog item rejected")?;
      println!("{}", saved.id);
    }
    CatalogCommand::Edit { id, name, price, description, category, sku } => {
      let mut item = repo
        .get::<CatalogItem>(&id)
        .await?
        .with_context(|| format!("no catalog item with id {id}"))?;
      set(&mut item.name, name);
      if let Some(price) = price {
        item.unit_price = price;
      }
      set_opt(&mut item.description, description);
      set_opt(&mut item.category, category);
      set_opt(&mut item.sku, sku);
      let saved = repo.save(item).await.context("catalog item rejected")?;
      print_catalog_row(&saved);
    }
    CatalogCommand::Toggle { id } => {
      let item = repo
        .toggle_catalog_item(&id)
        .await?
        .with_context(|| format!("no catalog item with id {id}"))?;
      println!("{} is now {}", item.name, if item.is_active { "active" } else { "inactive" });
    }
    CatalogCommand::Remove { id } => repo.delete::<CatalogItem>(&id).await?,
    CatalogCommand::Seed => {
      repo.seed_catalog_defaults().await?;
      println!(
        "{} categories, {} items",
        repo.categories().await?.len(),
        repo.catalog_items().await?.len()
      );
    }
  }
  Ok(())
}

async fn category<S: KeyValueStore>(repo: &Repository<S>, cmd: CategoryCommand) -> Result<()> {
  match cmd {
    CategoryCommand::List => {
      for c in repo.categories().await? {
        println!("{:<44} {:<20} {}", c.id, c.name, c.description.as_deref().unwrap_or(""));
      }
    }
    CategoryCommand::Add { name, description } => {
      let mut category = ItemCategory::new(name);
      category.description = description;
      let saved = repo.save(category).await.context("category rejected")?;
      println!("{}", saved.id);
    }
    CategoryCommand::Remove { id } => repo.delete::<ItemCategory>(&id).await?,
  }
  Ok(())
}

// ─── Quotations and invoices ─────────────────────────────────────────────────

/// Customer name and contact for a new document.
async fn party<S: KeyValueStore>(repo: &Repository<S>, args: &DraftArgs) -> Result<(String, String)> {
  match &args.customer {
    Some(id) => {
      let c = repo.customer(id).await?.with_context(|| format!("no customer with id {id}"))?;
      Ok((c.name.clone(), c.contact_line()))
    }
    None => Ok((args.name.clone().unwrap_or_default(), args.contact.clone().unwrap_or_default())),
  }
}

async fn catalog_line<S: KeyValueStore>(repo: &Repository<S>, r: &CatalogRef) -> Result<QuotationItem> {
  let entry = repo
    .get::<CatalogItem>(&r.id)
    .await?
    .with_context(|| format!("no catalog item with id {}", r.id))?;
  Ok(QuotationItem::from_catalog(&entry, r.quantity))
}

async fn amounts<S: KeyValueStore>(repo: &Repository<S>, args: &DraftArgs) -> Result<Amounts> {
  let mut items: Vec<QuotationItem> = args
    .items
    .iter()
    .map(|i| QuotationItem::new(i.name.clone(), i.quantity, i.unit_price))
    .collect();
  for r in &args.catalog_items {
    items.push(catalog_line(repo, r).await?);
  }
  Ok(Amounts::new(items, args.tax_rate))
}

/// Apply line-item edits in order: removals, updates, renames, additions.
async fn edit_amounts<S: KeyValueStore>(repo: &Repository<S>, amounts: &mut Amounts, edit: &EditArgs) -> Result<()> {
  for id in &edit.remove_items {
    ensure!(amounts.remove_item(id), "no line item with id {id}");
  }
  for u in &edit.set_items {
    let found = amounts.update_item(&u.id, |item| {
      if let Some(quantity) = u.quantity {
        item.set_quantity(quantity);
      }
      if let Some(unit_price) = u.unit_price {
        item.set_unit_price(unit_price);
      }
    });
    ensure!(found, "no line item with id {}", u.id);
  }
  for (id, name) in &edit.rename_items {
    ensure!(amounts.update_item(id, |item| item.set_name(name.as_str())), "no line item with id {id}");
  }
  for i in &edit.add_items {
    amounts.push_item(QuotationItem::new(i.name.clone(), i.quantity, i.unit_price));
  }
  for r in &edit.add_catalog_items {
    amounts.push_item(catalog_line(repo, r).await?);
  }
  if let Some(rate) = edit.tax_rate {
    amounts.set_tax_rate(Some(rate));
  }
  Ok(())
}

fn edit_fields(fields: &mut BTreeMap<String, String>, edits: Vec<(String, String)>) {
  for (key, value) in edits {
    if value.is_empty() {
      fields.remove(&key);
    } else {
      fields.insert(key, value);
    }
  }
}

async fn draft_quotation<S: KeyValueStore>(repo: &Repository<S>, args: DraftArgs) -> Result<Quotation> {
  let (name, contact) = party(repo, &args).await?;
  let amounts = amounts(repo, &args).await?;
  let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
  let mut q = Quotation::new(name, contact, date, amounts);
  q.custom_fields.extend(args.fields);
  Ok(q)
}

async fn quote<S: KeyValueStore>(repo: &Repository<S>, cmd: QuoteCommand) -> Result<()> {
  match cmd {
    QuoteCommand::List => {
      for q in repo.quotations().await? {
        print_document_row(&q.into());
      }
    }
    QuoteCommand::Show { id } => {
      let q = repo.quotation(&id).await?.with_context(|| format!("no quotation with id {id}"))?;
      print_json(&q)?;
    }
    QuoteCommand::New(args) => {
      let q = draft_quotation(repo, args).await?;
      let saved = repo.save(q).await.context("quotation rejected")?;
      println!("{} total {}", saved.id, format_currency(saved.amounts.total()));
    }
    QuoteCommand::Edit(edit) => {
      let mut q = repo
        .quotation(&edit.id)
        .await?
        .with_context(|| format!("no quotation with id {}", edit.id))?;
      edit_amounts(repo, &mut q.amounts, &edit).await?;
      set(&mut q.customer_name, edit.name);
      set(&mut q.customer_contact, edit.contact);
      if let Some(date) = edit.date {
        q.quotation_date = date;
      }
      edit_fields(&mut q.custom_fields, edit.fields);
      let saved = repo.save(q).await.context("quotation rejected")?;
      println!("{} total {}", saved.id, format_currency(saved.amounts.total()));
    }
    QuoteCommand::Status { id, status } => {
      repo
        .set_quotation_status(&id, status)
        .await?
        .with_context(|| format!("no quotation with id {id}"))?;
    }
    QuoteCommand::Remove { id } => repo.delete::<Quotation>(&id).await?,
  }
  Ok(())
}

async fn invoice<S: KeyValueStore>(repo: &Repository<S>, cmd: InvoiceCommand) -> Result<()> {
  match cmd {
    InvoiceCommand::List => {
      for i in repo.invoices().await? {
        print_document_row(&i.into());
      }
    }
    InvoiceCommand::Show { id } => {
      let i = repo.invoice(&id).await?.with_context(|| format!("no invoice with id {id}"))?;
      print_json(&i)?;
    }
    InvoiceCommand::New { draft, due } => {
      let (name, contact) = party(repo, &draft).await?;
      let amounts = amounts(repo, &draft).await?;
      let date = draft.date.unwrap_or_else(|| Utc::now().date_naive());
      // Validate before the counter advances so a rejected invoice burns no number.
      let upcoming = format_invoice_number(repo.invoice_counter().await? + 1);
      let mut invoice = Invoice::new(upcoming, name, contact, date, amounts);
      invoice.validate().context("invoice rejected")?;
      invoice.invoice_number = repo.next_invoice_number().await?;
      invoice.due_date = due;
      invoice.custom_fields.extend(draft.fields);
      let saved = repo.save(invoice).await.context("invoice rejected")?;
      println!("{} {} total {}", saved.id, saved.invoice_number, format_currency(saved.amounts.total()));
    }
    InvoiceCommand::Edit { edit, due } => {
      let mut i = repo
        .invoice(&edit.id)
        .await?
        .with_context(|| format!("no invoice with id {}", edit.id))?;
      edit_amounts(repo, &mut i.amounts, &edit).await?;
      set(&mut i.customer_name, edit.name);
      set(&mut i.customer_contact, edit.contact);
      if let Some(date) = edit.date {
        i.invoice_date = date;
      }
      if due.is_some() {
        i.due_date = due;
      }
      edit_fields(&mut i.custom_fields, edit.fields);
      let saved = repo.save(i).await.context("invoice rejected")?;
      println!("{} {} total {}", saved.id, saved.invoice_number, format_currency(saved.amounts.total()));
    }
    InvoiceCommand::Status { id, status } => {
      repo
        .set_invoice_status(&id, status)
        .await?
        .with_context(|| format!("no invoice with id {id}"))?;
    }
    InvoiceCommand::Remove { id } => repo.delete::<Invoice>(&id).await?,
  }
  Ok(())
}

// ─── Templates ───────────────────────────────────────────────────────────────

fn print_template_row(t: &DocumentTemplate, active: &str) {
  println!(
    "{} {:<44} {:<24} {}",
    if t.id == active { "*" } else { " " },
    t.id,
    t.name,
    if t.is_default { "built-in" } else { "custom" },
  );
}

/// Apply `KEY=VALUE` edits through the settings' JSON form. Keys are wire
/// names, dotted for nested values. A value replacing a string is taken
/// verbatim; any other value is parsed as JSON.
fn apply_settings(settings: &TemplateSettings, edits: Vec<(String, String)>) -> Result<TemplateSettings> {
  let mut json = serde_json::to_value(settings)?;
  for (key, raw) in edits {
    let slot = key
      .split('.')
      .try_fold(&mut json, |value, k| value.get_mut(k))
      .with_context(|| format!("unknown template setting {key:?}"))?;
    let value = if slot.is_string() {
      Value::String(raw)
    } else {
      serde_json::from_str(&raw).with_context(|| format!("invalid value for {key}: {raw:?}"))?
    };
    *slot = value;
  }
  serde_json::from_value(json).context("invalid template settings")
}

async fn template<S: KeyValueStore>(repo: &Repository<S>, cmd: TemplateCommand) -> Result<()> {
  match cmd {
    TemplateCommand::List => {
      let active = repo.active_template().await?;
      for t in repo.templates().await? {
        print_template_row(&t, &active.id);
      }
    }
    TemplateCommand::Show { id } => {
      let t = repo.template(&id).await?.with_context(|| format!("no template with id {id}"))?;
      print_json(&t)?;
    }
    TemplateCommand::Active => {
      let t = repo.active_template().await?;
      println!("{} ({})", t.name, t.id);
    }
    TemplateCommand::Use { id } => {
      let t = repo
        .set_active_template(&id)
        .await?
        .with_context(|| format!("no template with id {id}"))?;
      println!("Active template: {}", t.name);
    }
    TemplateCommand::Clear => repo.clear_active_template().await?,
    TemplateCommand::Create { name, description, base } => {
      let t = repo
        .create_custom_template(&name, &description, &base)
        .await
        .context("template rejected")?
        .with_context(|| format!("no template with id {base}"))?;
      println!("{}", t.id);
    }
    TemplateCommand::Set { id, name, description, settings } => {
      let mut t = repo.template(&id).await?.with_context(|| format!("no template with id {id}"))?;
      set(&mut t.name, name);
      set(&mut t.description, description);
      t.settings = apply_settings(&t.settings, settings)?;
      let saved = repo
        .save_template(t)
        .await
        .with_context(|| format!("cannot update template {id}"))?;
      println!("Updated {}", saved.name);
    }
    TemplateCommand::Remove { id } => repo
      .delete_template(&id)
      .await
      .with_context(|| format!("cannot delete template {id}"))?,
  }
  Ok(())
}

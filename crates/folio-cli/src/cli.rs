//! Command-line arguments.

use std::{path::PathBuf, str::FromStr};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use folio_core::{
  document::{InvoiceStatus, QuotationStatus},
  template::MODERN_STANDARD,
};
use rust_decimal::Decimal;

#[derive(Parser, Debug)]
#[command(name = "folio", version, about = "Quotations, invoices and document templates")]
pub struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "folio.toml")]
  pub config: PathBuf,

  /// Use this store file instead of the configured one.
  #[arg(long, value_name = "FILE")]
  pub store: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Show or edit the company profile.
  #[command(subcommand)]
  Profile(ProfileCommand),
  /// Manage saved customers.
  #[command(subcommand)]
  Customer(CustomerCommand),
  /// Manage the item catalog.
  #[command(subcommand)]
  Catalog(CatalogCommand),
  /// Manage catalog categories.
  #[command(subcommand)]
  Category(CategoryCommand),
  /// Manage quotations.
  #[command(subcommand)]
  Quote(QuoteCommand),
  /// Manage invoices.
  #[command(subcommand)]
  Invoice(InvoiceCommand),
  /// Issue a draft invoice from a quotation.
  Convert { quotation_id: String },
  /// List every quotation and invoice, newest first.
  Documents,
  /// Browse, create and select document templates.
  #[command(subcommand)]
  Template(TemplateCommand),
  /// Render a document to a PDF file.
  Export {
    document_id: String,
    /// Template to use instead of the active one.
    #[arg(long)]
    template:    Option<String>,
    /// Output directory; defaults to the configured one.
    #[arg(long, value_name = "DIR")]
    out:         Option<PathBuf>,
  },
  /// Write print-ready HTML for a document.
  Print {
    document_id: String,
    /// Template to use instead of the active one.
    #[arg(long)]
    template:    Option<String>,
    /// Write to this file instead of stdout.
    #[arg(long, value_name = "FILE")]
    out:         Option<PathBuf>,
  },
  /// Revenue summary for a year, or one month's invoice report.
  Report {
    /// Defaults to the current year.
    year:  Option<i32>,
    /// 1-12; print that month's report instead of the summary.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,
    /// Save the monthly report as a text file in the output directory.
    #[arg(long, requires = "month")]
    save:  bool,
  },
}

// ─── Profile ─────────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum ProfileCommand {
  Show,
  /// Update the given fields, creating the profile if needed.
  Set(ProfileArgs),
}

#[derive(Args, Debug, Default)]
pub struct ProfileArgs {
  #[arg(long)]
  pub name:                Option<String>,
  #[arg(long)]
  pub address:             Option<String>,
  #[arg(long)]
  pub city:                Option<String>,
  #[arg(long)]
  pub state:               Option<String>,
  #[arg(long)]
  pub zip:                 Option<String>,
  #[arg(long)]
  pub country:             Option<String>,
  #[arg(long)]
  pub phone:               Option<String>,
  #[arg(long)]
  pub email:               Option<String>,
  #[arg(long)]
  pub website:             Option<String>,
  /// PNG or JPEG file to embed as the company logo.
  #[arg(long, value_name = "FILE", conflicts_with = "clear_logo")]
  pub logo:                Option<PathBuf>,
  #[arg(long)]
  pub clear_logo:          bool,
  #[arg(long)]
  pub tax_id:              Option<String>,
  #[arg(long)]
  pub registration_number: Option<String>,
  #[arg(long)]
  pub bank_name:           Option<String>,
  #[arg(long)]
  pub bank_account:        Option<String>,
  #[arg(long)]
  pub bank_routing:        Option<String>,
  #[arg(long)]
  pub payment_terms:       Option<String>,
  #[arg(long)]
  pub notes:               Option<String>,
}

// ─── Customers and catalog ───────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum CustomerCommand {
  List,
  Show { id: String },
  Add(CustomerArgs),
  /// Change the given fields; an empty value clears an optional one.
  Edit {
    id:      String,
    #[command(flatten)]
    changes: CustomerChanges,
  },
  Remove { id: String },
}

#[derive(Args, Debug)]
pub struct CustomerArgs {
  #[arg(long)]
  pub name:    String,
  #[arg(long)]
  pub email:   String,
  #[arg(long)]
  pub company: Option<String>,
  #[arg(long)]
  pub phone:   Option<String>,
  #[arg(long)]
  pub address: Option<String>,
  #[arg(long)]
  pub city:    Option<String>,
  #[arg(long)]
  pub state:   Option<String>,
  #[arg(long)]
  pub zip:     Option<String>,
  #[arg(long)]
  pub country: Option<String>,
  #[arg(long)]
  pub tax_id:  Option<String>,
  #[arg(long)]
  pub notes:   Option<String>,
}

#[derive(Args, Debug)]
pub struct CustomerChanges {
  #[arg(long)]
  pub name:    Option<String>,
  #[arg(long)]
  pub email:   Option<String>,
  #[arg(long)]
  pub company: Option<String>,
  #[arg(long)]
  pub phone:   Option<String>,
  #[arg(long)]
  pub address: Option<String>,
  #[arg(long)]
  pub city:    Option<String>,
  #[arg(long)]
  pub state:   Option<String>,
  #[arg(long)]
  pub zip:     Option<String>,
  #[arg(long)]
  pub country: Option<String>,
  #[arg(long)]
  pub tax_id:  Option<String>,
  #[arg(long)]
  pub notes:   Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum CatalogCommand {
  /// Active items; `--all` includes inactive ones.
  List {
    #[arg(long)]
    category: Option<String>,
    #[arg(long, conflicts_with = "category")]
    all:      bool,
  },
  /// Case-insensitive search over active items.
  Search { query: String },
  Add {
    #[arg(long)]
    name:        String,
    #[arg(long)]
    price:       Decimal,
    #[arg(long)]
    description: Option<String>,
    /// Category id.
    #[arg(long)]
    category:    Option<String>,
    #[arg(long)]
    sku:         Option<String>,
  },
  /// Change the given fields; an empty value clears an optional one.
  Edit {
    id:          String,
    #[arg(long)]
    name:        Option<String>,
    #[arg(long)]
    price:       Option<Decimal>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    category:    Option<String>,
    #[arg(long)]
    sku:         Option<String>,
  },
  /// Flip an item between active and inactive.
  Toggle { id: String },
  Remove { id: String },
  /// Insert the default categories and items into an empty catalog.
  Seed,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
  List,
  Add {
    #[arg(long)]
    name:        String,
    #[arg(long)]
    description: Option<String>,
  },
  Remove { id: String },
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// One `--item NAME:QTY:PRICE` argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemArg {
  pub name:       String,
  pub quantity:   Decimal,
  pub unit_price: Decimal,
}

/// One `--catalog-item ID[:QTY]` argument.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRef {
  pub id:       String,
  pub quantity: Decimal,
}

fn parse_decimal(s: &str, what: &str) -> Result<Decimal, String> {
  Decimal::from_str(s.trim()).map_err(|e| format!("invalid {what} {s:?}: {e}"))
}

/// `NAME:QTY:PRICE`; the name itself may contain colons.
pub fn parse_item(s: &str) -> Result<ItemArg, String> {
  let mut parts = s.rsplitn(3, ':');
  let (Some(price), Some(qty), Some(name)) = (parts.next(), parts.next(), parts.next()) else {
    return Err(format!("expected NAME:QTY:PRICE, got {s:?}"));
  };
  Ok(ItemArg {
    name:       name.trim().to_owned(),
    quantity:   parse_decimal(qty, "quantity")?,
    unit_price: parse_decimal(price, "price")?,
  })
}

/// `ID` or `ID:QTY`; quantity defaults to one.
pub fn parse_catalog_ref(s: &str) -> Result<CatalogRef, String> {
  match s.rsplit_once(':') {
    Some((id, qty)) => Ok(CatalogRef { id: id.to_owned(), quantity: parse_decimal(qty, "quantity")? }),
    None => Ok(CatalogRef { id: s.to_owned(), quantity: Decimal::ONE }),
  }
}

/// One `--set-item ITEM_ID:QTY:PRICE` argument; an empty part is left as is.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemUpdate {
  pub id:         String,
  pub quantity:   Option<Decimal>,
  pub unit_price: Option<Decimal>,
}

pub fn parse_item_update(s: &str) -> Result<ItemUpdate, String> {
  let mut parts = s.rsplitn(3, ':');
  let (Some(price), Some(qty), Some(id)) = (parts.next(), parts.next(), parts.next()) else {
    return Err(format!("expected ITEM_ID:QTY:PRICE, got {s:?}"));
  };
  let part = |v: &str, what: &str| match v.trim() {
    "" => Ok(None),
    v => parse_decimal(v, what).map(Some),
  };
  let update = ItemUpdate {
    id:         id.trim().to_owned(),
    quantity:   part(qty, "quantity")?,
    unit_price: part(price, "price")?,
  };
  if update.quantity.is_none() && update.unit_price.is_none() {
    return Err(format!("nothing to change in {s:?}"));
  }
  Ok(update)
}

pub fn parse_field(s: &str) -> Result<(String, String), String> {
  s.split_once('=')
    .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
    .filter(|(k, _)| !k.is_empty())
    .ok_or_else(|| format!("expected KEY=VALUE, got {s:?}"))
}

/// Who a new document is for and what it contains.
#[derive(Args, Debug)]
pub struct DraftArgs {
  /// Saved customer id; fills in name and contact.
  #[arg(long, conflicts_with_all = ["name", "contact"])]
  pub customer:      Option<String>,
  /// Customer name, when not using a saved customer.
  #[arg(long)]
  pub name:          Option<String>,
  /// Customer contact (email, phone), when not using a saved customer.
  #[arg(long)]
  pub contact:       Option<String>,
  /// Line item. Repeatable.
  #[arg(long = "item", value_name = "NAME:QTY:PRICE", value_parser = parse_item)]
  pub items:         Vec<ItemArg>,
  /// Line item taken from the catalog. Repeatable.
  #[arg(long = "catalog-item", value_name = "ID[:QTY]", value_parser = parse_catalog_ref)]
  pub catalog_items: Vec<CatalogRef>,
  /// Tax rate in percent.
  #[arg(long)]
  pub tax_rate:      Option<Decimal>,
  /// Document date (YYYY-MM-DD); defaults to today.
  #[arg(long)]
  pub date:          Option<NaiveDate>,
  /// Custom field value. Repeatable.
  #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
  pub fields:        Vec<(String, String)>,
}

/// Changes to an existing quotation or invoice.
#[derive(Args, Debug)]
pub struct EditArgs {
  pub id:                String,
  #[arg(long)]
  pub name:              Option<String>,
  #[arg(long)]
  pub contact:           Option<String>,
  /// Document date (YYYY-MM-DD).
  #[arg(long)]
  pub date:              Option<NaiveDate>,
  /// Tax rate in percent; 0 removes tax.
  #[arg(long)]
  pub tax_rate:          Option<Decimal>,
  /// Append a line item. Repeatable.
  #[arg(long = "add-item", value_name = "NAME:QTY:PRICE", value_parser = parse_item)]
  pub add_items:         Vec<ItemArg>,
  /// Append a line item from the catalog. Repeatable.
  #[arg(long = "add-catalog-item", value_name = "ID[:QTY]", value_parser = parse_catalog_ref)]
  pub add_catalog_items: Vec<CatalogRef>,
  /// Change quantity and/or price of a line. Repeatable.
  #[arg(long = "set-item", value_name = "ITEM_ID:QTY:PRICE", value_parser = parse_item_update)]
  pub set_items:         Vec<ItemUpdate>,
  /// Rename a line. Repeatable.
  #[arg(long = "rename-item", value_name = "ITEM_ID=NAME", value_parser = parse_field)]
  pub rename_items:      Vec<(String, String)>,
  /// Drop a line. Repeatable.
  #[arg(long = "remove-item", value_name = "ITEM_ID")]
  pub remove_items:      Vec<String>,
  /// Set a custom field; an empty value removes it. Repeatable.
  #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field)]
  pub fields:            Vec<(String, String)>,
}

#[derive(Subcommand, Debug)]
pub enum QuoteCommand {
  List,
  Show { id: String },
  New(DraftArgs),
  Edit(EditArgs),
  Status { id: String, status: QuotationStatus },
  Remove { id: String },
}

#[derive(Subcommand, Debug)]
pub enum InvoiceCommand {
  List,
  Show {
    id: String,
  },
  /// Create an invoice directly, numbered from the invoice counter.
  New {
    #[command(flatten)]
    draft: DraftArgs,
    /// Due date (YYYY-MM-DD).
    #[arg(long)]
    due:   Option<NaiveDate>,
  },
  Edit {
    #[command(flatten)]
    edit: EditArgs,
    /// Due date (YYYY-MM-DD).
    #[arg(long)]
    due:  Option<NaiveDate>,
  },
  Status {
    id:     String,
    status: InvoiceStatus,
  },
  Remove {
    id: String,
  },
}

// ─── Templates ───────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
  /// Built-in templates followed by custom ones.
  List,
  Show { id: String },
  /// The template exports and prints currently use.
  Active,
  /// Make a template the active one.
  Use { id: String },
  /// Forget the active template and fall back to the default.
  Clear,
  /// Create a custom template from an existing one.
  Create {
    #[arg(long)]
    name:        String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = MODERN_STANDARD)]
    base:        String,
  },
  /// Edit a custom template. Settings use their camelCase names, with
  /// dots for nested values: `primaryColor=#0f766e showWatermark=true
  /// margins.top=25`.
  Set {
    id:          String,
    #[arg(long)]
    name:        Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(value_name = "KEY=VALUE", value_parser = parse_field)]
    settings:    Vec<(String, String)>,
  },
  Remove { id: String },
}

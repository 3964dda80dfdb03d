//! Remaps localized records onto a destination header layout.
//!
//! Each destination header is matched against an ordered rule table by
//! case-insensitive substring tests; the first rule that matches decides the
//! column's source. Columns without a rule, and blank headers, stay empty.

use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::error::{HarvestError, Result};
use crate::record::{Field, LocalizedRecord};
use crate::sheet;

pub const OUTPUT_SHEET: &str = "Exhibitor List";

/// Layout used when no reference template is available.
pub const DEFAULT_HEADERS: [&str; 19] = [
    "Company Name",
    "Stand Number",
    "Country",
    "City",
    "Address",
    "Postal Code",
    "Phone",
    "Fax",
    "Email",
    "Website",
    "Contact Person",
    "Industry Sector",
    "Product Categories",
    "Company Description",
    "Hall/Pavilion",
    "Region/State",
    "Social Media",
    "Number of Products",
    "Company ID",
];

pub fn default_headers() -> Vec<String> {
    DEFAULT_HEADERS.iter().map(|h| h.to_string()).collect()
}

/// Social fields joined into the combined social-media column, in this order.
const SOCIAL_FIELDS: [Field; 5] = [
    Field::Facebook,
    Field::Twitter,
    Field::LinkedIn,
    Field::Instagram,
    Field::Youtube,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Computed {
    /// Name guessed from the first email address.
    ContactPerson,
    /// All social links joined with "; ".
    SocialMedia,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Field(Field),
    Computed(Computed),
}

impl Target {
    pub fn describe(self) -> &'static str {
        match self {
            Target::Field(f) => f.label(),
            Target::Computed(Computed::ContactPerson) => "contact person (from email)",
            Target::Computed(Computed::SocialMedia) => "social media (combined)",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Predicate {
    All(&'static [&'static str]),
    Any(&'static [&'static str]),
}

impl Predicate {
    fn matches(self, header: &str) -> bool {
        match self {
            Predicate::All(needles) => needles.iter().all(|n| header.contains(n)),
            Predicate::Any(needles) => needles.iter().any(|n| header.contains(n)),
        }
    }
}

/// Evaluated top to bottom against the lower-cased header; first match wins.
const RULES: &[(Predicate, Target)] = &[
    (Predicate::All(&["company", "name"]), Target::Field(Field::Name)),
    (Predicate::Any(&["stand", "booth"]), Target::Field(Field::Stand)),
    (Predicate::Any(&["country"]), Target::Field(Field::Country)),
    (Predicate::Any(&["city"]), Target::Field(Field::Town)),
    (Predicate::Any(&["address"]), Target::Field(Field::Address)),
    (Predicate::Any(&["postal", "zip"]), Target::Field(Field::Postcode)),
    (Predicate::Any(&["phone", "tel"]), Target::Field(Field::Telephone)),
    (Predicate::Any(&["fax"]), Target::Field(Field::Fax)),
    (Predicate::Any(&["email", "mail"]), Target::Field(Field::Email)),
    (Predicate::Any(&["website", "web"]), Target::Field(Field::Web)),
    (
        Predicate::All(&["contact", "person"]),
        Target::Computed(Computed::ContactPerson),
    ),
    (Predicate::Any(&["industry", "sector"]), Target::Field(Field::Sectors)),
    (
        Predicate::All(&["product", "categories"]),
        Target::Field(Field::SubIndustry),
    ),
    (Predicate::Any(&["description"]), Target::Field(Field::Description)),
    (Predicate::Any(&["hall", "pavilion"]), Target::Field(Field::Pavilion)),
    (Predicate::Any(&["region", "state"]), Target::Field(Field::County)),
    (
        Predicate::All(&["social", "media"]),
        Target::Computed(Computed::SocialMedia),
    ),
    (
        Predicate::All(&["number", "products"]),
        Target::Field(Field::NumberOfProducts),
    ),
    (Predicate::All(&["company", "id"]), Target::Field(Field::CompanyId)),
];

pub fn match_header(header: &str) -> Option<Target> {
    if header.trim().is_empty() {
        return None;
    }
    let lower = header.to_lowercase();
    RULES
        .iter()
        .find(|(pred, _)| pred.matches(&lower))
        .map(|(_, target)| *target)
}

/// Destination headers paired with their resolved targets, in header order.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    entries: Vec<(String, Option<Target>)>,
}

impl FieldMapping {
    pub fn build(headers: &[String]) -> Self {
        FieldMapping {
            entries: headers
                .iter()
                .map(|h| (h.clone(), match_header(h)))
                .collect(),
        }
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(h, _)| h.as_str())
    }

    pub fn targets(&self) -> impl Iterator<Item = Option<Target>> + '_ {
        self.entries.iter().map(|(_, t)| *t)
    }

    pub fn mapped_count(&self) -> usize {
        self.entries.iter().filter(|(_, t)| t.is_some()).count()
    }

    /// Non-blank headers no rule matched.
    pub fn unmapped(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(h, t)| t.is_none() && !h.trim().is_empty())
            .map(|(h, _)| h.as_str())
            .collect()
    }

    pub fn print_report(&self) {
        println!("\nField mapping:");
        for (header, target) in &self.entries {
            if let Some(t) = target {
                println!("  \"{}\" <- {}", header, t.describe());
            }
        }

        println!("\n=== Mapping check ===");
        println!("Destination headers: {}", self.entries.len());
        println!("Mapped headers:      {}", self.mapped_count());
        let unmapped = self.unmapped();
        if !unmapped.is_empty() {
            println!("\nUnmapped headers:");
            for h in unmapped {
                println!("  \"{}\"", h);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedRow {
    pub cells: Vec<String>,
}

/// Output table: `rows[i].cells[j]` is the value under `headers[j]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub headers: Vec<String>,
    pub rows: Vec<MappedRow>,
}

#[cfg(test)]
impl Conversion {
    /// Value under the first column named `header`.
    pub fn get(&self, row: usize, header: &str) -> Option<&str> {
        let col = self.headers.iter().position(|h| h == header)?;
        self.rows.get(row)?.cells.get(col).map(String::as_str)
    }
}

pub fn convert(records: &[LocalizedRecord], headers: &[String]) -> Conversion {
    let mapping = FieldMapping::build(headers);

    let rows = records
        .iter()
        .map(|record| MappedRow {
            cells: mapping.targets().map(|t| resolve(record, t)).collect(),
        })
        .collect();

    Conversion {
        headers: mapping.headers().map(str::to_string).collect(),
        rows,
    }
}

fn resolve(record: &LocalizedRecord, target: Option<Target>) -> String {
    match target {
        None => String::new(),
        Some(Target::Computed(Computed::ContactPerson)) => {
            extract_contact_person(record.text(Field::Email))
        }
        Some(Target::Computed(Computed::SocialMedia)) => combine_social_media(record),
        Some(Target::Field(Field::Web)) => match record.get(Field::Web) {
            Some(v) => normalize_website(&render_value(v)),
            None => String::new(),
        },
        Some(Target::Field(field)) => record.get(field).map(render_value).unwrap_or_default(),
    }
}

/// Uniform cell rendering: Y/N for booleans, "" for null, trimmed text otherwise.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Bool(true) => "Y".to_string(),
        Value::Bool(false) => "N".to_string(),
        Value::Null => String::new(),
        other => sheet::value_text(other).trim().to_string(),
    }
}

/// Guess a display name from the local part of the first address in a
/// `;`-separated email list: `jane.doe@x` -> `Jane Doe`.
pub fn extract_contact_person(email: &str) -> String {
    if email.is_empty() {
        return String::new();
    }
    let first = email.split(';').next().unwrap_or("").trim();
    let local = first.split('@').next().unwrap_or("");

    local.split('.').map(capitalize).collect::<Vec<_>>().join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => {
            let rest = chars.as_str().to_lowercase();
            c.to_uppercase().chain(rest.chars()).collect()
        }
        None => String::new(),
    }
}

pub fn combine_social_media(record: &LocalizedRecord) -> String {
    SOCIAL_FIELDS
        .iter()
        .map(|f| record.text(*f).trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn normalize_website(website: &str) -> String {
    let url = website.trim();
    if url.is_empty() {
        return String::new();
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Write the converted table as a single-sheet workbook. Returns the row count.
pub fn write_formatted(conversion: &Conversion, path: &Path) -> Result<usize> {
    if conversion.rows.is_empty() {
        return Err(HarvestError::NoData);
    }
    let rows: Vec<Vec<Value>> = conversion
        .rows
        .iter()
        .map(|r| r.cells.iter().cloned().map(Value::String).collect())
        .collect();
    sheet::write_sheet(path, OUTPUT_SHEET, &conversion.headers, &rows)?;
    info!("Saved formatted workbook to {}", path.display());
    Ok(rows.len())
}

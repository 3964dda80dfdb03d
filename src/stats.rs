use std::collections::HashMap;

use itertools::Itertools;

use crate::record::{Field, LocalizedRecord};
use crate::sheet::value_text;

const TOP_N: usize = 10;
const UNKNOWN: &str = "Unknown";

pub struct Summary {
    pub total: usize,
    pub countries: Vec<(String, usize)>,
    pub sectors: Vec<(String, usize)>,
    pub with_email: usize,
    pub with_website: usize,
    pub with_phone: usize,
    pub with_stand: usize,
}

impl Summary {
    pub fn from_records(records: &[LocalizedRecord]) -> Self {
        let mut countries: HashMap<String, usize> = HashMap::new();
        let mut sectors: HashMap<String, usize> = HashMap::new();

        for r in records {
            let country = r.text(Field::Country).trim();
            let country = if country.is_empty() { UNKNOWN } else { country };
            *countries.entry(country.to_string()).or_default() += 1;

            let raw = r.text(Field::Sectors);
            if raw.trim().is_empty() {
                *sectors.entry(UNKNOWN.to_string()).or_default() += 1;
            }
            for sector in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                *sectors.entry(sector.to_string()).or_default() += 1;
            }
        }

        let filled = |field: Field| {
            records
                .iter()
                .filter(|r| r.get(field).is_some_and(|v| !value_text(v).trim().is_empty()))
                .count()
        };

        Summary {
            total: records.len(),
            countries: top(countries),
            sectors: top(sectors),
            with_email: filled(Field::Email),
            with_website: filled(Field::Web),
            with_phone: filled(Field::Telephone),
            with_stand: filled(Field::Stand),
        }
    }

    pub fn print(&self) {
        println!("\n=== Collection summary ===");
        println!("Companies: {}", self.total);

        println!("\nBy country (top {}):", TOP_N);
        for (country, n) in &self.countries {
            println!("  {}: {}", country, n);
        }

        println!("\nBy sector (top {}):", TOP_N);
        for (sector, n) in &self.sectors {
            println!("  {}: {}", sector, n);
        }

        println!("\nData quality:");
        for (label, n) in [
            ("Email", self.with_email),
            ("Website", self.with_website),
            ("Phone", self.with_phone),
            ("Stand", self.with_stand),
        ] {
            println!("  {:<8} {} ({:.1}%)", label, n, percent(n, self.total));
        }
    }
}

/// Highest counts first; ties broken by name so output is stable.
fn top(counts: HashMap<String, usize>) -> Vec<(String, usize)> {
    counts
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .take(TOP_N)
        .collect()
}

pub fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

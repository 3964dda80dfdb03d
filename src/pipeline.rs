use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Result};
use tracing::{error, info, warn};

use crate::error::HarvestError;
use crate::fetcher::{self, FetchOptions, HttpPageSource, PageSource};
use crate::mapper::{self, FieldMapping};
use crate::persist;
use crate::record::{ExhibitorRecord, LocalizedRecord};
use crate::settings::Settings;
use crate::stats::Summary;
use crate::template::{self, TemplateDescriptor};

pub struct RunOptions {
    /// Skip the template check and analysis; format with the default headers.
    pub skip_template: bool,
    /// Keep going when the template file is missing.
    pub force: bool,
}

/// Collect -> analyze template -> format, passing records and headers along.
pub async fn run_full(settings: &Settings, opts: &RunOptions) -> Result<()> {
    let source = HttpPageSource::new(settings)?;
    run_with(&source, settings, opts).await
}

async fn run_with<S: PageSource>(source: &S, settings: &Settings, opts: &RunOptions) -> Result<()> {
    println!("Full workflow: collect -> analyze template -> format");
    println!("{}", "=".repeat(60));

    if !opts.skip_template && !template_present(&settings.template_path) && !opts.force {
        println!("Use --force to continue with the default layout, or add the template file.");
        bail!(
            "reference template {} not found, aborting before collection",
            settings.template_path.display()
        );
    }

    println!("\nSTEP 1: collect");
    println!("{}", "-".repeat(40));
    let records = collect_from(source, settings).await;

    let mut headers = None;
    if !opts.skip_template {
        println!("\nSTEP 2: analyze template");
        println!("{}", "-".repeat(40));
        match analyze(&settings.template_path) {
            Ok(d) => headers = d.destination_headers(),
            Err(e) => warn!("Template analysis failed ({}), using default headers", e),
        }
    }

    println!("\nSTEP 3: format");
    println!("{}", "-".repeat(40));
    if records.is_empty() {
        warn!("Nothing collected, skipping format");
    } else {
        format(settings, &records, headers);
    }

    println!("\n{}", "=".repeat(60));
    print_outputs(settings);
    Ok(())
}

fn template_present(path: &Path) -> bool {
    if path.exists() {
        info!("Reference template found: {}", path.display());
        true
    } else {
        warn!("Reference template not found: {}", path.display());
        false
    }
}

/// Fetch every page from the live endpoint, print the summary and write both sinks.
pub async fn collect(settings: &Settings) -> Result<Vec<LocalizedRecord>> {
    let source = HttpPageSource::new(settings)?;
    Ok(collect_from(&source, settings).await)
}

/// Sink failures are logged; the collected records are returned either way.
async fn collect_from<S: PageSource>(source: &S, settings: &Settings) -> Vec<LocalizedRecord> {
    let t0 = Instant::now();
    let raw = fetcher::fetch_all(source, &FetchOptions::from(settings)).await;
    println!(
        "Collected {} companies in {:.1}s",
        raw.len(),
        t0.elapsed().as_secs_f64()
    );

    if raw.is_empty() {
        println!("No data collected.");
        return Vec::new();
    }

    let records: Vec<LocalizedRecord> = raw.iter().map(LocalizedRecord::from_raw).collect();
    Summary::from_records(&records).print();

    println!("\nSaving files...");
    save_sinks(&raw, settings);
    records
}

fn save_sinks(raw: &[ExhibitorRecord], settings: &Settings) {
    if let Err(e) = persist::save_json(raw, &settings.json_path) {
        error!("JSON sink failed: {}", e);
    }
    if let Err(e) = persist::save_localized_xlsx(raw, &settings.localized_xlsx_path) {
        error!("Spreadsheet sink failed: {}", e);
    }
}

/// Inspect the reference template and print the operator report.
pub fn analyze(path: &Path) -> Result<TemplateDescriptor, HarvestError> {
    let d = template::inspect(path)?;
    template::print_report(path, &d);
    template::print_mapping_suggestions(&d);
    template::print_headers_array(&d);
    Ok(d)
}

/// Map records onto `headers` (or the default layout) and write the workbook.
///
/// Failures are logged and leave no formatted file behind.
pub fn format(settings: &Settings, records: &[LocalizedRecord], headers: Option<Vec<String>>) {
    let headers = headers.unwrap_or_else(|| {
        info!("Using the default {}-column layout", mapper::DEFAULT_HEADERS.len());
        mapper::default_headers()
    });
    let mapping = FieldMapping::build(&headers);
    mapping.print_report();

    let conversion = mapper::convert(records, &headers);
    info!("Converted {} records to the destination layout", conversion.rows.len());
    match mapper::write_formatted(&conversion, &settings.formatted_xlsx_path) {
        Ok(n) => println!(
            "\nWrote {} rows to {}",
            n,
            settings.formatted_xlsx_path.display()
        ),
        Err(e) => error!("Format step failed: {}", e),
    }
}

/// Format step on its own: reload the cached records and re-read the template.
pub fn format_only(settings: &Settings) -> Result<()> {
    let headers = match template::inspect(&settings.template_path) {
        Ok(d) => d.destination_headers(),
        Err(e) => {
            warn!("Template unavailable ({}), using default headers", e);
            None
        }
    };

    let records = match persist::load_records(&settings.localized_xlsx_path, &settings.json_path) {
        Ok(r) => r,
        Err(e) => {
            error!("No collected data to format: {}", e);
            return Ok(());
        }
    };
    Summary::from_records(&records).print();
    format(settings, &records, headers);
    Ok(())
}

fn print_outputs(settings: &Settings) {
    let outputs: [(&PathBuf, &str); 3] = [
        (&settings.json_path, "raw JSON records"),
        (&settings.localized_xlsx_path, "localized spreadsheet"),
        (&settings.formatted_xlsx_path, "destination layout spreadsheet"),
    ];
    println!("Output files:");
    for (path, what) in outputs {
        let mark = if path.exists() { "+" } else { "-" };
        println!("  {} {:<40} ({})", mark, path.display(), what);
    }
}

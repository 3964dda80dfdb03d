use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::error::Result;
use crate::mapper;
use crate::sheet::{self, value_text};

const SAMPLE_ROWS: usize = 2;

/// Structure of a reference workbook's first sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDescriptor {
    pub sheet_names: Vec<String>,
    pub main_sheet: String,
    /// Row 0 of the first sheet; blanks and duplicates kept.
    pub headers: Vec<String>,
    pub sample_rows: Vec<Vec<String>>,
    pub total_rows: usize,
    /// Header row of each remaining sheet, shown in the report only.
    pub other_sheets: Vec<(String, Vec<String>)>,
}

impl TemplateDescriptor {
    /// Header list to format against, if the template actually has one.
    pub fn destination_headers(&self) -> Option<Vec<String>> {
        if self.headers.iter().all(|h| h.trim().is_empty()) {
            None
        } else {
            Some(self.headers.clone())
        }
    }
}

pub fn inspect(path: &Path) -> Result<TemplateDescriptor> {
    let sheet = sheet::read_first_sheet(path)?;

    let headers = header_texts(sheet.rows.first().map(Vec::as_slice).unwrap_or_default());
    let other_sheets = sheet
        .other_headers
        .iter()
        .map(|(name, row)| (name.clone(), header_texts(row)))
        .collect();

    let sample_rows = sheet
        .rows
        .iter()
        .skip(1)
        .take(SAMPLE_ROWS)
        .map(|row| row.iter().map(value_text).collect())
        .collect();

    let descriptor = TemplateDescriptor {
        main_sheet: sheet.sheet_names.first().cloned().unwrap_or_default(),
        sheet_names: sheet.sheet_names,
        headers,
        sample_rows,
        total_rows: sheet.rows.len(),
        other_sheets,
    };
    info!(
        "Template {}: {} headers on sheet \"{}\"",
        path.display(),
        descriptor.headers.len(),
        descriptor.main_sheet
    );
    Ok(descriptor)
}

/// Cell texts of a header row, trailing blanks dropped.
fn header_texts(row: &[Value]) -> Vec<String> {
    let mut headers: Vec<String> = row.iter().map(value_text).collect();
    while headers.last().is_some_and(|h| h.is_empty()) {
        headers.pop();
    }
    headers
}

pub fn print_report(path: &Path, d: &TemplateDescriptor) {
    println!("Workbook:");
    println!("  File:   {}", path.display());
    println!("  Sheets: {}", d.sheet_names.len());
    println!("  Names:  {}", d.sheet_names.join(", "));

    println!("\nSheet \"{}\"", d.main_sheet);
    println!("  Rows: {}", d.total_rows);
    println!("  Headers (row 1):");
    for (i, h) in d.headers.iter().enumerate() {
        println!("    {}. \"{}\"", i + 1, h);
    }

    if let Some(first) = d.sample_rows.first() {
        println!("  First data row:");
        for (header, value) in d.headers.iter().zip(first) {
            if !header.is_empty() && !value.is_empty() {
                println!("    {}: \"{}\"", header, value);
            }
        }
    }

    for (name, headers) in &d.other_sheets {
        println!("\nSheet \"{}\"", name);
        if headers.is_empty() {
            println!("  (no header row)");
        } else {
            println!("  Headers (row 1): {}", headers.join(" | "));
        }
    }
}

/// Which source each header would be filled from, using the live rule table.
pub fn print_mapping_suggestions(d: &TemplateDescriptor) {
    println!("\nMapping suggestions:");
    for header in d.headers.iter().filter(|h| !h.trim().is_empty()) {
        match mapper::match_header(header) {
            Some(target) => println!("  \"{}\": {}", header, target.describe()),
            None => println!("  \"{}\": unmapped", header),
        }
    }
}

pub fn print_headers_array(d: &TemplateDescriptor) {
    let array = Value::from(d.headers.clone());
    match serde_json::to_string_pretty(&array) {
        Ok(json) => println!("\nHeader array:\n{}", json),
        Err(e) => tracing::warn!("Could not render header array: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarvestError;
    use rust_xlsxwriter::Workbook;

    fn write_template(path: &Path) {
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        ws.set_name("Exhibitors").unwrap();
        ws.write_string(0, 0, "Company Name").unwrap();
        // column B left blank on purpose
        ws.write_string(0, 2, "Website").unwrap();
        ws.write_string(0, 3, "Company Name").unwrap();
        for r in 1..=4u32 {
            ws.write_string(r, 0, format!("Row {}", r)).unwrap();
            ws.write_number(r, 2, r as f64).unwrap();
        }
        ws.write_string(1, 5, "stray").unwrap();
        let notes = wb.add_worksheet();
        notes.set_name("Notes").unwrap();
        notes.write_string(0, 0, "Field").unwrap();
        notes.write_string(0, 1, "Value").unwrap();
        wb.add_worksheet().set_name("Empty").unwrap();
        wb.save(path).unwrap();
    }

    #[test]
    fn reads_header_row_and_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.xlsx");
        write_template(&path);

        let d = inspect(&path).unwrap();
        assert_eq!(d.sheet_names, vec!["Exhibitors", "Notes", "Empty"]);
        assert_eq!(d.main_sheet, "Exhibitors");
        // blank kept in place, trailing blanks dropped
        assert_eq!(d.headers, vec!["Company Name", "", "Website", "Company Name"]);
        assert_eq!(d.sample_rows.len(), 2);
        assert_eq!(d.sample_rows[0][0], "Row 1");
        assert_eq!(d.sample_rows[1][2], "2");
        assert_eq!(d.total_rows, 5);
        assert_eq!(d.destination_headers().unwrap().len(), 4);
    }

    #[test]
    fn collects_header_rows_of_other_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.xlsx");
        write_template(&path);

        let d = inspect(&path).unwrap();
        assert_eq!(
            d.other_sheets,
            vec![
                ("Notes".to_string(), vec!["Field".to_string(), "Value".to_string()]),
                ("Empty".to_string(), vec![]),
            ]
        );
        // main sheet headers are unaffected by later sheets
        assert_eq!(d.headers[0], "Company Name");
    }

    #[test]
    fn missing_template_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = inspect(&dir.path().join("absent.xlsx")).unwrap_err();
        assert!(matches!(err, HarvestError::FileNotFound(_)));
    }

    #[test]
    fn unreadable_template_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a workbook").unwrap();
        assert!(matches!(inspect(&path), Err(HarvestError::Parse { .. })));
    }

    #[test]
    fn blank_header_row_has_no_destination_headers() {
        let d = TemplateDescriptor {
            sheet_names: vec!["S".into()],
            main_sheet: "S".into(),
            headers: vec![String::new(), " ".into()],
            sample_rows: vec![],
            total_rows: 1,
            other_sheets: vec![],
        };
        assert!(d.destination_headers().is_none());
    }
}

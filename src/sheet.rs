use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use rust_xlsxwriter::Workbook;
use serde_json::{Number, Value};
use tracing::warn;

use crate::error::{HarvestError, Result};

const MAX_COLUMN_WIDTH: usize = 50;
const BLANK_HEADER_WIDTH: usize = 10;

/// First worksheet of a workbook, aligned so that `rows[0][0]` is cell A1.
pub struct FirstSheet {
    pub sheet_names: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Row 1 of every later sheet, by sheet name.
    pub other_headers: Vec<(String, Vec<Value>)>,
}

pub fn read_first_sheet(path: &Path) -> Result<FirstSheet> {
    if !path.exists() {
        return Err(HarvestError::FileNotFound(path.to_path_buf()));
    }
    let parse_err = |reason: String| HarvestError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| parse_err(e.to_string()))?;
    let sheet_names = workbook.sheet_names().to_vec();
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| parse_err("workbook has no worksheets".into()))?
        .map_err(|e| parse_err(e.to_string()))?;
    let rows = aligned_rows(&range);

    let mut other_headers = Vec::new();
    for (i, name) in sheet_names.iter().enumerate().skip(1) {
        match workbook.worksheet_range_at(i) {
            Some(Ok(range)) => {
                let header = aligned_rows(&range).into_iter().next().unwrap_or_default();
                other_headers.push((name.clone(), header));
            }
            Some(Err(e)) => warn!("Skipping sheet \"{}\": {}", name, e),
            None => {}
        }
    }

    Ok(FirstSheet {
        sheet_names,
        rows,
        other_headers,
    })
}

fn aligned_rows(range: &Range<Data>) -> Vec<Vec<Value>> {
    // calamine ranges start at the first used cell, not at A1
    let (row0, col0) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<Value>> = vec![Vec::new(); row0 as usize];
    for row in range.rows() {
        let mut cells = vec![Value::Null; col0 as usize];
        cells.extend(row.iter().map(cell_value));
        rows.push(cells);
    }
    rows
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        other => Value::String(other.to_string()),
    }
}

/// Text of a cell value the way it shows up in a spreadsheet: no `.0` on whole
/// numbers, nothing for null.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                let f = n.as_f64().unwrap_or_default();
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    (f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
        }
        other => other.to_string(),
    }
}

fn column_width(header: &str, rows: &[Vec<Value>], col: usize) -> usize {
    if header.is_empty() {
        return BLANK_HEADER_WIDTH;
    }
    let widest = rows
        .iter()
        .filter_map(|row| row.get(col))
        .map(|v| value_text(v).chars().count())
        .max()
        .unwrap_or(0);
    (header.chars().count().max(widest) + 2).min(MAX_COLUMN_WIDTH)
}

/// Write a single-sheet workbook: one header row, then `rows` in order.
pub fn write_sheet(
    path: &Path,
    sheet_name: &str,
    headers: &[String],
    rows: &[Vec<Value>],
) -> Result<()> {
    let write_err = |e: rust_xlsxwriter::XlsxError| HarvestError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name).map_err(write_err)?;

    for (col, header) in headers.iter().enumerate() {
        let c = col as u16;
        if !header.is_empty() {
            worksheet.write_string(0, c, header).map_err(write_err)?;
        }
        worksheet
            .set_column_width(c, column_width(header, rows, col) as f64)
            .map_err(write_err)?;
    }

    for (r, row) in rows.iter().enumerate() {
        let r = r as u32 + 1;
        for (c, value) in row.iter().enumerate() {
            let c = c as u16;
            match value {
                Value::Null => {}
                Value::String(s) if s.is_empty() => {}
                Value::Bool(b) => {
                    worksheet.write_boolean(r, c, *b).map_err(write_err)?;
                }
                Value::Number(n) => {
                    let f = n.as_f64().unwrap_or_default();
                    worksheet.write_number(r, c, f).map_err(write_err)?;
                }
                other => {
                    worksheet
                        .write_string(r, c, value_text(other))
                        .map_err(write_err)?;
                }
            }
        }
    }

    workbook.save(path).map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn whole_numbers_have_no_fraction() {
        assert_eq!(value_text(&json!(3)), "3");
        assert_eq!(value_text(&json!(3.0)), "3");
        assert_eq!(value_text(&json!(2.5)), "2.5");
        assert_eq!(value_text(&Value::Null), "");
        assert_eq!(value_text(&json!(true)), "true");
    }

    #[test]
    fn widths_are_capped_and_blank_headers_fixed() {
        let rows = vec![vec![json!("x".repeat(80)), json!("abc")]];
        assert_eq!(column_width("Long", &rows, 0), 50);
        assert_eq!(column_width("Name", &rows, 1), 6);
        assert_eq!(column_width("", &rows, 1), 10);
        assert_eq!(column_width("Header", &[], 0), 8);
    }

    #[test]
    fn written_sheet_reads_back_from_a1() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.xlsx");
        let headers = vec!["A".to_string(), String::new(), "C".to_string()];
        let rows = vec![vec![json!("x"), Value::Null, json!(7)]];
        write_sheet(&path, "Data", &headers, &rows).unwrap();

        let sheet = read_first_sheet(&path).unwrap();
        assert_eq!(sheet.sheet_names, vec!["Data".to_string()]);
        assert_eq!(sheet.rows[0][0], json!("A"));
        assert_eq!(sheet.rows[0][1], Value::Null);
        assert_eq!(sheet.rows[1][0], json!("x"));
        assert_eq!(value_text(&sheet.rows[1][2]), "7");
    }

    #[test]
    fn missing_workbook_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_first_sheet(&dir.path().join("none.xlsx")).err().unwrap();
        assert!(matches!(err, HarvestError::FileNotFound(_)));
    }
}

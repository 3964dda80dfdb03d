use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{HarvestError, Result};
use crate::record::{ExhibitorRecord, Field, LocalizedRecord};
use crate::sheet;

pub const LOCALIZED_SHEET: &str = "박람회_기업목록";

/// Raw records as pretty JSON, in collection order.
pub fn save_json(records: &[ExhibitorRecord], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(records).map_err(|e| HarvestError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    std::fs::write(path, json).map_err(|e| HarvestError::Write {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    info!("Saved {} records to {}", records.len(), path.display());
    Ok(())
}

/// Records under the localized headers, one column per `Field`.
pub fn save_localized_xlsx(records: &[ExhibitorRecord], path: &Path) -> Result<()> {
    let headers: Vec<String> = Field::ALL.iter().map(|f| f.label().to_string()).collect();
    let rows: Vec<Vec<Value>> = records
        .iter()
        .map(|raw| {
            let localized = LocalizedRecord::from_raw(raw);
            Field::ALL
                .iter()
                .map(|f| localized.get(*f).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    sheet::write_sheet(path, LOCALIZED_SHEET, &headers, &rows)?;
    info!("Saved {} records to {}", records.len(), path.display());
    Ok(())
}

pub fn load_json(path: &Path) -> Result<Vec<ExhibitorRecord>> {
    if !path.exists() {
        return Err(HarvestError::FileNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|source| HarvestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|e| HarvestError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Rows of the localized sheet. Columns with unknown headers are ignored.
pub fn load_localized_xlsx(path: &Path) -> Result<Vec<LocalizedRecord>> {
    let sheet = sheet::read_first_sheet(path)?;
    let mut rows = sheet.rows.into_iter();
    let columns: Vec<Option<Field>> = rows
        .next()
        .unwrap_or_default()
        .iter()
        .map(|h| h.as_str().and_then(Field::from_label))
        .collect();

    if columns.iter().all(Option::is_none) {
        return Err(HarvestError::Parse {
            path: path.to_path_buf(),
            reason: "no recognised column headers".into(),
        });
    }

    Ok(rows
        .map(|row| {
            columns
                .iter()
                .zip(row)
                .filter_map(|(field, value)| match (field, value) {
                    (Some(f), v) if !v.is_null() => Some((*f, v)),
                    _ => None,
                })
                .collect()
        })
        .collect())
}

/// Previously collected records: the localized sheet first, then the JSON dump.
pub fn load_records(xlsx_path: &Path, json_path: &Path) -> Result<Vec<LocalizedRecord>> {
    match load_localized_xlsx(xlsx_path) {
        Ok(records) => {
            info!("Loaded {} records from {}", records.len(), xlsx_path.display());
            Ok(records)
        }
        Err(e) => {
            warn!("Could not load {} ({}), trying {}", xlsx_path.display(), e, json_path.display());
            let raw = load_json(json_path)?;
            info!("Loaded {} records from {}", raw.len(), json_path.display());
            Ok(raw.iter().map(LocalizedRecord::from_raw).collect())
        }
    }
}

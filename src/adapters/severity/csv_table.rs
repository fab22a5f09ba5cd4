//! Loads the severity table from CSV. Uses the `csv` crate for parsing.
//!
//! Expected header: `Condition,Severity` (column names matched case-insensitively).

use crate::domain::{DomainError, SeverityEntry, SeverityTable, SeverityTier};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

const CONDITION_COLUMN: &str = "condition";
const SEVERITY_COLUMN: &str = "severity";

/// Raw `(condition, severity)` pairs from any reader, as written.
///
/// Rows with a blank condition or severity are skipped. A CSV-level error
/// (ragged row, bad UTF-8) or a missing column fails the whole load.
pub fn read_condition_rows<R: Read>(reader: R) -> Result<Vec<(String, String)>, DomainError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| DomainError::ConfigurationLoadFailed(format!("read CSV header: {}", e)))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                DomainError::ConfigurationLoadFailed(format!("missing CSV column '{}'", name))
            })
    };
    let condition_idx = column(CONDITION_COLUMN)?;
    let severity_idx = column(SEVERITY_COLUMN)?;

    let mut rows = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| {
            DomainError::ConfigurationLoadFailed(format!("malformed CSV row {}: {}", line + 2, e))
        })?;
        let condition = record.get(condition_idx).unwrap_or_default();
        let severity = record.get(severity_idx).unwrap_or_default();
        if condition.is_empty() || severity.is_empty() {
            continue;
        }
        rows.push((condition.to_string(), severity.to_string()));
    }
    Ok(rows)
}

/// Parse severity entries from any reader. Unrecognized tiers are kept as `Unknown`.
pub fn read_severity_entries<R: Read>(reader: R) -> Result<Vec<SeverityEntry>, DomainError> {
    let entries = read_condition_rows(reader)?
        .into_iter()
        .map(|(condition, severity)| {
            let tier = SeverityTier::parse(&severity);
            if tier == SeverityTier::Unknown {
                warn!(%condition, %severity, "unrecognized severity tier, storing as Unknown");
            }
            SeverityEntry::new(&condition, tier)
        })
        .collect();
    Ok(entries)
}

/// Load the severity table from a CSV file.
pub fn load_severity_table(path: &Path) -> Result<SeverityTable, DomainError> {
    let file = std::fs::File::open(path).map_err(|e| {
        DomainError::ConfigurationLoadFailed(format!("open {}: {}", path.display(), e))
    })?;
    let entries = read_severity_entries(file)?;
    Ok(SeverityTable::from_entries(entries))
}

/// Load the severity table, degrading to the hardcoded fallback on any failure.
///
/// Never fails: the service must start even without tabular data.
pub fn load_or_fallback(path: Option<&Path>) -> SeverityTable {
    let Some(path) = path else {
        warn!("no severity CSV configured, using fallback severity table");
        return SeverityTable::fallback();
    };
    match load_severity_table(path) {
        Ok(table) => {
            info!(
                path = %path.display(),
                rules = table.len(),
                "loaded severity rules from CSV"
            );
            table
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "severity CSV unavailable, using fallback severity table"
            );
            SeverityTable::fallback()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_entries_normalizes_and_skips_blank_rows() {
        let csv = "Condition,Severity\n Chickenpox ,High\nDry Scalp,low\n,Medium\nRingworm,\n";
        let entries = read_severity_entries(csv.as_bytes()).unwrap();

        assert_eq!(
            entries,
            vec![
                SeverityEntry::new("chickenpox", SeverityTier::High),
                SeverityEntry::new("dry scalp", SeverityTier::Low),
            ]
        );
    }

    #[test]
    fn test_read_entries_header_case_insensitive_and_reordered() {
        let csv = "severity,notes,CONDITION\nMedium,x,Nail Fungus\n";
        let entries = read_severity_entries(csv.as_bytes()).unwrap();
        assert_eq!(entries, vec![SeverityEntry::new("nail fungus", SeverityTier::Medium)]);
    }

    #[test]
    fn test_missing_column_is_load_failure() {
        let err = read_severity_entries("Disease,Tier\nacne,Low\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DomainError::ConfigurationLoadFailed(_)));
    }

    #[test]
    fn test_ragged_row_is_load_failure() {
        let err =
            read_severity_entries("Condition,Severity\nacne,Low,extra\n".as_bytes()).unwrap_err();
        assert!(matches!(err, DomainError::ConfigurationLoadFailed(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Condition,Severity").unwrap();
        writeln!(file, "Psoriasis,Medium").unwrap();
        writeln!(file, "Cellulitis,High").unwrap();

        let table = load_or_fallback(Some(file.path()));
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("PSORIASIS"), SeverityTier::Medium);
        assert_eq!(table.lookup("acne"), SeverityTier::Unknown);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let table = load_or_fallback(Some(&dir.path().join("missing.csv")));
        assert_eq!(table.len(), SeverityTable::fallback().len());
        assert_eq!(table.lookup("chickenpox"), SeverityTier::High);
    }

    #[test]
    fn test_no_path_falls_back() {
        let table = load_or_fallback(None);
        assert_eq!(table.lookup("acne"), SeverityTier::Low);
    }
}

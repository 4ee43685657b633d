// Pipeline ingestion: read the delimited sales export into raw rows

use crate::constants::is_na_value;
use crate::error::{IngestError, Result};
use crate::types::RawRecord;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Rows read from one source file, in file order
#[derive(Debug, Clone)]
pub struct SourceData {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<RawRecord>,
    /// SHA-256 of the file bytes, hex encoded
    pub sha256: String,
}

impl SourceData {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Read a CSV export. A missing file is reported as `SourceNotFound`,
/// any other failure as an I/O or CSV error.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_source(path: &Path) -> Result<SourceData> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(IngestError::SourceNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };

    let sha256 = hex::encode(Sha256::digest(&bytes));
    let (headers, rows) = parse_csv(&bytes)?;
    info!(rows = rows.len(), columns = headers.len(), %sha256, "Read source file");

    Ok(SourceData {
        path: path.to_path_buf(),
        headers,
        rows,
        sha256,
    })
}

/// Parse CSV bytes into headers and raw records.
/// Short rows leave trailing columns missing; extra cells are ignored.
pub fn parse_csv(bytes: &[u8]) -> Result<(Vec<String>, Vec<RawRecord>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let name = decode_field(field);
            if idx == 0 {
                name.trim_start_matches('\u{feff}').to_string()
            } else {
                name
            }
        })
        .collect();

    let mut rows = Vec::new();
    let mut record = csv::ByteRecord::new();
    while reader.read_byte_record(&mut record)? {
        let mut raw = RawRecord::new();
        for (idx, header) in headers.iter().enumerate() {
            let value = record
                .get(idx)
                .map(decode_field)
                .filter(|cell| !is_na_value(cell));
            raw.insert(header.clone(), value);
        }
        rows.push(raw);
    }

    debug!(rows = rows.len(), "Parsed CSV records");
    Ok((headers, rows))
}

/// UTF-8 when the bytes are valid UTF-8, otherwise Latin-1 (windows-1252)
pub fn decode_field(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => encoding_rs::WINDOWS_1252
            .decode_without_bom_handling(bytes)
            .0
            .into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_csv_maps_na_tokens_to_missing() {
        let data = b"ORDERNUMBER,COUNTRY,DEALSIZE\n10107,,NA\n10121,France,Small\n";
        let (headers, rows) = parse_csv(data).unwrap();

        assert_eq!(headers, vec!["ORDERNUMBER", "COUNTRY", "DEALSIZE"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("ORDERNUMBER"), Some("10107"));
        assert_eq!(rows[0].get("COUNTRY"), None);
        assert_eq!(rows[0].get("DEALSIZE"), None);
        assert_eq!(rows[1].get("COUNTRY"), Some("France"));
    }

    #[test]
    fn parse_csv_decodes_latin1_cells() {
        // "Dragón" encoded as Latin-1
        let mut data = b"CUSTOMERNAME,COUNTRY\nDrag".to_vec();
        data.push(0xF3);
        data.extend_from_slice(b"n,Spain\n");

        let (_, rows) = parse_csv(&data).unwrap();
        assert_eq!(rows[0].get("CUSTOMERNAME"), Some("Dragón"));
    }

    #[test]
    fn parse_csv_strips_bom_and_tolerates_short_rows() {
        let data = "\u{feff}ORDERNUMBER,STATUS,COUNTRY\n10107,Shipped\n".as_bytes();
        let (headers, rows) = parse_csv(data).unwrap();

        assert_eq!(headers[0], "ORDERNUMBER");
        assert_eq!(rows[0].get("STATUS"), Some("Shipped"));
        assert!(rows[0].has_column("COUNTRY"));
        assert_eq!(rows[0].get("COUNTRY"), None);
    }

    #[test]
    fn read_source_reports_missing_file() {
        let result = read_source(Path::new("/definitely/not/here.csv"));
        assert!(matches!(result, Err(IngestError::SourceNotFound(_))));
    }
}

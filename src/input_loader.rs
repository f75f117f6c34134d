use std::fs;
use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::error::CrawlError;

/// Named-column row shape. Only used when the header actually carries the
/// column; headerless-style files go through the first-column fallback.
#[derive(Debug, Deserialize)]
struct CertRow {
    #[serde(rename = "Cert")]
    cert: String,
}

const CERT_COLUMN: &str = "Cert";

/// Read certificate identifiers from a delimited file.
///
/// Recognizes an exact `Cert` header column, falling back to the first
/// column when it is absent. Values are trimmed and blanks dropped; input
/// order is preserved. A missing or unparsable file aborts the run, there
/// is nothing to crawl without it.
pub fn load_certs<P: AsRef<Path>>(path: P) -> Result<Vec<String>, CrawlError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CrawlError::InputNotFound(path.to_path_buf()));
    }

    let raw = fs::read_to_string(path).map_err(|e| malformed(path, e))?;
    // Spreadsheet exports routinely lead with a byte-order mark.
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(&raw);

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());

    let has_cert_column = rdr
        .headers()
        .map_err(|e| malformed(path, e))?
        .iter()
        .any(|h| h == CERT_COLUMN);

    let mut certs = Vec::new();
    if has_cert_column {
        for row in rdr.deserialize::<CertRow>() {
            let row = row.map_err(|e| malformed(path, e))?;
            push_nonblank(&mut certs, &row.cert);
        }
    } else {
        for row in rdr.records() {
            let row = row.map_err(|e| malformed(path, e))?;
            if let Some(first) = row.get(0) {
                push_nonblank(&mut certs, first);
            }
        }
    }

    info!("Loaded {} cert(s) from {:?}", certs.len(), path);
    Ok(certs)
}

fn push_nonblank(certs: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        certs.push(value.to_string());
    }
}

fn malformed(path: &Path, reason: impl ToString) -> CrawlError {
    CrawlError::InputMalformed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_input(content: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content).unwrap();
        f
    }

    #[test]
    fn cert_column_trims_and_skips_blanks() {
        let f = write_input(b"Cert,Grade\n1234567890,9.8\n  ,\n2000000555,9.6\n");
        let certs = load_certs(f.path()).unwrap();
        assert_eq!(certs, vec!["1234567890", "2000000555"]);
    }

    #[test]
    fn tolerates_byte_order_mark() {
        let f = write_input(b"\xef\xbb\xbfCert\n42\n");
        let certs = load_certs(f.path()).unwrap();
        assert_eq!(certs, vec!["42"]);
    }

    #[test]
    fn column_match_is_case_sensitive() {
        // "cert" is not "Cert": the loader takes the first column instead.
        let f = write_input(b"cert,extra\nabc,x\ndef,y\n");
        let certs = load_certs(f.path()).unwrap();
        assert_eq!(certs, vec!["abc", "def"]);
    }

    #[test]
    fn falls_back_to_first_column() {
        let f = write_input(b"Serial,Notes\n111,first\n,blank\n222,second\n");
        let certs = load_certs(f.path()).unwrap();
        assert_eq!(certs, vec!["111", "222"]);
    }

    #[test]
    fn missing_file_is_terminal() {
        let err = load_certs("definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, CrawlError::InputNotFound(_)));
    }

    #[test]
    fn ragged_rows_are_malformed() {
        let f = write_input(b"Cert,Grade\n123,9.8\n456,9.6,extra,cols\n");
        let err = load_certs(f.path()).unwrap_err();
        assert!(matches!(err, CrawlError::InputMalformed { .. }));
    }

    #[test]
    fn non_utf8_is_malformed() {
        let f = write_input(b"Cert\n\xff\xfe\x00bad\n");
        let err = load_certs(f.path()).unwrap_err();
        assert!(matches!(err, CrawlError::InputMalformed { .. }));
    }
}

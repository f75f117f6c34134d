use std::fs::{self, File};
use std::path::{Path, PathBuf};

use log::info;

use crate::error::CrawlError;

/// One output row: a certificate and its image URLs, first-seen order.
#[derive(Debug, Clone)]
pub struct ExtractionRecord {
    pub cert: String,
    pub images: Vec<String>,
}

/// Incremental writer for the record table.
///
/// Rows stream into `{path}.part` the moment each certificate finishes, so
/// progress is always on disk. The final table needs a header sized to the
/// widest row (`cert, image_1 .. image_N`), which is only known at the end:
/// `finish` rewrites the part file with the header and padded rows, then
/// renames it over the final path.
pub struct RecordWriter {
    final_path: PathBuf,
    temp_path: PathBuf,
    writer: csv::Writer<File>,
    rows: Vec<ExtractionRecord>,
}

impl RecordWriter {
    pub fn create(path: &Path) -> Result<Self, CrawlError> {
        let temp_path = part_path(path);
        let file = File::create(&temp_path).map_err(|e| CrawlError::Write {
            path: temp_path.clone(),
            source: e,
        })?;
        let writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
        Ok(RecordWriter {
            final_path: path.to_path_buf(),
            temp_path,
            writer,
            rows: Vec::new(),
        })
    }

    /// Append one record and flush it to disk immediately.
    pub fn append(&mut self, record: ExtractionRecord) -> Result<(), CrawlError> {
        self.writer.write_record(row_for(&record, 0))?;
        self.writer.flush().map_err(|e| CrawlError::Write {
            path: self.temp_path.clone(),
            source: e,
        })?;
        self.rows.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rewrite the table with its header and uniform width, then move it
    /// into place.
    pub fn finish(self) -> Result<PathBuf, CrawlError> {
        let RecordWriter {
            final_path,
            temp_path,
            writer,
            rows,
        } = self;
        drop(writer);

        let width = rows.iter().map(|r| r.images.len()).max().unwrap_or(0);

        let file = File::create(&temp_path).map_err(|e| CrawlError::Write {
            path: temp_path.clone(),
            source: e,
        })?;
        let mut out = csv::Writer::from_writer(file);

        let mut header = vec!["cert".to_string()];
        for i in 1..=width {
            header.push(format!("image_{}", i));
        }
        out.write_record(&header)?;

        for record in &rows {
            out.write_record(row_for(record, width))?;
        }
        out.flush().map_err(|e| CrawlError::Write {
            path: temp_path.clone(),
            source: e,
        })?;
        drop(out);

        fs::rename(&temp_path, &final_path).map_err(|e| CrawlError::Write {
            path: final_path.clone(),
            source: e,
        })?;
        info!("Wrote {} record(s) to {:?}", rows.len(), final_path);
        Ok(final_path)
    }
}

/// Row cells for a record, padded with empty cells up to `width` images.
/// A `width` of 0 means no padding (the incremental, flexible form).
fn row_for(record: &ExtractionRecord, width: usize) -> Vec<String> {
    let mut row = Vec::with_capacity(1 + width.max(record.images.len()));
    row.push(record.cert.clone());
    row.extend(record.images.iter().cloned());
    while row.len() < width + 1 {
        row.push(String::new());
    }
    row
}

fn part_path(final_path: &Path) -> PathBuf {
    let mut os = final_path.as_os_str().to_owned();
    os.push(".part");
    PathBuf::from(os)
}

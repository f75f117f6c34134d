use std::path::PathBuf;

use thiserror::Error;

/// Run-level and per-item failures.
///
/// Only the input variants abort the whole run; everything else is logged
/// at the point it occurs and stays confined to one certificate or one
/// image.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("input file {path} is not valid delimited text: {reason}")]
    InputMalformed { path: PathBuf, reason: String },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered {status}")]
    BadStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("submission failed for cert {cert}: {reason}")]
    Submission { cert: String, reason: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output table error: {0}")]
    Csv(#[from] csv::Error),
}

pub mod client;
pub mod config;
pub mod crawler;
pub mod downloader;
pub mod error;
pub mod input_loader;
pub mod logger;
pub mod output;
pub mod page;
pub mod submitter;

// Exporting types for convenience
pub use config::CrawlConfig;
pub use crawler::Crawler;
pub use error::CrawlError;
pub use output::{ExtractionRecord, RecordWriter};
pub use page::LookupForm;
pub use submitter::DetailPage;

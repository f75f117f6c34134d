use clap::Parser;

/// Run configuration. Built once in `main` and passed by reference to every
/// component; nothing reads it from ambient state.
#[derive(Parser, Debug, Clone)]
#[command(name = "cert-scraper", about = "Look up certificate IDs and save slab images")]
pub struct CrawlConfig {
    /// CSV with a "Cert" column (falls back to the first column).
    #[arg(long, default_value = "certs.csv")]
    pub input: std::path::PathBuf,

    /// Output table: one row per cert with its image URLs.
    #[arg(long, default_value = "cert_images.csv")]
    pub output_csv: std::path::PathBuf,

    /// Root directory for downloaded images ({root}/{cert}/image_N.ext).
    #[arg(long, default_value = "images")]
    pub output_root: std::path::PathBuf,

    /// Page carrying the certificate lookup form.
    #[arg(long, default_value = "https://www.cgccards.com/")]
    pub start_url: String,

    /// HTTP proxy endpoint; when set, every request goes through it.
    #[arg(long)]
    pub proxy: Option<String>,

    /// Identifying user agent sent on every request.
    #[arg(
        long,
        default_value = "Mozilla/5.0 (compatible; CertScraper/1.0; +https://www.example.com)"
    )]
    pub user_agent: String,

    /// Per-request timeout, seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Retries after the first attempt, transient failures only.
    #[arg(long, default_value_t = 2)]
    pub retry_times: u32,

    /// Simultaneously in-flight requests. Kept small to stay under
    /// anti-automation thresholds.
    #[arg(long, default_value_t = 2)]
    pub concurrency: usize,

    /// How many candidate field names to try when the lookup field cannot
    /// be identified. The original behavior is a single shot.
    #[arg(long, default_value_t = 1)]
    pub max_fallback_attempts: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = CrawlConfig::parse_from(["cert-scraper"]);
        assert_eq!(cfg.concurrency, 2);
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.retry_times, 2);
        assert_eq!(cfg.max_fallback_attempts, 1);
        assert_eq!(cfg.input, std::path::PathBuf::from("certs.csv"));
        assert!(cfg.proxy.is_none());
    }

    #[test]
    fn overrides() {
        let cfg = CrawlConfig::parse_from([
            "cert-scraper",
            "--input",
            "mine.csv",
            "--proxy",
            "http://user:pw@proxy.example:8001",
            "--max-fallback-attempts",
            "3",
        ]);
        assert_eq!(cfg.input, std::path::PathBuf::from("mine.csv"));
        assert_eq!(cfg.proxy.as_deref(), Some("http://user:pw@proxy.example:8001"));
        assert_eq!(cfg.max_fallback_attempts, 3);
    }
}

use std::sync::Mutex;

use clap::Parser;
use log::{error, info};
use url::Url;

use cert_scraper_lib::{client, input_loader, logger, page};
use cert_scraper_lib::{CrawlConfig, CrawlError, Crawler, RecordWriter};

fn main() {
    logger::init();
    let config = CrawlConfig::parse();

    if let Err(e) = run(&config) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: &CrawlConfig) -> Result<(), CrawlError> {
    info!("Starting certificate lookup crawl...");

    // 1. Load certs. Input problems are the only thing that stops the run.
    let certs = input_loader::load_certs(&config.input)?;
    if certs.is_empty() {
        error!("No certs found in {:?} - nothing to do.", config.input);
        return Ok(());
    }

    // 2. One shared client: proxy, cookies, timeout, identifying UA.
    let client = client::build_client(config)?;

    // 3. Fetch the lookup page and locate the form, once for the whole run.
    let start_url = Url::parse(&config.start_url)?;
    info!("Fetching lookup page {}", start_url);
    let resp = client::send_with_retry(config, || client.get(start_url.clone()))?;
    let resp = client::ensure_success(resp)?;
    let page_url = resp.url().clone();
    let body = resp.text()?;

    info!("Fetched lookup page, locating certificate input & form...");
    let form = page::locate_lookup_form(&body, &page_url);
    match &form.field_name {
        Some(name) => info!("Found lookup input name='{}'", name),
        None => info!("No usable input name; submitting in fallback mode for all certs"),
    }

    // 4. Crawl.
    info!("Submitting lookups for {} cert(s)...", certs.len());
    let total = certs.len();
    let writer = Mutex::new(RecordWriter::create(&config.output_csv)?);
    Crawler::new(&client, config, &form).run(certs, &writer);

    // 5. Finalize the record table.
    let writer = writer.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
    let emitted = writer.len();
    writer.finish()?;

    info!("Crawl completed: {} of {} cert(s) produced records.", emitted, total);
    Ok(())
}

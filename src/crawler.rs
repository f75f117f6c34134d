use std::collections::VecDeque;
use std::sync::Mutex;
use std::thread;

use log::{error, info};
use reqwest::blocking::Client;

use crate::config::CrawlConfig;
use crate::downloader;
use crate::output::{ExtractionRecord, RecordWriter};
use crate::page::{self, LookupForm};
use crate::submitter;

/// Drives certificates through the submit → extract → record → download
/// pipeline over a bounded worker pool.
pub struct Crawler<'a> {
    client: &'a Client,
    config: &'a CrawlConfig,
    form: &'a LookupForm,
}

impl<'a> Crawler<'a> {
    pub fn new(client: &'a Client, config: &'a CrawlConfig, form: &'a LookupForm) -> Self {
        Crawler {
            client,
            config,
            form,
        }
    }

    /// Process every certificate. The worker count is the in-flight request
    /// cap: each worker holds at most one request open at a time, and a
    /// certificate's downloads only start once its detail page is in hand.
    /// Certificates are independent; one failing never stops the rest.
    pub fn run(&self, certs: Vec<String>, writer: &Mutex<RecordWriter>) {
        let queue = Mutex::new(VecDeque::from(certs));
        let workers = self.config.concurrency.max(1);

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let next = queue.lock().unwrap().pop_front();
                    let Some(cert) = next else { break };
                    self.process_cert(&cert, writer);
                });
            }
        });
    }

    fn process_cert(&self, cert: &str, writer: &Mutex<RecordWriter>) {
        info!("Looking up cert {}", cert);
        let page = match submitter::submit(self.client, self.config, self.form, cert) {
            Ok(page) => page,
            Err(e) => {
                error!("Giving up on cert {}: {}", cert, e);
                return;
            }
        };

        let images = page::extract_image_urls(&page.body, &page.url);
        if images.is_empty() {
            info!("No images found for cert {}.", cert);
        } else {
            info!("Found {} image(s) for cert {}.", images.len(), cert);
        }

        // The record goes out before any downloads, images found or not.
        let record = ExtractionRecord {
            cert: cert.to_string(),
            images: images.iter().map(|u| u.to_string()).collect(),
        };
        if let Err(e) = writer.lock().unwrap().append(record) {
            error!("Failed to write record for cert {}: {}", cert, e);
        }

        downloader::download_images(self.client, self.config, cert, &images);
    }
}

use std::thread;
use std::time::Duration;

use log::warn;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use reqwest::StatusCode;

use crate::config::CrawlConfig;
use crate::error::CrawlError;

/// Pause between retry attempts. Fixed; backoff shaping is out of scope.
const RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Build the one shared client: cookie jar (the lookup form is session
/// backed), client-level timeout, identifying user agent on every request,
/// and the proxy when one is configured.
pub fn build_client(config: &CrawlConfig) -> Result<Client, CrawlError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    let mut builder = Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .cookie_store(true);

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }

    Ok(builder.build()?)
}

/// Send a request, retrying transient failures up to the configured count.
///
/// `build` must produce a fresh request each call; a builder cannot be
/// re-sent once consumed.
pub fn send_with_retry<F>(config: &CrawlConfig, build: F) -> Result<Response, CrawlError>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match build().send() {
            Ok(resp) => {
                let status = resp.status();
                if is_transient_status(status) && attempt <= config.retry_times {
                    warn!(
                        "{} answered {}, retrying (attempt {}/{})",
                        resp.url(),
                        status,
                        attempt,
                        config.retry_times + 1
                    );
                    thread::sleep(RETRY_PAUSE);
                    continue;
                }
                return Ok(resp);
            }
            Err(e) => {
                if is_transient_error(&e) && attempt <= config.retry_times {
                    warn!(
                        "request failed ({}), retrying (attempt {}/{})",
                        e,
                        attempt,
                        config.retry_times + 1
                    );
                    thread::sleep(RETRY_PAUSE);
                    continue;
                }
                return Err(e.into());
            }
        }
    }
}

/// Map a non-success response to an error the caller can log and drop.
pub fn ensure_success(resp: Response) -> Result<Response, CrawlError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(CrawlError::BadStatus {
            url: resp.url().to_string(),
            status,
        })
    }
}

fn is_transient_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses() {
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_transient_status(StatusCode::NOT_FOUND));
        assert!(!is_transient_status(StatusCode::FORBIDDEN));
        assert!(!is_transient_status(StatusCode::OK));
    }
}

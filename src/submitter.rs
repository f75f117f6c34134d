use log::{info, warn};
use reqwest::blocking::Client;
use reqwest::Method;
use url::Url;

use crate::client::{ensure_success, send_with_retry};
use crate::config::CrawlConfig;
use crate::error::CrawlError;
use crate::page::LookupForm;

/// Conservative field-name guesses tried after every name actually observed
/// on the form, in this order.
pub const FALLBACK_FIELD_GUESSES: [&str; 6] =
    ["cert", "certificate", "serial", "lookup", "search", "q"];

/// A detail page correlated with the certificate that produced it.
#[derive(Debug)]
pub struct DetailPage {
    pub cert: String,
    pub url: Url,
    pub body: String,
}

/// Produce exactly one detail page for a certificate.
///
/// Normal mode when the field name is known; if that attempt fails for any
/// reason the same certificate is retried once in fallback mode before
/// giving up. Failures never leak past the certificate being processed.
pub fn submit(
    client: &Client,
    config: &CrawlConfig,
    form: &LookupForm,
    cert: &str,
) -> Result<DetailPage, CrawlError> {
    if let Some(field) = &form.field_name {
        match send_form(client, config, form, &normal_form_data(form, field, cert), cert) {
            Ok(page) => return Ok(page),
            Err(e) => warn!(
                "Form submission failed for cert {}: {}. Falling back to manual submission.",
                cert, e
            ),
        }
    }
    submit_fallback(client, config, form, cert)
}

/// Form data for a normal-mode submission: the hidden fields carried on the
/// lookup page, the certificate value, and the activated "lookup" control.
fn normal_form_data(form: &LookupForm, field: &str, cert: &str) -> Vec<(String, String)> {
    let mut data = form.hidden.clone();
    data.push((field.to_string(), cert.to_string()));
    if let Some(submit) = &form.submit {
        data.push(submit.clone());
    }
    data
}

/// Candidate field keys for fallback mode: observed names first (document
/// order), then the fixed guess list.
pub fn fallback_candidates(form: &LookupForm) -> Vec<String> {
    form.candidate_names
        .iter()
        .cloned()
        .chain(FALLBACK_FIELD_GUESSES.iter().map(|s| s.to_string()))
        .collect()
}

fn submit_fallback(
    client: &Client,
    config: &CrawlConfig,
    form: &LookupForm,
    cert: &str,
) -> Result<DetailPage, CrawlError> {
    let candidates = fallback_candidates(form);
    let mut last_err = None;

    for field in candidates.iter().take(config.max_fallback_attempts.max(1)) {
        info!(
            "Attempting manual {} to {} with field '{}'",
            form.method, form.action, field
        );
        match send_form(
            client,
            config,
            form,
            &[(field.clone(), cert.to_string())],
            cert,
        ) {
            Ok(page) => return Ok(page),
            Err(e) => {
                warn!("Manual submission with field '{}' failed: {}", field, e);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| CrawlError::Submission {
        cert: cert.to_string(),
        reason: "no candidate field names to try".to_string(),
    }))
}

fn send_form(
    client: &Client,
    config: &CrawlConfig,
    form: &LookupForm,
    data: &[(String, String)],
    cert: &str,
) -> Result<DetailPage, CrawlError> {
    let resp = send_with_retry(config, || {
        if form.method == Method::GET {
            client.get(form.action.clone()).query(data)
        } else {
            client.post(form.action.clone()).form(data)
        }
    })?;
    let resp = ensure_success(resp)?;

    let url = resp.url().clone();
    let body = resp.text()?;
    Ok(DetailPage {
        cert: cert.to_string(),
        url,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_with(candidates: &[&str]) -> LookupForm {
        LookupForm {
            field_name: None,
            action: Url::parse("https://www.cgccards.com/certlookup").unwrap(),
            method: Method::POST,
            hidden: vec![("__token".to_string(), "t".to_string())],
            submit: Some(("lookup".to_string(), "1".to_string())),
            candidate_names: candidates.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn observed_names_come_before_fixed_guesses() {
        let candidates = fallback_candidates(&form_with(&["certNo", "email"]));
        assert_eq!(
            &candidates[..3],
            &["certNo".to_string(), "email".to_string(), "cert".to_string()]
        );
    }

    #[test]
    fn fixed_guesses_in_documented_order_when_nothing_observed() {
        let candidates = fallback_candidates(&form_with(&[]));
        assert_eq!(
            candidates,
            vec!["cert", "certificate", "serial", "lookup", "search", "q"]
        );
    }

    #[test]
    fn normal_data_carries_hidden_fields_and_submit_control() {
        let data = normal_form_data(&form_with(&[]), "certNumber", "12345");
        assert_eq!(
            data,
            vec![
                ("__token".to_string(), "t".to_string()),
                ("certNumber".to_string(), "12345".to_string()),
                ("lookup".to_string(), "1".to_string()),
            ]
        );
    }
}

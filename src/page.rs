//! Everything that knows the target site's markup.
//!
//! The lookup form location and the detail-page image selectors are the
//! schema this crawler depends on. When the site changes its markup, this
//! is the only module that needs to follow.

use log::warn;
use reqwest::Method;
use scraper::{Html, Selector};
use url::Url;

const TEL_INPUT: &str = r#"input[type="tel"]"#;
const FORM: &str = "form";
const HIDDEN_INPUT: &str = r#"input[type="hidden"]"#;
const LOOKUP_SUBMIT: &str = r#"button[name="lookup"], input[type="submit"][name="lookup"]"#;
const FORM_INPUT: &str = "form input";

const IMAGE_ANCHORS: &str = "div.certlookup-images-item a";
const IMAGE_ANCHOR_IMGS: &str = "div.certlookup-images-item a img";
const IMAGE_DIRECT_IMGS: &str = "div.certlookup-images-item img";

/// Where and how to submit a certificate lookup. Derived once per run from
/// the initial page fetch and shared by every submission.
#[derive(Debug, Clone)]
pub struct LookupForm {
    /// Field key for the certificate value. `None` puts every submission
    /// into fallback mode.
    pub field_name: Option<String>,
    /// Resolved form target; the page URL itself when the action is empty.
    pub action: Url,
    pub method: Method,
    /// Hidden fields carried along on normal-mode submissions.
    pub hidden: Vec<(String, String)>,
    /// Name/value of the "lookup" submit control, included in normal-mode
    /// form data as the activated control.
    pub submit: Option<(String, String)>,
    /// Every `name` observed on form inputs, document order. Seeds the
    /// fallback candidate list.
    pub candidate_names: Vec<String>,
}

fn sel(s: &str) -> Selector {
    Selector::parse(s).unwrap()
}

/// Locate the telephone-style certificate input and its enclosing form.
pub fn locate_lookup_form(body: &str, page_url: &Url) -> LookupForm {
    let doc = Html::parse_document(body);
    let tel_sel = sel(TEL_INPUT);

    let input = doc.select(&tel_sel).next();
    let field_name = match input {
        Some(el) => match el.value().attr("name") {
            Some(name) if !name.is_empty() => Some(name.to_string()),
            _ => {
                match el.value().attr("id") {
                    Some(id) => warn!(
                        "Lookup input has id='{}' but no name attribute; using fallback submission",
                        id
                    ),
                    None => warn!(
                        "Lookup input carries neither name nor id; using fallback submission"
                    ),
                }
                None
            }
        },
        None => {
            warn!("No telephone-style input found on the lookup page; using fallback submission");
            None
        }
    };

    // First form in the document that contains the matched input.
    let form = input.and_then(|input| {
        doc.select(&sel(FORM))
            .find(|f| f.select(&tel_sel).any(|i| i.id() == input.id()))
    });

    let action = form
        .and_then(|f| f.value().attr("action"))
        .filter(|a| !a.is_empty())
        .and_then(|a| match page_url.join(a) {
            Ok(u) => Some(u),
            Err(e) => {
                warn!("Cannot resolve form action '{}': {}; submitting to page URL", a, e);
                None
            }
        })
        .unwrap_or_else(|| page_url.clone());

    let method = form
        .and_then(|f| f.value().attr("method"))
        .filter(|m| m.eq_ignore_ascii_case("get"))
        .map(|_| Method::GET)
        .unwrap_or(Method::POST);

    let hidden = form
        .map(|f| {
            f.select(&sel(HIDDEN_INPUT))
                .filter_map(|el| {
                    let name = el.value().attr("name")?;
                    let value = el.value().attr("value").unwrap_or("");
                    Some((name.to_string(), value.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();

    let submit = form.and_then(|f| {
        f.select(&sel(LOOKUP_SUBMIT)).next().map(|el| {
            let value = el.value().attr("value").unwrap_or("");
            ("lookup".to_string(), value.to_string())
        })
    });

    let candidate_names = doc
        .select(&sel(FORM_INPUT))
        .filter_map(|el| el.value().attr("name"))
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();

    LookupForm {
        field_name,
        action,
        method,
        hidden,
        submit,
        candidate_names,
    }
}

/// Collect image references from a detail page.
///
/// Three strategies against the images container, in precedence order:
/// anchor hrefs, imgs nested in those anchors, then imgs directly in the
/// container. References resolve against the page URL; duplicates are
/// dropped keeping first-seen order.
pub fn extract_image_urls(body: &str, base_url: &Url) -> Vec<Url> {
    let doc = Html::parse_document(body);
    let mut urls: Vec<Url> = Vec::new();

    for (selector, attr) in [
        (IMAGE_ANCHORS, "href"),
        (IMAGE_ANCHOR_IMGS, "src"),
        (IMAGE_DIRECT_IMGS, "src"),
    ] {
        for el in doc.select(&sel(selector)) {
            let Some(raw) = el.value().attr(attr) else {
                continue;
            };
            if raw.is_empty() {
                continue;
            }
            match base_url.join(raw) {
                Ok(abs) => {
                    if !urls.contains(&abs) {
                        urls.push(abs);
                    }
                }
                Err(e) => warn!("Skipping unresolvable image reference '{}': {}", raw, e),
            }
        }
    }

    urls
}

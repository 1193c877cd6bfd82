//! Transcript scraper for the smbc-wiki.com MediaWiki API.
//!
//! Fetches the raw wikitext of the page addressed by each comic ID, follows
//! `#REDIRECT` directives up to a bounded depth, and extracts the canonical
//! comic URL plus the `Transcript` and `Votey` sections from the markup.

use crate::fetch::HttpClient;
use crate::record::{ComicRecord, Source};
use crate::sources::scrape_ids_bounded;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

const API_URL: &str = "https://www.smbc-wiki.com/api.php";

/// Wiki redirect pages can chain and, in the worst case, cycle; lookups
/// abort past this many hops.
const MAX_REDIRECTS: usize = 3;

static REDIRECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^#REDIRECT\s*\[\[(.*?)\]\]").unwrap());

/// Canonical-URL patterns in priority order: the explicit `|url=` field of
/// the comic template first, then any bare comic URL in the text. Both
/// accept the modern `/comic/<slug>` and legacy `index.php?...` forms.
static URL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(
            r"\|\s*url\s*=\s*(https?://www\.smbc-comics\.com/(?:comic/[\w-]+|index\.php\?[\w=&;-]+))",
        )
        .unwrap(),
        Regex::new(r"(https?://www\.smbc-comics\.com/(?:comic/[\w-]+|index\.php\?[\w=&;-]+))")
            .unwrap(),
    ]
});

/// Last resort: the `|title=` field of the comic template, common on older
/// wiki pages that never spell out a URL.
static TEMPLATE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\{\{comic.*?\|\s*title\s*=\s*([\w-]+)").unwrap());

static DATE_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

static TRANSCRIPT_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)==\s*Transcript\s*==[ \t]*\n").unwrap());
static VOTEY_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)==\s*Votey\s*==[ \t]*\n").unwrap());

/// A level-2 header (`== ...`), which ends the section being captured.
static SECTION_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n==[^=]").unwrap());

static TEMPLATE_INVOCATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{.*?\}\}").unwrap());
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"'''(.*?)'''").unwrap());
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"''(.*?)''").unwrap());

/// Per-ID scraper for the wiki API.
#[derive(Clone)]
pub struct WikiScraper {
    client: Arc<HttpClient>,
    api_url: Url,
}

impl WikiScraper {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self::with_api_url(client, Url::parse(API_URL).unwrap())
    }

    /// Points the scraper at an alternate API endpoint (used by tests).
    pub fn with_api_url(client: Arc<HttpClient>, api_url: Url) -> Self {
        Self { client, api_url }
    }

    /// Scrapes all wiki pages within the given inclusive comic ID range.
    /// Results are sorted lexicographically by slug.
    pub async fn scrape_id_range(&self, start_id: u32, end_id: u32) -> Vec<ComicRecord> {
        tracing::info!("Starting SMBC-Wiki scrape from ID {} to {}", start_id, end_id);
        let total = end_id - start_id + 1;

        let scraper = self.clone();
        let mut records = scrape_ids_bounded(start_id..=end_id, move |id| {
            let scraper = scraper.clone();
            async move { scraper.scrape_one(id).await }
        })
        .await;

        records.sort_by(|a, b| a.slug.cmp(&b.slug));

        tracing::info!(
            "SMBC-Wiki scrape complete: {}/{} IDs yielded records",
            records.len(),
            total
        );
        records
    }

    fn page_request_url(&self, page: &str) -> String {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("action", "parse")
            .append_pair("page", page)
            .append_pair("prop", "wikitext")
            .append_pair("format", "json");
        url.into()
    }

    /// Fetches and parses one comic's wiki page, following redirects.
    ///
    /// The redirect chase is an explicit loop with a hop counter rather than
    /// recursion; exceeding `MAX_REDIRECTS` hops is an error for this ID.
    async fn scrape_one(&self, comic_id: u32) -> Option<ComicRecord> {
        let mut page = comic_id.to_string();

        for _hop in 0..=MAX_REDIRECTS {
            let request_url = self.page_request_url(&page);
            tracing::debug!("GET {}", request_url);

            let response = self.client.get(&request_url).await?;
            if !response.is_success() {
                tracing::warn!(
                    "Wiki API request failed for page '{}' (ID {}): status {}",
                    page,
                    comic_id,
                    response.status
                );
                return None;
            }

            let data: Value = match serde_json::from_str(&response.text()) {
                Ok(value) => value,
                Err(e) => {
                    tracing::error!(
                        "Failed to parse wiki JSON for page '{}' (from ID {}): {}",
                        page,
                        comic_id,
                        e
                    );
                    return None;
                }
            };

            // A missing page is a normal negative result, not a failure.
            if data.pointer("/error/code").and_then(Value::as_str) == Some("missingtitle") {
                tracing::debug!("No wiki page found for title/ID '{}'", page);
                return None;
            }

            let Some(wikitext) = data.pointer("/parse/wikitext/*").and_then(Value::as_str) else {
                tracing::error!(
                    "Wiki response for page '{}' (ID {}) is missing the wikitext payload",
                    page,
                    comic_id
                );
                return None;
            };

            if let Some(caps) = REDIRECT.captures(wikitext) {
                let target = caps[1].trim().to_string();
                tracing::info!(
                    "ID {} ('{}') redirects to '{}'. Following.",
                    comic_id,
                    page,
                    target
                );
                page = target;
                continue;
            }

            return self.build_record(comic_id, &data, wikitext);
        }

        tracing::error!("Redirect limit exceeded for initial comic ID {}. Aborting.", comic_id);
        None
    }

    fn build_record(&self, comic_id: u32, data: &Value, wikitext: &str) -> Option<ComicRecord> {
        let page_title = data
            .pointer("/parse/title")
            .and_then(Value::as_str)
            .map(str::to_string);

        let Some(url) = extract_comic_url(wikitext) else {
            tracing::warn!(
                "Could not find an SMBC URL in wiki page for ID {} (final page: {:?})",
                comic_id,
                page_title
            );
            return None;
        };

        // Legacy index.php URLs carry no stable slug; the original numeric
        // ID stands in for those.
        let slug = if url.contains("/comic/") {
            url.rsplit('/').next().unwrap_or(&url).to_string()
        } else {
            comic_id.to_string()
        };

        let comic_text = extract_section(wikitext, &TRANSCRIPT_HEADER);
        let votey_text = extract_section(wikitext, &VOTEY_HEADER);

        match ComicRecord::new(&url, slug, Source::Wiki) {
            Ok(record) => Some(
                record
                    .with_page_title(page_title)
                    .with_comic_text(comic_text)
                    .with_votey_text(votey_text),
            ),
            Err(e) => {
                tracing::warn!("Rejecting wiki record for ID {}: {}", comic_id, e);
                None
            }
        }
    }
}

/// Finds or constructs the canonical smbc-comics.com URL from wikitext.
fn extract_comic_url(wikitext: &str) -> Option<String> {
    for pattern in URL_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(wikitext) {
            return Some(caps[1].trim().to_string());
        }
    }

    if let Some(caps) = TEMPLATE_TITLE.captures(wikitext) {
        let slug = caps[1].trim();
        // A bare number here is more likely the comic ID than a slug.
        if DATE_SLUG.is_match(slug) || !slug.chars().all(|c| c.is_ascii_digit()) {
            let url = format!("https://www.smbc-comics.com/comic/{}", slug);
            tracing::info!("Constructed SMBC URL '{}' from wiki template title field", url);
            return Some(url);
        }
    }

    None
}

/// Extracts the text of one `== Section ==` up to the next level-2 (or
/// higher) header, stripping template invocations and unwrapping
/// bold/italic quote markup. Empty sections count as absent.
fn extract_section(wikitext: &str, header: &Regex) -> Option<String> {
    let found = header.find(wikitext)?;
    let rest = &wikitext[found.end()..];
    let end = SECTION_BREAK
        .find(rest)
        .map(|m| m.start())
        .unwrap_or(rest.len());

    let raw = rest[..end].trim();
    let text = TEMPLATE_INVOCATION.replace_all(raw, "");
    let text = BOLD.replace_all(&text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    let text = text.trim().to_string();

    (!text.is_empty()).then_some(text)
}

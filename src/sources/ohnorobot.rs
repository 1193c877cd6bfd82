//! Transcript scraper for ohnorobot.com search results.
//!
//! Two phases: mine short search queries from previously exported records,
//! then run each query against the search endpoint, paginating until the
//! results stop changing. Hits across different queries collapse to one
//! record per comic URL.

use crate::export::{read_export, ExportedRow};
use crate::fetch::HttpClient;
use crate::record::{ComicRecord, Source};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use url::Url;

const SEARCH_URL: &str = "https://www.ohnorobot.com/index.php";

/// ohnorobot's internal identifier for the SMBC archive.
const ARCHIVE_ID: &str = "137";

/// Export files mined for query terms, in merge order.
const QUERY_SOURCE_FILES: [&str; 2] = ["smbc.csv", "smbc-wiki.csv"];

/// How many whitespace-separated title tokens make up one query.
const QUERY_TOKENS: usize = 3;

static RESULT_BLOCK: Lazy<Selector> = Lazy::new(|| Selector::parse("li > blockquote").unwrap());
static RESULT_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.searchlink").unwrap());

static SITE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Saturday Morning Breakfast Cereal -?").unwrap());
static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9\s]").unwrap());

/// Search-driven scraper over ohnorobot.com.
pub struct OhNoRobotScraper {
    client: Arc<HttpClient>,
    search_url: Url,
}

impl OhNoRobotScraper {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self::with_search_url(client, Url::parse(SEARCH_URL).unwrap())
    }

    /// Points the scraper at an alternate search endpoint (used by tests).
    pub fn with_search_url(client: Arc<HttpClient>, search_url: Url) -> Self {
        Self { client, search_url }
    }

    /// Generates search queries from existing exports in `input_dir` and
    /// scrapes the search results.
    ///
    /// Both expected export files being absent is a hard stop for this
    /// source: no queries are derivable, so the result is empty.
    pub async fn scrape(&self, input_dir: &Path, limit: usize) -> Vec<ComicRecord> {
        tracing::info!(
            "Starting OhNoRobot scrape, generating queries from files in {}",
            input_dir.display()
        );

        let rows = load_query_rows(input_dir);
        if rows.is_empty() {
            tracing::error!(
                "No source CSV files found in {}. Run the smbc or wiki scraper first.",
                input_dir.display()
            );
            return Vec::new();
        }

        let queries = synthesize_queries(&rows, limit);
        if queries.is_empty() {
            tracing::warn!("Could not generate any search queries from the input files");
            return Vec::new();
        }
        tracing::info!(
            "Generated {} unique search queries from the first {} records",
            queries.len(),
            rows.len().min(limit)
        );

        self.run_queries(&queries).await
    }

    /// Runs every query sequentially, paginating each until a page comes
    /// back empty or adds nothing new.
    async fn run_queries(&self, queries: &BTreeSet<String>) -> Vec<ComicRecord> {
        tracing::info!("Running {} unique queries on OhNoRobot", queries.len());
        let mut collected: HashMap<String, ComicRecord> = HashMap::new();

        for query in queries {
            let mut page = 0u32;
            let mut seen_for_query: HashSet<String> = HashSet::new();

            loop {
                let request_url = self.search_request_url(query, page);
                tracing::debug!("GET {}", request_url);

                let Some(response) = self.client.get(&request_url).await else {
                    tracing::warn!("Failed to fetch page {} for query '{}'", page, query);
                    break;
                };
                if !response.is_success() {
                    tracing::warn!(
                        "Search for '{}' page {} returned status {}",
                        query,
                        page,
                        response.status
                    );
                    break;
                }

                let results = parse_results_page(&response.text());
                if results.is_empty() {
                    tracing::debug!("No more results for '{}' on page {}", query, page);
                    break;
                }

                // The backend repeats its tail pages rather than 404ing;
                // once a page contributes nothing unseen, stop.
                if results
                    .iter()
                    .all(|r| seen_for_query.contains(r.url.as_str()))
                {
                    tracing::debug!(
                        "Duplicate results for '{}' on page {}, likely end of results",
                        query,
                        page
                    );
                    break;
                }

                for record in results {
                    seen_for_query.insert(record.url.to_string());
                    collected.entry(record.url.to_string()).or_insert(record);
                }
                page += 1;
            }
        }

        let mut records: Vec<ComicRecord> = collected.into_values().collect();
        records.sort_by_key(|r| comic_id_from_slug(&r.slug));
        records
    }

    fn search_request_url(&self, query: &str, page: u32) -> String {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("s", query)
            .append_pair("comic", ARCHIVE_ID)
            .append_pair("page", &page.to_string());
        url.into()
    }
}

/// Merges the prior exports, deduplicated by URL and ordered by URL.
fn load_query_rows(input_dir: &Path) -> Vec<ExportedRow> {
    let mut by_url: BTreeMap<String, ExportedRow> = BTreeMap::new();

    for name in QUERY_SOURCE_FILES {
        let path = input_dir.join(name);
        if !path.exists() {
            continue;
        }
        tracing::debug!("Loading query source data from {}", path.display());
        match read_export(&path) {
            Ok(rows) => {
                for row in rows {
                    by_url.entry(row.url.clone()).or_insert(row);
                }
            }
            Err(e) => tracing::error!("Failed to read {}: {}", path.display(), e),
        }
    }

    by_url.into_values().collect()
}

/// Derives one short query per record title: the site-name prefix and all
/// non-alphanumerics are stripped, and the first three tokens remain.
/// Degenerate titles contribute nothing; queries deduplicate as a set.
fn synthesize_queries(rows: &[ExportedRow], limit: usize) -> BTreeSet<String> {
    let mut queries = BTreeSet::new();

    for row in rows.iter().take(limit) {
        let title = row.page_title.as_deref().unwrap_or("");
        let title = SITE_PREFIX.replace_all(title, "");
        let title = NON_ALPHANUMERIC.replace_all(&title, "");
        let query = title
            .split_whitespace()
            .take(QUERY_TOKENS)
            .collect::<Vec<_>>()
            .join(" ");
        if !query.is_empty() {
            queries.insert(query);
        }
    }

    queries
}

/// Parses one page of search results.
fn parse_results_page(html: &str) -> Vec<ComicRecord> {
    let document = Html::parse_document(html);
    let mut results = Vec::new();

    for block in document.select(&RESULT_BLOCK) {
        let Some(href) = block
            .select(&RESULT_LINK)
            .next()
            .and_then(|link| link.value().attr("href"))
        else {
            continue;
        };

        let Some(comic_id) = comic_id_from_url(href) else {
            tracing::debug!("Skipping result with no parsable comic ID in URL: {}", href);
            continue;
        };

        let text = transcript_text(&block);
        match ComicRecord::new(href, format!("smbc-id-{}", comic_id), Source::OhNoRobot) {
            Ok(record) => {
                results.push(record.with_comic_text((!text.is_empty()).then_some(text)))
            }
            Err(e) => tracing::debug!("Skipping result with invalid URL {}: {}", href, e),
        }
    }

    results
}

/// Extracts the SMBC comic ID from a result URL's query string.
fn comic_id_from_url(url: &str) -> Option<u32> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "id")
        .and_then(|(_, value)| value.parse().ok())
}

/// Numeric tail of an `smbc-id-<N>` slug, used as the final sort key.
fn comic_id_from_slug(slug: &str) -> u32 {
    slug.rsplit('-')
        .next()
        .and_then(|tail| tail.parse().ok())
        .unwrap_or(0)
}

/// Text content of a result block with decorative children (the tiny
/// permalink box and trailing paragraph) excluded before extraction.
fn transcript_text(block: &ElementRef) -> String {
    let mut pieces: Vec<String> = Vec::new();
    collect_text(*block, &mut pieces);
    pieces.join("\n")
}

fn collect_text(element: ElementRef, pieces: &mut Vec<String>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                pieces.push(trimmed.to_string());
            }
        } else if let Some(el) = ElementRef::wrap(child) {
            if is_decorative(&el) {
                continue;
            }
            collect_text(el, pieces);
        }
    }
}

fn is_decorative(el: &ElementRef) -> bool {
    let value = el.value();
    value.name() == "p" || (value.name() == "div" && value.classes().any(|c| c == "tinylink"))
}

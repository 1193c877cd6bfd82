//! Ground-truth scraper for the official smbc-comics.com website.
//!
//! Crawls comics within an ID range, extracts metadata from each page via a
//! fallback chain (embedded JSON-LD, then the canonical link, then the slug
//! itself), persists the raw HTML, and downloads the main and "votey" bonus
//! panel images.

use crate::fetch::HttpClient;
use crate::paths::{html_path, image_path};
use crate::record::{ComicRecord, Source};
use crate::sources::scrape_ids_bounded;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use url::Url;

const BASE_URL: &str = "https://www.smbc-comics.com/";

static JSON_LD: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());
static CANONICAL_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"link[rel="canonical"]"#).unwrap());
static PAGE_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static VOTEY_IMG: Lazy<Selector> = Lazy::new(|| Selector::parse("img#aftercomic").unwrap());

/// Main-image selectors in priority order; the first match wins. The site's
/// markup drifted over the years, so older pages only satisfy the later,
/// container-based entries.
static MAIN_IMG_FALLBACKS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["img#cc-comic", "div#comic img", "div#cc-comicbody img"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

/// Per-ID scraper for the primary site.
#[derive(Clone)]
pub struct SmbcScraper {
    client: Arc<HttpClient>,
    data_dir: PathBuf,
    base_url: Url,
}

impl SmbcScraper {
    pub fn new(client: Arc<HttpClient>, data_dir: &Path) -> Self {
        Self::with_base_url(client, data_dir, Url::parse(BASE_URL).unwrap())
    }

    /// Points the scraper at an alternate host (tests run against a local
    /// mock server). `base_url` must end in a slash for joins to resolve.
    pub fn with_base_url(client: Arc<HttpClient>, data_dir: &Path, base_url: Url) -> Self {
        Self {
            client,
            data_dir: data_dir.to_path_buf(),
            base_url,
        }
    }

    /// Crawls and scrapes all comics in the given inclusive ID range.
    ///
    /// IDs are dispatched in order under the shared concurrency bound and
    /// collected as they complete; the result is sorted by publication date
    /// (records without a date first).
    pub async fn scrape_id_range(&self, start_id: u32, end_id: u32) -> Vec<ComicRecord> {
        tracing::info!("Starting SMBC ground-truth scrape from ID {} to {}", start_id, end_id);
        let total = end_id - start_id + 1;

        let scraper = self.clone();
        let mut records = scrape_ids_bounded(start_id..=end_id, move |id| {
            let scraper = scraper.clone();
            async move { scraper.scrape_one(id).await }
        })
        .await;

        records.sort_by_key(|r| r.date);

        tracing::info!(
            "SMBC scrape complete: {}/{} IDs yielded records",
            records.len(),
            total
        );
        records
    }

    fn comic_url(&self, comic_id: u32) -> String {
        format!("{}index.php?db=comics&id={}", self.base_url, comic_id)
    }

    /// Scrapes a single comic page by ID. The per-ID endpoint redirects to
    /// the canonical page; the response's final URL reflects that.
    async fn scrape_one(&self, comic_id: u32) -> Option<ComicRecord> {
        let url = self.comic_url(comic_id);
        let response = self.client.get(&url).await?;
        if !response.is_success() {
            tracing::warn!(
                "Request failed for comic ID {} ({}): status {}",
                comic_id,
                url,
                response.status
            );
            return None;
        }

        let body = response.text();
        let (record, downloads) = self.parse_page(&response.final_url, &body)?;

        // Raw HTML is kept as an audit trail next to the images.
        let html_file = html_path(&self.data_dir, &record);
        if let Some(parent) = html_file.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!("Failed to create {}: {}", parent.display(), e);
            }
        }
        if let Err(e) = tokio::fs::write(&html_file, body.as_bytes()).await {
            tracing::warn!(
                "Failed to write HTML for {} to {}: {}",
                record.url,
                html_file.display(),
                e
            );
        }

        // Main and votey images download concurrently.
        let mut tasks = JoinSet::new();
        for (image_url, path) in downloads {
            let scraper = self.clone();
            tasks.spawn(async move { scraper.download_image(&image_url, &path).await });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Image download task failed: {}", e);
            }
        }

        Some(record)
    }

    /// Parses one comic page, returning the record plus the list of
    /// (absolute image URL, target path) pairs to download.
    fn parse_page(&self, url: &str, html: &str) -> Option<(ComicRecord, Vec<(String, PathBuf)>)> {
        let document = Html::parse_document(html);

        // Embedded JSON-LD is the most reliable metadata on modern pages.
        let mut comic_date: Option<NaiveDate> = None;
        let mut canonical_url = url.to_string();

        if let Some(node) = document.select(&JSON_LD).next() {
            let raw = node.text().collect::<String>();
            match serde_json::from_str::<Value>(&raw) {
                Ok(data) => {
                    if let Some(published) = data.get("datePublished").and_then(Value::as_str) {
                        let day = published.split('T').next().unwrap_or(published);
                        comic_date = NaiveDate::parse_from_str(day, "%Y-%m-%d").ok();
                    }
                    if let Some(u) = data.get("url").and_then(Value::as_str) {
                        canonical_url = u.to_string();
                    }
                }
                Err(e) => {
                    tracing::warn!("Could not fully parse JSON-LD for {}, will fall back: {}", url, e)
                }
            }
        }

        // Fall back to the canonical <link> when JSON-LD gave no URL.
        if canonical_url == url {
            if let Some(href) = document
                .select(&CANONICAL_LINK)
                .next()
                .and_then(|node| node.value().attr("href"))
            {
                canonical_url = href.to_string();
            }
        }

        let slug = slug_from_url(&canonical_url);

        if comic_date.is_none() {
            comic_date = NaiveDate::parse_from_str(&slug, "%Y-%m-%d").ok();
            if comic_date.is_none() {
                tracing::warn!(
                    "Could not parse date from slug '{}' or JSON-LD for {}, skipping",
                    slug,
                    url
                );
                return None;
            }
        }

        let page_title = document
            .select(&PAGE_TITLE)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());

        let Some(main_img) = MAIN_IMG_FALLBACKS
            .iter()
            .find_map(|selector| document.select(selector).next())
        else {
            tracing::warn!(
                "Main comic <img> not found for {} using any selector, skipping",
                url
            );
            return None;
        };
        let main_src = main_img.value().attr("src").unwrap_or("");
        let hover_text = hover_from(&main_img);

        let votey = document.select(&VOTEY_IMG).next();
        let votey_src = votey.and_then(|node| node.value().attr("src"));
        let votey_text = votey.as_ref().and_then(hover_from);

        let record = match ComicRecord::new(&canonical_url, slug.as_str(), Source::Smbc) {
            Ok(record) => record
                .with_date(comic_date)
                .with_page_title(page_title.or_else(|| Some(slug.clone())))
                .with_hover_text(hover_text)
                .with_votey_text(votey_text),
            Err(e) => {
                tracing::warn!("Rejecting record for {}: {}", url, e);
                return None;
            }
        };

        let mut downloads = Vec::new();
        if !main_src.is_empty() {
            self.queue_download(&record, main_src, false, &mut downloads);
        }
        if let Some(src) = votey_src {
            self.queue_download(&record, src, true, &mut downloads);
        }

        Some((record, downloads))
    }

    /// Resolves a possibly-relative image URL against the site base and
    /// derives its target path. Undateable records queue nothing.
    fn queue_download(
        &self,
        record: &ComicRecord,
        src: &str,
        is_votey: bool,
        downloads: &mut Vec<(String, PathBuf)>,
    ) {
        match self.base_url.join(src) {
            Ok(absolute) => {
                if let Some(path) = image_path(&self.data_dir, record, absolute.as_str(), is_votey)
                {
                    downloads.push((absolute.into(), path));
                }
            }
            Err(e) => tracing::warn!("Unresolvable image URL '{}' on {}: {}", src, record.url, e),
        }
    }

    /// Downloads a single image, skipping the fetch entirely when the target
    /// file already exists. Failures are logged and non-fatal.
    async fn download_image(&self, url: &str, path: &Path) -> bool {
        if path.exists() {
            tracing::trace!("Image already exists, skipping: {}", path.display());
            return true;
        }

        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                tracing::error!("Failed to create {}: {}", parent.display(), e);
                return false;
            }
        }

        match self.client.get(url).await {
            Some(response) if response.is_success() => {
                match tokio::fs::write(path, &response.body).await {
                    Ok(()) => {
                        tracing::debug!("Downloaded {} to {}", url, path.display());
                        true
                    }
                    Err(e) => {
                        tracing::error!("Failed to write image {} to {}: {}", url, path.display(), e);
                        false
                    }
                }
            }
            Some(response) => {
                tracing::warn!("Failed to fetch image {}. Status: {}", url, response.status);
                false
            }
            None => {
                tracing::warn!("Failed to fetch image {}", url);
                false
            }
        }
    }
}

fn hover_from(img: &ElementRef) -> Option<String> {
    img.value()
        .attr("title")
        .or_else(|| img.value().attr("alt"))
        .map(str::to_string)
}

/// Last path segment of the canonical URL, without query string or file
/// extension. `https://.../comic/2025-09-13` yields `2025-09-13`.
fn slug_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let tail = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(without_query);
    match tail.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem.to_string(),
        _ => tail.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_scraper() -> SmbcScraper {
        let cache_dir = tempfile::tempdir().unwrap();
        let client = Arc::new(HttpClient::new(cache_dir.path(), 100.0).unwrap());
        SmbcScraper::new(client, Path::new("data"))
    }

    #[test]
    fn test_slug_from_modern_url() {
        assert_eq!(
            slug_from_url("https://www.smbc-comics.com/comic/2025-09-13"),
            "2025-09-13"
        );
    }

    #[test]
    fn test_slug_from_url_with_extension() {
        assert_eq!(
            slug_from_url("https://www.smbc-comics.com/comic/some-title.html"),
            "some-title"
        );
    }

    #[test]
    fn test_slug_ignores_query_string() {
        assert_eq!(
            slug_from_url("https://www.smbc-comics.com/index.php?db=comics&id=5"),
            "index"
        );
    }

    #[test]
    fn test_parse_page_prefers_json_ld() {
        let html = r#"<html><head>
            <title>Saturday Morning Breakfast Cereal - Gravity</title>
            <script type="application/ld+json">
            {"datePublished": "2025-09-13T00:00:00-04:00",
             "url": "https://www.smbc-comics.com/comic/2025-09-13"}
            </script>
            </head><body>
            <img id="cc-comic" src="/comics/20250913.png" title="hover here">
            </body></html>"#;

        let scraper = test_scraper();
        let (record, downloads) = scraper
            .parse_page("https://www.smbc-comics.com/index.php?db=comics&id=7000", html)
            .unwrap();

        assert_eq!(record.slug, "2025-09-13");
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2025, 9, 13));
        assert_eq!(record.url.as_str(), "https://www.smbc-comics.com/comic/2025-09-13");
        assert_eq!(record.hover_text.as_deref(), Some("hover here"));
        assert_eq!(
            record.page_title.as_deref(),
            Some("Saturday Morning Breakfast Cereal - Gravity")
        );
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].0, "https://www.smbc-comics.com/comics/20250913.png");
        assert_eq!(
            downloads[0].1,
            Path::new("data/images/2025/09/13/2025-09-13-main.png")
        );
    }

    #[test]
    fn test_parse_page_falls_back_to_canonical_link_and_slug_date() {
        let html = r#"<html><head>
            <link rel="canonical" href="https://www.smbc-comics.com/comic/2011-02-17">
            </head><body>
            <div id="comic"><img src="/comics/20110217.gif" alt="alt text"></div>
            </body></html>"#;

        let scraper = test_scraper();
        let (record, downloads) = scraper
            .parse_page("https://www.smbc-comics.com/index.php?db=comics&id=2144", html)
            .unwrap();

        assert_eq!(record.slug, "2011-02-17");
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2011, 2, 17));
        // No <title> on this page: the slug stands in.
        assert_eq!(record.page_title.as_deref(), Some("2011-02-17"));
        // title attribute missing: alt is the hover fallback.
        assert_eq!(record.hover_text.as_deref(), Some("alt text"));
        assert_eq!(downloads[0].1.extension().unwrap(), "gif");
    }

    #[test]
    fn test_parse_page_secondary_container_fallback() {
        let html = r#"<html><head>
            <link rel="canonical" href="https://www.smbc-comics.com/comic/2009-01-01">
            </head><body>
            <div id="cc-comicbody"><img src="/comics/20090101.png"></div>
            </body></html>"#;

        let scraper = test_scraper();
        let (record, downloads) = scraper
            .parse_page("https://www.smbc-comics.com/comic/2009-01-01", html)
            .unwrap();
        assert_eq!(record.slug, "2009-01-01");
        assert_eq!(downloads.len(), 1);
    }

    #[test]
    fn test_parse_page_votey_extraction() {
        let html = r#"<html><head>
            <link rel="canonical" href="https://www.smbc-comics.com/comic/2025-09-13">
            </head><body>
            <img id="cc-comic" src="/comics/20250913.png">
            <img id="aftercomic" src="/comics/20250913after.png" title="votey joke">
            </body></html>"#;

        let scraper = test_scraper();
        let (record, downloads) = scraper
            .parse_page("https://www.smbc-comics.com/comic/2025-09-13", html)
            .unwrap();
        assert_eq!(record.votey_text.as_deref(), Some("votey joke"));
        assert_eq!(downloads.len(), 2);
        assert!(downloads[1].1.ends_with("2025-09-13-votey.png"));
    }

    #[test]
    fn test_parse_page_missing_votey_is_not_an_error() {
        let html = r#"<html><head>
            <link rel="canonical" href="https://www.smbc-comics.com/comic/2025-09-13">
            </head><body><img id="cc-comic" src="/x.png"></body></html>"#;

        let scraper = test_scraper();
        let (record, downloads) = scraper
            .parse_page("https://www.smbc-comics.com/comic/2025-09-13", html)
            .unwrap();
        assert!(record.votey_text.is_none());
        assert_eq!(downloads.len(), 1);
    }

    #[test]
    fn test_parse_page_no_main_image_skips() {
        let html = r#"<html><head>
            <link rel="canonical" href="https://www.smbc-comics.com/comic/2025-09-13">
            </head><body><p>nothing here</p></body></html>"#;

        let scraper = test_scraper();
        assert!(scraper
            .parse_page("https://www.smbc-comics.com/comic/2025-09-13", html)
            .is_none());
    }

    #[test]
    fn test_parse_page_undateable_skips() {
        let html = r#"<html><head>
            <link rel="canonical" href="https://www.smbc-comics.com/comic/not-a-date">
            </head><body><img id="cc-comic" src="/x.png"></body></html>"#;

        let scraper = test_scraper();
        assert!(scraper
            .parse_page("https://www.smbc-comics.com/comic/not-a-date", html)
            .is_none());
    }
}

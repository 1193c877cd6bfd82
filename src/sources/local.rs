//! Ingest for a local checkout of the community markdown archive.
//!
//! Each comic is one markdown file: a `---`-delimited front matter block of
//! flat `key: value` scalars, followed by the transcript body. Example:
//!
//! ```text
//! ---
//! title: Titan
//! hovertext: the moon, not the god
//! image: https://www.smbc-comics.com/comics/20210612.png
//! ---
//! Panel 1: ...
//! ```
//!
//! This source is purely local and never touches the fetch layer.

use crate::record::{ComicRecord, Source};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

static FRONT_MATTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\A---[ \t]*\n(.*?)\n---[ \t]*\n").unwrap());

/// YYYYMMDD sequences as they appear in SMBC image URLs.
static DATE_IN_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(20\d{2})(0[1-9]|1[0-2])([0-2][0-9]|3[01])").unwrap());

/// Front matter keys whose value may embed the publication date.
const DATE_KEYS: [&str; 2] = ["image", "extra_image"];

/// Parses all markdown files under `input_dir` into records. Files that
/// fail to parse are logged and skipped.
pub fn load_records(input_dir: &Path) -> Vec<ComicRecord> {
    let mut files = Vec::new();
    collect_markdown_files(input_dir, &mut files);
    if files.is_empty() {
        tracing::warn!("No markdown files found under {}", input_dir.display());
        return Vec::new();
    }
    files.sort();

    let mut records = Vec::new();
    for path in &files {
        match parse_markdown_file(path) {
            Some(record) => records.push(record),
            None => tracing::warn!("Skipping unparseable file {}", path.display()),
        }
    }

    tracing::info!(
        "Local ingest complete: {}/{} files yielded records",
        records.len(),
        files.len()
    );
    records
}

fn collect_markdown_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("Failed to read directory {}: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_markdown_files(&path, files);
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("md") | Some("markdown")
        ) {
            files.push(path);
        }
    }
}

/// Parses a single markdown file into a record.
///
/// The slug comes from the file stem (e.g. `2021-06-12-titan.md` ->
/// `2021-06-12-titan`) and the canonical URL is constructed from it; the
/// markdown body becomes the transcript.
fn parse_markdown_file(path: &Path) -> Option<ComicRecord> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("Failed to read {}: {}", path.display(), e);
            return None;
        }
    };

    let slug = path.file_stem()?.to_str()?.to_string();
    let url = format!("https://www.smbc-comics.com/comic/{}", slug);

    let (front_matter, body) = split_front_matter(&text);

    let page_title = front_matter.get("title").cloned();
    let hover_text = front_matter.get("hovertext").cloned();
    let date = infer_date(&front_matter);

    let body = body.trim();
    let comic_text = (!body.is_empty()).then(|| body.to_string());

    match ComicRecord::new(&url, slug, Source::LocalMd) {
        Ok(record) => Some(
            record
                .with_comic_text(comic_text)
                .with_hover_text(hover_text)
                .with_date(date)
                .with_page_title(page_title),
        ),
        Err(e) => {
            tracing::error!("Rejecting record for {}: {}", path.display(), e);
            None
        }
    }
}

/// Splits off the front matter block, if present, returning its key/value
/// pairs and the remaining body. Without front matter the whole text is
/// the body.
fn split_front_matter(text: &str) -> (HashMap<String, String>, &str) {
    let Some(m) = FRONT_MATTER.captures(text) else {
        return (HashMap::new(), text);
    };

    let mut fields = HashMap::new();
    for line in m[1].lines() {
        if let Some((key, value)) = line.split_once(':') {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            if !value.is_empty() {
                fields.insert(key.trim().to_string(), value.to_string());
            }
        }
    }

    let body = &text[m.get(0).map(|whole| whole.end()).unwrap_or(0)..];
    (fields, body)
}

/// Infers the publication date from a YYYYMMDD sequence embedded in the
/// image URLs of the front matter.
fn infer_date(front_matter: &HashMap<String, String>) -> Option<NaiveDate> {
    for key in DATE_KEYS {
        let Some(value) = front_matter.get(key) else {
            continue;
        };
        if let Some(caps) = DATE_IN_URL.captures(value) {
            let year = caps[1].parse().ok()?;
            let month = caps[2].parse().ok()?;
            let day = caps[3].parse().ok()?;
            if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                return Some(date);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SAMPLE: &str = "---\ntitle: Titan\nhovertext: the moon, not the god\nimage: https://www.smbc-comics.com/comics/20210612.png\n---\nPanel 1: A moon ponders.\n";

    #[test]
    fn test_split_front_matter() {
        let (fields, body) = split_front_matter(SAMPLE);
        assert_eq!(fields.get("title").map(String::as_str), Some("Titan"));
        assert_eq!(
            fields.get("hovertext").map(String::as_str),
            Some("the moon, not the god")
        );
        assert_eq!(body.trim(), "Panel 1: A moon ponders.");
    }

    #[test]
    fn test_no_front_matter_is_all_body() {
        let (fields, body) = split_front_matter("just a transcript\n");
        assert!(fields.is_empty());
        assert_eq!(body, "just a transcript\n");
    }

    #[test]
    fn test_infer_date_from_image_url() {
        let (fields, _) = split_front_matter(SAMPLE);
        assert_eq!(infer_date(&fields), NaiveDate::from_ymd_opt(2021, 6, 12));
    }

    #[test]
    fn test_infer_date_falls_back_to_extra_image() {
        let mut fields = HashMap::new();
        fields.insert("image".to_string(), "no date here".to_string());
        fields.insert(
            "extra_image".to_string(),
            "https://www.smbc-comics.com/comics/20190101after.png".to_string(),
        );
        assert_eq!(infer_date(&fields), NaiveDate::from_ymd_opt(2019, 1, 1));
    }

    #[test]
    fn test_load_records_walks_recursively() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("2021");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("2021-06-12-titan.md"), SAMPLE).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let records = load_records(dir.path());
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.slug, "2021-06-12-titan");
        assert_eq!(
            record.url.as_str(),
            "https://www.smbc-comics.com/comic/2021-06-12-titan"
        );
        assert_eq!(record.page_title.as_deref(), Some("Titan"));
        assert_eq!(record.hover_text.as_deref(), Some("the moon, not the god"));
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2021, 6, 12));
        assert_eq!(record.comic_text.as_deref(), Some("Panel 1: A moon ponders."));
        assert_eq!(record.source, Source::LocalMd);
    }

    #[test]
    fn test_empty_directory_yields_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(load_records(dir.path()).is_empty());
    }
}

//! The unified record schema shared by every scraper source.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use url::Url;

/// Errors rejected at record construction
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Invalid comic URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("Empty slug for URL '{0}'")]
    EmptySlug(String),
}

/// Which scraper produced a record.
///
/// The string forms double as the export file stems (`smbc.csv` etc.), which
/// is the naming contract the search aggregator reads back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Source {
    #[serde(rename = "smbc")]
    Smbc,
    #[serde(rename = "ohnorobot")]
    OhNoRobot,
    #[serde(rename = "smbc-wiki")]
    Wiki,
    #[serde(rename = "local-md")]
    LocalMd,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Smbc => "smbc",
            Source::OhNoRobot => "ohnorobot",
            Source::Wiki => "smbc-wiki",
            Source::LocalMd => "local-md",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single row of scraped comic data.
///
/// Each source populates the subset of fields it can recover; a record is
/// constructed once per successfully parsed page, never mutated afterwards,
/// and handed to the export layer at the end of the run.
#[derive(Debug, Clone, Serialize)]
pub struct ComicRecord {
    /// Canonical URL for the comic
    pub url: Url,

    /// Stable unique identifier, usually the date slug from the URL
    /// (e.g. `2025-09-13`)
    pub slug: String,

    /// Transcript of the main comic text
    pub comic_text: Option<String>,

    /// Hover text (title/alt attribute) of the main comic image
    pub hover_text: Option<String>,

    /// Text from the bonus "votey" panel, either hover text or transcript
    pub votey_text: Option<String>,

    /// Publication date
    pub date: Option<NaiveDate>,

    /// The page's `<title>` element or API page title
    pub page_title: Option<String>,

    /// Which scraper produced this row
    pub source: Source,

    /// Provenance flag for transcript reliability (wiki source only)
    pub transcript_quality: Option<String>,
}

impl ComicRecord {
    /// Creates a record with the required fields, validating that `url` is a
    /// well-formed absolute URL and that the slug is non-empty. Optional
    /// fields start absent and are filled with the `with_*` methods.
    pub fn new(url: &str, slug: impl Into<String>, source: Source) -> Result<Self, RecordError> {
        let parsed = Url::parse(url).map_err(|e| RecordError::InvalidUrl {
            url: url.to_string(),
            source: e,
        })?;
        let slug = slug.into();
        if slug.is_empty() {
            return Err(RecordError::EmptySlug(url.to_string()));
        }
        Ok(Self {
            url: parsed,
            slug,
            comic_text: None,
            hover_text: None,
            votey_text: None,
            date: None,
            page_title: None,
            source,
            transcript_quality: None,
        })
    }

    pub fn with_comic_text(mut self, text: Option<String>) -> Self {
        self.comic_text = text;
        self
    }

    pub fn with_hover_text(mut self, text: Option<String>) -> Self {
        self.hover_text = text;
        self
    }

    pub fn with_votey_text(mut self, text: Option<String>) -> Self {
        self.votey_text = text;
        self
    }

    pub fn with_date(mut self, date: Option<NaiveDate>) -> Self {
        self.date = date;
        self
    }

    pub fn with_page_title(mut self, title: Option<String>) -> Self {
        self.page_title = title;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_validates_url() {
        let record =
            ComicRecord::new("https://www.smbc-comics.com/comic/2025-09-13", "2025-09-13", Source::Smbc)
                .unwrap();
        assert_eq!(record.url.as_str(), "https://www.smbc-comics.com/comic/2025-09-13");
        assert_eq!(record.slug, "2025-09-13");
        assert_eq!(record.source, Source::Smbc);
        assert!(record.date.is_none());
        assert!(record.comic_text.is_none());
    }

    #[test]
    fn test_relative_url_rejected() {
        let result = ComicRecord::new("/comic/2025-09-13", "2025-09-13", Source::Smbc);
        assert!(matches!(result, Err(RecordError::InvalidUrl { .. })));
    }

    #[test]
    fn test_empty_slug_rejected() {
        let result = ComicRecord::new("https://example.com/comic", "", Source::Wiki);
        assert!(matches!(result, Err(RecordError::EmptySlug(_))));
    }

    #[test]
    fn test_builder_methods() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 13).unwrap();
        let record = ComicRecord::new("https://example.com/comic/x", "x", Source::Wiki)
            .unwrap()
            .with_date(Some(date))
            .with_comic_text(Some("Transcript".to_string()))
            .with_page_title(Some("Title".to_string()));
        assert_eq!(record.date, Some(date));
        assert_eq!(record.comic_text.as_deref(), Some("Transcript"));
        assert_eq!(record.page_title.as_deref(), Some("Title"));
    }

    #[test]
    fn test_source_strings() {
        assert_eq!(Source::Smbc.as_str(), "smbc");
        assert_eq!(Source::OhNoRobot.as_str(), "ohnorobot");
        assert_eq!(Source::Wiki.as_str(), "smbc-wiki");
        assert_eq!(Source::LocalMd.as_str(), "local-md");
    }
}

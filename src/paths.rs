//! Deterministic storage locations for raw HTML and downloaded images.
//!
//! Both functions are pure: the same record and URL always yield the same
//! path, which is what makes downloads and HTML snapshots idempotent
//! across runs.

use crate::record::ComicRecord;
use chrono::Datelike;
use std::path::{Path, PathBuf};
use url::Url;

/// Builds a structured path for saving a comic image, e.g.
/// `<base>/images/2025/09/13/2025-09-13-main.png`.
///
/// Requires the record to carry a date; returns `None` otherwise. The file
/// extension is taken from the image URL's path, defaulting to `.png` when
/// the URL has none (or cannot be parsed).
pub fn image_path(
    base_dir: &Path,
    record: &ComicRecord,
    image_url: &str,
    is_votey: bool,
) -> Option<PathBuf> {
    let date = match record.date {
        Some(d) => d,
        None => {
            tracing::warn!("Cannot determine image path for {} without a date", record.url);
            return None;
        }
    };

    let suffix = if is_votey { "votey" } else { "main" };
    let filename = format!("{}-{}{}", record.slug, suffix, image_extension(image_url));

    Some(
        base_dir
            .join("images")
            .join(date.year().to_string())
            .join(format!("{:02}", date.month()))
            .join(format!("{:02}", date.day()))
            .join(filename),
    )
}

/// Builds a structured path for saving raw HTML content, e.g.
/// `<base>/html/2025/09/13/2025-09-13.html`.
///
/// Records without a date land in a flat `html/misc/` location instead;
/// this function never fails.
pub fn html_path(base_dir: &Path, record: &ComicRecord) -> PathBuf {
    let filename = format!("{}.html", record.slug);
    match record.date {
        Some(date) => base_dir
            .join("html")
            .join(date.year().to_string())
            .join(format!("{:02}", date.month()))
            .join(format!("{:02}", date.day()))
            .join(filename),
        None => base_dir.join("html").join("misc").join(filename),
    }
}

/// Extension of the URL's path component, with the leading dot.
fn image_extension(image_url: &str) -> String {
    Url::parse(image_url)
        .ok()
        .and_then(|u| {
            Path::new(u.path())
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
        })
        .unwrap_or_else(|| ".png".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Source;
    use chrono::NaiveDate;

    fn dated_record() -> ComicRecord {
        ComicRecord::new(
            "https://www.smbc-comics.com/comic/2025-09-13",
            "2025-09-13",
            Source::Smbc,
        )
        .unwrap()
        .with_date(NaiveDate::from_ymd_opt(2025, 9, 13))
    }

    fn undated_record() -> ComicRecord {
        ComicRecord::new("https://www.smbc-comics.com/comic/mystery", "mystery", Source::Smbc)
            .unwrap()
    }

    #[test]
    fn test_image_path_structure() {
        let path = image_path(
            Path::new("data"),
            &dated_record(),
            "https://www.smbc-comics.com/comics/20250913.png",
            false,
        )
        .unwrap();
        assert_eq!(
            path,
            Path::new("data/images/2025/09/13/2025-09-13-main.png")
        );
    }

    #[test]
    fn test_image_path_votey_suffix() {
        let path = image_path(
            Path::new("data"),
            &dated_record(),
            "https://www.smbc-comics.com/comics/20250913after.gif",
            true,
        )
        .unwrap();
        assert_eq!(
            path,
            Path::new("data/images/2025/09/13/2025-09-13-votey.gif")
        );
    }

    #[test]
    fn test_image_path_defaults_to_png() {
        let path = image_path(
            Path::new("data"),
            &dated_record(),
            "https://www.smbc-comics.com/comics/noextension",
            false,
        )
        .unwrap();
        assert!(path.to_string_lossy().ends_with("2025-09-13-main.png"));
    }

    #[test]
    fn test_image_path_requires_date() {
        let path = image_path(
            Path::new("data"),
            &undated_record(),
            "https://www.smbc-comics.com/comics/20250913.png",
            false,
        );
        assert!(path.is_none());
    }

    #[test]
    fn test_html_path_with_date() {
        let path = html_path(Path::new("data"), &dated_record());
        assert_eq!(path, Path::new("data/html/2025/09/13/2025-09-13.html"));
    }

    #[test]
    fn test_html_path_without_date() {
        let path = html_path(Path::new("data"), &undated_record());
        assert_eq!(path, Path::new("data/html/misc/mystery.html"));
    }

    #[test]
    fn test_single_digit_month_and_day_zero_padded() {
        let record = ComicRecord::new("https://example.com/comic/2024-01-05", "2024-01-05", Source::Smbc)
            .unwrap()
            .with_date(NaiveDate::from_ymd_opt(2024, 1, 5));
        let path = html_path(Path::new("data"), &record);
        assert_eq!(path, Path::new("data/html/2024/01/05/2024-01-05.html"));
    }
}

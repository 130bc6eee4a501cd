//! CSV export of the dataset.
//!
//! One row per post. The header is always written, even for an empty
//! dataset, so downstream readers can rely on the column layout.

use std::io::Write;
use std::path::Path;
use tracing::{info, instrument};

use crate::error::ScrapeError;
use crate::models::Dataset;

/// Column order expected by the dashboards.
pub const HEADER: [&str; 8] = [
    "author_url",
    "author",
    "date",
    "reading_time",
    "post_url",
    "title",
    "preview_image_url",
    "claps",
];

/// Write `dataset` as CSV to any writer.
pub fn write_dataset<W: Write>(dataset: &Dataset, writer: W) -> Result<usize, ScrapeError> {
    let mut w = ::csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    w.write_record(HEADER)?;

    let rows = dataset.rows();
    for row in &rows {
        w.serialize(row)?;
    }
    w.flush()?;
    Ok(rows.len())
}

/// Write `dataset` as CSV to `path`, replacing any existing file.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub fn write_dataset_file(dataset: &Dataset, path: impl AsRef<Path>) -> Result<usize, ScrapeError> {
    let file = std::fs::File::create(path.as_ref())?;
    let count = write_dataset(dataset, file)?;
    info!(rows = count, "Wrote CSV dataset");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DatasetRow, PostRecord, Source, SourceArchive};
    use chrono::NaiveDate;

    fn dataset() -> Dataset {
        let mut archive = SourceArchive::new(Source::parse("https://pub.example/").unwrap());
        archive.posts.insert(
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            vec![
                PostRecord {
                    author: Some("Jane".into()),
                    date: Some("2024-01-10".into()),
                    reading_time: Some("5".into()),
                    post_url: Some("https://pub.example/p".into()),
                    title: Some("Commas, \"quotes\"".into()),
                    preview_image_url: None,
                    claps: Some("1.2K".into()),
                },
                PostRecord {
                    title: Some("Bare".into()),
                    ..Default::default()
                },
            ],
        );
        Dataset {
            sources: vec![archive],
            removed: vec![],
        }
    }

    #[test]
    fn test_header_and_rows() {
        let mut buf = Vec::new();
        let count = write_dataset(&dataset(), &mut buf).unwrap();
        assert_eq!(count, 2);

        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("author_url,author,date,reading_time,post_url,title,preview_image_url,claps")
        );
        assert_eq!(
            lines.next(),
            Some(
                "https://pub.example,Jane,2024-01-10,5,https://pub.example/p,\"Commas, \"\"quotes\"\"\",,1.2K"
            )
        );
        assert_eq!(lines.next(), Some("https://pub.example,,,,,Bare,,"));
    }

    #[test]
    fn test_empty_dataset_still_has_header() {
        let mut buf = Vec::new();
        assert_eq!(write_dataset(&Dataset::default(), &mut buf).unwrap(), 0);
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw_dataset.csv");
        write_dataset_file(&dataset(), &path).unwrap();

        let mut reader = ::csv::Reader::from_path(&path).unwrap();
        let rows: Vec<DatasetRow> = reader.deserialize().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].claps.as_deref(), Some("1.2K"));
        assert_eq!(rows[1].author, None);
    }
}

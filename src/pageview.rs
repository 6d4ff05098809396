//! The pageview report: one row per thread url, one column per capture.
//!
//! The table keeps a rolling window of the most recent `max_cols` capture
//! columns. Rows without any recorded count are dropped.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};

use crate::date::CaptureTime;
use crate::storage;
use crate::thread::ThreadRecord;

pub const URL_COLUMN: &str = "url";
pub const TITLE_COLUMN: &str = "title";

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// One observed view count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageviewSample {
    pub url: String,
    pub title: Option<String>,
    pub views: u64,
}

impl From<&ThreadRecord> for PageviewSample {
    fn from(thread: &ThreadRecord) -> Self {
        Self {
            url: thread.url.clone(),
            title: thread.title.clone(),
            views: thread.page_views,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageviewRow {
    pub title: String,
    /// Recorded counts by column label; a missing label is a null cell.
    pub counts: BTreeMap<String, u64>,
}

/// What a merge did to the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Label of the column written by this merge.
    pub label: String,
    /// Urls that got a value in the new column.
    pub updated: Vec<String>,
    /// Urls whose scrape failed and were left untouched.
    pub failed: Vec<String>,
    /// Number of rows removed because they had no count left.
    pub rows_dropped: usize,
    /// Columns removed from the rolling window, oldest first.
    pub columns_dropped: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageviewTable {
    /// Timestamp column labels, lexicographic order is chronological order.
    columns: BTreeSet<String>,
    rows: BTreeMap<String, PageviewRow>,
}

impl PageviewTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp column labels, oldest first.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &PageviewRow)> {
        self.rows.iter().map(|(url, row)| (url.as_str(), row))
    }

    pub fn row(&self, url: &str) -> Option<&PageviewRow> {
        self.rows.get(url)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The count recorded for `url` in `column`, `None` for a null cell.
    pub fn get(&self, url: &str, column: &str) -> Option<u64> {
        self.rows
            .get(url)
            .and_then(|row| row.counts.get(column))
            .copied()
    }

    /// Write `sample` into column `label`, creating row and column as needed.
    ///
    /// Only the cell of `label` is touched. A sample without a title keeps
    /// the stored title. Labels have minute resolution, so a second capture
    /// within the same minute overwrites the cells of the first.
    pub fn upsert(&mut self, label: &str, sample: &PageviewSample) {
        if !self.columns.contains(label) {
            self.columns.insert(label.to_string());
        }
        let row = self.rows.entry(sample.url.clone()).or_default();
        if let Some(title) = &sample.title {
            row.title = title.clone();
        }
        row.counts.insert(label.to_string(), sample.views);
    }

    /// Remove every row without a single recorded count.
    pub fn prune_rows(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(|_, row| !row.counts.is_empty());
        before - self.rows.len()
    }

    /// Drop the oldest columns until at most `max_cols` are left.
    pub fn prune_columns(&mut self, max_cols: usize) -> Vec<String> {
        let excess = self.columns.len().saturating_sub(max_cols);
        let dropped: Vec<String> = self.columns.iter().take(excess).cloned().collect();
        for label in &dropped {
            self.columns.remove(label);
            for row in self.rows.values_mut() {
                row.counts.remove(label);
            }
        }
        dropped
    }

    /// Merge one capture into the table and apply the retention rules.
    ///
    /// Existing cells of other columns are never modified. Cells of `label`
    /// itself are, when it is already part of the table.
    pub fn merge<I>(&mut self, label: &str, samples: I, max_cols: usize) -> MergeReport
    where
        I: IntoIterator<Item = PageviewSample>,
    {
        let mut report = MergeReport {
            label: label.to_string(),
            ..Default::default()
        };

        for sample in samples {
            self.upsert(label, &sample);
            report.updated.push(sample.url);
        }

        report.rows_dropped = self.prune_rows();
        if report.rows_dropped > 0 {
            info!(
                "Dropped {} rows without any recorded pageviews",
                report.rows_dropped
            );
        }

        report.columns_dropped = self.prune_columns(max_cols);
        if !report.columns_dropped.is_empty() {
            info!(
                "Dropped {} oldest columns: {}",
                report.columns_dropped.len(),
                report.columns_dropped.join(", ")
            );
            // rows only populated in the dropped columns
            report.rows_dropped += self.prune_rows();
        }

        report
    }

    /// Parse a table as written by [`PageviewTable::write_tsv`].
    ///
    /// Cells of timestamp columns that are not non-negative integers are read
    /// as null.
    pub fn parse(txt: &str) -> Result<Self> {
        let txt = txt.trim_start_matches('\u{feff}');
        let mut table = PageviewTable::new();
        if txt.trim().is_empty() {
            return Ok(table);
        }

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(txt.as_bytes());

        let headers = rdr
            .headers()
            .context("Failed to read pageview table header.")?
            .clone();
        let url_idx = headers
            .iter()
            .position(|h| h.trim() == URL_COLUMN)
            .ok_or_else(|| anyhow!("Pageview table has no `{}` column.", URL_COLUMN))?;
        let title_idx = headers.iter().position(|h| h.trim() == TITLE_COLUMN);

        let labels: Vec<(usize, &str)> = headers
            .iter()
            .enumerate()
            .filter(|(i, h)| *i != url_idx && Some(*i) != title_idx && !h.trim().is_empty())
            .map(|(i, h)| (i, h.trim()))
            .collect();
        for (_, label) in &labels {
            if CaptureTime::from_column_label(label).is_none() {
                warn!("Unexpected pageview column label {:?}", label);
            }
            table.columns.insert(label.to_string());
        }

        for record in rdr.records() {
            let record = record.context("Malformed pageview table row.")?;
            let url = record.get(url_idx).unwrap_or_default().trim();
            if url.is_empty() {
                continue;
            }
            let row = table.rows.entry(url.to_string()).or_default();
            if let Some(title) = title_idx.and_then(|i| record.get(i)) {
                row.title = title.to_string();
            }
            for (i, label) in &labels {
                match record.get(*i).map(parse_count) {
                    Some(Some(count)) => {
                        row.counts.insert(label.to_string(), count);
                    }
                    Some(None) if !record[*i].trim().is_empty() => {
                        debug!("Non numeric count {:?} for {} read as null", &record[*i], url);
                    }
                    _ => {}
                }
            }
        }

        Ok(table)
    }

    /// Read the table at `path`.
    ///
    /// A missing, empty or unreadable file yields an empty table.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("No pageview table at {}, starting a new one", path.display());
                return Self::new();
            }
            Err(err) => {
                warn!(
                    "Failed to read pageview table {}: {}, starting a new one",
                    path.display(),
                    err
                );
                return Self::new();
            }
        };
        match Self::parse(&String::from_utf8_lossy(&bytes)) {
            Ok(table) => table,
            Err(err) => {
                warn!(
                    "Pageview table {} is corrupt: {:#}, starting a new one",
                    path.display(),
                    err
                );
                Self::new()
            }
        }
    }

    /// Write the table as tab separated values with a leading BOM.
    ///
    /// Columns are `url`, `title` and the timestamp columns oldest first.
    pub fn write_tsv<W: Write>(&self, mut w: W) -> Result<()> {
        w.write_all(BOM)?;
        let mut wtr = csv::WriterBuilder::new().delimiter(b'\t').from_writer(w);

        let mut header = vec![URL_COLUMN, TITLE_COLUMN];
        header.extend(self.columns());
        wtr.write_record(&header)?;

        for (url, row) in &self.rows {
            let mut record = Vec::with_capacity(self.columns.len() + 2);
            record.push(url.clone());
            record.push(row.title.clone());
            record.extend(self.columns.iter().map(|label| {
                row.counts
                    .get(label)
                    .map(u64::to_string)
                    .unwrap_or_default()
            }));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Replace the file at `path` with this table.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut buf = Vec::new();
        self.write_tsv(&mut buf)?;
        storage::write_atomic(path, &buf)
    }
}

/// Read a cell as a view count.
fn parse_count(cell: &str) -> Option<u64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    if let Ok(count) = cell.parse::<u64>() {
        return Some(count);
    }
    match cell.parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => {
            Some(f as u64)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(url: &str, views: u64) -> PageviewSample {
        PageviewSample {
            url: url.to_string(),
            title: Some(format!("title of {}", url)),
            views,
        }
    }

    #[test]
    fn first_merge_into_empty_table() {
        let mut table = PageviewTable::new();
        let report = table.merge("2024-01-01_10-00", vec![sample("u1", 42)], 2);
        assert_eq!(report.updated, vec!["u1".to_string()]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.columns().collect::<Vec<_>>(), vec!["2024-01-01_10-00"]);
        assert_eq!(table.get("u1", "2024-01-01_10-00"), Some(42));
        assert_eq!(table.row("u1").unwrap().title, "title of u1");
    }

    #[test]
    fn keeps_only_most_recent_columns() {
        let mut table = PageviewTable::new();
        table.merge("2024-01-01_10-00", vec![sample("u1", 1)], 10);
        table.merge("2024-01-02_10-00", vec![sample("u1", 2)], 10);
        table.merge("2024-01-03_10-00", vec![sample("u1", 3)], 10);
        assert_eq!(table.columns().count(), 3);

        let report = table.merge("2024-01-04_10-00", vec![sample("u1", 4)], 2);
        assert_eq!(
            report.columns_dropped,
            vec!["2024-01-01_10-00".to_string(), "2024-01-02_10-00".to_string()]
        );
        assert_eq!(
            table.columns().collect::<Vec<_>>(),
            vec!["2024-01-03_10-00", "2024-01-04_10-00"]
        );
        assert_eq!(table.get("u1", "2024-01-03_10-00"), Some(3));
        assert_eq!(table.get("u1", "2024-01-04_10-00"), Some(4));
    }

    #[test]
    fn merge_never_rewrites_old_cells() {
        let mut table = PageviewTable::new();
        table.merge("2024-01-01_10-00", vec![sample("u1", 10), sample("u2", 20)], 5);
        table.merge("2024-01-02_10-00", vec![sample("u1", 11)], 5);

        assert_eq!(table.get("u1", "2024-01-01_10-00"), Some(10));
        assert_eq!(table.get("u2", "2024-01-01_10-00"), Some(20));
        assert_eq!(table.get("u2", "2024-01-02_10-00"), None);
        assert_eq!(table.get("u1", "2024-01-02_10-00"), Some(11));
    }

    #[test]
    fn same_minute_capture_overwrites_its_column() {
        let mut table = PageviewTable::new();
        table.merge("2024-01-01_10-00", vec![sample("u1", 10), sample("u2", 20)], 2);
        let report = table.merge("2024-01-01_10-00", vec![sample("u1", 12)], 2);

        assert!(report.columns_dropped.is_empty());
        assert_eq!(table.columns().count(), 1);
        assert_eq!(table.get("u1", "2024-01-01_10-00"), Some(12));
        assert_eq!(table.get("u2", "2024-01-01_10-00"), Some(20));
    }

    #[test]
    fn rows_without_counts_are_dropped() {
        let mut table = PageviewTable::parse(
            "url\ttitle\t2024-01-01_10-00\t2024-01-02_10-00\n\
             u1\tOne\t\t\n\
             u2\tTwo\t5\t\n\
             u3\tThree\tn/a\t\n",
        )
        .unwrap();
        assert_eq!(table.len(), 3);

        let report = table.merge("2024-01-03_10-00", Vec::new(), 5);
        assert_eq!(report.rows_dropped, 2);
        assert!(table.row("u1").is_none());
        assert!(table.row("u3").is_none());
        assert_eq!(table.get("u2", "2024-01-01_10-00"), Some(5));
    }

    #[test]
    fn rows_emptied_by_column_pruning_are_dropped() {
        let mut table = PageviewTable::new();
        table.merge("2024-01-01_10-00", vec![sample("old", 1)], 5);
        table.merge("2024-01-02_10-00", vec![sample("new", 2)], 5);

        let report = table.merge("2024-01-03_10-00", vec![sample("new", 3)], 2);
        assert_eq!(report.columns_dropped, vec!["2024-01-01_10-00".to_string()]);
        assert_eq!(report.rows_dropped, 1);
        assert!(table.row("old").is_none());
        assert!(table.rows().all(|(_, row)| !row.counts.is_empty()));
    }

    #[test]
    fn missing_title_keeps_stored_title() {
        let mut table = PageviewTable::new();
        table.merge("2024-01-01_10-00", vec![sample("u1", 1)], 5);
        table.merge(
            "2024-01-02_10-00",
            vec![PageviewSample {
                url: "u1".to_string(),
                title: None,
                views: 2,
            }],
            5,
        );
        assert_eq!(table.row("u1").unwrap().title, "title of u1");
    }

    #[test]
    fn writes_ordered_tsv_with_bom() {
        let mut table = PageviewTable::new();
        table.merge("2024-01-02_10-00", vec![sample("b", 2)], 5);
        table.merge("2024-01-01_10-00", vec![sample("a", 1)], 5);

        let mut buf = Vec::new();
        table.write_tsv(&mut buf).unwrap();
        assert!(buf.starts_with(BOM));
        let txt = String::from_utf8(buf[BOM.len()..].to_vec()).unwrap();
        assert_eq!(
            txt,
            "url\ttitle\t2024-01-01_10-00\t2024-01-02_10-00\n\
             a\ttitle of a\t1\t\n\
             b\ttitle of b\t\t2\n"
        );
    }

    #[test]
    fn parse_reads_back_written_table() {
        let mut table = PageviewTable::new();
        table.merge("2024-01-01_10-00", vec![sample("a", 1), sample("b", 7)], 5);
        table.merge("2024-01-02_10-00", vec![sample("a", 3)], 5);

        let mut buf = Vec::new();
        table.write_tsv(&mut buf).unwrap();
        let parsed = PageviewTable::parse(&String::from_utf8(buf).unwrap()).unwrap();
        assert_eq!(parsed, table);
    }

    #[test]
    fn parse_coerces_float_cells() {
        let table = PageviewTable::parse("url\ttitle\t2024-01-01_10-00\nu\tT\t12.0\n").unwrap();
        assert_eq!(table.get("u", "2024-01-01_10-00"), Some(12));
    }

    #[test]
    fn parse_rejects_tables_without_url_column() {
        assert!(PageviewTable::parse("link\ttitle\nx\ty\n").is_err());
        assert_eq!(PageviewTable::parse("").unwrap(), PageviewTable::new());
        assert_eq!(PageviewTable::parse("\u{feff}  \n").unwrap(), PageviewTable::new());
    }

    #[test]
    fn load_treats_missing_and_corrupt_files_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.tsv");
        assert!(PageviewTable::load(&missing).is_empty());

        let corrupt = dir.path().join("corrupt.tsv");
        std::fs::write(&corrupt, "no\theader\there\n1\t2\t3\n").unwrap();
        assert!(PageviewTable::load(&corrupt).is_empty());
    }
}

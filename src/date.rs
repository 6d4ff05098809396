use chrono::{Local, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub(crate) static ref RE_COLUMN_LABEL: Regex =
        Regex::new(r"^\d{4}-\d{2}-\d{2}_\d{2}-\d{2}$").unwrap();
}

/// Format of the pageview table's timestamp columns.
pub const COLUMN_LABEL_FORMAT: &str = "%Y-%m-%d_%H-%M";

/// The moment a run captured its data.
///
/// All names derived from it (table column, file names) sort
/// lexicographically in chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaptureTime(NaiveDateTime);

impl CaptureTime {
    /// The local wall clock time.
    pub fn now() -> Self {
        CaptureTime(Local::now().naive_local())
    }

    /// Label of the pageview column for this capture, `2024-01-01_10-00`.
    pub fn column_label(&self) -> String {
        self.0.format(COLUMN_LABEL_FORMAT).to_string()
    }

    /// Suffix of scrape output files, `2401011000`.
    pub fn file_stamp(&self) -> String {
        self.0.format("%y%m%d%H%M").to_string()
    }

    /// Suffix of the daily enrichment file, `20240101`.
    pub fn day_stamp(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    /// Parse a pageview column label back into a capture time.
    pub fn from_column_label(label: &str) -> Option<Self> {
        if !RE_COLUMN_LABEL.is_match(label) {
            return None;
        }
        NaiveDateTime::parse_from_str(label, COLUMN_LABEL_FORMAT)
            .ok()
            .map(CaptureTime)
    }
}

impl From<NaiveDateTime> for CaptureTime {
    fn from(dt: NaiveDateTime) -> Self {
        CaptureTime(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn capture() -> CaptureTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
            .into()
    }

    #[test]
    fn labels() {
        let t = capture();
        assert_eq!(t.column_label(), "2024-01-01_10-00");
        assert_eq!(t.file_stamp(), "2401011000");
        assert_eq!(t.day_stamp(), "20240101");
    }

    #[test]
    fn parses_column_labels() {
        assert_eq!(
            CaptureTime::from_column_label("2024-01-01_10-00"),
            Some(capture())
        );
        assert_eq!(CaptureTime::from_column_label("views"), None);
        assert_eq!(CaptureTime::from_column_label("2024-13-01_10-00"), None);
    }
}

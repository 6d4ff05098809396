use log::{info, warn};
use select::document::Document;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ScrapeError;
use crate::extract::{DellExtractor, Extractor};
use crate::fetch::Fetch;
use crate::text;

/// Whether a thread carries the "Solved!" label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Solved {
    Yes,
    No,
}

impl Default for Solved {
    fn default() -> Self {
        Solved::No
    }
}

/// The accepted-solution badge of a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accepted {
    /// Accepted by the community.
    Yes,
    /// Accepted by a vendor employee.
    #[serde(rename = "Yes-Dell")]
    YesDell,
    No,
}

impl Default for Accepted {
    fn default() -> Self {
        Accepted::No
    }
}

/// A single answer below the initial post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub author: Option<String>,
    /// As displayed by the site.
    pub date: Option<String>,
    #[serde(default)]
    pub accepted: Accepted,
    pub body: Option<String>,
}

/// Everything scraped from one thread page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
    /// The url of the thread.
    pub url: String,
    pub title: Option<String>,
    pub question_author: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub page_views: u64,
    pub post_date: Option<String>,
    #[serde(default)]
    pub solved: Solved,
    /// Text of the initial post.
    pub init_body: Option<String>,
    /// Comments in page order.
    #[serde(default)]
    pub comments: Vec<CommentRecord>,
}

/// Older exports store the view counter as text like `"1,234 views"`.
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    #[allow(dead_code)]
    enum Count {
        Number(u64),
        Text(String),
        Other(serde_json::Value),
    }

    Ok(match Count::deserialize(deserializer)? {
        Count::Number(n) => n,
        Count::Text(s) => text::digits(&s),
        Count::Other(_) => 0,
    })
}

/// One entry of a scrape run: either the record or why it is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScrapeOutcome {
    Failed { url: String, error: String },
    Thread(ThreadRecord),
}

impl ScrapeOutcome {
    pub fn url(&self) -> &str {
        match self {
            ScrapeOutcome::Failed { url, .. } => url,
            ScrapeOutcome::Thread(thread) => &thread.url,
        }
    }

    pub fn thread(&self) -> Option<&ThreadRecord> {
        match self {
            ScrapeOutcome::Thread(thread) => Some(thread),
            ScrapeOutcome::Failed { .. } => None,
        }
    }

    pub fn into_thread(self) -> Option<ThreadRecord> {
        match self {
            ScrapeOutcome::Thread(thread) => Some(thread),
            ScrapeOutcome::Failed { .. } => None,
        }
    }
}

impl From<Result<ThreadRecord, ScrapeError>> for ScrapeOutcome {
    fn from(res: Result<ThreadRecord, ScrapeError>) -> Self {
        match res {
            Ok(thread) => ScrapeOutcome::Thread(thread),
            Err(err) => ScrapeOutcome::Failed {
                url: err.url().to_string(),
                error: err.to_string(),
            },
        }
    }
}

/// Fetches thread pages and turns them into [`ThreadRecord`]s.
#[derive(Debug, Clone)]
pub struct ThreadScraper<F, E = DellExtractor> {
    fetcher: F,
    extractor: E,
}

impl<F: Fetch> ThreadScraper<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_extractor(fetcher, DellExtractor)
    }
}

impl<F: Fetch, E: Extractor> ThreadScraper<F, E> {
    pub fn with_extractor(fetcher: F, extractor: E) -> Self {
        Self { fetcher, extractor }
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Fetch `url` and extract the thread.
    ///
    /// Only the fetch can fail, absent fields end up as `None`.
    pub async fn scrape(&self, url: &str) -> Result<ThreadRecord, ScrapeError> {
        let markup = self.fetcher.fetch(url).await.map_err(|err| {
            warn!("{}", err);
            err
        })?;
        let thread = self.parse(url, &markup);
        info!(
            "Scraped {} ({:?}, {} views, {} comments)",
            url,
            thread.title.as_deref().unwrap_or_default(),
            thread.page_views,
            thread.comments.len()
        );
        Ok(thread)
    }

    /// Extract the thread from already fetched markup.
    pub fn parse(&self, url: &str, markup: &str) -> ThreadRecord {
        let doc = Document::from(markup);
        ThreadRecord {
            url: url.to_string(),
            title: self.extractor.title(&doc),
            question_author: self.extractor.question_author(&doc),
            page_views: self.extractor.page_views(&doc),
            post_date: self.extractor.post_date(&doc),
            solved: self.extractor.solved(&doc),
            init_body: self.extractor.init_body(&doc),
            comments: self.extractor.comments(&doc),
        }
    }

    /// Scrape every url in order, one after the other.
    ///
    /// A failing url is turned into a [`ScrapeOutcome::Failed`] entry, the
    /// remaining urls are still scraped.
    pub async fn scrape_all<I, S>(&self, urls: I) -> Vec<ScrapeOutcome>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut outcomes = Vec::new();
        for url in urls {
            outcomes.push(self.scrape(url.as_ref()).await.into());
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoFetch;

    impl Fetch for NoFetch {
        async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
            Err(ScrapeError::Other {
                url: url.to_string(),
                reason: "offline".to_string(),
            })
        }
    }

    #[test]
    fn parse_partial_page() {
        let scraper = ThreadScraper::new(NoFetch);
        let thread = scraper.parse(
            "https://www.dell.com/community/en/conversations/x//abc",
            r#"<h1 class="conversation-balloon__content__title">Fan noise</h1>"#,
        );
        assert_eq!(thread.title.as_deref(), Some("Fan noise"));
        assert_eq!(thread.question_author, None);
        assert_eq!(thread.page_views, 0);
        assert_eq!(thread.solved, Solved::No);
        assert!(thread.comments.is_empty());
    }

    #[test]
    fn serializes_site_labels() {
        let comment = CommentRecord {
            author: Some("agent".to_string()),
            date: None,
            accepted: Accepted::YesDell,
            body: Some("fixed".to_string()),
        };
        let json = serde_json::to_value(&comment).unwrap();
        assert_eq!(json["accepted"], "Yes-Dell");
        assert_eq!(json["date"], serde_json::Value::Null);
    }

    #[test]
    fn reads_legacy_records() {
        let json = r#"{
            "url": "https://www.dell.com/community/en/conversations/x//1",
            "title": "Dock not detected",
            "question_author": "someone",
            "page_views": "2,048 views",
            "solved": "Yes",
            "init_body": "WD19 is not detected",
            "comments": [{"author": "a", "date": "d", "accepted": "Yes-Dell", "body": "b"}]
        }"#;
        let thread: ThreadRecord = serde_json::from_str(json).unwrap();
        assert_eq!(thread.page_views, 2048);
        assert_eq!(thread.solved, Solved::Yes);
        assert_eq!(thread.post_date, None);
        assert_eq!(thread.comments[0].accepted, Accepted::YesDell);
    }

    #[test]
    fn failed_outcome_roundtrips_as_error_entry() {
        let outcome = ScrapeOutcome::Failed {
            url: "https://example.com/t".to_string(),
            error: "boom".to_string(),
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, r#"{"url":"https://example.com/t","error":"boom"}"#);
        let back: ScrapeOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outcome);
        assert!(back.thread().is_none());
    }

    #[tokio::test]
    async fn fetch_failure_becomes_failed_outcome() {
        let scraper = ThreadScraper::new(NoFetch);
        let outcomes = scraper.scrape_all(vec!["https://example.com/a"]).await;
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            ScrapeOutcome::Failed { url, error } => {
                assert_eq!(url, "https://example.com/a");
                assert!(error.contains("offline"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

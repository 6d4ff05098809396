use std::path::Path;

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::category::{Classifier, ThreadType};
use crate::thread::{ScrapeOutcome, ThreadRecord};

/// A scraped thread with its derived summaries and category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedThreadRecord {
    #[serde(flatten)]
    pub thread: ThreadRecord,
    pub short_summary: String,
    pub summary: String,
    pub thread_type: ThreadType,
}

impl EnrichedThreadRecord {
    /// Identity of a record inside the archive.
    pub fn key(&self) -> (String, Option<String>) {
        (self.thread.url.clone(), self.thread.title.clone())
    }
}

/// Title, initial post and comment bodies, one per line.
pub fn thread_text(thread: &ThreadRecord) -> String {
    let comments = thread.comments.iter().map(|c| c.body.as_deref());
    std::iter::once(thread.title.as_deref())
        .chain(std::iter::once(thread.init_body.as_deref()))
        .chain(comments)
        .flatten()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Classify `thread`, `None` if it has no text at all.
pub fn enrich_thread<C: Classifier>(
    classifier: &C,
    thread: ThreadRecord,
) -> Option<EnrichedThreadRecord> {
    let txt = thread_text(&thread);
    if txt.is_empty() {
        warn!("{} has no text to classify, skipping", thread.url);
        return None;
    }
    let classification = classifier.classify(&txt);
    Some(EnrichedThreadRecord {
        thread,
        short_summary: classification.short_summary,
        summary: classification.summary,
        thread_type: classification.thread_type,
    })
}

/// Classify all `threads` that carry text.
pub fn enrich_all<C, I>(classifier: &C, threads: I) -> Vec<EnrichedThreadRecord>
where
    C: Classifier,
    I: IntoIterator<Item = ThreadRecord>,
{
    threads
        .into_iter()
        .filter_map(|thread| enrich_thread(classifier, thread))
        .collect()
}

/// Extract the threads of a scrape output.
///
/// `json` may be a single record or a list. Error entries and entries that
/// are not thread records are skipped.
pub fn threads_from_json(json: Value) -> Vec<ThreadRecord> {
    let items = match json {
        Value::Array(items) => items,
        other => vec![other],
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<ScrapeOutcome>(item) {
            Ok(ScrapeOutcome::Thread(thread)) => Some(thread),
            Ok(ScrapeOutcome::Failed { url, error }) => {
                warn!("Skipping failed scrape of {}: {}", url, error);
                None
            }
            Err(err) => {
                warn!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .collect()
}

/// Read the threads of the scrape output at `path`.
pub fn read_threads<P: AsRef<Path>>(path: P) -> Result<Vec<ThreadRecord>> {
    let path = path.as_ref();
    let txt = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let json: Value = serde_json::from_str(&txt)
        .with_context(|| format!("{} is not valid json", path.display()))?;
    Ok(threads_from_json(json))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::KeywordClassifier;
    use crate::thread::{Accepted, CommentRecord, Solved};
    use serde_json::json;

    fn thread() -> ThreadRecord {
        ThreadRecord {
            url: "https://www.dell.com/community/en/conversations/x//1".to_string(),
            title: Some("ドライバーのインストール".to_string()),
            question_author: Some("q".to_string()),
            page_views: 3,
            post_date: None,
            solved: Solved::Yes,
            init_body: Some("手順を教えてください".to_string()),
            comments: vec![
                CommentRecord {
                    author: None,
                    date: None,
                    accepted: Accepted::No,
                    body: None,
                },
                CommentRecord {
                    author: Some("a".to_string()),
                    date: None,
                    accepted: Accepted::Yes,
                    body: Some("設定を確認".to_string()),
                },
            ],
        }
    }

    #[test]
    fn joins_text_parts() {
        assert_eq!(
            thread_text(&thread()),
            "ドライバーのインストール\n手順を教えてください\n設定を確認"
        );
    }

    #[test]
    fn enriches_with_classification() {
        let enriched = enrich_thread(&KeywordClassifier::default(), thread()).unwrap();
        assert_eq!(enriched.thread_type, ThreadType::Configurations);
        assert_eq!(enriched.short_summary, "ドライバーのインストール 手順を教えてく");
        assert_eq!(enriched.thread, thread());
    }

    #[test]
    fn skips_threads_without_text() {
        let mut empty = thread();
        empty.title = None;
        empty.init_body = Some(String::new());
        empty.comments.clear();
        assert!(enrich_thread(&KeywordClassifier::default(), empty).is_none());
    }

    #[test]
    fn flattens_into_single_object() {
        let enriched = enrich_thread(&KeywordClassifier::default(), thread()).unwrap();
        let value = serde_json::to_value(&enriched).unwrap();
        assert_eq!(value["url"], thread().url);
        assert_eq!(value["thread_type"], "Configurations");
        assert_eq!(value["solved"], "Yes");
        let back: EnrichedThreadRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, enriched);
    }

    #[test]
    fn reads_single_object_and_skips_errors() {
        let single = json!({"url": "u", "title": "t", "page_views": 4});
        let threads = threads_from_json(single);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].page_views, 4);

        let list = json!([
            {"url": "u1", "error": "timeout"},
            {"url": "u2", "title": "t2"},
            42
        ]);
        let threads = threads_from_json(list);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].url, "u2");
    }
}

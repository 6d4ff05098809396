//! Scraping of community forum threads, pageview tracking over time and
//! keyword based categorization of the scraped threads.

pub use category::{Classification, Classifier, KeywordClassifier, ThreadType};
pub use community::{Community, Config, ConfigBuilder, EnrichReport};
pub use date::CaptureTime;
pub use enrich::EnrichedThreadRecord;
pub use error::ScrapeError;
pub use extract::{DellExtractor, Extractor};
pub use fetch::{Fetch, HttpFetcher};
pub use pageview::{MergeReport, PageviewSample, PageviewTable};
pub use storage::ArchiveStore;
pub use thread::{Accepted, CommentRecord, ScrapeOutcome, Solved, ThreadRecord, ThreadScraper};

pub mod category;
pub mod community;
pub mod date;
pub mod enrich;
mod error;
pub mod extract;
pub mod fetch;
pub mod input;
pub mod pageview;
pub mod storage;
pub mod text;
pub mod thread;

/// Rexported to implement custom extractors.
pub use select;

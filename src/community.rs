use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use log::info;

use crate::category::{Classifier, KeywordClassifier};
use crate::date::CaptureTime;
use crate::enrich::{self, EnrichedThreadRecord};
use crate::extract::{DellExtractor, Extractor};
use crate::fetch::{Fetch, HttpFetcher};
use crate::input;
use crate::pageview::{MergeReport, PageviewSample, PageviewTable};
use crate::storage::{self, ArchiveStore};
use crate::thread::{ScrapeOutcome, ThreadRecord, ThreadScraper};

/// Drives the scrape, pageview and enrichment runs against the community
/// site.
#[derive(Debug)]
pub struct Community<F = HttpFetcher, E = DellExtractor, C = KeywordClassifier> {
    scraper: ThreadScraper<F, E>,
    classifier: C,
    config: Config,
}

impl Community {
    /// A community client fetching over http with the default extractor
    /// and classifier.
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        let classifier = KeywordClassifier::new(config.short_summary_len, config.summary_len);
        Ok(Community::with_parts(config, fetcher, DellExtractor, classifier))
    }
}

impl<F: Fetch, E: Extractor, C: Classifier> Community<F, E, C> {
    pub fn with_parts(config: Config, fetcher: F, extractor: E, classifier: C) -> Self {
        Self {
            scraper: ThreadScraper::with_extractor(fetcher, extractor),
            classifier,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn scraper(&self) -> &ThreadScraper<F, E> {
        &self.scraper
    }

    /// Read the input list at `path` into thread urls.
    pub fn read_urls<P: AsRef<Path>>(&self, path: P) -> Result<Vec<String>> {
        input::read_list(path, &self.config.thread_base_url)
    }

    /// Scrape all `urls` in order and store the outcomes as
    /// `dcfcontents_<stamp>.json` in `out_dir`.
    pub async fn scrape<P: AsRef<Path>>(
        &self,
        urls: &[String],
        out_dir: P,
        captured: CaptureTime,
    ) -> Result<(PathBuf, Vec<ScrapeOutcome>)> {
        storage::ensure_dir(out_dir.as_ref())?;

        info!("Scraping {} threads", urls.len());
        let outcomes = self.scraper.scrape_all(urls).await;

        let path = out_dir
            .as_ref()
            .join(format!("dcfcontents_{}.json", captured.file_stamp()));
        storage::write_json(&path, &outcomes)?;
        info!("Stored {} entries in {}", outcomes.len(), path.display());

        Ok((path, outcomes))
    }

    /// Record the current view count of every url in the table at `table`.
    ///
    /// The urls are deduplicated and visited in sorted order. Urls that fail
    /// to scrape are left untouched.
    pub async fn track_pageviews<P: AsRef<Path>>(
        &self,
        urls: Vec<String>,
        table: P,
        captured: CaptureTime,
    ) -> Result<MergeReport> {
        let table_path = table.as_ref();
        let mut table = PageviewTable::load(table_path);
        let urls = input::normalize(urls);
        info!("Tracking pageviews of {} threads", urls.len());

        let mut samples = Vec::with_capacity(urls.len());
        let mut failed = Vec::new();
        for url in &urls {
            match self.scraper.scrape(url).await {
                Ok(thread) => samples.push(PageviewSample::from(&thread)),
                Err(_) => {
                    info!("Keeping previous pageviews of {}", url);
                    failed.push(url.clone());
                }
            }
        }

        let mut report = table.merge(&captured.column_label(), samples, self.config.max_cols);
        report.failed = failed;

        table.save(table_path)?;
        info!(
            "Stored pageviews of {} threads in {}",
            table.len(),
            table_path.display()
        );
        Ok(report)
    }

    /// Classify `threads` with this community's classifier.
    pub fn enrich<I>(&self, threads: I) -> Vec<EnrichedThreadRecord>
    where
        I: IntoIterator<Item = ThreadRecord>,
    {
        enrich::enrich_all(&self.classifier, threads)
    }

    /// Enrich the scrape output at `json`.
    ///
    /// Writes `dcfcontents_full_<day>.json` and merges into
    /// `dcfcontents_full_all.json`, both inside the configured json dir.
    pub fn enrich_file<P: AsRef<Path>>(&self, json: P, captured: CaptureTime) -> Result<EnrichReport> {
        storage::ensure_dir(&self.config.json_dir)?;

        let threads = enrich::read_threads(json)?;
        let records = self.enrich(threads);

        let archive = ArchiveStore::new(self.config.json_dir.join("dcfcontents_full_all.json"));
        let mut report = EnrichReport {
            processed: records.len(),
            dated_file: None,
            archive_file: archive.path().to_path_buf(),
            added: 0,
        };
        if records.is_empty() {
            info!("Nothing to enrich");
            return Ok(report);
        }

        let dated = self
            .config
            .json_dir
            .join(format!("dcfcontents_full_{}.json", captured.day_stamp()));
        storage::write_json(&dated, &records)?;
        info!("Stored {} enriched threads in {}", records.len(), dated.display());
        report.dated_file = Some(dated);

        report.added = archive.append(records)?;
        Ok(report)
    }
}

/// What an enrichment run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichReport {
    /// Number of threads that were classified.
    pub processed: usize,
    /// The per day output, if anything was classified.
    pub dated_file: Option<PathBuf>,
    pub archive_file: PathBuf,
    /// Records new to the archive.
    pub added: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of timestamp columns kept in the pageview table.
    pub(crate) max_cols: usize,
    /// Timeout for requests.
    pub(crate) request_timeout: Duration,
    /// The user-agent used for requests.
    pub(crate) browser_user_agent: String,
    /// Prefix for bare thread identifiers.
    pub(crate) thread_base_url: String,
    /// Number of chars of the short summary.
    pub(crate) short_summary_len: usize,
    /// Number of chars of the summary.
    pub(crate) summary_len: usize,
    /// Where enrichment results are written.
    pub(crate) json_dir: PathBuf,
    /// Where scrape results are written.
    pub(crate) scrape_dir: PathBuf,
    /// The pageview table.
    pub(crate) pageview_file: PathBuf,
}

impl Config {
    /// Default timeout for requests in seconds.
    pub const DEFAULT_REQ_TIMEOUT_SEC: u64 = 30;

    pub const DEFAULT_MAX_COLS: usize = 2;

    pub const DEFAULT_THREAD_BASE_URL: &'static str =
        "https://www.dell.com/community/en/conversations/x//";

    /// Default user agent.
    #[inline]
    pub(crate) fn user_agent() -> String {
        format!("dcfscrape/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Convenience method to create a [`ConfigBuilder`]
    #[inline]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn max_cols(&self) -> usize {
        self.max_cols
    }

    pub fn thread_base_url(&self) -> &str {
        &self.thread_base_url
    }

    pub fn json_dir(&self) -> &Path {
        &self.json_dir
    }

    pub fn scrape_dir(&self) -> &Path {
        &self.scrape_dir
    }

    pub fn pageview_file(&self) -> &Path {
        &self.pageview_file
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::builder().build()
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    max_cols: Option<usize>,
    request_timeout: Option<Duration>,
    browser_user_agent: Option<String>,
    thread_base_url: Option<String>,
    short_summary_len: Option<usize>,
    summary_len: Option<usize>,
    json_dir: Option<PathBuf>,
    scrape_dir: Option<PathBuf>,
    pageview_file: Option<PathBuf>,
}

impl ConfigBuilder {
    pub fn max_cols(mut self, max_cols: usize) -> Self {
        self.max_cols = Some(max_cols);
        self
    }

    pub fn request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = Some(request_timeout);
        self
    }

    pub fn browser_user_agent<T: ToString>(mut self, browser_user_agent: T) -> Self {
        self.browser_user_agent = Some(browser_user_agent.to_string());
        self
    }

    pub fn thread_base_url<T: ToString>(mut self, thread_base_url: T) -> Self {
        self.thread_base_url = Some(thread_base_url.to_string());
        self
    }

    pub fn short_summary_len(mut self, short_summary_len: usize) -> Self {
        self.short_summary_len = Some(short_summary_len);
        self
    }

    pub fn summary_len(mut self, summary_len: usize) -> Self {
        self.summary_len = Some(summary_len);
        self
    }

    pub fn json_dir<T: Into<PathBuf>>(mut self, json_dir: T) -> Self {
        self.json_dir = Some(json_dir.into());
        self
    }

    pub fn scrape_dir<T: Into<PathBuf>>(mut self, scrape_dir: T) -> Self {
        self.scrape_dir = Some(scrape_dir.into());
        self
    }

    pub fn pageview_file<T: Into<PathBuf>>(mut self, pageview_file: T) -> Self {
        self.pageview_file = Some(pageview_file.into());
        self
    }

    pub fn build(self) -> Config {
        Config {
            // a window of zero columns would drop every row
            max_cols: self.max_cols.unwrap_or(Config::DEFAULT_MAX_COLS).max(1),
            request_timeout: self
                .request_timeout
                .unwrap_or_else(|| Duration::from_secs(Config::DEFAULT_REQ_TIMEOUT_SEC)),
            browser_user_agent: self.browser_user_agent.unwrap_or_else(Config::user_agent),
            thread_base_url: self
                .thread_base_url
                .unwrap_or_else(|| Config::DEFAULT_THREAD_BASE_URL.to_string()),
            short_summary_len: self
                .short_summary_len
                .unwrap_or(KeywordClassifier::DEFAULT_SHORT_SUMMARY_LEN),
            summary_len: self
                .summary_len
                .unwrap_or(KeywordClassifier::DEFAULT_SUMMARY_LEN),
            json_dir: self.json_dir.unwrap_or_else(|| PathBuf::from("jsonfiles")),
            scrape_dir: self.scrape_dir.unwrap_or_else(|| PathBuf::from(".")),
            pageview_file: self
                .pageview_file
                .unwrap_or_else(|| PathBuf::from("dcf_pageviews.tsv")),
        }
    }
}

use std::path::PathBuf;
use std::time::Duration;

use log::{info, warn, LevelFilter};
use structopt::clap::AppSettings;
use structopt::StructOpt;

use dcfscrape::{CaptureTime, Community, Config, ConfigBuilder};

#[allow(missing_docs)]
#[derive(Debug, StructOpt)]
#[structopt(
    name = "dcfscrape",
    about = "Community thread scraping, pageview tracking and categorization."
)]
#[structopt(setting = AppSettings::ColoredHelp)]
enum App {
    #[structopt(name = "scrape", about = "Scrape every thread of a list into a json file.")]
    Scrape {
        #[structopt(
            name = "list",
            help = "File with one thread url or thread id per line.",
            parse(from_os_str)
        )]
        input: PathBuf,
        #[structopt(
            long = "out-dir",
            help = "Directory for the json file.",
            parse(from_os_str)
        )]
        out_dir: Option<PathBuf>,
        #[structopt(flatten)]
        opts: FetchOpts,
    },
    #[structopt(
        name = "pageviews",
        about = "Record the view counts of a list of threads in the pageview table."
    )]
    Pageviews {
        #[structopt(
            name = "list",
            help = "File with one thread url or thread id per line.",
            parse(from_os_str)
        )]
        input: PathBuf,
        #[structopt(long = "table", help = "The pageview table.", parse(from_os_str))]
        table: Option<PathBuf>,
        #[structopt(long = "max-cols", help = "Number of capture columns to keep.")]
        max_cols: Option<usize>,
        #[structopt(flatten)]
        opts: FetchOpts,
    },
    #[structopt(
        name = "enrich",
        about = "Add summaries and categories to scraped threads and archive them."
    )]
    Enrich {
        #[structopt(name = "json", help = "A json file written by `scrape`.", parse(from_os_str))]
        json: PathBuf,
        #[structopt(
            long = "json-dir",
            help = "Directory for the enriched files.",
            parse(from_os_str)
        )]
        json_dir: Option<PathBuf>,
        #[structopt(long = "short-len", help = "Max number of chars of the short summary.")]
        short_len: Option<usize>,
        #[structopt(long = "summary-len", help = "Max number of chars of the summary.")]
        summary_len: Option<usize>,
    },
}

impl App {
    async fn run(self) -> anyhow::Result<()> {
        let captured = CaptureTime::now();
        match self {
            App::Scrape {
                input,
                out_dir,
                opts,
            } => {
                let mut config = opts.as_config();
                if let Some(out_dir) = out_dir {
                    config = config.scrape_dir(out_dir);
                }
                let community = Community::new(config.build())?;

                let urls = community.read_urls(&input)?;
                if urls.is_empty() {
                    warn!("No thread urls in {}", input.display());
                    return Ok(());
                }

                let (path, outcomes) = community
                    .scrape(&urls, community.config().scrape_dir(), captured)
                    .await?;
                let failed = outcomes.iter().filter(|o| o.thread().is_none()).count();
                info!(
                    "Scraped {} of {} threads into {}",
                    outcomes.len() - failed,
                    outcomes.len(),
                    path.display()
                );
            }
            App::Pageviews {
                input,
                table,
                max_cols,
                opts,
            } => {
                let mut config = opts.as_config();
                if let Some(table) = table {
                    config = config.pageview_file(table);
                }
                if let Some(max_cols) = max_cols {
                    config = config.max_cols(max_cols);
                }
                let community = Community::new(config.build())?;

                let urls = community.read_urls(&input)?;
                if urls.is_empty() {
                    warn!("No thread urls in {}", input.display());
                    return Ok(());
                }

                let table = community.config().pageview_file().to_path_buf();
                let report = community.track_pageviews(urls, &table, captured).await?;
                info!(
                    "Recorded {} threads in column {}, {} failed",
                    report.updated.len(),
                    report.label,
                    report.failed.len()
                );
            }
            App::Enrich {
                json,
                json_dir,
                short_len,
                summary_len,
            } => {
                let mut config = Config::builder();
                if let Some(json_dir) = json_dir {
                    config = config.json_dir(json_dir);
                }
                if let Some(short_len) = short_len {
                    config = config.short_summary_len(short_len);
                }
                if let Some(summary_len) = summary_len {
                    config = config.summary_len(summary_len);
                }
                let community = Community::new(config.build())?;

                let report = community.enrich_file(&json, captured)?;
                info!(
                    "Enriched {} threads, {} new in {}",
                    report.processed,
                    report.added,
                    report.archive_file.display()
                );
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, StructOpt)]
pub struct FetchOpts {
    #[structopt(long = "user-agent", help = "The user-agent used for requests.")]
    user_agent: Option<String>,
    #[structopt(long = "timeout", help = "Request timeout in seconds.")]
    timeout: Option<u64>,
    #[structopt(long = "base-url", help = "Prefix for bare thread ids.")]
    base_url: Option<String>,
}

impl FetchOpts {
    fn as_config(&self) -> ConfigBuilder {
        let mut config = Config::builder();
        if let Some(user_agent) = self.user_agent.clone() {
            config = config.browser_user_agent(user_agent);
        }
        if let Some(timeout) = self.timeout {
            config = config.request_timeout(Duration::from_secs(timeout));
        }
        if let Some(base_url) = self.base_url.clone() {
            config = config.thread_base_url(base_url);
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(LevelFilter::Info)
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_default())
        .init();

    App::from_args().run().await
}

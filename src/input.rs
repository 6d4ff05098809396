//! Reading the list of threads to work on.

use std::path::Path;

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use url::Url;

lazy_static! {
    /// A community url somewhere in a line, e.g. inside an exported table row.
    pub(crate) static ref RE_COMMUNITY_URL: Regex =
        Regex::new(r#"(https?://www\.dell\.com/community/[^\s"]+)"#).unwrap();

    /// A bare thread identifier.
    pub(crate) static ref RE_THREAD_ID: Regex =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap();
}

/// Turn one line of an input list into a thread url.
///
/// Lines holding a community url yield that url, a bare thread identifier is
/// appended to `base_url`. Anything else is ignored.
pub fn parse_line(line: &str, base_url: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(m) = RE_COMMUNITY_URL.captures(line).and_then(|c| c.get(1)) {
        return Some(m.as_str().to_string());
    }
    if RE_THREAD_ID.is_match(line) {
        let url = format!("{}{}", base_url, line);
        if Url::parse(&url).is_ok() {
            return Some(url);
        }
    }
    debug!("Ignoring input line {:?}", line);
    None
}

/// All thread urls in `txt`, in input order.
pub fn parse_list(txt: &str, base_url: &str) -> Vec<String> {
    txt.lines()
        .filter_map(|line| parse_line(line, base_url))
        .collect()
}

/// Read the input list at `path`.
pub fn read_list<P: AsRef<Path>>(path: P, base_url: &str) -> Result<Vec<String>> {
    let path = path.as_ref();
    let txt = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input list {}", path.display()))?;
    Ok(parse_list(txt.trim_start_matches('\u{feff}'), base_url))
}

/// Deduplicate and sort `urls`.
pub fn normalize(urls: Vec<String>) -> Vec<String> {
    let mut urls = urls;
    urls.sort();
    urls.dedup();
    urls
}

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::text;

lazy_static! {
    static ref RE_SPECIFICATIONS: Regex = Regex::new(r"(?i)仕様|詳細|スペック|機能").unwrap();
    static ref RE_CONFIGURATIONS: Regex =
        Regex::new(r"(?i)構成|設定|サポート|ベストプラクティス|インストール|導入|構築").unwrap();
    static ref RE_OPERATIONS: Regex = Regex::new(r"(?i)方法|how-to|手順|操作|実行|コマンド").unwrap();
    static ref RE_BREAK_FIX: Regex =
        Regex::new(r"(?i)問題|エラー|解決|失敗|トラブル|不具合|修正|break|fix").unwrap();
}

/// What kind of question a thread is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreadType {
    Specifications,
    Configurations,
    Operations,
    #[serde(rename = "Break&Fix")]
    BreakFix,
}

impl ThreadType {
    /// All types, ties between keyword scores go to the earlier one.
    pub const PRECEDENCE: [ThreadType; 4] = [
        ThreadType::Specifications,
        ThreadType::Configurations,
        ThreadType::Operations,
        ThreadType::BreakFix,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThreadType::Specifications => "Specifications",
            ThreadType::Configurations => "Configurations",
            ThreadType::Operations => "Operations",
            ThreadType::BreakFix => "Break&Fix",
        }
    }

    fn keywords(&self) -> &'static Regex {
        match self {
            ThreadType::Specifications => &RE_SPECIFICATIONS,
            ThreadType::Configurations => &RE_CONFIGURATIONS,
            ThreadType::Operations => &RE_OPERATIONS,
            ThreadType::BreakFix => &RE_BREAK_FIX,
        }
    }
}

impl Default for ThreadType {
    fn default() -> Self {
        ThreadType::Operations
    }
}

impl fmt::Display for ThreadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summaries and category of a thread's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub short_summary: String,
    pub summary: String,
    pub thread_type: ThreadType,
}

/// Derives summaries and a category from a thread's text.
///
/// Implementations must be deterministic.
pub trait Classifier {
    fn classify(&self, text: &str) -> Classification;
}

/// Truncating summaries plus keyword frequency categorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordClassifier {
    short_summary_len: usize,
    summary_len: usize,
}

impl KeywordClassifier {
    pub const DEFAULT_SHORT_SUMMARY_LEN: usize = 20;

    pub const DEFAULT_SUMMARY_LEN: usize = 80;

    pub fn new(short_summary_len: usize, summary_len: usize) -> Self {
        Self {
            short_summary_len,
            summary_len,
        }
    }

    /// Number of keyword matches per type, in precedence order.
    pub fn scores(text: &str) -> [(ThreadType, usize); 4] {
        ThreadType::PRECEDENCE.map(|ty| (ty, ty.keywords().find_iter(text).count()))
    }

    /// The type with the most keyword matches.
    ///
    /// Text without any keyword is [`ThreadType::Operations`].
    pub fn category(text: &str) -> ThreadType {
        let mut best = None;
        for (ty, score) in KeywordClassifier::scores(text).iter() {
            match best {
                Some((_, top)) if *score <= top => {}
                _ if *score == 0 => {}
                _ => best = Some((*ty, *score)),
            }
        }
        best.map(|(ty, _)| ty).unwrap_or_default()
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(
            KeywordClassifier::DEFAULT_SHORT_SUMMARY_LEN,
            KeywordClassifier::DEFAULT_SUMMARY_LEN,
        )
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, txt: &str) -> Classification {
        let cleaned = txt.replace('\n', " ").replace('\r', "");
        Classification {
            short_summary: text::truncate_chars(&cleaned, self.short_summary_len),
            summary: text::truncate_chars(&cleaned, self.summary_len),
            thread_type: KeywordClassifier::category(txt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_keywords_is_operations() {
        assert_eq!(KeywordClassifier::category(""), ThreadType::Operations);
        assert_eq!(
            KeywordClassifier::category("The laptop arrived today."),
            ThreadType::Operations
        );
    }

    #[test]
    fn tie_goes_to_precedence() {
        let scores = KeywordClassifier::scores("インストール方法について");
        assert_eq!(scores[1], (ThreadType::Configurations, 1));
        assert_eq!(scores[2], (ThreadType::Operations, 1));
        assert_eq!(
            KeywordClassifier::category("インストール方法について"),
            ThreadType::Configurations
        );
    }

    #[test]
    fn highest_score_wins() {
        let txt = "BIOSのエラーで起動に失敗。修正方法は?";
        assert_eq!(KeywordClassifier::category(txt), ThreadType::BreakFix);
        assert_eq!(
            KeywordClassifier::category("仕様と詳細のスペック、設定"),
            ThreadType::Specifications
        );
    }

    #[test]
    fn keywords_ignore_case() {
        assert_eq!(KeywordClassifier::category("Quick FIX please"), ThreadType::BreakFix);
        assert_eq!(KeywordClassifier::category("HOW-TO guide"), ThreadType::Operations);
    }

    #[test]
    fn summaries_truncate_normalized_text() {
        let c = KeywordClassifier::new(5, 12).classify("Dock\r\nnot detected after update");
        assert_eq!(c.short_summary, "Dock ");
        assert_eq!(c.summary, "Dock not det");
    }

    #[test]
    fn classify_is_deterministic() {
        let classifier = KeywordClassifier::default();
        let txt = "ドライバーのインストールでエラーが発生する問題";
        assert_eq!(classifier.classify(txt), classifier.classify(txt));
        assert_eq!(classifier.classify(txt).thread_type, ThreadType::BreakFix);
    }

    #[test]
    fn serializes_site_labels() {
        assert_eq!(
            serde_json::to_string(&ThreadType::BreakFix).unwrap(),
            "\"Break&Fix\""
        );
        assert_eq!(ThreadType::BreakFix.to_string(), "Break&Fix");
    }
}

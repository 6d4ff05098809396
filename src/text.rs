use select::node::Node;

/// How the text nodes below a matched element are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMode {
    /// Single line, all whitespace collapsed to single spaces.
    Inline,
    /// One line per text node, each line whitespace collapsed.
    Block,
}

impl TextMode {
    fn separator(self) -> &'static str {
        match self {
            TextMode::Inline => " ",
            TextMode::Block => "\n",
        }
    }
}

pub struct TextExtractor;

impl TextExtractor {
    /// Collect the text of all descendants of `node` according to `mode`.
    ///
    /// Empty text nodes (whitespace only) are skipped.
    pub fn node_text(node: &Node, mode: TextMode) -> String {
        let pieces: Vec<_> = node
            .descendants()
            .filter_map(|n| n.as_text())
            .map(collapse_whitespace)
            .filter(|s| !s.is_empty())
            .collect();
        pieces.join(mode.separator())
    }
}

/// Trim `txt` and replace every whitespace run by a single space.
pub fn collapse_whitespace(txt: &str) -> String {
    txt.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep only the ascii digits of `txt` and parse them.
///
/// `"1,234 views"` becomes `1234`; text without digits, or more digits than
/// fit into a `u64`, yields `0`.
pub fn digits(txt: &str) -> u64 {
    let digits: String = txt.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// The first `len` characters of `txt`.
pub fn truncate_chars(txt: &str, len: usize) -> String {
    txt.chars().take(len).collect()
}

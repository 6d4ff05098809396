use log::debug;
use select::document::Document;
use select::node::Node;
use select::predicate::{Class, Name, Predicate};

use crate::text::{self, TextExtractor, TextMode};
use crate::thread::{Accepted, CommentRecord, Solved};

/// Matches an element by its tag name and either a class or an attribute
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeQuery<'a> {
    /// The tag name.
    pub name: &'a str,
    /// What else the element must carry.
    pub matcher: Matcher<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher<'a> {
    /// One of the element's classes.
    Class(&'a str),
    /// An attribute and its exact value.
    Attr(&'a str, &'a str),
}

impl<'a> NodeQuery<'a> {
    pub const fn class(name: &'a str, class: &'a str) -> Self {
        Self {
            name,
            matcher: Matcher::Class(class),
        }
    }

    pub const fn attr(name: &'a str, attr: &'a str, value: &'a str) -> Self {
        Self {
            name,
            matcher: Matcher::Attr(attr, value),
        }
    }

    /// Restrict this query to elements whose whole text equals `text`.
    pub const fn with_text(self, text: &'a str) -> FieldQuery<'a> {
        FieldQuery {
            outer: self,
            inner: None,
            exact_text: Some(text),
        }
    }

    /// Look for `inner` inside the first element matching `self`.
    pub const fn then(self, inner: NodeQuery<'a>) -> FieldQuery<'a> {
        FieldQuery {
            outer: self,
            inner: Some(inner),
            exact_text: None,
        }
    }
}

impl<'a> Predicate for NodeQuery<'a> {
    fn matches(&self, node: &Node) -> bool {
        if !Name(self.name).matches(node) {
            return false;
        }
        match self.matcher {
            Matcher::Class(class) => Class(class).matches(node),
            // html5ever files `xlink:href` under its local name when it
            // appears inside svg content
            Matcher::Attr(attr, value) => {
                node.attr(attr) == Some(value)
                    || attr
                        .split_once(':')
                        .map(|(_, local)| node.attr(local) == Some(value))
                        .unwrap_or_default()
            }
        }
    }
}

/// Locates a single field on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldQuery<'a> {
    pub outer: NodeQuery<'a>,
    pub inner: Option<NodeQuery<'a>>,
    /// Required trimmed text of the located element.
    pub exact_text: Option<&'a str>,
}

impl<'a> From<NodeQuery<'a>> for FieldQuery<'a> {
    fn from(outer: NodeQuery<'a>) -> Self {
        Self {
            outer,
            inner: None,
            exact_text: None,
        }
    }
}

impl<'a> FieldQuery<'a> {
    /// The first node in `doc` this query resolves to.
    pub fn locate<'d>(&self, doc: &'d Document) -> Option<Node<'d>> {
        let first = doc.find(self.outer).find(|n| self.has_text(n))?;
        self.locate_inner(first)
    }

    /// The first node below `node` this query resolves to.
    pub fn locate_in<'d>(&self, node: &Node<'d>) -> Option<Node<'d>> {
        let first = node.find(self.outer).find(|n| self.has_text(n))?;
        self.locate_inner(first)
    }

    fn has_text(&self, node: &Node) -> bool {
        self.exact_text.map_or(true, |txt| node.text().trim() == txt)
    }

    fn locate_inner<'d>(&self, outer: Node<'d>) -> Option<Node<'d>> {
        match self.inner {
            Some(inner) => outer.find(inner).next(),
            None => Some(outer),
        }
    }

    /// Text of the located node in `doc`.
    pub fn text(&self, doc: &Document, mode: TextMode) -> Option<String> {
        self.locate(doc).map(|n| TextExtractor::node_text(&n, mode))
    }

    /// Text of the located node below `node`.
    pub fn text_in(&self, node: &Node, mode: TextMode) -> Option<String> {
        self.locate_in(node)
            .map(|n| TextExtractor::node_text(&n, mode))
    }
}

/// Pulls the fields of a thread out of a parsed page.
///
/// Missing elements are reported as `None` (or the field's neutral value),
/// one missing field never prevents the others from being extracted.
pub trait Extractor {
    /// The thread title.
    fn title(&self, doc: &Document) -> Option<String>;

    /// Who opened the thread.
    fn question_author(&self, doc: &Document) -> Option<String>;

    /// The view counter, `0` if it can't be found.
    fn page_views(&self, doc: &Document) -> u64;

    /// When the initial post was made, as displayed by the site.
    fn post_date(&self, doc: &Document) -> Option<String>;

    /// Whether the thread is marked as solved.
    fn solved(&self, doc: &Document) -> Solved;

    /// The text of the initial post.
    fn init_body(&self, doc: &Document) -> Option<String>;

    /// All comments in document order.
    fn comments(&self, doc: &Document) -> Vec<CommentRecord>;
}

/// Selectors of the vendor community site.
pub mod dell {
    use super::{FieldQuery, NodeQuery};

    pub const TITLE: NodeQuery<'static> =
        NodeQuery::class("h1", "conversation-balloon__content__title");

    pub const QUESTION_AUTHOR: FieldQuery<'static> =
        NodeQuery::class("div", "balloon__user").then(NodeQuery::class("p", "text-overflow"));

    pub const PAGE_VIEWS: FieldQuery<'static> =
        NodeQuery::class("div", "dell-conversation-balloon__view-count-cnt")
            .then(NodeQuery::class("p", "text--small"));

    pub const POST_DATE: NodeQuery<'static> =
        NodeQuery::class("p", "dell-conversation-ballon__header-date");

    pub const SOLVED: FieldQuery<'static> =
        NodeQuery::class("p", "conversation-balloon-dell__solved-label").with_text("Solved!");

    pub const INIT_BODY: NodeQuery<'static> =
        NodeQuery::class("div", "conversation-balloon__content__text");

    pub const COMMENT: NodeQuery<'static> = NodeQuery::class("div", "comment-list__comment");

    pub const COMMENT_AUTHOR: NodeQuery<'static> = NodeQuery::class("p", "text-overflow");

    pub const COMMENT_DATE: NodeQuery<'static> =
        NodeQuery::class("p", "dell-comment-ballon__header-date");

    pub const COMMUNITY_ACCEPTED: NodeQuery<'static> = NodeQuery::attr(
        "use",
        "xlink:href",
        "#icon-dell_community_accepted_solution_clr",
    );

    pub const VENDOR_ACCEPTED: NodeQuery<'static> =
        NodeQuery::attr("use", "xlink:href", "#icon-dell_accepted_solution_clr");

    pub const COMMENT_BODY: NodeQuery<'static> =
        NodeQuery::class("div", "dell-comment-balloon__content__text");
}

/// [`Extractor`] for the vendor community thread pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct DellExtractor;

impl DellExtractor {
    fn field(doc: &Document, query: impl Into<FieldQuery<'static>>, name: &str) -> Option<String> {
        let value = query.into().text(doc, TextMode::Inline);
        if value.is_none() {
            debug!("no {} on page", name);
        }
        value
    }

    fn comment(node: &Node) -> CommentRecord {
        let author = FieldQuery::from(dell::COMMENT_AUTHOR).text_in(node, TextMode::Inline);
        let date = FieldQuery::from(dell::COMMENT_DATE).text_in(node, TextMode::Inline);
        let body = FieldQuery::from(dell::COMMENT_BODY).text_in(node, TextMode::Block);

        let accepted = if node.find(dell::COMMUNITY_ACCEPTED).next().is_some() {
            Accepted::Yes
        } else if node.find(dell::VENDOR_ACCEPTED).next().is_some() {
            Accepted::YesDell
        } else {
            Accepted::No
        };

        CommentRecord {
            author,
            date,
            accepted,
            body,
        }
    }
}

impl Extractor for DellExtractor {
    fn title(&self, doc: &Document) -> Option<String> {
        DellExtractor::field(doc, dell::TITLE, "title")
    }

    fn question_author(&self, doc: &Document) -> Option<String> {
        DellExtractor::field(doc, dell::QUESTION_AUTHOR, "question author")
    }

    fn page_views(&self, doc: &Document) -> u64 {
        DellExtractor::field(doc, dell::PAGE_VIEWS, "view count")
            .map(|s| text::digits(&s))
            .unwrap_or_default()
    }

    fn post_date(&self, doc: &Document) -> Option<String> {
        DellExtractor::field(doc, dell::POST_DATE, "post date")
    }

    fn solved(&self, doc: &Document) -> Solved {
        if dell::SOLVED.locate(doc).is_some() {
            Solved::Yes
        } else {
            Solved::No
        }
    }

    fn init_body(&self, doc: &Document) -> Option<String> {
        FieldQuery::from(dell::INIT_BODY).text(doc, TextMode::Block)
    }

    fn comments(&self, doc: &Document) -> Vec<CommentRecord> {
        doc.find(dell::COMMENT)
            .map(|node| DellExtractor::comment(&node))
            .collect()
    }
}

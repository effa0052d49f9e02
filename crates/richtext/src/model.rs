// ABOUTME: Document tree produced by the converter: root, block nodes and inline nodes.
// ABOUTME: Includes the bold/italic TextFormat bit set and plain-text extraction.

use std::fmt;
use std::ops::BitOr;

use once_cell::sync::Lazy;
use regex::Regex;

static HORIZONTAL_WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Identifier of a materialized media entity in the content store.
pub type MediaId = String;

/// Bold/italic flags, stored with the Lexical bit values (bold = 1, italic = 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextFormat(u8);

impl TextFormat {
    pub const PLAIN: TextFormat = TextFormat(0);
    pub const BOLD: TextFormat = TextFormat(1);
    pub const ITALIC: TextFormat = TextFormat(2);

    /// Builds a format from raw bits; anything above the two known flags is dropped.
    pub fn from_bits(bits: u8) -> Self {
        TextFormat(bits & 0b11)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_bold(self) -> bool {
        self.0 & Self::BOLD.0 != 0
    }

    pub fn is_italic(self) -> bool {
        self.0 & Self::ITALIC.0 != 0
    }

    pub fn with_bold(self) -> Self {
        self | Self::BOLD
    }

    pub fn with_italic(self) -> Self {
        self | Self::ITALIC
    }
}

impl BitOr for TextFormat {
    type Output = TextFormat;

    fn bitor(self, rhs: Self) -> Self::Output {
        TextFormat(self.0 | rhs.0)
    }
}

/// A run of text sharing one format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub format: TextFormat,
}

impl TextRun {
    pub fn new(text: impl Into<String>, format: TextFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, TextFormat::PLAIN)
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self::new(text, TextFormat::BOLD)
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self::new(text, TextFormat::ITALIC)
    }
}

/// A hyperlink wrapping inline children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    pub target_blank: bool,
    pub children: Vec<InlineNode>,
}

impl Link {
    /// Wraps `children` in a link, or returns them bare when the href is empty
    /// or there is nothing to wrap.
    pub fn wrap(
        href: impl Into<String>,
        target_blank: bool,
        children: Vec<InlineNode>,
    ) -> Vec<InlineNode> {
        let href = href.into();
        if href.trim().is_empty() || children.is_empty() {
            return children;
        }
        vec![InlineNode::Link(Link {
            href,
            target_blank,
            children,
        })]
    }
}

/// Run-level content living inside a block node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineNode {
    Text(TextRun),
    Link(Link),
}

impl InlineNode {
    /// Concatenated text of this node, ignoring formatting and hrefs.
    pub fn plain_text(&self) -> String {
        match self {
            InlineNode::Text(run) => run.text.clone(),
            InlineNode::Link(link) => inline_text(&link.children),
        }
    }
}

impl From<TextRun> for InlineNode {
    fn from(run: TextRun) -> Self {
        InlineNode::Text(run)
    }
}

/// Concatenated text of a sequence of inline nodes.
pub fn inline_text(nodes: &[InlineNode]) -> String {
    nodes.iter().map(InlineNode::plain_text).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Ordered,
}

impl ListKind {
    /// Lexical `listType` value.
    pub fn list_type(self) -> &'static str {
        match self {
            ListKind::Bullet => "bullet",
            ListKind::Ordered => "number",
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ListKind::Bullet => "ul",
            ListKind::Ordered => "ol",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.list_type())
    }
}

/// A list item; always holds exactly one paragraph, stored as its inline children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub children: Vec<InlineNode>,
}

impl ListItem {
    pub fn new(children: Vec<InlineNode>) -> Self {
        Self { children }
    }
}

/// Structural unit of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockNode {
    Paragraph(Vec<InlineNode>),
    Heading {
        level: u8,
        children: Vec<InlineNode>,
    },
    Quote(Vec<InlineNode>),
    List {
        kind: ListKind,
        items: Vec<ListItem>,
    },
    Upload(MediaId),
}

impl BlockNode {
    pub fn paragraph_text(text: impl Into<String>) -> Self {
        BlockNode::Paragraph(vec![TextRun::plain(text).into()])
    }
}

/// Root of a converted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    pub children: Vec<BlockNode>,
}

impl Root {
    pub fn new(children: Vec<BlockNode>) -> Self {
        Self { children }
    }

    /// A root holding one plain paragraph, used when conversion yields nothing.
    pub fn fallback(text: &str) -> Self {
        let text = text.trim();
        let children = if text.is_empty() {
            Vec::new()
        } else {
            vec![TextRun::plain(text).into()]
        };
        Self::new(vec![BlockNode::Paragraph(children)])
    }

    /// Media ids referenced by upload nodes, in document order.
    pub fn uploads(&self) -> impl Iterator<Item = &str> {
        self.children.iter().filter_map(|b| match b {
            BlockNode::Upload(id) => Some(id.as_str()),
            _ => None,
        })
    }

    /// Plain text of the document: one line per block and per list item.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();

        for block in &self.children {
            match block {
                BlockNode::Paragraph(children)
                | BlockNode::Quote(children)
                | BlockNode::Heading { children, .. } => {
                    out.push_str(&inline_text(children));
                    out.push('\n');
                }
                BlockNode::List { items, .. } => {
                    for item in items {
                        out.push_str(inline_text(&item.children).trim_end());
                        out.push('\n');
                    }
                    out.push('\n');
                }
                BlockNode::Upload(_) => {}
            }
        }

        let out = HORIZONTAL_WS_RE.replace_all(&out, " ");
        BLANK_LINES_RE.replace_all(&out, "\n\n").trim().to_string()
    }
}

// ABOUTME: Inline markup parser turning an element's inline content into typed inline nodes.
// ABOUTME: Handles text runs, bold/italic, links, line breaks, image slots and run merging.

use ego_tree::NodeRef;
use scraper::node::Element;
use scraper::{ElementRef, Node};
use url::Url;

use crate::error::ConvertError;
use crate::image::ImageRequest;
use crate::model::{InlineNode, Link, TextFormat, TextRun};
use crate::text::collapse_horizontal_whitespace;

/// Deepest element nesting the walkers will follow.
pub const MAX_DEPTH: usize = 256;

const BOLD_TAGS: &[&str] = &["strong", "b"];
const ITALIC_TAGS: &[&str] = &["em", "i"];
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Block tags met inside inline content; their edges act as line breaks.
const BOUNDARY_TAGS: &[&str] = &[
    "p",
    "div",
    "section",
    "article",
    "li",
    "ul",
    "ol",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "figure",
    "figcaption",
    "pre",
    "tr",
];

/// One item of the inline stream before it is cut into blocks.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Piece {
    Inline(InlineNode),
    LineBreak(TextFormat),
    /// Position of an image, indexing the request list it was recorded in.
    Image(usize),
}

/// Walks inline content, optionally recording images as positional slots.
pub(crate) struct InlineParser<'a> {
    base_url: Option<&'a Url>,
    images: Option<&'a mut Vec<ImageRequest>>,
}

impl<'a> InlineParser<'a> {
    /// A parser that ignores images.
    pub(crate) fn new(base_url: Option<&'a Url>) -> Self {
        Self {
            base_url,
            images: None,
        }
    }

    /// A parser that appends every image to `images` and leaves a slot in the stream.
    pub(crate) fn with_images(base_url: Option<&'a Url>, images: &'a mut Vec<ImageRequest>) -> Self {
        Self {
            base_url,
            images: Some(images),
        }
    }

    pub(crate) fn pieces(
        &mut self,
        element: ElementRef<'_>,
        format: TextFormat,
        depth: usize,
    ) -> Result<Vec<Piece>, ConvertError> {
        let mut out = Vec::new();
        self.children(*element, format, depth, &mut out)?;
        Ok(out)
    }

    fn children(
        &mut self,
        node: NodeRef<'_, Node>,
        format: TextFormat,
        depth: usize,
        out: &mut Vec<Piece>,
    ) -> Result<(), ConvertError> {
        if depth > MAX_DEPTH {
            return Err(ConvertError::too_deep(MAX_DEPTH));
        }

        for child in node.children() {
            match child.value() {
                Node::Text(text) => push_text(out, text, format),
                Node::Element(el) => self.element(child, el, format, depth + 1, out)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn element(
        &mut self,
        node: NodeRef<'_, Node>,
        el: &Element,
        format: TextFormat,
        depth: usize,
        out: &mut Vec<Piece>,
    ) -> Result<(), ConvertError> {
        let tag = el.name();
        match tag {
            "br" => out.push(Piece::LineBreak(format)),
            "img" => self.image(el, out),
            "a" => self.link(node, el, format, depth, out)?,
            _ if BOLD_TAGS.contains(&tag) => self.children(node, format.with_bold(), depth, out)?,
            _ if ITALIC_TAGS.contains(&tag) => {
                self.children(node, format.with_italic(), depth, out)?
            }
            _ if SKIPPED_TAGS.contains(&tag) => {}
            _ if BOUNDARY_TAGS.contains(&tag) => {
                out.push(Piece::LineBreak(format));
                self.children(node, format, depth, out)?;
                out.push(Piece::LineBreak(format));
            }
            _ => self.children(node, format, depth, out)?,
        }
        Ok(())
    }

    fn image(&mut self, el: &Element, out: &mut Vec<Piece>) {
        if let Some(images) = self.images.as_deref_mut() {
            images.push(ImageRequest::from_element(el, self.base_url, String::new()));
            out.push(Piece::Image(images.len() - 1));
        }
    }

    /// Links keep the surrounding format. Line breaks and image slots inside a
    /// link are hoisted out, splitting the link around them.
    fn link(
        &mut self,
        node: NodeRef<'_, Node>,
        el: &Element,
        format: TextFormat,
        depth: usize,
        out: &mut Vec<Piece>,
    ) -> Result<(), ConvertError> {
        let href = el.attr("href").map(str::trim).unwrap_or_default();
        let target_blank = el
            .attr("target")
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("_blank"));

        let mut inner = Vec::new();
        self.children(node, format, depth, &mut inner)?;

        let mut group = Vec::new();
        for piece in inner {
            match piece {
                Piece::Inline(node) => group.push(node),
                separator => {
                    flush_link(href, target_blank, &mut group, out);
                    out.push(separator);
                }
            }
        }
        flush_link(href, target_blank, &mut group, out);
        Ok(())
    }
}

/// Source newlines act like `<br>`.
fn push_text(out: &mut Vec<Piece>, text: &str, format: TextFormat) {
    let text = collapse_horizontal_whitespace(text);
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push(Piece::LineBreak(format));
        }
        if !line.is_empty() {
            out.push(Piece::Inline(TextRun::new(line, format).into()));
        }
    }
}

fn flush_link(href: &str, target_blank: bool, group: &mut Vec<InlineNode>, out: &mut Vec<Piece>) {
    if group.is_empty() {
        return;
    }
    let children = merge_adjacent_text(std::mem::take(group));
    out.extend(
        Link::wrap(href, target_blank, children)
            .into_iter()
            .map(Piece::Inline),
    );
}

/// Parses the inline content of `element` starting from `format`.
///
/// Line breaks become `\n` inside the text stream and images are ignored;
/// images are block-level and handled by the document builder.
pub fn parse_inline(
    element: ElementRef<'_>,
    format: TextFormat,
) -> Result<Vec<InlineNode>, ConvertError> {
    let pieces = InlineParser::new(None).pieces(element, format, 0)?;
    Ok(finish(join_breaks(pieces, "\n")))
}

/// Flattens a piece stream, rendering line breaks as `separator` and dropping image slots.
pub(crate) fn join_breaks(pieces: Vec<Piece>, separator: &str) -> Vec<InlineNode> {
    pieces
        .into_iter()
        .filter_map(|piece| match piece {
            Piece::Inline(node) => Some(node),
            Piece::LineBreak(format) => Some(TextRun::new(separator, format).into()),
            Piece::Image(_) => None,
        })
        .collect()
}

/// Merges neighbouring text runs that share a format, recursing into links.
pub fn merge_adjacent_text(nodes: Vec<InlineNode>) -> Vec<InlineNode> {
    let mut merged: Vec<InlineNode> = Vec::with_capacity(nodes.len());

    for node in nodes {
        let node = match node {
            InlineNode::Link(mut link) => {
                link.children = merge_adjacent_text(link.children);
                InlineNode::Link(link)
            }
            text => text,
        };

        if let (Some(InlineNode::Text(prev)), InlineNode::Text(run)) = (merged.last_mut(), &node) {
            if prev.format == run.format {
                prev.text.push_str(&run.text);
                continue;
            }
        }
        merged.push(node);
    }

    merged
}

/// Final clean-up of one block's inline content: merge runs, collapse spaces
/// across run boundaries, trim the edges and drop what became empty.
pub(crate) fn finish(nodes: Vec<InlineNode>) -> Vec<InlineNode> {
    let mut nodes = merge_adjacent_text(nodes);
    tidy_whitespace(&mut nodes);
    merge_adjacent_text(prune_empty(nodes))
}

fn text_leaves<'n>(nodes: &'n mut [InlineNode], out: &mut Vec<&'n mut String>) {
    for node in nodes {
        match node {
            InlineNode::Text(run) => out.push(&mut run.text),
            InlineNode::Link(link) => text_leaves(&mut link.children, out),
        }
    }
}

fn tidy_whitespace(nodes: &mut [InlineNode]) {
    let mut leaves = Vec::new();
    text_leaves(nodes, &mut leaves);

    // Last character kept so far, across leaves; None at the start of the block.
    let mut last: Option<char> = None;
    for leaf in leaves.iter_mut() {
        let mut cleaned = String::with_capacity(leaf.len());
        for c in leaf.chars() {
            match c {
                ' ' if matches!(last, None | Some(' ') | Some('\n')) => {}
                '\n' if matches!(last, None | Some('\n')) => {}
                '\n' => {
                    if cleaned.ends_with(' ') {
                        cleaned.pop();
                    }
                    cleaned.push('\n');
                    last = Some('\n');
                }
                _ => {
                    cleaned.push(c);
                    last = Some(c);
                }
            }
        }
        **leaf = cleaned;
    }

    for leaf in leaves.iter_mut().rev() {
        let kept = leaf.trim_end_matches(|c: char| c == ' ' || c == '\n').len();
        leaf.truncate(kept);
        if !leaf.is_empty() {
            break;
        }
    }
}

fn prune_empty(nodes: Vec<InlineNode>) -> Vec<InlineNode> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            InlineNode::Text(run) if run.text.is_empty() => None,
            InlineNode::Link(mut link) => {
                link.children = prune_empty(link.children);
                (!link.children.is_empty()).then_some(InlineNode::Link(link))
            }
            other => Some(other),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scraper::{Html, Selector};

    fn inline_of(html: &str) -> Vec<InlineNode> {
        let doc = Html::parse_fragment(html);
        let sel = Selector::parse("p").unwrap();
        let p = doc.select(&sel).next().unwrap();
        parse_inline(p, TextFormat::PLAIN).unwrap()
    }

    fn text(s: &str, format: TextFormat) -> InlineNode {
        TextRun::new(s, format).into()
    }

    #[test]
    fn test_merge_same_format_runs() {
        let nodes = vec![
            text("A", TextFormat::BOLD),
            text("B", TextFormat::BOLD),
            text("C", TextFormat::PLAIN),
        ];
        assert_eq!(
            merge_adjacent_text(nodes),
            vec![text("AB", TextFormat::BOLD), text("C", TextFormat::PLAIN)]
        );
    }

    #[test]
    fn test_merge_never_joins_differing_flags() {
        let nodes = vec![
            text("A", TextFormat::BOLD),
            text("B", TextFormat::BOLD.with_italic()),
            text("C", TextFormat::ITALIC),
        ];
        assert_eq!(merge_adjacent_text(nodes.clone()), nodes);
    }

    #[test]
    fn test_bold_and_italic_compose() {
        let nodes = inline_of("<p><b>A<i>B</i></b><strong>C</strong></p>");
        assert_eq!(
            nodes,
            vec![
                text("A", TextFormat::BOLD),
                text("B", TextFormat::BOLD.with_italic()),
                text("C", TextFormat::BOLD),
            ]
        );
    }

    #[test]
    fn test_whitespace_is_collapsed_and_trimmed() {
        let nodes = inline_of("<p> &nbsp;Hello \t\t <em>big</em>&nbsp;&nbsp; world  </p>");
        assert_eq!(
            nodes,
            vec![
                text("Hello ", TextFormat::PLAIN),
                text("big", TextFormat::ITALIC),
                text(" world", TextFormat::PLAIN),
            ]
        );
    }

    #[test]
    fn test_space_between_formatted_runs_kept() {
        let nodes = inline_of("<p><b>A</b> <i>B</i></p>");
        assert_eq!(
            nodes,
            vec![
                text("A", TextFormat::BOLD),
                text(" ", TextFormat::PLAIN),
                text("B", TextFormat::ITALIC),
            ]
        );
    }

    #[test]
    fn test_whitespace_only_paragraph_is_empty() {
        assert!(inline_of("<p> &nbsp; \t </p>").is_empty());
    }

    #[test]
    fn test_link_keeps_context_and_target() {
        let nodes = inline_of(r#"<p><b>see <a href=" https://x.test " target="_blank">here</a></b></p>"#);
        assert_eq!(
            nodes,
            vec![
                text("see ", TextFormat::BOLD),
                InlineNode::Link(Link {
                    href: "https://x.test".into(),
                    target_blank: true,
                    children: vec![text("here", TextFormat::BOLD)],
                }),
            ]
        );
    }

    #[test]
    fn test_link_without_href_collapses() {
        assert_eq!(inline_of("<p><a>hello</a></p>"), vec![text("hello", TextFormat::PLAIN)]);
        assert_eq!(
            inline_of(r#"<p><a href="">hello</a></p>"#),
            vec![text("hello", TextFormat::PLAIN)]
        );
    }

    #[test]
    fn test_empty_link_dropped() {
        assert_eq!(
            inline_of(r#"<p>x<a href="https://x.test"> </a></p>"#),
            vec![text("x", TextFormat::PLAIN)]
        );
    }

    #[test]
    fn test_br_becomes_newline() {
        assert_eq!(
            inline_of("<p>one<br>two <br/> three</p>"),
            vec![text("one\ntwo\nthree", TextFormat::PLAIN)]
        );
    }

    #[test]
    fn test_source_newline_acts_like_br() {
        assert_eq!(
            inline_of("<p>one \n  two\r\n<b>three</b></p>"),
            vec![
                text("one\ntwo\n", TextFormat::PLAIN),
                text("three", TextFormat::BOLD),
            ]
        );
    }

    #[test]
    fn test_images_ignored_and_wrappers_transparent() {
        let nodes = inline_of(r#"<p><span class="x">a<img src="i.jpg"><span>b</span></span></p>"#);
        assert_eq!(nodes, vec![text("ab", TextFormat::PLAIN)]);
    }

    #[test]
    fn test_script_content_dropped() {
        let nodes = inline_of("<p>a<script>var x = 1;</script>b</p>");
        assert_eq!(nodes, vec![text("ab", TextFormat::PLAIN)]);
    }

    #[test]
    fn test_image_slots_recorded_in_order() {
        let doc = Html::parse_fragment(
            r#"<p>a<img src="https://x.test/1.jpg"><a href="/p"><img src="https://x.test/2.jpg" alt="two"></a></p>"#,
        );
        let sel = Selector::parse("p").unwrap();
        let p = doc.select(&sel).next().unwrap();

        let mut images = Vec::new();
        let pieces = InlineParser::with_images(None, &mut images)
            .pieces(p, TextFormat::PLAIN, 0)
            .unwrap();

        assert_eq!(
            pieces,
            vec![
                Piece::Inline(text("a", TextFormat::PLAIN)),
                Piece::Image(0),
                Piece::Image(1),
            ]
        );
        assert_eq!(images[0].url.as_deref(), Some("https://x.test/1.jpg"));
        assert_eq!(images[1].alt, "two");
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let html = format!("<p>{}x{}</p>", "<span>".repeat(300), "</span>".repeat(300));
        let doc = Html::parse_fragment(&html);
        let sel = Selector::parse("p").unwrap();
        let p = doc.select(&sel).next().unwrap();
        let err = parse_inline(p, TextFormat::PLAIN).unwrap_err();
        assert!(matches!(err, ConvertError::TooDeep { .. }));
    }
}

// ABOUTME: HTML to document-tree builder: plans blocks and image requests, then assembles the Root.
// ABOUTME: Image materialization runs between the two pure passes through a MediaResolver.

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use url::Url;

use crate::error::ConvertError;
use crate::image::ImageRequest;
use crate::inline::{finish, join_breaks, InlineParser, Piece, MAX_DEPTH};
use crate::model::{BlockNode, InlineNode, ListItem, ListKind, MediaId, Root, TextFormat};
use crate::text::strip_html;

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Turns image requests into media ids in the content store.
///
/// Implementations never fail: a request that cannot be materialized yields
/// `None` and the image is left out of the document.
#[async_trait]
pub trait MediaResolver: Send {
    async fn materialize(&mut self, url: &str, alt: &str, caption: &str) -> Option<MediaId>;
}

/// Resolver that materializes nothing; every image is dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipMedia;

#[async_trait]
impl MediaResolver for SkipMedia {
    async fn materialize(&mut self, _url: &str, _alt: &str, _caption: &str) -> Option<MediaId> {
        None
    }
}

/// Kind of block produced by a paragraph-like element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Paragraph,
    Quote,
}

impl FlowKind {
    fn block(self, children: Vec<InlineNode>) -> BlockNode {
        match self {
            FlowKind::Paragraph => BlockNode::Paragraph(children),
            FlowKind::Quote => BlockNode::Quote(children),
        }
    }
}

/// A block as planned before images are materialized.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PlannedBlock {
    /// Complete already: headings and lists.
    Ready(BlockNode),
    /// A standalone or figure image, by request index.
    Image(usize),
    /// Paragraph or blockquote content, split at line breaks and image slots on assembly.
    Flow { kind: FlowKind, pieces: Vec<Piece> },
}

/// Output of the planning pass: block skeleton plus the images to materialize.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPlan {
    blocks: Vec<PlannedBlock>,
    images: Vec<ImageRequest>,
    fallback_text: String,
}

impl DocumentPlan {
    /// Image requests in document order; index `i` matches `resolved[i]` in [`assemble`](Self::assemble).
    pub fn images(&self) -> &[ImageRequest] {
        &self.images
    }

    /// Materializes every image request, one after another.
    ///
    /// Requests without a usable URL resolve to `None` without reaching the resolver.
    pub async fn resolve<R>(&self, resolver: &mut R) -> Vec<Option<MediaId>>
    where
        R: MediaResolver + ?Sized,
    {
        let mut resolved = Vec::with_capacity(self.images.len());
        for request in &self.images {
            let id = match request.url.as_deref() {
                Some(url) => {
                    resolver
                        .materialize(url, &request.alt, &request.caption)
                        .await
                }
                None => None,
            };
            resolved.push(id);
        }
        resolved
    }

    /// Builds the final tree. Missing entries in `resolved` count as failed images.
    pub fn assemble(&self, resolved: &[Option<MediaId>]) -> Root {
        let mut out = Vec::new();

        for block in &self.blocks {
            match block {
                PlannedBlock::Ready(node) => out.push(node.clone()),
                PlannedBlock::Image(index) => push_upload(&mut out, resolved, *index),
                PlannedBlock::Flow { kind, pieces } => assemble_flow(*kind, pieces, resolved, &mut out),
            }
        }

        if out.is_empty() {
            return Root::fallback(&self.fallback_text);
        }
        Root::new(out)
    }
}

fn push_upload(out: &mut Vec<BlockNode>, resolved: &[Option<MediaId>], index: usize) {
    if let Some(Some(id)) = resolved.get(index) {
        out.push(BlockNode::Upload(id.clone()));
    }
}

fn assemble_flow(
    kind: FlowKind,
    pieces: &[Piece],
    resolved: &[Option<MediaId>],
    out: &mut Vec<BlockNode>,
) {
    let mut segment = Vec::new();

    for piece in pieces {
        match piece {
            Piece::Inline(node) => segment.push(node.clone()),
            Piece::LineBreak(_) => flush_segment(kind, &mut segment, out),
            Piece::Image(index) => {
                flush_segment(kind, &mut segment, out);
                push_upload(out, resolved, *index);
            }
        }
    }
    flush_segment(kind, &mut segment, out);
}

fn flush_segment(kind: FlowKind, segment: &mut Vec<InlineNode>, out: &mut Vec<BlockNode>) {
    let children = finish(std::mem::take(segment));
    if !children.is_empty() {
        out.push(kind.block(children));
    }
}

/// Converts WordPress post HTML into a [`Root`].
#[derive(Debug, Clone, Default)]
pub struct Converter {
    base_url: Option<Url>,
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the URL relative image sources are resolved against (usually the post link).
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, ConvertError> {
        let url = Url::parse(base_url).map_err(|source| ConvertError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        self.base_url = Some(url);
        Ok(self)
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Parses `html` and plans its blocks. Pure; nothing is fetched.
    pub fn plan(&self, html: &str) -> Result<DocumentPlan, ConvertError> {
        let document = Html::parse_fragment(html);
        let mut planner = Planner {
            base_url: self.base_url.as_ref(),
            blocks: Vec::new(),
            images: Vec::new(),
        };
        planner.walk(document.root_element(), 0)?;

        Ok(DocumentPlan {
            blocks: planner.blocks,
            images: planner.images,
            fallback_text: strip_html(html),
        })
    }

    /// Plans, materializes images through `resolver`, and assembles the tree.
    pub async fn build<R>(&self, html: &str, resolver: &mut R) -> Result<Root, ConvertError>
    where
        R: MediaResolver + ?Sized,
    {
        let plan = self.plan(html)?;
        let resolved = plan.resolve(resolver).await;
        Ok(plan.assemble(&resolved))
    }

    /// Converts without materializing any image.
    pub fn convert_without_media(&self, html: &str) -> Result<Root, ConvertError> {
        Ok(self.plan(html)?.assemble(&[]))
    }
}

/// Builds a document with a default [`Converter`].
pub async fn build_document<R>(html: &str, resolver: &mut R) -> Result<Root, ConvertError>
where
    R: MediaResolver + ?Sized,
{
    Converter::new().build(html, resolver).await
}

struct Planner<'a> {
    base_url: Option<&'a Url>,
    blocks: Vec<PlannedBlock>,
    images: Vec<ImageRequest>,
}

impl Planner<'_> {
    fn walk(&mut self, parent: ElementRef<'_>, depth: usize) -> Result<(), ConvertError> {
        if depth > MAX_DEPTH {
            return Err(ConvertError::too_deep(MAX_DEPTH));
        }
        for child in parent.children().filter_map(ElementRef::wrap) {
            self.block(child, depth + 1)?;
        }
        Ok(())
    }

    fn block(&mut self, el: ElementRef<'_>, depth: usize) -> Result<(), ConvertError> {
        let tag = el.value().name();
        match tag {
            "p" => self.flow(el, FlowKind::Paragraph, depth),
            "blockquote" => self.flow(el, FlowKind::Quote, depth),
            "ul" => self.list(el, ListKind::Bullet, depth),
            "ol" => self.list(el, ListKind::Ordered, depth),
            "figure" => {
                self.figure(el);
                Ok(())
            }
            "img" => {
                let index = self.push_image(ImageRequest::from_element(
                    el.value(),
                    self.base_url,
                    String::new(),
                ));
                self.blocks.push(PlannedBlock::Image(index));
                Ok(())
            }
            _ if SKIPPED_TAGS.contains(&tag) => Ok(()),
            _ => match heading_level(tag) {
                Some(level) => self.heading(el, level, depth),
                None => self.walk(el, depth),
            },
        }
    }

    fn flow(&mut self, el: ElementRef<'_>, kind: FlowKind, depth: usize) -> Result<(), ConvertError> {
        let pieces = InlineParser::with_images(self.base_url, &mut self.images).pieces(
            el,
            TextFormat::PLAIN,
            depth,
        )?;
        self.blocks.push(PlannedBlock::Flow { kind, pieces });
        Ok(())
    }

    fn heading(&mut self, el: ElementRef<'_>, level: u8, depth: usize) -> Result<(), ConvertError> {
        let children = self.single_line(el, depth)?;
        if !children.is_empty() {
            self.blocks
                .push(PlannedBlock::Ready(BlockNode::Heading { level, children }));
        }
        Ok(())
    }

    fn list(&mut self, el: ElementRef<'_>, kind: ListKind, depth: usize) -> Result<(), ConvertError> {
        let mut items = Vec::new();
        for li in el
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|c| c.value().name() == "li")
        {
            let children = self.single_line(li, depth + 1)?;
            if !children.is_empty() {
                items.push(ListItem::new(children));
            }
        }

        if !items.is_empty() {
            self.blocks
                .push(PlannedBlock::Ready(BlockNode::List { kind, items }));
        }
        Ok(())
    }

    fn figure(&mut self, el: ElementRef<'_>) {
        let Some(img) = first_descendant(el, "img") else {
            return;
        };
        let caption = first_descendant(el, "figcaption")
            .map(|fc| strip_html(&fc.inner_html()))
            .unwrap_or_default();

        // The caption only travels with the upload as media metadata.
        let index = self.push_image(ImageRequest::from_element(img.value(), self.base_url, caption));
        self.blocks.push(PlannedBlock::Image(index));
    }

    /// Inline content with line breaks folded into spaces; images ignored.
    fn single_line(&self, el: ElementRef<'_>, depth: usize) -> Result<Vec<InlineNode>, ConvertError> {
        let pieces = InlineParser::new(self.base_url).pieces(el, TextFormat::PLAIN, depth)?;
        // Headings and list items hold one line, so `<br>` and source newlines
        // are dropped here and become a single space.
        Ok(finish(join_breaks(pieces, " ")))
    }

    fn push_image(&mut self, request: ImageRequest) -> usize {
        self.images.push(request);
        self.images.len() - 1
    }
}

fn first_descendant<'a>(el: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    el.descendants()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == tag)
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag.as_bytes() {
        [b'h', level @ b'1'..=b'6'] => Some(level - b'0'),
        _ => None,
    }
}

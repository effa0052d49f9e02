// ABOUTME: Image URL extraction for WordPress <img> elements (lazy-load attributes, srcset, placeholders).
// ABOUTME: Also resolves relative URLs and guesses file extensions for downloaded media.

use scraper::node::Element;
use url::Url;

/// Lazy-load attributes in priority order, checked before the plain `src`.
const LAZY_SRC_ATTRS: &[&str] = &[
    "data-src",
    "data-lazy-src",
    "data-original",
    "data-orig-file",
    "data-full-url",
];

/// Responsive-set attributes; the first non-empty one is used.
const SRCSET_ATTRS: &[&str] = &["data-srcset", "data-lazy-srcset", "srcset"];

/// Substrings marking a `src` as a lazy-load placeholder.
const PLACEHOLDER_PATTERNS: &[&str] = &["data:image", "1x1", "pixel", "placeholder"];

const DEFAULT_EXTENSION: &str = "jpg";
const MAX_EXTENSION_LEN: usize = 5;

/// An image found in post markup, waiting to be materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    /// Best download URL, `None` when the element carries no usable source.
    pub url: Option<String>,
    pub alt: String,
    pub caption: String,
}

impl ImageRequest {
    /// Builds a request from an `<img>` element.
    pub fn from_element(img: &Element, base_url: Option<&Url>, caption: String) -> Self {
        let url = best_image_url(img).map(|u| resolve_url(&u, base_url).unwrap_or(u));
        Self {
            url,
            alt: img.attr("alt").unwrap_or_default().trim().to_string(),
            caption,
        }
    }
}

/// Returns the best download URL for an `<img>` element.
pub fn best_image_url(img: &Element) -> Option<String> {
    best_image_url_with(|name| img.attr(name))
}

/// Attribute-lookup form of [`best_image_url`].
pub fn best_image_url_with<'a, F>(attr: F) -> Option<String>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let non_empty = |name: &str| attr(name).map(str::trim).filter(|v| !v.is_empty());

    let srcset = SRCSET_ATTRS.iter().find_map(|&name| non_empty(name));
    if let Some(best) = srcset.and_then(pick_from_srcset) {
        return Some(best);
    }

    let candidates: Vec<&str> = LAZY_SRC_ATTRS
        .iter()
        .chain(std::iter::once(&"src"))
        .filter_map(|&name| non_empty(name))
        .collect();

    let first = *candidates.first()?;
    let src = non_empty("src").unwrap_or_default();
    if is_placeholder_src(src) {
        let real = candidates.iter().find(|u| !u.starts_with("data:"));
        return Some(real.copied().unwrap_or(first).to_string());
    }

    Some(first.to_string())
}

/// Picks the widest candidate of a `srcset` value.
///
/// Entries without a `w` descriptor count as width 0; on ties the earlier
/// entry wins.
pub fn pick_from_srcset(srcset: &str) -> Option<String> {
    let mut best: Option<(&str, f64)> = None;

    for entry in srcset.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let mut parts = entry.split_whitespace();
        let Some(url) = parts.next() else {
            continue;
        };
        let width = parts
            .next()
            .and_then(|d| d.strip_suffix('w'))
            .and_then(|n| n.parse::<f64>().ok())
            .filter(|n| n.is_finite())
            .unwrap_or(0.0);

        match best {
            Some((_, w)) if w >= width => {}
            _ => best = Some((url, width)),
        }
    }

    best.map(|(url, _)| url.to_string())
}

/// True when `src` is empty or looks like a lazy-load placeholder.
pub fn is_placeholder_src(src: &str) -> bool {
    src.is_empty() || PLACEHOLDER_PATTERNS.iter().any(|p| src.contains(p))
}

/// Resolves a possibly relative URL against `base_url`.
///
/// Absolute http(s) and `data:` URLs are returned as-is; relative ones need a base.
pub fn resolve_url(src: &str, base_url: Option<&Url>) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    if src.starts_with("http://") || src.starts_with("https://") || src.starts_with("data:") {
        return Some(src.to_string());
    }

    base_url?.join(src).ok().map(|u| u.to_string())
}

/// Guesses a file extension from the URL path, defaulting to `jpg`.
pub fn guess_extension(url: &str) -> String {
    let path = url.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
    let file = path.rsplit('/').next().unwrap_or_default();

    match file.rsplit_once('.') {
        Some((_, ext))
            if !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn best_of(html: &str) -> Option<String> {
        let doc = Html::parse_fragment(html);
        let sel = Selector::parse("img").unwrap();
        let img = doc.select(&sel).next().unwrap();
        best_image_url(img.value())
    }

    #[test]
    fn test_srcset_largest_width_wins() {
        let html = r#"<img src="small.jpg" srcset="a.jpg 480w, b.jpg 1024w, c.jpg 768w">"#;
        assert_eq!(best_of(html), Some("b.jpg".to_string()));
    }

    #[test]
    fn test_srcset_beats_lazy_attrs() {
        let html = r#"<img data-src="lazy.jpg" data-srcset="x.jpg 300w, y.jpg 900w" src="data:image/gif;base64,AAA">"#;
        assert_eq!(best_of(html), Some("y.jpg".to_string()));
    }

    #[test]
    fn test_srcset_priority_order() {
        let html = r#"<img data-lazy-srcset="lazy.jpg 100w" srcset="plain.jpg 2000w">"#;
        assert_eq!(best_of(html), Some("lazy.jpg".to_string()));
    }

    #[test]
    fn test_placeholder_src_prefers_lazy() {
        let html = r#"<img src="https://x.test/placeholder.png" data-lazy-src="https://x.test/real.jpg">"#;
        assert_eq!(best_of(html), Some("https://x.test/real.jpg".to_string()));
    }

    #[test]
    fn test_plain_src() {
        let html = r#"<img src="https://x.test/photo.png" alt="A photo">"#;
        assert_eq!(best_of(html), Some("https://x.test/photo.png".to_string()));
    }

    #[test]
    fn test_lazy_attr_priority_without_placeholder() {
        let html = r#"<img src="https://x.test/thumb.jpg" data-orig-file="https://x.test/full.jpg">"#;
        assert_eq!(best_of(html), Some("https://x.test/full.jpg".to_string()));
    }

    #[test]
    fn test_data_uri_only() {
        let html = r#"<img src="data:image/gif;base64,R0lGOD">"#;
        assert_eq!(best_of(html), Some("data:image/gif;base64,R0lGOD".to_string()));
    }

    #[test]
    fn test_no_candidates() {
        assert_eq!(best_of(r#"<img alt="nothing">"#), None);
        assert_eq!(best_of(r#"<img src="   ">"#), None);
    }

    #[test]
    fn test_pick_from_srcset_malformed_widths() {
        assert_eq!(pick_from_srcset("a.jpg, b.jpg 2x, c.jpg 10w"), Some("c.jpg".to_string()));
        assert_eq!(pick_from_srcset("a.jpg, b.jpg"), Some("a.jpg".to_string()));
        assert_eq!(pick_from_srcset(" , "), None);
    }

    #[test]
    fn test_is_placeholder_src() {
        assert!(is_placeholder_src(""));
        assert!(is_placeholder_src("data:image/svg+xml,..."));
        assert!(is_placeholder_src("https://x.test/1x1.gif"));
        assert!(is_placeholder_src("https://x.test/pixel.png"));
        assert!(!is_placeholder_src("https://x.test/photo.jpg"));
    }

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://blog.test/2024/01/post/").unwrap();
        assert_eq!(
            resolve_url("/wp-content/a.jpg", Some(&base)),
            Some("https://blog.test/wp-content/a.jpg".to_string())
        );
        assert_eq!(
            resolve_url("//cdn.test/a.jpg", Some(&base)),
            Some("https://cdn.test/a.jpg".to_string())
        );
        assert_eq!(resolve_url("a.jpg", None), None);
        assert_eq!(
            resolve_url("https://x.test/a.jpg", None),
            Some("https://x.test/a.jpg".to_string())
        );
    }

    #[test]
    fn test_guess_extension() {
        assert_eq!(guess_extension("https://x.test/a/photo.PNG"), "png");
        assert_eq!(guess_extension("https://x.test/a/photo.webp?w=300#top"), "webp");
        assert_eq!(guess_extension("https://x.test/a/photo"), "jpg");
        assert_eq!(guess_extension("https://x.test/a/archive.longext"), "jpg");
        assert_eq!(guess_extension("https://x.test/"), "jpg");
    }
}

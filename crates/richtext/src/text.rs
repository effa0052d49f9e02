// ABOUTME: Text helpers for WordPress markup: entity decoding, whitespace normalization, tag stripping.
// ABOUTME: Also provides clamp_text used for SEO titles and descriptions.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Named entities WordPress emits in rendered titles, excerpts and content.
const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
    ("nbsp", " "),
    ("ndash", "–"),
    ("mdash", "—"),
    ("lsquo", "\u{2018}"),
    ("rsquo", "\u{2019}"),
    ("ldquo", "\u{201C}"),
    ("rdquo", "\u{201D}"),
    ("laquo", "«"),
    ("raquo", "»"),
    ("hellip", "…"),
    ("copy", "©"),
    ("reg", "®"),
    ("trade", "™"),
    ("bull", "•"),
    ("middot", "·"),
    ("deg", "°"),
    ("times", "×"),
    ("euro", "€"),
];

/// Longest entity body we try to decode (`#x10FFFF` is the longest numeric one).
const MAX_ENTITY_LEN: usize = 8;

/// Decodes HTML entities in a single left-to-right pass.
///
/// Unknown or malformed entities are kept verbatim, so text that is already
/// decoded passes through unchanged.
pub fn decode_entities(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        result.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];

        let decoded = tail
            .find(';')
            .filter(|&end| end > 0 && end <= MAX_ENTITY_LEN)
            .and_then(|end| decode_entity(&tail[..end]).map(|c| (c, end)));

        match decoded {
            Some((text, end)) => {
                result.push_str(&text);
                rest = &tail[end + 1..];
            }
            None => {
                result.push('&');
                rest = tail;
            }
        }
    }

    result.push_str(rest);
    result
}

/// Decodes one entity body (the part between `&` and `;`).
fn decode_entity(body: &str) -> Option<String> {
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        let c = char::from_u32(code)?;
        // NBSP is folded into a plain space like its named form.
        return Some(if c == '\u{00A0}' { ' '.to_string() } else { c.to_string() });
    }

    NAMED_ENTITIES
        .iter()
        .find(|(name, _)| *name == body)
        .map(|(_, value)| (*value).to_string())
}

/// Decodes entities and collapses every whitespace run (NBSP included) into one ASCII space.
///
/// Leading and trailing whitespace is kept as a single space so that inline
/// fragments can be concatenated without gluing words together.
pub fn normalize_spaces(s: &str) -> String {
    collapse_whitespace(&decode_entities(s))
}

/// Collapses whitespace runs without decoding entities; for text that came out of a parsed DOM.
pub fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut last_was_space = false;

    for c in s.chars() {
        if c.is_whitespace() || c == '\u{00A0}' {
            if !last_was_space {
                result.push(' ');
                last_was_space = true;
            }
        } else {
            result.push(c);
            last_was_space = false;
        }
    }

    result
}

/// Collapses runs of horizontal whitespace (NBSP included) into one space and
/// keeps line feeds. `\r\n` and a lone `\r` become `\n`.
pub fn collapse_horizontal_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut last_was_space = false;
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                result.push('\n');
                last_was_space = false;
            }
            '\n' => {
                result.push('\n');
                last_was_space = false;
            }
            c if c.is_whitespace() || c == '\u{00A0}' => {
                if !last_was_space {
                    result.push(' ');
                    last_was_space = true;
                }
            }
            c => {
                result.push(c);
                last_was_space = false;
            }
        }
    }

    result
}

/// Like [`normalize_spaces`] but trimmed.
pub fn normalize_text(s: &str) -> String {
    normalize_spaces(s).trim().to_string()
}

/// Strips tags (each one becomes a space), decodes entities and collapses whitespace.
pub fn strip_html(html: &str) -> String {
    normalize_text(&TAG_RE.replace_all(html, " "))
}

/// Collapses whitespace and caps the text at `max` characters, ending it with an ellipsis.
pub fn clamp_text(input: &str, max: usize) -> String {
    let text = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.chars().count() <= max {
        return text;
    }

    let cut: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_entities_named() {
        assert_eq!(decode_entities("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(decode_entities("&lt;b&gt;"), "<b>");
        assert_eq!(decode_entities("&quot;hi&quot;"), "\"hi\"");
        assert_eq!(decode_entities("a&nbsp;b"), "a b");
    }

    #[test]
    fn test_decode_entities_numeric() {
        assert_eq!(decode_entities("it&#039;s"), "it's");
        assert_eq!(decode_entities("&#8217;"), "\u{2019}");
        assert_eq!(decode_entities("&#x2026;"), "…");
        assert_eq!(decode_entities("a&#160;b"), "a b");
    }

    #[test]
    fn test_decode_entities_single_pass() {
        // "&amp;lt;" is an escaped "&lt;", not a "<".
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_decode_entities_keeps_unknown() {
        assert_eq!(decode_entities("AT&T"), "AT&T");
        assert_eq!(decode_entities("&bogus;"), "&bogus;");
        assert_eq!(decode_entities("fish & chips; peas"), "fish & chips; peas");
    }

    #[test]
    fn test_decode_idempotent_on_decoded_text() {
        let once = decode_entities("Caf\u{e9} & bar \u{2014} \"quoted\"");
        assert_eq!(decode_entities(&once), once);
    }

    #[test]
    fn test_normalize_spaces_collapses() {
        assert_eq!(normalize_spaces("a \t\t b"), "a b");
        assert_eq!(normalize_spaces("a&nbsp;&nbsp;b"), "a b");
        assert_eq!(normalize_spaces("a\u{00A0}\u{00A0}b"), "a b");
        assert_eq!(normalize_spaces("  a  "), " a ");
    }

    #[test]
    fn test_collapse_whitespace_leaves_entities() {
        assert_eq!(collapse_whitespace("&lt;b&gt; \n\t x"), "&lt;b&gt; x");
    }

    #[test]
    fn test_collapse_horizontal_keeps_newlines() {
        assert_eq!(collapse_horizontal_whitespace("one \t\n  two"), "one \n two");
        assert_eq!(collapse_horizontal_whitespace("a\r\nb\rc"), "a\nb\nc");
        assert_eq!(collapse_horizontal_whitespace("a\u{00A0} b"), "a b");
    }

    #[test]
    fn test_normalize_text_trims() {
        assert_eq!(normalize_text(" &nbsp;\t hello \t&nbsp; "), "hello");
        assert_eq!(normalize_text("\t \u{00A0} "), "");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<p>Hello</p><p>World</p>"), "Hello World");
        assert_eq!(strip_html("<b>Bold</b>&nbsp;text"), "Bold text");
        assert_eq!(strip_html(""), "");
    }

    #[test]
    fn test_clamp_text_short() {
        assert_eq!(clamp_text("  short   text ", 60), "short text");
    }

    #[test]
    fn test_clamp_text_long() {
        let input = "a".repeat(200);
        let out = clamp_text(&input, 160);
        assert_eq!(out.chars().count(), 160);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn test_clamp_text_trims_before_ellipsis() {
        assert_eq!(clamp_text("hello world again", 7), "hello…");
    }
}

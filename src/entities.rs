// src/entities.rs
//
// Entity re-encoder.
//
// Editing surfaces escape angle brackets typed as visible text. When the typed text has the shape
// of a complete tag it was meant as markup, so it is decoded back:
//   &lt;name attrs&gt; ... &lt;/name&gt;   same name, same line, same-name nesting tracked
//   &lt;name /&gt;  or  &lt;name/&gt;
// name: lowercase ASCII letters, optionally followed by digits (h2); attrs: no '/' and no '&'.
// Anything short of that shape (a stray `&lt;b`, an unclosed `&lt;b&gt;`) stays encoded.

use crate::token::{Fragment, Token};
use memchr::memchr;
use std::borrow::Cow;
use tracing::{debug, trace};

const LT: &str = "&lt;";
const GT: &str = "&gt;";

enum Shape<'a> {
    Open { name: &'a str, end: usize },
    SelfClosing { end: usize },
}

/// Decode literally typed tags in every text run and re-tokenize what was decoded.
pub fn decode_literal_tags(fragment: Fragment) -> Fragment {
    let mut out = Fragment::default();
    let mut decoded_runs = 0usize;
    for token in fragment.into_tokens() {
        match token {
            Token::Text(text) => match decode_text(&text) {
                Cow::Borrowed(_) => out.push_text(&text),
                Cow::Owned(decoded) => {
                    decoded_runs += 1;
                    trace!(before = %text, after = %decoded, "decoded literal tags");
                    for token in Fragment::parse(&decoded).into_tokens() {
                        out.push(token);
                    }
                }
            },
            tag => out.push(tag),
        }
    }
    if decoded_runs > 0 {
        debug!(decoded_runs, "restored literally typed markup");
    }
    out
}

pub(crate) fn decode_text(text: &str) -> Cow<'_, str> {
    let mut out = String::new();
    let mut copied = 0usize;
    let mut from = 0usize;
    while let Some(off) = text[from..].find(LT) {
        let at = from + off;
        match literal_tag_end(text, at) {
            Some(end) => {
                out.push_str(&text[copied..at]);
                out.push_str(&text[at..end].replace(LT, "<").replace(GT, ">"));
                copied = end;
                from = end;
            }
            None => from = at + LT.len(),
        }
    }
    if copied == 0 {
        return Cow::Borrowed(text);
    }
    out.push_str(&text[copied..]);
    Cow::Owned(out)
}

/// End (exclusive) of a complete encoded tag or tag pair starting at `at`.
fn literal_tag_end(text: &str, at: usize) -> Option<usize> {
    match encoded_open(text, at)? {
        Shape::SelfClosing { end } => Some(end),
        Shape::Open { name, end } => encoded_close(text, end, name),
    }
}

fn encoded_open(text: &str, at: usize) -> Option<Shape<'_>> {
    let s = text.as_bytes();
    let mut i = at + LT.len();
    let name_start = i;
    while i < s.len() && s[i].is_ascii_lowercase() {
        i += 1;
    }
    if i == name_start {
        return None;
    }
    while i < s.len() && s[i].is_ascii_digit() {
        i += 1;
    }
    let name = &text[name_start..i];

    let mut j = i;
    if s.get(j) == Some(&b' ') {
        j += 1;
    }
    if text[j..].starts_with("/&gt;") {
        return Some(Shape::SelfClosing { end: j + 5 });
    }

    // attributes need a separating space; `&lt;bx` is not `b` with junk
    if !text[i..].starts_with(GT) && !s.get(i).is_some_and(|b| b.is_ascii_whitespace()) {
        return None;
    }
    let mut k = i;
    while k < s.len() && s[k] != b'/' && s[k] != b'&' {
        k += 1;
    }
    if !text[k..].starts_with(GT) {
        return None;
    }
    Some(Shape::Open {
        name,
        end: k + GT.len(),
    })
}

fn encoded_close(text: &str, from: usize, name: &str) -> Option<usize> {
    let close = format!("&lt;/{name}&gt;");
    let line_end = memchr(b'\n', &text.as_bytes()[from..]).map_or(text.len(), |p| from + p);
    let line = &text[..line_end];

    let mut depth = 0usize;
    let mut i = from;
    while let Some(off) = line[i..].find(LT) {
        let at = i + off;
        if line[at..].starts_with(&close) {
            if depth == 0 {
                return Some(at + close.len());
            }
            depth -= 1;
            i = at + close.len();
            continue;
        }
        match encoded_open(line, at) {
            Some(Shape::Open { name: inner, end }) => {
                if inner == name {
                    depth += 1;
                }
                i = end;
            }
            Some(Shape::SelfClosing { end }) => i = end,
            None => i = at + LT.len(),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("&lt;b&gt;bold&lt;/b&gt;", "<b>bold</b>")]
    #[case("see &lt;a href=\"x\"&gt;here&lt;/a&gt; now", "see <a href=\"x\">here</a> now")]
    #[case("&lt;h2&gt;Title&lt;/h2&gt;", "<h2>Title</h2>")]
    #[case("&lt;hr /&gt; and &lt;br/&gt;", "<hr /> and <br/>")]
    #[case("&lt;b&gt;&lt;b&gt;x&lt;/b&gt;&lt;/b&gt;", "<b><b>x</b></b>")]
    #[case("&lt;i&gt;a 1 &lt; 2&lt;/i&gt;", "<i>a 1 < 2</i>")]
    fn decodes_complete_shapes(#[case] src: &str, #[case] expected: &str) {
        assert_eq!(decode_text(src), expected);
    }

    #[rstest]
    #[case("type &lt;b to start")]
    #[case("&lt;b&gt; with no close")]
    #[case("&lt;b&gt;mismatch&lt;/i&gt;")]
    #[case("&lt;B&gt;upper&lt;/B&gt;")]
    #[case("&lt;bx&gt;")]
    #[case("&lt;b&gt;split\nacross lines&lt;/b&gt;")]
    #[case("&lt;a href=&quot;x&quot;&gt;q&lt;/a&gt;")]
    #[case("if a &lt; b &amp;&amp; c &gt; d")]
    fn leaves_ambiguous_text_encoded(#[case] src: &str) {
        assert!(matches!(decode_text(src), Cow::Borrowed(_)), "{src} was decoded");
    }

    #[test]
    fn decoded_markup_becomes_tags() {
        let fragment = decode_literal_tags(Fragment::parse("<p>x &lt;em&gt;y&lt;/em&gt;</p>"));
        let tags: Vec<_> = fragment
            .tokens()
            .iter()
            .filter_map(|t| t.as_tag())
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(tags, vec!["p", "em", "em", "p"]);
        assert_eq!(fragment.render(), "<p>x <em>y</em></p>");
    }

    #[test]
    fn attributes_are_not_touched() {
        let src = "<a title=\"&lt;b&gt;x&lt;/b&gt;\">t</a>";
        assert_eq!(decode_literal_tags(Fragment::parse(src)).render(), src);
    }
}

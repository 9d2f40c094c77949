// src/format.rs
//
// Indenting formatter.
//
// - Every tag starts a new line indented one tab per nesting level. Opening tags indent what
//   follows; closing tags dedent before they are placed; void and self-closing tags leave the
//   depth alone.
// - Text runs are kept as they are, minus layout whitespace (see token.rs); a layout-only run
//   disappears. That makes formatting idempotent.
// - A single word (no whitespace) sitting between a tag and a closing tag stays on the tag's
//   line: `<b>word</b>`, never split over three lines.
// - Unbalanced input is formatted anyway. Depth may dip below zero (indents as zero) or end
//   non-zero; both are logged, never fatal.
// - compact: the opposite direction, removing the line breaks and indentation inserted here.

use crate::token::{trim_layout, Fragment, Token};
use tracing::{debug, warn};

fn layout_prefix(depth: isize) -> String {
    let mut prefix = String::with_capacity(1 + depth.max(0) as usize);
    prefix.push('\n');
    for _ in 0..depth.max(0) {
        prefix.push('\t');
    }
    prefix
}

#[inline]
fn is_single_word(text: &str) -> bool {
    !text.is_empty() && !text.chars().any(char::is_whitespace)
}

pub fn indent(fragment: Fragment) -> Fragment {
    let mut out = Fragment::default();
    let mut depth: isize = 0;
    let mut min_depth: isize = 0;
    let mut after_tag = false;
    let mut leaf_word = false;

    for token in fragment.into_tokens() {
        match token {
            Token::Text(text) => {
                let text = trim_layout(&text);
                if text.is_empty() {
                    continue;
                }
                leaf_word = after_tag && is_single_word(text);
                after_tag = false;
                out.push_text(text);
            }
            Token::Tag(tag) => {
                if tag.is_end() {
                    depth -= 1;
                    min_depth = min_depth.min(depth);
                }
                if !(tag.is_end() && leaf_word) {
                    out.push_text(&layout_prefix(depth));
                }
                if tag.opens_element() {
                    depth += 1;
                }
                out.push_tag(tag);
                after_tag = true;
                leaf_word = false;
            }
        }
    }

    if depth != 0 || min_depth < 0 {
        warn!(final_depth = depth, min_depth, "unbalanced tags; indentation is best-effort");
    }
    out.trim_edges();
    debug!(tokens = out.len(), "indented markup");
    out
}

/// Remove every line break plus the tabs after it from text runs.
pub fn compact(fragment: Fragment) -> Fragment {
    let tokens = fragment
        .into_tokens()
        .into_iter()
        .map(|token| match token {
            Token::Text(text) => Token::Text(strip_indentation(&text)),
            tag => tag,
        })
        .collect();
    Fragment::from_tokens(tokens)
}

fn strip_indentation(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\n' {
            while chars.next_if_eq(&'\t').is_some() {}
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn fmt(src: &str) -> String {
        indent(Fragment::parse(src)).render()
    }

    #[test]
    fn indents_by_nesting_depth() {
        assert_eq!(
            fmt("<div><p>A</p><p>B</p></div>"),
            "<div>\n\t<p>A</p>\n\t<p>B</p>\n</div>"
        );
    }

    #[test]
    fn multi_word_text_keeps_close_on_its_own_line() {
        assert_eq!(fmt("<p>hello world</p>"), "<p>hello world\n</p>");
    }

    #[test]
    fn inline_tags_get_their_own_lines() {
        assert_eq!(
            fmt("<p>Hello <b>big</b> world</p>"),
            "<p>Hello \n\t<b>big</b> world\n</p>"
        );
    }

    #[test]
    fn void_and_self_closing_keep_depth() {
        assert_eq!(
            fmt("<ul><li>a<br>b</li><li><img src=x /></li></ul>"),
            "<ul>\n\t<li>a\n\t\t<br>b</li>\n\t<li>\n\t\t<img src=x />\n\t</li>\n</ul>"
        );
    }

    #[rstest]
    #[case("<div><p>A</p><p>B</p></div>")]
    #[case("<p>Hello <b>big</b> world</p>")]
    #[case("<ul><li>one two</li><li><a href=x>link</a> tail</li></ul>")]
    #[case("<p>a <i>b</i> <i>c</i></p>")]
    fn formatting_is_idempotent(#[case] src: &str) {
        let once = fmt(src);
        assert_eq!(fmt(&once), once);
    }

    #[test]
    fn absorbs_existing_indentation() {
        assert_eq!(
            fmt("<div>\n    <p>A</p>\n\n    <p>\n      two words\n    </p>\n</div>\n"),
            "<div>\n\t<p>A</p>\n\t<p>two words\n\t</p>\n</div>"
        );
    }

    #[test]
    fn unbalanced_input_never_fails() {
        assert_eq!(fmt("</p></div><p>x"), "</p>\n</div>\n<p>x");
    }

    #[test]
    fn compacts_layout() {
        let formatted = indent(Fragment::parse("<div><p>A</p><p>two words</p></div>"));
        assert_eq!(
            compact(formatted).render(),
            "<div><p>A</p><p>two words</p></div>"
        );
    }
}

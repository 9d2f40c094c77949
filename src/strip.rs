// src/strip.rs
//
// Empty-tag stripper. An element whose content is nothing but whitespace is removed together
// with the layout whitespace in front of it. Removing one can empty its parent, so passes repeat
// until one removes nothing. Void/self-closing tags and names in `keep` are never touched.

use crate::token::{Fragment, Token};
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Marks `open ... close` spans that hold at most one whitespace-only text run.
fn mark_empty(tokens: &[Token], keep: &BTreeSet<String>) -> Vec<bool> {
    let mut removed = vec![false; tokens.len()];
    let mut idx = 0usize;
    while idx < tokens.len() {
        let Some(open) = tokens[idx].as_tag() else {
            idx += 1;
            continue;
        };
        if !open.opens_element() || keep.contains(open.name()) {
            idx += 1;
            continue;
        }
        let mut close = idx + 1;
        if tokens.get(close).is_some_and(Token::is_blank_text) {
            close += 1;
        }
        let closes_open = tokens
            .get(close)
            .and_then(Token::as_tag)
            .is_some_and(|t| t.is_end() && t.name() == open.name());
        if closes_open {
            removed[idx..=close].iter_mut().for_each(|r| *r = true);
            idx = close + 1;
        } else {
            idx += 1;
        }
    }
    removed
}

/// One pass. Returns the rebuilt fragment and the number of elements removed.
fn strip_pass(tokens: Vec<Token>, keep: &BTreeSet<String>) -> (Vec<Token>, usize) {
    let removed = mark_empty(&tokens, keep);
    let mut out = Fragment::default();
    let mut count = 0usize;
    let mut in_removed = false;
    for (token, gone) in tokens.into_iter().zip(removed) {
        if gone {
            if !in_removed {
                out.trim_trailing_layout();
                count += 1;
            }
            in_removed = true;
            continue;
        }
        in_removed = false;
        out.push(token);
    }
    (out.into_tokens(), count)
}

pub fn strip_empty(fragment: Fragment, keep: &BTreeSet<String>) -> Fragment {
    let mut tokens = fragment.into_tokens();
    let cap = tokens.len() + 1;
    let mut total = 0usize;
    let mut passes = 0usize;
    while passes < cap {
        passes += 1;
        let (next, removed) = strip_pass(tokens, keep);
        tokens = next;
        if removed == 0 {
            break;
        }
        trace!(pass = passes, removed, "stripped empty elements");
        total += removed;
    }

    let mut out = Fragment::from_tokens(tokens);
    out.trim_edges();
    debug!(removed = total, passes, "empty-tag stripper reached a fixed point");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn strip(src: &str) -> String {
        let keep: BTreeSet<String> = ["img".to_string()].into();
        strip_empty(Fragment::parse(src), &keep).render()
    }

    #[rstest]
    #[case("<p><span></span></p><p><img src=\"a.png\"></p>", "<p><img src=\"a.png\"></p>")]
    #[case("<p>a</p><b> </b>", "<p>a</p>")]
    #[case("<div><p><i>\n</i></p></div>x", "x")]
    #[case("<p>a</p>\n<p>\n</p>\n<p>b</p>", "<p>a</p>\n<p>b</p>")]
    #[case("<td></td><td>x</td>", "<td>x</td>")]
    fn removes_empty_elements(#[case] src: &str, #[case] expected: &str) {
        assert_eq!(strip(src), expected);
    }

    #[rstest]
    #[case("<p>x</p>")]
    #[case("<p><br></p>")]
    #[case("<p><hr /></p>")]
    #[case("<b></i>")]
    #[case("<a name=top>&nbsp;</a>")]
    fn keeps_elements_with_content(#[case] src: &str) {
        assert_eq!(strip(src), src);
    }

    #[test]
    fn keep_list_is_honoured() {
        let keep: BTreeSet<String> = ["td".to_string()].into();
        let out = strip_empty(Fragment::parse("<tr><td></td></tr>"), &keep);
        assert_eq!(out.render(), "<tr><td></td></tr>");
    }

    #[test]
    fn strips_indented_nesting_to_fixed_point() {
        let src = "<div>\n\t<p>\n\t\t<b>\n\t\t</b>\n\t</p>\n</div>\n<p>kept</p>";
        assert_eq!(strip(src), "<p>kept</p>");
    }
}

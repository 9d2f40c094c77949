// src/scrub.rs
//
// Cleanup that runs just before indentation:
// - `&nbsp;` squeezed between two non-space characters is an editor artifact; make it a space.
// - attributes in `strip_attributes` are dropped from every tag;
// - tags in `unwrap_tags` are dropped, their content kept in place;
// - text that runs on directly after `</p>` starts a new paragraph.

use crate::options::NormalizeOptions;
use crate::token::{inline_run_end, Fragment, TagToken, Token};
use tracing::debug;

const NBSP: &str = "&nbsp;";

pub fn scrub(fragment: Fragment, options: &NormalizeOptions) -> Fragment {
    let mut kept = Fragment::default();
    let mut dropped = 0usize;
    let mut stripped = 0usize;

    // dropping tags can leave text runs side by side; push_text merges them
    for token in fragment.into_tokens() {
        match token {
            Token::Text(text) => kept.push_text(&text),
            Token::Tag(tag) if options.unwrap_tags.contains(tag.name()) => dropped += 1,
            Token::Tag(mut tag) => {
                if tag.strip_attributes(&options.strip_attributes) {
                    stripped += 1;
                }
                kept.push_tag(tag);
            }
        }
    }
    let tokens = kept
        .into_tokens()
        .into_iter()
        .map(|token| match token {
            Token::Text(text) => Token::Text(collapse_nbsp(&text)),
            tag => tag,
        })
        .collect();
    let (tokens, continued) = continue_paragraphs(tokens);

    debug!(dropped, stripped, continued, "scrubbed tags");
    Fragment::from_tokens(tokens)
}

fn collapse_nbsp(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(at) = rest.find(NBSP) {
        out.push_str(&rest[..at]);
        let after = &rest[at + NBSP.len()..];
        let prev_solid = out.chars().last().is_some_and(|c| !c.is_whitespace());
        let next_solid = after.chars().next().is_some_and(|c| !c.is_whitespace());
        out.push_str(if prev_solid && next_solid { " " } else { NBSP });
        rest = after;
    }
    out.push_str(rest);
    out
}

fn starts_with_word(text: &str) -> bool {
    text.chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Wrap inline runs that start right after a `</p>` in their own paragraph.
fn continue_paragraphs(tokens: Vec<Token>) -> (Vec<Token>, usize) {
    let mut wraps: Vec<(usize, usize)> = Vec::new();
    let mut idx = 0usize;
    while idx + 1 < tokens.len() {
        let closes_p = tokens[idx]
            .as_tag()
            .is_some_and(|t| t.is_end() && t.name() == "p");
        if closes_p && tokens[idx + 1].as_text().is_some_and(starts_with_word) {
            let end = inline_run_end(&tokens, idx + 1);
            wraps.push((idx + 1, end));
            idx = end;
            continue;
        }
        idx += 1;
    }
    if wraps.is_empty() {
        return (tokens, 0);
    }

    let count = wraps.len();
    let mut out = Vec::with_capacity(tokens.len() + 2 * count);
    let mut pending = wraps.into_iter().peekable();
    let mut open_until: Option<usize> = None;
    let len = tokens.len();
    for (idx, token) in tokens.into_iter().enumerate() {
        if open_until == Some(idx) {
            out.push(Token::Tag(TagToken::close("p")));
            open_until = None;
        }
        if let Some(&(start, end)) = pending.peek() {
            if start == idx {
                out.push(Token::Tag(TagToken::open("p")));
                open_until = Some(end);
                pending.next();
            }
        }
        out.push(token);
    }
    if open_until == Some(len) {
        out.push(Token::Tag(TagToken::close("p")));
    }
    (out, count)
}

// src/unwrap.rs
//
// Structural unwrap. Paragraph wrappers the canonical form does not allow are removed, open and
// matching close together:
// - the first-child paragraph of an `li`; the last-child one too, unless a text run sits right
//   before it (unwrapping would glue two runs together);
// - a paragraph whose sole content is a preserved code block;
// - a paragraph whose sole content is an image, or a link around an image.
// Only bare `<p>` is touched: `<p class=info>` carries meaning. Whitespace-only text between
// siblings is ignored when deciding "first", "last" and "sole".

use crate::options::NormalizeOptions;
use crate::token::{pair_map, Fragment, TagToken, Token};
use tracing::debug;

struct Unwrapper<'a> {
    tokens: &'a [Token],
    pairs: Vec<Option<usize>>,
    removed: Vec<bool>,
    options: &'a NormalizeOptions,
}

impl<'a> Unwrapper<'a> {
    fn new(tokens: &'a [Token], options: &'a NormalizeOptions) -> Self {
        Self {
            tokens,
            pairs: pair_map(tokens),
            removed: vec![false; tokens.len()],
            options,
        }
    }

    fn tag(&self, idx: usize) -> Option<&'a TagToken> {
        self.tokens.get(idx).and_then(Token::as_tag)
    }

    fn is_live(&self, idx: usize) -> bool {
        !self.removed[idx] && !self.tokens[idx].is_blank_text()
    }

    fn next_significant(&self, from: usize) -> Option<usize> {
        (from..self.tokens.len()).find(|&i| self.is_live(i))
    }

    fn prev_significant(&self, before: usize) -> Option<usize> {
        (0..before).rev().find(|&i| self.is_live(i))
    }

    /// Closing index of the element opened at `idx`, if it opens a bare paragraph.
    fn bare_paragraph(&self, idx: usize) -> Option<usize> {
        let tag = self.tag(idx)?;
        if tag.is_end() || tag.name() != "p" || !tag.is_bare(&self.options.strip_attributes) {
            return None;
        }
        self.pairs[idx].filter(|&close| close > idx)
    }

    /// The element opened at `idx` is the only significant content up to `close`.
    fn is_sole_child(&self, idx: usize, open: usize, close: usize) -> bool {
        let end = match self.tag(idx) {
            Some(tag) if tag.opens_element() => match self.pairs[idx] {
                Some(end) => end,
                None => return false,
            },
            Some(_) => idx,
            None => return false,
        };
        self.next_significant(open + 1) == Some(idx) && self.next_significant(end + 1) == Some(close)
    }

    fn unwrap_pair(&mut self, open: usize, close: usize) {
        self.removed[open] = true;
        self.removed[close] = true;
    }

    fn list_items(&mut self) {
        for li in 0..self.tokens.len() {
            let Some(tag) = self.tag(li) else { continue };
            if tag.is_end() || tag.name() != "li" {
                continue;
            }
            let Some(li_close) = self.pairs[li].filter(|&c| c > li) else {
                continue;
            };

            if let Some(first) = self.next_significant(li + 1).filter(|&i| i < li_close) {
                if let Some(p_close) = self.bare_paragraph(first) {
                    self.unwrap_pair(first, p_close);
                }
            }

            let Some(last) = self.prev_significant(li_close).filter(|&i| i > li) else {
                continue;
            };
            let Some(p_open) = self.pairs[last].filter(|&o| o > li && o < last) else {
                continue;
            };
            if self.bare_paragraph(p_open) != Some(last) {
                continue;
            }
            let glued = self
                .prev_significant(p_open)
                .is_some_and(|i| self.tokens[i].as_text().is_some());
            if !glued {
                self.unwrap_pair(p_open, last);
            }
        }
    }

    fn wrapped_blocks(&mut self) {
        for open in 0..self.tokens.len() {
            if self.removed[open] {
                continue;
            }
            let Some(close) = self.bare_paragraph(open) else {
                continue;
            };
            let Some(child) = self.next_significant(open + 1) else {
                continue;
            };
            if self.is_sole_child(child, open, close) && self.is_block_content(child) {
                self.unwrap_pair(open, close);
            }
        }
    }

    /// Preserved code, an image, or a link whose sole content is an image.
    fn is_block_content(&self, idx: usize) -> bool {
        let Some(tag) = self.tag(idx) else {
            return false;
        };
        if tag.is_end() {
            return false;
        }
        if self.options.is_preserved(tag) || tag.name() == "img" {
            return true;
        }
        if tag.name() != "a" {
            return false;
        }
        let Some(a_close) = self.pairs[idx] else {
            return false;
        };
        self.next_significant(idx + 1).is_some_and(|inner| {
            self.tag(inner).is_some_and(|t| !t.is_end() && t.name() == "img")
                && self.is_sole_child(inner, idx, a_close)
        })
    }

    fn finish(self) -> (Vec<Token>, usize) {
        let count = self.removed.iter().filter(|&&r| r).count() / 2;
        let kept = self
            .tokens
            .iter()
            .zip(&self.removed)
            .filter(|(_, removed)| !**removed)
            .map(|(t, _)| t.clone())
            .collect();
        (kept, count)
    }
}

pub fn unwrap_structure(fragment: Fragment, options: &NormalizeOptions) -> Fragment {
    let tokens = fragment.into_tokens();
    let mut unwrapper = Unwrapper::new(&tokens, options);
    unwrapper.list_items();
    unwrapper.wrapped_blocks();
    let (kept, unwrapped) = unwrapper.finish();
    debug!(unwrapped, "removed misplaced paragraph wrappers");
    Fragment::from_tokens(kept)
}

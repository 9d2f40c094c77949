// src/vault.rs
//
// Code-block vault.
//
// - extract: preserved elements (default `code.block`) have their inner markup lifted out
//   before any other stage runs and replaced by a single '.' placeholder. The captured text never
//   re-enters the pipeline, so its whitespace is untouched.
// - restore: the last step. Each record goes back, in extraction order, at the next opening tag
//   marked as vaulted during extraction that is still followed by the placeholder. The mark rides
//   on the tag itself, so later attribute stripping or renaming cannot hide a block. Surplus
//   records or placeholders are left alone and reported; nothing fails.
// - escape_for_editing: the load direction. '<' inside preserved elements becomes '&lt;' so an
//   editing surface displays markup-looking code literally.

use crate::options::{LineEnding, NormalizeOptions};
use crate::pipeline::CodeBlockSink;
use crate::token::{pair_map, trim_layout, Fragment, Token};
use tracing::{debug, warn};

pub const PLACEHOLDER: &str = ".";

/// The verbatim inner content of one preserved element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeBlockRecord {
    /// Position in encounter order.
    pub index: usize,
    /// Exact inner markup at extraction time.
    pub raw_content: String,
}

impl CodeBlockRecord {
    /// Content as written back: `<br>` tags become line breaks, then line endings are applied.
    pub fn restored(&self, ending: LineEnding) -> String {
        ending.apply(&breaks_to_newlines(&self.raw_content))
    }
}

fn breaks_to_newlines(content: &str) -> String {
    if !content.contains('<') {
        return content.to_string();
    }
    let mut out = String::with_capacity(content.len());
    for token in Fragment::parse(content).into_tokens() {
        match token {
            Token::Tag(tag) if tag.name() == "br" && !tag.is_end() => out.push('\n'),
            other => other.write_to(&mut out),
        }
    }
    out
}

/// Index of the closing tag when `tokens[idx]` opens a preserved element that is closed.
fn preserved_close(
    tokens: &[Token],
    pairs: &[Option<usize>],
    idx: usize,
    options: &NormalizeOptions,
) -> Option<usize> {
    match &tokens[idx] {
        Token::Tag(tag) if options.is_preserved(tag) => pairs[idx].filter(|&close| close > idx),
        _ => None,
    }
}

pub fn extract(fragment: Fragment, options: &NormalizeOptions) -> (Fragment, Vec<CodeBlockRecord>) {
    let tokens = fragment.into_tokens();
    let pairs = pair_map(&tokens);
    let closes: Vec<_> = (0..tokens.len())
        .map(|idx| preserved_close(&tokens, &pairs, idx, options))
        .collect();

    let mut out = Fragment::default();
    let mut records = Vec::new();
    let mut iter = tokens.into_iter().enumerate();
    while let Some((idx, mut token)) = iter.next() {
        let Some(close) = closes[idx] else {
            out.push(token);
            continue;
        };
        if let Token::Tag(tag) = &mut token {
            tag.mark_vaulted();
        }
        out.push(token);

        let mut raw_content = String::new();
        for (_, inner) in iter.by_ref().take(close - idx - 1) {
            inner.write_to(&mut raw_content);
        }
        records.push(CodeBlockRecord {
            index: records.len(),
            raw_content,
        });
        out.push_text(PLACEHOLDER);
        // the closing tag is pushed by the next iteration
    }

    debug!(code_blocks = records.len(), "vaulted preserved content");
    (out, records)
}

pub fn restore<S>(
    fragment: Fragment,
    records: &[CodeBlockRecord],
    options: &NormalizeOptions,
    sink: &mut S,
) -> String
where
    S: CodeBlockSink + ?Sized,
{
    let mut out = String::new();
    let mut next = 0usize;
    let mut orphaned = 0usize;
    let mut after_vaulted = false;

    for token in fragment.tokens() {
        match token {
            Token::Tag(tag) => {
                tag.write_to(&mut out);
                after_vaulted = tag.is_vaulted();
            }
            Token::Text(text) => {
                if after_vaulted && trim_layout(text) == PLACEHOLDER {
                    if let Some(record) = records.get(next) {
                        let content = record.restored(options.code_line_ending);
                        sink.write_back(record.index, &content);
                        out.push_str(&content);
                        next += 1;
                        after_vaulted = false;
                        continue;
                    }
                    orphaned += 1;
                }
                out.push_str(text);
                after_vaulted = false;
            }
        }
    }

    if next != records.len() || orphaned > 0 {
        warn!(
            captured = records.len(),
            restored = next,
            orphaned_placeholders = orphaned,
            "code block placeholders did not line up with vaulted records"
        );
    }
    out
}

pub fn escape_for_editing(markup: &str, options: &NormalizeOptions) -> String {
    let tokens = Fragment::parse(markup).into_tokens();
    let pairs = pair_map(&tokens);

    let mut out = String::with_capacity(markup.len());
    let mut idx = 0usize;
    while idx < tokens.len() {
        tokens[idx].write_to(&mut out);
        if let Some(close) = preserved_close(&tokens, &pairs, idx, options) {
            let mut inner = String::new();
            for token in &tokens[idx + 1..close] {
                token.write_to(&mut inner);
            }
            out.push_str(&inner.replace('<', "&lt;"));
            idx = close;
            continue;
        }
        idx += 1;
    }
    out
}

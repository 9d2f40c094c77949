// src/pipeline.rs
//
// Stage driver. One call runs every stage in a fixed order over a single Fragment:
//   vault extract -> entity decode -> quirk fixup -> structural unwrap -> scrub -> indent
//   -> strip empty (re-indent if anything went) -> compact (optional) -> vault restore
// Each stage is a pure Fragment -> Fragment transform; nothing survives between calls.

use crate::entities::decode_literal_tags;
use crate::format::{compact, indent};
use crate::options::NormalizeOptions;
use crate::quirks::fix_browser_quirks;
use crate::scrub::scrub;
use crate::strip::strip_empty;
use crate::token::Fragment;
use crate::unwrap::unwrap_structure;
use crate::vault::{self, CodeBlockRecord};
use tracing::{debug, debug_span};

/// Receives each code block's final content as it is restored, e.g. to refresh a syntax
/// highlighter or a host-side form field.
pub trait CodeBlockSink {
    fn write_back(&mut self, index: usize, content: &str);
}

impl<F> CodeBlockSink for F
where
    F: FnMut(usize, &str),
{
    fn write_back(&mut self, index: usize, content: &str) {
        self(index, content)
    }
}

struct Discard;

impl CodeBlockSink for Discard {
    fn write_back(&mut self, _index: usize, _content: &str) {}
}

/// Result of one pipeline run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Normalized {
    /// Canonical markup.
    pub markup: String,
    /// The vaulted code blocks, in encounter order.
    pub code_blocks: Vec<CodeBlockRecord>,
}

#[derive(Clone, Debug, Default)]
pub struct Normalizer {
    options: NormalizeOptions,
}

impl Normalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }

    pub fn normalize(&self, raw: &str) -> Normalized {
        self.normalize_with_sink(raw, &mut Discard)
    }

    pub fn normalize_with_sink<S>(&self, raw: &str, sink: &mut S) -> Normalized
    where
        S: CodeBlockSink + ?Sized,
    {
        let span = debug_span!("normalize", input_len = raw.len());
        let _guard = span.enter();
        let options = &self.options;

        let (fragment, code_blocks) = vault::extract(Fragment::parse(raw), options);
        let fragment = decode_literal_tags(fragment);
        let fragment = fix_browser_quirks(fragment, options.apply_div_to_paragraph_fixup);
        let fragment = unwrap_structure(fragment, options);
        let fragment = indent(scrub(fragment, options));
        let before_strip = fragment.len();
        let mut fragment = strip_empty(fragment, &options.keep_empty);
        if fragment.len() != before_strip {
            // a removed element can leave a single-word leaf that indent would keep compact
            fragment = indent(fragment);
        }
        if options.compact {
            fragment = compact(fragment);
        }
        let markup = vault::restore(fragment, &code_blocks, options, sink);

        debug!(output_len = markup.len(), code_blocks = code_blocks.len(), "normalized markup");
        Normalized {
            markup,
            code_blocks,
        }
    }

    /// The load direction: escape markup inside preserved elements so an editing surface shows
    /// it as text.
    pub fn prepare_for_editing(&self, markup: &str) -> String {
        vault::escape_for_editing(markup, &self.options)
    }
}

pub fn normalize(raw: &str, options: &NormalizeOptions) -> Normalized {
    Normalizer::new(options.clone()).normalize(raw)
}

pub fn prepare_for_editing(markup: &str, options: &NormalizeOptions) -> String {
    vault::escape_for_editing(markup, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn runs_every_stage() {
        let raw = "<p style=\"color:red\">Hello&nbsp;<span>there</span></p><p></p>";
        let out = normalize(raw, &NormalizeOptions::default());
        assert_eq!(out.markup, "<p>Hello there\n</p>");
        assert!(out.code_blocks.is_empty());
    }

    #[test]
    fn sink_sees_each_block_once() {
        let raw = "<p><code class=block>a\n  b</code></p><code class=block>c</code>";
        let mut seen = Vec::new();
        let normalizer = Normalizer::default();
        let out = normalizer.normalize_with_sink(raw, &mut |index: usize, content: &str| {
            seen.push(format!("{index}:{content}"))
        });
        assert_eq!(seen, vec!["0:a\n  b", "1:c"]);
        assert_eq!(
            out.markup,
            "<code class=block>a\n  b</code>\n<code class=block>c</code>"
        );
    }

    #[test]
    fn quirk_fixup_is_opt_in() {
        let options = NormalizeOptions {
            apply_div_to_paragraph_fixup: true,
            ..NormalizeOptions::default()
        };
        assert_eq!(
            normalize("Hi<div>there</div>", &options).markup,
            "<p>Hi</p>\n<p>there</p>"
        );
        assert_eq!(
            normalize("Hi<div>there</div>", &NormalizeOptions::default()).markup,
            "Hi\n<div>there</div>"
        );
    }

    #[test]
    fn compact_output_is_single_line() {
        let options = NormalizeOptions {
            compact: true,
            ..NormalizeOptions::default()
        };
        assert_eq!(
            normalize("<ul>\n  <li><p>one two</p></li>\n</ul>", &options).markup,
            "<ul><li>one two</li></ul>"
        );
    }
}

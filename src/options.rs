// src/options.rs
//
// Knobs for one pipeline run. Everything here is plain data: serializable so it can live in the
// `[normalize]` table of a config file, and `Send + Sync` so one value can drive concurrent runs.

use crate::error::SelectorError;
use crate::token::TagToken;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

fn names(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeOptions {
    /// Rename `div` to `p` and wrap leading orphan text (WebKit editing surfaces).
    #[serde(rename = "div_to_paragraph")]
    pub apply_div_to_paragraph_fixup: bool,

    /// Attributes removed from every tag.
    pub strip_attributes: BTreeSet<String>,

    /// Elements whose inner content is vaulted verbatim.
    #[serde(rename = "preserve")]
    pub preserve_tags: Vec<TagSelector>,

    /// Tags dropped outright; their content stays in place.
    pub unwrap_tags: BTreeSet<String>,

    /// Tags never removed by the empty-tag stripper.
    pub keep_empty: BTreeSet<String>,

    /// Line endings written into restored code blocks.
    pub code_line_ending: LineEnding,

    /// Remove the layout whitespace the formatter inserted.
    pub compact: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            apply_div_to_paragraph_fixup: false,
            strip_attributes: names(&["style", "dir"]),
            preserve_tags: vec![TagSelector::with_class("code", "block")],
            unwrap_tags: names(&["span", "br"]),
            keep_empty: names(&["img"]),
            code_line_ending: LineEnding::Preserve,
            compact: false,
        }
    }
}

impl NormalizeOptions {
    pub(crate) fn is_preserved(&self, tag: &TagToken) -> bool {
        self.preserve_tags.iter().any(|s| s.matches(tag))
    }
}

/* ============================== Line endings ============================= */

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// Keep whatever the code block held.
    #[default]
    Preserve,
    /// `\r\n`, what the browser editor wrote back into its form field.
    Crlf,
    Lf,
}

impl LineEnding {
    pub fn apply(self, text: &str) -> String {
        match self {
            LineEnding::Preserve => text.to_string(),
            LineEnding::Lf => text.replace("\r\n", "\n"),
            LineEnding::Crlf => text.replace("\r\n", "\n").replace('\n', "\r\n"),
        }
    }
}

/* ============================== Tag selectors ============================ */

/// `name` or `name.class`, e.g. `code.block`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagSelector {
    name: String,
    class: Option<String>,
}

impl TagSelector {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            class: None,
        }
    }

    pub fn with_class(name: &str, class: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            class: Some(class.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// Opening tags only.
    pub fn matches(&self, tag: &TagToken) -> bool {
        !tag.is_end()
            && tag.name() == self.name
            && self.class.as_deref().is_none_or(|c| tag.has_class(c))
    }
}

fn valid_ident(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

impl FromStr for TagSelector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SelectorError::Empty);
        }
        let (name, class) = match s.split_once('.') {
            Some((name, class)) => (name, Some(class)),
            None => (s, None),
        };
        if !valid_ident(name) || !name.as_bytes()[0].is_ascii_alphabetic() {
            return Err(SelectorError::InvalidName(name.to_string()));
        }
        match class {
            Some(class) if !valid_ident(class) => Err(SelectorError::InvalidClass(class.to_string())),
            Some(class) => Ok(Self::with_class(name, class)),
            None => Ok(Self::new(name)),
        }
    }
}

impl TryFrom<String> for TagSelector {
    type Error = SelectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TagSelector> for String {
    fn from(selector: TagSelector) -> Self {
        selector.to_string()
    }
}

impl fmt::Display for TagSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.class {
            Some(class) => write!(f, "{}.{}", self.name, class),
            None => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Fragment;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("code.block", "code", Some("block"))]
    #[case("PRE", "pre", None)]
    #[case(" h2 ", "h2", None)]
    fn parses_selectors(#[case] src: &str, #[case] name: &str, #[case] class: Option<&str>) {
        let selector: TagSelector = src.parse().expect("selector should parse");
        assert_eq!(selector.name(), name);
        assert_eq!(selector.class(), class);
    }

    #[rstest]
    #[case("", SelectorError::Empty)]
    #[case(".block", SelectorError::InvalidName(String::new()))]
    #[case("2x", SelectorError::InvalidName("2x".into()))]
    #[case("code.", SelectorError::InvalidClass(String::new()))]
    #[case("code.a.b", SelectorError::InvalidClass("a.b".into()))]
    fn rejects_bad_selectors(#[case] src: &str, #[case] expected: SelectorError) {
        assert_eq!(src.parse::<TagSelector>(), Err(expected));
    }

    #[test]
    fn selector_matches_opening_tags_with_class() {
        let selector = TagSelector::with_class("code", "block");
        let fragment = Fragment::parse("<code class=\"block\"><code></code>");
        let tags: Vec<_> = fragment.tokens().iter().filter_map(|t| t.as_tag()).collect();
        assert!(selector.matches(tags[0]));
        assert!(!selector.matches(tags[1]));
        assert!(!selector.matches(tags[2]));
    }

    #[test]
    fn classless_selector_matches_any_class() {
        let selector = TagSelector::new("pre");
        let fragment = Fragment::parse("<pre><pre class=x></pre><p>");
        let tags: Vec<_> = fragment.tokens().iter().filter_map(|t| t.as_tag()).collect();
        assert!(selector.matches(tags[0]));
        assert!(selector.matches(tags[1]));
        assert!(!selector.matches(tags[2]));
        assert!(!selector.matches(tags[3]));
    }

    #[rstest]
    #[case(LineEnding::Preserve, "a\r\nb\nc")]
    #[case(LineEnding::Lf, "a\nb\nc")]
    #[case(LineEnding::Crlf, "a\r\nb\r\nc")]
    fn applies_line_endings(#[case] ending: LineEnding, #[case] expected: &str) {
        assert_eq!(ending.apply("a\r\nb\nc"), expected);
    }

    #[test]
    fn crlf_is_stable() {
        let once = LineEnding::Crlf.apply("x\ny");
        assert_eq!(LineEnding::Crlf.apply(&once), once);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: NormalizeOptions = toml::from_str(
            r#"
            div_to_paragraph = true
            preserve = ["code.block", "pre"]
            code_line_ending = "crlf"
            "#,
        )
        .expect("options should parse");
        assert!(options.apply_div_to_paragraph_fixup);
        assert_eq!(
            options.preserve_tags,
            vec![TagSelector::with_class("code", "block"), TagSelector::new("pre")]
        );
        assert_eq!(options.code_line_ending, LineEnding::Crlf);
        assert_eq!(options.strip_attributes, names(&["style", "dir"]));
    }

    #[test]
    fn options_reject_bad_selector() {
        let result: Result<NormalizeOptions, _> = toml::from_str(r#"preserve = ["code."]"#);
        assert!(result.is_err());
    }
}

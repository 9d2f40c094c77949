// src/token.rs
//
// Tokenizer: splits a markup string into a flat run of text and tags.
//
// - A tag starts at '<' or '</' followed by an ASCII letter and ends at the first '>' outside
//   quotes. A '<' that does not open a tag (or never finds its '>') stays in the text run.
// - Comments ('<!-- ... -->'), doctypes and processing instructions are text.
// - Rendering a freshly parsed Fragment reproduces the input byte-for-byte.
// - Adjacent text runs are always merged, so a Fragment never holds two Text tokens in a row.
// - Layout whitespace: whitespace adjacent to tags that contains a line break. The formatter owns
//   it and may drop or rewrite it; spaces without a line break are content.

use memchr::memchr;
use std::collections::BTreeSet;
use std::fmt;

/* =============================== Core sets =============================== */

pub(crate) fn is_void(name: &str) -> bool {
    matches_ignore_ascii_case(
        name,
        &[
            "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
            "source", "track", "wbr",
        ],
    )
}

/// Block-level tags. An inline run (text plus inline elements) ends at the first of these.
pub(crate) fn is_structural_start(name: &str) -> bool {
    matches_ignore_ascii_case(
        name,
        &[
            "address", "article", "aside", "blockquote", "details", "dialog", "div", "dl", "dt",
            "dd", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4",
            "h5", "h6", "header", "hgroup", "hr", "main", "menu", "nav", "ol", "p", "pre",
            "search", "section", "table", "thead", "tbody", "tfoot", "tr", "td", "th", "caption",
            "colgroup", "ul", "li", "optgroup", "option", "ruby", "rt", "rp", "foreignobject",
        ],
    )
}

/* ============================ Utility predicates ========================= */

#[inline]
fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

#[inline]
pub(crate) fn is_ws(b: u8) -> bool {
    b == b' ' || b == b'\t' || b == b'\n' || b == b'\r'
}

#[inline]
fn is_line_break(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

fn matches_ignore_ascii_case(name: &str, set: &[&str]) -> bool {
    set.iter().any(|&s| name.eq_ignore_ascii_case(s))
}

/// Whitespace-only text (the empty string counts).
pub(crate) fn is_blank(text: &str) -> bool {
    text.bytes().all(is_ws)
}

/// Byte offset where the trailing layout whitespace of `text` begins: the first line break inside
/// the trailing whitespace run, or `text.len()` when that run holds none.
pub(crate) fn trailing_layout_start(text: &str) -> usize {
    let s = text.as_bytes();
    let mut end = s.len();
    while end > 0 && is_ws(s[end - 1]) {
        end -= 1;
    }
    s[end..]
        .iter()
        .position(|&b| is_line_break(b))
        .map_or(s.len(), |p| end + p)
}

/// Strip layout whitespace from both ends of a text run.
///
/// A leading whitespace run is dropped entirely if it holds a line break; a trailing run is cut
/// at its first line break, so `"word \n\t"` keeps its content space. Whitespace-only text only
/// gets the trailing rule.
pub(crate) fn trim_layout(text: &str) -> &str {
    let s = text.as_bytes();
    let cut = trailing_layout_start(text);
    if is_blank(text) {
        return &text[..cut];
    }
    let mut start = 0usize;
    while start < s.len() && is_ws(s[start]) {
        start += 1;
    }
    let lead = if s[..start].iter().any(|&b| is_line_break(b)) {
        start
    } else {
        0
    };
    &text[lead..cut]
}

/* =============================== Tag tokens ============================== */

/// One recognized tag, split so that `head + attrs + tail` is exactly the source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagToken {
    name: String,
    is_end: bool,
    self_closing: bool,
    head: String,
    attrs: String,
    tail: String,
    /// Opening tag whose content sits in the code-block vault. Survives renames and attribute
    /// stripping; never rendered.
    vaulted: bool,
}

impl TagToken {
    /// Parse raw `<...>` text. The caller guarantees it starts with '<' and ends with '>'.
    fn parse(tag: &str) -> Self {
        let s = tag.as_bytes();
        let n = s.len();
        let mut i = 1;

        let mut is_end = false;
        if i < n && s[i] == b'/' {
            is_end = true;
            i += 1;
        }
        let start = i;
        while i < n && is_name_char(s[i]) {
            i += 1;
        }
        let name = tag[start..i].to_ascii_lowercase();

        // self-closing? check before '>'
        let mut j = n - 1;
        while j > i && is_ws(s[j - 1]) {
            j -= 1;
        }
        let self_closing = !is_end && j > i && s[j - 1] == b'/';
        let attrs_end = if self_closing { j - 1 } else { n - 1 };

        TagToken {
            name,
            is_end,
            self_closing,
            head: tag[..i].to_string(),
            attrs: tag[i..attrs_end].to_string(),
            tail: tag[attrs_end..].to_string(),
            vaulted: false,
        }
    }

    /// A bare opening tag, `<name>`.
    pub fn open(name: &str) -> Self {
        TagToken {
            name: name.to_ascii_lowercase(),
            is_end: false,
            self_closing: false,
            head: format!("<{name}"),
            attrs: String::new(),
            tail: ">".to_string(),
            vaulted: false,
        }
    }

    /// A closing tag, `</name>`.
    pub fn close(name: &str) -> Self {
        TagToken {
            name: name.to_ascii_lowercase(),
            is_end: true,
            self_closing: false,
            head: format!("</{name}"),
            attrs: String::new(),
            tail: ">".to_string(),
            vaulted: false,
        }
    }

    /// Lowercased tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_end(&self) -> bool {
        self.is_end
    }

    pub fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    /// Raw attribute text between the name and the closing `>` / `/>`.
    pub fn attrs(&self) -> &str {
        &self.attrs
    }

    /// True for tags that never get a matching close: `<x/>` and HTML void elements.
    pub fn is_void_like(&self) -> bool {
        self.self_closing || is_void(&self.name)
    }

    /// True for an opening tag that starts an element with content.
    pub fn opens_element(&self) -> bool {
        !self.is_end && !self.is_void_like()
    }

    pub fn is_vaulted(&self) -> bool {
        self.vaulted
    }

    pub(crate) fn mark_vaulted(&mut self) {
        self.vaulted = true;
    }

    pub fn rename(&mut self, name: &str) {
        self.name = name.to_ascii_lowercase();
        self.head = if self.is_end {
            format!("</{name}")
        } else {
            format!("<{name}")
        };
    }

    pub fn attributes(&self) -> Vec<Attribute<'_>> {
        scan_attributes(&self.attrs)
    }

    /// Unquoted value of the first attribute called `name`.
    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attributes()
            .into_iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .and_then(|a| a.value)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr_value("class")
            .is_some_and(|v| v.split_ascii_whitespace().any(|c| c == class))
    }

    /// Remove every attribute whose (case-insensitive) name is in `names`. Returns whether the
    /// tag changed.
    pub fn strip_attributes(&mut self, names: &BTreeSet<String>) -> bool {
        let doomed: Vec<_> = self
            .attributes()
            .into_iter()
            .filter(|a| names.contains(&a.name.to_ascii_lowercase()))
            .map(|a| a.span.clone())
            .collect();
        if doomed.is_empty() {
            return false;
        }
        let mut kept = String::with_capacity(self.attrs.len());
        let mut from = 0usize;
        for span in doomed {
            kept.push_str(&self.attrs[from..span.start]);
            from = span.end;
        }
        kept.push_str(&self.attrs[from..]);
        self.attrs = kept;
        true
    }

    /// True when the tag carries no attributes other than ones in `ignore`.
    pub fn is_bare(&self, ignore: &BTreeSet<String>) -> bool {
        self.attributes()
            .iter()
            .all(|a| ignore.contains(&a.name.to_ascii_lowercase()))
    }

    pub(crate) fn write_to(&self, out: &mut String) {
        out.push_str(&self.head);
        out.push_str(&self.attrs);
        out.push_str(&self.tail);
    }
}

impl fmt::Display for TagToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.head, self.attrs, self.tail)
    }
}

/* ============================ Attribute scan ============================ */

/// One attribute inside a tag's raw attribute text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub name: &'a str,
    pub value: Option<&'a str>,
    /// Byte range in the attribute text, including the whitespace before the name.
    span: std::ops::Range<usize>,
}

fn scan_attributes(attrs: &str) -> Vec<Attribute<'_>> {
    // [name] ( '=' [value] )? ; value may be quoted or unquoted.
    let s = attrs.as_bytes();
    let len = s.len();
    let mut out = Vec::new();
    let mut i = 0usize;

    while i < len {
        let span_start = i;
        // skip whitespace and slashes
        while i < len && (is_ws(s[i]) || s[i] == b'/') {
            i += 1;
        }
        if i >= len {
            break;
        }

        // attribute name
        if !is_name_char(s[i]) {
            // Not a valid name start; skip the junk up to the next separator.
            while i < len && !is_ws(s[i]) && s[i] != b'/' {
                i += 1;
            }
            continue;
        }
        let name_start = i;
        i += 1;
        while i < len && is_name_char(s[i]) {
            i += 1;
        }
        let name = &attrs[name_start..i];

        // optional "= value"
        let mut j = i;
        while j < len && is_ws(s[j]) {
            j += 1;
        }
        let mut value = None;
        if j < len && s[j] == b'=' {
            j += 1;
            while j < len && is_ws(s[j]) {
                j += 1;
            }
            if j < len && (s[j] == b'"' || s[j] == b'\'') {
                let q = s[j];
                j += 1;
                let value_start = j;
                while j < len && s[j] != q {
                    j += 1;
                }
                value = Some(&attrs[value_start..j]);
                if j < len {
                    j += 1;
                }
            } else {
                let value_start = j;
                while j < len && !is_ws(s[j]) {
                    j += 1;
                }
                value = Some(&attrs[value_start..j]);
            }
            i = j;
        }

        out.push(Attribute {
            name,
            value,
            span: span_start..i,
        });
    }
    out
}

/* ================================ Tokens ================================= */

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Text(String),
    Tag(TagToken),
}

impl Token {
    pub fn as_tag(&self) -> Option<&TagToken> {
        match self {
            Token::Tag(tag) => Some(tag),
            Token::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Token::Text(text) => Some(text),
            Token::Tag(_) => None,
        }
    }

    pub(crate) fn is_blank_text(&self) -> bool {
        self.as_text().is_some_and(is_blank)
    }

    pub(crate) fn write_to(&self, out: &mut String) {
        match self {
            Token::Text(text) => out.push_str(text),
            Token::Tag(tag) => tag.write_to(out),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(text) => f.write_str(text),
            Token::Tag(tag) => fmt::Display::fmt(tag, f),
        }
    }
}

/// Find the '>' for a tag starting at `i` (s[i] == '<'), being quote-aware.
fn find_tag_end(s: &[u8], mut i: usize) -> Option<usize> {
    let n = s.len();
    i += 1;
    let mut quote: u8 = 0;
    while i < n {
        let b = s[i];
        if quote != 0 {
            if b == quote {
                quote = 0;
            }
        } else if b == b'"' || b == b'\'' {
            quote = b;
        } else if b == b'>' {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Index just past the "-->" closing a comment that starts at `i`, if it is terminated.
fn find_comment_end(s: &[u8], i: usize) -> Option<usize> {
    // Assumes s[i..].starts_with("<!--")
    let mut k = i + 4;
    while k < s.len() {
        let j = k + memchr(b'-', &s[k..])?;
        if s[j..].starts_with(b"-->") {
            return Some(j + 3);
        }
        k = j + 1;
    }
    None
}

#[inline]
fn opens_tag(s: &[u8], lt: usize) -> bool {
    match s.get(lt + 1) {
        Some(b'/') => s.get(lt + 2).is_some_and(|b| b.is_ascii_alphabetic()),
        Some(b) => b.is_ascii_alphabetic(),
        None => false,
    }
}

/* =============================== Fragment ================================ */

/// The working value threaded through the pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fragment {
    tokens: Vec<Token>,
}

impl Fragment {
    pub fn parse(src: &str) -> Self {
        let s = src.as_bytes();
        let n = s.len();
        let mut fragment = Fragment::default();
        let mut text_start = 0usize;
        let mut i = 0usize;

        while let Some(off) = memchr(b'<', &s[i..]) {
            let lt = i + off;
            if s[lt..].starts_with(b"<!--") {
                match find_comment_end(s, lt) {
                    Some(end) => {
                        i = end;
                        continue;
                    }
                    // Unterminated comment swallows the rest as text.
                    None => break,
                }
            }
            if !opens_tag(s, lt) {
                i = lt + 1;
                continue;
            }
            let Some(gt) = find_tag_end(s, lt) else {
                // literal '<'
                i = lt + 1;
                continue;
            };
            if text_start < lt {
                fragment.push_text(&src[text_start..lt]);
            }
            fragment.push_tag(TagToken::parse(&src[lt..=gt]));
            i = gt + 1;
            text_start = i;
            if i >= n {
                break;
            }
        }
        if text_start < n {
            fragment.push_text(&src[text_start..]);
        }
        fragment
    }

    /// Build from tokens, merging adjacent text runs and dropping empty ones.
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        let mut fragment = Fragment {
            tokens: Vec::with_capacity(tokens.len()),
        };
        for token in tokens {
            fragment.push(token);
        }
        fragment
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn push(&mut self, token: Token) {
        match token {
            Token::Text(text) => self.push_text(&text),
            Token::Tag(tag) => self.push_tag(tag),
        }
    }

    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Token::Text(last)) = self.tokens.last_mut() {
            last.push_str(text);
        } else {
            self.tokens.push(Token::Text(text.to_string()));
        }
    }

    pub fn push_tag(&mut self, tag: TagToken) {
        self.tokens.push(Token::Tag(tag));
    }

    /// Cut the layout whitespace off the end of the last text run.
    pub(crate) fn trim_trailing_layout(&mut self) {
        if let Some(Token::Text(last)) = self.tokens.last_mut() {
            let cut = trailing_layout_start(last);
            last.truncate(cut);
            if last.is_empty() {
                self.tokens.pop();
            }
        }
    }

    /// Trim all whitespace from the very start and end of the fragment.
    pub(crate) fn trim_edges(&mut self) {
        if let Some(Token::Text(first)) = self.tokens.first_mut() {
            let lead = first.len() - first.trim_start().len();
            first.replace_range(..lead, "");
            if first.is_empty() {
                self.tokens.remove(0);
            }
        }
        if let Some(Token::Text(last)) = self.tokens.last_mut() {
            let keep = last.trim_end().len();
            last.truncate(keep);
            if last.is_empty() {
                self.tokens.pop();
            }
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            token.write_to(&mut out);
        }
        out
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            fmt::Display::fmt(token, f)?;
        }
        Ok(())
    }
}

/* ============================== Pair matching ============================ */

/// For every tag, the index of its partner (open ↔ close), matched by name on a stack.
/// A close with no open of the same name stays unpaired; opens left on the stack when an outer
/// element closes are abandoned.
pub(crate) fn pair_map(tokens: &[Token]) -> Vec<Option<usize>> {
    let mut pairs = vec![None; tokens.len()];
    let mut stack: Vec<(usize, &str)> = Vec::new();
    for (idx, token) in tokens.iter().enumerate() {
        let Token::Tag(tag) = token else { continue };
        if tag.is_end() {
            if let Some(pos) = stack.iter().rposition(|&(_, name)| name == tag.name()) {
                let open = stack[pos].0;
                stack.truncate(pos);
                pairs[open] = Some(idx);
                pairs[idx] = Some(open);
            }
        } else if tag.opens_element() {
            stack.push((idx, tag.name()));
        }
    }
    pairs
}

/* =========================== Paragraph wrapping ========================== */

/// End (exclusive) of the inline run starting at `start`: text and inline elements up to the
/// first block-level opening tag or enclosing closing tag at the run's own level.
pub(crate) fn inline_run_end(tokens: &[Token], start: usize) -> usize {
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate().skip(start) {
        let Token::Tag(tag) = token else { continue };
        if tag.is_end() {
            if depth == 0 {
                return idx;
            }
            depth -= 1;
        } else if depth == 0 && is_structural_start(tag.name()) {
            return idx;
        } else if tag.opens_element() {
            depth += 1;
        }
    }
    tokens.len()
}

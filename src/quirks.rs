// src/quirks.rs
//
// Browser-quirk fixup (WebKit editing surfaces, opt-in):
// - `div` is what the engine inserts on Enter where a paragraph was meant; rename to `p`.
// - Text typed before the first block has no wrapper; wrap that leading inline run in `<p>`.

use crate::token::{inline_run_end, is_blank, Fragment, TagToken, Token};
use tracing::debug;

pub fn fix_browser_quirks(fragment: Fragment, enabled: bool) -> Fragment {
    if !enabled {
        return fragment;
    }
    let mut tokens = fragment.into_tokens();

    let mut renamed = 0usize;
    for token in &mut tokens {
        if let Token::Tag(tag) = token {
            if tag.name() == "div" {
                tag.rename("p");
                renamed += 1;
            }
        }
    }

    let orphan = matches!(tokens.first(), Some(Token::Text(text)) if !is_blank(text));
    if orphan {
        let end = inline_run_end(&tokens, 0);
        tokens.insert(end, Token::Tag(TagToken::close("p")));
        tokens.insert(0, Token::Tag(TagToken::open("p")));
    }

    debug!(renamed, wrapped_orphan = orphan, "applied browser quirk fixup");
    Fragment::from_tokens(tokens)
}

//! canonhtml: turn the loose HTML a rich-text editing surface produces into canonical markup.
//!
//! One [`normalize`] call runs a fixed sequence of token-stream stages:
//!
//! 1. lift the verbatim content of code blocks into a vault (`code.block` by default);
//! 2. decode entity-escaped text that has the shape of a complete tag;
//! 3. optionally repair browser quirks (`div` for `p`, orphan leading text);
//! 4. remove paragraph wrappers inside list items and around code blocks and images;
//! 5. scrub attributes and unwanted tags, then indent one tab per nesting level;
//! 6. strip whitespace-only elements until nothing changes;
//! 7. optionally compact the layout back onto one line;
//! 8. put the vaulted code back, byte for byte.
//!
//! ```
//! use canonhtml::{normalize, NormalizeOptions};
//!
//! let out = normalize("<div><p>A</p><p>B</p></div>", &NormalizeOptions::default());
//! assert_eq!(out.markup, "<div>\n\t<p>A</p>\n\t<p>B</p>\n</div>");
//! ```
//!
//! The pipeline never fails: malformed input is repaired on a best-effort basis and anomalies
//! are reported through `tracing`.

pub mod config;
pub mod entities;
pub mod error;
pub mod format;
pub mod logging;
pub mod options;
pub mod pipeline;
pub mod quirks;
pub mod scrub;
pub mod strip;
pub mod token;
pub mod unwrap;
pub mod vault;

pub use config::{format_hex, Config};
pub use error::{ConfigError, SelectorError};
pub use options::{LineEnding, NormalizeOptions, TagSelector};
pub use pipeline::{normalize, prepare_for_editing, CodeBlockSink, Normalized, Normalizer};
pub use token::{Fragment, TagToken, Token};
pub use vault::CodeBlockRecord;

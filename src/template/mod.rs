//! Smarty template structure analysis.
//!
//! This module turns raw template text into a [`TemplateStructure`] snapshot:
//! the nested tag blocks, the set of referenced variables, the comment spans,
//! and the file-include references that editor features are built on. The
//! scan is lexical by design - it recognizes Smarty delimiter syntax without
//! validating the grammar, so arbitrarily broken input still produces a
//! complete (if partial) snapshot.
//!
//! A snapshot is immutable and describes exactly one revision of a document.
//! Whenever the text changes, callers re-scan; there is no incremental
//! re-parse. Memoizing the snapshot per document revision is the caller's
//! responsibility.
//!
//! Submodules:
//! - [`lang`] - the Smarty language tables (built-in functions, common
//!   modifiers, per-function attributes, self-closing tag names)
//! - [`scan`](mod@scan) - the single-pass structure scanner
//! - [`blocks`] - point queries against a snapshot ("which blocks enclose
//!   this offset")

pub mod blocks;
pub mod lang;
pub mod scan;

pub use scan::scan;

/// One recognized tag occurrence in a template.
///
/// A block always has an opening span. `end_offset` stays `None` until a
/// closing tag of the same name is seen; logically self-closing tags (see
/// [`lang::is_self_closing`]) get their end assigned immediately and never
/// participate in nesting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Offset of the opening `{`.
    pub start_offset: usize,
    /// Offset of the `}` closing the start tag (pinned to the last offset
    /// of the document when the tag is unterminated).
    pub start_tag_end_offset: usize,
    /// Offset of the matching closing tag, if one was found.
    pub end_offset: Option<usize>,
    /// Tag name, without delimiters or the leading `/`.
    pub name: String,
}

/// A `file="..."` reference found on an `include` tag.
///
/// The offsets bracket the filename text itself (not the quotes), so a
/// consumer can turn the reference into a navigable document link without
/// re-scanning the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeRef {
    /// Offset of the first character of the filename.
    pub start_offset: usize,
    /// Offset one past the last character of the filename.
    pub end_offset: usize,
    /// The filename exactly as written in the template.
    pub filename: String,
}

/// The structural facts extracted from one template text.
///
/// Produced by [`scan`]; immutable once returned. `blocks` is ordered by
/// ascending `start_offset` (the order tags appear in the document), which
/// the block locator in [`blocks`] relies on. `variables` preserves
/// first-seen order and contains each name (sigil included) exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateStructure {
    /// All recognized tag occurrences, in document order.
    pub blocks: Vec<Block>,
    /// Referenced variable names including the `$` sigil, deduplicated,
    /// first-seen order.
    pub variables: Vec<String>,
    /// `include` tag file references, in document order.
    pub includes: Vec<IncludeRef>,
    /// Comment spans as `(start, end)` offset pairs, inclusive of the
    /// `{*`/`*}` delimiters.
    pub comment_spans: Vec<(usize, usize)>,
}

//! Smartyls - structural analysis and index caching for Smarty templates
//!
//! The core library behind Smarty editor tooling. It answers two independent
//! questions for a language server sitting on top of it:
//!
//! 1. **What is the structure of this template?** A single-pass lexical scan
//!    over template text produces an immutable snapshot of nested tag blocks,
//!    referenced variables, comment spans, and file-include references.
//! 2. **What did we already compute for this file?** A durable, bucketed
//!    index store memoizes expensive per-file derived data (for example
//!    plugin metadata harvested from companion source files) keyed by path
//!    and modification time, so it survives process restarts.
//!
//! # Architecture Overview
//!
//! The library deliberately splits into leaf components with no coupling
//! between them:
//!
//! - [`template`] - The structure scanner, the block locator, and the Smarty
//!   language tables. Pure synchronous functions: text in, facts out. The
//!   scanner is total - it never fails, for any input - and resolves all
//!   malformed syntax through fixed fallback policies instead of errors.
//! - [`regions`] - A thin classifier over an external markup tokenizer's
//!   event stream that marks spans of a document as embedded script or
//!   style content.
//! - [`index`] - The async index store: bucketed JSON persistence under a
//!   caller-supplied storage root, with load de-duplication, debounced
//!   coalesced writes, sliding in-memory eviction, and schema-version
//!   invalidation. Runs on tokio.
//!
//! Editor-protocol wiring (request handlers, document sync, completion and
//! diagnostics providers) lives outside this crate; those layers consume
//! the snapshot and the store through the types re-exported here.
//!
//! # Example
//!
//! ```rust
//! use smartyls::template::scan;
//!
//! let snapshot = scan("{foreach item=\"row\" from=$rows}{$row.id}{/foreach}");
//! assert_eq!(snapshot.blocks[0].name, "foreach");
//! assert!(snapshot.variables.iter().any(|v| v == "$rows"));
//! let enclosing = snapshot.enclosing_blocks(20, true);
//! assert_eq!(enclosing.len(), 1);
//! ```

// Template analysis
pub mod template;

// Embedded-language region classification
pub mod regions;

// Durable index cache
pub mod index;

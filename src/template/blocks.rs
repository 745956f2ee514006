//! Point queries against a [`TemplateStructure`] snapshot.

use super::{Block, TemplateStructure};

impl TemplateStructure {
    /// All blocks enclosing `offset`, in document order of their starts.
    ///
    /// A block covers `offset` when its start is at or before it and either
    /// its end is at or after it, or it has no end yet and
    /// `include_unclosed` is set. Because `blocks` is ordered by ascending
    /// start offset, the scan stops at the first block starting past
    /// `offset` - no later block can enclose an earlier point.
    ///
    /// Callers that need innermost-first order reverse the result.
    pub fn enclosing_blocks(&self, offset: usize, include_unclosed: bool) -> Vec<&Block> {
        let mut enclosing = Vec::new();
        for block in &self.blocks {
            if block.start_offset > offset {
                break;
            }
            match block.end_offset {
                None => {
                    if include_unclosed {
                        enclosing.push(block);
                    }
                }
                Some(end) => {
                    if end >= offset {
                        enclosing.push(block);
                    }
                }
            }
        }
        enclosing
    }
}

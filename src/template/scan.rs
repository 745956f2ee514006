//! Single-pass structure scanner for Smarty template text.
//!
//! One forward scan with an explicit byte cursor, no backtracking beyond a
//! one-character recovery for improperly delimited tags. The scanner is
//! total: any input - empty, unterminated, arbitrary Unicode - produces a
//! complete snapshot. Malformed syntax is resolved by fixed policies rather
//! than errors:
//!
//! - unterminated tags get the document's last offset as their end
//! - empty tag names are skipped without recording anything
//! - unmatched closing tags are ignored
//! - a `{` inside a start tag ends that tag one character early and is
//!   reprocessed as a new tag
//!
//! Block matching keeps one LIFO stack *per tag name*, so interleavings
//! across different names ("open a, open b, close a, close b") resolve
//! independently. There is deliberately no cross-name nesting validation.
//!
//! All delimiter and identifier syntax is ASCII, so the scan operates on
//! bytes; multi-byte UTF-8 sequences pass through untouched and every
//! recorded offset lands on a character boundary.

use std::collections::{HashMap, HashSet};

use regex::Regex;

use super::lang;
use super::{Block, IncludeRef, TemplateStructure};

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Scan template text into a [`TemplateStructure`] snapshot.
///
/// Runs in time linear in the input length and never fails. See the module
/// docs for the recovery policies applied to malformed input.
pub fn scan(text: &str) -> TemplateStructure {
    let bytes = text.as_bytes();
    let len = bytes.len();

    let mut blocks: Vec<Block> = Vec::new();
    // Tag name -> stack of indices into `blocks` with an open start tag.
    let mut open_stacks: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut variables: Vec<String> = Vec::new();
    let mut seen_vars: HashSet<String> = HashSet::new();
    let mut includes: Vec<IncludeRef> = Vec::new();
    let mut comment_spans: Vec<(usize, usize)> = Vec::new();
    let mut in_literal = false;

    let mut record_var = |name: &str, variables: &mut Vec<String>| {
        if seen_vars.insert(name.to_string()) {
            variables.push(name.to_string());
        }
    };

    // Harvesting patterns, compiled once per scan. The patterns are fixed,
    // so compilation cannot fail; the scanner stays total regardless.
    let dollar_ident = Regex::new(r"\$[0-9A-Za-z_]+").ok();
    let assign_var = Regex::new(r#"var=["']([0-9A-Za-z_]+)["']"#).ok();
    let foreach_vars = Regex::new(r#"(?:key|item)=["']([0-9A-Za-z_]+)["']"#).ok();
    let assign_attr_dq = Regex::new(r#"assign="([0-9A-Za-z_]+)""#).ok();
    let assign_attr_sq = Regex::new(r#"assign='([0-9A-Za-z_]+)'"#).ok();
    let include_file = Regex::new(r#"(\s+file=")([^"]+)""#).ok();

    let mut i = 0;
    while i < len {
        if bytes[i] != b'{' {
            // Outside a tag (or suspended inside a literal section) every
            // byte just advances the cursor.
            i += 1;
            continue;
        }

        let brace_pos = i;
        i += 1;
        let Some(&marker) = bytes.get(i) else { break };

        // Variable reference: {$name}
        if !in_literal && marker == b'$' {
            let sigil_pos = i;
            i += 1;
            let ident_start = i;
            while i < len && is_ident_byte(bytes[i]) {
                i += 1;
            }
            if i > ident_start {
                record_var(&text[sigil_pos..i], &mut variables);
            }
            continue;
        }

        // Comment: {* ... *}
        if !in_literal && marker == b'*' {
            let mut has_star = false;
            i += 1;
            while i < len {
                let b = bytes[i];
                if b == b'*' {
                    has_star = true;
                } else if has_star {
                    if b == b'}' {
                        break;
                    }
                    has_star = false;
                }
                i += 1;
            }
            comment_spans.push((brace_pos, i));
            continue;
        }

        // Tag: {name ...} or {/name}
        let is_close = marker == b'/';
        if is_close {
            i += 1;
        }
        let name_start = i;
        while i < len && is_ident_byte(bytes[i]) {
            i += 1;
        }
        let name = &text[name_start..i];
        if name.is_empty() {
            // Empty tag name: nothing recorded, cursor already advanced.
            continue;
        }

        let is_literal_tag = name == "literal";
        if in_literal && !(is_literal_tag && is_close) {
            // Suspended: only a closing /literal is recognized.
            continue;
        }
        if is_literal_tag {
            in_literal = !is_close;
        }

        if is_close {
            if let Some(stack) = open_stacks.get_mut(name) {
                if let Some(idx) = stack.pop() {
                    blocks[idx].end_offset = Some(i);
                }
            }
            continue;
        }

        // Opening tag: the raw remainder up to the first `}` is the
        // attribute text. A `{` before the `}` means an improper tag; the
        // start tag ends there and the cursor backs up one character so the
        // nested `{` is reprocessed from the top.
        let attr_start = i;
        let mut attr_end = len;
        let mut start_tag_end = len - 1;
        while i < len {
            let b = bytes[i];
            if b == b'}' {
                start_tag_end = i;
                attr_end = i;
                break;
            }
            if b == b'{' {
                attr_end = i;
                i -= 1;
                start_tag_end = i;
                break;
            }
            i += 1;
        }
        let attr_text = &text[attr_start..attr_end];

        let end_offset = if lang::is_self_closing(name) {
            Some(i)
        } else {
            None
        };

        let block_idx = blocks.len();
        blocks.push(Block {
            start_offset: brace_pos,
            start_tag_end_offset: start_tag_end,
            end_offset,
            name: name.to_string(),
        });
        if end_offset.is_none() {
            open_stacks.entry(name).or_default().push(block_idx);
        }

        // Every $ident in the attribute text is a variable reference.
        if let Some(re) = &dollar_ident {
            for m in re.find_iter(attr_text) {
                record_var(m.as_str(), &mut variables);
            }
        }

        // Attributes that bind new variables: var= on assign, key=/item=
        // on foreach, and a generic assign= on any tag.
        let binding_re = match name {
            "assign" => assign_var.as_ref(),
            "foreach" => foreach_vars.as_ref(),
            _ => None,
        };
        if let Some(re) = binding_re {
            for caps in re.captures_iter(attr_text) {
                if let Some(var) = caps.get(1) {
                    record_var(&format!("${}", var.as_str()), &mut variables);
                }
            }
        }
        let assign_capture = assign_attr_dq
            .as_ref()
            .and_then(|re| re.captures(attr_text))
            .or_else(|| assign_attr_sq.as_ref().and_then(|re| re.captures(attr_text)));
        if let Some(caps) = assign_capture {
            if let Some(var) = caps.get(1) {
                record_var(&format!("${}", var.as_str()), &mut variables);
            }
        }

        // file="..." on an include tag becomes a navigable reference with
        // offsets pinpointing the filename substring.
        if name == "include" {
            if let Some(caps) = include_file.as_ref().and_then(|re| re.captures(attr_text)) {
                if let Some(filename) = caps.get(2) {
                    let start = attr_start + filename.start();
                    includes.push(IncludeRef {
                        start_offset: start,
                        end_offset: start + filename.as_str().len(),
                        filename: filename.as_str().to_string(),
                    });
                }
            }
        }
    }

    TemplateStructure {
        blocks,
        variables,
        includes,
        comment_spans,
    }
}

//! Embedded-language region classification.
//!
//! Templates are markup documents first; script and style content embedded
//! in them is handled by other language services. This module reclassifies
//! spans of a document as embedded script or style by folding over an
//! external markup tokenizer's event stream - it performs no scanning or
//! lookahead of its own, and carries exactly two bits of state: whether the
//! cursor is inside a `<script>` start tag, and the most recently seen
//! `type` attribute value for that element (so non-executable script MIME
//! types are not treated as script).
//!
//! The tokenizer itself is an external collaborator; [`MarkupEvent`] is the
//! boundary contract. Events must arrive in document order.

/// The embedded language of a classified region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionLanguage {
    /// Executable script content.
    Script,
    /// Stylesheet content.
    Style,
}

/// One event from the external markup tokenizer, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupEvent<'t> {
    /// `<name` - a start tag opened.
    StartTagOpen { name: &'t str },
    /// `>` closing a start tag.
    StartTagClose,
    /// An attribute name inside a start tag.
    AttributeName { name: &'t str },
    /// An attribute value, with its document span and raw text including
    /// any surrounding quotes.
    AttributeValue { start: usize, end: usize, raw: &'t str },
    /// The text content of a `<script>` element.
    ScriptContent { start: usize, end: usize },
    /// The text content of a `<style>` element.
    StyleContent { start: usize, end: usize },
}

/// A span of the document carrying an embedded language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRegion {
    pub start_offset: usize,
    pub end_offset: usize,
    pub language: RegionLanguage,
    /// True for `style="..."` attribute values (quotes excluded from the
    /// span), false for element content.
    pub in_attribute: bool,
}

/// Strip one layer of surrounding quotes from a raw attribute value.
fn unquoted(raw: &str) -> &str {
    if raw.len() >= 2 {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

/// Fold a markup event stream into embedded-language regions.
///
/// Script content is emitted only when the enclosing `<script>` element has
/// no `type` attribute or `type="text/javascript"`. Style element content
/// is always emitted; `style="..."` attribute values are emitted with the
/// quotes stripped and `in_attribute` set.
pub fn classify_regions<'t, I>(events: I) -> Vec<LanguageRegion>
where
    I: IntoIterator<Item = MarkupEvent<'t>>,
{
    let mut regions = Vec::new();
    let mut in_script_tag = false;
    let mut script_type: Option<String> = None;
    let mut last_attr_name: Option<&str> = None;

    for event in events {
        match event {
            MarkupEvent::ScriptContent { start, end } => {
                let executable =
                    script_type.as_deref().is_none_or(|t| t == "text/javascript");
                if executable {
                    regions.push(LanguageRegion {
                        start_offset: start,
                        end_offset: end,
                        language: RegionLanguage::Script,
                        in_attribute: false,
                    });
                }
            }
            MarkupEvent::StyleContent { start, end } => {
                regions.push(LanguageRegion {
                    start_offset: start,
                    end_offset: end,
                    language: RegionLanguage::Style,
                    in_attribute: false,
                });
            }
            MarkupEvent::StartTagOpen { name } => {
                if name.eq_ignore_ascii_case("script") {
                    in_script_tag = true;
                    script_type = None;
                }
            }
            MarkupEvent::StartTagClose => in_script_tag = false,
            MarkupEvent::AttributeName { name } => last_attr_name = Some(name),
            MarkupEvent::AttributeValue { start, end, raw } => {
                if in_script_tag {
                    if last_attr_name == Some("type") {
                        script_type = Some(unquoted(raw).to_string());
                    }
                } else if last_attr_name == Some("style") {
                    regions.push(LanguageRegion {
                        start_offset: start + 1,
                        end_offset: end - 1,
                        language: RegionLanguage::Style,
                        in_attribute: true,
                    });
                }
            }
        }
    }

    regions
}

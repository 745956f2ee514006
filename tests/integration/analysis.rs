//! Scanning a realistic page template end to end.

use smartyls::template::{lang, scan};

const PAGE: &str = r#"{* page header *}
{include file="header.tpl"}
{assign var="title" value=$page->title}
<ul>
{foreach item="item" key="idx" from=$navItems}
  <li class="{if $idx == $active}on{/if}">{$item.label}</li>
{foreachelse}
  <li>empty</li>
{/foreach}
</ul>
{literal}
  <script>var tpl = {$notAVar};</script>
{/literal}
"#;

#[test]
fn test_realistic_template_snapshot() {
    let snapshot = scan(PAGE);

    let names: Vec<&str> = snapshot.blocks.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["include", "assign", "foreach", "if", "foreachelse", "literal"]
    );
    // Every block in this template is terminated, one way or another
    assert!(snapshot.blocks.iter().all(|b| b.end_offset.is_some()));

    assert_eq!(
        snapshot.variables,
        vec!["$page", "$title", "$navItems", "$item", "$idx", "$active"]
    );

    assert_eq!(snapshot.includes.len(), 1);
    let include = &snapshot.includes[0];
    assert_eq!(include.filename, "header.tpl");
    assert_eq!(
        &PAGE[include.start_offset..include.end_offset],
        "header.tpl"
    );

    assert_eq!(snapshot.comment_spans.len(), 1);
    assert_eq!(snapshot.comment_spans[0].0, 0);

    // Nothing inside the literal section leaked into the snapshot
    assert!(!snapshot.variables.iter().any(|v| v == "$notAVar"));
}

#[test]
fn test_locator_against_realistic_template() {
    let snapshot = scan(PAGE);

    let inside_if = PAGE.find("on{/if}").unwrap();
    let names: Vec<&str> = snapshot
        .enclosing_blocks(inside_if, false)
        .iter()
        .map(|b| b.name.as_str())
        .collect();
    assert_eq!(names, vec!["foreach", "if"]);

    let inside_literal = PAGE.find("var tpl").unwrap();
    let names: Vec<&str> = snapshot
        .enclosing_blocks(inside_literal, false)
        .iter()
        .map(|b| b.name.as_str())
        .collect();
    assert_eq!(names, vec!["literal"]);
}

#[test]
fn test_language_tables_back_the_template() {
    for block in scan(PAGE).blocks {
        assert!(lang::is_builtin_function(&block.name), "{}", block.name);
    }
    assert!(lang::function_attributes("include").unwrap().contains(&"file"));
    assert!(lang::MODIFIERS.contains(&"escape"));
}

//! Property: serializing a parsed canonical document reproduces it.

use niwa::tree::{parse, serialize};
use proptest::prelude::*;

fn body() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z ]{0,20}", 0..4)
        .prop_map(|lines| lines.into_iter().map(|l| format!("{l}\n")).collect())
}

fn section() -> impl Strategy<Value = String> {
    (1u8..=6, "[A-Z][a-zA-Z0-9]{0,8}", body())
        .prop_map(|(level, title, body)| format!("{} {}\n{}", "#".repeat(level as usize), title, body))
}

fn document() -> impl Strategy<Value = String> {
    (body(), prop::collection::vec(section(), 0..12))
        .prop_map(|(preamble, sections)| format!("{}{}", preamble, sections.concat()))
}

proptest! {
    #[test]
    fn test_canonical_markdown_round_trips(md in document()) {
        let tree = parse(&md);
        prop_assert_eq!(serialize(&tree), md);
    }

    #[test]
    fn test_reparse_keeps_structure(md in document()) {
        let first = parse(&md);
        let second = parse(&serialize(&first));
        let shape = |tree: &niwa::tree::Tree| -> Vec<(String, Vec<String>)> {
            tree.walk()
                .into_iter()
                .map(|n| (n.id.clone(), n.children.clone()))
                .collect()
        };
        prop_assert_eq!(shape(&first), shape(&second));
    }

    #[test]
    fn test_every_heading_becomes_one_node(md in document()) {
        let headings = md.lines().filter(|l| l.starts_with('#')).count();
        prop_assert_eq!(parse(&md).len(), headings + 1);
    }
}

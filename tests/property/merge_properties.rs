//! Properties of the three-way merge.

use niwa::merge::three_way;
use proptest::prelude::*;

fn base_lines() -> impl Strategy<Value = Vec<String>> {
    (3usize..20).prop_map(|n| (0..n).map(|i| format!("line {i}")).collect())
}

fn text(lines: &[String]) -> String {
    lines.iter().map(|l| format!("{l}\n")).collect()
}

fn small_text() -> impl Strategy<Value = String> {
    prop::collection::vec("[abc]{0,2}", 0..6).prop_map(|lines| {
        lines.into_iter().map(|l| format!("{l}\n")).collect()
    })
}

proptest! {
    #[test]
    fn test_merge_is_deterministic(base in small_text(), yours in small_text(), theirs in small_text()) {
        let first = three_way(&base, &yours, &theirs);
        let second = three_way(&base, &yours, &theirs);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_untouched_side_yields_other_side(base in small_text(), edited in small_text()) {
        let only_yours = three_way(&base, &edited, &base);
        prop_assert_eq!(only_yours.suggestion, Some(edited.clone()));
        let only_theirs = three_way(&base, &base, &edited);
        prop_assert_eq!(only_theirs.suggestion, Some(edited));
    }

    #[test]
    fn test_suggestion_only_without_overlaps(base in small_text(), yours in small_text(), theirs in small_text()) {
        let analysis = three_way(&base, &yours, &theirs);
        prop_assert_eq!(analysis.suggestion.is_some(), analysis.overlaps.is_empty());
    }

    #[test]
    fn test_edits_to_different_lines_merge(
        (lines, i, j) in base_lines().prop_flat_map(|lines| {
            let n = lines.len();
            (Just(lines), 0..n, 0..n)
        })
    ) {
        prop_assume!(i != j);
        let mut yours = lines.clone();
        yours[i] = format!("yours {i}");
        let mut theirs = lines.clone();
        theirs[j] = format!("theirs {j}");
        let mut both = lines.clone();
        both[i] = yours[i].clone();
        both[j] = theirs[j].clone();

        let analysis = three_way(&text(&lines), &text(&yours), &text(&theirs));
        prop_assert!(analysis.overlaps.is_empty());
        prop_assert_eq!(analysis.suggestion, Some(text(&both)));
    }

    #[test]
    fn test_edits_to_the_same_line_overlap(
        (lines, i) in base_lines().prop_flat_map(|lines| {
            let n = lines.len();
            (Just(lines), 0..n)
        })
    ) {
        let mut yours = lines.clone();
        yours[i] = "yours".to_string();
        let mut theirs = lines.clone();
        theirs[i] = "theirs".to_string();

        let analysis = three_way(&text(&lines), &text(&yours), &text(&theirs));
        prop_assert!(analysis.suggestion.is_none());
        prop_assert_eq!(analysis.overlaps.len(), 1);
        prop_assert_eq!(analysis.overlaps[0].start, i);
        prop_assert_eq!(analysis.overlaps[0].end, i + 1);
    }
}

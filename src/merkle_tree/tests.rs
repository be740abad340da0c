use super::*;
use crate::storage::{Database, SledBackend};
use crate::test_helper::{CountHasher, StringHasher};

fn open_test_database() -> Database {
    let backend = SledBackend::open_temporary().expect("open temporary sled backend");
    Database::open(Box::new(backend)).expect("open database")
}

fn string_tree(depth: u32) -> MerkleTree<StringHasher> {
    MerkleTree::new(open_test_database(), "notes", StringHasher::new(), depth, "".to_string()).unwrap()
}

#[test]
fn empty_tree_has_no_root_or_leaves() {
    let tree = string_tree(4);
    assert_eq!(tree.size().unwrap(), 0);
    assert_eq!(tree.get_leaves().unwrap(), Vec::<String>::new());
    // there is nothing to fold a root out of yet
    assert_matches::assert_matches!(
        tree.root_hash(),
        Err(TreeError::UnableToGetPastSize {
            past_size: 0,
            node_count: 0
        })
    );
}

#[test]
fn single_leaf_root_is_padded_to_depth() {
    let tree = string_tree(3);
    tree.add_leaf("a".to_string()).unwrap();
    // depth 0: "a" combined with itself, then again, then again (depth 3)
    let expected = "<a|a-0>";
    let expected = format!("<{}|{}-1>", expected, expected);
    let expected = format!("<{}|{}-2>", expected, expected);
    assert_eq!(tree.root_hash().unwrap(), expected);
}

#[test]
fn two_leaves_combine_at_depth_zero() {
    let tree = string_tree(3);
    tree.add_leaf("a".to_string()).unwrap();
    tree.add_leaf("b".to_string()).unwrap();
    let combined = "<a|b-0>";
    let expected = format!("<{}|{}-1>", combined, combined);
    let expected = format!("<{}|{}-2>", expected, expected);
    assert_eq!(tree.root_hash().unwrap(), expected);
}

#[test]
fn four_leaves_fill_a_depth_two_tree_exactly() {
    let tree = string_tree(2);
    for c in ["a", "b", "c", "d"] {
        tree.add_leaf(c.to_string()).unwrap();
    }
    let ab = "<a|b-0>";
    let cd = "<c|d-0>";
    let expected = format!("<{}|{}-1>", ab, cd);
    assert_eq!(tree.root_hash().unwrap(), expected);
}

#[test]
fn adding_past_depth_capacity_errors() {
    let tree = string_tree(2);
    for c in ["a", "b", "c", "d"] {
        tree.add_leaf(c.to_string()).unwrap();
    }
    let result = tree.add_leaf("e".to_string());
    assert_matches::assert_matches!(result, Err(TreeError::TreeFull(2)));
}

#[test]
fn odd_leaf_count_duplicates_the_trailing_leaf_at_its_own_depth() {
    let tree = string_tree(3);
    for c in ["a", "b", "c"] {
        tree.add_leaf(c.to_string()).unwrap();
    }
    let ab = "<a|b-0>";
    // "c" has no sibling at depth 0, so it's combined with itself there
    // rather than carried up unchanged
    let cc = "<c|c-0>";
    let expected = format!("<{}|{}-1>", ab, cc);
    let expected = format!("<{}|{}-2>", expected, expected);
    assert_eq!(tree.root_hash().unwrap(), expected);
}

#[test]
fn contains_and_leaf_index_of_track_membership() {
    let tree = string_tree(4);
    tree.add_leaf("a".to_string()).unwrap();
    tree.add_leaf("b".to_string()).unwrap();
    assert!(tree.contains(&"a".to_string()).unwrap());
    assert_eq!(tree.leaf_index_of(&"b".to_string()).unwrap(), Some(1));
    assert!(!tree.contains(&"z".to_string()).unwrap());
    assert_eq!(tree.leaf_index_of(&"z".to_string()).unwrap(), None);
}

#[test]
fn get_leaf_and_get_leaves_return_elements_in_order() {
    let tree = string_tree(4);
    for c in ["a", "b", "c"] {
        tree.add_leaf(c.to_string()).unwrap();
    }
    assert_eq!(tree.get_leaf(1).unwrap(), "b".to_string());
    assert_matches::assert_matches!(tree.get_leaf(9), Err(TreeError::NoLeafFound(9)));
    assert_eq!(
        tree.get_leaves().unwrap(),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
}

#[test]
fn witness_verifies_against_the_current_root() {
    let tree = string_tree(3);
    for c in ["a", "b", "c", "d"] {
        tree.add_leaf(c.to_string()).unwrap();
    }
    let size = tree.size().unwrap();
    for (i, c) in ["a", "b", "c", "d"].iter().enumerate() {
        let witness = tree.witness(i as u32, size).unwrap();
        assert_eq!(witness.root_hash, tree.root_hash().unwrap());
        assert!(witness.verify(&c.to_string()));
    }
}

#[test]
fn witness_fails_to_verify_against_the_wrong_leaf_hash() {
    let tree = string_tree(3);
    tree.add_leaf("a".to_string()).unwrap();
    tree.add_leaf("b".to_string()).unwrap();
    let witness = tree.witness(0, 2).unwrap();
    assert!(!witness.verify(&"not-a".to_string()));
}

#[test]
fn witness_against_a_past_size_matches_past_root() {
    let tree = string_tree(3);
    for c in ["a", "b", "c"] {
        tree.add_leaf(c.to_string()).unwrap();
    }
    // grow the tree further; the witness against the earlier size should
    // still verify against the root as of that earlier size
    tree.add_leaf("d".to_string()).unwrap();
    tree.add_leaf("e".to_string()).unwrap();

    let past_root = tree.past_root(3).unwrap();
    let witness = tree.witness(1, 3).unwrap();
    assert_eq!(witness.root_hash, past_root);
    assert!(witness.verify(&"b".to_string()));
    assert_ne!(past_root, tree.root_hash().unwrap());
}

#[test]
fn witness_out_of_range_is_an_error() {
    let tree = string_tree(3);
    tree.add_leaf("a".to_string()).unwrap();
    assert_matches::assert_matches!(tree.witness(1, 1), Err(TreeError::NoLeafFound(1)));
}

#[test]
fn past_root_beyond_current_size_is_an_error() {
    let tree = string_tree(3);
    tree.add_leaf("a".to_string()).unwrap();
    assert_matches::assert_matches!(
        tree.past_root(5),
        Err(TreeError::UnableToGetPastSize {
            past_size: 5,
            node_count: 1
        })
    );
}

#[test]
fn truncate_rolls_the_tree_back_to_an_earlier_root() {
    let tree = string_tree(3);
    for c in ["a", "b", "c"] {
        tree.add_leaf(c.to_string()).unwrap();
    }
    let root_at_three = tree.root_hash().unwrap();
    tree.add_leaf("d".to_string()).unwrap();
    tree.add_leaf("e".to_string()).unwrap();
    assert_ne!(tree.root_hash().unwrap(), root_at_three);

    tree.truncate(3).unwrap();
    assert_eq!(tree.size().unwrap(), 3);
    assert_eq!(tree.root_hash().unwrap(), root_at_three);
    assert_eq!(
        tree.get_leaves().unwrap(),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
}

#[test]
fn truncate_removes_leaf_index_entries_for_dropped_leaves() {
    let tree = string_tree(3);
    for c in ["a", "b", "c"] {
        tree.add_leaf(c.to_string()).unwrap();
    }
    tree.truncate(2).unwrap();
    assert!(!tree.contains(&"c".to_string()).unwrap());
    assert!(tree.contains(&"b".to_string()).unwrap());
}

#[test]
fn truncate_then_readd_matches_a_tree_that_never_grew_past_it() {
    let grown_then_truncated = string_tree(3);
    for c in ["a", "b", "c", "d"] {
        grown_then_truncated.add_leaf(c.to_string()).unwrap();
    }
    grown_then_truncated.truncate(2).unwrap();
    grown_then_truncated.add_leaf("x".to_string()).unwrap();

    let built_fresh = string_tree(3);
    for c in ["a", "b", "x"] {
        built_fresh.add_leaf(c.to_string()).unwrap();
    }

    assert_eq!(
        grown_then_truncated.root_hash().unwrap(),
        built_fresh.root_hash().unwrap()
    );
}

#[test]
fn truncate_to_a_larger_size_than_current_is_an_error() {
    let tree = string_tree(3);
    tree.add_leaf("a".to_string()).unwrap();
    assert_matches::assert_matches!(
        tree.truncate(5),
        Err(TreeError::UnableToGetPastSize {
            past_size: 5,
            node_count: 1
        })
    );
}

#[test]
fn add_leaf_in_and_truncate_in_compose_with_a_caller_managed_transaction() {
    let db = open_test_database();
    let tree = MerkleTree::new(db.clone(), "notes", StringHasher::new(), 3, "".to_string()).unwrap();

    let mut tx = db.transaction().unwrap();
    tree.add_leaf_in(&mut tx, "a".to_string()).unwrap();
    tree.add_leaf_in(&mut tx, "b".to_string()).unwrap();
    tx.commit().unwrap();

    assert_eq!(tree.size().unwrap(), 2);
}

#[test]
fn depth_at_leaf_count_matches_hand_computed_values() {
    assert_eq!(depth_at_leaf_count(0), 0);
    assert_eq!(depth_at_leaf_count(1), 1);
    assert_eq!(depth_at_leaf_count(2), 2);
    assert_eq!(depth_at_leaf_count(3), 3);
    assert_eq!(depth_at_leaf_count(4), 3);
    assert_eq!(depth_at_leaf_count(5), 4);
}

#[test]
fn root_hash_matches_the_worked_three_leaf_example() {
    // mirrors the canonical add-a,-b,-c walkthrough: a lone trailing leaf
    // combines with itself at its own depth before the tree pads the rest
    // of the way up to D
    let tree = string_tree(3);
    tree.add_leaf("a".to_string()).unwrap();
    let ab_only = {
        let aa = "<a|a-0>";
        let aa = format!("<{}|{}-1>", aa, aa);
        format!("<{}|{}-2>", aa, aa)
    };
    assert_eq!(tree.root_hash().unwrap(), ab_only);

    tree.add_leaf("b".to_string()).unwrap();
    let ab = {
        let combined = "<a|b-0>";
        let combined = format!("<{}|{}-1>", combined, combined);
        format!("<{}|{}-2>", combined, combined)
    };
    assert_eq!(tree.root_hash().unwrap(), ab);

    tree.add_leaf("c".to_string()).unwrap();
    let abc = {
        let ab = "<a|b-0>";
        let cc = "<c|c-0>";
        let combined = format!("<{}|{}-1>", ab, cc);
        format!("<{}|{}-2>", combined, combined)
    };
    assert_eq!(tree.root_hash().unwrap(), abc);
}

#[test]
fn count_hasher_builds_a_balanced_tree_of_the_right_depth() {
    let tree = MerkleTree::new(open_test_database(), "heights", CountHasher::new(), 4, 0).unwrap();
    for i in 0..8u64 {
        tree.add_leaf(i).unwrap();
    }
    // combine_hash always returns left + 1, so a fully padded depth-4 root is 4
    assert_eq!(tree.root_hash().unwrap(), 4);
}

#[test]
fn a_deep_witness_is_unaffected_by_a_sibling_closing_after_its_past_size() {
    // 128 leaves need a depth of at least 7 (2^7); use 8 so the tree isn't
    // exactly full and keeps growing on the right spine past leaf 74. This
    // exercises a node whose hash_of_sibling keeps getting overwritten by
    // later inserts well after leaf 74's own query window has closed — a
    // naive walk that trusts that field directly would see a later value.
    let tree = string_tree(8);
    for i in 0..128u32 {
        let label = format!("{}{}", (b'a' + (i / 26) as u8) as char, (b'a' + (i % 26) as u8) as char);
        tree.add_leaf(label).unwrap();
    }

    let past_root = tree.past_root(74).unwrap();
    let witness = tree.witness(68, 74).unwrap();
    assert_eq!(witness.root_hash, past_root);
    assert!(witness.verify(&"cq".to_string()));
}

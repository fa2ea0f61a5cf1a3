//! Model-based and behavioural tests for the stackable scope table.

use std::collections::HashMap;

use minicg::ScopeTable;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Put(String, u32),
    Remove(String),
}

/// A small key space so puts, overwrites and removes collide often.
fn key() -> impl Strategy<Value = String> {
    (0u8..40).prop_map(|n| format!("k{n}"))
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (key(), any::<u32>()).prop_map(|(k, v)| Op::Put(k, v)),
        2 => key().prop_map(Op::Remove),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Any interleaving of puts and removes agrees with a `HashMap`.
    #[test]
    fn matches_hash_map_model(ops in prop::collection::vec(op(), 0..400)) {
        let mut table = ScopeTable::new();
        let mut model = HashMap::new();

        for op in &ops {
            match op {
                Op::Put(k, v) => {
                    prop_assert_eq!(table.put(k, *v), model.insert(k.clone(), *v));
                }
                Op::Remove(k) => {
                    prop_assert_eq!(table.remove(k), model.remove(k));
                }
            }
            prop_assert_eq!(table.len(), model.len());
        }

        for n in 0u8..40 {
            let k = format!("k{n}");
            prop_assert_eq!(table.get(&k), model.get(&k));
        }

        let mut seen: Vec<(String, u32)> =
            table.iter().map(|(k, v)| (k.to_owned(), *v)).collect();
        seen.sort();
        let mut expected: Vec<(String, u32)> = model.into_iter().collect();
        expected.sort();
        prop_assert_eq!(seen, expected);
    }

    /// Lookups through a child see the child's binding first, then the parent's.
    #[test]
    fn child_shadows_parent(
        outer in prop::collection::hash_map(key(), any::<u32>(), 0..30),
        inner in prop::collection::hash_map(key(), any::<u32>(), 0..30),
    ) {
        let mut parent = ScopeTable::new();
        for (k, v) in &outer {
            parent.put(k, *v);
        }
        let mut child = ScopeTable::with_parent(&parent);
        for (k, v) in &inner {
            child.put(k, *v);
        }

        for n in 0u8..40 {
            let k = format!("k{n}");
            let expected = inner.get(&k).or_else(|| outer.get(&k));
            prop_assert_eq!(child.get(&k), expected);
            prop_assert_eq!(child.get_local(&k), inner.get(&k));
        }

        // Iteration yields every visible key exactly once, innermost value wins.
        let mut visible: HashMap<String, u32> = outer.clone();
        visible.extend(inner.iter().map(|(k, v)| (k.clone(), *v)));
        let mut seen: Vec<(String, u32)> =
            child.iter().map(|(k, v)| (k.to_owned(), *v)).collect();
        seen.sort();
        let mut expected: Vec<(String, u32)> = visible.into_iter().collect();
        expected.sort();
        prop_assert_eq!(seen, expected);
    }
}

#[test]
fn test_put_never_touches_parent() {
    let mut parent = ScopeTable::new();
    parent.put("x", 1);
    {
        let mut child = ScopeTable::with_parent(&parent);
        assert_eq!(child.put("x", 2), None);
        assert_eq!(child.get("x"), Some(&2));
    }
    assert_eq!(parent.get("x"), Some(&1));
    assert_eq!(parent.len(), 1);
}

#[test]
fn test_remove_in_child_uncovers_parent() {
    let mut parent = ScopeTable::new();
    parent.put("x", 1);
    let mut child = ScopeTable::with_parent(&parent);
    child.put("x", 2);
    assert_eq!(child.remove("x"), Some(2));
    assert_eq!(child.get("x"), Some(&1));
    // Removing a name the child never bound is a no-op.
    assert_eq!(child.remove("x"), None);
    assert_eq!(child.get("x"), Some(&1));
}

#[test]
fn test_three_level_chain() {
    let mut global = ScopeTable::new();
    global.put("a", "global-a");
    global.put("b", "global-b");
    let mut function = ScopeTable::with_parent(&global);
    function.put("b", "function-b");
    let mut block = ScopeTable::with_parent(&function);
    block.put("c", "block-c");

    assert_eq!(block.get("a"), Some(&"global-a"));
    assert_eq!(block.get("b"), Some(&"function-b"));
    assert_eq!(block.get("c"), Some(&"block-c"));
    assert_eq!(function.get("c"), None);

    let mut keys: Vec<&str> = block.iter().map(|(k, _)| k).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["a", "b", "c"]);
}

#[test]
fn test_heavy_churn_keeps_capacity_bounded() {
    let mut table = ScopeTable::new();
    for round in 0..50 {
        for i in 0..20 {
            table.put(&format!("r{round}-{i}"), i);
        }
        for i in 0..20 {
            assert_eq!(table.remove(&format!("r{round}-{i}")), Some(i));
        }
    }
    assert!(table.is_empty());
    // Tombstones are reclaimed by compaction rather than growing forever.
    assert!(table.capacity() <= 64, "capacity {}", table.capacity());
}

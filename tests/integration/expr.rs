// tests/integration/expr.rs

use std::collections::{BTreeSet, HashMap};

use taskdag::dag::unpack_all;
use taskdag::{Dependency, TaskId};

fn ids<const N: usize>() -> [TaskId; N] {
    std::array::from_fn(|_| TaskId::new())
}

#[test]
fn group_then_task_fans_in_without_inner_edges() {
    let [a, b, c] = ids();
    let expr = Dependency::group([a, b]).then(c);

    assert_eq!(expr.unpack(), BTreeSet::from([(a, c), (b, c)]));
    assert!(!expr.unpack().contains(&(a, b)));
    assert!(!expr.unpack().contains(&(b, a)));
}

#[test]
fn pipe_operator_is_sequencing() {
    let [a, b, c] = ids();
    let piped = Dependency::from(a) | b | c;
    let chained = Dependency::from(a).then(b).then(c);

    assert_eq!(piped, chained);
    assert_eq!(piped.unpack(), BTreeSet::from([(a, b), (b, c)]));
}

#[test]
fn entry_and_exit_nodes_of_nested_expressions() {
    let [a, b, c, d] = ids();
    let expr = Dependency::group([Dependency::from(a) | b, Dependency::from(c)]) | d;

    assert_eq!(expr.entry_nodes(), BTreeSet::from([a, c]));
    assert_eq!(expr.exit_nodes(), BTreeSet::from([d]));
    assert_eq!(expr.nodes(), BTreeSet::from([a, b, c, d]));
    assert_eq!(expr.unpack(), BTreeSet::from([(a, b), (b, d), (c, d)]));
}

#[test]
fn group_to_group_is_a_full_bipartite_join() {
    let [a, b, x, y] = ids();
    let expr = Dependency::group([a, b]) | Dependency::group([x, y]);

    assert_eq!(
        expr.unpack(),
        BTreeSet::from([(a, x), (a, y), (b, x), (b, y)])
    );
}

#[test]
fn lone_task_and_empty_group_produce_no_edges() {
    let [a, b] = ids();
    assert!(Dependency::from(a).unpack().is_empty());

    let empty = Dependency::group(Vec::<TaskId>::new());
    assert!(empty.unpack().is_empty());
    assert!((Dependency::from(a) | empty.clone()).unpack().is_empty());
    assert!((empty | b).unpack().is_empty());
}

#[test]
fn unpack_is_stable_and_merges_duplicates() {
    let [a, b, c] = ids();
    let first = Dependency::from(a) | b;
    let second = Dependency::from(a) | b | c;

    assert_eq!(first.unpack(), first.unpack());
    assert_eq!(
        unpack_all([&first, &second]),
        BTreeSet::from([(a, b), (b, c)])
    );
}

#[test]
fn remap_rewrites_known_ids_and_keeps_the_rest() {
    let [a, b, a2] = ids();
    let expr = Dependency::from(a) | b;
    let map = HashMap::from([(a, a2)]);

    assert_eq!(expr.remap(&map).unpack(), BTreeSet::from([(a2, b)]));
}

//! Record addressing through fetch, insert, update and delete.

use ntest::timeout;
use proptest::prelude::*;

use gridlock_core::schema::TableKind;
use gridlock_core::table::TagRecord;

use crate::helpers::{strings, Fixture};

fn seeded(n: usize) -> Fixture {
    let fx = Fixture::user_store();
    let client = fx.client();
    let s = fx.session("seed");
    let tags = TableKind::Tags.schema();
    for i in 0..n {
        client
            .insert(&s, &tags, &[format!("id{}", i), format!("r{}", i)])
            .unwrap();
    }
    fx
}

#[timeout(1000)]
#[test]
fn test_delete_order_independent() {
    let tags = TableKind::Tags.schema();
    for positions in [[4, 0, 2], [2, 0, 4], [0, 4, 2]] {
        let fx = seeded(5);
        let client = fx.client();
        let a = fx.session("A");
        client.delete(&a, &tags, &positions).unwrap();
        assert_eq!(client.fetch(&a, &tags).column_values("_tag"), vec!["r1", "r3"]);
    }
}

#[timeout(1000)]
#[test]
fn test_update_then_fetch() {
    let fx = seeded(4);
    let client = fx.client();
    let tags = TableKind::Tags.schema();
    let a = fx.session("A");

    client.locks().acquire(&a, &tags).unwrap();
    let snapshot = client.try_fetch(&a, &tags).unwrap();
    let position = snapshot.positions_matching("_tag", &["r1"])[0];
    client
        .update(&a, &tags, &[position], "_tag", &strings(&["X"]))
        .unwrap();
    client.locks().release(&a, &tags).unwrap();

    let after = client.fetch(&a, &tags);
    assert_eq!(after.column_values("_tag"), vec!["r0", "X", "r2", "r3"]);
    assert_eq!(after.records.len(), snapshot.records.len());
}

#[timeout(1000)]
#[test]
fn test_insert_interleaves_with_locked_batch() {
    let fx = seeded(3);
    let client = fx.client();
    let tags = TableKind::Tags.schema();
    let (a, b) = (fx.session("A"), fx.session("B"));

    client.locks().acquire(&a, &tags).unwrap();
    // B is not blocked by A's lock
    client
        .insert_typed(
            &b,
            &TagRecord {
                tag_id: "idB".to_string(),
                tag: "from-b".to_string(),
            },
        )
        .unwrap();
    let report = client.delete(&a, &tags, &[0]).unwrap();
    assert_eq!(report.deleted, vec![0]);
    client.locks().release(&a, &tags).unwrap();

    let tags_now: Vec<TagRecord> = client.fetch(&a, &tags).typed().unwrap();
    let names: Vec<_> = tags_now.iter().map(|t| t.tag.as_str()).collect();
    assert_eq!(names, vec!["r1", "r2", "from-b"]);
}

#[timeout(1000)]
#[test]
fn test_stale_positions_hit_shifted_rows() {
    // documents the hazard: positions from an old snapshot address new rows
    let fx = seeded(3);
    let client = fx.client();
    let tags = TableKind::Tags.schema();
    let (a, b) = (fx.session("A"), fx.session("B"));

    let stale = client.fetch(&a, &tags);
    let target = stale.positions_matching("_tag", &["r1"])[0];
    client.delete(&b, &tags, &[0]).unwrap();

    client.locks().acquire(&a, &tags).unwrap();
    client
        .update(&a, &tags, &[target], "_tag", &strings(&["X"]))
        .unwrap();
    let fresh = client.fetch(&a, &tags);
    assert_eq!(fresh.column_values("_tag"), vec!["r1", "X"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Deleting any set of positions leaves exactly the others, in order.
    #[test]
    fn prop_delete_keeps_survivors_in_order(
        n in 1usize..12,
        picks in prop::collection::vec(any::<prop::sample::Index>(), 0..12),
    ) {
        let fx = seeded(n);
        let client = fx.client();
        let tags = TableKind::Tags.schema();
        let a = fx.session("A");
        let positions: Vec<usize> = picks.iter().map(|i| i.index(n)).collect();

        client.delete(&a, &tags, &positions).unwrap();

        let expected: Vec<String> = (0..n)
            .filter(|i| !positions.contains(i))
            .map(|i| format!("r{}", i))
            .collect();
        let actual: Vec<String> = client
            .fetch(&a, &tags)
            .column_values("_tag")
            .into_iter()
            .map(str::to_string)
            .collect();
        prop_assert_eq!(actual, expected);
    }

    /// Appending keeps earlier records and puts the new one last.
    #[test]
    fn prop_append_is_last(n in 0usize..8, name in "[a-z]{1,10}") {
        let fx = seeded(n);
        let client = fx.client();
        let tags = TableKind::Tags.schema();
        let a = fx.session("A");

        client.insert(&a, &tags, &["new".to_string(), name.clone()]).unwrap();

        let snapshot = client.fetch(&a, &tags);
        prop_assert_eq!(snapshot.len(), n + 1);
        let last = snapshot.get(n).unwrap();
        prop_assert_eq!(last.get("_tag"), Some(name.as_str()));
        for i in 0..n {
            let expected = format!("r{}", i);
            prop_assert_eq!(snapshot.get(i).unwrap().get("_tag"), Some(expected.as_str()));
        }
    }
}

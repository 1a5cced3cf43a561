#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use sop_kernel_contracts::sop::{SopDraft, SopId, SopRecord};
use sop_storage::store::{SopStore, StorageError};

fn id(v: u64) -> SopId {
    SopId::new(v).unwrap()
}

fn draft(title: &str, description: &str) -> SopDraft {
    SopDraft::new(title, description)
}

fn ids(s: &SopStore) -> Vec<u64> {
    s.list_all().iter().map(|r| r.id.get()).collect()
}

#[test]
fn at_sop_db_01_inserted_ids_are_pairwise_distinct() {
    let mut s = SopStore::new_seeded();
    let mut seen = BTreeSet::new();
    seen.insert(id(1));
    for n in 0..50 {
        let rec = s.insert(draft(&format!("title {n}"), "same")).unwrap();
        assert!(seen.insert(rec.id), "id {} assigned twice", rec.id);
        if n % 7 == 0 {
            s.delete(rec.id);
        }
    }
}

#[test]
fn at_sop_db_02_kth_insert_gets_start_plus_k() {
    let mut s = SopStore::new_seeded();
    let start = 1;
    for k in 1..=10u64 {
        let rec = s.insert(draft("t", "d")).unwrap();
        assert_eq!(rec.id, id(start + k));
    }
}

#[test]
fn at_sop_db_03_deleted_id_is_never_reassigned() {
    let mut s = SopStore::new_seeded();
    s.insert(draft("a", "a")).unwrap();
    s.insert(draft("b", "b")).unwrap();
    assert!(s.delete(id(2)).is_some());
    let next = s.insert(draft("c", "c")).unwrap();
    assert_eq!(next.id, id(4));
    assert_ne!(next.id, id(2));
}

#[test]
fn at_sop_db_04_list_is_most_recent_first() {
    let mut s = SopStore::new_seeded();
    let a = s.insert(draft("A", "first")).unwrap();
    let b = s.insert(draft("B", "second")).unwrap();
    assert_eq!(ids(&s), vec![b.id.get(), a.id.get(), 1]);
}

#[test]
fn at_sop_db_05_update_is_idempotent_and_keeps_position() {
    let mut s = SopStore::new_seeded();
    s.insert(draft("Brew coffee", "Boil water")).unwrap();
    let before = ids(&s);

    let first = s.update(id(1), draft("Brew tea", "Steep 3 min"));
    let second = s.update(id(1), draft("Brew tea", "Steep 3 min"));
    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(ids(&s), before);
    assert_eq!(s.get(id(1)).map(|r| r.title.as_str()), Some("Brew tea"));
}

#[test]
fn at_sop_db_06_update_missing_id_never_creates() {
    let mut s = SopStore::new_seeded();
    assert_eq!(s.update(id(42), draft("x", "y")), None);
    assert_eq!(s.update(id(42), draft("x", "y")), None);
    assert_eq!(s.len(), 1);
    assert!(s.get(id(42)).is_none());
}

#[test]
fn at_sop_db_07_delete_missing_id_is_noop() {
    let mut s = SopStore::new_seeded();
    s.insert(draft("a", "b")).unwrap();
    let before = s.clone();
    assert_eq!(s.delete(id(99)), None);
    assert_eq!(s, before);
}

#[test]
fn at_sop_db_08_duplicate_titles_are_accepted() {
    let mut s = SopStore::new_in_memory();
    let a = s.insert(draft("Same", "one")).unwrap();
    let b = s.insert(draft("Same", "two")).unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(s.len(), 2);
}

#[test]
fn at_sop_db_09_empty_strings_and_long_text_are_stored_verbatim() {
    let mut s = SopStore::new_in_memory();
    let long = "step ".repeat(10_000);
    let rec = s.insert(draft("", &long)).unwrap();
    assert_eq!(rec.title, "");
    assert_eq!(rec.description, long);
}

#[test]
fn at_sop_db_10_exhausted_id_space_refuses_insert_instead_of_reusing() {
    let top = SopRecord::from_draft(SopId::MAX, draft("a", "b"));
    let mut s = SopStore::from_rows(vec![top.clone()]).unwrap();
    assert_eq!(
        s.insert(draft("c", "d")),
        Err(StorageError::IdSpaceExhausted { table: "sops" })
    );
    assert_eq!(s.list_all(), &[top][..]);

    assert!(s.delete(SopId::MAX).is_some());
    assert_eq!(
        s.insert(draft("c", "d")),
        Err(StorageError::IdSpaceExhausted { table: "sops" })
    );
    assert!(s.is_empty());
}

#[test]
fn at_sop_db_11_insert_below_the_cap_takes_the_last_id() {
    let below = SopId::new(SopId::MAX.get() - 1).unwrap();
    let rows = vec![SopRecord::from_draft(below, draft("a", "b"))];
    let mut s = SopStore::from_rows(rows).unwrap();
    let rec = s.insert(draft("c", "d")).unwrap();
    assert_eq!(rec.id, SopId::MAX);
    assert_eq!(ids(&s), vec![SopId::MAX.get(), below.get()]);
}

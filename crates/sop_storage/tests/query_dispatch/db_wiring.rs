#![forbid(unsafe_code)]

use sop_kernel_contracts::sop::{SopDraft, SopId, SopRecord};
use sop_storage::query::{execute, execute_statement, QueryCommand, QueryParam, QueryResult};
use sop_storage::store::{SopStore, StorageError, SEED_SOP_DESCRIPTION, SEED_SOP_TITLE};

fn id(v: u64) -> SopId {
    SopId::new(v).unwrap()
}

fn row_ids(result: &QueryResult) -> Vec<u64> {
    result.rows.iter().map(|r| r.id.get()).collect()
}

fn select(s: &mut SopStore) -> QueryResult {
    execute(s, QueryCommand::Select, &[]).unwrap()
}

#[test]
fn at_sop_dispatch_01_seed_insert_then_select() {
    let mut s = SopStore::new_seeded();
    let inserted = execute(
        &mut s,
        QueryCommand::Insert,
        &["Brew coffee".into(), "Boil water".into()],
    )
    .unwrap()
    .into_first()
    .expect("insert returns the new row");
    assert_eq!(inserted.id, id(2));
    assert_eq!(inserted.title, "Brew coffee");
    assert_eq!(inserted.description, "Boil water");

    let listed = select(&mut s);
    assert_eq!(row_ids(&listed), vec![2, 1]);
    assert_eq!(listed.rows[1].title, SEED_SOP_TITLE);
    assert_eq!(listed.rows[1].description, SEED_SOP_DESCRIPTION);
}

#[test]
fn at_sop_dispatch_02_update_keeps_id_and_order() {
    let mut s = SopStore::new_seeded();
    execute(
        &mut s,
        QueryCommand::Insert,
        &["Brew coffee".into(), "Boil water".into()],
    )
    .unwrap();

    let updated = execute(
        &mut s,
        QueryCommand::Update,
        &["Brew tea".into(), "Steep 3 min".into(), id(2).into()],
    )
    .unwrap();
    assert_eq!(updated.rows.len(), 1);
    assert_eq!(updated.rows[0].id, id(2));
    assert_eq!(updated.rows[0].title, "Brew tea");
    assert_eq!(updated.rows[0].description, "Steep 3 min");
    assert_eq!(row_ids(&select(&mut s)), vec![2, 1]);
}

#[test]
fn at_sop_dispatch_03_delete_twice_is_noop_second_time() {
    let mut s = SopStore::new_seeded();
    execute(
        &mut s,
        QueryCommand::Insert,
        &["Brew coffee".into(), "Boil water".into()],
    )
    .unwrap();

    let first = execute(&mut s, QueryCommand::Delete, &[id(1).into()]).unwrap();
    assert_eq!(row_ids(&first), vec![1]);
    assert_eq!(row_ids(&select(&mut s)), vec![2]);

    let second = execute(&mut s, QueryCommand::Delete, &[id(1).into()]).unwrap();
    assert!(second.is_empty());
    assert_eq!(row_ids(&select(&mut s)), vec![2]);
}

#[test]
fn at_sop_dispatch_04_update_missing_returns_empty_rows() {
    let mut s = SopStore::new_seeded();
    for _ in 0..2 {
        let out = execute(
            &mut s,
            QueryCommand::Update,
            &["x".into(), "y".into(), QueryParam::Int(77)],
        )
        .unwrap();
        assert!(out.is_empty());
    }
    assert_eq!(row_ids(&select(&mut s)), vec![1]);
}

#[test]
fn at_sop_dispatch_05_text_ids_from_path_segments_match() {
    let mut s = SopStore::new_seeded();
    let out = execute(
        &mut s,
        QueryCommand::Update,
        &["t".into(), "d".into(), "1".into()],
    )
    .unwrap();
    assert_eq!(row_ids(&out), vec![1]);

    let out = execute(&mut s, QueryCommand::Delete, &["one".into()]).unwrap();
    assert!(out.is_empty());
    assert_eq!(s.len(), 1);
}

#[test]
fn at_sop_dispatch_06_missing_params_surface_as_errors() {
    let mut s = SopStore::new_seeded();
    assert_eq!(
        execute(&mut s, QueryCommand::Insert, &["only title".into()]),
        Err(StorageError::ParamMissing { index: 1 })
    );
    assert_eq!(
        execute(&mut s, QueryCommand::Update, &["t".into(), "d".into()]),
        Err(StorageError::ParamMissing { index: 2 })
    );
    assert_eq!(
        execute(&mut s, QueryCommand::Delete, &[]),
        Err(StorageError::ParamMissing { index: 0 })
    );
    assert_eq!(
        execute(&mut s, QueryCommand::Insert, &[QueryParam::Int(1), "d".into()]),
        Err(StorageError::ParamType {
            index: 0,
            expected: "text",
        })
    );
    assert_eq!(s.len(), 1);
}

#[test]
fn at_sop_dispatch_07_statements_route_by_keyword() {
    let mut s = SopStore::new_seeded();
    let out = execute_statement(
        &mut s,
        "INSERT INTO sops (title, description) VALUES ($1, $2) RETURNING *",
        &["Close shop".into(), "Lock doors".into()],
    )
    .unwrap();
    assert_eq!(row_ids(&out), vec![2]);

    let out = execute_statement(&mut s, "SELECT * FROM sops ORDER BY id DESC", &[]).unwrap();
    assert_eq!(row_ids(&out), vec![2, 1]);
}

#[test]
fn at_sop_dispatch_08_unrecognized_statement_returns_no_rows() {
    let mut s = SopStore::new_seeded();
    let out = execute_statement(&mut s, "TRUNCATE sops", &[]).unwrap();
    assert_eq!(out, QueryResult::empty());
    assert_eq!(s.len(), 1);
}

#[test]
fn at_sop_dispatch_09_runs_through_trait_objects() {
    use sop_storage::repo::SopRecordRepo;

    let mut s = SopStore::new_seeded();
    let repo: &mut dyn SopRecordRepo = &mut s;
    let out = execute(&mut *repo, QueryCommand::Insert, &["a".into(), "b".into()]).unwrap();
    assert_eq!(row_ids(&out), vec![2]);
    assert_eq!(repo.sop_rows().len(), 2);
}

#[test]
fn at_sop_dispatch_10_large_ids_address_exactly_their_row() {
    let below = SopId::new(SopId::MAX.get() - 1).unwrap();
    let mut s = SopStore::from_rows(vec![
        SopRecord::from_draft(SopId::MAX, SopDraft::new("top", "t")),
        SopRecord::from_draft(below, SopDraft::new("below", "b")),
    ])
    .unwrap();
    assert_eq!(QueryParam::from(SopId::MAX), QueryParam::Int(i64::MAX));

    let out = execute(&mut s, QueryCommand::Delete, &[SopId::MAX.into()]).unwrap();
    assert_eq!(row_ids(&out), vec![SopId::MAX.get()]);
    assert_eq!(row_ids(&select(&mut s)), vec![below.get()]);

    let out = execute(&mut s, QueryCommand::Delete, &["18446744073709551615".into()]).unwrap();
    assert!(out.is_empty());
    assert_eq!(s.len(), 1);
}

#[test]
fn at_sop_dispatch_11_insert_past_the_id_cap_is_an_error() {
    let rows = vec![SopRecord::from_draft(SopId::MAX, SopDraft::new("a", "b"))];
    let mut s = SopStore::from_rows(rows).unwrap();
    assert_eq!(
        execute(&mut s, QueryCommand::Insert, &["c".into(), "d".into()]),
        Err(StorageError::IdSpaceExhausted { table: "sops" })
    );
    assert_eq!(s.len(), 1);
}

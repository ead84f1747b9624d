//! Lock, table and provisioning behaviour over HTTP.

use ntest::timeout;

use gridlock_core::address::CellAddress;
use gridlock_core::provision::Provisioner;
use gridlock_core::schema::{TableKind, UNLOCKED};
use gridlock_core::{GridBackend, GridError, LockAcquired, LockState, StoreId};

use crate::helpers::{session, strings, TestServer};

#[timeout(10000)]
#[test]
fn test_provision_over_http() {
    let server = TestServer::start();
    let store = server.store("alice-data");
    let backend = server.backend();
    backend
        .create_table(&store, "Sheet1", 1000, 26)
        .unwrap();

    let report = Provisioner::new(backend.clone())
        .setup_user_store(&session(&store, "setup"), false)
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(report.created.len(), 3);
    assert_eq!(report.removed_default.as_deref(), Some("Sheet1"));

    let tables = backend.list_tables(&store).unwrap();
    assert_eq!(tables, vec!["user_docs", "user_tags", "user_chats"]);
    let tags = TableKind::Tags.schema();
    assert_eq!(
        backend.read_cell(&store, &tags.name, tags.lock_cell).unwrap(),
        UNLOCKED
    );
}

#[timeout(10000)]
#[test]
fn test_lock_handoff_between_identities() {
    let server = TestServer::start();
    let store = server.store("shared");
    Provisioner::new(server.backend())
        .setup_user_store(&session(&store, "setup"), false)
        .unwrap();
    let tags = TableKind::Tags.schema();
    let (a, b) = (session(&store, "A"), session(&store, "B"));
    let (locks_a, locks_b) = (server.locks(), server.locks());

    assert_eq!(locks_a.acquire(&a, &tags).unwrap(), LockAcquired::Fresh);
    assert_eq!(locks_a.acquire(&a, &tags).unwrap(), LockAcquired::Reentrant);
    match locks_b.acquire(&b, &tags) {
        Err(GridError::LockTimeout { holder, .. }) => assert_eq!(holder, "A"),
        other => panic!("unexpected result {:?}", other),
    }
    assert!(matches!(
        locks_b.release(&b, &tags),
        Err(GridError::LockNotOwned { .. })
    ));

    locks_a.release(&a, &tags).unwrap();
    assert_eq!(locks_b.acquire(&b, &tags).unwrap(), LockAcquired::Fresh);
    assert_eq!(
        locks_a.status(&a, &tags).unwrap(),
        LockState::LockedBy("B".to_string())
    );
}

#[timeout(10000)]
#[test]
fn test_records_round_trip_over_http() {
    let server = TestServer::start();
    let store = server.store("shared");
    Provisioner::new(server.backend())
        .setup_user_store(&session(&store, "setup"), false)
        .unwrap();
    let client = server.client();
    let tags = TableKind::Tags.schema();
    let a = session(&store, "A");

    for i in 0..5 {
        client
            .insert(&a, &tags, &[format!("id{}", i), format!("r{}", i)])
            .unwrap();
    }
    let report = client.delete(&a, &tags, &[4, 0, 2]).unwrap();
    assert_eq!(report.deleted.len(), 3);

    client.locks().acquire(&a, &tags).unwrap();
    client
        .update(&a, &tags, &[1], "_tag", &strings(&["X"]))
        .unwrap();
    client.locks().release(&a, &tags).unwrap();

    let snapshot = client.fetch(&a, &tags);
    assert_eq!(snapshot.column_values("_tag"), vec!["r1", "X"]);
    // the server-side grid agrees with what the client sees
    let raw = server.grid.read_values(&store, &tags.name).unwrap();
    assert_eq!(raw[2][1], "X");
}

#[timeout(10000)]
#[test]
fn test_error_kinds_survive_the_wire() {
    let server = TestServer::start();
    let store = server.store("shared");
    let backend = server.backend();

    let missing = StoreId::parse("nowhere").unwrap();
    assert!(matches!(
        backend.list_tables(&missing),
        Err(GridError::StoreNotFound(_))
    ));
    assert!(matches!(
        backend.read_values(&store, "ghost"),
        Err(GridError::TableNotFound { .. })
    ));

    backend.create_table(&store, "t", 10, 3).unwrap();
    assert!(matches!(
        backend.create_table(&store, "t", 10, 3),
        Err(GridError::TableAlreadyExists(_))
    ));
    assert!(matches!(
        backend.delete_row(&store, "t", 40_000),
        Err(GridError::RowOutOfRange { row: 40_000, .. })
    ));
    assert!(matches!(
        backend.write_cell(&store, "t", CellAddress::new(0, u32::MAX), "x"),
        Err(GridError::RowOutOfRange { row: u32::MAX, .. })
    ));
    assert!(matches!(
        backend.write_cell(&store, "t", CellAddress::new(3, 1), "x"),
        Err(GridError::InvalidCellAddress(_))
    ));
    assert_eq!(server.grid.dimensions(&store, "t").unwrap(), (10, 3));

    // cells past the written area read as blank rather than failing
    assert_eq!(
        backend.read_cell(&store, "t", CellAddress::new(50, 1)).unwrap(),
        ""
    );
}

#[timeout(10000)]
#[test]
fn test_unicode_table_names() {
    let server = TestServer::start();
    let store = server.store("shared");
    let backend = server.backend();

    backend.create_table(&store, "工作表1", 10, 3).unwrap();
    backend
        .create_table(&store, "Untitled spreadsheet", 10, 3)
        .unwrap();
    backend
        .append_row(&store, "工作表1", &strings(&["数据", "a/b", "50%"]))
        .unwrap();

    let values = backend.read_values(&store, "工作表1").unwrap();
    assert_eq!(values[0], vec!["数据", "a/b", "50%"]);
    assert_eq!(
        backend.list_tables(&store).unwrap(),
        vec!["工作表1", "Untitled spreadsheet"]
    );
}

#[timeout(10000)]
#[test]
fn test_unreachable_server_is_connectivity() {
    let backend = gridlock_core::backend::HttpBackend::new(
        "http://127.0.0.1:9",
        std::time::Duration::from_millis(500),
    )
    .unwrap();
    let store = StoreId::parse("shared").unwrap();
    assert!(matches!(
        backend.list_tables(&store),
        Err(GridError::Connectivity(_))
    ));
}

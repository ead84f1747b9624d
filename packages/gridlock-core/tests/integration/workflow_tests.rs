//! Library workflows against a provisioned in-memory store.

use ntest::timeout;

use gridlock_core::library::{NewAccount, NewDocument, DEFAULT_TAG, NO_MODEL};
use gridlock_core::provision::Provisioner;
use gridlock_core::schema::TableKind;
use gridlock_core::table::ChatRole;
use gridlock_core::{GridBackend, GridError, LockState, Session, StoreId};

use crate::helpers::Fixture;

fn doc(name: &str, tag: &str) -> NewDocument {
    NewDocument {
        file_name: name.to_string(),
        summary: format!("summary of {}", name),
        tag: tag.to_string(),
    }
}

fn assert_unlocked(fx: &Fixture, session: &Session, kind: TableKind) {
    assert_eq!(
        fx.locks().status(session, &kind.schema()).unwrap(),
        LockState::Unlocked
    );
}

#[timeout(1000)]
#[test]
fn test_add_tag_rejects_duplicates() {
    let fx = Fixture::user_store();
    let library = fx.library();
    let alice = fx.session("alice");

    let physics = library.add_tag(&alice, "physics").unwrap();
    assert_eq!(physics.tag_id.len(), 8);
    assert!(matches!(
        library.add_tag(&alice, " physics "),
        Err(GridError::DuplicateRecord { .. })
    ));
    assert!(matches!(
        library.add_tag(&alice, "  "),
        Err(GridError::InvalidArgument(_))
    ));

    let tags = library.tags(&alice).unwrap();
    assert_eq!(tags.len(), 1);
    assert_unlocked(&fx, &alice, TableKind::Tags);
}

#[timeout(1000)]
#[test]
fn test_add_tag_waits_for_other_holder() {
    let fx = Fixture::user_store();
    let library = fx.library();
    let (alice, bob) = (fx.session("alice"), fx.session("bob"));

    fx.locks()
        .acquire(&bob, &TableKind::Tags.schema())
        .unwrap();
    let writes = fx.grid.write_count();
    assert!(matches!(
        library.add_tag(&alice, "physics"),
        Err(GridError::LockTimeout { .. })
    ));
    assert_eq!(fx.grid.write_count(), writes);
}

#[timeout(1000)]
#[test]
fn test_record_and_delete_documents() {
    let fx = Fixture::user_store();
    let library = fx.library();
    let alice = fx.session("alice");

    let recorded = library
        .record_documents(&alice, &[doc("a.pdf", "default"), doc("b.pdf", "default"), doc("c.pdf", "x")])
        .unwrap();
    assert_eq!(recorded.len(), 3);
    assert!(recorded.iter().all(|d| d.file_id.starts_with("alice-")));
    assert_eq!(recorded[0].length, "summary of a.pdf".len());
    assert_unlocked(&fx, &alice, TableKind::Documents);

    let removed = library
        .delete_documents(
            &alice,
            &[recorded[0].file_id.as_str(), recorded[2].file_id.as_str(), "unknown"],
        )
        .unwrap();
    assert_eq!(removed, 2);

    let docs = library.documents(&alice).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].file_name, "b.pdf");
    assert_unlocked(&fx, &alice, TableKind::Documents);
}

#[timeout(1000)]
#[test]
fn test_delete_tags_retags_documents() {
    let fx = Fixture::user_store();
    let library = fx.library();
    let alice = fx.session("alice");

    library.add_tag(&alice, DEFAULT_TAG).unwrap();
    library.add_tag(&alice, "physics").unwrap();
    library.add_tag(&alice, "math").unwrap();
    library
        .record_documents(&alice, &[doc("a.pdf", "physics"), doc("b.pdf", "math"), doc("c.pdf", "physics")])
        .unwrap();

    let removal = library.delete_tags(&alice, &["physics"]).unwrap();
    assert_eq!(removal.tags_removed, 1);
    assert_eq!(removal.retagged.applied.len(), 2);
    assert!(removal.retagged.is_complete());

    let tags: Vec<_> = library
        .tags(&alice)
        .unwrap()
        .into_iter()
        .map(|t| t.tag)
        .collect();
    assert_eq!(tags, vec!["default", "math"]);
    let doc_tags: Vec<_> = library
        .documents(&alice)
        .unwrap()
        .into_iter()
        .map(|d| d.tag)
        .collect();
    assert_eq!(doc_tags, vec!["default", "math", "default"]);
    assert_unlocked(&fx, &alice, TableKind::Tags);
    assert_unlocked(&fx, &alice, TableKind::Documents);
}

#[timeout(1000)]
#[test]
fn test_default_tag_is_protected() {
    let fx = Fixture::user_store();
    let library = fx.library();
    let alice = fx.session("alice");
    library.add_tag(&alice, DEFAULT_TAG).unwrap();

    assert!(matches!(
        library.delete_tags(&alice, &["other", DEFAULT_TAG]),
        Err(GridError::InvalidArgument(_))
    ));
    assert_eq!(library.tags(&alice).unwrap().len(), 1);
}

#[timeout(1000)]
#[test]
fn test_delete_tags_releases_tags_lock_when_documents_busy() {
    let fx = Fixture::user_store();
    let library = fx.library();
    let (alice, bob) = (fx.session("alice"), fx.session("bob"));
    library.add_tag(&alice, "physics").unwrap();
    fx.locks()
        .acquire(&bob, &TableKind::Documents.schema())
        .unwrap();

    assert!(matches!(
        library.delete_tags(&alice, &["physics"]),
        Err(GridError::LockTimeout { .. })
    ));
    assert_eq!(library.tags(&alice).unwrap().len(), 1);
    assert_unlocked(&fx, &alice, TableKind::Tags);
}

#[timeout(1000)]
#[test]
fn test_retag_documents_reports_missing() {
    let fx = Fixture::user_store();
    let library = fx.library();
    let alice = fx.session("alice");
    let recorded = library
        .record_documents(&alice, &[doc("a.pdf", "default"), doc("b.pdf", "default")])
        .unwrap();

    let report = library
        .retag_documents(&alice, &[(recorded[1].file_id.as_str(), "math"), ("ghost", "math")])
        .unwrap();
    assert_eq!(report.updated.applied, vec![1]);
    assert_eq!(report.missing, vec!["ghost"]);

    let docs = library.documents(&alice).unwrap();
    assert_eq!(docs[0].tag, "default");
    assert_eq!(docs[1].tag, "math");
}

#[timeout(1000)]
#[test]
fn test_retag_updates_every_duplicate_id() {
    let fx = Fixture::user_store();
    let library = fx.library();
    let alice = fx.session("alice");
    let recorded = library
        .record_documents(&alice, &[doc("a.pdf", "default"), doc("b.pdf", "default")])
        .unwrap();
    // a second row carrying the same id, as left by two racing inserts
    fx.client().insert_typed(&alice, &recorded[0]).unwrap();

    let report = library
        .retag_documents(&alice, &[(recorded[0].file_id.as_str(), "math")])
        .unwrap();
    assert_eq!(report.updated.applied, vec![0, 2]);
    assert!(report.missing.is_empty());

    let doc_tags: Vec<_> = library
        .documents(&alice)
        .unwrap()
        .into_iter()
        .map(|d| d.tag)
        .collect();
    assert_eq!(doc_tags, vec!["math", "default", "math"]);
}

#[timeout(1000)]
#[test]
fn test_chat_history_is_lock_free() {
    let fx = Fixture::user_store();
    let library = fx.library();
    let (alice, bob) = (fx.session("alice"), fx.session("bob"));
    fx.locks()
        .acquire(&bob, &TableKind::ChatLog.schema())
        .unwrap();

    library
        .append_chat(&alice, "f1", ChatRole::User, "What is this about?", None)
        .unwrap();
    library
        .append_chat(&alice, "f2", ChatRole::User, "Other file", None)
        .unwrap();
    let answer = library
        .append_chat(&alice, "f1", ChatRole::Assistant, "Locks.", Some("gpt-4o"))
        .unwrap();
    assert_eq!(answer.model, "gpt-4o");

    let history = library.chat_history(&alice, "f1").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, ChatRole::User);
    assert_eq!(history[0].model, NO_MODEL);
    assert_eq!(history[1].content, "Locks.");
}

fn account(user_id: &str, email: &str, store: &str) -> NewAccount {
    NewAccount {
        username: user_id.to_uppercase(),
        user_id: user_id.to_string(),
        email: email.to_string(),
        password_hash: "5e884898da28047151d0e56f8dc62942".to_string(),
        database_url: format!("https://docs.example.com/spreadsheets/d/{}/edit", store),
    }
}

#[timeout(1000)]
#[test]
fn test_register_and_deregister_account() {
    let fx = Fixture::empty("directory");
    let directory = fx.session("registrar");
    Provisioner::new(fx.grid.clone())
        .setup_directory(&directory, false)
        .unwrap();
    let user_store = StoreId::parse("alice-data").unwrap();
    fx.grid.create_store(&user_store).unwrap();
    fx.grid
        .create_table(&user_store, "Sheet1", 1000, 26)
        .unwrap();
    let library = fx.library();

    let registration = library
        .register_account(&directory, account("alice", "alice@gmail.com", "alice-data"))
        .unwrap();
    assert!(registration.provision.is_complete());
    assert_eq!(registration.provision.removed_default.as_deref(), Some("Sheet1"));
    assert_eq!(registration.default_tag.unwrap().tag, DEFAULT_TAG);

    let user = directory.for_store(user_store.clone());
    let user_tags: Vec<_> = library
        .tags(&user)
        .unwrap()
        .into_iter()
        .map(|t| t.tag)
        .collect();
    assert_eq!(user_tags, vec![DEFAULT_TAG]);
    assert_eq!(
        library
            .find_account(&directory, "alice@gmail.com")
            .unwrap()
            .unwrap()
            .user_id,
        "alice"
    );

    assert!(matches!(
        library.register_account(&directory, account("alice", "other@gmail.com", "other")),
        Err(GridError::DuplicateRecord { .. })
    ));
    assert!(matches!(
        library.register_account(&directory, account("bob", "bob@gmail.com", "alice-data")),
        Err(GridError::DuplicateRecord { .. })
    ));

    assert!(library.deregister_account(&directory, "alice").unwrap());
    assert!(!library.deregister_account(&directory, "alice").unwrap());
    assert!(library.find_account(&directory, "alice").unwrap().is_none());
    // the user's own store is left in place
    assert_eq!(fx.grid.list_tables(&user_store).unwrap().len(), 3);
    assert_unlocked(&fx, &directory, TableKind::Account);
}

#[timeout(1000)]
#[test]
fn test_register_rejects_bad_store_link_before_writing() {
    let fx = Fixture::empty("directory");
    let directory = fx.session("registrar");
    Provisioner::new(fx.grid.clone())
        .setup_directory(&directory, false)
        .unwrap();
    let library = fx.library();
    let writes = fx.grid.write_count();

    let mut bad = account("carol", "carol@gmail.com", "x");
    bad.database_url = "not a link".to_string();
    assert!(matches!(
        library.register_account(&directory, bad),
        Err(GridError::InvalidStoreReference(_))
    ));
    assert_eq!(fx.grid.write_count(), writes);
}

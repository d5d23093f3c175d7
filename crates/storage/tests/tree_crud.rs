#![forbid(unsafe_code)]

use pt_core::ids::UserId;
use pt_storage::{
    SpeciesCreateRequest, SqliteStore, StoreError, TreeCreateRequest, TreePatch,
};
use std::path::PathBuf;

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let dir = base.join(format!("pt_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn user(name: &str) -> UserId {
    UserId::try_new(name).expect("user id")
}

#[test]
fn owner_never_appears_among_collaborators() {
    let storage_dir = temp_dir("owner_never_appears_among_collaborators");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let owner = user("darwin");

    let row = store
        .tree_create(
            &owner,
            TreeCreateRequest {
                name: "Finches".to_string(),
                description: None,
                is_public: false,
                tags: Vec::new(),
                collaborators: vec![
                    "darwin".to_string(),
                    "wallace".to_string(),
                    "wallace".to_string(),
                ],
            },
        )
        .expect("create tree");
    assert_eq!(row.collaborators, vec!["wallace".to_string()]);

    let row = store
        .tree_update(
            &row.id,
            &owner,
            TreePatch {
                add_collaborators: vec!["darwin".to_string(), "hooker".to_string()],
                ..Default::default()
            },
        )
        .expect("add collaborators");
    assert_eq!(
        row.collaborators,
        vec!["wallace".to_string(), "hooker".to_string()]
    );
}

#[test]
fn description_patch_distinguishes_keep_and_clear() {
    let storage_dir = temp_dir("description_patch_distinguishes_keep_and_clear");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let owner = user("darwin");

    let row = store
        .tree_create(
            &owner,
            TreeCreateRequest {
                name: "Barnacles".to_string(),
                description: Some("eight years of them".to_string()),
                is_public: true,
                tags: Vec::new(),
                collaborators: Vec::new(),
            },
        )
        .expect("create tree");

    let untouched = store
        .tree_update(
            &row.id,
            &owner,
            TreePatch {
                name: Some("Cirripedia".to_string()),
                ..Default::default()
            },
        )
        .expect("rename only");
    assert_eq!(untouched.name, "Cirripedia");
    assert_eq!(untouched.description.as_deref(), Some("eight years of them"));

    let cleared = store
        .tree_update(
            &row.id,
            &owner,
            TreePatch {
                description: Some(None),
                ..Default::default()
            },
        )
        .expect("clear description");
    assert_eq!(cleared.description, None);

    // A blank name is ignored rather than applied.
    let kept = store
        .tree_update(
            &row.id,
            &owner,
            TreePatch {
                name: Some("   ".to_string()),
                ..Default::default()
            },
        )
        .expect("blank rename");
    assert_eq!(kept.name, "Cirripedia");
}

#[test]
fn views_are_one_per_viewer_and_refresh() {
    let storage_dir = temp_dir("views_are_one_per_viewer_and_refresh");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let owner = user("darwin");
    let reader = user("reader");

    let tree_id = store
        .tree_create(
            &owner,
            TreeCreateRequest {
                name: "Orchids".to_string(),
                description: None,
                is_public: true,
                tags: Vec::new(),
                collaborators: Vec::new(),
            },
        )
        .expect("create tree")
        .id;

    assert_eq!(store.tree_set_view(&tree_id, Some(&reader)).expect("view"), 1);
    assert_eq!(
        store.tree_set_view(&tree_id, Some(&reader)).expect("re-view"),
        1,
        "a viewer holds one view event per tree"
    );
    assert_eq!(store.tree_set_view(&tree_id, Some(&owner)).expect("view"), 2);
    assert_eq!(
        store.tree_set_view(&tree_id, None).expect("anonymous view"),
        2,
        "anonymous viewing only reads the count"
    );

    // Push the reader's stamp into the past, re-view, and confirm the refresh.
    let db_path = storage_dir.join("phylotree.db");
    {
        let conn = rusqlite::Connection::open(&db_path).expect("open db");
        conn.execute(
            "UPDATE tree_views SET viewed_at_ms=1 WHERE viewer_id='reader'",
            [],
        )
        .expect("backdate view");
    }
    store.tree_set_view(&tree_id, Some(&reader)).expect("refresh view");
    let views = store.tree_views(&tree_id, None).expect("list views");
    let reader_view = views
        .iter()
        .find(|view| view.viewer_id == "reader")
        .expect("reader view present");
    assert!(reader_view.viewed_at_ms > 1, "timestamp must refresh");
}

#[test]
fn tree_delete_cascades_to_every_dependent_record() {
    let storage_dir = temp_dir("tree_delete_cascades_to_every_dependent_record");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let owner = user("darwin");
    let reader = user("reader");

    let tree_id = store
        .tree_create(
            &owner,
            TreeCreateRequest {
                name: "Doomed".to_string(),
                description: None,
                is_public: true,
                tags: Vec::new(),
                collaborators: Vec::new(),
            },
        )
        .expect("create tree")
        .id;

    let species = store
        .species_create(
            &tree_id,
            Some(&owner),
            SpeciesCreateRequest {
                name: "Ephemeral".to_string(),
                duration: 1.0,
                ..Default::default()
            },
        )
        .expect("create species");
    let comment = store
        .comment_add(&tree_id, &reader, "lovely lineage", None)
        .expect("comment");
    store.like_tree(&tree_id, &reader).expect("like tree");
    store
        .like_species(&tree_id, &species.id, &reader)
        .expect("like species");
    store
        .like_comment(&tree_id, &comment.id, &owner)
        .expect("like comment");
    store.tree_set_view(&tree_id, Some(&reader)).expect("view");

    store.tree_delete(&tree_id, &owner).expect("delete tree");
    drop(store);

    let conn = rusqlite::Connection::open(storage_dir.join("phylotree.db")).expect("open db");
    for table in ["ph_trees", "species", "comments", "likes", "tree_views"] {
        let count: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 0, "{table} must be empty after the cascade");
    }
}

#[test]
fn likes_are_idempotent_per_user() {
    let storage_dir = temp_dir("likes_are_idempotent_per_user");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let owner = user("darwin");
    let fan = user("fan");

    let tree_id = store
        .tree_create(
            &owner,
            TreeCreateRequest {
                name: "Liked".to_string(),
                description: None,
                is_public: true,
                tags: Vec::new(),
                collaborators: Vec::new(),
            },
        )
        .expect("create tree")
        .id;

    assert_eq!(store.like_tree(&tree_id, &fan).expect("like"), 1);
    assert_eq!(store.like_tree(&tree_id, &fan).expect("re-like"), 1);
    assert_eq!(store.like_tree(&tree_id, &owner).expect("like"), 2);
    assert_eq!(store.unlike_tree(&tree_id, &fan).expect("unlike"), 1);
    assert_eq!(store.unlike_tree(&tree_id, &fan).expect("re-unlike"), 1);
}

#[test]
fn comments_validate_their_parent() {
    let storage_dir = temp_dir("comments_validate_their_parent");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let owner = user("darwin");
    let voice = user("voice");

    let tree_a = store
        .tree_create(
            &owner,
            TreeCreateRequest {
                name: "A".to_string(),
                description: None,
                is_public: true,
                tags: Vec::new(),
                collaborators: Vec::new(),
            },
        )
        .expect("create tree")
        .id;
    let tree_b = store
        .tree_create(
            &owner,
            TreeCreateRequest {
                name: "B".to_string(),
                description: None,
                is_public: true,
                tags: Vec::new(),
                collaborators: Vec::new(),
            },
        )
        .expect("create tree")
        .id;

    let parent = store
        .comment_add(&tree_a, &voice, "root comment", None)
        .expect("parent comment");
    store
        .comment_add(&tree_a, &owner, "a reply", Some(&parent.id))
        .expect("reply");

    let missing = store
        .comment_add(&tree_a, &owner, "reply to nothing", Some("cm_999999"))
        .expect_err("missing parent");
    assert!(matches!(missing, StoreError::CommentNotFound), "{missing:?}");

    let foreign = store
        .comment_add(&tree_b, &owner, "cross-tree reply", Some(&parent.id))
        .expect_err("foreign parent");
    assert!(matches!(foreign, StoreError::InvalidInput(_)), "{foreign:?}");

    let blank = store
        .comment_add(&tree_a, &owner, "   ", None)
        .expect_err("blank comment");
    assert!(matches!(blank, StoreError::InvalidInput(_)), "{blank:?}");
}

#[test]
fn comment_delete_is_author_or_tree_owner() {
    let storage_dir = temp_dir("comment_delete_is_author_or_tree_owner");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let owner = user("darwin");
    let author = user("author");
    let stranger = user("stranger");

    let tree_id = store
        .tree_create(
            &owner,
            TreeCreateRequest {
                name: "Moderated".to_string(),
                description: None,
                is_public: true,
                tags: Vec::new(),
                collaborators: Vec::new(),
            },
        )
        .expect("create tree")
        .id;

    let first = store
        .comment_add(&tree_id, &author, "first", None)
        .expect("comment");
    let second = store
        .comment_add(&tree_id, &author, "second", None)
        .expect("comment");

    let err = store
        .comment_delete(&tree_id, &first.id, &stranger)
        .expect_err("stranger delete");
    assert!(matches!(err, StoreError::AccessDenied), "{err:?}");

    store
        .comment_delete(&tree_id, &first.id, &author)
        .expect("author delete");
    store
        .comment_delete(&tree_id, &second.id, &owner)
        .expect("owner moderation delete");
}

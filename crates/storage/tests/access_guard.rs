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

fn tree(store: &mut SqliteStore, owner: &UserId, is_public: bool, collaborators: Vec<String>) -> String {
    store
        .tree_create(
            owner,
            TreeCreateRequest {
                name: "Guarded".to_string(),
                description: None,
                is_public,
                tags: Vec::new(),
                collaborators,
            },
        )
        .expect("create tree")
        .id
}

fn species(name: &str) -> SpeciesCreateRequest {
    SpeciesCreateRequest {
        name: name.to_string(),
        duration: 1.0,
        ..Default::default()
    }
}

#[test]
fn private_tree_is_closed_to_outsiders() {
    let storage_dir = temp_dir("private_tree_is_closed_to_outsiders");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let owner = user("owner");
    let collaborator = user("collab");
    let stranger = user("stranger");
    let tree_id = tree(&mut store, &owner, false, vec!["collab".to_string()]);

    let anon = store.tree_get(&tree_id, None).expect_err("anonymous read");
    assert!(matches!(anon, StoreError::AccessDenied), "{anon:?}");

    let outsider = store
        .tree_get(&tree_id, Some(&stranger))
        .expect_err("stranger read");
    assert!(matches!(outsider, StoreError::AccessDenied), "{outsider:?}");

    store.tree_get(&tree_id, Some(&owner)).expect("owner read");
    store
        .tree_get(&tree_id, Some(&collaborator))
        .expect("collaborator read");

    let write = store
        .species_create(&tree_id, Some(&stranger), species("Intruder"))
        .expect_err("stranger write");
    assert!(matches!(write, StoreError::AccessDenied), "{write:?}");
    store
        .species_create(&tree_id, Some(&collaborator), species("Welcome"))
        .expect("collaborator write");
}

#[test]
fn public_tree_is_open() {
    let storage_dir = temp_dir("public_tree_is_open");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let owner = user("owner");
    let stranger = user("stranger");
    let tree_id = tree(&mut store, &owner, true, Vec::new());

    store.tree_get(&tree_id, None).expect("anonymous read");
    store
        .species_create(&tree_id, Some(&stranger), species("Contribution"))
        .expect("stranger write to public tree");
    store
        .species_create(&tree_id, None, species("Anonymous"))
        .expect("anonymous write to public tree");
}

#[test]
fn missing_tree_reports_not_found_before_access() {
    let storage_dir = temp_dir("missing_tree_reports_not_found_before_access");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");

    let err = store.tree_get("tr_999999", None).expect_err("missing tree");
    assert!(matches!(err, StoreError::TreeNotFound), "{err:?}");
}

#[test]
fn tree_delete_is_owner_only() {
    let storage_dir = temp_dir("tree_delete_is_owner_only");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let owner = user("owner");
    let collaborator = user("collab");
    let tree_id = tree(&mut store, &owner, false, vec!["collab".to_string()]);

    let err = store
        .tree_delete(&tree_id, &collaborator)
        .expect_err("collaborator delete");
    assert!(matches!(err, StoreError::AccessDenied), "{err:?}");

    store.tree_delete(&tree_id, &owner).expect("owner delete");
    let gone = store.tree_get(&tree_id, Some(&owner)).expect_err("deleted");
    assert!(matches!(gone, StoreError::TreeNotFound), "{gone:?}");
}

#[test]
fn collaborator_revocation_is_owner_only() {
    let storage_dir = temp_dir("collaborator_revocation_is_owner_only");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let owner = user("owner");
    let collaborator = user("collab");
    let tree_id = tree(
        &mut store,
        &owner,
        false,
        vec!["collab".to_string(), "other".to_string()],
    );

    let err = store
        .tree_update(
            &tree_id,
            &collaborator,
            TreePatch {
                remove_collaborators: vec!["other".to_string()],
                ..Default::default()
            },
        )
        .expect_err("collaborator revoking another collaborator");
    assert!(matches!(err, StoreError::AccessDenied), "{err:?}");

    let row = store
        .tree_update(
            &tree_id,
            &owner,
            TreePatch {
                remove_collaborators: vec!["other".to_string()],
                ..Default::default()
            },
        )
        .expect("owner revokes");
    assert_eq!(row.collaborators, vec!["collab".to_string()]);
}

#[test]
fn species_lookup_is_scoped_to_its_tree() {
    let storage_dir = temp_dir("species_lookup_is_scoped_to_its_tree");
    let mut store = SqliteStore::open(&storage_dir).expect("open store");
    let owner = user("owner");
    let tree_a = tree(&mut store, &owner, true, Vec::new());
    let tree_b = tree(&mut store, &owner, true, Vec::new());

    let created = store
        .species_create(&tree_a, Some(&owner), species("Homed"))
        .expect("create in A");

    let err = store
        .species_get(&tree_b, &created.id, Some(&owner))
        .expect_err("lookup through the wrong tree");
    assert!(matches!(err, StoreError::ForeignSpecies { .. }), "{err:?}");
}

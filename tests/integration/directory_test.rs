//! Integration tests for the directory lifecycle.

use cloudbox_core::config::TrashLayout;
use cloudbox_core::error::ErrorKind;
use cloudbox_database::{FaultPoint, MetadataStore};
use cloudbox_entity::file::FileKey;
use cloudbox_storage::BytesBlob;

use crate::helpers::{self, TestApp};

async fn seed(app: &TestApp, keys: &[FileKey]) {
    for key in keys {
        app.gateway
            .upload(key, &mut BytesBlob::new(key.to_string()))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_rename_moves_only_the_subtree() {
    let app = TestApp::new(TrashLayout::Mirrored);
    let inside = FileKey::new("a", "txt", "/projects");
    let nested = FileKey::new("b", "txt", "/projects/alpha");
    let sibling = FileKey::new("c", "txt", "/projects-old");
    seed(&app, &[inside.clone(), nested.clone(), sibling.clone()]).await;

    let summary = app
        .gateway
        .directories()
        .rename("/projects", "/archive/projects")
        .await
        .unwrap();
    assert_eq!(summary.files_moved, 2);
    assert_eq!(summary.directories_moved, 2);

    assert!(!app.root("/projects").exists());
    assert_eq!(
        helpers::read(&app.root("/archive/projects/alpha/b.txt")),
        nested.to_string().as_bytes()
    );
    assert_eq!(
        helpers::read(&app.root("/projects-old/c.txt")),
        sibling.to_string().as_bytes()
    );

    let moved = app.store.list_files_by_path("/archive/projects").await.unwrap();
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].file_name, "a");
    assert!(app.store.find_file(&sibling).await.unwrap().is_some());
    assert!(app.store.find_directory("/archive").await.unwrap().is_some());
    assert!(app.store.find_directory("/projects").await.unwrap().is_none());
}

#[tokio::test]
async fn test_rename_into_itself_is_rejected() {
    let app = TestApp::new(TrashLayout::Mirrored);
    app.gateway.directories().create_if_absent("/a").await.unwrap();

    let err = app
        .gateway
        .directories()
        .rename("/a", "/a/b")
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(app.root("/a").is_dir());
}

#[tokio::test]
async fn test_rename_carries_trashed_files_along() {
    let app = TestApp::new(TrashLayout::Mirrored);
    let key = FileKey::new("old", "log", "/logs");
    seed(&app, std::slice::from_ref(&key)).await;
    app.gateway.delete(&key).await.unwrap();

    app.gateway
        .directories()
        .rename("/logs", "/history")
        .await
        .unwrap();

    let moved = FileKey::new("old", "log", "/history");
    app.gateway.restore(&moved).await.unwrap();
    assert_eq!(
        helpers::read(&app.root("/history/old.log")),
        key.to_string().as_bytes()
    );
}

#[tokio::test]
async fn test_delete_trashes_subtree_and_rows() {
    let app = TestApp::new(TrashLayout::Mirrored);
    let keys = [
        FileKey::new("one", "txt", "/tmp"),
        FileKey::new("two", "txt", "/tmp/deep"),
    ];
    seed(&app, &keys).await;
    let keep = FileKey::new("three", "txt", "/tmpfiles");
    seed(&app, std::slice::from_ref(&keep)).await;

    let deletion = app.gateway.directories().delete("/tmp").await.unwrap();
    assert_eq!(deletion.summary.files_removed, 2);
    assert_eq!(deletion.summary.directories_removed, 2);
    let trashed_to = app.paths.directory_trash_path("/tmp");
    assert_eq!(deletion.trashed_to, Some(trashed_to.clone()));

    assert!(!app.root("/tmp").exists());
    assert!(trashed_to.join("deep/two.txt").is_file());
    assert!(app.store.find_directory("/tmp").await.unwrap().is_none());
    assert!(app.store.find_file(&keep).await.unwrap().is_some());
}

#[tokio::test]
async fn test_delete_is_all_or_nothing() {
    let app = TestApp::new(TrashLayout::Mirrored);
    let key = FileKey::new("doc", "odt", "/shared");
    seed(&app, std::slice::from_ref(&key)).await;

    app.store.fail_on(FaultPoint::DeleteDirectoryFiles);
    let err = app.gateway.directories().delete("/shared").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Database);
    assert!(app.store.find_directory("/shared").await.unwrap().is_some());
    assert!(app.store.find_file(&key).await.unwrap().is_some());

    // A second attempt finishes the rows without touching disk again.
    app.store.clear_fault(FaultPoint::DeleteDirectoryFiles);
    let deletion = app.gateway.directories().delete("/shared").await.unwrap();
    assert_eq!(deletion.trashed_to, None);
    assert_eq!(deletion.summary.files_removed, 1);
    assert!(app.store.find_directory("/shared").await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_if_absent_adopts_existing_directory() {
    let app = TestApp::new(TrashLayout::Mirrored);
    std::fs::create_dir_all(app.root("/external/inner")).unwrap();

    let dir = app
        .gateway
        .directories()
        .create_if_absent("/external/inner")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(dir.path, "/external/inner");
    assert!(app.store.find_directory("/external").await.unwrap().is_some());

    let again = app
        .gateway
        .directories()
        .create_if_absent("/external/inner")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.id, dir.id);
}

//! Integration tests for the file lifecycle.

use cloudbox_core::config::TrashLayout;
use cloudbox_core::error::ErrorKind;
use cloudbox_database::MetadataStore;
use cloudbox_entity::file::{FileKey, FileState};
use cloudbox_storage::BytesBlob;

use crate::helpers::{self, TestApp};

#[tokio::test]
async fn test_upload_delete_restore_flat_trash() {
    let app = TestApp::new(TrashLayout::Flat);
    app.gateway.directories().create_if_absent("/docs").await.unwrap();
    let key = FileKey::new("report", "pdf", "/docs");

    let uploaded = app
        .gateway
        .upload(&key, &mut BytesBlob::new("quarterly numbers"))
        .await
        .unwrap();
    assert_eq!(uploaded.state, FileState::Active);
    assert_eq!(helpers::read(&app.root("/docs/report.pdf")), b"quarterly numbers");

    let trashed = app.gateway.delete(&key).await.unwrap();
    assert!(trashed.deleted_at.is_some());
    assert!(!app.root("/docs/report.pdf").exists());
    assert_eq!(helpers::read(&app.trash("/report.pdf")), b"quarterly numbers");

    let restored = app.gateway.restore(&key).await.unwrap();
    assert_eq!(restored.id, uploaded.id);
    assert!(restored.deleted_at.is_none());
    assert_eq!(helpers::read(&app.root("/docs/report.pdf")), b"quarterly numbers");
    assert!(!app.trash("/report.pdf").exists());
}

#[tokio::test]
async fn test_mirrored_trash_keeps_directory() {
    let app = TestApp::new(TrashLayout::Mirrored);
    let key = FileKey::new("report", "pdf", "/docs/2024");
    app.gateway
        .upload(&key, &mut BytesBlob::new("q4"))
        .await
        .unwrap();

    app.gateway.delete(&key).await.unwrap();
    assert_eq!(helpers::read(&app.trash("/docs/2024/report.pdf")), b"q4");
}

#[tokio::test]
async fn test_find_file_matches_computed_path() {
    let app = TestApp::new(TrashLayout::Mirrored);
    let key = FileKey::new("notes", "md", "/work/meetings");
    app.gateway
        .upload(&key, &mut BytesBlob::new("# standup"))
        .await
        .unwrap();

    let found = app.store.find_file(&key).await.unwrap().unwrap();
    assert_eq!(found.key(), key);
    assert_eq!(
        app.paths.file_path(&found.key()),
        app.root("/work/meetings/notes.md")
    );
    assert_eq!(helpers::read(&app.paths.file_path(&key)), b"# standup");
}

#[tokio::test]
async fn test_empty_fields_are_rejected_individually() {
    let app = TestApp::new(TrashLayout::Mirrored);
    let cases = [
        (FileKey::new("", "pdf", "/docs"), "file_name"),
        (FileKey::new("report", "", "/docs"), "extension"),
        (FileKey::new("report", "pdf", ""), "path"),
    ];

    for (key, field) in cases {
        let err = app
            .gateway
            .upload(&key, &mut BytesBlob::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation, "{key:?}");
        assert_eq!(err.field, Some(field), "{key:?}");
    }
    assert!(app.store.list_files().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_upload_leaves_original_untouched() {
    let app = TestApp::new(TrashLayout::Mirrored);
    let key = FileKey::new("photo", "jpg", "/pictures");
    let original = app
        .gateway
        .upload(&key, &mut BytesBlob::new("first"))
        .await
        .unwrap();

    let err = app
        .gateway
        .upload(&key, &mut BytesBlob::new("second"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(helpers::read(&app.root("/pictures/photo.jpg")), b"first");

    let rows = app.store.list_files().await.unwrap();
    assert_eq!(rows, vec![original]);
}

#[tokio::test]
async fn test_reupload_after_delete_is_allowed() {
    let app = TestApp::new(TrashLayout::Mirrored);
    let key = FileKey::new("draft", "txt", "/notes");
    app.gateway
        .upload(&key, &mut BytesBlob::new("v1"))
        .await
        .unwrap();
    app.gateway.delete(&key).await.unwrap();

    app.gateway
        .upload(&key, &mut BytesBlob::new("v2"))
        .await
        .unwrap();
    assert_eq!(helpers::read(&app.root("/notes/draft.txt")), b"v2");

    // The trashed copy cannot come back while the name is taken.
    let err = app.gateway.restore(&key).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn test_restore_not_found_and_ambiguous() {
    let app = TestApp::new(TrashLayout::Flat);
    let key = FileKey::new("ledger", "csv", "/finance");

    let err = app.gateway.restore(&key).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    app.gateway.directories().create_if_absent("/finance").await.unwrap();
    app.store.insert_trashed(&key).await.unwrap();
    app.store.insert_trashed(&key).await.unwrap();
    let err = app.gateway.restore(&key).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected() {
    let app = TestApp::new(TrashLayout::Mirrored);
    let key = FileKey::new("huge", "bin", "/blobs");
    let data = vec![0u8; helpers::MAX_UPLOAD as usize + 1];

    let err = app
        .gateway
        .upload(&key, &mut BytesBlob::new(data))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(!app.root("/blobs/huge.bin").exists());
    assert!(app.store.list_files().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_download_streams_uploaded_bytes() {
    use futures::StreamExt;

    let app = TestApp::new(TrashLayout::Mirrored);
    let key = FileKey::new("song", "ogg", "/music");
    let file = app
        .gateway
        .upload(&key, &mut BytesBlob::new("la la la"))
        .await
        .unwrap();

    let (found, mut stream) = app.gateway.files().open_file(file.id).await.unwrap();
    assert_eq!(found.id, file.id);
    let mut bytes = Vec::new();
    while let Some(chunk) = stream.next().await {
        bytes.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(bytes, b"la la la");
}

#[tokio::test]
async fn test_deleted_directory_area_is_reserved() {
    let app = TestApp::new(TrashLayout::Mirrored);
    let key = FileKey::new("x", "txt", "/.directories/docs");

    let err = app
        .gateway
        .upload(&key, &mut BytesBlob::new("x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(err.field, Some("path"));
    assert!(!app.root("/.directories").exists());
}

//! Integration tests for the orphan audit.

use cloudbox_core::config::TrashLayout;
use cloudbox_database::FaultPoint;
use cloudbox_entity::file::FileKey;
use cloudbox_storage::BytesBlob;

use crate::helpers::TestApp;

#[tokio::test]
async fn test_failed_row_insert_shows_up_as_untracked() {
    let app = TestApp::new(TrashLayout::Flat);
    let key = FileKey::new("scan", "png", "/inbox");

    app.store.fail_on(FaultPoint::CreateFile);
    app.gateway
        .upload(&key, &mut BytesBlob::new("pixels"))
        .await
        .unwrap_err();
    assert!(app.root("/inbox/scan.png").is_file());

    let report = app.reconciler.reconcile_orphans().await.unwrap();
    assert_eq!(report.untracked_files, vec![app.root("/inbox/scan.png")]);
    assert_eq!(report.len(), 1);
}

#[tokio::test]
async fn test_restore_retry_after_failed_commit() {
    let app = TestApp::new(TrashLayout::Flat);
    let key = FileKey::new("memo", "txt", "/desk");
    app.gateway
        .upload(&key, &mut BytesBlob::new("remember"))
        .await
        .unwrap();
    app.gateway.delete(&key).await.unwrap();

    app.store.fail_on(FaultPoint::RestoreFile);
    app.gateway.restore(&key).await.unwrap_err();
    assert!(app.root("/desk/memo.txt").is_file());
    assert!(!app.reconciler.reconcile_orphans().await.unwrap().is_clean());

    app.store.clear_fault(FaultPoint::RestoreFile);
    app.gateway.restore(&key).await.unwrap();
    assert!(app.reconciler.reconcile_orphans().await.unwrap().is_clean());
}

#[tokio::test]
async fn test_directory_delete_leaves_report_clean() {
    let app = TestApp::new(TrashLayout::Mirrored);
    let key = FileKey::new("a", "txt", "/docs");
    app.gateway.directories().create_if_absent("/docs").await.unwrap();
    app.gateway
        .upload(&key, &mut BytesBlob::new("first"))
        .await
        .unwrap();
    app.gateway.directories().delete("/docs").await.unwrap();

    // Same path again: its file trash slot is still free.
    app.gateway.directories().create_if_absent("/docs").await.unwrap();
    app.gateway
        .upload(&key, &mut BytesBlob::new("second"))
        .await
        .unwrap();
    app.gateway.delete(&key).await.unwrap();

    let report = app.reconciler.reconcile_orphans().await.unwrap();
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(
        report.deleted_directory_files,
        vec![app.paths.directory_trash_path("/docs").join("a.txt")]
    );
}

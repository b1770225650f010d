//! File lifecycle tests against the service layer.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use filecab::db::NewUser;
use filecab::file::{
    BlobError, BlobStore, FileLocation, FileService, LocalBlobStore, RetryPolicy,
    RetryingBlobStore, StagingArea, StoredBlob, ALL_FILES, TRASH,
};
use filecab::{Database, FilecabError, UserRepository};

/// Store whose `put` fails transiently a fixed number of times.
struct Flaky {
    inner: LocalBlobStore,
    failures: u32,
    calls: AtomicU32,
}

#[async_trait]
impl BlobStore for Flaky {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<StoredBlob, BlobError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(BlobError::Transient("service unavailable".into()));
        }
        self.inner.put(name, bytes).await
    }

    async fn delete(&self, handle: &str) -> Result<(), BlobError> {
        self.inner.delete(handle).await
    }
}

struct Fixture {
    db: Database,
    service: Arc<FileService>,
    user_id: i64,
    temp: TempDir,
}

async fn setup_with(failures: u32) -> (Fixture, Arc<RetryingBlobStore<Flaky>>) {
    let temp = TempDir::new().unwrap();
    let db = Database::open(temp.path().join("filecab.db"), 5)
        .await
        .unwrap();
    let user = UserRepository::new(db.pool())
        .create(&NewUser::new("alice", "hash"))
        .await
        .unwrap();

    let store = Arc::new(RetryingBlobStore::new(
        Flaky {
            inner: LocalBlobStore::new(temp.path().join("blobs"), "/blobs").unwrap(),
            failures,
            calls: AtomicU32::new(0),
        },
        RetryPolicy::new(3, Duration::from_millis(1)),
    ));
    let staging = StagingArea::new(temp.path().join("uploads")).unwrap();
    let service = Arc::new(FileService::new(db.clone(), store.clone(), staging, 1024 * 1024));

    let fixture = Fixture {
        db,
        service,
        user_id: user.id,
        temp,
    };
    (fixture, store)
}

async fn setup() -> Fixture {
    setup_with(0).await.0
}

fn staged_files(temp: &TempDir) -> usize {
    std::fs::read_dir(temp.path().join("uploads"))
        .unwrap()
        .count()
}

#[tokio::test]
async fn test_concurrent_ensure_creates_one_of_each() {
    let fx = setup().await;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = fx.service.clone();
            let user_id = fx.user_id;
            tokio::spawn(async move { service.ensure_reserved_folders(user_id).await })
        })
        .collect();

    let mut trash_ids = Vec::new();
    for task in tasks {
        let reserved = task.await.unwrap().unwrap();
        trash_ids.push(reserved.trash.id);
    }
    trash_ids.dedup();
    assert_eq!(trash_ids.len(), 1);

    let folders = fx.service.list_folders(fx.user_id).await.unwrap();
    let count = |name: &str| folders.iter().filter(|f| f.folder.name == name).count();
    assert_eq!(count(ALL_FILES), 1);
    assert_eq!(count(TRASH), 1);
}

#[tokio::test]
async fn test_trash_restore_round_trip() {
    let fx = setup().await;
    let folder = fx.service.create_folder(fx.user_id, "F1").await.unwrap();

    let staged = fx
        .service
        .staging()
        .stage("report.pdf", &vec![0u8; 4096])
        .await
        .unwrap();
    let file = fx.service.upload(fx.user_id, folder.id, staged).await.unwrap();

    let trashed = fx.service.move_to_trash(fx.user_id, file.id).await.unwrap();
    assert_eq!(trashed.location.origin(), Some(folder.id));

    let restored = fx.service.restore(fx.user_id, file.id).await.unwrap();
    assert!(!restored.origin_missing);
    assert_eq!(
        restored.file.location,
        FileLocation::Active {
            folder_id: folder.id
        }
    );
    assert_eq!(restored.file.blob_handle, file.blob_handle);
}

#[tokio::test]
async fn test_permanent_delete_of_active_file_forbidden() {
    let fx = setup().await;
    let folder = fx.service.create_folder(fx.user_id, "F1").await.unwrap();
    let staged = fx.service.staging().stage("a.txt", b"a").await.unwrap();
    let file = fx.service.upload(fx.user_id, folder.id, staged).await.unwrap();

    let err = fx
        .service
        .permanently_delete(fx.user_id, file.id)
        .await
        .unwrap_err();
    assert!(matches!(err, FilecabError::Permission(_)));
    assert!(fx.service.get_file(fx.user_id, file.id).await.is_ok());
}

#[tokio::test]
async fn test_reserved_folders_protected() {
    let fx = setup().await;
    let reserved = fx.service.ensure_reserved_folders(fx.user_id).await.unwrap();
    fx.service.create_folder(fx.user_id, "Projects").await.unwrap();

    let long_name = "x".repeat(101);
    let candidates = [
        "Other",
        "Projects",
        ALL_FILES,
        TRASH,
        "   ",
        long_name.as_str(),
        "a\u{7}b",
    ];

    for folder in [&reserved.all_files, &reserved.trash] {
        for name in candidates {
            let err = fx
                .service
                .rename_folder(fx.user_id, folder.id, name)
                .await
                .unwrap_err();
            assert!(
                matches!(err, FilecabError::Permission(_)),
                "renaming {:?} to {name:?} gave {err:?}",
                folder.name
            );
        }

        let err = fx
            .service
            .delete_folder(fx.user_id, folder.id)
            .await
            .unwrap_err();
        assert!(matches!(err, FilecabError::Permission(_)));
    }

    let reloaded = fx.service.ensure_reserved_folders(fx.user_id).await.unwrap();
    assert_eq!(reloaded.all_files.id, reserved.all_files.id);
    assert_eq!(reloaded.trash.id, reserved.trash.id);
}

#[tokio::test]
async fn test_upload_recovers_from_transient_failures() {
    let (fx, store) = setup_with(2).await;
    let folder = fx.service.create_folder(fx.user_id, "F1").await.unwrap();

    let staged = fx.service.staging().stage("a.txt", b"abc").await.unwrap();
    let file = fx.service.upload(fx.user_id, folder.id, staged).await.unwrap();

    assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
    assert_eq!(file.size, 3);
    assert_eq!(staged_files(&fx.temp), 0);
}

#[tokio::test]
async fn test_upload_fails_after_retries_exhausted() {
    let (fx, store) = setup_with(3).await;
    let folder = fx.service.create_folder(fx.user_id, "F1").await.unwrap();

    let staged = fx.service.staging().stage("a.txt", b"abc").await.unwrap();
    let err = fx
        .service
        .upload(fx.user_id, folder.id, staged)
        .await
        .unwrap_err();

    assert!(matches!(err, FilecabError::UploadFailed { attempts: 3, .. }));
    assert_eq!(store.inner().calls.load(Ordering::SeqCst), 3);
    assert!(fx
        .service
        .list_folder_files(fx.user_id, folder.id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(staged_files(&fx.temp), 0);

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM files")
        .fetch_one(fx.db.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

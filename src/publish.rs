//! Walk a file tree and hand every file to an [`Uploader`].
//!
//! Entries are processed one at a time. The first failure aborts the run;
//! objects uploaded before it stay in the store.

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::time::{Duration, Instant};
use tracing::info;

use crate::error::{PublishError, Result, UploadError};
use crate::fs::{Body, Entry, FileSystem};
use crate::s3::content_type_for;

/// A single file ready to be uploaded
pub struct UploadObject {
    /// Destination key, the file path relative to the walk root
    pub path: String,
    /// Unread file contents
    pub body: Body,
    /// MIME type, empty when unknown
    pub content_type: String,
}

impl fmt::Debug for UploadObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadObject")
            .field("path", &self.path)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Stores uploaded objects in a remote location
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Store the object. The body is consumed by this call and closed when
    /// it returns.
    async fn upload(&self, object: UploadObject) -> std::result::Result<(), UploadError>;

    /// Whether `upload` only reports what it would store
    fn dry_run(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Directory,
    Uploaded,
    /// Handed to a dry-run uploader, nothing was stored
    Rehearsed,
}

/// Turns walk entries into uploads
pub struct Dispatcher<'a> {
    fs: &'a dyn FileSystem,
    uploader: &'a dyn Uploader,
}

impl<'a> Dispatcher<'a> {
    pub fn new(fs: &'a dyn FileSystem, uploader: &'a dyn Uploader) -> Self {
        Self { fs, uploader }
    }

    /// Handle one walk entry
    ///
    /// Directories are skipped since object stores key objects by plain
    /// strings that merely look like paths.
    pub async fn dispatch(&self, path: &str, entry: io::Result<Entry>) -> Result<Dispatched> {
        let entry = entry.map_err(|source| PublishError::WalkAccess {
            path: path.to_string(),
            source,
        })?;

        if entry.is_dir {
            info!("Found directory: {}", path);
            return Ok(Dispatched::Directory);
        }

        let content_type = content_type_for(path);

        let body = self.fs.open(path).map_err(|source| PublishError::Open {
            path: path.to_string(),
            source,
        })?;

        self.uploader
            .upload(UploadObject {
                path: path.to_string(),
                body,
                content_type,
            })
            .await
            .map_err(|source| PublishError::Upload {
                path: path.to_string(),
                source,
            })?;

        if self.uploader.dry_run() {
            return Ok(Dispatched::Rehearsed);
        }

        info!("Uploaded {}", path);
        Ok(Dispatched::Uploaded)
    }
}

/// Outcome of a completed walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishSummary {
    pub uploaded: usize,
    /// Files a dry run would have uploaded
    pub rehearsed: usize,
    pub directories: usize,
    pub elapsed: Duration,
}

/// Upload every file in `fs`, stopping at the first error
pub async fn publish(fs: &dyn FileSystem, uploader: &dyn Uploader) -> Result<PublishSummary> {
    let start = Instant::now();
    let dispatcher = Dispatcher::new(fs, uploader);
    let mut uploaded = 0;
    let mut rehearsed = 0;
    let mut directories = 0;

    for (path, entry) in fs.walk() {
        match dispatcher.dispatch(&path, entry).await? {
            Dispatched::Directory => directories += 1,
            Dispatched::Uploaded => uploaded += 1,
            Dispatched::Rehearsed => rehearsed += 1,
        }
    }

    Ok(PublishSummary {
        uploaded,
        rehearsed,
        directories,
        elapsed: start.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::memory::MemFs;
    use std::sync::Mutex;
    use tokio::io::AsyncReadExt;

    /// What the recording uploader saw for one call
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Received {
        path: String,
        content_type: String,
        body: String,
    }

    #[derive(Default)]
    struct RecordingUploader {
        fail_with: Option<String>,
        received: Mutex<Vec<Received>>,
    }

    impl RecordingUploader {
        fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Default::default()
            }
        }

        fn received(&self) -> Vec<Received> {
            self.received.lock().unwrap().clone()
        }

        fn last(&self) -> Option<Received> {
            self.received().last().cloned()
        }
    }

    #[async_trait]
    impl Uploader for RecordingUploader {
        async fn upload(&self, mut object: UploadObject) -> std::result::Result<(), UploadError> {
            if let Some(message) = &self.fail_with {
                return Err(UploadError::Store(message.clone()));
            }

            let mut body = String::new();
            object.body.read_to_string(&mut body).await?;
            self.received.lock().unwrap().push(Received {
                path: object.path,
                content_type: object.content_type,
                body,
            });
            Ok(())
        }
    }

    fn file_entry(path: &str) -> io::Result<Entry> {
        Ok(Entry {
            path: path.to_string(),
            is_dir: false,
        })
    }

    #[tokio::test]
    async fn test_walk_error_uploads_nothing() {
        let fs = MemFs::new().with_file("foo.txt", "some body");
        let uploader = RecordingUploader::default();
        let dispatcher = Dispatcher::new(&fs, &uploader);

        let err = dispatcher
            .dispatch("foo.txt", Err(io::Error::other("some error")))
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::WalkAccess { .. }));
        assert_eq!(err.path(), Some("foo.txt"));
        assert!(uploader.last().is_none());
    }

    #[tokio::test]
    async fn test_directory_is_skipped() {
        let fs = MemFs::new();
        let uploader = RecordingUploader::default();
        let dispatcher = Dispatcher::new(&fs, &uploader);

        let result = dispatcher
            .dispatch("foo/bar", Ok(Entry::dir("foo/bar")))
            .await
            .unwrap();

        assert_eq!(result, Dispatched::Directory);
        assert!(uploader.last().is_none());
    }

    #[tokio::test]
    async fn test_open_error_uploads_nothing() {
        let fs = MemFs::new().with_broken_file("foo.txt", "can't be opened");
        let uploader = RecordingUploader::default();
        let dispatcher = Dispatcher::new(&fs, &uploader);

        let err = dispatcher
            .dispatch("foo.txt", file_entry("foo.txt"))
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Open { .. }));
        assert!(err.to_string().contains("can't be opened"));
        assert!(uploader.last().is_none());
    }

    #[tokio::test]
    async fn test_missing_file_is_open_error() {
        let fs = MemFs::new();
        let uploader = RecordingUploader::default();
        let dispatcher = Dispatcher::new(&fs, &uploader);

        let err = dispatcher
            .dispatch("gone.txt", file_entry("gone.txt"))
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::Open { .. }));
    }

    #[tokio::test]
    async fn test_upload_error_is_reported() {
        let fs = MemFs::new().with_file("foo.txt", "some body");
        let uploader = RecordingUploader::failing("failed to upload");
        let dispatcher = Dispatcher::new(&fs, &uploader);

        let err = dispatcher
            .dispatch("foo.txt", file_entry("foo.txt"))
            .await
            .unwrap_err();

        match err {
            PublishError::Upload { path, source } => {
                assert_eq!(path, "foo.txt");
                assert!(matches!(source, UploadError::Store(ref m) if m == "failed to upload"));
            }
            other => panic!("expected upload error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_successful_upload() {
        let fs = MemFs::new().with_file("foo.txt", "some body");
        let uploader = RecordingUploader::default();
        let dispatcher = Dispatcher::new(&fs, &uploader);

        let result = dispatcher
            .dispatch("foo.txt", file_entry("foo.txt"))
            .await
            .unwrap();

        assert_eq!(result, Dispatched::Uploaded);
        assert_eq!(
            uploader.last(),
            Some(Received {
                path: "foo.txt".to_string(),
                content_type: "text/plain; charset=utf-8".to_string(),
                body: "some body".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_successful_javascript_upload() {
        let fs = MemFs::new().with_file("app/index.js", "let foo = 'bar';");
        let uploader = RecordingUploader::default();
        let dispatcher = Dispatcher::new(&fs, &uploader);

        dispatcher
            .dispatch("app/index.js", file_entry("app/index.js"))
            .await
            .unwrap();

        let got = uploader.last().unwrap();
        assert_eq!(got.path, "app/index.js");
        assert_eq!(got.content_type, "application/javascript");
        assert_eq!(got.body, "let foo = 'bar';");
    }

    #[tokio::test]
    async fn test_unknown_extension_has_empty_content_type() {
        let fs = MemFs::new().with_file("LICENSE", "MIT");
        let uploader = RecordingUploader::default();

        Dispatcher::new(&fs, &uploader)
            .dispatch("LICENSE", file_entry("LICENSE"))
            .await
            .unwrap();

        assert_eq!(uploader.last().unwrap().content_type, "");
    }

    #[tokio::test]
    async fn test_publish_uploads_every_file() {
        let fs = MemFs::new()
            .with_file("foo.txt", "some body")
            .with_file("app/index.js", "let foo = 'bar';");
        let uploader = RecordingUploader::default();

        let summary = publish(&fs, &uploader).await.unwrap();

        assert_eq!(summary.uploaded, 2);
        assert_eq!(summary.rehearsed, 0);
        assert_eq!(summary.directories, 2);
        assert_eq!(
            uploader.received(),
            vec![
                Received {
                    path: "app/index.js".to_string(),
                    content_type: "application/javascript".to_string(),
                    body: "let foo = 'bar';".to_string(),
                },
                Received {
                    path: "foo.txt".to_string(),
                    content_type: "text/plain; charset=utf-8".to_string(),
                    body: "some body".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_publish_stops_at_first_failure() {
        let fs = MemFs::new()
            .with_file("a.txt", "a")
            .with_broken_file("b.txt", "permission denied")
            .with_file("c.txt", "c");
        let uploader = RecordingUploader::default();

        let err = publish(&fs, &uploader).await.unwrap_err();

        assert_eq!(err.path(), Some("b.txt"));
        // a.txt stays uploaded, c.txt is never reached
        let paths: Vec<String> = uploader.received().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_publish_aborts_on_unreadable_directory() {
        let fs = MemFs::new()
            .with_unreadable_dir("private")
            .with_file("z.txt", "z");
        let uploader = RecordingUploader::default();

        let err = publish(&fs, &uploader).await.unwrap_err();

        assert!(matches!(err, PublishError::WalkAccess { ref path, .. } if path == "private"));
        assert!(uploader.received().is_empty());
    }

    #[tokio::test]
    async fn test_publish_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("foo.txt"), "some body").unwrap();
        std::fs::create_dir(dir.path().join("app")).unwrap();
        std::fs::write(dir.path().join("app/index.js"), "let foo = 'bar';").unwrap();

        let fs = crate::fs::LocalFs::new(dir.path());
        let uploader = RecordingUploader::default();

        let summary = publish(&fs, &uploader).await.unwrap();

        assert_eq!(summary.uploaded, 2);
        let received = uploader.received();
        assert_eq!(received[0].path, "app/index.js");
        assert_eq!(received[0].body, "let foo = 'bar';");
        assert_eq!(received[1].path, "foo.txt");
        assert_eq!(received[1].body, "some body");
    }
}

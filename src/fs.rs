//! Filesystem capability used by the publisher.
//!
//! All paths are relative to the filesystem root and use `/` as the
//! separator on every platform. The root itself is `"."`.

use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use walkdir::WalkDir;

/// Readable byte stream for a single file
#[derive(Debug)]
pub enum Body {
    /// An open file on disk
    File(tokio::fs::File),
    /// Contents already held in memory
    Bytes(Cursor<Vec<u8>>),
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Cursor::new(bytes))
    }
}

impl AsyncRead for Body {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::File(file) => Pin::new(file).poll_read(cx, buf),
            Self::Bytes(cursor) => Pin::new(cursor).poll_read(cx, buf),
        }
    }
}

/// One item produced by a walk: the entry path and its metadata, or the
/// error hit while accessing it
pub type WalkItem = (String, io::Result<Entry>);

/// Path used for the walk root
pub const ROOT: &str = ".";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: String,
    pub is_dir: bool,
}

impl Entry {
    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
        }
    }

    /// Last path segment
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// A rooted, read-only file tree
pub trait FileSystem: Send + Sync {
    /// List the children of a directory
    fn read_dir(&self, path: &str) -> io::Result<Vec<Entry>>;

    /// Open a file for reading
    fn open(&self, path: &str) -> io::Result<Body>;

    /// Visit every entry under the root exactly once, parents before
    /// children, siblings sorted by name
    fn walk(&self) -> Box<dyn Iterator<Item = WalkItem> + Send + '_> {
        Box::new(Walk::new(self))
    }
}

/// Join a child name onto a root-relative directory path
pub fn join(dir: &str, name: &str) -> String {
    if dir == ROOT || dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

/// Pre-order traversal over any [`FileSystem`] using only `read_dir`.
///
/// A directory is yielded before it is listed. When the listing fails the
/// same path is yielded a second time carrying the error.
pub struct Walk<'a, F: ?Sized> {
    fs: &'a F,
    stack: Vec<WalkItem>,
    pending: Option<String>,
}

impl<'a, F: FileSystem + ?Sized> Walk<'a, F> {
    pub fn new(fs: &'a F) -> Self {
        Self {
            fs,
            stack: vec![(ROOT.to_string(), Ok(Entry::dir(ROOT)))],
            pending: None,
        }
    }
}

impl<F: FileSystem + ?Sized> Iterator for Walk<'_, F> {
    type Item = WalkItem;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(dir) = self.pending.take() {
            match self.fs.read_dir(&dir) {
                Ok(mut children) => {
                    children.sort_by(|a, b| a.name().cmp(b.name()));
                    self.stack.extend(
                        children
                            .into_iter()
                            .rev()
                            .map(|entry| (entry.path.clone(), Ok(entry))),
                    );
                }
                Err(e) => return Some((dir, Err(e))),
            }
        }

        let item = self.stack.pop()?;
        if let Ok(entry) = &item.1 {
            if entry.is_dir {
                self.pending = Some(entry.path.clone());
            }
        }
        Some(item)
    }
}

/// A directory on the local disk
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        if path == ROOT {
            self.root.clone()
        } else {
            self.root.join(path)
        }
    }

    /// Convert an on-disk path under the root into a root-relative key
    ///
    /// Object keys are UTF-8, so a name that is not fails here rather than
    /// turning into a lossy key that cannot be opened again.
    fn relative(&self, path: &Path) -> io::Result<String> {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let mut parts = Vec::new();
        for component in rel.components() {
            let part = component
                .as_os_str()
                .to_str()
                .ok_or_else(|| not_utf8(&rel.to_string_lossy()))?;
            parts.push(part);
        }
        if parts.is_empty() {
            Ok(ROOT.to_string())
        } else {
            Ok(parts.join("/"))
        }
    }

    /// Best-effort display form of an on-disk path, for error reports
    fn display(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        if rel.as_os_str().is_empty() {
            ROOT.to_string()
        } else {
            rel.to_string_lossy().replace('\\', "/")
        }
    }
}

fn not_utf8(name: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("file name {:?} is not valid UTF-8 and cannot be used as an object key", name),
    )
}

impl FileSystem for LocalFs {
    fn read_dir(&self, path: &str) -> io::Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for dirent in std::fs::read_dir(self.resolve(path))? {
            let dirent = dirent?;
            let name = dirent
                .file_name()
                .into_string()
                .map_err(|raw| not_utf8(&raw.to_string_lossy()))?;
            entries.push(Entry {
                path: join(path, &name),
                is_dir: dirent.file_type()?.is_dir(),
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn open(&self, path: &str) -> io::Result<Body> {
        let file = std::fs::File::open(self.resolve(path))?;
        if file.metadata()?.is_dir() {
            return Err(io::Error::other(format!("{} is a directory", path)));
        }
        Ok(Body::File(tokio::fs::File::from_std(file)))
    }

    fn walk(&self) -> Box<dyn Iterator<Item = WalkItem> + Send + '_> {
        let iter = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .map(move |result| match result {
                Ok(dirent) => match self.relative(dirent.path()) {
                    Ok(path) => {
                        let entry = Entry {
                            path: path.clone(),
                            is_dir: dirent.file_type().is_dir(),
                        };
                        (path, Ok(entry))
                    }
                    Err(e) => (self.display(dirent.path()), Err(e)),
                },
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| self.display(p))
                        .unwrap_or_else(|| ROOT.to_string());
                    (path, Err(io::Error::from(e)))
                }
            });
        Box::new(iter)
    }
}

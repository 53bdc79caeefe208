use std::{
    fs::{self, DirBuilder, File, OpenOptions},
    io::{self, ErrorKind, Write as _},
    os::unix::fs::DirBuilderExt as _,
    path::{Path, PathBuf},
    process,
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

use log::{debug, info, trace};
use rustix::system::uname;
use thiserror::Error;

/// Marker file Maildir++ readers use to recognise a subfolder.
const MAILDIRFOLDER_MARKER: &str = "maildirfolder";

static DELIVERIES: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("remote folder has no local name")]
    EmptyFolderPath,
    #[error("cannot create local folder {}", path.display())]
    CreateFolder {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write message to {}", path.display())]
    StoreWriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A message that has been delivered into a [`Maildir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    path: PathBuf,
}

impl StoredMessage {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Local counterpart of one remote folder. Messages are only ever added, never touched
/// again.
#[derive(Debug)]
pub struct Maildir {
    path: PathBuf,
    new: PathBuf,
    cur: PathBuf,
    tmp: PathBuf,
}

impl Maildir {
    fn unchecked(path: PathBuf) -> Self {
        let new = path.join("new");
        let cur = path.join("cur");
        let tmp = path.join("tmp");
        Self {
            path,
            new,
            cur,
            tmp,
        }
    }

    /// Directory [`Maildir::ensure`] would create for `segments`, without touching the
    /// filesystem.
    pub fn location(root: &Path, segments: &[String]) -> Result<PathBuf, StoreError> {
        let (first, nested) = segments.split_first().ok_or(StoreError::EmptyFolderPath)?;
        Ok(nested
            .iter()
            .fold(root.join(first), |path, segment| path.join(format!(".{segment}"))))
    }

    /// Creates the folder hierarchy for `segments` below `root` if it is missing.
    ///
    /// The first segment becomes a maildir directly below `root`. Every further segment
    /// becomes a Maildir++ subfolder `.<segment>` inside its parent.
    pub fn ensure(root: &Path, segments: &[String]) -> Result<Self, StoreError> {
        let (first, nested) = segments.split_first().ok_or(StoreError::EmptyFolderPath)?;

        let mut maildir = Self::unchecked(root.join(first));
        maildir.create_dirs()?;
        for segment in nested {
            maildir = Self::unchecked(maildir.path.join(format!(".{segment}")));
            maildir.create_dirs()?;
            maildir.mark_as_subfolder()?;
        }

        Ok(maildir)
    }

    fn create_dirs(&self) -> Result<(), StoreError> {
        if self.is_complete() {
            trace!("using existing maildir {}", self.path.display());
            return Ok(());
        }
        info!("creating maildir in {}", self.path.display());
        let mut builder = DirBuilder::new();
        builder.recursive(true).mode(0o700);
        for dir in [&self.tmp, &self.new, &self.cur] {
            builder
                .create(dir)
                .map_err(|source| StoreError::CreateFolder {
                    path: dir.clone(),
                    source,
                })?;
        }

        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.tmp.is_dir() && self.new.is_dir() && self.cur.is_dir()
    }

    fn mark_as_subfolder(&self) -> Result<(), StoreError> {
        let marker = self.path.join(MAILDIRFOLDER_MARKER);
        match OpenOptions::new().write(true).create_new(true).open(&marker) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(source) => Err(StoreError::CreateFolder {
                path: marker,
                source,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delivers `content` into `new`. The message is written and synced to `tmp` first, so
    /// `new` only ever contains complete messages.
    pub fn store(&self, content: &[u8]) -> Result<StoredMessage, StoreError> {
        let (tmp_path, mut file) = self.create_tmp_file()?;
        trace!("writing to {}", tmp_path.display());

        let delivered = file
            .write_all(content)
            .and_then(|()| file.sync_all())
            .and_then(|()| {
                let file_name = tmp_path
                    .file_name()
                    .expect("tmp file should always have a generated name");
                let new_path = self.new.join(file_name);
                fs::rename(&tmp_path, &new_path)?;
                sync_dir(&self.new)?;
                Ok(new_path)
            });

        match delivered {
            Ok(path) => {
                debug!("stored message in {}", path.display());
                Ok(StoredMessage { path })
            }
            Err(source) => {
                if let Err(e) = fs::remove_file(&tmp_path) {
                    trace!("could not remove {}: {e}", tmp_path.display());
                }
                Err(StoreError::StoreWriteError {
                    path: tmp_path,
                    source,
                })
            }
        }
    }

    fn create_tmp_file(&self) -> Result<(PathBuf, File), StoreError> {
        loop {
            let path = self.tmp.join(unique_file_name());
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    trace!("{} already exists, retrying", path.display());
                }
                Err(source) => return Err(StoreError::StoreWriteError { path, source }),
            }
        }
    }
}

/// Makes renames into `dir` durable.
pub fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

// <secs>.M<nanos>P<pid>Q<deliveries>.<hostname>, see http://cr.yp.to/proto/maildir.html
fn unique_file_name() -> String {
    let time = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let secs = time.as_secs();
    let nanos = time.subsec_nanos();
    let deliveries = DELIVERIES.fetch_add(1, Ordering::Relaxed);
    let hostname = uname();
    let hostname = hostname
        .nodename()
        .to_string_lossy()
        .replace(['/', ':'], "_");
    let pid = process::id();
    format!("{secs}.M{nanos}P{pid}Q{deliveries}.{hostname}")
}

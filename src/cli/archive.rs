use std::{
    fs,
    path::{self, Path, PathBuf},
};

use anyhow::{Context as _, Result};
use log::{error, info};

use crate::sync::{self, FolderSelection, RemoteRepository, SyncOptions};

/// Resolves `archivedir` against the working directory and creates it if necessary.
pub fn prepare_root(archivedir: &Path) -> Result<PathBuf> {
    let root = path::absolute(archivedir)
        .with_context(|| format!("cannot resolve {}", archivedir.display()))?;
    fs::create_dir_all(&root)
        .with_context(|| format!("cannot create archive directory {}", root.display()))?;

    Ok(root)
}

/// Archives the selected folders. Returns whether every folder could be archived.
pub async fn archive_folders<R: RemoteRepository>(
    remote: &mut R,
    root: &Path,
    includes: &[String],
    excludes: &[String],
) -> Result<bool> {
    info!("archiving to {}", root.display());
    let selection = FolderSelection::new(includes.to_vec(), excludes.to_vec());
    let summary = sync::archive(remote, root, &selection, SyncOptions::default()).await?;
    summary.log();

    if !summary.is_success() {
        error!(
            "{} folder(s) could not be archived",
            summary.aborted().count()
        );
    }
    Ok(summary.is_success())
}

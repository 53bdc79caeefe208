use std::path::Path;

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::{
    imap::ImapError,
    sync::{
        FolderReport, FolderSelection, FolderSync, FolderSyncError, RemoteRepository, SyncOptions,
        selection::{UnknownFolders, folder_display_path},
    },
};

/// Problems that stop a run before any folder is touched.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("cannot list remote folders")]
    Remote(#[from] ImapError),
    #[error(transparent)]
    Selection(#[from] UnknownFolders),
}

#[derive(Debug)]
pub enum FolderOutcome {
    Synced(FolderReport),
    Aborted {
        path: String,
        error: FolderSyncError,
    },
}

#[derive(Debug, Default)]
pub struct RunSummary {
    outcomes: Vec<FolderOutcome>,
}

impl RunSummary {
    #[cfg(test)]
    pub fn outcomes(&self) -> &[FolderOutcome] {
        &self.outcomes
    }

    pub fn aborted(&self) -> impl Iterator<Item = (&str, &FolderSyncError)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            FolderOutcome::Aborted { path, error } => Some((path.as_str(), error)),
            FolderOutcome::Synced(_) => None,
        })
    }

    pub fn is_success(&self) -> bool {
        self.aborted().next().is_none()
    }

    pub fn log(&self) {
        let mut stored = 0;
        let mut failed = 0;
        for outcome in &self.outcomes {
            match outcome {
                FolderOutcome::Synced(report) => {
                    if let Some(uid_validity) = report.uid_validity() {
                        debug!("{}: uidvalidity {uid_validity}", report.path());
                    }
                    stored += report.stored();
                    failed += report.failed().len();
                    info!(
                        "{}: {} new, {} stored, {} failed, {} archived before",
                        report.path(),
                        report.new(),
                        report.stored(),
                        report.failed().len(),
                        report.already_archived()
                    );
                }
                FolderOutcome::Aborted { path, error } => {
                    error!("{path}: aborted: {}", chain(error));
                }
            }
        }
        info!(
            "archived {stored} new messages from {} folders, {failed} messages failed",
            self.outcomes.len()
        );
    }
}

fn chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Archives every selected folder of `remote` below `root`, one after the other.
///
/// A folder that cannot be synced is recorded in the summary and the remaining folders are
/// still processed.
pub async fn archive<R: RemoteRepository>(
    remote: &mut R,
    root: &Path,
    selection: &FolderSelection,
    options: SyncOptions,
) -> Result<RunSummary, ArchiveError> {
    let separator = remote.separator().await?;
    let folders = remote.list_folders().await?;
    selection.validate(&folders, &separator)?;
    let selected = selection.select(&folders, &separator);
    info!("archiving {} of {} folders", selected.len(), folders.len());

    let mut summary = RunSummary::default();
    let mut folder_sync = FolderSync::new(remote, root, &separator, options);
    for folder in selected {
        let path = folder.path();
        info!("archiving {}", folder_display_path(folder, &separator));
        let outcome = match folder_sync.sync(path).await {
            Ok(report) => FolderOutcome::Synced(report),
            Err(error) => {
                warn!("giving up on {path}: {}", chain(&error));
                FolderOutcome::Aborted {
                    path: path.clone(),
                    error,
                }
            }
        };
        summary.outcomes.push(outcome);
    }

    Ok(summary)
}

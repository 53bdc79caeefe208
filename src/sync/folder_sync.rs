use std::path::Path;

use derive_builder::Builder;
use derive_getters::Getters;
use log::{debug, error, info, trace, warn};
use thiserror::Error;

use crate::{
    imap::ImapError,
    maildir::{Maildir, SeenMails, SeenMailsError, StoreError, StoredMessage, folder_name},
    repository::{MessageIdentity, SequenceSet, Uid, UidValidity},
    sync::{RemoteRepository, progress::Progress},
};

/// Tuning of a sync run, handed to every [`FolderSync`].
#[derive(Builder, Getters, Debug, Clone, Copy, PartialEq, Eq)]
#[builder(default)]
pub struct SyncOptions {
    /// The seen mails record is written after this many stored messages.
    checkpoint_interval: usize,
    /// Above this many new messages progress is logged in batches.
    batch_threshold: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            checkpoint_interval: 50,
            batch_threshold: 100,
        }
    }
}

/// Reasons to give up on a whole folder.
#[derive(Debug, Error)]
pub enum FolderSyncError {
    #[error("cannot prepare local folder")]
    LocalFolder(#[from] StoreError),
    #[error("cannot use seen mails record")]
    SeenMails(#[from] SeenMailsError),
    #[error("cannot select remote folder")]
    Select(#[source] ImapError),
    #[error("cannot list messages of remote folder")]
    ListUids(#[source] ImapError),
    #[error("lost connection after storing {stored} new messages")]
    ConnectionLost {
        stored: usize,
        #[source]
        source: ImapError,
    },
}

/// Failure of a single message. The folder sync carries on with the next one.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("cannot fetch message")]
    Fetch(#[source] ImapError),
    #[error("cannot store message of {size} bytes")]
    Store {
        size: usize,
        subject: Option<String>,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug)]
pub enum MessageOutcome {
    Stored(StoredMessage),
    Failed(MessageError),
}

/// Result of syncing one folder.
#[derive(Getters, Debug, Clone, PartialEq, Eq)]
pub struct FolderReport {
    path: String,
    #[getter(skip)]
    uid_validity: Option<UidValidity>,
    already_archived: usize,
    new: usize,
    stored: usize,
    failed: Vec<Uid>,
}

impl FolderReport {
    fn empty(path: &str) -> Self {
        Self {
            path: path.to_string(),
            uid_validity: None,
            already_archived: 0,
            new: 0,
            stored: 0,
            failed: Vec::new(),
        }
    }

    pub fn uid_validity(&self) -> Option<UidValidity> {
        self.uid_validity
    }
}

/// Archives new messages of single remote folders into maildirs below `root`.
pub struct FolderSync<'a, R> {
    remote: &'a mut R,
    root: &'a Path,
    separator: &'a str,
    options: SyncOptions,
}

impl<'a, R: RemoteRepository> FolderSync<'a, R> {
    pub fn new(
        remote: &'a mut R,
        root: &'a Path,
        separator: &'a str,
        options: SyncOptions,
    ) -> Self {
        Self {
            remote,
            root,
            separator,
            options,
        }
    }

    pub async fn sync(&mut self, path: &str) -> Result<FolderReport, FolderSyncError> {
        let mut report = FolderReport::empty(path);

        let segments = folder_name::encode(path, self.separator);
        let mut seen = SeenMails::load(&Maildir::location(self.root, &segments)?)?;
        if seen.is_empty() {
            debug!("nothing of {path} archived yet");
        } else {
            debug!("{} messages of {path} archived before", seen.len());
        }

        let snapshot = self
            .remote
            .select(path)
            .await
            .map_err(FolderSyncError::Select)?;
        let uid_validity = snapshot.uid_validity();
        report.uid_validity = Some(uid_validity);
        if snapshot.readonly() {
            debug!("{path} is read-only");
        }
        let maildir = Maildir::ensure(self.root, &segments)?;

        let Some(sequence_set) = SequenceSet::first(snapshot.exists()) else {
            info!("{path} is empty");
            seen.flush(maildir.path())?;
            return Ok(report);
        };
        debug!("fetching uids of {path} for {sequence_set}");
        let remote_uids = self
            .remote
            .fetch_uids(&sequence_set)
            .await
            .map_err(|e| {
                if e.is_connection_lost() {
                    FolderSyncError::ConnectionLost {
                        stored: 0,
                        source: e,
                    }
                } else {
                    FolderSyncError::ListUids(e)
                }
            })?;

        let remote_count = remote_uids.len();
        let mut new_uids: Vec<Uid> = remote_uids
            .into_iter()
            .filter(|uid| !seen.contains(&MessageIdentity::new(uid_validity, *uid)))
            .collect();
        new_uids.sort_unstable();
        report.new = new_uids.len();
        report.already_archived = remote_count - report.new;
        info!("{} new messages in {path}", report.new);

        let mut progress = Progress::new(path, new_uids.len(), self.options.batch_threshold);
        for uid in new_uids {
            match self.fetch_and_store(&maildir, uid).await {
                MessageOutcome::Stored(message) => {
                    trace!("stored {uid} as {}", message.path().display());
                    seen.append(MessageIdentity::new(uid_validity, uid));
                    report.stored += 1;
                    progress.record(uid, true);
                    if self.options.checkpoint_interval > 0
                        && report.stored % self.options.checkpoint_interval == 0
                    {
                        debug!("checkpointing seen mails of {path}");
                        seen.flush(maildir.path())?;
                    }
                }
                MessageOutcome::Failed(MessageError::Fetch(e)) if e.is_connection_lost() => {
                    progress.finish();
                    if let Err(flush_error) = seen.flush(maildir.path()) {
                        warn!("cannot save seen mails of {path} before giving up: {flush_error}");
                    }
                    return Err(FolderSyncError::ConnectionLost {
                        stored: report.stored,
                        source: e,
                    });
                }
                MessageOutcome::Failed(e) => {
                    log_failure(path, uid, &e);
                    report.failed.push(uid);
                    progress.record(uid, false);
                }
            }
        }
        progress.finish();

        seen.flush(maildir.path())?;
        Ok(report)
    }

    async fn fetch_and_store(&mut self, maildir: &Maildir, uid: Uid) -> MessageOutcome {
        let body = match self.remote.fetch_body(uid).await {
            Ok(body) => body,
            Err(e) => return MessageOutcome::Failed(MessageError::Fetch(e)),
        };
        match maildir.store(&body) {
            Ok(message) => MessageOutcome::Stored(message),
            Err(source) => MessageOutcome::Failed(MessageError::Store {
                size: body.len(),
                subject: subject(&body),
                source,
            }),
        }
    }
}

fn log_failure(path: &str, uid: Uid, e: &MessageError) {
    let cause = std::error::Error::source(e)
        .map(ToString::to_string)
        .unwrap_or_default();
    match e {
        MessageError::Store {
            subject: Some(subject),
            ..
        } => error!("{path} uid {uid} ({subject}): {e}: {cause}"),
        _ => error!("{path} uid {uid}: {e}: {cause}"),
    }
}

/// Unfolded `Subject` header, for telling a failed message apart in logs.
fn subject(message: &[u8]) -> Option<String> {
    let headers = message
        .split(|byte| *byte == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .take_while(|line| !line.is_empty());

    let mut subject: Option<String> = None;
    for line in headers {
        let line = String::from_utf8_lossy(line);
        if let Some(subject) = subject.as_mut() {
            if line.starts_with([' ', '\t']) {
                subject.push(' ');
                subject.push_str(line.trim());
                continue;
            }
            break;
        }
        match line.split_once(':') {
            Some((name, value)) if name.eq_ignore_ascii_case("subject") => {
                subject = Some(value.trim().to_string());
            }
            _ => {}
        }
    }

    subject
}

#[cfg(test)]
mod tests {
    use std::fs;

    use assertables::*;
    use rstest::*;
    use tempfile::{TempDir, tempdir};

    use super::*;
    use crate::{maildir::SEEN_MAILS_FILENAME, sync::mock_remote::MockRemote};

    #[fixture]
    fn root() -> TempDir {
        tempdir().expect("temporary directory should be creatable")
    }

    fn new_messages(root: &Path, folder: &str) -> usize {
        fs::read_dir(root.join(folder).join("new"))
            .map(Iterator::count)
            .unwrap_or_default()
    }

    fn seen_record(root: &Path, folder: &str) -> Vec<u8> {
        fs::read(root.join(folder).join(SEEN_MAILS_FILENAME))
            .expect("seen mails record should be readable")
    }

    async fn sync(
        remote: &mut MockRemote,
        root: &Path,
        path: &str,
    ) -> Result<FolderReport, FolderSyncError> {
        FolderSync::new(remote, root, "/", SyncOptions::default())
            .sync(path)
            .await
    }

    #[rstest]
    #[tokio::test]
    async fn test_second_run_fetches_nothing(root: TempDir) {
        let mut remote = MockRemote::default().with_folder("INBOX", 7, &[1, 2, 100]);

        let first = assert_ok!(sync(&mut remote, root.path(), "INBOX").await);
        let second = assert_ok!(sync(&mut remote, root.path(), "INBOX").await);

        assert_eq!(3, first.stored());
        assert_eq!(Some(UidValidity::new(7)), first.uid_validity());
        assert_eq!(0, second.new());
        assert_eq!(3, second.already_archived());
        assert_eq!(3, remote.fetched().len());
        assert_eq!(3, new_messages(root.path(), "INBOX"));
        assert_eq!(
            b"7\x001\n7\x002\n7\x00100\n".as_slice(),
            seen_record(root.path(), "INBOX").as_slice()
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_changed_uid_validity_refetches_everything(root: TempDir) {
        let mut remote = MockRemote::default().with_folder("INBOX", 1, &[1, 2, 3]);
        assert_ok!(sync(&mut remote, root.path(), "INBOX").await);

        remote.set_uid_validity("INBOX", 2);
        let report = assert_ok!(sync(&mut remote, root.path(), "INBOX").await);

        assert_eq!(3, report.new());
        assert_eq!(3, report.stored());
        assert_eq!(6, remote.fetched().len());
        assert_eq!(6, new_messages(root.path(), "INBOX"));
        assert_eq!(
            b"1\x001\n1\x002\n1\x003\n2\x001\n2\x002\n2\x003\n".as_slice(),
            seen_record(root.path(), "INBOX").as_slice()
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_failing_message_is_skipped_and_retried_later(root: TempDir) {
        let mut remote = MockRemote::default().with_folder("INBOX", 7, &[1, 2, 3]);
        remote.fail_fetch(2);

        let report = assert_ok!(sync(&mut remote, root.path(), "INBOX").await);

        assert_eq!(2, report.stored());
        assert_eq!(&vec![assert_ok!(Uid::try_from(2_u32))], report.failed());
        assert_eq!(2, new_messages(root.path(), "INBOX"));
        assert_eq!(
            b"7\x001\n7\x003\n".as_slice(),
            seen_record(root.path(), "INBOX").as_slice()
        );

        remote.heal();
        let retry = assert_ok!(sync(&mut remote, root.path(), "INBOX").await);
        assert_eq!(1, retry.stored());
        assert_eq!(3, new_messages(root.path(), "INBOX"));
    }

    #[rstest]
    #[tokio::test]
    async fn test_empty_folder_gets_empty_record(root: TempDir) {
        let mut remote = MockRemote::default().with_folder("Drafts", 3, &[]);

        let report = assert_ok!(sync(&mut remote, root.path(), "Drafts").await);

        assert_eq!(0, report.new());
        assert!(root.path().join("Drafts/cur").is_dir());
        assert_is_empty!(seen_record(root.path(), "Drafts"));
    }

    #[rstest]
    #[tokio::test]
    async fn test_nested_folder_is_stored_in_subfolder(root: TempDir) {
        let mut remote = MockRemote::default().with_folder("Work/Inv\u{2665}oices", 3, &[5]);

        assert_ok!(sync(&mut remote, root.path(), "Work/Inv\u{2665}oices").await);

        assert_eq!(1, new_messages(root.path(), "Work/.Invoices"));
        assert!(root.path().join("Work/.Invoices").join(SEEN_MAILS_FILENAME).is_file());
    }

    #[rstest]
    #[tokio::test]
    async fn test_corrupt_record_aborts_folder(root: TempDir) {
        let mut remote = MockRemote::default().with_folder("INBOX", 7, &[1]);
        let inbox = root.path().join("INBOX");
        assert_ok!(Maildir::ensure(root.path(), &["INBOX".to_string()]));
        assert_ok!(fs::write(inbox.join(SEEN_MAILS_FILENAME), b"7 1\n"));

        let error = assert_err!(sync(&mut remote, root.path(), "INBOX").await);

        assert!(matches!(
            error,
            FolderSyncError::SeenMails(SeenMailsError::CorruptRecord { .. })
        ));
        assert_is_empty!(remote.fetched());
        assert_eq!(b"7 1\n".as_slice(), seen_record(root.path(), "INBOX").as_slice());
    }

    #[rstest]
    #[tokio::test]
    async fn test_unknown_remote_folder_aborts(root: TempDir) {
        let mut remote = MockRemote::default();
        let error = assert_err!(sync(&mut remote, root.path(), "Gone").await);
        assert!(matches!(error, FolderSyncError::Select(_)));
        assert!(!root.path().join("Gone").exists());
    }

    #[rstest]
    #[tokio::test]
    async fn test_lost_connection_creates_no_local_folder(root: TempDir) {
        let mut remote = MockRemote::default()
            .with_folder("INBOX", 7, &[1])
            .with_folder("Sent", 7, &[2]);
        remote.lose_connection_at(1);
        assert_err!(sync(&mut remote, root.path(), "INBOX").await);

        let error = assert_err!(sync(&mut remote, root.path(), "Sent").await);

        assert!(matches!(error, FolderSyncError::Select(_)));
        assert!(!root.path().join("Sent").exists());
    }

    #[rstest]
    #[tokio::test]
    async fn test_unstorable_message_is_skipped_and_not_recorded(root: TempDir) {
        let mut remote = MockRemote::default().with_folder("INBOX", 7, &[1, 2, 3]);
        remote.block_delivery(2, root.path().join("INBOX").join("tmp"));

        let report = assert_ok!(sync(&mut remote, root.path(), "INBOX").await);

        assert_eq!(3, remote.fetched().len());
        assert_eq!(2, report.stored());
        assert_eq!(&vec![assert_ok!(Uid::try_from(2_u32))], report.failed());
        assert_eq!(2, new_messages(root.path(), "INBOX"));
        assert_eq!(
            b"7\x001\n7\x003\n".as_slice(),
            seen_record(root.path(), "INBOX").as_slice()
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_connection_loss_keeps_stored_messages(root: TempDir) {
        let mut remote = MockRemote::default().with_folder("INBOX", 7, &[1, 2, 3]);
        remote.lose_connection_at(3);

        let error = assert_err!(sync(&mut remote, root.path(), "INBOX").await);

        assert!(matches!(error, FolderSyncError::ConnectionLost { stored: 2, .. }));
        assert_eq!(
            b"7\x001\n7\x002\n".as_slice(),
            seen_record(root.path(), "INBOX").as_slice()
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_checkpoints_flush_during_fetch(root: TempDir) {
        let mut remote = MockRemote::default().with_folder("INBOX", 7, &[1, 2, 3, 4, 5]);
        remote.fail_fetch(5);
        remote.watch_record(root.path().join("INBOX").join(SEEN_MAILS_FILENAME));
        let options = assert_ok!(SyncOptionsBuilder::default().checkpoint_interval(2).build());

        let report = assert_ok!(
            FolderSync::new(&mut remote, root.path(), "/", options)
                .sync("INBOX")
                .await
        );

        assert_eq!(4, report.stored());
        assert_eq!(&[0, 0, 2, 2, 4], remote.records_at_fetch());
    }

    #[rstest]
    #[case(b"Subject: hello\r\n\r\nbody".as_slice(), Some("hello"))]
    #[case(b"From: a\nsubject: folded\n  over lines\nTo: b\n\nbody".as_slice(), Some("folded over lines"))]
    #[case(b"From: a\r\n\r\nSubject: in body".as_slice(), None)]
    fn test_subject_is_extracted(#[case] message: &[u8], #[case] expected: Option<&str>) {
        assert_eq!(expected.map(ToString::to_string), subject(message));
    }
}

use crate::{
    imap::ImapError,
    repository::{RemoteFolder, RemoteFolderSnapshot, SequenceSet, Uid},
};

/// Read access to a remote mailbox, as far as archiving needs it.
pub trait RemoteRepository {
    async fn list_folders(&mut self) -> Result<Vec<RemoteFolder>, ImapError>;

    /// Hierarchy delimiter used in folder paths.
    async fn separator(&mut self) -> Result<String, ImapError>;

    async fn select(&mut self, path: &str) -> Result<RemoteFolderSnapshot, ImapError>;

    /// UIDs of the messages at the given sequence numbers, ascending.
    async fn fetch_uids(&mut self, sequence_set: &SequenceSet) -> Result<Vec<Uid>, ImapError>;

    /// Full message without touching its `\Seen` flag.
    async fn fetch_body(&mut self, uid: Uid) -> Result<Vec<u8>, ImapError>;
}

use std::{collections::HashSet, fs, path::PathBuf};

use enumflags2::BitFlags;

use crate::{
    imap::ImapError,
    repository::{
        FolderAttribute, RemoteFolder, RemoteFolderSnapshot, RemoteFolderSnapshotBuilder,
        SequenceSet, Uid, UidValidity,
    },
    sync::RemoteRepository,
};

struct MockFolder {
    path: String,
    attributes: BitFlags<FolderAttribute>,
    uid_validity: u32,
    uids: Vec<u32>,
}

/// In-memory server with `/` as separator. Folders are listed in the order they were added.
#[derive(Default)]
pub struct MockRemote {
    folders: Vec<MockFolder>,
    selected: Option<usize>,
    failing: HashSet<u32>,
    lost_at: Option<u32>,
    fetched: Vec<(String, u32)>,
    watched_record: Option<PathBuf>,
    blocked_delivery: Option<(u32, PathBuf)>,
    records_at_fetch: Vec<usize>,
}

impl MockRemote {
    pub fn with_folder(mut self, path: &str, uid_validity: u32, uids: &[u32]) -> Self {
        self.folders.push(MockFolder {
            path: path.to_string(),
            attributes: BitFlags::empty(),
            uid_validity,
            uids: uids.to_vec(),
        });
        self
    }

    pub fn with_container(mut self, path: &str) -> Self {
        self.folders.push(MockFolder {
            path: path.to_string(),
            attributes: FolderAttribute::NoSelect | FolderAttribute::HasChildren,
            uid_validity: 0,
            uids: Vec::new(),
        });
        self
    }

    pub fn set_uid_validity(&mut self, path: &str, uid_validity: u32) {
        for folder in self.folders.iter_mut().filter(|folder| folder.path == path) {
            folder.uid_validity = uid_validity;
        }
    }

    /// Fetching `uid` fails without harming the connection.
    pub fn fail_fetch(&mut self, uid: u32) {
        self.failing.insert(uid);
    }

    /// Fetching `uid` drops the connection, every later command fails as well.
    pub fn lose_connection_at(&mut self, uid: u32) {
        self.lost_at = Some(uid);
    }

    pub fn heal(&mut self) {
        self.failing.clear();
    }

    /// While `uid` is fetched, the maildir `tmp` directory is replaced by a plain file so
    /// storing that message fails. The next fetch puts the directory back.
    pub fn block_delivery(&mut self, uid: u32, tmp: PathBuf) {
        self.blocked_delivery = Some((uid, tmp));
    }

    fn toggle_delivery(&self, uid: u32) {
        let Some((blocked, tmp)) = &self.blocked_delivery else {
            return;
        };
        if uid == *blocked {
            fs::remove_dir(tmp).expect("tmp should be an empty directory");
            fs::write(tmp, b"").expect("tmp should be replaceable by a file");
        } else if tmp.is_file() {
            fs::remove_file(tmp).expect("blocking file should be removable");
            fs::create_dir(tmp).expect("tmp should be restorable");
        }
    }

    /// Counts the lines of this seen mails record whenever a message is fetched.
    pub fn watch_record(&mut self, record: PathBuf) {
        self.watched_record = Some(record);
    }

    pub fn fetched(&self) -> &[(String, u32)] {
        &self.fetched
    }

    pub fn records_at_fetch(&self) -> &[usize] {
        &self.records_at_fetch
    }

    fn connection(&self) -> Result<(), ImapError> {
        if self
            .lost_at
            .is_some_and(|uid| self.fetched.iter().any(|(_, fetched)| *fetched == uid))
        {
            Err(ImapError::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    fn selected(&self, command: &str) -> Result<&MockFolder, ImapError> {
        self.selected
            .and_then(|index| self.folders.get(index))
            .ok_or_else(|| ImapError::Bad {
                command: command.to_string(),
                information: "no folder selected".to_string(),
            })
    }
}

pub fn message(uid: u32) -> Vec<u8> {
    format!("Subject: message {uid}\r\n\r\nbody of {uid}\r\n").into_bytes()
}

impl RemoteRepository for MockRemote {
    async fn list_folders(&mut self) -> Result<Vec<RemoteFolder>, ImapError> {
        self.connection()?;
        Ok(self
            .folders
            .iter()
            .map(|folder| {
                RemoteFolder::new(folder.path.clone(), Some("/".to_string()), folder.attributes)
            })
            .collect())
    }

    async fn separator(&mut self) -> Result<String, ImapError> {
        self.connection()?;
        Ok("/".to_string())
    }

    async fn select(&mut self, path: &str) -> Result<RemoteFolderSnapshot, ImapError> {
        self.connection()?;
        let index = self
            .folders
            .iter()
            .position(|folder| {
                folder.path == path && !folder.attributes.contains(FolderAttribute::NoSelect)
            })
            .ok_or_else(|| ImapError::No {
                command: format!("SELECT \"{path}\""),
                information: "Unknown Mailbox".to_string(),
            })?;
        self.selected = Some(index);
        let folder = &self.folders[index];

        Ok(RemoteFolderSnapshotBuilder::default()
            .uid_validity(UidValidity::new(folder.uid_validity))
            .exists(u32::try_from(folder.uids.len()).unwrap_or(u32::MAX))
            .build()
            .expect("snapshot should be complete"))
    }

    async fn fetch_uids(&mut self, sequence_set: &SequenceSet) -> Result<Vec<Uid>, ImapError> {
        self.connection()?;
        let folder = self.selected(&format!("FETCH {sequence_set} (UID)"))?;
        let mut uids: Vec<Uid> = folder
            .uids
            .iter()
            .take(sequence_set.count())
            .filter_map(|uid| Uid::try_from(uid).ok())
            .collect();
        uids.sort_unstable();
        Ok(uids)
    }

    async fn fetch_body(&mut self, uid: Uid) -> Result<Vec<u8>, ImapError> {
        self.connection()?;
        let uid = u32::from(uid);
        let command = format!("UID FETCH {uid} (BODY.PEEK[])");
        let folder = self.selected(&command)?;
        let path = folder.path.clone();
        let present = folder.uids.contains(&uid);

        if let Some(record) = &self.watched_record {
            let lines = fs::read(record)
                .map(|record| record.iter().filter(|byte| **byte == b'\n').count())
                .unwrap_or_default();
            self.records_at_fetch.push(lines);
        }
        self.fetched.push((path, uid));
        self.toggle_delivery(uid);

        if self.lost_at == Some(uid) {
            return Err(ImapError::ConnectionClosed);
        }
        if self.failing.contains(&uid) || !present {
            return Err(ImapError::MissingData {
                command,
                missing: "BODY[]",
            });
        }
        Ok(message(uid))
    }
}

use log::{debug, trace, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use utf7_imap::{decode_utf7_imap as decode_utf7, encode_utf7_imap as encode_utf7};

use crate::{
    imap::{
        ImapError,
        connection::{Connection, quoted},
        response::{FetchAttribute, Response, ResponseCode},
    },
    repository::{
        RemoteFolder, RemoteFolderSnapshot, RemoteFolderSnapshotBuilder, SequenceSet, Uid,
        UidValidity,
    },
    sync::RemoteRepository,
};

const DEFAULT_SEPARATOR: &str = "/";

/// An authenticated connection.
#[derive(Debug)]
pub struct Session<S> {
    connection: Connection<S>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Session<S> {
    pub fn new(connection: Connection<S>) -> Self {
        Self { connection }
    }

    pub async fn logout(mut self) -> Result<(), ImapError> {
        match self.connection.send("LOGOUT").await {
            Ok(_) | Err(ImapError::ConnectionClosed) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> RemoteRepository for Session<S> {
    async fn list_folders(&mut self) -> Result<Vec<RemoteFolder>, ImapError> {
        let responses = self.connection.send("LIST \"\" \"*\"").await?;
        let folders: Vec<_> = responses
            .into_iter()
            .filter_map(|response| match response {
                Response::List(entry) => Some(RemoteFolder::new(
                    decode_utf7(entry.name),
                    entry.delimiter,
                    entry.attributes,
                )),
                _ => None,
            })
            .collect();
        debug!("server lists {} folders", folders.len());

        Ok(folders)
    }

    async fn separator(&mut self) -> Result<String, ImapError> {
        let responses = self.connection.send("LIST \"\" \"\"").await?;
        let separator = responses.into_iter().find_map(|response| match response {
            Response::List(entry) => entry.delimiter,
            _ => None,
        });

        Ok(separator.unwrap_or_else(|| {
            debug!("server reports a flat hierarchy, using {DEFAULT_SEPARATOR}");
            DEFAULT_SEPARATOR.to_string()
        }))
    }

    async fn select(&mut self, path: &str) -> Result<RemoteFolderSnapshot, ImapError> {
        let command = format!("SELECT {}", quoted(&encode_utf7(path.to_string())));
        let responses = self.connection.send(&command).await?;

        let mut builder = RemoteFolderSnapshotBuilder::default();
        for response in responses {
            match response {
                Response::Exists(exists) => {
                    builder.exists(exists);
                }
                Response::Status {
                    code: Some(ResponseCode::UidValidity(uid_validity)),
                    ..
                } => {
                    builder.uid_validity(UidValidity::new(uid_validity));
                }
                Response::Status {
                    code: Some(ResponseCode::ReadOnly),
                    ..
                } => {
                    builder.readonly(true);
                }
                other => trace!("ignoring {other:?}"),
            }
        }

        let snapshot = builder.build().map_err(|_| ImapError::MissingData {
            command,
            missing: "EXISTS or UIDVALIDITY",
        })?;
        debug!(
            "selected {path}: {} messages, uidvalidity {}",
            snapshot.exists(),
            snapshot.uid_validity()
        );

        Ok(snapshot)
    }

    async fn fetch_uids(&mut self, sequence_set: &SequenceSet) -> Result<Vec<Uid>, ImapError> {
        let responses = self
            .connection
            .send(&format!("FETCH {sequence_set} (UID)"))
            .await?;
        let mut uids: Vec<Uid> = responses
            .into_iter()
            .filter_map(|response| match response {
                Response::Fetch { attributes, .. } => {
                    attributes.into_iter().find_map(|attribute| match attribute {
                        FetchAttribute::Uid(uid) => Some(uid),
                        _ => None,
                    })
                }
                _ => None,
            })
            .filter_map(|uid| {
                Uid::try_from(uid)
                    .inspect_err(|e| warn!("ignoring uid {uid}: {e}"))
                    .ok()
            })
            .collect();
        uids.sort_unstable();
        uids.dedup();
        if uids.len() != sequence_set.count() {
            warn!(
                "asked for {} uids but server returned {}",
                sequence_set.count(),
                uids.len()
            );
        }

        Ok(uids)
    }

    async fn fetch_body(&mut self, uid: Uid) -> Result<Vec<u8>, ImapError> {
        let command = format!("UID FETCH {uid} (BODY.PEEK[])");
        let responses = self.connection.send(&command).await?;

        for response in responses {
            let Response::Fetch { attributes, .. } = response else {
                continue;
            };
            let fetched_uid = attributes.iter().find_map(|attribute| match attribute {
                FetchAttribute::Uid(fetched) => Some(*fetched),
                _ => None,
            });
            if fetched_uid.is_some_and(|fetched| fetched != u32::from(uid)) {
                trace!("ignoring unsolicited fetch data for uid {fetched_uid:?}");
                continue;
            }
            let body = attributes.into_iter().find_map(|attribute| match attribute {
                FetchAttribute::Body(body) => body,
                _ => None,
            });
            if let Some(body) = body {
                return Ok(body);
            }
        }

        Err(ImapError::MissingData {
            command,
            missing: "BODY[]",
        })
    }
}

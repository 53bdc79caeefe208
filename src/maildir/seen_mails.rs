use std::{
    collections::HashSet,
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, ErrorKind, Write as _},
    path::{Path, PathBuf},
};

use log::{debug, trace, warn};
use nom::{
    IResult,
    character::complete::{char, u32 as decimal},
    combinator::all_consuming,
    sequence::separated_pair,
};
use thiserror::Error;

use crate::{
    maildir::maildir::sync_dir,
    repository::{MessageIdentity, Uid, UidValidity},
};

/// Name of the record inside every local folder. Kept stable so existing archives stay usable.
pub const SEEN_MAILS_FILENAME: &str = "pygmailarchive.seenmails";
const FIELD_SEPARATOR: char = '\0';

#[derive(Debug, Error)]
pub enum SeenMailsError {
    #[error("invalid line '{line}' in seen mails file {}", file.display())]
    CorruptRecord { file: PathBuf, line: String },
    #[error("cannot write seen mails file, folder {} does not exist", .0.display())]
    StoreUnavailable(PathBuf),
    #[error("seen mails file {} is not accessible", file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Identities of all messages already archived into one local folder, in the order they
/// were archived.
#[derive(Debug, Default)]
pub struct SeenMails {
    order: Vec<MessageIdentity>,
    index: HashSet<MessageIdentity>,
}

impl SeenMails {
    /// Loads the record of `folder`. A missing record is an empty set, duplicate lines are
    /// dropped.
    pub fn load(folder: &Path) -> Result<Self, SeenMailsError> {
        let file = folder.join(SEEN_MAILS_FILENAME);
        let contents = match fs::read(&file) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no seen mails file in {}", folder.display());
                return Ok(Self::default());
            }
            Err(source) => return Err(SeenMailsError::Io { file, source }),
        };

        let mut seen_mails = Self::default();
        let records = contents.strip_suffix(b"\n").unwrap_or(&contents);
        if records.is_empty() {
            return Ok(seen_mails);
        }

        let mut duplicates = 0usize;
        for line in records.split(|byte| *byte == b'\n') {
            let identity = parse_record(line).ok_or_else(|| SeenMailsError::CorruptRecord {
                file: file.clone(),
                line: String::from_utf8_lossy(line).replace(FIELD_SEPARATOR, "\\0"),
            })?;
            if !seen_mails.append(identity) {
                duplicates += 1;
            }
        }
        if duplicates > 0 {
            warn!(
                "dropped {duplicates} duplicate entries from {}",
                file.display()
            );
        }
        trace!("loaded {} seen mails from {}", seen_mails.len(), file.display());

        Ok(seen_mails)
    }

    pub fn contains(&self, identity: &MessageIdentity) -> bool {
        self.index.contains(identity)
    }

    /// Records `identity`. Returns `false` if it was already recorded.
    pub fn append(&mut self, identity: MessageIdentity) -> bool {
        if self.index.insert(identity) {
            self.order.push(identity);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &MessageIdentity> {
        self.order.iter()
    }

    /// Replaces the record of `folder` with the current set. The new record is written to a
    /// temporary file first and renamed over the old one.
    pub fn flush(&self, folder: &Path) -> Result<(), SeenMailsError> {
        if !folder.is_dir() {
            return Err(SeenMailsError::StoreUnavailable(folder.to_path_buf()));
        }
        let file = folder.join(SEEN_MAILS_FILENAME);
        let tmp_file = folder.join(format!(".{SEEN_MAILS_FILENAME}.tmp"));
        trace!("writing {} seen mails to {}", self.len(), tmp_file.display());

        self.write_to(&tmp_file)
            .and_then(|()| fs::rename(&tmp_file, &file))
            .and_then(|()| sync_dir(folder))
            .map_err(|source| {
                if let Err(e) = fs::remove_file(&tmp_file) {
                    trace!("could not remove {}: {e}", tmp_file.display());
                }
                SeenMailsError::Io {
                    file: file.clone(),
                    source,
                }
            })
    }

    fn write_to(&self, path: &Path) -> io::Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let mut writer = BufWriter::new(file);
        for identity in &self.order {
            writeln!(
                writer,
                "{}{FIELD_SEPARATOR}{}",
                identity.uid_validity(),
                identity.uid()
            )?;
        }
        let file: File = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
        file.sync_all()
    }
}

fn record(input: &[u8]) -> IResult<&[u8], (u32, u32)> {
    all_consuming(separated_pair(decimal, char(FIELD_SEPARATOR), decimal))(input)
}

fn parse_record(line: &[u8]) -> Option<MessageIdentity> {
    let (_, (uid_validity, uid)) = record(line).ok()?;
    let uid = Uid::try_from(uid).ok()?;

    Some(MessageIdentity::new(UidValidity::new(uid_validity), uid))
}

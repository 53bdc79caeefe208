use derive_builder::Builder;
use derive_getters::Getters;
use enumflags2::{BitFlags, bitflags};

use crate::repository::UidValidity;

#[bitflags]
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FolderAttribute {
    NoSelect,
    NoInferiors,
    HasChildren,
    HasNoChildren,
    Marked,
    Unmarked,
    All,
    Archive,
    Drafts,
    Flagged,
    Junk,
    Sent,
    Trash,
}

impl FolderAttribute {
    /// Maps a raw LIST attribute like `\HasChildren`, ignoring case.
    pub fn from_extension(attribute: &str) -> Option<Self> {
        match attribute.trim_start_matches('\\').to_ascii_lowercase().as_str() {
            "noselect" | "nonexistent" => Some(Self::NoSelect),
            "noinferiors" => Some(Self::NoInferiors),
            "haschildren" => Some(Self::HasChildren),
            "hasnochildren" => Some(Self::HasNoChildren),
            "marked" => Some(Self::Marked),
            "unmarked" => Some(Self::Unmarked),
            "all" => Some(Self::All),
            "archive" => Some(Self::Archive),
            "drafts" => Some(Self::Drafts),
            "flagged" | "important" | "starred" => Some(Self::Flagged),
            "junk" | "spam" => Some(Self::Junk),
            "sent" => Some(Self::Sent),
            "trash" => Some(Self::Trash),
            _ => None,
        }
    }
}

/// One entry of the server's folder list, with its name already decoded from modified UTF-7.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct RemoteFolder {
    path: String,
    #[getter(skip)]
    delimiter: Option<String>,
    #[getter(skip)]
    attributes: BitFlags<FolderAttribute>,
}

impl RemoteFolder {
    pub fn new(
        path: String,
        delimiter: Option<String>,
        attributes: BitFlags<FolderAttribute>,
    ) -> Self {
        Self {
            path,
            delimiter,
            attributes,
        }
    }

    pub fn delimiter(&self) -> Option<&str> {
        self.delimiter.as_deref()
    }

    pub fn attributes(&self) -> BitFlags<FolderAttribute> {
        self.attributes
    }

    pub fn is_selectable(&self) -> bool {
        !self.attributes.contains(FolderAttribute::NoSelect)
    }
}

/// State of a folder right after selecting it. Recomputed on every run, never persisted.
#[derive(Builder, Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct RemoteFolderSnapshot {
    #[getter(skip)]
    uid_validity: UidValidity,
    exists: u32,
    #[builder(default)]
    readonly: bool,
}

impl RemoteFolderSnapshot {
    pub fn uid_validity(&self) -> UidValidity {
        self.uid_validity
    }
}

use std::borrow::Cow;

use enumflags2::BitFlags;
use imap_proto::{AttributeValue, MailboxDatum, NameAttribute};
use log::trace;

use crate::repository::FolderAttribute;

/// Owned form of the server responses this client acts on. Everything else is kept as
/// [`Response::Other`] so it can still be logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Done {
        tag: String,
        status: Status,
        information: Option<String>,
    },
    Status {
        status: Status,
        code: Option<ResponseCode>,
        information: Option<String>,
    },
    Capabilities(Vec<String>),
    Continue,
    List(ListEntry),
    Exists(u32),
    Fetch {
        sequence_number: u32,
        attributes: Vec<FetchAttribute>,
    },
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    No,
    Bad,
    PreAuth,
    Bye,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    UidValidity(u32),
    UidNext(u32),
    ReadOnly,
    ReadWrite,
    Capabilities(Vec<String>),
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub attributes: BitFlags<FolderAttribute>,
    pub delimiter: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    Uid(u32),
    Body(Option<Vec<u8>>),
    Other,
}

impl From<&imap_proto::Response<'_>> for Response {
    fn from(value: &imap_proto::Response<'_>) -> Self {
        match value {
            imap_proto::Response::Done {
                tag,
                status,
                code: _,
                information,
            } => Self::Done {
                tag: tag.0.clone(),
                status: status.into(),
                information: information.as_ref().map(ToString::to_string),
            },
            imap_proto::Response::Data {
                status,
                code,
                information,
            } => Self::Status {
                status: status.into(),
                code: code.as_ref().map(ResponseCode::from),
                information: information.as_ref().map(ToString::to_string),
            },
            imap_proto::Response::Capabilities(capabilities) => {
                Self::Capabilities(capabilities.iter().map(capability_name).collect())
            }
            imap_proto::Response::Continue { .. } => Self::Continue,
            imap_proto::Response::MailboxData(MailboxDatum::List {
                name_attributes,
                delimiter,
                name,
            }) => Self::List(ListEntry {
                attributes: name_attributes.iter().filter_map(folder_attribute).collect(),
                delimiter: delimiter.as_ref().map(ToString::to_string),
                name: name.to_string(),
            }),
            imap_proto::Response::MailboxData(MailboxDatum::Exists(exists)) => {
                Self::Exists(*exists)
            }
            imap_proto::Response::Fetch(sequence_number, attributes) => Self::Fetch {
                sequence_number: *sequence_number,
                attributes: attributes.iter().map(FetchAttribute::from).collect(),
            },
            other => Self::Other(format!("{other:?}")),
        }
    }
}

impl From<&imap_proto::Status> for Status {
    fn from(value: &imap_proto::Status) -> Self {
        match value {
            imap_proto::Status::Ok => Self::Ok,
            imap_proto::Status::No => Self::No,
            imap_proto::Status::Bad => Self::Bad,
            imap_proto::Status::PreAuth => Self::PreAuth,
            imap_proto::Status::Bye => Self::Bye,
        }
    }
}

impl From<&imap_proto::ResponseCode<'_>> for ResponseCode {
    fn from(value: &imap_proto::ResponseCode<'_>) -> Self {
        match value {
            imap_proto::ResponseCode::UidValidity(validity) => Self::UidValidity(*validity),
            imap_proto::ResponseCode::UidNext(next) => Self::UidNext(*next),
            imap_proto::ResponseCode::ReadOnly => Self::ReadOnly,
            imap_proto::ResponseCode::ReadWrite => Self::ReadWrite,
            imap_proto::ResponseCode::Capabilities(capabilities) => {
                Self::Capabilities(capabilities.iter().map(capability_name).collect())
            }
            other => {
                trace!("ignoring response code {other:?}");
                Self::Other
            }
        }
    }
}

impl From<&AttributeValue<'_>> for FetchAttribute {
    fn from(value: &AttributeValue<'_>) -> Self {
        match value {
            AttributeValue::Uid(uid) => Self::Uid(*uid),
            AttributeValue::BodySection {
                section: None,
                data,
                ..
            }
            | AttributeValue::Rfc822(data) => Self::Body(data.as_ref().map(|d| d.to_vec())),
            _ => Self::Other,
        }
    }
}

fn capability_name(capability: &imap_proto::Capability<'_>) -> String {
    match capability {
        imap_proto::Capability::Imap4rev1 => "IMAP4rev1".to_string(),
        imap_proto::Capability::Auth(mechanism) => format!("AUTH={mechanism}"),
        imap_proto::Capability::Atom(atom) => atom.to_string(),
    }
}

fn folder_attribute(attribute: &NameAttribute<'_>) -> Option<FolderAttribute> {
    match attribute {
        NameAttribute::NoSelect => Some(FolderAttribute::NoSelect),
        NameAttribute::NoInferiors => Some(FolderAttribute::NoInferiors),
        NameAttribute::Marked => Some(FolderAttribute::Marked),
        NameAttribute::Unmarked => Some(FolderAttribute::Unmarked),
        NameAttribute::All => Some(FolderAttribute::All),
        NameAttribute::Archive => Some(FolderAttribute::Archive),
        NameAttribute::Drafts => Some(FolderAttribute::Drafts),
        NameAttribute::Flagged => Some(FolderAttribute::Flagged),
        NameAttribute::Junk => Some(FolderAttribute::Junk),
        NameAttribute::Sent => Some(FolderAttribute::Sent),
        NameAttribute::Trash => Some(FolderAttribute::Trash),
        NameAttribute::Extension(extension) => extension_attribute(extension),
        _ => None,
    }
}

fn extension_attribute(extension: &Cow<'_, str>) -> Option<FolderAttribute> {
    let attribute = FolderAttribute::from_extension(extension);
    if attribute.is_none() {
        trace!("ignoring folder attribute {extension}");
    }
    attribute
}

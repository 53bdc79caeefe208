mod folder;
mod message_identity;
mod sequence_set;
mod uid;
mod uid_validity;

pub use folder::FolderAttribute;
pub use folder::RemoteFolder;
pub use folder::RemoteFolderSnapshot;
pub use folder::RemoteFolderSnapshotBuilder;
pub use message_identity::MessageIdentity;
pub use sequence_set::SequenceSet;
pub use uid::Uid;
pub use uid_validity::UidValidity;

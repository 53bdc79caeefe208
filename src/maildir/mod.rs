pub mod folder_name;
#[expect(clippy::module_inception)]
mod maildir;
mod seen_mails;

pub use maildir::Maildir;
pub use maildir::StoreError;
pub use maildir::StoredMessage;
pub use seen_mails::SEEN_MAILS_FILENAME;
pub use seen_mails::SeenMails;
pub use seen_mails::SeenMailsError;

mod driver;
mod folder_sync;
#[cfg(test)]
pub mod mock_remote;
mod progress;
mod repository;
mod selection;

pub use driver::archive;
pub use folder_sync::FolderReport;
pub use folder_sync::FolderSync;
pub use folder_sync::FolderSyncError;
pub use folder_sync::SyncOptions;
pub use repository::RemoteRepository;
pub use selection::FolderSelection;
pub use selection::folder_display_path;

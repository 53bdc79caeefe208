use std::collections::HashSet;

use log::{debug, warn};
use thiserror::Error;

use crate::repository::RemoteFolder;

#[derive(Debug, Error)]
#[error("no such folder(s) on the server: {}", .0.join(", "))]
pub struct UnknownFolders(pub Vec<String>);

/// Include and exclude filters, given as `/`-delimited folder names.
///
/// A name matches the folder of that name and every folder beneath it. When includes are
/// given, excludes are ignored.
#[derive(Debug, Default, Clone)]
pub struct FolderSelection {
    includes: Vec<String>,
    excludes: Vec<String>,
}

impl FolderSelection {
    pub fn new(includes: Vec<String>, excludes: Vec<String>) -> Self {
        if !includes.is_empty() && !excludes.is_empty() {
            warn!("both includes and excludes are given, ignoring excludes");
        }

        Self {
            includes: includes.iter().map(|name| normalized(name)).collect(),
            excludes: excludes.iter().map(|name| normalized(name)).collect(),
        }
    }

    /// Every filter name has to denote a remote folder or a top level folder.
    pub fn validate(
        &self,
        folders: &[RemoteFolder],
        separator: &str,
    ) -> Result<(), UnknownFolders> {
        let mut known = HashSet::new();
        for folder in folders {
            let path = folder_display_path(folder, separator);
            if let Some((root, _)) = path.split_once('/') {
                known.insert(root.to_string());
            }
            known.insert(path);
        }

        let unknown: Vec<String> = self
            .includes
            .iter()
            .chain(&self.excludes)
            .filter(|name| !known.contains(name.as_str()))
            .cloned()
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(UnknownFolders(unknown))
        }
    }

    /// Folders to archive, in server order.
    pub fn select<'f>(
        &self,
        folders: &'f [RemoteFolder],
        separator: &str,
    ) -> Vec<&'f RemoteFolder> {
        folders
            .iter()
            .filter(|folder| {
                if !folder.is_selectable() {
                    debug!("skipping {} since it cannot hold messages", folder.path());
                    return false;
                }
                let path = folder_display_path(folder, separator);
                if self.includes.is_empty() {
                    !self.excludes.iter().any(|name| matches(&path, name))
                } else {
                    self.includes.iter().any(|name| matches(&path, name))
                }
            })
            .collect()
    }
}

/// Folder path as shown to users, with `/` as delimiter whatever the server uses.
pub fn display_path(path: &str, separator: &str) -> String {
    if separator.is_empty() || separator == "/" {
        path.to_string()
    } else {
        path.replace(separator, "/")
    }
}

/// Like [`display_path`], preferring the delimiter the server listed for `folder`.
pub fn folder_display_path(folder: &RemoteFolder, separator: &str) -> String {
    display_path(folder.path(), folder.delimiter().unwrap_or(separator))
}

fn normalized(name: &str) -> String {
    name.trim_end_matches('/').to_string()
}

fn matches(path: &str, name: &str) -> bool {
    path.strip_prefix(name)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

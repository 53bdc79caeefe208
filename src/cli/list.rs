use anyhow::{Context as _, Result};

use crate::sync::{RemoteRepository, folder_display_path};

/// Names of all remote folders with `/` as delimiter, in server order.
pub async fn folder_names<R: RemoteRepository>(remote: &mut R) -> Result<Vec<String>> {
    let separator = remote
        .separator()
        .await
        .context("cannot query folder separator")?;
    let folders = remote
        .list_folders()
        .await
        .context("cannot list folders")?;

    Ok(folders
        .iter()
        .map(|folder| folder_display_path(folder, &separator))
        .collect())
}

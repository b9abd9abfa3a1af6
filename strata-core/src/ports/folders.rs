use async_trait::async_trait;
use strata_model::MusicFolder;

use crate::error::Result;

/// Configured music folders.
#[async_trait]
pub trait MusicFolderRepository: Send + Sync {
    /// Every configured folder, enabled or not, by id.
    async fn all_folders(&self) -> Result<Vec<MusicFolder>>;

    async fn update_folder(&self, folder: &MusicFolder) -> Result<()>;
}

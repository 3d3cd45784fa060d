use serde::Deserialize;
use std::io::Write;
use std::path::PathBuf;
use tokio::fs;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct BackendConfig {
    pub root_dir: String,
    #[serde(default)]
    pub sync_to_disk: bool,
}

/// Thin wrapper over `tokio::fs` rooted at a directory, shared by the filesystem backends.
#[derive(Clone, Debug)]
pub struct Backend {
    root: PathBuf,
    sync_to_disk: bool,
}

impl Backend {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root_dir),
            sync_to_disk: config.sync_to_disk,
        }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    pub async fn read(&self, path: &str) -> Result<Vec<u8>, std::io::Error> {
        fs::read(self.full_path(path)).await
    }

    /// Replaces the file content atomically: data lands in a temporary sibling first.
    pub async fn write(&self, path: &str, data: &[u8]) -> Result<(), std::io::Error> {
        let full_path = self.full_path(path);
        let parent = full_path
            .parent()
            .map_or_else(|| self.root.clone(), std::path::Path::to_path_buf);
        fs::create_dir_all(&parent).await?;

        let data = data.to_vec();
        let sync_to_disk = self.sync_to_disk;
        tokio::task::spawn_blocking(move || -> Result<(), std::io::Error> {
            let mut temp_file = tempfile::NamedTempFile::new_in(&parent)?;
            temp_file.write_all(&data)?;

            if sync_to_disk {
                temp_file.flush()?;
                temp_file.as_file().sync_all()?;
            }

            temp_file.persist(full_path)?;
            Ok(())
        })
        .await
        .map_err(std::io::Error::other)?
    }

    pub async fn file_size(&self, path: &str) -> Result<u64, std::io::Error> {
        let metadata = fs::metadata(self.full_path(path)).await?;
        Ok(metadata.len())
    }
}

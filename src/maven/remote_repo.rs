use std::ffi::OsString;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs::{create_dir_all, remove_file, rename, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, trace};

use crate::maven::coordinates::MavenArtifactRef;
use crate::maven::paths::as_maven_path;
use crate::util::validating_http_downloader::ValidatingHttpDownloader;

/// A Maven2 layout repository reachable over HTTP(S)
pub struct RemoteMavenRepo {
    name: String,
    downloader: ValidatingHttpDownloader,
}

impl RemoteMavenRepo {
    pub fn new(name: &str, base_uri: String) -> anyhow::Result<RemoteMavenRepo> {
        Ok(RemoteMavenRepo {
            name: name.to_string(),
            downloader: ValidatingHttpDownloader::new(base_uri)?,
        })
    }

    pub fn with_credentials(self, username: &str, password: &str) -> RemoteMavenRepo {
        RemoteMavenRepo {
            name: self.name,
            downloader: self.downloader.with_basic_auth(username, password),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_uri(&self) -> &str {
        self.downloader.base_uri()
    }

    /// Downloads an artifact to `target`, returning `false` if the repository does not have it.
    ///
    /// The data is written to a ".part" file next to the target and renamed once it is complete
    ///  and validated, so an interrupted download never leaves a truncated file at `target`.
    pub async fn download_artifact(&self, artifact_ref: &MavenArtifactRef, target: &Path) -> anyhow::Result<bool> {
        let download = match self.downloader.get(&as_maven_path(artifact_ref)).await? {
            Some(download) => download,
            None => {
                debug!("{} does not contain {}", self.name, artifact_ref);
                return Ok(false);
            }
        };

        if let Some(dir) = target.parent() {
            create_dir_all(dir).await?;
        }

        let part_path = part_path(target);
        trace!("downloading {} from {} to {}", artifact_ref, self.name, part_path.display());

        if download.checksums.is_empty() {
            debug!("{} sent no checksum for {}, not validating it", self.name, artifact_ref);
        }
        let mut data = download.data;
        let result: anyhow::Result<()> = async {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&part_path)
                .await?;

            while let Some(bytes) = data.next().await {
                file.write_all(&bytes?).await?;
            }
            file.flush().await?;
            Ok(())
        }.await;

        match result {
            Ok(_) => {
                rename(&part_path, target).await?;
                Ok(true)
            }
            Err(e) => {
                if let Err(cleanup) = remove_file(&part_path).await {
                    error!("error cleaning up {} after failed download: {}", part_path.display(), cleanup);
                }
                Err(e.context(format!("failed to download {} from {}", artifact_ref, self.name)))
            }
        }
    }
}

fn part_path(target: &Path) -> PathBuf {
    let mut file_name: OsString = target.file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    file_name.push(".part");
    target.with_file_name(file_name)
}

use crate::revapatch::config::VersionConstraint;
use crate::revapatch::error::ProvisionError;
use crate::revapatch::tui::progress;
use async_trait::async_trait;
use indicatif::ProgressBar;
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

const API_ROOT: &str = "https://api.github.com/repos";

/// Release metadata as returned by the GitHub releases API.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub content_type: String,
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}

/// Where tool releases come from.
#[async_trait]
pub trait ReleaseApi: Send + Sync {
    async fn fetch_release(
        &self,
        project: &str,
        version: &VersionConstraint,
    ) -> Result<Release, ProvisionError>;

    /// Streams the asset at `url` into `dest`, returning the byte count.
    async fn download_asset(&self, url: &str, dest: &Path) -> Result<u64, ProvisionError>;
}

/// [`ReleaseApi`] for api.github.com.
pub struct GitHubReleases {
    client: Client,
    token: Option<String>,
}

impl GitHubReleases {
    pub fn new() -> Result<Self, ProvisionError> {
        let client = Client::builder()
            .user_agent(concat!("revapatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let token = std::env::var("GITHUB_TOKEN")
            .or_else(|_| std::env::var("GH_TOKEN"))
            .ok()
            .filter(|t| !t.is_empty());

        Ok(Self { client, token })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

pub fn release_url(project: &str, version: &VersionConstraint) -> String {
    format!("{API_ROOT}/{project}/releases/{}", version.release_path())
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

#[async_trait]
impl ReleaseApi for GitHubReleases {
    async fn fetch_release(
        &self,
        project: &str,
        version: &VersionConstraint,
    ) -> Result<Release, ProvisionError> {
        let url = release_url(project, version);
        debug!(%url, "Fetching release metadata");

        let release = self
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json::<Release>()
            .await?;

        Ok(release)
    }

    async fn download_asset(&self, url: &str, dest: &Path) -> Result<u64, ProvisionError> {
        debug!(%url, dest = %dest.display(), "Downloading release asset");

        let response = self.get(url).send().await?.error_for_status()?;
        let total_size = response.content_length().unwrap_or(0);
        let label = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| url.to_string());
        let pb = progress::create_bytes_progress(format!("Downloading {label}"), total_size);

        let written = save_stream(response.bytes_stream(), dest, &pb).await;

        pb.finish_and_clear();
        written
    }
}

/// Writes `stream` to `<dest>.part` and renames it to `dest` once complete.
/// The partial file is removed when the transfer fails.
async fn save_stream<S, B, E>(stream: S, dest: &Path, pb: &ProgressBar) -> Result<u64, ProvisionError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    ProvisionError: From<E>,
{
    let part = partial_path(dest);

    match write_stream(stream, &part, pb).await {
        Ok(written) => {
            tokio::fs::rename(&part, dest).await?;
            Ok(written)
        }
        Err(e) => {
            if let Err(rm) = tokio::fs::remove_file(&part).await {
                debug!(path = %part.display(), error = %rm, "Could not remove partial download");
            }
            Err(e)
        }
    }
}

async fn write_stream<S, B, E>(stream: S, part: &Path, pb: &ProgressBar) -> Result<u64, ProvisionError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    ProvisionError: From<E>,
{
    tokio::pin!(stream);
    let mut file = BufWriter::new(File::create(part).await?);
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let bytes = chunk.as_ref();
        file.write_all(bytes).await?;
        written += bytes.len() as u64;
        pb.inc(bytes.len() as u64);
    }

    file.flush().await?;
    Ok(written)
}

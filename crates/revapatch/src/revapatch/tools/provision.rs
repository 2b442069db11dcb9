use crate::revapatch::config::{ToolKind, ToolSpec, VersionConstraint};
use crate::revapatch::error::ProvisionError;
use crate::revapatch::tools::naming::{canonical_name, stale_glob, tag_version};
use crate::revapatch::tools::release::{ReleaseApi, ReleaseAsset};
use crate::revapatch::utils::ensure_dir;
use glob::Pattern;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Picks the asset of a release that is the wanted tool.
#[derive(Debug, Clone)]
pub struct AssetFilter {
    content_type: Option<String>,
    name: Option<Regex>,
}

impl AssetFilter {
    /// At least one of `content_type` and `name_filter` is required. The name
    /// filter has to match the whole asset name.
    pub fn new(
        project: &str,
        content_type: Option<&str>,
        name_filter: Option<&str>,
    ) -> Result<Self, ProvisionError> {
        if content_type.is_none() && name_filter.is_none() {
            return Err(ProvisionError::Unconstrained {
                project: project.to_string(),
            });
        }

        let name = name_filter
            .map(|f| Regex::new(&format!("^(?:{f})$")))
            .transpose()?;

        Ok(Self {
            content_type: content_type.map(str::to_string),
            name,
        })
    }

    pub fn matches(&self, asset: &ReleaseAsset) -> bool {
        self.content_type
            .as_deref()
            .is_none_or(|ct| asset.content_type == ct)
            && self.name.as_ref().is_none_or(|re| re.is_match(&asset.name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioned {
    /// A new file was downloaded.
    Installed(PathBuf),
    /// The canonical file was already there, nothing was transferred.
    Present(PathBuf),
    /// The release had no asset passing the filter.
    NoMatchingAsset,
}

impl Provisioned {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Provisioned::Installed(path) | Provisioned::Present(path) => Some(path),
            Provisioned::NoMatchingAsset => None,
        }
    }
}

/// Keeps exactly one up-to-date copy of each tool in a directory.
pub struct Provisioner<R: ReleaseApi> {
    api: R,
}

impl<R: ReleaseApi> Provisioner<R> {
    pub fn new(api: R) -> Self {
        Self { api }
    }

    /// Makes sure the release of `project` selected by `version` and `filter`
    /// is present in `directory`, replacing older copies of the same tool.
    pub async fn ensure_tool(
        &self,
        directory: &Path,
        project: &str,
        version: &VersionConstraint,
        filter: &AssetFilter,
    ) -> Result<Provisioned, ProvisionError> {
        let release = self.api.fetch_release(project, version).await?;

        let Some(asset) = release.assets.iter().find(|a| filter.matches(a)) else {
            warn!(project, tag = %release.tag_name, "No matching asset in release");
            return Ok(Provisioned::NoMatchingAsset);
        };

        let release_version = tag_version(&release.tag_name);
        let file_name = canonical_name(&asset.name, release_version);
        let path = directory.join(&file_name);

        if path.exists() {
            debug!(path = %path.display(), "Tool already up to date");
            return Ok(Provisioned::Present(path));
        }

        info!("Downloading tool {file_name}...");
        ensure_dir(directory)?;
        remove_stale(directory, &file_name, release_version)?;
        self.api.download_asset(&asset.download_url, &path).await?;

        Ok(Provisioned::Installed(path))
    }

    /// [`Self::ensure_tool`] driven by a configured [`ToolSpec`].
    pub async fn ensure_spec(
        &self,
        directory: &Path,
        spec: &ToolSpec,
    ) -> Result<Provisioned, ProvisionError> {
        let filter = AssetFilter::new(spec.project, spec.content_type, spec.name_filter)?;
        self.ensure_tool(directory, spec.project, &spec.version, &filter)
            .await
    }
}

/// Deletes every file in `directory` that is another version of `file_name`.
fn remove_stale(
    directory: &Path,
    file_name: &str,
    version: &str,
) -> Result<usize, ProvisionError> {
    let pattern = Pattern::new(&stale_glob(file_name, version))?;
    let mut removed = 0;

    for entry in std::fs::read_dir(directory)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        if pattern.matches(&entry.file_name().to_string_lossy()) {
            debug!(path = %entry.path().display(), "Removing stale tool");
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }

    Ok(removed)
}

/// Finds the installed file whose name mentions `kind`.
pub fn locate_tool(directory: &Path, kind: ToolKind) -> Result<PathBuf, ProvisionError> {
    locate_by_glob(directory, &format!("*{kind}*")).ok_or_else(|| ProvisionError::ToolNotFound {
        kind: kind.as_str(),
        dir: directory.to_path_buf(),
    })
}

/// First file in `directory` (by name) matching `glob`.
pub fn locate_by_glob(directory: &Path, glob: &str) -> Option<PathBuf> {
    let pattern = Pattern::new(glob).ok()?;
    let mut found: Vec<PathBuf> = std::fs::read_dir(directory)
        .ok()?
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
        .filter(|e| pattern.matches(&e.file_name().to_string_lossy()))
        .map(|e| e.path())
        .collect();

    found.sort();
    found.into_iter().next()
}

//! Run configuration.
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! an optional `revapatch.toml`, then command-line flags. The merged
//! [`Config`] is built once at startup and handed to every component.

use crate::revapatch::error::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod apps;
pub mod sources;

pub use apps::{AppCatalog, AppEntry};
pub use sources::{PatchSource, SourceProfile, ToolKind, ToolSpec, VersionConstraint};

pub const CONFIG_FILE_NAME: &str = "revapatch.toml";

/// Download preferences passed to the APK downloader.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// armeabi-v7a, arm64-v8a, x86 or x86_64.
    pub arch: String,
    /// 240dpi, 320dpi, ... or nodpi.
    pub dpi: String,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            arch: "arm64-v8a".to_string(),
            dpi: "nodpi".to_string(),
        }
    }
}

/// Shape of `revapatch.toml`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub src_dir: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub tools_dir: Option<PathBuf>,
    pub options_dir: Option<PathBuf>,
    pub keystore: Option<PathBuf>,
    pub download: Option<DownloadSettings>,
    pub default_patch_source: Option<PatchSource>,
    pub apps: BTreeMap<String, AppEntry>,
}

impl FileSettings {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `explicit` if given, otherwise `<base>/revapatch.toml` when it exists.
    pub fn load(explicit: Option<&Path>, base: &Path) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = base.join(CONFIG_FILE_NAME);
                if !candidate.is_file() {
                    return Ok(Self::default());
                }
                candidate
            }
        };

        debug!(path = %path.display(), "Loading settings file");
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        Self::from_toml(&text, &path)
    }
}

/// Command-line overrides, already parsed.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub src_dir: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub tools_dir: Option<PathBuf>,
    pub options_dir: Option<PathBuf>,
    pub keystore: Option<PathBuf>,
    pub arch: Option<String>,
    pub dpi: Option<String>,
    pub patch_source: Option<PatchSource>,
    pub cli_version: Option<VersionConstraint>,
    pub patches_version: Option<VersionConstraint>,
    pub integrations_version: Option<VersionConstraint>,
}

/// The immutable configuration of one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// APKs patched when no targets are given.
    pub src_dir: PathBuf,
    /// Patched APKs end up here.
    pub out_dir: PathBuf,
    pub tools_dir: PathBuf,
    pub options_dir: PathBuf,
    pub keystore: PathBuf,
    pub download: DownloadSettings,
    pub profile: SourceProfile,
    pub apps: AppCatalog,
}

impl Config {
    pub fn resolve(base: &Path, file: FileSettings, overrides: Overrides) -> Self {
        let pick = |cli: Option<PathBuf>, file: Option<PathBuf>, default: PathBuf| {
            absolutize(base, cli.or(file).unwrap_or(default))
        };

        let tools_dir = pick(overrides.tools_dir, file.tools_dir, base.join("tools"));
        let out_dir = pick(
            overrides.out_dir,
            file.out_dir,
            base.join("Patched-APKs"),
        );

        let mut download = file.download.unwrap_or_default();
        if let Some(arch) = overrides.arch {
            download.arch = arch;
        }
        if let Some(dpi) = overrides.dpi {
            download.dpi = dpi;
        }

        let source = overrides
            .patch_source
            .or(file.default_patch_source)
            .unwrap_or(PatchSource::Rv);
        let mut profile = source.profile();
        for (kind, version) in [
            (ToolKind::Cli, overrides.cli_version),
            (ToolKind::Patches, overrides.patches_version),
            (ToolKind::Integrations, overrides.integrations_version),
        ] {
            if let Some(version) = version {
                profile.pin(kind, version);
            }
        }

        let mut apps = AppCatalog::builtin();
        apps.extend(file.apps);

        Self {
            src_dir: pick(overrides.src_dir, file.src_dir, base.to_path_buf()),
            out_dir,
            options_dir: pick(overrides.options_dir, file.options_dir, base.to_path_buf()),
            keystore: pick(overrides.keystore, file.keystore, base.join("patch.keystore")),
            tools_dir,
            download,
            profile,
            apps,
        }
    }

    /// Where this source's cli, patches and integrations live.
    pub fn source_tools_dir(&self) -> PathBuf {
        self.tools_dir.join(self.profile.subdir)
    }

    /// Freshly downloaded, unpatched APKs.
    pub fn apks_dir(&self) -> PathBuf {
        self.tools_dir.join("APKs")
    }
}

fn absolutize(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

//! APKMirror downloads through the external `apkmd` tool.

use crate::revapatch::config::{AppEntry, DownloadSettings, VersionConstraint};
use crate::revapatch::error::{DownloadError, ProvisionError};
use crate::revapatch::exec::{Exec, Invocation, OutputMode};
use crate::revapatch::patcher::versions::AppVersion;
use crate::revapatch::tools::provision::{AssetFilter, Provisioner, locate_by_glob};
use crate::revapatch::tools::release::ReleaseApi;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const APKMD_PROJECT: &str = "tanishqmanuja/apkmirror-downloader";

/// The release asset name of apkmd for this platform.
pub fn apkmd_asset_name() -> &'static str {
    if cfg!(windows) { "apkmd.exe" } else { "apkmd" }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ApkmdConfig {
    pub options: ApkmdOptions,
    pub apps: Vec<ApkmdApp>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ApkmdOptions {
    pub arch: String,
    pub dpi: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ApkmdApp {
    pub name: String,
    pub org: String,
    pub repo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ApkmdConfig {
    /// A one-app config. The download lands as `<app> <version|latest>.apk`.
    pub fn single(
        app_name: &str,
        app: &AppEntry,
        version: Option<&AppVersion>,
        defaults: &DownloadSettings,
    ) -> Self {
        let version = version.map(ToString::to_string);
        let label = version.as_deref().unwrap_or("latest");

        Self {
            options: ApkmdOptions {
                arch: app.arch.clone().unwrap_or_else(|| defaults.arch.clone()),
                dpi: app.dpi.clone().unwrap_or_else(|| defaults.dpi.clone()),
            },
            apps: vec![ApkmdApp {
                name: format!("{app_name} {label}"),
                org: app.org.clone(),
                repo: app.repo.clone(),
                version,
            }],
        }
    }

    pub fn output_file_name(&self) -> String {
        self.apps
            .first()
            .map(|app| format!("{}.apk", app.name))
            .unwrap_or_default()
    }
}

/// An installed `apkmd` binary.
#[derive(Debug, Clone)]
pub struct Downloader {
    executable: PathBuf,
}

impl Downloader {
    pub fn new(executable: PathBuf) -> Self {
        Self { executable }
    }

    /// Installs or updates apkmd in `tools_dir`.
    pub async fn provision<R: ReleaseApi>(
        provisioner: &Provisioner<R>,
        tools_dir: &Path,
    ) -> Result<Self, ProvisionError> {
        let filter = AssetFilter::new(APKMD_PROJECT, None, Some(&regex::escape(apkmd_asset_name())))?;
        provisioner
            .ensure_tool(tools_dir, APKMD_PROJECT, &VersionConstraint::Latest, &filter)
            .await?;

        let executable = locate_by_glob(tools_dir, "apkmd*").ok_or_else(|| {
            ProvisionError::ToolNotFound {
                kind: "apkmd",
                dir: tools_dir.to_path_buf(),
            }
        })?;
        make_executable(&executable)?;

        Ok(Self::new(executable))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Runs apkmd for `config` inside `dir` and returns the downloaded file.
    pub async fn download<E: Exec>(
        &self,
        exec: &E,
        config: &ApkmdConfig,
        dir: &Path,
        app_name: &str,
    ) -> Result<PathBuf, DownloadError> {
        std::fs::create_dir_all(dir)?;

        let mut config_file = tempfile::Builder::new()
            .prefix("apkmd-")
            .suffix(".json")
            .tempfile()?;
        serde_json::to_writer(&mut config_file, config)?;
        config_file.flush()?;
        debug!(config = %config_file.path().display(), "Wrote downloader config");

        let output = exec
            .run(
                &Invocation::new(&self.executable)
                    .arg(config_file.path())
                    .current_dir(dir)
                    .mode(OutputMode::Silent),
            )
            .await?;

        if !output.success {
            return Err(DownloadError::Failed { code: output.code });
        }

        let path = dir.join(config.output_file_name());
        if !path.is_file() {
            return Err(DownloadError::Missing {
                app: app_name.to_string(),
            });
        }

        info!("Downloaded {}", path.display());
        Ok(path)
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)?.permissions();
    if perms.mode() & 0o111 != 0o111 {
        perms.set_mode(perms.mode() | 0o755);
        std::fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revapatch::exec::fake::{FakeExec, failed, ok_with_stdout};
    use crate::revapatch::tools::provision::tests::FakeReleases;

    fn reddit() -> AppEntry {
        AppEntry {
            package: "com.reddit.frontpage".into(),
            org: "redditinc".into(),
            repo: "reddit".into(),
            arch: Some("universal".into()),
            dpi: None,
        }
    }

    #[test]
    fn config_with_version_and_overrides() {
        let version: AppVersion = "2024.17.0".parse().unwrap();
        let config = ApkmdConfig::single("Reddit", &reddit(), Some(&version), &DownloadSettings::default());
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "options": { "arch": "universal", "dpi": "nodpi" },
                "apps": [{
                    "name": "Reddit 2024.17.0",
                    "org": "redditinc",
                    "repo": "reddit",
                    "version": "2024.17.0"
                }]
            })
        );
        assert_eq!(config.output_file_name(), "Reddit 2024.17.0.apk");
    }

    #[test]
    fn config_without_version_asks_for_latest() {
        let mut app = reddit();
        app.arch = None;
        let config = ApkmdConfig::single("Reddit", &app, None, &DownloadSettings::default());
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["apps"][0]["name"], "Reddit latest");
        assert!(json["apps"][0].get("version").is_none());
        assert_eq!(json["options"]["arch"], "arm64-v8a");
    }

    #[tokio::test]
    async fn download_finds_predictable_file() {
        let dir = tempfile::tempdir().unwrap();
        let apks = dir.path().join("APKs");
        let exec = FakeExec::new(|inv| {
            let text = std::fs::read_to_string(inv.args[0].clone())?;
            let config: serde_json::Value = serde_json::from_str(&text)?;
            let name = config["apps"][0]["name"].as_str().unwrap_or_default().to_string();
            let cwd = inv.cwd.clone().unwrap_or_default();
            std::fs::write(cwd.join(format!("{name}.apk")), b"PK")?;
            Ok(ok_with_stdout(""))
        });
        let config = ApkmdConfig::single("Reddit", &reddit(), None, &DownloadSettings::default());

        let path = Downloader::new(PathBuf::from("apkmd"))
            .download(&exec, &config, &apks, "Reddit")
            .await
            .unwrap();

        assert_eq!(path, apks.join("Reddit latest.apk"));
        assert_eq!(exec.calls()[0].mode, OutputMode::Silent);
    }

    #[tokio::test]
    async fn nothing_downloaded_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let exec = FakeExec::new(|_| Ok(ok_with_stdout("")));
        let config = ApkmdConfig::single("Reddit", &reddit(), None, &DownloadSettings::default());

        let err = Downloader::new(PathBuf::from("apkmd"))
            .download(&exec, &config, dir.path(), "Reddit")
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Missing { app } if app == "Reddit"));
    }

    #[tokio::test]
    async fn downloader_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let exec = FakeExec::new(|_| Ok(failed(3)));
        let config = ApkmdConfig::single("Reddit", &reddit(), None, &DownloadSettings::default());

        let err = Downloader::new(PathBuf::from("apkmd"))
            .download(&exec, &config, dir.path(), "Reddit")
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Failed { code: Some(3) }));
    }

    #[tokio::test]
    async fn provisions_platform_binary() {
        let dir = tempfile::tempdir().unwrap();
        let releases = FakeReleases::new(
            "v1.4.2",
            &[
                ("apkmd.exe", "application/x-msdownload"),
                ("apkmd", "application/octet-stream"),
                ("apkmd-macos", "application/octet-stream"),
            ],
        );
        let provisioner = Provisioner::new(releases);

        let downloader = Downloader::provision(&provisioner, dir.path()).await.unwrap();
        let expected = if cfg!(windows) { "apkmd-1.4.2.exe" } else { "apkmd-1.4.2" };

        assert_eq!(downloader.executable(), dir.path().join(expected));
    }
}

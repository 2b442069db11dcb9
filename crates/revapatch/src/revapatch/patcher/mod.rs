use crate::revapatch::apk::ApkFile;
use crate::revapatch::config::{Config, SourceProfile, ToolKind};
use crate::revapatch::downloader::{ApkmdConfig, Downloader};
use crate::revapatch::error::{PatchError, ProvisionError};
use crate::revapatch::exec::{Exec, OutputMode};
use crate::revapatch::java::JavaRuntime;
use crate::revapatch::tools::provision::{Provisioner, locate_tool};
use crate::revapatch::tools::release::ReleaseApi;
use crate::revapatch::tui::progress::create_spinner;
use crate::revapatch::utils::{
    dir_entries, normal_file_name, purge_output_dir, remove_dir_if_empty, remove_dir_quietly,
};
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

pub mod versions;

use versions::resolve_supported_version;

/// Name of the patcher's scratch directory under the system temp dir.
pub const RESOURCE_CACHE_DIR: &str = "revanced-resource-cache";

/// The installed tool files of one patch source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub cli: PathBuf,
    pub patches: PathBuf,
    pub integrations: Option<PathBuf>,
}

impl Toolchain {
    /// Brings every tool of `profile` up to date in `dir` and locates them.
    pub async fn provision<R: ReleaseApi>(
        provisioner: &Provisioner<R>,
        profile: &SourceProfile,
        dir: &Path,
    ) -> Result<Self, ProvisionError> {
        for spec in &profile.tools {
            let spinner = create_spinner(format!("Checking {} ({})...", spec.kind, spec.version));
            let outcome = provisioner.ensure_spec(dir, spec).await;
            spinner.finish_and_clear();
            if let Some(path) = outcome?.path() {
                debug!(kind = %spec.kind, path = %path.display(), "Tool ready");
            }
        }

        let integrations = if profile.has(ToolKind::Integrations) {
            Some(locate_tool(dir, ToolKind::Integrations)?)
        } else {
            None
        };

        Ok(Self {
            cli: locate_tool(dir, ToolKind::Cli)?,
            patches: locate_tool(dir, ToolKind::Patches)?,
            integrations,
        })
    }
}

/// Drives the patcher for single APKs and for downloaded apps.
pub struct Patcher<'a, E: Exec> {
    config: &'a Config,
    exec: &'a E,
    java: JavaRuntime,
    tools: Toolchain,
}

impl<'a, E: Exec> Patcher<'a, E> {
    pub fn new(config: &'a Config, exec: &'a E, java: JavaRuntime, tools: Toolchain) -> Self {
        Self {
            config,
            exec,
            java,
            tools,
        }
    }

    /// Where the patched copy of `source` is written.
    pub fn output_path(&self, source: &Path) -> PathBuf {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.config
            .out_dir
            .join(format!("{}{}", self.config.profile.prepend, file_name))
    }

    /// Options file used for a local APK, named after its version-less stem.
    pub fn options_path_for(&self, source: &Path) -> PathBuf {
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let normal = normal_file_name(&file_name);
        let stem = Path::new(&normal)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(normal);

        self.config.options_dir.join(format!("{stem}.json"))
    }

    /// Patches `source` into the output directory and returns the output path.
    pub async fn patch(
        &self,
        source: &Path,
        options: Option<&Path>,
    ) -> Result<PathBuf, PatchError> {
        let apk = ApkFile::open(source)?;
        let out_path = self.output_path(source);
        let options = options
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.options_path_for(source));
        let temp_dir = std::env::temp_dir().join(RESOURCE_CACHE_DIR);

        info!("Patching {}...", apk.file_name());

        let mut invocation = self
            .java
            .jar(&self.tools.cli)
            .arg("patch")
            .flag("--patch-bundle=", &self.tools.patches);
        if let Some(integrations) = &self.tools.integrations {
            invocation = invocation.flag("--merge=", integrations);
        }
        let invocation = invocation
            .flag("--options=", &options)
            .flag("--keystore=", &self.config.keystore)
            .flag("--temporary-files-path=", &temp_dir)
            .flag("--out=", &out_path)
            .arg(apk.path())
            .mode(OutputMode::Inherit);

        let existing = dir_entries(&self.config.out_dir);
        let result = self.exec.run(&invocation).await;

        remove_dir_quietly(&temp_dir);
        purge_output_dir(&self.config.out_dir, &existing, &self.config.keystore);

        let output = result?;
        if !output.success {
            return Err(PatchError::Failed { code: output.code });
        }

        info!("Finished patching {} successfully!", out_path.display());
        Ok(out_path)
    }

    /// Downloads the newest supported version of `app_name` and patches it.
    pub async fn download_and_patch(
        &self,
        app_name: &str,
        downloader: &Downloader,
    ) -> anyhow::Result<PathBuf> {
        let app = self
            .config
            .apps
            .get(app_name)
            .with_context(|| format!("{app_name} is not in the app catalog"))?;

        let version = resolve_supported_version(
            self.exec,
            &self.java,
            &self.tools.cli,
            &self.tools.patches,
            &app.package,
        )
        .await
        .with_context(|| format!("Could not determine a supported version of {app_name}"))?;

        match &version {
            Some(v) => info!("Downloading {app_name} {v}..."),
            None => info!("Downloading {app_name}..."),
        }

        let apks_dir = self.config.apks_dir();
        let request = ApkmdConfig::single(app_name, app, version.as_ref(), &self.config.download);
        let spinner = create_spinner(format!("Downloading {app_name}..."));
        let downloaded = downloader
            .download(self.exec, &request, &apks_dir, app_name)
            .await;
        spinner.finish_and_clear();

        let apk_path = match downloaded {
            Ok(path) => path,
            Err(e) => {
                remove_dir_if_empty(&apks_dir);
                return Err(e).with_context(|| format!("Failed to download {app_name}"));
            }
        };

        let options = self.config.options_dir.join(format!("{app_name}.json"));
        let patched = self.patch(&apk_path, Some(&options)).await;

        if let Err(e) = std::fs::remove_file(&apk_path) {
            warn!("Could not remove {}: {e}", apk_path.display());
        }
        remove_dir_if_empty(&apks_dir);

        patched.with_context(|| format!("Failed to patch {app_name}"))
    }
}

/// Logs a per-item failure with its whole cause chain.
pub fn report_failure(target: &str, err: &anyhow::Error) {
    error!("{target}: {err:#}");
}

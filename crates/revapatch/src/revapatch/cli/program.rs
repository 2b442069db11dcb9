use crate::revapatch::cli::{Cli, Target, default_targets, resolve_targets};
use crate::revapatch::config::{Config, FileSettings};
use crate::revapatch::downloader::Downloader;
use crate::revapatch::exec::SystemExec;
use crate::revapatch::java::JavaRuntime;
use crate::revapatch::patcher::{Patcher, Toolchain, report_failure};
use crate::revapatch::tools::provision::Provisioner;
use crate::revapatch::tools::release::GitHubReleases;
use crate::revapatch::tui::progress::create_spinner;
use crate::revapatch::utils::ensure_dir;
use anyhow::{Context, anyhow};
use tracing::{debug, info, warn};

pub async fn program(argv: Cli) -> anyhow::Result<()> {
    let base = std::env::current_dir().context("Failed to read the current directory")?;
    let file = FileSettings::load(argv.config.as_deref(), &base)?;
    let config = Config::resolve(&base, file, argv.overrides());
    debug!(?config, apps = config.apps.len(), "Resolved configuration");

    let exec = SystemExec;

    let spinner = create_spinner("Checking Java...");
    let java = JavaRuntime::detect(&exec).await;
    spinner.finish_and_clear();
    let java = java.context("A working Java 11 or newer is required")?;
    info!(
        "Using {} (class version {})",
        java.executable.display(),
        java.class_version
    );

    let targets = if argv.targets.is_empty() {
        default_targets(&config, argv.interactive)?
    } else {
        resolve_targets(&argv.targets, &config)?
    };

    if targets.is_empty() {
        warn!(
            "Nothing to patch, no APKs in {} and no apps given",
            config.src_dir.display()
        );
        return Ok(());
    }

    ensure_dir(&config.out_dir)
        .with_context(|| format!("Failed to create {}", config.out_dir.display()))?;

    let provisioner = Provisioner::new(GitHubReleases::new()?);
    let tools = Toolchain::provision(&provisioner, &config.profile, &config.source_tools_dir())
        .await
        .with_context(|| format!("Failed to fetch the {} patch tools", config.profile.source))?;
    debug!(?tools, "Patch tools ready");

    let downloader = if targets.iter().any(Target::is_app) {
        let spinner = create_spinner("Checking the APK downloader...");
        let downloader = Downloader::provision(&provisioner, &config.tools_dir).await;
        spinner.finish_and_clear();
        let downloader = downloader.context("Failed to fetch the APK downloader")?;
        debug!(apkmd = %downloader.executable().display(), "Downloader ready");
        Some(downloader)
    } else {
        None
    };

    let patcher = Patcher::new(&config, &exec, java, tools);
    let mut patched = Vec::new();
    let mut failed = Vec::new();

    for target in &targets {
        let outcome = match target {
            Target::File(path) => patcher
                .patch(path, None)
                .await
                .with_context(|| format!("Failed to patch {}", path.display())),
            Target::App(name) => match &downloader {
                Some(downloader) => patcher.download_and_patch(name, downloader).await,
                None => Err(anyhow!("no downloader available for {name}")),
            },
        };

        match outcome {
            Ok(path) => patched.push(path),
            Err(e) => {
                report_failure(&target.to_string(), &e);
                failed.push(target.to_string());
            }
        }
    }

    info!(
        "Patched {} of {} targets into {}",
        patched.len(),
        targets.len(),
        config.out_dir.display()
    );
    if !failed.is_empty() {
        warn!("Failed: {}", failed.join(", "));
    }

    Ok(())
}

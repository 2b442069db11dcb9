use crate::revapatch::config::{AppCatalog, Config, Overrides, PatchSource, VersionConstraint};
use crate::revapatch::tui::pick::pick_apps;
use anyhow::{Context, bail};
use clap::{CommandFactory, FromArgMatches, Parser};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use tracing::debug;

pub mod program;

/// Download Android apps from APKMirror and patch them with ReVanced or
/// ReVanced Extended.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// App names or APK files to patch. Defaults to every APK in the source
    /// directory.
    pub targets: Vec<String>,

    /// Keystore used to sign patched APKs
    #[arg(short = 'k', long)]
    pub keystore: Option<PathBuf>,

    /// Directory holding `<App>.json` patch options files
    #[arg(long)]
    pub options_dir: Option<PathBuf>,

    /// Where patched APKs are written
    #[arg(short = 'o', long)]
    pub out_dir: Option<PathBuf>,

    /// Where APKs are looked up when no targets are given
    #[arg(long)]
    pub src_dir: Option<PathBuf>,

    /// Where the patcher, patches and downloader are kept
    #[arg(long)]
    pub tools_dir: Option<PathBuf>,

    /// Which patch source to use
    #[arg(long, value_enum)]
    pub patch_src: Option<PatchSource>,

    /// Architecture of downloaded APKs
    #[arg(long)]
    pub arch: Option<String>,

    /// Screen density of downloaded APKs
    #[arg(long)]
    pub dpi: Option<String>,

    /// Config file (defaults to ./revapatch.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Release of the patcher to use, `latest` or a version like `v5.0.1`
    #[arg(long, value_name = "VERSION")]
    pub cli_version: Option<VersionConstraint>,

    /// Release of the patches to use
    #[arg(long, value_name = "VERSION")]
    pub patches_version: Option<VersionConstraint>,

    /// Release of the integrations to use (rvx only)
    #[arg(long, value_name = "VERSION")]
    pub integrations_version: Option<VersionConstraint>,

    /// Pick the apps to patch from a list
    #[arg(short = 'i', long)]
    pub interactive: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses the process arguments, listing the known apps in `--help`.
    pub fn parse_with_catalog(catalog: &AppCatalog) -> Self {
        let command = Self::command().after_help(apps_help(catalog));
        let matches = command.get_matches();

        Self::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
    }

    pub fn overrides(&self) -> Overrides {
        Overrides {
            src_dir: self.src_dir.clone(),
            out_dir: self.out_dir.clone(),
            tools_dir: self.tools_dir.clone(),
            options_dir: self.options_dir.clone(),
            keystore: self.keystore.clone(),
            arch: self.arch.clone(),
            dpi: self.dpi.clone(),
            patch_source: self.patch_src,
            cli_version: self.cli_version.clone(),
            patches_version: self.patches_version.clone(),
            integrations_version: self.integrations_version.clone(),
        }
    }
}

fn apps_help(catalog: &AppCatalog) -> String {
    let names: Vec<&str> = catalog.names().collect();
    format!("Apps:\n  {}", names.join(", "))
}

/// One thing to patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A catalog app, downloaded before patching.
    App(String),
    /// An APK already on disk.
    File(PathBuf),
}

impl Target {
    pub fn is_app(&self) -> bool {
        matches!(self, Target::App(_))
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::App(name) => f.write_str(name),
            Target::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Turns command-line targets into apps and files.
///
/// Names are matched against the catalog ignoring case. Anything else has to
/// be an existing file, either as given or inside the source directory.
pub fn resolve_targets(raw: &[String], config: &Config) -> anyhow::Result<Vec<Target>> {
    let mut targets = Vec::with_capacity(raw.len());

    for value in raw {
        if let Some((name, _)) = config.apps.find(value) {
            targets.push(Target::App(name.to_string()));
            continue;
        }

        let as_given = PathBuf::from(value);
        let in_src = config.src_dir.join(value);
        if let Some(path) = [as_given, in_src].into_iter().find(|p| p.is_file()) {
            targets.push(Target::File(path));
            continue;
        }

        let suggestions = config.apps.suggest(value, 3);
        if suggestions.is_empty() {
            bail!("file or app not found: {value}");
        }
        bail!(
            "file or app not found: {value}\n  did you mean: {}",
            suggestions.join(", ")
        );
    }

    Ok(targets)
}

/// Targets used when none are given on the command line.
pub fn default_targets(config: &Config, interactive: bool) -> anyhow::Result<Vec<Target>> {
    if interactive {
        let apps = pick_apps(&config.apps).context("Failed to read the app selection")?;
        return Ok(apps.into_iter().map(Target::App).collect());
    }

    let files = apks_in(&config.src_dir)?;
    debug!(count = files.len(), dir = %config.src_dir.display(), "Found APKs");

    Ok(files.into_iter().map(Target::File).collect())
}

/// Every `*.apk` file directly inside `dir`, sorted by name.
fn apks_in(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.apk", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("Invalid source directory {}", dir.display()))?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();

    files.sort();
    Ok(files)
}

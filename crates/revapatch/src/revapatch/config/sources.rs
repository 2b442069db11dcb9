use crate::revapatch::error::ProvisionError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static VERSION_ARG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:latest|v?\d+(?:\.\d+)*(?:-\S+)?)$").expect("valid regex"));

/// The patch tool families revapatch knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PatchSource {
    /// ReVanced
    Rv,
    /// ReVanced Extended
    Rvx,
}

impl Display for PatchSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PatchSource::Rv => write!(f, "rv"),
            PatchSource::Rvx => write!(f, "rvx"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Cli,
    Patches,
    Integrations,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Cli => "cli",
            ToolKind::Patches => "patches",
            ToolKind::Integrations => "integrations",
        }
    }
}

impl Display for ToolKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which release of a project to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionConstraint {
    Latest,
    /// An explicit version, stored without a leading `v`.
    Exact(String),
}

impl VersionConstraint {
    /// The path segment after `/releases/` in the release API.
    pub fn release_path(&self) -> String {
        match self {
            VersionConstraint::Latest => "latest".to_string(),
            VersionConstraint::Exact(version) => format!("tags/v{version}"),
        }
    }
}

impl FromStr for VersionConstraint {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !VERSION_ARG.is_match(s) {
            return Err(ProvisionError::InvalidVersion(s.to_string()));
        }

        if s == "latest" {
            Ok(VersionConstraint::Latest)
        } else {
            Ok(VersionConstraint::Exact(s.trim_start_matches('v').to_string()))
        }
    }
}

impl Display for VersionConstraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionConstraint::Latest => f.write_str("latest"),
            VersionConstraint::Exact(version) => f.write_str(version),
        }
    }
}

/// One tool of a patch source and where its releases live.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub kind: ToolKind,
    pub project: &'static str,
    pub version: VersionConstraint,
    pub content_type: Option<&'static str>,
    pub name_filter: Option<&'static str>,
}

/// Everything needed to provision and use one patch source.
#[derive(Debug, Clone)]
pub struct SourceProfile {
    pub source: PatchSource,
    pub tools: Vec<ToolSpec>,
    /// Subdirectory of the tools dir, keeps RV and RVX files apart.
    pub subdir: &'static str,
    /// Prepended to patched output file names.
    pub prepend: &'static str,
}

impl SourceProfile {
    pub fn tool(&self, kind: ToolKind) -> Option<&ToolSpec> {
        self.tools.iter().find(|t| t.kind == kind)
    }

    pub fn has(&self, kind: ToolKind) -> bool {
        self.tool(kind).is_some()
    }

    /// Replaces the version constraint of `kind`, if this source ships that tool.
    pub fn pin(&mut self, kind: ToolKind, version: VersionConstraint) {
        if let Some(tool) = self.tools.iter_mut().find(|t| t.kind == kind) {
            tool.version = version;
        }
    }
}

impl PatchSource {
    pub fn profile(&self) -> SourceProfile {
        match self {
            PatchSource::Rv => SourceProfile {
                source: *self,
                tools: vec![
                    ToolSpec {
                        kind: ToolKind::Cli,
                        project: "revanced/revanced-cli",
                        version: VersionConstraint::Latest,
                        content_type: Some("application/java-archive"),
                        name_filter: None,
                    },
                    ToolSpec {
                        kind: ToolKind::Patches,
                        project: "revanced/revanced-patches",
                        version: VersionConstraint::Latest,
                        content_type: Some("text/plain"),
                        name_filter: Some(r".*\.rvp"),
                    },
                ],
                subdir: "RV",
                prepend: "RV ",
            },
            PatchSource::Rvx => SourceProfile {
                source: *self,
                tools: vec![
                    ToolSpec {
                        kind: ToolKind::Cli,
                        project: "inotia00/revanced-cli",
                        version: VersionConstraint::Latest,
                        content_type: Some("application/jar"),
                        name_filter: None,
                    },
                    ToolSpec {
                        kind: ToolKind::Patches,
                        project: "inotia00/revanced-patches",
                        version: VersionConstraint::Latest,
                        content_type: Some("application/jar"),
                        name_filter: None,
                    },
                    ToolSpec {
                        kind: ToolKind::Integrations,
                        project: "inotia00/revanced-integrations",
                        version: VersionConstraint::Latest,
                        content_type: Some("application/vnd.android.package-archive"),
                        name_filter: None,
                    },
                ],
                subdir: "RVX",
                prepend: "RVX ",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_constraint_parsing() {
        assert_eq!("latest".parse::<VersionConstraint>().unwrap(), VersionConstraint::Latest);
        assert_eq!(
            "v5.0.1".parse::<VersionConstraint>().unwrap(),
            VersionConstraint::Exact("5.0.1".into())
        );
        assert_eq!(
            "4.0.0-dev.12".parse::<VersionConstraint>().unwrap(),
            VersionConstraint::Exact("4.0.0-dev.12".into())
        );
        assert!("newest".parse::<VersionConstraint>().is_err());
        assert!("latest-ish".parse::<VersionConstraint>().is_err());
    }

    #[test]
    fn release_path_uses_tag_prefix() {
        assert_eq!(VersionConstraint::Latest.release_path(), "latest");
        assert_eq!(
            VersionConstraint::Exact("5.0.0".into()).release_path(),
            "tags/v5.0.0"
        );
    }

    #[test]
    fn rvx_ships_integrations_and_rv_does_not() {
        assert!(PatchSource::Rvx.profile().has(ToolKind::Integrations));
        assert!(!PatchSource::Rv.profile().has(ToolKind::Integrations));
        assert_eq!(PatchSource::Rv.profile().prepend, "RV ");
    }

    #[test]
    fn pin_only_touches_shipped_tools() {
        let mut profile = PatchSource::Rv.profile();
        profile.pin(ToolKind::Cli, VersionConstraint::Exact("4.6.0".into()));
        profile.pin(ToolKind::Integrations, VersionConstraint::Exact("1.0.0".into()));

        assert_eq!(
            profile.tool(ToolKind::Cli).unwrap().version,
            VersionConstraint::Exact("4.6.0".into())
        );
        assert!(profile.tool(ToolKind::Integrations).is_none());
    }
}

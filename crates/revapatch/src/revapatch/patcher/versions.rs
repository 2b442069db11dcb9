//! Finding the newest app version a patch bundle supports.
//!
//! The patcher has no machine readable output, so this scrapes the text of
//! `list-patches --with-versions --with-packages`. The contract relied upon:
//! the package id appears somewhere in the output when the bundle has patches
//! for it, and each supported version is printed alone on its own line.

use crate::revapatch::error::ResolveError;
use crate::revapatch::exec::{Exec, OutputMode};
use crate::revapatch::java::JavaRuntime;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

static VERSION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(\d+\.\d+(?:\.\d+)*)\s*$").expect("valid regex"));

/// A dotted numeric app version.
///
/// Ordered component by component. Versions of different lengths are not
/// padded, so `1.2` sorts before `1.2.0`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AppVersion(Vec<u64>);

impl FromStr for AppVersion {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split('.')
            .map(str::parse::<u64>)
            .collect::<Result<Vec<_>, _>>()
            .map(AppVersion)
    }
}

impl Display for AppVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut parts = self.0.iter();
        if let Some(first) = parts.next() {
            write!(f, "{first}")?;
        }
        for part in parts {
            write!(f, ".{part}")?;
        }
        Ok(())
    }
}

/// Picks the highest version listed for `package` in patcher output.
///
/// `Ok(None)` means the bundle supports the app without naming versions, so
/// any version will do.
pub fn parse_supported_version(
    output: &str,
    package: &str,
) -> Result<Option<AppVersion>, ResolveError> {
    if !output.contains(package) {
        return Err(ResolveError::Unsupported {
            package: package.to_string(),
        });
    }

    let mut best: Option<AppVersion> = None;
    for caps in VERSION_LINE.captures_iter(output) {
        let token = &caps[1];
        let version = token
            .parse::<AppVersion>()
            .map_err(|_| ResolveError::MalformedVersion {
                line: token.to_string(),
            })?;

        if best.as_ref().is_none_or(|b| version > *b) {
            best = Some(version);
        }
    }

    Ok(best)
}

/// Asks the patcher which versions of `package` the bundle at `patches`
/// supports and returns the newest.
pub async fn resolve_supported_version<E: Exec>(
    exec: &E,
    java: &JavaRuntime,
    cli: &Path,
    patches: &Path,
    package: &str,
) -> Result<Option<AppVersion>, ResolveError> {
    let invocation = java
        .jar(cli)
        .arg("list-patches")
        .flag("--filter-package-name=", package)
        .arg("--with-versions")
        .arg("--with-packages")
        .arg(patches)
        .mode(OutputMode::Capture);

    let output = exec.run(&invocation).await?;
    if !output.success {
        return Err(ResolveError::PatcherFailed { code: output.code });
    }

    let version = parse_supported_version(&output.stdout_lossy(), package)?;
    debug!(package, version = ?version.as_ref().map(ToString::to_string), "Resolved supported version");

    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revapatch::exec::fake::{FakeExec, failed, ok_with_stdout};
    use std::path::PathBuf;

    const REDDIT: &str = "com.reddit.frontpage";

    fn listing(versions: &[&str]) -> String {
        let mut out = String::from(
            "INFO: Name: Hide ads\nDescription: Removes ads.\nEnabled: true\nCompatible packages:\n",
        );
        out.push_str(&format!("\tPackage name: {REDDIT}\n\tCompatible versions:\n"));
        for v in versions {
            out.push_str(&format!("\t\t{v}\n"));
        }
        out
    }

    fn java() -> JavaRuntime {
        JavaRuntime {
            executable: PathBuf::from("java"),
            class_version: 61,
        }
    }

    #[test]
    fn highest_version_wins_numerically() {
        let version = parse_supported_version(&listing(&["1.2.0", "1.10.0", "1.9.9"]), REDDIT)
            .unwrap()
            .unwrap();
        assert_eq!(version.to_string(), "1.10.0");
    }

    #[test]
    fn shorter_prefix_sorts_first() {
        let short: AppVersion = "1.2".parse().unwrap();
        let long: AppVersion = "1.2.0".parse().unwrap();
        let ten: AppVersion = "1.10".parse().unwrap();

        assert!(short < long);
        assert!(short < ten);
        assert_ne!(short, long);
    }

    #[test]
    fn missing_package_is_unsupported() {
        let err = parse_supported_version("INFO: Name: Hide ads\n", REDDIT).unwrap_err();
        assert!(matches!(err, ResolveError::Unsupported { package } if package == REDDIT));
    }

    #[test]
    fn no_version_lines_means_any_version() {
        assert_eq!(parse_supported_version(&listing(&[]), REDDIT).unwrap(), None);
    }

    #[test]
    fn embedded_versions_are_ignored() {
        let output = format!("{}Patcher version 9.9.9\nv 8.0\n  2023.5.1  \r\n", listing(&[]));
        let version = parse_supported_version(&output, REDDIT).unwrap().unwrap();
        assert_eq!(version.to_string(), "2023.5.1");
    }

    #[test]
    fn overflowing_version_is_malformed() {
        let output = listing(&["1.99999999999999999999999"]);
        let err = parse_supported_version(&output, REDDIT).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedVersion { .. }));
    }

    #[tokio::test]
    async fn invokes_list_patches() {
        let exec = FakeExec::new(|_| Ok(ok_with_stdout(&listing(&["2024.17.0", "2024.2.0"]))));
        let version = resolve_supported_version(
            &exec,
            &java(),
            Path::new("/t/cli.jar"),
            Path::new("/t/patches.rvp"),
            REDDIT,
        )
        .await
        .unwrap();

        assert_eq!(version.map(|v| v.to_string()).as_deref(), Some("2024.17.0"));
        let call = &exec.calls()[0];
        assert!(call.has_arg("list-patches"));
        assert!(call.has_arg("--filter-package-name=com.reddit.frontpage"));
        assert_eq!(call.args.last().unwrap(), "/t/patches.rvp");
    }

    #[tokio::test]
    async fn failing_patcher_is_reported() {
        let exec = FakeExec::new(|_| Ok(failed(2)));
        let err = resolve_supported_version(
            &exec,
            &java(),
            Path::new("cli.jar"),
            Path::new("patches.rvp"),
            REDDIT,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ResolveError::PatcherFailed { code: Some(2) }));
    }
}

//! File names of provisioned tools.
//!
//! Every installed tool carries its release version in its file name so that
//! a glob with the version replaced by `*` finds all copies of the same tool.

use glob::Pattern;

/// Splits `name` into stem and extension (with its dot), ignoring leading dots.
pub fn split_extension(name: &str) -> (&str, &str) {
    let leading = name.len() - name.trim_start_matches('.').len();

    match name[leading..].rfind('.') {
        Some(idx) => name.split_at(leading + idx),
        None => (name, ""),
    }
}

/// Strips the conventional `v` prefix from a release tag.
pub fn tag_version(tag: &str) -> &str {
    tag.trim_start_matches('v')
}

/// Makes sure the asset name mentions `version`, inserting `-<version>`
/// before the extension when it does not.
///
/// `cli.jar` + `5.0.0` becomes `cli-5.0.0.jar`; `cli-5.0.0.jar` is kept.
pub fn canonical_name(asset_name: &str, version: &str) -> String {
    if asset_name.contains(version) {
        return asset_name.to_string();
    }

    let (stem, ext) = split_extension(asset_name);
    format!("{stem}-{version}{ext}")
}

/// Glob matching every version of the tool installed as `file_name`, which
/// carries `version` (see [`canonical_name`]).
///
/// `revanced-cli-5.0.0-all.jar` at `5.0.0` becomes `revanced-cli-*-all.jar`.
/// A name without the version is matched literally.
pub fn stale_glob(file_name: &str, version: &str) -> String {
    match file_name.rfind(version).filter(|_| !version.is_empty()) {
        Some(idx) => format!(
            "{}*{}",
            Pattern::escape(&file_name[..idx]),
            Pattern::escape(&file_name[idx + version.len()..])
        ),
        None => Pattern::escape(file_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_name_inserts_version() {
        assert_eq!(canonical_name("cli.jar", tag_version("v5.0.0")), "cli-5.0.0.jar");
        assert_eq!(canonical_name("cli-5.0.0.jar", tag_version("v5.0.0")), "cli-5.0.0.jar");
        assert_eq!(canonical_name("apkmd", "1.4.2"), "apkmd-1.4.2");
        assert_eq!(
            canonical_name("revanced-integrations.apk", "1.9.2"),
            "revanced-integrations-1.9.2.apk"
        );
    }

    #[test]
    fn split_extension_like_a_path() {
        assert_eq!(split_extension("patches.rvp"), ("patches", ".rvp"));
        assert_eq!(split_extension("a.b.jar"), ("a.b", ".jar"));
        assert_eq!(split_extension("apkmd"), ("apkmd", ""));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
    }

    #[test]
    fn stale_glob_wildcards_the_version() {
        assert_eq!(stale_glob("revanced-cli-5.0.0-all.jar", "5.0.0"), "revanced-cli-*-all.jar");
        assert_eq!(stale_glob("patches-5.1.rvp", "5.1"), "patches-*.rvp");
        assert_eq!(stale_glob("revanced-patches-v4.jar", "4"), "revanced-patches-v*.jar");
        assert_eq!(stale_glob("apkmd-1.4.2", "1.4.2"), "apkmd-*");
        assert_eq!(stale_glob("apkmd-1.4.2.exe", "1.4.2"), "apkmd-*.exe");
    }

    #[test]
    fn stale_glob_handles_prerelease_and_long_versions() {
        let glob = stale_glob("patches-5.1.0-dev.1.rvp", "5.1.0-dev.1");
        assert_eq!(glob, "patches-*.rvp");
        assert!(Pattern::new(&glob).unwrap().matches("patches-5.0.0.rvp"));

        let glob = stale_glob("revanced-cli-5.0.0.1-all.jar", "5.0.0.1");
        assert!(Pattern::new(&glob).unwrap().matches("revanced-cli-4.6.0-all.jar"));
    }

    #[test]
    fn stale_glob_without_version_is_literal() {
        assert_eq!(stale_glob("tool.jar", "5.0.0"), "tool.jar");
        assert_eq!(stale_glob("tool.jar", ""), "tool.jar");
        assert_eq!(stale_glob("tool[1].jar", "9"), "tool[[]1[]].jar");
    }
}

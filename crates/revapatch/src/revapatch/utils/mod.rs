use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::Path;
use tracing::debug;

pub mod writer;

static VERSION_IN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\s*v?\d+(?:\.\d+)*(?:-[^\s]*)?\b").expect("valid regex"));

/// Creates `dir` and its parents. Succeeds if it already exists.
pub fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Removes version strings from a file name, `Reddit 2024.17.0.apk` becomes
/// `Reddit.apk`.
pub fn normal_file_name(name: &str) -> String {
    VERSION_IN_NAME.replace_all(name, "").into_owned()
}

/// Best effort removal of `dir` if it has nothing in it.
pub fn remove_dir_if_empty(dir: &Path) {
    if let Err(e) = std::fs::remove_dir(dir) {
        debug!(dir = %dir.display(), error = %e, "Directory left in place");
    }
}

/// Best effort recursive removal.
pub fn remove_dir_quietly(dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir) {
        debug!(dir = %dir.display(), error = %e, "Could not remove directory");
    }
}

/// Names of the entries directly inside `dir`. Empty if it can't be read.
pub fn dir_entries(dir: &Path) -> BTreeSet<OsString> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name())
                .collect()
        })
        .unwrap_or_default()
}

/// Clears patcher leftovers from the output directory: subdirectories and
/// `*.keystore` files that are not in `existing` (taken before the patcher
/// ran). `keep` is never removed.
pub fn purge_output_dir(dir: &Path, existing: &BTreeSet<OsString>, keep: &Path) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.filter_map(Result::ok) {
        if existing.contains(&entry.file_name()) {
            continue;
        }

        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };

        if file_type.is_dir() {
            remove_dir_quietly(&path);
        } else if path.extension().is_some_and(|e| e == "keystore") && path != keep {
            if let Err(e) = std::fs::remove_file(&path) {
                debug!(path = %path.display(), error = %e, "Could not remove keystore");
            }
        }
    }
}

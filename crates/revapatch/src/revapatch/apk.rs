use crate::revapatch::error::ApkError;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::warn;
use zip::ZipArchive;

/// An APK (or APK bundle) on disk that opens as a zip archive.
#[derive(Debug, Clone)]
pub struct ApkFile {
    path: PathBuf,
}

impl ApkFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ApkError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(ApkError::NotFound(path));
        }
        if !path.is_file() {
            return Err(ApkError::NotAFile(path));
        }

        let archive = ZipArchive::new(File::open(&path)?).map_err(|source| {
            ApkError::NotAnArchive {
                path: path.clone(),
                source,
            }
        })?;
        if archive.index_for_name("AndroidManifest.xml").is_none() {
            warn!(
                "{} has no AndroidManifest.xml, it may be a split bundle",
                path.display()
            );
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Writes a minimal APK-shaped zip to `path`.
    pub(crate) fn write_apk(path: &Path) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        zip.start_file("AndroidManifest.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"<manifest/>").unwrap();
        zip.start_file("classes.dex", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"dex\n035").unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn opens_valid_apk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Reddit 2024.17.0.apk");
        write_apk(&path);

        let apk = ApkFile::open(&path).unwrap();
        assert_eq!(apk.path(), path);
        assert_eq!(apk.file_name(), "Reddit 2024.17.0.apk");
    }

    #[test]
    fn rejects_non_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocked.apk");
        std::fs::write(&path, b"<html>Cloudflare</html>").unwrap();

        assert!(matches!(
            ApkFile::open(&path),
            Err(ApkError::NotAnArchive { .. })
        ));
    }

    #[test]
    fn rejects_missing_and_directories() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            ApkFile::open(dir.path().join("nope.apk")),
            Err(ApkError::NotFound(_))
        ));
        assert!(matches!(ApkFile::open(dir.path()), Err(ApkError::NotAFile(_))));
    }
}

use std::path::PathBuf;
use thiserror::Error;

/// Failures while fetching or installing a tool from a release.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("release request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid asset name filter: {0}")]
    InvalidFilter(#[from] regex::Error),

    #[error("invalid stale-tool pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Selecting an asset needs a content type, a name filter or both.
    #[error("no content type or name filter given for {project}")]
    Unconstrained { project: String },

    #[error("invalid version constraint `{0}`")]
    InvalidVersion(String),

    #[error("{kind} tool file not found in {}", .dir.display())]
    ToolNotFound { kind: &'static str, dir: PathBuf },
}

/// Failures while asking the patcher which app versions it supports.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("the patcher could not be called: {0}")]
    Invocation(#[from] std::io::Error),

    #[error("the patcher exited with status {}", exit_status(.code))]
    PatcherFailed { code: Option<i32> },

    #[error("{package} is not supported by the patcher")]
    Unsupported { package: String },

    #[error("malformed version line `{line}`")]
    MalformedVersion { line: String },
}

/// The Java runtime is missing or unusable.
#[derive(Error, Debug)]
pub enum JavaError {
    #[error("Java is not installed or not in PATH")]
    NotFound,

    #[error("error running java ({0}), please make sure it is installed and in the path")]
    NotRunnable(String),

    #[error("the installed Java is too old (class version {found}, need {required})")]
    TooOld { found: u32, required: u32 },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write downloader config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("the downloader failed with status {}", exit_status(.code))]
    Failed { code: Option<i32> },

    #[error("failed to find a correct version of {app} or blocked by server")]
    Missing { app: String },
}

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("failed to run the patcher: {0}")]
    Invocation(#[from] std::io::Error),

    #[error("the patcher failed with status {}", exit_status(.code))]
    Failed { code: Option<i32> },

    #[error(transparent)]
    Apk(#[from] ApkError),
}

#[derive(Error, Debug)]
pub enum ApkError {
    #[error("path not found or insufficient permissions: {}", .0.display())]
    NotFound(PathBuf),

    #[error("expected a file, found a directory: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("{} is not a valid APK archive: {source}", .path.display())]
    NotAnArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_status(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

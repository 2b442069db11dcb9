use crate::revapatch::error::JavaError;
use crate::revapatch::exec::{Exec, Invocation};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Java 11, the oldest runtime the patcher runs on.
pub const MIN_CLASS_VERSION: u32 = 55;

static CLASS_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"java\.class\.version = (\d+)(?:\.\d+)+").expect("valid regex"));

/// A usable `java` executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaRuntime {
    pub executable: PathBuf,
    pub class_version: u32,
}

impl JavaRuntime {
    /// Finds `java` and checks that it is recent enough.
    pub async fn detect<E: Exec>(exec: &E) -> Result<Self, JavaError> {
        let executable = locate_java().ok_or(JavaError::NotFound)?;
        Self::probe(exec, executable).await
    }

    /// Runs `executable` and reads its class version from the settings dump.
    pub async fn probe<E: Exec>(exec: &E, executable: PathBuf) -> Result<Self, JavaError> {
        let output = exec
            .run(
                &Invocation::new(&executable)
                    .arg("-XshowSettings:properties")
                    .arg("-version"),
            )
            .await
            .map_err(|e| JavaError::NotRunnable(e.to_string()))?;

        if !output.success {
            return Err(JavaError::NotRunnable(format!(
                "exit status {}",
                output.code.unwrap_or(-1)
            )));
        }

        let class_version = parse_class_version(&output.stderr_lossy()).unwrap_or(0);
        if class_version < MIN_CLASS_VERSION {
            return Err(JavaError::TooOld {
                found: class_version,
                required: MIN_CLASS_VERSION,
            });
        }

        debug!(java = %executable.display(), class_version, "Found Java runtime");
        Ok(Self {
            executable,
            class_version,
        })
    }

    /// `java -jar <jar>`, ready for more arguments.
    pub fn jar(&self, jar: &Path) -> Invocation {
        Invocation::new(&self.executable).arg("-jar").arg(jar)
    }
}

pub fn parse_class_version(settings: &str) -> Option<u32> {
    CLASS_VERSION
        .captures(settings)
        .and_then(|caps| caps[1].parse().ok())
}

/// `java` on the PATH, or the binary under the detected Java home.
fn locate_java() -> Option<PathBuf> {
    if let Ok(path) = which::which("java") {
        return Some(path);
    }

    let home = java_locator::locate_java_home().ok()?;
    let bin = Path::new(&home)
        .join("bin")
        .join(if cfg!(windows) { "java.exe" } else { "java" });

    bin.is_file().then_some(bin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revapatch::exec::ExecOutput;
    use crate::revapatch::exec::fake::{FakeExec, failed};

    const SETTINGS_17: &str = "Property settings:\n    java.class.path = \n    java.class.version = 61.0\n    java.home = /usr/lib/jvm/java-17\n";

    fn stderr(text: &'static str) -> FakeExec {
        FakeExec::new(move |_| {
            Ok(ExecOutput {
                success: true,
                code: Some(0),
                stdout: Vec::new(),
                stderr: text.as_bytes().to_vec(),
            })
        })
    }

    #[test]
    fn class_version_from_settings() {
        assert_eq!(parse_class_version(SETTINGS_17), Some(61));
        assert_eq!(parse_class_version("java.class.version = 52"), None);
        assert_eq!(parse_class_version("openjdk 17"), None);
    }

    #[tokio::test]
    async fn accepts_modern_java() {
        let exec = stderr(SETTINGS_17);
        let java = JavaRuntime::probe(&exec, PathBuf::from("java")).await.unwrap();

        assert_eq!(java.class_version, 61);
        assert!(exec.calls()[0].has_arg("-XshowSettings:properties"));
    }

    #[tokio::test]
    async fn rejects_java_8() {
        let exec = stderr("    java.class.version = 52.0\n");
        let err = JavaRuntime::probe(&exec, PathBuf::from("java")).await.unwrap_err();

        assert!(matches!(err, JavaError::TooOld { found: 52, required: 55 }));
    }

    #[tokio::test]
    async fn failing_java_is_not_runnable() {
        let exec = FakeExec::new(|_| Ok(failed(1)));
        let err = JavaRuntime::probe(&exec, PathBuf::from("java")).await.unwrap_err();

        assert!(matches!(err, JavaError::NotRunnable(_)));
    }

    #[test]
    fn jar_invocation() {
        let java = JavaRuntime {
            executable: PathBuf::from("/usr/bin/java"),
            class_version: 61,
        };
        let inv = java.jar(Path::new("/t/cli.jar")).arg("list-patches");

        assert_eq!(inv.program, PathBuf::from("/usr/bin/java"));
        assert_eq!(inv.arg_str(0).as_deref(), Some("-jar"));
        assert_eq!(inv.arg_str(2).as_deref(), Some("list-patches"));
    }
}

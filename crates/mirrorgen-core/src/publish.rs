//! Handing generated packages to an external publish tool.

use std::process::{Command, Stdio};

use tracing::debug;

use crate::{
    artifact::ArtifactHandle,
    error::{BatchError, CoreError},
    CoreResult,
};

pub trait Publisher: Send + Sync {
    fn publish(&self, handle: &ArtifactHandle) -> Result<(), BatchError>;
}

/// Runs a command with the absolute artifact path appended as its last argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPublisher {
    program: String,
    args: Vec<String>,
}

impl CommandPublisher {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Builds a publisher from an already split command line.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfiguration`] if `parts` is empty.
    pub fn from_parts(parts: Vec<String>) -> CoreResult<Self> {
        let mut parts = parts.into_iter();
        let program = parts.next().ok_or_else(|| {
            CoreError::InvalidConfiguration("publish command can't be empty".into())
        })?;
        Ok(Self::new(program, parts.collect()))
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Publisher for CommandPublisher {
    fn publish(&self, handle: &ArtifactHandle) -> Result<(), BatchError> {
        debug!(
            name = %handle.name,
            command = %self.command_line(),
            "publishing {}",
            handle.path.display()
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&handle.path)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| {
                BatchError::Spawn {
                    command: self.command_line(),
                    source: err,
                }
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            debug!(name = %handle.name, "{}", stdout.trim_end());
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let captured = if stderr.trim().is_empty() {
                stdout.trim()
            } else {
                stderr.trim()
            };
            return Err(BatchError::Publish {
                name: handle.name.clone(),
                exit_code: output.status.code(),
                output: captured.to_string(),
            });
        }

        Ok(())
    }
}

/// Leaves artifacts on disk without publishing them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipPublisher;

impl Publisher for SkipPublisher {
    fn publish(&self, handle: &ArtifactHandle) -> Result<(), BatchError> {
        debug!(name = %handle.name, "publishing disabled, skipping");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::tempdir;

    use super::*;

    fn handle(path: PathBuf) -> ArtifactHandle {
        ArtifactHandle {
            name: "pkg-0".to_string(),
            path,
        }
    }

    #[test]
    fn test_from_default_config() {
        let config = mirrorgen_config::config::Config::default_config();
        let publisher = CommandPublisher::from_parts(config.publish_command().unwrap()).unwrap();
        assert_eq!(publisher.command_line(), "npm publish");
    }

    #[test]
    fn test_from_parts() {
        let publisher =
            CommandPublisher::from_parts(vec!["npm".into(), "publish".into(), "--dry-run".into()])
                .unwrap();
        assert_eq!(publisher.command_line(), "npm publish --dry-run");

        let err = CommandPublisher::from_parts(Vec::new()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfiguration(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_publish_success() {
        let dir = tempdir().unwrap();
        let publisher = CommandPublisher::new("true", Vec::new());
        publisher.publish(&handle(dir.path().to_path_buf())).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_publish_receives_artifact_path() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("published");
        let script = format!("test -d \"$1\" && touch {}", marker.display());
        let publisher =
            CommandPublisher::new("sh", vec!["-c".into(), script, "publish".into()]);

        publisher.publish(&handle(dir.path().to_path_buf())).unwrap();
        assert!(marker.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_publish_nonzero_exit() {
        let dir = tempdir().unwrap();
        let publisher = CommandPublisher::new(
            "sh",
            vec![
                "-c".into(),
                "echo 'E403 forbidden' >&2; exit 3".into(),
                "publish".into(),
            ],
        );

        let err = publisher
            .publish(&handle(dir.path().to_path_buf()))
            .unwrap_err();
        match err {
            BatchError::Publish {
                name,
                exit_code,
                output,
            } => {
                assert_eq!(name, "pkg-0");
                assert_eq!(exit_code, Some(3));
                assert_eq!(output, "E403 forbidden");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_publish_missing_program() {
        let dir = tempdir().unwrap();
        let publisher = CommandPublisher::new("mirrorgen-no-such-publisher", Vec::new());

        let err = publisher
            .publish(&handle(dir.path().to_path_buf()))
            .unwrap_err();
        assert!(matches!(err, BatchError::Spawn { .. }));
    }

    #[test]
    fn test_skip_publisher() {
        SkipPublisher
            .publish(&handle(PathBuf::from("/nonexistent/pkg-0")))
            .unwrap();
    }
}

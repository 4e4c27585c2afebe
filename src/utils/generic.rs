use crate::{Result, SteamboatError};
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, error};

/// Options for [`execute`]
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Working directory, defaults to the current directory
    pub directory: Option<PathBuf>,
    /// Return stdout/stderr to the caller
    pub capture: bool,
    pub stdout_file: Option<PathBuf>,
    pub stderr_file: Option<PathBuf>,
    /// Report a non-zero exit as [`ExecuteOutput::Failed`] instead of an error
    pub allow_fail: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutput {
    Success,
    Captured { stdout: String, stderr: String },
    Failed(i32),
}

/// Run a shell command, logging its output at debug level
pub fn execute(cmd: &str, options: &ExecuteOptions) -> Result<ExecuteOutput> {
    let mut command = Command::new("sh");
    command.arg("-c").arg(cmd);
    if let Some(dir) = &options.directory {
        command.current_dir(dir);
    }

    debug!("Executing: {}", cmd);
    let output = command.output()?;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    debug!("{}", stdout);
    debug!("{}", stderr);

    if let Some(path) = &options.stdout_file {
        std::fs::write(path, &stdout)?;
    }
    if let Some(path) = &options.stderr_file {
        std::fs::write(path, &stderr)?;
    }

    if !output.status.success() {
        // Killed by a signal leaves no code
        let code = output.status.code().unwrap_or(-1);
        if options.allow_fail {
            error!("Command '{}' failed with exit code {}", cmd, code);
            return Ok(ExecuteOutput::Failed(code));
        }
        return Err(SteamboatError::CommandFailed {
            command: cmd.to_string(),
            code,
            stderr,
        });
    }

    if options.capture {
        Ok(ExecuteOutput::Captured { stdout, stderr })
    } else {
        Ok(ExecuteOutput::Success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Mac,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Mac => "mac",
        }
    }
}

/// Get the platform of the executing machine
pub fn get_platform() -> Result<Platform> {
    if cfg!(target_os = "macos") {
        Ok(Platform::Mac)
    } else if cfg!(target_os = "windows") {
        error!("Windows is not supported.");
        Err(SteamboatError::Unsupported("windows".to_string()))
    } else {
        Ok(Platform::Linux)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_execute_capture() {
        let options = ExecuteOptions {
            capture: true,
            ..Default::default()
        };
        let output = execute("echo hello && echo oops 1>&2", &options).unwrap();
        assert_eq!(
            output,
            ExecuteOutput::Captured {
                stdout: "hello\n".to_string(),
                stderr: "oops\n".to_string(),
            }
        );
    }

    #[test]
    fn test_execute_without_capture() {
        let output = execute("true", &ExecuteOptions::default()).unwrap();
        assert_eq!(output, ExecuteOutput::Success);
    }

    #[test]
    fn test_execute_failure() {
        let err = execute("exit 3", &ExecuteOptions::default()).unwrap_err();
        assert!(matches!(err, SteamboatError::CommandFailed { code: 3, .. }));
    }

    #[test]
    fn test_execute_allow_fail() {
        let options = ExecuteOptions {
            allow_fail: true,
            ..Default::default()
        };
        assert_eq!(execute("exit 4", &options).unwrap(), ExecuteOutput::Failed(4));
    }

    #[test]
    fn test_execute_in_directory_with_files() {
        let dir = TempDir::new().unwrap();
        let stdout_file = dir.path().join("stdout.txt");
        let options = ExecuteOptions {
            directory: Some(dir.path().to_path_buf()),
            stdout_file: Some(stdout_file.clone()),
            ..Default::default()
        };
        execute("touch marker && echo written", &options).unwrap();

        assert!(dir.path().join("marker").exists());
        assert_eq!(std::fs::read_to_string(stdout_file).unwrap(), "written\n");
    }

    #[test]
    fn test_get_platform() {
        let platform = get_platform().unwrap();
        if cfg!(target_os = "macos") {
            assert_eq!(platform.as_str(), "mac");
        } else {
            assert_eq!(platform.as_str(), "linux");
        }
    }
}

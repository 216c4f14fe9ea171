use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("'{0}' does not exist")]
    NotFound(String),
    #[error("cannot execute '{0}' (unsupported file type or not executable)")]
    NotExecutable(String),
    #[error("shell scripts are not supported on this platform")]
    ShellUnsupported,
    #[error("{0}: command not found")]
    CommandNotFound(String),
    #[error("error running '{0}': {1}")]
    Spawn(String, #[source] std::io::Error),
}

/// Captured output of a finished child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

/// How a script path gets launched, decided by its extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launcher {
    Python,
    Shell,
    Direct,
}

impl Launcher {
    pub fn for_path(path: &Path) -> Option<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "py" => Some(Launcher::Python),
            "sh" => Some(Launcher::Shell),
            _ if is_executable(path) => Some(Launcher::Direct),
            _ => None,
        }
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("exe"))
        .unwrap_or(false)
}

/// Runs scripts for `run` and unknown commands typed at the prompt.
pub struct CommandExecutor {
    python: String,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self {
            python: if cfg!(windows) { "python" } else { "python3" }.to_string(),
        }
    }

    pub fn with_python(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }

    pub async fn run_script(&self, target: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
        let path = Path::new(target);
        if !path.exists() {
            return Err(CommandError::NotFound(target.to_string()));
        }

        let launcher = Launcher::for_path(path)
            .ok_or_else(|| CommandError::NotExecutable(target.to_string()))?;

        let (program, mut full_args) = match launcher {
            Launcher::Python => (self.python.clone(), vec![target.to_string()]),
            Launcher::Shell if cfg!(windows) => return Err(CommandError::ShellUnsupported),
            Launcher::Shell => ("bash".to_string(), vec![target.to_string()]),
            Launcher::Direct => (Self::direct_program(target), Vec::new()),
        };
        full_args.extend(args.iter().cloned());

        tracing::info!("Running script: {} {:?}", program, full_args);
        self.spawn(&program, &full_args).await
    }

    pub async fn run_external(&self, command: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
        tracing::info!("Executing command: {} {:?}", command, args);
        match self.spawn(command, args).await {
            Err(CommandError::Spawn(_, e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CommandError::CommandNotFound(command.to_string()))
            }
            other => other,
        }
    }

    // a bare file name would be looked up on PATH
    fn direct_program(target: &str) -> String {
        let path = Path::new(target);
        if path.components().count() == 1 {
            format!(".{}{}", std::path::MAIN_SEPARATOR, target)
        } else {
            target.to_string()
        }
    }

    async fn spawn(&self, program: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
        let output = tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CommandError::Spawn(program.to_string(), e))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
        })
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

use crate::filesystem;
use async_trait::async_trait;
use kindshell_core::{Action, ActionKind, ExecutionOutput, ExecutionResult};
use std::path::PathBuf;

/// Performs the file-system operation an [`Action`] describes.
///
/// Shared between the interactive loop and the scheduler's trigger task,
/// so implementations must be callable concurrently. Failures are values,
/// never panics.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, action: &Action) -> ExecutionResult;
}

/// Executes actions against the real file system.
///
/// Relative targets resolve against `base_dir` when set, otherwise against
/// the process working directory at the moment of execution.
#[derive(Debug, Clone, Default)]
pub struct FsActionExecutor {
    base_dir: Option<PathBuf>,
}

impl FsActionExecutor {
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve(&self, target: &str) -> PathBuf {
        match &self.base_dir {
            Some(base) => base.join(target),
            None => PathBuf::from(target),
        }
    }

    async fn run(&self, action: &Action) -> filesystem::FsResult<ExecutionOutput> {
        let primary = action.primary();
        match action.kind() {
            ActionKind::CreateFolder => {
                filesystem::create_dir(self.resolve(primary)).await?;
                Ok(ExecutionOutput::summary(format!(
                    "Folder '{}' created.",
                    primary
                )))
            }
            ActionKind::MoveFile => {
                let destination = action.destination().unwrap_or_default();
                filesystem::move_path(self.resolve(primary), self.resolve(destination)).await?;
                Ok(ExecutionOutput::summary(format!(
                    "Moved '{}' to '{}'.",
                    primary, destination
                )))
            }
            ActionKind::Remove => {
                filesystem::delete(self.resolve(primary)).await?;
                Ok(ExecutionOutput::summary(format!("Removed '{}'.", primary)))
            }
            ActionKind::ListFiles => {
                let entries = filesystem::list(self.resolve(primary)).await?;
                Ok(ExecutionOutput {
                    summary: format!("Files in '{}':", primary),
                    entries,
                })
            }
        }
    }
}

#[async_trait]
impl ActionExecutor for FsActionExecutor {
    async fn execute(&self, action: &Action) -> ExecutionResult {
        tracing::info!(%action, "Executing action");

        match self.run(action).await {
            Ok(output) => ExecutionResult::Ok(output),
            Err(e) => {
                tracing::warn!(%action, error = %e, "Action failed");
                ExecutionResult::Failed(e.reason())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindshell_core::FailureReason;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_then_list() {
        let temp = TempDir::new().unwrap();
        let executor = FsActionExecutor::with_base_dir(temp.path());

        let result = executor
            .execute(&Action::create_folder("notes").unwrap())
            .await;
        assert!(result.is_ok());
        assert!(temp.path().join("notes").is_dir());

        match executor.execute(&Action::list_files(".").unwrap()).await {
            ExecutionResult::Ok(output) => {
                assert_eq!(output.entries.len(), 1);
                assert_eq!(output.entries[0].name, "notes");
                assert!(output.entries[0].is_dir);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remove_missing_is_typed_failure() {
        let temp = TempDir::new().unwrap();
        let executor = FsActionExecutor::with_base_dir(temp.path());

        let result = executor.execute(&Action::remove("ghost").unwrap()).await;
        assert_eq!(result, ExecutionResult::Failed(FailureReason::NotFound));
    }

    #[tokio::test]
    async fn test_move_into_folder() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("file.txt"), "data").unwrap();
        std::fs::create_dir(temp.path().join("documents")).unwrap();
        let executor = FsActionExecutor::with_base_dir(temp.path());

        let result = executor
            .execute(&Action::move_file("file.txt", "documents").unwrap())
            .await;
        assert!(result.is_ok());
        assert!(temp.path().join("documents/file.txt").exists());
    }

    #[tokio::test]
    async fn test_create_existing_folder_fails() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("notes")).unwrap();
        let executor = FsActionExecutor::with_base_dir(temp.path());

        let result = executor
            .execute(&Action::create_folder("notes").unwrap())
            .await;
        assert_eq!(result.failure(), Some(FailureReason::AlreadyExists));
    }

    #[tokio::test]
    async fn test_every_kind_is_handled() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.txt"), "a").unwrap();
        let executor = FsActionExecutor::with_base_dir(temp.path());

        let actions = [
            Action::new(ActionKind::CreateFolder, vec!["docs".into()]).unwrap(),
            Action::new(ActionKind::MoveFile, vec!["a.txt".into(), "docs".into()]).unwrap(),
            Action::new(ActionKind::ListFiles, vec!["docs".into()]).unwrap(),
            Action::new(ActionKind::Remove, vec!["docs".into()]).unwrap(),
        ];
        for action in &actions {
            let result = executor.execute(action).await;
            assert!(result.is_ok(), "{} failed: {:?}", action, result);
        }
        assert!(!temp.path().join("docs").exists());
    }
}

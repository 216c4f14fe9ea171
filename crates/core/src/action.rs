use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Marker used by `ListFiles` when no directory was named.
pub const CURRENT_DIR: &str = ".";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("{kind} takes {expected} path(s), got {actual}")]
    Arity {
        kind: ActionKind,
        expected: usize,
        actual: usize,
    },
    #[error("{0} path cannot be empty")]
    EmptyTarget(ActionKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CreateFolder,
    MoveFile,
    Remove,
    ListFiles,
}

impl ActionKind {
    /// Number of path targets this kind carries.
    pub fn arity(self) -> usize {
        match self {
            ActionKind::MoveFile => 2,
            ActionKind::CreateFolder | ActionKind::Remove | ActionKind::ListFiles => 1,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::CreateFolder => "create folder",
            ActionKind::MoveFile => "move file",
            ActionKind::Remove => "remove",
            ActionKind::ListFiles => "list files",
        };
        f.write_str(name)
    }
}

/// One requested file-system operation.
///
/// Fields are private: the only way to build an `Action` is through
/// [`Action::new`] or the per-kind constructors, all of which check the
/// target count and reject empty paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Action {
    kind: ActionKind,
    targets: Vec<String>,
}

impl Action {
    pub fn new(kind: ActionKind, targets: Vec<String>) -> Result<Self, ActionError> {
        if targets.len() != kind.arity() {
            return Err(ActionError::Arity {
                kind,
                expected: kind.arity(),
                actual: targets.len(),
            });
        }
        if targets.iter().any(|t| t.trim().is_empty()) {
            return Err(ActionError::EmptyTarget(kind));
        }
        Ok(Self { kind, targets })
    }

    pub fn create_folder(path: impl Into<String>) -> Result<Self, ActionError> {
        Self::new(ActionKind::CreateFolder, vec![path.into()])
    }

    pub fn move_file(
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<Self, ActionError> {
        Self::new(ActionKind::MoveFile, vec![from.into(), to.into()])
    }

    pub fn remove(path: impl Into<String>) -> Result<Self, ActionError> {
        Self::new(ActionKind::Remove, vec![path.into()])
    }

    pub fn list_files(dir: impl Into<String>) -> Result<Self, ActionError> {
        Self::new(ActionKind::ListFiles, vec![dir.into()])
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// First target: the folder, the removed path, the listed directory
    /// or the move source.
    pub fn primary(&self) -> &str {
        &self.targets[0]
    }

    /// Move destination; `None` for single-path kinds.
    pub fn destination(&self) -> Option<&str> {
        self.targets.get(1).map(String::as_str)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ActionKind::MoveFile => write!(
                f,
                "move '{}' to '{}'",
                self.targets[0], self.targets[1]
            ),
            kind => write!(f, "{} '{}'", kind, self.targets[0]),
        }
    }
}

/// Outcome of running free text through the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpretationResult {
    Matched(Action),
    NoMatch(String),
}

impl InterpretationResult {
    pub fn action(&self) -> Option<&Action> {
        match self {
            InterpretationResult::Matched(action) => Some(action),
            InterpretationResult::NoMatch(_) => None,
        }
    }

    pub fn into_action(self) -> Option<Action> {
        match self {
            InterpretationResult::Matched(action) => Some(action),
            InterpretationResult::NoMatch(_) => None,
        }
    }
}

/// Why the executor could not complete an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    #[error("no such file or directory")]
    NotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("already exists")]
    AlreadyExists,
    #[error("not a directory")]
    NotADirectory,
    #[error("destination is not a directory")]
    DestinationNotDirectory,
    #[error("invalid path")]
    InvalidPath,
    #[error("I/O error")]
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionOutput {
    pub summary: String,
    /// Populated for `ListFiles` only, sorted by name.
    pub entries: Vec<DirEntryInfo>,
}

impl ExecutionOutput {
    pub fn summary(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            entries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Ok(ExecutionOutput),
    Failed(FailureReason),
}

impl ExecutionResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, ExecutionResult::Ok(_))
    }

    pub fn failure(&self) -> Option<FailureReason> {
        match self {
            ExecutionResult::Ok(_) => None,
            ExecutionResult::Failed(reason) => Some(*reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_requires_two_targets() {
        let err = Action::new(ActionKind::MoveFile, vec!["a".into()]).unwrap_err();
        assert_eq!(
            err,
            ActionError::Arity {
                kind: ActionKind::MoveFile,
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_single_path_kinds_reject_two_targets() {
        for kind in [
            ActionKind::CreateFolder,
            ActionKind::Remove,
            ActionKind::ListFiles,
        ] {
            assert!(Action::new(kind, vec!["a".into(), "b".into()]).is_err());
        }
    }

    #[test]
    fn test_empty_target_rejected() {
        assert_eq!(
            Action::remove("   ").unwrap_err(),
            ActionError::EmptyTarget(ActionKind::Remove)
        );
        assert!(Action::move_file("a", "").is_err());
    }

    #[test]
    fn test_accessors() {
        let action = Action::move_file("file.txt", "documents").unwrap();
        assert_eq!(action.kind(), ActionKind::MoveFile);
        assert_eq!(action.primary(), "file.txt");
        assert_eq!(action.destination(), Some("documents"));
        assert_eq!(action.to_string(), "move 'file.txt' to 'documents'");

        let action = Action::create_folder("notes").unwrap();
        assert_eq!(action.destination(), None);
        assert_eq!(action.to_string(), "create folder 'notes'");
    }

    #[test]
    fn test_execution_result_helpers() {
        let ok = ExecutionResult::Ok(ExecutionOutput::summary("done"));
        assert!(ok.is_ok());
        assert_eq!(ok.failure(), None);

        let failed = ExecutionResult::Failed(FailureReason::NotFound);
        assert!(!failed.is_ok());
        assert_eq!(failed.failure(), Some(FailureReason::NotFound));
    }
}

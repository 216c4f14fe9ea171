pub mod action;
pub mod interpreter;

pub use action::{
    Action, ActionError, ActionKind, DirEntryInfo, ExecutionOutput, ExecutionResult,
    FailureReason, InterpretationResult, CURRENT_DIR,
};
pub use interpreter::{interpret, normalize, IntentInterpreter};

pub mod action_executor;
pub mod command_executor;
pub mod environment;
pub mod filesystem;

pub use action_executor::{ActionExecutor, FsActionExecutor};
pub use command_executor::{CommandError, CommandExecutor, CommandOutput};
pub use environment::SystemSnapshot;
pub use filesystem::{FsError, FsResult};
